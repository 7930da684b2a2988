pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod notifier;
pub mod whatsapp;
pub mod workflow;
