pub mod notification_handlers;
pub mod workflow_handlers;
