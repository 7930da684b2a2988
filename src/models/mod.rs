pub mod history;
pub mod notification;
pub mod order;
pub mod sequence;
pub mod setting;
pub mod stage;
pub mod status;
