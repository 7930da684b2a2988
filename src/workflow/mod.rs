pub mod engine;
pub mod overdue;
pub mod scheduler;

pub use engine::*;
