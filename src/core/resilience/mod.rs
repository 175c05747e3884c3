pub mod error_handler;
pub mod health_monitor;

pub use error_handler::{Disposition, ErrorHandler};
pub use health_monitor::HealthMonitor;
