pub mod processor;
pub mod types;

pub use processor::StreamProcessor;
pub use types::StreamMonitor;
