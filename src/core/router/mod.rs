pub mod fallback;
pub mod route_cache;
pub mod router;
pub mod scoring;
pub mod strategy;

pub use router::Router;
pub use strategy::Strategy;
