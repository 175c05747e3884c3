pub mod memory;

pub use memory::{ObjectPool, PooledObject};
