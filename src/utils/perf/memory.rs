//! Generic object pool: reused by `core::memory` to back the allocation
//! ledger's slab of reusable buffers.

use parking_lot::Mutex;
use std::sync::Arc;

/// A pooled object. Returns itself to the pool on drop instead of
/// deallocating.
pub struct PooledObject<T> {
    inner: Option<T>,
    pool: Arc<Mutex<Vec<T>>>,
}

impl<T> std::ops::Deref for PooledObject<T> {
    type Target = T;
    fn deref(&self) -> &T {
        self.inner.as_ref().expect("pooled object taken twice")
    }
}

impl<T> std::ops::DerefMut for PooledObject<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.inner.as_mut().expect("pooled object taken twice")
    }
}

impl<T> Drop for PooledObject<T> {
    fn drop(&mut self) {
        if let Some(item) = self.inner.take() {
            self.pool.lock().push(item);
        }
    }
}

/// Bounded pool of reusable `T`s, created via a factory closure on miss.
pub struct ObjectPool<T> {
    items: Arc<Mutex<Vec<T>>>,
    factory: Box<dyn Fn() -> T + Send + Sync>,
    max_size: usize,
}

impl<T: Send + 'static> ObjectPool<T> {
    pub fn new<F>(max_size: usize, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            items: Arc::new(Mutex::new(Vec::with_capacity(max_size))),
            factory: Box::new(factory),
            max_size,
        }
    }

    /// Take an item from the pool, creating a new one if empty.
    pub fn acquire(&self) -> PooledObject<T> {
        let item = self.items.lock().pop().unwrap_or_else(|| (self.factory)());
        PooledObject {
            inner: Some(item),
            pool: self.items.clone(),
        }
    }

    /// Current number of idle items held by the pool.
    pub fn idle_count(&self) -> usize {
        self.items.lock().len()
    }

    pub fn capacity(&self) -> usize {
        self.max_size
    }
}
