//! Object pools whose acquire and release can be traced

use crate::config::PoolConfiguration;
use crate::errors::{PoolError, PoolResult};

use crossbeam::queue::ArrayQueue;
use dashmap::DashMap;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

type ReturnFn<T> = Arc<dyn Fn(T, usize) + Send + Sync>;

/// A pooled object that automatically returns to the pool when dropped
pub struct PooledObject<T> {
    value: Option<T>,
    object_id: usize,
    return_fn: ReturnFn<T>,
}

impl<T> PooledObject<T> {
    fn new(value: T, object_id: usize, return_fn: ReturnFn<T>) -> Self {
        Self {
            value: Some(value),
            object_id,
            return_fn,
        }
    }

    /// Identifier of the pooled instance, stable across checkouts
    pub fn object_id(&self) -> usize {
        self.object_id
    }

    /// Detach the value; it is not returned to the pool
    pub fn into_inner(mut self) -> T {
        self.value.take().expect("Value already taken")
    }
}

impl<T> Deref for PooledObject<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.value.as_ref().expect("Value already taken")
    }
}

impl<T> DerefMut for PooledObject<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.value.as_mut().expect("Value already taken")
    }
}

impl<T> Drop for PooledObject<T> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            (self.return_fn)(value, self.object_id);
        }
    }
}

/// Thread-safe object pool with fixed set of objects
pub struct ObjectPool<T: Send> {
    available: Arc<ArrayQueue<(T, usize)>>,
    active: Arc<DashMap<usize, ()>>,
    config: Arc<PoolConfiguration<T>>,
    next_id: Arc<AtomicUsize>,
    capacity: usize,
}

impl<T: Send + Sync + 'static> ObjectPool<T> {
    /// Create a new object pool with initial objects
    pub fn new(objects: Vec<T>, config: PoolConfiguration<T>) -> Self {
        let capacity = objects.len().max(config.max_pool_size).max(1);
        let available = Arc::new(ArrayQueue::new(capacity));

        let initial = objects.len();
        for (idx, obj) in objects.into_iter().enumerate() {
            let _ = available.push((obj, idx));
        }

        tracing::debug!(capacity, initial, "object pool created");

        Self {
            available,
            active: Arc::new(DashMap::new()),
            config: Arc::new(config),
            next_id: Arc::new(AtomicUsize::new(initial)),
            capacity,
        }
    }

    /// Get an object from the pool
    pub fn get_object(&self) -> PoolResult<PooledObject<T>> {
        self.check_max_active()?;

        match self.available.pop() {
            Some((obj, id)) => Ok(self.check_out(obj, id)),
            None => {
                tracing::trace!("pool empty");
                Err(PoolError::PoolEmpty)
            }
        }
    }

    /// Try to get an object without returning an error
    pub fn try_get_object(&self) -> Option<PooledObject<T>> {
        self.get_object().ok()
    }

    /// Get an object asynchronously, waiting up to the configured timeout
    pub async fn get_object_async(&self) -> PoolResult<PooledObject<T>> {
        let timeout = self.config.operation_timeout.unwrap_or(Duration::from_secs(30));

        tokio::time::timeout(timeout, async {
            loop {
                match self.try_get_object() {
                    Some(obj) => return obj,
                    None => {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        })
        .await
        .map_err(|_| PoolError::Timeout(timeout))
    }

    /// Get available count
    pub fn available_count(&self) -> usize {
        self.available.len()
    }

    /// Get active count
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Total number of objects the pool can hold
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn check_max_active(&self) -> PoolResult<()> {
        if let Some(max) = self.config.max_active_objects
            && self.active.len() >= max
        {
            return Err(PoolError::MaxActiveObjectsReached);
        }
        Ok(())
    }

    fn check_out(&self, obj: T, id: usize) -> PooledObject<T> {
        self.active.insert(id, ());
        tracing::trace!(object_id = id, "object checked out");
        PooledObject::new(obj, id, self.make_return_fn())
    }

    fn make_return_fn(&self) -> ReturnFn<T> {
        let available = Arc::clone(&self.available);
        let active = Arc::clone(&self.active);
        let config = Arc::clone(&self.config);

        Arc::new(move |obj, id| {
            active.remove(&id);

            if let Some(validate) = config.validation_function
                && !validate(&obj)
            {
                tracing::debug!(object_id = id, "object failed validation, discarded");
                return;
            }

            if available.push((obj, id)).is_err() {
                tracing::warn!(object_id = id, "pool full on return, object dropped");
                return;
            }
            tracing::trace!(object_id = id, "object returned");
        })
    }
}

/// Dynamic object pool - creates objects on demand
pub struct DynamicObjectPool<T: Send> {
    inner: ObjectPool<T>,
    factory: Arc<dyn Fn() -> T + Send + Sync>,
}

impl<T: Send + Sync + 'static> DynamicObjectPool<T> {
    /// Create a new dynamic pool with factory function
    pub fn new<F>(factory: F, config: PoolConfiguration<T>) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            inner: ObjectPool::new(Vec::new(), config),
            factory: Arc::new(factory),
        }
    }

    /// Get an object, creating one if pool is empty
    pub fn get_object(&self) -> PoolResult<PooledObject<T>> {
        if let Some(obj) = self.inner.try_get_object() {
            return Ok(obj);
        }
        self.inner.check_max_active()?;

        let live = self.inner.active.len() + self.inner.available.len();
        if live >= self.inner.capacity {
            return Err(PoolError::PoolFull);
        }

        let obj = (self.factory)();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(object_id = id, "object created by factory");
        Ok(self.inner.check_out(obj, id))
    }

    /// Try to get an object
    pub fn try_get_object(&self) -> Option<PooledObject<T>> {
        self.get_object().ok()
    }

    /// Get an object asynchronously
    pub async fn get_object_async(&self) -> PoolResult<PooledObject<T>> {
        let timeout = self.inner.config.operation_timeout.unwrap_or(Duration::from_secs(30));

        tokio::time::timeout(timeout, async {
            loop {
                match self.try_get_object() {
                    Some(obj) => return obj,
                    None => {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        })
        .await
        .map_err(|_| PoolError::Timeout(timeout))
    }

    /// Warm up the pool by pre-creating objects
    pub fn warmup(&self, count: usize) {
        for _ in 0..count.min(self.inner.capacity) {
            let obj = (self.factory)();
            let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

            if self.inner.available.push((obj, id)).is_err() {
                break;
            }
        }
    }

    pub fn available_count(&self) -> usize {
        self.inner.available_count()
    }

    pub fn active_count(&self) -> usize {
        self.inner.active_count()
    }
}
