//! Interception wrapper that traces a pool's acquire and release

use crate::errors::PoolResult;
use crate::event::{InstanceId, PoolEvent};
use crate::pool::{DynamicObjectPool, ObjectPool, PooledObject};
use crate::tracer::PoolTracer;

use std::ops::{Deref, DerefMut};

/// Path prefix shared by every wrapper frame in a live trace
pub(crate) const WRAPPER_PATH: &str = concat!(module_path!(), "::");

/// A pool whose acquire operation can be wrapped by [`Traced`]
///
/// Releasing is whatever dropping the resource does; the wrapper records the
/// release just before that happens.
pub trait TracedPool {
    type Resource;
    type Error;

    /// Check a resource out of the pool
    fn acquire(&self) -> Result<Self::Resource, Self::Error>;

    /// Token identifying the pooled instance behind `resource`
    fn instance_id(resource: &Self::Resource) -> InstanceId;
}

impl<T: Send + Sync + 'static> TracedPool for ObjectPool<T> {
    type Resource = PooledObject<T>;
    type Error = crate::errors::PoolError;

    fn acquire(&self) -> PoolResult<PooledObject<T>> {
        self.get_object()
    }

    fn instance_id(resource: &PooledObject<T>) -> InstanceId {
        InstanceId::from(resource.object_id())
    }
}

impl<T: Send + Sync + 'static> TracedPool for DynamicObjectPool<T> {
    type Resource = PooledObject<T>;
    type Error = crate::errors::PoolError;

    fn acquire(&self) -> PoolResult<PooledObject<T>> {
        self.get_object()
    }

    fn instance_id(resource: &PooledObject<T>) -> InstanceId {
        InstanceId::from(resource.object_id())
    }
}

/// Pool wrapper that emits a trace line on every acquire and release
///
/// The wrapped pool's results and errors are passed through unchanged; a
/// failed acquire produces no line.
///
/// # Examples
///
/// ```
/// use esox_pooltrace::{MemorySink, ObjectPool, PoolConfiguration, PoolTracer, Traced, TraceConfig};
/// use std::sync::Arc;
///
/// let sink = Arc::new(MemorySink::new());
/// let tracer = PoolTracer::new(TraceConfig::default(), sink.clone()).unwrap();
/// let pool = Traced::new(ObjectPool::new(vec!["conn"], PoolConfiguration::default()), tracer);
///
/// {
///     let conn = pool.acquire().unwrap();
///     assert_eq!(**conn, "conn");
/// }
///
/// let lines = sink.lines();
/// assert_eq!(lines.len(), 2);
/// assert!(lines[0].starts_with("acquire(0): "));
/// assert!(lines[1].starts_with("release(0): "));
/// ```
pub struct Traced<P> {
    pool: P,
    tracer: PoolTracer,
}

impl<P: TracedPool> Traced<P> {
    pub fn new(pool: P, tracer: PoolTracer) -> Self {
        Self { pool, tracer }
    }

    /// Acquire from the wrapped pool and record where it happened
    #[inline(never)]
    pub fn acquire(&self) -> Result<TracedResource<P::Resource>, P::Error> {
        let resource = self.pool.acquire()?;
        Ok(self.wrap(resource))
    }

    pub fn inner(&self) -> &P {
        &self.pool
    }

    pub fn tracer(&self) -> &PoolTracer {
        &self.tracer
    }

    pub fn into_inner(self) -> P {
        self.pool
    }

    #[inline(never)]
    fn wrap(&self, resource: P::Resource) -> TracedResource<P::Resource> {
        let instance = P::instance_id(&resource);
        self.tracer.record(PoolEvent::Acquire, instance);
        TracedResource {
            resource: Some(resource),
            instance,
            tracer: self.tracer.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> Traced<ObjectPool<T>> {
    /// Acquire asynchronously, recording the event once the object arrives
    pub async fn acquire_async(&self) -> PoolResult<TracedResource<PooledObject<T>>> {
        let resource = self.pool.get_object_async().await?;
        Ok(self.wrap(resource))
    }
}

impl<T: Send + Sync + 'static> Traced<DynamicObjectPool<T>> {
    /// Acquire asynchronously, recording the event once the object arrives
    pub async fn acquire_async(&self) -> PoolResult<TracedResource<PooledObject<T>>> {
        let resource = self.pool.get_object_async().await?;
        Ok(self.wrap(resource))
    }
}

/// A resource checked out through [`Traced`]
///
/// Dereferences to the pool's own resource. Dropping it (or calling
/// [`release`](Self::release)) records the release and then drops the inner
/// resource, which returns it to its pool.
pub struct TracedResource<R> {
    resource: Option<R>,
    instance: InstanceId,
    tracer: PoolTracer,
}

impl<R> TracedResource<R> {
    pub fn instance_id(&self) -> InstanceId {
        self.instance
    }

    /// Hand the resource back now
    #[inline(never)]
    pub fn release(mut self) {
        self.finish();
    }

    /// Detach the resource; no release line is written for it
    pub fn into_inner(mut self) -> R {
        self.resource.take().expect("Resource already released")
    }

    #[inline(never)]
    fn finish(&mut self) {
        if let Some(resource) = self.resource.take() {
            self.tracer.record(PoolEvent::Release, self.instance);
            drop(resource);
        }
    }
}

impl<R> Deref for TracedResource<R> {
    type Target = R;

    fn deref(&self) -> &Self::Target {
        self.resource.as_ref().expect("Resource already released")
    }
}

impl<R> DerefMut for TracedResource<R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.resource.as_mut().expect("Resource already released")
    }
}

impl<R> Drop for TracedResource<R> {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PoolConfiguration, TraceConfig};
    use crate::errors::PoolError;
    use crate::sink::MemorySink;
    use std::sync::Arc;

    fn traced_pool(config: TraceConfig, objects: Vec<u32>) -> (Traced<ObjectPool<u32>>, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let tracer = PoolTracer::new(config, sink.clone()).unwrap();
        let pool = Traced::new(ObjectPool::new(objects, PoolConfiguration::default()), tracer);
        (pool, sink)
    }

    #[test]
    fn test_acquire_returns_real_object() {
        let (pool, _sink) = traced_pool(TraceConfig::default(), vec![7]);
        let conn = pool.acquire().unwrap();
        assert_eq!(**conn, 7);
        assert_eq!(pool.inner().active_count(), 1);
    }

    #[test]
    fn test_acquire_and_release_pair_by_instance() {
        let (pool, sink) = traced_pool(TraceConfig::default(), vec![1, 2]);

        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        let (id_a, id_b) = (a.instance_id(), b.instance_id());
        a.release();
        drop(b);

        let events = sink.events();
        let kinds: Vec<_> = events.iter().map(|e| (e.kind, e.instance)).collect();
        assert_eq!(
            kinds,
            vec![
                (PoolEvent::Acquire, id_a),
                (PoolEvent::Acquire, id_b),
                (PoolEvent::Release, id_a),
                (PoolEvent::Release, id_b),
            ]
        );
        assert_eq!(pool.inner().available_count(), 2);
    }

    #[test]
    fn test_failed_acquire_passes_error_and_emits_nothing() {
        let (pool, sink) = traced_pool(TraceConfig::default(), vec![1]);
        let _held = pool.acquire().unwrap();
        sink.clear();

        assert!(matches!(pool.acquire(), Err(PoolError::PoolEmpty)));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_disabled_still_pools() {
        let (pool, sink) = traced_pool(TraceConfig::new().with_enabled(false), vec![5]);

        {
            let conn = pool.acquire().unwrap();
            assert_eq!(**conn, 5);
        }

        assert!(sink.is_empty());
        assert_eq!(pool.inner().available_count(), 1);
        assert_eq!(pool.tracer().metrics().suppressed_events, 2);
    }

    #[test]
    fn test_into_inner_skips_release_line() {
        let (pool, sink) = traced_pool(TraceConfig::default(), vec![1]);
        let conn = pool.acquire().unwrap().into_inner();
        drop(conn);

        assert_eq!(sink.len(), 1);
        assert_eq!(pool.inner().available_count(), 1);
    }

    #[tokio::test]
    async fn test_acquire_async() {
        let (pool, sink) = traced_pool(TraceConfig::default(), vec![3]);

        let conn = pool.acquire_async().await.unwrap();
        assert_eq!(**conn, 3);
        drop(conn);

        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn test_dynamic_pool_instance_ids() {
        let sink = Arc::new(MemorySink::new());
        let tracer = PoolTracer::new(TraceConfig::default(), sink.clone()).unwrap();
        let pool = Traced::new(DynamicObjectPool::new(|| "conn", PoolConfiguration::default()), tracer);

        let first = pool.acquire().unwrap();
        let second = pool.acquire().unwrap();
        assert_ne!(first.instance_id(), second.instance_id());
    }
}
