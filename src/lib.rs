//! # EsoxSolutions.PoolTrace
//!
//! Compact call-site tracing for pooled resources. Every acquire and release
//! writes one line naming the pooled instance and the few caller frames that
//! led to it, so that acquire/release pairs can be matched by eye or by a
//! downstream tool when hunting leaks and double releases.
//!
//! ## Features
//!
//! - Stack capture through the `backtrace` crate
//! - Filter pipeline: positional skip, internal-package exclusion, frame cap,
//!   namespace stripping
//! - One-line rendering: `acquire(1f): Repo.load(42) > Handler.get(17)`
//! - Configuration read once from `POOLTRACE_*` environment variables
//! - Master switch that turns every event into a no-op
//! - Wrapper around any pool implementing [`TracedPool`]
//! - Stdout, `tracing` and in-memory sinks
//! - Tracer counters with Prometheus export
//!
//! ## Quick Start
//!
//! ```rust
//! use esox_pooltrace::{DynamicObjectPool, PoolConfiguration, PoolTracer, StdoutSink, Traced, TraceConfig};
//! use std::sync::Arc;
//!
//! let tracer = PoolTracer::new(TraceConfig::default(), Arc::new(StdoutSink)).unwrap();
//! let pool = Traced::new(DynamicObjectPool::new(|| 1, PoolConfiguration::default()), tracer);
//! {
//!     let conn = pool.acquire().unwrap();
//!     println!("Got: {}", **conn);
//!     // prints `acquire(0): ...` now and `release(0): ...` on drop
//! }
//! ```

mod capture;
mod config;
mod errors;
mod event;
mod filter;
mod format;
mod frame;
mod metrics;
mod pool;
mod sink;
mod traced;
mod tracer;

pub use capture::{capture_raw_trace, MAX_CAPTURE_DEPTH};
pub use config::{env, PoolConfiguration, TraceConfig, DEFAULT_POOL_PACKAGE};
pub use errors::{PoolError, PoolResult, TraceError, TraceResult};
pub use event::{InstanceId, PoolEvent, TraceEvent};
pub use filter::{filter_trace, strip_qualifier, FilteredTrace};
pub use format::{format_trace, write_trace, FRAME_SEPARATOR};
pub use frame::{RawTrace, StackFrame, PATH_SEPARATOR};
pub use metrics::TracerMetrics;
pub use pool::{DynamicObjectPool, ObjectPool, PooledObject};
pub use sink::{EventSink, MemorySink, StdoutSink, TracingSink};
pub use traced::{Traced, TracedPool, TracedResource};
pub use tracer::PoolTracer;
