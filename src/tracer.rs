//! Glue between capture, the filter pipeline and the output sink

use crate::capture::{capture_raw_trace, MAX_CAPTURE_DEPTH};
use crate::config::TraceConfig;
use crate::errors::TraceResult;
use crate::event::{InstanceId, PoolEvent, TraceEvent};
use crate::filter::filter_trace;
use crate::format::format_trace;
use crate::frame::{RawTrace, StackFrame};
use crate::metrics::{MetricsTracker, TracerMetrics};
use crate::sink::EventSink;
use crate::traced::WRAPPER_PATH;

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Emits one trace line per acquire or release
///
/// Cheap to clone; clones share configuration, sink and counters. Recording
/// never fails and never panics into the caller.
///
/// # Examples
///
/// ```
/// use esox_pooltrace::{InstanceId, MemorySink, PoolEvent, PoolTracer, StackFrame, TraceConfig};
/// use std::sync::Arc;
///
/// let sink = Arc::new(MemorySink::new());
/// let tracer = PoolTracer::new(TraceConfig::new().with_skip_first(1), sink.clone()).unwrap();
///
/// let raw = vec![
///     StackFrame::new("esox_pooltrace::capture", "capture_raw_trace", 20),
///     StackFrame::new("shop::orders::OrderRepo", "find", 88),
///     StackFrame::new("shop::api", "get_order", 14),
/// ];
/// tracer.record_with(PoolEvent::Acquire, InstanceId(0xbeef), &raw);
///
/// assert_eq!(sink.lines(), vec!["acquire(beef): OrderRepo.find(88) > api.get_order(14)"]);
/// ```
#[derive(Clone)]
pub struct PoolTracer {
    config: Arc<TraceConfig>,
    sink: Arc<dyn EventSink>,
    metrics: Arc<MetricsTracker>,
}

impl PoolTracer {
    /// Create a tracer, rejecting an invalid configuration up front
    pub fn new(config: TraceConfig, sink: Arc<dyn EventSink>) -> TraceResult<Self> {
        config.validate()?;

        tracing::debug!(
            enabled = config.enabled,
            skip_first = config.skip_first,
            max_frames = config.max_frames,
            internal_package = %config.internal_package_prefix,
            "pool tracer created"
        );

        Ok(Self {
            config: Arc::new(config),
            sink,
            metrics: Arc::new(MetricsTracker::new()),
        })
    }

    /// Create a tracer configured from `POOLTRACE_*` environment variables
    pub fn from_env(sink: Arc<dyn EventSink>) -> TraceResult<Self> {
        Self::new(TraceConfig::from_env()?, sink)
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Capture the caller's stack and emit one event line
    ///
    /// With the default `skip_first` of 3 the skipped frames are the capture
    /// function, this method and the wrapper that called it. When the release
    /// comes from dropping a [`TracedResource`](crate::TracedResource), the
    /// compiler's drop glue between the wrapper and the dropping code is
    /// removed as well.
    #[inline(never)]
    pub fn record(&self, kind: PoolEvent, instance: InstanceId) {
        if !self.config.enabled {
            self.metrics.suppressed_events.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let captured = panic::catch_unwind(|| {
            let mut raw = capture_raw_trace(MAX_CAPTURE_DEPTH);
            align_live_trace(&mut raw);
            raw
        });

        match captured {
            Ok(raw) => self.emit_isolated(kind, instance, &raw),
            Err(_) => self.fault(kind, instance),
        }
    }

    /// Emit one event line for an already captured stack
    pub fn record_with(&self, kind: PoolEvent, instance: InstanceId, raw: &[StackFrame]) {
        if !self.config.enabled {
            self.metrics.suppressed_events.fetch_add(1, Ordering::Relaxed);
            return;
        }

        self.emit_isolated(kind, instance, raw);
    }

    /// Filter and format a stack without emitting anything
    pub fn render(&self, raw: &[StackFrame]) -> String {
        format_trace(&filter_trace(raw, &self.config))
    }

    /// Snapshot of the tracer counters
    pub fn metrics(&self) -> TracerMetrics {
        self.metrics.get_metrics()
    }

    fn emit_isolated(&self, kind: PoolEvent, instance: InstanceId, raw: &[StackFrame]) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let event = TraceEvent::new(kind, instance, self.render(raw));
            self.sink.emit(&event);
        }));

        match outcome {
            Ok(()) => {
                let counter = match kind {
                    PoolEvent::Acquire => &self.metrics.acquire_events,
                    PoolEvent::Release => &self.metrics.release_events,
                };
                counter.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => self.fault(kind, instance),
        }
    }

    fn fault(&self, kind: PoolEvent, instance: InstanceId) {
        self.metrics.faults.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
            event = kind.as_str(),
            instance = %instance,
            "pool trace dropped after a fault in the trace path"
        );
    }
}

/// Reduce a live capture to `capture, record, wrapper.., caller..`
///
/// Removes the `catch_unwind` frames between the capture function and
/// [`PoolTracer::record`], then the drop glue directly above the wrapper
/// frames.
fn align_live_trace(raw: &mut RawTrace) {
    if let Some(record) = raw.iter().position(is_record_frame)
        && record > 1
    {
        raw.drain(1..record);
    }

    let Some(outside) = raw
        .iter()
        .skip(2)
        .position(|frame| !frame.qualified_name.starts_with(WRAPPER_PATH))
        .map(|offset| offset + 2)
    else {
        return;
    };
    let glue = raw[outside..].iter().take_while(|frame| is_drop_glue(frame)).count();
    raw.drain(outside..outside + glue);
}

fn is_record_frame(frame: &StackFrame) -> bool {
    frame.qualified_name == concat!(module_path!(), "::PoolTracer") && frame.method_name == "record"
}

/// `drop_in_place` shims and `mem::drop` emitted for a value going out of scope
fn is_drop_glue(frame: &StackFrame) -> bool {
    matches!(
        (frame.qualified_name.as_str(), frame.method_name.as_str()),
        ("core::ptr", "drop_in_place") | ("core::mem", "drop")
    )
}

impl std::fmt::Debug for PoolTracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolTracer")
            .field("config", &self.config)
            .field("metrics", &self.metrics.get_metrics())
            .finish_non_exhaustive()
    }
}
