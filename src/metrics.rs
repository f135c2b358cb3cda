//! Counters for the tracer itself and their export

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of the tracer counters
///
/// # Examples
///
/// ```
/// use esox_pooltrace::{InstanceId, MemorySink, PoolEvent, PoolTracer, TraceConfig};
/// use std::sync::Arc;
///
/// let tracer = PoolTracer::new(TraceConfig::default(), Arc::new(MemorySink::new())).unwrap();
/// tracer.record(PoolEvent::Acquire, InstanceId(1));
///
/// let metrics = tracer.metrics();
/// assert_eq!(metrics.acquire_events, 1);
/// assert_eq!(metrics.release_events, 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TracerMetrics {
    /// Acquire lines emitted
    pub acquire_events: u64,

    /// Release lines emitted
    pub release_events: u64,

    /// Events seen while tracing was switched off
    pub suppressed_events: u64,

    /// Events dropped because the trace path panicked
    pub faults: u64,
}

impl TracerMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("acquire_events".to_string(), self.acquire_events.to_string());
        metrics.insert("release_events".to_string(), self.release_events.to_string());
        metrics.insert("suppressed_events".to_string(), self.suppressed_events.to_string());
        metrics.insert("faults".to_string(), self.faults.to_string());
        metrics
    }

    /// Export metrics in Prometheus exposition format
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_pooltrace::TracerMetrics;
    ///
    /// let metrics = TracerMetrics { acquire_events: 4, ..Default::default() };
    /// let text = metrics.export_prometheus("orders_db").unwrap();
    ///
    /// assert!(text.contains("pooltrace_events_total"));
    /// assert!(text.contains("event=\"acquire\""));
    /// assert!(text.contains("pool=\"orders_db\""));
    /// ```
    #[cfg(feature = "prometheus")]
    pub fn export_prometheus(&self, pool_name: &str) -> prometheus::Result<String> {
        use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

        let registry = Registry::new();

        let events = IntCounterVec::new(
            Opts::new("pooltrace_events_total", "Trace lines emitted per lifecycle event")
                .const_label("pool", pool_name),
            &["event"],
        )?;
        let suppressed = IntCounter::with_opts(
            Opts::new("pooltrace_suppressed_total", "Events skipped while tracing was off")
                .const_label("pool", pool_name),
        )?;
        let faults = IntCounter::with_opts(
            Opts::new("pooltrace_faults_total", "Events dropped by a fault in the trace path")
                .const_label("pool", pool_name),
        )?;

        registry.register(Box::new(events.clone()))?;
        registry.register(Box::new(suppressed.clone()))?;
        registry.register(Box::new(faults.clone()))?;

        events.with_label_values(&["acquire"]).inc_by(self.acquire_events);
        events.with_label_values(&["release"]).inc_by(self.release_events);
        suppressed.inc_by(self.suppressed_events);
        faults.inc_by(self.faults);

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Internal metrics tracker
#[derive(Debug, Default)]
pub(crate) struct MetricsTracker {
    pub acquire_events: AtomicU64,
    pub release_events: AtomicU64,
    pub suppressed_events: AtomicU64,
    pub faults: AtomicU64,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_metrics(&self) -> TracerMetrics {
        TracerMetrics {
            acquire_events: self.acquire_events.load(Ordering::Relaxed),
            release_events: self.release_events.load(Ordering::Relaxed),
            suppressed_events: self.suppressed_events.load(Ordering::Relaxed),
            faults: self.faults.load(Ordering::Relaxed),
        }
    }
}
