//! Output sinks for rendered trace events

use crate::event::TraceEvent;
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;

/// Destination for trace lines
///
/// Called concurrently from every thread that acquires or releases, so each
/// call must write one whole line or nothing.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &TraceEvent);
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn emit(&self, event: &TraceEvent) {
        (**self).emit(event)
    }
}

/// Prints one line per event to standard output
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl EventSink for StdoutSink {
    fn emit(&self, event: &TraceEvent) {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        // a closed stdout must not break the pool
        let _ = writeln!(out, "{event}");
    }
}

/// Forwards events to `tracing` at INFO level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &TraceEvent) {
        tracing::info!(
            target: "esox_pooltrace",
            event = event.kind.as_str(),
            instance = %event.instance,
            trace = %event.trace,
            "{event}"
        );
    }
}

/// Keeps rendered lines in memory
///
/// # Examples
///
/// ```
/// use esox_pooltrace::{EventSink, InstanceId, MemorySink, PoolEvent, TraceEvent};
///
/// let sink = MemorySink::new();
/// sink.emit(&TraceEvent::new(PoolEvent::Acquire, InstanceId(1), "Main.run(3)"));
///
/// assert_eq!(sink.lines(), vec!["acquire(1): Main.run(3)".to_string()]);
/// ```
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<TraceEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.lock().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.events.lock().iter().map(ToString::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &TraceEvent) {
        self.events.lock().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{InstanceId, PoolEvent};
    use std::thread;

    #[test]
    fn test_memory_sink_concurrent_lines_intact() {
        let sink = Arc::new(MemorySink::new());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let sink = Arc::clone(&sink);
                thread::spawn(move || {
                    for i in 0..50 {
                        sink.emit(&TraceEvent::new(PoolEvent::Acquire, InstanceId(t), format!("T.m({i})")));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(sink.len(), 400);
        assert!(sink.lines().iter().all(|l| l.starts_with("acquire(") && l.ends_with(')')));
    }

    #[test]
    fn test_arc_sink_forwards() {
        let sink = Arc::new(MemorySink::new());
        let shared: Arc<dyn EventSink> = sink.clone();
        shared.emit(&TraceEvent::new(PoolEvent::Release, InstanceId(3), "A.b(1)"));
        assert_eq!(sink.lines(), vec!["release(3): A.b(1)".to_string()]);
    }

    #[test]
    fn test_clear() {
        let sink = MemorySink::new();
        sink.emit(&TraceEvent::new(PoolEvent::Acquire, InstanceId(1), ""));
        sink.clear();
        assert!(sink.is_empty());
    }
}
