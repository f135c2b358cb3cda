//! Pool lifecycle events and their rendered form

use std::fmt;

/// Which side of the lifecycle an event records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PoolEvent {
    /// A resource was checked out of the pool
    Acquire,

    /// A resource is being handed back to the pool
    Release,
}

impl PoolEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolEvent::Acquire => "acquire",
            PoolEvent::Release => "release",
        }
    }
}

impl fmt::Display for PoolEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque per-instance token, stable for the life of a resource
///
/// Rendered in lowercase hex so acquire and release lines can be paired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstanceId(pub u64);

impl InstanceId {
    /// Token derived from a value's address
    ///
    /// Only stable while the value stays where it is.
    pub fn of<T: ?Sized>(value: &T) -> Self {
        Self(value as *const T as *const () as usize as u64)
    }
}

impl From<usize> for InstanceId {
    fn from(id: usize) -> Self {
        Self(id as u64)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

/// One emitted line: `<event>(<instance-id>): <trace>`
///
/// # Examples
///
/// ```
/// use esox_pooltrace::{InstanceId, PoolEvent, TraceEvent};
///
/// let event = TraceEvent::new(PoolEvent::Acquire, InstanceId(0x2a), "Repo.load(12)");
/// assert_eq!(event.to_string(), "acquire(2a): Repo.load(12)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TraceEvent {
    pub kind: PoolEvent,
    pub instance: InstanceId,
    pub trace: String,
}

impl TraceEvent {
    pub fn new(kind: PoolEvent, instance: InstanceId, trace: impl Into<String>) -> Self {
        Self {
            kind,
            instance,
            trace: trace.into(),
        }
    }
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}): {}", self.kind, self.instance, self.trace)
    }
}
