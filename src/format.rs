//! Single-line rendering of a filtered trace

use crate::filter::FilteredTrace;
use std::fmt::{self, Write};

/// Text placed between consecutive frames
pub const FRAME_SEPARATOR: &str = " > ";

/// Render frames as `Name.method(line) > Name.method(line) > ...`
///
/// An empty trace renders as an empty string.
///
/// # Examples
///
/// ```
/// use esox_pooltrace::{filter_trace, format_trace, StackFrame, TraceConfig};
///
/// let raw = vec![
///     StackFrame::new("app::A", "m1", 1),
///     StackFrame::new("app::B", "m2", 2),
/// ];
/// let config = TraceConfig::new().with_skip_first(0);
///
/// assert_eq!(format_trace(&filter_trace(&raw, &config)), "A.m1(1) > B.m2(2)");
/// ```
pub fn format_trace(trace: &FilteredTrace) -> String {
    trace.to_string()
}

impl fmt::Display for FilteredTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, frame) in self.iter().enumerate() {
            if idx > 0 {
                f.write_str(FRAME_SEPARATOR)?;
            }
            write!(f, "{frame}")?;
        }
        Ok(())
    }
}

/// Append the rendered trace to an existing buffer
pub fn write_trace<W: Write>(out: &mut W, trace: &FilteredTrace) -> fmt::Result {
    write!(out, "{trace}")
}
