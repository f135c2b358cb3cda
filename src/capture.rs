//! Stack capture through the `backtrace` crate

use crate::frame::{RawTrace, StackFrame};

/// Deepest stack walked per event; keeps capture cost bounded
pub const MAX_CAPTURE_DEPTH: usize = 128;

/// Capture the current thread's call stack, innermost frame first
///
/// Unwinder frames are dropped so that index 0 is this function, index 1 its
/// caller and so on. Inlined calls produce one frame each.
///
/// # Examples
///
/// ```
/// let raw = esox_pooltrace::capture_raw_trace(64);
/// assert!(raw.len() <= 64);
/// ```
#[inline(never)]
pub fn capture_raw_trace(max_depth: usize) -> RawTrace {
    let mut frames = Vec::with_capacity(max_depth.min(32));

    backtrace::trace(|frame| {
        let before = frames.len();
        backtrace::resolve_frame(frame, |symbol| {
            if frames.len() < max_depth {
                frames.push(frame_from_symbol(symbol));
            }
        });
        if frames.len() == before && frames.len() < max_depth {
            frames.push(StackFrame::unresolved());
        }
        frames.len() < max_depth
    });

    if let Some(own) = frames.iter().position(is_capture_frame) {
        frames.drain(..own);
    }
    frames
}

fn is_capture_frame(frame: &StackFrame) -> bool {
    frame.qualified_name == module_path!() && frame.method_name == "capture_raw_trace"
}

fn frame_from_symbol(symbol: &backtrace::Symbol) -> StackFrame {
    let line = symbol.lineno().unwrap_or(0);
    match symbol.name() {
        // `{:#}` drops the trailing `::h0123...` hash
        Some(name) => StackFrame::from_symbol_path(&format!("{name:#}"), line),
        None => StackFrame::unresolved(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[inline(never)]
    fn outer_caller() -> RawTrace {
        capture_raw_trace(MAX_CAPTURE_DEPTH)
    }

    #[test]
    fn test_depth_is_capped() {
        assert!(capture_raw_trace(2).len() <= 2);
        assert!(capture_raw_trace(0).is_empty());
    }

    #[test]
    fn test_capture_starts_at_itself() {
        let raw = outer_caller();
        assert!(is_capture_frame(&raw[0]), "first frame was {}", raw[0]);
        assert!(raw.iter().any(|f| f.method_name == "outer_caller"));
    }
}
