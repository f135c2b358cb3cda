//! Trace filter pipeline: skip, exclude, truncate, strip

use crate::config::TraceConfig;
use crate::frame::StackFrame;
use std::slice;

/// Frames kept for display, at most `max_frames` long
///
/// Always a subsequence of the raw trace it was built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilteredTrace {
    frames: Vec<StackFrame>,
}

impl FilteredTrace {
    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, StackFrame> {
        self.frames.iter()
    }
}

impl<'a> IntoIterator for &'a FilteredTrace {
    type Item = &'a StackFrame;
    type IntoIter = slice::Iter<'a, StackFrame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

/// Reduce a raw stack to the frames worth showing
///
/// The first `skip_first` frames are dropped by position. After that, frames
/// inside the internal package are dropped by content and do not use up a
/// slot. Scanning stops once `max_frames` frames are accepted.
///
/// # Examples
///
/// ```
/// use esox_pooltrace::{filter_trace, StackFrame, TraceConfig};
///
/// let raw = vec![
///     StackFrame::new("backtrace", "trace", 10),
///     StackFrame::new("app::db::Repo", "load", 20),
///     StackFrame::new("app::main", "run", 30),
/// ];
/// let config = TraceConfig::new().with_skip_first(1).with_max_frames(1);
///
/// let filtered = filter_trace(&raw, &config);
/// assert_eq!(filtered.len(), 1);
/// assert_eq!(filtered.frames()[0].qualified_name, "Repo");
/// ```
pub fn filter_trace(raw: &[StackFrame], config: &TraceConfig) -> FilteredTrace {
    let frames = raw
        .iter()
        .skip(config.skip_first)
        .filter(|frame| {
            !(config.exclude_internal_package && frame.is_within(&config.internal_package_prefix))
        })
        .take(config.max_frames)
        .map(|frame| display_frame(frame, config))
        .collect();

    FilteredTrace { frames }
}

fn display_frame(frame: &StackFrame, config: &TraceConfig) -> StackFrame {
    if !config.strip_qualifier {
        return frame.clone();
    }

    let short = strip_qualifier(&frame.qualified_name, &config.namespace_separator);
    StackFrame::new(short, frame.method_name.as_str(), frame.line_number)
}

/// Last segment of `name` after the final `separator`
///
/// # Examples
///
/// ```
/// use esox_pooltrace::strip_qualifier;
///
/// assert_eq!(strip_qualifier("com.example.pool.Widget", "."), "Widget");
/// assert_eq!(strip_qualifier("app::db::Repo", "::"), "Repo");
/// assert_eq!(strip_qualifier("Repo", "::"), "Repo");
/// ```
pub fn strip_qualifier<'a>(name: &'a str, separator: &str) -> &'a str {
    match name.rfind(separator) {
        Some(idx) => &name[idx + separator.len()..],
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(name: &str, line: u32) -> StackFrame {
        StackFrame::new(name, "call", line)
    }

    fn numbered(count: usize) -> Vec<StackFrame> {
        (0..count).map(|i| frame(&format!("app::mod{i}::Type{i}"), i as u32)).collect()
    }

    fn plain(skip: usize, max: usize) -> TraceConfig {
        TraceConfig::new()
            .with_skip_first(skip)
            .with_max_frames(max)
            .with_strip_qualifier(false)
            .without_internal_exclusion()
    }

    #[test]
    fn test_window_after_skip() {
        let raw = numbered(8);
        let filtered = filter_trace(&raw, &plain(3, 5));

        assert_eq!(filtered.len(), 5);
        assert_eq!(filtered.frames(), &raw[3..8]);
    }

    #[test]
    fn test_internal_frames_do_not_use_slots() {
        let mut raw = numbered(7);
        raw[3].qualified_name = "esox_pooltrace::pool::ObjectPool".into();
        raw[4].qualified_name = "esox_pooltrace::pool::PooledObject".into();

        let config = TraceConfig::new()
            .with_skip_first(3)
            .with_max_frames(2)
            .with_strip_qualifier(false);
        let filtered = filter_trace(&raw, &config);

        assert_eq!(filtered.frames(), &raw[5..7]);
    }

    #[test]
    fn test_internal_frames_kept_when_exclusion_off() {
        let mut raw = numbered(6);
        raw[3].qualified_name = "esox_pooltrace::pool::ObjectPool".into();

        let filtered = filter_trace(&raw, &plain(3, 2));
        assert_eq!(filtered.frames()[0].qualified_name, "esox_pooltrace::pool::ObjectPool");
    }

    #[test]
    fn test_skip_drops_internal_lookalikes_by_position() {
        let mut raw = numbered(5);
        raw[0].qualified_name = "app::keep::Me".into();

        let filtered = filter_trace(&raw, &plain(1, 10));
        assert!(filtered.iter().all(|f| f.qualified_name != "app::keep::Me"));
    }

    #[test]
    fn test_short_trace_degrades() {
        let raw = numbered(4);
        let filtered = filter_trace(&raw, &plain(3, 5));
        assert_eq!(filtered.frames(), &raw[3..4]);
    }

    #[test]
    fn test_skip_past_end_is_empty() {
        let raw = numbered(2);
        assert!(filter_trace(&raw, &plain(3, 5)).is_empty());
    }

    #[test]
    fn test_empty_raw() {
        assert!(filter_trace(&[], &TraceConfig::default()).is_empty());
    }

    #[test]
    fn test_strip_dotted_names() {
        let raw = vec![StackFrame::new("com.example.pool.Widget", "run", 42)];
        let config = TraceConfig::new()
            .with_skip_first(0)
            .with_namespace_separator(".");

        let filtered = filter_trace(&raw, &config);
        assert_eq!(filtered.frames()[0].qualified_name, "Widget");
        assert_eq!(filtered.frames()[0].method_name, "run");
        assert_eq!(filtered.frames()[0].line_number, 42);
    }

    #[test]
    fn test_strip_leaves_unqualified_names() {
        assert_eq!(strip_qualifier("Widget", "."), "Widget");
        assert_eq!(strip_qualifier("", "::"), "");
    }

    #[test]
    fn test_properties_over_mixed_traces() {
        let prefix = "esox_pooltrace::pool";
        for len in 0..12 {
            let raw: Vec<StackFrame> = (0..len)
                .map(|i| {
                    if i % 3 == 1 {
                        frame(&format!("{prefix}::Inner{i}"), i as u32)
                    } else {
                        frame(&format!("app::outer::Type{i}"), i as u32)
                    }
                })
                .collect();

            for skip in 0..4 {
                for max in 1..6 {
                    let config = TraceConfig::new().with_skip_first(skip).with_max_frames(max);
                    let filtered = filter_trace(&raw, &config);

                    assert!(filtered.len() <= max);
                    assert_eq!(filtered, filter_trace(&raw, &config));

                    // line numbers are unique, so they locate each kept frame in raw
                    let positions: Vec<usize> =
                        filtered.iter().map(|f| f.line_number as usize).collect();
                    assert!(positions.windows(2).all(|w| w[0] < w[1]));
                    assert!(positions.iter().all(|&p| p >= skip && p % 3 != 1));
                    assert!(filtered.iter().all(|f| !f.qualified_name.contains("::")));
                }
            }
        }
    }
}
