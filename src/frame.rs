//! Stack frames as consumed by the filter pipeline

use std::fmt;

/// Rust path separator used in symbol names
pub const PATH_SEPARATOR: &str = "::";

/// One entry of a captured call stack
///
/// # Examples
///
/// ```
/// use esox_pooltrace::StackFrame;
///
/// let frame = StackFrame::from_symbol_path("app::repo::UserRepo::load", 42);
/// assert_eq!(frame.qualified_name, "app::repo::UserRepo");
/// assert_eq!(frame.method_name, "load");
/// assert_eq!(frame.to_string(), "app::repo::UserRepo.load(42)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StackFrame {
    /// Namespace-qualified type (or module) name
    pub qualified_name: String,

    /// Method or function name
    pub method_name: String,

    /// Source line, 0 when unknown
    pub line_number: u32,
}

impl StackFrame {
    pub fn new(
        qualified_name: impl Into<String>,
        method_name: impl Into<String>,
        line_number: u32,
    ) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            method_name: method_name.into(),
            line_number,
        }
    }

    /// Split a full symbol path at its last `::` into owner and method
    ///
    /// Generic arguments and `<Type as Trait>` wrappers are removed first, so
    /// the owner is always a plain path. A path without a separator is a free
    /// function with no owner.
    pub fn from_symbol_path(path: &str, line_number: u32) -> Self {
        let path = simplify_symbol_path(path);
        match path.rsplit_once(PATH_SEPARATOR) {
            Some((owner, method)) => Self::new(owner, method, line_number),
            None => Self::new("", path.as_str(), line_number),
        }
    }

    /// Frame used when the platform could not resolve a symbol
    pub fn unresolved() -> Self {
        Self::new("<unknown>", "?", 0)
    }

    /// Whether the qualified name lives under `prefix`
    pub fn is_within(&self, prefix: &str) -> bool {
        self.qualified_name.starts_with(prefix)
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}({})", self.qualified_name, self.method_name, self.line_number)
    }
}

/// Ordered call stack, index 0 is the capture point
pub type RawTrace = Vec<StackFrame>;

/// `<a::Foo<T> as b::Bar>::run` becomes `a::Foo::run`
fn simplify_symbol_path(path: &str) -> String {
    let path = match path.strip_prefix('<').and_then(split_impl_owner) {
        Some((owner, tail)) => {
            let owner = top_level_split(owner, " as ").map_or(owner, |(ty, _)| ty);
            format!("{owner}{tail}")
        }
        None => path.to_string(),
    };

    let mut out = String::with_capacity(path.len());
    let mut depth = 0usize;
    for ch in path.chars() {
        match ch {
            '<' => depth += 1,
            '>' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    out
}

/// Split `Foo<T> as Bar>::run` at the `>` closing the leading `<`
fn split_impl_owner(rest: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    for (idx, ch) in rest.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' if depth == 0 => return Some((&rest[..idx], &rest[idx + 1..])),
            '>' => depth -= 1,
            _ => {}
        }
    }
    None
}

fn top_level_split<'a>(s: &'a str, pat: &str) -> Option<(&'a str, &'a str)> {
    let mut depth = 0usize;
    for (idx, ch) in s.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            _ if depth == 0 && s[idx..].starts_with(pat) => {
                return Some((&s[..idx], &s[idx + pat.len()..]));
            }
            _ => {}
        }
    }
    None
}
