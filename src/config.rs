//! Trace and pool configuration options

use crate::errors::{TraceError, TraceResult};
use crate::frame::PATH_SEPARATOR;
use std::time::Duration;

/// Environment variable names read by [`TraceConfig::from_env`]
pub mod env {
    pub const OFF: &str = "POOLTRACE_OFF";
    pub const SKIP_FIRST: &str = "POOLTRACE_SKIP_FIRST";
    pub const MAX_TRACE: &str = "POOLTRACE_MAX_TRACE";
    pub const NO_PACKAGE_NAMES: &str = "POOLTRACE_NO_PACKAGE_NAMES";
    pub const EXC_POOL_PACKAGE: &str = "POOLTRACE_EXC_POOL_PACKAGE";
    pub const POOL_PACKAGE: &str = "POOLTRACE_POOL_PACKAGE";
    pub const NAMESPACE_SEPARATOR: &str = "POOLTRACE_NAMESPACE_SEPARATOR";
}

/// Namespace of the in-crate pool and the wrapper around it
pub const DEFAULT_POOL_PACKAGE: &str = "esox_pooltrace::";

/// Configuration for the trace filter pipeline
///
/// Built once at startup and shared read-only by every event.
///
/// # Examples
///
/// ```
/// use esox_pooltrace::TraceConfig;
///
/// let config = TraceConfig::new()
///     .with_skip_first(2)
///     .with_max_frames(8)
///     .with_strip_qualifier(false);
///
/// assert!(config.enabled);
/// assert_eq!(config.skip_first, 2);
/// assert_eq!(config.max_frames, 8);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TraceConfig {
    /// Master switch; when false nothing is captured or emitted
    pub enabled: bool,

    /// Innermost frames dropped unconditionally (capture and wrapper frames)
    pub skip_first: usize,

    /// Maximum number of frames kept after skipping and exclusion
    pub max_frames: usize,

    /// Display only the last segment of each qualified name
    pub strip_qualifier: bool,

    /// Drop frames whose qualified name starts with `internal_package_prefix`
    pub exclude_internal_package: bool,

    /// Namespace of the pool implementation
    pub internal_package_prefix: String,

    /// Separator between namespace segments of a qualified name
    pub namespace_separator: String,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            skip_first: 3,
            max_frames: 5,
            strip_qualifier: true,
            exclude_internal_package: true,
            internal_package_prefix: DEFAULT_POOL_PACKAGE.to_string(),
            namespace_separator: PATH_SEPARATOR.to_string(),
        }
    }
}

impl TraceConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the configuration from `POOLTRACE_*` environment variables
    ///
    /// Unset variables keep their defaults; malformed ones are an error.
    pub fn from_env() -> TraceResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary key lookup
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_pooltrace::TraceConfig;
    ///
    /// let config = TraceConfig::from_lookup(|key| match key {
    ///     "POOLTRACE_MAX_TRACE" => Some("10".to_string()),
    ///     "POOLTRACE_OFF" => Some("true".to_string()),
    ///     _ => None,
    /// })
    /// .unwrap();
    ///
    /// assert_eq!(config.max_frames, 10);
    /// assert!(!config.enabled);
    /// ```
    pub fn from_lookup<F>(lookup: F) -> TraceResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(off) = lookup(env::OFF) {
            config.enabled = !parse_bool(env::OFF, &off)?;
        }
        if let Some(skip) = lookup(env::SKIP_FIRST) {
            config.skip_first = parse_count(env::SKIP_FIRST, &skip)?;
        }
        if let Some(max) = lookup(env::MAX_TRACE) {
            config.max_frames = parse_count(env::MAX_TRACE, &max)?;
        }
        if let Some(strip) = lookup(env::NO_PACKAGE_NAMES) {
            config.strip_qualifier = parse_bool(env::NO_PACKAGE_NAMES, &strip)?;
        }
        if let Some(exclude) = lookup(env::EXC_POOL_PACKAGE) {
            config.exclude_internal_package = parse_bool(env::EXC_POOL_PACKAGE, &exclude)?;
        }
        if let Some(prefix) = lookup(env::POOL_PACKAGE) {
            config.internal_package_prefix = prefix;
        }
        if let Some(separator) = lookup(env::NAMESPACE_SEPARATOR) {
            config.namespace_separator = separator;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the ranges the pipeline relies on
    pub fn validate(&self) -> TraceResult<()> {
        if self.max_frames == 0 {
            return Err(TraceError::ZeroMaxFrames);
        }
        if self.namespace_separator.is_empty() {
            return Err(TraceError::EmptySeparator);
        }
        // an empty prefix matches every frame and would blank every line
        if self.exclude_internal_package && self.internal_package_prefix.is_empty() {
            return Err(TraceError::EmptyInternalPrefix);
        }
        Ok(())
    }

    /// Turn tracing on or off
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the number of innermost frames to skip
    pub fn with_skip_first(mut self, count: usize) -> Self {
        self.skip_first = count;
        self
    }

    /// Set the maximum number of retained frames
    pub fn with_max_frames(mut self, count: usize) -> Self {
        self.max_frames = count;
        self
    }

    /// Display bare type names instead of qualified ones
    pub fn with_strip_qualifier(mut self, strip: bool) -> Self {
        self.strip_qualifier = strip;
        self
    }

    /// Exclude frames under `prefix` from the trace
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_pooltrace::TraceConfig;
    ///
    /// let config = TraceConfig::new().with_internal_package("deadpool::managed");
    ///
    /// assert!(config.exclude_internal_package);
    /// assert_eq!(config.internal_package_prefix, "deadpool::managed");
    /// ```
    pub fn with_internal_package(mut self, prefix: impl Into<String>) -> Self {
        self.exclude_internal_package = true;
        self.internal_package_prefix = prefix.into();
        self
    }

    /// Keep frames from the pool implementation
    pub fn without_internal_exclusion(mut self) -> Self {
        self.exclude_internal_package = false;
        self
    }

    /// Set the namespace separator, e.g. `"."` for dotted names
    pub fn with_namespace_separator(mut self, separator: impl Into<String>) -> Self {
        self.namespace_separator = separator.into();
        self
    }
}

fn parse_bool(key: &str, value: &str) -> TraceResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(TraceError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            expected: "a boolean",
        }),
    }
}

fn parse_count(key: &str, value: &str) -> TraceResult<usize> {
    value.trim().parse().map_err(|_| TraceError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        expected: "a non-negative integer",
    })
}

/// Configuration for object pool behavior
///
/// # Examples
///
/// ```
/// use esox_pooltrace::PoolConfiguration;
/// use std::time::Duration;
///
/// let config = PoolConfiguration::<i32>::new()
///     .with_max_pool_size(100)
///     .with_max_active_objects(50)
///     .with_timeout(Duration::from_secs(30));
///
/// assert_eq!(config.max_pool_size, 100);
/// assert_eq!(config.max_active_objects, Some(50));
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfiguration<T> {
    /// Maximum number of objects that can exist in the pool
    pub max_pool_size: usize,

    /// Maximum number of objects that can be active (checked out) simultaneously
    pub max_active_objects: Option<usize>,

    /// Validation run when an object is returned; failing objects are discarded
    pub validation_function: Option<fn(&T) -> bool>,

    /// Timeout for async operations
    pub operation_timeout: Option<Duration>,
}

impl<T> Default for PoolConfiguration<T> {
    fn default() -> Self {
        Self {
            max_pool_size: 100,
            max_active_objects: None,
            validation_function: None,
            operation_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl<T> PoolConfiguration<T> {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum pool size
    pub fn with_max_pool_size(mut self, size: usize) -> Self {
        self.max_pool_size = size;
        self
    }

    /// Set the maximum active objects
    pub fn with_max_active_objects(mut self, count: usize) -> Self {
        self.max_active_objects = Some(count);
        self
    }

    /// Enable validation on return
    pub fn with_validation(mut self, func: fn(&T) -> bool) -> Self {
        self.validation_function = Some(func);
        self
    }

    /// Set operation timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }
}
