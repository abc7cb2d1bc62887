//! Well-known metric and dimension names.
//!
//! These are the canonical names the agent uses when forwarding a
//! measurement to the metrics backend: one datum per metric, each tagged
//! with the measurement source as a dimension.

/// Air temperature in degrees Celsius.
pub const METRIC_TEMPERATURE: &str = "temperature";

/// Relative humidity as a percentage (0-100).
pub const METRIC_HUMIDITY: &str = "humidity";

/// Dimension carrying the measurement source name.
pub const DIMENSION_SOURCE: &str = "source";

/// Default namespace metrics are published under.
pub const DEFAULT_NAMESPACE: &str = "TempMetrics";
