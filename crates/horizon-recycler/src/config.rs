//! Collection configuration.
//!
//! [`CollectionConfig`] can be built in code with the `with_*` methods or
//! loaded from TOML:
//!
//! ```
//! use horizon_recycler::{Axis, CollectionConfig};
//!
//! let config = CollectionConfig::from_toml_str(r#"
//!     axis = "horizontal"
//!     overrender_buffer = 320.0
//!     leading_padding = 8.0
//! "#).unwrap();
//!
//! assert_eq!(config.axis, Axis::Horizontal);
//! assert_eq!(config.overrender_buffer, 320.0);
//! assert_eq!(config.trailing_padding, 0.0);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RecyclerError, Result};
use crate::geometry::Axis;

/// Distance rendered beyond each edge of the viewport by default.
pub const DEFAULT_OVERRENDER_BUFFER: f32 = 200.0;

/// Tuning for one virtualized collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// Scroll direction. Fixed once the collection has been laid out.
    pub axis: Axis,
    /// Space before the first item.
    pub leading_padding: f32,
    /// Space after the last item.
    pub trailing_padding: f32,
    /// Extra main-axis distance kept live on both sides of the viewport.
    pub overrender_buffer: f32,
    /// Minimum spacing between scroll-driven passes, in milliseconds.
    pub frame_interval_ms: u64,
    /// Time after which a scroll-driven pass is abandoned, in milliseconds.
    pub scroll_pass_timeout_ms: u64,
    /// The collection is nested in another virtualized collection and has no
    /// viewport of its own; every item is arranged.
    pub nested: bool,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            axis: Axis::Vertical,
            leading_padding: 0.0,
            trailing_padding: 0.0,
            overrender_buffer: DEFAULT_OVERRENDER_BUFFER,
            frame_interval_ms: 16,
            scroll_pass_timeout_ms: 1000,
            nested: false,
        }
    }
}

impl CollectionConfig {
    /// Parse and validate a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML text.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| RecyclerError::InvalidConfig(e.to_string()))
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        let lengths = [
            ("leading_padding", self.leading_padding),
            ("trailing_padding", self.trailing_padding),
            ("overrender_buffer", self.overrender_buffer),
        ];
        for (name, value) in lengths {
            if !value.is_finite() || value < 0.0 {
                return Err(RecyclerError::InvalidConfig(format!(
                    "{name} must be a finite, non-negative length (got {value})"
                )));
            }
        }
        if self.frame_interval_ms == 0 {
            return Err(RecyclerError::InvalidConfig(
                "frame_interval_ms must be greater than zero".into(),
            ));
        }
        if self.scroll_pass_timeout_ms <= self.frame_interval_ms {
            return Err(RecyclerError::InvalidConfig(
                "scroll_pass_timeout_ms must exceed frame_interval_ms".into(),
            ));
        }
        Ok(())
    }

    /// Spacing between scroll-driven passes.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    /// Abandonment timeout for scroll-driven passes.
    pub fn scroll_pass_timeout(&self) -> Duration {
        Duration::from_millis(self.scroll_pass_timeout_ms)
    }

    /// Set the scroll direction.
    pub fn with_axis(mut self, axis: Axis) -> Self {
        self.axis = axis;
        self
    }

    /// Set leading and trailing padding.
    pub fn with_padding(mut self, leading: f32, trailing: f32) -> Self {
        self.leading_padding = leading;
        self.trailing_padding = trailing;
        self
    }

    /// Set the over-render buffer.
    pub fn with_overrender_buffer(mut self, buffer: f32) -> Self {
        self.overrender_buffer = buffer;
        self
    }

    /// Set the throttle interval.
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the scroll pass timeout.
    pub fn with_scroll_pass_timeout(mut self, timeout: Duration) -> Self {
        self.scroll_pass_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Mark the collection as nested inside another virtualized collection.
    pub fn with_nested(mut self, nested: bool) -> Self {
        self.nested = nested;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CollectionConfig::default();
        assert_eq!(config.overrender_buffer, 200.0);
        assert_eq!(config.frame_interval(), Duration::from_millis(16));
        assert_eq!(config.scroll_pass_timeout(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = CollectionConfig::default()
            .with_axis(Axis::Horizontal)
            .with_padding(10.0, 20.0)
            .with_overrender_buffer(0.0)
            .with_nested(true);
        assert_eq!(config.axis, Axis::Horizontal);
        assert_eq!(config.leading_padding, 10.0);
        assert_eq!(config.trailing_padding, 20.0);
        assert!(config.nested);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = CollectionConfig::from_toml_str("").unwrap();
        assert_eq!(config, CollectionConfig::default());
    }

    #[test]
    fn test_toml_roundtrip_preserves_tuning() {
        let config = CollectionConfig::default().with_padding(4.0, 12.0);
        let text = config.to_toml_string().unwrap();
        assert_eq!(CollectionConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_rejects_negative_buffer() {
        let err = CollectionConfig::from_toml_str("overrender_buffer = -5.0").unwrap_err();
        assert!(matches!(err, RecyclerError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_zero_interval() {
        let config = CollectionConfig::default().with_frame_interval(Duration::ZERO);
        assert!(matches!(config.validate(), Err(RecyclerError::InvalidConfig(_))));
    }

    #[test]
    fn test_parse_error() {
        let err = CollectionConfig::from_toml_str("axis = \"diagonal\"").unwrap_err();
        assert!(matches!(err, RecyclerError::ConfigParse(_)));
    }
}
