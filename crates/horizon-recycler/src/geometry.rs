//! Main-axis geometry.
//!
//! Views report their full two-dimensional geometry; the engine only ever
//! reasons about one axis at a time, so everything is projected onto the
//! collection's [`Axis`] as early as possible.

use serde::{Deserialize, Serialize};

/// The scroll direction along which extents and offsets are computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Items stack top to bottom.
    #[default]
    Vertical,
    /// Items stack left to right.
    Horizontal,
}

/// Margins around a view.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Insets {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Insets {
    /// Equal margins on every side.
    pub const fn uniform(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    /// Margin before the view along `axis`.
    pub fn leading(&self, axis: Axis) -> f32 {
        match axis {
            Axis::Vertical => self.top,
            Axis::Horizontal => self.left,
        }
    }

    /// Margin after the view along `axis`.
    pub fn trailing(&self, axis: Axis) -> f32 {
        match axis {
            Axis::Vertical => self.bottom,
            Axis::Horizontal => self.right,
        }
    }
}

/// Settled geometry of a rendered view, as reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: Insets,
}

impl ViewGeometry {
    /// Geometry with no margins.
    pub const fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            margin: Insets::uniform(0.0),
        }
    }

    /// Builder-style margin setter.
    pub const fn with_margin(mut self, margin: Insets) -> Self {
        self.margin = margin;
        self
    }

    /// Project onto `axis`.
    ///
    /// The extent covers both margins so that consecutive items never overlap.
    pub fn along(&self, axis: Axis) -> ItemSize {
        let size = match axis {
            Axis::Vertical => self.height,
            Axis::Horizontal => self.width,
        };
        let leading = self.margin.leading(axis);
        ItemSize {
            leading_margin: leading,
            extent: leading + size + self.margin.trailing(axis),
        }
    }
}

/// An item's footprint along the main axis.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ItemSize {
    /// Space before the item's visible content.
    pub leading_margin: f32,
    /// Total space the item occupies, margins included.
    pub extent: f32,
}

impl ItemSize {
    /// A margin-less size.
    pub const fn new(extent: f32) -> Self {
        Self {
            leading_margin: 0.0,
            extent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_along_includes_both_margins() {
        let geometry = ViewGeometry::new(300.0, 40.0).with_margin(Insets {
            top: 4.0,
            right: 1.0,
            bottom: 6.0,
            left: 2.0,
        });

        let vertical = geometry.along(Axis::Vertical);
        assert_eq!(vertical.leading_margin, 4.0);
        assert_eq!(vertical.extent, 50.0);

        let horizontal = geometry.along(Axis::Horizontal);
        assert_eq!(horizontal.leading_margin, 2.0);
        assert_eq!(horizontal.extent, 303.0);
    }

    #[test]
    fn test_axis_serde_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            axis: Axis,
        }
        let parsed: Wrapper = toml::from_str("axis = \"horizontal\"").unwrap();
        assert_eq!(parsed.axis, Axis::Horizontal);
    }
}
