//! The visible window: the main-axis range eligible for live views.

/// A main-axis range `[from, to]` expanded by the over-render buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleWindow {
    pub from: f32,
    pub to: f32,
}

impl VisibleWindow {
    /// Window around a viewport at `offset` (relative to the collection) with
    /// the given `extent`, expanded by `buffer` on both sides.
    ///
    /// ```
    /// use horizon_recycler::VisibleWindow;
    ///
    /// let window = VisibleWindow::around(2000.0, 500.0, 200.0);
    /// assert_eq!(window, VisibleWindow { from: 1800.0, to: 2700.0 });
    ///
    /// // The start never goes negative.
    /// assert_eq!(VisibleWindow::around(50.0, 500.0, 200.0).from, 0.0);
    /// ```
    pub fn around(offset: f32, extent: f32, buffer: f32) -> Self {
        Self {
            from: (offset - buffer).max(0.0),
            to: offset + extent + buffer,
        }
    }

    /// The window of a collection with no viewport of its own.
    pub fn unbounded() -> Self {
        Self {
            from: 0.0,
            to: f32::INFINITY,
        }
    }

    /// An item spanning `[start, end)` ends before the window begins.
    #[inline]
    pub fn is_before(&self, end: f32) -> bool {
        end < self.from
    }

    /// An item starting at `start` begins after the window ends.
    #[inline]
    pub fn is_after(&self, start: f32) -> bool {
        start > self.to
    }

    /// Whether an item spanning `[start, end)` needs a live view.
    #[inline]
    pub fn intersects(&self, start: f32, end: f32) -> bool {
        !self.is_before(end) && !self.is_after(start)
    }
}
