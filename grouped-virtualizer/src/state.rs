/// Viewport geometry handed to a window manager for one layout pass.
///
/// With `feature = "serde"`, this type implements `Serialize`/`Deserialize`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Viewport {
    /// Distance from the panel origin to the top (or left) edge of the visible area, in pixels.
    ///
    /// This is the panel-relative position: for a nested panel it is already translated into
    /// that panel's coordinates and may be negative when the panel starts below the viewport.
    pub offset: f64,
    /// Visible size along the scroll axis, in pixels.
    pub size: f64,
    /// Scroll position in flattened units (headers + items). Only read by item-unit scrolling.
    pub scroll_position: usize,
}

impl Viewport {
    pub fn new(offset: f64, size: f64) -> Self {
        Self {
            offset,
            size,
            scroll_position: 0,
        }
    }

    /// Viewport for item-unit scrolling: `scroll_position` selects the first visible slot.
    pub fn at_position(scroll_position: usize, size: f64) -> Self {
        Self {
            offset: 0.0,
            size,
            scroll_position,
        }
    }

    pub fn end(&self) -> f64 {
        self.offset + self.size
    }

    /// Returns this viewport expressed in the coordinates of a child panel whose origin sits at
    /// `origin` inside the current panel.
    pub fn translated(&self, origin: f64) -> Self {
        Self {
            offset: self.offset - origin,
            size: self.size,
            scroll_position: self.scroll_position,
        }
    }
}
