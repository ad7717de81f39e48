/// Axis-aligned rectangle in image-pixel coordinates.
///
/// Detector output is expressed relative to whatever image was searched, so
/// the same type carries both frame-global and face-local rectangles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge. Widened so detector output near `i32::MAX` cannot overflow.
    pub fn right(&self) -> i64 {
        i64::from(self.x) + i64::from(self.width)
    }

    pub fn bottom(&self) -> i64 {
        i64::from(self.y) + i64::from(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Translates a rectangle found inside `origin` into the coordinate
    /// space `origin` itself lives in.
    pub fn offset_by(&self, origin: &Rect) -> Rect {
        Rect {
            x: origin.x.saturating_add(self.x),
            y: origin.y.saturating_add(self.y),
            width: self.width,
            height: self.height,
        }
    }

    /// True when the rectangle is non-empty and lies entirely inside an
    /// image of the given dimensions.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        !self.is_empty()
            && self.x >= 0
            && self.y >= 0
            && self.right() <= i64::from(width)
            && self.bottom() <= i64::from(height)
    }
}
