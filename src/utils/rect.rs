/// An axis-aligned rectangle in pixel coordinates, with the origin at the
/// top-left corner of the parent image.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub width: u32,
    pub height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

impl Rect {
    #[inline]
    pub fn new(width: u32, height: u32, offset_x: u32, offset_y: u32) -> Self {
        Rect {
            width,
            height,
            offset_x,
            offset_y,
        }
    }

    /// Checks that this rectangle fits entirely inside a `(width, height)`
    /// sized parent.
    #[inline]
    pub fn fits_in(&self, width: u32, height: u32) -> bool {
        self.offset_x.checked_add(self.width).map_or(false, |r| r <= width)
            && self.offset_y.checked_add(self.height).map_or(false, |b| b <= height)
    }
}
