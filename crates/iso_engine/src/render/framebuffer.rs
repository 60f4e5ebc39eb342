//! # Indexed Framebuffers
//!
//! [`FrameBuffer`] owns a block of 8-bit palette indices. Drawing goes
//! through a [`FrameBufferView`], a borrowed window onto that memory that
//! also carries where it sits in screen space and how far it is zoomed out.
//!
//! ## Coordinates
//!
//! A view's origin and extent are in unzoomed screen pixels. At zoom level
//! `z` each stored pixel covers a `2^z` square of screen pixels, so a view
//! of `cols` stored columns spans `cols << z` screen columns. Memory rows are
//! `stride` bytes apart, which may exceed `cols` when the view is a window
//! onto a wider buffer.

use super::{RenderError, Result};
use crate::foundation::math::{ceil_div, ScreenCoords, ScreenRect};

/// Deepest zoom level a view accepts
pub const MAX_ZOOM: u8 = 15;

/// An owned indexed-colour pixel buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl FrameBuffer {
    /// Create a buffer filled with index 0
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, 0)
    }

    /// Create a buffer filled with one index
    pub fn filled(width: usize, height: usize, colour: u8) -> Self {
        Self {
            width,
            height,
            pixels: vec![colour; width * height],
        }
    }

    /// Width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// All pixels, row-major
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// All pixels, mutable
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// One row of pixels
    pub fn row(&self, y: usize) -> &[u8] {
        &self.pixels[y * self.width..(y + 1) * self.width]
    }

    /// Pixel at a position, `None` outside the buffer
    pub fn pixel(&self, x: usize, y: usize) -> Option<u8> {
        (x < self.width && y < self.height).then(|| self.pixels[y * self.width + x])
    }

    /// Overwrite every pixel
    pub fn fill(&mut self, colour: u8) {
        self.pixels.fill(colour);
    }

    /// A zoom-0 view with its origin at screen (0, 0)
    pub fn view(&mut self) -> FrameBufferView<'_> {
        FrameBufferView {
            cols: self.width,
            rows: self.height,
            stride: self.width,
            origin: ScreenCoords::default(),
            zoom: 0,
            bits: &mut self.pixels,
        }
    }

    /// A view whose top-left pixel shows screen point `origin` at `zoom`
    ///
    /// Fails for zoom levels past [`MAX_ZOOM`].
    pub fn view_at(&mut self, origin: ScreenCoords, zoom: u8) -> Result<FrameBufferView<'_>> {
        check_zoom(zoom)?;
        Ok(FrameBufferView {
            origin,
            zoom,
            ..self.view()
        })
    }
}

/// A borrowed, positioned window onto indexed pixel memory
#[derive(Debug)]
pub struct FrameBufferView<'a> {
    bits: &'a mut [u8],
    cols: usize,
    rows: usize,
    stride: usize,
    origin: ScreenCoords,
    zoom: u8,
}

impl<'a> FrameBufferView<'a> {
    /// Wrap caller-provided memory
    ///
    /// `cols` and `rows` count stored pixels; `pitch` is the number of extra
    /// bytes between the end of one row and the start of the next.
    pub fn new(
        bits: &'a mut [u8],
        cols: usize,
        rows: usize,
        pitch: usize,
        origin: ScreenCoords,
        zoom: u8,
    ) -> Result<Self> {
        let stride = cols + pitch;
        let needed = if rows == 0 { 0 } else { (rows - 1) * stride + cols };
        if bits.len() < needed {
            return Err(RenderError::Format(format!(
                "{cols}x{rows} view with pitch {pitch} needs {needed} bytes, got {}",
                bits.len()
            )));
        }
        check_zoom(zoom)?;
        Ok(Self {
            bits,
            cols,
            rows,
            stride,
            origin,
            zoom,
        })
    }

    /// Screen x of the top-left pixel
    pub fn x(&self) -> i32 {
        self.origin.x
    }

    /// Screen y of the top-left pixel
    pub fn y(&self) -> i32 {
        self.origin.y
    }

    /// Screen position of the top-left pixel
    pub fn origin(&self) -> ScreenCoords {
        self.origin
    }

    /// Zoom level; 0 is full resolution
    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Screen pixels covered by one stored pixel along each axis
    pub fn step(&self) -> i32 {
        1 << self.zoom
    }

    /// Stored columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Stored rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Bytes between the starts of consecutive rows
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Extra bytes after each row
    pub fn pitch(&self) -> usize {
        self.stride - self.cols
    }

    /// Width in screen pixels
    pub fn width(&self) -> i32 {
        (self.cols as i32) << self.zoom
    }

    /// Height in screen pixels
    pub fn height(&self) -> i32 {
        (self.rows as i32) << self.zoom
    }

    /// Screen area this view shows
    pub fn visible_rect(&self) -> ScreenRect {
        ScreenRect::new(self.origin.x, self.origin.y, self.width(), self.height())
    }

    /// Stored pixel at a column/row
    pub fn pixel(&self, col: usize, row: usize) -> Option<u8> {
        (col < self.cols && row < self.rows).then(|| self.bits[row * self.stride + col])
    }

    /// Overwrite a stored pixel, ignoring positions outside the view
    pub fn set_pixel(&mut self, col: usize, row: usize, colour: u8) {
        if col < self.cols && row < self.rows {
            self.bits[row * self.stride + col] = colour;
        }
    }

    /// One stored row
    pub fn row_mut(&mut self, row: usize) -> &mut [u8] {
        let start = row * self.stride;
        &mut self.bits[start..start + self.cols]
    }

    /// Stored column/row showing a screen point, if visible
    pub fn to_local(&self, point: ScreenCoords) -> Option<(usize, usize)> {
        let col = (point.x - self.origin.x).div_euclid(self.step());
        let row = (point.y - self.origin.y).div_euclid(self.step());
        (col >= 0 && row >= 0 && (col as usize) < self.cols && (row as usize) < self.rows)
            .then_some((col as usize, row as usize))
    }

    /// Stored column range sampling screen columns `[left, right)`
    pub(crate) fn col_range(&self, left: i32, right: i32) -> (usize, usize) {
        sample_range(left, right, self.origin.x, self.cols, self.zoom)
    }

    /// Stored row range sampling screen rows `[top, bottom)`
    pub(crate) fn row_range(&self, top: i32, bottom: i32) -> (usize, usize) {
        sample_range(top, bottom, self.origin.y, self.rows, self.zoom)
    }

    /// Screen x sampled by a stored column
    pub(crate) fn screen_x(&self, col: usize) -> i32 {
        self.origin.x + ((col as i32) << self.zoom)
    }

    /// Screen y sampled by a stored row
    pub(crate) fn screen_y(&self, row: usize) -> i32 {
        self.origin.y + ((row as i32) << self.zoom)
    }

    /// Raw memory of the view
    pub(crate) fn bits_mut(&mut self) -> &mut [u8] {
        &mut *self.bits
    }

    /// A shorter-lived view onto the same memory
    pub fn reborrow(&mut self) -> FrameBufferView<'_> {
        FrameBufferView {
            bits: &mut *self.bits,
            cols: self.cols,
            rows: self.rows,
            stride: self.stride,
            origin: self.origin,
            zoom: self.zoom,
        }
    }

    /// A sub-view covering the part of `rect` this view shows
    ///
    /// The sub-view keeps this view's zoom and screen coordinate frame.
    /// Returns `None` when nothing of `rect` is visible.
    pub fn crop(&mut self, rect: ScreenRect) -> Option<FrameBufferView<'_>> {
        let (c0, c1) = self.col_range(rect.left, rect.right);
        let (r0, r1) = self.row_range(rect.top, rect.bottom);
        if c0 >= c1 || r0 >= r1 {
            return None;
        }
        let origin = ScreenCoords::new(self.screen_x(c0), self.screen_y(r0));
        let start = r0 * self.stride + c0;
        Some(FrameBufferView {
            bits: &mut self.bits[start..],
            cols: c1 - c0,
            rows: r1 - r0,
            stride: self.stride,
            origin,
            zoom: self.zoom,
        })
    }

    /// A zoom-0 sub-view of stored pixels `(x, y, width, height)`
    ///
    /// Coordinates are relative to the view's stored pixels. The sub-view's
    /// origin is expressed relative to the clip rectangle, so drawing at
    /// `(0, 0)` lands on the rectangle's top-left corner; a clip that starts
    /// left of or above the view gets a positive origin instead.
    pub fn clip(&mut self, x: i32, y: i32, width: i32, height: i32) -> Option<FrameBufferView<'_>> {
        let bounds = ScreenRect::new(0, 0, self.cols as i32, self.rows as i32);
        let area = ScreenRect::new(x, y, width, height).intersect(&bounds)?;
        let start = area.top as usize * self.stride + area.left as usize;
        Some(FrameBufferView {
            bits: &mut self.bits[start..],
            cols: area.width() as usize,
            rows: area.height() as usize,
            stride: self.stride,
            origin: ScreenCoords::new(area.left - x, area.top - y),
            zoom: 0,
        })
    }

    /// The same memory seen one zoom level closer, at half the coordinates
    ///
    /// Used to draw hand-made half-size sprites in place of downsampling.
    /// `None` at zoom 0.
    pub fn zoomed_out(&mut self) -> Option<FrameBufferView<'_>> {
        if self.zoom == 0 {
            return None;
        }
        Some(FrameBufferView {
            bits: &mut *self.bits,
            cols: self.cols,
            rows: self.rows,
            stride: self.stride,
            origin: ScreenCoords::new(self.origin.x >> 1, self.origin.y >> 1),
            zoom: self.zoom - 1,
        })
    }
}

fn check_zoom(zoom: u8) -> Result<()> {
    if zoom > MAX_ZOOM {
        return Err(RenderError::Format(format!("zoom level {zoom} is out of range")));
    }
    Ok(())
}

/// Stored index range whose samples fall in screen span `[start, end)`
///
/// A stored pixel samples the screen position of its top-left corner, so the
/// range covers every stored pixel `i` with `start <= origin + i * 2^zoom < end`,
/// clamped to `0..len`.
pub(crate) fn sample_range(start: i32, end: i32, origin: i32, len: usize, zoom: u8) -> (usize, usize) {
    let step = 1 << zoom;
    let first = ceil_div(start - origin, step).clamp(0, len as i32);
    let last = ceil_div(end - origin, step).clamp(0, len as i32);
    (first as usize, last.max(first) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_dimensions_follow_zoom() {
        let mut fb = FrameBuffer::new(8, 4);
        let view = fb.view_at(ScreenCoords::new(-16, 32), 2).unwrap();
        assert_eq!(view.width(), 32);
        assert_eq!(view.height(), 16);
        assert_eq!(view.visible_rect(), ScreenRect::new(-16, 32, 32, 16));
    }

    #[test]
    fn test_view_at_rejects_deep_zoom() {
        let mut fb = FrameBuffer::new(4, 4);
        assert!(matches!(fb.view_at(ScreenCoords::default(), 40), Err(RenderError::Format(_))));
        assert!(fb.view_at(ScreenCoords::default(), MAX_ZOOM + 1).is_err());

        let view = fb.view_at(ScreenCoords::default(), MAX_ZOOM).unwrap();
        assert_eq!(view.width(), 4 << MAX_ZOOM);
    }

    #[test]
    fn test_new_checks_memory_size() {
        let mut bits = vec![0u8; 14];
        assert!(FrameBufferView::new(&mut bits, 4, 3, 0, ScreenCoords::default(), 0).is_ok());
        // the last row needs no pitch: 2 * 5 + 4 bytes
        assert!(FrameBufferView::new(&mut bits, 4, 3, 1, ScreenCoords::default(), 0).is_ok());
        assert!(FrameBufferView::new(&mut bits, 4, 3, 2, ScreenCoords::default(), 0).is_err());
    }

    #[test]
    fn test_clip_origin_is_relative() {
        let mut fb = FrameBuffer::new(10, 10);
        let mut view = fb.view();
        let mut sub = view.clip(2, 3, 4, 4).unwrap();
        assert_eq!(sub.origin(), ScreenCoords::new(0, 0));
        assert_eq!((sub.cols(), sub.rows()), (4, 4));
        assert_eq!(sub.pitch(), 6);
        sub.set_pixel(0, 0, 9);
        assert_eq!(fb.pixel(2, 3), Some(9));
    }

    #[test]
    fn test_clip_past_the_edge() {
        let mut fb = FrameBuffer::new(10, 10);
        let mut view = fb.view();
        let sub = view.clip(-2, 8, 5, 5).unwrap();
        assert_eq!(sub.origin(), ScreenCoords::new(2, 0));
        assert_eq!((sub.cols(), sub.rows()), (3, 2));
        assert!(view.clip(10, 0, 4, 4).is_none());
    }

    #[test]
    fn test_crop_keeps_coordinate_frame() {
        let mut fb = FrameBuffer::new(8, 8);
        let mut view = fb.view_at(ScreenCoords::new(100, 100), 1).unwrap();
        let mut sub = view.crop(ScreenRect::new(103, 104, 6, 4)).unwrap();
        // columns sampling 104, 106, 108
        assert_eq!(sub.origin(), ScreenCoords::new(104, 104));
        assert_eq!((sub.cols(), sub.rows()), (3, 2));
        sub.set_pixel(0, 0, 5);
        assert_eq!(fb.pixel(2, 2), Some(5));
    }

    #[test]
    fn test_zoomed_out_halves_origin() {
        let mut fb = FrameBuffer::new(4, 4);
        let mut view = fb.view_at(ScreenCoords::new(-9, 20), 2).unwrap();
        let half = view.zoomed_out().unwrap();
        assert_eq!(half.origin(), ScreenCoords::new(-5, 10));
        assert_eq!(half.zoom(), 1);
        assert_eq!(half.cols(), 4);

        let mut flat = fb.view();
        assert!(flat.zoomed_out().is_none());
    }

    #[test]
    fn test_to_local() {
        let mut fb = FrameBuffer::new(4, 4);
        let view = fb.view_at(ScreenCoords::new(10, 10), 1).unwrap();
        assert_eq!(view.to_local(ScreenCoords::new(13, 10)), Some((1, 0)));
        assert_eq!(view.to_local(ScreenCoords::new(9, 10)), None);
        assert_eq!(view.to_local(ScreenCoords::new(18, 10)), None);
    }
}
