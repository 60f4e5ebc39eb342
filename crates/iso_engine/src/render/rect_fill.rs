//! # Rectangle Fills
//!
//! Solid, dithered, patterned and palette-filtered rectangles plus outline
//! and line helpers. All of them clip against a [`FrameBufferView`] exactly
//! like sprite drawing does, and a rectangle that misses the view is a no-op.
//!
//! Dithers and patterns are keyed to absolute stored-pixel coordinates, so
//! neighbouring fills tile seamlessly and stay put while the view scrolls.
//!
//! UI code passes colours packed into a `u32`: the low byte is the palette
//! index and the [`CROSS_HATCH`], [`FILTER`] and [`PATTERN`] bits pick the
//! style. [`fill_rect_packed`] decodes them; a filter colour names the
//! palette ref whose table recolours the rectangle.

use super::framebuffer::FrameBufferView;
use super::palette::{ColourRemaps, PaletteRemap};
use super::Result;
use crate::assets::SpriteSheet;
use crate::foundation::math::{ScreenCoords, ScreenRect};

/// Packed-colour bit selecting a checkerboard fill
pub const CROSS_HATCH: u32 = 0x0100_0000;
/// Packed-colour bit selecting a palette filter
pub const FILTER: u32 = 0x0200_0000;
/// Packed-colour bit selecting a pattern fill; bits 28..31 pick the pattern
pub const PATTERN: u32 = 0x0400_0000;

const PATTERN_SHIFT: u32 = 28;

/// Number of pre-baked fill patterns
pub const PATTERN_COUNT: usize = 16;

/// Pattern 0: a diagonal band
const DIAGONAL: [u16; 16] = [
    0b0111_1111_1000_0000,
    0b0011_1111_1100_0000,
    0b0001_1111_1110_0000,
    0b0000_1111_1111_0000,
    0b0000_0111_1111_1000,
    0b0000_0011_1111_1100,
    0b0000_0001_1111_1110,
    0b0000_0000_1111_1111,
    0b1000_0000_0111_1111,
    0b1100_0000_0011_1111,
    0b1110_0000_0001_1111,
    0b1111_0000_0000_1111,
    0b1111_1000_0000_0111,
    0b1111_1100_0000_0011,
    0b1111_1110_0000_0001,
    0b1111_1111_0000_0000,
];

/// Sixteen 16x16 bit patterns, one `u16` per row with bit `x` for column `x`
///
/// Even ids are the diagonal band, odd ids its inverse; id `2k` and `2k + 1`
/// start `2k` rows further down the band.
pub static PATTERNS: [[u16; 16]; PATTERN_COUNT] = build_patterns();

const fn build_patterns() -> [[u16; 16]; PATTERN_COUNT] {
    let mut patterns = [[0u16; 16]; PATTERN_COUNT];
    let mut id = 0;
    while id < PATTERN_COUNT {
        let shift = (id >> 1) * 2;
        let mut row = 0;
        while row < 16 {
            let bits = DIAGONAL[(row + shift) % 16];
            patterns[id][row] = if id & 1 == 0 { bits } else { !bits };
            row += 1;
        }
        id += 1;
    }
    patterns
}

/// How a rectangle combines with the destination
#[derive(Debug, Clone, Copy)]
pub enum FillStyle<'a> {
    /// Every pixel takes the colour
    Solid,
    /// Pixels with even absolute `x + y` take the colour
    CrossHatch,
    /// Every pixel is replaced by `table[pixel]`; the colour is ignored
    IndirectPaletteLookup(&'a PaletteRemap),
    /// Set bits of the numbered pattern take the colour
    PatternTable(u8),
}

/// The style a packed colour asks for, before any table is looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackedStyle {
    /// Plain colour
    Solid,
    /// Checkerboard in the colour
    CrossHatch,
    /// Recolour through the table of the palette ref in the colour byte
    Filter,
    /// Numbered pattern in the colour
    PatternTable(u8),
}

impl PackedStyle {
    /// Split a packed UI colour into its index and style
    ///
    /// Cross-hatching wins over a filter, and a filter over a pattern.
    pub fn from_packed(colour: u32) -> (u8, Self) {
        let index = (colour & 0xFF) as u8;
        let style = if colour & CROSS_HATCH != 0 {
            Self::CrossHatch
        } else if colour & FILTER != 0 {
            Self::Filter
        } else if colour & PATTERN != 0 {
            Self::PatternTable((colour >> PATTERN_SHIFT) as u8)
        } else {
            Self::Solid
        };
        (index, style)
    }
}

/// Fill `rect` (screen coordinates, exclusive right/bottom)
pub fn fill_rect(view: &mut FrameBufferView<'_>, rect: ScreenRect, colour: u8, style: FillStyle<'_>) {
    let (c0, c1) = view.col_range(rect.left, rect.right);
    let (r0, r1) = view.row_range(rect.top, rect.bottom);
    if c0 >= c1 || r0 >= r1 {
        return;
    }

    let zoom = view.zoom();
    let abs_x = view.x() >> zoom;
    let abs_y = view.y() >> zoom;
    let stride = view.stride();
    let bits = view.bits_mut();

    for r in r0..r1 {
        let row = &mut bits[r * stride + c0..r * stride + c1];
        let y = abs_y + r as i32;
        match style {
            FillStyle::Solid => row.fill(colour),
            FillStyle::CrossHatch => {
                for (i, pixel) in row.iter_mut().enumerate() {
                    if (abs_x + (c0 + i) as i32 + y) & 1 == 0 {
                        *pixel = colour;
                    }
                }
            }
            FillStyle::IndirectPaletteLookup(table) => {
                for pixel in row.iter_mut() {
                    *pixel = table.get(*pixel);
                }
            }
            FillStyle::PatternTable(id) => {
                let pattern = PATTERNS[usize::from(id) % PATTERN_COUNT][y.rem_euclid(16) as usize];
                for (i, pixel) in row.iter_mut().enumerate() {
                    let x = (abs_x + (c0 + i) as i32).rem_euclid(16);
                    if pattern & (1 << x) != 0 {
                        *pixel = colour;
                    }
                }
            }
        }
    }
}

/// Fill `rect` with a packed UI colour
///
/// Filter colours resolve their table through `remaps`; a palette ref with
/// no table is an error and leaves the view untouched.
pub fn fill_rect_packed(
    view: &mut FrameBufferView<'_>,
    rect: ScreenRect,
    colour: u32,
    sheet: &SpriteSheet,
    remaps: &mut ColourRemaps,
) -> Result<()> {
    let (index, style) = PackedStyle::from_packed(colour);
    let style = match style {
        PackedStyle::Solid => FillStyle::Solid,
        PackedStyle::CrossHatch => FillStyle::CrossHatch,
        PackedStyle::PatternTable(id) => FillStyle::PatternTable(id),
        PackedStyle::Filter => {
            let table = remaps.table_for(sheet, index)?;
            fill_rect(view, rect, index, FillStyle::IndirectPaletteLookup(table));
            return Ok(());
        }
    };
    fill_rect(view, rect, index, style);
    Ok(())
}

/// Recolour what is already inside `rect` through `table`
pub fn filter_rect(view: &mut FrameBufferView<'_>, rect: ScreenRect, table: &PaletteRemap) {
    fill_rect(view, rect, 0, FillStyle::IndirectPaletteLookup(table));
}

/// Draw a solid border of `thickness` pixels just inside `rect`
pub fn stroke_rect(view: &mut FrameBufferView<'_>, rect: ScreenRect, thickness: i32, colour: u8) {
    if thickness <= 0 || rect.is_empty() {
        return;
    }
    let t = thickness.min(rect.width()).min(rect.height());
    let ScreenRect { left, top, right, bottom } = rect;
    fill_rect(view, ScreenRect::from_edges(left, top, right, top + t), colour, FillStyle::Solid);
    fill_rect(view, ScreenRect::from_edges(left, bottom - t, right, bottom), colour, FillStyle::Solid);
    fill_rect(view, ScreenRect::from_edges(left, top + t, left + t, bottom - t), colour, FillStyle::Solid);
    fill_rect(view, ScreenRect::from_edges(right - t, top + t, right, bottom - t), colour, FillStyle::Solid);
}

/// Draw a one-pixel line between two screen points, both ends included
///
/// Zoomed views draw the line between the stored pixels showing each end.
pub fn draw_line(view: &mut FrameBufferView<'_>, from: ScreenCoords, to: ScreenCoords, colour: u8) {
    let step = view.step();
    let local = |p: ScreenCoords| {
        (
            (p.x - view.x()).div_euclid(step),
            (p.y - view.y()).div_euclid(step),
        )
    };
    let (x0, y0) = local(from);
    let (x1, y1) = local(to);

    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (x0, y0);

    loop {
        if x >= 0 && y >= 0 {
            view.set_pixel(x as usize, y as usize, colour);
        }
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Fill the whole view with one colour
pub fn clear(view: &mut FrameBufferView<'_>, colour: u8) {
    let rect = view.visible_rect();
    fill_rect(view, rect, colour, FillStyle::Solid);
}
