//! # Pixel Compositor
//!
//! Draws sheet sprites into a [`FrameBufferView`], honouring clipping, zoom,
//! RLE runs, transparency and palette remaps.
//!
//! ## Sampling
//!
//! Each stored pixel of the view samples the screen point at its top-left
//! corner. A sprite drawn with its top-left at screen `(left, top)` supplies
//! source pixel `(sx - left, sy - top)` to the stored pixel sampling
//! `(sx, sy)`. At zoom 0 this is a plain copy; at zoom `z` it reads every
//! `2^z`-th source pixel and row. Raw and RLE sprites go through the same
//! rule, so both encodings of one image draw identically at every zoom.
//!
//! ## Modes
//!
//! [`CompositeMode`] is resolved once per call and the pixel loop is
//! instantiated per mode, so no branching on the mode happens per pixel.

use super::framebuffer::{sample_range, FrameBufferView};
use super::image_id::ImageId;
use super::palette::{ColourRemaps, MixTable, PaletteRemap, IDENTITY};
use super::{RenderError, Result};
use crate::assets::{rle, SpriteDescriptor, SpriteFlags, SpriteSheet};
use crate::foundation::math::ScreenCoords;

/// How source pixels combine with the destination
#[derive(Debug, Clone, Copy)]
pub enum CompositeMode<'a> {
    /// Destination takes the source pixel unconditionally
    Raw,
    /// Non-zero source pixels are written through the remap
    PaletteIndexed(&'a PaletteRemap),
    /// Non-zero source pixels replace the destination with
    /// `table[(src << 8) | dst]`
    BackgroundMix(&'a MixTable),
    /// The source is ANDed with the `mask` element, then non-zero results are
    /// written through the remap
    Masked {
        /// Sheet index of the mask bitmap
        mask: u32,
        /// Remap applied to the masked colour
        remap: &'a PaletteRemap,
    },
}

/// The mode a sprite gets when no recolouring is requested
///
/// Keyed bitmaps and RLE sprites treat index 0 as transparent; other
/// bitmaps are copied verbatim.
pub fn default_mode(sprite: &SpriteDescriptor) -> CompositeMode<'static> {
    if sprite.flags.intersects(SpriteFlags::BMP | SpriteFlags::RLE_COMPRESSION) {
        CompositeMode::PaletteIndexed(&IDENTITY)
    } else {
        CompositeMode::Raw
    }
}

/// Draw sheet element `id` with its origin at screen `pos`
///
/// Fully clipped sprites return `Ok` without writing anything. When zoomed
/// out, elements with a hand-drawn sibling draw the sibling at half the
/// coordinates one zoom level closer, and `NO_ZOOM_DRAW` elements draw
/// nothing. In [`CompositeMode::Masked`] the mask's flags pick the sibling
/// pair. Uncompressed elements flagged `SKIP_BITMAP` never draw.
pub fn composite(
    view: &mut FrameBufferView<'_>,
    sheet: &SpriteSheet,
    id: u32,
    pos: ScreenCoords,
    mode: CompositeMode<'_>,
) -> Result<()> {
    let sprite = sheet.get(id)?;

    if view.zoom() > 0 {
        if let Some((sibling, mode)) = zoomed_sibling(sheet, id, mode)? {
            if let Some(mut half) = view.zoomed_out() {
                return composite(&mut half, sheet, sibling, ScreenCoords::new(pos.x >> 1, pos.y >> 1), mode);
            }
        }
        if skips_when_zoomed(sheet, id, mode)? {
            return Ok(());
        }
    }
    if sprite.skips_drawing() {
        return Ok(());
    }

    match mode {
        CompositeMode::Raw => blit(view, sprite, drawable_pixels(sheet, id)?, pos, CopyOp),
        CompositeMode::PaletteIndexed(remap) => blit(view, sprite, drawable_pixels(sheet, id)?, pos, IndexedOp(remap)),
        CompositeMode::BackgroundMix(table) => blit(view, sprite, drawable_pixels(sheet, id)?, pos, MixOp(table)),
        CompositeMode::Masked { mask, remap } => blit_masked(view, sheet, mask, id, pos, remap),
    }
}

/// Draw `colour` through `mask`, both uncompressed bitmaps
///
/// The drawn area is the overlap of both bitmaps, positioned by the mask's
/// draw offset. A pixel is written when `colour & mask` is non-zero.
pub fn composite_masked(
    view: &mut FrameBufferView<'_>,
    sheet: &SpriteSheet,
    mask: u32,
    colour: u32,
    pos: ScreenCoords,
    remap: &PaletteRemap,
) -> Result<()> {
    composite(view, sheet, colour, pos, CompositeMode::Masked { mask, remap })
}

/// The element and mode to draw one zoom level closer instead of `id`
fn zoomed_sibling<'m>(sheet: &SpriteSheet, id: u32, mode: CompositeMode<'m>) -> Result<Option<(u32, CompositeMode<'m>)>> {
    let sprite = sheet.get(id)?;
    if let CompositeMode::Masked { mask, remap } = mode {
        let Some(mask_sibling) = sheet.get(mask)?.zoomed_id(mask) else {
            return Ok(None);
        };
        let colour = sprite.zoomed_id(id).unwrap_or(id);
        return Ok(Some((colour, CompositeMode::Masked { mask: mask_sibling, remap })));
    }
    Ok(sprite.zoomed_id(id).map(|sibling| (sibling, mode)))
}

fn skips_when_zoomed(sheet: &SpriteSheet, id: u32, mode: CompositeMode<'_>) -> Result<bool> {
    let mut skip = sheet.get(id)?.flags.contains(SpriteFlags::NO_ZOOM_DRAW);
    if let CompositeMode::Masked { mask, .. } = mode {
        skip |= sheet.get(mask)?.flags.contains(SpriteFlags::NO_ZOOM_DRAW);
    }
    Ok(skip)
}

fn drawable_pixels(sheet: &SpriteSheet, id: u32) -> Result<&[u8]> {
    if sheet.get(id)?.is_palette() {
        return Err(RenderError::Format(format!("element {id} is a palette, not a sprite")));
    }
    Ok(sheet.pixels(id)?)
}

fn blit_masked(
    view: &mut FrameBufferView<'_>,
    sheet: &SpriteSheet,
    mask: u32,
    colour: u32,
    pos: ScreenCoords,
    remap: &PaletteRemap,
) -> Result<()> {
    let mask_sprite = sheet.get(mask)?;
    let colour_sprite = sheet.get(colour)?;
    if mask_sprite.is_rle() || colour_sprite.is_rle() {
        return Err(RenderError::Format(format!(
            "masked drawing needs uncompressed bitmaps (mask {mask}, colour {colour})"
        )));
    }
    let mask_data = drawable_pixels(sheet, mask)?;
    let colour_data = drawable_pixels(sheet, colour)?;
    let mask_width = mask_sprite.width_px();
    let colour_width = colour_sprite.width_px();

    let width = mask_width.min(colour_width) as i32;
    let height = mask_sprite.height_px().min(colour_sprite.height_px()) as i32;
    let left = pos.x + i32::from(mask_sprite.x_offset);
    let top = pos.y + i32::from(mask_sprite.y_offset);

    let (c0, c1) = view.col_range(left, left + width);
    let (r0, r1) = view.row_range(top, top + height);
    if c0 >= c1 || r0 >= r1 {
        return Ok(());
    }

    let origin = view.origin();
    let zoom = view.zoom();
    let stride = view.stride();
    let bits = view.bits_mut();
    for r in r0..r1 {
        let sy = (origin.y + ((r as i32) << zoom) - top) as usize;
        let dst_row = r * stride;
        for c in c0..c1 {
            let sx = (origin.x + ((c as i32) << zoom) - left) as usize;
            let value = colour_data[sy * colour_width + sx] & mask_data[sy * mask_width + sx];
            if value != 0 {
                bits[dst_row + c] = remap.get(value);
            }
        }
    }
    Ok(())
}

/// Draw an [`ImageId`], resolving its recolouring first
///
/// Two-plus-colour and `REMAP` images draw palette-indexed through the
/// remap [`ColourRemaps`] builds. Other `TRANSPARENT` images tint the
/// background with the palette's mix table. Anything else uses
/// [`default_mode`].
/// `tertiary` fills the third colour range of images that ask for it.
pub fn draw_sprite(
    view: &mut FrameBufferView<'_>,
    sheet: &SpriteSheet,
    remaps: &mut ColourRemaps,
    image: ImageId,
    pos: ScreenCoords,
    tertiary: u8,
) -> Result<()> {
    let id = image.index();
    if image.is_transparent() && !image.is_remap_2_plus() {
        let table = remaps.mix_for(sheet, image.palette_ref())?;
        composite(view, sheet, id, pos, CompositeMode::BackgroundMix(table))
    } else if image.is_remap() || image.is_remap_2_plus() {
        let remap = remaps
            .remap_for(sheet, image, tertiary)?
            .ok_or_else(|| RenderError::Format(format!("no remap resolved for image {:#x}", image.raw())))?;
        composite(view, sheet, id, pos, CompositeMode::PaletteIndexed(remap))
    } else {
        let mode = default_mode(sheet.get(id)?);
        composite(view, sheet, id, pos, mode)
    }
}

/// Draw every visible pixel of element `id` in one colour
pub fn draw_sprite_solid(
    view: &mut FrameBufferView<'_>,
    sheet: &SpriteSheet,
    id: u32,
    pos: ScreenCoords,
    colour: u8,
) -> Result<()> {
    let remap = PaletteRemap::solid(colour);
    composite(view, sheet, id, pos, CompositeMode::PaletteIndexed(&remap))
}

/// Draw the colour image through the mask image without recolouring
pub fn draw_sprite_masked(
    view: &mut FrameBufferView<'_>,
    sheet: &SpriteSheet,
    mask: ImageId,
    colour: ImageId,
    pos: ScreenCoords,
) -> Result<()> {
    composite_masked(view, sheet, mask.index(), colour.index(), pos, &IDENTITY)
}

/// True when sprite-local pixel `(x, y)` of element `id` would be drawn
///
/// Keyed bitmaps and RLE sprites are opaque where their index is non-zero;
/// other bitmaps are opaque everywhere inside their bounds.
pub fn sprite_pixel_at(sheet: &SpriteSheet, id: u32, x: i32, y: i32) -> Result<bool> {
    let sprite = sheet.get(id)?;
    let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) else {
        return Ok(false);
    };
    if x >= sprite.width_px() || y >= sprite.height_px() || sprite.is_palette() || sprite.skips_drawing() {
        return Ok(false);
    }
    let data = sheet.pixels(id)?;
    if sprite.is_rle() {
        for run in rle::row_runs(data, y)? {
            let run = run?;
            if (run.x_start..run.x_end()).contains(&x) {
                return Ok(run.pixels[x - run.x_start] != 0);
            }
        }
        return Ok(false);
    }
    if sprite.flags.contains(SpriteFlags::BMP) {
        Ok(data[y * sprite.width_px() + x] != 0)
    } else {
        Ok(true)
    }
}

trait PixelOp: Copy {
    fn apply(self, src: u8, dst: &mut u8);
}

#[derive(Clone, Copy)]
struct CopyOp;

impl PixelOp for CopyOp {
    #[inline]
    fn apply(self, src: u8, dst: &mut u8) {
        *dst = src;
    }
}

#[derive(Clone, Copy)]
struct IndexedOp<'a>(&'a PaletteRemap);

impl PixelOp for IndexedOp<'_> {
    #[inline]
    fn apply(self, src: u8, dst: &mut u8) {
        if src != 0 {
            *dst = self.0.get(src);
        }
    }
}

#[derive(Clone, Copy)]
struct MixOp<'a>(&'a MixTable);

impl PixelOp for MixOp<'_> {
    #[inline]
    fn apply(self, src: u8, dst: &mut u8) {
        if src != 0 {
            *dst = self.0.mix(src, *dst);
        }
    }
}

fn blit<P: PixelOp>(
    view: &mut FrameBufferView<'_>,
    sprite: &SpriteDescriptor,
    data: &[u8],
    pos: ScreenCoords,
    op: P,
) -> Result<()> {
    let width = sprite.width_px();
    let rect = sprite.screen_rect(pos);
    let (c0, c1) = view.col_range(rect.left, rect.right);
    let (r0, r1) = view.row_range(rect.top, rect.bottom);
    if c0 >= c1 || r0 >= r1 {
        return Ok(());
    }

    let origin = view.origin();
    let zoom = view.zoom();
    let cols = view.cols();
    let stride = view.stride();
    let source_x = |c: usize| (origin.x + ((c as i32) << zoom) - rect.left) as usize;
    let source_y = |r: usize| (origin.y + ((r as i32) << zoom) - rect.top) as usize;
    let bits = view.bits_mut();

    if sprite.is_rle() {
        for r in r0..r1 {
            let dst_row = r * stride;
            for run in rle::row_runs(data, source_y(r))? {
                let run = run?;
                let run_end = run.x_end().min(width);
                if run.x_start >= run_end {
                    continue;
                }
                let (a, b) = sample_range(
                    rect.left + run.x_start as i32,
                    rect.left + run_end as i32,
                    origin.x,
                    cols,
                    zoom,
                );
                for c in a.max(c0)..b.min(c1) {
                    op.apply(run.pixels[source_x(c) - run.x_start], &mut bits[dst_row + c]);
                }
            }
        }
    } else {
        for r in r0..r1 {
            let dst_row = r * stride;
            let src_row = source_y(r) * width;
            for c in c0..c1 {
                op.apply(data[src_row + source_x(c)], &mut bits[dst_row + c]);
            }
        }
    }
    Ok(())
}
