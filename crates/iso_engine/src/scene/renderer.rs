//! # Scene Renderer
//!
//! The [`PaintVisitor`] that turns a drained frame into pixels.
//!
//! ## Per-entry steps
//!
//! 1. Snap moving sprites to the zoom grid so they do not shimmer.
//! 2. Ghost the image when a see-through view flag covers its kind.
//! 3. With `BOUND_BOXES` at zoom 0, outline the ordering box: the hidden
//!    edges before the sprite and the near edges after it.
//! 4. Draw the sprite, masked or through its remap.
//!
//! A sprite the compositor cannot draw, such as a ghost with no tint table
//! loaded, is logged and skipped; the rest of the frame still draws.

use super::entry::{AttachedEntry, BoundBox, PaintEntry};
use super::session::PaintVisitor;
use super::{InteractionKind, SceneError, ViewFlags};
use crate::assets::SpriteSheet;
use crate::foundation::math::{floor_to, project, MapCoords, Rotation, ScreenCoords};
use crate::render::{draw_sprite, draw_sprite_masked, rect_fill, ColourRemaps, FrameBufferView, ImageId};

/// Palette ref of the ghost tint used by see-through views
const GHOST_PALETTE: u8 = 0x31;

/// Draws drained entries into a view
pub struct SceneRenderer<'a> {
    view: FrameBufferView<'a>,
    sheet: &'a SpriteSheet,
    remaps: &'a mut ColourRemaps,
    view_flags: ViewFlags,
    rotation: Rotation,
    skipped: usize,
}

impl<'a> SceneRenderer<'a> {
    /// Create a renderer for a frame painted with `rotation`
    pub fn new(view: FrameBufferView<'a>, sheet: &'a SpriteSheet, remaps: &'a mut ColourRemaps, rotation: Rotation) -> Self {
        Self {
            view,
            sheet,
            remaps,
            view_flags: ViewFlags::empty(),
            rotation,
            skipped: 0,
        }
    }

    /// Set the view flags
    #[must_use]
    pub fn with_view_flags(mut self, flags: ViewFlags) -> Self {
        self.view_flags = flags;
        self
    }

    /// Entries and attachments left undrawn so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn draw(&mut self, image: ImageId, masked_colour: Option<ImageId>, pos: ScreenCoords, tertiary: u8) {
        let result = match masked_colour {
            Some(colour) => draw_sprite_masked(&mut self.view, self.sheet, image, colour, pos),
            None => draw_sprite(&mut self.view, self.sheet, self.remaps, image, pos, tertiary),
        };
        if let Err(err) = result {
            if self.skipped == 0 {
                log::warn!("Skipping undrawable image {:#x}: {}", image.raw(), err);
            } else {
                log::debug!("Skipping undrawable image {:#x}: {}", image.raw(), err);
            }
            self.skipped += 1;
        }
    }

    fn box_corners(&self, b: &BoundBox) -> BoxCorners {
        let p = |x, y, z| project(MapCoords::new(x, y, z), self.rotation);
        BoxCorners {
            front_top: p(b.x_end, b.y_end, b.z_end),
            front_bottom: p(b.x_end, b.y_end, b.z),
            left_top: p(b.x, b.y_end, b.z_end),
            left_bottom: p(b.x, b.y_end, b.z),
            right_top: p(b.x_end, b.y, b.z_end),
            right_bottom: p(b.x_end, b.y, b.z),
            back_top: p(b.x, b.y, b.z_end),
            back_bottom: p(b.x, b.y, b.z),
        }
    }

    fn lines(&mut self, lines: &[(ScreenCoords, ScreenCoords)], colour: u8) {
        for &(from, to) in lines {
            rect_fill::draw_line(&mut self.view, from, to, colour);
        }
    }
}

struct BoxCorners {
    front_top: ScreenCoords,
    front_bottom: ScreenCoords,
    left_top: ScreenCoords,
    left_bottom: ScreenCoords,
    right_top: ScreenCoords,
    right_bottom: ScreenCoords,
    back_top: ScreenCoords,
    back_bottom: ScreenCoords,
}

impl PaintVisitor for SceneRenderer<'_> {
    type Error = SceneError;

    fn visit_entry(&mut self, entry: &PaintEntry) -> Result<(), SceneError> {
        let zoom = self.view.zoom();
        let mut pos = entry.position;
        if entry.interaction == InteractionKind::Sprite && zoom >= 1 {
            let step = if zoom >= 2 { 4 } else { 2 };
            pos = ScreenCoords::new(floor_to(pos.x, step), floor_to(pos.y, step));
        }
        let image = colourify(entry.image, entry.interaction, self.view_flags);

        if zoom == 0 && self.view_flags.contains(ViewFlags::BOUND_BOXES) {
            let colour = entry.interaction.debug_colour();
            let c = self.box_corners(&entry.bounds);
            self.lines(
                &[
                    (c.front_bottom, c.left_bottom),
                    (c.front_bottom, c.right_bottom),
                    (c.left_bottom, c.back_bottom),
                    (c.right_bottom, c.back_bottom),
                    (c.back_top, c.back_bottom),
                    (c.left_top, c.left_bottom),
                    (c.right_top, c.right_bottom),
                    (c.back_top, c.right_top),
                    (c.back_top, c.left_top),
                ],
                colour,
            );
            self.draw(image, entry.masked_colour, pos, entry.tertiary_colour);
            self.lines(
                &[
                    (c.front_top, c.front_bottom),
                    (c.front_top, c.left_top),
                    (c.front_top, c.right_top),
                ],
                colour,
            );
            return Ok(());
        }

        self.draw(image, entry.masked_colour, pos, entry.tertiary_colour);
        Ok(())
    }

    fn visit_attachment(&mut self, parent: &PaintEntry, attachment: &AttachedEntry) -> Result<(), SceneError> {
        let image = colourify(attachment.image, parent.interaction, self.view_flags);
        let pos = parent.position.offset(attachment.offset.x, attachment.offset.y);
        self.draw(image, attachment.masked_colour, pos, parent.tertiary_colour);
        Ok(())
    }
}

/// Swap an image for its ghost when a see-through flag covers `kind`
///
/// Images that are already see-through are left alone.
pub fn colourify(image: ImageId, kind: InteractionKind, flags: ViewFlags) -> ImageId {
    if image.is_transparent() {
        return image;
    }
    let ghosted = match kind {
        InteractionKind::Ride => flags.contains(ViewFlags::SEE_THROUGH_RIDES),
        InteractionKind::Wall => flags.intersects(ViewFlags::UNDERGROUND_INSIDE | ViewFlags::SEE_THROUGH_SCENERY),
        InteractionKind::Footpath | InteractionKind::FootpathItem | InteractionKind::Banner => {
            flags.contains(ViewFlags::SEE_THROUGH_PATHS)
        }
        InteractionKind::Scenery | InteractionKind::LargeScenery => flags.contains(ViewFlags::SEE_THROUGH_SCENERY),
        _ => false,
    };
    if ghosted {
        image.plain().with_transparency(GHOST_PALETTE)
    } else {
        image
    }
}
