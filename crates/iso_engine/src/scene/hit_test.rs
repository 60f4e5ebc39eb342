//! Screen-point picking against the last painted frame
//!
//! Walks the frame in draw order and keeps the last entry whose sprite has a
//! visible pixel under the point, so whatever is drawn on top wins.

use super::entry::{ElementRef, PaintEntry, TilePosition};
use super::session::PaintSession;
use super::InteractionKind;
use crate::assets::SpriteSheet;
use crate::foundation::math::ScreenCoords;
use crate::render::{sprite_pixel_at, ImageId, Result};

/// What a screen point landed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    /// Interaction kind of the entry
    pub kind: InteractionKind,
    /// Tile the entry was painted for
    pub map_position: TilePosition,
    /// Element the entry was painted for
    pub element: Option<ElementRef>,
    /// Image whose pixel was hit
    pub image: ImageId,
    /// True when the pixel belongs to an attachment of the entry
    pub attachment: bool,
}

impl Hit {
    fn new(entry: &PaintEntry, image: ImageId, attachment: bool) -> Self {
        Self {
            kind: entry.interaction,
            map_position: entry.map_position,
            element: entry.element,
            image,
            attachment,
        }
    }
}

/// Find the top-most entry under `point` whose kind passes `filter`
///
/// `point` is in unzoomed screen space. Attachments report their parent's
/// kind and element. Works on the frame most recently painted, whether or
/// not it has been drained.
pub fn hit_test(
    session: &PaintSession,
    sheet: &SpriteSheet,
    point: ScreenCoords,
    filter: impl Fn(InteractionKind) -> bool,
) -> Result<Option<Hit>> {
    let mut found = None;
    for head in session.draw_order() {
        for entry in session.chain(head) {
            if !filter(entry.interaction) {
                continue;
            }
            if covers(sheet, entry.image, entry.position, point)? {
                found = Some(Hit::new(entry, entry.image, false));
            }
            for attachment in session.attachments_of(entry) {
                let origin = entry.position.offset(attachment.offset.x, attachment.offset.y);
                if covers(sheet, attachment.image, origin, point)? {
                    found = Some(Hit::new(entry, attachment.image, true));
                }
            }
        }
    }
    Ok(found)
}

fn covers(sheet: &SpriteSheet, image: ImageId, origin: ScreenCoords, point: ScreenCoords) -> Result<bool> {
    let id = image.index();
    let rect = sheet.get(id)?.screen_rect(origin);
    if !rect.contains(point) {
        return Ok(false);
    }
    sprite_pixel_at(sheet, id, point.x - rect.left, point.y - rect.top)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::SpriteSheetBuilder;
    use crate::foundation::math::{MapCoords, Rotation, ScreenRect};

    struct Fixture {
        sheet: SpriteSheet,
        session: PaintSession,
    }

    /// Sprite 0 is a solid 8x8 block, sprite 1 an 8x8 frame with a hole
    fn fixture() -> Fixture {
        let mut builder = SpriteSheetBuilder::new();
        builder.push_bitmap(8, 8, -4, -8, &[3; 64]).unwrap();
        let mut ring = [5u8; 64];
        for y in 2..6 {
            for x in 2..6 {
                ring[y * 8 + x] = 0;
            }
        }
        builder.push_bitmap(8, 8, -4, -8, &ring).unwrap();

        let mut session = PaintSession::with_capacity(32);
        session.begin_frame(ScreenRect::new(-100, -100, 200, 200), 0, Rotation::R0).unwrap();
        Fixture {
            sheet: builder.build(),
            session,
        }
    }

    fn paint(f: &mut Fixture, image: u32, at: MapCoords, kind: InteractionKind) {
        f.session.set_sprite_position(at.x, at.y);
        f.session.set_map_position(at.x, at.y);
        f.session.set_interaction(kind);
        f.session
            .insert(&f.sheet, ImageId::new(image), MapCoords::new(0, 0, at.z), MapCoords::new(1, 1, 1))
            .unwrap();
    }

    #[test]
    fn test_front_entry_wins() {
        let mut f = fixture();
        paint(&mut f, 0, MapCoords::new(0, 0, 0), InteractionKind::Terrain);
        // one quadrant further forward, raised so it lands 4 pixels lower
        paint(&mut f, 0, MapCoords::new(16, 16, 12), InteractionKind::Scenery);
        let hit = hit_test(&f.session, &f.sheet, ScreenCoords::new(0, -2), |_| true).unwrap();
        assert_eq!(hit.map(|h| h.kind), Some(InteractionKind::Scenery));

        let hit = hit_test(&f.session, &f.sheet, ScreenCoords::new(0, -6), |_| true).unwrap();
        assert_eq!(hit.map(|h| h.kind), Some(InteractionKind::Terrain));
    }

    #[test]
    fn test_transparent_pixels_pass_through() {
        let mut f = fixture();
        paint(&mut f, 0, MapCoords::new(0, 0, 0), InteractionKind::Terrain);
        paint(&mut f, 1, MapCoords::new(16, 16, 16), InteractionKind::Scenery);

        let hole = hit_test(&f.session, &f.sheet, ScreenCoords::new(0, -4), |_| true).unwrap();
        assert_eq!(hole.map(|h| h.kind), Some(InteractionKind::Terrain));

        let rim = hit_test(&f.session, &f.sheet, ScreenCoords::new(-4, -8), |_| true).unwrap();
        assert_eq!(rim.map(|h| h.kind), Some(InteractionKind::Scenery));
    }

    #[test]
    fn test_filter_skips_kinds() {
        let mut f = fixture();
        paint(&mut f, 0, MapCoords::default(), InteractionKind::Terrain);
        paint(&mut f, 0, MapCoords::default(), InteractionKind::Scenery);
        let hit = hit_test(&f.session, &f.sheet, ScreenCoords::new(0, -4), |k| k == InteractionKind::Terrain).unwrap();
        assert_eq!(hit.map(|h| h.map_position), Some(TilePosition::new(0, 0)));
        assert_eq!(hit.map(|h| h.kind), Some(InteractionKind::Terrain));

        let miss = hit_test(&f.session, &f.sheet, ScreenCoords::new(50, 50), |_| true).unwrap();
        assert!(miss.is_none());
    }

    #[test]
    fn test_attachment_reports_parent() {
        let mut f = fixture();
        paint(&mut f, 0, MapCoords::default(), InteractionKind::Ride);
        f.session.attach_to_last(ImageId::new(0), ScreenCoords::new(20, 0)).unwrap();

        let hit = hit_test(&f.session, &f.sheet, ScreenCoords::new(20, -4), |_| true)
            .unwrap()
            .unwrap();
        assert!(hit.attachment);
        assert_eq!(hit.kind, InteractionKind::Ride);
    }

    #[test]
    fn test_hit_after_drain() {
        struct Sink;
        impl crate::scene::PaintVisitor for Sink {
            type Error = crate::scene::PaintError;
            fn visit_entry(&mut self, _: &PaintEntry) -> crate::scene::Result<()> {
                Ok(())
            }
            fn visit_attachment(&mut self, _: &PaintEntry, _: &crate::scene::AttachedEntry) -> crate::scene::Result<()> {
                Ok(())
            }
        }

        let mut f = fixture();
        paint(&mut f, 0, MapCoords::default(), InteractionKind::Terrain);
        f.session.drain_in_order(&mut Sink).unwrap();
        let hit = hit_test(&f.session, &f.sheet, ScreenCoords::new(0, -4), |_| true).unwrap();
        assert!(hit.is_some());
    }
}
