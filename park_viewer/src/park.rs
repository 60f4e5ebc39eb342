//! Randomly generated park and the walk that paints it

use iso_engine::assets::SpriteSheet;
use iso_engine::foundation::math::{MapCoords, ScreenCoords, TILE_SIZE};
use iso_engine::render::ImageId;
use iso_engine::scene::{ElementRef, InteractionKind, PaintError, PaintSession};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::sheet;

/// Ground cover of a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ground {
    /// Walkable grass
    Grass,
    /// Sandy path
    Sand,
    /// Pond
    Water,
}

/// One map tile
#[derive(Debug, Clone, Copy)]
pub struct Tile {
    /// Ground cover
    pub ground: Ground,
    /// Whether a tree stands in the middle
    pub tree: bool,
    /// Guests standing on the tile, as offsets from its centre
    pub guests: [Option<(i32, i32, bool)>; 2],
}

/// A square park of `size` x `size` tiles
#[derive(Debug)]
pub struct Park {
    size: usize,
    tiles: Vec<Tile>,
}

impl Park {
    /// Generate a park from a seed
    pub fn generate(size: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let pond = (rng.gen_range(0..size.max(1)), rng.gen_range(0..size.max(1)));
        let path_row = rng.gen_range(0..size.max(1));

        let tiles = (0..size * size)
            .map(|i| {
                let (x, y) = (i % size, i / size);
                let ground = if x.abs_diff(pond.0) + y.abs_diff(pond.1) < size / 4 {
                    Ground::Water
                } else if y == path_row {
                    Ground::Sand
                } else {
                    Ground::Grass
                };
                let mut guest = || {
                    (ground != Ground::Water && rng.gen_bool(0.2)).then(|| {
                        (rng.gen_range(-12..12), rng.gen_range(-12..12), rng.gen_bool(0.3))
                    })
                };
                let guests = [guest(), guest()];
                Tile {
                    ground,
                    tree: ground == Ground::Grass && rng.gen_bool(0.25),
                    guests,
                }
            })
            .collect();

        Self { size, tiles }
    }

    /// Tiles along one edge
    pub fn size(&self) -> usize {
        self.size
    }

    /// Map-space centre of the park
    pub fn centre(&self) -> MapCoords {
        let half = self.size as i32 * TILE_SIZE / 2;
        MapCoords::new(half, half, 0)
    }

    /// Place every sprite of the park into `session`
    ///
    /// Off-screen sprites are skipped; a full arena ends the walk.
    pub fn paint(&self, session: &mut PaintSession, sheet: &SpriteSheet) {
        for (index, tile) in self.tiles.iter().enumerate() {
            let x = (index % self.size) as i32 * TILE_SIZE;
            let y = (index / self.size) as i32 * TILE_SIZE;
            match paint_tile(session, sheet, tile, index, x, y) {
                Ok(()) => {}
                Err(PaintError::Overflow) => {
                    log::warn!("Park walk stopped at tile {index}: paint arena full");
                    return;
                }
                Err(err) => log::debug!("Tile {index} partly skipped: {err}"),
            }
        }
    }
}

fn paint_tile(
    session: &mut PaintSession,
    sheet: &SpriteSheet,
    tile: &Tile,
    index: usize,
    x: i32,
    y: i32,
) -> Result<(), PaintError> {
    let half = TILE_SIZE / 2;
    let (cx, cy) = (x + half, y + half);
    session.set_sprite_position(cx, cy);
    session.set_map_position(x, y);
    session.set_current_element(Some(ElementRef(index as u32)));

    let (kind, image) = match tile.ground {
        Ground::Grass => (InteractionKind::Terrain, sheet::GRASS),
        Ground::Sand => (InteractionKind::Footpath, sheet::SAND),
        Ground::Water => (InteractionKind::Water, sheet::WATER),
    };
    session.set_interaction(kind);
    // anchor at the tile corner nearest the camera, which is the diamond's top
    skip_culled(session.insert(
        sheet,
        ImageId::new(image),
        MapCoords::new(-half, -half, 0),
        MapCoords::new(TILE_SIZE, TILE_SIZE, 0),
    ))?;

    if tile.tree {
        session.set_interaction(InteractionKind::Scenery);
        let trunk = session.insert(sheet, ImageId::new(sheet::TRUNK), MapCoords::default(), MapCoords::new(2, 2, 10));
        if skip_culled(trunk)?.is_some() {
            skip_culled(session.insert_chained(
                sheet,
                ImageId::new(sheet::CANOPY),
                MapCoords::default(),
                MapCoords::new(14, 14, 18),
                MapCoords::new(-7, -7, 10),
            ))?;
        }
    }

    session.set_interaction(InteractionKind::Sprite);
    for &(dx, dy, balloon) in tile.guests.iter().flatten() {
        session.set_sprite_position(cx + dx, cy + dy);
        let guest = session.insert(sheet, ImageId::new(sheet::GUEST), MapCoords::default(), MapCoords::new(1, 1, 12));
        if skip_culled(guest)?.is_some() && balloon {
            session.attach_to_last(ImageId::new(sheet::BALLOON), ScreenCoords::new(3, -10))?;
        }
    }
    Ok(())
}

/// Treat an off-screen sprite as skipped rather than failed
fn skip_culled<T>(result: Result<T, PaintError>) -> Result<Option<T>, PaintError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(PaintError::Culled) => Ok(None),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iso_engine::foundation::math::{Rotation, ScreenRect};

    #[test]
    fn test_generation_is_seeded() {
        let a = Park::generate(8, 7);
        let b = Park::generate(8, 7);
        let trees = |p: &Park| p.tiles.iter().filter(|t| t.tree).count();
        assert_eq!(trees(&a), trees(&b));
        assert_eq!(a.tiles.len(), 64);
        assert!(a.tiles.iter().all(|t| !(t.tree && t.ground == Ground::Water)));
    }

    #[test]
    fn test_paint_places_every_tile() {
        let sheet = sheet::build().unwrap();
        let park = Park::generate(6, 3);
        let mut session = PaintSession::with_capacity(1000);
        session
            .begin_frame(ScreenRect::new(-10_000, -10_000, 20_000, 20_000), 0, Rotation::R0)
            .unwrap();
        park.paint(&mut session, &sheet);
        let stats = session.stats();
        assert!(stats.inserted >= 36);
        assert_eq!(stats.dropped, 0);
    }

    #[test]
    fn test_paint_stops_when_full() {
        let sheet = sheet::build().unwrap();
        let park = Park::generate(6, 3);
        let mut session = PaintSession::with_capacity(10);
        session
            .begin_frame(ScreenRect::new(-10_000, -10_000, 20_000, 20_000), 2, Rotation::R3)
            .unwrap();
        park.paint(&mut session, &sheet);
        assert_eq!(session.used(), 10);
        assert_eq!(session.stats().dropped, 1);
    }
}
