//! A small hand-built sprite sheet for the viewer
//!
//! Element ids are fixed by push order so the park painter can refer to
//! them by constant, and a sheet saved with `--save-sheet` loads back with
//! the same ids.

use iso_engine::assets::{SheetError, SpriteSheet, SpriteSheetBuilder};

/// Palette element
pub const PALETTE: u32 = 0;
/// Grass tile, RLE
pub const GRASS: u32 = 1;
/// Sand tile, RLE
pub const SAND: u32 = 2;
/// Water tile, RLE
pub const WATER: u32 = 3;
/// Tree trunk
pub const TRUNK: u32 = 4;
/// Tree canopy, chained to the trunk
pub const CANOPY: u32 = 5;
/// Park guest
pub const GUEST: u32 = 6;
/// Balloon attached to a guest
pub const BALLOON: u32 = 7;

/// Background colour
pub const SKY: u8 = 200;
/// Frame border colour
pub const BORDER: u8 = 201;

const TILE_WIDTH: usize = 64;
const TILE_HEIGHT: usize = 32;

/// Assemble the viewer's sheet
pub fn build() -> Result<SpriteSheet, SheetError> {
    let mut builder = SpriteSheetBuilder::new();
    builder.push_palette(0, &palette());

    builder.push_rle(TILE_WIDTH, TILE_HEIGHT, -32, 0, &diamond(|x, y| 10 + ((x / 4 + y / 2) % 3) as u8))?;
    builder.push_rle(TILE_WIDTH, TILE_HEIGHT, -32, 0, &diamond(|x, y| 20 + ((x * 7 + y * 3) % 3) as u8))?;
    builder.push_rle(TILE_WIDTH, TILE_HEIGHT, -32, 0, &diamond(|_, y| 30 + ((y / 4) % 3) as u8))?;

    builder.push_bitmap(3, 10, -1, -10, &[40; 30])?;
    builder.push_bitmap(15, 18, -7, -26, &blob(15, 18, |x, y| 41 + ((x + y) % 3) as u8))?;
    builder.push_bitmap(5, 12, -2, -12, &guest())?;

    let mut balloon = blob(5, 6, |_, _| 60);
    balloon.extend((0..4).flat_map(|_| [0, 0, 8, 0, 0]));
    builder.push_bitmap(5, 10, -2, -10, &balloon)?;

    Ok(builder.build())
}

/// 256 colours over a grey ramp
fn palette() -> Vec<[u8; 3]> {
    let mut colours: Vec<[u8; 3]> = (0..=255u8).map(|i| [i, i, i]).collect();
    let mut set = |first: usize, values: &[[u8; 3]]| colours[first..first + values.len()].copy_from_slice(values);

    set(0, &[[0, 0, 0]]);
    set(10, &[[56, 128, 40], [64, 144, 48], [72, 156, 52]]);
    set(20, &[[212, 188, 128], [200, 176, 116], [220, 200, 140]]);
    set(30, &[[40, 84, 196], [48, 96, 208], [36, 76, 184]]);
    set(40, &[[112, 72, 32], [28, 96, 36], [36, 112, 40], [44, 124, 44]]);
    set(50, &[[232, 192, 152], [196, 40, 40], [40, 56, 140]]);
    set(60, &[[244, 212, 40]]);
    set(usize::from(SKY), &[[124, 172, 232], [24, 24, 32]]);
    colours
}

/// A tile-shaped diamond with its top corner at the centre of row 0
fn diamond(colour: impl Fn(usize, usize) -> u8) -> Vec<u8> {
    let mut pixels = vec![0; TILE_WIDTH * TILE_HEIGHT];
    for y in 0..TILE_HEIGHT {
        let half = if y < TILE_HEIGHT / 2 { 2 * y + 2 } else { 2 * (TILE_HEIGHT - 1 - y) + 2 };
        for x in TILE_WIDTH / 2 - half..TILE_WIDTH / 2 + half {
            pixels[y * TILE_WIDTH + x] = colour(x, y);
        }
    }
    pixels
}

/// An ellipse filling a `width` x `height` box
fn blob(width: usize, height: usize, colour: impl Fn(usize, usize) -> u8) -> Vec<u8> {
    let (rx, ry) = (width as f32 / 2.0, height as f32 / 2.0);
    let mut pixels = vec![0; width * height];
    for y in 0..height {
        for x in 0..width {
            let dx = (x as f32 + 0.5 - rx) / rx;
            let dy = (y as f32 + 0.5 - ry) / ry;
            if dx * dx + dy * dy <= 1.0 {
                pixels[y * width + x] = colour(x, y);
            }
        }
    }
    pixels
}

fn guest() -> Vec<u8> {
    let mut pixels = vec![0; 5 * 12];
    for y in 0..12 {
        for x in 0..5 {
            pixels[y * 5 + x] = match (y, x) {
                (0..=2, 1..=3) => 50,
                (3..=7, _) => 51,
                (8..=11, 1 | 3) => 52,
                _ => 0,
            };
        }
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use iso_engine::assets::Palette;

    #[test]
    fn test_sheet_ids_are_stable() {
        let sheet = build().unwrap();
        assert_eq!(sheet.len(), 8);
        assert!(sheet.get(PALETTE).unwrap().is_palette());
        assert!(sheet.get(GRASS).unwrap().is_rle());
        assert_eq!(sheet.get(BALLOON).unwrap().height, 10);
    }

    #[test]
    fn test_saved_sheet_loads_back() {
        let sheet = build().unwrap();
        let loaded = SpriteSheet::from_bytes(&sheet.to_bytes(), None).unwrap();
        assert_eq!(loaded, sheet);
    }

    #[test]
    fn test_palette_element() {
        let sheet = build().unwrap();
        let palette = Palette::from_sheet(&sheet, PALETTE).unwrap();
        assert_eq!(palette.rgb(SKY), [124, 172, 232]);
        assert_eq!(palette.rgb(5), [5, 5, 5]);
    }
}
