//! Palette remapping
//!
//! Sprites are drawn in palette indices, so recolouring a ride or tinting
//! glass is a table lookup per pixel rather than a change to sprite data.

use std::collections::HashMap;
use std::ops::Index;

use super::image_id::ImageId;
use super::{RenderError, Result};
use crate::assets::SpriteSheet;

/// Start of the primary recolour range
pub const PRIMARY_RANGE_START: usize = 0xF3;
/// Start of the secondary recolour range
pub const SECONDARY_RANGE_START: usize = 0xCA;
/// Start of the tertiary recolour range
pub const TERTIARY_RANGE_START: usize = 0x2E;
/// Entries in each recolour range
pub const RANGE_LEN: usize = 12;

/// The identity remap, for keyed copies
pub static IDENTITY: PaletteRemap = PaletteRemap::identity();

/// A 256-entry index-to-index lookup table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteRemap([u8; 256]);

impl Default for PaletteRemap {
    fn default() -> Self {
        Self::identity()
    }
}

impl PaletteRemap {
    /// Every index maps to itself
    pub const fn identity() -> Self {
        let mut table = [0u8; 256];
        let mut i = 0;
        while i < 256 {
            table[i] = i as u8;
            i += 1;
        }
        Self(table)
    }

    /// Every visible index maps to `colour`; index 0 stays transparent
    pub fn solid(colour: u8) -> Self {
        let mut table = [colour; 256];
        table[0] = 0;
        Self(table)
    }

    /// Build from the first 256 bytes of a slice
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let table: [u8; 256] = bytes.get(..256)?.try_into().ok()?;
        Some(Self(table))
    }

    /// Wrap a full table
    pub const fn from_table(table: [u8; 256]) -> Self {
        Self(table)
    }

    /// Look up one index
    #[inline]
    pub fn get(&self, index: u8) -> u8 {
        self.0[usize::from(index)]
    }

    /// Overwrite one entry
    pub fn set(&mut self, index: u8, value: u8) {
        self.0[usize::from(index)] = value;
    }

    /// Overwrite consecutive entries starting at `start`
    pub fn copy_range(&mut self, start: usize, values: &[u8]) {
        let end = (start + values.len()).min(256);
        if start < end {
            self.0[start..end].copy_from_slice(&values[..end - start]);
        }
    }

    /// The whole table
    pub fn as_table(&self) -> &[u8; 256] {
        &self.0
    }
}

impl Index<u8> for PaletteRemap {
    type Output = u8;

    fn index(&self, index: u8) -> &u8 {
        &self.0[usize::from(index)]
    }
}

/// A two-input lookup indexed by `(source << 8) | destination`
///
/// Used for compositing that depends on what is already on screen, such as
/// glass and see-through overlays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixTable(Box<[u8]>);

impl MixTable {
    /// Number of entries
    pub const LEN: usize = 1 << 16;

    /// Build from a mixing function
    pub fn from_fn(mut mix: impl FnMut(u8, u8) -> u8) -> Self {
        let mut table = vec![0u8; Self::LEN];
        for (i, entry) in table.iter_mut().enumerate() {
            *entry = mix((i >> 8) as u8, i as u8);
        }
        Self(table.into_boxed_slice())
    }

    /// Mix that recolours the destination and ignores the source colour
    pub fn from_remap(remap: &PaletteRemap) -> Self {
        Self::from_fn(|_, dst| remap.get(dst))
    }

    /// Wrap a prebuilt table, which must hold exactly 65 536 entries
    pub fn from_table(table: Vec<u8>) -> Result<Self> {
        if table.len() != Self::LEN {
            return Err(RenderError::Format(format!(
                "mix table needs {} entries, got {}",
                Self::LEN,
                table.len()
            )));
        }
        Ok(Self(table.into_boxed_slice()))
    }

    /// Combine a source and destination index
    #[inline]
    pub fn mix(&self, src: u8, dst: u8) -> u8 {
        self.0[(usize::from(src) << 8) | usize::from(dst)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RemapKey {
    Single(u8),
    Colours { primary: u8, secondary: u8, tertiary: Option<u8> },
}

/// Builds and caches the remaps an [`ImageId`] asks for
///
/// Remap sources are sheet elements holding at least 256 bytes of table
/// data. `remap_elements[palette_ref]` names the element for each palette
/// reference; colour remaps copy the 12 entries at `0xF3` of the colour's
/// element into the primary, secondary or tertiary range of an identity table.
#[derive(Debug, Default)]
pub struct ColourRemaps {
    remap_elements: Vec<u32>,
    remaps: HashMap<RemapKey, PaletteRemap>,
    mixes: HashMap<u8, MixTable>,
}

impl ColourRemaps {
    /// Create a cache over the given palette-ref to element table
    pub fn new(remap_elements: Vec<u32>) -> Self {
        Self {
            remap_elements,
            remaps: HashMap::new(),
            mixes: HashMap::new(),
        }
    }

    /// Number of palette references known
    pub fn len(&self) -> usize {
        self.remap_elements.len()
    }

    /// True when no palette references are known
    pub fn is_empty(&self) -> bool {
        self.remap_elements.is_empty()
    }

    /// Forget every cached table, e.g. after swapping sheets
    pub fn clear(&mut self) {
        self.remaps.clear();
        self.mixes.clear();
    }

    /// The remap an image needs, `None` for images drawn without one
    ///
    /// Single-palette images use the palette ref masked to 7 bits unless they
    /// are `TRANSPARENT`. Two-plus-colour images fill the tertiary range from
    /// `tertiary` only when their `REMAP` bit is clear.
    pub fn remap_for(&mut self, sheet: &SpriteSheet, image: ImageId, tertiary: u8) -> Result<Option<&PaletteRemap>> {
        if image.image_type() == 0 {
            return Ok(None);
        }
        let key = if image.is_remap_2_plus() {
            RemapKey::Colours {
                primary: image.primary(),
                secondary: image.secondary(),
                tertiary: (!image.is_remap()).then_some(tertiary),
            }
        } else if image.is_transparent() {
            RemapKey::Single(image.palette_ref())
        } else {
            RemapKey::Single(image.palette_ref() & 0x7F)
        };

        if !self.remaps.contains_key(&key) {
            let remap = self.build(sheet, key)?;
            log::trace!("Cached palette remap {:?}", key);
            self.remaps.insert(key, remap);
        }
        Ok(self.remaps.get(&key))
    }

    /// The whole lookup table behind a palette ref
    ///
    /// Filtered rectangle fills recolour through this table.
    pub fn table_for(&mut self, sheet: &SpriteSheet, palette_ref: u8) -> Result<&PaletteRemap> {
        let key = RemapKey::Single(palette_ref);
        if !self.remaps.contains_key(&key) {
            let remap = self.element_table(sheet, palette_ref)?;
            self.remaps.insert(key, remap);
        }
        Ok(&self.remaps[&key])
    }

    /// The background mix for a see-through palette ref
    pub fn mix_for(&mut self, sheet: &SpriteSheet, palette_ref: u8) -> Result<&MixTable> {
        if !self.mixes.contains_key(&palette_ref) {
            let remap = self.element_table(sheet, palette_ref)?;
            self.mixes.insert(palette_ref, MixTable::from_remap(&remap));
        }
        Ok(&self.mixes[&palette_ref])
    }

    fn build(&self, sheet: &SpriteSheet, key: RemapKey) -> Result<PaletteRemap> {
        match key {
            RemapKey::Single(palette_ref) => self.element_table(sheet, palette_ref),
            RemapKey::Colours { primary, secondary, tertiary } => {
                let mut remap = PaletteRemap::identity();
                if let Some(tertiary) = tertiary {
                    remap.copy_range(TERTIARY_RANGE_START, &self.colour_range(sheet, tertiary)?);
                }
                remap.copy_range(PRIMARY_RANGE_START, &self.colour_range(sheet, primary)?);
                remap.copy_range(SECONDARY_RANGE_START, &self.colour_range(sheet, secondary)?);
                Ok(remap)
            }
        }
    }

    fn element_table(&self, sheet: &SpriteSheet, palette_ref: u8) -> Result<PaletteRemap> {
        let id = self.element_id(palette_ref)?;
        PaletteRemap::from_slice(sheet.pixels(id)?)
            .ok_or_else(|| RenderError::Format(format!("remap element {id} holds fewer than 256 entries")))
    }

    fn colour_range(&self, sheet: &SpriteSheet, colour: u8) -> Result<[u8; RANGE_LEN]> {
        let table = self.element_table(sheet, colour)?;
        let mut range = [0u8; RANGE_LEN];
        range.copy_from_slice(&table.as_table()[PRIMARY_RANGE_START..PRIMARY_RANGE_START + RANGE_LEN]);
        Ok(range)
    }

    fn element_id(&self, palette_ref: u8) -> Result<u32> {
        self.remap_elements
            .get(usize::from(palette_ref))
            .copied()
            .ok_or_else(|| RenderError::Format(format!("no remap element for palette {palette_ref}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::SpriteSheetBuilder;

    /// Sheet with one remap element per colour, where colour `c` maps every
    /// index to `c + 100`
    fn remap_sheet(colours: u8) -> (SpriteSheet, Vec<u32>) {
        let mut builder = SpriteSheetBuilder::new();
        let ids = (0..colours)
            .map(|c| builder.push_raw(256, 1, 0, 0, &[c + 100; 256]).unwrap())
            .collect();
        (builder.build(), ids)
    }

    #[test]
    fn test_identity_and_solid() {
        let identity = PaletteRemap::identity();
        assert_eq!(identity.get(0), 0);
        assert_eq!(identity[200], 200);

        let solid = PaletteRemap::solid(44);
        assert_eq!(solid.get(0), 0);
        assert_eq!(solid.get(1), 44);
        assert_eq!(solid.get(255), 44);
    }

    #[test]
    fn test_copy_range_clamps() {
        let mut remap = PaletteRemap::identity();
        remap.copy_range(250, &[1; 12]);
        assert_eq!(remap.get(249), 249);
        assert_eq!(remap.get(255), 1);
    }

    #[test]
    fn test_mix_table_from_remap() {
        let mut remap = PaletteRemap::identity();
        remap.set(10, 99);
        let mix = MixTable::from_remap(&remap);
        assert_eq!(mix.mix(3, 10), 99);
        assert_eq!(mix.mix(200, 10), 99);
        assert_eq!(mix.mix(3, 11), 11);
        assert!(MixTable::from_table(vec![0; 10]).is_err());
    }

    #[test]
    fn test_plain_image_needs_no_remap() {
        let (sheet, ids) = remap_sheet(2);
        let mut remaps = ColourRemaps::new(ids);
        assert!(remaps.remap_for(&sheet, ImageId::new(0), 0).unwrap().is_none());
    }

    #[test]
    fn test_single_remap_uses_element_table() {
        let (sheet, ids) = remap_sheet(3);
        let mut remaps = ColourRemaps::new(ids);
        let remap = remaps.remap_for(&sheet, ImageId::new(0).with_remap(2), 0).unwrap().unwrap();
        assert_eq!(remap.get(7), 102);
    }

    #[test]
    fn test_colour_ranges() {
        let (sheet, ids) = remap_sheet(4);
        let mut remaps = ColourRemaps::new(ids);

        let remap = remaps
            .remap_for(&sheet, ImageId::new(0).with_colours(1, 2), 3)
            .unwrap()
            .unwrap()
            .clone();
        assert_eq!(remap.get(0xF3), 101);
        assert_eq!(remap.get(0xFE), 101);
        assert_eq!(remap.get(0xCA), 102);
        // REMAP set, so the tertiary range is untouched
        assert_eq!(remap.get(0x2E), 0x2E);
        assert_eq!(remap.get(0x10), 0x10);

        let remap = remaps
            .remap_for(&sheet, ImageId::new(0).with_tertiary_colours(1, 2), 3)
            .unwrap()
            .unwrap();
        assert_eq!(remap.get(0x2E), 103);
    }

    #[test]
    fn test_missing_palette_ref() {
        let (sheet, ids) = remap_sheet(1);
        let mut remaps = ColourRemaps::new(ids);
        assert!(remaps.remap_for(&sheet, ImageId::new(0).with_remap(5), 0).is_err());
    }

    #[test]
    fn test_mix_for_recolours_destination() {
        let (sheet, ids) = remap_sheet(2);
        let mut remaps = ColourRemaps::new(ids);
        let mix = remaps.mix_for(&sheet, 1).unwrap();
        assert_eq!(mix.mix(1, 50), 101);
    }
}
