//! 256-colour RGB palettes carried by sheet palette elements

use super::{Result, SheetError, SpriteFlags, SpriteSheet};

/// Number of entries in an indexed palette
pub const PALETTE_SIZE: usize = 256;

/// An RGB colour table for turning indexed framebuffers into images
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colours: [[u8; 3]; PALETTE_SIZE],
}

impl Default for Palette {
    fn default() -> Self {
        Self::greyscale()
    }
}

impl Palette {
    /// A ramp where index `i` maps to grey level `i`
    pub fn greyscale() -> Self {
        let mut colours = [[0; 3]; PALETTE_SIZE];
        for (i, c) in colours.iter_mut().enumerate() {
            *c = [i as u8; 3];
        }
        Self { colours }
    }

    /// Build a palette from a sheet's palette element, over a greyscale base
    pub fn from_sheet(sheet: &SpriteSheet, id: u32) -> Result<Self> {
        let mut palette = Self::greyscale();
        palette.apply_element(sheet, id)?;
        Ok(palette)
    }

    /// Overwrite the entries a palette element covers
    ///
    /// The element's `x_offset` is the first index written and its `width`
    /// the number of entries. Entries are stored blue, green, red.
    pub fn apply_element(&mut self, sheet: &SpriteSheet, id: u32) -> Result<()> {
        let element = sheet.get(id)?;
        if !element.flags.contains(SpriteFlags::PALETTE) {
            return Err(SheetError::Format(format!("element {id} is not a palette")));
        }
        let first = usize::try_from(element.x_offset)
            .map_err(|_| SheetError::Format(format!("palette {id} starts at negative index")))?;
        let bytes = sheet.pixels(id)?;
        for (slot, bgr) in self.colours.iter_mut().skip(first).zip(bytes.chunks_exact(3)) {
            *slot = [bgr[2], bgr[1], bgr[0]];
        }
        Ok(())
    }

    /// RGB colour of an index
    pub fn rgb(&self, index: u8) -> [u8; 3] {
        self.colours[usize::from(index)]
    }

    /// Set one entry
    pub fn set(&mut self, index: u8, rgb: [u8; 3]) {
        self.colours[usize::from(index)] = rgb;
    }

    /// Expand indexed pixels to packed RGB
    pub fn expand(&self, indexed: &[u8]) -> Vec<u8> {
        indexed.iter().flat_map(|&i| self.rgb(i)).collect()
    }
}
