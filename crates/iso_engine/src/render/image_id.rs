//! Packed image references
//!
//! An [`ImageId`] is the 32-bit value scene code hands to the renderer:
//!
//! ```text
//! bits 31..29  image type (REMAP_2_PLUS, TRANSPARENT, REMAP)
//! bits 28..24  secondary colour
//! bits 23..19  primary colour        (bits 26..19: palette ref)
//! bits 18..0   sprite sheet index
//! ```

/// Named remap colours, in palette-ref order
#[allow(missing_docs)]
pub mod colour {
    pub const BLACK: u8 = 0;
    pub const GREY: u8 = 1;
    pub const WHITE: u8 = 2;
    pub const DARK_PURPLE: u8 = 3;
    pub const LIGHT_PURPLE: u8 = 4;
    pub const BRIGHT_PURPLE: u8 = 5;
    pub const DARK_BLUE: u8 = 6;
    pub const LIGHT_BLUE: u8 = 7;
    pub const ICY_BLUE: u8 = 8;
    pub const TEAL: u8 = 9;
    pub const AQUAMARINE: u8 = 10;
    pub const SATURATED_GREEN: u8 = 11;
    pub const DARK_GREEN: u8 = 12;
    pub const MOSS_GREEN: u8 = 13;
    pub const BRIGHT_GREEN: u8 = 14;
    pub const OLIVE_GREEN: u8 = 15;
    pub const DARK_OLIVE_GREEN: u8 = 16;
    pub const BRIGHT_YELLOW: u8 = 17;
    pub const YELLOW: u8 = 18;
    pub const DARK_YELLOW: u8 = 19;
    pub const LIGHT_ORANGE: u8 = 20;
    pub const DARK_ORANGE: u8 = 21;
    pub const LIGHT_BROWN: u8 = 22;
    pub const SATURATED_BROWN: u8 = 23;
    pub const DARK_BROWN: u8 = 24;
    pub const SALMON_PINK: u8 = 25;
    pub const BORDEAUX_RED: u8 = 26;
    pub const SATURATED_RED: u8 = 27;
    pub const BRIGHT_RED: u8 = 28;
    pub const DARK_PINK: u8 = 29;
    pub const BRIGHT_PINK: u8 = 30;
    pub const LIGHT_PINK: u8 = 31;

    /// Number of remap colours
    pub const COUNT: usize = 32;
}

/// A sprite index plus recolouring instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ImageId(u32);

impl ImageId {
    /// Mask of the sprite index bits
    pub const INDEX_MASK: u32 = 0x0007_FFFF;
    /// Recolour through a palette remap
    pub const REMAP: u32 = 0x2000_0000;
    /// Recolour the background under opaque pixels
    pub const TRANSPARENT: u32 = 0x4000_0000;
    /// Primary and secondary (and possibly tertiary) colour remap
    pub const REMAP_2_PLUS: u32 = 0x8000_0000;
    /// Mask of the image type bits
    pub const TYPE_MASK: u32 = 0xE000_0000;

    const PRIMARY_SHIFT: u32 = 19;
    const SECONDARY_SHIFT: u32 = 24;

    /// A plain image of `index`
    pub const fn new(index: u32) -> Self {
        Self(index & Self::INDEX_MASK)
    }

    /// Wrap a packed value
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The packed value
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Sprite sheet index
    pub const fn index(self) -> u32 {
        self.0 & Self::INDEX_MASK
    }

    /// Image type bits
    pub const fn image_type(self) -> u32 {
        self.0 & Self::TYPE_MASK
    }

    /// Primary remap colour
    pub const fn primary(self) -> u8 {
        ((self.0 >> Self::PRIMARY_SHIFT) & 0x1F) as u8
    }

    /// Secondary remap colour
    pub const fn secondary(self) -> u8 {
        ((self.0 >> Self::SECONDARY_SHIFT) & 0x1F) as u8
    }

    /// Single-palette reference shared with the colour fields
    pub const fn palette_ref(self) -> u8 {
        ((self.0 >> Self::PRIMARY_SHIFT) & 0xFF) as u8
    }

    /// True when the `REMAP` bit is set
    pub const fn is_remap(self) -> bool {
        self.0 & Self::REMAP != 0
    }

    /// True when the `TRANSPARENT` bit is set
    pub const fn is_transparent(self) -> bool {
        self.0 & Self::TRANSPARENT != 0
    }

    /// True when the `REMAP_2_PLUS` bit is set
    pub const fn is_remap_2_plus(self) -> bool {
        self.0 & Self::REMAP_2_PLUS != 0
    }

    /// Same recolouring, different sprite
    #[must_use]
    pub const fn with_index(self, index: u32) -> Self {
        Self((self.0 & !Self::INDEX_MASK) | (index & Self::INDEX_MASK))
    }

    /// Drop all recolouring
    #[must_use]
    pub const fn plain(self) -> Self {
        Self(self.0 & Self::INDEX_MASK)
    }

    /// Recolour through one palette
    #[must_use]
    pub const fn with_remap(self, palette: u8) -> Self {
        Self(self.index() | Self::REMAP | ((palette as u32) << Self::PRIMARY_SHIFT))
    }

    /// Recolour primary and secondary ranges
    #[must_use]
    pub const fn with_colours(self, primary: u8, secondary: u8) -> Self {
        Self(
            self.index()
                | Self::REMAP
                | Self::REMAP_2_PLUS
                | (((primary & 0x1F) as u32) << Self::PRIMARY_SHIFT)
                | (((secondary & 0x1F) as u32) << Self::SECONDARY_SHIFT),
        )
    }

    /// Recolour primary, secondary and the caller's tertiary range
    #[must_use]
    pub const fn with_tertiary_colours(self, primary: u8, secondary: u8) -> Self {
        Self(self.with_colours(primary, secondary).0 & !Self::REMAP)
    }

    /// Draw only as a tint of what is already on screen
    #[must_use]
    pub const fn with_transparency(self, palette: u8) -> Self {
        Self(self.index() | Self::TRANSPARENT | ((palette as u32) << Self::PRIMARY_SHIFT))
    }
}

impl From<u32> for ImageId {
    fn from(raw: u32) -> Self {
        Self::from_raw(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_packing() {
        let id = ImageId::new(1234).with_colours(colour::BRIGHT_RED, colour::GREY);
        assert_eq!(id.index(), 1234);
        assert_eq!(id.primary(), colour::BRIGHT_RED);
        assert_eq!(id.secondary(), colour::GREY);
        assert!(id.is_remap());
        assert!(id.is_remap_2_plus());
        assert!(!id.is_transparent());
    }

    #[test]
    fn test_tertiary_clears_remap_bit() {
        let id = ImageId::new(5).with_tertiary_colours(3, 4);
        assert!(!id.is_remap());
        assert!(id.is_remap_2_plus());
        assert_eq!((id.primary(), id.secondary()), (3, 4));
    }

    #[test]
    fn test_palette_ref_spans_eight_bits() {
        let id = ImageId::new(7).with_transparency(0xC5);
        assert_eq!(id.palette_ref(), 0xC5);
        assert!(id.is_transparent());
        assert_eq!(id.index(), 7);
    }

    #[test]
    fn test_index_is_masked() {
        assert_eq!(ImageId::new(0xFFFF_FFFF).index(), ImageId::INDEX_MASK);
        let id = ImageId::new(1).with_remap(9).with_index(42);
        assert_eq!(id.index(), 42);
        assert_eq!(id.palette_ref(), 9);
        assert_eq!(id.plain(), ImageId::new(42));
    }
}
