//! # G1 Sprite Sheets
//!
//! A sheet is a single binary archive holding every sprite the renderer can
//! draw. The layout is little-endian throughout:
//!
//! ```text
//! header   { u32 element_count, u32 total_data_size }
//! records  element_count x 16 bytes
//!          { u32 offset, i16 width, i16 height, i16 x_offset, i16 y_offset,
//!            u16 flags, u16 zoomed_offset }
//! data     total_data_size bytes of raw, RLE or palette data
//! ```
//!
//! Record offsets stay relative to the data blob for the sheet's whole
//! lifetime; [`SpriteSheet::pixels`] slices the blob on demand.
//!
//! ## Usage
//!
//! ```rust
//! use iso_engine::assets::{SpriteSheet, SpriteSheetBuilder};
//!
//! let mut builder = SpriteSheetBuilder::new();
//! let id = builder.push_bitmap(2, 1, 0, 0, &[0, 7]).unwrap();
//! let bytes = builder.build().to_bytes();
//!
//! let sheet = SpriteSheet::from_bytes(&bytes, None).unwrap();
//! assert_eq!(sheet.get(id).unwrap().width, 2);
//! ```

use std::path::Path;

use bitflags::bitflags;

use super::{rle, Result, SheetError};
use crate::core::config::SheetConfig;
use crate::foundation::math::{ScreenCoords, ScreenRect};

/// Size of the file header in bytes
pub const HEADER_SIZE: usize = 8;

/// Size of one element record in bytes
pub const RECORD_SIZE: usize = 16;

bitflags! {
    /// Per-element flags as stored on disk
    ///
    /// Bits without a name are kept as loaded and written back unchanged.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SpriteFlags: u16 {
        /// Bitmap with index 0 as the transparent key
        const BMP = 1 << 0;
        /// Uncompressed data that is stored but never drawn
        const SKIP_BITMAP = 1 << 1;
        /// Row-run compressed, see [`rle`]
        const RLE_COMPRESSION = 1 << 2;
        /// Data is BGR palette entries rather than pixels
        const PALETTE = 1 << 3;
        /// A hand-drawn half-resolution sibling exists
        const HAS_ZOOM_SPRITE = 1 << 4;
        /// Skip this element entirely when zoomed out
        const NO_ZOOM_DRAW = 1 << 5;
    }
}

/// Which element count a sheet was loaded with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountSource {
    /// The count declared in the file header
    Header,
    /// A count supplied by the caller
    Override,
}

/// One element record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpriteDescriptor {
    /// Byte offset into the sheet's data blob
    pub offset: u32,
    /// Width in pixels (entry count for palettes)
    pub width: i16,
    /// Height in pixels
    pub height: i16,
    /// Horizontal draw offset (first index for palettes)
    pub x_offset: i16,
    /// Vertical draw offset
    pub y_offset: i16,
    /// Storage and drawing flags
    pub flags: SpriteFlags,
    /// Distance back to the zoomed-out sibling
    pub zoomed_offset: u16,
}

impl SpriteDescriptor {
    fn from_record(r: &[u8; RECORD_SIZE]) -> Self {
        let i16_at = |i: usize| i16::from_le_bytes([r[i], r[i + 1]]);
        let u16_at = |i: usize| u16::from_le_bytes([r[i], r[i + 1]]);
        Self {
            offset: u32::from_le_bytes([r[0], r[1], r[2], r[3]]),
            width: i16_at(4),
            height: i16_at(6),
            x_offset: i16_at(8),
            y_offset: i16_at(10),
            flags: SpriteFlags::from_bits_retain(u16_at(12)),
            zoomed_offset: u16_at(14),
        }
    }

    fn to_record(self) -> [u8; RECORD_SIZE] {
        let mut r = [0u8; RECORD_SIZE];
        r[0..4].copy_from_slice(&self.offset.to_le_bytes());
        r[4..6].copy_from_slice(&self.width.to_le_bytes());
        r[6..8].copy_from_slice(&self.height.to_le_bytes());
        r[8..10].copy_from_slice(&self.x_offset.to_le_bytes());
        r[10..12].copy_from_slice(&self.y_offset.to_le_bytes());
        r[12..14].copy_from_slice(&self.flags.bits().to_le_bytes());
        r[14..16].copy_from_slice(&self.zoomed_offset.to_le_bytes());
        r
    }

    /// Width clamped to zero
    pub fn width_px(&self) -> usize {
        usize::try_from(self.width).unwrap_or(0)
    }

    /// Height clamped to zero
    pub fn height_px(&self) -> usize {
        usize::try_from(self.height).unwrap_or(0)
    }

    /// Screen area covered when drawn at `pos`, before zoom
    pub fn screen_rect(&self, pos: ScreenCoords) -> ScreenRect {
        ScreenRect::new(
            pos.x + i32::from(self.x_offset),
            pos.y + i32::from(self.y_offset),
            i32::from(self.width.max(0)),
            i32::from(self.height.max(0)),
        )
    }

    /// True for row-run compressed elements
    pub fn is_rle(&self) -> bool {
        self.flags.contains(SpriteFlags::RLE_COMPRESSION)
    }

    /// True for palette elements
    pub fn is_palette(&self) -> bool {
        self.flags.contains(SpriteFlags::PALETTE)
    }

    /// Id of the zoomed-out sibling of element `id`, if it has one
    pub fn zoomed_id(&self, id: u32) -> Option<u32> {
        if self.flags.contains(SpriteFlags::HAS_ZOOM_SPRITE) && self.zoomed_offset != 0 {
            id.checked_sub(u32::from(self.zoomed_offset))
        } else {
            None
        }
    }

    /// True for uncompressed elements flagged to draw nothing
    pub fn skips_drawing(&self) -> bool {
        self.flags.contains(SpriteFlags::SKIP_BITMAP) && !self.is_rle()
    }

    /// Bytes of raw data this element needs, `None` for RLE
    fn raw_len(&self) -> Option<usize> {
        if self.is_rle() {
            None
        } else if self.is_palette() {
            Some(self.width_px() * 3)
        } else {
            Some(self.width_px() * self.height_px())
        }
    }
}

/// A loaded sprite sheet
///
/// Read-only after construction and safe to share between threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteSheet {
    descriptors: Vec<SpriteDescriptor>,
    data: Vec<u8>,
    header_count: u32,
    count_source: CountSource,
}

impl SpriteSheet {
    /// Parse a sheet from memory
    ///
    /// `count_override` replaces the header's element count; the header count
    /// is still remembered and reported by [`header_count`](Self::header_count).
    pub fn from_bytes(bytes: &[u8], count_override: Option<u32>) -> Result<Self> {
        let header = bytes
            .get(..HEADER_SIZE)
            .ok_or_else(|| SheetError::Format(format!("truncated header: {} bytes", bytes.len())))?;
        let header_count = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let total_size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;

        let (count, count_source) = match count_override {
            Some(count) => {
                if count != header_count {
                    log::warn!(
                        "Sprite sheet header declares {} elements, using override of {}",
                        header_count,
                        count
                    );
                }
                (count, CountSource::Override)
            }
            None => (header_count, CountSource::Header),
        };

        let records_end = (count as usize)
            .checked_mul(RECORD_SIZE)
            .and_then(|len| len.checked_add(HEADER_SIZE))
            .filter(|&end| end <= bytes.len())
            .ok_or_else(|| {
                SheetError::Format(format!(
                    "truncated element table: {} records need more than the {} bytes available",
                    count,
                    bytes.len()
                ))
            })?;

        let records: &[[u8; RECORD_SIZE]] = bytemuck::try_cast_slice(&bytes[HEADER_SIZE..records_end])
            .map_err(|e| SheetError::Format(format!("element table: {e}")))?;
        let descriptors: Vec<SpriteDescriptor> = records.iter().map(SpriteDescriptor::from_record).collect();

        let blob = &bytes[records_end..];
        if blob.len() != total_size {
            return Err(SheetError::Format(format!(
                "header declares {} bytes of data but {} follow the element table",
                total_size,
                blob.len()
            )));
        }

        for (id, descriptor) in descriptors.iter().enumerate() {
            validate_element(id as u32, descriptor, blob.len())?;
        }

        log::info!(
            "Loaded sprite sheet: {} elements, {} bytes of data (count from {})",
            descriptors.len(),
            blob.len(),
            match count_source {
                CountSource::Header => "header",
                CountSource::Override => "override",
            }
        );

        Ok(Self {
            descriptors,
            data: blob.to_vec(),
            header_count,
            count_source,
        })
    }

    /// Load a sheet from disk
    pub fn load(path: impl AsRef<Path>, count_override: Option<u32>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("Loading sprite sheet from {:?}", path);
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes, count_override)
    }

    /// Load the sheet a [`SheetConfig`] points at
    pub fn from_config(config: &SheetConfig) -> Result<Self> {
        Self::load(&config.path, config.element_count_override)
    }

    /// Serialize back to the on-disk format
    ///
    /// The header count written is the number of elements held, which only
    /// differs from the loaded header when an override was used.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + self.descriptors.len() * RECORD_SIZE + self.data.len());
        out.extend_from_slice(&(self.descriptors.len() as u32).to_le_bytes());
        out.extend_from_slice(&(self.data.len() as u32).to_le_bytes());
        for descriptor in &self.descriptors {
            out.extend_from_slice(&descriptor.to_record());
        }
        out.extend_from_slice(&self.data);
        out
    }

    /// Write the sheet to disk
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_bytes())?;
        Ok(())
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// True when the sheet holds no elements
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Element count declared in the header the sheet was loaded from
    pub fn header_count(&self) -> u32 {
        self.header_count
    }

    /// Whether the header count or an override was used
    pub fn count_source(&self) -> CountSource {
        self.count_source
    }

    /// Look up an element
    pub fn get(&self, id: u32) -> Result<&SpriteDescriptor> {
        self.descriptors.get(id as usize).ok_or(SheetError::Index {
            id,
            count: self.descriptors.len() as u32,
        })
    }

    /// All element records in id order
    pub fn descriptors(&self) -> &[SpriteDescriptor] {
        &self.descriptors
    }

    /// The shared pixel arena
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Data of one element
    ///
    /// Raw and palette elements get exactly their bytes. RLE elements get
    /// everything from their offset to the end of the arena, since their
    /// length is only known after walking the runs.
    pub fn pixels(&self, id: u32) -> Result<&[u8]> {
        let descriptor = self.get(id)?;
        let start = descriptor.offset as usize;
        let end = match descriptor.raw_len() {
            Some(len) => start + len,
            None => self.data.len(),
        };
        self.data
            .get(start..end)
            .ok_or_else(|| SheetError::Format(format!("element {id} data is out of bounds")))
    }

    /// Encoded size of one element's data in bytes
    pub fn data_size(&self, id: u32) -> Result<usize> {
        let descriptor = self.get(id)?;
        match descriptor.raw_len() {
            Some(len) => Ok(len),
            None => rle::encoded_len(self.pixels(id)?, descriptor.height_px()),
        }
    }
}

fn validate_element(id: u32, descriptor: &SpriteDescriptor, data_len: usize) -> Result<()> {
    let start = descriptor.offset as usize;
    match descriptor.raw_len() {
        Some(0) => {}
        Some(len) if start + len > data_len => {
            return Err(SheetError::Format(format!(
                "element {id} needs bytes {}..{} but the data is {} bytes",
                start,
                start + len,
                data_len
            )));
        }
        Some(_) => {}
        None if descriptor.height > 0 && start + descriptor.height_px() * 2 > data_len => {
            return Err(SheetError::Format(format!(
                "element {id} row table at byte {start} is out of bounds"
            )));
        }
        None => {}
    }
    if descriptor.flags.contains(SpriteFlags::HAS_ZOOM_SPRITE) && descriptor.zoomed_id(id).is_none() {
        return Err(SheetError::Format(format!(
            "element {id} has a zoomed sibling offset of {} that points before the sheet",
            descriptor.zoomed_offset
        )));
    }
    Ok(())
}

/// Authoring helper that assembles a sheet in memory
///
/// Used by tools and tests; elements are appended in id order.
#[derive(Debug, Default)]
pub struct SpriteSheetBuilder {
    descriptors: Vec<SpriteDescriptor>,
    data: Vec<u8>,
}

impl SpriteSheetBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a keyed bitmap; index 0 is transparent
    pub fn push_bitmap(&mut self, width: usize, height: usize, x_offset: i16, y_offset: i16, pixels: &[u8]) -> Result<u32> {
        self.push_uncompressed(width, height, x_offset, y_offset, pixels, SpriteFlags::BMP)
    }

    /// Append an opaque bitmap copied without a transparency key
    pub fn push_raw(&mut self, width: usize, height: usize, x_offset: i16, y_offset: i16, pixels: &[u8]) -> Result<u32> {
        self.push_uncompressed(width, height, x_offset, y_offset, pixels, SpriteFlags::empty())
    }

    /// Append a bitmap, storing it row-run compressed
    pub fn push_rle(&mut self, width: usize, height: usize, x_offset: i16, y_offset: i16, pixels: &[u8]) -> Result<u32> {
        let encoded = rle::encode(width, height, pixels)?;
        Ok(self.push(
            dimension(width)?,
            dimension(height)?,
            x_offset,
            y_offset,
            SpriteFlags::RLE_COMPRESSION,
            &encoded,
        ))
    }

    /// Append a palette element covering `colours.len()` entries from `first_index`
    pub fn push_palette(&mut self, first_index: i16, colours: &[[u8; 3]]) -> u32 {
        let bgr: Vec<u8> = colours.iter().flat_map(|&[r, g, b]| [b, g, r]).collect();
        self.push(colours.len() as i16, 1, first_index, 0, SpriteFlags::PALETTE, &bgr)
    }

    /// Link `id` to a half-resolution sibling appended earlier
    pub fn with_zoomed_sibling(&mut self, id: u32, sibling: u32) -> Result<&mut Self> {
        let offset = id
            .checked_sub(sibling)
            .filter(|&d| d > 0)
            .and_then(|d| u16::try_from(d).ok())
            .ok_or_else(|| SheetError::Format(format!("sibling {sibling} cannot be referenced from {id}")))?;
        let descriptor = self.descriptor_mut(id)?;
        descriptor.flags |= SpriteFlags::HAS_ZOOM_SPRITE;
        descriptor.zoomed_offset = offset;
        Ok(self)
    }

    /// Add flags to an element already pushed
    pub fn with_flags(&mut self, id: u32, flags: SpriteFlags) -> Result<&mut Self> {
        self.descriptor_mut(id)?.flags |= flags;
        Ok(self)
    }

    /// Finish the sheet
    pub fn build(self) -> SpriteSheet {
        let count = self.descriptors.len() as u32;
        SpriteSheet {
            descriptors: self.descriptors,
            data: self.data,
            header_count: count,
            count_source: CountSource::Header,
        }
    }

    fn push_uncompressed(
        &mut self,
        width: usize,
        height: usize,
        x_offset: i16,
        y_offset: i16,
        pixels: &[u8],
        flags: SpriteFlags,
    ) -> Result<u32> {
        if pixels.len() != width * height {
            return Err(SheetError::Format(format!(
                "bitmap of {} bytes does not match {width}x{height}",
                pixels.len()
            )));
        }
        Ok(self.push(dimension(width)?, dimension(height)?, x_offset, y_offset, flags, pixels))
    }

    fn push(&mut self, width: i16, height: i16, x_offset: i16, y_offset: i16, flags: SpriteFlags, bytes: &[u8]) -> u32 {
        let id = self.descriptors.len() as u32;
        self.descriptors.push(SpriteDescriptor {
            offset: self.data.len() as u32,
            width,
            height,
            x_offset,
            y_offset,
            flags,
            zoomed_offset: 0,
        });
        self.data.extend_from_slice(bytes);
        id
    }

    fn descriptor_mut(&mut self, id: u32) -> Result<&mut SpriteDescriptor> {
        let count = self.descriptors.len() as u32;
        self.descriptors
            .get_mut(id as usize)
            .ok_or(SheetError::Index { id, count })
    }
}

fn dimension(value: usize) -> Result<i16> {
    i16::try_from(value).map_err(|_| SheetError::Format(format!("dimension {value} does not fit a sheet record")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_sheet() -> SpriteSheet {
        let mut builder = SpriteSheetBuilder::new();
        builder.push_bitmap(4, 4, -2, -4, &[0, 7, 7, 0].repeat(4)).unwrap();
        builder
            .push_rle(10, 1, 0, 0, &[0, 0, 5, 5, 5, 0, 0, 0, 0, 0])
            .unwrap();
        builder.push_palette(0, &[[1, 2, 3]]);
        builder.build()
    }

    #[test]
    fn test_get_and_index_error() {
        let sheet = sample_sheet();
        assert_eq!(sheet.len(), 3);
        let descriptor = sheet.get(0).unwrap();
        assert_eq!((descriptor.width, descriptor.height), (4, 4));
        assert_eq!((descriptor.x_offset, descriptor.y_offset), (-2, -4));
        assert!(descriptor.flags.contains(SpriteFlags::BMP));

        assert!(matches!(sheet.get(3), Err(SheetError::Index { id: 3, count: 3 })));
    }

    #[test]
    fn test_bytes_round_trip_is_bit_exact() {
        let sheet = sample_sheet();
        let bytes = sheet.to_bytes();
        let loaded = SpriteSheet::from_bytes(&bytes, None).unwrap();
        assert_eq!(loaded, sheet);
        assert_eq!(loaded.to_bytes(), bytes);
    }

    #[test]
    fn test_load_is_idempotent() {
        let bytes = sample_sheet().to_bytes();
        let a = SpriteSheet::from_bytes(&bytes, None).unwrap();
        let b = SpriteSheet::from_bytes(&bytes, None).unwrap();
        assert_eq!(a.descriptors(), b.descriptors());
        assert_eq!(a.data(), b.data());
    }

    #[test]
    fn test_unknown_flag_bits_survive() {
        let mut builder = SpriteSheetBuilder::new();
        let id = builder.push_raw(1, 1, 0, 0, &[1]).unwrap();
        builder.with_flags(id, SpriteFlags::from_bits_retain(0x8000)).unwrap();
        let bytes = builder.build().to_bytes();
        let loaded = SpriteSheet::from_bytes(&bytes, None).unwrap();
        assert_eq!(loaded.get(id).unwrap().flags.bits(), 0x8000);
    }

    #[test]
    fn test_truncated_inputs() {
        assert!(matches!(SpriteSheet::from_bytes(&[1, 0, 0], None), Err(SheetError::Format(_))));

        let bytes = sample_sheet().to_bytes();
        assert!(matches!(
            SpriteSheet::from_bytes(&bytes[..HEADER_SIZE + RECORD_SIZE], None),
            Err(SheetError::Format(_))
        ));
        assert!(matches!(
            SpriteSheet::from_bytes(&bytes[..bytes.len() - 1], None),
            Err(SheetError::Format(_))
        ));
    }

    #[test]
    fn test_total_size_mismatch() {
        let mut bytes = sample_sheet().to_bytes();
        bytes.push(0);
        assert!(matches!(SpriteSheet::from_bytes(&bytes, None), Err(SheetError::Format(_))));
    }

    #[test]
    fn test_raw_element_out_of_bounds() {
        let mut bytes = sample_sheet().to_bytes();
        // push element 0's offset past the blob
        bytes[HEADER_SIZE..HEADER_SIZE + 4].copy_from_slice(&1000u32.to_le_bytes());
        assert!(matches!(SpriteSheet::from_bytes(&bytes, None), Err(SheetError::Format(_))));
    }

    #[test]
    fn test_count_override() {
        let mut bytes = sample_sheet().to_bytes();
        bytes[0..4].copy_from_slice(&40u32.to_le_bytes());
        assert!(SpriteSheet::from_bytes(&bytes, None).is_err());

        let sheet = SpriteSheet::from_bytes(&bytes, Some(3)).unwrap();
        assert_eq!(sheet.len(), 3);
        assert_eq!(sheet.header_count(), 40);
        assert_eq!(sheet.count_source(), CountSource::Override);
    }

    #[test]
    fn test_data_size() {
        let sheet = sample_sheet();
        assert_eq!(sheet.data_size(0).unwrap(), 16);
        // row table + header + x + three pixels
        assert_eq!(sheet.data_size(1).unwrap(), 2 + 2 + 3);
        assert_eq!(sheet.data_size(2).unwrap(), 3);
        assert_eq!(sheet.pixels(2).unwrap(), &[3, 2, 1]);
    }

    #[test]
    fn test_zoomed_sibling() {
        let mut builder = SpriteSheetBuilder::new();
        let small = builder.push_bitmap(1, 1, 0, 0, &[1]).unwrap();
        let big = builder.push_bitmap(2, 2, 0, 0, &[2; 4]).unwrap();
        builder.with_zoomed_sibling(big, small).unwrap();
        assert!(builder.with_zoomed_sibling(small, big).is_err());

        let sheet = SpriteSheet::from_bytes(&builder.build().to_bytes(), None).unwrap();
        assert_eq!(sheet.get(big).unwrap().zoomed_id(big), Some(small));
        assert_eq!(sheet.get(small).unwrap().zoomed_id(small), None);
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir().join(format!("iso_engine_sheet_{}.dat", std::process::id()));
        let sheet = sample_sheet();
        sheet.save(&path).unwrap();
        let loaded = SpriteSheet::load(&path, None).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, sheet);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = SpriteSheet::load("/nonexistent/iso_engine/g1.dat", None);
        assert!(matches!(result, Err(SheetError::Io(_))));
    }
}
