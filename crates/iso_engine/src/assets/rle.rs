//! Run-length codec for G1 sprites
//!
//! An RLE sprite starts with one little-endian `u16` per row giving the byte
//! offset of that row's run list, relative to the start of the sprite. A run
//! list is a sequence of runs laid out as
//!
//! ```text
//! [length | 0x80 if last run of the row] [x start] [length pixel bytes]
//! ```
//!
//! where `x start` is the absolute column of the run's first pixel. Columns
//! not covered by any run are transparent. A row without visible pixels is
//! stored as a single zero-length run with the end marker set.

use super::{Result, SheetError};

/// Marks the final run of a row
pub const END_OF_ROW: u8 = 0x80;

/// Longest run a single chunk can hold
pub const MAX_RUN_LENGTH: usize = 0x7F;

/// Widest sprite the codec can address; run starts are a single byte
pub const MAX_RLE_WIDTH: usize = 256;

/// One run of opaque pixels within a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RleRun<'a> {
    /// Column of the first pixel
    pub x_start: usize,
    /// Pixel bytes, possibly empty for a blank row
    pub pixels: &'a [u8],
}

impl RleRun<'_> {
    /// One past the last column covered
    pub fn x_end(&self) -> usize {
        self.x_start + self.pixels.len()
    }
}

/// Iterator over the runs of one row
///
/// Yields an error and stops if the run list points outside `data`.
#[derive(Debug, Clone)]
pub struct RowRuns<'a> {
    data: &'a [u8],
    pos: usize,
    done: bool,
}

impl RowRuns<'_> {
    /// Byte position just past the last run read so far
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl<'a> Iterator for RowRuns<'a> {
    type Item = Result<RleRun<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let Some(&[header, x_start]) = self.data.get(self.pos..self.pos + 2) else {
            self.done = true;
            return Some(Err(SheetError::Format(format!(
                "RLE run header at byte {} is out of bounds",
                self.pos
            ))));
        };
        let len = usize::from(header & 0x7F);
        let start = self.pos + 2;
        let Some(pixels) = self.data.get(start..start + len) else {
            self.done = true;
            return Some(Err(SheetError::Format(format!(
                "RLE run of {len} pixels at byte {start} is out of bounds"
            ))));
        };
        self.pos = start + len;
        self.done = header & END_OF_ROW != 0;
        Some(Ok(RleRun {
            x_start: usize::from(x_start),
            pixels,
        }))
    }
}

/// Runs of `row` in an RLE sprite whose data starts at `data[0]`
pub fn row_runs(data: &[u8], row: usize) -> Result<RowRuns<'_>> {
    let offset = row_offset(data, row)?;
    Ok(RowRuns {
        data,
        pos: offset,
        done: false,
    })
}

fn row_offset(data: &[u8], row: usize) -> Result<usize> {
    data.get(row * 2..row * 2 + 2)
        .map(|b| usize::from(u16::from_le_bytes([b[0], b[1]])))
        .ok_or_else(|| SheetError::Format(format!("RLE row table entry {row} is out of bounds")))
}

/// Total encoded size of an RLE sprite of `height` rows
///
/// The last row's run list ends the sprite, so only that row is walked.
pub fn encoded_len(data: &[u8], height: usize) -> Result<usize> {
    if height == 0 {
        return Ok(0);
    }
    let mut runs = row_runs(data, height - 1)?;
    for run in runs.by_ref() {
        run?;
    }
    Ok(runs.position())
}

/// Encode an indexed bitmap, treating index 0 as transparent
pub fn encode(width: usize, height: usize, pixels: &[u8]) -> Result<Vec<u8>> {
    if pixels.len() != width * height {
        return Err(SheetError::Format(format!(
            "bitmap of {} bytes does not match {width}x{height}",
            pixels.len()
        )));
    }
    if width > MAX_RLE_WIDTH {
        return Err(SheetError::Format(format!(
            "RLE sprites are limited to {MAX_RLE_WIDTH} columns, got {width}"
        )));
    }

    let mut out = vec![0u8; height * 2];
    for y in 0..height {
        let row = &pixels[y * width..(y + 1) * width];
        let offset = u16::try_from(out.len())
            .map_err(|_| SheetError::Format("RLE sprite exceeds 64 KiB".to_string()))?;
        out[y * 2..y * 2 + 2].copy_from_slice(&offset.to_le_bytes());

        let mut last_header = None;
        let mut x = 0;
        while x < row.len() {
            if row[x] == 0 {
                x += 1;
                continue;
            }
            let start = x;
            while x < row.len() && row[x] != 0 && x - start < MAX_RUN_LENGTH {
                x += 1;
            }
            last_header = Some(out.len());
            out.push((x - start) as u8);
            out.push(start as u8);
            out.extend_from_slice(&row[start..x]);
        }

        match last_header {
            Some(at) => out[at] |= END_OF_ROW,
            None => out.extend_from_slice(&[END_OF_ROW, 0]),
        }
    }
    Ok(out)
}

/// Decode an RLE sprite back to a `width * height` bitmap
///
/// Transparent pixels decode to 0. Runs that extend past `width` are clipped.
pub fn decode(data: &[u8], width: usize, height: usize) -> Result<Vec<u8>> {
    let mut out = vec![0u8; width * height];
    for y in 0..height {
        let row = &mut out[y * width..(y + 1) * width];
        for run in row_runs(data, y)? {
            let run = run?;
            if run.x_start >= width {
                continue;
            }
            let end = run.x_end().min(width);
            row[run.x_start..end].copy_from_slice(&run.pixels[..end - run.x_start]);
        }
    }
    Ok(out)
}
