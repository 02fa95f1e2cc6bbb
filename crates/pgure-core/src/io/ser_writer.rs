use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use ndarray::ArrayView2;

use crate::error::{PgureError, Result};
use crate::frame::Sequence;
use crate::io::ser::{SerHeader, SER_HEADER_SIZE, SER_MAGIC};

/// Writes a valid SER file at the raw byte level.
pub struct SerWriter {
    writer: BufWriter<File>,
    header: SerHeader,
    frame_bytes: usize,
    frames_written: u32,
}

impl SerWriter {
    /// Create a new SER file and write the header.
    pub fn create(path: &Path, header: &SerHeader) -> Result<Self> {
        let frame_bytes = header.frame_byte_size()?;
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        write_header(&mut writer, header)?;
        Ok(Self {
            writer,
            header: header.clone(),
            frame_bytes,
            frames_written: 0,
        })
    }

    /// Write a single raw frame (bytes must match the header's frame_byte_size).
    pub fn write_raw_frame(&mut self, data: &[u8]) -> Result<()> {
        if data.len() != self.frame_bytes {
            return Err(PgureError::BufferSizeMismatch {
                expected: self.frame_bytes,
                actual: data.len(),
            });
        }
        self.writer.write_all(data)?;
        self.frames_written += 1;
        Ok(())
    }

    /// Encode a mono frame of sample counts, clamped to the header's bit
    /// depth and rounded to the nearest integer.
    pub fn write_frame(&mut self, frame: ArrayView2<'_, f64>) -> Result<()> {
        let (h, w) = frame.dim();
        if (w, h) != (self.header.width as usize, self.header.height as usize) {
            return Err(PgureError::ShapeMismatch(format!(
                "frame is {}x{}, SER header is {}x{}",
                w, h, self.header.width, self.header.height
            )));
        }
        let max = self.header.max_value();
        let wide = self.header.bytes_per_pixel_plane() == 2;
        let mut bytes = Vec::with_capacity(self.frame_bytes);
        for &v in frame.iter() {
            let v = if v.is_finite() { v.clamp(0.0, max).round() } else { 0.0 };
            if wide {
                let sample = v as u16;
                if self.header.little_endian {
                    bytes.extend_from_slice(&sample.to_le_bytes());
                } else {
                    bytes.extend_from_slice(&sample.to_be_bytes());
                }
            } else {
                bytes.push(v as u8);
            }
        }
        self.write_raw_frame(&bytes)
    }

    /// Write the optional timestamp trailer (one u64 per frame, little-endian).
    pub fn write_timestamps(&mut self, timestamps: &[u64]) -> Result<()> {
        for &ts in timestamps {
            self.writer.write_all(&ts.to_le_bytes())?;
        }
        Ok(())
    }

    /// Flush and finalize the file.
    pub fn finalize(mut self) -> Result<()> {
        if self.frames_written != self.header.frame_count {
            return Err(PgureError::InvalidSer(format!(
                "header announces {} frames, {} written",
                self.header.frame_count, self.frames_written
            )));
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Write a whole sequence as a mono SER file.
///
/// `template` supplies bit depth and metadata; geometry and frame count are
/// taken from the sequence.
pub fn write_sequence(
    path: &Path,
    sequence: &Sequence,
    template: &SerHeader,
    timestamps: Option<&[u64]>,
) -> Result<()> {
    let shape = sequence.shape();
    let header = SerHeader {
        width: shape.width as u32,
        height: shape.height as u32,
        frame_count: shape.frames as u32,
        ..template.to_mono()
    };
    let mut writer = SerWriter::create(path, &header)?;
    for i in 0..shape.frames {
        writer.write_frame(sequence.frame(i))?;
    }
    if let Some(ts) = timestamps.filter(|ts| ts.len() == shape.frames) {
        writer.write_timestamps(ts)?;
    }
    writer.finalize()
}

fn write_header(w: &mut impl Write, header: &SerHeader) -> Result<()> {
    w.write_all(SER_MAGIC)?;
    // LuID
    w.write_all(&0i32.to_le_bytes())?;
    w.write_all(&header.color_id.to_le_bytes())?;
    // LittleEndian flag: 0 = little-endian (Siril convention)
    let le_flag: i32 = if header.little_endian { 0 } else { 1 };
    w.write_all(&le_flag.to_le_bytes())?;
    w.write_all(&(header.width as i32).to_le_bytes())?;
    w.write_all(&(header.height as i32).to_le_bytes())?;
    w.write_all(&(header.pixel_depth as i32).to_le_bytes())?;
    w.write_all(&(header.frame_count as i32).to_le_bytes())?;
    write_fixed_string(w, &header.observer, 40)?;
    write_fixed_string(w, &header.instrument, 40)?;
    write_fixed_string(w, &header.telescope, 40)?;
    w.write_all(&header.date_time.to_le_bytes())?;
    w.write_all(&header.date_time_utc.to_le_bytes())?;

    debug_assert_eq!(
        14 + 4 + 4 + 4 + 4 + 4 + 4 + 4 + 40 + 40 + 40 + 8 + 8,
        SER_HEADER_SIZE
    );
    Ok(())
}

fn write_fixed_string(w: &mut impl Write, s: &str, len: usize) -> Result<()> {
    let bytes = s.as_bytes();
    let to_write = bytes.len().min(len);
    w.write_all(&bytes[..to_write])?;
    w.write_all(&vec![0u8; len - to_write])?;
    Ok(())
}
