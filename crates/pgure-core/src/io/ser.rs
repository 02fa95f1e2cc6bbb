use std::fs::File;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use memmap2::Mmap;
use ndarray::Array2;
use tracing::debug;

use crate::error::{PgureError, Result};
use crate::frame::{ColorMode, Sequence, SourceInfo};

pub const SER_HEADER_SIZE: usize = 178;
pub const SER_MAGIC: &[u8; 14] = b"LUCAM-RECORDER";

/// SER file header (178 bytes).
#[derive(Clone, Debug, PartialEq)]
pub struct SerHeader {
    pub color_id: i32,
    pub little_endian: bool,
    pub width: u32,
    pub height: u32,
    pub pixel_depth: u32,
    pub frame_count: u32,
    pub observer: String,
    pub instrument: String,
    pub telescope: String,
    pub date_time: u64,
    pub date_time_utc: u64,
}

impl SerHeader {
    /// Header for a little-endian mono sequence with empty metadata.
    pub fn mono(width: u32, height: u32, pixel_depth: u32, frame_count: u32) -> Self {
        Self {
            color_id: 0,
            little_endian: true,
            width,
            height,
            pixel_depth,
            frame_count,
            observer: String::new(),
            instrument: String::new(),
            telescope: String::new(),
            date_time: 0,
            date_time_utc: 0,
        }
    }

    /// Mono header carrying this file's geometry and metadata, for writing
    /// processed output.
    pub fn to_mono(&self) -> Self {
        Self {
            color_id: 0,
            little_endian: true,
            ..self.clone()
        }
    }

    /// Bytes per pixel plane (1 for 8-bit, 2 for 9-16 bit).
    pub fn bytes_per_pixel_plane(&self) -> usize {
        if self.pixel_depth <= 8 {
            1
        } else {
            2
        }
    }

    /// Number of planes per pixel (1 for mono/bayer, 3 for RGB/BGR).
    pub fn planes_per_pixel(&self) -> usize {
        match self.color_id {
            100 | 101 => 3,
            _ => 1,
        }
    }

    /// Total bytes per frame. Fails when the geometry overflows `usize`.
    pub fn frame_byte_size(&self) -> Result<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|n| n.checked_mul(self.bytes_per_pixel_plane()))
            .and_then(|n| n.checked_mul(self.planes_per_pixel()))
            .ok_or_else(|| {
                PgureError::InvalidSer(format!(
                    "Frame size overflows for {}x{}",
                    self.width, self.height
                ))
            })
    }

    /// Largest sample value representable at this bit depth.
    pub fn max_value(&self) -> f64 {
        let depth = self.pixel_depth.clamp(1, 16);
        ((1u32 << depth) - 1) as f64
    }

    pub fn color_mode(&self) -> ColorMode {
        match self.color_id {
            0 => ColorMode::Mono,
            8 => ColorMode::BayerRGGB,
            9 => ColorMode::BayerGRBG,
            10 => ColorMode::BayerGBRG,
            11 => ColorMode::BayerBGGR,
            100 => ColorMode::RGB,
            101 => ColorMode::BGR,
            _ => ColorMode::Mono,
        }
    }
}

/// Memory-mapped SER file reader.
pub struct SerReader {
    mmap: Mmap,
    pub header: SerHeader,
    frame_bytes: usize,
}

impl SerReader {
    /// Open a SER file and parse its header.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        // SAFETY: the map is read-only and the file is not modified while open.
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.len() < SER_HEADER_SIZE {
            return Err(PgureError::InvalidSer(
                "File too small for SER header".into(),
            ));
        }

        if &mmap[0..14] != SER_MAGIC {
            return Err(PgureError::InvalidSer(
                "Missing LUCAM-RECORDER magic".into(),
            ));
        }

        let header = parse_header(&mmap[..SER_HEADER_SIZE])?;

        let frame_bytes = header.frame_byte_size()?;
        let expected_data_size = frame_bytes
            .checked_mul(header.frame_count as usize)
            .and_then(|n| n.checked_add(SER_HEADER_SIZE))
            .ok_or_else(|| PgureError::InvalidSer("Frame data size overflows".into()))?;
        if mmap.len() < expected_data_size {
            return Err(PgureError::InvalidSer(format!(
                "File truncated: expected at least {} bytes, got {}",
                expected_data_size,
                mmap.len()
            )));
        }
        debug!(
            width = header.width,
            height = header.height,
            frames = header.frame_count,
            depth = header.pixel_depth,
            "Opened SER file"
        );

        Ok(Self {
            mmap,
            header,
            frame_bytes,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.header.frame_count as usize
    }

    /// Bytes per frame, validated against the file size on open.
    pub fn frame_bytes(&self) -> usize {
        self.frame_bytes
    }

    /// Get the raw bytes for a single frame (zero-copy from mmap).
    pub fn frame_raw(&self, index: usize) -> Result<&[u8]> {
        let count = self.frame_count();
        if index >= count {
            return Err(PgureError::FrameIndexOutOfRange {
                index,
                total: count,
            });
        }
        let offset = SER_HEADER_SIZE + index * self.frame_bytes;
        let end = offset + self.frame_bytes;
        Ok(&self.mmap[offset..end])
    }

    /// Read a single frame as sample counts (0..=2^depth - 1).
    ///
    /// RGB/BGR data is reduced to its green plane.
    pub fn read_frame(&self, index: usize) -> Result<Array2<f64>> {
        let raw = self.frame_raw(index)?;
        let h = self.header.height as usize;
        let w = self.header.width as usize;
        let bpp = self.header.bytes_per_pixel_plane();
        let planes = self.header.planes_per_pixel();
        let plane_index = if planes == 1 { 0 } else { 1 };
        Ok(decode_plane(
            raw,
            h,
            w,
            bpp,
            planes,
            plane_index,
            self.header.little_endian,
        ))
    }

    /// Read every frame into one sequence.
    pub fn read_sequence(&self) -> Result<Sequence> {
        let frames = (0..self.frame_count())
            .map(|i| self.read_frame(i))
            .collect::<Result<Vec<_>>>()?;
        Sequence::from_frames(&frames)
    }

    /// Per-frame timestamps from the optional trailer, if the file has one.
    pub fn timestamps(&self) -> Option<Vec<u64>> {
        let trailer_offset = SER_HEADER_SIZE + self.frame_bytes * self.frame_count();
        let trailer_end = trailer_offset.checked_add(8 * self.frame_count())?;
        let trailer = self.mmap.get(trailer_offset..trailer_end)?;
        let mut cursor = std::io::Cursor::new(trailer);
        (0..self.frame_count())
            .map(|_| cursor.read_u64::<LittleEndian>().ok())
            .collect()
    }

    /// Build SourceInfo from the header.
    pub fn source_info(&self, path: &Path) -> SourceInfo {
        SourceInfo {
            filename: path.to_path_buf(),
            total_frames: self.frame_count(),
            width: self.header.width,
            height: self.header.height,
            bit_depth: self.header.pixel_depth as u8,
            color_mode: self.header.color_mode(),
            observer: non_empty(&self.header.observer),
            telescope: non_empty(&self.header.telescope),
            instrument: non_empty(&self.header.instrument),
        }
    }
}

fn parse_header(buf: &[u8]) -> Result<SerHeader> {
    let mut cursor = std::io::Cursor::new(&buf[14..]); // skip magic

    let _lu_id = cursor.read_i32::<LittleEndian>()?;
    let color_id = cursor.read_i32::<LittleEndian>()?;
    let le_flag = cursor.read_i32::<LittleEndian>()?;
    let width = cursor.read_i32::<LittleEndian>()?;
    let height = cursor.read_i32::<LittleEndian>()?;
    let pixel_depth = cursor.read_i32::<LittleEndian>()?;
    let frame_count = cursor.read_i32::<LittleEndian>()?;

    let observer = read_fixed_string(&buf[42..82]);
    let instrument = read_fixed_string(&buf[82..122]);
    let telescope = read_fixed_string(&buf[122..162]);

    let mut cursor = std::io::Cursor::new(&buf[162..]);
    let date_time = cursor.read_u64::<LittleEndian>()?;
    let date_time_utc = cursor.read_u64::<LittleEndian>()?;

    if width <= 0 || height <= 0 || frame_count < 0 {
        return Err(PgureError::InvalidDimensions {
            width: width.max(0) as usize,
            height: height.max(0) as usize,
            frames: frame_count.max(0) as usize,
        });
    }
    if !(1..=16).contains(&pixel_depth) {
        return Err(PgureError::InvalidSer(format!(
            "Unsupported pixel depth {pixel_depth}"
        )));
    }

    // SER format: LittleEndian field = 0 means big-endian pixel data,
    // but many writers (including FireCapture) use 0 for little-endian.
    // Follow Siril's convention: treat 0 as little-endian.
    let little_endian = le_flag != 1;

    Ok(SerHeader {
        color_id,
        little_endian,
        width: width as u32,
        height: height as u32,
        pixel_depth: pixel_depth as u32,
        frame_count: frame_count as u32,
        observer,
        instrument,
        telescope,
        date_time,
        date_time_utc,
    })
}

fn read_fixed_string(buf: &[u8]) -> String {
    String::from_utf8_lossy(buf)
        .trim_end_matches('\0')
        .trim()
        .to_string()
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Decode one plane of (possibly interleaved) samples. Mono data is a
/// single plane at index 0.
fn decode_plane(
    raw: &[u8],
    height: usize,
    width: usize,
    bytes_per_sample: usize,
    planes: usize,
    plane_index: usize,
    little_endian: bool,
) -> Array2<f64> {
    Array2::from_shape_fn((height, width), |(row, col)| {
        let idx = ((row * width + col) * planes + plane_index) * bytes_per_sample;
        if bytes_per_sample == 1 {
            raw[idx] as f64
        } else {
            let pair = [raw[idx], raw[idx + 1]];
            if little_endian {
                u16::from_le_bytes(pair) as f64
            } else {
                u16::from_be_bytes(pair) as f64
            }
        }
    })
}
