use ndarray::Array3;

use pgure_core::frame::Sequence;
use pgure_core::io::ser::SER_HEADER_SIZE;

/// Build a SER file header for mono 8-bit frames.
///
/// Returns a `Vec<u8>` containing just the 178-byte header.
/// Append frame pixel data after calling this function.
pub fn build_ser_header(width: u32, height: u32, num_frames: usize) -> Vec<u8> {
    build_ser_header_full(width, height, 8, num_frames, 0)
}

/// Build a SER file header with configurable bit depth and color mode.
///
/// `color_id`: 0=MONO, 8=BAYER_RGGB, 9=BAYER_GRBG, 10=BAYER_GBRG, 11=BAYER_BGGR,
///             100=RGB, 101=BGR
pub fn build_ser_header_full(
    width: u32,
    height: u32,
    bit_depth: u32,
    num_frames: usize,
    color_id: i32,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(SER_HEADER_SIZE);

    buf.extend_from_slice(b"LUCAM-RECORDER");
    // LuID
    buf.extend_from_slice(&0i32.to_le_bytes());
    buf.extend_from_slice(&color_id.to_le_bytes());
    // LittleEndian = 0 (little-endian per Siril convention)
    buf.extend_from_slice(&0i32.to_le_bytes());
    buf.extend_from_slice(&(width as i32).to_le_bytes());
    buf.extend_from_slice(&(height as i32).to_le_bytes());
    buf.extend_from_slice(&(bit_depth as i32).to_le_bytes());
    buf.extend_from_slice(&(num_frames as i32).to_le_bytes());
    // Observer
    let mut observer = [0u8; 40];
    observer[..4].copy_from_slice(b"Test");
    buf.extend_from_slice(&observer);
    // Instrument
    buf.extend_from_slice(&[0u8; 40]);
    // Telescope
    let mut telescope = [0u8; 40];
    telescope[..7].copy_from_slice(b"MyScope");
    buf.extend_from_slice(&telescope);
    // DateTime, DateTimeUTC
    buf.extend_from_slice(&0u64.to_le_bytes());
    buf.extend_from_slice(&0u64.to_le_bytes());

    assert_eq!(buf.len(), SER_HEADER_SIZE);
    buf
}

/// Build a complete synthetic mono 8-bit SER file with the given frame data.
pub fn build_ser_with_frames(width: u32, height: u32, frames: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = build_ser_header(width, height, frames.len());
    for frame in frames {
        buf.extend_from_slice(frame);
    }
    buf
}

/// Write a SER buffer to a temporary file and return the temp file handle.
///
/// The file stays alive as long as the returned `NamedTempFile` is not dropped.
pub fn write_test_ser(data: &[u8]) -> tempfile::NamedTempFile {
    use std::io::Write;
    let mut f = tempfile::NamedTempFile::new().expect("create temp file");
    f.write_all(data).expect("write SER data");
    f.flush().expect("flush");
    f
}

/// Deterministic noise source (64-bit LCG with Box-Muller for normals).
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed.wrapping_mul(6364136223846793005).wrapping_add(1))
    }

    /// Uniform in `(0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 11) as f64 + 0.5) / (1u64 << 53) as f64
    }

    pub fn normal(&mut self) -> f64 {
        let u1 = self.uniform();
        let u2 = self.uniform();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }
}

/// Smooth static scene in sample counts: a gradient plus a bright blob.
pub fn static_scene(frames: usize, height: usize, width: usize) -> Array3<f64> {
    Array3::from_shape_fn((frames, height, width), |(_, r, c)| {
        let y = r as f64 - height as f64 / 2.0;
        let x = c as f64 - width as f64 / 2.0;
        let blob = (-(x * x + y * y) / (2.0 * (width as f64 / 4.0).powi(2))).exp();
        100.0 + 2.0 * c as f64 + 80.0 * blob
    })
}

/// Add zero-mean Gaussian noise with standard deviation `sigma`.
pub fn add_noise(clean: &Array3<f64>, sigma: f64, seed: u64) -> Array3<f64> {
    let mut rng = Lcg::new(seed);
    clean.mapv(|v| v + sigma * rng.normal())
}

/// Uniform random sequence in `[lo, hi)`.
pub fn random_sequence(frames: usize, height: usize, width: usize, lo: f64, hi: f64, seed: u64) -> Sequence {
    let mut rng = Lcg::new(seed);
    let data = Array3::from_shape_fn((frames, height, width), |_| lo + (hi - lo) * rng.uniform());
    Sequence::from_array(data).expect("non-empty sequence")
}

pub fn mse(a: &Array3<f64>, b: &Array3<f64>) -> f64 {
    let n = a.len() as f64;
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum::<f64>() / n
}
