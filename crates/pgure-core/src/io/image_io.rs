use std::path::{Path, PathBuf};

use image::{GrayImage, ImageBuffer, ImageFormat, Luma};
use ndarray::ArrayView2;

use crate::error::{PgureError, Result};
use crate::frame::Sequence;

/// Save a frame as 16-bit grayscale TIFF. Samples are divided by
/// `max_value` before quantization.
pub fn save_tiff(frame: ArrayView2<'_, f64>, max_value: f64, path: &Path) -> Result<()> {
    let (h, w) = frame.dim();
    let pixels: Vec<u16> = frame
        .iter()
        .map(|&v| (unit(v, max_value) * 65535.0).round() as u16)
        .collect();

    let img = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(w as u32, h as u32, pixels)
        .ok_or_else(|| PgureError::ShapeMismatch(format!("{w}x{h} image buffer")))?;
    img.save_with_format(path, ImageFormat::Tiff)?;
    Ok(())
}

/// Save a frame as 8-bit grayscale PNG.
pub fn save_png(frame: ArrayView2<'_, f64>, max_value: f64, path: &Path) -> Result<()> {
    let (h, w) = frame.dim();
    let mut img = GrayImage::new(w as u32, h as u32);
    for ((row, col), &v) in frame.indexed_iter() {
        let val = (unit(v, max_value) * 255.0).round() as u8;
        img.put_pixel(col as u32, row as u32, Luma([val]));
    }

    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Save frame, choosing format from file extension.
pub fn save_image(frame: ArrayView2<'_, f64>, max_value: f64, path: &Path) -> Result<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("png") => save_png(frame, max_value, path),
        _ => save_tiff(frame, max_value, path),
    }
}

/// Write every frame of `sequence` into `dir` as `<prefix>_00000.<ext>`.
pub fn export_frames(
    sequence: &Sequence,
    max_value: f64,
    dir: &Path,
    prefix: &str,
    extension: &str,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    (0..sequence.frame_count())
        .map(|i| {
            let path = dir.join(format!("{prefix}_{i:05}.{extension}"));
            save_image(sequence.frame(i), max_value, &path)?;
            Ok(path)
        })
        .collect()
}

fn unit(v: f64, max_value: f64) -> f64 {
    if max_value > 0.0 && v.is_finite() {
        (v / max_value).clamp(0.0, 1.0)
    } else {
        0.0
    }
}
