use std::path::PathBuf;
use std::sync::OnceLock;

use ndarray::{s, Array2, Array3, ArrayView2, ArrayView3, Axis};

use crate::error::{PgureError, Result};

/// Spatial and temporal extent of a sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SequenceShape {
    pub width: usize,
    pub height: usize,
    pub frames: usize,
}

impl SequenceShape {
    /// Build a shape, rejecting any zero extent.
    pub fn new(width: usize, height: usize, frames: usize) -> Result<Self> {
        if width == 0 || height == 0 || frames == 0 {
            return Err(PgureError::InvalidDimensions {
                width,
                height,
                frames,
            });
        }
        Ok(Self {
            width,
            height,
            frames,
        })
    }

    /// Samples in a single frame.
    pub fn frame_len(&self) -> usize {
        self.width * self.height
    }

    /// Samples in the whole sequence.
    pub fn len(&self) -> usize {
        self.frame_len() * self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Display for SequenceShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.frames)
    }
}

/// An ordered stack of equally sized grayscale frames.
///
/// Samples are stored frame-major in a single contiguous buffer of shape
/// `(frames, height, width)`; within a frame, rows are contiguous.
#[derive(Clone, Debug, PartialEq)]
pub struct Sequence {
    pub data: Array3<f64>,
}

impl Sequence {
    /// Wrap an existing array, rejecting empty extents.
    pub fn from_array(data: Array3<f64>) -> Result<Self> {
        let (frames, height, width) = data.dim();
        SequenceShape::new(width, height, frames)?;
        Ok(Self { data })
    }

    /// Build a sequence from a flat buffer laid out as
    /// `index = frame * height * width + row * width + col`.
    pub fn from_flat(samples: Vec<f64>, shape: SequenceShape) -> Result<Self> {
        if samples.len() != shape.len() {
            return Err(PgureError::BufferSizeMismatch {
                expected: shape.len(),
                actual: samples.len(),
            });
        }
        let data = Array3::from_shape_vec((shape.frames, shape.height, shape.width), samples)
            .map_err(|e| PgureError::ShapeMismatch(e.to_string()))?;
        Ok(Self { data })
    }

    /// Stack 2D frames, which must all share the first frame's dimensions.
    pub fn from_frames(frames: &[Array2<f64>]) -> Result<Self> {
        let first = frames.first().ok_or(PgureError::EmptySequence)?;
        let (h, w) = first.dim();
        let shape = SequenceShape::new(w, h, frames.len())?;
        let mut data = Array3::<f64>::zeros((shape.frames, h, w));
        for (i, frame) in frames.iter().enumerate() {
            if frame.dim() != (h, w) {
                return Err(PgureError::ShapeMismatch(format!(
                    "frame {} is {}x{}, expected {}x{}",
                    i,
                    frame.ncols(),
                    frame.nrows(),
                    w,
                    h
                )));
            }
            data.index_axis_mut(Axis(0), i).assign(frame);
        }
        Ok(Self { data })
    }

    pub fn zeros(shape: SequenceShape) -> Self {
        Self {
            data: Array3::zeros((shape.frames, shape.height, shape.width)),
        }
    }

    pub fn shape(&self) -> SequenceShape {
        let (frames, height, width) = self.data.dim();
        SequenceShape {
            width,
            height,
            frames,
        }
    }

    pub fn width(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    pub fn height(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn frame_count(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// Borrow a single frame.
    pub fn frame(&self, index: usize) -> ArrayView2<'_, f64> {
        self.data.index_axis(Axis(0), index)
    }

    /// Borrow `len` consecutive frames starting at `start`.
    pub fn window(&self, start: usize, len: usize) -> ArrayView3<'_, f64> {
        self.data.slice(s![start..start + len, .., ..])
    }

    /// Copy the samples into `out`, which must hold exactly `shape().len()` values.
    pub fn copy_into(&self, out: &mut [f64]) -> Result<()> {
        let expected = self.shape().len();
        if out.len() != expected {
            return Err(PgureError::BufferSizeMismatch {
                expected,
                actual: out.len(),
            });
        }
        for (dst, src) in out.iter_mut().zip(self.data.iter()) {
            *dst = *src;
        }
        Ok(())
    }

    /// Consume the sequence into its flat, frame-major buffer.
    pub fn into_flat(self) -> Vec<f64> {
        if self.data.is_standard_layout() {
            let (v, _offset) = self.data.into_raw_vec_and_offset();
            v
        } else {
            self.data.iter().copied().collect()
        }
    }
}

/// Pre-allocated write-once frame slots.
///
/// Each slot accepts exactly one frame; concurrent writers targeting distinct
/// indices never contend.
pub struct FrameSlots {
    height: usize,
    width: usize,
    slots: Vec<OnceLock<Array2<f64>>>,
}

impl FrameSlots {
    pub fn new(shape: SequenceShape) -> Self {
        Self {
            height: shape.height,
            width: shape.width,
            slots: (0..shape.frames).map(|_| OnceLock::new()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Store `frame` in slot `index`.
    pub fn write(&self, index: usize, frame: Array2<f64>) -> Result<()> {
        let slot = self
            .slots
            .get(index)
            .ok_or(PgureError::FrameIndexOutOfRange {
                index,
                total: self.slots.len(),
            })?;
        if frame.dim() != (self.height, self.width) {
            return Err(PgureError::ShapeMismatch(format!(
                "slot {} expects {}x{}, got {}x{}",
                index,
                self.width,
                self.height,
                frame.ncols(),
                frame.nrows()
            )));
        }
        slot.set(frame)
            .map_err(|_| PgureError::SlotAlreadyWritten(index))
    }

    pub fn is_written(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(|s| s.get().is_some())
    }

    /// Assemble the filled slots into a sequence. Every slot must be written.
    pub fn into_sequence(self) -> Result<Sequence> {
        let frames = self.slots.len();
        let mut data = Array3::<f64>::zeros((frames, self.height, self.width));
        for (i, slot) in self.slots.into_iter().enumerate() {
            let frame = slot.into_inner().ok_or(PgureError::SlotNotWritten(i))?;
            data.index_axis_mut(Axis(0), i).assign(&frame);
        }
        Sequence::from_array(data)
    }
}

/// Color/Bayer mode of the source data.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ColorMode {
    Mono,
    BayerRGGB,
    BayerGRBG,
    BayerGBRG,
    BayerBGGR,
    RGB,
    BGR,
}

/// Metadata about the source file.
#[derive(Clone, Debug)]
pub struct SourceInfo {
    pub filename: PathBuf,
    pub total_frames: usize,
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub color_mode: ColorMode,
    pub observer: Option<String>,
    pub telescope: Option<String>,
    pub instrument: Option<String>,
}
