use thiserror::Error;

#[derive(Error, Debug)]
pub enum PgureError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid SER file: {0}")]
    InvalidSer(String),

    #[error("Invalid sequence dimensions: {width}x{height}x{frames}")]
    InvalidDimensions {
        width: usize,
        height: usize,
        frames: usize,
    },

    #[error("Buffer holds {actual} samples, expected {expected}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("Sequence shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Frame index {index} out of range (total: {total})")]
    FrameIndexOutOfRange { index: usize, total: usize },

    #[error("Output slot {0} written more than once")]
    SlotAlreadyWritten(usize),

    #[error("Output slot {0} was never written")]
    SlotNotWritten(usize),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Empty frame sequence")]
    EmptySequence,
}

pub type Result<T> = std::result::Result<T, PgureError>;
