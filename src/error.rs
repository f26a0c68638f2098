//! # 错误类型
//!
//! 库内部所有失败都以值的形式返回。单张图像的格式问题 (`FormatError`)
//! 只影响该图像，批量层面的问题 (容量不足、序号不连续) 影响整批。

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// 单张图像无法使用的具体原因。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatErrorKind {
    #[error("invalid magic number, expected 'BM' but found {0:02x?}")]
    BadMagic([u8; 2]),

    #[error("header declares {declared} bytes but the file has {actual}")]
    SizeMismatch { declared: u64, actual: u64 },

    #[error("pixel data offset {0} is too small for a BITMAPINFOHEADER")]
    UnsupportedHeader(u32),

    #[error("invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },

    #[error("unsupported bit count {0} per pixel, use 24 or 32")]
    UnsupportedBitDepth(u16),

    #[error("image is compressed (method {0}), only uncompressed BMP is supported")]
    Compressed(u32),

    #[error("file is truncated")]
    Truncated,

    #[error("image can hold only {capacity} bytes, at least {required} are needed")]
    TooSmall { capacity: usize, required: usize },

    #[error("invalid hidden signature {0:02x?}, the image holds no hidden data")]
    InvalidSignature([u8; 2]),

    #[error("hidden payload claims {declared} bytes but the image can hold only {capacity}")]
    PayloadOverflow { declared: u32, capacity: usize },
}

/// 带文件名的格式错误。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{filename}: {kind}")]
pub struct FormatError {
    pub filename: String,
    pub kind: FormatErrorKind,
}

impl FormatError {
    pub fn new(filename: impl Into<String>, kind: FormatErrorKind) -> Self {
        Self {
            filename: filename.into(),
            kind,
        }
    }
}

/// 重组碎片时发现的序号问题。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    #[error("{filename}: expected sequence number {expected}, found {found} (a fragment is missing)")]
    Gap {
        filename: String,
        expected: usize,
        found: u8,
    },

    #[error("{filename}: sequence number {sequence} appears more than once")]
    Duplicate { filename: String, sequence: u8 },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("only the first {placed} of {required} bytes were hidden, use more or larger images")]
    InsufficientCapacity { placed: usize, required: usize },

    #[error(transparent)]
    Sequence(#[from] SequenceError),

    #[error("{filename}: image belongs to group {found}, expected {expected}")]
    GroupMismatch {
        filename: String,
        expected: u8,
        found: u8,
    },

    #[error("the message needs more than 256 images (got {0}), sequence numbers are a single byte")]
    TooManyImages(usize),

    #[error("none of the images contains hidden data")]
    NothingHidden { skipped: Vec<FormatError> },

    #[error("output file already exists: {}", .0.display())]
    OutputExists(PathBuf),

    #[error("{first} and {second} would both be written to {}", .path.display())]
    DuplicateOutput {
        first: String,
        second: String,
        path: PathBuf,
    },

    #[error("chunk width must be 1, 2, 4 or 8 bits, got {0}")]
    InvalidChunkWidth(u8),

    #[error("{filename}: I/O error")]
    Io {
        filename: String,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn io(filename: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            filename: filename.into(),
            source,
        }
    }
}
