//! # lsb_shard 库
//!
//! 本库包含 BMP 隐写工具的核心逻辑：头部解析、比特切分、
//! 逐窗口的像素流、隐藏元数据，以及跨多张图像的分发与重组。

pub mod carrier;
pub mod chunker;
pub mod cli;
pub mod config;
pub mod constants;
pub mod distributor;
pub mod error;
pub mod handler;
pub mod header;
pub mod metadata;
pub mod pixel_stream;

pub use carrier::ImageHandle;
pub use config::{ChunkWidth, Config};
pub use distributor::{Distributor, HideReport, Recovered};
pub use error::{Error, FormatError, FormatErrorKind, Result, SequenceError};
