//! # 隐藏元数据
//!
//! 每张图像的可用位最前面固定存放 8 字节：
//! `['S', 'H', group_id, sequence_number, payload_size (u32 LE)]`。

use crate::chunker::BitChunker;
use crate::constants::{METADATA_MAGIC, METADATA_SIZE};
use crate::error::{Error, FormatError, FormatErrorKind, Result};
use crate::pixel_stream::PixelStream;
use std::io::{Read, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HiddenHeader {
    pub group_id: u8,
    pub sequence_number: u8,
    pub payload_size: u32,
}

impl HiddenHeader {
    pub fn to_bytes(&self) -> [u8; METADATA_SIZE] {
        let mut bytes = [0u8; METADATA_SIZE];
        bytes[..2].copy_from_slice(&METADATA_MAGIC);
        bytes[2] = self.group_id;
        bytes[3] = self.sequence_number;
        bytes[4..].copy_from_slice(&self.payload_size.to_le_bytes());
        bytes
    }

    /// 解码 8 字节元数据，签名不是 `"SH"` 时返回 `InvalidSignature`。
    pub fn from_bytes(bytes: &[u8; METADATA_SIZE]) -> std::result::Result<Self, FormatErrorKind> {
        if bytes[..2] != METADATA_MAGIC {
            return Err(FormatErrorKind::InvalidSignature([bytes[0], bytes[1]]));
        }
        Ok(Self {
            group_id: bytes[2],
            sequence_number: bytes[3],
            payload_size: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        })
    }

    /// 经由 `chunker` 与 `stream` 把元数据写进像素。
    pub fn emit<R: Read, W: Write>(
        &self,
        stream: &mut PixelStream<R, W>,
        chunker: &BitChunker,
        filename: &str,
    ) -> Result<()> {
        for symbol in chunker.symbols(&self.to_bytes()) {
            if !stream.hide_symbol(symbol).map_err(|e| Error::io(filename, e))? {
                return Err(FormatError::new(filename, FormatErrorKind::Truncated).into());
            }
        }
        Ok(())
    }

    /// 从像素中读出元数据并校验签名。
    pub fn read<R: Read, W: Write>(
        stream: &mut PixelStream<R, W>,
        chunker: &BitChunker,
        filename: &str,
    ) -> Result<Self> {
        let mut bytes = [0u8; METADATA_SIZE];
        let mut assembler = chunker.assembler();
        let mut index = 0;

        while index < METADATA_SIZE {
            let symbol = stream
                .extract_symbol()
                .map_err(|e| Error::io(filename, e))?
                .ok_or_else(|| FormatError::new(filename, FormatErrorKind::Truncated))?;
            if let Some(byte) = assembler.push(symbol) {
                bytes[index] = byte;
                index += 1;
            }
        }

        Self::from_bytes(&bytes).map_err(|kind| FormatError::new(filename, kind).into())
    }
}
