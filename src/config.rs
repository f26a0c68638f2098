//! # 运行配置
//!
//! 隐藏与提取两端必须使用相同的 `ChunkWidth`，否则无法还原数据。

use crate::constants::{DEFAULT_CHUNK_WIDTH, DEFAULT_OUTPUT_DIR, OUTPUT_SUFFIX};
use crate::error::Error;
use std::fmt;
use std::path::PathBuf;

/// 每个像素字节藏入的比特数，只能是 1、2、4 或 8 (必须整除 8)。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkWidth(u8);

impl ChunkWidth {
    pub const ONE: ChunkWidth = ChunkWidth(1);
    pub const TWO: ChunkWidth = ChunkWidth(2);
    pub const FOUR: ChunkWidth = ChunkWidth(4);
    pub const EIGHT: ChunkWidth = ChunkWidth(8);

    pub const ALL: [ChunkWidth; 4] = [Self::ONE, Self::TWO, Self::FOUR, Self::EIGHT];

    pub fn bits(self) -> u8 {
        self.0
    }

    /// 一个字节被拆成多少个符号。
    pub fn symbols_per_byte(self) -> usize {
        8 / self.0 as usize
    }

    /// 符号所占的低位掩码。
    pub fn mask(self) -> u8 {
        match self.0 {
            8 => 0xFF,
            bits => (1u8 << bits) - 1,
        }
    }
}

impl Default for ChunkWidth {
    fn default() -> Self {
        ChunkWidth(DEFAULT_CHUNK_WIDTH)
    }
}

impl TryFrom<u8> for ChunkWidth {
    type Error = Error;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            1 | 2 | 4 | 8 => Ok(ChunkWidth(bits)),
            other => Err(Error::InvalidChunkWidth(other)),
        }
    }
}

impl fmt::Display for ChunkWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 分发器使用的配置。
#[derive(Debug, Clone)]
pub struct Config {
    pub chunk_width: ChunkWidth,
    /// 隐藏时使用的组 ID；为 `None` 时随机生成。
    /// 提取时若设置，则所有碎片必须属于该组。
    pub group_id: Option<u8>,
    pub output_dir: PathBuf,
    pub output_suffix: String,
    /// 是否允许覆盖已存在的输出文件。
    pub overwrite: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_width: ChunkWidth::default(),
            group_id: None,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            output_suffix: OUTPUT_SUFFIX.to_string(),
            overwrite: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_widths_dividing_eight() {
        for bits in 0..=16u8 {
            let result = ChunkWidth::try_from(bits);
            if matches!(bits, 1 | 2 | 4 | 8) {
                assert_eq!(result.unwrap().bits(), bits);
            } else {
                assert!(matches!(result, Err(Error::InvalidChunkWidth(b)) if b == bits));
            }
        }
    }

    #[test]
    fn masks_and_symbol_counts() {
        assert_eq!(ChunkWidth::ONE.mask(), 0b1);
        assert_eq!(ChunkWidth::TWO.mask(), 0b11);
        assert_eq!(ChunkWidth::FOUR.mask(), 0x0F);
        assert_eq!(ChunkWidth::EIGHT.mask(), 0xFF);
        assert_eq!(ChunkWidth::ONE.symbols_per_byte(), 8);
        assert_eq!(ChunkWidth::EIGHT.symbols_per_byte(), 1);
    }
}
