//! # 比特切分
//!
//! 把一个字节拆成若干个 `chunk_width` 位的符号 (低位在前)，以及把符号拼回字节。
//! 本模块不关心图像几何，只处理比特。

use crate::config::ChunkWidth;

#[derive(Debug, Clone, Copy, Default)]
pub struct BitChunker {
    width: ChunkWidth,
}

impl BitChunker {
    pub fn new(width: ChunkWidth) -> Self {
        Self { width }
    }

    pub fn width(&self) -> ChunkWidth {
        self.width
    }

    /// 将一个字节拆分为 `8 / width` 个符号，最低的一组比特最先产出。
    pub fn split(&self, byte: u8) -> Split {
        Split {
            value: byte as u16,
            width: self.width.bits(),
            mask: self.width.mask() as u16,
            remaining: self.width.symbols_per_byte(),
        }
    }

    /// `split` 的逆运算：最后一个符号占据字节的最高位。
    pub fn merge<I>(&self, symbols: I) -> u8
    where
        I: IntoIterator<Item = u8>,
        I::IntoIter: DoubleEndedIterator,
    {
        let mask = self.width.mask();
        symbols.into_iter().rev().fold(0u16, |acc, symbol| {
            (acc << self.width.bits()) | (symbol & mask) as u16
        }) as u8
    }

    /// 按顺序逐个产出 `data` 所有字节的符号。
    pub fn symbols<'a>(&self, data: &'a [u8]) -> Symbols<'a> {
        Symbols {
            chunker: *self,
            bytes: data.iter(),
            current: None,
        }
    }

    pub fn assembler(&self) -> ByteAssembler {
        ByteAssembler {
            chunker: *self,
            queue: Vec::with_capacity(self.width.symbols_per_byte()),
        }
    }
}

/// 单个字节拆分出的符号序列。
#[derive(Debug, Clone)]
pub struct Split {
    value: u16,
    width: u8,
    mask: u16,
    remaining: usize,
}

impl Iterator for Split {
    type Item = u8;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let symbol = (self.value & self.mask) as u8;
        self.value >>= self.width;
        Some(symbol)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Split {}

/// 源数据的符号流，当前字节耗尽时拆分下一个字节。
#[derive(Debug, Clone)]
pub struct Symbols<'a> {
    chunker: BitChunker,
    bytes: std::slice::Iter<'a, u8>,
    current: Option<Split>,
}

impl Iterator for Symbols<'_> {
    type Item = u8;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(symbol) = self.current.as_mut().and_then(Iterator::next) {
                return Some(symbol);
            }
            let &byte = self.bytes.next()?;
            self.current = Some(self.chunker.split(byte));
        }
    }
}

/// 累积符号，凑满一个字节后输出合并结果。
#[derive(Debug, Clone)]
pub struct ByteAssembler {
    chunker: BitChunker,
    queue: Vec<u8>,
}

impl ByteAssembler {
    pub fn push(&mut self, symbol: u8) -> Option<u8> {
        self.queue.push(symbol);
        if self.queue.len() < self.chunker.width().symbols_per_byte() {
            return None;
        }
        let byte = self.chunker.merge(self.queue.iter().copied());
        self.queue.clear();
        Some(byte)
    }

    /// 队列中尚未组成字节的符号数量。
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_emits_low_bits_first() {
        let chunker = BitChunker::new(ChunkWidth::TWO);
        let symbols: Vec<u8> = chunker.split(0b11_10_01_00).collect();
        assert_eq!(symbols, vec![0b00, 0b01, 0b10, 0b11]);

        let chunker = BitChunker::new(ChunkWidth::ONE);
        let symbols: Vec<u8> = chunker.split(0b1000_0001).collect();
        assert_eq!(symbols, vec![1, 0, 0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn merge_inverts_split_for_every_width_and_byte() {
        for width in ChunkWidth::ALL {
            let chunker = BitChunker::new(width);
            for byte in 0..=u8::MAX {
                let symbols: Vec<u8> = chunker.split(byte).collect();
                assert_eq!(symbols.len(), width.symbols_per_byte());
                assert!(symbols.iter().all(|&s| s <= width.mask()));
                assert_eq!(chunker.merge(symbols), byte, "width {width}, byte {byte}");
            }
        }
    }

    #[test]
    fn full_width_is_identity() {
        let chunker = BitChunker::new(ChunkWidth::EIGHT);
        assert_eq!(chunker.split(0xA5).collect::<Vec<_>>(), vec![0xA5]);
        assert_eq!(chunker.merge([0x5A]), 0x5A);
    }

    #[test]
    fn streams_symbols_and_reassembles_bytes() {
        let chunker = BitChunker::new(ChunkWidth::FOUR);
        let data = b"shard";

        let symbols: Vec<u8> = chunker.symbols(data).collect();
        assert_eq!(symbols.len(), data.len() * 2);
        assert_eq!(&symbols[..2], &[b's' & 0x0F, b's' >> 4]);

        let mut assembler = chunker.assembler();
        let mut rebuilt = Vec::new();
        for symbol in symbols {
            if let Some(byte) = assembler.push(symbol) {
                rebuilt.push(byte);
            }
        }
        assert_eq!(assembler.pending(), 0);
        assert_eq!(rebuilt, data);
    }

    #[test]
    fn empty_source_yields_no_symbols() {
        let chunker = BitChunker::default();
        assert_eq!(chunker.symbols(&[]).next(), None);
    }
}
