//! # 像素流
//!
//! 以固定大小的窗口遍历像素区，只暴露可隐藏的字节位置，自动跳过行填充。
//! 隐藏模式下，每个窗口在读入下一个窗口之前完整写入输出，
//! 因此无论图像多大，内存中始终只有一个窗口。

use crate::config::ChunkWidth;
use crate::constants::WINDOW_SIZE;
use crate::header::Geometry;
use std::io::{self, ErrorKind, Read, Write};
use std::num::NonZeroUsize;

#[derive(Debug)]
pub struct PixelStream<R, W> {
    source: R,
    sink: W,
    row_len: usize,
    row_padding: usize,
    mask: u8,
    window: Vec<u8>,
    filled: usize,
    position: usize,
    /// 当前行内已消耗的字节数，到达 `row_len` 时归零。
    pixel_x: usize,
    padding_remaining: usize,
}

impl<R: Read> PixelStream<R, io::Sink> {
    /// 只读模式，用于提取。
    pub fn reader(source: R, geometry: Geometry, width: ChunkWidth) -> Self {
        Self::writer(source, io::sink(), geometry, width)
    }
}

impl<R: Read, W: Write> PixelStream<R, W> {
    /// 隐藏模式：`source` 必须停在第一个像素字节处，
    /// 所有字节 (无论是否修改) 都按原顺序写入 `sink`。
    pub fn writer(source: R, sink: W, geometry: Geometry, width: ChunkWidth) -> Self {
        Self {
            source,
            sink,
            row_len: geometry.row_len(),
            row_padding: geometry.row_padding,
            mask: width.mask(),
            window: vec![0; WINDOW_SIZE],
            filled: 0,
            position: 0,
            pixel_x: 0,
            padding_remaining: 0,
        }
    }

    /// 更换窗口大小，只能在读写第一个符号之前调用。
    pub fn with_window_size(mut self, size: NonZeroUsize) -> Self {
        self.window = vec![0; size.get()];
        self
    }

    /// 把符号写入下一个可用字节的低位。
    ///
    /// 源数据耗尽时返回 `Ok(false)`。
    pub fn hide_symbol(&mut self, symbol: u8) -> io::Result<bool> {
        let Some(index) = self.next_position()? else {
            return Ok(false);
        };
        let byte = &mut self.window[index];
        *byte = (*byte & !self.mask) | (symbol & self.mask);
        Ok(true)
    }

    /// 读出下一个可用字节的低位，源数据耗尽时返回 `Ok(None)`。
    pub fn extract_symbol(&mut self) -> io::Result<Option<u8>> {
        Ok(self
            .next_position()?
            .map(|index| self.window[index] & self.mask))
    }

    /// 把当前窗口以及源中剩余的所有字节原样写入输出，并交还输出对象。
    pub fn copy_remaining(mut self) -> io::Result<W> {
        self.flush_window()?;
        io::copy(&mut self.source, &mut self.sink)?;
        self.sink.flush()?;
        Ok(self.sink)
    }

    fn next_position(&mut self) -> io::Result<Option<usize>> {
        loop {
            if self.position >= self.filled && !self.advance()? {
                return Ok(None);
            }
            if self.pixel_x >= self.row_len {
                self.padding_remaining = self.row_padding;
                self.pixel_x = 0;
            }
            if self.padding_remaining == 0 {
                break;
            }
            self.position += 1;
            self.padding_remaining -= 1;
        }

        let index = self.position;
        self.position += 1;
        self.pixel_x += 1;
        Ok(Some(index))
    }

    /// 写出当前窗口并读入下一个，源数据耗尽时返回 `false`。
    fn advance(&mut self) -> io::Result<bool> {
        self.flush_window()?;
        self.filled = fill_window(&mut self.source, &mut self.window)?;
        self.position = 0;
        Ok(self.filled > 0)
    }

    fn flush_window(&mut self) -> io::Result<()> {
        if self.filled > 0 {
            self.sink.write_all(&self.window[..self.filled])?;
            self.filled = 0;
            self.position = 0;
        }
        Ok(())
    }
}

fn fill_window<R: Read>(source: &mut R, window: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < window.len() {
        match source.read(&mut window[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
