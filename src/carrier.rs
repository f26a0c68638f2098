//! # 载体图像
//!
//! `ImageHandle` 代表一个已打开且头部已校验的 BMP 文件。

use crate::config::ChunkWidth;
use crate::constants::METADATA_SIZE;
use crate::error::{Error, FormatError, FormatErrorKind, Result};
use crate::header::{BmpHeader, Geometry};
use crate::metadata::HiddenHeader;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

#[derive(Debug)]
pub struct ImageHandle<R> {
    filename: String,
    header: BmpHeader,
    chunk_width: ChunkWidth,
    /// 停在第一个像素字节处的源数据。
    source: R,
    /// 提取时从图像中读出的元数据。
    hidden: Option<HiddenHeader>,
}

impl ImageHandle<BufReader<File>> {
    /// 打开并校验 `path` 处的 BMP 文件。
    ///
    /// # Errors
    ///
    /// * 文件无法打开或读取时返回 `Error::Io`。
    /// * 头部不合法或图像太小、连元数据都放不下时返回 `Error::Format`。
    pub fn open(path: impl AsRef<Path>, chunk_width: ChunkWidth) -> Result<Self> {
        let path = path.as_ref();
        let filename = path.to_string_lossy().into_owned();

        let file = File::open(path).map_err(|e| Error::io(&filename, e))?;
        let len = file.metadata().map_err(|e| Error::io(&filename, e))?.len();

        Self::from_reader(filename, BufReader::new(file), len, chunk_width)
    }
}

impl<R: Read> ImageHandle<R> {
    /// 从任意数据源构造，`len` 为数据源的总字节数。
    pub fn from_reader(
        filename: impl Into<String>,
        mut source: R,
        len: u64,
        chunk_width: ChunkWidth,
    ) -> Result<Self> {
        let filename = filename.into();
        let header = BmpHeader::parse(&filename, &mut source, len)?;

        let image = Self {
            filename,
            header,
            chunk_width,
            source,
            hidden: None,
        };

        let capacity = image.byte_capacity();
        if capacity <= METADATA_SIZE {
            return Err(FormatError::new(
                image.filename,
                FormatErrorKind::TooSmall {
                    capacity,
                    required: METADATA_SIZE + 1,
                },
            )
            .into());
        }

        Ok(image)
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn header(&self) -> &BmpHeader {
        &self.header
    }

    pub fn geometry(&self) -> Geometry {
        self.header.geometry
    }

    pub fn chunk_width(&self) -> ChunkWidth {
        self.chunk_width
    }

    /// 可隐藏的字节数 (含元数据)。
    pub fn byte_capacity(&self) -> usize {
        self.header.geometry.usable_symbol_count() / self.chunk_width.symbols_per_byte()
    }

    /// 扣除元数据后可用于消息本身的字节数。
    ///
    /// 元数据中的长度字段是 `u32`，因此结果不会超过 `u32::MAX`。
    pub fn payload_capacity(&self) -> usize {
        (self.byte_capacity() - METADATA_SIZE).min(u32::MAX as usize)
    }

    pub fn hidden(&self) -> Option<&HiddenHeader> {
        self.hidden.as_ref()
    }

    pub(crate) fn set_hidden(&mut self, hidden: HiddenHeader) {
        self.hidden = Some(hidden);
    }

    pub(crate) fn source_mut(&mut self) -> &mut R {
        &mut self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::tests::build_bmp;
    use std::io::Cursor;

    fn handle(bytes: Vec<u8>, width: ChunkWidth) -> Result<ImageHandle<Cursor<Vec<u8>>>> {
        let len = bytes.len() as u64;
        ImageHandle::from_reader("carrier.bmp", Cursor::new(bytes), len, width)
    }

    #[test]
    fn derives_capacity_from_chunk_width() {
        let image = handle(build_bmp(4, 4, 24), ChunkWidth::TWO).unwrap();
        assert_eq!(image.byte_capacity(), 12);
        assert_eq!(image.payload_capacity(), 4);

        let image = handle(build_bmp(4, 4, 24), ChunkWidth::EIGHT).unwrap();
        assert_eq!(image.byte_capacity(), 48);
        assert_eq!(image.payload_capacity(), 40);
    }

    #[test]
    fn padding_is_not_counted_as_capacity() {
        // 每行 9 个可用字节 + 3 个填充字节
        let image = handle(build_bmp(3, 8, 24), ChunkWidth::TWO).unwrap();
        assert_eq!(image.geometry().row_padding, 3);
        assert_eq!(image.byte_capacity(), 3 * 3 * 8 / 4);
    }

    #[test]
    fn rejects_images_without_room_for_metadata() {
        // 2x2x3 = 12 个符号，宽度 2 时只能放 3 个字节
        let result = handle(build_bmp(2, 2, 24), ChunkWidth::TWO);
        match result {
            Err(Error::Format(e)) => assert_eq!(
                e.kind,
                FormatErrorKind::TooSmall {
                    capacity: 3,
                    required: METADATA_SIZE + 1
                }
            ),
            other => panic!("expected too small, got {other:?}"),
        }

        // 恰好 8 个字节也不够：必须严格大于元数据大小
        let result = handle(build_bmp(4, 1, 32), ChunkWidth::FOUR);
        assert!(matches!(result, Err(Error::Format(_))));
    }
}
