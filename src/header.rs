//! # BMP 头部解析
//!
//! 读取并校验 BMP 文件头与 DIB 头，推导出像素区的几何信息。
//! 头部原样保存在 `blob` 中，输出图像时逐字节写回，不再重新解释。

use crate::constants::{FILE_HEADER_SIZE, MIN_PIXEL_DATA_OFFSET};
use crate::error::{Error, FormatError, FormatErrorKind, Result};
use std::io::{self, ErrorKind, Read};

const SIZE_OFFSET: usize = 2;
const DATA_OFFSET_OFFSET: usize = 10;
const WIDTH_OFFSET: usize = 18;
const HEIGHT_OFFSET: usize = 22;
const BIT_COUNT_OFFSET: usize = 28;
const COMPRESSION_OFFSET: usize = 30;

fn read_u16_le(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32_le(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

fn read_i32_le(bytes: &[u8], offset: usize) -> i32 {
    read_u32_le(bytes, offset) as i32
}

/// BMP 每行按 4 字节对齐后补上的填充字节数。
pub fn row_padding(row_len: usize) -> usize {
    (4 - row_len % 4) % 4
}

/// 像素区的几何信息，`PixelStream` 依据它跳过行填充。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
    pub channel_count: u8,
    pub row_padding: usize,
}

impl Geometry {
    /// 一行中可用于隐藏的字节数 (不含填充)。
    pub fn row_len(&self) -> usize {
        self.width as usize * self.channel_count as usize
    }

    /// 所有行可用于隐藏的字节总数。
    pub fn usable_symbol_count(&self) -> usize {
        self.row_len() * self.height as usize
    }

    /// 像素区在文件中实际占用的字节数 (含填充)。
    pub fn pixel_array_len(&self) -> u64 {
        (self.row_len() + self.row_padding) as u64 * self.height as u64
    }
}

#[derive(Debug, Clone)]
pub struct BmpHeader {
    pub geometry: Geometry,
    pub pixel_data_offset: u32,
    /// 从文件开头到像素数据之前的全部字节。
    pub blob: Vec<u8>,
}

impl BmpHeader {
    /// 从 `reader` 中读取头部，读取结束后 `reader` 恰好停在第一个像素字节处。
    ///
    /// `file_len` 是文件的实际长度，用于和头部声明的长度比对。
    ///
    /// # Errors
    ///
    /// 任何不满足格式要求的情况都返回 `Error::Format`；
    /// 底层读取失败 (截断除外) 返回 `Error::Io`。
    pub fn parse<R: Read>(filename: &str, reader: &mut R, file_len: u64) -> Result<Self> {
        let format_error = |kind| Error::Format(FormatError::new(filename, kind));
        let read_error = |e: io::Error| match e.kind() {
            ErrorKind::UnexpectedEof => format_error(FormatErrorKind::Truncated),
            _ => Error::io(filename, e),
        };

        let mut blob = vec![0u8; FILE_HEADER_SIZE];
        reader.read_exact(&mut blob).map_err(read_error)?;

        if &blob[..2] != b"BM" {
            return Err(format_error(FormatErrorKind::BadMagic([blob[0], blob[1]])));
        }

        let declared = read_u32_le(&blob, SIZE_OFFSET) as u64;
        if declared != file_len {
            return Err(format_error(FormatErrorKind::SizeMismatch {
                declared,
                actual: file_len,
            }));
        }

        let pixel_data_offset = read_u32_le(&blob, DATA_OFFSET_OFFSET);
        if (pixel_data_offset as usize) < MIN_PIXEL_DATA_OFFSET {
            return Err(format_error(FormatErrorKind::UnsupportedHeader(
                pixel_data_offset,
            )));
        }
        if pixel_data_offset as u64 > file_len {
            return Err(format_error(FormatErrorKind::Truncated));
        }

        blob.resize(pixel_data_offset as usize, 0);
        reader
            .read_exact(&mut blob[FILE_HEADER_SIZE..])
            .map_err(read_error)?;

        let width = read_i32_le(&blob, WIDTH_OFFSET);
        let height = read_i32_le(&blob, HEIGHT_OFFSET);
        if width <= 0 || height == 0 {
            return Err(format_error(FormatErrorKind::InvalidDimensions {
                width,
                height,
            }));
        }

        let bit_count = read_u16_le(&blob, BIT_COUNT_OFFSET);
        if bit_count != 24 && bit_count != 32 {
            return Err(format_error(FormatErrorKind::UnsupportedBitDepth(
                bit_count,
            )));
        }

        let compression = read_u32_le(&blob, COMPRESSION_OFFSET);
        if compression != 0 {
            return Err(format_error(FormatErrorKind::Compressed(compression)));
        }

        let channel_count = (bit_count / 8) as u8;
        let width = width as u32;
        // 负高度表示自上而下存储，文件中的行布局不变
        let height = height.unsigned_abs();
        let geometry = Geometry {
            width,
            height,
            channel_count,
            row_padding: row_padding(width as usize * channel_count as usize),
        };

        if pixel_data_offset as u64 + geometry.pixel_array_len() > file_len {
            return Err(format_error(FormatErrorKind::Truncated));
        }

        tracing::debug!(
            filename,
            width,
            height,
            channel_count,
            row_padding = geometry.row_padding,
            pixel_data_offset,
            "parsed bmp header"
        );

        Ok(Self {
            geometry,
            pixel_data_offset,
            blob,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    /// 构造一个最简的未压缩 BMP (BITMAPINFOHEADER)，像素值按位置确定性生成。
    pub(crate) fn build_bmp(width: u32, height: u32, bit_count: u16) -> Vec<u8> {
        let row_len = width as usize * (bit_count / 8) as usize;
        let padding = row_padding(row_len);
        let data_len = (row_len + padding) * height as usize;
        let file_len = MIN_PIXEL_DATA_OFFSET + data_len;

        let mut bytes = Vec::with_capacity(file_len);
        bytes.extend_from_slice(b"BM");
        bytes.extend_from_slice(&(file_len as u32).to_le_bytes());
        bytes.extend_from_slice(&[0; 4]);
        bytes.extend_from_slice(&(MIN_PIXEL_DATA_OFFSET as u32).to_le_bytes());
        bytes.extend_from_slice(&40u32.to_le_bytes());
        bytes.extend_from_slice(&(width as i32).to_le_bytes());
        bytes.extend_from_slice(&(height as i32).to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&bit_count.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&(data_len as u32).to_le_bytes());
        bytes.extend_from_slice(&[0; 16]);

        for row in 0..height as usize {
            for x in 0..row_len {
                bytes.push((row * 31 + x * 7) as u8);
            }
            // 填充字节用一个显眼的值，便于检查它们是否被改动
            bytes.extend(std::iter::repeat_n(0xEE, padding));
        }
        bytes
    }

    fn parse(bytes: &[u8]) -> Result<BmpHeader> {
        BmpHeader::parse("test.bmp", &mut Cursor::new(bytes), bytes.len() as u64)
    }

    fn format_kind(result: Result<BmpHeader>) -> FormatErrorKind {
        match result {
            Err(Error::Format(e)) => {
                assert_eq!(e.filename, "test.bmp");
                e.kind
            }
            other => panic!("expected format error, got {other:?}"),
        }
    }

    #[test]
    fn parses_24_bit_geometry() {
        let bytes = build_bmp(4, 4, 24);
        let header = parse(&bytes).unwrap();

        assert_eq!(header.geometry.width, 4);
        assert_eq!(header.geometry.height, 4);
        assert_eq!(header.geometry.channel_count, 3);
        assert_eq!(header.geometry.row_padding, 0);
        assert_eq!(header.geometry.usable_symbol_count(), 48);
        assert_eq!(header.pixel_data_offset, 54);
        assert_eq!(header.blob, &bytes[..54]);
    }

    #[test]
    fn computes_row_padding() {
        let header = parse(&build_bmp(3, 2, 24)).unwrap();
        assert_eq!(header.geometry.row_padding, 3);
        assert_eq!(header.geometry.usable_symbol_count(), 18);

        let header = parse(&build_bmp(3, 2, 32)).unwrap();
        assert_eq!(header.geometry.channel_count, 4);
        assert_eq!(header.geometry.row_padding, 0);

        assert_eq!(row_padding(5), 3);
        assert_eq!(row_padding(6), 2);
        assert_eq!(row_padding(7), 1);
        assert_eq!(row_padding(8), 0);
    }

    #[test]
    fn leaves_reader_at_pixel_data() {
        let bytes = build_bmp(2, 2, 24);
        let mut cursor = Cursor::new(bytes.as_slice());
        BmpHeader::parse("test.bmp", &mut cursor, bytes.len() as u64).unwrap();
        assert_eq!(cursor.position(), 54);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = build_bmp(4, 4, 24);
        bytes[0] = b'P';
        assert_eq!(format_kind(parse(&bytes)), FormatErrorKind::BadMagic(*b"PM"));
    }

    #[test]
    fn rejects_size_mismatch() {
        let mut bytes = build_bmp(4, 4, 24);
        bytes.push(0);
        assert_eq!(
            format_kind(parse(&bytes)),
            FormatErrorKind::SizeMismatch {
                declared: 102,
                actual: 103
            }
        );
    }

    #[test]
    fn rejects_unsupported_bit_depth() {
        let mut bytes = build_bmp(4, 4, 24);
        bytes[28..30].copy_from_slice(&8u16.to_le_bytes());
        assert_eq!(
            format_kind(parse(&bytes)),
            FormatErrorKind::UnsupportedBitDepth(8)
        );
    }

    #[test]
    fn rejects_compressed_images() {
        let mut bytes = build_bmp(4, 4, 32);
        bytes[30..34].copy_from_slice(&3u32.to_le_bytes());
        assert_eq!(format_kind(parse(&bytes)), FormatErrorKind::Compressed(3));
    }

    #[test]
    fn rejects_truncated_input() {
        let bytes = build_bmp(4, 4, 24);
        let short = &bytes[..10];
        let result =
            BmpHeader::parse("test.bmp", &mut Cursor::new(short), bytes.len() as u64);
        assert_eq!(format_kind(result), FormatErrorKind::Truncated);
    }

    #[test]
    fn rejects_pixel_array_beyond_file_end() {
        let mut bytes = build_bmp(4, 4, 24);
        bytes[22..26].copy_from_slice(&40i32.to_le_bytes());
        assert_eq!(format_kind(parse(&bytes)), FormatErrorKind::Truncated);
    }

    #[test]
    fn rejects_short_dib_header() {
        let mut bytes = build_bmp(4, 4, 24);
        bytes[10..14].copy_from_slice(&26u32.to_le_bytes());
        assert_eq!(
            format_kind(parse(&bytes)),
            FormatErrorKind::UnsupportedHeader(26)
        );
    }

    #[test]
    fn accepts_top_down_bitmaps() {
        let mut bytes = build_bmp(4, 4, 24);
        bytes[22..26].copy_from_slice(&(-4i32).to_le_bytes());
        let header = parse(&bytes).unwrap();
        assert_eq!(header.geometry.height, 4);
    }
}
