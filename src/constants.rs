/// 隐藏在像素数据最前面的元数据大小 (字节)。
/// 布局为 `['S', 'H', group_id, sequence_number, payload_size (u32 LE)]`。
pub const METADATA_SIZE: usize = 8;

/// 元数据开头的两字节签名，提取时用于确认图像中确实藏有数据。
pub const METADATA_MAGIC: [u8; 2] = *b"SH";

/// BMP 文件头 (BITMAPFILEHEADER) 的固定大小 (字节)。
pub const FILE_HEADER_SIZE: usize = 14;

/// 本工具能够解析的最小头部长度：文件头 + 40 字节的 BITMAPINFOHEADER。
/// 宽度、高度、位深与压缩字段都位于这个范围之内。
pub const MIN_PIXEL_DATA_OFFSET: usize = 54;

/// `PixelStream` 每次从源文件读入的窗口大小 (字节)。
pub const WINDOW_SIZE: usize = 256;

/// 默认每个像素字节藏入的比特数。
pub const DEFAULT_CHUNK_WIDTH: u8 = 2;

/// 输出图像默认写入的目录。
pub const DEFAULT_OUTPUT_DIR: &str = "output_bitmaps";

/// 追加在输出图像文件名之后的后缀。
pub const OUTPUT_SUFFIX: &str = ".out";
