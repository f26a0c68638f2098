//! # 分发与重组
//!
//! 隐藏时把消息按各图像的容量切片，依次写入；每个碎片带有同一个组 ID
//! 和从 0 开始的序号。提取时按序号排序、校验连续性并拼接。
//!
//! 已写出的输出文件不会因后续图像失败而回滚。

use crate::carrier::ImageHandle;
use crate::chunker::BitChunker;
use crate::config::Config;
use crate::error::{Error, FormatError, FormatErrorKind, Result, SequenceError};
use crate::metadata::HiddenHeader;
use crate::pixel_stream::PixelStream;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

/// 一次隐藏最多使用的图像数量 (序号为 `u8`)。
pub const MAX_IMAGES: usize = u8::MAX as usize + 1;

/// 写入了一个碎片的图像。
#[derive(Debug)]
pub struct WrittenFragment<W> {
    pub filename: String,
    pub sequence_number: u8,
    pub payload_len: usize,
    pub output: W,
}

#[derive(Debug)]
pub struct HideReport<W> {
    pub group_id: u8,
    pub written: Vec<WrittenFragment<W>>,
    /// 消息写完后剩下、未被修改的图像。
    pub untouched: Vec<String>,
}

/// 从一张图像中读出的碎片信息。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentInfo {
    pub filename: String,
    pub group_id: u8,
    pub sequence_number: u8,
    pub payload_size: u32,
}

#[derive(Debug, Clone)]
pub struct Fragment {
    pub info: FragmentInfo,
    pub data: Vec<u8>,
}

#[derive(Debug)]
pub struct Recovered {
    pub payload: Vec<u8>,
    /// 按序号排列的碎片。
    pub fragments: Vec<FragmentInfo>,
    /// 因格式问题被跳过的图像。
    pub skipped: Vec<FormatError>,
}

impl Recovered {
    /// 碎片中出现过的所有组 ID (去重、升序)。
    pub fn group_ids(&self) -> Vec<u8> {
        let mut ids: Vec<u8> = self.fragments.iter().map(|f| f.group_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

#[derive(Debug, Default)]
pub struct Distributor {
    config: Config,
}

impl Distributor {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 以配置中的 `chunk_width` 打开一张图像。
    pub fn open(&self, path: impl AsRef<Path>) -> Result<ImageHandle<io::BufReader<File>>> {
        ImageHandle::open(path, self.config.chunk_width)
    }

    /// `<output_dir>/<basename><suffix>`
    pub fn output_path(&self, filename: &str) -> PathBuf {
        let basename = Path::new(filename)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| filename.to_string());
        self.config
            .output_dir
            .join(format!("{basename}{}", self.config.output_suffix))
    }

    /// 把 `message` 分散隐藏到 `images` 中，输出由 `open_output` 为每张图像提供。
    ///
    /// 图像按给定顺序使用，第 `i` 张图像的序号为 `i`。
    /// 消息写完后剩余的图像不会被打开输出，只记录在报告中。
    ///
    /// # Errors
    ///
    /// * 前 256 张图像写满后消息仍有剩余时返回 `Error::TooManyImages`。
    ///   只有真正写入碎片的图像才需要序号，多余的图像不受此限制。
    /// * `images` 为空，或所有图像都用完仍未写完消息时返回
    ///   `Error::InsufficientCapacity`，已写出的图像保持原样。
    /// * 任何读写失败立即返回 `Error::Io`。
    pub fn hide_with<R, W, F>(
        &self,
        images: Vec<ImageHandle<R>>,
        message: &[u8],
        mut open_output: F,
    ) -> Result<HideReport<W>>
    where
        R: Read,
        W: Write,
        F: FnMut(&ImageHandle<R>) -> Result<W>,
    {
        if images.is_empty() {
            return Err(Error::InsufficientCapacity {
                placed: 0,
                required: message.len(),
            });
        }

        let group_id = self.config.group_id.unwrap_or_else(rand::random);
        let total = images.len();
        let mut written = Vec::new();
        let mut placed = 0;

        let mut images = images.into_iter();
        for (sequence, image) in images.by_ref().enumerate() {
            // 消息写完即退出循环，走到这里说明还有字节没有位置
            if sequence >= MAX_IMAGES {
                return Err(Error::TooManyImages(total));
            }
            let sequence_number = sequence as u8;
            let len = image.payload_capacity().min(message.len() - placed);
            let filename = image.filename().to_string();

            let output = open_output(&image)?;
            let output = hide_fragment(
                image,
                output,
                &message[placed..placed + len],
                group_id,
                sequence_number,
            )?;
            placed += len;

            tracing::info!(
                filename = filename.as_str(),
                group_id,
                sequence_number,
                bytes = len,
                "fragment hidden"
            );
            written.push(WrittenFragment {
                filename,
                sequence_number,
                payload_len: len,
                output,
            });

            if placed == message.len() {
                break;
            }
        }

        let untouched: Vec<String> = images.map(|image| image.filename().to_string()).collect();
        for filename in &untouched {
            tracing::debug!(filename = filename.as_str(), "image not needed");
        }

        if placed < message.len() {
            return Err(Error::InsufficientCapacity {
                placed,
                required: message.len(),
            });
        }

        Ok(HideReport {
            group_id,
            written,
            untouched,
        })
    }

    /// 文件版本的 [`hide_with`](Self::hide_with)：输出写到 `output_dir` 下，
    /// 目录不存在时自动创建。未开启 `overwrite` 时拒绝覆盖已存在的文件。
    ///
    /// 两张图像映射到同一个输出路径 (例如不同目录下的同名文件) 时返回
    /// `Error::DuplicateOutput`，即使开启了 `overwrite` 也不会互相覆盖。
    pub fn hide_to_dir<R: Read>(
        &self,
        images: Vec<ImageHandle<R>>,
        message: &[u8],
    ) -> Result<HideReport<PathBuf>> {
        let dir = &self.config.output_dir;
        fs::create_dir_all(dir).map_err(|e| Error::io(dir.to_string_lossy(), e))?;

        // 本次已写出的路径 -> 对应的输入文件
        let mut claimed: HashMap<PathBuf, String> = HashMap::new();

        let report = self.hide_with(images, message, |image| {
            let path = self.output_path(image.filename());
            if let Some(first) = claimed.get(&path) {
                return Err(Error::DuplicateOutput {
                    first: first.clone(),
                    second: image.filename().to_string(),
                    path,
                });
            }
            claimed.insert(path.clone(), image.filename().to_string());

            let file = if self.config.overwrite {
                File::create(&path)
            } else {
                File::create_new(&path)
            };
            file.map(BufWriter::new).map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => Error::OutputExists(path.clone()),
                _ => Error::io(path.to_string_lossy(), e),
            })
        })?;

        Ok(HideReport {
            group_id: report.group_id,
            written: report
                .written
                .into_iter()
                .map(|fragment| WrittenFragment {
                    output: self.output_path(&fragment.filename),
                    filename: fragment.filename,
                    sequence_number: fragment.sequence_number,
                    payload_len: fragment.payload_len,
                })
                .collect(),
            untouched: report.untouched,
        })
    }

    /// 从 `images` (顺序任意) 中提取并重组消息。
    ///
    /// 成功读出碎片的图像，其 [`ImageHandle::hidden`] 随后返回读到的元数据。
    /// 单张图像的格式错误 (例如没有 `"SH"` 签名) 不会中断整批提取，
    /// 这些图像记录在 [`Recovered::skipped`] 中。
    ///
    /// # Errors
    ///
    /// * 没有任何图像含有碎片时返回 `Error::NothingHidden`。
    /// * 序号缺失或重复时返回 `Error::Sequence`。
    /// * 配置了 `group_id` 而碎片属于其他组时返回 `Error::GroupMismatch`。
    /// * 读取失败立即返回 `Error::Io`。
    pub fn extract<R: Read>(&self, images: &mut [ImageHandle<R>]) -> Result<Recovered> {
        let mut fragments = Vec::with_capacity(images.len());
        let mut skipped = Vec::new();

        for image in images.iter_mut() {
            match extract_fragment(image) {
                Ok((hidden, data)) => fragments.push(Fragment {
                    info: FragmentInfo {
                        filename: image.filename().to_string(),
                        group_id: hidden.group_id,
                        sequence_number: hidden.sequence_number,
                        payload_size: hidden.payload_size,
                    },
                    data,
                }),
                Err(Error::Format(e)) => {
                    tracing::warn!(
                        filename = e.filename.as_str(),
                        reason = %e.kind,
                        "image skipped"
                    );
                    skipped.push(e);
                }
                Err(e) => return Err(e),
            }
        }

        if fragments.is_empty() {
            return Err(Error::NothingHidden { skipped });
        }

        match self.config.group_id {
            Some(expected) => {
                if let Some(stray) = fragments.iter().find(|f| f.info.group_id != expected) {
                    return Err(Error::GroupMismatch {
                        filename: stray.info.filename.clone(),
                        expected,
                        found: stray.info.group_id,
                    });
                }
            }
            None => {
                let first = fragments[0].info.group_id;
                if fragments.iter().any(|f| f.info.group_id != first) {
                    tracing::warn!("fragments come from different hiding runs");
                }
            }
        }

        let (payload, fragments) = reassemble(fragments)?;
        Ok(Recovered {
            payload,
            fragments,
            skipped,
        })
    }

    /// 只返回消息本身的 [`extract`](Self::extract)。
    pub fn extract_payload<R: Read>(&self, images: &mut [ImageHandle<R>]) -> Result<Vec<u8>> {
        self.extract(images).map(|recovered| recovered.payload)
    }
}

/// 把一个碎片写进单张图像：头部原样写出，随后是元数据、碎片本身以及剩余像素。
///
/// 返回写完的 `output`。
pub fn hide_fragment<R: Read, W: Write>(
    mut image: ImageHandle<R>,
    mut output: W,
    fragment: &[u8],
    group_id: u8,
    sequence_number: u8,
) -> Result<W> {
    if fragment.len() > image.payload_capacity() {
        return Err(FormatError::new(
            image.filename(),
            FormatErrorKind::TooSmall {
                capacity: image.payload_capacity(),
                required: fragment.len(),
            },
        )
        .into());
    }

    let filename = image.filename().to_string();
    let io_error = |e: io::Error| Error::io(&filename, e);

    output.write_all(&image.header().blob).map_err(io_error)?;

    let chunker = BitChunker::new(image.chunk_width());
    let geometry = image.geometry();
    let mut stream = PixelStream::writer(image.source_mut(), output, geometry, chunker.width());

    let hidden = HiddenHeader {
        group_id,
        sequence_number,
        payload_size: fragment.len() as u32,
    };
    hidden.emit(&mut stream, &chunker, &filename)?;

    for symbol in chunker.symbols(fragment) {
        if !stream.hide_symbol(symbol).map_err(io_error)? {
            return Err(FormatError::new(filename.as_str(), FormatErrorKind::Truncated).into());
        }
    }

    stream.copy_remaining().map_err(io_error)
}

/// 从单张图像中读出元数据和碎片，并把元数据记录到 `image` 上。
pub fn extract_fragment<R: Read>(image: &mut ImageHandle<R>) -> Result<(HiddenHeader, Vec<u8>)> {
    let filename = image.filename().to_string();
    let capacity = image.payload_capacity();
    let chunker = BitChunker::new(image.chunk_width());
    let geometry = image.geometry();
    let truncated = || Error::from(FormatError::new(filename.as_str(), FormatErrorKind::Truncated));

    let mut stream = PixelStream::reader(image.source_mut(), geometry, chunker.width());
    let hidden = HiddenHeader::read(&mut stream, &chunker, &filename)?;

    let size = hidden.payload_size as usize;
    if size > capacity {
        return Err(FormatError::new(
            filename.as_str(),
            FormatErrorKind::PayloadOverflow {
                declared: hidden.payload_size,
                capacity,
            },
        )
        .into());
    }

    let mut data = Vec::with_capacity(size);
    let mut assembler = chunker.assembler();
    while data.len() < size {
        let symbol = stream
            .extract_symbol()
            .map_err(|e| Error::io(&filename, e))?
            .ok_or_else(truncated)?;
        if let Some(byte) = assembler.push(symbol) {
            data.push(byte);
        }
    }

    tracing::debug!(
        filename = filename.as_str(),
        group_id = hidden.group_id,
        sequence_number = hidden.sequence_number,
        bytes = size,
        "fragment extracted"
    );
    image.set_hidden(hidden);
    Ok((hidden, data))
}

/// 按序号排序碎片并拼接。
///
/// 碎片本身留在原位置，只对一个下标数组排序；序号必须恰好是 `0..k`。
pub fn reassemble(
    fragments: Vec<Fragment>,
) -> std::result::Result<(Vec<u8>, Vec<FragmentInfo>), SequenceError> {
    let mut order: Vec<usize> = (0..fragments.len()).collect();
    order.sort_by_key(|&i| fragments[i].info.sequence_number);

    for (expected, &i) in order.iter().enumerate() {
        let info = &fragments[i].info;
        if info.sequence_number as usize == expected {
            continue;
        }
        let duplicate = expected > 0
            && fragments[order[expected - 1]].info.sequence_number == info.sequence_number;
        return Err(if duplicate {
            SequenceError::Duplicate {
                filename: info.filename.clone(),
                sequence: info.sequence_number,
            }
        } else {
            SequenceError::Gap {
                filename: info.filename.clone(),
                expected,
                found: info.sequence_number,
            }
        });
    }

    let total = fragments.iter().map(|f| f.data.len()).sum();
    let mut payload = Vec::with_capacity(total);
    let mut infos = Vec::with_capacity(fragments.len());
    for &i in &order {
        payload.extend_from_slice(&fragments[i].data);
        infos.push(fragments[i].info.clone());
    }
    Ok((payload, infos))
}
