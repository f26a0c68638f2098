//! # 命令处理逻辑模块
//!
//! 包含处理 `hide` 和 `extract` 子命令的高级业务逻辑。
//! 本模块负责协调文件 I/O、调用分发器以及向用户报告结果。

use crate::carrier::ImageHandle;
use crate::cli::{ExtractArgs, HideArgs};
use crate::config::Config;
use crate::constants::DEFAULT_OUTPUT_DIR;
use crate::distributor::Distributor;
use crate::error::Error;
use anyhow::{Context, Result};
use colored::Colorize;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// 提取结果的默认文件名。
const RECOVERED_FILE_NAME: &str = "recovered.bin";

/// 处理 'Hide' 命令的执行逻辑。
///
/// 负责读取消息文件、打开并校验所有图像、把消息分散写入，
/// 最后报告每张图像的使用情况。头部不合法的图像会被跳过，不影响其余图像。
///
/// # Errors
///
/// 如果发生以下任一情况，将返回错误：
/// * 无法读取消息文件，或没有任何可用的图像。
/// * 所有图像的容量之和不足以容纳消息。
/// * 目标文件已存在且未指定 `--force`，或两张图像对应同一个输出文件。
/// * 读写图像时发生 I/O 错误。
pub fn handle_hide(args: HideArgs) -> Result<()> {
    let message = fs::read(&args.message).with_context(|| {
        format!(
            "Unable to read message file: {}",
            args.message.to_string_lossy().red().bold()
        )
    })?;

    let distributor = Distributor::new(Config {
        chunk_width: args.chunk_width,
        group_id: args.group,
        output_dir: args
            .output_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        overwrite: args.force,
        ..Config::default()
    });

    let images = open_images(&distributor, &args.images)?;

    let report = match distributor.hide_to_dir(images, &message) {
        Ok(report) => report,
        Err(Error::InsufficientCapacity { placed, required }) => anyhow::bail!(
            "Not enough space in the images to hide the message. \nHidden: {}, Required: {}",
            placed.to_string().red().bold(),
            required.to_string().green().bold()
        ),
        Err(Error::OutputExists(path)) => anyhow::bail!(
            "Output file already exists: {}. \nUse --force to overwrite it.",
            path.to_string_lossy().red().bold()
        ),
        Err(Error::DuplicateOutput {
            first,
            second,
            path,
        }) => anyhow::bail!(
            "Images {} and {} would both be written to {}. \nRename one of them.",
            first.yellow().bold(),
            second.yellow().bold(),
            path.to_string_lossy().red().bold()
        ),
        Err(e) => {
            return Err(e).context(
                "Failed to hide the message. \nThe image files may be corrupt or the output location is not writable.",
            );
        }
    };

    for fragment in &report.written {
        println!(
            "Hidden {} bytes (sequence {}) into: {}",
            fragment.payload_len.to_string().green().bold(),
            fragment.sequence_number,
            fragment.output.to_string_lossy().green().bold()
        );
    }
    for filename in &report.untouched {
        println!(
            "Image {} was not necessary to hide the message",
            filename.yellow()
        );
    }

    println!(
        "The message has been successfully hidden ({} bytes, group {}).",
        message.len().to_string().green().bold(),
        report.group_id.to_string().green().bold()
    );

    Ok(())
}

/// 处理 'Extract' 命令的执行逻辑。
///
/// 负责打开所有图像、提取并按序号拼接碎片，最后将消息写入目标文件。
///
/// # Errors
///
/// 如果发生以下任一情况，将返回错误：
/// * 没有任何可用的图像，或所有图像都不含隐藏数据。
/// * 碎片序号缺失或重复，或 (指定 `--group` 时) 碎片属于其他组。
/// * 目标文件已存在且未指定 `--force`，或无法写入目标文件。
pub fn handle_extract(args: ExtractArgs) -> Result<()> {
    let dest = match args.text {
        Some(path) => path,
        None => default_recovered_path(&args.images[0]),
    };

    anyhow::ensure!(
        args.force || !dest.exists(),
        "Output file already exists: {}. \nUse --force to overwrite it.",
        dest.to_string_lossy().red().bold()
    );

    let distributor = Distributor::new(Config {
        chunk_width: args.chunk_width,
        group_id: args.group,
        ..Config::default()
    });

    let mut images = open_images(&distributor, &args.images)?;

    let recovered = distributor.extract(&mut images).with_context(|| {
        format!(
            "Failed to extract a message from {} image(s). \nThe images may not contain hidden data or some fragments are missing.",
            args.images.len().to_string().red().bold()
        )
    })?;

    for skipped in &recovered.skipped {
        println!(
            "Skipped {}: {}",
            skipped.filename.yellow().bold(),
            skipped.kind
        );
    }

    let groups = recovered.group_ids();
    if groups.len() > 1 {
        println!(
            "{} fragments belong to different groups: {:?}",
            "Warning:".yellow().bold(),
            groups
        );
    }

    fs::write(&dest, &recovered.payload).with_context(|| {
        format!(
            "Unable to write to target file: {}",
            dest.to_string_lossy().red().bold()
        )
    })?;

    println!(
        "The message ({} bytes from {} image(s)) has been successfully recovered and saved: {}",
        recovered.payload.len().to_string().green().bold(),
        recovered.fragments.len(),
        dest.to_string_lossy().green().bold()
    );
    Ok(())
}

/// 打开所有图像，跳过头部不合法的图像并提示用户。
fn open_images(
    distributor: &Distributor,
    paths: &[PathBuf],
) -> Result<Vec<ImageHandle<BufReader<File>>>> {
    let mut images = Vec::with_capacity(paths.len());

    for path in paths {
        match distributor.open(path) {
            Ok(image) => images.push(image),
            Err(Error::Format(e)) => println!(
                "Skipping image {}: {}",
                e.filename.yellow().bold(),
                e.kind
            ),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!(
                        "Unable to read image file: {}",
                        path.to_string_lossy().red().bold()
                    )
                });
            }
        }
    }

    anyhow::ensure!(
        !images.is_empty(),
        "No usable images. \nProvide uncompressed 24 or 32 bit BMP files large enough to hold the metadata."
    );

    Ok(images)
}

fn default_recovered_path(first_image: &Path) -> PathBuf {
    first_image
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(RECOVERED_FILE_NAME)
}
