//! # 命令行接口模块
//!
//! 使用 `clap` 定义了程序的命令行结构，包括子命令和参数。
//! 所有用户通过命令行与程序交互的入口点都在此模块中定义。

use crate::config::ChunkWidth;
use clap::Parser;
use std::path::PathBuf;

/// 一款基于 LSB (最低有效位) 隐写术的命令行工具，可以把一条消息分散隐藏到多张未压缩的 BMP 图像中。
#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = "一款基于 LSB (最低有效位) 隐写术的命令行工具，可以把一条消息分散隐藏到多张未压缩的 BMP (24/32 位) 图像中，并在之后按顺序重新拼接。"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令：hide (隐藏) 和 extract (提取)。
#[derive(Parser, Debug)]
pub enum Commands {
    /// 把文件内容隐藏到一张或多张 BMP 图像中。
    Hide(HideArgs),

    /// 从经过隐写的图像中提取并拼接隐藏的消息。
    Extract(ExtractArgs),
}

/// 'hide' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct HideArgs {
    /// 要隐藏的消息文件路径。
    #[arg(short, long)]
    pub message: PathBuf,

    /// 用于隐写的 BMP 图像，按给定顺序依次使用。
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    /// 保存结果图像的目录，默认为 `output_bitmaps`。
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// 每个像素字节藏入的比特数 (1, 2, 4 或 8)。
    #[arg(short = 'w', long, default_value_t = ChunkWidth::default(), value_parser = parse_chunk_width)]
    pub chunk_width: ChunkWidth,

    /// 组 ID，默认随机生成。
    #[arg(short, long)]
    pub group: Option<u8>,

    /// 覆盖已存在的输出文件。
    #[arg(short, long)]
    pub force: bool,
}

/// 'extract' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct ExtractArgs {
    /// 含有隐藏数据的图像，顺序任意。
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    /// 保存提取结果的路径，默认为第一张图像所在目录下的 `recovered.bin`。
    #[arg(short, long)]
    pub text: Option<PathBuf>,

    /// 每个像素字节藏入的比特数，必须与隐藏时一致。
    #[arg(short = 'w', long, default_value_t = ChunkWidth::default(), value_parser = parse_chunk_width)]
    pub chunk_width: ChunkWidth,

    /// 只接受属于该组的图像。
    #[arg(short, long)]
    pub group: Option<u8>,

    /// 覆盖已存在的输出文件。
    #[arg(short, long)]
    pub force: bool,
}

fn parse_chunk_width(value: &str) -> Result<ChunkWidth, String> {
    let bits: u8 = value.parse().map_err(|e| format!("{e}"))?;
    ChunkWidth::try_from(bits).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_hide_arguments() {
        let cli = Cli::parse_from([
            "lsb_shard", "hide", "-m", "secret.txt", "-w", "4", "-g", "137", "a.bmp", "b.bmp",
        ]);
        let Commands::Hide(args) = cli.command else {
            panic!("expected hide");
        };
        assert_eq!(args.chunk_width, ChunkWidth::FOUR);
        assert_eq!(args.group, Some(137));
        assert_eq!(args.images, vec![PathBuf::from("a.bmp"), PathBuf::from("b.bmp")]);
        assert!(!args.force);
    }

    #[test]
    fn rejects_chunk_width_not_dividing_eight() {
        let result = Cli::try_parse_from(["lsb_shard", "extract", "-w", "3", "a.bmp"]);
        assert!(result.is_err());
    }
}
