use clap::Parser;
use tracing_subscriber::EnvFilter;

use lsb_shard::{
    cli::{Cli, Commands},
    handler::{handle_extract, handle_hide},
};

/// 程序的主入口点
///
/// 负责初始化日志、解析命令行参数，并根据指定的子命令（`hide` 或 `extract`）
/// 将执行分派到相应的处理函数
fn main() -> anyhow::Result<()> {
    // 日志默认只输出警告，可通过 RUST_LOG 调整
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Hide(args) => handle_hide(args),
        Commands::Extract(args) => handle_extract(args),
    }
}
