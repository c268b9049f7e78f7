//! # Intake CLI
//!
//! intake 子系统的命令行工具。
//!
//! ## 配置管理
//!
//! ```bash
//! # 生成默认配置（~/.config/intake/config.toml）
//! intake-cli config init
//!
//! # 校验 / 查看
//! intake-cli config check --file robot.toml
//! intake-cli config show
//! ```
//!
//! ## 仿真
//!
//! ```bash
//! # 在 mock 硬件上按脚本运行（手动时钟，立即完成）
//! intake-cli simulate --script demos/intake_and_shoot.json
//!
//! # 按真实周期运行，Ctrl+C 结束
//! intake-cli simulate --script demos/intake_and_shoot.json --realtime
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod script;

use commands::{ConfigCommand, SimulateCommand};

/// Intake CLI - intake 子系统命令行工具
#[derive(Parser, Debug)]
#[command(name = "intake-cli")]
#[command(about = "Command-line tools for the intake/shooter subsystem", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 在 mock 硬件上运行仿真脚本
    Simulate {
        #[command(flatten)]
        args: SimulateCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志（输出到 stderr，stdout 只留给命令结果）
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("intake_cli=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config(cmd) => cmd.execute(),
        Commands::Simulate { args } => args.execute(),
    }
}
