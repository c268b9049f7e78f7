//! 配置管理命令
//!
//! 查看、校验、生成 intake 子系统配置（TOML）

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use intake_tools::IntakeConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// 默认配置文件路径
pub fn default_config_file() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;
    path.push("intake");
    path.push("config.toml");
    Ok(path)
}

/// 加载配置
///
/// 显式指定的文件必须存在；未指定时使用默认路径，默认路径不存在则使用内置默认值。
pub fn load_config(file: Option<&Path>) -> Result<IntakeConfig> {
    let path = match file {
        Some(path) => path.to_path_buf(),
        None => {
            let path = default_config_file()?;
            if !path.exists() {
                return Ok(IntakeConfig::default());
            }
            path
        },
    };
    IntakeConfig::load_from_file(&path)
        .with_context(|| format!("Failed to load config {}", path.display()))
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 打印生效的配置
    Show {
        /// 配置文件（默认为用户配置目录下的 intake/config.toml）
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// 校验配置文件
    Check {
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// 写入默认配置
    Init {
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// 覆盖已存在的文件
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub fn execute(self) -> Result<()> {
        match self {
            ConfigCommand::Show { file } => Self::show(file.as_deref()),
            ConfigCommand::Check { file } => Self::check(file.as_deref()),
            ConfigCommand::Init { file, force } => Self::init(file, force),
        }
    }

    fn show(file: Option<&Path>) -> Result<()> {
        let config = load_config(file)?;
        print!("{}", config.to_toml_string()?);
        Ok(())
    }

    fn check(file: Option<&Path>) -> Result<()> {
        let path = match file {
            Some(path) => path.to_path_buf(),
            None => default_config_file()?,
        };
        IntakeConfig::load_from_file(&path)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        println!("✅ {} is valid", path.display());
        Ok(())
    }

    fn init(file: Option<PathBuf>, force: bool) -> Result<()> {
        let path = match file {
            Some(path) => path,
            None => default_config_file()?,
        };
        if path.exists() && !force {
            bail!("{} already exists (use --force to overwrite)", path.display());
        }
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).context("创建配置目录失败")?;
        }
        IntakeConfig::default()
            .save_to_file(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("✅ Wrote default config to {}", path.display());
        Ok(())
    }
}
