use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// bindery - 服务容器与应用生命周期
#[derive(Parser, Debug)]
#[command(name = "bindery")]
#[command(about = "依赖注入容器与应用生命周期编排")]
pub struct Args {
    /// 子命令
    #[command(subcommand)]
    pub command: Command,

    /// 配置文件路径（默认读取当前目录下的 bindery.toml）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// 覆盖配置中的日志级别
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 启动示例应用，完整运行生命周期并输出容器统计
    Run {
        /// 以 JSON 输出统计
        #[arg(long)]
        json: bool,
    },
    /// 打印生效的配置
    Config,
}
