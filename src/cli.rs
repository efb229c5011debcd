use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "fpqueue")]
#[command(version = "1.0.0")]
#[command(about = "ATLAS 强制测光任务队列客户端")]
#[command(long_about = "查看任务队列、编辑并提交测光请求、删除任务、请求图像以及导出光变曲线")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 配置文件路径（默认依次查找 config/fpqueue.toml、fpqueue.toml）
    #[arg(short, long)]
    pub config: Option<String>,

    /// 日志级别，覆盖配置文件
    #[arg(short, long, value_parser = ["trace", "debug", "info", "warn", "error"])]
    pub log_level: Option<String>,

    /// 日志格式，覆盖配置文件
    #[arg(long, value_parser = ["json", "pretty"])]
    pub log_format: Option<String>,
}

/// 列表视图的筛选与分页
#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// 只显示已开始或已完成的任务
    #[arg(long)]
    pub started: bool,
    /// 分页游标
    #[arg(long)]
    pub cursor: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 持续轮询并在每次更新后重新显示任务列表，Ctrl+C 退出
    Watch {
        #[command(flatten)]
        list: ListArgs,
        /// 单任务视图
        #[arg(long)]
        task: Option<i64>,
    },
    /// 获取一次任务列表
    List {
        #[command(flatten)]
        list: ListArgs,
    },
    /// 查看单个任务
    Show {
        /// 任务ID
        task_id: i64,
    },
    /// 编辑保存在本地的请求草稿
    Draft {
        #[command(subcommand)]
        action: DraftActions,
    },
    /// 提交当前草稿
    Submit,
    /// 删除或取消任务
    Delete {
        /// 任务ID
        task_id: i64,
    },
    /// 为已完成的测光任务请求图像
    RequestImages {
        /// 任务ID
        task_id: i64,
    },
    /// 导出光变曲线为 HTML
    Plot {
        /// 任务ID
        task_id: i64,
        /// 输出文件
        #[arg(short, long)]
        out: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum DraftActions {
    /// 设置字段，例如 `draft set radeclist "110 11"`
    Set { field: String, value: String },
    /// 显示草稿与 MJD 日期预览
    Show,
    /// 清空草稿
    Clear,
    /// 恢复 mjd_min 的默认值
    ResetMjdMin,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_watch_with_filters() {
        let cli = Cli::try_parse_from(["fpqueue", "--log-level", "debug", "watch", "--started"]).unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Commands::Watch { list, task } => {
                assert!(list.started);
                assert_eq!(task, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_draft_and_plot() {
        let cli = Cli::try_parse_from(["fpqueue", "draft", "set", "mjd_min", "59000"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Draft {
                action: DraftActions::Set { .. }
            }
        ));

        let cli = Cli::try_parse_from(["fpqueue", "plot", "12", "--out", "lc.html"]).unwrap();
        assert!(matches!(cli.command, Commands::Plot { task_id: 12, .. }));
        assert!(Cli::try_parse_from(["fpqueue", "--log-format", "xml", "submit"]).is_err());
    }
}
