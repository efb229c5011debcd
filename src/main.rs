use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};

use fpqueue::app::Application;
use fpqueue::cli::{Cli, Commands};
use fpqueue::shutdown::ShutdownManager;
use fpqueue_core::{init_logging, AppConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let mut config = AppConfig::load(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("加载配置文件失败: {path}"),
        None => "加载配置失败".to_string(),
    })?;

    // 命令行参数覆盖配置文件
    if let Some(level) = &cli.log_level {
        config.observability.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.observability.log_format = format.clone();
    }

    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    )?;

    info!("Task queue: {}", config.api.base_url);

    let app = Application::new(config)?;

    let output = match cli.command {
        Commands::Watch { list, task } => {
            let shutdown_manager = ShutdownManager::new();
            let shutdown_rx = shutdown_manager.subscribe().await;

            let signal_manager = shutdown_manager.clone();
            tokio::spawn(async move {
                wait_for_shutdown_signal().await;
                info!("Received shutdown signal");
                signal_manager.shutdown().await;
            });

            if let Err(e) = app
                .watch(&list, task, shutdown_rx, |page| {
                    // 清屏后重画
                    print!("\x1b[2J\x1b[H{page}");
                })
                .await
            {
                error!("Watch failed: {e}");
                return Err(e);
            }
            shutdown_manager.shutdown().await;
            return Ok(());
        }
        Commands::List { list } => app.list(&list).await?,
        Commands::Show { task_id } => app.show(task_id).await?,
        Commands::Draft { action } => app.draft(&action)?,
        Commands::Submit => app.submit().await?,
        Commands::Delete { task_id } => app.delete(task_id).await?,
        Commands::RequestImages { task_id } => app.request_images(task_id).await?,
        Commands::Plot { task_id, out } => app.plot(task_id, &out).await?,
    };

    println!("{output}");
    Ok(())
}

/// 等待关闭信号
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received SIGTERM");
        },
    }
}
