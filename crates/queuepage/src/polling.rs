use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::controller::{PageController, RefreshOutcome};

/// 任务列表轮询循环
///
/// 挂载时先做一次用户触发的刷新，之后每个周期派生一次被动刷新，不等待上一次
/// 完成；重叠由控制器的在途计数拦截。收到关闭信号或会话失效时退出。
pub async fn run_polling(
    controller: Arc<PageController>,
    interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> RefreshOutcome {
    let mut last = controller.refresh(true).await;
    if last == RefreshOutcome::SessionExpired {
        warn!("Session expired, polling not started");
        return last;
    }

    let mut polls = JoinSet::new();
    let mut poll_interval = tokio::time::interval(interval);
    poll_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // 第一次 tick 立即完成
    poll_interval.tick().await;

    loop {
        tokio::select! {
            _ = poll_interval.tick() => {
                if controller.is_session_expired() {
                    warn!("Session expired, polling stopped");
                    last = RefreshOutcome::SessionExpired;
                    break;
                }
                let controller = Arc::clone(&controller);
                polls.spawn(async move { controller.refresh(false).await });
            }
            Some(result) = polls.join_next() => {
                match result {
                    Ok(outcome) => {
                        debug!("Poll finished: {:?}", outcome);
                        last = outcome;
                    }
                    Err(e) => warn!("Poll task failed: {}", e),
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Task list polling shutting down");
                break;
            }
        }
    }

    polls.abort_all();
    last
}
