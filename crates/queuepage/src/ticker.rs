use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

fn elapsed_since(started: DateTime<Utc>) -> i64 {
    let millis = (Utc::now() - started).num_milliseconds();
    (millis as f64 / 1000.0).round() as i64
}

/// 运行中任务的耗时计时器
///
/// 每个周期由 (now - started) 重新计算，不做累加。计时器只能被取消一次：
/// `stop` 或析构时中止后台任务。
#[derive(Debug)]
pub struct ElapsedTicker {
    handle: Option<JoinHandle<()>>,
    elapsed: watch::Receiver<i64>,
}

impl ElapsedTicker {
    /// 需要在 tokio 运行时中调用
    pub fn start(started: DateTime<Utc>, period: Duration) -> Self {
        let (tx, rx) = watch::channel(elapsed_since(started));
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if tx.send(elapsed_since(started)).is_err() {
                    break;
                }
            }
        });

        Self {
            handle: Some(handle),
            elapsed: rx,
        }
    }

    pub fn elapsed_seconds(&self) -> i64 {
        *self.elapsed.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// 订阅每秒的耗时更新
    pub fn subscribe(&self) -> watch::Receiver<i64> {
        self.elapsed.clone()
    }

    /// 返回本次调用是否真正取消了计时器
    pub fn stop(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                debug!("Elapsed ticker stopped");
                true
            }
            None => false,
        }
    }
}

impl Drop for ElapsedTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ticker_stops_exactly_once() {
        let started = Utc::now() - chrono::Duration::seconds(5);
        let mut ticker = ElapsedTicker::start(started, Duration::from_millis(10));
        assert!(ticker.elapsed_seconds() >= 5);
        assert!(ticker.is_running());

        assert!(ticker.stop());
        assert!(!ticker.stop());
        assert!(!ticker.is_running());
    }

    #[tokio::test]
    async fn test_ticker_publishes_updates() {
        let started = Utc::now() - chrono::Duration::seconds(30);
        let ticker = ElapsedTicker::start(started, Duration::from_millis(10));
        let mut rx = ticker.subscribe();

        rx.changed().await.unwrap();
        assert!(*rx.borrow() >= 30);
    }
}
