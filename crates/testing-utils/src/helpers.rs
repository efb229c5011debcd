//! Helpers for waiting on asynchronous state in tests

use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Poll `condition` until it holds or `timeout` elapses
pub async fn wait_for<F>(mut condition: F, timeout: Duration) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;

    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(5)).await;
    }

    condition()
}

/// Wait until at least `count` GETs reached the scripted api
pub async fn wait_for_fetches(api: &crate::ScriptedTaskApi, count: usize) -> bool {
    wait_for(|| api.fetch_count() >= count, Duration::from_secs(2)).await
}

pub async fn wait_for_submissions(api: &crate::ScriptedTaskApi, count: usize) -> bool {
    wait_for(|| api.submit_calls().len() >= count, Duration::from_secs(2)).await
}
