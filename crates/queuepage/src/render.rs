use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::controller::PageView;
use crate::task_item::{format_timestamp, TaskItems};

/// 把页面状态渲染成终端文本
pub fn render_page(
    view: &PageView,
    items: &TaskItems,
    viewer: Option<i64>,
    hide_plot_threshold: usize,
    now: DateTime<Utc>,
) -> String {
    let mut out = String::new();
    let single_task = view.single_task_id();

    match single_task {
        Some(id) => {
            let _ = writeln!(out, "Task {id}");
        }
        None => {
            let _ = writeln!(out, "Task Queue");
            let (all, started) = if view.started_filter() {
                (" ", "x")
            } else {
                ("x", " ")
            };
            let _ = writeln!(out, "[{all}] All tasks  [{started}] Running/Finished");
        }
    }

    if let Some(login) = &view.session_expired {
        let _ = writeln!(out, "Session expired, log in again at {login}");
        return out;
    }

    if let Some(updated) = &view.last_updated {
        let error = view.error.as_deref().unwrap_or("");
        let _ = writeln!(out, "Last updated: {} {}", format_timestamp(updated), error);
    } else if let Some(error) = &view.error {
        let _ = writeln!(out, "{error}");
    }

    let Some(page) = &view.page else {
        let _ = writeln!(out, "Loading tasks...");
        return out;
    };

    let visible: Vec<_> = items
        .iter()
        .filter(|item| !view.hidden.contains(&item.id()))
        .collect();
    if visible.is_empty() {
        let _ = writeln!(out, "There are no tasks.");
    }

    let page_len = page.results.len();
    for item in visible {
        let _ = writeln!(out);
        let mut lines = item.describe(viewer, now).into_iter();
        if let Some(first) = lines.next() {
            let marker = if item.entrance() { " (new)" } else { "" };
            let _ = writeln!(out, "{first}{marker}");
        }
        for line in lines {
            let _ = writeln!(out, "  {line}");
        }
        let actions: Vec<String> = item
            .actions(viewer)
            .iter()
            .map(|action| format!("[{}]", action.label()))
            .collect();
        if !actions.is_empty() {
            let _ = writeln!(out, "  {}", actions.join(" "));
        }
        if item.shows_plot(page_len, hide_plot_threshold) {
            let _ = writeln!(out, "  Plot: {}", item.task().plot_id());
        }
    }

    if single_task.is_none() {
        if let Some((first, last, total)) = page.showing_range() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Showing tasks {first}-{last} of {total}");
        }
        let mut pager = Vec::new();
        if page.previous.is_some() {
            pager.push("« Newer");
        }
        if page.next.is_some() {
            pager.push("Older »");
        }
        if !pager.is_empty() {
            let _ = writeln!(out, "{}", pager.join("  "));
        }
    }

    out
}
