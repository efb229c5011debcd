use std::path::Path;

use fpqueue_core::QueueResult;

use crate::figure::Figure;

pub const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// 把图包装成可独立打开的 HTML 页面
pub fn render_html(figure: &Figure, plot_id: &str, title: &str) -> QueueResult<String> {
    let data = serde_json::to_string(&figure.data)?;
    let layout = serde_json::to_string(&figure.layout)?;
    let config = serde_json::to_string(&figure.config)?;

    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="{PLOTLY_CDN}"></script>
</head>
<body>
<div id="{plot_id}"></div>
<script>
Plotly.newPlot("{plot_id}", {data}, {layout}, {config});
</script>
</body>
</html>
"#
    ))
}

pub fn write_html(figure: &Figure, plot_id: &str, title: &str, path: &Path) -> QueueResult<()> {
    let html = render_html(figure, plot_id, title)?;
    std::fs::write(path, html)?;
    Ok(())
}
