use fpqueue_core::PlotConfig;
use fpqueue_lightcurve::{parse_result_table, write_html, PlotRegistry};

const RESULT_TABLE: &str = "\
###MJD          m      dm   uJy   duJy F err chi/N
59000.10  17.5  0.02  350    12 o  0  1.1
59001.20  17.9  0.05  410    30 c  0  0.9
59004.20  18.9  0.30  80     60 c  0  0.9
";

#[test]
fn test_result_table_to_html() {
    let input = parse_result_table(RESULT_TABLE, "plotforcedflux-task-12", 59020.0).unwrap();

    let mut registry = PlotRegistry::new(PlotConfig::default());
    let figure = registry.mount(input, 1000.0);
    assert!(registry.is_mounted("plotforcedflux-task-12"));

    // c 与 o 各有探测和非探测两条曲线
    assert_eq!(figure.data.len(), 4);
    assert_eq!(figure.data[0].x, vec![59001.2, 59004.2]);
    assert!(figure.layout.xaxis2.is_none());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("task12.html");
    write_html(&figure, "plotforcedflux-task-12", "Task 12", &path).unwrap();

    let html = std::fs::read_to_string(&path).unwrap();
    assert!(html.contains(r#"<div id="plotforcedflux-task-12"></div>"#));
    assert!(html.contains("\"displayModeBar\":false"));
    assert!(html.contains("limit-arrow"));
}
