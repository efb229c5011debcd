use std::collections::BTreeMap;

use tracing::debug;

use fpqueue_core::PlotConfig;

use crate::figure::{draw, plot_width, Figure, LayoutUpdate};
use crate::models::LightcurveInput;

/// 当前挂载的所有光变曲线，按绘图标识索引
///
/// 多个图的输入互不覆盖；重复挂载同一标识会整体替换旧输入并重画。
pub struct PlotRegistry {
    config: PlotConfig,
    plots: BTreeMap<String, LightcurveInput>,
}

impl PlotRegistry {
    pub fn new(config: PlotConfig) -> Self {
        Self {
            config,
            plots: BTreeMap::new(),
        }
    }

    pub fn mount(&mut self, input: LightcurveInput, container_width: f64) -> Figure {
        let figure = draw(&input, &self.config, container_width);
        debug!("Mounted plot {}", input.plot_id);
        self.plots.insert(input.plot_id.clone(), input);
        figure
    }

    pub fn unmount(&mut self, plot_id: &str) -> bool {
        self.plots.remove(plot_id).is_some()
    }

    pub fn is_mounted(&self, plot_id: &str) -> bool {
        self.plots.contains_key(plot_id)
    }

    pub fn len(&self) -> usize {
        self.plots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plots.is_empty()
    }

    /// 容器宽度变化后对每个已挂载的图重新布局；固定宽度时无需更新
    pub fn relayout_all(&self, container_width: f64) -> Vec<(String, LayoutUpdate)> {
        if self.config.width.is_some() {
            return Vec::new();
        }

        let update = LayoutUpdate {
            width: plot_width(&self.config, container_width),
            height: self.config.height,
        };
        self.plots
            .keys()
            .map(|plot_id| (plot_id.clone(), update))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PlotLimits, SeriesLabel};

    fn input(plot_id: &str) -> LightcurveInput {
        LightcurveInput {
            plot_id: plot_id.to_string(),
            series: vec![vec![vec![1.0, 2.0, 0.1]]],
            labels: vec![SeriesLabel {
                label: "o".to_string(),
                color: 12,
                display: false,
            }],
            limits: PlotLimits {
                xmin: 1.0,
                xmax: 1.0,
                ymin: 0.0,
                ymax: 3.0,
                discovery_date: 1.0,
                today: 21.0,
            },
        }
    }

    #[test]
    fn test_relayout_every_mounted_plot() {
        let mut registry = PlotRegistry::new(PlotConfig::default());
        registry.mount(input("plotforcedflux-task-1"), 1000.0);
        registry.mount(input("plotforcedflux-task-2"), 1000.0);
        registry.mount(input("plotforcedflux-task-2"), 1000.0);
        assert_eq!(registry.len(), 2);

        let updates = registry.relayout_all(500.0);
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].1.width, 450.0);
        assert_eq!(updates[0].1.height, 300.0);
    }

    #[test]
    fn test_fixed_width_skips_relayout() {
        let config = PlotConfig {
            width: Some(700.0),
            ..PlotConfig::default()
        };
        let mut registry = PlotRegistry::new(config);
        registry.mount(input("plotforcedflux-task-1"), 1000.0);
        assert!(registry.relayout_all(500.0).is_empty());
    }

    #[test]
    fn test_unmount() {
        let mut registry = PlotRegistry::new(PlotConfig::default());
        registry.mount(input("a"), 1000.0);
        assert!(registry.unmount("a"));
        assert!(!registry.unmount("a"));
        assert!(registry.is_empty());
    }
}
