use serde::Serialize;

/// A named series of pre-binned frequencies sharing one visual style.
#[derive(Debug, Clone, Serialize)]
pub struct FrequencySeries {
    pub name: String,
    pub color: String,
    pub counts: Vec<f64>,
}

/// A named series of points sharing one visual style. `hover` carries the
/// per-point hover text, parallel to `x`/`y`.
#[derive(Debug, Clone, Serialize)]
pub struct PointSeries {
    pub name: String,
    pub color: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub hover: Vec<String>,
}

/// Declarative, renderer-agnostic chart description. The embedded page
/// script interprets each variant into plotting-library calls; nothing here
/// is mutated after construction.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartSpec {
    Histogram {
        title: String,
        x_label: String,
        y_label: String,
        bin_edges: Vec<f64>,
        series: Vec<FrequencySeries>,
        bar_gap: f64,
    },
    Scatter {
        title: String,
        x_label: String,
        y_label: String,
        series: Vec<PointSeries>,
    },
    Heatmap {
        title: String,
        columns: Vec<String>,
        matrix: Vec<Vec<f64>>,
        color_scale: String,
        annotate: bool,
    },
    Bar {
        title: String,
        x_label: String,
        y_label: String,
        categories: Vec<String>,
        values: Vec<f64>,
        colors: Vec<String>,
        labels_outside: bool,
    },
    Pie {
        title: String,
        labels: Vec<String>,
        values: Vec<f64>,
        colors: Vec<String>,
        hole: f64,
        text_info: String,
    },
    Density {
        title: String,
        x_label: String,
        y_label: String,
        x: Vec<f64>,
        y: Vec<f64>,
        line_color: String,
        fill_color: String,
    },
    Regression {
        title: String,
        x_label: String,
        y_label: String,
        points: PointSeries,
        trend_x: Vec<f64>,
        trend_y: Vec<f64>,
        trend_color: String,
    },
}

impl ChartSpec {
    pub fn title(&self) -> &str {
        match self {
            ChartSpec::Histogram { title, .. }
            | ChartSpec::Scatter { title, .. }
            | ChartSpec::Heatmap { title, .. }
            | ChartSpec::Bar { title, .. }
            | ChartSpec::Pie { title, .. }
            | ChartSpec::Density { title, .. }
            | ChartSpec::Regression { title, .. } => title,
        }
    }
}
