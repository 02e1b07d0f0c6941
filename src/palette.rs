use std::collections::HashMap;

/// Dashboard accent colors used for grouped series.
const DASHBOARD_COLORS: [&str; 5] = ["#2E86AB", "#F6C85F", "#6F4E7C", "#9FD356", "#CA472F"];

/// Qualitative palette for the price-band pie (ColorBrewer Set2).
const SET2_COLORS: [&str; 8] = [
    "#66c2a5", "#fc8d62", "#8da0cb", "#e78ac3", "#a6d854", "#ffd92f", "#e5c494", "#b3b3b3",
];

/// Regression scatter point color.
pub const SCATTER_BLUE: &str = "#1f77b4";
/// Trendline overlay color.
pub const TREND_RED: &str = "red";
/// Fill under the density curve.
pub const DENSITY_FILL: &str = "rgba(99, 110, 250, 0.4)";

#[derive(Debug, Clone)]
pub struct ColorPalette {
    colors: Vec<String>,
}

impl ColorPalette {
    pub fn dashboard() -> Self {
        Self {
            colors: DASHBOARD_COLORS.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn set2() -> Self {
        Self {
            colors: SET2_COLORS.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Color for the i-th category, cycling when the palette runs out.
    pub fn color(&self, index: usize) -> &str {
        &self.colors[index % self.colors.len()]
    }

    /// Assign a color per key, in the order given.
    pub fn assign_colors(&self, keys: &[String]) -> HashMap<String, String> {
        keys.iter()
            .enumerate()
            .map(|(i, key)| (key.clone(), self.color(i).to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_cycles() {
        let palette = ColorPalette::dashboard();
        assert_eq!(palette.color(0), palette.color(5));
    }

    #[test]
    fn test_assign_colors_is_order_stable() {
        let palette = ColorPalette::dashboard();
        let keys = vec!["a".to_string(), "b".to_string()];
        let map = palette.assign_colors(&keys);
        assert_eq!(map["a"], palette.color(0));
        assert_eq!(map["b"], palette.color(1));
    }
}
