use crate::chart::{ChartSpec, FrequencySeries, PointSeries};
use crate::data::{
    Table, Value, COL_BRAND, COL_DISCOUNT, COL_GENRE, COL_PRICE, COL_PRICE_BAND, COL_RATING,
    COL_SOLD, COL_TITLE,
};
use crate::palette::{ColorPalette, DENSITY_FILL, SCATTER_BLUE, TREND_RED};
use crate::stats;
use anyhow::{anyhow, Result};
use std::collections::HashMap;

pub const HISTOGRAM_BINS: usize = 20;
pub const KDE_POINTS: usize = 200;
pub const TOP_BRANDS: usize = 10;

const HISTOGRAM_TITLE: &str = "Distribuição das notas dos produtos";

/// Rating histogram: 20 shared bins over the observed rating range, one
/// overlaid series per genre. `filter_label` annotates the title when the
/// table was pre-filtered by the genre control.
pub fn rating_histogram(table: &Table, filter_label: Option<&str>) -> Result<ChartSpec> {
    let genre_idx = require(table, COL_GENRE)?;
    let rating_idx = require(table, COL_RATING)?;

    let mut by_genre: HashMap<String, Vec<f64>> = HashMap::new();
    let mut all_ratings = Vec::new();
    for row in table.rows() {
        let (Some(genre), Some(rating)) = (row[genre_idx].as_text(), row[rating_idx].as_number())
        else {
            continue;
        };
        by_genre.entry(genre.to_string()).or_default().push(rating);
        all_ratings.push(rating);
    }

    let bin_edges = if all_ratings.is_empty() {
        Vec::new()
    } else {
        let min = all_ratings.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = all_ratings.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        stats::bin_edges(min, max, HISTOGRAM_BINS)
    };

    let keys = sorted_keys(&by_genre);
    let colors = ColorPalette::dashboard().assign_colors(&keys);
    let series = keys
        .iter()
        .map(|key| FrequencySeries {
            name: key.clone(),
            color: colors[key].clone(),
            counts: stats::bin_counts(&by_genre[key], &bin_edges),
        })
        .collect();

    let title = match filter_label {
        Some(genre) => format!("{HISTOGRAM_TITLE} - Filtrado por: {genre}"),
        None => HISTOGRAM_TITLE.to_string(),
    };

    Ok(ChartSpec::Histogram {
        title,
        x_label: "Nota do produto".to_string(),
        y_label: "frequência".to_string(),
        bin_edges,
        series,
        bar_gap: 0.5,
    })
}

/// Price-vs-rating scatter over an already-filtered table; the active range
/// only feeds the title.
pub fn price_rating_scatter(table: &Table, min_price: f64, max_price: f64) -> Result<ChartSpec> {
    let genre_idx = require(table, COL_GENRE)?;
    let price_idx = require(table, COL_PRICE)?;
    let rating_idx = require(table, COL_RATING)?;
    let title_idx = require(table, COL_TITLE)?;

    let mut by_genre: HashMap<String, (Vec<f64>, Vec<f64>, Vec<String>)> = HashMap::new();
    for row in table.rows() {
        let (Some(genre), Some(price), Some(rating)) = (
            row[genre_idx].as_text(),
            row[price_idx].as_number(),
            row[rating_idx].as_number(),
        ) else {
            continue;
        };
        let hover = row[title_idx].as_text().unwrap_or_default().to_string();
        let entry = by_genre.entry(genre.to_string()).or_default();
        entry.0.push(price);
        entry.1.push(rating);
        entry.2.push(hover);
    }

    let keys = sorted_keys(&by_genre);
    let colors = ColorPalette::dashboard().assign_colors(&keys);
    let series = keys
        .iter()
        .map(|key| {
            let (x, y, hover) = by_genre[key].clone();
            PointSeries {
                name: key.clone(),
                color: colors[key].clone(),
                x,
                y,
                hover,
            }
        })
        .collect();

    Ok(ChartSpec::Scatter {
        title: format!(
            "Dispersão Preço vs Nota (Filtrado: R${:.2} a R${:.2})",
            min_price, max_price
        ),
        x_label: "Preço$".to_string(),
        y_label: "Nota média".to_string(),
        series,
    })
}

/// Pearson correlation heatmap over the eligible numeric columns, rounded
/// to two decimals.
pub fn correlation_heatmap(table: &Table) -> Result<ChartSpec> {
    let columns = stats::correlation_columns(table);
    let matrix = stats::correlation_matrix(table, &columns)?
        .into_iter()
        .map(|row| row.into_iter().map(round2).collect())
        .collect();

    Ok(ChartSpec::Heatmap {
        title: "Matriz de Correlação".to_string(),
        columns,
        matrix,
        color_scale: "Viridis".to_string(),
        annotate: true,
    })
}

/// Top brands ranked by summed coded sold-quantity.
pub fn top_brands_bar(table: &Table) -> Result<ChartSpec> {
    let brand_idx = require(table, COL_BRAND)?;
    let sold_idx = require(table, COL_SOLD)?;

    let mut totals: HashMap<String, f64> = HashMap::new();
    let mut order = Vec::new();
    for row in table.rows() {
        let Some(brand) = row[brand_idx].as_text() else {
            continue;
        };
        let sold = row[sold_idx].as_number().unwrap_or(0.0);
        if !totals.contains_key(brand) {
            order.push(brand.to_string());
        }
        *totals.entry(brand.to_string()).or_default() += sold;
    }

    let mut ranked: Vec<(String, f64)> = order
        .into_iter()
        .map(|brand| {
            let total = totals[&brand];
            (brand, total)
        })
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(TOP_BRANDS);

    let palette = ColorPalette::dashboard();
    let colors = (0..ranked.len()).map(|i| palette.color(i).to_string()).collect();
    let (categories, values) = ranked.into_iter().unzip();

    Ok(ChartSpec::Bar {
        title: "Top 10 marcas por quantidade vendida".to_string(),
        x_label: "Marca".to_string(),
        y_label: "Quantidade vendida (proxy)".to_string(),
        categories,
        values,
        colors,
        labels_outside: true,
    })
}

/// Price-band donut. The one builder with a side effect: it assigns the
/// band column to the table before grouping, so callers must pass the table
/// mutably and do so before sharing it.
pub fn price_band_pie(table: &mut Table) -> Result<ChartSpec> {
    let prices = table.numeric_column(COL_PRICE)?;
    let max_price = prices
        .iter()
        .flatten()
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max);

    if !max_price.is_finite() {
        // Nothing priced; an empty donut, not an error.
        return Ok(empty_pie());
    }

    let bands = stats::price_bands(max_price);
    let assignments: Vec<Value> = prices
        .iter()
        .map(|price| match price.and_then(|p| stats::band_index(&bands, p)) {
            Some(i) => Value::Text(bands[i].label.clone()),
            None => Value::Missing,
        })
        .collect();
    table.insert_column(COL_PRICE_BAND, assignments)?;

    let mut counts = vec![0.0; bands.len()];
    for price in prices.iter().flatten() {
        if let Some(i) = stats::band_index(&bands, *price) {
            counts[i] += 1.0;
        }
    }

    // Occupied bands only, largest first (stable, so ties keep band order).
    let mut dist: Vec<(String, f64)> = bands
        .iter()
        .zip(&counts)
        .filter(|(_, &count)| count > 0.0)
        .map(|(band, &count)| (band.label.clone(), count))
        .collect();
    dist.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let palette = ColorPalette::set2();
    let colors = (0..dist.len()).map(|i| palette.color(i).to_string()).collect();
    let (labels, values) = dist.into_iter().unzip();

    Ok(ChartSpec::Pie {
        title: "Distribuição de produtos por faixa de preço".to_string(),
        labels,
        values,
        colors,
        hole: 0.4,
        text_info: "percent+label".to_string(),
    })
}

fn empty_pie() -> ChartSpec {
    ChartSpec::Pie {
        title: "Distribuição de produtos por faixa de preço".to_string(),
        labels: Vec::new(),
        values: Vec::new(),
        colors: Vec::new(),
        hole: 0.4,
        text_info: "percent+label".to_string(),
    }
}

/// Kernel density estimate of the discount distribution, sampled at 200
/// points over the observed range.
pub fn discount_density(table: &Table) -> Result<ChartSpec> {
    let discounts = table.numeric_values(COL_DISCOUNT)?;
    let (x, y) = stats::kde_curve(&discounts, KDE_POINTS);

    Ok(ChartSpec::Density {
        title: "Densidade dos descontos dos produtos".to_string(),
        x_label: "Desconto %".to_string(),
        y_label: "Densidade".to_string(),
        x,
        y,
        line_color: "#636efa".to_string(),
        fill_color: DENSITY_FILL.to_string(),
    })
}

/// Price-vs-discount scatter with an OLS trendline between the observed
/// price extremes.
pub fn price_discount_regression(table: &Table) -> Result<ChartSpec> {
    let price_idx = require(table, COL_PRICE)?;
    let discount_idx = require(table, COL_DISCOUNT)?;

    let mut x = Vec::new();
    let mut y = Vec::new();
    for row in table.rows() {
        let (Some(price), Some(discount)) =
            (row[price_idx].as_number(), row[discount_idx].as_number())
        else {
            continue;
        };
        x.push(price);
        y.push(discount);
    }

    let (trend_x, trend_y) = match stats::linear_fit(&x, &y) {
        Some((slope, intercept)) => {
            let min_x = x.iter().cloned().fold(f64::INFINITY, f64::min);
            let max_x = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            (
                vec![min_x, max_x],
                vec![slope * min_x + intercept, slope * max_x + intercept],
            )
        }
        None => (Vec::new(), Vec::new()),
    };

    Ok(ChartSpec::Regression {
        title: "Relação entre preço e desconto dos produtos".to_string(),
        x_label: "Preço $".to_string(),
        y_label: "Desconto %".to_string(),
        points: PointSeries {
            name: "Produtos".to_string(),
            color: SCATTER_BLUE.to_string(),
            x,
            y,
            hover: Vec::new(),
        },
        trend_x,
        trend_y,
        trend_color: TREND_RED.to_string(),
    })
}

fn require(table: &Table, name: &str) -> Result<usize> {
    table
        .column_index(name)
        .ok_or_else(|| anyhow!("Column '{}' not found", name))
}

fn sorted_keys<V>(map: &HashMap<String, V>) -> Vec<String> {
    let mut keys: Vec<String> = map.keys().cloned().collect();
    keys.sort();
    keys
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn make_table() -> Table {
        let headers = vec![
            "Preço".to_string(),
            "Desconto".to_string(),
            "Nota".to_string(),
            "Gênero".to_string(),
            "Marca".to_string(),
            "Título".to_string(),
            "Qtd_Vendidos_Cod".to_string(),
        ];
        let rows = vec![
            vec![
                Value::Number(10.0),
                Value::Number(5.0),
                Value::Number(4.0),
                text("Livros"),
                text("Alfa"),
                text("Produto 1"),
                Value::Number(100.0),
            ],
            vec![
                Value::Number(60.0),
                Value::Number(10.0),
                Value::Number(3.5),
                text("Games"),
                text("Beta"),
                text("Produto 2"),
                Value::Number(250.0),
            ],
            vec![
                Value::Number(550.0),
                Value::Number(20.0),
                Value::Number(5.0),
                text("Livros"),
                text("Alfa"),
                text("Produto 3"),
                Value::Number(40.0),
            ],
        ];
        Table::new(headers, rows).unwrap()
    }

    #[test]
    fn test_histogram_groups_by_genre() {
        let table = make_table();
        let spec = rating_histogram(&table, None).unwrap();
        let ChartSpec::Histogram {
            title,
            series,
            bin_edges,
            ..
        } = spec
        else {
            panic!("wrong chart kind");
        };
        assert_eq!(title, "Distribuição das notas dos produtos");
        assert_eq!(series.len(), 2);
        assert_eq!(bin_edges.len(), HISTOGRAM_BINS + 1);
        let total: f64 = series.iter().flat_map(|s| s.counts.iter()).sum();
        assert_eq!(total, 3.0);
    }

    #[test]
    fn test_histogram_filtered_title() {
        let table = make_table();
        let spec = rating_histogram(&table, Some("Livros")).unwrap();
        assert_eq!(
            spec.title(),
            "Distribuição das notas dos produtos - Filtrado por: Livros"
        );
    }

    #[test]
    fn test_histogram_of_empty_table_is_not_an_error() {
        let table = make_table().filter_text_eq("Gênero", "Inexistente").unwrap();
        let spec = rating_histogram(&table, Some("Inexistente")).unwrap();
        let ChartSpec::Histogram { series, .. } = spec else {
            panic!("wrong chart kind");
        };
        assert!(series.is_empty());
    }

    #[test]
    fn test_scatter_title_embeds_range() {
        let table = make_table();
        let spec = price_rating_scatter(&table, 25.0, 327.0).unwrap();
        assert_eq!(
            spec.title(),
            "Dispersão Preço vs Nota (Filtrado: R$25.00 a R$327.00)"
        );
        let ChartSpec::Scatter { series, .. } = spec else {
            panic!("wrong chart kind");
        };
        // One series per genre, hover text carries the product title.
        assert_eq!(series.len(), 2);
        let livros = series.iter().find(|s| s.name == "Livros").unwrap();
        assert_eq!(livros.x, vec![10.0, 550.0]);
        assert_eq!(livros.hover, vec!["Produto 1", "Produto 3"]);
    }

    #[test]
    fn test_heatmap_rounds_to_two_decimals() {
        let table = make_table();
        let spec = correlation_heatmap(&table).unwrap();
        let ChartSpec::Heatmap {
            columns, matrix, ..
        } = spec
        else {
            panic!("wrong chart kind");
        };
        // Qtd_Vendidos_Cod is excluded by the coded suffix.
        assert_eq!(columns, vec!["Preço", "Desconto", "Nota"]);
        for row in &matrix {
            for v in row {
                if v.is_finite() {
                    assert!((v * 100.0 - (v * 100.0).round()).abs() < 1e-9);
                }
            }
        }
        // Self-correlation on the diagonal.
        assert_eq!(matrix[0][0], 1.0);
    }

    #[test]
    fn test_top_brands_ranked_descending() {
        let table = make_table();
        let spec = top_brands_bar(&table).unwrap();
        let ChartSpec::Bar {
            categories, values, ..
        } = spec
        else {
            panic!("wrong chart kind");
        };
        assert_eq!(categories, vec!["Beta", "Alfa"]);
        assert_eq!(values, vec![250.0, 140.0]);
    }

    #[test]
    fn test_pie_binning_scenario() {
        // Prices [10, 60, 550] with max 550: three occupied bands, one row
        // each.
        let mut table = make_table();
        let spec = price_band_pie(&mut table).unwrap();
        let ChartSpec::Pie {
            labels,
            values,
            hole,
            ..
        } = spec
        else {
            panic!("wrong chart kind");
        };
        assert_eq!(hole, 0.4);
        assert_eq!(values, vec![1.0, 1.0, 1.0]);
        assert!(labels.contains(&"R$0–R$50".to_string()));
        assert!(labels.contains(&"R$50–R$100".to_string()));
        assert!(labels.contains(&"Acima de R$500".to_string()));
        // The builder's one permitted side effect: the band column exists
        // afterwards.
        let bands = table.text_column(COL_PRICE_BAND).unwrap();
        assert_eq!(bands[0], Some("R$0–R$50"));
        assert_eq!(bands[2], Some("Acima de R$500"));
    }

    #[test]
    fn test_density_spans_discount_range() {
        let table = make_table();
        let spec = discount_density(&table).unwrap();
        let ChartSpec::Density { x, y, .. } = spec else {
            panic!("wrong chart kind");
        };
        assert_eq!(x.len(), KDE_POINTS);
        assert_eq!(x[0], 5.0);
        assert!((x[KDE_POINTS - 1] - 20.0).abs() < 1e-9);
        assert!(y.iter().all(|&d| d >= 0.0));
    }

    #[test]
    fn test_regression_trend_endpoints() {
        let table = make_table();
        let spec = price_discount_regression(&table).unwrap();
        let ChartSpec::Regression {
            points,
            trend_x,
            trend_y,
            ..
        } = spec
        else {
            panic!("wrong chart kind");
        };
        assert_eq!(points.x.len(), 3);
        assert_eq!(trend_x, vec![10.0, 550.0]);
        assert_eq!(trend_y.len(), 2);
    }
}
