use crate::data::{Table, COL_INDEX};
use anyhow::Result;

/// Suffixes marking normalized/coded derivative columns, excluded from
/// correlation analysis.
pub const NORMALIZED_SUFFIX: &str = "MinMax";
pub const CODED_SUFFIX: &str = "_Cod";

/// Numeric columns eligible for the correlation matrix, in table order.
/// The index column is matched case-insensitively; the suffix checks are
/// exact.
pub fn correlation_columns(table: &Table) -> Vec<String> {
    table
        .headers()
        .iter()
        .enumerate()
        .filter(|(i, name)| {
            table.is_numeric_column(*i)
                && !name.eq_ignore_ascii_case(COL_INDEX)
                && !name.ends_with(NORMALIZED_SUFFIX)
                && !name.ends_with(CODED_SUFFIX)
        })
        .map(|(_, name)| name.clone())
        .collect()
}

/// Pairwise Pearson correlation over the named columns. Each pair is
/// computed over the rows where both values are present.
pub fn correlation_matrix(table: &Table, columns: &[String]) -> Result<Vec<Vec<f64>>> {
    let series: Vec<Vec<Option<f64>>> = columns
        .iter()
        .map(|name| table.numeric_column(name))
        .collect::<Result<_>>()?;

    let n = series.len();
    let mut matrix = vec![vec![f64::NAN; n]; n];
    for i in 0..n {
        for j in i..n {
            let r = pearson(&series[i], &series[j]);
            matrix[i][j] = r;
            matrix[j][i] = r;
        }
    }
    Ok(matrix)
}

fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> f64 {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b.iter())
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom == 0.0 {
        f64::NAN
    } else {
        cov / denom
    }
}

/// Ordinary-least-squares fit. Returns (slope, intercept), or None when the
/// data cannot determine a line.
pub fn linear_fit(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    if x.len() < 2 || x.len() != y.len() {
        return None;
    }
    let n = x.len() as f64;
    let sum_x: f64 = x.iter().sum();
    let sum_y: f64 = y.iter().sum();
    let sum_xx: f64 = x.iter().map(|&v| v * v).sum();
    let sum_xy: f64 = x.iter().zip(y.iter()).map(|(&a, &b)| a * b).sum();

    let denom = n * sum_xx - sum_x * sum_x;
    if denom == 0.0 {
        return None;
    }
    let slope = (n * sum_xy - sum_x * sum_y) / denom;
    let intercept = (sum_y - slope * sum_x) / n;
    Some((slope, intercept))
}

/// Evenly spaced bin edges over [min, max]. A zero-width range gets a unit
/// width so counting still works.
pub fn bin_edges(min: f64, max: f64, bins: usize) -> Vec<f64> {
    let range = max - min;
    let width = if range == 0.0 { 1.0 } else { range / bins as f64 };
    (0..=bins).map(|i| min + i as f64 * width).collect()
}

/// Count values per bin. Bins are left-closed; the last bin also includes
/// its upper edge so the maximum value is not lost.
pub fn bin_counts(values: &[f64], edges: &[f64]) -> Vec<f64> {
    if edges.len() < 2 {
        return Vec::new();
    }
    let bins = edges.len() - 1;
    let min = edges[0];
    let width = edges[1] - edges[0];
    let mut counts = vec![0.0; bins];
    for &v in values {
        if v < min || v > edges[bins] {
            continue;
        }
        let idx = (((v - min) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1.0;
    }
    counts
}

/// Silverman's rule of thumb for bandwidth selection.
pub fn silverman_bandwidth(data: &[f64]) -> f64 {
    let n = data.len() as f64;
    if n < 2.0 {
        return 1.0;
    }

    let mean = data.iter().sum::<f64>() / n;
    let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();

    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let q1 = percentile(&sorted, 0.25);
    let q3 = percentile(&sorted, 0.75);
    let iqr = q3 - q1;

    // h = 0.9 * min(std, IQR/1.34) * n^(-1/5)
    let scale = if iqr > 0.0 { std_dev.min(iqr / 1.34) } else { std_dev };
    if scale <= 0.0 {
        return 1.0;
    }
    0.9 * scale * n.powf(-0.2)
}

fn gaussian_kernel(u: f64) -> f64 {
    const SQRT_2PI: f64 = 2.5066282746310002;
    (-0.5 * u * u).exp() / SQRT_2PI
}

/// Gaussian KDE sampled at `points` evenly spaced positions spanning the
/// observed min-max of the data.
pub fn kde_curve(data: &[f64], points: usize) -> (Vec<f64>, Vec<f64>) {
    if data.is_empty() || points < 2 {
        return (Vec::new(), Vec::new());
    }
    let n = data.len() as f64;
    let min = data.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = data.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        return (vec![min], vec![1.0]);
    }

    let bandwidth = silverman_bandwidth(data);
    let range = max - min;

    let mut grid = Vec::with_capacity(points);
    let mut density = Vec::with_capacity(points);
    for i in 0..points {
        let x = min + range * (i as f64 / (points - 1) as f64);
        let mut d = 0.0;
        for &xi in data {
            d += gaussian_kernel((x - xi) / bandwidth);
        }
        grid.push(x);
        density.push(d / (n * bandwidth));
    }
    (grid, density)
}

fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    let n = sorted_data.len();
    if n == 0 {
        return 0.0;
    }
    if n == 1 {
        return sorted_data[0];
    }

    let rank = p * (n - 1) as f64;
    let lower_idx = rank.floor() as usize;
    let upper_idx = rank.ceil() as usize;

    if lower_idx == upper_idx {
        sorted_data[lower_idx]
    } else {
        let weight = rank - lower_idx as f64;
        sorted_data[lower_idx] * (1.0 - weight) + sorted_data[upper_idx] * weight
    }
}

// =============================================================================
// Price bands
// =============================================================================

/// Fixed lower breakpoints; the observed maximum price closes the last band.
pub const PRICE_BAND_BREAKS: [f64; 7] = [0.0, 50.0, 100.0, 150.0, 200.0, 300.0, 500.0];

/// Half-open price interval with its display label. The last band is
/// open-ended ("Acima de R$X").
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBand {
    pub lower: f64,
    pub upper: f64,
    pub label: String,
    pub open_ended: bool,
}

/// Build the band list from the fixed breakpoints plus the observed maximum.
/// Breakpoints are sorted and deduplicated; if the two largest end up
/// coinciding, the top one is nudged +1 to keep the edges strictly
/// increasing.
pub fn price_bands(max_price: f64) -> Vec<PriceBand> {
    let mut edges: Vec<f64> = PRICE_BAND_BREAKS.to_vec();
    edges.push(max_price);
    edges.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    edges.dedup();

    if edges.len() >= 2 {
        let last = edges[edges.len() - 1];
        let prev = edges[edges.len() - 2];
        if is_close(last, prev) {
            let idx = edges.len() - 1;
            edges[idx] = last + 1.0;
        }
    }

    let mut bands = Vec::new();
    for i in 0..edges.len().saturating_sub(1) {
        let open_ended = i == edges.len() - 2;
        let label = if open_ended {
            format!("Acima de R${:.0}", edges[i])
        } else {
            format!("R${:.0}–R${:.0}", edges[i], edges[i + 1])
        };
        bands.push(PriceBand {
            lower: edges[i],
            upper: edges[i + 1],
            label,
            open_ended,
        });
    }
    bands
}

/// Index of the band containing `price`. Intervals are right-closed,
/// `(lower, upper]`, with the first band also including its lower edge.
pub fn band_index(bands: &[PriceBand], price: f64) -> Option<usize> {
    for (i, band) in bands.iter().enumerate() {
        let in_lower = if i == 0 {
            price >= band.lower
        } else {
            price > band.lower
        };
        if in_lower && price <= band.upper {
            return Some(i);
        }
    }
    None
}

fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-8 * a.abs().max(b.abs()).max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Table, Value};

    #[test]
    fn test_correlation_columns_exclude_suffixes() {
        let table = Table::new(
            vec![
                "Unnamed: 0".to_string(),
                "Preço".to_string(),
                "Preço_MinMax".to_string(),
                "Qtd_Vendidos_Cod".to_string(),
                "Marca".to_string(),
            ],
            vec![vec![
                Value::Number(0.0),
                Value::Number(10.0),
                Value::Number(0.1),
                Value::Number(3.0),
                Value::Text("X".to_string()),
            ]],
        )
        .unwrap();
        assert_eq!(correlation_columns(&table), vec!["Preço".to_string()]);
    }

    #[test]
    fn test_pearson_perfect_correlation() {
        let a: Vec<Option<f64>> = vec![Some(1.0), Some(2.0), Some(3.0)];
        let b: Vec<Option<f64>> = vec![Some(2.0), Some(4.0), Some(6.0)];
        assert!((pearson(&a, &b) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_skips_missing_pairs() {
        let a: Vec<Option<f64>> = vec![Some(1.0), None, Some(3.0), Some(4.0)];
        let b: Vec<Option<f64>> = vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)];
        assert!((pearson(&a, &b) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_linear_fit_recovers_line() {
        let x = vec![0.0, 1.0, 2.0, 3.0];
        let y = vec![1.0, 3.0, 5.0, 7.0];
        let (slope, intercept) = linear_fit(&x, &y).unwrap();
        assert!((slope - 2.0).abs() < 1e-12);
        assert!((intercept - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_linear_fit_degenerate() {
        assert!(linear_fit(&[1.0], &[2.0]).is_none());
        assert!(linear_fit(&[2.0, 2.0], &[1.0, 3.0]).is_none());
    }

    #[test]
    fn test_bin_counts_cover_max_value() {
        let edges = bin_edges(0.0, 10.0, 5);
        let counts = bin_counts(&[0.0, 2.0, 9.9, 10.0], &edges);
        assert_eq!(counts.len(), 5);
        assert_eq!(counts.iter().sum::<f64>(), 4.0);
        assert_eq!(counts[4], 2.0);
    }

    #[test]
    fn test_kde_curve_spans_observed_range() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let (x, y) = kde_curve(&data, 200);
        assert_eq!(x.len(), 200);
        assert_eq!(y.len(), 200);
        assert_eq!(x[0], 1.0);
        assert!((x[199] - 5.0).abs() < 1e-9);
        assert!(y.iter().all(|&d| d >= 0.0));
    }

    #[test]
    fn test_price_bands_scenario() {
        // Prices [10, 60, 550]: the named bands each hold one row.
        let bands = price_bands(550.0);
        assert_eq!(bands[0].label, "R$0–R$50");
        assert_eq!(bands[1].label, "R$50–R$100");
        assert_eq!(bands.last().unwrap().label, "Acima de R$500");

        assert_eq!(band_index(&bands, 10.0), Some(0));
        assert_eq!(band_index(&bands, 60.0), Some(1));
        assert_eq!(band_index(&bands, 550.0), Some(bands.len() - 1));
    }

    #[test]
    fn test_price_bands_strictly_increasing() {
        for max in [75.0, 327.0, 500.0, 500.0000001, 1200.0] {
            let bands = price_bands(max);
            for pair in bands.windows(2) {
                assert!(pair[0].upper <= pair[1].lower + 1e-9);
            }
            for band in &bands {
                assert!(band.upper > band.lower, "band {:?} not increasing", band);
            }
        }
    }

    #[test]
    fn test_price_band_nudge_on_coinciding_top() {
        let bands = price_bands(500.0000001);
        let last = bands.last().unwrap();
        assert!(last.upper > 500.5);
        assert_eq!(last.label, "Acima de R$500");
    }

    #[test]
    fn test_band_assignment_total_and_exclusive() {
        let bands = price_bands(400.0);
        for price in [0.0, 25.0, 50.0, 99.9, 150.0, 200.0, 300.0, 399.0, 400.0] {
            let hits: Vec<usize> = (0..bands.len())
                .filter(|&i| band_index(&bands, price) == Some(i))
                .collect();
            assert_eq!(hits.len(), 1, "price {} hit {:?}", price, hits);
        }
    }
}
