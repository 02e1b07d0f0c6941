use crate::builders;
use crate::chart::ChartSpec;
use crate::data::{Table, COL_GENRE, COL_PRICE};
use anyhow::Result;

/// Sentinel dropdown value meaning "no genre filter".
pub const ALL_GENRES: &str = "Todos";

/// Parsed genre dropdown input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenreSelection {
    All,
    Genre(String),
}

impl GenreSelection {
    pub fn parse(raw: &str) -> Self {
        if raw == ALL_GENRES {
            GenreSelection::All
        } else {
            GenreSelection::Genre(raw.to_string())
        }
    }
}

/// Genre dropdown handler: re-filter the table and rebuild the histogram.
/// Pure over the shared table; the sentinel passes it through untouched.
pub fn histogram_for_genre(table: &Table, selection: &GenreSelection) -> Result<ChartSpec> {
    match selection {
        GenreSelection::All => builders::rating_histogram(table, None),
        GenreSelection::Genre(genre) => {
            let filtered = table.filter_text_eq(COL_GENRE, genre)?;
            builders::rating_histogram(&filtered, Some(genre))
        }
    }
}

/// Price range handler: keep rows with price inside the inclusive bound and
/// rebuild the scatter. An empty intersection yields an empty chart, not an
/// error.
pub fn scatter_for_price_range(table: &Table, min: f64, max: f64) -> Result<ChartSpec> {
    let filtered = table.filter_numeric_range(COL_PRICE, min, max)?;
    builders::price_rating_scatter(&filtered, min, max)
}
