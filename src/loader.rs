use crate::data::{Table, Value, COL_DISCOUNT, COL_INDEX, COL_PRICE};
use anyhow::{anyhow, Context, Result};
use std::path::Path;

/// Read the product CSV and run the cleaning pipeline over it.
/// A missing or unreadable file is a fatal startup error for the caller.
pub fn load_and_clean(path: &Path) -> Result<Table> {
    let table = read_csv(path)
        .with_context(|| format!("Failed to read dataset '{}'", path.display()))?;
    clean(table)
}

/// Parse a CSV file into a raw table. Cells are typed on the way in.
pub fn read_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(Value::from_cell).collect());
    }

    if rows.is_empty() {
        return Err(anyhow!("Dataset must contain at least one data row"));
    }
    Table::new(headers, rows)
}

/// The cleaning pipeline, in order:
/// 1. drop the index artifact column,
/// 2. remove exact-duplicate rows,
/// 3. coerce price and discount to numeric (unparseable values go Missing),
/// 4. drop rows missing either field.
///
/// Unparseable values are dropped silently; only the total row count is
/// surfaced, as a single warn line.
pub fn clean(mut table: Table) -> Result<Table> {
    table.drop_column(COL_INDEX);
    table.dedup_rows();
    table.coerce_numeric(COL_PRICE)?;
    table.coerce_numeric(COL_DISCOUNT)?;
    let dropped = table.drop_rows_missing(&[COL_PRICE, COL_DISCOUNT])?;
    if dropped > 0 {
        tracing::warn!(dropped, "dropped rows with unparseable or missing price/discount");
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{COL_DISCOUNT, COL_PRICE};

    fn raw_table() -> Table {
        let headers = vec![
            "Unnamed: 0".to_string(),
            "Preço".to_string(),
            "Desconto".to_string(),
        ];
        let rows = vec![
            vec![
                Value::Number(0.0),
                Value::Number(50.0),
                Value::Number(10.0),
            ],
            vec![
                Value::Number(1.0),
                Value::Text("abc".to_string()),
                Value::Number(5.0),
            ],
            vec![Value::Number(2.0), Value::Number(80.0), Value::Missing],
            vec![
                Value::Number(3.0),
                Value::Number(120.0),
                Value::Number(15.0),
            ],
        ];
        Table::new(headers, rows).unwrap()
    }

    #[test]
    fn test_clean_drops_index_and_bad_rows() {
        let cleaned = clean(raw_table()).unwrap();
        assert!(cleaned.column_index("Unnamed: 0").is_none());
        assert_eq!(cleaned.len(), 2);
        // Every retained row has numeric price and discount.
        for row in cleaned.rows() {
            let price = cleaned.column_index(COL_PRICE).unwrap();
            let discount = cleaned.column_index(COL_DISCOUNT).unwrap();
            assert!(row[price].as_number().is_some());
            assert!(row[discount].as_number().is_some());
        }
    }

    #[test]
    fn test_clean_removes_duplicates() {
        let headers = vec!["Preço".to_string(), "Desconto".to_string()];
        let rows = vec![
            vec![Value::Number(10.0), Value::Number(1.0)],
            vec![Value::Number(10.0), Value::Number(1.0)],
        ];
        let cleaned = clean(Table::new(headers, rows).unwrap()).unwrap();
        assert_eq!(cleaned.len(), 1);
    }

    #[test]
    fn test_clean_is_idempotent() {
        let once = clean(raw_table()).unwrap();
        let twice = clean(once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = load_and_clean(Path::new("does/not/exist.csv"));
        assert!(result.is_err());
    }
}
