use anyhow::{anyhow, Result};
use std::collections::HashSet;

// Column names of the product dataset.
pub const COL_INDEX: &str = "Unnamed: 0";
pub const COL_PRICE: &str = "Preço";
pub const COL_DISCOUNT: &str = "Desconto";
pub const COL_RATING: &str = "Nota";
pub const COL_GENRE: &str = "Gênero";
pub const COL_BRAND: &str = "Marca";
pub const COL_TITLE: &str = "Título";
pub const COL_SOLD: &str = "Qtd_Vendidos_Cod";
pub const COL_PRICE_BAND: &str = "Faixa_Preço";

/// A single cell of the table.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
}

impl Value {
    /// Parse a raw CSV cell: empty becomes Missing, numeric text becomes
    /// Number, anything else stays Text.
    pub fn from_cell(cell: &str) -> Self {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            return Value::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(n) => Value::Number(n),
            Err(_) => Value::Text(cell.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
}

/// Ordered collection of uniformly-shaped rows with named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != headers.len() {
                return Err(anyhow!(
                    "Row {} has {} values, expected {}",
                    i,
                    row.len(),
                    headers.len()
                ));
            }
        }
        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.eq_ignore_ascii_case(name))
    }

    fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| anyhow!("Column '{}' not found", name))
    }

    /// A column is numeric when every value is Number or Missing and at
    /// least one Number exists.
    pub fn is_numeric_column(&self, index: usize) -> bool {
        let mut has_number = false;
        for row in &self.rows {
            match &row[index] {
                Value::Number(_) => has_number = true,
                Value::Missing => {}
                Value::Text(_) => return false,
            }
        }
        has_number
    }

    /// Values of a numeric column, Missing preserved as None.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let idx = self.require_column(name)?;
        Ok(self.rows.iter().map(|row| row[idx].as_number()).collect())
    }

    /// Non-missing values of a numeric column.
    pub fn numeric_values(&self, name: &str) -> Result<Vec<f64>> {
        let idx = self.require_column(name)?;
        Ok(self
            .rows
            .iter()
            .filter_map(|row| row[idx].as_number())
            .collect())
    }

    pub fn text_column(&self, name: &str) -> Result<Vec<Option<&str>>> {
        let idx = self.require_column(name)?;
        Ok(self.rows.iter().map(|row| row[idx].as_text()).collect())
    }

    /// Distinct non-missing text values, in first-appearance order.
    pub fn distinct_text(&self, name: &str) -> Result<Vec<String>> {
        let idx = self.require_column(name)?;
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for row in &self.rows {
            if let Value::Text(s) = &row[idx] {
                if seen.insert(s.clone()) {
                    out.push(s.clone());
                }
            }
        }
        Ok(out)
    }

    /// Rows whose text value in `name` equals `value` exactly.
    pub fn filter_text_eq(&self, name: &str, value: &str) -> Result<Table> {
        let idx = self.require_column(name)?;
        let rows = self
            .rows
            .iter()
            .filter(|row| row[idx].as_text() == Some(value))
            .cloned()
            .collect();
        Ok(Table {
            headers: self.headers.clone(),
            rows,
        })
    }

    /// Rows whose numeric value in `name` lies in the inclusive range.
    pub fn filter_numeric_range(&self, name: &str, min: f64, max: f64) -> Result<Table> {
        let idx = self.require_column(name)?;
        let rows = self
            .rows
            .iter()
            .filter(|row| {
                row[idx]
                    .as_number()
                    .map(|n| n >= min && n <= max)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        Ok(Table {
            headers: self.headers.clone(),
            rows,
        })
    }

    /// Insert a column, replacing it if the name already exists.
    pub fn insert_column(&mut self, name: &str, values: Vec<Value>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(anyhow!(
                "Column '{}' has {} values for {} rows",
                name,
                values.len(),
                self.rows.len()
            ));
        }
        if let Some(idx) = self.column_index(name) {
            for (row, value) in self.rows.iter_mut().zip(values) {
                row[idx] = value;
            }
        } else {
            self.headers.push(name.to_string());
            for (row, value) in self.rows.iter_mut().zip(values) {
                row.push(value);
            }
        }
        Ok(())
    }

    /// Drop a column if present. Returns whether anything was removed.
    pub fn drop_column(&mut self, name: &str) -> bool {
        match self.column_index(name) {
            Some(idx) => {
                self.headers.remove(idx);
                for row in &mut self.rows {
                    row.remove(idx);
                }
                true
            }
            None => false,
        }
    }

    /// Remove exact-duplicate rows, keeping first occurrences.
    pub fn dedup_rows(&mut self) -> usize {
        let mut seen = HashSet::new();
        let before = self.rows.len();
        self.rows.retain(|row| seen.insert(row_key(row)));
        before - self.rows.len()
    }

    /// Coerce a column to numeric; text that does not parse becomes Missing.
    pub fn coerce_numeric(&mut self, name: &str) -> Result<()> {
        let idx = self.require_column(name)?;
        for row in &mut self.rows {
            if let Value::Text(s) = &row[idx] {
                row[idx] = match s.trim().parse::<f64>() {
                    Ok(n) => Value::Number(n),
                    Err(_) => Value::Missing,
                };
            }
        }
        Ok(())
    }

    /// Drop rows with a Missing value in any of the named columns.
    /// Returns the number of rows removed.
    pub fn drop_rows_missing(&mut self, names: &[&str]) -> Result<usize> {
        let indices: Vec<usize> = names
            .iter()
            .map(|name| self.require_column(name))
            .collect::<Result<_>>()?;
        let before = self.rows.len();
        self.rows
            .retain(|row| indices.iter().all(|&idx| !row[idx].is_missing()));
        Ok(before - self.rows.len())
    }
}

fn row_key(row: &[Value]) -> String {
    let mut key = String::new();
    for value in row {
        match value {
            Value::Number(n) => {
                key.push('n');
                key.push_str(&format!("{n:?}"));
            }
            Value::Text(s) => {
                key.push('t');
                key.push_str(s);
            }
            Value::Missing => key.push('m'),
        }
        key.push('\u{1f}');
    }
    key
}
