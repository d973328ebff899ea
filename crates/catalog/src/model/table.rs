//! Raw numeric data tables attached to Records, with CSV/TSV import.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};

/// Delimiters to try when auto-detecting.
const DELIMITERS: &[u8] = &[b'\t', b',', b';', b' '];

/// A rectangular table of measured values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    /// Column labels, e.g. `["energy", "cross_section"]`.
    pub labels: Vec<String>,

    /// Column units, parallel to `labels`. Empty when unitless.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub units: Vec<String>,

    /// Rows of values; every row has one value per label.
    #[serde(default)]
    pub values: Vec<Vec<f64>>,
}

impl DataTable {
    /// Create a table with labels and units.
    pub fn new(labels: Vec<String>, units: Vec<String>) -> Self {
        Self {
            labels,
            units,
            values: Vec::new(),
        }
    }

    /// Append a row.
    pub fn with_row(mut self, row: Vec<f64>) -> Self {
        self.values.push(row);
        self
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.values.len()
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.labels.len()
    }

    /// Check shape and finiteness of the table.
    pub fn validate(&self) -> Result<()> {
        if !self.units.is_empty() && self.units.len() != self.labels.len() {
            return Err(CatalogError::Validation(format!(
                "Data table has {} labels but {} units",
                self.labels.len(),
                self.units.len()
            )));
        }
        for (row_idx, row) in self.values.iter().enumerate() {
            if row.len() != self.labels.len() {
                return Err(CatalogError::Validation(format!(
                    "Data table row {} has {} values, expected {}",
                    row_idx,
                    row.len(),
                    self.labels.len()
                )));
            }
            if let Some(col) = row.iter().position(|v| !v.is_finite()) {
                return Err(CatalogError::Validation(format!(
                    "Data table row {}, column {} is not a finite number",
                    row_idx, col
                )));
            }
        }
        Ok(())
    }

    /// Read a delimited text file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| {
            CatalogError::Persistence(format!(
                "Failed to read data table '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_delimited(&bytes)
    }

    /// Parse delimited text. The first row is the header; a header cell of
    /// the form `energy (eV)` yields label `energy` and unit `eV`.
    pub fn from_delimited(bytes: &[u8]) -> Result<Self> {
        let delimiter = detect_delimiter(bytes)?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let mut labels = Vec::new();
        let mut units = Vec::new();
        for header in reader.headers()?.iter() {
            let (label, unit) = split_unit(header);
            labels.push(label);
            units.push(unit);
        }
        if labels.is_empty() {
            return Err(CatalogError::Validation("Data table has no columns".to_string()));
        }
        if units.iter().all(String::is_empty) {
            units.clear();
        }

        let mut values = Vec::new();
        for (row_idx, record) in reader.records().enumerate() {
            let record = record?;
            let row = record
                .iter()
                .enumerate()
                .map(|(col, cell)| {
                    cell.parse::<f64>().map_err(|_| {
                        CatalogError::Validation(format!(
                            "Data table row {}, column {}: '{}' is not a number",
                            row_idx, col, cell
                        ))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            values.push(row);
        }

        let table = Self {
            labels,
            units,
            values,
        };
        table.validate()?;
        Ok(table)
    }
}

fn split_unit(header: &str) -> (String, String) {
    let header = header.trim();
    if let (Some(open), true) = (header.rfind('('), header.ends_with(')')) {
        let label = header[..open].trim().to_string();
        let unit = header[open + 1..header.len() - 1].trim().to_string();
        if !label.is_empty() {
            return (label, unit);
        }
    }
    (header.to_string(), String::new())
}

/// Detect the delimiter by analyzing the first few lines.
fn detect_delimiter(bytes: &[u8]) -> Result<u8> {
    let reader = BufReader::new(bytes);
    let lines: Vec<String> = reader
        .lines()
        .take(10)
        .filter_map(|l| l.ok())
        .filter(|l| !l.trim().is_empty())
        .collect();

    if lines.is_empty() {
        return Err(CatalogError::Validation("Data table is empty".to_string()));
    }

    let mut best_delimiter = b',';
    let mut best_score = 0;

    for &delim in DELIMITERS {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| line.trim().bytes().filter(|&b| b == delim).count())
            .collect();

        let first_count = counts[0];
        if first_count == 0 {
            continue;
        }

        // Consistent counts across lines win; tab gets a slight bonus.
        let consistent = counts.iter().all(|&c| c == first_count);
        let score = if consistent {
            first_count * 1000 + if delim == b'\t' { 100 } else { 0 }
        } else {
            first_count
        };

        if score > best_score {
            best_score = score;
            best_delimiter = delim;
        }
    }

    Ok(best_delimiter)
}
