//! CSV-backed tabular dataset used by the batch preprocessing path

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Errors raised while reading or writing datasets
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset at {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to write dataset to {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// A single cell value: numeric where the CSV cell parses as a number,
/// free text otherwise (e.g. employment-length categories)
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<f64>() {
            Ok(n) => Value::Number(n),
            Err(_) => Value::Text(raw.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

/// In-memory table: ordered column names plus rows of cells.
///
/// All rows share the column set declared by the CSV header. Transform
/// steps mutate the table in place by appending derived columns.
#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Build a dataset directly from columns and rows (used by tests and embedders)
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Read a dataset from a CSV file.
    ///
    /// Fails on unreadable paths and on malformed CSV (including ragged rows).
    /// Logs the resolved column names for diagnostics.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let read_err = |source| DatasetError::Read {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = csv::Reader::from_path(path).map_err(read_err)?;
        let columns: Vec<String> = reader
            .headers()
            .map_err(read_err)?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(read_err)?;
            rows.push(record.iter().map(Value::parse).collect());
        }

        info!(path = %path.display(), columns = ?columns, "Columns in dataset");

        Ok(Self { columns, rows })
    }

    /// Write the dataset next to `data_path` with a `_processed` suffix
    /// inserted before the extension. Overwrites silently if the target
    /// exists. Returns the path written.
    pub fn save<P: AsRef<Path>>(&self, data_path: P) -> Result<PathBuf, DatasetError> {
        let target = processed_path(data_path.as_ref());
        let write_err = |source| DatasetError::Write {
            path: target.clone(),
            source,
        };

        let mut writer = csv::Writer::from_path(&target).map_err(write_err)?;
        writer.write_record(&self.columns).map_err(write_err)?;
        for row in &self.rows {
            writer
                .write_record(row.iter().map(|v| v.to_string()))
                .map_err(write_err)?;
        }
        writer.flush().map_err(|e| write_err(e.into()))?;

        Ok(target)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Append a derived column; `values` must hold one cell per row.
    pub fn add_column(&mut self, name: &str, values: Vec<Value>) {
        debug_assert_eq!(values.len(), self.rows.len());
        self.columns.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
    }
}

/// Derive the output filename: `patients.csv` becomes `patients_processed.csv`
pub fn processed_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("dataset");
    let name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}_processed.{ext}"),
        None => format!("{stem}_processed"),
    };
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_processed_path() {
        assert_eq!(
            processed_path(Path::new("data/patients.csv")),
            Path::new("data/patients_processed.csv")
        );
        assert_eq!(
            processed_path(Path::new("patients")),
            Path::new("patients_processed")
        );
    }

    #[test]
    fn test_value_parsing() {
        assert_eq!(Value::parse("42"), Value::Number(42.0));
        assert_eq!(Value::parse("25.5"), Value::Number(25.5));
        assert_eq!(Value::parse("< 1 year"), Value::Text("< 1 year".to_string()));
        assert_eq!(Value::parse("3 years").as_f64(), None);
    }

    #[test]
    fn test_add_column() {
        let mut df = Dataset::from_rows(
            vec!["Glucose".to_string()],
            vec![vec![Value::Number(100.0)], vec![Value::Number(140.0)]],
        );
        df.add_column("log_Glucose", vec![Value::Number(0.0), Value::Number(0.0)]);

        assert_eq!(df.columns(), &["Glucose", "log_Glucose"]);
        assert!(df.has_column("log_Glucose"));
        assert_eq!(df.rows()[0].len(), 2);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = Dataset::load("no/such/file.csv").unwrap_err();
        assert!(matches!(err, DatasetError::Read { .. }));
    }
}
