//! Data pre-processing procedures: log transform and categorical re-bucketing
//!
//! These match the preprocessing applied during model training, so the
//! inference path must stay in lockstep with the batch path here.

use crate::dataset::{Dataset, Value};
use std::fmt;
use tracing::warn;

/// The numeric columns that receive the log transform, in training order.
pub const LOG_COLUMNS: [&str; 6] = [
    "Glucose",
    "BloodPressure",
    "SkinThickness",
    "Insulin",
    "BMI",
    "Age",
];

/// `ln(x + 1)`, the transform applied to compress right-skewed columns.
///
/// The `+ 1` guards against `ln(0)`. Inputs must satisfy `x > -1`; this is
/// not validated and out-of-domain values produce NaN.
pub fn log1p(x: f64) -> f64 {
    (x + 1.0).ln()
}

/// Add a `log_<col>` column holding `ln(value + 1)` for each requested
/// column present in the dataset.
///
/// Requested columns absent from the dataset are skipped with a warning;
/// no column is added and no error is raised. Non-numeric cells in a
/// transformed column yield NaN.
pub fn log_transform(df: &mut Dataset, cols: &[&str]) {
    for col in cols {
        match df.column_index(col) {
            Some(idx) => {
                let transformed: Vec<Value> = df
                    .rows()
                    .iter()
                    .map(|row| match row[idx].as_f64() {
                        Some(v) => Value::Number(log1p(v)),
                        None => Value::Number(f64::NAN),
                    })
                    .collect();
                df.add_column(&format!("log_{col}"), transformed);
            }
            None => {
                warn!(column = %col, "Column not found in the dataset, skipping log transform");
            }
        }
    }
}

/// Ordered employment-length buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EmploymentBucket {
    LessThan3Yr,
    ThreeTo5Yr,
    SixTo9Yr,
    MoreThan9Yr,
}

impl EmploymentBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmploymentBucket::LessThan3Yr => "less_than_3yr",
            EmploymentBucket::ThreeTo5Yr => "3_to_5yr",
            EmploymentBucket::SixTo9Yr => "6_to_9yr",
            EmploymentBucket::MoreThan9Yr => "more_than_9yr",
        }
    }
}

impl fmt::Display for EmploymentBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Re-categorize a free-text employment-duration value into one of four
/// ordered buckets.
///
/// Total over all inputs: anything not matched by the first three rules
/// lands in `more_than_9yr`, including unknown or malformed values.
pub fn bucket_employment_length(value: &str) -> EmploymentBucket {
    match value {
        "< 1 year" | "1 year" | "2 years" => EmploymentBucket::LessThan3Yr,
        "3 years" | "4 years" | "5 years" => EmploymentBucket::ThreeTo5Yr,
        "6 years" | "7 years" | "8 years" | "9 years" => EmploymentBucket::SixTo9Yr,
        _ => EmploymentBucket::MoreThan9Yr,
    }
}

/// Orchestrate pre-processing for diabetes-related features.
///
/// Applies the log transform over the fixed column list. Scaling and
/// normalization are not applied here; models were trained on unscaled
/// log features.
pub fn preprocess(df: &mut Dataset) {
    log_transform(df, &LOG_COLUMNS);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Dataset, Value};

    fn glucose_dataset() -> Dataset {
        Dataset::from_rows(
            vec!["Glucose".to_string()],
            vec![
                vec![Value::Number(0.0)],
                vec![Value::Number(100.0)],
                vec![Value::Number(199.0)],
            ],
        )
    }

    #[test]
    fn test_log_transform_values() {
        let mut df = glucose_dataset();
        log_transform(&mut df, &["Glucose"]);

        let idx = df.column_index("log_Glucose").unwrap();
        let expected = [0.0_f64, 101.0_f64.ln(), 200.0_f64.ln()];
        for (row, want) in df.rows().iter().zip(expected) {
            assert_eq!(row[idx].as_f64().unwrap(), want);
        }
    }

    #[test]
    fn test_log_transform_missing_column_is_skipped() {
        let mut df = glucose_dataset();
        log_transform(&mut df, &["Insulin"]);

        assert!(!df.has_column("log_Insulin"));
        assert_eq!(df.columns().len(), 1);
    }

    #[test]
    fn test_log_transform_non_numeric_yields_nan() {
        let mut df = Dataset::from_rows(
            vec!["Glucose".to_string()],
            vec![vec![Value::Text("n/a".to_string())]],
        );
        log_transform(&mut df, &["Glucose"]);

        let idx = df.column_index("log_Glucose").unwrap();
        assert!(df.rows()[0][idx].as_f64().unwrap().is_nan());
    }

    #[test]
    fn test_bucket_less_than_3yr_members() {
        for v in ["< 1 year", "1 year", "2 years"] {
            assert_eq!(bucket_employment_length(v), EmploymentBucket::LessThan3Yr);
        }
    }

    #[test]
    fn test_bucket_is_total() {
        let cases = [
            ("3 years", EmploymentBucket::ThreeTo5Yr),
            ("5 years", EmploymentBucket::ThreeTo5Yr),
            ("6 years", EmploymentBucket::SixTo9Yr),
            ("9 years", EmploymentBucket::SixTo9Yr),
            ("10+ years", EmploymentBucket::MoreThan9Yr),
            ("", EmploymentBucket::MoreThan9Yr),
            ("garbage", EmploymentBucket::MoreThan9Yr),
        ];
        for (input, want) in cases {
            assert_eq!(bucket_employment_length(input), want);
        }
    }

    #[test]
    fn test_bucket_labels() {
        assert_eq!(EmploymentBucket::LessThan3Yr.as_str(), "less_than_3yr");
        assert_eq!(EmploymentBucket::MoreThan9Yr.to_string(), "more_than_9yr");
    }

    #[test]
    fn test_preprocess_adds_all_present_log_columns() {
        let columns: Vec<String> = ["Pregnancies", "Glucose", "BMI"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut df = Dataset::from_rows(
            columns,
            vec![vec![
                Value::Number(0.0),
                Value::Number(100.0),
                Value::Number(25.0),
            ]],
        );
        preprocess(&mut df);

        assert!(df.has_column("log_Glucose"));
        assert!(df.has_column("log_BMI"));
        assert!(!df.has_column("log_Insulin"));
        assert!(!df.has_column("log_Pregnancies"));
    }
}
