//! Customer and loan dataset snapshot behind the reporting endpoints

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use thiserror::Error;

pub const SEGMENT_COLUMN: &str = "Segment_Label";

/// Columns of the loan risk table, in output order.
const LOAN_RISK_COLUMNS: [&str; 8] = [
    "Customer ID",
    "First Name",
    "Last Name",
    "Loan Amount",
    "Interest Rate",
    "Loan Status",
    "Loan Term",
    "Age",
];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DatasetError {
    #[error("column '{0}' not found in customer data")]
    MissingColumn(String),
}

/// Share of customers in one segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentShare {
    pub segment: String,
    pub count: u64,
    /// Percentage of labelled customers, two decimals
    pub percentage: f64,
}

/// One row of the loan risk table; the loan status is reported as the
/// risk prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanRiskRow {
    #[serde(rename = "Customer ID")]
    pub customer_id: Value,
    #[serde(rename = "First Name")]
    pub first_name: Value,
    #[serde(rename = "Last Name")]
    pub last_name: Value,
    #[serde(rename = "Loan Amount")]
    pub loan_amount: Value,
    #[serde(rename = "Interest Rate")]
    pub interest_rate: Value,
    #[serde(rename = "Risk Prediction")]
    pub risk_prediction: Value,
    #[serde(rename = "Loan Term")]
    pub loan_term: Value,
    #[serde(rename = "Age")]
    pub age: Value,
}

/// Immutable in-memory copy of the cleaned banking CSV.
#[derive(Debug, Clone)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<csv::StringRecord>,
}

impl Dataset {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        Self::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to read dataset {}", path.display()))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let headers = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let rows = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .context("malformed dataset row")?;
        Ok(Self { headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Customer counts per segment label, largest first; `None` when the
    /// snapshot was produced before segmentation ran.
    pub fn segment_summary(&self) -> Option<Vec<SegmentShare>> {
        let column = self.column(SEGMENT_COLUMN)?;

        let mut order: Vec<&str> = Vec::new();
        let mut counts: HashMap<&str, u64> = HashMap::new();
        for row in &self.rows {
            let label = row.get(column).map(str::trim).unwrap_or_default();
            if label.is_empty() {
                continue;
            }
            let count = counts.entry(label).or_insert(0);
            if *count == 0 {
                order.push(label);
            }
            *count += 1;
        }

        let total: u64 = counts.values().sum();
        let mut summary: Vec<SegmentShare> = order
            .into_iter()
            .map(|label| {
                let count = counts[label];
                SegmentShare {
                    segment: label.to_string(),
                    count,
                    percentage: round2(count as f64 / total as f64 * 100.0),
                }
            })
            .collect();
        // Stable sort keeps first-seen order among equal counts.
        summary.sort_by(|a, b| b.count.cmp(&a.count));
        Some(summary)
    }

    /// First `limit` rows of the loan risk table.
    pub fn loan_risk_table(&self, limit: usize) -> Result<Vec<LoanRiskRow>, DatasetError> {
        let mut columns = [0usize; LOAN_RISK_COLUMNS.len()];
        for (slot, name) in columns.iter_mut().zip(LOAN_RISK_COLUMNS) {
            *slot = self
                .column(name)
                .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))?;
        }

        let rows = self
            .rows
            .iter()
            .take(limit)
            .map(|row| {
                let cell = |i: usize| parse_cell(row.get(columns[i]).unwrap_or_default());
                LoanRiskRow {
                    customer_id: cell(0),
                    first_name: cell(1),
                    last_name: cell(2),
                    loan_amount: cell(3),
                    interest_rate: cell(4),
                    risk_prediction: cell(5),
                    loan_term: cell(6),
                    age: cell(7),
                }
            })
            .collect();
        Ok(rows)
    }
}

/// Integer, float or string, the way the snapshot's column types read.
fn parse_cell(raw: &str) -> Value {
    let raw = raw.trim();
    if raw.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() => Value::from(f),
        _ => Value::from(raw),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SNAPSHOT: &str = "\
Customer ID,First Name,Last Name,Age,Loan Amount,Interest Rate,Loan Term,Loan Status,Segment_Label
1,Ada,Lovelace,36,12000.5,4.2,36,Approved,Mid-Value/Loyal
2,Alan,Turing,41,5000,7.9,60,Rejected,High-Value/Frequent
3,Grace,Hopper,29,800,3.1,12,Closed,Mid-Value/Loyal
4,Edsger,Dijkstra,52,2500,5.0,24,Approved,
";

    fn dataset() -> Dataset {
        Dataset::from_reader(SNAPSHOT.as_bytes()).unwrap()
    }

    #[test]
    fn test_segment_summary_counts_and_percentages() {
        let summary = dataset().segment_summary().unwrap();
        assert_eq!(
            summary,
            vec![
                SegmentShare {
                    segment: "Mid-Value/Loyal".to_string(),
                    count: 2,
                    percentage: 66.67
                },
                SegmentShare {
                    segment: "High-Value/Frequent".to_string(),
                    count: 1,
                    percentage: 33.33
                },
            ]
        );
    }

    #[test]
    fn test_segment_summary_without_column() {
        let dataset = Dataset::from_reader("Customer ID,Age\n1,30\n".as_bytes()).unwrap();
        assert!(dataset.segment_summary().is_none());
    }

    #[test]
    fn test_loan_risk_table_renames_and_types() {
        let rows = dataset().loan_risk_table(2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            serde_json::to_value(&rows[0]).unwrap(),
            json!({
                "Customer ID": 1,
                "First Name": "Ada",
                "Last Name": "Lovelace",
                "Loan Amount": 12000.5,
                "Interest Rate": 4.2,
                "Risk Prediction": "Approved",
                "Loan Term": 36,
                "Age": 36
            })
        );
    }

    #[test]
    fn test_loan_risk_table_requires_columns() {
        let dataset = Dataset::from_reader("Customer ID,Age\n1,30\n".as_bytes()).unwrap();
        assert_eq!(
            dataset.loan_risk_table(50),
            Err(DatasetError::MissingColumn("First Name".to_string()))
        );
    }
}
