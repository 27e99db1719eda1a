//! Business-facing prediction payloads

use serde::{Deserialize, Serialize};

/// Three-tier loan risk, plus the sentinel for unmapped classifier labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "Low Risk")]
    Low,
    #[serde(rename = "Medium Risk")]
    Medium,
    #[serde(rename = "High Risk")]
    High,
    #[serde(rename = "Unknown Risk")]
    Unknown,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low Risk",
            RiskLevel::Medium => "Medium Risk",
            RiskLevel::High => "High Risk",
            RiskLevel::Unknown => "Unknown Risk",
        }
    }
}

/// Alert text attached to an anomaly verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertMessage {
    #[serde(rename = "Flagged for Review")]
    FlaggedForReview,
    #[serde(rename = "Normal Transaction")]
    NormalTransaction,
}

/// Customer segment curated for each cluster of the RFM clustering run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SegmentLabel {
    #[serde(rename = "Mid-Value/Loyal")]
    MidValueLoyal,
    #[serde(rename = "Low-Value/New")]
    LowValueNew,
    #[serde(rename = "High-Value/Frequent")]
    HighValueFrequent,
    #[serde(rename = "Unknown Segment")]
    Unknown,
}

impl SegmentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentLabel::MidValueLoyal => "Mid-Value/Loyal",
            SegmentLabel::LowValueNew => "Low-Value/New",
            SegmentLabel::HighValueFrequent => "High-Value/Frequent",
            SegmentLabel::Unknown => "Unknown Segment",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPrediction {
    /// Loan status decoded from the classifier output
    pub predicted_status: String,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyPrediction {
    /// Decision score rounded to four decimals
    pub anomaly_score: f64,
    pub is_flagged: bool,
    pub alert_message: AlertMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentPrediction {
    pub cluster_id: usize,
    pub segment_label: SegmentLabel,
}

/// Success envelope: the interpreter payload plus `status: "success"`.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResponse<T> {
    pub status: &'static str,
    #[serde(flatten)]
    pub prediction: T,
}

impl<T> PredictionResponse<T> {
    pub fn success(prediction: T) -> Self {
        Self {
            status: "success",
            prediction,
        }
    }
}
