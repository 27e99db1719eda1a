//! Result interpreters: raw model outputs to business verdicts
//!
//! The lookup tables are fixed at training time. Cluster ids in particular
//! carry no meaning of their own; the segment names were curated for the
//! clustering run that produced the deployed model and must change with it.

use crate::artifacts::LabelDecoder;
use crate::error::PipelineError;
use crate::types::{
    AlertMessage, AnomalyPrediction, RiskLevel, RiskPrediction, SegmentLabel, SegmentPrediction,
};
use tracing::warn;

/// Decision scores strictly below this are flagged.
pub const ANOMALY_THRESHOLD: f64 = 0.05;

/// Decimals kept on the reported anomaly score.
pub const SCORE_DECIMALS: i32 = 4;

const RISK_TIERS: [(&str, RiskLevel); 3] = [
    ("Approved", RiskLevel::Low),
    ("Closed", RiskLevel::Medium),
    ("Rejected", RiskLevel::High),
];

/// Indexed by cluster id.
const SEGMENTS: [SegmentLabel; 3] = [
    SegmentLabel::MidValueLoyal,
    SegmentLabel::LowValueNew,
    SegmentLabel::HighValueFrequent,
];

pub fn risk_level_for(label: &str) -> RiskLevel {
    RISK_TIERS
        .iter()
        .find(|(status, _)| *status == label)
        .map(|(_, level)| *level)
        .unwrap_or(RiskLevel::Unknown)
}

/// Map a decoded loan status to its risk tier.
pub fn interpret_risk(predicted_status: String) -> RiskPrediction {
    let risk_level = risk_level_for(&predicted_status);
    if risk_level == RiskLevel::Unknown {
        warn!(
            predicted_status = %predicted_status,
            "Classifier emitted a status with no risk tier"
        );
    }
    RiskPrediction {
        predicted_status,
        risk_level,
    }
}

/// Decode an encoded class with the domain decoder, then map it to a tier.
pub fn decode_risk(
    decoder: &dyn LabelDecoder,
    decoder_key: &str,
    encoded: i64,
) -> Result<RiskPrediction, PipelineError> {
    let label = decoder
        .inverse_transform(encoded)
        .map_err(|e| PipelineError::from_artifact(decoder_key, e))?;
    Ok(interpret_risk(label))
}

/// Flag and round an anomaly score. The flag is decided on the unrounded
/// score so the displayed value never contradicts the decision.
pub fn interpret_anomaly(raw_score: f64) -> AnomalyPrediction {
    let is_flagged = raw_score < ANOMALY_THRESHOLD;
    AnomalyPrediction {
        anomaly_score: round_to(raw_score, SCORE_DECIMALS),
        is_flagged,
        alert_message: if is_flagged {
            AlertMessage::FlaggedForReview
        } else {
            AlertMessage::NormalTransaction
        },
    }
}

pub fn interpret_segment(cluster_id: usize) -> SegmentPrediction {
    let segment_label = SEGMENTS
        .get(cluster_id)
        .copied()
        .unwrap_or(SegmentLabel::Unknown);
    if segment_label == SegmentLabel::Unknown {
        warn!(cluster_id, "Clusterer emitted an id with no curated segment");
    }
    SegmentPrediction {
        cluster_id,
        segment_label,
    }
}

/// Round half away from zero, not half to even.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
