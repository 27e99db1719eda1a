//! Prediction domains served by the gateway

use serde::{Deserialize, Serialize};
use std::fmt;

/// One served model family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Risk,
    Anomaly,
    Segmentation,
}

impl Domain {
    pub const ALL: [Domain; 3] = [Domain::Risk, Domain::Anomaly, Domain::Segmentation];

    /// Lowercase identifier used in logs, metrics and config keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Risk => "risk",
            Domain::Anomaly => "anomaly",
            Domain::Segmentation => "segmentation",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Domain::Risk => 0,
            Domain::Anomaly => 1,
            Domain::Segmentation => 2,
        }
    }

    /// Capitalised name used in client-facing failure messages.
    pub fn title(&self) -> &'static str {
        match self {
            Domain::Risk => "Risk",
            Domain::Anomaly => "Anomaly",
            Domain::Segmentation => "Segmentation",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
