//! Typed request records for each prediction domain

use super::Domain;
use serde::de::{self, Deserializer, Unexpected, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A fixed set of named numeric fields feeding one domain pipeline.
///
/// `FIELDS` is the record's own declaration order. The order actually used
/// for inference comes from the feature schema registered with the scaler;
/// `FIELDS` is only the fallback when no schema was declared.
pub trait DomainInput {
    const DOMAIN: Domain;
    const FIELDS: &'static [&'static str];

    /// Numeric value of a named field, `None` if the record has no such field.
    fn feature(&self, name: &str) -> Option<f64>;
}

/// Loan applicant submitted for risk classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskInput {
    pub loan_amount: f64,
    pub interest_rate: f64,
    /// Loan term in months
    #[serde(deserialize_with = "whole_number")]
    pub loan_term: i64,
    #[serde(deserialize_with = "whole_number")]
    pub age: i64,
}

impl DomainInput for RiskInput {
    const DOMAIN: Domain = Domain::Risk;
    const FIELDS: &'static [&'static str] = &["loan_amount", "interest_rate", "loan_term", "age"];

    fn feature(&self, name: &str) -> Option<f64> {
        match name {
            "loan_amount" => Some(self.loan_amount),
            "interest_rate" => Some(self.interest_rate),
            "loan_term" => Some(self.loan_term as f64),
            "age" => Some(self.age as f64),
            _ => None,
        }
    }
}

/// Card transaction submitted for anomaly scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyInput {
    pub transaction_amount: f64,
    pub account_balance_after_transaction: f64,
    pub credit_card_balance: f64,
    pub rewards_points: f64,
}

impl DomainInput for AnomalyInput {
    const DOMAIN: Domain = Domain::Anomaly;
    const FIELDS: &'static [&'static str] = &[
        "transaction_amount",
        "account_balance_after_transaction",
        "credit_card_balance",
        "rewards_points",
    ];

    fn feature(&self, name: &str) -> Option<f64> {
        match name {
            "transaction_amount" => Some(self.transaction_amount),
            "account_balance_after_transaction" => Some(self.account_balance_after_transaction),
            "credit_card_balance" => Some(self.credit_card_balance),
            "rewards_points" => Some(self.rewards_points),
            _ => None,
        }
    }
}

/// Customer RFM metrics submitted for segmentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationInput {
    /// Days since last activity
    #[serde(deserialize_with = "whole_number")]
    pub recency: i64,
    #[serde(deserialize_with = "whole_number")]
    pub frequency: i64,
    pub monetary: f64,
}

impl DomainInput for SegmentationInput {
    const DOMAIN: Domain = Domain::Segmentation;
    const FIELDS: &'static [&'static str] = &["recency", "frequency", "monetary"];

    fn feature(&self, name: &str) -> Option<f64> {
        match name {
            "recency" => Some(self.recency as f64),
            "frequency" => Some(self.frequency as f64),
            "monetary" => Some(self.monetary),
            _ => None,
        }
    }
}

/// Integer field that also takes integral floats such as `36.0`.
fn whole_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    struct WholeNumber;

    impl<'de> Visitor<'de> for WholeNumber {
        type Value = i64;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a whole number")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
            i64::try_from(v).map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<i64, E> {
            // 2^63 is exact in f64; the upper bound is exclusive
            if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
                Ok(v as i64)
            } else {
                Err(E::invalid_value(Unexpected::Float(v), &self))
            }
        }
    }

    deserializer.deserialize_any(WholeNumber)
}
