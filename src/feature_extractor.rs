//! Feature extraction for model inference.
//!
//! Builds the numeric row handed to a scaler. The column order is the one
//! the artifact was fitted with, taken from the feature schema registered
//! alongside it; the order fields arrive in on the wire never matters.

use crate::error::PipelineError;
use crate::registry::FeatureSchema;
use crate::types::DomainInput;

/// Feature extractor bound to one artifact's feature order.
#[derive(Debug, Clone)]
pub struct FeatureExtractor<'a> {
    /// Registry key the order belongs to, for error reporting
    artifact: &'a str,
    order: Vec<&'a str>,
}

impl<'a> FeatureExtractor<'a> {
    /// Use the order declared in a registered schema.
    pub fn from_schema(artifact: &'a str, schema: &'a FeatureSchema) -> Self {
        Self {
            artifact,
            order: schema.features.iter().map(String::as_str).collect(),
        }
    }

    /// Fall back to the record's own declaration order.
    pub fn declared<I: DomainInput>(artifact: &'a str) -> Self {
        Self {
            artifact,
            order: I::FIELDS.to_vec(),
        }
    }

    /// Extract the feature row from an input record.
    ///
    /// A schema feature the record cannot supply means the artifact and the
    /// gateway disagree on the input contract; that is a configuration
    /// fault, not a client error.
    pub fn extract<I: DomainInput>(&self, input: &I) -> Result<Vec<f64>, PipelineError> {
        self.order
            .iter()
            .map(|&name| {
                input.feature(name).ok_or_else(|| PipelineError::MissingFeature {
                    artifact: self.artifact.to_string(),
                    feature: name.to_string(),
                    domain: I::DOMAIN,
                })
            })
            .collect()
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        self.order.len()
    }

    /// Get feature names in extraction order.
    pub fn feature_names(&self) -> &[&'a str] {
        &self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Domain, RiskInput, SegmentationInput};

    fn risk() -> RiskInput {
        RiskInput {
            loan_amount: 10000.0,
            interest_rate: 5.5,
            loan_term: 36,
            age: 35,
        }
    }

    #[test]
    fn test_declared_order() {
        let extractor = FeatureExtractor::declared::<RiskInput>("scaler_risk");
        assert_eq!(extractor.feature_count(), 4);
        assert_eq!(
            extractor.extract(&risk()).unwrap(),
            vec![10000.0, 5.5, 36.0, 35.0]
        );
    }

    #[test]
    fn test_schema_order_wins() {
        let schema = FeatureSchema::new("v2", ["age", "loan_term", "interest_rate", "loan_amount"]);
        let extractor = FeatureExtractor::from_schema("scaler_risk", &schema);
        assert_eq!(extractor.feature_names(), ["age", "loan_term", "interest_rate", "loan_amount"]);
        assert_eq!(
            extractor.extract(&risk()).unwrap(),
            vec![35.0, 36.0, 5.5, 10000.0]
        );
    }

    #[test]
    fn test_unknown_schema_feature_is_configuration_drift() {
        let schema = FeatureSchema::new("v3", ["recency", "frequency", "monetary", "tenure"]);
        let extractor = FeatureExtractor::from_schema("scaler_rfm", &schema);
        let input = SegmentationInput {
            recency: 10,
            frequency: 4,
            monetary: 250.0,
        };

        assert_eq!(
            extractor.extract(&input),
            Err(PipelineError::MissingFeature {
                artifact: "scaler_rfm".to_string(),
                feature: "tenure".to_string(),
                domain: Domain::Segmentation,
            })
        );
    }
}
