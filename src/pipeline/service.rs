//! Prediction service: one pipeline per domain over a shared registry

use super::{FeaturePipeline, RawOutput};
use crate::config::PipelinesConfig;
use crate::error::PipelineError;
use crate::interpret::{decode_risk, interpret_anomaly, interpret_risk, interpret_segment};
use crate::metrics::GatewayMetrics;
use crate::registry::ArtifactRegistry;
use crate::types::{
    AnomalyInput, AnomalyPrediction, Domain, RiskInput, RiskLevel, RiskPrediction, SegmentLabel,
    SegmentPrediction, SegmentationInput,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Whether a domain endpoint can currently serve, and what blocks it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointStatus {
    pub domain: Domain,
    pub available: bool,
    pub missing: Vec<String>,
}

pub struct PredictionService {
    registry: Arc<ArtifactRegistry>,
    risk: FeaturePipeline,
    anomaly: FeaturePipeline,
    segmentation: FeaturePipeline,
    metrics: Arc<GatewayMetrics>,
}

impl PredictionService {
    pub fn new(
        registry: Arc<ArtifactRegistry>,
        pipelines: &PipelinesConfig,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            registry,
            risk: FeaturePipeline::new(Domain::Risk, pipelines.risk.clone()),
            anomaly: FeaturePipeline::new(Domain::Anomaly, pipelines.anomaly.clone()),
            segmentation: FeaturePipeline::new(Domain::Segmentation, pipelines.segmentation.clone()),
            metrics,
        }
    }

    /// Service wired to the default registry keys.
    pub fn with_default_keys(registry: Arc<ArtifactRegistry>, metrics: Arc<GatewayMetrics>) -> Self {
        Self::new(registry, &PipelinesConfig::default(), metrics)
    }

    pub fn registry(&self) -> &ArtifactRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &Arc<GatewayMetrics> {
        &self.metrics
    }

    pub fn pipeline(&self, domain: Domain) -> &FeaturePipeline {
        match domain {
            Domain::Risk => &self.risk,
            Domain::Anomaly => &self.anomaly,
            Domain::Segmentation => &self.segmentation,
        }
    }

    /// Availability of each domain endpoint given what loaded at startup.
    pub fn endpoint_status(&self) -> Vec<EndpointStatus> {
        Domain::ALL
            .iter()
            .map(|&domain| {
                let missing: Vec<String> = self
                    .pipeline(domain)
                    .required_keys()
                    .into_iter()
                    .filter(|key| !self.registry.is_available(key))
                    .map(str::to_string)
                    .collect();
                EndpointStatus {
                    domain,
                    available: missing.is_empty(),
                    missing,
                }
            })
            .collect()
    }

    pub fn predict_risk(&self, input: &RiskInput) -> Result<RiskPrediction, PipelineError> {
        self.observe(Domain::Risk, || {
            let pipeline = &self.risk;
            let code = match pipeline.run(&self.registry, input)? {
                RawOutput::Class(code) => code,
                other => return Err(pipeline.unexpected(other)),
            };

            // run() already checked the decoder key when one is configured
            let prediction = match pipeline.keys().decoder.as_deref() {
                Some(key) => decode_risk(self.registry.label_decoder(key)?.as_ref(), key, code)?,
                None => interpret_risk(code.to_string()),
            };
            if prediction.risk_level == RiskLevel::Unknown {
                self.metrics.record_unrecognized();
            }
            Ok(prediction)
        })
    }

    pub fn predict_anomaly(&self, input: &AnomalyInput) -> Result<AnomalyPrediction, PipelineError> {
        self.observe(Domain::Anomaly, || {
            let pipeline = &self.anomaly;
            let score = match pipeline.run(&self.registry, input)? {
                RawOutput::Score(score) => score,
                other => return Err(pipeline.unexpected(other)),
            };

            let prediction = interpret_anomaly(score);
            if prediction.is_flagged {
                debug!(score, "Transaction flagged for review");
                self.metrics.record_flagged();
            }
            Ok(prediction)
        })
    }

    pub fn predict_segment(
        &self,
        input: &SegmentationInput,
    ) -> Result<SegmentPrediction, PipelineError> {
        self.observe(Domain::Segmentation, || {
            let pipeline = &self.segmentation;
            let cluster = match pipeline.run(&self.registry, input)? {
                RawOutput::Cluster(cluster) => cluster,
                other => return Err(pipeline.unexpected(other)),
            };

            let prediction = interpret_segment(cluster);
            if prediction.segment_label == SegmentLabel::Unknown {
                self.metrics.record_unrecognized();
            }
            Ok(prediction)
        })
    }

    /// Time a prediction and record its outcome.
    fn observe<T>(
        &self,
        domain: Domain,
        predict: impl FnOnce() -> Result<T, PipelineError>,
    ) -> Result<T, PipelineError> {
        let start = Instant::now();
        let result = predict();

        match &result {
            Ok(_) => self.metrics.record_success(domain, start.elapsed()),
            Err(e) => {
                let class = e.class();
                warn!(
                    domain = %domain,
                    class = class.as_str(),
                    error = %e,
                    "Prediction failed"
                );
                self.metrics.record_failure(domain, class);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{
        DecisionTreeModel, FeatureScaler, IsolationForestModel, IsolationTree, KMeansModel,
        LabelEncoderModel, ModelArtifact, TreeStructure,
    };
    use crate::error::{FailureClass, RegistryError};
    use crate::registry::ArtifactKind;
    use crate::types::AlertMessage;

    fn identity(width: usize) -> ModelArtifact {
        ModelArtifact::Scaler(Arc::new(FeatureScaler::Standard {
            mean: vec![0.0; width],
            scale: vec![1.0; width],
        }))
    }

    /// Stump on loan_amount: <= 20000 is class 0, otherwise class 2.
    fn risk_tree() -> ModelArtifact {
        ModelArtifact::Classifier(Arc::new(DecisionTreeModel {
            tree: TreeStructure {
                children_left: vec![1, -1, -1],
                children_right: vec![2, -1, -1],
                feature: vec![0, -2, -2],
                threshold: vec![20000.0, -2.0, -2.0],
                n_node_samples: vec![],
            },
            value: vec![vec![1.0, 1.0], vec![1.0, 0.0], vec![0.0, 1.0]],
            classes: vec![0, 2],
            n_features: Some(4),
        }))
    }

    fn encoder() -> ModelArtifact {
        ModelArtifact::LabelDecoder(Arc::new(LabelEncoderModel {
            classes: vec!["Approved".into(), "Closed".into(), "Rejected".into()],
        }))
    }

    fn service(registry: ArtifactRegistry) -> PredictionService {
        PredictionService::with_default_keys(Arc::new(registry), Arc::new(GatewayMetrics::new()))
    }

    fn risk_input(loan_amount: f64) -> RiskInput {
        RiskInput {
            loan_amount,
            interest_rate: 5.5,
            loan_term: 36,
            age: 35,
        }
    }

    #[test]
    fn test_predict_risk() {
        let service = service(
            ArtifactRegistry::builder()
                .artifact("scaler_risk", identity(4))
                .artifact("dt_model", risk_tree())
                .artifact("le_risk", encoder())
                .build(),
        );

        let low = service.predict_risk(&risk_input(10000.0)).unwrap();
        assert_eq!(low.predicted_status, "Approved");
        assert_eq!(low.risk_level, RiskLevel::Low);

        let high = service.predict_risk(&risk_input(50000.0)).unwrap();
        assert_eq!(high.predicted_status, "Rejected");
        assert_eq!(high.risk_level, RiskLevel::High);

        assert_eq!(service.metrics().snapshot().domains[0].successes, 2);
    }

    #[test]
    fn test_missing_decoder_fails_only_risk() {
        let service = service(
            ArtifactRegistry::builder()
                .artifact("scaler_risk", identity(4))
                .artifact("dt_model", risk_tree())
                .failed("le_risk", ArtifactKind::LabelDecoder, "file not found")
                .artifact("scaler_rfm", identity(3))
                .artifact(
                    "kmeans_model",
                    ModelArtifact::Clusterer(Arc::new(KMeansModel {
                        cluster_centers: vec![vec![0.0, 0.0, 0.0], vec![100.0, 100.0, 100.0]],
                    })),
                )
                .build(),
        );

        assert_eq!(
            service.predict_risk(&risk_input(10000.0)),
            Err(PipelineError::Registry(RegistryError::ArtifactUnavailable {
                name: "le_risk".to_string()
            }))
        );

        let segment = service
            .predict_segment(&SegmentationInput {
                recency: 90,
                frequency: 95,
                monetary: 99.0,
            })
            .unwrap();
        assert_eq!(segment.cluster_id, 1);
        assert_eq!(segment.segment_label, SegmentLabel::LowValueNew);

        let snapshot = service.metrics().snapshot();
        assert_eq!(snapshot.domains[0].failures, 1);
        assert_eq!(snapshot.failures_by_class.get(FailureClass::Configuration.as_str()), Some(&1));

        let status = service.endpoint_status();
        assert!(!status[0].available);
        assert_eq!(status[0].missing, vec!["le_risk".to_string()]);
        assert!(!status[1].available);
        assert!(status[2].available);
    }

    #[test]
    fn test_unknown_segment_is_counted() {
        let centers = (0..6).map(|i| vec![i as f64 * 10.0; 3]).collect();
        let service = service(
            ArtifactRegistry::builder()
                .artifact("scaler_rfm", identity(3))
                .artifact(
                    "kmeans_model",
                    ModelArtifact::Clusterer(Arc::new(KMeansModel {
                        cluster_centers: centers,
                    })),
                )
                .build(),
        );

        let segment = service
            .predict_segment(&SegmentationInput {
                recency: 50,
                frequency: 50,
                monetary: 50.0,
            })
            .unwrap();
        assert_eq!(segment.cluster_id, 5);
        assert_eq!(segment.segment_label, SegmentLabel::Unknown);
        assert_eq!(service.metrics().snapshot().unrecognized_outputs, 1);
    }

    #[test]
    fn test_anomaly_on_single_leaf_forest() {
        // A lone root leaf over 2 samples gives E[h] = c(2) = 1.
        let forest = IsolationForestModel {
            estimators: vec![IsolationTree {
                tree: TreeStructure {
                    children_left: vec![-1],
                    children_right: vec![-1],
                    feature: vec![-2],
                    threshold: vec![-2.0],
                    n_node_samples: vec![2],
                },
                features: None,
            }],
            max_samples: 256,
            offset: -1.0,
            n_features: Some(4),
        };
        let service = service(
            ArtifactRegistry::builder()
                .artifact("scaler_anomaly", identity(4))
                .artifact("iso_model", ModelArtifact::AnomalyDetector(Arc::new(forest)))
                .build(),
        );

        let prediction = service
            .predict_anomaly(&AnomalyInput {
                transaction_amount: 120.0,
                account_balance_after_transaction: 5000.0,
                credit_card_balance: 300.0,
                rewards_points: 1200.0,
            })
            .unwrap();
        // -2^(-1/c(256)) + 1.0 is roughly 0.065
        assert!(!prediction.is_flagged);
        assert_eq!(prediction.alert_message, AlertMessage::NormalTransaction);
        assert_eq!(prediction.anomaly_score, 0.0654);
    }
}
