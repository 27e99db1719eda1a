//! End-to-end tests of the HTTP surface over fake artifacts

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::*;
use prediction_gateway::registry::ArtifactKind;
use serde_json::json;

fn risk_body() -> serde_json::Value {
    json!({"loan_amount": 10000, "interest_rate": 5.5, "loan_term": 36, "age": 35})
}

fn anomaly_body() -> serde_json::Value {
    json!({
        "transaction_amount": 120.5,
        "account_balance_after_transaction": 5000.0,
        "credit_card_balance": 300.0,
        "rewards_points": 1200
    })
}

fn segment_body() -> serde_json::Value {
    json!({"recency": 10, "frequency": 4, "monetary": 250.0})
}

#[tokio::test]
async fn test_risk_scenario_approved_is_low_risk() {
    let app = app(fake_registry(0, 0.2, 0).build());

    let (status, body) = post_json(&app, "/predict/risk", risk_body()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"status": "success", "predicted_status": "Approved", "risk_level": "Low Risk"})
    );
}

#[tokio::test]
async fn test_risk_levels_follow_decoded_status() {
    let app = app(fake_registry(2, 0.2, 0).build());
    let (_, body) = post_json(&app, "/predict/risk", risk_body()).await;
    assert_eq!(body["predicted_status"], "Rejected");
    assert_eq!(body["risk_level"], "High Risk");

    let app = common::app(fake_registry(1, 0.2, 0).build());
    let (_, body) = post_json(&app, "/predict/risk", risk_body()).await;
    assert_eq!(body["risk_level"], "Medium Risk");
}

#[tokio::test]
async fn test_anomaly_threshold_scenarios() {
    let app = app(fake_registry(0, 0.0499, 0).build());
    let (status, body) = post_json(&app, "/predict/anomaly", anomaly_body()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "status": "success",
            "anomaly_score": 0.0499,
            "is_flagged": true,
            "alert_message": "Flagged for Review"
        })
    );

    let app = common::app(fake_registry(0, 0.05, 0).build());
    let (_, body) = post_json(&app, "/predict/anomaly", anomaly_body()).await;
    assert_eq!(body["is_flagged"], false);
    assert_eq!(body["alert_message"], "Normal Transaction");
}

#[tokio::test]
async fn test_flag_uses_unrounded_score() {
    // Rounds to 0.05 but sits below the threshold.
    let app = app(fake_registry(0, 0.049996, 0).build());
    let (_, body) = post_json(&app, "/predict/anomaly", anomaly_body()).await;
    assert_eq!(body["anomaly_score"], 0.05);
    assert_eq!(body["is_flagged"], true);
}

#[tokio::test]
async fn test_out_of_range_cluster_is_unknown_segment() {
    let app = app(fake_registry(0, 0.2, 5).build());
    let (status, body) = post_json(&app, "/predict/segment", segment_body()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"status": "success", "cluster_id": 5, "segment_label": "Unknown Segment"})
    );

    let (_, metrics) = get_json(&app, "/metrics").await;
    assert_eq!(metrics["unrecognized_outputs"], 1);
}

#[tokio::test]
async fn test_known_clusters_map_to_segments() {
    for (cluster, label) in [
        (0, "Mid-Value/Loyal"),
        (1, "Low-Value/New"),
        (2, "High-Value/Frequent"),
    ] {
        let app = app(fake_registry(0, 0.2, cluster).build());
        let (_, body) = post_json(&app, "/predict/segment", segment_body()).await;
        assert_eq!(body["cluster_id"], cluster);
        assert_eq!(body["segment_label"], label);
    }
}

#[tokio::test]
async fn test_validation_errors_are_422() {
    let app = app(fake_registry(0, 0.2, 0).build());

    let (status, body) = post_json(
        &app,
        "/predict/risk",
        json!({"loan_amount": 10000, "interest_rate": 5.5, "loan_term": 36}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("age"), "{body}");

    let (status, _) = post_json(
        &app,
        "/predict/risk",
        json!({"loan_amount": 10000, "interest_rate": 5.5, "loan_term": 36.5, "age": 35}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = post_json(
        &app,
        "/predict/segment",
        json!({"recency": "ten", "frequency": 4, "monetary": 250.0}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let malformed = Request::post("/predict/anomaly")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send(&app, malformed).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, metrics) = get_json(&app, "/metrics").await;
    assert_eq!(metrics["failures_by_class"]["validation"], 4);
}

#[tokio::test]
async fn test_integral_floats_fill_integer_fields() {
    let app = app(fake_registry(0, 0.2, 1).build());

    let (status, body) = post_json(
        &app,
        "/predict/risk",
        json!({"loan_amount": 10000, "interest_rate": 5.5, "loan_term": 36.0, "age": 35.0}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["predicted_status"], "Approved");

    let (status, _) = post_json(
        &app,
        "/predict/segment",
        json!({"recency": 10.0, "frequency": 4.0, "monetary": 250.0}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post_json(
        &app,
        "/predict/risk",
        json!({"loan_amount": 10000, "interest_rate": 5.5, "loan_term": 36.0, "age": 35.5}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("age"), "{body}");
}

#[tokio::test]
async fn test_parallel_requests_share_one_router() {
    let app = app(fake_registry(2, 0.0312, 1).build());

    let mut handles = Vec::new();
    for i in 0..48 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            let (uri, body) = match i % 3 {
                0 => ("/predict/risk", risk_body()),
                1 => ("/predict/anomaly", anomaly_body()),
                _ => ("/predict/segment", segment_body()),
            };
            let (status, body) = post_json(&app, uri, body).await;
            (i % 3, status, body)
        }));
    }

    let mut seen: [Option<serde_json::Value>; 3] = [None, None, None];
    for handle in handles {
        let (kind, status, body) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK, "{body}");
        match &seen[kind] {
            Some(first) => assert_eq!(first, &body),
            None => seen[kind] = Some(body),
        }
    }
    assert_eq!(seen[0].as_ref().unwrap()["risk_level"], "High Risk");
    assert_eq!(seen[1].as_ref().unwrap()["is_flagged"], true);
    assert_eq!(seen[2].as_ref().unwrap()["segment_label"], "Low-Value/New");

    let (_, metrics) = get_json(&app, "/metrics").await;
    for domain in 0..3 {
        assert_eq!(metrics["domains"][domain]["successes"], 16);
    }
}

#[tokio::test]
async fn test_missing_artifact_fails_only_its_endpoint() {
    let registry = fake_registry(0, 0.2, 1)
        .failed("kmeans_model", ArtifactKind::Clusterer, "file not found: models/kmeans_model.json")
        .build();
    let app = app(registry);

    let (status, body) = post_json(&app, "/predict/segment", segment_body()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({"detail": "Segmentation prediction failed: required artifact 'kmeans_model' is unavailable"})
    );

    let (status, _) = post_json(&app, "/predict/risk", risk_body()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post_json(&app, "/predict/anomaly", anomaly_body()).await;
    assert_eq!(status, StatusCode::OK);

    let (_, metrics) = get_json(&app, "/metrics").await;
    assert_eq!(metrics["failures_by_class"]["configuration"], 1);
}

#[tokio::test]
async fn test_scaler_width_drift_is_a_prediction_failure() {
    let registry = fake_registry(0, 0.2, 0)
        .artifact("scaler_anomaly", identity_scaler(3))
        .build();
    let app = app(registry);

    let (status, body) = post_json(&app, "/predict/anomaly", anomaly_body()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("Anomaly prediction failed: "), "{detail}");
    assert!(detail.contains("scaler_anomaly"), "{detail}");
}

#[tokio::test]
async fn test_identical_requests_get_identical_bytes() {
    let app = app(fake_registry(0, 0.123456, 2).build());

    for (uri, body) in [
        ("/predict/risk", risk_body()),
        ("/predict/anomaly", anomaly_body()),
        ("/predict/segment", segment_body()),
    ] {
        let request = || {
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap()
        };
        let (_, first) = send(&app, request()).await;
        let (_, second) = send(&app, request()).await;
        assert_eq!(first, second, "{uri}");
    }
}

#[tokio::test]
async fn test_health_reports_degraded_registry() {
    let healthy = app(fake_registry(0, 0.2, 0).build());
    let (status, body) = get_json(&healthy, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["artifacts"].as_array().unwrap().len(), 8);

    let degraded = app(
        fake_registry(0, 0.2, 0)
            .failed("le_risk", ArtifactKind::LabelDecoder, "failed to parse")
            .build(),
    );
    let (_, body) = get_json(&degraded, "/health").await;
    assert_eq!(body["status"], "degraded");

    let le_risk = body["artifacts"]
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["name"] == "le_risk")
        .unwrap();
    assert_eq!(le_risk["state"], "unavailable");
    assert_eq!(le_risk["reason"], "failed to parse");

    let endpoints = body["endpoints"].as_array().unwrap();
    assert_eq!(endpoints[0]["domain"], "risk");
    assert_eq!(endpoints[0]["available"], false);
    assert_eq!(endpoints[0]["missing"], json!(["le_risk"]));
    assert_eq!(endpoints[1]["available"], true);
}

#[tokio::test]
async fn test_metrics_count_requests_per_domain() {
    let app = app(fake_registry(0, 0.01, 0).build());
    post_json(&app, "/predict/anomaly", anomaly_body()).await;
    post_json(&app, "/predict/anomaly", anomaly_body()).await;
    post_json(&app, "/predict/risk", risk_body()).await;

    let (status, metrics) = get_json(&app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(metrics["domains"][0]["requests"], 1);
    assert_eq!(metrics["domains"][1]["domain"], "anomaly");
    assert_eq!(metrics["domains"][1]["successes"], 2);
    assert_eq!(metrics["flagged_anomalies"], 2);
}

#[tokio::test]
async fn test_segment_summary() {
    let app = app(fake_registry(0, 0.2, 0).build());
    let (status, body) = get_json(&app, "/data/segment_summary").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "status": "success",
            "data": [
                {"segment": "Mid-Value/Loyal", "count": 2, "percentage": 66.67},
                {"segment": "High-Value/Frequent", "count": 1, "percentage": 33.33}
            ]
        })
    );
}

#[tokio::test]
async fn test_segment_summary_without_labels() {
    let unlabelled = "Customer ID,First Name\n1,Ada\n";
    let app = app(
        fake_registry(0, 0.2, 0)
            .artifact("dim_customer", dataset(unlabelled))
            .build(),
    );
    let (status, body) = get_json(&app, "/data/segment_summary").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["error"],
        "Segment_Label column not found in customer data. Run Phase 2 code again."
    );
}

#[tokio::test]
async fn test_loan_risk_summary() {
    let app = app(fake_registry(0, 0.2, 0).build());
    let (status, body) = get_json(&app, "/data/loan_risk_summary").await;
    assert_eq!(status, StatusCode::OK);

    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(
        rows[1],
        json!({
            "Customer ID": 2,
            "First Name": "Alan",
            "Last Name": "Turing",
            "Loan Amount": 5000,
            "Interest Rate": 7.9,
            "Risk Prediction": "Rejected",
            "Loan Term": 60,
            "Age": 41
        })
    );
    assert!(rows[0].get("Loan Status").is_none());
}

#[tokio::test]
async fn test_dataset_unavailable_is_503() {
    let app = app(
        fake_registry(0, 0.2, 0)
            .failed("dim_customer", ArtifactKind::Dataset, "file not found")
            .build(),
    );
    let (status, body) = get_json(&app, "/data/loan_risk_summary").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["detail"], "required artifact 'dim_customer' is unavailable");
}
