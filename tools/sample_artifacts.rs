//! Sample Artifact Generator
//!
//! Writes a small, self-consistent artifact set and customer snapshot in the
//! layout of the default manifest, so the gateway can run locally without
//! the training notebooks:
//!
//! ```text
//! <out>/cleaned_banking.csv
//! <out>/models/{risk,anomaly,rfm}_feature_scaler.json
//! <out>/models/{risk_dt_model,iso_forest_model,kmeans_model,risk_label_encoder}.json
//! ```
//!
//! Usage: `sample-artifacts [out_dir] [customers]`

use anyhow::{Context, Result};
use prediction_gateway::artifacts::{
    Classifier, Clusterer, DecisionTreeModel, FeatureScaler, IsolationForestModel,
    IsolationTree, KMeansModel, LabelEncoderModel, Scaler, TreeStructure,
};
use prediction_gateway::interpret::interpret_segment;
use rand::rngs::ThreadRng;
use rand::Rng;
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

const FIRST_NAMES: [&str; 8] = ["Ada", "Alan", "Grace", "Edsger", "Barbara", "Donald", "Frances", "Ken"];
const LAST_NAMES: [&str; 8] = ["Lovelace", "Turing", "Hopper", "Dijkstra", "Liskov", "Knuth", "Allen", "Thompson"];
const LOAN_STATUSES: [&str; 3] = ["Approved", "Closed", "Rejected"];
const LOAN_TERMS: [i64; 5] = [12, 24, 36, 48, 60];

const FOREST_TREES: usize = 100;
const FOREST_MAX_SAMPLES: usize = 256;
/// Offset of a forest fitted with automatic contamination
const FOREST_OFFSET: f64 = -0.5;
const CLUSTERS: usize = 3;
const KMEANS_ITERATIONS: usize = 25;

/// One synthetic customer with every column the gateway reads.
struct Customer {
    id: usize,
    first_name: &'static str,
    last_name: &'static str,
    age: i64,
    loan_amount: f64,
    interest_rate: f64,
    loan_term: i64,
    transaction_amount: f64,
    account_balance_after_transaction: f64,
    credit_card_balance: f64,
    rewards_points: f64,
    recency: i64,
    frequency: i64,
    monetary: f64,
}

impl Customer {
    fn risk_row(&self) -> Vec<f64> {
        vec![self.loan_amount, self.interest_rate, self.loan_term as f64, self.age as f64]
    }

    fn anomaly_row(&self) -> Vec<f64> {
        vec![
            self.transaction_amount,
            self.account_balance_after_transaction,
            self.credit_card_balance,
            self.rewards_points,
        ]
    }

    fn rfm_row(&self) -> Vec<f64> {
        vec![self.recency as f64, self.frequency as f64, self.monetary]
    }
}

/// Customer generator for sample data
struct CustomerGenerator {
    rng: ThreadRng,
    counter: usize,
}

impl CustomerGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            counter: 0,
        }
    }

    fn generate(&mut self) -> Customer {
        self.counter += 1;
        let rng = &mut self.rng;

        // A few customers carry outlying card activity.
        let outlier = rng.gen_bool(0.03);
        let transaction_amount = if outlier {
            rng.gen_range(8_000.0..25_000.0)
        } else {
            rng.gen_range(5.0..1_500.0)
        };

        Customer {
            id: self.counter,
            first_name: FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())],
            last_name: LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())],
            age: rng.gen_range(18..80),
            loan_amount: round2(rng.gen_range(1_000.0..50_000.0)),
            interest_rate: round2(rng.gen_range(2.0..15.0)),
            loan_term: LOAN_TERMS[rng.gen_range(0..LOAN_TERMS.len())],
            transaction_amount: round2(transaction_amount),
            account_balance_after_transaction: round2(rng.gen_range(100.0..50_000.0)),
            credit_card_balance: round2(rng.gen_range(0.0..10_000.0)),
            rewards_points: rng.gen_range(0..10_000) as f64,
            recency: rng.gen_range(1..365),
            frequency: rng.gen_range(1..60),
            monetary: round2(rng.gen_range(50.0..20_000.0)),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sample_artifacts=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let out_dir = Path::new(args.get(1).map(|s| s.as_str()).unwrap_or("."));
    let count: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(500).max(CLUSTERS);

    info!(out_dir = %out_dir.display(), customers = count, "Generating sample artifacts");

    let models_dir = out_dir.join("models");
    fs::create_dir_all(&models_dir)
        .with_context(|| format!("Failed to create {}", models_dir.display()))?;

    let mut generator = CustomerGenerator::new();
    let customers: Vec<Customer> = (0..count).map(|_| generator.generate()).collect();
    let mut rng = rand::thread_rng();

    // Risk: scaler, hand-grown tree over the scaled columns, label encoder
    let risk_rows: Vec<Vec<f64>> = customers.iter().map(Customer::risk_row).collect();
    let risk_scaler = fit_standard_scaler(&risk_rows);
    let risk_tree = risk_tree();
    let encoder = LabelEncoderModel {
        classes: LOAN_STATUSES.iter().map(|s| s.to_string()).collect(),
    };

    // Anomaly: isolation forest grown on scaled card activity
    let anomaly_rows: Vec<Vec<f64>> = customers.iter().map(Customer::anomaly_row).collect();
    let anomaly_scaler = fit_standard_scaler(&anomaly_rows);
    let scaled_anomaly = transform_all(&anomaly_scaler, &anomaly_rows)?;
    let forest = grow_isolation_forest(&mut rng, &scaled_anomaly);

    // Segmentation: k-means on scaled RFM
    let rfm_rows: Vec<Vec<f64>> = customers.iter().map(Customer::rfm_row).collect();
    let rfm_scaler = fit_standard_scaler(&rfm_rows);
    let scaled_rfm = transform_all(&rfm_scaler, &rfm_rows)?;
    let kmeans = fit_kmeans(&mut rng, &scaled_rfm);

    write_json(&models_dir.join("risk_feature_scaler.json"), &risk_scaler)?;
    write_json(&models_dir.join("risk_dt_model.json"), &risk_tree)?;
    write_json(&models_dir.join("risk_label_encoder.json"), &encoder)?;
    write_json(&models_dir.join("anomaly_feature_scaler.json"), &anomaly_scaler)?;
    write_json(&models_dir.join("iso_forest_model.json"), &forest)?;
    write_json(&models_dir.join("rfm_feature_scaler.json"), &rfm_scaler)?;
    write_json(&models_dir.join("kmeans_model.json"), &kmeans)?;

    // Snapshot columns agree with what the models say about each customer
    let csv_path = out_dir.join("cleaned_banking.csv");
    let mut writer = csv::Writer::from_path(&csv_path)
        .with_context(|| format!("Failed to create {}", csv_path.display()))?;
    writer.write_record([
        "Customer ID",
        "First Name",
        "Last Name",
        "Age",
        "Loan Amount",
        "Interest Rate",
        "Loan Term",
        "Loan Status",
        "Transaction Amount",
        "Account Balance After Transaction",
        "Credit Card Balance",
        "Rewards Points",
        "Recency",
        "Frequency",
        "Monetary",
        "Segment_Label",
    ])?;

    for customer in &customers {
        let scaled = risk_scaler.transform(&customer.risk_row())?;
        let status = LOAN_STATUSES[risk_tree.predict(&scaled)? as usize];
        let cluster = kmeans.predict(&rfm_scaler.transform(&customer.rfm_row())?)?;
        let segment = interpret_segment(cluster).segment_label;

        writer.write_record([
            customer.id.to_string(),
            customer.first_name.to_string(),
            customer.last_name.to_string(),
            customer.age.to_string(),
            customer.loan_amount.to_string(),
            customer.interest_rate.to_string(),
            customer.loan_term.to_string(),
            status.to_string(),
            customer.transaction_amount.to_string(),
            customer.account_balance_after_transaction.to_string(),
            customer.credit_card_balance.to_string(),
            customer.rewards_points.to_string(),
            customer.recency.to_string(),
            customer.frequency.to_string(),
            customer.monetary.to_string(),
            segment.as_str().to_string(),
        ])?;
    }
    writer.flush()?;

    info!(
        "Completed! Wrote 7 artifacts and {} customers under {}",
        customers.len(),
        out_dir.display()
    );
    Ok(())
}

/// Population mean and standard deviation per column.
fn fit_standard_scaler(rows: &[Vec<f64>]) -> FeatureScaler {
    let width = rows.first().map(Vec::len).unwrap_or(0);
    let n = rows.len().max(1) as f64;

    let mean: Vec<f64> = (0..width)
        .map(|c| rows.iter().map(|r| r[c]).sum::<f64>() / n)
        .collect();
    let scale = (0..width)
        .map(|c| {
            let var = rows.iter().map(|r| (r[c] - mean[c]).powi(2)).sum::<f64>() / n;
            if var > 0.0 {
                var.sqrt()
            } else {
                1.0
            }
        })
        .collect();

    FeatureScaler::Standard { mean, scale }
}

fn transform_all(scaler: &FeatureScaler, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
    rows.iter()
        .map(|row| scaler.transform(row).map_err(Into::into))
        .collect()
}

/// Below-average rates are approved; above-average rates are closed for
/// small loans and rejected for large ones.
fn risk_tree() -> DecisionTreeModel {
    DecisionTreeModel {
        tree: TreeStructure {
            children_left: vec![1, -1, 3, -1, -1],
            children_right: vec![2, -1, 4, -1, -1],
            feature: vec![1, -2, 0, -2, -2],
            threshold: vec![0.0, -2.0, 0.5, -2.0, -2.0],
            n_node_samples: vec![],
        },
        value: vec![
            vec![1.0, 1.0, 1.0],
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 1.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ],
        classes: vec![0, 1, 2],
        n_features: Some(4),
    }
}

/// Node arrays of a tree while it is being grown.
#[derive(Default)]
struct TreeArrays {
    children_left: Vec<i64>,
    children_right: Vec<i64>,
    feature: Vec<i64>,
    threshold: Vec<f64>,
    n_node_samples: Vec<u64>,
}

impl TreeArrays {
    /// Grow a random isolation tree in pre-order, so children always
    /// follow their parent.
    fn grow(
        &mut self,
        rng: &mut ThreadRng,
        data: &[Vec<f64>],
        samples: Vec<usize>,
        depth: usize,
        max_depth: usize,
    ) -> usize {
        let node = self.children_left.len();
        self.children_left.push(-1);
        self.children_right.push(-1);
        self.feature.push(-2);
        self.threshold.push(-2.0);
        self.n_node_samples.push(samples.len() as u64);

        if depth >= max_depth || samples.len() <= 1 {
            return node;
        }

        let width = data[samples[0]].len();
        let column = rng.gen_range(0..width);
        let value = |i: usize| data[i][column] as f32 as f64;
        let lo = samples.iter().map(|&i| value(i)).fold(f64::INFINITY, f64::min);
        let hi = samples.iter().map(|&i| value(i)).fold(f64::NEG_INFINITY, f64::max);
        if hi <= lo {
            return node;
        }

        let split = rng.gen_range(lo..hi);
        let (left, right): (Vec<usize>, Vec<usize>) =
            samples.into_iter().partition(|&i| value(i) <= split);

        let left_id = self.grow(rng, data, left, depth + 1, max_depth);
        let right_id = self.grow(rng, data, right, depth + 1, max_depth);
        self.children_left[node] = left_id as i64;
        self.children_right[node] = right_id as i64;
        self.feature[node] = column as i64;
        self.threshold[node] = split;
        node
    }

    fn finish(self) -> TreeStructure {
        TreeStructure {
            children_left: self.children_left,
            children_right: self.children_right,
            feature: self.feature,
            threshold: self.threshold,
            n_node_samples: self.n_node_samples,
        }
    }
}

fn grow_isolation_forest(rng: &mut ThreadRng, data: &[Vec<f64>]) -> IsolationForestModel {
    let max_samples = FOREST_MAX_SAMPLES.min(data.len());
    let max_depth = (max_samples as f64).log2().ceil() as usize;

    let estimators = (0..FOREST_TREES)
        .map(|_| {
            let samples = rand::seq::index::sample(rng, data.len(), max_samples).into_vec();
            let mut arrays = TreeArrays::default();
            arrays.grow(rng, data, samples, 0, max_depth);
            IsolationTree {
                tree: arrays.finish(),
                features: None,
            }
        })
        .collect();

    IsolationForestModel {
        estimators,
        max_samples: max_samples as u64,
        offset: FOREST_OFFSET,
        n_features: data.first().map(Vec::len),
    }
}

/// Lloyd iterations from randomly drawn initial centres.
fn fit_kmeans(rng: &mut ThreadRng, data: &[Vec<f64>]) -> KMeansModel {
    let mut model = KMeansModel {
        cluster_centers: rand::seq::index::sample(rng, data.len(), CLUSTERS)
            .into_iter()
            .map(|i| data[i].clone())
            .collect(),
    };
    let width = data.first().map(Vec::len).unwrap_or(0);

    for _ in 0..KMEANS_ITERATIONS {
        let mut sums = vec![vec![0.0; width]; CLUSTERS];
        let mut counts = vec![0usize; CLUSTERS];
        for row in data {
            let Ok(cluster) = model.predict(row) else {
                continue;
            };
            counts[cluster] += 1;
            for (sum, x) in sums[cluster].iter_mut().zip(row) {
                *sum += x;
            }
        }
        for (cluster, centre) in model.cluster_centers.iter_mut().enumerate() {
            // An emptied cluster keeps its previous centre.
            if counts[cluster] > 0 {
                *centre = sums[cluster].iter().map(|s| s / counts[cluster] as f64).collect();
            }
        }
    }
    model
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "Artifact written");
    Ok(())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
