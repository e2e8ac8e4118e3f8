use ameshouse::data::{FeatureColumn, FeatureTable};
use ameshouse::pipeline::{
    Aggregation, PricePipeline, PricePredictor, RegressionTree, Regressor, TransformStep, TreeNode,
};
use ameshouse::types::FeatureValue;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::collections::BTreeMap;

const FEATURES: [&str; 4] = ["GrLivArea", "OverallQual", "TotalBsmtSF", "YearBuilt"];

// Deterministic pseudo-random cells so runs are comparable.
fn synthetic_table(rows: usize) -> FeatureTable {
    let mut state: u64 = 0x5EED_A4E5;
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (state >> 11) as f64 / (1u64 << 53) as f64
    };
    let columns = FEATURES
        .iter()
        .map(|name| {
            let values = (0..rows)
                .map(|_| {
                    let u = next();
                    // Roughly one cell in fifty is missing.
                    (u > 0.02).then(|| match *name {
                        "GrLivArea" => 500.0 + 3000.0 * u,
                        "OverallQual" => (1.0 + 9.0 * u).round(),
                        "TotalBsmtSF" => 2000.0 * u,
                        _ => 1900.0 + 110.0 * u,
                    })
                })
                .collect();
            FeatureColumn::numeric(name, values)
        })
        .collect();
    FeatureTable::from_columns(columns).expect("distinct synthetic columns")
}

// A depth-three tree splitting on three of the features.
fn synthetic_tree(shift: f64) -> RegressionTree {
    RegressionTree {
        nodes: vec![
            TreeNode::split("OverallQual", 6.5 + shift, 1, 2),
            TreeNode::split("GrLivArea", 1400.0, 3, 4),
            TreeNode::split("TotalBsmtSF", 1100.0, 5, 6),
            TreeNode::leaf(-20_000.0),
            TreeNode::leaf(-5_000.0),
            TreeNode::leaf(15_000.0),
            TreeNode::leaf(40_000.0),
        ],
    }
}

fn synthetic_pipeline(trees: usize) -> PricePipeline {
    PricePipeline {
        format_version: 1,
        target: "SalePrice".to_string(),
        feature_names_in: FEATURES.iter().map(|s| s.to_string()).collect(),
        steps: vec![
            TransformStep::FillMissing {
                values: FEATURES
                    .iter()
                    .map(|name| (name.to_string(), FeatureValue::Number(0.0)))
                    .collect(),
            },
            TransformStep::LogTransform {
                columns: vec!["GrLivArea".to_string()],
                offset: 1.0,
            },
        ],
        regressor: Regressor::TreeEnsemble {
            base_score: 180_000.0,
            learning_rate: 0.1,
            aggregation: Aggregation::Sum,
            trees: (0..trees)
                .map(|i| synthetic_tree((i % 3) as f64 - 1.0))
                .collect(),
        },
    }
}

fn benchmark_batch_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_prediction");
    for rows in [100_usize, 1_460, 10_000] {
        let table = synthetic_table(rows);
        group.throughput(Throughput::Elements(rows as u64));
        for trees in [1_usize, 100] {
            let pipeline = synthetic_pipeline(trees);
            group.bench_with_input(
                BenchmarkId::new(format!("trees_{trees}"), rows),
                &table,
                |b, input| {
                    b.iter(|| {
                        let prices = pipeline.predict(black_box(input)).expect("prediction");
                        black_box(prices);
                    });
                },
            );
        }
    }
    let linear = PricePipeline {
        regressor: Regressor::Linear {
            intercept: 20_000.0,
            coefficients: BTreeMap::from([
                ("GrLivArea".to_string(), 9_000.0),
                ("OverallQual".to_string(), 15_000.0),
                ("TotalBsmtSF".to_string(), 30.0),
                ("YearBuilt".to_string(), 100.0),
            ]),
        },
        ..synthetic_pipeline(0)
    };
    let table = synthetic_table(1_460);
    group.bench_function("linear_1460", |b| {
        b.iter(|| black_box(linear.predict(black_box(&table)).expect("prediction")));
    });
    group.finish();
}

criterion_group!(benches, benchmark_batch_prediction);
criterion_main!(benches);
