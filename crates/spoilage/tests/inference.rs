//! Serving behaviour of a trained pipeline.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use ndarray::Array2;
use proptest::prelude::*;

use spoilage::dataset::{FEATURE_COLUMNS, feature_columns, read_csv_from, write_csv_to};
use spoilage::testing::{synthetic_batch, synthetic_dataset, train_small_bundle};
use spoilage::{
    ArtifactBundle, FeatureTable, FeatureVector, InferenceError, InferencePipeline, LABEL_COLUMN,
    PipelineState, SchemaError,
};

fn shared_bundle() -> Arc<ArtifactBundle> {
    static BUNDLE: OnceLock<Arc<ArtifactBundle>> = OnceLock::new();
    BUNDLE
        .get_or_init(|| Arc::new(train_small_bundle(&synthetic_dataset(150, 77)).unwrap()))
        .clone()
}

fn pipeline() -> InferencePipeline {
    InferencePipeline::new(shared_bundle())
}

fn arb_reading() -> impl Strategy<Value = FeatureVector> {
    (
        0.0..100.0f64,
        0.0..14.0f64,
        -20.0..50.0f64,
        0.0..100.0f64,
        0.0..10.0f64,
    )
        .prop_map(|(m, ph, t, h, g)| FeatureVector::new(m, ph, t, h, g))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn batch_of_one_matches_single(v in arb_reading()) {
        let p = pipeline();
        let batch = p.predict_batch(&FeatureTable::from_rows(&[v])).unwrap();
        prop_assert_eq!(batch.len(), 1);
        prop_assert_eq!(&batch[0], &p.predict_one(&v).unwrap());
    }

    #[test]
    fn batch_preserves_row_order(rows in prop::collection::vec(arb_reading(), 0..40)) {
        let p = pipeline();
        let batch = p.predict_batch(&FeatureTable::from_rows(&rows)).unwrap();
        prop_assert_eq!(batch.len(), rows.len());
        for (v, result) in rows.iter().zip(&batch) {
            prop_assert_eq!(result, &p.predict_one(v).unwrap());
        }
    }

    #[test]
    fn repeated_predictions_agree(v in arb_reading()) {
        let p = pipeline();
        prop_assert_eq!(p.predict_one(&v).unwrap(), p.predict_one(&v).unwrap());
    }
}

#[test]
fn labels_come_from_training_classes() {
    let p = pipeline();
    let batch = synthetic_batch(30, 5).unwrap().feature_table().unwrap();
    for result in p.predict_batch(&batch).unwrap() {
        assert!(p.classes().contains(&result.label));
        assert_eq!(p.classes()[result.class_id.index()], result.label);
    }
}

#[test]
fn each_missing_column_rejects_whole_batch() {
    let p = pipeline();
    let batch = synthetic_batch(5, 1).unwrap();
    for dropped in FEATURE_COLUMNS {
        let keep: Vec<usize> = (0..batch.columns().len())
            .filter(|&i| batch.columns()[i] != dropped)
            .collect();
        let columns = keep.iter().map(|&i| batch.columns()[i].clone()).collect();
        let rows = batch
            .rows()
            .iter()
            .map(|r| keep.iter().map(|&i| r[i].clone()).collect())
            .collect();
        let reduced = spoilage::RawTable::new(columns, rows).unwrap();

        match p.annotate(&reduced) {
            Err(InferenceError::Schema(SchemaError::MissingColumns { missing, required })) => {
                assert_eq!(missing, [dropped]);
                assert_eq!(required, feature_columns());
            }
            other => panic!("dropping {dropped}: expected MissingColumns, got {other:?}"),
        }
    }
}

#[test]
fn reordered_columns_are_projected_by_name() {
    let p = pipeline();
    let csv = "Bacterial_Growth,Humidity,Temperature,pH,Moisture,Note\n\
               9,50,20,7,50,late delivery\n\
               0.5,50,20,7,50,\n";
    let table = read_csv_from(csv.as_bytes()).unwrap();
    let out = p.annotate(&table).unwrap();

    assert_eq!(
        out.column(LABEL_COLUMN).unwrap(),
        vec!["Completely Spoiled", "Fresh"]
    );
    assert_eq!(out.column("Note").unwrap(), vec!["late delivery", ""]);
}

#[test]
fn unparsable_cell_rejects_batch() {
    let p = pipeline();
    let csv = "Moisture,pH,Temperature,Humidity,Bacterial_Growth\n\
               50,7,20,50,9\n\
               50,7,20,,1\n";
    let table = read_csv_from(csv.as_bytes()).unwrap();
    assert!(matches!(
        p.annotate(&table),
        Err(InferenceError::Schema(SchemaError::InvalidValue { row: 1, .. }))
    ));
}

#[test]
fn annotated_batch_writes_as_csv() {
    let p = pipeline();
    let out = p.annotate(&synthetic_batch(3, 2).unwrap()).unwrap();
    let mut buf = Vec::new();
    write_csv_to(&mut buf, &out).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let header = text.lines().next().unwrap();
    assert_eq!(
        header,
        "Sample_ID,Moisture,pH,Temperature,Humidity,Bacterial_Growth,Spoilage_Status"
    );
    assert_eq!(text.lines().count(), 4);
}

#[test]
fn record_input_ignores_extra_fields() {
    let p = pipeline();
    let record: BTreeMap<String, f64> = [
        ("Moisture", 50.0),
        ("pH", 7.0),
        ("Temperature", 20.0),
        ("Humidity", 50.0),
        ("Bacterial_Growth", 9.0),
        ("Weight", 1.2),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    assert_eq!(p.predict_record(&record).unwrap().label, "Completely Spoiled");
}

#[test]
fn wrong_shape_table_is_rejected() {
    let p = pipeline();
    let table = FeatureTable::with_columns(
        vec!["a".into(), "b".into(), "c".into(), "d".into(), "e".into()],
        Array2::zeros((3, 5)),
    )
    .unwrap();
    assert!(matches!(p.predict_batch(&table), Err(InferenceError::Schema(_))));
}

#[test]
fn uninitialized_state_serves_nothing() {
    let state: PipelineState = PipelineState::default();
    let v = FeatureVector::new(50.0, 7.0, 20.0, 50.0, 9.0);
    assert!(matches!(
        state.predict_one(&v),
        Err(InferenceError::NotReady { state: "uninitialized" })
    ));
    assert!(matches!(
        state.annotate(&synthetic_batch(2, 1).unwrap()),
        Err(InferenceError::NotReady { .. })
    ));
}

#[test]
fn concurrent_batches_share_one_bundle() {
    let p = pipeline();
    let table = synthetic_batch(50, 12).unwrap().feature_table().unwrap();
    let expected = p.predict_batch(&table).unwrap();

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let p = p.clone();
                let table = &table;
                s.spawn(move || p.predict_batch(table).unwrap())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
    assert!(Arc::strong_count(p.bundle()) >= 2);
}
