//! Tests for model.rs, loader.rs and predictor.rs

use ckd_common::{
    CkdError, DecisionTree, EncodingTable, FeatureValue, Label, LabelMap, LoadedModel,
    ModelBundle, ModelLoader, ModelSchema, ModelSource, Predictor, RawInput, RawValue,
    ReconciliationPolicy, SchemaVariant, TreeNode,
};
use sha2::{Digest, Sha256};
use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn load_fixture(name: &str) -> LoadedModel {
    ModelLoader::new().expect("loader")
        .load(&ModelSource::Local(fixture(name)), None)
        .expect("fixture loads")
}

fn raw(pairs: &[(&str, &str)]) -> RawInput {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), RawValue::from(*v)))
        .collect()
}

fn reduced_input(hemo: &str, sg: &str) -> RawInput {
    raw(&[
        ("age", "45"),
        ("bp", "80"),
        ("sg", sg),
        ("al", "1"),
        ("su", "0"),
        ("bgr", "121"),
        ("bu", "36"),
        ("sc", "1.2"),
        ("sod", "135"),
        ("pot", "4.5"),
        ("hemo", hemo),
        ("pcv", "40"),
        ("wbcc", "8000"),
        ("rbcc", "4.5"),
    ])
}

fn full_input(htn: &str, appet: &str, hemo: &str) -> RawInput {
    let mut input = reduced_input(hemo, "1.02");
    input.extend(raw(&[
        ("rbc", "normal"),
        ("pc", "normal"),
        ("pcc", "notpresent"),
        ("ba", "notpresent"),
        ("htn", htn),
        ("dm", "no"),
        ("cad", "no"),
        ("appet", appet),
        ("pe", "no"),
        ("ane", "no"),
    ]));
    input
}

fn bundle_json(name: &str) -> serde_json::Value {
    serde_json::from_slice(&std::fs::read(fixture(name)).unwrap()).unwrap()
}

fn bundle_from(value: serde_json::Value) -> Result<LoadedModel, CkdError> {
    let bytes = serde_json::to_vec(&value).expect("serialize bundle");
    ModelBundle::from_slice(&bytes)?.into_model()
}

#[test]
fn test_fixtures_load() {
    let reduced = load_fixture("reduced_tree.json");
    assert_eq!(reduced.name(), "decision_tree_model");
    assert_eq!(reduced.feature_names().len(), 14);
    assert_eq!(reduced.schema().policy, ReconciliationPolicy::Direct);
    assert_eq!(reduced.classifier_kind(), "decision_tree");

    let full = load_fixture("full_tree.json");
    assert_eq!(full.feature_names().len(), 24);
    assert_eq!(*full.labels(), LabelMap::new(1, 0).unwrap());

    let expand = load_fixture("expand_tree.json");
    assert_eq!(expand.schema().policy, ReconciliationPolicy::Expand);
    assert_eq!(expand.feature_names().len(), 34);
}

#[test]
fn test_reduced_predictions() {
    let predictor = Predictor::new(Arc::new(load_fixture("reduced_tree.json")));

    let low_hemo = predictor.predict(&reduced_input("12.5", "1.02")).unwrap();
    assert_eq!(low_hemo.class_code, 0);
    assert_eq!(low_hemo.label, Label::Ckd);
    assert_eq!(low_hemo.model, "decision_tree_model");

    let healthy = predictor.predict(&reduced_input("15.0", "1.025")).unwrap();
    assert_eq!(healthy.label, Label::NotCkd);

    let low_sg = predictor.predict(&reduced_input("15.0", "1.01")).unwrap();
    assert_eq!(low_sg.label, Label::Ckd);
}

#[test]
fn test_full_predictions_use_pinned_polarity() {
    let predictor = Predictor::new(Arc::new(load_fixture("full_tree.json")));

    // htn=yes encodes to 1 and takes the right branch: class 1, which this
    // artifact maps to ckd.
    let hypertensive = predictor.predict(&full_input("yes", "good", "15.0")).unwrap();
    assert_eq!(hypertensive.class_code, 1);
    assert_eq!(hypertensive.label, Label::Ckd);
    assert_eq!(hypertensive.features.get("htn"), Some(FeatureValue::Code(1)));

    let healthy = predictor.predict(&full_input("no", "good", "15.0")).unwrap();
    assert_eq!(healthy.class_code, 0);
    assert_eq!(healthy.label, Label::NotCkd);
}

#[test]
fn test_expand_predictions() {
    let predictor = Predictor::new(Arc::new(load_fixture("expand_tree.json")));

    let poor_appetite = predictor.predict(&full_input("no", "poor", "15.0")).unwrap();
    assert_eq!(poor_appetite.features.get("appet_poor"), Some(FeatureValue::Code(1)));
    assert_eq!(poor_appetite.features.get("appet_good"), Some(FeatureValue::Code(0)));
    assert_eq!(poor_appetite.label, Label::Ckd);

    let healthy = predictor.predict(&full_input("no", "good", "15.0")).unwrap();
    assert_eq!(healthy.label, Label::NotCkd);
    assert_eq!(
        healthy.features.names().collect::<Vec<_>>(),
        predictor.model().feature_names()
    );
}

#[test]
fn test_predictor_reports_every_bad_field() {
    let predictor = Predictor::new(Arc::new(load_fixture("full_tree.json")));
    let mut input = full_input("maybe", "good", "low");
    input.remove("bp");

    let errors = predictor.validate(&input);
    let fields: Vec<_> = errors.iter().filter_map(|e| e.field()).collect();
    assert_eq!(fields, vec!["bp", "hemo", "htn"]);
    assert!(predictor.predict(&input).is_err());
    assert!(predictor.validate(&full_input("no", "good", "15")).is_empty());
}

#[test]
fn test_predictor_fields_follow_variant() {
    let predictor = Predictor::new(Arc::new(load_fixture("reduced_tree.json")));
    assert_eq!(predictor.fields().len(), 14);
    let predictor = Predictor::new(Arc::new(load_fixture("expand_tree.json")));
    assert_eq!(predictor.fields().len(), 24);
}

#[test]
fn test_bundle_with_unlabeled_leaf_rejected() {
    let mut json = bundle_json("reduced_tree.json");
    json["tree"]["nodes"][1]["class"] = serde_json::json!(2);
    let err = bundle_from(json).unwrap_err();
    assert!(err.to_string().contains("no label"));
}

#[test]
fn test_bundle_with_bad_polarity_rejected() {
    let mut json = bundle_json("reduced_tree.json");
    json["labels"]["notckd"] = serde_json::json!(0);
    assert!(matches!(bundle_from(json), Err(CkdError::InvalidModel(_))));
}

#[test]
fn test_bundle_with_unproducible_feature_rejected() {
    let mut json = bundle_json("reduced_tree.json");
    json["schema"]["feature_names"][0] = serde_json::json!("bmi");
    let err = bundle_from(json).unwrap_err();
    assert!(err.to_string().contains("bmi"));
}

#[test]
fn test_direct_schema_must_cover_every_field() {
    let schema = ModelSchema {
        variant: SchemaVariant::Reduced,
        policy: ReconciliationPolicy::Direct,
        feature_names: vec!["age".to_string(), "bp".to_string()],
    };
    let err = schema.validate().unwrap_err();
    assert!(err.to_string().contains("has no column"));
}

#[test]
fn test_expand_bundle_with_unoffered_category_predicts() {
    let mut json = bundle_json("expand_tree.json");
    json["schema"]["feature_names"]
        .as_array_mut()
        .unwrap()
        .push(serde_json::json!("appet_none"));
    let predictor = Predictor::new(Arc::new(bundle_from(json).unwrap()));
    assert_eq!(predictor.model().feature_names().len(), 35);

    let prediction = predictor.predict(&full_input("no", "good", "15.0")).unwrap();
    assert_eq!(prediction.label, Label::NotCkd);
    assert_eq!(prediction.features.len(), 35);
    assert_eq!(prediction.features.get("appet_none"), Some(FeatureValue::Code(0)));
    assert_eq!(prediction.features.get("appet_good"), Some(FeatureValue::Code(1)));
}

#[test]
fn test_expand_schema_rejects_label_encoded_column() {
    let mut json = bundle_json("expand_tree.json");
    json["schema"]["feature_names"][14] = serde_json::json!("rbc");
    assert!(bundle_from(json).is_err());
}

#[test]
fn test_bundle_encoding_override() {
    let specs = SchemaVariant::Full.fields();
    let mut json = bundle_json("full_tree.json");
    let table = EncodingTable::label_encoded(specs)
        .with_code("htn", "yes", 0)
        .with_code("htn", "no", 1);
    json["encoding"] = serde_json::to_value(&table).unwrap();
    let predictor = Predictor::new(Arc::new(bundle_from(json).unwrap()));

    let fv = predictor.normalize(&full_input("yes", "good", "15.0")).unwrap();
    assert_eq!(fv.get("htn"), Some(FeatureValue::Code(0)));
}

#[test]
fn test_encoding_override_with_unlisted_value_rejected() {
    let specs = SchemaVariant::Full.fields();
    let mut json = bundle_json("expand_tree.json");
    let table = EncodingTable::label_encoded(specs).with_code("appet", "none", 2);
    json["encoding"] = serde_json::to_value(&table).unwrap();
    let err = bundle_from(json).unwrap_err();
    assert!(matches!(err, CkdError::InvalidModel(_)));
    assert!(err.to_string().contains("not an allowed value"));
}

#[test]
fn test_incomplete_encoding_override_rejected() {
    let mut json = bundle_json("full_tree.json");
    json["encoding"] = serde_json::json!({"htn": {"yes": 1, "no": 0}});
    assert!(bundle_from(json).is_err());
}

#[test]
fn test_custom_classifier() {
    struct Always(i64);
    impl ckd_common::Classifier for Always {
        fn predict(&self, _row: &[f64]) -> ckd_common::Result<i64> {
            Ok(self.0)
        }
        fn kind(&self) -> &str {
            "always"
        }
    }

    let schema = load_fixture("reduced_tree.json").schema().clone();
    let model = LoadedModel::new(
        "always_ckd",
        "",
        schema,
        LabelMap::new(0, 1).unwrap(),
        None,
        Box::new(Always(7)),
    )
    .unwrap();
    let predictor = Predictor::new(Arc::new(model));
    let err = predictor.predict(&reduced_input("15", "1.02")).unwrap_err();
    assert!(matches!(err, CkdError::UnknownClassCode(7)));
}

#[test]
fn test_model_rejects_misaligned_vector() {
    let model = load_fixture("reduced_tree.json");
    let tree = DecisionTree::new(vec![TreeNode::Leaf { class: 0 }]);
    assert_eq!(ckd_common::Classifier::predict(&tree, &[]).unwrap(), 0);

    let misaligned = ckd_common::FeatureVector::new();
    let err = model.predict(&misaligned).unwrap_err();
    match err {
        CkdError::SchemaMismatch { missing, unexpected } => {
            assert_eq!(missing.len(), 14);
            assert!(unexpected.is_empty());
        }
        other => panic!("expected SchemaMismatch, got {other}"),
    }
}

#[test]
fn test_digest_pin() {
    let path = fixture("reduced_tree.json");
    let digest = hex::encode(Sha256::digest(std::fs::read(&path).unwrap()));
    let source = ModelSource::Local(path);
    let loader = ModelLoader::new().expect("loader");

    let model = loader.load(&source, Some(&digest)).unwrap();
    assert_eq!(model.sha256(), Some(digest.as_str()));

    let wrong = "0".repeat(64);
    let err = loader.load(&source, Some(&wrong)).unwrap_err();
    assert!(matches!(err, CkdError::ModelLoad { ref reason, .. } if reason.contains("SHA-256")));
}

#[test]
fn test_corrupt_artifact_is_model_load_error() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let path = dir.path().join("model.json");
    std::fs::write(&path, b"\x80\x04\x95 not json").expect("write");

    let err = ModelLoader::new()
        .expect("loader")
        .load(&ModelSource::Local(path.clone()), None)
        .unwrap_err();
    match err {
        CkdError::ModelLoad { origin, reason } => {
            assert_eq!(origin, path.display().to_string());
            assert!(reason.contains("failed to parse artifact"));
        }
        other => panic!("expected ModelLoad, got {other}"),
    }
}

#[test]
fn test_remote_failure_names_url() {
    // Port 9 (discard) is closed on test hosts, so the connect fails fast.
    let url = "http://127.0.0.1:9/decision_tree_model.json";
    let loader = ModelLoader::with_timeout(Duration::from_secs(2)).expect("loader");
    let err = loader
        .load(&ModelSource::Remote(url.to_string()), None)
        .unwrap_err();
    assert!(matches!(err, CkdError::ModelLoad { ref origin, .. } if origin == url));
    assert!(err.is_fatal());
}

#[test]
fn test_remote_fetch_times_out() {
    // Accept the connection and never answer.
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    std::thread::spawn(move || {
        if let Ok((stream, _)) = listener.accept() {
            std::thread::sleep(Duration::from_secs(5));
            drop(stream);
        }
    });

    let url = format!("http://{}/decision_tree_model.json", addr);
    let loader = ModelLoader::with_timeout(Duration::from_secs(1)).expect("loader");
    let started = Instant::now();
    let err = loader
        .load(&ModelSource::Remote(url.clone()), None)
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(4));
    match err {
        CkdError::ModelLoad { origin, reason } => {
            assert_eq!(origin, url);
            assert!(reason.starts_with("request timed out"), "{}", reason);
        }
        other => panic!("expected ModelLoad, got {other}"),
    }
}
