use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use arff_labeler::data::{loader, Value};
use arff_labeler::runner::{RunError, Runner};
use tempfile::TempDir;

const TUMOUR_MODEL: &str = r#"{
    "relation": "tumours",
    "attributes": [
        {"name": "age", "type": "numeric"},
        {"name": "size", "type": "numeric"},
        {"name": "malignant", "type": "nominal", "labels": ["no", "yes"]}
    ],
    "classifier": {"kind": "random_forest", "trees": [
        {"node": "numeric", "attribute": "size", "threshold": 2.0,
         "le": {"node": "leaf", "distribution": [9, 1]},
         "gt": {"node": "leaf", "distribution": [2, 8]}},
        {"node": "numeric", "attribute": "age", "threshold": 55,
         "le": {"node": "leaf", "distribution": [6, 4]},
         "gt": {"node": "leaf", "distribution": [3, 7]}}
    ]}
}"#;

const TUMOUR_ARFF: &str = "\
@relation tumours
@attribute age numeric
@attribute size numeric
@attribute malignant {no,yes}
@data
41,1.5,?
63,3.25,?
";

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn fixture(dir: &TempDir) -> (Runner, PathBuf) {
    let model = write(dir, "tumours.json", TUMOUR_MODEL);
    let data = write(dir, "tumours.arff", TUMOUR_ARFF);
    (Runner::new(model), data)
}

#[test]
fn labels_the_two_row_scenario() {
    let dir = TempDir::new().unwrap();
    let (runner, data) = fixture(&dir);

    let labeled = runner.label(&data).unwrap();

    assert_eq!(labeled.class_attribute().name, "malignant");
    assert_eq!(labeled.len(), 2);
    for record in &labeled.records {
        let label = record.values[2].as_label().expect("class slot filled");
        assert!(["no", "yes"].contains(&label));
    }
    assert_eq!(labeled.records[0].values[..2], [Value::Numeric(41.0), Value::Numeric(1.5)]);
    assert_eq!(labeled.records[1].values[..2], [Value::Numeric(63.0), Value::Numeric(3.25)]);
    assert_eq!(labeled.records[0].values[2], Value::Nominal("no".into()));
    assert_eq!(labeled.records[1].values[2], Value::Nominal("yes".into()));
}

#[test]
fn keeps_count_order_and_inputs() {
    let dir = TempDir::new().unwrap();
    let mut arff = String::from(
        "@relation tumours\n@attribute age numeric\n@attribute size numeric\n\
         @attribute malignant {no,yes}\n@data\n",
    );
    for i in 0..40 {
        arff.push_str(&format!("{},{},?\n", 20 + i, (i % 7) as f64 * 0.75));
    }
    let data = write(&dir, "many.arff", &arff);
    let runner = Runner::new(write(&dir, "tumours.json", TUMOUR_MODEL));

    let input = loader::load_file(&data).unwrap();
    let labeled = runner.label(&data).unwrap();

    assert_eq!(labeled.len(), 40);
    for (before, after) in input.records.iter().zip(&labeled.records) {
        assert_eq!(before.values[..2], after.values[..2]);
        assert!(after.values[2].as_label().is_some());
    }
}

#[test]
fn repeated_runs_print_identical_reports() {
    let dir = TempDir::new().unwrap();
    let (runner, data) = fixture(&dir);

    let mut first = Vec::new();
    let mut second = Vec::new();
    runner.run(&data, &mut first).unwrap();
    runner.run(&data, &mut second).unwrap();

    assert_eq!(first, second);
    let text = String::from_utf8(first).unwrap();
    assert!(text.starts_with("\nNew, labeled = \n@relation tumours\n"), "{text}");
    assert!(text.ends_with("@data\n41,1.5,no\n63,3.25,yes\n"), "{text}");
}

#[test]
fn explicit_class_declaration_is_respected() {
    let dir = TempDir::new().unwrap();
    let model = r#"{
        "attributes": [
            {"name": "malignant", "type": "nominal", "labels": ["no", "yes"]},
            {"name": "size", "type": "numeric"}
        ],
        "class": "malignant",
        "classifier": {"kind": "decision_tree", "root": {
            "node": "numeric", "attribute": "size", "threshold": 2.0,
            "le": {"node": "leaf", "distribution": [1, 0]},
            "gt": {"node": "leaf", "distribution": [0, 1]}}}
    }"#;
    let data = r#"{
        "attributes": [
            {"name": "malignant", "type": "nominal", "labels": ["no", "yes"]},
            {"name": "size", "type": "numeric"}
        ],
        "class": "malignant",
        "data": [[null, 1.0], [null, 4.0]]
    }"#;
    let runner = Runner::new(write(&dir, "m.json", model));
    let labeled = runner.label(&write(&dir, "d.json", data)).unwrap();

    assert_eq!(labeled.class_index, 0);
    assert_eq!(labeled.records[0].values[0], Value::Nominal("no".into()));
    assert_eq!(labeled.records[1].values[0], Value::Nominal("yes".into()));
}

#[test]
fn missing_data_file_fails_without_output() {
    let dir = TempDir::new().unwrap();
    let (runner, _) = fixture(&dir);
    let mut out = Vec::new();

    let err = runner
        .run(&dir.path().join("absent.arff"), &mut out)
        .unwrap_err();

    assert!(matches!(err, RunError::Parse { .. }));
    assert_eq!(err.exit_code(), 4);
    assert!(out.is_empty());
}

#[test]
fn missing_model_fails_before_the_data_is_read() {
    let dir = TempDir::new().unwrap();
    let runner = Runner::new(dir.path().join("absent.json"));
    let mut out = Vec::new();

    // the data file does not exist either; the model error must win
    let err = runner
        .run(&dir.path().join("absent.arff"), &mut out)
        .unwrap_err();

    assert!(matches!(err, RunError::Load { .. }));
    assert_eq!(err.exit_code(), 3);
    assert!(out.is_empty());
}

#[test]
fn corrupt_model_is_a_load_error() {
    let dir = TempDir::new().unwrap();
    let data = write(&dir, "tumours.arff", TUMOUR_ARFF);
    for (name, contents) in [
        ("truncated.json", &TUMOUR_MODEL[..TUMOUR_MODEL.len() / 2]),
        ("binary.json", "\u{7f}ELF\u{2}\u{1}"),
    ] {
        let runner = Runner::new(write(&dir, name, contents));
        let mut out = Vec::new();
        let err = runner.run(&data, &mut out).unwrap_err();
        assert!(matches!(err, RunError::Load { .. }), "{name}: {err}");
        assert!(out.is_empty());
    }
}

#[test]
fn mismatched_schema_is_a_classification_error() {
    let dir = TempDir::new().unwrap();
    let (runner, _) = fixture(&dir);
    let data = write(
        &dir,
        "other.arff",
        "@relation other\n@attribute weight numeric\n@attribute size numeric\n\
         @attribute malignant {no,yes}\n@data\n70,1,?\n",
    );
    let mut out = Vec::new();

    let err = runner.run(&data, &mut out).unwrap_err();

    assert!(matches!(err, RunError::Classify(_)));
    assert_eq!(err.exit_code(), 5);
    assert!(out.is_empty());
}

#[test]
fn labels_an_unlabeled_csv() {
    let dir = TempDir::new().unwrap();
    let runner = Runner::new(write(&dir, "tumours.json", TUMOUR_MODEL));
    let data = write(&dir, "tumours.csv", "age,size,malignant\n41,1.5,?\n63,3.25,?\n");

    let mut out = Vec::new();
    runner.run(&data, &mut out).unwrap();

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("@attribute malignant {no,yes}\n"), "{text}");
    assert!(text.ends_with("@data\n41,1.5,no\n63,3.25,yes\n"), "{text}");
}

#[test]
fn csv_class_column_may_be_empty_or_absent() {
    let dir = TempDir::new().unwrap();
    let runner = Runner::new(write(&dir, "tumours.json", TUMOUR_MODEL));

    for (name, contents) in [
        ("empty.csv", "age,size,malignant\n41,1.5,\n63,3.25,\n"),
        ("absent.csv", "size,age\n1.5,41\n3.25,63\n"),
    ] {
        let labeled = runner.label(&write(&dir, name, contents)).unwrap();
        assert_eq!(labeled.records[0].values[..2], [Value::Numeric(41.0), Value::Numeric(1.5)]);
        assert_eq!(labeled.records[0].values[2], Value::Nominal("no".into()), "{name}");
        assert_eq!(labeled.records[1].values[2], Value::Nominal("yes".into()), "{name}");
    }
}

#[test]
fn csv_labels_follow_the_model_not_the_file() {
    let dir = TempDir::new().unwrap();

    // labels appear as yes, no in the file; the model declares no, yes
    let runner = Runner::new(write(&dir, "tumours.json", TUMOUR_MODEL));
    let data = write(&dir, "seen.csv", "age,size,malignant\n63,3.25,yes\n41,1.5,no\n");
    let labeled = runner.label(&data).unwrap();
    assert_eq!(labeled.class_attribute().labels(), ["no", "yes"]);
    assert_eq!(labeled.records[0].values[2], Value::Nominal("yes".into()));

    // number-like labels stay nominal
    let graded = r#"{
        "attributes": [
            {"name": "deg-malig", "type": "nominal", "labels": ["1", "2", "3"]},
            {"name": "Class", "type": "nominal", "labels": ["no-recurrence-events", "recurrence-events"]}
        ],
        "classifier": {"kind": "decision_tree", "root": {
            "node": "nominal", "attribute": "deg-malig", "branches": {
                "1": {"node": "leaf", "distribution": [9, 1]},
                "2": {"node": "leaf", "distribution": [7, 3]},
                "3": {"node": "leaf", "distribution": [2, 8]}}}}
    }"#;
    let runner = Runner::new(write(&dir, "graded.json", graded));
    let labeled = runner
        .label(&write(&dir, "graded.csv", "deg-malig,Class\n3,?\n1,?\n"))
        .unwrap();
    assert_eq!(labeled.records[0].values[0], Value::Nominal("3".into()));
    assert_eq!(labeled.records[0].values[1], Value::Nominal("recurrence-events".into()));
    assert_eq!(labeled.records[1].values[1], Value::Nominal("no-recurrence-events".into()));
}

struct ClosedPipe;

impl Write for ClosedPipe {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader went away"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn failed_write_is_an_output_error() {
    let dir = TempDir::new().unwrap();
    let (runner, data) = fixture(&dir);

    let err = runner.run(&data, &mut ClosedPipe).unwrap_err();

    assert!(matches!(err, RunError::Output(_)));
    assert_eq!(err.exit_code(), 6);
}

#[test]
fn bundled_demo_labels_every_record() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let runner = Runner::new(root.join("models/breast-cancer-demo.json"));

    let labeled = runner
        .label(&root.join("data/unknown-breastcancer.arff"))
        .unwrap();

    assert_eq!(labeled.len(), 10);
    assert_eq!(labeled.class_attribute().name, "Class");
    for record in &labeled.records {
        let label = record.values[labeled.class_index].as_label().unwrap();
        assert!(label == "no-recurrence-events" || label == "recurrence-events");
    }
}
