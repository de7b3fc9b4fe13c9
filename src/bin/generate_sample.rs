use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use arff_labeler::classifier::{ClassifierDef, MemberDef, ModelFile, NodeDef};
use arff_labeler::data::{Attribute, Dataset, Record, Value};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn pick<'a>(&mut self, items: &'a [String]) -> &'a str {
        let i = (self.next_f64() * items.len() as f64) as usize;
        &items[i.min(items.len() - 1)]
    }
}

fn breast_cancer_attributes() -> Vec<Attribute> {
    vec![
        Attribute::nominal(
            "age",
            ["10-19", "20-29", "30-39", "40-49", "50-59", "60-69", "70-79", "80-89", "90-99"],
        ),
        Attribute::nominal("menopause", ["lt40", "ge40", "premeno"]),
        Attribute::nominal(
            "tumor-size",
            [
                "0-4", "5-9", "10-14", "15-19", "20-24", "25-29", "30-34", "35-39", "40-44",
                "45-49", "50-54", "55-59",
            ],
        ),
        Attribute::nominal(
            "inv-nodes",
            [
                "0-2", "3-5", "6-8", "9-11", "12-14", "15-17", "18-20", "21-23", "24-26",
                "27-29", "30-32", "33-35", "36-39",
            ],
        ),
        Attribute::nominal("node-caps", ["yes", "no"]),
        Attribute::nominal("deg-malig", ["1", "2", "3"]),
        Attribute::nominal("breast", ["left", "right"]),
        Attribute::nominal(
            "breast-quad",
            ["left_up", "left_low", "right_up", "right_low", "central"],
        ),
        Attribute::nominal("irradiat", ["yes", "no"]),
        Attribute::nominal("Class", ["no-recurrence-events", "recurrence-events"]),
    ]
}

fn leaf(no: f64, yes: f64) -> NodeDef {
    NodeDef::Leaf {
        distribution: vec![no, yes],
    }
}

fn split(attribute: &str, branches: &[(&str, NodeDef)]) -> NodeDef {
    NodeDef::Nominal {
        attribute: attribute.to_string(),
        branches: branches
            .iter()
            .map(|(label, node)| (label.to_string(), node.clone()))
            .collect::<BTreeMap<_, _>>(),
    }
}

/// Boosted trees on the strongest predictors, wrapped so that a missed
/// recurrence costs twice a false alarm.
fn demo_model() -> ModelFile {
    let deg_malig = split(
        "deg-malig",
        &[
            ("1", leaf(59.0, 7.0)),
            ("2", leaf(102.0, 28.0)),
            (
                "3",
                split("node-caps", &[("no", leaf(36.0, 22.0)), ("yes", leaf(4.0, 23.0))]),
            ),
        ],
    );
    let inv_nodes = split(
        "inv-nodes",
        &[
            ("0-2", leaf(167.0, 46.0)),
            ("3-5", leaf(19.0, 17.0)),
            ("6-8", leaf(7.0, 10.0)),
            ("9-11", leaf(4.0, 6.0)),
        ],
    );
    let irradiat = split("irradiat", &[("no", leaf(164.0, 54.0)), ("yes", leaf(37.0, 31.0))]);

    ModelFile {
        relation: "breast-cancer".to_string(),
        attributes: breast_cancer_attributes(),
        class: None,
        classifier: ClassifierDef::CostSensitive {
            cost_matrix: vec![vec![0.0, 1.0], vec![2.0, 0.0]],
            classifier: Box::new(ClassifierDef::AdaBoost {
                members: vec![
                    MemberDef {
                        weight: 0.92,
                        classifier: ClassifierDef::DecisionTree { root: deg_malig },
                    },
                    MemberDef {
                        weight: 0.41,
                        classifier: ClassifierDef::RandomForest {
                            trees: vec![inv_nodes, irradiat],
                        },
                    },
                ],
            }),
        },
    }
}

fn unknown_records(attributes: &[Attribute], rows: usize, rng: &mut SimpleRng) -> Dataset {
    let class_index = attributes.len() - 1;
    let records = (0..rows)
        .map(|_| Record {
            values: attributes
                .iter()
                .enumerate()
                .map(|(i, attr)| {
                    if i == class_index || rng.next_f64() < 0.03 {
                        Value::Missing
                    } else {
                        Value::Nominal(rng.pick(attr.labels()).to_string())
                    }
                })
                .collect(),
        })
        .collect();
    Dataset {
        relation: "unknown-breast-cancer".to_string(),
        attributes: attributes.to_vec(),
        class_index,
        records,
    }
}

const DATA_PREAMBLE: &str = "\
% Breast cancer records awaiting a recurrence prediction.
% The Class column is left unknown; the labeler fills it in.
";

fn write(path: &Path, contents: &str) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
}

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let out_dir = PathBuf::from(args.next().unwrap_or_else(|| ".".to_string()));
    let rows: usize = match args.next() {
        Some(n) => n.parse().with_context(|| format!("invalid row count '{n}'"))?,
        None => 10,
    };

    let model = demo_model();
    let model_path = out_dir.join("models/breast-cancer-demo.json");
    let json = serde_json::to_string_pretty(&model).context("serializing model")?;
    write(&model_path, &json)?;

    let mut rng = SimpleRng::new(42);
    let dataset = unknown_records(&model.attributes, rows, &mut rng);
    let data_path = out_dir.join("data/unknown-breastcancer.arff");
    write(&data_path, &format!("{DATA_PREAMBLE}{dataset}\n"))?;

    println!(
        "Wrote model to {} and {} unlabeled records to {}",
        model_path.display(),
        dataset.len(),
        data_path.display()
    );
    Ok(())
}
