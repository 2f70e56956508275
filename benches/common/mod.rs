#![allow(dead_code)]
use std::path::Path;

use rustc_hash::FxHashMap;

use shapetrap::ast::Node;
use shapetrap::parser;
use shapetrap::tensor::{TensorHost, Value};
use test_support::load_cases;

pub struct Workload {
    pub label: String,
    pub line: String,
    pub env: FxHashMap<String, Value>,
}

/// Fixture cases with benching enabled and the given tag.
pub fn workloads(tag: &str) -> Vec<Workload> {
    let cases = load_cases(Path::new("tests/cases")).unwrap_or_else(|err| panic!("{err:#}"));
    cases
        .into_iter()
        .filter(|case| case.benched())
        .filter(|case| {
            case.spec
                .bench
                .as_ref()
                .is_some_and(|bench| bench.tags.iter().any(|t| t == tag))
        })
        .map(|case| {
            let mut env = TensorHost::prelude();
            for (name, text) in &case.spec.bindings {
                let value = text
                    .parse::<Value>()
                    .unwrap_or_else(|err| panic!("{}: {err}", case.name));
                env.insert(name.clone(), value);
            }
            Workload {
                label: case.name,
                line: case.spec.line,
                env,
            }
        })
        .collect()
}

pub fn load_tree(line: &str) -> Node {
    parser::parse(line)
        .unwrap_or_else(|err| panic!("parse {line}: {err}"))
        .unwrap_or_else(|| panic!("nothing to analyze in {line}"))
}
