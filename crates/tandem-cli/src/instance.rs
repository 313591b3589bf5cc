//! JSON instance format and its translation into a [`Model`].
//!
//! ```json
//! {
//!   "name": "demo",
//!   "booleans": ["a", "b"],
//!   "integers": [{ "name": "x", "lb": 0, "ub": 10 }],
//!   "constraints": [
//!     { "type": "linear", "terms": [["x", 1], ["a", 5]], "sense": "ge", "rhs": 6 },
//!     { "type": "clause", "literals": ["a", "!b"] }
//!   ],
//!   "objective": "x"
//! }
//! ```
//!
//! Booleans and integers share one namespace. A leading `!` on a boolean
//! name selects its negation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tandem_core::{
    BoolVar, ComparisonSense, IntVar, LinearConstraint, LinearExpr, Model, ModelError,
    SolverConfig,
};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Instance {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub booleans: Vec<String>,
    #[serde(default)]
    pub integers: Vec<IntegerSpec>,
    #[serde(default)]
    pub constraints: Vec<ConstraintSpec>,
    pub objective: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntegerSpec {
    pub name: String,
    pub lb: i64,
    pub ub: i64,
    /// Exists only in the CP engine.
    #[serde(default)]
    pub cp_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConstraintSpec {
    Linear {
        terms: Vec<(String, i64)>,
        sense: String,
        rhs: i64,
    },
    CpLinear {
        terms: Vec<(String, i64)>,
        sense: String,
        rhs: i64,
    },
    Clause {
        literals: Vec<String>,
    },
    AllDifferent {
        vars: Vec<String>,
    },
}

// ── Errors ──────────────────────────────────────────────────

#[derive(Debug)]
pub enum InstanceError {
    Io(std::io::Error),
    Json(serde_json::Error),
    DuplicateName(String),
    UnknownVariable(String),
    /// An integer name used where a boolean literal is required, or the
    /// other way round.
    WrongKind { name: String, expected: &'static str },
    InvalidSense(String),
    Model(ModelError),
}

impl InstanceError {
    pub fn code(&self) -> &'static str {
        match self {
            InstanceError::Io(_) => "INSTANCE_IO",
            InstanceError::Json(_) => "INSTANCE_JSON",
            InstanceError::DuplicateName(_) => "INSTANCE_DUPLICATE_NAME",
            InstanceError::UnknownVariable(_) => "INSTANCE_UNKNOWN_VARIABLE",
            InstanceError::WrongKind { .. } => "INSTANCE_WRONG_KIND",
            InstanceError::InvalidSense(_) => "INSTANCE_INVALID_SENSE",
            InstanceError::Model(err) => err.code(),
        }
    }
}

impl std::fmt::Display for InstanceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstanceError::Io(err) => write!(f, "[{}] {}", self.code(), err),
            InstanceError::Json(err) => write!(f, "[{}] {}", self.code(), err),
            InstanceError::DuplicateName(name) => {
                write!(f, "[{}] Variable '{}' is declared twice", self.code(), name)
            }
            InstanceError::UnknownVariable(name) => {
                write!(f, "[{}] Unknown variable '{}'", self.code(), name)
            }
            InstanceError::WrongKind { name, expected } => {
                write!(f, "[{}] '{}' is not {}", self.code(), name, expected)
            }
            InstanceError::InvalidSense(sense) => write!(
                f,
                "[{}] Invalid sense '{}' (expected le, ge or eq)",
                self.code(),
                sense
            ),
            InstanceError::Model(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for InstanceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InstanceError::Io(err) => Some(err),
            InstanceError::Json(err) => Some(err),
            InstanceError::Model(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for InstanceError {
    fn from(err: std::io::Error) -> Self {
        InstanceError::Io(err)
    }
}

impl From<serde_json::Error> for InstanceError {
    fn from(err: serde_json::Error) -> Self {
        InstanceError::Json(err)
    }
}

impl From<ModelError> for InstanceError {
    fn from(err: ModelError) -> Self {
        InstanceError::Model(err)
    }
}

// ── Loading ─────────────────────────────────────────────────

impl Instance {
    pub fn from_path(path: &Path) -> Result<Self, InstanceError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_json(text: &str) -> Result<Self, InstanceError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Create a model holding every variable and constraint of the instance.
    pub fn build(&self, mut config: SolverConfig) -> Result<BuiltModel, InstanceError> {
        if let Some(name) = &self.name {
            config = config.with_problem_name(name.clone());
        }
        let mut model = Model::new(config)?;
        let mut names = NameTable::default();

        for name in &self.booleans {
            let var = model.create_boolean_variable(name)?;
            names.insert(name, Named::Bool(var))?;
        }
        for spec in &self.integers {
            let var = if spec.cp_only {
                model.create_cp_integer_variable(&spec.name, spec.lb, spec.ub)?
            } else {
                model.create_integer_variable(&spec.name, spec.lb, spec.ub)?
            };
            names.insert(&spec.name, Named::Int(var))?;
        }

        for spec in &self.constraints {
            match spec {
                ConstraintSpec::Linear { terms, sense, rhs } => {
                    let constraint = linear(&mut model, &names, terms, sense, *rhs)?;
                    model.add_linear(constraint)?;
                }
                ConstraintSpec::CpLinear { terms, sense, rhs } => {
                    let constraint = linear(&mut model, &names, terms, sense, *rhs)?;
                    model.add_cp_linear(constraint)?;
                }
                ConstraintSpec::Clause { literals } => {
                    let literals = literals
                        .iter()
                        .map(|name| literal(&mut model, &names, name))
                        .collect::<Result<Vec<_>, _>>()?;
                    model.add_clause(&literals)?;
                }
                ConstraintSpec::AllDifferent { vars } => {
                    let vars = vars
                        .iter()
                        .map(|name| names.int(name))
                        .collect::<Result<Vec<_>, _>>()?;
                    model.add_all_different(&vars)?;
                }
            }
        }
        let objective = names.int(&self.objective)?;

        debug!(
            component = "cli",
            operation = "build_instance",
            status = "success",
            booleans = self.booleans.len(),
            integers = self.integers.len(),
            constraints = self.constraints.len(),
            "Built model from instance"
        );
        Ok(BuiltModel {
            model,
            objective,
            booleans: self
                .booleans
                .iter()
                .map(|name| names.bool(name))
                .collect::<Result<_, _>>()?,
            integers: self
                .integers
                .iter()
                .map(|spec| names.int(&spec.name))
                .collect::<Result<_, _>>()?,
        })
    }
}

/// A model with the handles of the declared variables, in declaration order.
#[derive(Debug)]
pub struct BuiltModel {
    pub model: Model,
    pub objective: IntVar,
    pub booleans: Vec<BoolVar>,
    pub integers: Vec<IntVar>,
}

#[derive(Debug, Clone, Copy)]
enum Named {
    Bool(BoolVar),
    Int(IntVar),
}

#[derive(Debug, Default)]
struct NameTable {
    entries: BTreeMap<String, Named>,
}

impl NameTable {
    fn insert(&mut self, name: &str, var: Named) -> Result<(), InstanceError> {
        if self.entries.insert(name.to_string(), var).is_some() {
            return Err(InstanceError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Named, InstanceError> {
        self.entries
            .get(name)
            .copied()
            .ok_or_else(|| InstanceError::UnknownVariable(name.to_string()))
    }

    fn bool(&self, name: &str) -> Result<BoolVar, InstanceError> {
        match self.get(name)? {
            Named::Bool(var) => Ok(var),
            Named::Int(_) => Err(InstanceError::WrongKind {
                name: name.to_string(),
                expected: "a boolean",
            }),
        }
    }

    fn int(&self, name: &str) -> Result<IntVar, InstanceError> {
        match self.get(name)? {
            Named::Int(var) => Ok(var),
            Named::Bool(_) => Err(InstanceError::WrongKind {
                name: name.to_string(),
                expected: "an integer",
            }),
        }
    }
}

/// Boolean named by `name`, or the negation of `rest` for `!rest`.
fn literal(model: &mut Model, names: &NameTable, name: &str) -> Result<BoolVar, InstanceError> {
    match name.strip_prefix('!') {
        Some(rest) => Ok(model.negate(names.bool(rest)?)?),
        None => names.bool(name),
    }
}

fn linear(
    model: &mut Model,
    names: &NameTable,
    terms: &[(String, i64)],
    sense: &str,
    rhs: i64,
) -> Result<LinearConstraint, InstanceError> {
    let sense =
        ComparisonSense::parse(sense).ok_or_else(|| InstanceError::InvalidSense(sense.to_string()))?;
    let mut expr = LinearExpr::new();
    for (name, coeff) in terms {
        expr = if name.starts_with('!') {
            expr.plus_bool(literal(model, names, name)?, *coeff)
        } else {
            match names.get(name)? {
                Named::Bool(var) => expr.plus_bool(var, *coeff),
                Named::Int(var) => expr.plus_int(var, *coeff),
            }
        };
    }
    Ok(LinearConstraint::new(expr, sense, rhs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_core::{Method, SolveStatus};

    const DEMO: &str = r#"{
        "name": "demo",
        "booleans": ["a", "b"],
        "integers": [
            { "name": "x", "lb": 0, "ub": 10 },
            { "name": "s", "lb": 0, "ub": 3, "cp_only": true }
        ],
        "constraints": [
            { "type": "linear", "terms": [["x", 1], ["a", 5]], "sense": "ge", "rhs": 6 },
            { "type": "linear", "terms": [["x", 1], ["b", -2]], "sense": ">=", "rhs": 0 },
            { "type": "clause", "literals": ["a", "b"] },
            { "type": "cp_linear", "terms": [["s", 1], ["!a", 2]], "sense": "ge", "rhs": 1 },
            { "type": "all_different", "vars": ["x", "s"] }
        ],
        "objective": "x"
    }"#;

    #[test]
    fn parses_every_constraint_kind() {
        let instance = Instance::from_json(DEMO).unwrap();
        assert_eq!(instance.name.as_deref(), Some("demo"));
        assert_eq!(instance.booleans.len(), 2);
        assert!(instance.integers[1].cp_only);
        assert_eq!(instance.constraints.len(), 5);
        assert_eq!(
            instance.constraints[2],
            ConstraintSpec::Clause {
                literals: vec!["a".to_string(), "b".to_string()]
            }
        );
    }

    #[test]
    fn builds_and_solves() {
        let instance = Instance::from_json(DEMO).unwrap();
        let mut built = instance
            .build(SolverConfig::for_method(Method::BranchAndCut))
            .unwrap();
        assert_eq!(built.booleans.len(), 2);
        assert_eq!(built.integers.len(), 2);
        // negation of `a` was created by the cp_linear term
        assert_eq!(built.model.num_bools(), 5);

        let status = built.model.minimize(built.objective, 10.0).unwrap();
        assert_eq!(status, SolveStatus::Optimal);
        assert_eq!(built.model.int_value(built.objective).unwrap(), Some(1));
        let s = built.model.int_value(built.integers[1]).unwrap().unwrap();
        // s + 2·!a >= 1 with a true, and s differs from x
        assert!(s == 2 || s == 3);
    }

    #[test]
    fn rejects_unknown_names() {
        let instance = Instance::from_json(
            r#"{ "booleans": ["a"], "constraints": [{ "type": "clause", "literals": ["z"] }], "objective": "0" }"#,
        )
        .unwrap();
        let err = instance.build(SolverConfig::new()).unwrap_err();
        assert_eq!(err.code(), "INSTANCE_UNKNOWN_VARIABLE");
    }

    #[test]
    fn rejects_duplicates_and_wrong_kinds() {
        let duplicate = Instance::from_json(
            r#"{ "booleans": ["a"], "integers": [{ "name": "a", "lb": 0, "ub": 1 }], "objective": "a" }"#,
        )
        .unwrap();
        assert_eq!(
            duplicate.build(SolverConfig::new()).unwrap_err().code(),
            "INSTANCE_DUPLICATE_NAME"
        );

        let wrong = Instance::from_json(r#"{ "booleans": ["a"], "objective": "a" }"#).unwrap();
        let err = wrong.build(SolverConfig::new()).unwrap_err();
        assert_eq!(err.code(), "INSTANCE_WRONG_KIND");
        assert!(err.to_string().contains("an integer"));
    }

    #[test]
    fn rejects_bad_sense() {
        let instance = Instance::from_json(
            r#"{ "integers": [{ "name": "x", "lb": 0, "ub": 1 }],
                 "constraints": [{ "type": "linear", "terms": [["x", 1]], "sense": "<", "rhs": 1 }],
                 "objective": "x" }"#,
        )
        .unwrap();
        let err = instance.build(SolverConfig::new()).unwrap_err();
        assert_eq!(err.code(), "INSTANCE_INVALID_SENSE");
    }

    #[test]
    fn model_errors_keep_their_code() {
        let instance = Instance::from_json(
            r#"{ "integers": [{ "name": "x", "lb": 3, "ub": 1 }], "objective": "x" }"#,
        )
        .unwrap();
        let err = instance.build(SolverConfig::new()).unwrap_err();
        assert_eq!(err.code(), "MODEL_INVALID_BOUNDS");
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = Instance::from_json("{ \"booleans\": [").unwrap_err();
        assert_eq!(err.code(), "INSTANCE_JSON");
    }
}
