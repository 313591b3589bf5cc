#![allow(clippy::float_cmp)]

//! End-to-end solves through every method.

use tandem_core::{
    BoolVar, IntVar, LinearConstraint, LinearExpr, Method, Model, SolveStatus, SolverConfig,
};

const ALL_METHODS: [Method; 4] = [
    Method::BranchAndCut,
    Method::Decomposition,
    Method::Mip,
    Method::Cp,
];

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn new_model(method: Method) -> Model {
    Model::new(SolverConfig::for_method(method)).unwrap()
}

/// `x + 5a >= 6`, `x >= 2b`, `a ∨ b`, minimize `x`.
///
/// Optimum is `x = 1` with `a` true and `b` false.
fn choice_model(method: Method) -> (Model, BoolVar, BoolVar, IntVar) {
    let mut model = new_model(method);
    let a = model.create_boolean_variable("a").unwrap();
    let b = model.create_boolean_variable("b").unwrap();
    let x = model.create_integer_variable("x", 0, 10).unwrap();
    model
        .add_linear(LinearConstraint::ge(
            LinearExpr::int(x).plus_bool(a, 5),
            6,
        ))
        .unwrap();
    model
        .add_linear(LinearConstraint::ge(
            LinearExpr::int(x).plus_bool(b, -2),
            0,
        ))
        .unwrap();
    model.add_clause(&[a, b]).unwrap();
    (model, a, b, x)
}

/// `x + 3s >= 4` with `s` CP-only, minimize `x`.
///
/// The master never sees `s` and proposes `x = 0`. Optimum is `x = 1` with
/// `s = 1`; a subproblem search meets `x = 4` (with `s = 0`) first.
fn hidden_choice_model(config: SolverConfig) -> (Model, IntVar) {
    let mut model = Model::new(config).unwrap();
    let x = model.create_integer_variable("x", 0, 5).unwrap();
    let s = model.create_cp_integer_variable("s", 0, 1).unwrap();
    model
        .add_cp_linear(LinearConstraint::ge(
            LinearExpr::int(x).plus_int(s, 3),
            4,
        ))
        .unwrap();
    (model, x)
}

fn lp_text(model: &Model, tag: &str) -> String {
    let path = std::env::temp_dir().join(format!("tandem-{tag}-{}.lp", std::process::id()));
    model.write_lp(&path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    text
}

#[test]
fn test_branch_and_cut_single_integer() {
    init_tracing();
    let mut model = new_model(Method::BranchAndCut);
    model.create_boolean_variable("b").unwrap();
    let x = model.create_integer_variable("x", 0, 10).unwrap();

    let status = model.minimize(x, 1.0).unwrap();
    assert!(matches!(
        status,
        SolveStatus::Optimal | SolveStatus::Infeasible | SolveStatus::TimeLimit
    ));
    if status == SolveStatus::Optimal {
        let bound = model.objective_bound();
        let objective = model.objective_value();
        assert!(0.0 <= bound && bound <= objective && objective <= 10.0);
        assert_eq!(model.int_value(x).unwrap(), Some(objective as i64));
    }
}

#[test]
fn test_every_method_agrees_on_optimum() {
    init_tracing();
    for method in ALL_METHODS {
        let (mut model, a, b, x) = choice_model(method);
        let status = model.minimize(x, 10.0).unwrap();
        assert_eq!(status, SolveStatus::Optimal, "{method}");
        assert_eq!(model.objective_value(), 1.0, "{method}");
        assert_eq!(model.objective_bound(), 1.0, "{method}");
        assert_eq!(model.bool_value(a).unwrap(), Some(true), "{method}");
        assert_eq!(model.bool_value(b).unwrap(), Some(false), "{method}");
        assert_eq!(model.int_value(x).unwrap(), Some(1), "{method}");
    }
}

#[test]
fn test_negations_read_back_complemented() {
    for method in ALL_METHODS {
        let (mut model, a, b, x) = choice_model(method);
        let na = model.negate(a).unwrap();
        let nb = model.negate(b).unwrap();
        model.minimize(x, 10.0).unwrap();
        assert_eq!(model.bool_value(na).unwrap(), Some(false), "{method}");
        assert_eq!(model.bool_value(nb).unwrap(), Some(true), "{method}");
        assert_eq!(model.bool_value(BoolVar::TRUE).unwrap(), Some(true));
        assert_eq!(model.bool_value(BoolVar::FALSE).unwrap(), Some(false));
    }
}

#[test]
fn test_cp_only_integers_join_the_solution() {
    init_tracing();
    // x, s, t pairwise different with s + t <= 1 forces x = 2
    for method in [Method::BranchAndCut, Method::Decomposition, Method::Cp] {
        let mut model = new_model(method);
        let x = model.create_integer_variable("x", 0, 2).unwrap();
        let s = model.create_cp_integer_variable("s", 0, 2).unwrap();
        let t = model.create_cp_integer_variable("t", 0, 2).unwrap();
        model.add_all_different(&[x, s, t]).unwrap();
        model
            .add_cp_linear(LinearConstraint::le(
                LinearExpr::int(s).plus_int(t, 1),
                1,
            ))
            .unwrap();

        let status = model.minimize(x, 10.0).unwrap();
        assert_eq!(status, SolveStatus::Optimal, "{method}");
        assert_eq!(model.int_value(x).unwrap(), Some(2), "{method}");
        let s_value = model.int_value(s).unwrap().unwrap();
        let t_value = model.int_value(t).unwrap().unwrap();
        assert_ne!(s_value, t_value, "{method}");
        assert!(s_value + t_value <= 1, "{method}");
    }
}

#[test]
fn test_contradiction_is_infeasible_everywhere() {
    for method in ALL_METHODS {
        let mut model = new_model(method);
        let a = model.create_boolean_variable("a").unwrap();
        let na = model.negate(a).unwrap();
        let x = model.create_integer_variable("x", 0, 3).unwrap();
        model.add_clause(&[a]).unwrap();
        model.add_clause(&[na]).unwrap();

        let status = model.minimize(x, 10.0).unwrap();
        assert_eq!(status, SolveStatus::Infeasible, "{method}");
        assert_eq!(model.objective_value(), f64::INFINITY, "{method}");
        assert_eq!(model.int_value(x).unwrap(), None, "{method}");
    }
}

#[test]
fn test_resolve_with_new_objective() {
    for method in ALL_METHODS {
        let (mut model, _, _, x) = choice_model(method);
        let y = model.create_integer_variable("y", 0, 10).unwrap();
        // y >= 7 - x
        model
            .add_linear(LinearConstraint::ge(LinearExpr::int(y).plus_int(x, 1), 7))
            .unwrap();

        assert_eq!(model.minimize(x, 10.0).unwrap(), SolveStatus::Optimal);
        assert_eq!(model.objective_value(), 1.0, "{method}");

        assert_eq!(model.minimize(y, 10.0).unwrap(), SolveStatus::Optimal);
        assert_eq!(model.objective_value(), 0.0, "{method}");
        let x_value = model.int_value(x).unwrap().unwrap();
        assert!(x_value >= 7, "{method}");
    }
}

#[test]
fn test_no_transformed_handles_survive_a_solve() {
    for method in ALL_METHODS {
        let (mut model, _, _, x) = choice_model(method);
        model.minimize(x, 10.0).unwrap();
        assert!(model.census().transformed_is_empty(), "{method}");
        model.close().unwrap();
        assert!(model.census().is_empty(), "{method}");
    }
}

#[test]
fn test_timing_after_solve() {
    let (mut model, _, _, x) = choice_model(Method::Mip);
    assert_eq!(model.elapsed_cpu_time(), 0.0);
    model.minimize(x, 10.0).unwrap();
    assert!(model.run_time() >= 0.0);
    assert!(model.remaining_time() <= 10.0);
}

#[test]
fn test_decomposition_iteration_cap() {
    let config = SolverConfig::for_method(Method::Decomposition).with_max_decomposition_iterations(0);
    let mut model = Model::new(config).unwrap();
    let x = model.create_integer_variable("x", 0, 4).unwrap();
    let status = model.minimize(x, 10.0).unwrap();
    assert_eq!(status, SolveStatus::Unknown);
    assert!(model.solution().is_empty());
}

#[test]
fn test_write_lp_lists_rows() {
    let (model, _, _, _) = choice_model(Method::Mip);
    let path = std::env::temp_dir().join(format!("tandem-{}.lp", std::process::id()));
    model.write_lp(&path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert!(text.starts_with("\\ Problem: tandem"));
    assert!(text.contains("Minimize"));
    assert!(text.contains("Subject To"));
    assert!(text.contains("clause"));
    assert!(text.trim_end().ends_with("End"));
}

#[test]
fn test_decomposition_hidden_choice_optimum() {
    init_tracing();
    let (mut model, x) = hidden_choice_model(SolverConfig::for_method(Method::Decomposition));
    for _ in 0..2 {
        assert_eq!(model.minimize(x, 10.0).unwrap(), SolveStatus::Optimal);
        assert_eq!(model.objective_value(), 1.0);
        assert_eq!(model.objective_bound(), 1.0);
        assert_eq!(model.int_value(x).unwrap(), Some(1));
    }
    assert!(lp_text(&model, "optcut").contains("optcut"));
}

#[test]
fn test_decomposition_limited_subproblem_is_not_optimal() {
    init_tracing();
    let config = SolverConfig::for_method(Method::Decomposition).with_node_limit(3);
    let (mut model, x) = hidden_choice_model(config);
    let census = model.census();
    // the same answer twice: nothing learned under the limit outlives a solve
    for _ in 0..2 {
        assert_eq!(model.minimize(x, 10.0).unwrap(), SolveStatus::Feasible);
        assert_eq!(model.objective_value(), 4.0);
        assert_eq!(model.objective_bound(), 1.0);
        assert_eq!(model.int_value(x).unwrap(), Some(4));
        assert_eq!(model.census(), census);
    }
    assert!(!lp_text(&model, "boundcut").contains("boundcut"));
}

#[test]
fn test_decomposition_stops_at_node_limits() {
    init_tracing();
    // 1 node stops the master, 2 nodes stop the first subproblem empty-handed
    for limit in [1, 2] {
        let config = SolverConfig::for_method(Method::Decomposition).with_node_limit(limit);
        let (mut model, x) = hidden_choice_model(config);
        for _ in 0..2 {
            let status = model.minimize(x, 10.0).unwrap();
            assert_eq!(status, SolveStatus::Unknown, "node limit {limit}");
            assert!(model.objective_bound() <= 1.0, "node limit {limit}");
            assert_eq!(model.objective_value(), f64::INFINITY, "node limit {limit}");
            assert_eq!(model.int_value(x).unwrap(), None, "node limit {limit}");
        }
    }
}
