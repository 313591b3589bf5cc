use tandem_cp::{CpEngine, CpError, CpStatus, Literal, SearchRequest};
use tandem_solver::CpuBudget;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn budget() -> CpuBudget {
    CpuBudget::start(30.0).unwrap()
}

#[test]
fn test_minimize_linear_objective() {
    init_tracing();
    // minimize z = x + 2y subject to x + y >= 4
    let mut engine = CpEngine::new();
    let x = engine.new_int(0, 5).unwrap();
    let y = engine.new_int(0, 5).unwrap();
    let z = engine.new_int(0, 20).unwrap();
    engine.post_linear_le(&[(x, -1), (y, -1)], -4).unwrap();
    engine.post_linear_eq(&[(x, 1), (y, 2), (z, -1)], 0).unwrap();

    let outcome = engine.solve(&SearchRequest::minimize(z), &budget()).unwrap();
    assert_eq!(outcome.status, CpStatus::Optimal);
    assert_eq!(outcome.objective, Some(4));
    assert_eq!(outcome.bound, Some(4));
    let assignment = outcome.assignment.unwrap();
    assert_eq!(assignment.value(x), Some(4));
    assert_eq!(assignment.value(y), Some(0));

    // the search left the root domains alone
    assert_eq!(engine.level(), 0);
    assert_eq!(engine.bounds(y).unwrap(), (0, 5));
}

#[test]
fn test_all_different_solution() {
    let mut engine = CpEngine::new();
    let vars: Vec<_> = (0..3).map(|_| engine.new_int(1, 3).unwrap()).collect();
    engine.post_all_different(&vars).unwrap();

    let outcome = engine.solve(&SearchRequest::satisfy(), &budget()).unwrap();
    assert_eq!(outcome.status, CpStatus::Satisfied);
    let assignment = outcome.assignment.unwrap();
    let mut values: Vec<i64> = vars.iter().map(|&v| assignment.value(v).unwrap()).collect();
    values.sort_unstable();
    assert_eq!(values, vec![1, 2, 3]);
}

#[test]
fn test_pigeonhole_is_infeasible() {
    let mut engine = CpEngine::new();
    let vars: Vec<_> = (0..4).map(|_| engine.new_int(0, 2).unwrap()).collect();
    engine.post_all_different(&vars).unwrap();
    let outcome = engine.solve(&SearchRequest::satisfy(), &budget()).unwrap();
    assert_eq!(outcome.status, CpStatus::Infeasible);
    assert!(outcome.assignment.is_none());
}

#[test]
fn test_contradictory_clauses() {
    let mut engine = CpEngine::new();
    let a = engine.new_bool();
    engine.post_clause(&[a]).unwrap();
    engine.post_clause(&[a.negated()]).unwrap();
    let outcome = engine.solve(&SearchRequest::satisfy(), &budget()).unwrap();
    assert_eq!(outcome.status, CpStatus::Infeasible);
}

#[test]
fn test_assumptions_are_undone() {
    // a -> x >= 3, written as 3a - x <= 0
    let mut engine = CpEngine::new();
    let a = engine.new_bool();
    let x = engine.new_int(0, 9).unwrap();
    engine.post_linear_le(&[(a.var(), 3), (x, -1)], 0).unwrap();

    let request = SearchRequest::minimize(x).with_literal(a, true);
    let outcome = engine.solve(&request, &budget()).unwrap();
    assert_eq!(outcome.status, CpStatus::Optimal);
    assert_eq!(outcome.objective, Some(3));
    assert_eq!(outcome.assignment.unwrap().literal(a), Some(true));
    assert_eq!(engine.literal_value(a).unwrap(), None);

    let request = SearchRequest::minimize(x).with_literal(a, false);
    let outcome = engine.solve(&request, &budget()).unwrap();
    assert_eq!(outcome.objective, Some(0));
}

#[test]
fn test_failed_assumption_is_infeasible() {
    let mut engine = CpEngine::new();
    let x = engine.new_int(0, 3).unwrap();
    let request = SearchRequest::satisfy().with_assumption(x, 5, 6);
    let outcome = engine.solve(&request, &budget()).unwrap();
    assert_eq!(outcome.status, CpStatus::Infeasible);
    assert_eq!(engine.bounds(x).unwrap(), (0, 3));
}

#[test]
fn test_constant_literals_in_clauses() {
    let mut engine = CpEngine::new();
    let a = engine.new_bool();
    engine.post_clause(&[Literal::FALSE, a]).unwrap();
    let outcome = engine.solve(&SearchRequest::satisfy(), &budget()).unwrap();
    assert_eq!(outcome.assignment.unwrap().literal(a), Some(true));
}

#[test]
fn test_node_limit_without_solution() {
    init_tracing();
    let mut engine = CpEngine::new();
    let vars: Vec<_> = (0..5).map(|_| engine.new_int(0, 4).unwrap()).collect();
    engine.post_all_different(&vars).unwrap();
    let request = SearchRequest::satisfy().with_node_limit(Some(1));
    let outcome = engine.solve(&request, &budget()).unwrap();
    assert_eq!(outcome.status, CpStatus::Unknown);
    assert_eq!(outcome.nodes, 1);
}

#[test]
fn test_node_limit_keeps_root_bound() {
    init_tracing();
    // x + 3s >= 4: s = 0 is tried first and gives x = 4, the optimum is x = 1
    let mut engine = CpEngine::new();
    let x = engine.new_int(0, 5).unwrap();
    let s = engine.new_int(0, 1).unwrap();
    engine.post_linear_le(&[(x, -1), (s, -3)], -4).unwrap();

    let limited = SearchRequest::minimize(x).with_node_limit(Some(3));
    let outcome = engine.solve(&limited, &budget()).unwrap();
    assert_eq!(outcome.status, CpStatus::Satisfied);
    assert_eq!(outcome.objective, Some(4));
    assert_eq!(outcome.bound, Some(1));

    let outcome = engine.solve(&SearchRequest::minimize(x), &budget()).unwrap();
    assert_eq!(outcome.status, CpStatus::Optimal);
    assert_eq!(outcome.objective, Some(1));
}

#[test]
fn test_unknown_objective_variable() {
    let mut engine = CpEngine::new();
    let mut other = CpEngine::new();
    let foreign = (0..5).map(|_| other.new_int(0, 1).unwrap()).last().unwrap();
    let err = engine
        .solve(&SearchRequest::minimize(foreign), &budget())
        .unwrap_err();
    assert!(matches!(err, CpError::InvalidVar(_)));
}
