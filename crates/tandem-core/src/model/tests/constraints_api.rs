use super::support::{model_for, small_model};
use super::*;
use tandem_expr::{LinearConstraint, LinearExpr};

#[test]
fn test_linear_adds_one_mip_row() {
    let (mut model, a, b, x) = small_model(Method::Mip, 0, 10);
    let before = model.mip.problem_conss().len();
    let expr = LinearExpr::int(x).plus_bool(a, 2).plus_bool(b, -1);
    model.add_linear(LinearConstraint::ge(expr, 3)).unwrap();
    assert_eq!(model.mip.problem_conss().len(), before + 1);
    let cons = model.mip.problem_conss()[before];
    // the problem holds the only reference
    assert_eq!(model.mip.cons_refs(cons).unwrap(), 1);
}

#[test]
fn test_linear_rejects_cp_only_integer() {
    let mut model = model_for(Method::Cp);
    let s = model.create_cp_integer_variable("s", 0, 3).unwrap();
    let err = model
        .add_linear(LinearConstraint::le(LinearExpr::int(s), 2))
        .unwrap_err();
    assert_eq!(err, ModelError::UnboundIntVar(s));
    // the CP-only form accepts it
    model
        .add_cp_linear(LinearConstraint::le(LinearExpr::int(s), 2))
        .unwrap();
}

#[test]
fn test_cp_only_constraints_rejected_in_mip_mode() {
    let (mut model, _, _, x) = small_model(Method::Mip, 0, 3);
    let y = model.create_integer_variable("y", 0, 3).unwrap();
    let err = model.add_all_different(&[x, y]).unwrap_err();
    assert_eq!(
        err,
        ModelError::UnsupportedConstraint {
            method: Method::Mip,
            constraint: "all_different",
        }
    );
    assert!(model
        .add_cp_linear(LinearConstraint::le(LinearExpr::int(x), 1))
        .is_err());
}

#[test]
fn test_cp_only_constraints_accepted_elsewhere() {
    for method in [Method::BranchAndCut, Method::Decomposition, Method::Cp] {
        let (mut model, _, _, x) = small_model(method, 0, 3);
        let y = model.create_integer_variable("y", 0, 3).unwrap();
        let propagators = model.cp.num_propagators();
        model.add_all_different(&[x, y]).unwrap();
        assert_eq!(model.cp.num_propagators(), propagators + 1);
    }
}

#[test]
fn test_clause_accepts_negations() {
    let (mut model, a, b, _) = small_model(Method::BranchAndCut, 0, 1);
    let nb = model.negate(b).unwrap();
    let before = model.mip.problem_conss().len();
    model.add_clause(&[a, nb]).unwrap();
    assert_eq!(model.mip.problem_conss().len(), before + 1);
}

#[test]
fn test_indicator_table() {
    let (mut model, a, _, x) = small_model(Method::Mip, 0, 3);
    assert_eq!(model.set_indicator(x, 2, a).unwrap(), None);
    assert_eq!(model.indicator(x, 2).unwrap(), Some(a));
    assert_eq!(model.indicator(x, 3).unwrap(), None);
}

#[test]
fn test_constraints_on_closed_model() {
    let (mut model, a, _, _) = small_model(Method::Mip, 0, 1);
    model.close().unwrap();
    assert_eq!(model.add_clause(&[a]).unwrap_err(), ModelError::Closed);
}
