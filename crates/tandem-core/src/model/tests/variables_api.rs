use super::support::{model_for, small_model};
use super::*;

#[test]
fn test_created_variables_skip_constants() {
    let (model, a, b, x) = small_model(Method::Mip, 0, 4);
    assert_eq!(a, BoolVar::new(2));
    assert_eq!(b, BoolVar::new(3));
    assert_eq!(x, IntVar::new(1));
    assert_eq!(model.num_bools(), 4);
    assert_eq!(model.num_ints(), 2);
    assert_eq!(model.bool_name(a).unwrap(), "a");
    assert_eq!(model.int_bounds(x).unwrap(), (0, 4));
}

#[test]
fn test_find_by_name() {
    let (model, a, _, x) = small_model(Method::Cp, 0, 4);
    assert_eq!(model.find_bool("a"), Some(a));
    assert_eq!(model.find_bool("true"), Some(BoolVar::TRUE));
    assert_eq!(model.find_int("x"), Some(x));
    assert_eq!(model.find_int("missing"), None);
}

#[test]
fn test_negate_through_model() {
    let (mut model, a, _, _) = small_model(Method::BranchAndCut, 0, 1);
    let na = model.negate(a).unwrap();
    assert_eq!(model.negate(a).unwrap(), na);
    assert_eq!(model.bool_name(na).unwrap(), "~a");
    assert_eq!(
        model.negate(na).unwrap_err(),
        ModelError::NegationOfNegation(na)
    );
    assert!(model.problem_data().aliasing_is_consistent());
}

#[test]
fn test_invalid_integer_bounds() {
    let mut model = model_for(Method::Mip);
    let err = model.create_integer_variable("x", 5, 1).unwrap_err();
    assert_eq!(err.code(), "MODEL_INVALID_BOUNDS");
    assert_eq!(model.num_ints(), 1);
}

#[test]
fn test_values_before_solve_are_unknown() {
    let (model, a, _, x) = small_model(Method::Mip, 0, 4);
    assert_eq!(model.bool_value(a).unwrap(), None);
    assert_eq!(model.int_value(x).unwrap(), None);
    assert!(model.int_value(IntVar::new(9)).is_err());
}
