use super::*;

pub(super) fn model_for(method: Method) -> Model {
    Model::new(SolverConfig::for_method(method)).unwrap()
}

/// Model with booleans `a`, `b` and an integer `x` in `[lb, ub]`.
pub(super) fn small_model(method: Method, lb: i64, ub: i64) -> (Model, BoolVar, BoolVar, IntVar) {
    let mut model = model_for(method);
    let a = model.create_boolean_variable("a").unwrap();
    let b = model.create_boolean_variable("b").unwrap();
    let x = model.create_integer_variable("x", lb, ub).unwrap();
    (model, a, b, x)
}
