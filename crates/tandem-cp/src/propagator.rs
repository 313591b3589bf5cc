//! Propagators over interval domains.

use crate::var::{CpIntVar, Literal};
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub(crate) enum Propagator {
    /// `Σ coeff * var <= rhs`
    LinearLe {
        terms: Vec<(CpIntVar, i64)>,
        rhs: i64,
    },
    /// At least one literal holds.
    Clause { literals: Vec<Literal> },
    /// Pairwise distinct values.
    AllDifferent { vars: Vec<CpIntVar> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tightening {
    Lower(CpIntVar, i64),
    Upper(CpIntVar, i64),
}

/// Propagator found the current domains inconsistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Conflict;

impl Propagator {
    pub(crate) fn vars(&self) -> Vec<CpIntVar> {
        match self {
            Propagator::LinearLe { terms, .. } => terms.iter().map(|&(var, _)| var).collect(),
            Propagator::Clause { literals } => literals.iter().map(|lit| lit.var()).collect(),
            Propagator::AllDifferent { vars } => vars.clone(),
        }
    }

    /// Push the bound changes implied by the current domains onto `out`.
    pub(crate) fn run(
        &self,
        domains: &[(i64, i64)],
        out: &mut Vec<Tightening>,
    ) -> Result<(), Conflict> {
        match self {
            Propagator::LinearLe { terms, rhs } => linear_le(terms, *rhs, domains, out),
            Propagator::Clause { literals } => clause(literals, domains, out),
            Propagator::AllDifferent { vars } => all_different(vars, domains, out),
        }
    }
}

fn linear_le(
    terms: &[(CpIntVar, i64)],
    rhs: i64,
    domains: &[(i64, i64)],
    out: &mut Vec<Tightening>,
) -> Result<(), Conflict> {
    let rhs = i128::from(rhs);
    let min_activity: i128 = terms
        .iter()
        .map(|&(var, coeff)| term_min(coeff, domains[var.index()]))
        .sum();
    if min_activity > rhs {
        return Err(Conflict);
    }
    for &(var, coeff) in terms {
        let (lb, ub) = domains[var.index()];
        let slack = rhs - (min_activity - term_min(coeff, (lb, ub)));
        let coeff = i128::from(coeff);
        if coeff > 0 {
            let bound = slack.div_euclid(coeff);
            if bound < i128::from(ub) {
                out.push(Tightening::Upper(var, clamp(bound)));
            }
        } else {
            // coeff * x <= slack  <=>  x >= ceil(slack / coeff)
            let bound = -(slack.div_euclid(-coeff));
            if bound > i128::from(lb) {
                out.push(Tightening::Lower(var, clamp(bound)));
            }
        }
    }
    Ok(())
}

fn term_min(coeff: i64, (lb, ub): (i64, i64)) -> i128 {
    let coeff = i128::from(coeff);
    if coeff > 0 {
        coeff * i128::from(lb)
    } else {
        coeff * i128::from(ub)
    }
}

fn clamp(value: i128) -> i64 {
    value.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

fn clause(
    literals: &[Literal],
    domains: &[(i64, i64)],
    out: &mut Vec<Tightening>,
) -> Result<(), Conflict> {
    let mut open = None;
    let mut open_count = 0;
    for &lit in literals {
        let (lb, ub) = domains[lit.var().index()];
        if lb == ub {
            if lit.holds_for(lb) {
                return Ok(());
            }
            continue;
        }
        open_count += 1;
        open = Some(lit);
    }
    match (open_count, open) {
        (0, _) => Err(Conflict),
        (1, Some(lit)) if lit.is_positive() => {
            out.push(Tightening::Lower(lit.var(), 1));
            Ok(())
        }
        (1, Some(lit)) => {
            out.push(Tightening::Upper(lit.var(), 0));
            Ok(())
        }
        _ => Ok(()),
    }
}

fn all_different(
    vars: &[CpIntVar],
    domains: &[(i64, i64)],
    out: &mut Vec<Tightening>,
) -> Result<(), Conflict> {
    let mut fixed = BTreeSet::new();
    for &var in vars {
        let (lb, ub) = domains[var.index()];
        if lb == ub && !fixed.insert(lb) {
            return Err(Conflict);
        }
    }

    let low = vars.iter().map(|v| domains[v.index()].0).min();
    let high = vars.iter().map(|v| domains[v.index()].1).max();
    if let (Some(low), Some(high)) = (low, high) {
        let span = i128::from(high) - i128::from(low) + 1;
        if span < vars.len() as i128 {
            return Err(Conflict);
        }
    }

    for &var in vars {
        let (lb, ub) = domains[var.index()];
        if lb == ub {
            continue;
        }
        let mut new_lb = lb;
        while new_lb <= ub && fixed.contains(&new_lb) {
            new_lb += 1;
        }
        let mut new_ub = ub;
        while new_ub >= new_lb && fixed.contains(&new_ub) {
            new_ub -= 1;
        }
        if new_lb > new_ub {
            return Err(Conflict);
        }
        if new_lb != lb {
            out.push(Tightening::Lower(var, new_lb));
        }
        if new_ub != ub {
            out.push(Tightening::Upper(var, new_ub));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(i: u32) -> CpIntVar {
        CpIntVar::new(i)
    }

    #[test]
    fn linear_tightens_upper_and_lower() {
        // x - 2y <= -1 with x in [0,10], y in [0,3]
        let prop = Propagator::LinearLe {
            terms: vec![(var(0), 1), (var(1), -2)],
            rhs: -1,
        };
        let mut out = Vec::new();
        prop.run(&[(0, 10), (0, 3)], &mut out).unwrap();
        assert_eq!(
            out,
            vec![Tightening::Upper(var(0), 5), Tightening::Lower(var(1), 1)]
        );
    }

    #[test]
    fn linear_detects_conflict() {
        let prop = Propagator::LinearLe {
            terms: vec![(var(0), 1)],
            rhs: 2,
        };
        assert_eq!(prop.run(&[(3, 4)], &mut Vec::new()), Err(Conflict));
    }

    #[test]
    fn clause_unit_propagates() {
        let a = Literal::positive(var(1));
        let b = Literal::positive(var(2)).negated();
        let prop = Propagator::Clause {
            literals: vec![a, b],
        };
        let mut out = Vec::new();
        prop.run(&[(1, 1), (0, 0), (0, 1)], &mut out).unwrap();
        assert_eq!(out, vec![Tightening::Upper(var(2), 0)]);

        assert_eq!(
            prop.run(&[(1, 1), (0, 0), (1, 1)], &mut Vec::new()),
            Err(Conflict)
        );
    }

    #[test]
    fn empty_clause_is_a_conflict() {
        let prop = Propagator::Clause {
            literals: Vec::new(),
        };
        assert_eq!(prop.run(&[], &mut Vec::new()), Err(Conflict));
    }

    #[test]
    fn all_different_shaves_fixed_values() {
        let prop = Propagator::AllDifferent {
            vars: vec![var(0), var(1), var(2)],
        };
        let mut out = Vec::new();
        prop.run(&[(1, 1), (1, 3), (0, 3)], &mut out).unwrap();
        assert_eq!(out, vec![Tightening::Lower(var(1), 2)]);
    }

    #[test]
    fn all_different_pigeonhole() {
        let prop = Propagator::AllDifferent {
            vars: vec![var(0), var(1), var(2)],
        };
        assert_eq!(
            prop.run(&[(0, 1), (0, 1), (0, 1)], &mut Vec::new()),
            Err(Conflict)
        );
    }
}
