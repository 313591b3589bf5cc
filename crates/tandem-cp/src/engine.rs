//! Variables, domains, trail and the propagation queue.

use crate::error::CpError;
use crate::propagator::{Conflict, Propagator, Tightening};
use crate::var::{CpIntVar, Literal};
use std::collections::{BTreeMap, VecDeque};
use tracing::trace;

pub struct CpEngine {
    domains: Vec<(i64, i64)>,
    boolean: Vec<bool>,
    propagators: Vec<Propagator>,
    watches: Vec<Vec<usize>>,
    queue: VecDeque<usize>,
    queued: Vec<bool>,
    /// Previous domains, restored on backtrack.
    trail: Vec<(CpIntVar, (i64, i64))>,
    /// Trail length at each pushed level.
    levels: Vec<usize>,
}

impl Default for CpEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CpEngine {
    pub fn new() -> Self {
        Self {
            // CpIntVar::ONE, the base of Literal::TRUE / Literal::FALSE
            domains: vec![(1, 1)],
            boolean: vec![true],
            propagators: Vec::new(),
            watches: vec![Vec::new()],
            queue: VecDeque::new(),
            queued: Vec::new(),
            trail: Vec::new(),
            levels: Vec::new(),
        }
    }

    // ── Variables ───────────────────────────────────────────

    /// New 0/1 variable, returned as its positive literal.
    pub fn new_bool(&mut self) -> Literal {
        let var = self.push_var((0, 1), true);
        Literal::positive(var)
    }

    pub fn new_int(&mut self, lb: i64, ub: i64) -> Result<CpIntVar, CpError> {
        if lb > ub {
            return Err(CpError::InvalidBounds { lb, ub });
        }
        Ok(self.push_var((lb, ub), false))
    }

    fn push_var(&mut self, domain: (i64, i64), boolean: bool) -> CpIntVar {
        let var = CpIntVar::new(self.domains.len() as u32);
        self.domains.push(domain);
        self.boolean.push(boolean);
        self.watches.push(Vec::new());
        var
    }

    /// Number of variables, including the built-in constant.
    pub fn num_vars(&self) -> usize {
        self.domains.len()
    }

    pub fn num_propagators(&self) -> usize {
        self.propagators.len()
    }

    pub fn bounds(&self, var: CpIntVar) -> Result<(i64, i64), CpError> {
        self.domains
            .get(var.index())
            .copied()
            .ok_or(CpError::InvalidVar(var))
    }

    pub fn is_fixed(&self, var: CpIntVar) -> Result<bool, CpError> {
        let (lb, ub) = self.bounds(var)?;
        Ok(lb == ub)
    }

    /// Truth value of a literal, `None` while its variable is unfixed.
    pub fn literal_value(&self, lit: Literal) -> Result<Option<bool>, CpError> {
        let (lb, ub) = self.bounds(lit.var())?;
        Ok((lb == ub).then(|| lit.holds_for(lb)))
    }

    pub fn is_boolean(&self, var: CpIntVar) -> Result<bool, CpError> {
        self.boolean
            .get(var.index())
            .copied()
            .ok_or(CpError::InvalidVar(var))
    }

    // ── Constraints ─────────────────────────────────────────

    /// `Σ coeff * var <= rhs`
    pub fn post_linear_le(&mut self, terms: &[(CpIntVar, i64)], rhs: i64) -> Result<(), CpError> {
        let terms = self.merged_terms(terms)?;
        self.post(Propagator::LinearLe { terms, rhs });
        Ok(())
    }

    /// `Σ coeff * var == rhs`
    pub fn post_linear_eq(&mut self, terms: &[(CpIntVar, i64)], rhs: i64) -> Result<(), CpError> {
        let terms = self.merged_terms(terms)?;
        let negated = terms.iter().map(|&(var, coeff)| (var, -coeff)).collect();
        let neg_rhs = rhs.checked_neg().ok_or(CpError::InvalidBounds { lb: rhs, ub: rhs })?;
        self.post(Propagator::LinearLe { terms, rhs });
        self.post(Propagator::LinearLe {
            terms: negated,
            rhs: neg_rhs,
        });
        Ok(())
    }

    /// At least one literal holds. An empty clause makes the model infeasible.
    pub fn post_clause(&mut self, literals: &[Literal]) -> Result<(), CpError> {
        for lit in literals {
            if !self.is_boolean(lit.var())? {
                return Err(CpError::NotBoolean(lit.var()));
            }
        }
        self.post(Propagator::Clause {
            literals: literals.to_vec(),
        });
        Ok(())
    }

    pub fn post_all_different(&mut self, vars: &[CpIntVar]) -> Result<(), CpError> {
        for &var in vars {
            self.bounds(var)?;
        }
        self.post(Propagator::AllDifferent {
            vars: vars.to_vec(),
        });
        Ok(())
    }

    fn merged_terms(&self, terms: &[(CpIntVar, i64)]) -> Result<Vec<(CpIntVar, i64)>, CpError> {
        let mut merged: BTreeMap<CpIntVar, i64> = BTreeMap::new();
        for &(var, coeff) in terms {
            self.bounds(var)?;
            let slot = merged.entry(var).or_insert(0);
            *slot = slot
                .checked_add(coeff)
                .ok_or(CpError::InvalidBounds { lb: coeff, ub: coeff })?;
        }
        Ok(merged.into_iter().filter(|&(_, coeff)| coeff != 0).collect())
    }

    fn post(&mut self, propagator: Propagator) {
        let index = self.propagators.len();
        for var in propagator.vars() {
            let watchers = &mut self.watches[var.index()];
            if watchers.last() != Some(&index) {
                watchers.push(index);
            }
        }
        self.propagators.push(propagator);
        self.queued.push(false);
        self.enqueue(index);
    }

    // ── Trail ───────────────────────────────────────────────

    pub fn level(&self) -> usize {
        self.levels.len()
    }

    pub fn push_level(&mut self) {
        self.levels.push(self.trail.len());
    }

    /// Undo every domain change made since the matching `push_level`.
    pub fn pop_level(&mut self) -> Result<(), CpError> {
        let mark = self.levels.pop().ok_or(CpError::NoLevel)?;
        while self.trail.len() > mark {
            if let Some((var, domain)) = self.trail.pop() {
                self.domains[var.index()] = domain;
            }
        }
        self.clear_queue();
        Ok(())
    }

    /// Pop levels until `level` is the current one.
    pub fn backtrack_to(&mut self, level: usize) -> Result<(), CpError> {
        while self.level() > level {
            self.pop_level()?;
        }
        Ok(())
    }

    // ── Domain updates ──────────────────────────────────────

    /// Raise the lower bound. Returns whether the domain changed.
    pub fn set_lb(&mut self, var: CpIntVar, value: i64) -> Result<bool, CpError> {
        self.bounds(var)?;
        self.update(var, value, i64::MAX)
            .map_err(|Conflict| CpError::Conflict)
    }

    /// Lower the upper bound. Returns whether the domain changed.
    pub fn set_ub(&mut self, var: CpIntVar, value: i64) -> Result<bool, CpError> {
        self.bounds(var)?;
        self.update(var, i64::MIN, value)
            .map_err(|Conflict| CpError::Conflict)
    }

    /// Intersect the domain with `[lb, ub]`.
    pub fn restrict(&mut self, var: CpIntVar, lb: i64, ub: i64) -> Result<bool, CpError> {
        self.bounds(var)?;
        self.update(var, lb, ub).map_err(|Conflict| CpError::Conflict)
    }

    pub fn assign_literal(&mut self, lit: Literal, value: bool) -> Result<bool, CpError> {
        let target = if value {
            lit.true_value()
        } else {
            1 - lit.true_value()
        };
        self.restrict(lit.var(), target, target)
    }

    /// Run queued propagators to a fixpoint.
    pub fn propagate(&mut self) -> Result<(), CpError> {
        let mut buffer = Vec::new();
        while let Some(index) = self.queue.pop_front() {
            self.queued[index] = false;
            buffer.clear();
            let outcome = self.propagators[index].run(&self.domains, &mut buffer);
            let applied = outcome.and_then(|()| {
                for tightening in buffer.drain(..) {
                    match tightening {
                        Tightening::Lower(var, value) => self.update(var, value, i64::MAX)?,
                        Tightening::Upper(var, value) => self.update(var, i64::MIN, value)?,
                    };
                }
                Ok(())
            });
            if applied.is_err() {
                self.clear_queue();
                trace!(
                    component = "cp",
                    operation = "propagate",
                    status = "conflict",
                    propagator = index,
                    level = self.level(),
                    "Propagation conflict"
                );
                return Err(CpError::Conflict);
            }
        }
        Ok(())
    }

    /// Queue every propagator and run them to a fixpoint.
    pub fn propagate_all(&mut self) -> Result<(), CpError> {
        self.enqueue_all();
        self.propagate()
    }

    /// Queue every propagator for the next `propagate`.
    pub(crate) fn enqueue_all(&mut self) {
        for index in 0..self.propagators.len() {
            self.enqueue(index);
        }
    }

    pub(crate) fn domains(&self) -> &[(i64, i64)] {
        &self.domains
    }

    fn update(&mut self, var: CpIntVar, lb: i64, ub: i64) -> Result<bool, Conflict> {
        let (old_lb, old_ub) = self.domains[var.index()];
        let new = (old_lb.max(lb), old_ub.min(ub));
        if new.0 > new.1 {
            return Err(Conflict);
        }
        if new == (old_lb, old_ub) {
            return Ok(false);
        }
        if !self.levels.is_empty() {
            self.trail.push((var, (old_lb, old_ub)));
        }
        self.domains[var.index()] = new;
        for i in 0..self.watches[var.index()].len() {
            let watcher = self.watches[var.index()][i];
            self.enqueue(watcher);
        }
        Ok(true)
    }

    fn enqueue(&mut self, index: usize) {
        if !self.queued[index] {
            self.queued[index] = true;
            self.queue.push_back(index);
        }
    }

    fn clear_queue(&mut self) {
        for index in self.queue.drain(..) {
            self.queued[index] = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_literals() {
        let engine = CpEngine::new();
        assert_eq!(engine.literal_value(Literal::TRUE).unwrap(), Some(true));
        assert_eq!(engine.literal_value(Literal::FALSE).unwrap(), Some(false));
    }

    #[test]
    fn new_int_validates_bounds() {
        let mut engine = CpEngine::new();
        assert_eq!(
            engine.new_int(4, 2),
            Err(CpError::InvalidBounds { lb: 4, ub: 2 })
        );
        let x = engine.new_int(-3, 7).unwrap();
        assert_eq!(engine.bounds(x).unwrap(), (-3, 7));
        assert!(!engine.is_boolean(x).unwrap());
    }

    #[test]
    fn levels_restore_domains() {
        let mut engine = CpEngine::new();
        let x = engine.new_int(0, 10).unwrap();
        engine.push_level();
        assert!(engine.set_lb(x, 4).unwrap());
        assert!(!engine.set_lb(x, 2).unwrap());
        engine.push_level();
        engine.set_ub(x, 6).unwrap();
        assert_eq!(engine.bounds(x).unwrap(), (4, 6));
        engine.pop_level().unwrap();
        assert_eq!(engine.bounds(x).unwrap(), (4, 10));
        engine.pop_level().unwrap();
        assert_eq!(engine.bounds(x).unwrap(), (0, 10));
        assert_eq!(engine.pop_level(), Err(CpError::NoLevel));
    }

    #[test]
    fn wipe_out_leaves_domain_untouched() {
        let mut engine = CpEngine::new();
        let x = engine.new_int(0, 3).unwrap();
        assert_eq!(engine.set_lb(x, 5), Err(CpError::Conflict));
        assert_eq!(engine.bounds(x).unwrap(), (0, 3));
    }

    #[test]
    fn negated_literal_shares_domain() {
        let mut engine = CpEngine::new();
        let b = engine.new_bool();
        engine.assign_literal(b.negated(), true).unwrap();
        assert_eq!(engine.literal_value(b).unwrap(), Some(false));
        assert_eq!(engine.literal_value(b.negated()).unwrap(), Some(true));
    }

    #[test]
    fn propagation_reaches_fixpoint() {
        // x + y == 4, y >= 3, x >= 1  ->  x = 1, y = 3
        let mut engine = CpEngine::new();
        let x = engine.new_int(0, 10).unwrap();
        let y = engine.new_int(0, 10).unwrap();
        engine.post_linear_eq(&[(x, 1), (y, 1)], 4).unwrap();
        engine.set_lb(y, 3).unwrap();
        engine.set_lb(x, 1).unwrap();
        engine.propagate().unwrap();
        assert_eq!(engine.bounds(x).unwrap(), (1, 1));
        assert_eq!(engine.bounds(y).unwrap(), (3, 3));
    }

    #[test]
    fn posting_validates_variables() {
        let mut engine = CpEngine::new();
        let x = engine.new_int(0, 5).unwrap();
        assert_eq!(
            engine.post_clause(&[Literal::positive(x)]),
            Err(CpError::NotBoolean(x))
        );
        let err = engine.post_all_different(&[x, CpIntVar::new(99)]);
        assert_eq!(err, Err(CpError::InvalidVar(CpIntVar::new(99))));
        assert_eq!(engine.num_propagators(), 0);
    }

    #[test]
    fn conflict_clears_the_queue() {
        let mut engine = CpEngine::new();
        let a = engine.new_bool();
        let b = engine.new_bool();
        engine.post_clause(&[a, b]).unwrap();
        engine.propagate().unwrap();

        engine.push_level();
        engine.assign_literal(a, false).unwrap();
        engine.assign_literal(b, false).unwrap();
        assert_eq!(engine.propagate(), Err(CpError::Conflict));
        engine.pop_level().unwrap();
        assert_eq!(engine.literal_value(a).unwrap(), None);

        engine.push_level();
        engine.assign_literal(a, false).unwrap();
        engine.propagate().unwrap();
        assert_eq!(engine.literal_value(b).unwrap(), Some(true));
        engine.pop_level().unwrap();
    }
}
