//! Custom constraint handlers consulted during branch-and-bound.

use crate::error::MipError;
use crate::handle::VarHandle;
use std::collections::HashMap;

/// Result of a propagation round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    Unchanged,
    Reduced,
    Infeasible,
}

impl Propagation {
    /// Combine two rounds; infeasibility dominates, then any reduction.
    pub fn merge(self, other: Propagation) -> Propagation {
        match (self, other) {
            (Propagation::Infeasible, _) | (_, Propagation::Infeasible) => Propagation::Infeasible,
            (Propagation::Reduced, _) | (_, Propagation::Reduced) => Propagation::Reduced,
            _ => Propagation::Unchanged,
        }
    }
}

/// Enforces constraints the engine treats as opaque.
///
/// `propagate` runs at every node after the linear rows reached a fixpoint;
/// `check` runs on every complete assignment before it becomes an incumbent.
pub trait ConstraintHandler<P> {
    /// Registered constraint handler name this handler serves.
    fn name(&self) -> &str;

    fn propagate(&mut self, node: &mut NodeDomains<'_, P>) -> Result<Propagation, MipError>;

    fn check(&mut self, node: &NodeDomains<'_, P>) -> Result<bool, MipError>;
}

/// Position of every transformed handle in the node domain vector.
#[derive(Debug, Default)]
pub(crate) struct ColumnMap {
    slots: HashMap<VarHandle, (usize, bool)>,
}

impl ColumnMap {
    pub(crate) fn insert(&mut self, var: VarHandle, index: usize, negated: bool) {
        self.slots.insert(var, (index, negated));
    }

    pub(crate) fn get(&self, var: VarHandle) -> Option<(usize, bool)> {
        self.slots.get(&var).copied()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (VarHandle, usize, bool)> + '_ {
        self.slots
            .iter()
            .map(|(&var, &(index, negated))| (var, index, negated))
    }
}

/// Local bounds of the node being processed, addressed by transformed handle.
pub struct NodeDomains<'a, P> {
    payload: Option<&'a P>,
    columns: &'a ColumnMap,
    domains: &'a mut [(i64, i64)],
    depth: u32,
}

impl<'a, P> NodeDomains<'a, P> {
    pub(crate) fn new(
        payload: Option<&'a P>,
        columns: &'a ColumnMap,
        domains: &'a mut [(i64, i64)],
        depth: u32,
    ) -> Self {
        Self {
            payload,
            columns,
            domains,
            depth,
        }
    }

    /// Working copy of the problem payload.
    pub fn payload(&self) -> Option<&'a P> {
        self.payload
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Local bounds of a transformed variable or negation view.
    pub fn bounds(&self, var: VarHandle) -> Option<(i64, i64)> {
        let (index, negated) = self.columns.get(var)?;
        let (lb, ub) = self.domains[index];
        Some(if negated { (1 - ub, 1 - lb) } else { (lb, ub) })
    }

    /// Value of a fixed variable.
    pub fn value(&self, var: VarHandle) -> Option<i64> {
        self.bounds(var)
            .and_then(|(lb, ub)| (lb == ub).then_some(lb))
    }

    /// True when every column is fixed.
    pub fn is_complete(&self) -> bool {
        self.domains.iter().all(|&(lb, ub)| lb == ub)
    }

    /// Intersect the local domain of `var` with `[lb, ub]`.
    pub fn tighten(&mut self, var: VarHandle, lb: i64, ub: i64) -> Result<Propagation, MipError> {
        let (index, negated) = self.columns.get(var).ok_or(MipError::InvalidVar(var))?;
        let (lb, ub) = if negated { (1 - ub, 1 - lb) } else { (lb, ub) };
        let (old_lb, old_ub) = self.domains[index];
        let new_lb = old_lb.max(lb);
        let new_ub = old_ub.min(ub);
        if new_lb > new_ub {
            return Ok(Propagation::Infeasible);
        }
        if (new_lb, new_ub) == (old_lb, old_ub) {
            return Ok(Propagation::Unchanged);
        }
        self.domains[index] = (new_lb, new_ub);
        Ok(Propagation::Reduced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> ColumnMap {
        let mut map = ColumnMap::default();
        map.insert(VarHandle::new(0), 0, false);
        map.insert(VarHandle::new(1), 0, true);
        map.insert(VarHandle::new(2), 1, false);
        map
    }

    #[test]
    fn merge_ranks_outcomes() {
        use Propagation::*;
        assert_eq!(Unchanged.merge(Unchanged), Unchanged);
        assert_eq!(Unchanged.merge(Reduced), Reduced);
        assert_eq!(Reduced.merge(Infeasible), Infeasible);
    }

    #[test]
    fn negation_views_read_complemented_bounds() {
        let map = columns();
        let mut domains = vec![(1, 1), (0, 9)];
        let node: NodeDomains<'_, ()> = NodeDomains::new(None, &map, &mut domains, 0);
        assert_eq!(node.value(VarHandle::new(0)), Some(1));
        assert_eq!(node.value(VarHandle::new(1)), Some(0));
        assert_eq!(node.bounds(VarHandle::new(2)), Some((0, 9)));
        assert_eq!(node.bounds(VarHandle::new(7)), None);
        assert!(!node.is_complete());
    }

    #[test]
    fn tighten_through_view() {
        let map = columns();
        let mut domains = vec![(0, 1), (0, 9)];
        let mut node: NodeDomains<'_, ()> = NodeDomains::new(None, &map, &mut domains, 0);
        assert_eq!(
            node.tighten(VarHandle::new(1), 1, 1).unwrap(),
            Propagation::Reduced
        );
        assert_eq!(node.value(VarHandle::new(0)), Some(0));
        assert_eq!(
            node.tighten(VarHandle::new(2), 0, 20).unwrap(),
            Propagation::Unchanged
        );
        assert_eq!(
            node.tighten(VarHandle::new(0), 1, 1).unwrap(),
            Propagation::Infeasible
        );
        assert!(node.tighten(VarHandle::new(5), 0, 0).is_err());
    }
}
