//! CPU-time budget.
//!
//! A budget records the process CPU clock when a solve starts. Searches poll
//! [`CpuBudget::is_exhausted`] between nodes; nothing is ever interrupted.

use crate::SolverError;
use cpu_time::ProcessTime;
use std::time::Duration;

pub struct CpuBudget {
    start: ProcessTime,
    limit: f64,
}

impl CpuBudget {
    /// Start measuring against a limit of `limit` CPU seconds.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::InvalidTimeLimit`] unless `limit > 0`, and
    /// [`SolverError::CpuClockUnavailable`] if the clock cannot be read.
    pub fn start(limit: f64) -> Result<Self, SolverError> {
        if limit.is_nan() || limit <= 0.0 {
            return Err(SolverError::InvalidTimeLimit(limit));
        }
        let start = ProcessTime::try_now()
            .map_err(|err| SolverError::CpuClockUnavailable(err.to_string()))?;
        Ok(Self { start, limit })
    }

    /// The limit in CPU seconds.
    pub fn limit(&self) -> f64 {
        self.limit
    }

    /// CPU seconds used since [`CpuBudget::start`].
    ///
    /// A clock failure after a successful start reads as an exhausted budget.
    pub fn elapsed(&self) -> f64 {
        match ProcessTime::try_now() {
            Ok(now) => now.duration_since(self.start).as_secs_f64(),
            Err(_) => Duration::MAX.as_secs_f64(),
        }
    }

    /// `limit - elapsed`; negative once the budget is overrun.
    pub fn remaining(&self) -> f64 {
        self.limit - self.elapsed()
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() <= 0.0
    }
}

impl std::fmt::Debug for CpuBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuBudget")
            .field("limit", &self.limit)
            .field("elapsed", &self.elapsed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_limits() {
        assert_eq!(
            CpuBudget::start(0.0).unwrap_err(),
            SolverError::InvalidTimeLimit(0.0)
        );
        assert!(CpuBudget::start(-3.0).is_err());
        assert!(CpuBudget::start(f64::NAN).is_err());
    }

    #[test]
    fn fresh_budget_has_time_left() {
        let budget = CpuBudget::start(60.0).unwrap();
        assert_eq!(budget.limit(), 60.0);
        assert!(budget.elapsed() >= 0.0);
        assert!(budget.remaining() <= 60.0);
        assert!(!budget.is_exhausted());
    }

    #[test]
    fn burning_cpu_advances_the_clock() {
        let budget = CpuBudget::start(1e-9).unwrap();
        let mut acc = 0u64;
        for i in 0..1_000_000_000u64 {
            acc = acc.wrapping_mul(31).wrapping_add(i);
            if i % 1024 == 0 && budget.is_exhausted() {
                break;
            }
        }
        assert!(acc != 1 || budget.is_exhausted());
        assert!(budget.is_exhausted());
    }

    #[test]
    fn debug_reports_limit() {
        let budget = CpuBudget::start(5.0).unwrap();
        assert!(format!("{budget:?}").contains("limit: 5.0"));
    }
}
