//! Variable ids and boolean literal views.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct CpIntVar(u32);

impl CpIntVar {
    /// Built-in variable fixed to 1, the base of the constant literals.
    pub(crate) const ONE: CpIntVar = CpIntVar(0);

    pub fn inner(self) -> u32 {
        self.0
    }

    pub(crate) fn new(value: u32) -> Self {
        Self(value)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for CpIntVar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cp#{}", self.0)
    }
}

/// A 0/1 variable read as `var == 1` (positive) or `var == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Literal {
    var: CpIntVar,
    positive: bool,
}

impl Literal {
    pub const TRUE: Literal = Literal {
        var: CpIntVar::ONE,
        positive: true,
    };
    pub const FALSE: Literal = Literal {
        var: CpIntVar::ONE,
        positive: false,
    };

    pub(crate) fn positive(var: CpIntVar) -> Self {
        Self {
            var,
            positive: true,
        }
    }

    pub fn var(self) -> CpIntVar {
        self.var
    }

    pub fn is_positive(self) -> bool {
        self.positive
    }

    /// The complementary view on the same variable.
    pub fn negated(self) -> Self {
        Self {
            var: self.var,
            positive: !self.positive,
        }
    }

    /// Variable value that makes this literal true.
    pub fn true_value(self) -> i64 {
        i64::from(self.positive)
    }

    /// Truth of the literal for a value of its variable.
    pub fn holds_for(self, value: i64) -> bool {
        value == self.true_value()
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.positive {
            write!(f, "{}", self.var)
        } else {
            write!(f, "!{}", self.var)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_share_one_variable() {
        assert_eq!(Literal::TRUE.var(), Literal::FALSE.var());
        assert_eq!(Literal::TRUE.negated(), Literal::FALSE);
        assert!(Literal::TRUE.holds_for(1));
        assert!(Literal::FALSE.holds_for(0));
    }

    #[test]
    fn negation_is_involutive() {
        let lit = Literal::positive(CpIntVar::new(4));
        assert_eq!(lit.negated().negated(), lit);
        assert_eq!(lit.negated().true_value(), 0);
        assert_eq!(lit.negated().to_string(), "!cp#4");
    }
}
