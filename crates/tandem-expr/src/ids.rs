macro_rules! define_id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Get the inner u32 value.
            pub const fn inner(self) -> u32 {
                self.0
            }

            /// Create an ID from a u32 value.
            pub const fn new(value: u32) -> Self {
                Self(value)
            }

            /// Position of this id in its owning table.
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

define_id_type!(
    /// Index into the boolean variable table of a model.
    BoolVar
);
define_id_type!(
    /// Index into the integer variable table of a model.
    IntVar
);

impl BoolVar {
    /// The constant-false sentinel, always at index 0.
    pub const FALSE: BoolVar = BoolVar(0);
    /// The constant-true sentinel, always at index 1.
    pub const TRUE: BoolVar = BoolVar(1);

    /// Whether this id is one of the two constant sentinels.
    pub const fn is_constant(self) -> bool {
        self.0 <= 1
    }
}

impl IntVar {
    /// The constant-zero sentinel, always at index 0.
    pub const ZERO: IntVar = IntVar(0);
}

#[cfg(test)]
mod tests {
    use super::{BoolVar, IntVar};

    #[test]
    fn bool_var_roundtrip() {
        let id = BoolVar::new(7);
        assert_eq!(id.inner(), 7);
        assert_eq!(id.index(), 7);
    }

    #[test]
    fn int_var_roundtrip() {
        let id = IntVar::new(11);
        assert_eq!(id.inner(), 11);
    }

    #[test]
    fn sentinels() {
        assert_eq!(BoolVar::FALSE.index(), 0);
        assert_eq!(BoolVar::TRUE.index(), 1);
        assert!(BoolVar::TRUE.is_constant());
        assert!(!BoolVar::new(2).is_constant());
        assert_eq!(IntVar::ZERO.index(), 0);
    }

    #[test]
    fn display_names_the_kind() {
        assert_eq!(BoolVar::new(3).to_string(), "BoolVar(3)");
        assert_eq!(IntVar::new(4).to_string(), "IntVar(4)");
    }
}
