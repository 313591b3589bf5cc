//! Handle types and the live-handle census.

macro_rules! define_handle_type {
    ($name:ident, $prefix:literal) => {
        /// Slot index plus the generation of the record it was issued for.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name {
            slot: u32,
            generation: u32,
        }

        // not every handle type uses every constructor
        #[allow(dead_code)]
        impl $name {
            /// Get the slot index.
            pub fn inner(self) -> u32 {
                self.slot
            }

            /// First-generation handle for `slot`.
            pub(crate) fn new(slot: u32) -> Self {
                Self::from_parts(slot, 0)
            }

            pub(crate) fn from_parts(slot: u32, generation: u32) -> Self {
                Self { slot, generation }
            }

            pub(crate) fn slot(self) -> usize {
                self.slot as usize
            }

            pub(crate) fn generation(self) -> u32 {
                self.generation
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                if self.generation == 0 {
                    write!(f, concat!($prefix, "#{}"), self.slot)
                } else {
                    write!(f, concat!($prefix, "#{}.{}"), self.slot, self.generation)
                }
            }
        }
    };
}

define_handle_type!(VarHandle, "var");
define_handle_type!(ConsHandle, "cons");
define_handle_type!(ConshdlrId, "conshdlr");

/// Count of live variable columns and constraints, split by problem side.
///
/// Negation views are not counted; they live and die with their column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HandleCensus {
    pub original_vars: usize,
    pub original_conss: usize,
    pub transformed_vars: usize,
    pub transformed_conss: usize,
}

impl HandleCensus {
    /// No live handle of any kind.
    pub fn is_empty(&self) -> bool {
        self.original_vars == 0 && self.original_conss == 0 && self.transformed_is_empty()
    }

    /// No live transformed handle.
    pub fn transformed_is_empty(&self) -> bool {
        self.transformed_vars == 0 && self.transformed_conss == 0
    }
}

impl std::fmt::Display for HandleCensus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} original vars, {} original conss, {} transformed vars, {} transformed conss",
            self.original_vars, self.original_conss, self.transformed_vars, self.transformed_conss
        )
    }
}
