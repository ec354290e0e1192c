use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

/// Defines how many tasks of a run may be in flight at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Limit {
    /// There is no limit; every input is dispatched immediately.
    None,

    /// There is an upper limit.
    Max(NonZeroUsize),

    /// Use one slot per logical CPU.
    #[default]
    Default,
}

impl From<usize> for Limit {
    fn from(value: usize) -> Self {
        NonZeroUsize::new(value).map(Limit::Max).unwrap_or(Limit::None)
    }
}

impl From<NonZeroUsize> for Limit {
    fn from(value: NonZeroUsize) -> Self {
        Limit::Max(value)
    }
}

impl Limit {
    /// Resolve to a concrete window size, `None` meaning unbounded.
    pub fn resolve(self) -> Option<NonZeroUsize> {
        match self {
            Limit::None => None,
            Limit::Max(max) => Some(max),
            Limit::Default => Some(NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_usize() {
        assert_eq!(Limit::from(0), Limit::None);
        assert_eq!(Limit::from(3), Limit::Max(NonZeroUsize::new(3).unwrap()));
    }

    #[test]
    fn test_resolve() {
        assert_eq!(Limit::None.resolve(), None);
        assert_eq!(Limit::from(2).resolve(), NonZeroUsize::new(2));

        let default = Limit::Default.resolve().unwrap();
        assert_eq!(default.get(), num_cpus::get().max(1));
    }
}
