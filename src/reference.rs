use std::fmt::{Display, Formatter};
use std::ops::Neg;

/// Handle to a BDD node, possibly complemented.
///
/// The lowest bit stores the complement flag, the remaining bits store the node index.
/// Node `1` is the single terminal, so [`Ref::ONE`] and [`Ref::ZERO`] are its two polarities.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Ref(u32);

impl Ref {
    pub const ONE: Ref = Ref::positive(1);
    pub const ZERO: Ref = Ref::negative(1);

    pub const fn positive(index: u32) -> Self {
        Self(index << 1)
    }

    pub const fn negative(index: u32) -> Self {
        Self((index << 1) | 1)
    }

    pub const fn is_negated(self) -> bool {
        self.0 & 1 != 0
    }

    /// Index of the underlying node.
    pub const fn index(self) -> u32 {
        self.0 >> 1
    }

    /// Raw encoding, used for hashing.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Drop the complement flag.
    pub const fn regular(self) -> Self {
        Self(self.0 & !1)
    }
}

impl Neg for Ref {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(self.0 ^ 1)
    }
}

impl Display for Ref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", if self.is_negated() { "~" } else { "" }, self.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negation_flips_low_bit() {
        let r = Ref::positive(7);
        assert!(!r.is_negated());
        assert!((-r).is_negated());
        assert_eq!((-r).index(), 7);
        assert_eq!(-(-r), r);
        assert_eq!((-r).regular(), r);
    }

    #[test]
    fn test_terminals() {
        assert_eq!(-Ref::ONE, Ref::ZERO);
        assert_eq!(Ref::ZERO.index(), 1);
        assert_eq!(Ref::ONE.to_string(), "@1");
        assert_eq!(Ref::ZERO.to_string(), "~@1");
    }
}
