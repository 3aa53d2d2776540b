use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt::{self, Display, Formatter};
use strum_macros::EnumIter;

/// State of a single bit.
///
/// Resolution of several drivers is a join over the chain `Z < X < {0, 1} < Error`:
/// a floating driver yields to everything, an unknown driver yields to a defined one,
/// two different defined drivers produce [Logic::Error], and [Logic::Error] absorbs everything.
///
/// # Example
/// ```
/// # use logicprop::Logic;
/// assert_eq!(Logic::Z.merge(Logic::One), Logic::One);
/// assert_eq!(Logic::X.merge(Logic::Zero), Logic::Zero);
/// assert_eq!(Logic::Zero.merge(Logic::One), Logic::Error);
/// assert_eq!(Logic::Error.merge(Logic::Z), Logic::Error);
/// ```
#[repr(u8)]
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, IntoPrimitive, TryFromPrimitive, EnumIter,
)]
pub enum Logic {
    Zero = 0,
    One,
    /// Unknown or not yet set.
    X,
    /// Floating, nobody drives it.
    Z,
    /// Conflicting drivers.
    Error,
}
use Logic::*;

impl Logic {
    /// Position in the resolution chain.
    #[inline(always)]
    fn strength(self) -> u8 {
        match self {
            Z => 0,
            X => 1,
            Zero | One => 2,
            Error => 3,
        }
    }

    /// Resolves two drivers of the same bit.
    #[inline(always)]
    pub fn merge(self, other: Logic) -> Logic {
        if self == other {
            return self;
        }
        let (a, b) = (self.strength(), other.strength());
        if a > b {
            self
        } else if b > a {
            other
        } else {
            // Only 0 against 1 can tie.
            Error
        }
    }

    /// Returns [Logic::One] for true and [Logic::Zero] for false.
    pub fn from_bool(b: bool) -> Logic {
        if b {
            One
        } else {
            Zero
        }
    }

    /// Returns Some(bool) if `self` is [Logic::Zero] or [Logic::One], None otherwise.
    pub fn to_bool(self) -> Option<bool> {
        match self {
            Zero => Some(false),
            One => Some(true),
            X | Z | Error => None,
        }
    }

    /// Returns true if `self` is [Logic::Zero] or [Logic::One].
    pub fn is_defined(self) -> bool {
        matches!(self, Zero | One)
    }

    /// Returns the value a gate input observes, a floating input reads as unknown.
    #[inline(always)]
    pub fn read(self) -> Logic {
        match self {
            Z => X,
            other => other,
        }
    }

    #[inline(always)]
    pub fn not(self) -> Logic {
        match self.read() {
            Zero => One,
            One => Zero,
            other => other,
        }
    }

    /// Zero dominates, then Error, then X.
    #[inline(always)]
    pub fn and(self, other: Logic) -> Logic {
        match (self.read(), other.read()) {
            (Zero, _) | (_, Zero) => Zero,
            (Error, _) | (_, Error) => Error,
            (One, One) => One,
            _ => X,
        }
    }

    /// One dominates, then Error, then X.
    #[inline(always)]
    pub fn or(self, other: Logic) -> Logic {
        match (self.read(), other.read()) {
            (One, _) | (_, One) => One,
            (Error, _) | (_, Error) => Error,
            (Zero, Zero) => Zero,
            _ => X,
        }
    }

    #[inline(always)]
    pub fn xor(self, other: Logic) -> Logic {
        match (self.read(), other.read()) {
            (Error, _) | (_, Error) => Error,
            (a, b) => match (a.to_bool(), b.to_bool()) {
                (Some(a), Some(b)) => Logic::from_bool(a ^ b),
                _ => X,
            },
        }
    }

    /// Returns the character used to display `self`: `0`, `1`, `x`, `z` or `E`.
    pub fn to_char(self) -> char {
        match self {
            Zero => '0',
            One => '1',
            X => 'x',
            Z => 'z',
            Error => 'E',
        }
    }

    /// Inverse of [Logic::to_char], case insensitive.
    pub fn from_char(c: char) -> Option<Logic> {
        match c {
            '0' => Some(Zero),
            '1' => Some(One),
            'x' | 'X' => Some(X),
            'z' | 'Z' => Some(Z),
            'e' | 'E' => Some(Error),
            _ => None,
        }
    }
}

impl From<bool> for Logic {
    fn from(b: bool) -> Self {
        Logic::from_bool(b)
    }
}

impl Default for Logic {
    fn default() -> Self {
        X
    }
}

impl Display for Logic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_merge_laws() {
        for a in Logic::iter() {
            assert_eq!(a.merge(a), a, "idempotent {}", a);
            assert_eq!(a.merge(Error), Error, "absorbing {}", a);
            assert_eq!(a.merge(Z), a, "identity {}", a);
            for b in Logic::iter() {
                assert_eq!(a.merge(b), b.merge(a), "commutative {} {}", a, b);
                for c in Logic::iter() {
                    assert_eq!(
                        a.merge(b).merge(c),
                        a.merge(b.merge(c)),
                        "associative {} {} {}",
                        a,
                        b,
                        c
                    );
                }
            }
        }
    }

    #[test]
    fn test_merge_table() {
        assert_eq!(One.merge(One), One);
        assert_eq!(One.merge(Zero), Error);
        assert_eq!(X.merge(One), One);
        assert_eq!(X.merge(Z), X);
    }

    #[test]
    fn test_gates() {
        assert_eq!(Zero.and(X), Zero);
        assert_eq!(One.and(Z), X);
        assert_eq!(One.and(Error), Error);
        assert_eq!(Zero.and(Error), Zero);
        assert_eq!(One.or(Error), One);
        assert_eq!(Zero.or(Z), X);
        assert_eq!(One.xor(One), Zero);
        assert_eq!(One.xor(X), X);
        assert_eq!(Error.xor(X), Error);
        assert_eq!(Z.not(), X);
        assert_eq!(Error.not(), Error);
    }

    #[test]
    fn test_chars() {
        for l in Logic::iter() {
            assert_eq!(Logic::from_char(l.to_char()), Some(l));
        }
        assert_eq!(Logic::from_char('q'), None);
    }

    #[test]
    fn test_primitive() {
        assert_eq!(u8::from(Error), 4);
        assert_eq!(Logic::try_from(3u8).ok(), Some(Z));
        assert!(Logic::try_from(5u8).is_err());
    }
}
