use super::Logic;
use crate::error::{Result, SimError};
use bitvec::{order::Lsb0, view::BitView};
use smallvec::SmallVec;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Widest bus a [Value] can carry.
pub const MAX_WIDTH: usize = 64;

/// Validated number of bits of a bus, between 1 and [MAX_WIDTH].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct BitWidth(u8);

impl BitWidth {
    /// Width of a single wire.
    pub const ONE: BitWidth = BitWidth(1);

    /// Returns a new [BitWidth], fails if `width` is 0 or larger than [MAX_WIDTH].
    pub fn new(width: usize) -> Result<BitWidth> {
        if width == 0 || width > MAX_WIDTH {
            return Err(SimError::InvalidWidth {
                width,
                max: MAX_WIDTH,
            });
        }
        Ok(BitWidth(width as u8))
    }

    #[inline(always)]
    pub fn get(self) -> usize {
        self.0 as usize
    }

    /// Returns a mask with the lowest `self` bits set.
    pub fn mask(self) -> u64 {
        if self.get() == 64 {
            u64::MAX
        } else {
            (1 << self.get()) - 1
        }
    }
}

impl Display for BitWidth {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Amount of bits kept inline before a [Value] spills into the heap.
const VALUE_INLINE_BITS: usize = 8;

/// Immutable fixed width vector of [Logic] bits, bit 0 is the least significant.
///
/// Every operation returns a new [Value]. Operations between values of different
/// widths fail with [SimError::WidthMismatch] instead of coercing.
///
/// # Example
/// ```
/// # use logicprop::{Value, BitWidth, Logic};
/// let a: Value = "10z1".parse().unwrap();
/// let b = Value::from_u64(0b1001, BitWidth::new(4).unwrap());
///
/// assert_eq!(a.merge(&b).unwrap().to_string(), "1001");
/// assert_eq!(a.bit(1), Some(Logic::Z));
/// assert_eq!(b.to_u64(), Some(9));
/// assert!(a.merge(&Value::zero(BitWidth::ONE)).is_err());
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Value {
    bits: SmallVec<[Logic; VALUE_INLINE_BITS]>,
}

impl Value {
    /// Returns a [Value] of `width` bits, all set to `logic`.
    pub fn filled(logic: Logic, width: BitWidth) -> Value {
        Value {
            bits: SmallVec::from_elem(logic, width.get()),
        }
    }

    /// All bits [Logic::X], the value of a net that has never been resolved.
    pub fn unknown(width: BitWidth) -> Value {
        Self::filled(Logic::X, width)
    }

    /// All bits [Logic::Z], the value of a net without drivers.
    pub fn floating(width: BitWidth) -> Value {
        Self::filled(Logic::Z, width)
    }

    /// All bits [Logic::Error].
    pub fn error(width: BitWidth) -> Value {
        Self::filled(Logic::Error, width)
    }

    pub fn zero(width: BitWidth) -> Value {
        Self::filled(Logic::Zero, width)
    }

    /// Single bit [Value].
    pub fn single(logic: Logic) -> Value {
        Self::filled(logic, BitWidth::ONE)
    }

    /// Single bit [Value] from a bool.
    pub fn bool(b: bool) -> Value {
        Self::single(Logic::from_bool(b))
    }

    /// Returns a [Value] with the lowest `width` bits of `value`.
    ///
    /// Missing high bits are 0, excess bits are dropped.
    pub fn from_u64(value: u64, width: BitWidth) -> Value {
        Value {
            bits: value.view_bits::<Lsb0>()[..width.get()]
                .iter()
                .by_vals()
                .map(Logic::from_bool)
                .collect(),
        }
    }

    /// Returns a [Value] from `bits`, least significant first.
    ///
    /// Fails if there are no bits or more than [MAX_WIDTH].
    pub fn from_bits<I: IntoIterator<Item = Logic>>(bits: I) -> Result<Value> {
        let bits: SmallVec<[Logic; VALUE_INLINE_BITS]> = bits.into_iter().collect();
        BitWidth::new(bits.len())?;
        Ok(Value { bits })
    }

    /// Like [Value::from_bits] but checks the number of bits against a declared `width`.
    pub fn with_width<I: IntoIterator<Item = Logic>>(width: BitWidth, bits: I) -> Result<Value> {
        let value = Self::from_bits(bits)?;
        value.check_width(width)?;
        Ok(value)
    }

    pub fn width(&self) -> BitWidth {
        // Construction guarantees 1..=MAX_WIDTH bits.
        BitWidth(self.bits.len() as u8)
    }

    /// Returns the bit at `index` or None if `index` >= width.
    pub fn bit(&self, index: usize) -> Option<Logic> {
        self.bits.get(index).copied()
    }

    /// Returns the bits, least significant first.
    pub fn bits(&self) -> &[Logic] {
        &self.bits
    }

    /// Fails with [SimError::WidthMismatch] if `self` isn't `width` bits wide.
    pub fn check_width(&self, width: BitWidth) -> Result<()> {
        if self.width() != width {
            return Err(SimError::WidthMismatch {
                expected: width.get(),
                actual: self.bits.len(),
            });
        }
        Ok(())
    }

    fn zip_with<F: Fn(Logic, Logic) -> Logic>(&self, other: &Value, f: F) -> Result<Value> {
        other.check_width(self.width())?;
        Ok(Value {
            bits: self
                .bits
                .iter()
                .zip(other.bits.iter())
                .map(|(a, b)| f(*a, *b))
                .collect(),
        })
    }

    /// Bitwise [Logic::merge], used to resolve several drivers of a net.
    pub fn merge(&self, other: &Value) -> Result<Value> {
        self.zip_with(other, Logic::merge)
    }

    pub fn and(&self, other: &Value) -> Result<Value> {
        self.zip_with(other, Logic::and)
    }

    pub fn or(&self, other: &Value) -> Result<Value> {
        self.zip_with(other, Logic::or)
    }

    pub fn xor(&self, other: &Value) -> Result<Value> {
        self.zip_with(other, Logic::xor)
    }

    pub fn not(&self) -> Value {
        Value {
            bits: self.bits.iter().map(|b| b.not()).collect(),
        }
    }

    /// Returns a new [Value] with `self` in the low bits and `high` above it.
    pub fn concat(&self, high: &Value) -> Result<Value> {
        Self::from_bits(self.bits.iter().chain(high.bits.iter()).copied())
    }

    /// Returns bits `start..start + len` of `self`.
    pub fn extract(&self, start: usize, len: usize) -> Result<Value> {
        let end = match start.checked_add(len) {
            Some(end) if len > 0 && end <= self.bits.len() => end,
            end => {
                return Err(SimError::BitRange {
                    start,
                    end: end.unwrap_or(usize::MAX),
                    width: self.bits.len(),
                })
            }
        };
        Self::from_bits(self.bits[start..end].iter().copied())
    }

    /// Replaces every floating bit with `pull`.
    pub fn pulled(&self, pull: Logic) -> Value {
        Value {
            bits: self
                .bits
                .iter()
                .map(|b| if *b == Logic::Z { pull } else { *b })
                .collect(),
        }
    }

    /// Replaces every unknown or floating bit with `fill`, error bits are kept.
    pub fn defined_or(&self, fill: Logic) -> Value {
        Value {
            bits: self
                .bits
                .iter()
                .map(|b| match b {
                    Logic::X | Logic::Z => fill,
                    other => *other,
                })
                .collect(),
        }
    }

    /// Returns true if every bit is [Logic::Zero] or [Logic::One].
    pub fn is_fully_defined(&self) -> bool {
        self.bits.iter().all(|b| b.is_defined())
    }

    /// Returns true if any bit is [Logic::Error].
    pub fn has_error(&self) -> bool {
        self.bits.contains(&Logic::Error)
    }

    /// Returns the bits as an integer if the value is [fully defined](Value::is_fully_defined).
    pub fn to_u64(&self) -> Option<u64> {
        let mut out = 0u64;
        let view = out.view_bits_mut::<Lsb0>();
        for (i, bit) in self.bits.iter().enumerate() {
            view.set(i, bit.to_bool()?);
        }
        Some(out)
    }

    /// Returns true if every bit of `self` equals the corresponding bit of `expected`,
    /// [Logic::X] bits in `expected` match anything.
    pub fn matches(&self, expected: &Value) -> bool {
        self.width() == expected.width()
            && self
                .bits
                .iter()
                .zip(expected.bits.iter())
                .all(|(a, e)| *e == Logic::X || a == e)
    }
}

impl From<Logic> for Value {
    fn from(logic: Logic) -> Self {
        Value::single(logic)
    }
}

/// Most significant bit first, the same format [FromStr] accepts.
impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for bit in self.bits.iter().rev() {
            write!(f, "{}", bit)?;
        }
        Ok(())
    }
}

/// Parses a string of `0`, `1`, `x`, `z` and `E` characters, most significant first.
/// `_` can be used as a separator.
impl FromStr for Value {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Value> {
        let mut bits = SmallVec::<[Logic; VALUE_INLINE_BITS]>::new();
        for c in s.chars().rev().filter(|c| *c != '_') {
            match Logic::from_char(c) {
                Some(bit) => bits.push(bit),
                None => {
                    return Err(SimError::ParseValue {
                        input: s.into(),
                        reason: format!("unexpected character `{}`", c),
                    })
                }
            }
        }
        Self::from_bits(bits).map_err(|e| SimError::ParseValue {
            input: s.into(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::convert::TryFrom;

    fn w(n: usize) -> BitWidth {
        BitWidth::new(n).unwrap()
    }

    fn value_strategy(width: usize) -> impl Strategy<Value = Value> {
        proptest::collection::vec(0u8..5, width).prop_map(|raw| {
            Value::from_bits(raw.into_iter().map(|b| Logic::try_from(b).unwrap())).unwrap()
        })
    }

    proptest! {
        #[test]
        fn prop_merge_commutes(a in value_strategy(6), b in value_strategy(6)) {
            prop_assert_eq!(a.merge(&b).unwrap(), b.merge(&a).unwrap());
        }

        #[test]
        fn prop_merge_associates(a in value_strategy(6), b in value_strategy(6), c in value_strategy(6)) {
            let left = a.merge(&b).unwrap().merge(&c).unwrap();
            let right = a.merge(&b.merge(&c).unwrap()).unwrap();
            prop_assert_eq!(left, right);
        }

        #[test]
        fn prop_merge_idempotent_and_absorbing(a in value_strategy(6)) {
            prop_assert_eq!(a.merge(&a).unwrap(), a.clone());
            prop_assert_eq!(a.merge(&Value::error(w(6))).unwrap(), Value::error(w(6)));
        }

        #[test]
        fn prop_u64_round_trip(n in any::<u64>(), width in 1usize..=64) {
            let v = Value::from_u64(n, w(width));
            prop_assert_eq!(v.to_u64(), Some(n & w(width).mask()));
        }
    }

    #[test]
    fn test_width_validation() {
        assert!(BitWidth::new(0).is_err());
        assert!(BitWidth::new(65).is_err());
        assert_eq!(BitWidth::new(64).unwrap().mask(), u64::MAX);
        assert_eq!(
            Value::with_width(w(3), vec![Logic::One; 2]),
            Err(SimError::WidthMismatch {
                expected: 3,
                actual: 2
            })
        );
        assert!(Value::from_bits(Vec::new()).is_err());
    }

    #[test]
    fn test_from_u64_truncates() {
        assert_eq!(Value::from_u64(0b1_0110, w(4)).to_string(), "0110");
        assert_eq!(Value::from_u64(1, w(3)).to_string(), "001");
    }

    #[test]
    fn test_ops() {
        let a: Value = "1100".parse().unwrap();
        let b: Value = "1z10".parse().unwrap();
        assert_eq!(a.and(&b).unwrap().to_string(), "1x00");
        assert_eq!(a.or(&b).unwrap().to_string(), "1110");
        assert_eq!(a.xor(&b).unwrap().to_string(), "0x10");
        assert_eq!(b.not().to_string(), "0x01");
        assert_eq!(a.merge(&b).unwrap().to_string(), "11E0");
        assert!(a.and(&Value::bool(true)).is_err());
    }

    #[test]
    fn test_concat_extract() {
        let low: Value = "01".parse().unwrap();
        let high: Value = "1x".parse().unwrap();
        let both = low.concat(&high).unwrap();
        assert_eq!(both.to_string(), "1x01");
        assert_eq!(both.extract(2, 2).unwrap(), high);
        assert_eq!(both.extract(0, 2).unwrap(), low);
        assert!(both.extract(3, 2).is_err());
        assert!(both.extract(0, 0).is_err());
        assert_eq!(
            both.extract(usize::MAX, 2),
            Err(SimError::BitRange {
                start: usize::MAX,
                end: usize::MAX,
                width: 4
            })
        );
        assert!(Value::zero(w(64)).concat(&low).is_err());
    }

    #[test]
    fn test_defined() {
        assert!(Value::from_u64(5, w(3)).is_fully_defined());
        assert!(!"10x".parse::<Value>().unwrap().is_fully_defined());
        assert!(!"1z0".parse::<Value>().unwrap().is_fully_defined());
        assert!("1E0".parse::<Value>().unwrap().has_error());
        assert_eq!("1z0".parse::<Value>().unwrap().to_u64(), None);
    }

    #[test]
    fn test_pulled_and_matches() {
        let v: Value = "z1z".parse().unwrap();
        assert_eq!(v.pulled(Logic::Zero).to_string(), "010");
        let expected: Value = "x10".parse().unwrap();
        assert!(v.pulled(Logic::Zero).matches(&expected));
        assert!(!v.matches(&expected));
        let mixed: Value = "xzE1".parse().unwrap();
        assert_eq!(mixed.defined_or(Logic::Zero).to_string(), "00E1");
    }

    #[test]
    fn test_parse_errors() {
        assert!("10q".parse::<Value>().is_err());
        assert!("".parse::<Value>().is_err());
        assert_eq!("1_0000_0001".parse::<Value>().unwrap().to_u64(), Some(257));
    }
}
