use crate::component::{Attributes, Component, InstanceData, Outputs, Port};
use crate::error::{Result, SimError};
use crate::signal::{BitWidth, Logic, Value};
use num_integer::div_ceil;
use std::ops::Range;
use strum_macros::{Display, EnumString};

/// Direction a [Splitter] moves bits in.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum SplitMode {
    /// One combined input `combined`, one output per range `out0`, `out1`...
    Split,
    /// One input per range `in0`, `in1`..., one combined output `combined`.
    Join,
}

/// Fans a bus out into smaller buses, or gathers them back.
///
/// Each end covers a range of bits of the combined bus. When joining, bits no end covers
/// float and overlapping ends are merged like drivers of a net.
///
/// # Example
/// ```
/// # use logicprop::{Component, Splitter, SplitMode, BitWidth};
/// let split = Splitter::even(SplitMode::Split, BitWidth::new(8).unwrap(), 3).unwrap();
///
/// let out = split.propagate(&["1100_1010".parse().unwrap()], None).unwrap();
/// let ends: Vec<String> = out.iter().map(|v| v.to_string()).collect();
/// assert_eq!(ends, vec!["010", "001", "11"]);
/// ```
#[derive(Debug, Clone)]
pub struct Splitter {
    mode: SplitMode,
    width: BitWidth,
    ranges: Vec<Range<usize>>,
    ports: Vec<Port>,
}

impl Splitter {
    /// Returns a new splitter over a `width` bits bus with one end per range.
    pub fn new(mode: SplitMode, width: BitWidth, ranges: Vec<Range<usize>>) -> Result<Splitter> {
        if ranges.is_empty() {
            return Err(SimError::Attribute {
                name: "fanout".into(),
                reason: "a splitter needs at least one end".into(),
            });
        }
        let mut ports = Vec::with_capacity(ranges.len() + 1);
        let combined = match mode {
            SplitMode::Split => Port::input("combined", width),
            SplitMode::Join => Port::output("combined", width),
        };
        ports.push(combined);
        for (i, range) in ranges.iter().enumerate() {
            if range.start >= range.end || range.end > width.get() {
                return Err(SimError::BitRange {
                    start: range.start,
                    end: range.end,
                    width: width.get(),
                });
            }
            let end_width = BitWidth::new(range.len())?;
            ports.push(match mode {
                SplitMode::Split => Port::output(format!("out{}", i), end_width),
                SplitMode::Join => Port::input(format!("in{}", i), end_width),
            });
        }
        Ok(Splitter {
            mode,
            width,
            ranges,
            ports,
        })
    }

    /// Spreads `width` bits over `fanout` ends as evenly as possible, lower ends get the extra bits.
    pub fn even(mode: SplitMode, width: BitWidth, fanout: usize) -> Result<Splitter> {
        if fanout == 0 || fanout > width.get() {
            return Err(SimError::Attribute {
                name: "fanout".into(),
                reason: format!("can't spread {} bits over {} ends", width, fanout),
            });
        }
        let bound = |i: usize| div_ceil(i * width.get(), fanout);
        let ranges = (0..fanout).map(|i| bound(i)..bound(i + 1)).collect();
        Self::new(mode, width, ranges)
    }

    /// Builds an evenly spread splitter from the `mode`, `width` and `fanout` attributes.
    ///
    /// Without a `fanout` the bus is split into single bits.
    pub fn from_attributes(attributes: &Attributes) -> Result<Splitter> {
        let mode = match attributes.text("mode")? {
            None => SplitMode::Split,
            Some(mode) => mode.parse().map_err(|_| SimError::Attribute {
                name: "mode".into(),
                reason: format!("expected split or join, got `{}`", mode),
            })?,
        };
        let width = attributes.width()?;
        let fanout = attributes.int_or("fanout", width.get() as u64)? as usize;
        Self::even(mode, width, fanout)
    }

    pub fn mode(&self) -> SplitMode {
        self.mode
    }

    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }
}

impl Component for Splitter {
    fn kind(&self) -> &str {
        "splitter"
    }

    fn ports(&self) -> &[Port] {
        &self.ports
    }

    fn propagate(&self, inputs: &[Value], _data: Option<&mut InstanceData>) -> Result<Outputs> {
        let expected = match self.mode {
            SplitMode::Split => 1,
            SplitMode::Join => self.ranges.len(),
        };
        if inputs.len() != expected {
            return Err(SimError::ArityMismatch {
                component: self.kind().into(),
                expected,
                actual: inputs.len(),
            });
        }
        match self.mode {
            SplitMode::Split => {
                let combined = &inputs[0];
                combined.check_width(self.width)?;
                self.ranges
                    .iter()
                    .map(|range| combined.extract(range.start, range.len()))
                    .collect()
            }
            SplitMode::Join => {
                let mut bits = vec![Logic::Z; self.width.get()];
                for (input, range) in inputs.iter().zip(&self.ranges) {
                    input.check_width(BitWidth::new(range.len())?)?;
                    for (bit, value) in bits[range.clone()].iter_mut().zip(input.bits()) {
                        *bit = bit.merge(*value);
                    }
                }
                Ok(smallvec::smallvec![Value::from_bits(bits)?])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(n: usize) -> BitWidth {
        BitWidth::new(n).unwrap()
    }

    #[test]
    fn test_even() {
        let s = Splitter::even(SplitMode::Split, w(4), 3).unwrap();
        assert_eq!(s.ranges(), &[0..2, 2..3, 3..4]);
        let s = Splitter::even(SplitMode::Split, w(10), 4).unwrap();
        assert_eq!(s.ranges(), &[0..3, 3..5, 5..8, 8..10]);
        let s = Splitter::even(SplitMode::Join, w(8), 8).unwrap();
        assert!(s.ranges().iter().all(|r| r.len() == 1));
        assert!(Splitter::even(SplitMode::Split, w(2), 3).is_err());
        assert!(Splitter::even(SplitMode::Split, w(2), 0).is_err());
    }

    #[test]
    fn test_join() {
        let s = Splitter::new(SplitMode::Join, w(4), vec![0..1, 2..4, 1..2]).unwrap();
        let out = s
            .propagate(&["1".parse().unwrap(), "0z".parse().unwrap(), "0".parse().unwrap()], None)
            .unwrap();
        assert_eq!(out[0].to_string(), "0z01");
    }

    #[test]
    fn test_join_overlap_and_gaps() {
        let s = Splitter::new(SplitMode::Join, w(3), vec![0..1, 0..1]).unwrap();
        let out = s
            .propagate(&["1".parse().unwrap(), "0".parse().unwrap()], None)
            .unwrap();
        assert_eq!(out[0].to_string(), "zzE");
    }

    #[test]
    fn test_invalid() {
        assert!(Splitter::new(SplitMode::Split, w(4), vec![2..5]).is_err());
        assert!(Splitter::new(SplitMode::Split, w(4), vec![2..2]).is_err());
        assert!(Splitter::new(SplitMode::Split, w(4), vec![]).is_err());
        let s = Splitter::from_attributes(&Attributes::new().with("width", 4usize)).unwrap();
        assert_eq!(s.mode(), SplitMode::Split);
        assert!(s.propagate(&["101".parse().unwrap()], None).is_err());
        assert!(Splitter::from_attributes(&Attributes::new().with("mode", "merge")).is_err());
    }
}
