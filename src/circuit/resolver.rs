use crate::error::Result;
use crate::signal::{BitWidth, Logic, Value};

/// Resolves the values asserted by every driver of a net into the single value the whole net carries.
///
/// Drivers are merged bit by bit, see [Logic::merge]. A net without drivers floats. If the net
/// is pulled, floating bits take the `pull` value afterwards. Readers of the net aren't
/// drivers and don't take part.
///
/// # Example
/// ```
/// # use logicprop::{resolve, Value, BitWidth, Logic};
/// let w = BitWidth::new(2).unwrap();
/// let a: Value = "1z".parse().unwrap();
/// let b: Value = "zz".parse().unwrap();
///
/// assert_eq!(resolve(w, None, [&a, &b].iter().copied()).unwrap().to_string(), "1z");
/// assert_eq!(resolve(w, Some(Logic::Zero), [&a, &b].iter().copied()).unwrap().to_string(), "10");
/// assert_eq!(resolve(w, None, std::iter::empty()).unwrap(), Value::floating(w));
/// ```
pub fn resolve<'a, I: IntoIterator<Item = &'a Value>>(
    width: BitWidth,
    pull: Option<Logic>,
    drivers: I,
) -> Result<Value> {
    let mut resolved = Value::floating(width);
    for driver in drivers {
        resolved = resolved.merge(driver)?;
    }
    Ok(match pull {
        Some(pull) => resolved.pulled(pull),
        None => resolved,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Value {
        s.parse().unwrap()
    }

    #[test]
    fn test_single_driver_unchanged() {
        for s in &["0", "1", "x", "z", "E", "10xzE"] {
            let value = v(s);
            assert_eq!(resolve(value.width(), None, Some(&value)).unwrap(), value);
        }
    }

    #[test]
    fn test_agreeing_and_conflicting_drivers() {
        let w = BitWidth::new(2).unwrap();
        assert_eq!(resolve(w, None, &[v("11"), v("11")]).unwrap(), v("11"));
        assert_eq!(resolve(w, None, &[v("11"), v("10")]).unwrap(), v("1E"));
        assert_eq!(resolve(w, None, &[v("1x"), v("z1")]).unwrap(), v("11"));
        assert_eq!(resolve(w, None, &[v("xz"), v("zz")]).unwrap(), v("xz"));
    }

    #[test]
    fn test_pull() {
        let w = BitWidth::new(3).unwrap();
        assert_eq!(resolve(w, Some(Logic::One), &[v("z0z")]).unwrap(), v("101"));
        assert_eq!(resolve(w, Some(Logic::One), std::iter::empty()).unwrap(), v("111"));
        assert_eq!(resolve(w, Some(Logic::Zero), &[v("x1E")]).unwrap(), v("x1E"));
    }

    #[test]
    fn test_width_mismatch() {
        assert!(resolve(BitWidth::ONE, None, &[v("10")]).is_err());
    }
}
