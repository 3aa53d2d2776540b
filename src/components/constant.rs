use crate::component::{AttrValue, Attributes, Component, InstanceData, Outputs, Port};
use crate::error::Result;
use crate::signal::Value;
use smallvec::smallvec;

/// Drives a fixed value on its only port, `out`.
#[derive(Debug, Clone)]
pub struct Constant {
    value: Value,
    ports: [Port; 1],
}

impl Constant {
    pub fn new(value: Value) -> Constant {
        Constant {
            ports: [Port::output("out", value.width())],
            value,
        }
    }

    /// Builds a constant from the `value` attribute, either a value string or an integer
    /// truncated to the `width` attribute.
    pub fn from_attributes(attributes: &Attributes) -> Result<Constant> {
        let width = attributes.width()?;
        let value = match attributes.get("value") {
            Some(AttrValue::Int(i)) => Value::from_u64(*i, width),
            _ => attributes
                .value("value")?
                .unwrap_or_else(|| Value::zero(width)),
        };
        Ok(Constant::new(value))
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl Component for Constant {
    fn kind(&self) -> &str {
        "constant"
    }

    fn ports(&self) -> &[Port] {
        &self.ports
    }

    fn propagate(&self, _inputs: &[Value], _data: Option<&mut InstanceData>) -> Result<Outputs> {
        Ok(smallvec![self.value.clone()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::BitWidth;

    #[test]
    fn test_constant() {
        let c = Constant::new("1x0".parse().unwrap());
        assert_eq!(c.ports()[0].width, BitWidth::new(3).unwrap());
        assert_eq!(c.propagate(&[], None).unwrap()[0].to_string(), "1x0");
    }

    #[test]
    fn test_from_attributes() {
        let attrs = Attributes::new().with("width", 4usize).with("value", 10u64);
        assert_eq!(Constant::from_attributes(&attrs).unwrap().value().to_string(), "1010");

        let attrs = Attributes::new().with("value", "zz1");
        assert_eq!(Constant::from_attributes(&attrs).unwrap().value().to_string(), "zz1");

        let attrs = Attributes::new().with("width", 2usize);
        assert_eq!(Constant::from_attributes(&attrs).unwrap().value().to_u64(), Some(0));
    }
}
