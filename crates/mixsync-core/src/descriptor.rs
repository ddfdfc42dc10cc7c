//! Plugin parameter metadata and value-shape selection.

use serde::{Deserialize, Serialize};

use crate::value::{TypedValue, ValueKind};

/// Metadata of a controllable plugin parameter.
///
/// The flags mirror what plugin hosts report; more than one may be set.
/// [`ParameterDescriptor::shape`] resolves them to a single [`ValueShape`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    /// Display name.
    pub name: String,
    /// Lower bound.
    pub lower: f64,
    /// Upper bound.
    pub upper: f64,
    /// Step between adjacent values of a stepped parameter.
    pub step: f64,
    /// On/off switch.
    pub toggled: bool,
    /// Discrete set of labelled values.
    pub enumeration: bool,
    /// Integer-valued.
    pub integer_step: bool,
    /// Displayed on a logarithmic scale.
    pub logarithmic: bool,
}

impl ParameterDescriptor {
    /// A continuous parameter over `[lower, upper]`.
    pub fn continuous(name: impl Into<String>, lower: f64, upper: f64) -> Self {
        Self {
            name: name.into(),
            lower,
            upper,
            step: 0.0,
            toggled: false,
            enumeration: false,
            integer_step: false,
            logarithmic: false,
        }
    }

    /// A toggle parameter (0 or 1).
    pub fn toggle(name: impl Into<String>) -> Self {
        Self {
            toggled: true,
            ..Self::continuous(name, 0.0, 1.0)
        }
    }

    /// An integer parameter over `[lower, upper]` with unit step.
    pub fn stepped(name: impl Into<String>, lower: f64, upper: f64) -> Self {
        Self {
            step: 1.0,
            integer_step: true,
            ..Self::continuous(name, lower, upper)
        }
    }

    /// An enumerated parameter over `[lower, upper]`.
    pub fn enumerated(name: impl Into<String>, lower: f64, upper: f64) -> Self {
        Self {
            step: 1.0,
            enumeration: true,
            ..Self::continuous(name, lower, upper)
        }
    }

    /// Mark the parameter as logarithmic.
    #[must_use]
    pub fn with_logarithmic(mut self, logarithmic: bool) -> Self {
        self.logarithmic = logarithmic;
        self
    }

    /// Resolve the value shape: toggle > enumerated/stepped > continuous.
    pub fn shape(&self) -> ValueShape {
        if self.toggled {
            ValueShape::Toggle
        } else if self.enumeration || self.integer_step {
            ValueShape::Stepped {
                lower: self.lower,
                upper: self.upper,
                step: if self.step > 0.0 { self.step } else { 1.0 },
            }
        } else {
            ValueShape::Continuous {
                lower: self.lower,
                upper: self.upper,
                logarithmic: self.logarithmic,
            }
        }
    }
}

/// The single value shape a parameter is exposed with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ValueShape {
    /// Boolean values.
    Toggle,
    /// Integer values.
    Stepped {
        /// Lower bound.
        lower: f64,
        /// Upper bound.
        upper: f64,
        /// Distance between values.
        step: f64,
    },
    /// Floating-point values.
    Continuous {
        /// Lower bound.
        lower: f64,
        /// Upper bound.
        upper: f64,
        /// Logarithmic display scale.
        logarithmic: bool,
    },
}

impl ValueShape {
    /// Kind of the values a parameter with this shape carries.
    pub fn value_kind(self) -> ValueKind {
        match self {
            Self::Toggle => ValueKind::Bool,
            Self::Stepped { .. } => ValueKind::Int,
            Self::Continuous { .. } => ValueKind::Double,
        }
    }

    /// Descriptor tag sent on the wire.
    pub fn tag(self) -> &'static str {
        self.value_kind().as_str()
    }

    /// Payload of a `strip_plugin_param_desc` update for a parameter called `name`.
    ///
    /// - toggle: `(name, "boolean")`
    /// - stepped: `(name, "integer", lower, upper, step)`
    /// - continuous: `(name, "float", lower, upper, logarithmic)`
    pub fn descriptor_values(self, name: &str) -> Vec<TypedValue> {
        let mut values = vec![TypedValue::from(name), TypedValue::from(self.tag())];
        match self {
            Self::Toggle => {}
            Self::Stepped { lower, upper, step } => {
                values.push(round_to_int(lower));
                values.push(round_to_int(upper));
                values.push(round_to_int(step));
            }
            Self::Continuous {
                lower,
                upper,
                logarithmic,
            } => {
                values.push(TypedValue::Double(lower));
                values.push(TypedValue::Double(upper));
                values.push(TypedValue::Bool(logarithmic));
            }
        }
        values
    }
}

fn round_to_int(v: f64) -> TypedValue {
    TypedValue::Double(v)
        .to_i64()
        .map_or(TypedValue::Double(v), TypedValue::Int)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggled_wins_over_every_other_flag() {
        let pd = ParameterDescriptor {
            toggled: true,
            enumeration: true,
            integer_step: true,
            logarithmic: true,
            ..ParameterDescriptor::continuous("Bypass", 0.0, 1.0)
        };
        assert_eq!(pd.shape(), ValueShape::Toggle);
        assert_eq!(pd.shape().tag(), "boolean");
    }

    #[test]
    fn enumeration_or_integer_step_is_stepped() {
        let by_enum = ParameterDescriptor::enumerated("Mode", 0.0, 3.0).with_logarithmic(true);
        let by_step = ParameterDescriptor::stepped("Voices", 1.0, 8.0);
        assert_eq!(by_enum.shape().tag(), "integer");
        assert_eq!(by_step.shape().tag(), "integer");
    }

    #[test]
    fn everything_else_is_continuous() {
        let pd = ParameterDescriptor::continuous("Freq", 20.0, 20_000.0).with_logarithmic(true);
        assert_eq!(
            pd.shape(),
            ValueShape::Continuous {
                lower: 20.0,
                upper: 20_000.0,
                logarithmic: true
            }
        );
        assert_eq!(pd.shape().tag(), "float");
    }

    #[test]
    fn stepped_without_step_defaults_to_one() {
        let pd = ParameterDescriptor {
            step: 0.0,
            ..ParameterDescriptor::stepped("Taps", 0.0, 4.0)
        };
        assert_eq!(
            pd.shape(),
            ValueShape::Stepped {
                lower: 0.0,
                upper: 4.0,
                step: 1.0
            }
        );
    }

    #[test]
    fn toggle_payload() {
        let values = ValueShape::Toggle.descriptor_values("Bypass");
        assert_eq!(values, vec![TypedValue::from("Bypass"), TypedValue::from("boolean")]);
    }

    #[test]
    fn stepped_payload() {
        let values = ParameterDescriptor::stepped("Voices", 1.0, 8.0)
            .shape()
            .descriptor_values("Voices");
        assert_eq!(
            values,
            vec![
                TypedValue::from("Voices"),
                TypedValue::from("integer"),
                TypedValue::Int(1),
                TypedValue::Int(8),
                TypedValue::Int(1),
            ]
        );
    }

    #[test]
    fn continuous_payload() {
        let values = ParameterDescriptor::continuous("Gain", -18.0, 18.0)
            .shape()
            .descriptor_values("Gain");
        assert_eq!(
            values,
            vec![
                TypedValue::from("Gain"),
                TypedValue::from("float"),
                TypedValue::Double(-18.0),
                TypedValue::Double(18.0),
                TypedValue::Bool(false),
            ]
        );
    }
}
