use std::cmp::Ordering;

use super::error::RuntimeError;
use crate::middle::{
    primitive::ValueType,
    quadruple::{Operator, OperatorClass},
};

/// Contents of one memory cell
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
}

impl core::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(value) => write!(f, "{value}"),
            // Debug keeps the fractional part of whole floats (`3.0`)
            Value::Float(value) => write!(f, "{value:?}"),
            Value::Boolean(value) => write!(f, "{value}"),
            Value::String(value) => f.write_str(value),
        }
    }
}

impl Value {
    pub fn ty(&self) -> ValueType {
        match self {
            Value::Integer(_) => ValueType::Integer,
            Value::Float(_) => ValueType::Float,
            Value::Boolean(_) => ValueType::Boolean,
            Value::String(_) => ValueType::String,
        }
    }

    /// Parses the source text of a literal. String literals must still be
    /// quoted; `\"` and `\\` are unescaped.
    pub fn from_literal(text: &str, ty: ValueType) -> Option<Self> {
        match ty {
            ValueType::Integer => text.parse().ok().map(Value::Integer),
            ValueType::Float => text.parse().ok().map(Value::Float),
            ValueType::Boolean => match text {
                "true" => Some(Value::Boolean(true)),
                "false" => Some(Value::Boolean(false)),
                _ => None,
            },
            ValueType::String => {
                let inner = text.strip_prefix('"')?.strip_suffix('"')?;
                let mut unescaped = String::with_capacity(inner.len());
                let mut chars = inner.chars().peekable();

                while let Some(c) = chars.next() {
                    if c == '\\' && matches!(chars.peek(), Some('"' | '\\')) {
                        unescaped.extend(chars.next());
                    } else {
                        unescaped.push(c);
                    }
                }

                Some(Value::String(unescaped))
            }
        }
    }

    fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(value) => Some(*value as f64),
            Value::Float(value) => Some(*value),
            _ => None,
        }
    }

    fn not_numeric(&self, right: &Self) -> RuntimeError {
        let offending = if self.as_float().is_none() { self } else { right };

        RuntimeError::TypeMismatch {
            expected: "a numeric operand".to_string(),
            found: offending.ty(),
        }
    }

    /// Applies an arithmetic or relational operator. Integer operands stay
    /// integers (division truncates), any float operand makes it a float
    /// operation.
    pub fn apply(&self, operator: &Operator, right: &Self) -> Result<Self, RuntimeError> {
        match operator.class() {
            OperatorClass::Arithmetic => self.arithmetic(operator, right),
            OperatorClass::Relational => self.compare(operator, right).map(Value::Boolean),
            OperatorClass::Assignment | OperatorClass::Control => {
                Err(RuntimeError::UnknownInstruction {
                    operator: operator.to_string(),
                })
            }
        }
    }

    fn arithmetic(&self, operator: &Operator, right: &Self) -> Result<Self, RuntimeError> {
        if let (Value::Integer(l), Value::Integer(r)) = (self, right) {
            let value = match operator {
                Operator::Add => l.wrapping_add(*r),
                Operator::Subtract => l.wrapping_sub(*r),
                Operator::Multiply => l.wrapping_mul(*r),
                Operator::Divide if *r == 0 => return Err(RuntimeError::DivisionByZero),
                Operator::Divide => l.wrapping_div(*r),
                _ => unreachable!("`{operator}` is not arithmetic"),
            };

            return Ok(Value::Integer(value));
        }

        let (Some(l), Some(r)) = (self.as_float(), right.as_float()) else {
            return Err(self.not_numeric(right));
        };

        let value = match operator {
            Operator::Add => l + r,
            Operator::Subtract => l - r,
            Operator::Multiply => l * r,
            Operator::Divide if r == 0.0 => return Err(RuntimeError::DivisionByZero),
            Operator::Divide => l / r,
            _ => unreachable!("`{operator}` is not arithmetic"),
        };

        Ok(Value::Float(value))
    }

    fn compare(&self, operator: &Operator, right: &Self) -> Result<bool, RuntimeError> {
        let ordering = match (self, right) {
            (Value::Integer(l), Value::Integer(r)) => Some(l.cmp(r)),
            _ => {
                let (Some(l), Some(r)) = (self.as_float(), right.as_float()) else {
                    return Err(self.not_numeric(right));
                };

                l.partial_cmp(&r)
            }
        };

        Ok(match operator {
            Operator::GreaterThan => ordering == Some(Ordering::Greater),
            Operator::LessThan => ordering == Some(Ordering::Less),
            Operator::GreaterThanOrEqualTo => {
                matches!(ordering, Some(Ordering::Greater | Ordering::Equal))
            }
            Operator::LessThanOrEqualTo => {
                matches!(ordering, Some(Ordering::Less | Ordering::Equal))
            }
            Operator::Equals => ordering == Some(Ordering::Equal),
            Operator::NotEquals => ordering != Some(Ordering::Equal),
            _ => unreachable!("`{operator}` is not relational"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_division_truncates() {
        assert_eq!(
            Value::Integer(7).apply(&Operator::Divide, &Value::Integer(2)),
            Ok(Value::Integer(3))
        );
        assert_eq!(
            Value::Integer(-7).apply(&Operator::Divide, &Value::Integer(2)),
            Ok(Value::Integer(-3))
        );
    }

    #[test]
    fn floats_win_mixed_arithmetic() {
        assert_eq!(
            Value::Integer(1).apply(&Operator::Add, &Value::Float(0.5)),
            Ok(Value::Float(1.5))
        );
        assert_eq!(
            Value::Float(9.0).apply(&Operator::Divide, &Value::Integer(0)),
            Err(RuntimeError::DivisionByZero)
        );
    }

    #[test]
    fn comparisons_produce_booleans() {
        assert_eq!(
            Value::Integer(1).apply(&Operator::LessThanOrEqualTo, &Value::Float(1.0)),
            Ok(Value::Boolean(true))
        );
        assert_eq!(
            Value::Float(f64::NAN).apply(&Operator::NotEquals, &Value::Float(f64::NAN)),
            Ok(Value::Boolean(true))
        );
        assert!(matches!(
            Value::Boolean(true).apply(&Operator::Equals, &Value::Integer(1)),
            Err(RuntimeError::TypeMismatch {
                found: ValueType::Boolean,
                ..
            })
        ));
    }

    #[test]
    fn values_print_like_their_literals() {
        assert_eq!(Value::Float(20.5).to_string(), "20.5");
        assert_eq!(Value::Float(3.0).to_string(), "3.0");
        assert_eq!(Value::Boolean(false).to_string(), "false");
        assert_eq!(
            Value::from_literal(r#""say \"hi\"""#, ValueType::String)
                .unwrap()
                .to_string(),
            r#"say "hi""#
        );
        assert_eq!(Value::from_literal("1.5", ValueType::Integer), None);
    }

    #[test]
    fn only_quotes_and_backslashes_are_unescaped() {
        let value = |text| {
            Value::from_literal(text, ValueType::String)
                .unwrap()
                .to_string()
        };

        assert_eq!(value(r#""a\nb""#), r"a\nb");
        assert_eq!(value(r#""a\\b""#), r"a\b");
        assert_eq!(value(r#""C:\\dir\x""#), r"C:\dir\x");
    }
}
