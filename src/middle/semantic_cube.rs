//! Static type-compatibility table indexed by (left type, operator, right
//! type).

use hashbrown::HashMap;
use once_cell::sync::Lazy;
use strum::IntoEnumIterator;

use super::{primitive::ValueType, quadruple::Operator};

static SEMANTIC_CUBE: Lazy<SemanticCube> = Lazy::new(SemanticCube::build);

#[derive(Debug)]
pub struct SemanticCube {
    table: HashMap<(ValueType, Operator, ValueType), ValueType>,
}

impl SemanticCube {
    /// The cube shared by the whole process. It is computed on first use and
    /// never mutated afterwards.
    pub fn get() -> &'static Self {
        &SEMANTIC_CUBE
    }

    fn build() -> Self {
        let mut table = HashMap::new();

        for left in ValueType::iter() {
            for right in ValueType::iter() {
                // Arithmetic widens to float as soon as one side is a float
                if left.is_numeric() && right.is_numeric() {
                    let widened = if left == ValueType::Float || right == ValueType::Float {
                        ValueType::Float
                    } else {
                        ValueType::Integer
                    };

                    for operator in Operator::ARITHMETIC {
                        table.insert((left, operator, right), widened);
                    }

                    for operator in Operator::RELATIONAL {
                        table.insert((left, operator, right), ValueType::Boolean);
                    }
                }

                // Assignment never coerces
                if left == right {
                    table.insert((left, Operator::Assign, right), left);
                }
            }
        }

        Self { table }
    }

    pub fn result_type(
        &self,
        left: ValueType,
        operator: &Operator,
        right: ValueType,
    ) -> Option<ValueType> {
        self.table.get(&(left, operator.clone(), right)).copied()
    }
}

/// Looks up the shared cube. `None` means the combination is invalid.
pub fn result_type(left: ValueType, operator: &Operator, right: ValueType) -> Option<ValueType> {
    SemanticCube::get().result_type(left, operator, right)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::middle::primitive::ValueType::*;

    #[test]
    fn arithmetic_widens_to_float() {
        assert_eq!(result_type(Integer, &Operator::Add, Integer), Some(Integer));
        assert_eq!(result_type(Integer, &Operator::Add, Float), Some(Float));
        assert_eq!(result_type(Float, &Operator::Divide, Integer), Some(Float));
        assert_eq!(result_type(Integer, &Operator::Divide, Integer), Some(Integer));
    }

    #[test]
    fn arithmetic_rejects_booleans_and_strings() {
        assert_eq!(result_type(Boolean, &Operator::Add, Integer), None);
        assert_eq!(result_type(String, &Operator::Add, String), None);
        assert_eq!(result_type(Float, &Operator::Multiply, Boolean), None);
    }

    #[test]
    fn relational_operators_compare_numbers_only() {
        for operator in Operator::RELATIONAL {
            assert_eq!(result_type(Integer, &operator, Float), Some(Boolean));
            assert_eq!(result_type(Float, &operator, Float), Some(Boolean));
            assert_eq!(result_type(Boolean, &operator, Boolean), None);
            assert_eq!(result_type(String, &operator, String), None);
        }
    }

    #[test]
    fn assignment_requires_identical_types() {
        assert_eq!(result_type(Integer, &Operator::Assign, Float), None);
        assert_eq!(result_type(Float, &Operator::Assign, Integer), None);
        assert_eq!(result_type(String, &Operator::Assign, String), Some(String));
        assert_eq!(result_type(Boolean, &Operator::Assign, Boolean), Some(Boolean));
    }

    #[test]
    fn control_operators_are_never_valid() {
        assert_eq!(result_type(Integer, &Operator::Goto, Integer), None);
        assert_eq!(result_type(Integer, &Operator::Print, Integer), None);
    }
}
