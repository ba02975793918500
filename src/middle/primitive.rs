use strum::{EnumIter, EnumString};

/// The closed set of scalar types a Patito value can have
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum ValueType {
    Integer,
    Float,
    Boolean,
    String,
}

impl core::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueType::Integer => write!(f, "integer"),
            ValueType::Float => write!(f, "float"),
            ValueType::Boolean => write!(f, "boolean"),
            ValueType::String => write!(f, "string"),
        }
    }
}

impl ValueType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueType::Integer | ValueType::Float)
    }

    /// Position of the type inside a segment's block of ranges
    pub(crate) fn ordinal(self) -> u32 {
        match self {
            ValueType::Integer => 0,
            ValueType::Float => 1,
            ValueType::Boolean => 2,
            ValueType::String => 3,
        }
    }
}
