//! The quadruple program: the artifact handed from generation to execution.

use hashbrown::HashMap;
use strum::EnumString;

use super::{memory::Address, primitive::ValueType};
use crate::index::{IndexVec, simple_index};

simple_index! {
    /// Position of a quadruple in the program. Doubles as a jump target.
    pub struct QuadrupleId;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumString)]
pub enum Operator {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = ">")]
    GreaterThan,
    #[strum(serialize = "<")]
    LessThan,
    #[strum(serialize = ">=")]
    GreaterThanOrEqualTo,
    #[strum(serialize = "<=")]
    LessThanOrEqualTo,
    #[strum(serialize = "==")]
    Equals,
    #[strum(serialize = "!=")]
    NotEquals,
    #[strum(serialize = "=")]
    Assign,
    #[strum(serialize = "GOTO")]
    Goto,
    #[strum(serialize = "GOTOF")]
    GotoFalse,
    #[strum(serialize = "ERA")]
    Era,
    #[strum(serialize = "PARAM")]
    Param,
    #[strum(serialize = "GOSUB")]
    Gosub,
    #[strum(serialize = "ENDFUNC")]
    EndFunc,
    #[strum(serialize = "PRINT")]
    Print,
    #[strum(serialize = "END")]
    End,
    /// Anything else found in a loaded table. Kept around so the virtual
    /// machine can fault on it at the right instruction.
    #[strum(default)]
    Unknown(String),
}

impl core::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operator::Add => write!(f, "+"),
            Operator::Subtract => write!(f, "-"),
            Operator::Multiply => write!(f, "*"),
            Operator::Divide => write!(f, "/"),
            Operator::GreaterThan => write!(f, ">"),
            Operator::LessThan => write!(f, "<"),
            Operator::GreaterThanOrEqualTo => write!(f, ">="),
            Operator::LessThanOrEqualTo => write!(f, "<="),
            Operator::Equals => write!(f, "=="),
            Operator::NotEquals => write!(f, "!="),
            Operator::Assign => write!(f, "="),
            Operator::Goto => write!(f, "GOTO"),
            Operator::GotoFalse => write!(f, "GOTOF"),
            Operator::Era => write!(f, "ERA"),
            Operator::Param => write!(f, "PARAM"),
            Operator::Gosub => write!(f, "GOSUB"),
            Operator::EndFunc => write!(f, "ENDFUNC"),
            Operator::Print => write!(f, "PRINT"),
            Operator::End => write!(f, "END"),
            Operator::Unknown(text) => write!(f, "{text}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorClass {
    Arithmetic,
    Relational,
    Assignment,
    Control,
}

impl Operator {
    pub const ARITHMETIC: [Operator; 4] = [
        Operator::Add,
        Operator::Subtract,
        Operator::Multiply,
        Operator::Divide,
    ];

    pub const RELATIONAL: [Operator; 6] = [
        Operator::GreaterThan,
        Operator::LessThan,
        Operator::GreaterThanOrEqualTo,
        Operator::LessThanOrEqualTo,
        Operator::Equals,
        Operator::NotEquals,
    ];

    pub fn class(&self) -> OperatorClass {
        match self {
            Self::Add | Self::Subtract | Self::Multiply | Self::Divide => {
                OperatorClass::Arithmetic
            }
            Self::GreaterThan
            | Self::LessThan
            | Self::GreaterThanOrEqualTo
            | Self::LessThanOrEqualTo
            | Self::Equals
            | Self::NotEquals => OperatorClass::Relational,
            Self::Assign => OperatorClass::Assignment,
            Self::Goto
            | Self::GotoFalse
            | Self::Era
            | Self::Param
            | Self::Gosub
            | Self::EndFunc
            | Self::Print
            | Self::End
            | Self::Unknown(_) => OperatorClass::Control,
        }
    }

    /// Whether the result slot holds a quadruple index instead of an address
    pub fn targets_quadruple(&self) -> bool {
        matches!(self, Self::Goto | Self::GotoFalse | Self::Gosub)
    }
}

/// One slot of a quadruple
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Address(Address),
    Function(String),
    Target(QuadrupleId),
}

impl core::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Address(address) => write!(f, "{address}"),
            Operand::Function(name) => write!(f, "{name}"),
            Operand::Target(target) => write!(f, "{target}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quadruple {
    pub operator: Operator,
    pub first: Option<Operand>,
    pub second: Option<Operand>,
    pub result: Option<Operand>,
}

impl Quadruple {
    pub fn new(
        operator: Operator,
        first: Option<Operand>,
        second: Option<Operand>,
        result: Option<Operand>,
    ) -> Self {
        Self {
            operator,
            first,
            second,
            result,
        }
    }

    /// A jump whose target is not known yet
    pub fn pending_jump(operator: Operator, condition: Option<Address>) -> Self {
        Self::new(operator, condition.map(Operand::Address), None, None)
    }

    pub fn jump_target(&self) -> Option<QuadrupleId> {
        match self.result {
            Some(Operand::Target(target)) => Some(target),
            _ => None,
        }
    }
}

/// `operator,operand1,operand2,result` with empty fields for unused slots
impl core::fmt::Display for Quadruple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let field = |slot: &Option<Operand>| {
            slot.as_ref()
                .map(|operand| operand.to_string())
                .unwrap_or_default()
        };

        write!(
            f,
            "{},{},{},{}",
            self.operator,
            field(&self.first),
            field(&self.second),
            field(&self.result)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constant {
    pub address: Address,
    /// Canonical source text of the literal (string literals keep their
    /// quotes)
    pub text: String,
    pub ty: ValueType,
}

/// Literal pool. Every distinct (text, type) pair owns exactly one address.
#[derive(Debug, Clone, Default)]
pub struct ConstantTable {
    entries: Vec<Constant>,
    lookup: HashMap<(String, ValueType), Address>,
}

impl ConstantTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, text: &str, ty: ValueType) -> Option<Address> {
        self.lookup.get(&(text.to_owned(), ty)).copied()
    }

    /// Records a constant. Re-inserting a known literal keeps the first
    /// address.
    pub fn insert(&mut self, constant: Constant) -> Address {
        if let Some(address) = self.get(&constant.text, constant.ty) {
            return address;
        }

        self.lookup
            .insert((constant.text.clone(), constant.ty), constant.address);
        let address = constant.address;
        self.entries.push(constant);
        address
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Constant> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for ConstantTable {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuadrupleProgram {
    pub quadruples: IndexVec<QuadrupleId, Quadruple>,
    pub constants: ConstantTable,
}

impl QuadrupleProgram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, quadruple: Quadruple) -> QuadrupleId {
        log::debug!("emit {}: {}", self.quadruples.next_index(), quadruple);
        self.quadruples.push(quadruple)
    }

    /// Index the next emitted quadruple will receive
    pub fn next_index(&self) -> QuadrupleId {
        self.quadruples.next_index()
    }

    /// Resolves a pending jump. Returns `false` if the quadruple does not
    /// exist or was already resolved.
    pub fn patch(&mut self, jump: QuadrupleId, target: QuadrupleId) -> bool {
        match self.quadruples.get_mut(jump) {
            Some(quadruple) if quadruple.result.is_none() => {
                log::trace!("patch {jump} -> {target}");
                quadruple.result = Some(Operand::Target(target));
                true
            }
            _ => false,
        }
    }

    /// Jumps that were emitted but never patched
    pub fn unresolved_jumps(&self) -> Vec<QuadrupleId> {
        self.quadruples
            .enumerate()
            .filter(|(_, quadruple)| {
                quadruple.operator.targets_quadruple() && quadruple.jump_target().is_none()
            })
            .map(|(id, _)| id)
            .collect()
    }
}
