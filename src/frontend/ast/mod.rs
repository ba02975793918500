//! Parse tree for Patito programs. The shape follows the grammar productions
//! closely (one node per precedence level) because the quadruple generator is
//! driven by entering and leaving those productions.

use crate::{frontend::lexer::Span, middle::primitive::ValueType};

pub mod visit;

/// `program name; <declarations> <functions> main { ... } end`
#[derive(Debug)]
pub struct Program {
    pub span: Span,
    pub name: Identifier,
    pub declarations: Vec<Declaration>,
    pub functions: Vec<FunctionDefinition>,
    pub main: Block,
}

/// `a, b: integer;`
#[derive(Debug)]
pub struct Declaration {
    pub span: Span,
    pub names: Vec<Identifier>,
    pub ty: ValueType,
}

/// `void name(a: integer, b: float) { ... }`
#[derive(Debug)]
pub struct FunctionDefinition {
    pub span: Span,
    pub name: Identifier,
    /// `None` for `void`
    pub return_type: Option<ValueType>,
    pub parameters: Vec<FunctionParameter>,
    pub body: Block,
}

#[derive(Debug)]
pub struct FunctionParameter {
    pub span: Span,
    pub name: Identifier,
    pub ty: ValueType,
}

#[derive(Debug, Clone)]
pub struct Identifier {
    pub span: Span,
    pub name: String,
}

#[derive(Debug)]
pub struct Block {
    pub span: Span,
    pub statements: Vec<Statement>,
}

#[derive(Debug)]
pub struct Statement {
    pub span: Span,
    pub kind: StatementKind,
}

#[derive(Debug)]
pub enum StatementKind {
    Declaration(Declaration),
    Assignment(Assignment),
    FunctionCall(FunctionCall),
    Conditional(Conditional),
    WhileLoop(WhileLoop),
    Print(Print),
}

/// `target = value;`
#[derive(Debug)]
pub struct Assignment {
    pub target: Identifier,
    pub value: Expression,
}

/// `name(arguments);`
#[derive(Debug)]
pub struct FunctionCall {
    pub name: Identifier,
    pub arguments: Vec<Expression>,
}

/// `if (condition) { ... } else { ... }`
#[derive(Debug)]
pub struct Conditional {
    pub condition: Expression,
    pub then_block: Block,
    pub else_block: Option<Block>,
}

/// `while (condition) do { ... }`
#[derive(Debug)]
pub struct WhileLoop {
    pub condition: Expression,
    pub body: Block,
}

/// `print(a, "text", b + 1);`
#[derive(Debug)]
pub struct Print {
    pub items: Vec<Expression>,
}

/// Relational level: `additive (relop additive)?`
#[derive(Debug)]
pub struct Expression {
    pub span: Span,
    pub lhs: Additive,
    pub comparison: Option<(BinaryOperator, Additive)>,
}

/// Additive level: `term ((+|-) term)*`
#[derive(Debug)]
pub struct Additive {
    pub span: Span,
    pub first: Term,
    pub rest: Vec<(BinaryOperator, Term)>,
}

/// Multiplicative level: `factor ((*|/) factor)*`
#[derive(Debug)]
pub struct Term {
    pub span: Span,
    pub first: Factor,
    pub rest: Vec<(BinaryOperator, Factor)>,
}

#[derive(Debug)]
pub struct Factor {
    pub span: Span,
    pub kind: FactorKind,
}

#[derive(Debug)]
pub enum FactorKind {
    Parenthesized(Box<Expression>),
    Identifier(Identifier),
    Literal(Literal),
}

#[derive(Debug, Clone, Copy)]
pub struct BinaryOperator {
    pub span: Span,
    pub kind: BinaryOperatorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperatorKind {
    Add,                  // +
    Subtract,             // -
    Multiply,             // *
    Divide,               // /
    Equals,               // ==
    NotEquals,            // !=
    LessThan,             // <
    LessThanOrEqualTo,    // <=
    GreaterThan,          // >
    GreaterThanOrEqualTo, // >=
}

#[derive(Debug, Clone)]
pub struct Literal {
    pub span: Span,
    pub kind: ValueType,
    /// Source text of the literal, quotes included for strings
    pub text: String,
}
