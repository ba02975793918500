//! Single pass quadruple generation.
//!
//! [`QuadrupleGenerator`] is a parse tree [`Visitor`]: it keeps an operand
//! stack and an operator stack for expressions, and a jump stack for
//! backpatching conditionals and loops. Recoverable problems are collected in
//! source order while generation keeps going, fatal ones abort the walk.

use std::ops::ControlFlow;

use log::trace;

use super::{
    diagnostics::{GenerationError, SemanticError},
    memory::{Address, AddressAllocator, Segment},
    primitive::ValueType,
    quadruple::{Constant, Operand, Operator, Quadruple, QuadrupleId, QuadrupleProgram},
    semantic_cube::result_type,
    symbols::{FunctionDirectory, SymbolError, SymbolTable, VariableEntry},
};
use crate::frontend::ast::{
    Assignment, BinaryOperator, BinaryOperatorKind, Block, Conditional, Declaration, Expression,
    Factor, FunctionCall, FunctionDefinition, Identifier, Literal, Program, Statement, Term,
    WhileLoop,
    visit::{Visitor, walk_program},
};

mod call;

use call::PendingCall;

/// A value on the operand stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypedAddress {
    pub address: Address,
    pub ty: ValueType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PendingOperator {
    Binary(Operator),
    /// Pushed for a parenthesised sub-expression so reductions inside it
    /// cannot reach operators outside of it
    FalseBottom,
}

impl From<BinaryOperatorKind> for Operator {
    fn from(kind: BinaryOperatorKind) -> Self {
        match kind {
            BinaryOperatorKind::Add => Operator::Add,
            BinaryOperatorKind::Subtract => Operator::Subtract,
            BinaryOperatorKind::Multiply => Operator::Multiply,
            BinaryOperatorKind::Divide => Operator::Divide,
            BinaryOperatorKind::Equals => Operator::Equals,
            BinaryOperatorKind::NotEquals => Operator::NotEquals,
            BinaryOperatorKind::LessThan => Operator::LessThan,
            BinaryOperatorKind::LessThanOrEqualTo => Operator::LessThanOrEqualTo,
            BinaryOperatorKind::GreaterThan => Operator::GreaterThan,
            BinaryOperatorKind::GreaterThanOrEqualTo => Operator::GreaterThanOrEqualTo,
        }
    }
}

/// Everything produced by one generation pass
#[derive(Debug)]
pub struct Generation {
    pub program: QuadrupleProgram,
    pub directory: FunctionDirectory,
    /// Semantic errors in the order they were found. The program must not be
    /// persisted or run unless this is empty.
    pub errors: Vec<SemanticError>,
}

impl Generation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct QuadrupleGenerator {
    allocator: AddressAllocator,
    symbols: SymbolTable,
    program: QuadrupleProgram,

    /// `None` marks a poisoned operand whose error was already reported
    operands: Vec<Option<TypedAddress>>,
    operators: Vec<PendingOperator>,
    /// Pending jumps and loop starts. `None` stands in for a jump that was
    /// never emitted because its guard was invalid.
    jumps: Vec<Option<QuadrupleId>>,
    /// Targets of the assignments being generated
    assignments: Vec<VariableEntry>,
    calls: Vec<PendingCall>,
    /// The leading `GOTO` that skips over function bodies
    main_jump: Option<QuadrupleId>,

    errors: Vec<SemanticError>,
}

impl QuadrupleGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walks a whole program and returns the quadruples along with every
    /// semantic error that was found
    pub fn generate(program: &Program) -> Result<Generation, GenerationError> {
        let mut generator = Self::new();
        walk_program(&mut generator, program)?;

        Ok(generator.finish())
    }

    pub fn finish(self) -> Generation {
        Generation {
            program: self.program,
            directory: self.symbols.into_directory(),
            errors: self.errors,
        }
    }

    pub fn errors(&self) -> &[SemanticError] {
        &self.errors
    }

    pub fn program(&self) -> &QuadrupleProgram {
        &self.program
    }

    /// Address of a literal in the constant segment. The same text and type
    /// always map to the same address.
    pub fn constant_address(
        &mut self,
        text: &str,
        ty: ValueType,
    ) -> Result<Address, GenerationError> {
        if let Some(address) = self.program.constants.get(text, ty) {
            return Ok(address);
        }

        let address = self.allocator.allocate(Segment::Constant, ty)?;

        Ok(self.program.constants.insert(Constant {
            address,
            text: text.to_string(),
            ty,
        }))
    }

    fn emit(&mut self, quadruple: Quadruple) -> QuadrupleId {
        self.program.push(quadruple)
    }

    fn report(&mut self, error: SemanticError) {
        log::debug!("semantic error: {error}");
        self.errors.push(error);
    }

    /// Splits a symbol table result into a recorded diagnostic (`Ok(None)`)
    /// or a fatal error
    fn recover<T>(&mut self, result: Result<T, SymbolError>) -> Result<Option<T>, GenerationError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(SymbolError::Semantic(error)) => {
                self.report(error);
                Ok(None)
            }
            Err(SymbolError::Exhausted(error)) => Err(error.into()),
        }
    }

    fn patch_to_here(&mut self, jump: QuadrupleId) {
        let here = self.program.next_index();
        assert!(self.program.patch(jump, here), "jump {jump} patched twice");
    }

    fn pop_operand(&mut self) -> Option<TypedAddress> {
        self.operands
            .pop()
            .expect("operand stack underflow while generating an expression")
    }

    /// Reduces the operator on top of the stack if `pending` accepts it
    fn reduce_if(&mut self, pending: impl Fn(&Operator) -> bool) -> Result<(), GenerationError> {
        let Some(PendingOperator::Binary(operator)) = self.operators.last() else {
            return Ok(());
        };

        if !pending(operator) {
            return Ok(());
        }

        let Some(PendingOperator::Binary(operator)) = self.operators.pop() else {
            unreachable!()
        };

        let right = self.pop_operand();
        let left = self.pop_operand();

        // Poison spreads silently, the original error was already reported
        let (Some(left), Some(right)) = (left, right) else {
            trace!("skipping `{operator}` on a poisoned operand");
            self.operands.push(None);
            return Ok(());
        };

        let Some(ty) = result_type(left.ty, &operator, right.ty) else {
            self.report(SemanticError::InvalidOperation {
                left: left.ty,
                operator,
                right: right.ty,
            });
            self.operands.push(None);
            return Ok(());
        };

        let temporary = self.allocator.allocate(Segment::Temporary, ty)?;

        self.emit(Quadruple::new(
            operator,
            Some(Operand::Address(left.address)),
            Some(Operand::Address(right.address)),
            Some(Operand::Address(temporary)),
        ));
        self.operands.push(Some(TypedAddress {
            address: temporary,
            ty,
        }));

        Ok(())
    }

    /// Emits the false jump of a conditional or a loop guard
    fn guard(&mut self, statement: &'static str) {
        let jump = match self.pop_operand() {
            Some(condition) if condition.ty == ValueType::Boolean => Some(self.emit(
                Quadruple::pending_jump(Operator::GotoFalse, Some(condition.address)),
            )),
            Some(condition) => {
                self.report(SemanticError::NonBooleanCondition {
                    statement,
                    found: condition.ty,
                });
                None
            }
            None => None,
        };

        trace!("push jump {jump:?}");
        self.jumps.push(jump);
    }

    fn pop_jump(&mut self) -> Option<QuadrupleId> {
        self.jumps
            .pop()
            .expect("jump stack underflow while closing a control statement")
    }
}

impl<'ast> Visitor<'ast> for QuadrupleGenerator {
    type Error = GenerationError;

    fn enter_program(&mut self, program: &'ast Program) -> Result<(), Self::Error> {
        log::debug!("generating quadruples for program `{}`", program.name.name);

        let jump = self.emit(Quadruple::pending_jump(Operator::Goto, None));
        self.main_jump = Some(jump);

        Ok(())
    }

    fn exit_program(&mut self, _program: &'ast Program) -> Result<(), Self::Error> {
        self.emit(Quadruple::new(Operator::End, None, None, None));

        assert!(self.jumps.is_empty(), "unbalanced jump stack at program end");
        assert!(self.calls.is_empty());
        assert_eq!(self.symbols.depth(), 1, "function scope left open");

        Ok(())
    }

    fn visit_declaration(&mut self, declaration: &'ast Declaration) -> Result<(), Self::Error> {
        for name in &declaration.names {
            let result =
                self.symbols
                    .declare_variable(&name.name, declaration.ty, &mut self.allocator);

            if let Some(address) = self.recover(result)? {
                trace!("declared `{}` at {address}", name.name);
            }
        }

        Ok(())
    }

    fn enter_function(
        &mut self,
        function: &'ast FunctionDefinition,
    ) -> Result<ControlFlow<()>, Self::Error> {
        let parameters = function
            .parameters
            .iter()
            .map(|parameter| (parameter.name.name.clone(), parameter.ty))
            .collect::<Vec<_>>();

        let start = self.program.next_index();
        let result = self.symbols.declare_function(
            &function.name.name,
            function.return_type,
            &parameters,
            start,
            &mut self.allocator,
        );

        match self.recover(result)? {
            Some(problems) => {
                problems.into_iter().for_each(|problem| self.report(problem));
                Ok(ControlFlow::Continue(()))
            }
            // A duplicate function is skipped along with its body
            None => Ok(ControlFlow::Break(())),
        }
    }

    fn exit_function(&mut self, _function: &'ast FunctionDefinition) -> Result<(), Self::Error> {
        self.emit(Quadruple::new(Operator::EndFunc, None, None, None));
        self.symbols.close_function(&mut self.allocator);

        Ok(())
    }

    fn enter_main(&mut self, _main: &'ast Block) -> Result<(), Self::Error> {
        if let Some(jump) = self.main_jump.take() {
            self.patch_to_here(jump);
        }

        Ok(())
    }

    fn exit_statement(&mut self, _statement: &'ast Statement) -> Result<(), Self::Error> {
        assert!(self.operands.is_empty(), "operands left over after a statement");
        assert!(self.operators.is_empty(), "operators left over after a statement");

        Ok(())
    }

    fn enter_assignment(
        &mut self,
        assignment: &'ast Assignment,
    ) -> Result<ControlFlow<()>, Self::Error> {
        match self.symbols.resolve(&assignment.target.name) {
            Ok(target) => {
                let target = target.clone();
                self.assignments.push(target);
                Ok(ControlFlow::Continue(()))
            }
            Err(error) => {
                self.report(error);
                Ok(ControlFlow::Break(()))
            }
        }
    }

    fn exit_assignment(&mut self, _assignment: &'ast Assignment) -> Result<(), Self::Error> {
        let target = self
            .assignments
            .pop()
            .expect("assignment target pushed on entry");

        let Some(value) = self.pop_operand() else {
            return Ok(());
        };

        if result_type(target.ty, &Operator::Assign, value.ty).is_none() {
            self.report(SemanticError::IncompatibleAssignment {
                name: target.name,
                target: target.ty,
                value: value.ty,
            });
            return Ok(());
        }

        self.emit(Quadruple::new(
            Operator::Assign,
            Some(Operand::Address(value.address)),
            None,
            Some(Operand::Address(target.address)),
        ));

        Ok(())
    }

    fn enter_function_call(
        &mut self,
        call: &'ast FunctionCall,
    ) -> Result<ControlFlow<()>, Self::Error> {
        Ok(self.begin_call(&call.name.name))
    }

    fn exit_argument(&mut self, _argument: &'ast Expression) -> Result<(), Self::Error> {
        self.push_argument();
        Ok(())
    }

    fn exit_function_call(&mut self, _call: &'ast FunctionCall) -> Result<(), Self::Error> {
        self.finish_call();
        Ok(())
    }

    fn exit_print_item(&mut self, _item: &'ast Expression) -> Result<(), Self::Error> {
        if let Some(value) = self.pop_operand() {
            self.emit(Quadruple::new(
                Operator::Print,
                Some(Operand::Address(value.address)),
                None,
                None,
            ));
        }

        Ok(())
    }

    fn exit_condition(&mut self, _condition: &'ast Expression) -> Result<(), Self::Error> {
        self.guard("if");
        Ok(())
    }

    fn enter_else(&mut self, _else_block: &'ast Block) -> Result<(), Self::Error> {
        let exit_jump = self.emit(Quadruple::pending_jump(Operator::Goto, None));

        if let Some(false_jump) = self.pop_jump() {
            self.patch_to_here(false_jump);
        }

        self.jumps.push(Some(exit_jump));

        Ok(())
    }

    fn exit_conditional(&mut self, _conditional: &'ast Conditional) -> Result<(), Self::Error> {
        if let Some(jump) = self.pop_jump() {
            self.patch_to_here(jump);
        }

        Ok(())
    }

    fn enter_while_loop(&mut self, _while_loop: &'ast WhileLoop) -> Result<(), Self::Error> {
        let start = self.program.next_index();
        self.jumps.push(Some(start));

        Ok(())
    }

    fn exit_loop_condition(&mut self, _condition: &'ast Expression) -> Result<(), Self::Error> {
        self.guard("while");
        Ok(())
    }

    fn exit_while_loop(&mut self, _while_loop: &'ast WhileLoop) -> Result<(), Self::Error> {
        let false_jump = self.pop_jump();
        let start = self
            .pop_jump()
            .expect("loop start is always recorded on entry");

        self.emit(Quadruple::new(
            Operator::Goto,
            None,
            None,
            Some(Operand::Target(start)),
        ));

        if let Some(false_jump) = false_jump {
            self.patch_to_here(false_jump);
        }

        Ok(())
    }

    fn exit_expression(&mut self, _expression: &'ast Expression) -> Result<(), Self::Error> {
        self.reduce_if(|operator| Operator::RELATIONAL.contains(operator))
    }

    fn exit_term(&mut self, _term: &'ast Term) -> Result<(), Self::Error> {
        self.reduce_if(|operator| matches!(operator, Operator::Add | Operator::Subtract))
    }

    fn exit_factor(&mut self, _factor: &'ast Factor) -> Result<(), Self::Error> {
        self.reduce_if(|operator| matches!(operator, Operator::Multiply | Operator::Divide))
    }

    fn enter_parenthesized(&mut self, _inner: &'ast Expression) -> Result<(), Self::Error> {
        self.operators.push(PendingOperator::FalseBottom);
        Ok(())
    }

    fn exit_parenthesized(&mut self, _inner: &'ast Expression) -> Result<(), Self::Error> {
        let marker = self.operators.pop();
        assert_eq!(marker, Some(PendingOperator::FalseBottom));

        Ok(())
    }

    fn visit_operator(&mut self, operator: &'ast BinaryOperator) -> Result<(), Self::Error> {
        self.operators
            .push(PendingOperator::Binary(operator.kind.into()));
        Ok(())
    }

    fn visit_identifier(&mut self, identifier: &'ast Identifier) -> Result<(), Self::Error> {
        let operand = match self.symbols.resolve(&identifier.name) {
            Ok(entry) => Some(TypedAddress {
                address: entry.address,
                ty: entry.ty,
            }),
            Err(error) => {
                self.report(error);
                None
            }
        };

        self.operands.push(operand);
        Ok(())
    }

    fn visit_literal(&mut self, literal: &'ast Literal) -> Result<(), Self::Error> {
        if literal.kind == ValueType::Integer && literal.text.parse::<i64>().is_err() {
            self.report(SemanticError::IntegerOutOfRange {
                literal: literal.text.clone(),
            });
            self.operands.push(None);
            return Ok(());
        }

        let address = self.constant_address(&literal.text, literal.kind)?;

        self.operands.push(Some(TypedAddress {
            address,
            ty: literal.kind,
        }));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        frontend::{SourceFile, parser::Parser},
        index::Index,
        middle::symbols::GLOBAL_SCOPE,
    };

    fn generate(source: &str) -> Generation {
        let source = SourceFile::from_memory(source);
        let program = Parser::parse_program(&source).unwrap();
        QuadrupleGenerator::generate(&program).unwrap()
    }

    fn lines(generation: &Generation) -> Vec<String> {
        generation
            .program
            .quadruples
            .iter()
            .map(|quadruple| quadruple.to_string())
            .collect()
    }

    #[test]
    fn straight_line_assignments_and_prints() {
        let generation = generate(
            "program p; a: integer; b: float;
             main { a = 10; b = 20.5; print(a); print(b); } end",
        );

        assert!(generation.is_valid());
        assert_eq!(
            lines(&generation),
            vec![
                "GOTO,,,1",
                "=,13000,,1000",
                "=,14000,,2000",
                "PRINT,1000,,",
                "PRINT,2000,,",
                "END,,,",
            ]
        );
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let generation = generate("program p; x: integer; main { x = 1 + 2 * 3; } end");

        assert_eq!(
            lines(&generation),
            vec![
                "GOTO,,,1",
                "*,13001,13002,9000",
                "+,13000,9000,9001",
                "=,9001,,1000",
                "END,,,",
            ]
        );
    }

    #[test]
    fn parentheses_and_left_associativity() {
        let generation = generate("program p; x: integer; main { x = (1 - 2) - 3 * (4 - 5); } end");

        assert_eq!(
            lines(&generation),
            vec![
                "GOTO,,,1",
                "-,13000,13001,9000",
                "-,13003,13004,9001",
                "*,13002,9001,9002",
                "-,9000,9002,9003",
                "=,9003,,1000",
                "END,,,",
            ]
        );
    }

    #[test]
    fn assignment_to_an_undeclared_name_is_skipped() {
        let generation = generate("program p; main { y = x + 5; } end");

        assert_eq!(
            generation.errors,
            vec![SemanticError::UndeclaredVariable {
                name: "y".to_string(),
                scope: GLOBAL_SCOPE.to_string(),
            }]
        );
        assert_eq!(lines(&generation), vec!["GOTO,,,1", "END,,,"]);
    }

    #[test]
    fn assignment_never_coerces() {
        let generation = generate("program p; main { a: integer; a = 3.14; } end");

        assert_eq!(
            generation.errors,
            vec![SemanticError::IncompatibleAssignment {
                name: "a".to_string(),
                target: ValueType::Integer,
                value: ValueType::Float,
            }]
        );
        assert!(!lines(&generation).iter().any(|line| line.starts_with("=,")));
    }

    #[test]
    fn while_loops_jump_back_to_their_guard() {
        let generation = generate(
            "program p; n: integer;
             main { n = 1; while (n <= 5) do { print(n); n = n + 1; } } end",
        );

        assert!(generation.is_valid());
        assert_eq!(
            lines(&generation),
            vec![
                "GOTO,,,1",
                "=,13000,,1000",
                "<=,1000,13001,11000",
                "GOTOF,11000,,8",
                "PRINT,1000,,",
                "+,1000,13000,9000",
                "=,9000,,1000",
                "GOTO,,,2",
                "END,,,",
            ]
        );
        assert!(generation.program.unresolved_jumps().is_empty());
    }

    #[test]
    fn conditionals_patch_both_branches() {
        let generation = generate(
            r#"program p; a: integer;
               main { a = 1; if (a > 0) { print("pos"); } else { print("neg"); } print(a); } end"#,
        );

        assert!(generation.is_valid());
        assert_eq!(
            lines(&generation),
            vec![
                "GOTO,,,1",
                "=,13000,,1000",
                ">,1000,13001,11000",
                "GOTOF,11000,,6",
                "PRINT,16000,,",
                "GOTO,,,7",
                "PRINT,16001,,",
                "PRINT,1000,,",
                "END,,,",
            ]
        );
    }

    #[test]
    fn invalid_operations_do_not_cascade() {
        let generation = generate(
            "program p; a: integer; b: boolean; main { a = (b + 1) * 2 + c; } end",
        );

        assert_eq!(
            generation.errors,
            vec![
                SemanticError::InvalidOperation {
                    left: ValueType::Boolean,
                    operator: Operator::Add,
                    right: ValueType::Integer,
                },
                SemanticError::UndeclaredVariable {
                    name: "c".to_string(),
                    scope: GLOBAL_SCOPE.to_string(),
                },
            ]
        );
        assert_eq!(lines(&generation), vec!["GOTO,,,1", "END,,,"]);
    }

    #[test]
    fn invalid_guards_keep_the_jump_stack_balanced() {
        let generation = generate(
            "program p; main {
                if (1 + 2) { print(1); } else { print(2); }
                while (z) do { print(3); }
             } end",
        );

        assert_eq!(generation.errors.len(), 2);
        assert!(matches!(
            generation.errors[0],
            SemanticError::NonBooleanCondition {
                statement: "if",
                found: ValueType::Integer
            }
        ));
        assert!(matches!(
            generation.errors[1],
            SemanticError::UndeclaredVariable { .. }
        ));
        assert!(generation.program.unresolved_jumps().is_empty());
    }

    #[test]
    fn functions_are_skipped_over_by_the_first_jump() {
        let generation = generate(
            "program p;
             void show(x: integer, y: float) { z: integer; z = x; print(z); }
             main { show(1, 2.5); } end",
        );

        assert!(generation.is_valid());
        assert_eq!(
            lines(&generation),
            vec![
                "GOTO,,,4",
                "=,5000,,5001",
                "PRINT,5001,,",
                "ENDFUNC,,,",
                "ERA,show,,",
                "PARAM,13000,,5000",
                "PARAM,14000,,6000",
                "GOSUB,show,,1",
                "END,,,",
            ]
        );

        let show = generation.directory.get("show").unwrap();
        assert_eq!(show.start, QuadrupleId::new(1));
        assert_eq!(show.parameters.len(), 2);
        assert_eq!(show.variables.len(), 3);
    }

    #[test]
    fn duplicate_functions_are_reported_and_skipped() {
        let generation = generate(
            "program p;
             void f() { print(1); }
             void f() { print(2); }
             void global() { print(3); }
             main { f(); } end",
        );

        assert_eq!(
            generation.errors,
            vec![
                SemanticError::DuplicateFunction {
                    name: "f".to_string()
                },
                SemanticError::DuplicateFunction {
                    name: "global".to_string()
                },
            ]
        );
        assert_eq!(
            lines(&generation),
            vec![
                "GOTO,,,3",
                "PRINT,13000,,",
                "ENDFUNC,,,",
                "ERA,f,,",
                "GOSUB,f,,1",
                "END,,,",
            ]
        );
    }

    #[test]
    fn duplicate_declarations_are_reported() {
        let generation = generate("program p; a: integer; a: float; main { } end");

        assert_eq!(
            generation.errors,
            vec![SemanticError::DuplicateDeclaration {
                name: "a".to_string(),
                scope: GLOBAL_SCOPE.to_string(),
            }]
        );
    }

    #[test]
    fn constants_are_deduplicated_by_text_and_type() {
        let mut generator = QuadrupleGenerator::new();

        let integer = generator.constant_address("5", ValueType::Integer).unwrap();
        assert_eq!(
            generator.constant_address("5", ValueType::Integer).unwrap(),
            integer
        );
        assert_ne!(
            generator.constant_address("5", ValueType::Float).unwrap(),
            integer
        );
        assert_eq!(generator.program().constants.len(), 2);
    }

    #[test]
    fn oversized_integer_literals_are_rejected() {
        let generation = generate(
            "program p; x: integer; main { x = 99999999999999999999; print(x + 1); } end",
        );

        assert_eq!(
            generation.errors,
            vec![SemanticError::IntegerOutOfRange {
                literal: "99999999999999999999".to_string()
            }]
        );
        assert!(
            generation
                .program
                .constants
                .iter()
                .all(|constant| constant.text != "99999999999999999999")
        );
        assert!(!lines(&generation).iter().any(|line| line.starts_with('=')));
    }

    #[test]
    fn running_out_of_addresses_is_fatal() {
        let names = (0..1001).map(|i| format!("v{i}")).collect::<Vec<_>>().join(", ");
        let source = SourceFile::from_memory(format!("program p; {names}: integer; main {{ }} end"));
        let program = Parser::parse_program(&source).unwrap();

        assert!(matches!(
            QuadrupleGenerator::generate(&program),
            Err(GenerationError::AddressSpaceExhausted(_))
        ));
    }
}
