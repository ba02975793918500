//! Trait definition for a parse tree visitor which walks the tree in DFS order
//!
//! Every production gets an `enter_*`/`exit_*` hook pair (leaf productions
//! get a single `visit_*` hook). The `walk_*` functions drive the hooks in
//! source order, so a visitor never needs to know how the tree was built.
//! Hooks return `Err` to abort the whole walk. The `enter_*` hooks that
//! return a [`ControlFlow`] can skip the production: on `Break` neither the
//! children nor the matching `exit_*` hook are visited.

use std::ops::ControlFlow;

use super::{
    Additive, Assignment, BinaryOperator, Block, Conditional, Declaration, Expression, Factor,
    FactorKind, FunctionCall, FunctionDefinition, Identifier, Literal, Print, Program, Statement,
    StatementKind, Term, WhileLoop,
};

pub trait Visitor<'ast>: Sized {
    /// Fatal error which stops the walk
    type Error;

    fn enter_program(&mut self, _program: &'ast Program) -> Result<(), Self::Error> {
        Ok(())
    }

    fn exit_program(&mut self, _program: &'ast Program) -> Result<(), Self::Error> {
        Ok(())
    }

    fn visit_declaration(&mut self, _declaration: &'ast Declaration) -> Result<(), Self::Error> {
        Ok(())
    }

    fn enter_function(
        &mut self,
        _function: &'ast FunctionDefinition,
    ) -> Result<ControlFlow<()>, Self::Error> {
        Ok(ControlFlow::Continue(()))
    }

    fn exit_function(&mut self, _function: &'ast FunctionDefinition) -> Result<(), Self::Error> {
        Ok(())
    }

    fn enter_main(&mut self, _main: &'ast Block) -> Result<(), Self::Error> {
        Ok(())
    }

    fn exit_main(&mut self, _main: &'ast Block) -> Result<(), Self::Error> {
        Ok(())
    }

    fn enter_statement(&mut self, _statement: &'ast Statement) -> Result<(), Self::Error> {
        Ok(())
    }

    fn exit_statement(&mut self, _statement: &'ast Statement) -> Result<(), Self::Error> {
        Ok(())
    }

    fn enter_assignment(
        &mut self,
        _assignment: &'ast Assignment,
    ) -> Result<ControlFlow<()>, Self::Error> {
        Ok(ControlFlow::Continue(()))
    }

    fn exit_assignment(&mut self, _assignment: &'ast Assignment) -> Result<(), Self::Error> {
        Ok(())
    }

    fn enter_function_call(
        &mut self,
        _call: &'ast FunctionCall,
    ) -> Result<ControlFlow<()>, Self::Error> {
        Ok(ControlFlow::Continue(()))
    }

    fn exit_argument(&mut self, _argument: &'ast Expression) -> Result<(), Self::Error> {
        Ok(())
    }

    fn exit_function_call(&mut self, _call: &'ast FunctionCall) -> Result<(), Self::Error> {
        Ok(())
    }

    fn exit_print_item(&mut self, _item: &'ast Expression) -> Result<(), Self::Error> {
        Ok(())
    }

    fn enter_conditional(&mut self, _conditional: &'ast Conditional) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Called once the condition has been evaluated, before the `then` block
    fn exit_condition(&mut self, _condition: &'ast Expression) -> Result<(), Self::Error> {
        Ok(())
    }

    fn enter_else(&mut self, _else_block: &'ast Block) -> Result<(), Self::Error> {
        Ok(())
    }

    fn exit_conditional(&mut self, _conditional: &'ast Conditional) -> Result<(), Self::Error> {
        Ok(())
    }

    fn enter_while_loop(&mut self, _while_loop: &'ast WhileLoop) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Called once the loop condition has been evaluated, before the body
    fn exit_loop_condition(&mut self, _condition: &'ast Expression) -> Result<(), Self::Error> {
        Ok(())
    }

    fn exit_while_loop(&mut self, _while_loop: &'ast WhileLoop) -> Result<(), Self::Error> {
        Ok(())
    }

    fn exit_expression(&mut self, _expression: &'ast Expression) -> Result<(), Self::Error> {
        Ok(())
    }

    fn exit_term(&mut self, _term: &'ast Term) -> Result<(), Self::Error> {
        Ok(())
    }

    fn exit_factor(&mut self, _factor: &'ast Factor) -> Result<(), Self::Error> {
        Ok(())
    }

    fn enter_parenthesized(&mut self, _inner: &'ast Expression) -> Result<(), Self::Error> {
        Ok(())
    }

    fn exit_parenthesized(&mut self, _inner: &'ast Expression) -> Result<(), Self::Error> {
        Ok(())
    }

    fn visit_operator(&mut self, _operator: &'ast BinaryOperator) -> Result<(), Self::Error> {
        Ok(())
    }

    fn visit_identifier(&mut self, _identifier: &'ast Identifier) -> Result<(), Self::Error> {
        Ok(())
    }

    fn visit_literal(&mut self, _literal: &'ast Literal) -> Result<(), Self::Error> {
        Ok(())
    }
}

pub fn walk_program<'a, V: Visitor<'a>>(visitor: &mut V, program: &'a Program) -> Result<(), V::Error> {
    visitor.enter_program(program)?;

    for declaration in &program.declarations {
        visitor.visit_declaration(declaration)?;
    }

    for function in &program.functions {
        walk_function_definition(visitor, function)?;
    }

    visitor.enter_main(&program.main)?;
    walk_block(visitor, &program.main)?;
    visitor.exit_main(&program.main)?;

    visitor.exit_program(program)
}

pub fn walk_function_definition<'a, V: Visitor<'a>>(
    visitor: &mut V,
    function: &'a FunctionDefinition,
) -> Result<(), V::Error> {
    if visitor.enter_function(function)?.is_break() {
        return Ok(());
    }

    walk_block(visitor, &function.body)?;
    visitor.exit_function(function)
}

pub fn walk_block<'a, V: Visitor<'a>>(visitor: &mut V, block: &'a Block) -> Result<(), V::Error> {
    for statement in &block.statements {
        walk_statement(visitor, statement)?;
    }

    Ok(())
}

pub fn walk_statement<'a, V: Visitor<'a>>(
    visitor: &mut V,
    statement: &'a Statement,
) -> Result<(), V::Error> {
    visitor.enter_statement(statement)?;

    match &statement.kind {
        StatementKind::Declaration(declaration) => visitor.visit_declaration(declaration)?,
        StatementKind::Assignment(assignment) => walk_assignment(visitor, assignment)?,
        StatementKind::FunctionCall(call) => walk_function_call(visitor, call)?,
        StatementKind::Conditional(conditional) => walk_conditional(visitor, conditional)?,
        StatementKind::WhileLoop(while_loop) => walk_while_loop(visitor, while_loop)?,
        StatementKind::Print(print) => walk_print(visitor, print)?,
    }

    visitor.exit_statement(statement)
}

pub fn walk_assignment<'a, V: Visitor<'a>>(
    visitor: &mut V,
    assignment: &'a Assignment,
) -> Result<(), V::Error> {
    if visitor.enter_assignment(assignment)?.is_break() {
        return Ok(());
    }

    walk_expression(visitor, &assignment.value)?;
    visitor.exit_assignment(assignment)
}

pub fn walk_function_call<'a, V: Visitor<'a>>(
    visitor: &mut V,
    call: &'a FunctionCall,
) -> Result<(), V::Error> {
    if visitor.enter_function_call(call)?.is_break() {
        return Ok(());
    }

    for argument in &call.arguments {
        walk_expression(visitor, argument)?;
        visitor.exit_argument(argument)?;
    }

    visitor.exit_function_call(call)
}

pub fn walk_print<'a, V: Visitor<'a>>(visitor: &mut V, print: &'a Print) -> Result<(), V::Error> {
    for item in &print.items {
        walk_expression(visitor, item)?;
        visitor.exit_print_item(item)?;
    }

    Ok(())
}

pub fn walk_conditional<'a, V: Visitor<'a>>(
    visitor: &mut V,
    conditional: &'a Conditional,
) -> Result<(), V::Error> {
    visitor.enter_conditional(conditional)?;

    walk_expression(visitor, &conditional.condition)?;
    visitor.exit_condition(&conditional.condition)?;

    walk_block(visitor, &conditional.then_block)?;

    if let Some(else_block) = &conditional.else_block {
        visitor.enter_else(else_block)?;
        walk_block(visitor, else_block)?;
    }

    visitor.exit_conditional(conditional)
}

pub fn walk_while_loop<'a, V: Visitor<'a>>(
    visitor: &mut V,
    while_loop: &'a WhileLoop,
) -> Result<(), V::Error> {
    visitor.enter_while_loop(while_loop)?;

    walk_expression(visitor, &while_loop.condition)?;
    visitor.exit_loop_condition(&while_loop.condition)?;

    walk_block(visitor, &while_loop.body)?;
    visitor.exit_while_loop(while_loop)
}

pub fn walk_expression<'a, V: Visitor<'a>>(
    visitor: &mut V,
    expression: &'a Expression,
) -> Result<(), V::Error> {
    walk_additive(visitor, &expression.lhs)?;

    if let Some((operator, rhs)) = &expression.comparison {
        visitor.visit_operator(operator)?;
        walk_additive(visitor, rhs)?;
    }

    visitor.exit_expression(expression)
}

pub fn walk_additive<'a, V: Visitor<'a>>(
    visitor: &mut V,
    additive: &'a Additive,
) -> Result<(), V::Error> {
    walk_term(visitor, &additive.first)?;

    for (operator, term) in &additive.rest {
        visitor.visit_operator(operator)?;
        walk_term(visitor, term)?;
    }

    Ok(())
}

pub fn walk_term<'a, V: Visitor<'a>>(visitor: &mut V, term: &'a Term) -> Result<(), V::Error> {
    walk_factor(visitor, &term.first)?;

    for (operator, factor) in &term.rest {
        visitor.visit_operator(operator)?;
        walk_factor(visitor, factor)?;
    }

    visitor.exit_term(term)
}

pub fn walk_factor<'a, V: Visitor<'a>>(visitor: &mut V, factor: &'a Factor) -> Result<(), V::Error> {
    match &factor.kind {
        FactorKind::Parenthesized(inner) => {
            visitor.enter_parenthesized(inner)?;
            walk_expression(visitor, inner)?;
            visitor.exit_parenthesized(inner)?;
        }
        FactorKind::Identifier(identifier) => visitor.visit_identifier(identifier)?,
        FactorKind::Literal(literal) => visitor.visit_literal(literal)?,
    }

    visitor.exit_factor(factor)
}
