//! Activation record protocol for calls: `ERA`, one `PARAM` per argument and
//! `GOSUB`.

use std::ops::ControlFlow;

use itertools::Itertools;

use super::{QuadrupleGenerator, TypedAddress};
use crate::middle::{
    diagnostics::SemanticError,
    quadruple::{Operand, Operator, Quadruple, QuadrupleId},
    symbols::Parameter,
};

#[derive(Debug)]
pub(super) struct PendingCall {
    callee: String,
    parameters: Vec<Parameter>,
    start: QuadrupleId,
    /// Evaluated arguments in source order
    arguments: Vec<Option<TypedAddress>>,
}

impl QuadrupleGenerator {
    /// Looks the callee up before its arguments are evaluated. An unknown
    /// callee skips the whole call.
    pub(super) fn begin_call(&mut self, callee: &str) -> ControlFlow<()> {
        let (parameters, start) = match self.symbols.resolve_function(callee) {
            Ok(function) => (function.parameters.clone(), function.start),
            Err(error) => {
                self.report(error);
                return ControlFlow::Break(());
            }
        };

        self.calls.push(PendingCall {
            callee: callee.to_string(),
            parameters,
            start,
            arguments: Vec::new(),
        });

        ControlFlow::Continue(())
    }

    pub(super) fn push_argument(&mut self) {
        let argument = self.pop_operand();

        self.calls
            .last_mut()
            .expect("argument outside of a call")
            .arguments
            .push(argument);
    }

    /// Checks the evaluated arguments and, if they fit, emits the whole
    /// activation sequence. A rejected call emits nothing.
    pub(super) fn finish_call(&mut self) {
        let call = self.calls.pop().expect("call staged on entry");

        if call.arguments.len() != call.parameters.len() {
            self.report(SemanticError::ArityMismatch {
                function: call.callee,
                expected: call.parameters.len(),
                found: call.arguments.len(),
            });
            return;
        }

        let mut valid = true;
        let mut staged = Vec::with_capacity(call.arguments.len());

        for (position, (argument, parameter)) in
            call.arguments.iter().zip_eq(&call.parameters).enumerate()
        {
            let Some(argument) = argument else {
                valid = false;
                continue;
            };

            if argument.ty != parameter.ty {
                self.report(SemanticError::ArgumentTypeMismatch {
                    function: call.callee.clone(),
                    position: position + 1,
                    expected: parameter.ty,
                    found: argument.ty,
                });
                valid = false;
                continue;
            }

            staged.push((argument.address, parameter.address));
        }

        if !valid {
            return;
        }

        self.emit(Quadruple::new(
            Operator::Era,
            Some(Operand::Function(call.callee.clone())),
            None,
            None,
        ));

        for (argument, parameter) in staged {
            self.emit(Quadruple::new(
                Operator::Param,
                Some(Operand::Address(argument)),
                None,
                Some(Operand::Address(parameter)),
            ));
        }

        self.emit(Quadruple::new(
            Operator::Gosub,
            Some(Operand::Function(call.callee)),
            None,
            Some(Operand::Target(call.start)),
        ));
    }
}
