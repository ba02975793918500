use std::io::Write;

use log::{debug, info};

use super::{
    error::{RuntimeError, RuntimeFault},
    memory::RuntimeMemory,
    value::Value,
};
use crate::{
    index::Index,
    middle::{
        memory::Address,
        quadruple::{Operand, Operator, OperatorClass, Quadruple, QuadrupleId, QuadrupleProgram},
    },
};

pub const DEFAULT_MAX_CALL_DEPTH: usize = 1024;

#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Trace every instruction, its operands and the memory after it runs
    pub verbose: bool,
    /// Nested calls allowed before the machine faults
    pub max_call_depth: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

enum Step {
    Next,
    Jump(QuadrupleId),
    Halt,
}

fn address(slot: &Option<Operand>, name: &'static str) -> Result<Address, RuntimeError> {
    match slot {
        Some(Operand::Address(address)) => Ok(*address),
        _ => Err(RuntimeError::MissingOperand { slot: name }),
    }
}

fn target(slot: &Option<Operand>) -> Result<QuadrupleId, RuntimeError> {
    match slot {
        Some(Operand::Target(target)) => Ok(*target),
        _ => Err(RuntimeError::MissingOperand {
            slot: "jump target",
        }),
    }
}

/// Executes a quadruple program. Everything `PRINT` produces (and the trace
/// in verbose mode) goes to `out`.
#[derive(Debug)]
pub struct VirtualMachine<'program, W: Write> {
    program: &'program QuadrupleProgram,
    memory: RuntimeMemory,
    returns: Vec<QuadrupleId>,
    pc: QuadrupleId,
    config: VmConfig,
    out: W,
}

impl<'program, W: Write> VirtualMachine<'program, W> {
    /// Prepares a machine with every constant of the program loaded
    pub fn new(
        program: &'program QuadrupleProgram,
        config: VmConfig,
        out: W,
    ) -> Result<Self, RuntimeError> {
        let mut memory = RuntimeMemory::new();

        for constant in program.constants.iter() {
            let value = Value::from_literal(&constant.text, constant.ty).ok_or_else(|| {
                RuntimeError::InvalidConstant {
                    address: constant.address,
                    text: constant.text.clone(),
                    ty: constant.ty,
                }
            })?;

            memory.load_constant(constant.address, value)?;
        }

        Ok(Self {
            program,
            memory,
            returns: Vec::new(),
            pc: QuadrupleId::new(0),
            config,
            out,
        })
    }

    pub fn memory(&self) -> &RuntimeMemory {
        &self.memory
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Runs until `END`, the end of the program or the first fault
    pub fn run(&mut self) -> Result<(), RuntimeFault> {
        info!(
            "running {} quadruples with {} constants",
            self.program.quadruples.len(),
            self.program.constants.len()
        );

        let program = self.program;

        while let Some(quadruple) = program.quadruples.get(self.pc) {
            let index = self.pc;

            let step = self
                .trace(quadruple)
                .and_then(|()| self.execute(quadruple))
                .map_err(|error| RuntimeFault { index, error })?;

            if self.config.verbose {
                self.memory
                    .dump(&mut self.out)
                    .map_err(|error| RuntimeFault {
                        index,
                        error: error.into(),
                    })?;
            }

            match step {
                Step::Next => self.pc.increment_by(1),
                Step::Jump(target) => self.pc = target,
                Step::Halt => {
                    info!("halted at quadruple {index}");
                    return Ok(());
                }
            }
        }

        info!("ran past the last quadruple");
        Ok(())
    }

    fn trace(&mut self, quadruple: &Quadruple) -> Result<(), RuntimeError> {
        if !self.config.verbose {
            return Ok(());
        }

        writeln!(self.out, "quadruple {}: {quadruple}", self.pc)?;

        for slot in [&quadruple.first, &quadruple.second] {
            if let Some(Operand::Address(address)) = slot {
                match self.memory.read(*address) {
                    Ok(value) => writeln!(self.out, "  {address} = {value}")?,
                    Err(_) => writeln!(self.out, "  {address} = <uninitialized>")?,
                }
            }
        }

        Ok(())
    }

    fn execute(&mut self, quadruple: &Quadruple) -> Result<Step, RuntimeError> {
        let Quadruple {
            operator,
            first,
            second,
            result,
        } = quadruple;

        match operator.class() {
            OperatorClass::Arithmetic | OperatorClass::Relational => {
                let left = self.memory.read(address(first, "first operand")?)?;
                let right = self.memory.read(address(second, "second operand")?)?;
                let value = left.apply(operator, right)?;

                self.memory.write(address(result, "result")?, value)?;
                return Ok(Step::Next);
            }
            OperatorClass::Assignment => {
                let value = self.memory.read(address(first, "first operand")?)?.clone();

                self.memory.write(address(result, "result")?, value)?;
                return Ok(Step::Next);
            }
            OperatorClass::Control => {}
        }

        let step = match operator {
            Operator::Goto => Step::Jump(target(result)?),
            Operator::GotoFalse => match self.memory.read(address(first, "condition")?)? {
                Value::Boolean(false) => Step::Jump(target(result)?),
                Value::Boolean(true) => Step::Next,
                other => {
                    return Err(RuntimeError::TypeMismatch {
                        expected: "a boolean condition".to_string(),
                        found: other.ty(),
                    });
                }
            },
            Operator::Era => {
                debug!("staging activation for {first:?}");
                self.memory.stage();
                Step::Next
            }
            Operator::Param => {
                let value = self.memory.read(address(first, "argument")?)?.clone();

                self.memory
                    .write_parameter(address(result, "parameter")?, value)?;
                Step::Next
            }
            Operator::Gosub => {
                if self.memory.call_depth() >= self.config.max_call_depth {
                    return Err(RuntimeError::CallDepthExceeded {
                        limit: self.config.max_call_depth,
                    });
                }

                let callee = target(result)?;
                self.memory.enter_staged()?;
                self.returns.push(self.pc.plus(1));

                debug!("call {callee} from {}", self.pc);
                Step::Jump(callee)
            }
            Operator::EndFunc => {
                let Some(return_to) = self.returns.pop() else {
                    return Err(RuntimeError::EmptyReturnStack);
                };

                self.memory.leave_frame();
                Step::Jump(return_to)
            }
            Operator::Print => {
                let value = self.memory.read(address(first, "value")?)?;
                writeln!(self.out, "{value}")?;
                Step::Next
            }
            Operator::End => Step::Halt,
            Operator::Unknown(text) => {
                return Err(RuntimeError::UnknownInstruction {
                    operator: text.clone(),
                });
            }
            _ => unreachable!("`{operator}` is not a control instruction"),
        };

        Ok(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        index::IndexVec,
        middle::{
            memory::Segment,
            primitive::ValueType,
            quadruple::{Constant, ConstantTable},
        },
    };

    fn constant(table: &mut ConstantTable, slot: u32, ty: ValueType, text: &str) -> Address {
        let address = Address::new(Address::range_start(Segment::Constant, ty).index() + slot as usize);

        table.insert(Constant {
            address,
            text: text.to_string(),
            ty,
        })
    }

    fn quad(operator: Operator, first: Option<Operand>, second: Option<Operand>, result: Option<Operand>) -> Quadruple {
        Quadruple::new(operator, first, second, result)
    }

    fn at(address: Address) -> Option<Operand> {
        Some(Operand::Address(address))
    }

    fn to(index: usize) -> Option<Operand> {
        Some(Operand::Target(QuadrupleId::new(index)))
    }

    fn run(program: &QuadrupleProgram, config: VmConfig) -> (Result<(), RuntimeFault>, String) {
        let mut vm = VirtualMachine::new(program, config, Vec::new()).unwrap();
        let result = vm.run();

        (result, String::from_utf8(vm.into_output()).unwrap())
    }

    #[test]
    fn division_by_zero_stops_at_the_faulting_quadruple() {
        let mut constants = ConstantTable::new();
        let ten = constant(&mut constants, 0, ValueType::Integer, "10");
        let zero = constant(&mut constants, 1, ValueType::Integer, "0");
        let temporary = Address::range_start(Segment::Temporary, ValueType::Integer);

        let program = QuadrupleProgram {
            quadruples: IndexVec::from_raw(vec![
                quad(Operator::Print, at(ten), None, None),
                quad(Operator::Divide, at(ten), at(zero), at(temporary)),
                quad(Operator::Print, at(temporary), None, None),
                quad(Operator::End, None, None, None),
            ]),
            constants,
        };

        let (result, output) = run(&program, VmConfig::default());

        assert_eq!(
            result,
            Err(RuntimeFault {
                index: QuadrupleId::new(1),
                error: RuntimeError::DivisionByZero,
            })
        );
        assert_eq!(output, "10\n");
    }

    #[test]
    fn calls_run_in_their_own_frame() {
        let mut constants = ConstantTable::new();
        let seven = constant(&mut constants, 0, ValueType::Integer, "7");
        let parameter = Address::range_start(Segment::Local, ValueType::Integer);

        let program = QuadrupleProgram {
            quadruples: IndexVec::from_raw(vec![
                quad(Operator::Goto, None, None, to(3)),
                quad(Operator::Print, at(parameter), None, None),
                quad(Operator::EndFunc, None, None, None),
                quad(Operator::Era, Some(Operand::Function("show".into())), None, None),
                quad(Operator::Param, at(seven), None, at(parameter)),
                quad(Operator::Gosub, Some(Operand::Function("show".into())), None, to(1)),
                quad(Operator::Print, at(seven), None, None),
                quad(Operator::End, None, None, None),
            ]),
            constants,
        };

        let (result, output) = run(&program, VmConfig::default());

        assert_eq!(result, Ok(()));
        assert_eq!(output, "7\n7\n");
    }

    #[test]
    fn runaway_recursion_hits_the_depth_limit() {
        let program = QuadrupleProgram {
            quadruples: IndexVec::from_raw(vec![
                quad(Operator::Era, Some(Operand::Function("f".into())), None, None),
                quad(Operator::Gosub, Some(Operand::Function("f".into())), None, to(0)),
            ]),
            constants: ConstantTable::new(),
        };

        let config = VmConfig {
            max_call_depth: 8,
            ..VmConfig::default()
        };

        let (result, _) = run(&program, config);

        assert_eq!(
            result.unwrap_err().error,
            RuntimeError::CallDepthExceeded { limit: 8 }
        );
    }

    #[test]
    fn protocol_violations_fault() {
        let global = Address::range_start(Segment::Global, ValueType::Integer);

        let cases = [
            (quad(Operator::EndFunc, None, None, None), RuntimeError::EmptyReturnStack),
            (
                quad(Operator::Gosub, None, None, to(0)),
                RuntimeError::NoPendingActivation,
            ),
            (
                quad(Operator::Print, at(global), None, None),
                RuntimeError::UninitializedOperand { address: global },
            ),
            (
                quad(Operator::Unknown("HALT".into()), None, None, None),
                RuntimeError::UnknownInstruction {
                    operator: "HALT".to_string(),
                },
            ),
            (
                quad(Operator::Goto, None, None, None),
                RuntimeError::MissingOperand {
                    slot: "jump target",
                },
            ),
        ];

        for (quadruple, expected) in cases {
            let program = QuadrupleProgram {
                quadruples: IndexVec::from_raw(vec![quadruple]),
                constants: ConstantTable::new(),
            };

            let (result, _) = run(&program, VmConfig::default());
            assert_eq!(
                result,
                Err(RuntimeFault {
                    index: QuadrupleId::new(0),
                    error: expected,
                })
            );
        }
    }

    #[test]
    fn verbose_mode_traces_every_step() {
        let mut constants = ConstantTable::new();
        let one = constant(&mut constants, 0, ValueType::Integer, "1");

        let program = QuadrupleProgram {
            quadruples: IndexVec::from_raw(vec![
                quad(Operator::Print, at(one), None, None),
                quad(Operator::End, None, None, None),
            ]),
            constants,
        };

        let config = VmConfig {
            verbose: true,
            ..VmConfig::default()
        };
        let (result, output) = run(&program, config);

        assert_eq!(result, Ok(()));
        assert!(output.contains("quadruple 0: PRINT,13000,,"));
        assert!(output.contains("  13000 = 1"));
        assert!(output.contains("constant memory:"));
        assert!(output.contains("quadruple 1: END,,,"));
    }

    #[test]
    fn malformed_constants_are_rejected() {
        let mut constants = ConstantTable::new();
        constant(&mut constants, 0, ValueType::Integer, "ten");

        let program = QuadrupleProgram {
            quadruples: IndexVec::new(),
            constants,
        };

        assert!(matches!(
            VirtualMachine::new(&program, VmConfig::default(), Vec::new()),
            Err(RuntimeError::InvalidConstant { .. })
        ));
    }
}
