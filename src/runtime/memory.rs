//! Segmented runtime memory. Global and constant cells live for the whole
//! run, local and temporary cells live in the frame of the active call.

use std::io::{self, Write};

use hashbrown::HashMap;
use itertools::Itertools;

use super::{error::RuntimeError, value::Value};
use crate::middle::memory::{Address, Segment};

/// Local and temporary cells of one activation
#[derive(Debug, Clone, Default)]
pub struct Frame {
    cells: HashMap<Address, Value>,
}

#[derive(Debug, Clone)]
pub struct RuntimeMemory {
    globals: HashMap<Address, Value>,
    constants: HashMap<Address, Value>,
    /// Never empty: the bottom frame belongs to `main` and is never popped
    frames: Vec<Frame>,
    /// Activations staged by `ERA` that were not entered yet
    staged: Vec<Frame>,
}

impl Default for RuntimeMemory {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks that `value` may be stored at `address` and returns its segment
fn check_store(address: Address, value: &Value) -> Result<Segment, RuntimeError> {
    let Some((segment, ty)) = address.decode() else {
        return Err(RuntimeError::InvalidAddress {
            address,
            access: "write",
        });
    };

    if value.ty() != ty {
        return Err(RuntimeError::TypeMismatch {
            expected: format!("a {ty} value for address {address}"),
            found: value.ty(),
        });
    }

    Ok(segment)
}

impl RuntimeMemory {
    pub fn new() -> Self {
        Self {
            globals: HashMap::new(),
            constants: HashMap::new(),
            frames: vec![Frame::default()],
            staged: Vec::new(),
        }
    }

    fn current_frame(&self) -> &Frame {
        self.frames.last().expect("the main frame is never popped")
    }

    fn current_frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("the main frame is never popped")
    }

    /// Seeds a cell of the constant segment, the only way to write there
    pub fn load_constant(&mut self, address: Address, value: Value) -> Result<(), RuntimeError> {
        if check_store(address, &value)? != Segment::Constant {
            return Err(RuntimeError::InvalidAddress {
                address,
                access: "constant",
            });
        }

        self.constants.insert(address, value);
        Ok(())
    }

    pub fn read(&self, address: Address) -> Result<&Value, RuntimeError> {
        let cells = match address.segment() {
            Some(Segment::Global) => &self.globals,
            Some(Segment::Constant) => &self.constants,
            Some(Segment::Local | Segment::Temporary) => &self.current_frame().cells,
            None => {
                return Err(RuntimeError::InvalidAddress {
                    address,
                    access: "read",
                });
            }
        };

        cells
            .get(&address)
            .ok_or(RuntimeError::UninitializedOperand { address })
    }

    pub fn write(&mut self, address: Address, value: Value) -> Result<(), RuntimeError> {
        let cells = match check_store(address, &value)? {
            Segment::Global => &mut self.globals,
            Segment::Local | Segment::Temporary => &mut self.current_frame_mut().cells,
            Segment::Constant => {
                return Err(RuntimeError::InvalidAddress {
                    address,
                    access: "write",
                });
            }
        };

        cells.insert(address, value);
        Ok(())
    }

    /// `ERA`
    pub fn stage(&mut self) {
        self.staged.push(Frame::default());
    }

    /// `PARAM`: writes into the most recently staged activation
    pub fn write_parameter(&mut self, address: Address, value: Value) -> Result<(), RuntimeError> {
        if !check_store(address, &value)?.is_per_activation() {
            return Err(RuntimeError::InvalidAddress {
                address,
                access: "parameter",
            });
        }

        self.staged
            .last_mut()
            .ok_or(RuntimeError::NoPendingActivation)?
            .cells
            .insert(address, value);

        Ok(())
    }

    /// `GOSUB`: the staged activation becomes the current frame
    pub fn enter_staged(&mut self) -> Result<(), RuntimeError> {
        let frame = self.staged.pop().ok_or(RuntimeError::NoPendingActivation)?;
        self.frames.push(frame);

        Ok(())
    }

    /// `ENDFUNC`. Returns `false` if only the main frame is left.
    pub fn leave_frame(&mut self) -> bool {
        if self.frames.len() <= 1 {
            return false;
        }

        self.frames.pop();
        true
    }

    /// Number of calls currently active
    pub fn call_depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// Writes every initialized cell visible from the current frame
    pub fn dump(&self, out: &mut impl Write) -> io::Result<()> {
        let sections = [
            ("global", &self.globals),
            ("constant", &self.constants),
            ("current frame", &self.current_frame().cells),
        ];

        for (name, cells) in sections {
            writeln!(out, "  {name} memory:")?;

            for (address, value) in cells.iter().sorted_by_key(|(address, _)| **address) {
                writeln!(out, "    {address}: {value}")?;
            }
        }

        Ok(())
    }
}
