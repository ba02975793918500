//! Function directory, variable tables and the scope stack used to resolve
//! names while generating quadruples.

use hashbrown::HashMap;
use itertools::Itertools;

use super::{
    diagnostics::SemanticError,
    memory::{Address, AddressAllocator, AddressSpaceExhausted, Segment},
    primitive::ValueType,
    quadruple::QuadrupleId,
};
use crate::index::Index;

/// Name of the implicit outermost scope. No function may use it.
pub const GLOBAL_SCOPE: &str = "global";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableEntry {
    pub name: String,
    pub ty: ValueType,
    pub address: Address,
}

#[derive(Debug, Clone, Default)]
pub struct VariableTable {
    entries: HashMap<String, VariableEntry>,
}

impl VariableTable {
    pub fn get(&self, name: &str) -> Option<&VariableEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    fn insert(&mut self, entry: VariableEntry) {
        self.entries.insert(entry.name.clone(), entry);
    }

    /// Entries ordered by address, which is also declaration order within a
    /// type
    pub fn sorted(&self) -> Vec<&VariableEntry> {
        self.entries
            .values()
            .sorted_by_key(|entry| entry.address)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub ty: ValueType,
    pub address: Address,
}

#[derive(Debug, Clone)]
pub struct FunctionEntry {
    pub name: String,
    /// `None` for `void` functions and for the global scope
    pub return_type: Option<ValueType>,
    pub parameters: Vec<Parameter>,
    pub variables: VariableTable,
    /// Index of the first quadruple of the body. Functions are emitted
    /// inline, so this is the quadruple count at declaration time.
    pub start: QuadrupleId,
}

#[derive(Debug, Clone)]
pub struct FunctionDirectory {
    functions: HashMap<String, FunctionEntry>,
}

impl FunctionDirectory {
    fn new() -> Self {
        let global = FunctionEntry {
            name: GLOBAL_SCOPE.to_string(),
            return_type: None,
            parameters: Vec::new(),
            variables: VariableTable::default(),
            start: QuadrupleId::new(0),
        };

        Self {
            functions: [(GLOBAL_SCOPE.to_string(), global)].into_iter().collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FunctionEntry> {
        self.functions.get(name)
    }

    pub fn global(&self) -> &FunctionEntry {
        &self.functions[GLOBAL_SCOPE]
    }

    /// User declared functions ordered by where their bodies start
    pub fn functions(&self) -> Vec<&FunctionEntry> {
        self.functions
            .values()
            .filter(|entry| entry.name != GLOBAL_SCOPE)
            .sorted_by_key(|entry| entry.start)
            .collect()
    }
}

/// Either a problem with the source program or an exhausted address range
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolError {
    Semantic(SemanticError),
    Exhausted(AddressSpaceExhausted),
}

impl From<SemanticError> for SymbolError {
    fn from(error: SemanticError) -> Self {
        Self::Semantic(error)
    }
}

impl From<AddressSpaceExhausted> for SymbolError {
    fn from(error: AddressSpaceExhausted) -> Self {
        Self::Exhausted(error)
    }
}

/// Owns the function directory and the stack of open scopes
#[derive(Debug, Clone)]
pub struct SymbolTable {
    directory: FunctionDirectory,
    scopes: Vec<String>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            directory: FunctionDirectory::new(),
            scopes: vec![GLOBAL_SCOPE.to_string()],
        }
    }

    pub fn directory(&self) -> &FunctionDirectory {
        &self.directory
    }

    pub fn into_directory(self) -> FunctionDirectory {
        self.directory
    }

    pub fn active_scope(&self) -> &str {
        self.scopes.last().map(String::as_str).unwrap_or(GLOBAL_SCOPE)
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    fn active_function_mut(&mut self) -> &mut FunctionEntry {
        let scope = self.scopes.last().map(String::as_str).unwrap_or(GLOBAL_SCOPE);

        self.directory
            .functions
            .get_mut(scope)
            .expect("every open scope has a directory entry")
    }

    fn active_table(&self) -> &VariableTable {
        &self.directory.functions[self.active_scope()].variables
    }

    pub fn declare_variable(
        &mut self,
        name: &str,
        ty: ValueType,
        allocator: &mut AddressAllocator,
    ) -> Result<Address, SymbolError> {
        if self.active_table().contains(name) {
            return Err(SemanticError::DuplicateDeclaration {
                name: name.to_string(),
                scope: self.active_scope().to_string(),
            }
            .into());
        }

        let segment = if self.active_scope() == GLOBAL_SCOPE {
            Segment::Global
        } else {
            Segment::Local
        };

        let address = allocator.allocate(segment, ty)?;

        self.active_function_mut().variables.insert(VariableEntry {
            name: name.to_string(),
            ty,
            address,
        });

        Ok(address)
    }

    /// Registers a function and opens its scope. Duplicate parameter names do
    /// not prevent the declaration; they are returned so the caller can
    /// report them.
    pub fn declare_function(
        &mut self,
        name: &str,
        return_type: Option<ValueType>,
        parameters: &[(String, ValueType)],
        start: QuadrupleId,
        allocator: &mut AddressAllocator,
    ) -> Result<Vec<SemanticError>, SymbolError> {
        if self.directory.functions.contains_key(name) {
            return Err(SemanticError::DuplicateFunction {
                name: name.to_string(),
            }
            .into());
        }

        let mut entry = FunctionEntry {
            name: name.to_string(),
            return_type,
            parameters: Vec::with_capacity(parameters.len()),
            variables: VariableTable::default(),
            start,
        };
        let mut problems = Vec::new();

        for (parameter, ty) in parameters {
            if entry.variables.contains(parameter) {
                problems.push(SemanticError::DuplicateParameter {
                    name: parameter.clone(),
                    function: name.to_string(),
                });
                continue;
            }

            let address = allocator.allocate(Segment::Local, *ty)?;

            entry.variables.insert(VariableEntry {
                name: parameter.clone(),
                ty: *ty,
                address,
            });
            entry.parameters.push(Parameter {
                name: parameter.clone(),
                ty: *ty,
                address,
            });
        }

        self.directory.functions.insert(name.to_string(), entry);
        self.scopes.push(name.to_string());

        Ok(problems)
    }

    /// Leaves the active function and rewinds the per-activation segments so
    /// the next function starts from the same layout
    pub fn close_function(&mut self, allocator: &mut AddressAllocator) {
        if self.scopes.len() <= 1 {
            log::warn!("attempted to close the global scope");
            return;
        }

        self.scopes.pop();
        allocator.reset(Segment::Local);
        allocator.reset(Segment::Temporary);
    }

    /// Looks a name up in the active scope, then in the global scope
    pub fn resolve(&self, name: &str) -> Result<&VariableEntry, SemanticError> {
        self.active_table()
            .get(name)
            .or_else(|| self.directory.global().variables.get(name))
            .ok_or_else(|| SemanticError::UndeclaredVariable {
                name: name.to_string(),
                scope: self.active_scope().to_string(),
            })
    }

    pub fn resolve_function(&self, name: &str) -> Result<&FunctionEntry, SemanticError> {
        self.directory
            .get(name)
            .filter(|entry| entry.name != GLOBAL_SCOPE)
            .ok_or_else(|| SemanticError::UndeclaredFunction {
                name: name.to_string(),
            })
    }
}
