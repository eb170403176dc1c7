//! Module, function and basic block definitions
//!
//! A [`Module`] is the compilation unit: it owns every function (defined or
//! only declared) and every global variable, in insertion order. Symbols are
//! looked up by name through the symbol-table helpers on [`Module`], which
//! follow the usual get-or-insert discipline of compiler IRs: asking for a
//! function with a given type either returns the existing symbol, declares a
//! new one, or fails when the name is already bound to something else.
use std::collections::BTreeSet;

use log::trace;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    modules::{
        instructions::{Instruction, KtInstr},
        operand::{IConst, Label, Name, Operand},
        symbol::{FunctionRef, GlobalRef, SymbolRef},
        terminator::Terminator,
    },
    types::{FunctionType, Type},
    utils::{Error, Result},
};

#[cfg(feature = "chumsky")]
pub mod parser;

pub mod fmt;
pub mod instructions;
pub mod operand;
pub mod symbol;
pub mod terminator;

/// Linkage of a global symbol.
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Linkage {
    /// Only directly accessible by objects in the current module. Does not show
    /// up in the object file symbol table.
    Private,

    /// Like `Private`, but the value shows as a local symbol in the object file.
    /// This corresponds to the notion of the `static` keyword in C.
    Internal,

    /// May be referenced by other modules, and may also be defined in other modules.
    #[default]
    External,

    /// Resolves to null when no definition is found at link time.
    ExternalWeak,
}

/// Visibility style of a global symbol.
///
/// A symbol with internal or private linkage must have default visibility.
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Visibility {
    #[default]
    Default,
    Hidden,
    Protected,
}

/// Calling conventions of functions and call sites. The calling convention of
/// any pair of dynamic caller/callee must match, or the behavior of the program
/// is undefined.
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CallingConvention {
    /// The C calling convention
    ///
    /// Matches the target C calling conventions. Supports varargs and tolerates
    /// some mismatch in the declared prototype.
    #[default]
    C,

    /// The fast calling convention
    ///
    /// Allows the target to use whatever tricks it wants to produce fast code,
    /// without having to conform to an externally specified ABI. Does not
    /// support varargs and requires the prototype of all callees to exactly
    /// match the prototype of the function definition.
    FastC,

    /// The cold calling convention
    ///
    /// Optimizes the caller under the assumption that the call is not commonly
    /// executed.
    ColdC,

    /// PreserveMost calling convention
    PreserveMostC,

    /// PreserveAll calling convention
    PreserveAllC,

    /// Tail-call-optimized calling convention
    TailC,

    /// Numbered/target-specific calling convention (cc &lt;n&gt;)
    Numbered(u32),
}

impl std::fmt::Display for CallingConvention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallingConvention::C => write!(f, "ccc"),
            CallingConvention::FastC => write!(f, "fastcc"),
            CallingConvention::ColdC => write!(f, "coldcc"),
            CallingConvention::PreserveMostC => write!(f, "preserve_mostcc"),
            CallingConvention::PreserveAllC => write!(f, "preserve_allcc"),
            CallingConvention::TailC => write!(f, "tailcc"),
            CallingConvention::Numbered(n) => write!(f, "cc {}", n),
        }
    }
}

/// Position in front of which an instruction can be inserted.
///
/// `index == block.instructions.len()` designates the terminator.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct InsertPoint {
    pub block: Label,
    pub index: usize,
}

/// A basic block within a function, containing a sequence of instructions
/// and ending with a control flow terminator.
///
/// A block under construction may not have its terminator yet; the verifier
/// rejects such blocks.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct BasicBlock {
    pub label: Label,
    /// Textual name, kept for printing.
    pub name: Option<String>,
    pub instructions: Vec<KtInstr>,
    pub terminator: Option<Terminator>,
}

impl BasicBlock {
    pub fn new(label: Label) -> Self {
        Self {
            label,
            name: None,
            instructions: Vec::new(),
            terminator: None,
        }
    }

    /// Number of instructions, counting the terminator.
    pub fn len(&self) -> usize {
        self.instructions.len() + usize::from(self.terminator.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position of the first instruction (possibly the terminator), or `None`
    /// for an empty block.
    pub fn first_insert_point(&self) -> Option<InsertPoint> {
        (!self.is_empty()).then_some(InsertPoint {
            block: self.label,
            index: 0,
        })
    }

    /// Calls in this block whose callee is `function`.
    pub fn calls_to(&self, function: FunctionRef) -> impl Iterator<Item = &instructions::Invoke> {
        self.instructions.iter().filter_map(move |instr| match instr {
            KtInstr::Invoke(call) if call.function == Operand::Func(function) => Some(call),
            _ => None,
        })
    }
}

/// A function made of basic blocks and parameter metadata.
///
/// A function without any basic block is a declaration: its body lives in
/// another compilation unit. The first block of `body` is the entry block.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct Function {
    pub uuid: Uuid,
    pub name: String,
    pub params: Vec<(Name, Type)>,
    pub return_type: Option<Type>,
    pub variadic: bool,
    pub body: Vec<BasicBlock>,
    pub linkage: Linkage,
    pub visibility: Visibility,
    pub cconv: CallingConvention,
}

impl Function {
    /// Creates an external declaration with the given signature.
    pub fn declaration(name: impl Into<String>, ty: &FunctionType) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            params: ty
                .params
                .iter()
                .enumerate()
                .map(|(i, ty)| (Name(i as u32), *ty))
                .collect(),
            return_type: ty.ret,
            variadic: ty.variadic,
            body: Vec::new(),
            linkage: Linkage::External,
            visibility: Visibility::Default,
            cconv: CallingConvention::C,
        }
    }

    pub fn is_declaration(&self) -> bool {
        self.body.is_empty()
    }

    /// The type of this function.
    pub fn signature(&self) -> FunctionType {
        FunctionType::new(
            self.return_type,
            self.params.iter().map(|(_, ty)| *ty),
            self.variadic,
        )
    }

    pub fn entry_block(&self) -> Option<&BasicBlock> {
        self.body.first()
    }

    pub fn block(&self, label: Label) -> Option<&BasicBlock> {
        self.body.iter().find(|bb| bb.label == label)
    }

    pub fn block_mut(&mut self, label: Label) -> Option<&mut BasicBlock> {
        self.body.iter_mut().find(|bb| bb.label == label)
    }

    /// Total number of instructions, terminators included.
    pub fn instruction_count(&self) -> usize {
        self.body.iter().map(BasicBlock::len).sum()
    }

    /// Inserts `instr` right before the instruction designated by `point`.
    pub fn insert_before(&mut self, point: InsertPoint, instr: KtInstr) -> Result<()> {
        let function = self.name.clone();
        let block = self
            .block_mut(point.block)
            .ok_or(Error::UndefinedBasicBlock {
                function,
                label: point.block,
            })?;

        debug_assert!(point.index <= block.instructions.len());
        let index = point.index.min(block.instructions.len());
        block.instructions.insert(index, instr);
        Ok(())
    }

    /// Find next available [`Name`].
    pub fn next_available_name(&self) -> Name {
        let params = self.params.iter().map(|(name, _)| name.0);
        let dests = self
            .body
            .iter()
            .flat_map(|bb| bb.instructions.iter())
            .filter_map(|instr| instr.destination())
            .map(|name| name.0);

        Name(params.chain(dests).max().map_or(0, |max| max + 1))
    }

    fn check_body(&self, module: &Module) -> Result<()> {
        let function = || self.name.clone();

        let mut labels = BTreeSet::new();
        for bb in &self.body {
            if !labels.insert(bb.label) {
                return Err(Error::BlockLabelAlreadyExists {
                    function: function(),
                    label: bb.label,
                });
            }
        }

        let mut defined = BTreeSet::new();
        let dests = self
            .body
            .iter()
            .flat_map(|bb| bb.instructions.iter())
            .filter_map(|instr| instr.destination());
        for name in self.params.iter().map(|(name, _)| *name).chain(dests) {
            if !defined.insert(name) {
                return Err(Error::DuplicateSSAName {
                    function: function(),
                    duplicate: name,
                });
            }
        }

        for bb in &self.body {
            let terminator = bb.terminator.as_ref().ok_or(Error::MissingTerminator {
                function: function(),
                block: bb.label,
            })?;

            if let Some(label) = terminator.targets().find(|label| !labels.contains(label)) {
                return Err(Error::UndefinedBasicBlock {
                    function: function(),
                    label,
                });
            }

            let operands = bb
                .instructions
                .iter()
                .flat_map(|instr| instr.operands())
                .chain(terminator.operands());
            for operand in operands {
                match operand {
                    Operand::Reg(name) if !defined.contains(name) => {
                        return Err(Error::UndefinedSSAName {
                            function: function(),
                            undefined: *name,
                        });
                    }
                    Operand::Func(fref) if module.function(*fref).is_none() => {
                        return Err(Error::UndefinedCallee {
                            function: function(),
                        });
                    }
                    Operand::Global(gref) if module.global(*gref).is_none() => {
                        return Err(Error::DanglingSymbolHandle {
                            handle: gref.0.to_string(),
                        });
                    }
                    _ => {}
                }
            }

            for instr in &bb.instructions {
                if let KtInstr::Invoke(call) = instr {
                    self.check_call(module, call)?;
                }
            }
        }

        Ok(())
    }

    fn check_call(&self, module: &Module, call: &instructions::Invoke) -> Result<()> {
        let Operand::Func(fref) = &call.function else {
            // Indirect calls cannot be checked statically.
            return Ok(());
        };
        let callee = module.function(*fref).ok_or(Error::UndefinedCallee {
            function: self.name.clone(),
        })?;

        let arity_ok = if callee.variadic {
            call.args.len() >= callee.params.len()
        } else {
            call.args.len() == callee.params.len()
        };
        if !arity_ok {
            return Err(Error::CallArityMismatch {
                function: self.name.clone(),
                callee: callee.name.clone(),
                expected: callee.params.len(),
                found: call.args.len(),
            });
        }

        if call.cconv != callee.cconv {
            return Err(Error::CallingConventionMismatch {
                function: self.name.clone(),
                callee: callee.name.clone(),
                call_site: call.cconv,
                callee_cconv: callee.cconv,
            });
        }

        Ok(())
    }
}

/// A global variable, optionally initialised with an integer constant.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct GlobalVariable {
    pub uuid: Uuid,
    pub name: String,
    pub ty: Type,
    pub initializer: Option<IConst>,
    pub constant: bool,
    pub linkage: Linkage,
}

impl GlobalVariable {
    pub fn new(name: impl Into<String>, ty: Type, initializer: Option<IConst>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            ty,
            initializer,
            constant: false,
            linkage: Linkage::External,
        }
    }
}

/// A compilation unit: functions and global variables.
///
/// Iteration order over `functions` and `globals` is the insertion order.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Default)]
pub struct Module {
    pub name: String,
    pub functions: Vec<Function>,
    pub globals: Vec<GlobalVariable>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Look up any symbol (function or global variable) by exact name.
    pub fn symbol(&self, name: &str) -> Option<SymbolRef> {
        self.get_function(name).map(SymbolRef::Function).or_else(|| {
            self.globals
                .iter()
                .find(|global| global.name == name)
                .map(|global| SymbolRef::Global(GlobalRef(global.uuid)))
        })
    }

    /// First function named exactly `name`, in module order.
    pub fn get_function(&self, name: &str) -> Option<FunctionRef> {
        self.functions
            .iter()
            .find(|func| func.name == name)
            .map(|func| FunctionRef(func.uuid))
    }

    pub fn function(&self, fref: FunctionRef) -> Option<&Function> {
        self.functions.iter().find(|func| func.uuid == fref.0)
    }

    pub fn function_mut(&mut self, fref: FunctionRef) -> Option<&mut Function> {
        self.functions.iter_mut().find(|func| func.uuid == fref.0)
    }

    pub fn global(&self, gref: GlobalRef) -> Option<&GlobalVariable> {
        self.globals.iter().find(|global| global.uuid == gref.0)
    }

    /// Number of symbols (functions and globals) bound to `name`.
    pub fn declaration_count(&self, name: &str) -> usize {
        self.functions.iter().filter(|func| func.name == name).count()
            + self.globals.iter().filter(|global| global.name == name).count()
    }

    /// Appends a function. Fails if the name is already bound.
    pub fn add_function(&mut self, function: Function) -> Result<FunctionRef> {
        if function.name.is_empty() {
            return Err(Error::EmptySymbolName);
        }
        if self.symbol(&function.name).is_some() {
            return Err(Error::DuplicateSymbol {
                name: function.name,
            });
        }

        let fref = FunctionRef(function.uuid);
        self.functions.push(function);
        Ok(fref)
    }

    /// Appends a global variable. Fails if the name is already bound.
    pub fn add_global(&mut self, global: GlobalVariable) -> Result<GlobalRef> {
        if global.name.is_empty() {
            return Err(Error::EmptySymbolName);
        }
        if self.symbol(&global.name).is_some() {
            return Err(Error::DuplicateSymbol { name: global.name });
        }

        let gref = GlobalRef(global.uuid);
        self.globals.push(global);
        Ok(gref)
    }

    /// Returns the function called `name` if it has type `ty`, or declares a
    /// new external function of that type when the name is free.
    ///
    /// Fails with [`Error::SymbolTypeMismatch`] when the name is bound to a
    /// function of another type or to a global variable; the module is left
    /// untouched in that case.
    pub fn get_or_insert_function(&mut self, name: &str, ty: &FunctionType) -> Result<FunctionRef> {
        self.probe_function(name, ty)?;

        if let Some(fref) = self.get_function(name) {
            return Ok(fref);
        }

        trace!("declaring `@{}` with type `{}`", name, ty);
        self.add_function(Function::declaration(name, ty))
    }

    /// Checks, without mutating the module, whether
    /// [`get_or_insert_function`](Self::get_or_insert_function) would succeed.
    /// Returns the existing function when there is one.
    pub fn probe_function(&self, name: &str, ty: &FunctionType) -> Result<Option<FunctionRef>> {
        if name.is_empty() {
            return Err(Error::EmptySymbolName);
        }

        match self.symbol(name) {
            None => Ok(None),
            Some(SymbolRef::Function(fref)) => {
                let found = self
                    .function(fref)
                    .ok_or(Error::DanglingSymbolHandle {
                        handle: fref.0.to_string(),
                    })?
                    .signature();
                if &found == ty {
                    Ok(Some(fref))
                } else {
                    Err(Error::SymbolTypeMismatch {
                        name: name.to_string(),
                        expected: ty.to_string(),
                        found: found.to_string(),
                    })
                }
            }
            Some(SymbolRef::Global(gref)) => {
                let found = self.global(gref).map_or_else(String::new, |global| global.ty.to_string());
                Err(Error::SymbolTypeMismatch {
                    name: name.to_string(),
                    expected: ty.to_string(),
                    found: format!("{}*", found),
                })
            }
        }
    }

    /// Verify structural well-formedness of the whole module.
    pub fn verify(&self) -> Result<()> {
        let mut names = BTreeSet::new();
        let symbol_names = self
            .functions
            .iter()
            .map(|func| &func.name)
            .chain(self.globals.iter().map(|global| &global.name));
        for name in symbol_names {
            if !names.insert(name) {
                return Err(Error::DuplicateSymbol { name: name.clone() });
            }
        }

        for function in &self.functions {
            function.check_body(self)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::primary::IType;

    #[test]
    fn get_or_insert_declares_once() {
        let mut module = Module::new("m");
        let first = module.get_or_insert_function("hook", &FunctionType::void()).unwrap();
        let second = module.get_or_insert_function("hook", &FunctionType::void()).unwrap();

        assert_eq!(first, second);
        assert_eq!(module.declaration_count("hook"), 1);
        assert!(module.function(first).unwrap().is_declaration());
    }

    #[test]
    fn get_or_insert_rejects_other_signatures() {
        let mut module = Module::new("m");
        let ty = FunctionType::new(Some(IType::I32.into()), [], false);
        module.get_or_insert_function("hook", &ty).unwrap();
        let before = module.clone();

        let err = module
            .get_or_insert_function("hook", &FunctionType::void())
            .unwrap_err();
        assert!(err.is_symbol_type_mismatch());
        assert_eq!(module, before);
    }

    #[test]
    fn global_variables_shadow_function_lookups() {
        let mut module = Module::new("m");
        module
            .add_global(GlobalVariable::new("hook", IType::I32.into(), Some(0.into())))
            .unwrap();

        assert!(matches!(module.symbol("hook"), Some(SymbolRef::Global(_))));
        assert!(module.get_function("hook").is_none());
        assert!(
            module
                .get_or_insert_function("hook", &FunctionType::void())
                .unwrap_err()
                .is_symbol_type_mismatch()
        );
    }

    #[test]
    fn empty_names_are_rejected() {
        let mut module = Module::new("m");
        assert_eq!(
            module.get_or_insert_function("", &FunctionType::void()),
            Err(Error::EmptySymbolName)
        );
        assert!(module.functions.is_empty());
    }
}
