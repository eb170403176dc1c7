//! Pretty-print helpers for instructions, terminators, functions, and modules.
//!
//! The output is the textual form accepted by [`super::parser`].
use std::fmt::{Display, Formatter, Result};

use crate::modules::{
    BasicBlock, CallingConvention, Function, GlobalVariable, Linkage, Module, Visibility,
    instructions::KtInstr,
    operand::{Label, Operand},
    terminator::Terminator,
};

impl Operand {
    /// Build a formatting helper that renders the operand using the given module
    /// to resolve symbol names.
    pub fn fmt<'a>(&'a self, module: Option<&'a Module>) -> impl Display + 'a {
        struct Fmt<'a> {
            operand: &'a Operand,
            module: Option<&'a Module>,
        }

        impl Display for Fmt<'_> {
            fn fmt(&self, f: &mut Formatter<'_>) -> Result {
                match self.operand {
                    Operand::Reg(name) => write!(f, "{}", name),
                    Operand::Imm(constant) => write!(f, "{}", constant.value),
                    Operand::Func(fref) => {
                        match self.module.and_then(|module| module.function(*fref)) {
                            Some(func) => write!(f, "@{}", func.name),
                            None => write!(f, "@\"{}\"", fref.0),
                        }
                    }
                    Operand::Global(gref) => {
                        match self.module.and_then(|module| module.global(*gref)) {
                            Some(global) => write!(f, "@{}", global.name),
                            None => write!(f, "@\"{}\"", gref.0),
                        }
                    }
                }
            }
        }

        Fmt {
            operand: self,
            module,
        }
    }
}

fn fmt_cconv(f: &mut Formatter<'_>, cconv: CallingConvention) -> Result {
    match cconv {
        CallingConvention::C => Ok(()),
        cconv => write!(f, "{} ", cconv),
    }
}

fn fmt_ret(f: &mut Formatter<'_>, ty: &Option<crate::types::Type>) -> Result {
    match ty {
        Some(ty) => write!(f, "{}", ty),
        None => write!(f, "void"),
    }
}

impl KtInstr {
    /// Build a formatting helper that renders the instruction.
    pub fn fmt<'a>(&'a self, module: Option<&'a Module>) -> impl Display + 'a {
        struct Fmt<'a> {
            instr: &'a KtInstr,
            module: Option<&'a Module>,
        }

        impl Display for Fmt<'_> {
            fn fmt(&self, f: &mut Formatter<'_>) -> Result {
                let module = self.module;
                match self.instr {
                    KtInstr::IBinary(bin) => write!(
                        f,
                        "{} = {} {} {}, {}",
                        bin.dest,
                        bin.op,
                        bin.ty,
                        bin.lhs.fmt(module),
                        bin.rhs.fmt(module)
                    ),
                    KtInstr::ICmp(cmp) => write!(
                        f,
                        "{} = icmp {} {} {}, {}",
                        cmp.dest,
                        cmp.predicate,
                        cmp.ty,
                        cmp.lhs.fmt(module),
                        cmp.rhs.fmt(module)
                    ),
                    KtInstr::MAlloca(alloca) => write!(f, "{} = alloca {}", alloca.dest, alloca.ty),
                    KtInstr::MLoad(load) => {
                        write!(f, "{} = load ", load.dest)?;
                        if load.volatile {
                            write!(f, "volatile ")?;
                        }
                        write!(f, "{}, ptr {}", load.ty, load.addr.fmt(module))
                    }
                    KtInstr::MStore(store) => {
                        write!(f, "store ")?;
                        if store.volatile {
                            write!(f, "volatile ")?;
                        }
                        write!(
                            f,
                            "{} {}, ptr {}",
                            store.ty,
                            store.value.fmt(module),
                            store.addr.fmt(module)
                        )
                    }
                    KtInstr::Invoke(call) => {
                        if let Some(dest) = call.dest {
                            write!(f, "{} = ", dest)?;
                        }
                        write!(f, "call ")?;
                        fmt_cconv(f, call.cconv)?;
                        fmt_ret(f, &call.ty)?;
                        write!(f, " {}(", call.function.fmt(module))?;
                        for (i, (ty, arg)) in call.args.iter().enumerate() {
                            if i > 0 {
                                write!(f, ", ")?;
                            }
                            write!(f, "{} {}", ty, arg.fmt(module))?;
                        }
                        write!(f, ")")
                    }
                }
            }
        }

        Fmt {
            instr: self,
            module,
        }
    }
}

impl Function {
    fn label_name(&self, label: Label) -> String {
        self.block(label)
            .and_then(|bb| bb.name.clone())
            .unwrap_or_else(|| format!("bb{}", label.0))
    }

    fn fmt_terminator(&self, f: &mut Formatter<'_>, module: Option<&Module>, term: &Terminator) -> Result {
        match term {
            Terminator::CBranch(cbranch) => write!(
                f,
                "br i1 {}, label %{}, label %{}",
                cbranch.cond.fmt(module),
                self.label_name(cbranch.target_true),
                self.label_name(cbranch.target_false)
            ),
            Terminator::Jump(jump) => write!(f, "br label %{}", self.label_name(jump.target)),
            Terminator::Ret(ret) => match &ret.value {
                Some((ty, value)) => write!(f, "ret {} {}", ty, value.fmt(module)),
                None => write!(f, "ret void"),
            },
            Terminator::Unreachable(_) => write!(f, "unreachable"),
        }
    }

    fn fmt_block(&self, f: &mut Formatter<'_>, module: Option<&Module>, bb: &BasicBlock) -> Result {
        writeln!(f, "{}:", self.label_name(bb.label))?;
        for instr in &bb.instructions {
            writeln!(f, "  {}", instr.fmt(module))?;
        }
        if let Some(term) = &bb.terminator {
            write!(f, "  ")?;
            self.fmt_terminator(f, module, term)?;
            writeln!(f)?;
        }
        Ok(())
    }

    /// Build a formatting helper that renders the whole function, as a
    /// `define` when it has a body and as a `declare` otherwise.
    pub fn fmt<'a>(&'a self, module: Option<&'a Module>) -> impl Display + 'a {
        struct Fmt<'a> {
            func: &'a Function,
            module: Option<&'a Module>,
        }

        impl Display for Fmt<'_> {
            fn fmt(&self, f: &mut Formatter<'_>) -> Result {
                let func = self.func;
                if func.is_declaration() {
                    write!(f, "declare ")?;
                } else {
                    write!(f, "define ")?;
                }
                fmt_linkage(f, func.linkage)?;
                match func.visibility {
                    Visibility::Default => {}
                    Visibility::Hidden => write!(f, "hidden ")?,
                    Visibility::Protected => write!(f, "protected ")?,
                }
                fmt_cconv(f, func.cconv)?;
                fmt_ret(f, &func.return_type)?;
                write!(f, " @{}(", func.name)?;
                for (i, (name, ty)) in func.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if func.is_declaration() {
                        write!(f, "{}", ty)?;
                    } else {
                        write!(f, "{} {}", ty, name)?;
                    }
                }
                if func.variadic {
                    if func.params.is_empty() {
                        write!(f, "...")?;
                    } else {
                        write!(f, ", ...")?;
                    }
                }
                write!(f, ")")?;

                if func.is_declaration() {
                    return writeln!(f);
                }

                writeln!(f, " {{")?;
                for bb in &func.body {
                    func.fmt_block(f, self.module, bb)?;
                }
                writeln!(f, "}}")
            }
        }

        Fmt { func: self, module }
    }
}

fn fmt_linkage(f: &mut Formatter<'_>, linkage: Linkage) -> Result {
    match linkage {
        Linkage::External => Ok(()),
        Linkage::Private => write!(f, "private "),
        Linkage::Internal => write!(f, "internal "),
        Linkage::ExternalWeak => write!(f, "extern_weak "),
    }
}

impl Display for GlobalVariable {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "@{} = ", self.name)?;
        fmt_linkage(f, self.linkage)?;
        if self.constant {
            write!(f, "constant {}", self.ty)?;
        } else {
            write!(f, "global {}", self.ty)?;
        }
        if let Some(init) = &self.initializer {
            write!(f, " {}", init.value)?;
        }
        Ok(())
    }
}

impl Display for Module {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        writeln!(f, "; module {}", self.name)?;
        for global in &self.globals {
            writeln!(f, "{}", global)?;
        }
        for func in &self.functions {
            writeln!(f)?;
            write!(f, "{}", func.fmt(Some(self)))?;
        }
        Ok(())
    }
}
