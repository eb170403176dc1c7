//! Textual module parser.
//!
//! Parsing happens in two stages. The chumsky grammar below produces a small
//! syntax tree where every value, block and symbol is still referred to by its
//! textual name; [`extend_module_from_string`] then declares every symbol and
//! lowers the function bodies, resolving names to [`Name`]s, [`Label`]s and
//! symbol handles. Splitting the stages keeps forward references (branches to
//! later blocks, calls to functions defined further down) trivial.
//!
//! ```text
//! @counter = global i32 0
//!
//! declare fastcc void @hook()
//!
//! define void @entry(i32 %x) {
//! entry:
//!   %slot = alloca i32
//!   store i32 %x, ptr %slot
//!   ret void
//! }
//! ```
use std::collections::BTreeMap;

use chumsky::prelude::*;
use smallvec::SmallVec;

use crate::{
    modules::{
        BasicBlock, CallingConvention, Function, GlobalVariable, Linkage, Module, Visibility,
        instructions::{IBinOp, IBinary, ICmp, ICmpPredicate, Invoke, KtInstr, MAlloca, MLoad, MStore},
        operand::{IConst, Label, Name, Operand},
        symbol::SymbolRef,
        terminator::{CBranch, Jump, Ret, Terminator, Unreachable},
    },
    types::{
        FunctionType, Type,
        primary::{FType, IType},
    },
    utils::{Error, Result},
};

type Extra<'src> = extra::Err<Rich<'src, char>>;

#[derive(Debug, Clone, PartialEq)]
enum AstValue {
    Local(String),
    Symbol(String),
    Int(i128),
}

#[derive(Debug, Clone)]
enum AstInstrKind {
    Binary {
        op: IBinOp,
        ty: IType,
        lhs: AstValue,
        rhs: AstValue,
    },
    ICmp {
        predicate: ICmpPredicate,
        ty: IType,
        lhs: AstValue,
        rhs: AstValue,
    },
    Alloca {
        ty: Type,
    },
    Load {
        volatile: bool,
        ty: Type,
        addr: AstValue,
    },
    Store {
        volatile: bool,
        ty: Type,
        value: AstValue,
        addr: AstValue,
    },
    Call {
        cconv: CallingConvention,
        ret: Option<Type>,
        callee: AstValue,
        args: Vec<(Type, AstValue)>,
    },
}

#[derive(Debug, Clone)]
struct AstInstr {
    dest: Option<String>,
    kind: AstInstrKind,
}

#[derive(Debug, Clone)]
enum AstTerminator {
    Ret(Option<(Type, AstValue)>),
    Br(String),
    CondBr(AstValue, String, String),
    Unreachable,
}

#[derive(Debug, Clone)]
struct AstBlock {
    name: String,
    instructions: Vec<AstInstr>,
    terminator: AstTerminator,
}

#[derive(Debug, Clone)]
struct AstFunction {
    linkage: Linkage,
    visibility: Visibility,
    cconv: CallingConvention,
    ret: Option<Type>,
    name: String,
    params: Vec<(Type, Option<String>)>,
    variadic: bool,
    body: Option<Vec<AstBlock>>,
}

#[derive(Debug, Clone)]
struct AstGlobal {
    name: String,
    linkage: Linkage,
    constant: bool,
    ty: Type,
    init: Option<i128>,
}

#[derive(Debug, Clone)]
enum AstItem {
    Function(AstFunction),
    Global(AstGlobal),
}

fn symbol_name<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    any()
        .filter(|c: &char| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$'))
        .repeated()
        .at_least(1)
        .to_slice()
        .map(|s: &str| s.to_string())
        .labelled("name")
}

fn type_keyword(ident: &str) -> Option<Type> {
    match ident {
        "ptr" => Some(Type::Ptr),
        "half" => Some(FType::Fp16.into()),
        "bfloat" => Some(FType::Bf16.into()),
        "float" => Some(FType::Fp32.into()),
        "double" => Some(FType::Fp64.into()),
        "fp128" => Some(FType::Fp128.into()),
        _ => {
            let width = ident.strip_prefix('i')?.parse::<u32>().ok()?;
            IType::new(width).map(Type::Int)
        }
    }
}

pub fn type_parser<'src>() -> impl Parser<'src, &'src str, Type, Extra<'src>> + Clone {
    text::ident()
        .try_map(|ident: &str, span| {
            type_keyword(ident).ok_or_else(|| Rich::custom(span, format!("unknown type `{}`", ident)))
        })
        .labelled("type")
}

fn itype_parser<'src>() -> impl Parser<'src, &'src str, IType, Extra<'src>> + Clone {
    type_parser()
        .try_map(|ty, span| match ty {
            Type::Int(ity) => Ok(ity),
            other => Err(Rich::custom(span, format!("expected an integer type, got `{}`", other))),
        })
        .labelled("integer type")
}

fn ret_type_parser<'src>() -> impl Parser<'src, &'src str, Option<Type>, Extra<'src>> + Clone {
    choice((text::keyword("void").to(None), type_parser().map(Some)))
}

fn value_parser<'src>() -> impl Parser<'src, &'src str, AstValue, Extra<'src>> + Clone {
    let integer = just('-')
        .or_not()
        .then(text::int(10))
        .try_map(|(neg, digits): (Option<char>, &str), span| {
            let value = digits
                .parse::<i128>()
                .map_err(|e| Rich::custom(span, format!("invalid integer literal: {}", e)))?;
            Ok(AstValue::Int(if neg.is_some() { -value } else { value }))
        });

    choice((
        just('%').ignore_then(symbol_name()).map(AstValue::Local),
        just('@').ignore_then(symbol_name()).map(AstValue::Symbol),
        integer,
    ))
    .labelled("value")
}

pub fn cconv_parser<'src>() -> impl Parser<'src, &'src str, CallingConvention, Extra<'src>> + Clone {
    let numbered = text::keyword("cc")
        .ignore_then(text::int(10).padded())
        .try_map(|digits: &str, span| {
            digits
                .parse::<u32>()
                .map(CallingConvention::Numbered)
                .map_err(|e| Rich::custom(span, format!("invalid calling convention number: {}", e)))
        });

    choice((
        text::keyword("ccc").to(CallingConvention::C),
        text::keyword("fastcc").to(CallingConvention::FastC),
        text::keyword("coldcc").to(CallingConvention::ColdC),
        text::keyword("preserve_mostcc").to(CallingConvention::PreserveMostC),
        text::keyword("preserve_allcc").to(CallingConvention::PreserveAllC),
        text::keyword("tailcc").to(CallingConvention::TailC),
        numbered,
    ))
    .labelled("calling convention")
}

fn linkage_parser<'src>() -> impl Parser<'src, &'src str, Linkage, Extra<'src>> + Clone {
    choice((
        text::keyword("private").to(Linkage::Private),
        text::keyword("internal").to(Linkage::Internal),
        text::keyword("extern_weak").to(Linkage::ExternalWeak),
    ))
    .padded()
    .or_not()
    .map(Option::unwrap_or_default)
}

fn visibility_parser<'src>() -> impl Parser<'src, &'src str, Visibility, Extra<'src>> + Clone {
    choice((
        text::keyword("hidden").to(Visibility::Hidden),
        text::keyword("protected").to(Visibility::Protected),
    ))
    .padded()
    .or_not()
    .map(Option::unwrap_or_default)
}

fn instruction_parser<'src>() -> impl Parser<'src, &'src str, AstInstr, Extra<'src>> + Clone {
    let comma = || just(',').padded();
    let volatile = || text::keyword("volatile").padded().or_not().map(|v| v.is_some());

    let binop = text::ident().try_map(|ident: &str, span| {
        ident
            .parse::<IBinOp>()
            .map_err(|_| Rich::custom(span, format!("unknown binary operator `{}`", ident)))
    });
    let predicate = text::ident().try_map(|ident: &str, span| {
        ident
            .parse::<ICmpPredicate>()
            .map_err(|_| Rich::custom(span, format!("unknown icmp predicate `{}`", ident)))
    });

    let binary = binop
        .padded()
        .then(itype_parser().padded())
        .then(value_parser().padded())
        .then_ignore(comma())
        .then(value_parser().padded())
        .map(|(((op, ty), lhs), rhs)| AstInstrKind::Binary { op, ty, lhs, rhs });

    let icmp = text::keyword("icmp")
        .padded()
        .ignore_then(predicate.padded())
        .then(itype_parser().padded())
        .then(value_parser().padded())
        .then_ignore(comma())
        .then(value_parser().padded())
        .map(|(((predicate, ty), lhs), rhs)| AstInstrKind::ICmp {
            predicate,
            ty,
            lhs,
            rhs,
        });

    let alloca = text::keyword("alloca")
        .padded()
        .ignore_then(type_parser().padded())
        .map(|ty| AstInstrKind::Alloca { ty });

    let load = text::keyword("load")
        .padded()
        .ignore_then(volatile())
        .then(type_parser().padded())
        .then_ignore(comma())
        .then_ignore(text::keyword("ptr").padded())
        .then(value_parser().padded())
        .map(|((volatile, ty), addr)| AstInstrKind::Load { volatile, ty, addr });

    let store = text::keyword("store")
        .padded()
        .ignore_then(volatile())
        .then(type_parser().padded())
        .then(value_parser().padded())
        .then_ignore(comma())
        .then_ignore(text::keyword("ptr").padded())
        .then(value_parser().padded())
        .map(|(((volatile, ty), value), addr)| AstInstrKind::Store {
            volatile,
            ty,
            value,
            addr,
        });

    let args = type_parser()
        .padded()
        .then(value_parser().padded())
        .separated_by(just(','))
        .collect::<Vec<_>>()
        .delimited_by(just('('), just(')'));

    let call = text::keyword("call")
        .padded()
        .ignore_then(cconv_parser().padded().or_not())
        .then(ret_type_parser().padded())
        .then(value_parser().padded())
        .then(args.padded())
        .map(|(((cconv, ret), callee), args)| AstInstrKind::Call {
            cconv: cconv.unwrap_or_default(),
            ret,
            callee,
            args,
        });

    let dest = just('%')
        .ignore_then(symbol_name())
        .then_ignore(just('=').padded());

    dest.padded()
        .or_not()
        .then(choice((icmp, alloca, load, store, call, binary)))
        .map(|(dest, kind)| AstInstr { dest, kind })
        .labelled("instruction")
        .boxed()
}

fn terminator_parser<'src>() -> impl Parser<'src, &'src str, AstTerminator, Extra<'src>> + Clone {
    let label_ref = || {
        text::keyword("label")
            .padded()
            .ignore_then(just('%'))
            .ignore_then(symbol_name())
    };

    let ret = text::keyword("ret").padded().ignore_then(choice((
        text::keyword("void").to(AstTerminator::Ret(None)),
        type_parser()
            .padded()
            .then(value_parser())
            .map(|ret| AstTerminator::Ret(Some(ret))),
    )));

    let br = text::keyword("br").padded().ignore_then(choice((
        label_ref().map(AstTerminator::Br),
        type_parser()
            .padded()
            .ignore_then(value_parser().padded())
            .then_ignore(just(',').padded())
            .then(label_ref().padded())
            .then_ignore(just(',').padded())
            .then(label_ref())
            .map(|((cond, on_true), on_false)| AstTerminator::CondBr(cond, on_true, on_false)),
    )));

    let unreachable = text::keyword("unreachable").to(AstTerminator::Unreachable);

    choice((ret, br, unreachable)).labelled("terminator").boxed()
}

fn block_parser<'src>() -> impl Parser<'src, &'src str, AstBlock, Extra<'src>> + Clone {
    symbol_name()
        .then_ignore(just(':'))
        .padded()
        .then(instruction_parser().padded().repeated().collect::<Vec<_>>())
        .then(terminator_parser().padded())
        .map(|((name, instructions), terminator)| AstBlock {
            name,
            instructions,
            terminator,
        })
        .labelled("basic block")
}

fn function_parser<'src>() -> impl Parser<'src, &'src str, AstFunction, Extra<'src>> + Clone {
    let param = choice((
        just("...").to(None),
        type_parser()
            .then(just('%').padded().ignore_then(symbol_name()).or_not())
            .map(Some),
    ))
    .padded();

    let params = param
        .separated_by(just(','))
        .collect::<Vec<_>>()
        .delimited_by(just('('), just(')'));

    let body = block_parser()
        .repeated()
        .at_least(1)
        .collect::<Vec<_>>()
        .delimited_by(just('{').padded(), just('}').padded());

    choice((text::keyword("define").to(true), text::keyword("declare").to(false)))
        .padded()
        .then(linkage_parser())
        .then(visibility_parser())
        .then(cconv_parser().padded().or_not())
        .then(ret_type_parser().padded())
        .then(just('@').ignore_then(symbol_name()).padded())
        .then(params.padded())
        .then(body.or_not())
        .try_map(
            |(((((((is_definition, linkage), visibility), cconv), ret), name), params), body), span| {
                if is_definition != body.is_some() {
                    let msg = if is_definition {
                        format!("`define @{}` requires a body", name)
                    } else {
                        format!("`declare @{}` cannot have a body", name)
                    };
                    return Err(Rich::custom(span, msg));
                }

                let variadic = params.last().is_some_and(Option::is_none);
                let params = params.into_iter().flatten().collect();
                Ok(AstFunction {
                    linkage,
                    visibility,
                    cconv: cconv.unwrap_or_default(),
                    ret,
                    name,
                    params,
                    variadic,
                    body,
                })
            },
        )
        .labelled("function")
}

fn global_parser<'src>() -> impl Parser<'src, &'src str, AstGlobal, Extra<'src>> + Clone {
    let init = just('-')
        .or_not()
        .then(text::int(10))
        .try_map(|(neg, digits): (Option<char>, &str), span| {
            digits
                .parse::<i128>()
                .map(|v| if neg.is_some() { -v } else { v })
                .map_err(|e| Rich::custom(span, format!("invalid initializer: {}", e)))
        });

    just('@')
        .ignore_then(symbol_name())
        .then_ignore(just('=').padded())
        .then(linkage_parser())
        .then(choice((
            text::keyword("global").to(false),
            text::keyword("constant").to(true),
        )))
        .then(type_parser().padded())
        .then(init.padded().or_not())
        .map(|((((name, linkage), constant), ty), init)| AstGlobal {
            name,
            linkage,
            constant,
            ty,
            init,
        })
        .labelled("global variable")
}

fn module_parser<'src>() -> impl Parser<'src, &'src str, Vec<AstItem>, Extra<'src>> {
    choice((
        global_parser().map(AstItem::Global),
        function_parser().map(AstItem::Function),
    ))
    .padded()
    .repeated()
    .collect::<Vec<_>>()
    .then_ignore(end())
}

/// Line comments start with `;` and run to the end of the line.
fn strip_comments(source: &str) -> String {
    source
        .lines()
        .map(|line| line.split_once(';').map_or(line, |(code, _)| code))
        .collect::<Vec<_>>()
        .join("\n")
}

struct FunctionLowering<'m> {
    module: &'m Module,
    function: &'m str,
    names: BTreeMap<String, Name>,
    labels: BTreeMap<String, Label>,
}

impl FunctionLowering<'_> {
    fn value(&self, value: &AstValue, ty: Type) -> Result<Operand> {
        match value {
            AstValue::Local(name) => self
                .names
                .get(name)
                .copied()
                .map(Operand::Reg)
                .ok_or_else(|| Error::UnknownValueName {
                    function: self.function.to_string(),
                    name: name.clone(),
                }),
            AstValue::Symbol(name) => lower_symbol(self.module, name),
            AstValue::Int(value) => match ty {
                Type::Int(ty) => Ok(Operand::Imm(IConst { ty, value: *value })),
                other => Err(Error::Parse {
                    message: format!(
                        "integer literal `{}` used as a `{}` value in function `@{}`",
                        value, other, self.function
                    ),
                }),
            },
        }
    }

    fn label(&self, name: &str) -> Result<Label> {
        self.labels.get(name).copied().ok_or_else(|| Error::UnknownBlockName {
            function: self.function.to_string(),
            name: name.to_string(),
        })
    }

    fn instruction(&self, instr: &AstInstr) -> Result<KtInstr> {
        let dest = || -> Result<Name> {
            let name = instr.dest.as_ref().ok_or_else(|| Error::Parse {
                message: format!("instruction in `@{}` requires a destination", self.function),
            })?;
            self.names.get(name).copied().ok_or_else(|| Error::UnknownValueName {
                function: self.function.to_string(),
                name: name.clone(),
            })
        };

        Ok(match &instr.kind {
            AstInstrKind::Binary { op, ty, lhs, rhs } => IBinary {
                dest: dest()?,
                op: *op,
                ty: *ty,
                lhs: self.value(lhs, (*ty).into())?,
                rhs: self.value(rhs, (*ty).into())?,
            }
            .into(),
            AstInstrKind::ICmp {
                predicate,
                ty,
                lhs,
                rhs,
            } => ICmp {
                dest: dest()?,
                predicate: *predicate,
                ty: *ty,
                lhs: self.value(lhs, (*ty).into())?,
                rhs: self.value(rhs, (*ty).into())?,
            }
            .into(),
            AstInstrKind::Alloca { ty } => MAlloca {
                dest: dest()?,
                ty: *ty,
            }
            .into(),
            AstInstrKind::Load { volatile, ty, addr } => MLoad {
                dest: dest()?,
                ty: *ty,
                addr: self.value(addr, Type::Ptr)?,
                volatile: *volatile,
            }
            .into(),
            AstInstrKind::Store {
                volatile,
                ty,
                value,
                addr,
            } => MStore {
                ty: *ty,
                value: self.value(value, *ty)?,
                addr: self.value(addr, Type::Ptr)?,
                volatile: *volatile,
            }
            .into(),
            AstInstrKind::Call {
                cconv,
                ret,
                callee,
                args,
            } => Invoke {
                function: self.value(callee, Type::Ptr)?,
                args: args
                    .iter()
                    .map(|(ty, arg)| Ok((*ty, self.value(arg, *ty)?)))
                    .collect::<Result<SmallVec<_>>>()?,
                dest: instr.dest.as_ref().map(|_| dest()).transpose()?,
                ty: *ret,
                cconv: *cconv,
            }
            .into(),
        })
    }

    fn terminator(&self, term: &AstTerminator) -> Result<Terminator> {
        Ok(match term {
            AstTerminator::Ret(None) => Ret { value: None }.into(),
            AstTerminator::Ret(Some((ty, value))) => Ret {
                value: Some((*ty, self.value(value, *ty)?)),
            }
            .into(),
            AstTerminator::Br(target) => Jump {
                target: self.label(target)?,
            }
            .into(),
            AstTerminator::CondBr(cond, on_true, on_false) => CBranch {
                cond: self.value(cond, IType::I1.into())?,
                target_true: self.label(on_true)?,
                target_false: self.label(on_false)?,
            }
            .into(),
            AstTerminator::Unreachable => Unreachable.into(),
        })
    }
}

fn lower_symbol(module: &Module, name: &str) -> Result<Operand> {
    match module.symbol(name) {
        Some(SymbolRef::Function(fref)) => Ok(Operand::Func(fref)),
        Some(SymbolRef::Global(gref)) => Ok(Operand::Global(gref)),
        None => Err(Error::UnknownSymbol {
            name: name.to_string(),
        }),
    }
}

fn lower_body(module: &Module, ast: &AstFunction, blocks: &[AstBlock]) -> Result<Vec<BasicBlock>> {
    let mut names = BTreeMap::new();
    let mut next = 0u32;
    let mut define = |name: &str, names: &mut BTreeMap<String, Name>| -> Result<()> {
        let fresh = Name(next);
        next += 1;
        if names.insert(name.to_string(), fresh).is_some() {
            return Err(Error::DuplicateSSAName {
                function: ast.name.clone(),
                duplicate: fresh,
            });
        }
        Ok(())
    };

    for (i, (_, name)) in ast.params.iter().enumerate() {
        match name {
            Some(name) => define(name, &mut names)?,
            // Unnamed parameters keep their positional name.
            None => define(&i.to_string(), &mut names)?,
        }
    }
    for instr in blocks.iter().flat_map(|bb| bb.instructions.iter()) {
        if let Some(dest) = &instr.dest {
            define(dest, &mut names)?;
        }
    }

    let mut labels = BTreeMap::new();
    for (i, bb) in blocks.iter().enumerate() {
        if labels.insert(bb.name.clone(), Label(i as u32)).is_some() {
            return Err(Error::BlockLabelAlreadyExists {
                function: ast.name.clone(),
                label: Label(i as u32),
            });
        }
    }

    let lowering = FunctionLowering {
        module,
        function: &ast.name,
        names,
        labels,
    };

    blocks
        .iter()
        .map(|bb| {
            Ok(BasicBlock {
                label: lowering.label(&bb.name)?,
                name: Some(bb.name.clone()),
                instructions: bb
                    .instructions
                    .iter()
                    .map(|instr| lowering.instruction(instr))
                    .collect::<Result<Vec<_>>>()?,
                terminator: Some(lowering.terminator(&bb.terminator)?),
            })
        })
        .collect()
}

/// Parses `source` and appends every global and function it declares to
/// `module`. Symbols of `module` can be referenced from `source`.
pub fn extend_module_from_string(module: &mut Module, source: &str) -> Result<()> {
    let source = strip_comments(source);
    let items = module_parser().parse(&source).into_result().map_err(|errs| Error::Parse {
        message: errs
            .into_iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; "),
    })?;

    // Stage 1: declare every symbol so bodies can refer to any of them.
    let mut pending = Vec::new();
    for item in &items {
        match item {
            AstItem::Global(global) => {
                let mut var = GlobalVariable::new(
                    global.name.clone(),
                    global.ty,
                    match (global.init, global.ty) {
                        (Some(value), Type::Int(ty)) => Some(IConst { ty, value }),
                        (Some(_), other) => {
                            return Err(Error::Parse {
                                message: format!(
                                    "global `@{}` of type `{}` cannot have an integer initializer",
                                    global.name, other
                                ),
                            });
                        }
                        (None, _) => None,
                    },
                );
                var.constant = global.constant;
                var.linkage = global.linkage;
                module.add_global(var)?;
            }
            AstItem::Function(ast) => {
                let ty = FunctionType::new(ast.ret, ast.params.iter().map(|(ty, _)| *ty), ast.variadic);
                let mut function = Function::declaration(ast.name.clone(), &ty);
                function.linkage = ast.linkage;
                function.visibility = ast.visibility;
                function.cconv = ast.cconv;
                let fref = module.add_function(function)?;
                if let Some(body) = &ast.body {
                    pending.push((fref, ast, body));
                }
            }
        }
    }

    // Stage 2: lower bodies now that every symbol exists.
    for (fref, ast, blocks) in pending {
        let body = lower_body(module, ast, blocks)?;
        if let Some(function) = module.function_mut(fref) {
            function.body = body;
        }
    }

    Ok(())
}

/// Parses a complete module.
pub fn parse_module(name: &str, source: &str) -> Result<Module> {
    let mut module = Module::new(name);
    extend_module_from_string(&mut module, source)?;
    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::instructions::Instruction;

    const SAMPLE: &str = r#"
        ; a small module
        @counter = global i32 0

        declare fastcc void @hook()

        define i32 @bump(i32 %by) {
        entry:
          %old = load i32, ptr @counter
          %new = add i32 %old, %by
          store i32 %new, ptr @counter
          %zero = icmp eq i32 %new, 0
          br i1 %zero, label %wrap, label %done
        wrap:
          call fastcc void @hook()
          br label %done
        done:
          ret i32 %new
        }
    "#;

    #[test]
    fn parses_and_resolves_sample() {
        let module = parse_module("sample", SAMPLE).unwrap();
        module.verify().unwrap();

        let hook = module.get_function("hook").unwrap();
        let bump = module.function(module.get_function("bump").unwrap()).unwrap();

        assert_eq!(module.function(hook).unwrap().cconv, CallingConvention::FastC);
        assert_eq!(bump.body.len(), 3);
        assert_eq!(bump.entry_block().unwrap().label, Label::NIL);
        assert_eq!(bump.entry_block().unwrap().len(), 5);
        assert_eq!(bump.body[1].calls_to(hook).count(), 1);
        assert_eq!(
            bump.entry_block().unwrap().instructions[1].name_dependencies().collect::<Vec<_>>(),
            vec![Name(1), Name(0)]
        );
    }

    #[test]
    fn printed_module_parses_back_to_the_same_shape() {
        let module = parse_module("sample", SAMPLE).unwrap();
        let printed = module.to_string();
        let reparsed = parse_module("sample", &printed).unwrap();

        assert_eq!(reparsed.to_string(), printed);
    }

    #[test]
    fn unknown_symbols_are_reported() {
        let err = parse_module(
            "m",
            r#"
            define void @f() {
            entry:
              call void @missing()
              ret void
            }
            "#,
        )
        .unwrap_err();

        assert_eq!(
            err,
            Error::UnknownSymbol {
                name: "missing".to_string()
            }
        );
    }

    #[test]
    fn syntax_errors_are_reported() {
        let err = parse_module("m", "define void @f( {").unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn variadic_declarations() {
        let module = parse_module("m", "declare i32 @printf(ptr, ...)").unwrap();
        let printf = module.function(module.get_function("printf").unwrap()).unwrap();
        assert!(printf.variadic);
        assert_eq!(printf.params.len(), 1);
        assert!(printf.is_declaration());
    }
}
