//! Insertion of the hook call.
use ktinstr::modules::{
    Function, InsertPoint,
    instructions::{Invoke, KtInstr},
    operand::Operand,
};

use crate::{error::HookResult, resolver::HookHandle};

/// Where the hook call goes: before the first instruction of the first block.
///
/// Only the first block in layout order is considered, and the terminator
/// counts as an instruction. `None` when the function has no body or its
/// first block is empty.
pub fn anchor(function: &Function) -> Option<InsertPoint> {
    function.entry_block()?.first_insert_point()
}

/// The call inserted in front of the anchor: no argument, no result.
pub fn hook_call(hook: &HookHandle) -> KtInstr {
    Invoke::void_call(Operand::Func(hook.function), hook.cconv).into()
}

/// Inserts one call to `hook` at the [`anchor`] of `function`.
///
/// Returns the anchor, or `None` when the function offers none. Calls already
/// present are not looked at: instrumenting twice inserts two calls.
pub fn instrument(function: &mut Function, hook: &HookHandle) -> HookResult<Option<InsertPoint>> {
    let Some(point) = anchor(function) else {
        return Ok(None);
    };

    function.insert_before(point, hook_call(hook))?;
    Ok(Some(point))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ktinstr::{
        modules::{BasicBlock, CallingConvention, Module, operand::Label, parser::parse_module},
        types::FunctionType,
    };

    use crate::resolver::resolve;

    const SOURCE: &str = r#"
        define i32 @alpha(i32 %x) {
        entry:
            %y = add i32 %x, 1
            br label %exit
        exit:
            ret i32 %y
        }
    "#;

    #[test]
    fn call_goes_before_the_first_instruction() {
        let mut module = parse_module("m", SOURCE).unwrap();
        let hook = resolve(&mut module, "beta", CallingConvention::FastC).unwrap();
        let alpha = module.get_function("alpha").unwrap();
        let function = module.function_mut(alpha).unwrap();

        let point = instrument(function, &hook).unwrap().unwrap();
        assert_eq!(point, InsertPoint { block: Label::NIL, index: 0 });
        assert_eq!(function.body[0].instructions[0], hook_call(&hook));
        assert_eq!(function.body[0].len(), 3);
        assert_eq!(function.body[1].len(), 1);
        module.verify().unwrap();
    }

    #[test]
    fn terminator_only_block_is_an_anchor() {
        let mut module = parse_module("m", "define void @alpha() {\nentry:\n ret void\n}").unwrap();
        let hook = resolve(&mut module, "beta", CallingConvention::FastC).unwrap();
        let alpha = module.get_function("alpha").unwrap();
        let function = module.function_mut(alpha).unwrap();

        assert!(instrument(function, &hook).unwrap().is_some());
        assert_eq!(function.instruction_count(), 2);
    }

    #[test]
    fn declarations_and_empty_blocks_have_no_anchor() {
        let mut module = Module::new("m");
        let hook = resolve(&mut module, "beta", CallingConvention::FastC).unwrap();

        let mut declaration = ktinstr::modules::Function::declaration("alpha", &FunctionType::void());
        assert_eq!(instrument(&mut declaration, &hook).unwrap(), None);

        declaration.body.push(BasicBlock::new(Label::NIL));
        assert_eq!(instrument(&mut declaration, &hook).unwrap(), None);
        assert!(declaration.body[0].is_empty());
    }
}
