use ktinstr::{
    modules::{
        CallingConvention, InsertPoint, Module,
        instructions::{Invoke, KtInstr},
        operand::{Label, Operand},
        parser::parse_module,
    },
    types::FunctionType,
    utils::Error,
};

const COUNTER_SOURCE: &str = r#"
@hits = global i32 0

declare fastcc void @trace()

define void @touch(i32 %by) {
entry:
    %old = load i32, ptr @hits
    %new = add i32 %old, %by
    store i32 %new, ptr @hits
    ret void
}
"#;

fn counter_module() -> Module {
    parse_module("counter", COUNTER_SOURCE).expect("failed to parse sample module")
}

fn call_at_entry(module: &mut Module, callee: &str, cconv: CallingConvention) {
    let callee = module.get_function(callee).expect("callee present");
    let touch = module.get_function("touch").expect("touch present");
    let function = module.function_mut(touch).unwrap();
    let point = function.entry_block().unwrap().first_insert_point().unwrap();

    function
        .insert_before(point, Invoke::void_call(Operand::Func(callee), cconv).into())
        .unwrap();
}

#[test]
fn sample_module_is_well_formed() {
    let module = counter_module();
    module.verify().unwrap();

    let touch = module.function(module.get_function("touch").unwrap()).unwrap();
    assert_eq!(touch.instruction_count(), 4);
    assert_eq!(touch.signature().to_string(), "void (i32)");
}

#[test]
fn inserted_call_with_matching_convention_verifies() {
    let mut module = counter_module();
    call_at_entry(&mut module, "trace", CallingConvention::FastC);
    module.verify().unwrap();

    let touch = module.function(module.get_function("touch").unwrap()).unwrap();
    assert_eq!(touch.instruction_count(), 5);
    assert!(matches!(
        &touch.entry_block().unwrap().instructions[0],
        KtInstr::Invoke(call) if call.args.is_empty() && call.dest.is_none()
    ));
}

#[test]
fn calling_convention_mismatch_is_reported() {
    let mut module = counter_module();
    call_at_entry(&mut module, "trace", CallingConvention::C);

    assert_eq!(
        module.verify(),
        Err(Error::CallingConventionMismatch {
            function: "touch".to_string(),
            callee: "trace".to_string(),
            call_site: CallingConvention::C,
            callee_cconv: CallingConvention::FastC,
        })
    );
}

#[test]
fn call_arity_is_checked() {
    let mut module = counter_module();
    module
        .get_or_insert_function("takes_one", &FunctionType::new(None, [ktinstr::types::primary::IType::I32.into()], false))
        .unwrap();
    call_at_entry(&mut module, "takes_one", CallingConvention::C);

    assert!(module.verify().unwrap_err().is_call_arity_mismatch());
}

#[test]
fn insertion_into_unknown_block_fails() {
    let mut module = counter_module();
    let trace = module.get_function("trace").unwrap();
    let touch = module.get_function("touch").unwrap();
    let function = module.function_mut(touch).unwrap();

    let err = function
        .insert_before(
            InsertPoint {
                block: Label(7),
                index: 0,
            },
            Invoke::void_call(Operand::Func(trace), CallingConvention::FastC).into(),
        )
        .unwrap_err();
    assert!(err.is_undefined_basic_block());
}

#[test]
fn branches_to_missing_blocks_are_rejected_by_the_parser() {
    let err = parse_module(
        "m",
        r#"
        define void @f() {
        entry:
            br label %nowhere
        }
        "#,
    )
    .unwrap_err();

    assert!(err.is_unknown_block_name());
}
