//! Lookup of the function to instrument.
use ktinstr::modules::{Module, symbol::FunctionRef};
use log::debug;

/// First function, defined or declared, named exactly `name`, in module order.
///
/// Absence is not an error: most modules do not contain the target.
pub fn locate(module: &Module, name: &str) -> Option<FunctionRef> {
    let mut matches = module.functions.iter().filter(|func| func.name == name);
    let first = matches.next()?;

    let shadowed = matches.count();
    if shadowed > 0 {
        debug!(
            "{} other function(s) named `@{}` in module `{}`; using the first one",
            shadowed, name, module.name
        );
    }

    Some(FunctionRef(first.uuid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ktinstr::{
        modules::{Function, parser::parse_module},
        types::FunctionType,
    };

    #[test]
    fn exact_name_match() {
        let module = parse_module(
            "m",
            r#"
            declare void @Alpha()
            declare void @alpha_()
            declare void @alpha()
            "#,
        )
        .unwrap();

        let found = locate(&module, "alpha").unwrap();
        assert_eq!(module.function(found).unwrap().name, "alpha");
        assert!(locate(&module, "ALPHA").is_none());
        assert!(locate(&module, "").is_none());
    }

    #[test]
    fn first_of_several_matches() {
        let mut module = Module::new("m");
        let first = Function::declaration("alpha", &FunctionType::void());
        let uuid = first.uuid;
        // Bypasses the symbol table to model aliased definitions.
        module.functions.push(first);
        module.functions.push(Function::declaration("alpha", &FunctionType::void()));

        assert_eq!(locate(&module, "alpha"), Some(FunctionRef(uuid)));
    }
}
