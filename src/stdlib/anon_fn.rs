// src/stdlib/anon_fn.rs
//! The anonymous-function classes `Fn0<R>` through `Fn9<A1..A9, R>`.
//!
//! A lambda of N parameters is an instance of `FnN` specialized at its
//! parameter types plus its body type; invocation goes through the `call`
//! method, which specialization makes polymorphic.

use super::{builtin_generic, native_method, param};
use crate::sema::class_registry::ClassDef;
use crate::sema::types::{raw, typaram};

/// Largest lambda parameter list the manifest provides a class for.
pub const MAX_LAMBDA_PARAMS: usize = 9;

/// Name of the anonymous-function class of the given arity.
pub fn class_for_arity(arity: usize) -> String {
    format!("Fn{}", arity)
}

pub fn classes() -> Vec<ClassDef> {
    let mut classes = Vec::new();
    for arity in 0..=MAX_LAMBDA_PARAMS {
        let param_names: Vec<String> = (1..=arity).map(|i| format!("A{}", i)).collect();
        let mut type_params: Vec<&str> = param_names.iter().map(String::as_str).collect();
        type_params.push("R");

        let call = native_method(
            "call",
            param_names
                .iter()
                .enumerate()
                .map(|(i, p)| param(&format!("a{}", i + 1), typaram(p)))
                .collect(),
            typaram("R"),
        );

        classes.extend(builtin_generic(
            &class_for_arity(arity),
            &type_params,
            raw("Object"),
            vec![call],
        ));
    }
    classes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sema::class_registry::ClassKind;

    #[test]
    fn call_signatures_match_the_arity() {
        let classes = classes();
        let fn2 = classes.iter().find(|c| c.name == "Fn2").unwrap();
        match &fn2.kind {
            ClassKind::Generic { params } => assert_eq!(params, &["A1", "A2", "R"]),
            other => panic!("unexpected kind {:?}", other),
        }
        let call = &fn2.methods["call"];
        assert_eq!(call.params.len(), 2);
        assert_eq!(call.ret, typaram("R"));
    }
}
