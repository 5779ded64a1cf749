// src/stdlib/float.rs

use super::{builtin_class, native_method, param};
use crate::sema::class_registry::ClassDef;
use crate::sema::types::raw;

pub fn classes() -> Vec<ClassDef> {
    let arith = ["+", "-", "*", "/"]
        .iter()
        .map(|op| native_method(op, vec![param("other", raw("Float"))], raw("Float")));
    let compare = ["<", "<=", ">", ">=", "=="]
        .iter()
        .map(|op| native_method(op, vec![param("other", raw("Float"))], raw("Bool")));

    let mut methods: Vec<_> = arith.chain(compare).collect();
    methods.push(native_method("abs", vec![], raw("Float")));
    methods.push(native_method("to_i", vec![], raw("Int")));

    builtin_class("Float", raw("Object"), methods)
}
