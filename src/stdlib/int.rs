// src/stdlib/int.rs

use super::{builtin_class, native_method, param};
use crate::sema::class_registry::ClassDef;
use crate::sema::types::raw;

pub fn classes() -> Vec<ClassDef> {
    let arith = ["+", "-", "*", "/", "%"]
        .iter()
        .map(|op| native_method(op, vec![param("other", raw("Int"))], raw("Int")));
    let compare = ["<", "<=", ">", ">=", "=="]
        .iter()
        .map(|op| native_method(op, vec![param("other", raw("Int"))], raw("Bool")));

    let mut methods: Vec<_> = arith.chain(compare).collect();
    methods.push(native_method("abs", vec![], raw("Int")));
    methods.push(native_method("to_f", vec![], raw("Float")));

    builtin_class("Int", raw("Object"), methods)
}
