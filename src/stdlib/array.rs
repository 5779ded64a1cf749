// src/stdlib/array.rs
//! `Array<T>`, the built-in generic container. Specializations are
//! materialized on demand when array literals and vararg calls are checked.

use super::{builtin_generic, native_method, param};
use crate::sema::class_registry::ClassDef;
use crate::sema::types::{raw, typaram};

pub fn classes() -> Vec<ClassDef> {
    builtin_generic(
        "Array",
        &["T"],
        raw("Object"),
        vec![
            native_method("initialize", vec![], raw("Void")),
            native_method("length", vec![], raw("Int")),
            native_method("push", vec![param("item", typaram("T"))], raw("Void")),
            native_method("get", vec![param("i", raw("Int"))], typaram("T")),
            native_method("first", vec![], typaram("T")),
            native_method("last", vec![], typaram("T")),
        ],
    )
}
