// src/stdlib/boolean.rs

use super::{builtin_class, native_method, param};
use crate::sema::class_registry::ClassDef;
use crate::sema::types::raw;

pub fn classes() -> Vec<ClassDef> {
    builtin_class(
        "Bool",
        raw("Object"),
        vec![
            native_method("==", vec![param("other", raw("Bool"))], raw("Bool")),
            native_method("and", vec![param("other", raw("Bool"))], raw("Bool")),
            native_method("or", vec![param("other", raw("Bool"))], raw("Bool")),
            native_method("not", vec![], raw("Bool")),
        ],
    )
}
