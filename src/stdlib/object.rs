// src/stdlib/object.rs
//! `Object`, the root class, and `Void`.

use super::{builtin_class, native_method, param};
use crate::sema::class_registry::ClassDef;
use crate::sema::types::{raw, Ty};

pub fn classes() -> Vec<ClassDef> {
    let mut classes = builtin_class(
        "Object",
        Ty::NoParent,
        vec![
            native_method("initialize", vec![], raw("Void")),
            native_method("==", vec![param("other", raw("Object"))], raw("Bool")),
        ],
    );
    classes.extend(builtin_class("Void", raw("Object"), vec![]));
    classes
}
