// src/stdlib/mod.rs
//! The built-in class manifest.
//!
//! One module per built-in type family, each contributing class/metaclass
//! pairs to the registry seed. Built-in method bodies are native (the
//! evaluator implements them); the manifest is also where the synthetic
//! constructor's "create object" body marker originates.

pub mod anon_fn;
pub mod array;
pub mod boolean;
pub mod float;
pub mod int;
pub mod object;

use rustc_hash::FxHashMap;

use crate::ast::MethodBody;
use crate::sema::class_registry::{ClassDef, ClassKind, MethodDef, ParamDef};
use crate::sema::types::{self, Ty};

pub use anon_fn::MAX_LAMBDA_PARAMS;

/// Every built-in class, metaclasses included, ready for registry seeding.
pub fn core_classes() -> Vec<ClassDef> {
    let mut classes = Vec::new();
    classes.extend(object::classes());
    classes.extend(int::classes());
    classes.extend(float::classes());
    classes.extend(boolean::classes());
    classes.extend(array::classes());
    classes.extend(anon_fn::classes());
    classes
}

pub(crate) fn param(name: &str, ty: Ty) -> ParamDef {
    ParamDef {
        name: name.to_string(),
        ty,
        is_vararg: false,
    }
}

pub(crate) fn native_method(name: &str, params: Vec<ParamDef>, ret: Ty) -> MethodDef {
    let mut method = MethodDef {
        name: name.to_string(),
        params,
        ret,
        body: MethodBody::Native,
        ty: None,
    };
    method.ty = Some(method.signature_ty());
    method
}

fn method_map(methods: Vec<MethodDef>) -> FxHashMap<String, MethodDef> {
    methods.into_iter().map(|m| (m.name.clone(), m)).collect()
}

/// A non-generic built-in class and its metaclass. The metaclass gets the
/// synthetic `new` mirroring the class's initializer (empty if none).
pub(crate) fn builtin_class(name: &str, superclass: Ty, methods: Vec<MethodDef>) -> Vec<ClassDef> {
    let methods = method_map(methods);

    let init_params = methods
        .get("initialize")
        .map(|m| m.params.clone())
        .unwrap_or_default();
    let mut new = MethodDef {
        name: "new".to_string(),
        params: init_params,
        ret: types::raw(name),
        body: MethodBody::NewObject,
        ty: None,
    };
    new.ty = Some(new.signature_ty());

    let meta_superclass = match &superclass {
        Ty::Raw(n) => types::meta(n),
        other => other.clone(),
    };

    let mut class = ClassDef {
        name: name.to_string(),
        superclass,
        ivars: FxHashMap::default(),
        methods,
        kind: ClassKind::Regular,
        ty: None,
    };
    class.ty = Some(class.class_ty());

    let mut meta = ClassDef {
        name: types::meta_name(name),
        superclass: meta_superclass,
        ivars: FxHashMap::default(),
        methods: method_map(vec![new]),
        kind: ClassKind::Meta {
            of: name.to_string(),
        },
        ty: None,
    };
    meta.ty = Some(meta.class_ty());

    vec![class, meta]
}

/// A generic built-in class and its metaclass. `new` appears only on each
/// specialized metaclass, never on the generic one.
pub(crate) fn builtin_generic(
    name: &str,
    type_params: &[&str],
    superclass: Ty,
    methods: Vec<MethodDef>,
) -> Vec<ClassDef> {
    let params: Vec<String> = type_params.iter().map(|p| p.to_string()).collect();

    let meta_superclass = match &superclass {
        Ty::Raw(n) => types::meta(n),
        other => other.clone(),
    };

    let mut class = ClassDef {
        name: name.to_string(),
        superclass,
        ivars: FxHashMap::default(),
        methods: method_map(methods),
        kind: ClassKind::Generic {
            params: params.clone(),
        },
        ty: None,
    };
    class.ty = Some(class.class_ty());

    let mut meta = ClassDef {
        name: types::meta_name(name),
        superclass: meta_superclass,
        ivars: FxHashMap::default(),
        methods: FxHashMap::default(),
        kind: ClassKind::GenericMeta {
            of: name.to_string(),
            params,
        },
        ty: None,
    };
    meta.ty = Some(meta.class_ty());

    vec![class, meta]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_covers_the_required_classes() {
        let classes = core_classes();
        let names: Vec<&str> = classes.iter().map(|c| c.name.as_str()).collect();
        for required in ["Object", "Int", "Float", "Bool", "Void", "Array", "Fn0", "Fn9"] {
            assert!(names.contains(&required), "missing {}", required);
            let meta = types::meta_name(required);
            assert!(names.iter().any(|n| **n == meta), "missing {}", meta);
        }
    }

    #[test]
    fn every_builtin_method_is_annotated() {
        for class in core_classes() {
            assert!(class.ty.is_some(), "class {} lacks a type", class.name);
            for method in class.methods.values() {
                assert!(
                    method.ty.is_some(),
                    "method {}#{} lacks a type",
                    class.name,
                    method.name
                );
            }
        }
    }

    #[test]
    fn object_is_the_root() {
        let classes = core_classes();
        let object = classes.iter().find(|c| c.name == "Object").unwrap();
        assert_eq!(object.superclass, Ty::NoParent);
        let meta = classes.iter().find(|c| c.name == "Meta:Object").unwrap();
        assert_eq!(meta.superclass, Ty::NoParent);
    }
}
