// src/sema/specialize.rs
//! Demand-driven specialization of generic classes.
//!
//! `specialize` materializes `G<T…>` and `Meta:G<T…>` the first time a set of
//! type arguments is seen; the registry's class map doubles as the cache, with
//! the specialized name derived from the canonical key of each argument.
//! Individual methods are rewritten lazily on lookup and re-derived once more
//! from the fully typed generic originals by the post-analysis `flatten` pass.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::ast::MethodBody;
use crate::errors::SemanticError;
use crate::sema::class_registry::{
    generic_substitution, ClassDef, ClassKind, ClassRegistry, Ivar, MethodDef,
};
use crate::sema::types::{self, Ty, TyArgs};

/// Ensure the specialization of `base` at `args` (and its metaclass) exists,
/// returning the instance type `Spe(base, args)`. A second request with equal
/// arguments is a cache hit on the registry entry.
pub fn specialize(
    registry: &Rc<RefCell<ClassRegistry>>,
    base: &str,
    args: &[Ty],
) -> Result<Ty, SemanticError> {
    let name = types::spe_name(base, args);
    let ty = types::spe(base, args.iter().cloned());
    {
        let reg = registry.borrow();
        if reg.contains(&name) {
            return Ok(ty);
        }
        let generic = reg.get(base).ok_or_else(|| SemanticError::UndefinedClass {
            name: base.to_string(),
        })?;
        match &generic.kind {
            ClassKind::Generic { params } => {
                if params.len() != args.len() {
                    return Err(SemanticError::WrongTypeArgumentCount {
                        class: base.to_string(),
                        expected: params.len(),
                        found: args.len(),
                    });
                }
            }
            _ => {
                return Err(SemanticError::NotAGenericClass {
                    found: base.to_string(),
                })
            }
        }
    }

    tracing::debug!(class = %name, "materializing specialization");
    let (class, meta) = {
        let reg = registry.borrow();
        build_specialized(&reg, base, args, &name)
    };
    let mut reg = registry.borrow_mut();
    reg.insert(class)?;
    reg.insert(meta)?;
    Ok(ty)
}

fn build_specialized(
    reg: &ClassRegistry,
    base: &str,
    args: &[Ty],
    name: &str,
) -> (ClassDef, ClassDef) {
    let generic = reg.get(base).expect("generic checked by specialize");
    let map = generic_substitution(generic, args).expect("arity checked by specialize");
    let args: TyArgs = args.iter().cloned().collect();

    let ivars = generic
        .ivars
        .iter()
        .map(|(k, v)| {
            (
                k.clone(),
                Ivar {
                    name: v.name.clone(),
                    ty: v.ty.substitute(&map),
                },
            )
        })
        .collect();

    let mut class = ClassDef {
        name: name.to_string(),
        superclass: generic.superclass.substitute(&map),
        ivars,
        methods: FxHashMap::default(),
        kind: ClassKind::Specialized {
            base: base.to_string(),
            args: args.clone(),
        },
        ty: None,
    };
    class.ty = Some(class.class_ty());

    // The specialized metaclass materializes `new` eagerly: substituted
    // initializer parameters, returning the specialized instance type.
    let init_params = generic
        .methods
        .get("initialize")
        .map(|m| m.substitute(&map).params)
        .unwrap_or_default();
    let mut new = MethodDef {
        name: "new".to_string(),
        params: init_params,
        ret: class.class_ty(),
        body: MethodBody::NewObject,
        ty: None,
    };
    new.ty = Some(new.signature_ty());

    let meta_superclass = reg
        .get(&types::meta_name(base))
        .map(|m| m.superclass.substitute(&map))
        .unwrap_or(Ty::NoParent);

    let mut meta = ClassDef {
        name: types::meta_name(name),
        superclass: meta_superclass,
        ivars: FxHashMap::default(),
        methods: FxHashMap::default(),
        kind: ClassKind::SpecializedMeta {
            base: base.to_string(),
            args,
        },
        ty: None,
    };
    meta.ty = Some(meta.class_ty());
    meta.methods.insert(new.name.clone(), new);

    (class, meta)
}

/// A method on a specialized class or metaclass, rewriting the generic's own
/// method under the type-argument substitution and memoizing the result on
/// first use. `None` when the class (or the generic) defines no such method.
pub fn specialized_method(
    registry: &Rc<RefCell<ClassRegistry>>,
    class_name: &str,
    method: &str,
) -> Option<MethodDef> {
    let substituted = {
        let reg = registry.borrow();
        let class = reg.get(class_name)?;
        if let Some(m) = class.methods.get(method) {
            return Some(m.clone());
        }
        let (generic_name, args) = match &class.kind {
            ClassKind::Specialized { base, args } => (base.clone(), args.clone()),
            ClassKind::SpecializedMeta { base, args } => (types::meta_name(base), args.clone()),
            _ => return None,
        };
        let generic = reg.get(&generic_name)?;
        let map = generic_substitution(generic, &args)?;
        generic.methods.get(method)?.substitute(&map)
    };
    tracing::trace!(class = class_name, method, "specializing method");
    let mut reg = registry.borrow_mut();
    let class = reg.get_mut(class_name)?;
    class.methods.insert(method.to_string(), substituted.clone());
    Some(substituted)
}

/// Post-analysis pass: re-derive every specialized method from its (by now
/// fully typed) generic original so the registry handed downstream carries
/// complete, typed method bodies for every specialization.
pub fn flatten(registry: &mut ClassRegistry) {
    let mut plan = Vec::new();
    for class in registry.classes().values() {
        let generic_name = match &class.kind {
            ClassKind::Specialized { base, args } => {
                let generic = registry.get(base);
                generic
                    .and_then(|g| generic_substitution(g, args))
                    .map(|map| (base.clone(), map))
            }
            ClassKind::SpecializedMeta { base, args } => {
                let meta = types::meta_name(base);
                registry
                    .get(&meta)
                    .and_then(|g| generic_substitution(g, args))
                    .map(|map| (meta, map))
            }
            _ => None,
        };
        if let Some((generic_name, map)) = generic_name {
            plan.push((class.name.clone(), generic_name, map));
        }
    }

    for (spe_name, generic_name, map) in plan {
        let methods: Vec<MethodDef> = match registry.get(&generic_name) {
            Some(generic) => generic.methods.values().map(|m| m.substitute(&map)).collect(),
            None => continue,
        };
        if let Some(class) = registry.get_mut(&spe_name) {
            for m in methods {
                class.methods.insert(m.name.clone(), m);
            }
        }
    }
    tracing::debug!(classes = registry.len(), "flattened specializations");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ClassDecl, Expr, MethodDecl, ParamDecl, TypeSpec};
    use crate::sema::types::{raw, spe, typaram};
    use crate::stdlib;

    fn pair_registry() -> Rc<RefCell<ClassRegistry>> {
        let mut decl = ClassDecl::new("Pair");
        decl.type_params = vec!["A".to_string(), "B".to_string()];
        decl.instance_methods.push(MethodDecl::new(
            "initialize",
            vec![
                ParamDecl::ivar("a", TypeSpec::plain("A")),
                ParamDecl::ivar("b", TypeSpec::plain("B")),
            ],
            TypeSpec::plain("Void"),
            vec![],
        ));
        decl.instance_methods.push(MethodDecl::new(
            "fst",
            vec![],
            TypeSpec::plain("A"),
            vec![Expr::ivar_ref("a")],
        ));
        let registry =
            ClassRegistry::seed(stdlib::core_classes(), vec![decl]).expect("seed failed");
        Rc::new(RefCell::new(registry))
    }

    #[test]
    fn specialization_materializes_class_and_metaclass() {
        let registry = pair_registry();
        let ty = specialize(&registry, "Pair", &[raw("Int"), raw("Bool")]).unwrap();
        assert_eq!(ty, spe("Pair", [raw("Int"), raw("Bool")]));

        let reg = registry.borrow();
        let class = reg.get("Pair<Int,Bool>").unwrap();
        assert_eq!(class.ty, Some(spe("Pair", [raw("Int"), raw("Bool")])));
        assert_eq!(class.ivars["a"].ty, raw("Int"));
        assert_eq!(class.ivars["b"].ty, raw("Bool"));

        let meta = reg.get("Meta:Pair<Int,Bool>").unwrap();
        let new = &meta.methods["new"];
        assert_eq!(new.ret, spe("Pair", [raw("Int"), raw("Bool")]));
        assert_eq!(new.params[0].ty, raw("Int"));
        assert_eq!(new.params[1].ty, raw("Bool"));
    }

    #[test]
    fn second_request_is_a_cache_hit() {
        let registry = pair_registry();
        specialize(&registry, "Pair", &[raw("Int"), raw("Bool")]).unwrap();
        let before = registry.borrow().len();
        specialize(&registry, "Pair", &[raw("Int"), raw("Bool")]).unwrap();
        assert_eq!(registry.borrow().len(), before);
    }

    #[test]
    fn methods_specialize_lazily_and_memoize() {
        let registry = pair_registry();
        specialize(&registry, "Pair", &[raw("Int"), raw("Bool")]).unwrap();

        assert!(registry
            .borrow()
            .get("Pair<Int,Bool>")
            .unwrap()
            .methods
            .is_empty());

        let fst = specialized_method(&registry, "Pair<Int,Bool>", "fst").unwrap();
        assert_eq!(fst.ret, raw("Int"));
        assert!(registry
            .borrow()
            .get("Pair<Int,Bool>")
            .unwrap()
            .methods
            .contains_key("fst"));
    }

    #[test]
    fn wrong_arity_is_rejected() {
        let registry = pair_registry();
        let err = specialize(&registry, "Pair", &[raw("Int")]).unwrap_err();
        assert_eq!(
            err,
            SemanticError::WrongTypeArgumentCount {
                class: "Pair".to_string(),
                expected: 2,
                found: 1,
            }
        );
    }

    #[test]
    fn non_generic_base_is_rejected() {
        let registry = pair_registry();
        let err = specialize(&registry, "Int", &[raw("Bool")]).unwrap_err();
        assert_eq!(
            err,
            SemanticError::NotAGenericClass {
                found: "Int".to_string()
            }
        );
    }

    #[test]
    fn substitution_of_a_param_as_a_type_argument() {
        // Pair<T, Int> inside another generic body keeps T free until that
        // body is itself specialized.
        let registry = pair_registry();
        specialize(&registry, "Pair", &[typaram("T"), raw("Int")]).unwrap();
        let reg = registry.borrow();
        assert!(reg.contains("Pair<T,Int>"));
    }

    #[test]
    fn flatten_fills_every_specialized_method() {
        let registry = pair_registry();
        specialize(&registry, "Pair", &[raw("Int"), raw("Bool")]).unwrap();

        let mut reg = registry.borrow().clone();
        flatten(&mut reg);
        let class = reg.get("Pair<Int,Bool>").unwrap();
        assert!(class.methods.contains_key("initialize"));
        assert_eq!(class.methods["fst"].ret, raw("Int"));
        // The eager constructor survives the flatten overwrite.
        let meta = reg.get("Meta:Pair<Int,Bool>").unwrap();
        assert!(meta.methods.contains_key("new"));
    }
}
