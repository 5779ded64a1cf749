// src/sema/class_registry.rs
//! Central registry for all classes known to an analysis run.
//!
//! Seeding pairs every class with a synthesized metaclass (named
//! `Meta:<class>`) that carries the class-level methods plus a synthetic
//! `new`. Specializations of generic classes are added to the same map on
//! demand by the specialization engine. Classes reference each other by name
//! only, so the registry stays acyclic at the value level.

use rustc_hash::FxHashMap;

use crate::ast::{ClassDecl, MethodBody, MethodDecl, TypeSpec};
use crate::errors::SemanticError;
use crate::sema::types::{self, Ty, TyArgs};

/// An instance variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Ivar {
    pub name: String,
    pub ty: Ty,
}

/// A resolved method parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDef {
    pub name: String,
    pub ty: Ty,
    pub is_vararg: bool,
}

/// A method as stored in the registry: resolved signature plus the body the
/// downstream evaluator will run. The `ty` slot holds the `Method` node type
/// once the checker has seen the method.
#[derive(Debug, Clone)]
pub struct MethodDef {
    pub name: String,
    pub params: Vec<ParamDef>,
    pub ret: Ty,
    pub body: MethodBody,
    pub ty: Option<Ty>,
}

impl MethodDef {
    /// The `Method` node type for this signature.
    pub fn signature_ty(&self) -> Ty {
        Ty::Method {
            name: self.name.clone(),
            params: self.params.iter().map(|p| p.ty.clone()).collect(),
            ret: Box::new(self.ret.clone()),
        }
    }

    /// Index of the vararg parameter, if any.
    pub fn vararg_index(&self) -> Option<usize> {
        self.params.iter().position(|p| p.is_vararg)
    }

    /// Fewest arguments a call may pass: the vararg slot may gather zero.
    pub fn least_arity(&self) -> usize {
        if self.vararg_index().is_some() {
            self.params.len() - 1
        } else {
            self.params.len()
        }
    }

    /// Rewrite the signature, recorded node type, and body types under a
    /// type-parameter mapping. Marker and native bodies pass through.
    pub fn substitute(&self, map: &FxHashMap<String, Ty>) -> MethodDef {
        let body = match &self.body {
            MethodBody::Exprs(exprs) => {
                let mut exprs = exprs.clone();
                for e in &mut exprs {
                    e.walk_types_mut(&mut |t| *t = t.substitute(map));
                }
                MethodBody::Exprs(exprs)
            }
            other => other.clone(),
        };
        MethodDef {
            name: self.name.clone(),
            params: self
                .params
                .iter()
                .map(|p| ParamDef {
                    name: p.name.clone(),
                    ty: p.ty.substitute(map),
                    is_vararg: p.is_vararg,
                })
                .collect(),
            ret: self.ret.substitute(map),
            body,
            ty: self.ty.as_ref().map(|t| t.substitute(map)),
        }
    }
}

/// Which flavour of class an entry is. A closed sum; behaviour dispatches on
/// the tag.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassKind {
    Regular,
    Meta { of: String },
    Generic { params: Vec<String> },
    GenericMeta { of: String, params: Vec<String> },
    Specialized { base: String, args: TyArgs },
    SpecializedMeta { base: String, args: TyArgs },
}

/// A class entry: regular class, metaclass, generic, or a materialized
/// specialization. The `ty` slot holds the class node type once analyzed
/// (specializations are annotated at creation).
#[derive(Debug, Clone)]
pub struct ClassDef {
    pub name: String,
    pub superclass: Ty,
    pub ivars: FxHashMap<String, Ivar>,
    pub methods: FxHashMap<String, MethodDef>,
    pub kind: ClassKind,
    pub ty: Option<Ty>,
}

impl ClassDef {
    /// The node type of the class itself.
    pub fn class_ty(&self) -> Ty {
        match &self.kind {
            ClassKind::Regular => types::raw(&self.name),
            ClassKind::Meta { of } => types::meta(of),
            ClassKind::Generic { params } => Ty::GenMeta {
                base: self.name.clone(),
                params: params.clone(),
            },
            ClassKind::GenericMeta { of, params } => Ty::GenMeta {
                base: of.clone(),
                params: params.clone(),
            },
            ClassKind::Specialized { base, args } => Ty::Spe {
                base: base.clone(),
                args: Box::new(args.clone()),
            },
            ClassKind::SpecializedMeta { base, args } => Ty::SpeMeta {
                base: base.clone(),
                args: Box::new(args.clone()),
            },
        }
    }

    /// The type of the class constant that names this class: its metaclass.
    /// Only regular and generic classes are exposed as constants.
    pub fn const_ty(&self) -> Option<Ty> {
        match &self.kind {
            ClassKind::Regular => Some(types::meta(&self.name)),
            ClassKind::Generic { params } => Some(Ty::GenMeta {
                base: self.name.clone(),
                params: params.clone(),
            }),
            _ => None,
        }
    }
}

/// All classes of an analysis run, keyed by name. Metaclasses live under
/// `Meta:<name>`, specializations under `G<T1,T2>`.
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    classes: FxHashMap<String, ClassDef>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from the built-in manifest plus the user's class
    /// declarations, synthesizing a metaclass for each.
    pub fn seed(builtins: Vec<ClassDef>, decls: Vec<ClassDecl>) -> Result<Self, SemanticError> {
        let mut registry = Self::new();
        for class in builtins {
            registry.insert(class)?;
        }
        for decl in decls {
            registry.define_class(decl)?;
        }
        Ok(registry)
    }

    pub fn insert(&mut self, class: ClassDef) -> Result<(), SemanticError> {
        if self.classes.contains_key(&class.name) {
            return Err(SemanticError::DuplicateClass { name: class.name });
        }
        self.classes.insert(class.name.clone(), class);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ClassDef> {
        self.classes.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ClassDef> {
        self.classes.get_mut(name)
    }

    pub fn classes(&self) -> &FxHashMap<String, ClassDef> {
        &self.classes
    }

    pub fn into_classes(self) -> FxHashMap<String, ClassDef> {
        self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// A method defined directly on the named class (no inheritance walk).
    pub fn own_method(&self, class_name: &str, method: &str) -> Option<MethodDef> {
        self.classes
            .get(class_name)
            .and_then(|c| c.methods.get(method))
            .cloned()
    }

    /// The superclass template of the class a type dispatches to. For a
    /// specialization that has not been materialized yet, the template is
    /// derived from the generic under substitution.
    pub fn superclass_of(&self, ty: &Ty) -> Option<Ty> {
        let name = ty.class_name()?;
        if let Some(class) = self.classes.get(&name) {
            return Some(class.superclass.clone());
        }
        match ty {
            Ty::Spe { base, args } => {
                let generic = self.classes.get(base)?;
                let map = generic_substitution(generic, args)?;
                Some(generic.superclass.substitute(&map))
            }
            Ty::SpeMeta { base, args } => {
                let generic_meta = self.classes.get(&types::meta_name(base))?;
                let map = generic_substitution(generic_meta, args)?;
                Some(generic_meta.superclass.substitute(&map))
            }
            _ => None,
        }
    }

    /// Class-name → constant-type map for the root environment.
    pub fn constants(&self) -> FxHashMap<String, Ty> {
        self.classes
            .values()
            .filter_map(|c| c.const_ty().map(|ty| (c.name.clone(), ty)))
            .collect()
    }

    fn define_class(&mut self, decl: ClassDecl) -> Result<(), SemanticError> {
        let ClassDecl {
            name,
            superclass,
            type_params,
            instance_methods,
            class_methods,
        } = decl;

        let superclass = superclass
            .map(|s| resolve_spec(&s, &type_params))
            .unwrap_or_else(|| types::raw("Object"));

        let mut methods = FxHashMap::default();
        let mut ivars = FxHashMap::default();
        for m in instance_methods {
            if m.name == "initialize" {
                for p in m.params.iter().filter(|p| p.declares_ivar) {
                    let ivar = Ivar {
                        name: p.name.clone(),
                        ty: resolve_spec(&p.spec, &type_params),
                    };
                    if ivars.insert(ivar.name.clone(), ivar).is_some() {
                        return Err(SemanticError::DuplicateIvar {
                            class: name.clone(),
                            name: p.name.clone(),
                        });
                    }
                }
                if m.ret != TypeSpec::plain("Void") {
                    return Err(SemanticError::TypeMismatch {
                        expected: "Void".to_string(),
                        found: m.ret.name.clone(),
                    });
                }
            }
            let def = lower_method(m, &type_params);
            methods.insert(def.name.clone(), def);
        }

        let mut meta_methods = FxHashMap::default();
        for m in class_methods {
            let def = lower_method(m, &type_params);
            meta_methods.insert(def.name.clone(), def);
        }

        let generic = !type_params.is_empty();
        if !generic {
            // The synthetic constructor mirrors the initializer. Generic
            // classes get `new` only on each specialized metaclass.
            let init_params = methods
                .get("initialize")
                .map(|m| m.params.clone())
                .unwrap_or_default();
            let mut new = MethodDef {
                name: "new".to_string(),
                params: init_params,
                ret: types::raw(&name),
                body: MethodBody::NewObject,
                ty: None,
            };
            new.ty = Some(new.signature_ty());
            meta_methods.insert(new.name.clone(), new);
        }

        let kind = if generic {
            ClassKind::Generic {
                params: type_params.clone(),
            }
        } else {
            ClassKind::Regular
        };
        let meta_kind = if generic {
            ClassKind::GenericMeta {
                of: name.clone(),
                params: type_params.clone(),
            }
        } else {
            ClassKind::Meta { of: name.clone() }
        };

        let meta = ClassDef {
            name: types::meta_name(&name),
            superclass: meta_ty_of(&superclass),
            ivars: FxHashMap::default(),
            methods: meta_methods,
            kind: meta_kind,
            ty: None,
        };
        let class = ClassDef {
            name,
            superclass,
            ivars,
            methods,
            kind,
            ty: None,
        };

        self.insert(class)?;
        self.insert(meta)
    }
}

/// The substitution map of a generic (or generic metaclass) entry applied at
/// the given arguments. `None` on arity mismatch or a non-generic entry.
pub(crate) fn generic_substitution(
    generic: &ClassDef,
    args: &[Ty],
) -> Option<FxHashMap<String, Ty>> {
    let params = match &generic.kind {
        ClassKind::Generic { params } | ClassKind::GenericMeta { params, .. } => params,
        _ => return None,
    };
    if params.len() != args.len() {
        return None;
    }
    Some(
        params
            .iter()
            .cloned()
            .zip(args.iter().cloned())
            .collect(),
    )
}

/// Syntactic resolution of a type spec against a set of type-parameter names.
/// Existence of the named classes is validated later, during checking.
fn resolve_spec(spec: &TypeSpec, type_params: &[String]) -> Ty {
    if spec.args.is_empty() {
        if type_params.contains(&spec.name) {
            Ty::Param(spec.name.clone())
        } else {
            Ty::Raw(spec.name.clone())
        }
    } else {
        Ty::Spe {
            base: spec.name.clone(),
            args: Box::new(
                spec.args
                    .iter()
                    .map(|a| resolve_spec(a, type_params))
                    .collect(),
            ),
        }
    }
}

/// The metaclass-side counterpart of a superclass template.
fn meta_ty_of(superclass: &Ty) -> Ty {
    match superclass {
        Ty::Raw(n) => Ty::Meta(n.clone()),
        Ty::Spe { base, args } => Ty::SpeMeta {
            base: base.clone(),
            args: args.clone(),
        },
        other => other.clone(),
    }
}

fn lower_method(decl: MethodDecl, type_params: &[String]) -> MethodDef {
    MethodDef {
        name: decl.name,
        params: decl
            .params
            .iter()
            .map(|p| ParamDef {
                name: p.name.clone(),
                ty: resolve_spec(&p.spec, type_params),
                is_vararg: p.is_vararg,
            })
            .collect(),
        ret: resolve_spec(&decl.ret, type_params),
        body: decl.body,
        ty: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ParamDecl;
    use crate::sema::types::{raw, typaram};
    use crate::stdlib;

    fn point_decl() -> ClassDecl {
        let mut decl = ClassDecl::new("Point");
        decl.instance_methods.push(MethodDecl::new(
            "initialize",
            vec![
                ParamDecl::ivar("x", TypeSpec::plain("Int")),
                ParamDecl::ivar("y", TypeSpec::plain("Int")),
            ],
            TypeSpec::plain("Void"),
            vec![],
        ));
        decl
    }

    #[test]
    fn seeding_pairs_every_class_with_a_metaclass() {
        let registry = ClassRegistry::seed(stdlib::core_classes(), vec![point_decl()]).unwrap();

        let class = registry.get("Point").unwrap();
        assert_eq!(class.kind, ClassKind::Regular);
        assert_eq!(class.superclass, raw("Object"));
        assert_eq!(class.ivars.len(), 2);
        assert_eq!(class.ivars["x"].ty, raw("Int"));

        let meta = registry.get("Meta:Point").unwrap();
        assert_eq!(
            meta.kind,
            ClassKind::Meta {
                of: "Point".to_string()
            }
        );
        let new = &meta.methods["new"];
        assert_eq!(new.params.len(), 2);
        assert_eq!(new.ret, raw("Point"));
        assert!(matches!(new.body, MethodBody::NewObject));
    }

    #[test]
    fn generic_metaclass_has_no_preinstalled_new() {
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

        let registry = ClassRegistry::seed(stdlib::core_classes(), vec![decl]).unwrap();
        let class = registry.get("Pair").unwrap();
        assert_eq!(class.ivars["a"].ty, typaram("A"));

        let meta = registry.get("Meta:Pair").unwrap();
        assert!(meta.methods.is_empty());
    }

    #[test]
    fn duplicate_class_is_rejected() {
        let err =
            ClassRegistry::seed(stdlib::core_classes(), vec![point_decl(), point_decl()])
                .unwrap_err();
        assert_eq!(
            err,
            SemanticError::DuplicateClass {
                name: "Point".to_string()
            }
        );
    }

    #[test]
    fn duplicate_ivar_is_rejected() {
        let mut decl = ClassDecl::new("Bad");
        decl.instance_methods.push(MethodDecl::new(
            "initialize",
            vec![
                ParamDecl::ivar("x", TypeSpec::plain("Int")),
                ParamDecl::ivar("x", TypeSpec::plain("Bool")),
            ],
            TypeSpec::plain("Void"),
            vec![],
        ));
        let err = ClassRegistry::seed(stdlib::core_classes(), vec![decl]).unwrap_err();
        assert!(matches!(err, SemanticError::DuplicateIvar { .. }));
    }

    #[test]
    fn seeding_is_idempotent() {
        let first = ClassRegistry::seed(stdlib::core_classes(), vec![point_decl()]).unwrap();
        let second = ClassRegistry::seed(stdlib::core_classes(), vec![point_decl()]).unwrap();

        let mut first_names: Vec<_> = first.classes().keys().cloned().collect();
        let mut second_names: Vec<_> = second.classes().keys().cloned().collect();
        first_names.sort();
        second_names.sort();
        assert_eq!(first_names, second_names);

        for (name, class) in first.classes() {
            let other = second.get(name).unwrap();
            assert_eq!(class.kind, other.kind);
            assert_eq!(class.superclass, other.superclass);
            let mut methods: Vec<_> = class.methods.keys().collect();
            let mut other_methods: Vec<_> = other.methods.keys().collect();
            methods.sort();
            other_methods.sort();
            assert_eq!(methods, other_methods);
        }
    }
}
