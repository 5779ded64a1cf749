// src/sema/env.rs
//! The analysis environment.
//!
//! An `Env` is a persistent record threaded through the traversal: constants,
//! local bindings, the current `self` class, and in-scope type parameters.
//! Extension returns a new value and leaves the old one valid, so sibling
//! branches cannot see each other's bindings. The class registry is shared
//! behind a `RefCell`; it is the single mutable structure of an analysis run.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::errors::SemanticError;
use crate::sema::class_registry::{ClassRegistry, Ivar, MethodDef};
use crate::sema::specialize;
use crate::sema::types::Ty;

/// How a local binding may be used. `Let` is write-once, `Var` reassignable,
/// `Param` a method parameter, `Special` reserved for implicit bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LvarKind {
    Let,
    Var,
    Param,
    Special,
}

/// A local variable binding.
#[derive(Debug, Clone)]
pub struct Lvar {
    pub name: String,
    pub ty: Ty,
    pub kind: LvarKind,
}

#[derive(Clone)]
pub struct Env {
    registry: Rc<RefCell<ClassRegistry>>,
    constants: FxHashMap<String, Ty>,
    local_vars: FxHashMap<String, Lvar>,
    current_self: Option<String>,
    type_params: FxHashMap<String, Ty>,
}

impl Env {
    pub fn new(registry: Rc<RefCell<ClassRegistry>>, constants: FxHashMap<String, Ty>) -> Self {
        Self {
            registry,
            constants,
            local_vars: FxHashMap::default(),
            current_self: None,
            type_params: FxHashMap::default(),
        }
    }

    pub fn registry(&self) -> &Rc<RefCell<ClassRegistry>> {
        &self.registry
    }

    pub fn current_self(&self) -> Option<&str> {
        self.current_self.as_deref()
    }

    // ---- extension: each returns a new environment ----

    /// Bind (or rebind) one local.
    pub fn bind_lvar(&self, lvar: Lvar) -> Env {
        let mut next = self.clone();
        next.local_vars.insert(lvar.name.clone(), lvar);
        next
    }

    /// Open a fresh local scope containing exactly `locals`.
    pub fn with_locals(&self, locals: FxHashMap<String, Lvar>) -> Env {
        let mut next = self.clone();
        next.local_vars = locals;
        next
    }

    /// Enter a class body: `self` becomes the named class and the given type
    /// parameters come into scope. Locals are cleared.
    pub fn for_class(&self, class_name: &str, type_params: &[String]) -> Env {
        let mut next = self.clone();
        next.current_self = Some(class_name.to_string());
        next.local_vars = FxHashMap::default();
        next.type_params = type_params
            .iter()
            .map(|p| (p.clone(), Ty::Param(p.clone())))
            .collect();
        next
    }

    // ---- lookups ----

    /// The binding, or `None`. Assignment uses this to distinguish a first
    /// bind from a reassignment.
    pub fn lookup_lvar(&self, name: &str) -> Option<&Lvar> {
        self.local_vars.get(name)
    }

    pub fn find_lvar(&self, name: &str) -> Result<&Lvar, SemanticError> {
        self.lookup_lvar(name)
            .ok_or_else(|| SemanticError::UndefinedVariable {
                name: name.to_string(),
            })
    }

    pub fn typaram_ty(&self, name: &str) -> Option<&Ty> {
        self.type_params.get(name)
    }

    /// An instance variable of the current `self` class.
    pub fn find_ivar(&self, name: &str) -> Result<Ivar, SemanticError> {
        let class_name =
            self.current_self
                .as_ref()
                .ok_or_else(|| SemanticError::IvarOutsideClass {
                    name: name.to_string(),
                })?;
        self.registry
            .borrow()
            .get(class_name)
            .and_then(|c| c.ivars.get(name))
            .cloned()
            .ok_or_else(|| SemanticError::UndefinedInstanceVariable {
                name: name.to_string(),
            })
    }

    pub fn find_const(&self, name: &str) -> Result<Ty, SemanticError> {
        self.constants
            .get(name)
            .cloned()
            .ok_or_else(|| SemanticError::UndefinedConstant {
                name: name.to_string(),
            })
    }

    /// The class node type of a registered class.
    pub fn find_class(&self, name: &str) -> Result<Ty, SemanticError> {
        self.registry
            .borrow()
            .get(name)
            .map(|c| c.class_ty())
            .ok_or_else(|| SemanticError::UndefinedClass {
                name: name.to_string(),
            })
    }

    /// The class node type of a registered class's metaclass.
    pub fn find_meta_class(&self, name: &str) -> Result<Ty, SemanticError> {
        self.find_class(&crate::sema::types::meta_name(name))
    }

    /// Resolve a method against a receiver type, dispatching on the variant:
    /// instance types resolve instance methods, metaclass types resolve class
    /// methods (instance methods of the metaclass). The superclass chain is
    /// walked up to the no-parent sentinel; specializations materialize their
    /// methods lazily on the way.
    pub fn find_method(&self, receiver: &Ty, method: &str) -> Result<MethodDef, SemanticError> {
        match receiver {
            Ty::Raw(_) | Ty::Meta(_) | Ty::GenMeta { .. } | Ty::Spe { .. } | Ty::SpeMeta { .. } => {
                self.method_on_chain(receiver, method)
            }
            other => Err(SemanticError::InvalidReceiver {
                method: method.to_string(),
                found: other.to_string(),
            }),
        }
    }

    fn method_on_chain(&self, receiver: &Ty, method: &str) -> Result<MethodDef, SemanticError> {
        let mut cur = receiver.clone();
        loop {
            let found = match &cur {
                Ty::Spe { base, args } | Ty::SpeMeta { base, args } => {
                    specialize::specialize(&self.registry, base, args)?;
                    let class_name = cur.class_name().expect("specializations name a class");
                    specialize::specialized_method(&self.registry, &class_name, method)
                }
                other => match other.class_name() {
                    Some(class_name) => self.registry.borrow().own_method(&class_name, method),
                    None => None,
                },
            };
            if let Some(m) = found {
                return Ok(m);
            }
            match self.registry.borrow().superclass_of(&cur) {
                Some(Ty::NoParent) | None => {
                    return Err(SemanticError::UndefinedMethod {
                        method: method.to_string(),
                        receiver: receiver.to_string(),
                    })
                }
                Some(parent) => cur = parent,
            }
        }
    }

    /// The conformance relation: equality, or transitive subclassing walked
    /// through superclass templates. Type parameters and metaclass types
    /// conform only by equality.
    pub fn conforms_to(&self, sub: &Ty, sup: &Ty) -> bool {
        if sub == sup {
            return true;
        }
        if !matches!(sub, Ty::Raw(_) | Ty::Spe { .. })
            || !matches!(sup, Ty::Raw(_) | Ty::Spe { .. })
        {
            return false;
        }
        let mut cur = sub.clone();
        loop {
            match self.registry.borrow().superclass_of(&cur) {
                Some(Ty::NoParent) | None => return false,
                Some(parent) => {
                    if parent == *sup {
                        return true;
                    }
                    cur = parent;
                }
            }
        }
    }
}
