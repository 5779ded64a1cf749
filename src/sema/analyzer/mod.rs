// src/sema/analyzer/mod.rs

mod expr;
mod methods;

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::ast::{Expr, ExprKind, MethodBody, TypeSpec};
use crate::errors::SemanticError;
use crate::sema::class_registry::{ClassKind, ClassRegistry, MethodDef, ParamDef};
use crate::sema::env::{Env, Lvar, LvarKind};
use crate::sema::specialize;
use crate::sema::types::{self, Ty, TyArgs};
use crate::stdlib::anon_fn;

/// The type-checking traversal. Holds the shared registry handle; everything
/// scope-shaped travels in the [`Env`] values threaded through the walk.
pub struct TypeChecker {
    registry: Rc<RefCell<ClassRegistry>>,
}

impl TypeChecker {
    pub fn new(registry: Rc<RefCell<ClassRegistry>>) -> Self {
        Self { registry }
    }

    /// Check one user class: every instance method against the class as
    /// `self`, every class method against the metaclass as `self`. Records
    /// the class and metaclass node types.
    pub fn check_class(&mut self, name: &str, env: &Env) -> Result<(), SemanticError> {
        let (type_params, method_names, class_ty) = {
            let reg = self.registry.borrow();
            let class = reg.get(name).ok_or_else(|| SemanticError::UndefinedClass {
                name: name.to_string(),
            })?;
            let params = match &class.kind {
                ClassKind::Generic { params } => params.clone(),
                _ => Vec::new(),
            };
            let mut names: Vec<String> = class.methods.keys().cloned().collect();
            names.sort();
            (params, names, class.class_ty())
        };

        let class_env = env.for_class(name, &type_params);
        for method in &method_names {
            self.check_method(name, method, &class_env)?;
        }

        let meta_name = types::meta_name(name);
        let (meta_method_names, meta_ty) = {
            let reg = self.registry.borrow();
            let meta = reg
                .get(&meta_name)
                .ok_or_else(|| SemanticError::UndefinedClass {
                    name: meta_name.clone(),
                })?;
            let mut names: Vec<String> = meta.methods.keys().cloned().collect();
            names.sort();
            (names, meta.class_ty())
        };

        let meta_env = env.for_class(&meta_name, &type_params);
        for method in &meta_method_names {
            self.check_method(&meta_name, method, &meta_env)?;
        }

        let mut reg = self.registry.borrow_mut();
        if let Some(class) = reg.get_mut(name) {
            class.ty = Some(class_ty);
        }
        if let Some(meta) = reg.get_mut(&meta_name) {
            meta.ty = Some(meta_ty);
        }
        Ok(())
    }

    /// Check one method of a registry class. The declared signature is
    /// validated, the body (unless it is a marker) is walked with the
    /// parameters bound, and the `Method` node type is recorded.
    pub fn check_method(
        &mut self,
        class_name: &str,
        method_name: &str,
        env: &Env,
    ) -> Result<(), SemanticError> {
        let mut method = self
            .registry
            .borrow()
            .own_method(class_name, method_name)
            .ok_or_else(|| SemanticError::UndefinedMethod {
                method: method_name.to_string(),
                receiver: class_name.to_string(),
            })?;

        if method.params.iter().filter(|p| p.is_vararg).count() > 1 {
            return Err(SemanticError::MultipleVarargs {
                method: method_name.to_string(),
            });
        }
        for param in &method.params {
            self.validate_ty(&param.ty, env)?;
            if param.is_vararg {
                methods::vararg_element_ty(param)?;
            }
        }
        self.validate_ty(&method.ret, env)?;

        if let MethodBody::Exprs(body) = &mut method.body {
            let mut method_env = env.clone();
            for param in &method.params {
                method_env = method_env.bind_lvar(Lvar {
                    name: param.name.clone(),
                    ty: param.ty.clone(),
                    kind: LvarKind::Param,
                });
            }
            let (body_ty, _env) = self.check_body(body, method_env)?;

            // A trailing Return validates itself through the scan below.
            if !method.ret.is_void() {
                let ends_with_return = body
                    .last()
                    .map(|e| matches!(e.kind, ExprKind::Return(_)))
                    .unwrap_or(false);
                if !ends_with_return && body_ty != method.ret {
                    return Err(SemanticError::ReturnTypeMismatch {
                        method: method.name.clone(),
                        expected: method.ret.to_string(),
                        found: body_ty.to_string(),
                    });
                }
            }
            methods::scan_returns(body, &method.ret, &method.name)?;
        }
        method.ty = Some(method.signature_ty());

        let mut reg = self.registry.borrow_mut();
        if let Some(class) = reg.get_mut(class_name) {
            class.methods.insert(method.name.clone(), method);
        }
        Ok(())
    }

    /// Check a statement sequence, threading environment extensions
    /// left-to-right. An empty sequence types as Void.
    pub fn check_body(
        &mut self,
        exprs: &mut [Expr],
        env: Env,
    ) -> Result<(Ty, Env), SemanticError> {
        let mut env = env;
        let mut last_ty = types::raw("Void");
        for expr in exprs.iter_mut() {
            let (ty, next) = self.check_expr(expr, env)?;
            env = next;
            last_ty = ty;
        }
        Ok((last_ty, env))
    }

    /// Resolve a syntactic type reference against the environment: an
    /// in-scope type parameter, a non-generic class, or a generic class
    /// applied at the right arity.
    pub(crate) fn resolve_spec(&self, spec: &TypeSpec, env: &Env) -> Result<Ty, SemanticError> {
        if spec.args.is_empty() {
            if let Some(ty) = env.typaram_ty(&spec.name) {
                return Ok(ty.clone());
            }
            let reg = self.registry.borrow();
            let class = reg
                .get(&spec.name)
                .ok_or_else(|| SemanticError::UndefinedClass {
                    name: spec.name.clone(),
                })?;
            match &class.kind {
                ClassKind::Generic { params } => Err(SemanticError::WrongTypeArgumentCount {
                    class: spec.name.clone(),
                    expected: params.len(),
                    found: 0,
                }),
                _ => Ok(types::raw(&spec.name)),
            }
        } else {
            let args = spec
                .args
                .iter()
                .map(|a| self.resolve_spec(a, env))
                .collect::<Result<TyArgs, _>>()?;
            {
                let reg = self.registry.borrow();
                let class = reg
                    .get(&spec.name)
                    .ok_or_else(|| SemanticError::UndefinedClass {
                        name: spec.name.clone(),
                    })?;
                match &class.kind {
                    ClassKind::Generic { params } => {
                        if params.len() != args.len() {
                            return Err(SemanticError::WrongTypeArgumentCount {
                                class: spec.name.clone(),
                                expected: params.len(),
                                found: args.len(),
                            });
                        }
                    }
                    _ => {
                        return Err(SemanticError::NotAGenericClass {
                            found: spec.name.clone(),
                        })
                    }
                }
            }
            Ok(Ty::Spe {
                base: spec.name.clone(),
                args: Box::new(args),
            })
        }
    }

    /// Validate that a type seeded from a declaration names known classes and
    /// in-scope type parameters, at the right arities.
    pub(crate) fn validate_ty(&self, ty: &Ty, env: &Env) -> Result<(), SemanticError> {
        match ty {
            Ty::Raw(n) | Ty::Meta(n) => {
                env.find_class(n)?;
                Ok(())
            }
            Ty::GenMeta { base, .. } => {
                env.find_class(base)?;
                Ok(())
            }
            Ty::Spe { base, args } | Ty::SpeMeta { base, args } => {
                {
                    let reg = self.registry.borrow();
                    let class = reg.get(base).ok_or_else(|| SemanticError::UndefinedClass {
                        name: base.clone(),
                    })?;
                    match &class.kind {
                        ClassKind::Generic { params } => {
                            if params.len() != args.len() {
                                return Err(SemanticError::WrongTypeArgumentCount {
                                    class: base.clone(),
                                    expected: params.len(),
                                    found: args.len(),
                                });
                            }
                        }
                        _ => {
                            return Err(SemanticError::NotAGenericClass {
                                found: base.clone(),
                            })
                        }
                    }
                }
                for arg in args.iter() {
                    self.validate_ty(arg, env)?;
                }
                Ok(())
            }
            Ty::Param(p) => {
                if env.typaram_ty(p).is_some() {
                    Ok(())
                } else {
                    Err(SemanticError::UndefinedClass { name: p.clone() })
                }
            }
            Ty::Method { params, ret, .. } => {
                for p in params {
                    self.validate_ty(p, env)?;
                }
                self.validate_ty(ret, env)
            }
            Ty::NoParent => Ok(()),
        }
    }
}
