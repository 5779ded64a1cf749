// src/sema/analyzer/expr.rs

use super::*;

impl TypeChecker {
    /// Compute and record the type of one expression, returning the type and
    /// the (possibly extended) environment for the following sibling
    /// statement. Every rule of the annotation protocol lives in this match.
    pub(crate) fn check_expr(
        &mut self,
        expr: &mut Expr,
        env: Env,
    ) -> Result<(Ty, Env), SemanticError> {
        let (ty, env) = match &mut expr.kind {
            ExprKind::IntLiteral(_) => (types::raw("Int"), env),
            ExprKind::FloatLiteral(_) => (types::raw("Float"), env),
            ExprKind::BoolLiteral(_) => (types::raw("Bool"), env),

            ExprKind::LvarRef(name) => {
                let ty = env.find_lvar(name)?.ty.clone();
                (ty, env)
            }
            ExprKind::IvarRef(name) => {
                let ty = env.find_ivar(name)?.ty;
                (ty, env)
            }
            ExprKind::ConstRef(name) => {
                let ty = env.find_const(name)?;
                (ty, env)
            }

            ExprKind::Return(inner) => {
                // The inner type is recorded on the node for the enclosing
                // method's return scan; the statement itself is Void.
                let (_inner_ty, env) = self.check_expr(inner, env)?;
                (types::raw("Void"), env)
            }

            ExprKind::If {
                cond,
                then_body,
                else_body,
            } => {
                let (cond_ty, env) = self.check_expr(cond, env)?;
                if cond_ty != types::raw("Bool") {
                    return Err(SemanticError::ConditionNotBool {
                        found: cond_ty.to_string(),
                    });
                }
                // Branches see the outer environment; their bindings do not
                // escape.
                let (then_ty, _) = self.check_body(then_body, env.clone())?;
                let (else_ty, _) = self.check_body(else_body, env.clone())?;
                let ty = match (then_ty.is_void(), else_ty.is_void()) {
                    (false, false) => {
                        if then_ty != else_ty {
                            return Err(SemanticError::IfBranchMismatch {
                                then_ty: then_ty.to_string(),
                                else_ty: else_ty.to_string(),
                            });
                        }
                        then_ty
                    }
                    (false, true) => then_ty,
                    (true, false) => else_ty,
                    (true, true) => types::raw("Void"),
                };
                (ty, env)
            }

            ExprKind::AssignLvar {
                name,
                value,
                declared_var,
            } => {
                let (value_ty, env) = self.check_expr(value, env)?;
                if value_ty.is_void() {
                    return Err(SemanticError::VoidAssignment { name: name.clone() });
                }
                match env.lookup_lvar(name).cloned() {
                    Some(lvar) => {
                        if lvar.kind != LvarKind::Var {
                            return Err(SemanticError::ReadonlyReassignment {
                                name: name.clone(),
                            });
                        }
                        if !env.conforms_to(&value_ty, &lvar.ty) {
                            return Err(SemanticError::TypeMismatch {
                                expected: lvar.ty.to_string(),
                                found: value_ty.to_string(),
                            });
                        }
                        // The declared type survives reassignment.
                        let env = env.bind_lvar(Lvar {
                            name: name.clone(),
                            ty: lvar.ty,
                            kind: LvarKind::Var,
                        });
                        (value_ty, env)
                    }
                    None => {
                        let kind = if *declared_var {
                            LvarKind::Var
                        } else {
                            LvarKind::Let
                        };
                        let env = env.bind_lvar(Lvar {
                            name: name.clone(),
                            ty: value_ty.clone(),
                            kind,
                        });
                        (value_ty, env)
                    }
                }
            }

            ExprKind::AssignIvar { name, value } => {
                let (value_ty, env) = self.check_expr(value, env)?;
                if value_ty.is_void() {
                    return Err(SemanticError::VoidAssignment { name: name.clone() });
                }
                let ivar = env.find_ivar(name)?;
                // No subtyping on instance variables.
                if ivar.ty != value_ty {
                    return Err(SemanticError::TypeMismatch {
                        expected: ivar.ty.to_string(),
                        found: value_ty.to_string(),
                    });
                }
                (value_ty, env)
            }

            ExprKind::AssignConst { name, .. } => {
                return Err(SemanticError::ConstAssignmentUnsupported { name: name.clone() })
            }

            ExprKind::ArrayExpr(elements) => {
                if elements.is_empty() {
                    return Err(SemanticError::EmptyArrayLiteral);
                }
                let mut env = env;
                let mut elem_ty: Option<Ty> = None;
                for element in elements.iter_mut() {
                    let (ty, next) = self.check_expr(element, env)?;
                    env = next;
                    match &elem_ty {
                        None => elem_ty = Some(ty),
                        Some(expected) if *expected == ty => {}
                        Some(expected) => {
                            return Err(SemanticError::ArrayElementMismatch {
                                expected: expected.to_string(),
                                found: ty.to_string(),
                            })
                        }
                    }
                }
                let elem = elem_ty.expect("non-empty literal has an element type");
                let ty =
                    specialize::specialize(&self.registry, "Array", std::slice::from_ref(&elem))?;
                (ty, env)
            }

            ExprKind::ClassSpecialization { class, type_args } => {
                let (class_ty, mut env) = self.check_expr(class, env)?;
                let (base, params) = match &class_ty {
                    Ty::GenMeta { base, params } => (base.clone(), params.clone()),
                    other => {
                        return Err(SemanticError::NotAGenericClass {
                            found: other.to_string(),
                        })
                    }
                };
                if type_args.len() != params.len() {
                    return Err(SemanticError::WrongTypeArgumentCount {
                        class: base,
                        expected: params.len(),
                        found: type_args.len(),
                    });
                }
                let mut args = TyArgs::new();
                for type_arg in type_args.iter_mut() {
                    let (arg_ty, next) = self.check_expr(type_arg, env)?;
                    env = next;
                    let instance =
                        arg_ty
                            .instance_ty()
                            .ok_or_else(|| SemanticError::TypeArgNotClass {
                                found: arg_ty.to_string(),
                            })?;
                    args.push(instance);
                }
                specialize::specialize(&self.registry, &base, &args)?;
                (
                    Ty::SpeMeta {
                        base,
                        args: Box::new(args),
                    },
                    env,
                )
            }

            ExprKind::MethodCall {
                receiver,
                method,
                args,
            } => {
                let mut env = env;
                let mut arg_tys = Vec::with_capacity(args.len());
                for arg in args.iter_mut() {
                    let (ty, next) = self.check_expr(arg, env)?;
                    arg_tys.push(ty);
                    env = next;
                }
                let (receiver_ty, env) = self.check_expr(receiver, env)?;
                let sig = env.find_method(&receiver_ty, method)?;
                self.check_call_args(&sig, &arg_tys, &env)?;
                (sig.ret.clone(), env)
            }

            ExprKind::Lambda {
                params,
                body,
                captures,
            } => {
                if params.len() > crate::stdlib::MAX_LAMBDA_PARAMS {
                    return Err(SemanticError::UnsupportedLambdaArity {
                        count: params.len(),
                    });
                }
                let mut locals = FxHashMap::default();
                for name in captures.iter() {
                    let mut lvar = env.find_lvar(name)?.clone();
                    // Captures are read-only inside the body.
                    if lvar.kind == LvarKind::Var {
                        lvar.kind = LvarKind::Let;
                    }
                    locals.insert(lvar.name.clone(), lvar);
                }
                let mut param_tys = Vec::with_capacity(params.len());
                for param in params.iter() {
                    let ty = self.resolve_spec(&param.spec, &env)?;
                    locals.insert(
                        param.name.clone(),
                        Lvar {
                            name: param.name.clone(),
                            ty: ty.clone(),
                            kind: LvarKind::Param,
                        },
                    );
                    param_tys.push(ty);
                }
                let lambda_env = env.with_locals(locals);
                let (body_ty, _) = self.check_body(body, lambda_env)?;

                let base = anon_fn::class_for_arity(params.len());
                let mut args: TyArgs = param_tys.into_iter().collect();
                args.push(body_ty);
                let ty = specialize::specialize(&self.registry, &base, &args)?;
                (ty, env)
            }

            ExprKind::LambdaCall { callee, args } => {
                let mut env = env;
                let mut arg_tys = Vec::with_capacity(args.len());
                for arg in args.iter_mut() {
                    let (ty, next) = self.check_expr(arg, env)?;
                    arg_tys.push(ty);
                    env = next;
                }
                let (callee_ty, env) = self.check_expr(callee, env)?;
                let sig = env.find_method(&callee_ty, "call")?;
                self.check_call_args(&sig, &arg_tys, &env)?;
                (sig.ret.clone(), env)
            }
        };

        expr.assign_ty(ty.clone())?;
        Ok((ty, env))
    }
}
