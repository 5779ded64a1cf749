// src/sema/analyzer/methods.rs
//! Call-argument checking and method-body return validation.

use super::*;

impl TypeChecker {
    /// Check call arguments against a resolved signature. With a vararg
    /// present, head parameters bind the leading arguments, tail parameters
    /// the trailing ones, and the vararg gathers the middle; the gathered
    /// elements must equal the declared `Array<E>` element type exactly.
    pub(crate) fn check_call_args(
        &mut self,
        sig: &MethodDef,
        arg_tys: &[Ty],
        env: &Env,
    ) -> Result<(), SemanticError> {
        match sig.vararg_index() {
            None => {
                if arg_tys.len() != sig.params.len() {
                    return Err(SemanticError::WrongArgumentCount {
                        expected: sig.params.len(),
                        found: arg_tys.len(),
                    });
                }
                for (arg, param) in arg_tys.iter().zip(&sig.params) {
                    conform(env, arg, &param.ty)?;
                }
            }
            Some(index) => {
                let least = sig.least_arity();
                if arg_tys.len() < least {
                    return Err(SemanticError::WrongArgumentCount {
                        expected: least,
                        found: arg_tys.len(),
                    });
                }
                let head = &sig.params[..index];
                let tail = &sig.params[index + 1..];
                for (arg, param) in arg_tys[..head.len()].iter().zip(head) {
                    conform(env, arg, &param.ty)?;
                }
                for (arg, param) in arg_tys[arg_tys.len() - tail.len()..].iter().zip(tail) {
                    conform(env, arg, &param.ty)?;
                }

                let elem = vararg_element_ty(&sig.params[index])?;
                for arg in &arg_tys[head.len()..arg_tys.len() - tail.len()] {
                    if *arg != elem {
                        return Err(SemanticError::TypeMismatch {
                            expected: elem.to_string(),
                            found: arg.to_string(),
                        });
                    }
                }
                // The gathered array exists in the registry for downstream
                // consumers.
                specialize::specialize(&self.registry, "Array", std::slice::from_ref(&elem))?;
            }
        }
        Ok(())
    }
}

fn conform(env: &Env, arg: &Ty, param: &Ty) -> Result<(), SemanticError> {
    if env.conforms_to(arg, param) {
        Ok(())
    } else {
        Err(SemanticError::TypeMismatch {
            expected: param.to_string(),
            found: arg.to_string(),
        })
    }
}

/// The element type of a vararg parameter's declared `Array<E>`.
pub(crate) fn vararg_element_ty(param: &ParamDef) -> Result<Ty, SemanticError> {
    match &param.ty {
        Ty::Spe { base, args } if base == "Array" && args.len() == 1 => Ok(args[0].clone()),
        other => Err(SemanticError::VarargNotArray {
            name: param.name.clone(),
            found: other.to_string(),
        }),
    }
}

/// Every `return` anywhere in a checked body must carry the declared return
/// type. Recurses into `if` branches as `(branch statements, declared
/// return)`; lambda bodies are skipped, their returns belong to the lambda.
pub(crate) fn scan_returns(exprs: &[Expr], ret: &Ty, method: &str) -> Result<(), SemanticError> {
    for expr in exprs {
        scan_expr(expr, ret, method)?;
    }
    Ok(())
}

fn scan_expr(expr: &Expr, ret: &Ty, method: &str) -> Result<(), SemanticError> {
    match &expr.kind {
        ExprKind::Return(inner) => {
            if let Some(ty) = inner.ty() {
                if ty != ret {
                    return Err(SemanticError::ReturnTypeMismatch {
                        method: method.to_string(),
                        expected: ret.to_string(),
                        found: ty.to_string(),
                    });
                }
            }
            scan_expr(inner, ret, method)
        }
        ExprKind::If {
            cond,
            then_body,
            else_body,
        } => {
            scan_expr(cond, ret, method)?;
            scan_returns(then_body, ret, method)?;
            scan_returns(else_body, ret, method)
        }
        ExprKind::MethodCall { receiver, args, .. } => {
            scan_expr(receiver, ret, method)?;
            scan_returns(args, ret, method)
        }
        ExprKind::AssignLvar { value, .. }
        | ExprKind::AssignIvar { value, .. }
        | ExprKind::AssignConst { value, .. } => scan_expr(value, ret, method),
        ExprKind::ClassSpecialization { class, type_args } => {
            scan_expr(class, ret, method)?;
            scan_returns(type_args, ret, method)
        }
        ExprKind::ArrayExpr(elements) => scan_returns(elements, ret, method),
        ExprKind::LambdaCall { callee, args } => {
            scan_expr(callee, ret, method)?;
            scan_returns(args, ret, method)
        }
        ExprKind::Lambda { .. } => Ok(()),
        ExprKind::IntLiteral(_)
        | ExprKind::FloatLiteral(_)
        | ExprKind::BoolLiteral(_)
        | ExprKind::LvarRef(_)
        | ExprKind::IvarRef(_)
        | ExprKind::ConstRef(_) => Ok(()),
    }
}
