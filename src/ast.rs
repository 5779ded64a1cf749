// src/ast.rs
//! The program tree.
//!
//! The parser hands the semantic core a tree of these nodes with every type
//! slot empty; analysis fills the slots in place. Expression nodes are a
//! closed sum; shared behaviour dispatches on the variant tag rather than on
//! an inheritance hierarchy.

use crate::errors::SemanticError;
use crate::sema::types::Ty;

/// A complete untyped program: user class declarations plus the top-level
/// statement sequence.
#[derive(Debug, Clone)]
pub struct Program {
    pub classes: Vec<ClassDecl>,
    pub main: Vec<Expr>,
}

/// User class declaration.
#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: String,
    /// `None` means the class extends `Object`.
    pub superclass: Option<TypeSpec>,
    /// Non-empty for generic classes.
    pub type_params: Vec<String>,
    pub instance_methods: Vec<MethodDecl>,
    pub class_methods: Vec<MethodDecl>,
}

impl ClassDecl {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            superclass: None,
            type_params: Vec::new(),
            instance_methods: Vec::new(),
            class_methods: Vec::new(),
        }
    }
}

/// Method declaration. The initializer is a method named `initialize`
/// returning `Void`; its ivar-declaring parameters define the instance
/// variables of the enclosing class.
#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: String,
    pub params: Vec<ParamDecl>,
    pub ret: TypeSpec,
    pub body: MethodBody,
}

impl MethodDecl {
    pub fn new(name: &str, params: Vec<ParamDecl>, ret: TypeSpec, body: Vec<Expr>) -> Self {
        Self {
            name: name.to_string(),
            params,
            ret,
            body: MethodBody::Exprs(body),
        }
    }
}

/// Method parameter. A vararg parameter gathers trailing arguments into an
/// `Array<E>`; an ivar-declaring parameter (on `initialize`) also declares an
/// instance variable of the same name and type.
#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub name: String,
    pub spec: TypeSpec,
    pub is_vararg: bool,
    pub declares_ivar: bool,
}

impl ParamDecl {
    pub fn new(name: &str, spec: TypeSpec) -> Self {
        Self {
            name: name.to_string(),
            spec,
            is_vararg: false,
            declares_ivar: false,
        }
    }

    pub fn vararg(name: &str, spec: TypeSpec) -> Self {
        Self {
            is_vararg: true,
            ..Self::new(name, spec)
        }
    }

    pub fn ivar(name: &str, spec: TypeSpec) -> Self {
        Self {
            declares_ivar: true,
            ..Self::new(name, spec)
        }
    }
}

/// Syntactic type reference, e.g. `Int` or `Array<T>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpec {
    pub name: String,
    pub args: Vec<TypeSpec>,
}

impl TypeSpec {
    pub fn plain(name: &str) -> Self {
        Self {
            name: name.to_string(),
            args: Vec::new(),
        }
    }

    pub fn applied(name: &str, args: Vec<TypeSpec>) -> Self {
        Self {
            name: name.to_string(),
            args,
        }
    }
}

/// A method body. `NewObject` is the canonical "create object" marker carried
/// by every synthesized `new`; `Native` marks built-in methods whose bodies
/// live in the evaluator. Neither is walked by body checking.
#[derive(Debug, Clone)]
pub enum MethodBody {
    Exprs(Vec<Expr>),
    NewObject,
    Native,
}

/// An expression node: a variant tag plus a type slot filled during analysis.
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    ty: Option<Ty>,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    IntLiteral(i64),
    FloatLiteral(f64),
    BoolLiteral(bool),
    LvarRef(String),
    IvarRef(String),
    ConstRef(String),
    If {
        cond: Box<Expr>,
        then_body: Vec<Expr>,
        else_body: Vec<Expr>,
    },
    MethodCall {
        receiver: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    AssignLvar {
        name: String,
        value: Box<Expr>,
        /// True when the source marked the binding reassignable (`var`).
        declared_var: bool,
    },
    AssignIvar {
        name: String,
        value: Box<Expr>,
    },
    /// Present in the tree but rejected by analysis as unsupported.
    AssignConst {
        name: String,
        value: Box<Expr>,
    },
    /// `Pair<Int, Bool>`: a generic class constant applied to type arguments.
    ClassSpecialization {
        class: Box<Expr>,
        type_args: Vec<Expr>,
    },
    ArrayExpr(Vec<Expr>),
    Return(Box<Expr>),
    Lambda {
        params: Vec<ParamDecl>,
        body: Vec<Expr>,
        /// Enclosing locals captured by the body, in binding order.
        captures: Vec<String>,
    },
    LambdaCall {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Self { kind, ty: None }
    }

    /// The resolved type, once analysis has filled the slot.
    pub fn ty(&self) -> Option<&Ty> {
        self.ty.as_ref()
    }

    /// Record the resolved type. Filling a slot twice is a program error;
    /// every node is analyzed exactly once.
    pub(crate) fn assign_ty(&mut self, ty: Ty) -> Result<(), SemanticError> {
        if self.ty.is_some() {
            return Err(SemanticError::TypeAlreadyAssigned);
        }
        self.ty = Some(ty);
        Ok(())
    }

    /// Visit every type slot in this subtree, including slots inside lambda
    /// bodies. Used when specializing typed method bodies.
    pub fn walk_types_mut(&mut self, f: &mut impl FnMut(&mut Ty)) {
        if let Some(ty) = &mut self.ty {
            f(ty);
        }
        match &mut self.kind {
            ExprKind::IntLiteral(_)
            | ExprKind::FloatLiteral(_)
            | ExprKind::BoolLiteral(_)
            | ExprKind::LvarRef(_)
            | ExprKind::IvarRef(_)
            | ExprKind::ConstRef(_) => {}
            ExprKind::If {
                cond,
                then_body,
                else_body,
            } => {
                cond.walk_types_mut(f);
                for e in then_body.iter_mut().chain(else_body.iter_mut()) {
                    e.walk_types_mut(f);
                }
            }
            ExprKind::MethodCall { receiver, args, .. } => {
                receiver.walk_types_mut(f);
                for a in args {
                    a.walk_types_mut(f);
                }
            }
            ExprKind::AssignLvar { value, .. }
            | ExprKind::AssignIvar { value, .. }
            | ExprKind::AssignConst { value, .. } => value.walk_types_mut(f),
            ExprKind::ClassSpecialization { class, type_args } => {
                class.walk_types_mut(f);
                for a in type_args {
                    a.walk_types_mut(f);
                }
            }
            ExprKind::ArrayExpr(elements) => {
                for e in elements {
                    e.walk_types_mut(f);
                }
            }
            ExprKind::Return(inner) => inner.walk_types_mut(f),
            ExprKind::Lambda { body, .. } => {
                for e in body {
                    e.walk_types_mut(f);
                }
            }
            ExprKind::LambdaCall { callee, args } => {
                callee.walk_types_mut(f);
                for a in args {
                    a.walk_types_mut(f);
                }
            }
        }
    }

    // ---- builders, the construction surface for the parser and for tests ----

    pub fn int(value: i64) -> Expr {
        Expr::new(ExprKind::IntLiteral(value))
    }

    pub fn float(value: f64) -> Expr {
        Expr::new(ExprKind::FloatLiteral(value))
    }

    pub fn boolean(value: bool) -> Expr {
        Expr::new(ExprKind::BoolLiteral(value))
    }

    pub fn lvar_ref(name: &str) -> Expr {
        Expr::new(ExprKind::LvarRef(name.to_string()))
    }

    pub fn ivar_ref(name: &str) -> Expr {
        Expr::new(ExprKind::IvarRef(name.to_string()))
    }

    pub fn const_ref(name: &str) -> Expr {
        Expr::new(ExprKind::ConstRef(name.to_string()))
    }

    pub fn if_expr(cond: Expr, then_body: Vec<Expr>, else_body: Vec<Expr>) -> Expr {
        Expr::new(ExprKind::If {
            cond: Box::new(cond),
            then_body,
            else_body,
        })
    }

    pub fn method_call(receiver: Expr, method: &str, args: Vec<Expr>) -> Expr {
        Expr::new(ExprKind::MethodCall {
            receiver: Box::new(receiver),
            method: method.to_string(),
            args,
        })
    }

    pub fn assign_lvar(name: &str, value: Expr, declared_var: bool) -> Expr {
        Expr::new(ExprKind::AssignLvar {
            name: name.to_string(),
            value: Box::new(value),
            declared_var,
        })
    }

    pub fn assign_ivar(name: &str, value: Expr) -> Expr {
        Expr::new(ExprKind::AssignIvar {
            name: name.to_string(),
            value: Box::new(value),
        })
    }

    pub fn assign_const(name: &str, value: Expr) -> Expr {
        Expr::new(ExprKind::AssignConst {
            name: name.to_string(),
            value: Box::new(value),
        })
    }

    pub fn class_specialization(class: Expr, type_args: Vec<Expr>) -> Expr {
        Expr::new(ExprKind::ClassSpecialization {
            class: Box::new(class),
            type_args,
        })
    }

    pub fn array(elements: Vec<Expr>) -> Expr {
        Expr::new(ExprKind::ArrayExpr(elements))
    }

    pub fn ret(value: Expr) -> Expr {
        Expr::new(ExprKind::Return(Box::new(value)))
    }

    pub fn lambda(params: Vec<ParamDecl>, body: Vec<Expr>, captures: Vec<String>) -> Expr {
        Expr::new(ExprKind::Lambda {
            params,
            body,
            captures,
        })
    }

    pub fn lambda_call(callee: Expr, args: Vec<Expr>) -> Expr {
        Expr::new(ExprKind::LambdaCall {
            callee: Box::new(callee),
            args,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sema::types::raw;

    #[test]
    fn type_slot_fills_once() {
        let mut expr = Expr::int(1);
        assert!(expr.ty().is_none());
        expr.assign_ty(raw("Int")).unwrap();
        assert_eq!(expr.ty(), Some(&raw("Int")));

        let err = expr.assign_ty(raw("Int")).unwrap_err();
        assert_eq!(err, SemanticError::TypeAlreadyAssigned);
    }

    #[test]
    fn walk_types_visits_nested_slots() {
        let mut inner = Expr::int(1);
        inner.assign_ty(raw("Int")).unwrap();
        let mut expr = Expr::if_expr(Expr::boolean(true), vec![inner], vec![]);
        expr.assign_ty(raw("Int")).unwrap();

        let mut seen = 0;
        expr.walk_types_mut(&mut |_| seen += 1);
        assert_eq!(seen, 2);
    }
}
