// src/errors/sema.rs
//! Semantic analysis errors (E2xxx).
//!
//! Every variant belongs to one of three kinds (see [`ErrorKind`]): name
//! resolution failures, type system violations, and program errors such as
//! reassigning a read-only binding. Analysis is fail-fast, so callers receive
//! at most one of these per run.

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum SemanticError {
    // ---- name errors ----
    #[error("undefined local variable '{name}'")]
    #[diagnostic(code(E2001))]
    UndefinedVariable { name: String },

    #[error("undefined instance variable '@{name}'")]
    #[diagnostic(code(E2002))]
    UndefinedInstanceVariable { name: String },

    #[error("instance variable '@{name}' referenced outside of a class body")]
    #[diagnostic(code(E2003))]
    IvarOutsideClass { name: String },

    #[error("undefined constant '{name}'")]
    #[diagnostic(code(E2004))]
    UndefinedConstant { name: String },

    #[error("undefined class '{name}'")]
    #[diagnostic(code(E2005))]
    UndefinedClass { name: String },

    #[error("method '{method}' not found on {receiver}")]
    #[diagnostic(code(E2006))]
    UndefinedMethod { method: String, receiver: String },

    // ---- type errors ----
    #[error("expected {expected}, found {found}")]
    #[diagnostic(code(E2020))]
    TypeMismatch { expected: String, found: String },

    #[error("`if` condition must be Bool, found {found}")]
    #[diagnostic(code(E2021))]
    ConditionNotBool { found: String },

    #[error("`if` branches have incompatible types: {then_ty} and {else_ty}")]
    #[diagnostic(code(E2022))]
    IfBranchMismatch { then_ty: String, else_ty: String },

    #[error("array elements must share one type: expected {expected}, found {found}")]
    #[diagnostic(code(E2023))]
    ArrayElementMismatch { expected: String, found: String },

    #[error("cannot infer the element type of an empty array literal")]
    #[diagnostic(code(E2024))]
    EmptyArrayLiteral,

    #[error("expected {expected} arguments, found {found}")]
    #[diagnostic(code(E2025))]
    WrongArgumentCount { expected: usize, found: usize },

    #[error("class {class} expects {expected} type arguments, found {found}")]
    #[diagnostic(code(E2026))]
    WrongTypeArgumentCount {
        class: String,
        expected: usize,
        found: usize,
    },

    #[error("method '{method}' must return {expected}, found {found}")]
    #[diagnostic(code(E2027))]
    ReturnTypeMismatch {
        method: String,
        expected: String,
        found: String,
    },

    #[error("vararg parameter '{name}' must be declared as an Array, found {found}")]
    #[diagnostic(code(E2028))]
    VarargNotArray { name: String, found: String },

    #[error("method '{method}' declares more than one vararg parameter")]
    #[diagnostic(code(E2029))]
    MultipleVarargs { method: String },

    #[error("{found} is not a generic class")]
    #[diagnostic(code(E2030))]
    NotAGenericClass { found: String },

    #[error("type argument must be a class constant, found {found}")]
    #[diagnostic(code(E2031))]
    TypeArgNotClass { found: String },

    #[error("cannot call method '{method}' on {found}")]
    #[diagnostic(code(E2032))]
    InvalidReceiver { method: String, found: String },

    #[error("no anonymous function class takes {count} parameters")]
    #[diagnostic(code(E2033), help("lambdas support up to 9 parameters"))]
    UnsupportedLambdaArity { count: usize },

    // ---- program errors ----
    #[error("cannot assign a Void value to '{name}'")]
    #[diagnostic(code(E2040))]
    VoidAssignment { name: String },

    #[error("variable '{name}' is read-only (missing `var`)")]
    #[diagnostic(
        code(E2041),
        help("declare the variable with `var` to allow reassignment")
    )]
    ReadonlyReassignment { name: String },

    #[error("assignment to constant '{name}' is not supported")]
    #[diagnostic(code(E2042))]
    ConstAssignmentUnsupported { name: String },

    #[error("class '{name}' is defined more than once")]
    #[diagnostic(code(E2043))]
    DuplicateClass { name: String },

    #[error("instance variable '@{name}' is declared more than once on class '{class}'")]
    #[diagnostic(code(E2044))]
    DuplicateIvar { class: String, name: String },

    #[error("internal: expression type assigned twice")]
    #[diagnostic(code(E2045))]
    TypeAlreadyAssigned,
}

/// The three failure kinds of the semantic core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Name,
    Type,
    Program,
}

impl SemanticError {
    /// Classify this error into one of the three spec-level kinds.
    pub fn kind(&self) -> ErrorKind {
        use SemanticError::*;
        match self {
            UndefinedVariable { .. }
            | UndefinedInstanceVariable { .. }
            | IvarOutsideClass { .. }
            | UndefinedConstant { .. }
            | UndefinedClass { .. }
            | UndefinedMethod { .. } => ErrorKind::Name,

            TypeMismatch { .. }
            | ConditionNotBool { .. }
            | IfBranchMismatch { .. }
            | ArrayElementMismatch { .. }
            | EmptyArrayLiteral
            | WrongArgumentCount { .. }
            | WrongTypeArgumentCount { .. }
            | ReturnTypeMismatch { .. }
            | VarargNotArray { .. }
            | MultipleVarargs { .. }
            | NotAGenericClass { .. }
            | TypeArgNotClass { .. }
            | InvalidReceiver { .. }
            | UnsupportedLambdaArity { .. } => ErrorKind::Type,

            VoidAssignment { .. }
            | ReadonlyReassignment { .. }
            | ConstAssignmentUnsupported { .. }
            | DuplicateClass { .. }
            | DuplicateIvar { .. }
            | TypeAlreadyAssigned => ErrorKind::Program,
        }
    }
}
