// src/sema/mod.rs
pub mod analyzer;
pub mod class_registry;
pub mod env;
pub mod specialize;
pub mod types;

pub use analyzer::TypeChecker;
pub use class_registry::{ClassDef, ClassKind, ClassRegistry, Ivar, MethodDef, ParamDef};
pub use env::{Env, Lvar, LvarKind};
pub use types::{Ty, TyArgs};

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::ast::{Expr, Program};
use crate::errors::SemanticError;
use crate::stdlib;

/// The result of a successful analysis: the typed top-level statements, the
/// program's type, and every class (built-ins, user classes, metaclasses,
/// and all materialized specializations) keyed by name.
#[derive(Debug)]
pub struct Analysis {
    pub main: Vec<Expr>,
    pub program_ty: Ty,
    pub classes: FxHashMap<String, ClassDef>,
}

/// Analyze an untyped program. The registry is seeded from the built-in
/// manifest and the user's class declarations, each class is checked with
/// the registry exposed as constants, and finally the top-level statements
/// are checked with environment extensions threaded left-to-right.
///
/// Analysis is fail-fast: the first semantic error aborts the run.
pub fn analyze(program: Program) -> Result<Analysis, SemanticError> {
    let Program {
        classes: decls,
        main,
    } = program;
    let user_classes: Vec<String> = decls.iter().map(|d| d.name.clone()).collect();

    let registry = ClassRegistry::seed(stdlib::core_classes(), decls)?;
    let registry = Rc::new(RefCell::new(registry));
    let constants = registry.borrow().constants();
    let env = Env::new(Rc::clone(&registry), constants);

    let mut checker = TypeChecker::new(Rc::clone(&registry));
    for name in &user_classes {
        checker.check_class(name, &env)?;
    }

    let mut main = main;
    let (program_ty, _env) = checker.check_body(&mut main, env)?;
    tracing::debug!(classes = registry.borrow().len(), "type checking complete");

    let mut flattened = registry.borrow().clone();
    specialize::flatten(&mut flattened);
    Ok(Analysis {
        main,
        program_ty,
        classes: flattened.into_classes(),
    })
}
