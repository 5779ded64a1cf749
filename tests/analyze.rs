// tests/analyze.rs
//! End-to-end analysis runs through the public API.

use marten::ast::{ClassDecl, Expr, ExprKind, MethodDecl, ParamDecl, Program, TypeSpec};
use marten::errors::{ErrorKind, SemanticError};
use marten::sema::types::{raw, spe, Ty};
use marten::sema::{analyze, Analysis};

/// A small library: a concrete class, a subclass, and a generic container.
fn library() -> Vec<ClassDecl> {
    let mut shape = ClassDecl::new("Shape");
    shape.instance_methods.push(MethodDecl::new(
        "initialize",
        vec![ParamDecl::ivar("sides", TypeSpec::plain("Int"))],
        TypeSpec::plain("Void"),
        vec![],
    ));
    shape.instance_methods.push(MethodDecl::new(
        "sides",
        vec![],
        TypeSpec::plain("Int"),
        vec![Expr::ivar_ref("sides")],
    ));
    shape.class_methods.push(MethodDecl::new(
        "unit_sides",
        vec![],
        TypeSpec::plain("Int"),
        vec![Expr::int(1)],
    ));

    let mut square = ClassDecl::new("Square");
    square.superclass = Some(TypeSpec::plain("Shape"));
    square.instance_methods.push(MethodDecl::new(
        "initialize",
        vec![ParamDecl::ivar("sides", TypeSpec::plain("Int"))],
        TypeSpec::plain("Void"),
        vec![],
    ));

    let mut boxed = ClassDecl::new("Boxed");
    boxed.type_params = vec!["T".to_string()];
    boxed.instance_methods.push(MethodDecl::new(
        "initialize",
        vec![ParamDecl::ivar("value", TypeSpec::plain("T"))],
        TypeSpec::plain("Void"),
        vec![],
    ));
    boxed.instance_methods.push(MethodDecl::new(
        "value",
        vec![],
        TypeSpec::plain("T"),
        vec![Expr::ivar_ref("value")],
    ));

    vec![shape, square, boxed]
}

fn boxed_shape() -> Expr {
    Expr::method_call(
        Expr::class_specialization(Expr::const_ref("Boxed"), vec![Expr::const_ref("Shape")]),
        "new",
        vec![Expr::method_call(
            Expr::const_ref("Square"),
            "new",
            vec![Expr::int(4)],
        )],
    )
}

/// Collect every specialization type mentioned in a typed subtree.
fn collect_spe_names(expr: &Expr, out: &mut Vec<String>) {
    if let Some(ty) = expr.ty() {
        if let Some(name) = match ty {
            Ty::Spe { .. } | Ty::SpeMeta { .. } => ty.class_name(),
            _ => None,
        } {
            out.push(name);
        }
    }
    match &expr.kind {
        ExprKind::If {
            cond,
            then_body,
            else_body,
        } => {
            collect_spe_names(cond, out);
            for e in then_body.iter().chain(else_body) {
                collect_spe_names(e, out);
            }
        }
        ExprKind::MethodCall { receiver, args, .. } => {
            collect_spe_names(receiver, out);
            for a in args {
                collect_spe_names(a, out);
            }
        }
        ExprKind::AssignLvar { value, .. }
        | ExprKind::AssignIvar { value, .. }
        | ExprKind::AssignConst { value, .. } => collect_spe_names(value, out),
        ExprKind::ClassSpecialization { class, type_args } => {
            collect_spe_names(class, out);
            for a in type_args {
                collect_spe_names(a, out);
            }
        }
        ExprKind::ArrayExpr(elements) => {
            for e in elements {
                collect_spe_names(e, out);
            }
        }
        ExprKind::Return(inner) => collect_spe_names(inner, out),
        ExprKind::Lambda { body, .. } => {
            for e in body {
                collect_spe_names(e, out);
            }
        }
        ExprKind::LambdaCall { callee, args } => {
            collect_spe_names(callee, out);
            for a in args {
                collect_spe_names(a, out);
            }
        }
        _ => {}
    }
}

#[test]
fn a_full_program_analyzes_end_to_end() {
    // b = Boxed<Shape>.new(Square.new(4))
    // sides = b.value().sides()
    // doubled = [sides, sides].length() + Shape.unit_sides()
    let analysis = analyze(Program {
        classes: library(),
        main: vec![
            Expr::assign_lvar("b", boxed_shape(), false),
            Expr::assign_lvar(
                "sides",
                Expr::method_call(
                    Expr::method_call(Expr::lvar_ref("b"), "value", vec![]),
                    "sides",
                    vec![],
                ),
                false,
            ),
            Expr::method_call(
                Expr::method_call(
                    Expr::array(vec![Expr::lvar_ref("sides"), Expr::lvar_ref("sides")]),
                    "length",
                    vec![],
                ),
                "+",
                vec![Expr::method_call(
                    Expr::const_ref("Shape"),
                    "unit_sides",
                    vec![],
                )],
            ),
        ],
    })
    .expect("analysis failed");

    assert_eq!(analysis.program_ty, raw("Int"));
    assert_eq!(analysis.main[0].ty(), Some(&spe("Boxed", [raw("Shape")])));

    // The flattened registry resolves the specialized accessor.
    let boxed_shape = &analysis.classes["Boxed<Shape>"];
    assert_eq!(boxed_shape.methods["value"].ret, raw("Shape"));
    assert_eq!(
        analysis.classes["Meta:Boxed<Shape>"].methods["new"].ret,
        spe("Boxed", [raw("Shape")])
    );
}

#[test]
fn registry_is_closed_over_every_mentioned_specialization() {
    let analysis: Analysis = analyze(Program {
        classes: library(),
        main: vec![
            Expr::assign_lvar("b", boxed_shape(), false),
            Expr::array(vec![Expr::float(1.0), Expr::float(2.0)]),
            Expr::lambda(
                vec![ParamDecl::new("n", TypeSpec::plain("Int"))],
                vec![Expr::lvar_ref("n")],
                vec![],
            ),
        ],
    })
    .expect("analysis failed");

    let mut mentioned = Vec::new();
    for expr in &analysis.main {
        collect_spe_names(expr, &mut mentioned);
    }
    assert!(!mentioned.is_empty());
    for name in mentioned {
        assert!(
            analysis.classes.contains_key(&name),
            "registry is missing {}",
            name
        );
        let instance = name.trim_start_matches("Meta:");
        assert!(
            analysis.classes.contains_key(instance),
            "registry is missing {}",
            instance
        );
        assert!(
            analysis
                .classes
                .contains_key(&format!("Meta:{}", instance)),
            "registry is missing Meta:{}",
            instance
        );
    }
}

#[test]
fn subclass_arguments_conform_through_inheritance() {
    // Shape#== comes from Object and accepts any Object, including Square.
    analyze(Program {
        classes: library(),
        main: vec![Expr::method_call(
            Expr::method_call(Expr::const_ref("Shape"), "new", vec![Expr::int(3)]),
            "==",
            vec![Expr::method_call(
                Expr::const_ref("Square"),
                "new",
                vec![Expr::int(4)],
            )],
        )],
    })
    .expect("analysis failed");
}

#[test]
fn failures_carry_their_spec_kind() {
    let name_err = analyze(Program {
        classes: vec![],
        main: vec![Expr::lvar_ref("ghost")],
    })
    .unwrap_err();
    assert_eq!(name_err.kind(), ErrorKind::Name);

    let type_err = analyze(Program {
        classes: vec![],
        main: vec![Expr::if_expr(Expr::int(1), vec![], vec![])],
    })
    .unwrap_err();
    assert_eq!(type_err.kind(), ErrorKind::Type);

    let program_err = analyze(Program {
        classes: vec![],
        main: vec![
            Expr::assign_lvar("a", Expr::int(1), false),
            Expr::assign_lvar("a", Expr::int(2), false),
        ],
    })
    .unwrap_err();
    assert_eq!(program_err.kind(), ErrorKind::Program);
    assert_eq!(
        program_err.to_string(),
        "variable 'a' is read-only (missing `var`)"
    );
}

#[test]
fn duplicate_user_class_fails_during_seeding() {
    let err = analyze(Program {
        classes: vec![ClassDecl::new("Twin"), ClassDecl::new("Twin")],
        main: vec![],
    })
    .unwrap_err();
    assert_eq!(
        err,
        SemanticError::DuplicateClass {
            name: "Twin".to_string()
        }
    );
}
