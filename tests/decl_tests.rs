//! Declaration-level analysis: unions, protos and default
//! implementations, `self` parameter rules, and the try statement.

mod common;

use common::{assert_error_containing, assert_no_errors, TestUnit};
use tarn::sir::{
    Decl, Expr, FuncDecl, Ident, Primitive, Stmt, TryStmt, TrySuccessBranch, UnionCase,
    UnionCaseField, UnionDef,
};

fn add_shape_union(t: &mut TestUnit, m: &common::ModuleCtx) -> tarn::sir::DeclId {
    let block = t.unit.create_decl_block(Some(m.table));
    let ident = t.ident("Shape");
    let union_decl = t.unit.decls.alloc(Decl::UnionDef(UnionDef {
        ast: None,
        ident,
        block,
        cases: Vec::new(),
    }));
    t.unit.decl_blocks[m.block].decls.push(union_decl);

    let f32_ty = t.prim(Primitive::F32);
    let radius = t.ident("radius");
    let circle_ident = t.ident("Circle");
    let circle = t.unit.decls.alloc(Decl::UnionCase(UnionCase {
        ast: None,
        ident: circle_ident,
        fields: vec![UnionCaseField {
            ast: None,
            ident: radius,
            ty: f32_ty,
        }],
    }));
    t.unit.decl_blocks[block].decls.push(circle);

    let dot_ident = t.ident("Dot");
    let dot = t.unit.decls.alloc(Decl::UnionCase(UnionCase {
        ast: None,
        ident: dot_ident,
        fields: Vec::new(),
    }));
    t.unit.decl_blocks[block].decls.push(dot);

    union_decl
}

#[test]
fn union_case_call_builds_case_literal() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);
    let union_decl = add_shape_union(&mut t, &m);

    let void = t.prim(Primitive::Void);
    let shape = t.ident_expr("Shape");
    let callee = t.dot(shape, "Circle");
    let radius = t.float(1.5);
    let call = t.call(callee, &[radius]);
    let var = t.var("c", None, Some(call));
    t.add_func(&m, "main", &[], void, &[var]);

    let analysis = t.analyze();
    assert_no_errors(&analysis);

    match &t.unit.exprs[call] {
        Expr::UnionCaseLiteral(literal) => {
            assert_eq!(literal.args.len(), 1);
            let ty = literal.ty.unwrap();
            assert_eq!(t.unit.type_as_decl(ty), Some(union_decl));
        }
        other => panic!("case call not rewritten: {:?}", other),
    }
}

#[test]
fn union_case_checks_argument_count() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);
    add_shape_union(&mut t, &m);

    let void = t.prim(Primitive::Void);
    let shape = t.ident_expr("Shape");
    let callee = t.dot(shape, "Circle");
    let call = t.call(callee, &[]);
    let var = t.var("c", None, Some(call));
    t.add_func(&m, "main", &[], void, &[var]);

    let analysis = t.analyze();
    assert_error_containing(&analysis, "too few arguments");
}

#[test]
fn case_outside_union_is_rejected() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);

    let ident = t.ident("Stray");
    let case = t.unit.decls.alloc(Decl::UnionCase(UnionCase {
        ast: None,
        ident,
        fields: Vec::new(),
    }));
    t.unit.decl_blocks[m.block].decls.push(case);

    let analysis = t.analyze();
    assert_error_containing(&analysis, "'case' definition outside of a 'union'");
}

fn add_printable_proto(t: &mut TestUnit, m: &common::ModuleCtx) -> tarn::sir::DeclBlockId {
    let block = t.unit.create_decl_block(Some(m.table));
    let ident = t.ident("Printable");
    let proto = t.unit.decls.alloc(Decl::ProtoDef(tarn::sir::ProtoDef {
        ast: None,
        ident,
        block,
    }));
    t.unit.decl_blocks[m.block].decls.push(proto);

    // Required method: func label() -> i32;
    let i32_ty = t.prim(Primitive::I32);
    let label_ty = t.func_type(&[], i32_ty);
    let label_ident = t.ident("label");
    let label = t.unit.decls.alloc(Decl::FuncDecl(FuncDecl {
        ast: None,
        ident: label_ident,
        ty: label_ty,
    }));
    t.unit.decl_blocks[block].decls.push(label);

    block
}

/// A default implementation is a plain function definition inside the
/// proto body.
fn add_proto_default(
    t: &mut TestUnit,
    proto_block: tarn::sir::DeclBlockId,
    name: &str,
    value: i64,
) {
    let table = t.unit.decl_blocks[proto_block].symbol_table;
    let i32_ty = t.prim(Primitive::I32);
    let literal = t.int(value);
    let ret = t.ret(Some(literal));
    let decl = t.func_decl(table, name, &[], i32_ty, &[ret]);
    t.unit.decl_blocks[proto_block].decls.push(decl);
}

#[test]
fn struct_missing_proto_method_is_reported() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);
    add_printable_proto(&mut t, &m);

    let i32_ty = t.prim(Primitive::I32);
    let s = t.add_struct(&m, "S", &[]);
    t.add_field(&s, "v", i32_ty);

    let impl_expr = t.ident_expr("Printable");
    if let Decl::StructDef(def) = &mut t.unit.decls[s.decl] {
        def.impls.push(impl_expr);
    }

    let analysis = t.analyze();
    assert_error_containing(&analysis, "missing implementation of method 'label'");
}

#[test]
fn proto_default_impl_is_cloned_into_struct() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);
    let proto_block = add_printable_proto(&mut t, &m);
    add_proto_default(&mut t, proto_block, "greet", 1);

    let i32_ty = t.prim(Primitive::I32);
    let s = t.add_struct(&m, "S", &[]);
    t.add_field(&s, "v", i32_ty);

    let (self_name, self_ty) = t.self_param();
    let i32_ret = t.prim(Primitive::I32);
    let zero = t.int(0);
    let ret = t.ret(Some(zero));
    t.add_method(&s, "label", &[(self_name, self_ty)], i32_ret, &[ret]);

    let impl_expr = t.ident_expr("Printable");
    if let Decl::StructDef(def) = &mut t.unit.decls[s.decl] {
        def.impls.push(impl_expr);
    }

    let analysis = t.analyze();
    assert_no_errors(&analysis);

    // `greet` landed in the struct's symbol table as a clone.
    let greet = t.name("greet");
    let cloned = t.unit.lookup_local(s.table, greet);
    assert!(cloned.is_some(), "default impl not cloned into struct");
}

#[test]
fn struct_method_overrides_proto_default() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);
    let proto_block = add_printable_proto(&mut t, &m);
    add_proto_default(&mut t, proto_block, "label", 1);

    let i32_ty = t.prim(Primitive::I32);
    let s = t.add_struct(&m, "S", &[]);
    t.add_field(&s, "v", i32_ty);

    let (self_name, self_ty) = t.self_param();
    let i32_ret = t.prim(Primitive::I32);
    let two = t.int(2);
    let ret = t.ret(Some(two));
    let own_label = t.add_method(&s, "label", &[(self_name, self_ty)], i32_ret, &[ret]);

    let impl_expr = t.ident_expr("Printable");
    if let Decl::StructDef(def) = &mut t.unit.decls[s.decl] {
        def.impls.push(impl_expr);
    }

    let analysis = t.analyze();
    assert_no_errors(&analysis);

    // The struct's own method stands; nothing was cloned over it.
    let label = t.name("label");
    let resolved = t.unit.lookup_local(s.table, label);
    assert_eq!(resolved, Some(tarn::sir::Symbol::Decl(own_label)));
}

#[test]
fn self_outside_container_is_rejected() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);

    let void = t.prim(Primitive::Void);
    let (self_name, self_ty) = t.self_param();
    t.add_func(&m, "free", &[(self_name, self_ty)], void, &[]);

    let analysis = t.analyze();
    assert_error_containing(&analysis, "'self' parameter is only allowed");
}

#[test]
fn self_must_come_first() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);

    let i32_ty = t.prim(Primitive::I32);
    let s = t.add_struct(&m, "S", &[]);
    t.add_field(&s, "v", i32_ty);

    let void = t.prim(Primitive::Void);
    let other = t.prim(Primitive::I32);
    let (self_name, self_ty) = t.self_param();
    t.add_method(&s, "m", &[("a", other), (self_name, self_ty)], void, &[]);

    let analysis = t.analyze();
    assert_error_containing(&analysis, "'self' must be the first parameter");
}

#[test]
fn continue_outside_loop_is_rejected() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);

    let void = t.prim(Primitive::Void);
    let cont = t
        .unit
        .stmts
        .alloc(Stmt::Continue(tarn::sir::ContinueStmt { ast: None }));
    t.add_func(&m, "main", &[], void, &[cont]);

    let analysis = t.analyze();
    assert_error_containing(&analysis, "'continue' statement outside of a loop");
}

#[test]
fn try_over_optional_binds_the_value_type() {
    let mut t = TestUnit::new();
    t.add_std();
    let m = t.module(&["main"]);

    let i32_base = t.prim(Primitive::I32);
    let opt_ty = t.unit.exprs.alloc(Expr::OptionalType(tarn::sir::OptionalType {
        ast: None,
        base: i32_base,
    }));
    let none = t
        .unit
        .exprs
        .alloc(Expr::NoneLiteral(tarn::sir::NoneLiteral { ast: None, ty: None }));
    let ret = t.ret(Some(none));
    t.add_func(&m, "fetch", &[], opt_ty, &[ret]);

    let void = t.prim(Primitive::Void);
    let (body, body_table) = t.body(m.table);

    let callee = t.ident_expr("fetch");
    let call = t.call(callee, &[]);

    let x_use = t.ident_expr("x");
    let use_stmt = t.expr_stmt(x_use);
    let success_block = t.block(body_table, &[use_stmt]);

    let x_ident = t.ident("x");
    let try_stmt = t.unit.stmts.alloc(Stmt::Try(TryStmt {
        ast: None,
        success_branch: TrySuccessBranch {
            ast: None,
            ident: x_ident,
            expr: call,
            block: success_block,
        },
        except_branch: None,
        else_branch: None,
    }));

    t.func_with_body(&m, "main", &[], void, body, &[try_stmt]);

    let analysis = t.analyze();
    assert_no_errors(&analysis);

    // The bound value takes the optional's base type.
    let ty = t.unit.expr_type(x_use).expect("binding resolved");
    assert_eq!(t.unit.as_primitive(ty), Some(Primitive::I32));
}

#[test]
fn try_except_over_optional_is_rejected() {
    let mut t = TestUnit::new();
    t.add_std();
    let m = t.module(&["main"]);

    let i32_base = t.prim(Primitive::I32);
    let opt_ty = t.unit.exprs.alloc(Expr::OptionalType(tarn::sir::OptionalType {
        ast: None,
        base: i32_base,
    }));
    let none = t
        .unit
        .exprs
        .alloc(Expr::NoneLiteral(tarn::sir::NoneLiteral { ast: None, ty: None }));
    let ret = t.ret(Some(none));
    t.add_func(&m, "fetch", &[], opt_ty, &[ret]);

    let void = t.prim(Primitive::Void);
    let (body, body_table) = t.body(m.table);

    let callee = t.ident_expr("fetch");
    let call = t.call(callee, &[]);
    let success_block = t.block(body_table, &[]);
    let except_block = t.block(body_table, &[]);

    let x_ident = t.ident("x");
    let e_ident = t.ident("e");
    let i32_err = t.prim(Primitive::I32);
    let try_stmt = t.unit.stmts.alloc(Stmt::Try(TryStmt {
        ast: None,
        success_branch: TrySuccessBranch {
            ast: None,
            ident: x_ident,
            expr: call,
            block: success_block,
        },
        except_branch: Some(tarn::sir::TryExceptBranch {
            ast: None,
            ident: e_ident,
            ty: i32_err,
            block: except_block,
        }),
        else_branch: None,
    }));

    t.func_with_body(&m, "main", &[], void, body, &[try_stmt]);

    let analysis = t.analyze();
    assert_error_containing(&analysis, "optional types don't have an error field");
}

#[test]
fn switch_case_binds_a_typed_local() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);
    add_shape_union(&mut t, &m);

    let void = t.prim(Primitive::Void);
    let (body, body_table) = t.body(m.table);

    let shape = t.ident_expr("Shape");
    let callee = t.dot(shape, "Dot");
    let value = t.call(callee, &[]);
    let var = t.var("s", None, Some(value));

    let s_ref = t.ident_expr("s");
    let c_use = t.ident_expr("c");
    let use_stmt = t.expr_stmt(c_use);
    let case_block = t.block(body_table, &[use_stmt]);
    let case_ty = {
        let shape = t.ident_expr("Shape");
        t.dot(shape, "Circle")
    };
    let c_ident = t.ident("c");
    let switch = t.unit.stmts.alloc(Stmt::Switch(tarn::sir::SwitchStmt {
        ast: None,
        value: s_ref,
        cases: vec![tarn::sir::SwitchCase {
            ast: None,
            ident: c_ident,
            ty: case_ty,
            block: case_block,
        }],
    }));

    t.func_with_body(&m, "main", &[], void, body, &[var, switch]);

    let analysis = t.analyze();
    assert_no_errors(&analysis);
}
