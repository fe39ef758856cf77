//! Resource and move analysis: use after move (whole, partial,
//! conditional), moves in loops, moves out of deinit-carrying resources,
//! and the Init/Move marker rewrites.

mod common;

use common::{assert_error_containing, assert_no_errors, StructCtx, TestUnit};
use tarn::sir::{DeclId, Expr, Ownership, Primitive, Stmt, StmtId};

/// A struct with `__deinit__` and one payload field; values of this type
/// are resources.
fn add_box_struct(t: &mut TestUnit, m: &common::ModuleCtx) -> StructCtx {
    let i32_ty = t.prim(Primitive::I32);
    let boxed = t.add_struct(m, "Box", &[]);
    t.add_field(&boxed, "val", i32_ty);

    let (self_name, self_ty) = t.self_param();
    let void = t.prim(Primitive::Void);
    t.add_method(&boxed, "__deinit__", &[(self_name, self_ty)], void, &[]);

    boxed
}

fn add_consume_func(t: &mut TestUnit, m: &common::ModuleCtx, name: &str) -> DeclId {
    let box_ty = t.ident_expr("Box");
    let void = t.prim(Primitive::Void);
    t.add_func(m, name, &[("b", box_ty)], void, &[])
}

fn box_literal(t: &mut TestUnit, value: i64) -> tarn::sir::ExprId {
    let ty = t.ident_expr("Box");
    let val = t.int(value);
    t.struct_literal(ty, &[("val", val)])
}

#[test]
fn whole_value_use_after_move_is_rejected() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);
    add_box_struct(&mut t, &m);
    add_consume_func(&mut t, &m, "consume");

    let void = t.prim(Primitive::Void);
    let lit = box_literal(&mut t, 1);
    let var = t.var("b", None, Some(lit));

    let callee1 = t.ident_expr("consume");
    let b1 = t.ident_expr("b");
    let call1 = t.call(callee1, &[b1]);
    let stmt1 = t.expr_stmt(call1);

    let callee2 = t.ident_expr("consume");
    let b2 = t.ident_expr("b");
    let call2 = t.call(callee2, &[b2]);
    let stmt2 = t.expr_stmt(call2);

    t.add_func(&m, "main", &[], void, &[var, stmt1, stmt2]);

    let analysis = t.analyze();
    assert_error_containing(&analysis, "resource used after move");

    let report = analysis
        .reports
        .iter()
        .find(|r| r.message.contains("resource used after move"))
        .unwrap();
    assert!(report.notes[0].message.contains("previously moved"));
}

/// `var p = Pair{..}; consume(p.a); use2(p.a);` — the second use of the
/// partially moved field is an error; touching `p.b` stays fine.
#[test]
fn partial_move_tracks_sub_fields() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);
    add_box_struct(&mut t, &m);
    add_consume_func(&mut t, &m, "consume");
    add_consume_func(&mut t, &m, "use2");

    let box_a = t.ident_expr("Box");
    let box_b = t.ident_expr("Box");
    let pair = t.add_struct(&m, "Pair", &[]);
    t.add_field(&pair, "a", box_a);
    t.add_field(&pair, "b", box_b);

    let void = t.prim(Primitive::Void);
    let pair_ty = t.ident_expr("Pair");
    let lit_a = box_literal(&mut t, 1);
    let lit_b = box_literal(&mut t, 2);
    let lit = t.struct_literal(pair_ty, &[("a", lit_a), ("b", lit_b)]);
    let var = t.var("p", None, Some(lit));

    let callee1 = t.ident_expr("consume");
    let p1 = t.ident_expr("p");
    let p1_a = t.dot(p1, "a");
    let call1 = t.call(callee1, &[p1_a]);
    let stmt1 = t.expr_stmt(call1);

    let callee2 = t.ident_expr("use2");
    let p2 = t.ident_expr("p");
    let p2_a = t.dot(p2, "a");
    let call2 = t.call(callee2, &[p2_a]);
    let stmt2 = t.expr_stmt(call2);

    let callee3 = t.ident_expr("use2");
    let p3 = t.ident_expr("p");
    let p3_b = t.dot(p3, "b");
    let call3 = t.call(callee3, &[p3_b]);
    let stmt3 = t.expr_stmt(call3);

    t.add_func(&m, "main", &[], void, &[var, stmt1, stmt2, stmt3]);

    let analysis = t.analyze();

    let move_errors: Vec<_> = analysis
        .reports
        .iter()
        .filter(|r| r.message.contains("resource used after move"))
        .collect();
    assert_eq!(move_errors.len(), 1, "exactly the second use of p.a errors");
}

#[test]
fn conditional_move_is_flagged_at_later_use() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);
    add_box_struct(&mut t, &m);
    add_consume_func(&mut t, &m, "consume");

    let void = t.prim(Primitive::Void);
    let (body, body_table) = t.body(m.table);

    let lit = box_literal(&mut t, 1);
    let var = t.var("b", None, Some(lit));

    let cond = t.boolean(true);
    let callee1 = t.ident_expr("consume");
    let b1 = t.ident_expr("b");
    let call1 = t.call(callee1, &[b1]);
    let stmt1 = t.expr_stmt(call1);
    let then_block = t.block(body_table, &[stmt1]);
    let if_stmt = t.if_stmt(cond, then_block);

    let callee2 = t.ident_expr("consume");
    let b2 = t.ident_expr("b");
    let call2 = t.call(callee2, &[b2]);
    let stmt2 = t.expr_stmt(call2);

    t.func_with_body(&m, "main", &[], void, body, &[var, if_stmt, stmt2]);

    let analysis = t.analyze();
    assert_error_containing(&analysis, "resource used after move");

    let report = analysis
        .reports
        .iter()
        .find(|r| r.message.contains("resource used after move"))
        .unwrap();
    assert!(
        report.notes[0].message.contains("conditional branch"),
        "note should mention the conditional move: {:?}",
        report.notes[0].message
    );
}

#[test]
fn move_inside_loop_of_outer_resource_is_rejected() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);
    add_box_struct(&mut t, &m);
    add_consume_func(&mut t, &m, "consume");

    let void = t.prim(Primitive::Void);
    let (body, body_table) = t.body(m.table);

    let lit = box_literal(&mut t, 1);
    let var = t.var("b", None, Some(lit));

    let cond = t.boolean(true);
    let callee = t.ident_expr("consume");
    let b_ref = t.ident_expr("b");
    let call = t.call(callee, &[b_ref]);
    let stmt = t.expr_stmt(call);
    let loop_body = t.block(body_table, &[stmt]);
    let while_stmt = t.while_stmt(cond, loop_body);

    t.func_with_body(&m, "main", &[], void, body, &[var, while_stmt]);

    let analysis = t.analyze();
    assert_error_containing(&analysis, "moved in every iteration of a loop");
}

#[test]
fn move_out_of_deinit_resource_is_rejected() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);
    add_box_struct(&mut t, &m);
    add_consume_func(&mut t, &m, "consume");

    // Wrapper owns a Box and has its own `__deinit__`.
    let box_ty = t.ident_expr("Box");
    let wrapper = t.add_struct(&m, "Wrapper", &[]);
    t.add_field(&wrapper, "inner", box_ty);
    let (self_name, self_ty) = t.self_param();
    let void_m = t.prim(Primitive::Void);
    t.add_method(&wrapper, "__deinit__", &[(self_name, self_ty)], void_m, &[]);

    let void = t.prim(Primitive::Void);
    let wrapper_ty = t.ident_expr("Wrapper");
    let inner_lit = box_literal(&mut t, 1);
    let lit = t.struct_literal(wrapper_ty, &[("inner", inner_lit)]);
    let var = t.var("w", None, Some(lit));

    let callee = t.ident_expr("consume");
    let w_ref = t.ident_expr("w");
    let access = t.dot(w_ref, "inner");
    let call = t.call(callee, &[access]);
    let stmt = t.expr_stmt(call);

    t.add_func(&m, "main", &[], void, &[var, stmt]);

    let analysis = t.analyze();
    assert_error_containing(&analysis, "cannot move out of resource implementing '__deinit__'");
}

#[test]
fn var_init_is_wrapped_and_ownership_stamped() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);
    add_box_struct(&mut t, &m);

    let void = t.prim(Primitive::Void);
    let lit = box_literal(&mut t, 1);
    let var = t.var("b", None, Some(lit));
    let func = t.add_func(&m, "main", &[], void, &[var]);

    let analysis = t.analyze();
    assert_no_errors(&analysis);

    // The initializer got an Init marker pointing at the local's resource.
    let block = match &t.unit.decls[func] {
        tarn::sir::Decl::FuncDef(def) => def.block,
        _ => unreachable!(),
    };
    let var_stmt: StmtId = t.unit.blocks[block].stmts[0];
    let value = match &t.unit.stmts[var_stmt] {
        Stmt::Var(var_stmt) => var_stmt.value.unwrap(),
        _ => unreachable!(),
    };

    let resource = match &t.unit.exprs[value] {
        Expr::Init(init) => init.resource,
        other => panic!("initializer not wrapped: {:?}", other),
    };

    // Never moved: the scope exit stamped it owned.
    assert_eq!(t.unit.resources[resource].ownership, Ownership::Owned);
}

#[test]
fn moved_resource_is_stamped_moved() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);
    add_box_struct(&mut t, &m);
    add_consume_func(&mut t, &m, "consume");

    let void = t.prim(Primitive::Void);
    let lit = box_literal(&mut t, 1);
    let var = t.var("b", None, Some(lit));
    let callee = t.ident_expr("consume");
    let b_ref = t.ident_expr("b");
    let call = t.call(callee, &[b_ref]);
    let stmt = t.expr_stmt(call);
    let func = t.add_func(&m, "main", &[], void, &[var, stmt]);

    let analysis = t.analyze();
    assert_no_errors(&analysis);

    // The argument was rewritten into a Move marker.
    let resource = match &t.unit.exprs[b_ref] {
        Expr::Move(move_expr) => move_expr.resource,
        other => panic!("argument not rewritten to a move: {:?}", other),
    };
    assert_eq!(t.unit.resources[resource].ownership, Ownership::Moved);

    let _ = func;
}

#[test]
fn non_resource_values_move_freely() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);

    let i32_ty = t.prim(Primitive::I32);
    let void = t.prim(Primitive::Void);
    t.add_func(&m, "take", &[("x", i32_ty)], void, &[]);

    let void2 = t.prim(Primitive::Void);
    let one = t.int(1);
    let var = t.var("x", None, Some(one));

    let callee1 = t.ident_expr("take");
    let x1 = t.ident_expr("x");
    let call1 = t.call(callee1, &[x1]);
    let stmt1 = t.expr_stmt(call1);

    let callee2 = t.ident_expr("take");
    let x2 = t.ident_expr("x");
    let call2 = t.call(callee2, &[x2]);
    let stmt2 = t.expr_stmt(call2);

    t.add_func(&m, "main", &[], void2, &[var, stmt1, stmt2]);

    let analysis = t.analyze();
    assert_no_errors(&analysis);
}
