//! Meta-construct expansion and compile-time evaluation.

mod common;

use common::{assert_no_errors, TestUnit};
use tarn::sir::{BinaryOp, Decl, Expr, Primitive, Stmt, Symbol};

/// `meta if CFG { func g() -> i32 { return 1 } } else { ... }` with
/// `CFG = true` resolves calls to the first branch and leaves the else
/// branch unanalyzed.
#[test]
fn meta_if_selects_the_true_branch() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);

    let bool_ty = t.prim(Primitive::Bool);
    let true_lit = t.boolean(true);
    t.add_const(&m, "CFG", bool_ty, true_lit);

    let i32_a = t.prim(Primitive::I32);
    let one = t.int(1);
    let ret1 = t.ret(Some(one));
    let g1 = t.func_decl(m.table, "g", &[], i32_a, &[ret1]);

    let i32_b = t.prim(Primitive::I32);
    let two = t.int(2);
    let ret2 = t.ret(Some(two));
    let g2 = t.func_decl(m.table, "g", &[], i32_b, &[ret2]);

    let condition = t.ident_expr("CFG");
    let meta_decl = t.meta_if_decl(&m, vec![(condition, vec![g1])], Some(vec![g2]));

    let void = t.prim(Primitive::Void);
    let callee = t.ident_expr("g");
    let call = t.call(callee, &[]);
    let stmt = t.expr_stmt(call);
    t.add_func(&m, "main", &[], void, &[stmt]);

    let analysis = t.analyze();
    assert_no_errors(&analysis);

    // The meta statement collapsed into its marker.
    assert!(matches!(t.unit.decls[meta_decl], Decl::ExpandedMeta));

    // The call resolved to the first branch's definition.
    let callee_id = match &t.unit.exprs[call] {
        Expr::Call(call_expr) => call_expr.callee,
        _ => panic!("call vanished"),
    };
    match &t.unit.exprs[callee_id] {
        Expr::SymbolExpr(symbol_expr) => assert_eq!(symbol_expr.symbol, Symbol::Decl(g1)),
        other => panic!("callee unresolved: {:?}", other),
    }

    // The else branch was never analyzed past its condition.
    assert!(t.unit.expr_type(two).is_none());
}

#[test]
fn stmt_level_meta_if_splices_the_else_branch() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);

    let void = t.prim(Primitive::Void);
    let condition = t.boolean(false);
    let one = t.int(1);
    let then_var = t.var("a", None, Some(one));
    let two = t.int(2);
    let else_var = t.var("b", None, Some(two));

    let meta_stmt = t.unit.stmts.alloc(Stmt::MetaIf(tarn::sir::MetaIfStmt {
        ast: None,
        cond_branches: vec![tarn::sir::MetaIfCondBranch {
            condition,
            block: tarn::sir::MetaBlock {
                ast: None,
                nodes: vec![tarn::sir::MetaNode::Stmt(then_var)],
            },
        }],
        else_branch: Some(tarn::sir::MetaBlock {
            ast: None,
            nodes: vec![tarn::sir::MetaNode::Stmt(else_var)],
        }),
    }));

    let func = t.func_decl(m.table, "main", &[], void, &[meta_stmt]);
    t.push_decl(m.block, func);

    let analysis = t.analyze();
    assert_no_errors(&analysis);

    let block = match &t.unit.decls[func] {
        Decl::FuncDef(def) => def.block,
        _ => unreachable!(),
    };
    let stmts = t.unit.blocks[block].stmts.clone();
    assert_eq!(stmts.len(), 2);
    assert!(matches!(t.unit.stmts[stmts[0]], Stmt::ExpandedMeta));
    assert!(matches!(t.unit.stmts[stmts[1]], Stmt::Var(_)));

    // Only the else branch ran; `b` is bound, `a` is not.
    assert!(t.unit.expr_type(two).is_some());
    assert!(t.unit.expr_type(one).is_none());
}

#[test]
fn meta_for_unrolls_over_an_integer_range() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);

    let void = t.prim(Primitive::Void);
    let zero = t.int(0);
    let var_k = t.var("k", None, Some(zero));

    let k1 = t.ident_expr("k");
    let k2 = t.ident_expr("k");
    let i_ref = t.ident_expr("i");
    let sum = t.binary(BinaryOp::Add, k2, i_ref);
    let body_assign = t.assign(k1, sum);

    let range_lo = t.int(0);
    let range_hi = t.int(3);
    let range = t.range(range_lo, range_hi);
    let loop_var = t.ident("i");
    let meta_stmt = t.unit.stmts.alloc(Stmt::MetaFor(tarn::sir::MetaForStmt {
        ast: None,
        ident: loop_var,
        range,
        block: tarn::sir::MetaBlock {
            ast: None,
            nodes: vec![tarn::sir::MetaNode::Stmt(body_assign)],
        },
    }));

    let func = t.func_decl(m.table, "main", &[], void, &[var_k, meta_stmt]);
    t.push_decl(m.block, func);

    let analysis = t.analyze();
    assert_no_errors(&analysis);

    let block = match &t.unit.decls[func] {
        Decl::FuncDef(def) => def.block,
        _ => unreachable!(),
    };
    let stmts = t.unit.blocks[block].stmts.clone();

    // var + marker + three unrolled assignments.
    assert_eq!(stmts.len(), 5);
    assert!(matches!(t.unit.stmts[stmts[1]], Stmt::ExpandedMeta));
    for &stmt in &stmts[2..] {
        assert!(matches!(t.unit.stmts[stmt], Stmt::Assign(_)));
    }

    // Each clone's loop variable became the iteration's literal.
    let unrolled_values: Vec<i64> = stmts[2..]
        .iter()
        .map(|&stmt| match &t.unit.stmts[stmt] {
            Stmt::Assign(assign) => match &t.unit.exprs[assign.rhs] {
                Expr::Binary(binary) => match &t.unit.exprs[binary.rhs] {
                    Expr::IntLiteral(literal) => literal.value,
                    other => panic!("loop variable not substituted: {:?}", other),
                },
                other => panic!("assign rhs not binary: {:?}", other),
            },
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(unrolled_values, vec![0, 1, 2]);
}

#[test]
fn meta_if_condition_folds_const_arithmetic() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);

    let i32_ty = t.prim(Primitive::I32);
    let two = t.int(2);
    let three = t.int(3);
    let sum = t.binary(BinaryOp::Add, two, three);
    t.add_const(&m, "N", i32_ty, sum);

    let void = t.prim(Primitive::Void);
    let h = t.func_decl(m.table, "h", &[], void, &[]);

    let n_ref = t.ident_expr("N");
    let five = t.int(5);
    let condition = t.binary(BinaryOp::Eq, n_ref, five);
    t.meta_if_decl(&m, vec![(condition, vec![h])], None);

    let void2 = t.prim(Primitive::Void);
    let callee = t.ident_expr("h");
    let call = t.call(callee, &[]);
    let stmt = t.expr_stmt(call);
    t.add_func(&m, "main", &[], void2, &[stmt]);

    let analysis = t.analyze();
    assert_no_errors(&analysis);
}

#[test]
fn meta_size_field_yields_layout_size() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);

    let f32_a = t.prim(Primitive::F32);
    let f32_b = t.prim(Primitive::F32);
    let v = t.add_struct(&m, "V", &[]);
    t.add_field(&v, "x", f32_a);
    t.add_field(&v, "y", f32_b);

    let i32_ty = t.prim(Primitive::I32);
    let base = t.ident_expr("V");
    let size = t.meta_field(base, "size");
    t.add_const(&m, "SZ", i32_ty, size);

    let analysis = t.analyze();
    assert_no_errors(&analysis);

    match &t.unit.exprs[size] {
        Expr::IntLiteral(literal) => assert_eq!(literal.value, 8),
        other => panic!("meta size not folded: {:?}", other),
    }
}

#[test]
fn meta_name_field_yields_symbol_name() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);

    let f32_a = t.prim(Primitive::F32);
    let v = t.add_struct(&m, "V", &[]);
    t.add_field(&v, "x", f32_a);

    let u8_ty = t.prim(Primitive::U8);
    let name_ty = t.unit.exprs.alloc(Expr::PointerType(tarn::sir::PointerType {
        ast: None,
        base: u8_ty,
    }));
    let base = t.ident_expr("V");
    let name = t.meta_field(base, "name");
    t.add_const(&m, "NAME", name_ty, name);

    let analysis = t.analyze();
    assert_no_errors(&analysis);

    match &t.unit.exprs[name] {
        Expr::StringLiteral(literal) => assert_eq!(literal.value, "V"),
        other => panic!("meta name not folded: {:?}", other),
    }
}

#[test]
fn invalid_meta_field_is_reported() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);

    let f32_a = t.prim(Primitive::F32);
    let v = t.add_struct(&m, "V", &[]);
    t.add_field(&v, "x", f32_a);

    let i32_ty = t.prim(Primitive::I32);
    let base = t.ident_expr("V");
    let bad = t.meta_field(base, "alignment");
    t.add_const(&m, "A", i32_ty, bad);

    let analysis = t.analyze();
    common::assert_error_containing(&analysis, "invalid meta field 'alignment'");
}
