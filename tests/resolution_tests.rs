//! Name resolution: identifiers, redefinitions, use imports, and module
//! member access.

mod common;

use common::{assert_error_containing, assert_no_errors, TestUnit};
use tarn::sir::{Decl, Expr, Primitive, Symbol, UseDecl, UseDotExpr, UseIdent, UseItem};

#[test]
fn local_identifier_resolves_to_symbol_expr() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);

    let void = t.prim(Primitive::Void);
    let one = t.int(1);
    let var = t.var("x", None, Some(one));
    let use_x = t.ident_expr("x");
    let use_stmt = t.expr_stmt(use_x);
    t.add_func(&m, "main", &[], void, &[var, use_stmt]);

    let analysis = t.analyze();
    assert_no_errors(&analysis);

    match &t.unit.exprs[use_x] {
        Expr::SymbolExpr(symbol_expr) => {
            assert!(matches!(symbol_expr.symbol, Symbol::Local { .. }));
        }
        other => panic!("identifier not rewritten: {:?}", other),
    }
}

#[test]
fn unknown_identifier_reports_symbol_not_found() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);

    let void = t.prim(Primitive::Void);
    let use_y = t.ident_expr("y");
    let use_stmt = t.expr_stmt(use_y);
    t.add_func(&m, "main", &[], void, &[use_stmt]);

    let analysis = t.analyze();
    assert_error_containing(&analysis, "cannot find 'y'");
}

#[test]
fn duplicate_struct_reports_redefinition() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);

    t.add_struct(&m, "Point", &[]);
    t.add_struct(&m, "Point", &[]);

    let analysis = t.analyze();
    assert_error_containing(&analysis, "redefinition of 'Point'");
}

#[test]
fn second_function_under_name_becomes_overload_set() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);

    let void = t.prim(Primitive::Void);
    let i32_ty = t.prim(Primitive::I32);
    let void2 = t.prim(Primitive::Void);
    t.add_func(&m, "f", &[("x", i32_ty)], void, &[]);
    let u8_ty = t.prim(Primitive::U8);
    t.add_func(&m, "f", &[("x", u8_ty)], void2, &[]);

    let analysis = t.analyze();
    assert_no_errors(&analysis);

    let name = t.name("f");
    let symbol = t.unit.lookup_local(m.table, name).unwrap();
    assert!(matches!(symbol, Symbol::OverloadSet(_)));
}

#[test]
fn use_import_resolves_function_from_other_module() {
    let mut t = TestUnit::new();
    let lib = t.module(&["lib"]);
    let void = t.prim(Primitive::Void);
    t.add_func(&lib, "helper", &[], void, &[]);

    let m = t.module(&["main"]);

    // use lib.helper;
    let lib_ident = t.ident("lib");
    let lhs = t.unit.use_items.alloc(UseItem::Ident(UseIdent {
        ident: lib_ident,
        symbol: None,
    }));
    let helper_ident = t.ident("helper");
    let rhs = t.unit.use_items.alloc(UseItem::Ident(UseIdent {
        ident: helper_ident,
        symbol: None,
    }));
    let root_item = t
        .unit
        .use_items
        .alloc(UseItem::Dot(UseDotExpr { ast: None, lhs, rhs }));
    let use_decl = t
        .unit
        .decls
        .alloc(Decl::Use(UseDecl { ast: None, root_item }));
    t.unit.decl_blocks[m.block].decls.insert(0, use_decl);

    let void2 = t.prim(Primitive::Void);
    let callee = t.ident_expr("helper");
    let call = t.call(callee, &[]);
    let call_stmt = t.expr_stmt(call);
    t.add_func(&m, "main", &[], void2, &[call_stmt]);

    let analysis = t.analyze();
    assert_no_errors(&analysis);
}

#[test]
fn use_of_missing_module_reports_module_not_found() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);

    let ident = t.ident("nowhere");
    let root_item = t.unit.use_items.alloc(UseItem::Ident(UseIdent {
        ident,
        symbol: None,
    }));
    let use_decl = t
        .unit
        .decls
        .alloc(Decl::Use(UseDecl { ast: None, root_item }));
    t.unit.decl_blocks[m.block].decls.insert(0, use_decl);

    let analysis = t.analyze();
    assert_error_containing(&analysis, "cannot find module 'nowhere'");
}

#[test]
fn module_member_access_through_dot() {
    let mut t = TestUnit::new();
    let lib = t.module(&["lib"]);
    let i32_ty = t.prim(Primitive::I32);
    let one = t.int(1);
    let ret = t.ret(Some(one));
    t.add_func(&lib, "answer", &[], i32_ty, &[ret]);

    let m = t.module(&["main"]);

    let lib_ident = t.ident("lib");
    let root_item = t.unit.use_items.alloc(UseItem::Ident(UseIdent {
        ident: lib_ident,
        symbol: None,
    }));
    let use_decl = t
        .unit
        .decls
        .alloc(Decl::Use(UseDecl { ast: None, root_item }));
    t.unit.decl_blocks[m.block].decls.insert(0, use_decl);

    let void = t.prim(Primitive::Void);
    let lib_ref = t.ident_expr("lib");
    let callee = t.dot(lib_ref, "answer");
    let call = t.call(callee, &[]);
    let stmt = t.expr_stmt(call);
    t.add_func(&m, "main", &[], void, &[stmt]);

    let analysis = t.analyze();
    assert_no_errors(&analysis);
}

#[test]
fn reanalysis_reports_no_new_errors() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);

    let void = t.prim(Primitive::Void);
    let one = t.int(1);
    let var = t.var("x", None, Some(one));
    t.add_func(&m, "main", &[], void, &[var]);

    let first = t.analyze();
    assert_no_errors(&first);

    let second = t.analyze();
    assert_no_errors(&second);
    assert_eq!(first.reports.len(), second.reports.len());
}
