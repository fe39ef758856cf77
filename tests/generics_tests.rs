//! Generic inference and specialization.

mod common;

use common::{assert_error_containing, assert_no_errors, TestUnit};
use tarn::sir::{BracketExpr, Decl, Expr, Primitive, UnaryExpr, UnaryOp};

/// `func at[T](s: *T, i: usize) -> *T { return &s[i]; }` called with a
/// `*i32` argument infers `T = i32`.
#[test]
fn generic_args_infer_from_argument_types() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);

    let elem = t.ident_expr("T");
    let s_ty = t.star(elem);
    let usize_ty = t.prim(Primitive::Usize);
    let ret_elem = t.ident_expr("T");
    let ret_ty = t.star(ret_elem);

    let s_ref = t.ident_expr("s");
    let i_ref = t.ident_expr("i");
    let indexed = t.unit.exprs.alloc(Expr::Bracket(BracketExpr {
        ast: None,
        lhs: s_ref,
        rhs: vec![i_ref],
    }));
    let referenced = t.unit.exprs.alloc(Expr::Unary(UnaryExpr {
        ast: None,
        ty: None,
        op: UnaryOp::Ref,
        value: indexed,
    }));
    let ret = t.ret(Some(referenced));

    let at = t.add_generic_func(
        &m,
        "at",
        &["T"],
        &[("s", s_ty), ("i", usize_ty)],
        ret_ty,
        &[ret],
    );

    let void = t.prim(Primitive::Void);
    let i32_ty = t.prim(Primitive::I32);
    let arr_ty = t.star(i32_ty);
    let null = t.unit.exprs.alloc(Expr::NullLiteral(tarn::sir::NullLiteral {
        ast: None,
        ty: None,
    }));
    let var = t.var("arr", Some(arr_ty), Some(null));

    let callee = t.ident_expr("at");
    let arr_ref = t.ident_expr("arr");
    let zero = t.int(0);
    let call = t.call(callee, &[arr_ref, zero]);
    let var2 = t.var("p", None, Some(call));
    t.add_func(&m, "main", &[], void, &[var, var2]);

    let analysis = t.analyze();
    assert_no_errors(&analysis);

    // The call's type is *i32.
    let call_ty = t.unit.expr_type(call).unwrap();
    match &t.unit.exprs[call_ty] {
        Expr::PointerType(pointer) => {
            assert_eq!(t.unit.as_primitive(pointer.base), Some(Primitive::I32));
        }
        other => panic!("call type is not a pointer: {:?}", other),
    }

    // Exactly one specialization record, and the instance is non-generic.
    let specializations = match &t.unit.decls[at] {
        Decl::FuncDef(def) => def.specializations.clone(),
        _ => unreachable!(),
    };
    assert_eq!(specializations.len(), 1);
    match &t.unit.decls[specializations[0].def] {
        Decl::FuncDef(def) => assert!(def.generic_params.is_empty()),
        _ => unreachable!(),
    }
}

#[test]
fn same_args_reuse_the_cached_specialization() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);

    let param_ty = t.ident_expr("T");
    let ret_ty = t.ident_expr("T");
    let x_ref = t.ident_expr("x");
    let ret = t.ret(Some(x_ref));
    let id = t.add_generic_func(&m, "id", &["T"], &[("x", param_ty)], ret_ty, &[ret]);

    let void = t.prim(Primitive::Void);
    let callee1 = t.ident_expr("id");
    let one = t.int(1);
    let call1 = t.call(callee1, &[one]);
    let var1 = t.var("a", None, Some(call1));

    let callee2 = t.ident_expr("id");
    let two = t.int(2);
    let call2 = t.call(callee2, &[two]);
    let var2 = t.var("b", None, Some(call2));

    let callee3 = t.ident_expr("id");
    let fp = t.float(1.5);
    let call3 = t.call(callee3, &[fp]);
    let var3 = t.var("c", None, Some(call3));

    t.add_func(&m, "main", &[], void, &[var1, var2, var3]);

    let analysis = t.analyze();
    assert_no_errors(&analysis);

    let specializations = match &t.unit.decls[id] {
        Decl::FuncDef(def) => def.specializations.clone(),
        _ => unreachable!(),
    };
    // i32 twice shares one instance; f32 gets its own.
    assert_eq!(specializations.len(), 2);
}

#[test]
fn unused_generic_param_cannot_be_inferred() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);

    let i32_ty = t.prim(Primitive::I32);
    let one = t.int(1);
    let ret = t.ret(Some(one));
    t.add_generic_func(&m, "g", &["T"], &[], i32_ty, &[ret]);

    let void = t.prim(Primitive::Void);
    let callee = t.ident_expr("g");
    let call = t.call(callee, &[]);
    let stmt = t.expr_stmt(call);
    t.add_func(&m, "main", &[], void, &[stmt]);

    let analysis = t.analyze();
    assert_error_containing(&analysis, "cannot infer value for generic parameter 'T'");
}

#[test]
fn explicit_generic_args_check_their_count() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);

    let param_ty = t.ident_expr("T");
    let ret_ty = t.ident_expr("T");
    let x_ref = t.ident_expr("x");
    let ret = t.ret(Some(x_ref));
    t.add_generic_func(&m, "id", &["T"], &[("x", param_ty)], ret_ty, &[ret]);

    let void = t.prim(Primitive::Void);
    let lhs = t.ident_expr("id");
    let i32_ty = t.prim(Primitive::I32);
    let u8_ty = t.prim(Primitive::U8);
    let bracket = t.unit.exprs.alloc(Expr::Bracket(BracketExpr {
        ast: None,
        lhs,
        rhs: vec![i32_ty, u8_ty],
    }));
    let stmt = t.expr_stmt(bracket);
    t.add_func(&m, "main", &[], void, &[stmt]);

    let analysis = t.analyze();
    assert_error_containing(&analysis, "too many generic arguments");
}

#[test]
fn generic_struct_specializes_through_brackets() {
    let mut t = TestUnit::new();
    let m = t.module(&["main"]);

    let field_ty = t.ident_expr("T");
    let boxed = t.add_struct(&m, "Boxed", &["T"]);
    t.add_field(&boxed, "value", field_ty);

    let void = t.prim(Primitive::Void);
    let lhs = t.ident_expr("Boxed");
    let i32_ty = t.prim(Primitive::I32);
    let bracket = t.unit.exprs.alloc(Expr::Bracket(BracketExpr {
        ast: None,
        lhs,
        rhs: vec![i32_ty],
    }));
    let one = t.int(1);
    let lit = t.struct_literal(bracket, &[("value", one)]);
    let var = t.var("b", None, Some(lit));
    t.add_func(&m, "main", &[], void, &[var]);

    let analysis = t.analyze();
    assert_no_errors(&analysis);

    let specializations = match &t.unit.decls[boxed.decl] {
        Decl::StructDef(def) => def.specializations.clone(),
        _ => unreachable!(),
    };
    assert_eq!(specializations.len(), 1);

    // The instance's field carries the substituted type.
    let instance = specializations[0].def;
    let fields = match &t.unit.decls[instance] {
        Decl::StructDef(def) => def.fields.clone(),
        _ => unreachable!(),
    };
    assert_eq!(fields.len(), 1);
    match &t.unit.decls[fields[0]] {
        Decl::StructField(field) => {
            assert_eq!(t.unit.as_primitive(field.ty), Some(Primitive::I32));
        }
        _ => unreachable!(),
    }
}
