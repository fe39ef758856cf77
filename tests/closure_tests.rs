//! Closure lowering: capture into the data tuple, the synthesized
//! function, and calls through closure values.

mod common;

use common::{assert_no_errors, TestUnit};
use tarn::sir::{Decl, Expr, Primitive, Stmt, Symbol};

/// `func make() -> |i32| -> i32 { var k = 7; return |x| -> i32 { return
/// x + k; }; }` — the literal becomes a `Closure.new` call, a function
/// taking `(data: addr, x: i32)` is synthesized, and the body's `k`
/// becomes a field access through the data pointer.
#[test]
fn closure_literal_lowers_to_standard_closure() {
    let mut t = TestUnit::new();
    t.add_std();
    let closure_struct = t.std_closure_struct();

    let m = t.module(&["main"]);
    let module_decl_count = t.unit.decl_blocks[m.block].decls.len();

    let (body, body_table) = t.body(m.table);

    let seven = t.int(7);
    let var_k = t.var("k", None, Some(seven));

    // The closure body block; analysis re-parents its table.
    let x_ref = t.ident_expr("x");
    let k_ref = t.ident_expr("k");
    let sum = t.binary(tarn::sir::BinaryOp::Add, x_ref, k_ref);
    let closure_ret = t.ret(Some(sum));
    let closure_block = t.block(body_table, &[closure_ret]);

    let i32_param = t.prim(Primitive::I32);
    let i32_ret = t.prim(Primitive::I32);
    let closure_fn_ty = t.func_type(&[("x", i32_param)], i32_ret);
    let literal = t.closure_literal(closure_fn_ty, closure_block);
    let ret = t.ret(Some(literal));

    let i32_param2 = t.prim(Primitive::I32);
    let i32_ret2 = t.prim(Primitive::I32);
    let make_ret_fn_ty = t.func_type(&[("x", i32_param2)], i32_ret2);
    let make_ret_ty = t.closure_type(make_ret_fn_ty, closure_struct);

    t.func_with_body(&m, "make", &[], make_ret_ty, body, &[var_k, ret]);

    let analysis = t.analyze();
    assert_no_errors(&analysis);

    // The literal was rewritten into a constructor call typed as the
    // closure.
    let (args, call_ty) = match &t.unit.exprs[literal] {
        Expr::Call(call) => (call.args.clone(), call.ty.unwrap()),
        other => panic!("closure literal not lowered: {:?}", other),
    };
    assert!(matches!(t.unit.exprs[call_ty], Expr::ClosureType(_)));
    assert_eq!(args.len(), 2);

    // Capture tuple holds exactly `k`.
    match &t.unit.exprs[args[1]] {
        Expr::Tuple(tuple) => {
            assert_eq!(tuple.exprs.len(), 1);
            match &t.unit.exprs[tuple.exprs[0]] {
                Expr::SymbolExpr(symbol_expr) => {
                    assert!(matches!(symbol_expr.symbol, Symbol::Local { .. }));
                }
                other => panic!("capture is not a symbol: {:?}", other),
            }
        }
        other => panic!("second constructor arg is not the data tuple: {:?}", other),
    }

    // A synthesized function landed in the module with the data pointer
    // prepended to its signature.
    let decls = t.unit.decl_blocks[m.block].decls.clone();
    assert!(decls.len() > module_decl_count);
    let generated = decls
        .iter()
        .copied()
        .find_map(|d| match &t.unit.decls[d] {
            Decl::FuncDef(def) if def.ident.name == tarn::intern::Name::EMPTY => Some(def.clone()),
            _ => None,
        })
        .expect("synthesized closure function missing");

    let func_type = t.unit.func_type(generated.ty).unwrap();
    assert_eq!(func_type.params.len(), 2);
    assert_eq!(
        t.unit.as_primitive(func_type.params[0].ty),
        Some(Primitive::Addr)
    );

    // Inside the synthesized body, `k` reads through the data pointer.
    let gen_stmts = t.unit.blocks[generated.block].stmts.clone();
    let ret_value = match &t.unit.stmts[gen_stmts[0]] {
        Stmt::Return(ret) => ret.value.unwrap(),
        other => panic!("unexpected closure body statement: {:?}", other),
    };
    let rhs = match &t.unit.exprs[ret_value] {
        Expr::Binary(binary) => binary.rhs,
        other => panic!("closure body changed shape: {:?}", other),
    };
    assert!(
        matches!(t.unit.exprs[rhs], Expr::Field(_)),
        "captured variable not rewritten to a data field access"
    );
}

/// Calling a closure-typed value splits it into function and data
/// pointers; the data pointer rides in front of the user arguments.
#[test]
fn closure_call_prepends_the_data_pointer() {
    let mut t = TestUnit::new();
    t.add_std();
    let closure_struct = t.std_closure_struct();

    let m = t.module(&["main"]);

    let i32_param = t.prim(Primitive::I32);
    let i32_ret = t.prim(Primitive::I32);
    let fn_ty = t.func_type(&[("v", i32_param)], i32_ret);
    let c_ty = t.closure_type(fn_ty, closure_struct);

    let i32_ret2 = t.prim(Primitive::I32);
    let c_ref = t.ident_expr("c");
    let five = t.int(5);
    let call = t.call(c_ref, &[five]);
    let ret = t.ret(Some(call));
    t.add_func(&m, "invoke", &[("c", c_ty)], i32_ret2, &[ret]);

    let analysis = t.analyze();
    assert_no_errors(&analysis);

    let (callee, args, call_ty) = match &t.unit.exprs[call] {
        Expr::Call(call_expr) => (
            call_expr.callee,
            call_expr.args.clone(),
            call_expr.ty.unwrap(),
        ),
        other => panic!("closure call changed shape: {:?}", other),
    };

    // Function pointer: a cast of field 0; data pointer: field 1, first.
    assert!(matches!(t.unit.exprs[callee], Expr::Cast(_)));
    assert_eq!(args.len(), 2);
    match &t.unit.exprs[args[0]] {
        Expr::Field(field) => assert_eq!(field.field_index, 1),
        other => panic!("data pointer missing: {:?}", other),
    }
    assert_eq!(t.unit.as_primitive(call_ty), Some(Primitive::I32));
}
