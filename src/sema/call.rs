//! Call analysis: method-call sugar, overload resolution, generic
//! argument inference, union-case construction, and calls through
//! function pointers and closures.

use smallvec::SmallVec;

use crate::ast::AstRef;
use crate::completion::CompletionContext;
use crate::sir::cloner::Cloner;
use crate::sir::{
    CallExpr, CastExpr, Decl, DeclId, Expr, ExprCategory, ExprId, FieldExpr, Ident, Param,
    ParamAttrs, Primitive, Symbol, SymbolExpr, UnionCaseLiteral,
};

use super::{AnalysisError, Result, SemanticAnalyzer};

impl<'u, 'a> SemanticAnalyzer<'u, 'a> {
    pub(crate) fn analyze_call_expr(&mut self, expr: ExprId, call: CallExpr<'a>) -> Result {
        let ast = call.ast;
        let mut callee = call.callee;
        let mut args: SmallVec<[ExprId; 4]> = call.args.clone();
        let mut prebuilt = 0;

        if let Expr::Dot(dot) = self.unit.exprs[callee].clone() {
            match self.resolve_callee_dot(expr, callee, &dot.rhs, dot.lhs, ast, &mut args)? {
                CalleeResolution::Rewritten => return Ok(()),
                CalleeResolution::Method => prebuilt = 1,
                CalleeResolution::Plain => {}
            }
        } else {
            self.analyze_expr_uncoerced(callee)?;
        }

        // Arguments analyze uncoerced first so overload resolution and
        // generic inference can look at their types. Synthesized receiver
        // arguments already carry types.
        for &arg in &args {
            if self.unit.expr_type(arg).is_none() {
                self.analyze_expr_uncoerced(arg)?;
            }
        }

        if let Expr::SymbolExpr(symbol_expr) = self.unit.exprs[callee].clone() {
            match self.unit.resolve_use_symbol(symbol_expr.symbol) {
                Symbol::OverloadSet(set) => {
                    let Some(chosen) = self.resolve_overload(set, &args) else {
                        let candidates = self.overload_candidates(set);
                        self.err_no_matching_overload(ast, candidates);
                        return Err(AnalysisError);
                    };

                    let func_ty = self.unit.symbol_type(Symbol::Decl(chosen)).ok_or(AnalysisError)?;
                    callee = self.unit.exprs.alloc(Expr::SymbolExpr(SymbolExpr {
                        ast: symbol_expr.ast,
                        ty: Some(func_ty),
                        symbol: Symbol::Decl(chosen),
                    }));
                    self.write_call(expr, ast, callee, &args);
                    return self.analyze_resolved_call(expr, func_ty, prebuilt);
                }
                Symbol::Decl(decl) => match &self.unit.decls[decl] {
                    Decl::FuncDef(def) if def.is_generic() => {
                        // Inference works on concrete types; literal
                        // arguments fall back to their defaults first.
                        for &arg in &args {
                            self.finalize(arg)?;
                        }
                        let inferred = self.infer_generic_args(ast, decl, &args)?;
                        let spec = self.specialize_func(decl, &inferred)?;
                        let func_ty =
                            self.unit.symbol_type(Symbol::Decl(spec)).ok_or(AnalysisError)?;
                        callee = self.unit.exprs.alloc(Expr::SymbolExpr(SymbolExpr {
                            ast: symbol_expr.ast,
                            ty: Some(func_ty),
                            symbol: Symbol::Decl(spec),
                        }));
                        self.write_call(expr, ast, callee, &args);
                        return self.analyze_resolved_call(expr, func_ty, prebuilt);
                    }
                    Decl::FuncDef(_) | Decl::FuncDecl(_) | Decl::NativeFuncDecl(_) => {
                        let func_ty =
                            self.unit.symbol_type(Symbol::Decl(decl)).ok_or(AnalysisError)?;
                        self.write_call(expr, ast, callee, &args);
                        return self.analyze_resolved_call(expr, func_ty, prebuilt);
                    }
                    Decl::UnionCase(_) => {
                        return self.build_union_case_literal(expr, decl, &args, ast);
                    }
                    _ => {}
                },
                _ => {}
            }
        }

        // Calls through values: function pointers and closures.
        let Some(callee_ty) = self.unit.expr_type(callee) else {
            let ty = self.print_type_of(callee);
            self.err_cannot_call(ast, ty);
            return Err(AnalysisError);
        };

        match self.unit.exprs[callee_ty].clone() {
            Expr::FuncType(_) => {
                self.write_call(expr, ast, callee, &args);
                self.analyze_resolved_call(expr, callee_ty, prebuilt)
            }
            Expr::ClosureType(closure_ty) => {
                self.build_closure_call(expr, callee, closure_ty.func_type, &args, ast)
            }
            _ => {
                let ty = self.print_expr(callee_ty);
                self.err_cannot_call(ast, ty);
                Err(AnalysisError)
            }
        }
    }

    fn write_call(
        &mut self,
        expr: ExprId,
        ast: AstRef<'a>,
        callee: ExprId,
        args: &SmallVec<[ExprId; 4]>,
    ) {
        self.unit.exprs[expr] = Expr::Call(CallExpr {
            ast,
            ty: None,
            callee,
            args: args.clone(),
        });
    }

    /// Coerce arguments against the resolved signature and take the
    /// return type. The first `prebuilt` arguments were synthesized with
    /// their types already correct.
    pub(crate) fn analyze_resolved_call(
        &mut self,
        expr: ExprId,
        func_ty: ExprId,
        prebuilt: usize,
    ) -> Result {
        let (param_tys, return_type) = {
            let Some(func_type) = self.unit.func_type(func_ty) else {
                return Err(AnalysisError);
            };
            let param_tys: Vec<ExprId> = func_type.params.iter().map(|p| p.ty).collect();
            (param_tys, func_type.return_type)
        };

        let (ast, args) = match &self.unit.exprs[expr] {
            Expr::Call(call) => (call.ast, call.args.clone()),
            _ => return Err(AnalysisError),
        };

        if args.len() != param_tys.len() {
            let callee_ty = Some(self.print_expr(func_ty));
            self.err_unexpected_arg_count(ast, param_tys.len(), args.len(), callee_ty);
            return Err(AnalysisError);
        }

        let mut result = Ok(());
        for (index, (&arg, &param_ty)) in args.iter().zip(param_tys.iter()).enumerate() {
            if index < prebuilt {
                continue;
            }
            if self.finalize_by_coercion(arg, param_ty).is_err() {
                result = Err(AnalysisError);
            }
        }

        self.unit.exprs[expr].set_ty(return_type);
        result
    }

    // ---- dot callees ------------------------------------------------------

    fn resolve_callee_dot(
        &mut self,
        expr: ExprId,
        callee: ExprId,
        rhs: &Ident<'a>,
        lhs: ExprId,
        call_ast: AstRef<'a>,
        args: &mut SmallVec<[ExprId; 4]>,
    ) -> Result<CalleeResolution> {
        self.analyze_expr(lhs, None)?;

        if self.is_completion_ident(rhs) {
            let lhs_type = self.unit.expr_type(lhs).unwrap_or(lhs);
            self.capture_completion(CompletionContext::AfterDot { lhs_type });
            return Err(AnalysisError);
        }

        match self.unit.expr_category(lhs) {
            ExprCategory::Value => {
                let Some(receiver_ty) = self.unit.expr_type(lhs) else {
                    return Err(AnalysisError);
                };

                let struct_decl = match self.unit.exprs[receiver_ty].clone() {
                    Expr::PointerType(pointer) => self.unit.type_as_struct(pointer.base),
                    _ => self.unit.type_as_struct(receiver_ty),
                };

                if let Some(struct_decl) = struct_decl {
                    let table = match &self.unit.decls[struct_decl] {
                        Decl::StructDef(def) => self.unit.decl_blocks[def.block].symbol_table,
                        _ => return Err(AnalysisError),
                    };

                    match self.unit.lookup_local(table, rhs.name) {
                        Some(symbol @ Symbol::Decl(method))
                            if matches!(self.unit.decls[method], Decl::FuncDef(_)) =>
                        {
                            self.symbol_uses.add(rhs.ast, symbol);
                            let method_ty = self.unit.symbol_type(symbol);
                            let self_arg = self.build_method_self_arg(method, lhs);
                            args.insert(0, self_arg);
                            self.unit.exprs[callee] = Expr::SymbolExpr(SymbolExpr {
                                ast: rhs.ast,
                                ty: method_ty,
                                symbol,
                            });
                            return Ok(CalleeResolution::Method);
                        }
                        Some(symbol @ Symbol::OverloadSet(set)) => {
                            self.symbol_uses.add(rhs.ast, symbol);
                            let byval = self.overload_set_takes_self_byval(set);
                            let self_arg = self.build_receiver_arg(lhs, byval);
                            args.insert(0, self_arg);
                            self.unit.exprs[callee] = Expr::SymbolExpr(SymbolExpr {
                                ast: rhs.ast,
                                ty: None,
                                symbol,
                            });
                            return Ok(CalleeResolution::Method);
                        }
                        _ => {
                            // A field holding a callable still works as a
                            // callee.
                            if self.unit.find_field(struct_decl, rhs.name).is_some() {
                                self.resolve_dot_rhs(callee, lhs, *rhs, call_ast)?;
                                return Ok(CalleeResolution::Plain);
                            }

                            let strct = self.symbol_str(Symbol::Decl(struct_decl));
                            let method = self.name_str(rhs.name);
                            self.err_no_method(rhs.ast, strct, method);
                            return Err(AnalysisError);
                        }
                    }
                }

                self.resolve_dot_rhs(callee, lhs, *rhs, call_ast)?;
                Ok(CalleeResolution::Plain)
            }
            ExprCategory::Type => {
                // Union case constructors rewrite the whole call.
                if let Some(decl) = self.unit.type_as_decl(lhs) {
                    if matches!(self.unit.decls[decl], Decl::UnionDef(_)) {
                        let table = self
                            .unit
                            .symbol_table_of(Symbol::Decl(decl))
                            .ok_or(AnalysisError)?;
                        if let Some(Symbol::Decl(case)) = self.unit.lookup_local(table, rhs.name)
                        {
                            if matches!(self.unit.decls[case], Decl::UnionCase(_)) {
                                self.symbol_uses.add(rhs.ast, Symbol::Decl(case));
                                let args = args.clone();
                                self.build_union_case_literal(expr, case, &args, call_ast)?;
                                return Ok(CalleeResolution::Rewritten);
                            }
                        }
                    }
                }

                self.resolve_dot_rhs(callee, lhs, *rhs, call_ast)?;
                Ok(CalleeResolution::Plain)
            }
            _ => {
                self.resolve_dot_rhs(callee, lhs, *rhs, call_ast)?;
                Ok(CalleeResolution::Plain)
            }
        }
    }

    fn overload_set_takes_self_byval(&self, set: crate::sir::OverloadSetId) -> bool {
        self.unit.overload_sets[set]
            .func_defs
            .first()
            .and_then(|&func| match &self.unit.decls[func] {
                Decl::FuncDef(def) => self.unit.func_type(def.ty),
                _ => None,
            })
            .and_then(|ft| ft.params.first())
            .map(|p| p.attrs.byval)
            .unwrap_or(false)
    }

    fn build_method_self_arg(&mut self, method: DeclId, receiver: ExprId) -> ExprId {
        let byval = match &self.unit.decls[method] {
            Decl::FuncDef(def) => self
                .unit
                .func_type(def.ty)
                .and_then(|ft| ft.params.first())
                .map(|p| p.attrs.byval)
                .unwrap_or(false),
            _ => false,
        };
        self.build_receiver_arg(receiver, byval)
    }

    fn build_receiver_arg(&mut self, receiver: ExprId, byval: bool) -> ExprId {
        if byval {
            return receiver;
        }

        let receiver_ty = self.unit.expr_type(receiver);
        if let Some(ty) = receiver_ty {
            if matches!(self.unit.exprs[ty], Expr::PointerType(_)) {
                return receiver;
            }
        }

        let pointer_ty = receiver_ty.map(|base| {
            self.unit
                .exprs
                .alloc(Expr::PointerType(crate::sir::PointerType { ast: None, base }))
        });

        self.unit.exprs.alloc(Expr::Unary(crate::sir::UnaryExpr {
            ast: None,
            ty: pointer_ty,
            op: crate::sir::UnaryOp::Ref,
            value: receiver,
        }))
    }

    // ---- union cases ------------------------------------------------------

    fn build_union_case_literal(
        &mut self,
        expr: ExprId,
        case: DeclId,
        args: &[ExprId],
        ast: AstRef<'a>,
    ) -> Result {
        let field_tys: Vec<ExprId> = match &self.unit.decls[case] {
            Decl::UnionCase(case) => case.fields.iter().map(|f| f.ty).collect(),
            _ => return Err(AnalysisError),
        };

        if args.len() != field_tys.len() {
            self.err_unexpected_arg_count(ast, field_tys.len(), args.len(), None);
            return Err(AnalysisError);
        }

        let mut result = Ok(());
        for (&arg, &field_ty) in args.iter().zip(field_tys.iter()) {
            if self.unit.expr_type(arg).is_none() {
                let _ = self.analyze_expr_uncoerced(arg);
            }
            if self.finalize_by_coercion(arg, field_ty).is_err() {
                result = Err(AnalysisError);
            }
        }

        let union_symbol = self
            .unit
            .decl_parents
            .get(&case)
            .copied()
            .ok_or(AnalysisError)?;
        let union_ty = self.unit.exprs.alloc(Expr::SymbolExpr(SymbolExpr {
            ast: None,
            ty: None,
            symbol: union_symbol,
        }));

        self.unit.exprs[expr] = Expr::UnionCaseLiteral(UnionCaseLiteral {
            ast,
            ty: Some(union_ty),
            case,
            args: args.to_vec(),
        });

        result
    }

    // ---- closures ---------------------------------------------------------

    /// Call through a closure value: split it into its function-pointer
    /// and data-pointer fields, prepend the data pointer, and call
    /// through the cast pointer.
    fn build_closure_call(
        &mut self,
        expr: ExprId,
        closure: ExprId,
        func_type: ExprId,
        args: &[ExprId],
        ast: AstRef<'a>,
    ) -> Result {
        let addr_ty = self.alloc_primitive(Primitive::Addr);

        let func_field = self.unit.exprs.alloc(Expr::Field(FieldExpr {
            ast: None,
            ty: Some(addr_ty),
            base: closure,
            field_index: 0,
        }));

        let data_field = self.unit.exprs.alloc(Expr::Field(FieldExpr {
            ast: None,
            ty: Some(addr_ty),
            base: closure,
            field_index: 1,
        }));

        let extended_ty = Cloner::new(self.unit).clone_expr(func_type);
        if let Expr::FuncType(extended) = &mut self.unit.exprs[extended_ty] {
            extended.params.insert(
                0,
                Param {
                    ast: None,
                    name: Ident::default(),
                    ty: addr_ty,
                    attrs: ParamAttrs::default(),
                },
            );
        }

        let callee = self.unit.exprs.alloc(Expr::Cast(CastExpr {
            ast: None,
            ty: Some(extended_ty),
            value: func_field,
        }));

        let mut all_args: SmallVec<[ExprId; 4]> = SmallVec::new();
        all_args.push(data_field);
        all_args.extend(args.iter().copied());

        self.unit.exprs[expr] = Expr::Call(CallExpr {
            ast,
            ty: None,
            callee,
            args: all_args,
        });

        self.analyze_resolved_call(expr, extended_ty, 1)
    }
}

enum CalleeResolution {
    /// The whole call was rewritten (union case literal).
    Rewritten,
    /// Method sugar resolved; a receiver argument was prepended.
    Method,
    /// Plain callee; nothing synthesized.
    Plain,
}
