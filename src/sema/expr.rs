//! Expression analysis: the primary type-checker. Analysis runs
//! uncoerced first (pseudo-types allowed), then finalization coerces to
//! the expected type or applies literal defaults. Unresolved forms
//! (identifier, star, bracket, dot) are rewritten in place into their
//! resolved counterparts.

use smallvec::SmallVec;

use crate::ast::AstRef;
use crate::completion::CompletionContext;
use crate::intern::Name;
use crate::sir::cloner::Cloner;
use crate::sir::{
    BinaryOp, CallExpr, CastExpr, ClosureType, Decl, DeclId, Expr, ExprId, FieldExpr, Ident,
    IndexExpr, Param, ParamAttrs, PointerType, Primitive, PseudoTypeKind, Symbol, SymbolExpr,
    UnaryExpr, UnaryOp,
};

use super::{AnalysisError, ClosureContext, Result, SemanticAnalyzer};

impl<'u, 'a> SemanticAnalyzer<'u, 'a> {
    pub(crate) fn analyze_expr(&mut self, expr: ExprId, expected: Option<ExprId>) -> Result {
        self.analyze_expr_uncoerced(expr)?;

        match expected {
            Some(expected) => self.finalize_by_coercion(expr, expected),
            None => self.finalize(expr),
        }
    }

    pub(crate) fn analyze_expr_uncoerced(&mut self, expr: ExprId) -> Result {
        let result = match self.unit.exprs[expr].clone() {
            Expr::IntLiteral(_) => {
                let ty = self.unit.exprs.alloc(Expr::PseudoType(PseudoTypeKind::IntLiteral));
                self.unit.exprs[expr].set_ty(ty);
                Ok(())
            }
            Expr::FpLiteral(_) => {
                let ty = self.unit.exprs.alloc(Expr::PseudoType(PseudoTypeKind::FpLiteral));
                self.unit.exprs[expr].set_ty(ty);
                Ok(())
            }
            Expr::BoolLiteral(_) => {
                let ty = self.unit.exprs.alloc(Expr::PseudoType(PseudoTypeKind::BoolLiteral));
                self.unit.exprs[expr].set_ty(ty);
                Ok(())
            }
            Expr::CharLiteral(_) => {
                let ty = self.alloc_primitive(Primitive::U8);
                self.unit.exprs[expr].set_ty(ty);
                Ok(())
            }
            Expr::NullLiteral(_) => {
                let ty = self.unit.exprs.alloc(Expr::PseudoType(PseudoTypeKind::NullLiteral));
                self.unit.exprs[expr].set_ty(ty);
                Ok(())
            }
            Expr::NoneLiteral(_) | Expr::UndefinedLiteral(_) => Ok(()),
            Expr::StringLiteral(_) => {
                let ty = self
                    .unit
                    .exprs
                    .alloc(Expr::PseudoType(PseudoTypeKind::StringLiteral));
                self.unit.exprs[expr].set_ty(ty);
                Ok(())
            }
            Expr::ArrayLiteral(literal) => self.analyze_array_literal(expr, literal.values),
            Expr::MapLiteral(literal) => self.analyze_map_literal(expr, literal.entries),
            Expr::StructLiteral(literal) => {
                if let Some(ty) = literal.ty {
                    self.analyze_expr_uncoerced(ty)?;
                    self.analyze_struct_literal_entries(expr)
                } else {
                    // Typeless literals wait for the expected type.
                    Ok(())
                }
            }
            Expr::UnionCaseLiteral(_) => Ok(()),
            Expr::ClosureLiteral(literal) => {
                self.analyze_closure_literal(expr, literal.func_type, literal.block, literal.ast)
            }
            Expr::SymbolExpr(_) => Ok(()),
            Expr::Binary(binary) => {
                self.analyze_binary_expr(expr, binary.op, binary.lhs, binary.rhs, binary.ast)
            }
            Expr::Unary(unary) => {
                self.analyze_unary_expr(expr, unary.op, unary.value, unary.ast)
            }
            Expr::Cast(cast) => self.analyze_cast_expr(expr, cast.ty, cast.value, cast.ast),
            Expr::Index(_) | Expr::Field(_) | Expr::Coercion(_) => Ok(()),
            Expr::Call(call) => self.analyze_call_expr(expr, call),
            Expr::Range(range) => {
                self.analyze_expr(range.lhs, None)?;
                self.analyze_expr(range.rhs, None)
            }
            Expr::Tuple(tuple) => self.analyze_tuple_expr(expr, tuple.exprs),
            Expr::PrimitiveType(_) => Ok(()),
            Expr::PointerType(pointer) => self.analyze_expr_uncoerced(pointer.base),
            Expr::StaticArrayType(static_array) => {
                self.analyze_expr_uncoerced(static_array.base)?;
                self.analyze_static_array_length(static_array.length)
            }
            Expr::FuncType(func_type) => {
                for param in &func_type.params {
                    self.analyze_expr_uncoerced(param.ty)?;
                }
                self.analyze_expr_uncoerced(func_type.return_type)
            }
            Expr::OptionalType(optional) => {
                self.analyze_expr(optional.base, None)?;
                let spec = self.specialize_std_struct(
                    optional.ast,
                    &["std", "optional"],
                    "Optional",
                    &[optional.base],
                )?;
                self.rewrite_to_struct_symbol(expr, spec);
                Ok(())
            }
            Expr::ResultType(result) => {
                self.analyze_expr(result.value_type, None)?;
                self.analyze_expr(result.error_type, None)?;
                let spec = self.specialize_std_struct(
                    result.ast,
                    &["std", "result"],
                    "Result",
                    &[result.value_type, result.error_type],
                )?;
                self.rewrite_to_struct_symbol(expr, spec);
                Ok(())
            }
            Expr::ArrayType(array) => {
                self.analyze_expr(array.base, None)?;
                let spec = self.specialize_std_struct(
                    array.ast,
                    &["std", "array"],
                    "Array",
                    &[array.base],
                )?;
                self.rewrite_to_struct_symbol(expr, spec);
                Ok(())
            }
            Expr::MapType(map) => {
                self.analyze_expr(map.key, None)?;
                self.analyze_expr(map.value, None)?;
                let spec = self.specialize_std_struct(
                    map.ast,
                    &["std", "map"],
                    "Map",
                    &[map.key, map.value],
                )?;
                self.rewrite_to_struct_symbol(expr, spec);
                Ok(())
            }
            Expr::ClosureType(closure) => self.analyze_expr_uncoerced(closure.func_type),
            Expr::ReferenceType(reference) => self.analyze_expr_uncoerced(reference.base),
            Expr::Ident(ident) => self.analyze_ident_expr(expr, ident.value, ident.ast),
            Expr::Star(star) => self.analyze_star_expr(expr, star.value, star.ast),
            Expr::Bracket(bracket) => {
                self.analyze_bracket_expr(expr, bracket.lhs, bracket.rhs, bracket.ast)
            }
            Expr::Dot(dot) => self.analyze_dot_expr(expr, dot.lhs, dot.rhs, dot.ast),
            Expr::PseudoType(_) => Ok(()),
            Expr::MetaAccess(_) => Ok(()),
            Expr::MetaField(_) | Expr::MetaCall(_) => self.eval_meta_expr(expr).map(|_| ()),
            // Resource markers only exist after a completed run; passing
            // them through keeps re-analysis a no-op.
            Expr::Init(_) | Expr::Move(_) | Expr::Deinit(_) => Ok(()),
            Expr::Error => Err(AnalysisError),
            Expr::CompletionToken(_) => {
                let context = match (self.scope().block, self.scope().func) {
                    (Some(block), Some(func)) => CompletionContext::InBlock { block, func },
                    _ => CompletionContext::InDeclBlock {
                        decl_block: self.unit.modules[self.scope().module].block,
                    },
                };
                self.capture_completion(context);
                Err(AnalysisError)
            }
        };

        result?;
        self.see_through_aliases(expr);
        Ok(())
    }

    fn see_through_aliases(&mut self, expr: ExprId) {
        loop {
            let Expr::SymbolExpr(symbol_expr) = &self.unit.exprs[expr] else {
                return;
            };
            let Symbol::Decl(decl) = self.unit.resolve_use_symbol(symbol_expr.symbol) else {
                return;
            };
            let Decl::TypeAlias(alias) = &self.unit.decls[decl] else {
                return;
            };
            let target = alias.ty;
            self.unit.exprs[expr] = self.unit.exprs[target].clone();
        }
    }

    fn rewrite_to_struct_symbol(&mut self, expr: ExprId, decl: DeclId) {
        let ast = self.unit.expr_ast(expr);
        self.unit.exprs[expr] = Expr::SymbolExpr(SymbolExpr {
            ast,
            ty: None,
            symbol: Symbol::Decl(decl),
        });
    }

    fn analyze_static_array_length(&mut self, length: ExprId) -> Result {
        self.analyze_expr_uncoerced(length)?;

        match self.const_eval_int(length) {
            Some(value) if value < 0 => {
                let ast = self.unit.expr_ast(length);
                self.error(
                    "static array length $ is negative",
                    ast,
                    &[value.to_string()],
                );
                Err(AnalysisError)
            }
            Some(_) => Ok(()),
            None => {
                let ast = self.unit.expr_ast(length);
                let ty = self.print_type_of(length);
                self.err_expected_integer(ast, ty);
                Err(AnalysisError)
            }
        }
    }

    // ---- identifiers ------------------------------------------------------

    fn analyze_ident_expr(&mut self, expr: ExprId, name: Name, ast: AstRef<'a>) -> Result {
        // Generic-arg environment wins over any symbol table.
        if let Some(&arg) = self.scope().generic_args.get(&name) {
            if matches!(self.unit.exprs[arg], Expr::StringLiteral(_)) {
                let clone = Cloner::new(self.unit).clone_expr(arg);
                self.unit.exprs[expr] = self.unit.exprs[clone].clone();
            } else {
                self.unit.exprs[expr] = self.unit.exprs[arg].clone();
            }
            return Ok(());
        }

        if self.in_meta_expansion {
            // A pending expansion in the current decl block may introduce
            // the name; flush it before giving up.
            if let Some(decl_block) = self.unit.symbol_decl_block(self.scope().decl) {
                self.resolve_uses_in_decl_block(decl_block);
                self.run_meta_expansion_on_decl_block(decl_block);
            }
        }

        let table = self.scope().symbol_table;
        let mut symbol = self.lookup_symbol_at(table, name, ast)?;

        if symbol.is_none() {
            if let Some(ctx_index) = self.scope().closure_ctx {
                if let Some(captured) = self.resolve_closure_capture(expr, name, ctx_index)? {
                    return captured;
                }
            }
        }

        let Some(symbol) = symbol.take() else {
            self.err_symbol_not_found(name, ast);
            return Err(AnalysisError);
        };

        self.symbol_uses.add(ast, symbol);

        let ty = self.unit.symbol_type(symbol);
        self.unit.exprs[expr] = Expr::SymbolExpr(SymbolExpr { ast, ty, symbol });
        Ok(())
    }

    /// Identifier missed the closure's own scope: try the enclosing
    /// block, capture on a hit, and rewrite the use into a field access
    /// through the closure's data pointer.
    fn resolve_closure_capture(
        &mut self,
        expr: ExprId,
        name: Name,
        ctx_index: usize,
    ) -> Result<Option<Result>> {
        let parent_table = self.closure_ctxs[ctx_index].parent_table;
        let Some(symbol) = self.lookup_symbol(parent_table, name)? else {
            return Ok(None);
        };

        if !matches!(symbol, Symbol::Local { .. } | Symbol::Param { .. }) {
            // Module-level symbols resolve directly; no capture needed.
            let ty = self.unit.symbol_type(symbol);
            let ast = self.unit.expr_ast(expr);
            self.unit.exprs[expr] = Expr::SymbolExpr(SymbolExpr { ast, ty, symbol });
            return Ok(Some(Ok(())));
        }

        let ctx = &mut self.closure_ctxs[ctx_index];
        let capture_index = match ctx.captured_vars.iter().position(|&v| v == symbol) {
            Some(index) => index,
            None => {
                ctx.captured_vars.push(symbol);
                ctx.captured_vars.len() - 1
            }
        };
        let data_type = ctx.data_type;

        let func = self.scope().func.expect("closure body outside a function");
        let func_ty = match &self.unit.decls[func] {
            Decl::FuncDef(def) => def.ty,
            _ => return Ok(Some(Err(AnalysisError))),
        };
        let data_param_ty = self
            .unit
            .func_type(func_ty)
            .map(|ft| ft.params[0].ty)
            .ok_or(AnalysisError)?;

        let symbol_ty = self.unit.symbol_type(symbol);

        let data_ptr = self.unit.exprs.alloc(Expr::SymbolExpr(SymbolExpr {
            ast: None,
            ty: Some(data_param_ty),
            symbol: Symbol::Param { func, index: 0 },
        }));

        let data_ptr_type = self.unit.exprs.alloc(Expr::PointerType(PointerType {
            ast: None,
            base: data_type,
        }));

        let cast = self.unit.exprs.alloc(Expr::Cast(CastExpr {
            ast: None,
            ty: Some(data_ptr_type),
            value: data_ptr,
        }));

        let deref = self.unit.exprs.alloc(Expr::Unary(UnaryExpr {
            ast: None,
            ty: Some(data_type),
            op: UnaryOp::Deref,
            value: cast,
        }));

        self.unit.exprs[expr] = Expr::Field(FieldExpr {
            ast: self.unit.expr_ast(expr),
            ty: symbol_ty,
            base: deref,
            field_index: capture_index as u32,
        });

        Ok(Some(Ok(())))
    }

    // ---- star / bracket / dot ---------------------------------------------

    fn analyze_star_expr(&mut self, expr: ExprId, value: ExprId, ast: AstRef<'a>) -> Result {
        self.analyze_expr(value, None)?;

        if self.unit.is_type_expr(value) {
            self.unit.exprs[expr] = Expr::PointerType(PointerType { ast, base: value });
            return Ok(());
        }

        let Some(value_ty) = self.unit.expr_type(value) else {
            let ty = self.print_type_of(value);
            self.err_cannot_deref(ast, ty);
            return Err(AnalysisError);
        };

        if let Some(struct_decl) = self.unit.type_as_struct(value_ty) {
            let deref_name = self.unit.magic.op_deref;
            let Some(method) = self.find_struct_method(struct_decl, deref_name) else {
                let ty = self.print_expr(value_ty);
                self.err_operator_overload_not_found(ast, ty, "*", "__deref__".to_string());
                return Err(AnalysisError);
            };
            return self.build_operator_call(expr, method, value, None, ast);
        }

        match self.unit.exprs[value_ty].clone() {
            Expr::PointerType(pointer) => {
                self.unit.exprs[expr] = Expr::Unary(UnaryExpr {
                    ast,
                    ty: Some(pointer.base),
                    op: UnaryOp::Deref,
                    value,
                });
                Ok(())
            }
            _ => {
                let ty = self.print_expr(value_ty);
                self.err_cannot_deref(ast, ty);
                Err(AnalysisError)
            }
        }
    }

    fn analyze_bracket_expr(
        &mut self,
        expr: ExprId,
        lhs: ExprId,
        rhs: Vec<ExprId>,
        ast: AstRef<'a>,
    ) -> Result {
        self.analyze_expr_uncoerced(lhs)?;

        // Brackets on a generic declaration are explicit generic args.
        if let Expr::SymbolExpr(symbol_expr) = &self.unit.exprs[lhs] {
            let symbol = self.unit.resolve_use_symbol(symbol_expr.symbol);
            if let Symbol::Decl(decl) = symbol {
                let (is_generic_func, is_generic_struct, param_count) =
                    match &self.unit.decls[decl] {
                        Decl::FuncDef(def) if def.is_generic() => {
                            (true, false, def.generic_params.len())
                        }
                        Decl::StructDef(def) if def.is_generic() => {
                            (false, true, def.generic_params.len())
                        }
                        _ => (false, false, 0),
                    };

                if is_generic_func || is_generic_struct {
                    if rhs.len() != param_count {
                        self.err_unexpected_generic_arg_count(ast, param_count, rhs.len());
                        return Err(AnalysisError);
                    }

                    for &arg in &rhs {
                        self.analyze_expr(arg, None)?;
                    }

                    let spec = if is_generic_func {
                        self.specialize_func(decl, &rhs)?
                    } else {
                        self.specialize_struct(decl, &rhs)?
                    };

                    let ty = self.unit.symbol_type(Symbol::Decl(spec));
                    self.unit.exprs[expr] = Expr::SymbolExpr(SymbolExpr {
                        ast,
                        ty,
                        symbol: Symbol::Decl(spec),
                    });
                    return Ok(());
                }
            }
        }

        // Otherwise an index access.
        self.finalize(lhs)?;

        if rhs.len() != 1 {
            self.error("expected just one index, got $", ast, &[rhs.len().to_string()]);
            return Err(AnalysisError);
        }
        let index = rhs[0];

        let Some(lhs_ty) = self.unit.expr_type(lhs) else {
            self.error("expected generic declaration or indexable value", ast, &[]);
            return Err(AnalysisError);
        };

        if let Some(struct_decl) = self.unit.type_as_struct(lhs_ty) {
            let index_name = self.unit.magic.op_index;
            let Some(method) = self.find_struct_method(struct_decl, index_name) else {
                let ty = self.print_expr(lhs_ty);
                self.err_operator_overload_not_found(ast, ty, "[]", "__index__".to_string());
                return Err(AnalysisError);
            };
            self.analyze_expr_uncoerced(index)?;
            self.build_operator_call(expr, method, lhs, Some(index), ast)?;

            // An overload returning a pointer is dereferenced so indexing
            // yields the element.
            if let Some(result_ty) = self.unit.expr_type(expr) {
                if let Expr::PointerType(pointer) = self.unit.exprs[result_ty].clone() {
                    let inner = self.unit.exprs[expr].clone();
                    let inner_id = self.unit.exprs.alloc(inner);
                    self.unit.exprs[expr] = Expr::Unary(UnaryExpr {
                        ast,
                        ty: Some(pointer.base),
                        op: UnaryOp::Deref,
                        value: inner_id,
                    });
                }
            }
            return Ok(());
        }

        let usize_ty = self.alloc_primitive(Primitive::Usize);
        self.analyze_expr(index, Some(usize_ty))?;

        match self.unit.exprs[lhs_ty].clone() {
            Expr::PointerType(pointer) => {
                self.unit.exprs[expr] = Expr::Index(IndexExpr {
                    ast,
                    ty: Some(pointer.base),
                    base: lhs,
                    index,
                });
                Ok(())
            }
            Expr::StaticArrayType(static_array) => {
                self.unit.exprs[expr] = Expr::Index(IndexExpr {
                    ast,
                    ty: Some(static_array.base),
                    base: lhs,
                    index,
                });
                Ok(())
            }
            _ => {
                self.error("expected generic declaration or indexable value", ast, &[]);
                Err(AnalysisError)
            }
        }
    }

    fn analyze_dot_expr(
        &mut self,
        expr: ExprId,
        lhs: ExprId,
        rhs: Ident<'a>,
        ast: AstRef<'a>,
    ) -> Result {
        self.analyze_expr(lhs, None)?;
        self.resolve_dot_rhs(expr, lhs, rhs, ast)
    }

    /// Resolve the right-hand side of an analyzed dot expression, in
    /// place. Value lhs resolves to fields; type lhs to members; module
    /// lhs to module contents or sub-modules.
    pub(crate) fn resolve_dot_rhs(
        &mut self,
        expr: ExprId,
        lhs: ExprId,
        rhs: Ident<'a>,
        ast: AstRef<'a>,
    ) -> Result {
        if self.is_completion_ident(&rhs) {
            let lhs_type = self
                .unit
                .expr_type(lhs)
                .unwrap_or(lhs);
            self.capture_completion(CompletionContext::AfterDot { lhs_type });
            return Err(AnalysisError);
        }

        match self.unit.expr_category(lhs) {
            crate::sir::ExprCategory::Module => self.resolve_module_member(expr, lhs, rhs),
            crate::sir::ExprCategory::Type => self.resolve_type_member(expr, lhs, rhs),
            crate::sir::ExprCategory::Value => self.resolve_value_field(expr, lhs, rhs, ast),
            crate::sir::ExprCategory::Overloads => {
                let ty = self.print_type_of(lhs);
                self.err_no_members(ast, ty);
                Err(AnalysisError)
            }
        }
    }

    fn resolve_module_member(&mut self, expr: ExprId, lhs: ExprId, rhs: Ident<'a>) -> Result {
        let Expr::SymbolExpr(symbol_expr) = &self.unit.exprs[lhs] else {
            return Err(AnalysisError);
        };
        let Symbol::Module(module) = self.unit.resolve_use_symbol(symbol_expr.symbol) else {
            return Err(AnalysisError);
        };

        let table = self.unit.decl_blocks[self.unit.modules[module].block].symbol_table;
        if let Some(symbol) = self.lookup_symbol_at(table, rhs.name, rhs.ast)? {
            self.symbol_uses.add(rhs.ast, symbol);
            let ty = self.unit.symbol_type(symbol);
            self.unit.exprs[expr] = Expr::SymbolExpr(SymbolExpr {
                ast: rhs.ast,
                ty,
                symbol,
            });
            return Ok(());
        }

        // Fall back to a sub-module of the same path.
        let sub_path = self.unit.modules[module].path.appended(rhs.name);
        if let Some(&sub_module) = self.unit.mods_by_path.get(&sub_path) {
            self.unit.exprs[expr] = Expr::SymbolExpr(SymbolExpr {
                ast: rhs.ast,
                ty: None,
                symbol: Symbol::Module(sub_module),
            });
            return Ok(());
        }

        let base = self.symbol_str(Symbol::Module(module));
        self.err_symbol_not_found_in(rhs.name, rhs.ast, base);
        Err(AnalysisError)
    }

    fn resolve_type_member(&mut self, expr: ExprId, lhs: ExprId, rhs: Ident<'a>) -> Result {
        let Some(decl) = self.unit.type_as_decl(lhs) else {
            let ty = self.print_expr(lhs);
            self.err_no_members(rhs.ast, ty);
            return Err(AnalysisError);
        };

        let Some(table) = self.unit.symbol_table_of(Symbol::Decl(decl)) else {
            let ty = self.print_expr(lhs);
            self.err_no_members(rhs.ast, ty);
            return Err(AnalysisError);
        };

        let Some(symbol) = self.lookup_symbol_at(table, rhs.name, rhs.ast)? else {
            let base = self.symbol_str(Symbol::Decl(decl));
            self.err_symbol_not_found_in(rhs.name, rhs.ast, base);
            return Err(AnalysisError);
        };

        self.symbol_uses.add(rhs.ast, symbol);
        let ty = self.unit.symbol_type(symbol);
        self.unit.exprs[expr] = Expr::SymbolExpr(SymbolExpr {
            ast: rhs.ast,
            ty,
            symbol,
        });
        Ok(())
    }

    fn resolve_value_field(
        &mut self,
        expr: ExprId,
        lhs: ExprId,
        rhs: Ident<'a>,
        ast: AstRef<'a>,
    ) -> Result {
        let base = self.auto_deref(lhs);
        let Some(base_ty) = self.unit.expr_type(base) else {
            let ty = self.print_type_of(base);
            self.err_no_members(ast, ty);
            return Err(AnalysisError);
        };

        // Struct field.
        if let Some(struct_decl) = self.unit.type_as_struct(base_ty) {
            if let Some(field) = self.unit.find_field(struct_decl, rhs.name) {
                let (field_ty, field_index) = match &self.unit.decls[field] {
                    Decl::StructField(f) => (f.ty, f.index),
                    _ => return Err(AnalysisError),
                };
                self.symbol_uses.add(rhs.ast, Symbol::Decl(field));
                self.unit.exprs[expr] = Expr::Field(FieldExpr {
                    ast,
                    ty: Some(field_ty),
                    base,
                    field_index,
                });
                return Ok(());
            }

            let strct = self.symbol_str(Symbol::Decl(struct_decl));
            let field = self.name_str(rhs.name);
            self.err_no_field(rhs.ast, "struct", strct, field);
            return Err(AnalysisError);
        }

        // Union case field.
        if let Some(case_decl) = self.unit.type_as_decl(base_ty) {
            if let Decl::UnionCase(case) = &self.unit.decls[case_decl] {
                if let Some((index, field)) = case
                    .fields
                    .iter()
                    .enumerate()
                    .find(|(_, f)| f.ident.name == rhs.name)
                {
                    let field_ty = field.ty;
                    let field_index = index as u32;
                    self.unit.exprs[expr] = Expr::Field(FieldExpr {
                        ast,
                        ty: Some(field_ty),
                        base,
                        field_index,
                    });
                    return Ok(());
                }

                let container = self.symbol_str(Symbol::Decl(case_decl));
                let field = self.name_str(rhs.name);
                self.err_no_field(rhs.ast, "union case", container, field);
                return Err(AnalysisError);
            }
        }

        // Tuple field by numeric name.
        if let Expr::Tuple(tuple_ty) = self.unit.exprs[base_ty].clone() {
            let field_name = self.name_str(rhs.name);
            if let Ok(index) = field_name.parse::<u32>() {
                if let Some(&field_ty) = tuple_ty.exprs.get(index as usize) {
                    self.unit.exprs[expr] = Expr::Field(FieldExpr {
                        ast,
                        ty: Some(field_ty),
                        base,
                        field_index: index,
                    });
                    return Ok(());
                }
            }

            let container = self.print_expr(base_ty);
            self.err_no_field(rhs.ast, "tuple", container, field_name);
            return Err(AnalysisError);
        }

        let ty = self.print_expr(base_ty);
        self.err_no_members(ast, ty);
        Err(AnalysisError)
    }

    /// Insert derefs until the value's type is no longer a pointer.
    pub(crate) fn auto_deref(&mut self, expr: ExprId) -> ExprId {
        let mut current = expr;

        loop {
            let Some(ty) = self.unit.expr_type(current) else {
                return current;
            };
            let Expr::PointerType(pointer) = self.unit.exprs[ty].clone() else {
                return current;
            };

            current = self.unit.exprs.alloc(Expr::Unary(UnaryExpr {
                ast: None,
                ty: Some(pointer.base),
                op: UnaryOp::Deref,
                value: current,
            }));
        }
    }

    // ---- operators --------------------------------------------------------

    pub(crate) fn find_struct_method(&self, struct_decl: DeclId, name: Name) -> Option<DeclId> {
        let Decl::StructDef(def) = &self.unit.decls[struct_decl] else {
            return None;
        };
        let table = self.unit.decl_blocks[def.block].symbol_table;

        match self.unit.lookup_local(table, name) {
            Some(Symbol::Decl(decl)) if matches!(self.unit.decls[decl], Decl::FuncDef(_)) => {
                Some(decl)
            }
            _ => None,
        }
    }

    /// Rewrite an operator expression into a call of its overload method,
    /// with the receiver passed by reference.
    fn build_operator_call(
        &mut self,
        expr: ExprId,
        method: DeclId,
        receiver: ExprId,
        arg: Option<ExprId>,
        ast: AstRef<'a>,
    ) -> Result {
        let method_ty = match &self.unit.decls[method] {
            Decl::FuncDef(def) => def.ty,
            _ => return Err(AnalysisError),
        };

        let self_arg = self.build_self_arg(method, receiver);

        let callee = self.unit.exprs.alloc(Expr::SymbolExpr(SymbolExpr {
            ast: None,
            ty: Some(method_ty),
            symbol: Symbol::Decl(method),
        }));

        let mut args: SmallVec<[ExprId; 4]> = SmallVec::new();
        args.push(self_arg);
        if let Some(arg) = arg {
            args.push(arg);
        }

        self.unit.exprs[expr] = Expr::Call(CallExpr {
            ast,
            ty: None,
            callee,
            args,
        });

        self.analyze_resolved_call(expr, method_ty, 1)
    }

    /// Build the receiver argument for a method call: by value when the
    /// method takes `self` byval, as-is when the receiver is already a
    /// pointer, otherwise behind an implicit reference.
    fn build_self_arg(&mut self, method: DeclId, receiver: ExprId) -> ExprId {
        let byval = match &self.unit.decls[method] {
            Decl::FuncDef(def) => self
                .unit
                .func_type(def.ty)
                .and_then(|ft| ft.params.first())
                .map(|p| p.attrs.byval)
                .unwrap_or(false),
            _ => false,
        };

        if byval {
            return receiver;
        }

        let receiver_ty = self.unit.expr_type(receiver);
        if let Some(ty) = receiver_ty {
            if matches!(self.unit.exprs[ty], Expr::PointerType(_)) {
                return receiver;
            }
        }

        let pointer_ty = match receiver_ty {
            Some(base) => Some(self.unit.exprs.alloc(Expr::PointerType(PointerType {
                ast: None,
                base,
            }))),
            None => None,
        };

        self.unit.exprs.alloc(Expr::Unary(UnaryExpr {
            ast: None,
            ty: pointer_ty,
            op: UnaryOp::Ref,
            value: receiver,
        }))
    }

    fn analyze_binary_expr(
        &mut self,
        expr: ExprId,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
        ast: AstRef<'a>,
    ) -> Result {
        self.analyze_expr_uncoerced(lhs)?;
        self.analyze_expr_uncoerced(rhs)?;

        // Logical operators work on bools only and have no overloads.
        if op.is_logical() {
            let bool_ty = self.alloc_primitive(Primitive::Bool);
            self.finalize_by_coercion(lhs, bool_ty)?;
            self.finalize_by_coercion(rhs, bool_ty)?;
            self.unit.exprs[expr].set_ty(bool_ty);
            return Ok(());
        }

        // A struct operand resolves the operator against its overloads.
        let lhs_struct = self
            .unit
            .expr_type(lhs)
            .and_then(|ty| self.unit.type_as_struct(ty));

        if let Some(struct_decl) = lhs_struct {
            let method_name = self.unit.magic.for_binary_op(op);
            let Some(method) = self.find_struct_method(struct_decl, method_name) else {
                let ty = self.print_type_of(lhs);
                let method_str = self.name_str(method_name);
                self.err_operator_overload_not_found(ast, ty, binary_op_str(op), method_str);
                return Err(AnalysisError);
            };
            return self.build_operator_call(expr, method, lhs, Some(rhs), ast);
        }

        // Pseudo sides coerce to the concrete side.
        let lhs_pseudo = self.pseudo_kind(lhs).is_some();
        let rhs_pseudo = self.pseudo_kind(rhs).is_some();

        match (lhs_pseudo, rhs_pseudo) {
            (false, true) => {
                let lhs_ty = self.unit.expr_type(lhs).ok_or(AnalysisError)?;
                self.finalize_by_coercion(rhs, lhs_ty)?;
            }
            (true, false) => {
                let rhs_ty = self.unit.expr_type(rhs).ok_or(AnalysisError)?;
                self.finalize_by_coercion(lhs, rhs_ty)?;
            }
            (true, true) => {
                self.finalize(lhs)?;
                let lhs_ty = self.unit.expr_type(lhs).ok_or(AnalysisError)?;
                self.finalize_by_coercion(rhs, lhs_ty)?;
            }
            (false, false) => {
                let lhs_ty = self.unit.expr_type(lhs).ok_or(AnalysisError)?;
                let rhs_ty = self.unit.expr_type(rhs).ok_or(AnalysisError)?;
                if !self.unit.types_equal(lhs_ty, rhs_ty) {
                    let expected = self.print_expr(lhs_ty);
                    let actual = self.print_expr(rhs_ty);
                    self.err_type_mismatch(ast, expected, actual);
                    return Err(AnalysisError);
                }
            }
        }

        let ty = if op.is_comparison() {
            self.alloc_primitive(Primitive::Bool)
        } else {
            self.unit.expr_type(lhs).ok_or(AnalysisError)?
        };
        self.unit.exprs[expr].set_ty(ty);
        Ok(())
    }

    fn analyze_unary_expr(
        &mut self,
        expr: ExprId,
        op: UnaryOp,
        value: ExprId,
        ast: AstRef<'a>,
    ) -> Result {
        match op {
            UnaryOp::Ref => {
                self.analyze_expr(value, None)?;
                let base = self.unit.expr_type(value).ok_or(AnalysisError)?;
                let ty = self.unit.exprs.alloc(Expr::PointerType(PointerType {
                    ast: None,
                    base,
                }));
                self.unit.exprs[expr].set_ty(ty);
                Ok(())
            }
            UnaryOp::Not => {
                let bool_ty = self.alloc_primitive(Primitive::Bool);
                self.analyze_expr(value, Some(bool_ty))?;
                self.unit.exprs[expr].set_ty(bool_ty);
                Ok(())
            }
            UnaryOp::Neg | UnaryOp::BitNot => {
                self.analyze_expr_uncoerced(value)?;

                let value_struct = self
                    .unit
                    .expr_type(value)
                    .and_then(|ty| self.unit.type_as_struct(ty));

                if let Some(struct_decl) = value_struct {
                    let method_name = self.unit.magic.for_unary_op(op);
                    let Some(method) = self.find_struct_method(struct_decl, method_name) else {
                        let ty = self.print_type_of(value);
                        let method_str = self.name_str(method_name);
                        let op_str = if op == UnaryOp::Neg { "-" } else { "~" };
                        self.err_operator_overload_not_found(ast, ty, op_str, method_str);
                        return Err(AnalysisError);
                    };
                    return self.build_operator_call(expr, method, value, None, ast);
                }

                if op == UnaryOp::Neg {
                    if let Some(ty) = self.unit.expr_type(value) {
                        if self.unit.is_unsigned_type(ty) {
                            let ty_str = self.print_expr(ty);
                            self.error("cannot negate unsigned type '$'", ast, &[ty_str]);
                            return Err(AnalysisError);
                        }
                    }
                }

                let ty = self.unit.expr_type(value).ok_or(AnalysisError)?;
                self.unit.exprs[expr].set_ty(ty);
                Ok(())
            }
            UnaryOp::Deref => {
                // Syntactic derefs arrive as star expressions; this form
                // only exists after analysis.
                Ok(())
            }
        }
    }

    fn analyze_cast_expr(
        &mut self,
        expr: ExprId,
        target: Option<ExprId>,
        value: ExprId,
        ast: AstRef<'a>,
    ) -> Result {
        let target = target.ok_or(AnalysisError)?;
        self.analyze_expr(target, None)?;
        self.analyze_expr(value, None)?;

        let value_ty = self.unit.expr_type(value).ok_or(AnalysisError)?;

        if !self.is_cast_permitted(value_ty, target) {
            let from = self.print_expr(value_ty);
            let to = self.print_expr(target);
            self.err_cannot_cast(ast, from, to);
            return Err(AnalysisError);
        }

        let _ = expr;
        Ok(())
    }

    /// The closed table of permitted casts.
    fn is_cast_permitted(&self, from: ExprId, to: ExprId) -> bool {
        #[derive(PartialEq)]
        enum Kind {
            Int,
            Fp,
            Addr,
            Enum(DeclId),
            Other,
        }

        let classify = |unit: &crate::sir::Unit, ty: ExprId| {
            if unit.is_int_type(ty) {
                Kind::Int
            } else if unit.is_fp_type(ty) {
                Kind::Fp
            } else if unit.is_addr_like_type(ty) {
                Kind::Addr
            } else {
                match unit.type_as_decl(ty) {
                    Some(decl) if matches!(unit.decls[decl], Decl::EnumDef(_)) => Kind::Enum(decl),
                    _ => Kind::Other,
                }
            }
        };

        match (classify(self.unit, from), classify(self.unit, to)) {
            (Kind::Int, Kind::Int) => true,
            (Kind::Int, Kind::Fp) | (Kind::Fp, Kind::Int) => true,
            (Kind::Int, Kind::Addr) | (Kind::Addr, Kind::Int) => true,
            (Kind::Int, Kind::Enum(_)) | (Kind::Enum(_), Kind::Int) => true,
            (Kind::Fp, Kind::Fp) => true,
            (Kind::Addr, Kind::Addr) => true,
            (Kind::Enum(a), Kind::Enum(b)) => a == b,
            _ => false,
        }
    }

    // ---- literals ---------------------------------------------------------

    fn analyze_array_literal(&mut self, expr: ExprId, values: Vec<ExprId>) -> Result {
        // `[T]` where T is a type denotes the array type, not a literal.
        if values.len() == 1 {
            self.analyze_expr_uncoerced(values[0])?;
            if self.unit.is_type_expr(values[0]) {
                let ast = self.unit.expr_ast(expr);
                let spec =
                    self.specialize_std_struct(ast, &["std", "array"], "Array", &[values[0]])?;
                self.rewrite_to_struct_symbol(expr, spec);
                return Ok(());
            }
        } else {
            for &value in &values {
                self.analyze_expr_uncoerced(value)?;
            }
        }

        let ty = self
            .unit
            .exprs
            .alloc(Expr::PseudoType(PseudoTypeKind::ArrayLiteral));
        self.unit.exprs[expr].set_ty(ty);
        Ok(())
    }

    fn analyze_map_literal(&mut self, expr: ExprId, entries: Vec<(ExprId, ExprId)>) -> Result {
        if entries.len() == 1 {
            let (key, value) = entries[0];
            self.analyze_expr_uncoerced(key)?;
            self.analyze_expr_uncoerced(value)?;

            if self.unit.is_type_expr(key) && self.unit.is_type_expr(value) {
                let ast = self.unit.expr_ast(expr);
                let spec =
                    self.specialize_std_struct(ast, &["std", "map"], "Map", &[key, value])?;
                self.rewrite_to_struct_symbol(expr, spec);
                return Ok(());
            }
        } else {
            for &(key, value) in &entries {
                self.analyze_expr_uncoerced(key)?;
                self.analyze_expr_uncoerced(value)?;
            }
        }

        let ty = self
            .unit
            .exprs
            .alloc(Expr::PseudoType(PseudoTypeKind::MapLiteral));
        self.unit.exprs[expr].set_ty(ty);
        Ok(())
    }

    pub(crate) fn analyze_struct_literal_entries(&mut self, expr: ExprId) -> Result {
        let (ast, ty, entries) = match &self.unit.exprs[expr] {
            Expr::StructLiteral(literal) => {
                (literal.ast, literal.ty, literal.entries.clone())
            }
            _ => return Ok(()),
        };

        let ty = ty.ok_or(AnalysisError)?;
        let Some(struct_decl) = self.unit.type_as_struct(ty) else {
            let printed = self.print_expr(ty);
            self.err_cannot_coerce_literal(ast, "struct literal", printed);
            return Err(AnalysisError);
        };

        let (fields, overlapping) = match &self.unit.decls[struct_decl] {
            Decl::StructDef(def) => (def.fields.clone(), def.attrs.overlapping),
            _ => return Err(AnalysisError),
        };

        if overlapping && entries.len() != 1 {
            let strct = self.symbol_str(Symbol::Decl(struct_decl));
            self.err_struct_overlapping_not_one_field(ast, strct);
            return Err(AnalysisError);
        }

        let mut seen: Vec<(Name, AstRef<'a>)> = Vec::new();
        let mut result = Ok(());

        for (entry_index, entry) in entries.iter().enumerate() {
            if let Some(&(_, prev_ast)) = seen.iter().find(|(name, _)| *name == entry.ident.name) {
                let field = self.name_str(entry.ident.name);
                let strct = self.symbol_str(Symbol::Decl(struct_decl));
                self.err_duplicate_field(entry.ident.ast, field, strct, prev_ast);
                result = Err(AnalysisError);
                continue;
            }
            seen.push((entry.ident.name, entry.ident.ast));

            let Some(field) = self.unit.find_field(struct_decl, entry.ident.name) else {
                let strct = self.symbol_str(Symbol::Decl(struct_decl));
                let field = self.name_str(entry.ident.name);
                self.err_no_field(entry.ident.ast, "struct", strct, field);
                result = Err(AnalysisError);
                continue;
            };

            let field_ty = match &self.unit.decls[field] {
                Decl::StructField(f) => f.ty,
                _ => continue,
            };

            if let Expr::StructLiteral(literal) = &mut self.unit.exprs[expr] {
                literal.entries[entry_index].field = Some(field);
            }

            if self.analyze_expr(entry.value, Some(field_ty)).is_err() {
                result = Err(AnalysisError);
            }
        }

        if !overlapping {
            for field in fields {
                let field_name = match &self.unit.decls[field] {
                    Decl::StructField(f) => f.ident.name,
                    _ => continue,
                };
                if !seen.iter().any(|(name, _)| *name == field_name) {
                    let field_str = self.name_str(field_name);
                    let strct = self.symbol_str(Symbol::Decl(struct_decl));
                    self.err_missing_field(ast, field_str, strct);
                    result = Err(AnalysisError);
                }
            }
        }

        result
    }

    fn analyze_tuple_expr(&mut self, expr: ExprId, values: Vec<ExprId>) -> Result {
        let mut types = Vec::with_capacity(values.len());

        for &value in &values {
            self.analyze_expr(value, None)?;
            types.push(self.unit.expr_type(value).ok_or(AnalysisError)?);
        }

        let ty = self.unit.exprs.alloc(Expr::Tuple(crate::sir::TupleExpr {
            ast: None,
            ty: None,
            exprs: types,
        }));
        self.unit.exprs[expr].set_ty(ty);
        Ok(())
    }

    // ---- closures ---------------------------------------------------------

    fn analyze_closure_literal(
        &mut self,
        expr: ExprId,
        func_type: ExprId,
        block: crate::sir::BlockId,
        ast: AstRef<'a>,
    ) -> Result {
        let data_type = self.unit.exprs.alloc(Expr::Tuple(crate::sir::TupleExpr {
            ast: None,
            ty: None,
            exprs: Vec::new(),
        }));

        // The generated function takes the data pointer first.
        let addr_ty = self.alloc_primitive(Primitive::Addr);
        let generated_ty = Cloner::new(self.unit).clone_expr(func_type);
        if let Expr::FuncType(generated) = &mut self.unit.exprs[generated_ty] {
            generated.params.insert(
                0,
                Param {
                    ast: None,
                    name: Ident::new(Name::EMPTY),
                    ty: addr_ty,
                    attrs: ParamAttrs::default(),
                },
            );
        }

        let generated_func = self.unit.decls.alloc(Decl::FuncDef(crate::sir::FuncDef {
            ast: None,
            ident: Ident::new(Name::EMPTY),
            ty: generated_ty,
            block,
            attrs: Default::default(),
            generic_params: Vec::new(),
            specializations: Vec::new(),
            parent_specialization: None,
        }));
        self.unit
            .decl_parents
            .insert(generated_func, Symbol::Module(self.scope().module));

        // The generated function's body resolves against the enclosing
        // decl container, not the enclosing block; identifiers that live
        // in enclosing blocks go through capture instead.
        let parent_table = self.scope().symbol_table;
        let decl_table = self
            .unit
            .symbol_table_of(self.scope().decl)
            .unwrap_or(parent_table);
        let closure_table = self.unit.blocks[block].symbol_table;
        self.unit.tables[closure_table].parent = Some(decl_table);

        let ctx_index = self.closure_ctxs.len();
        self.closure_ctxs.push(ClosureContext {
            captured_vars: Vec::new(),
            data_type,
            parent_block: self.scope().block,
            parent_table,
        });

        let scope = self.push_scope();
        scope.closure_ctx = Some(ctx_index);
        self.analyze_func_interface(generated_ty);
        self.analyze_func_body(generated_func);
        self.resource_analyze_func(generated_func);
        self.pop_scope();

        let module_block = self.unit.modules[self.scope().module].block;
        self.unit.decl_blocks[module_block].decls.push(generated_func);

        // The data tuple's element types come from the captured symbols.
        let captured = std::mem::take(&mut self.closure_ctxs[ctx_index].captured_vars);
        let mut capture_types = Vec::with_capacity(captured.len());
        let mut capture_values = Vec::with_capacity(captured.len());

        for symbol in &captured {
            let ty = self.unit.symbol_type(*symbol).ok_or(AnalysisError)?;
            capture_types.push(ty);
            capture_values.push(self.unit.exprs.alloc(Expr::SymbolExpr(SymbolExpr {
                ast: None,
                ty: Some(ty),
                symbol: *symbol,
            })));
        }

        if let Expr::Tuple(tuple) = &mut self.unit.exprs[data_type] {
            tuple.exprs = capture_types;
        }

        let data = self.unit.exprs.alloc(Expr::Tuple(crate::sir::TupleExpr {
            ast: None,
            ty: Some(data_type),
            exprs: capture_values,
        }));

        // Wrap into the standard Closure struct through its constructor.
        let Some(closure_struct) = self.find_std_struct(&["std", "closure"], "Closure") else {
            let name = self.unit.interner.intern("Closure");
            self.err_symbol_not_found(name, ast);
            return Err(AnalysisError);
        };

        let new_name = self.unit.magic.new;
        let Some(new_generic) = self.find_struct_method(closure_struct, new_name) else {
            self.err_no_method(
                ast,
                self.symbol_str(Symbol::Decl(closure_struct)),
                "new".to_string(),
            );
            return Err(AnalysisError);
        };

        let new_def = self.specialize_func(new_generic, &[data_type])?;
        let new_ty = self.unit.symbol_type(Symbol::Decl(new_def)).ok_or(AnalysisError)?;

        let callee = self.unit.exprs.alloc(Expr::SymbolExpr(SymbolExpr {
            ast: None,
            ty: Some(new_ty),
            symbol: Symbol::Decl(new_def),
        }));

        let generated_symbol = self.unit.exprs.alloc(Expr::SymbolExpr(SymbolExpr {
            ast: None,
            ty: Some(generated_ty),
            symbol: Symbol::Decl(generated_func),
        }));

        let func_ptr = self.unit.exprs.alloc(Expr::Cast(CastExpr {
            ast: None,
            ty: Some(addr_ty),
            value: generated_symbol,
        }));

        let closure_ty = self.unit.exprs.alloc(Expr::ClosureType(ClosureType {
            ast: None,
            func_type,
            underlying_struct: closure_struct,
        }));

        let mut args: SmallVec<[ExprId; 4]> = SmallVec::new();
        args.push(func_ptr);
        args.push(data);

        self.unit.exprs[expr] = Expr::Call(CallExpr {
            ast,
            ty: Some(closure_ty),
            callee,
            args,
        });

        Ok(())
    }
}

fn binary_op_str(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::BitAnd => "&",
        BinaryOp::BitOr => "|",
        BinaryOp::BitXor => "^",
        BinaryOp::Shl => "<<",
        BinaryOp::Shr => ">>",
        BinaryOp::Eq => "==",
        BinaryOp::Ne => "!=",
        BinaryOp::Gt => ">",
        BinaryOp::Lt => "<",
        BinaryOp::Ge => ">=",
        BinaryOp::Le => "<=",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
    }
}
