//! Statement analysis: local registration, assignment checking, control
//! flow, and the desugaring of `while`/`for`/compound assignment into
//! canonical forms.

use crate::ast::AstRef;
use crate::sir::{
    AssignStmt, BinaryExpr, BinaryOp, BlockId, Decl, Expr, ExprId, Ident, IntLiteral, Local,
    LoopStmt, Primitive, Stmt, Symbol, UnaryOp,
};

use super::{AnalysisError, Result, SemanticAnalyzer};

impl<'u, 'a> SemanticAnalyzer<'u, 'a> {
    pub(crate) fn analyze_block(&mut self, block: BlockId) {
        let table = self.unit.blocks[block].symbol_table;
        let scope = self.push_scope();
        scope.block = Some(block);
        scope.symbol_table = table;

        let mut index = 0;
        while index < self.unit.blocks[block].stmts.len() {
            self.analyze_stmt_at(block, index);
            index += 1;
        }

        self.pop_scope();
    }

    pub(crate) fn analyze_stmt_at(&mut self, block: BlockId, index: usize) {
        let stmt = self.unit.blocks[block].stmts[index];

        match self.unit.stmts[stmt].clone() {
            Stmt::Var(var_stmt) => {
                let _ = self.analyze_var_stmt(stmt, block, var_stmt.name, var_stmt.ty, var_stmt.value);
            }
            Stmt::Assign(assign) => {
                let _ = self.analyze_assign_stmt(assign.lhs, assign.rhs, assign.ast);
            }
            Stmt::CompAssign(comp) => {
                // `a += b` is sugar for `a = a + b`.
                let rhs = self.unit.exprs.alloc(Expr::Binary(BinaryExpr {
                    ast: None,
                    ty: None,
                    op: comp.op,
                    lhs: comp.lhs,
                    rhs: comp.rhs,
                }));
                self.unit.stmts[stmt] = Stmt::Assign(AssignStmt {
                    ast: comp.ast,
                    lhs: comp.lhs,
                    rhs,
                });
                let _ = self.analyze_assign_stmt(comp.lhs, rhs, comp.ast);
            }
            Stmt::Return(ret) => {
                let _ = self.analyze_return_stmt(ret.value, ret.ast);
            }
            Stmt::If(if_stmt) => {
                let bool_ty = self.alloc_primitive(Primitive::Bool);
                for branch in &if_stmt.cond_branches {
                    let _ = self.analyze_expr(branch.condition, Some(bool_ty));
                    self.analyze_block(branch.block);
                }
                if let Some(else_branch) = &if_stmt.else_branch {
                    self.analyze_block(else_branch.block);
                }
            }
            Stmt::Switch(switch) => {
                let _ = self.analyze_expr(switch.value, None);
                for case in &switch.cases {
                    let _ = self.analyze_expr(case.ty, None);
                    let _ = self.register_local(case.block, case.ident, Some(case.ty));
                    self.analyze_block(case.block);
                }
            }
            Stmt::Try(try_stmt) => {
                self.analyze_try_stmt(&try_stmt);
            }
            Stmt::While(while_stmt) => {
                self.unit.stmts[stmt] = Stmt::Loop(LoopStmt {
                    ast: None,
                    condition: while_stmt.condition,
                    block: while_stmt.block,
                    latch: None,
                });
                self.analyze_loop(while_stmt.condition, while_stmt.block, None);
            }
            Stmt::For(for_stmt) => {
                self.desugar_for_stmt(stmt, &for_stmt);
            }
            Stmt::Loop(loop_stmt) => {
                self.analyze_loop(loop_stmt.condition, loop_stmt.block, loop_stmt.latch);
            }
            Stmt::Continue(continue_stmt) => {
                if !self.scope().in_loop {
                    self.err_continue_outside_loop(continue_stmt.ast);
                }
            }
            Stmt::Break(break_stmt) => {
                if !self.scope().in_loop {
                    self.err_break_outside_loop(break_stmt.ast);
                }
            }
            Stmt::MetaIf(_) => self.expand_meta_if_stmt(block, index),
            Stmt::MetaFor(_) => self.expand_meta_for_stmt(block, index),
            Stmt::ExpandedMeta => {}
            Stmt::Expr(expr) => {
                let _ = self.analyze_expr(expr, None);
            }
            Stmt::Block(inner) => {
                self.analyze_block(inner);
            }
            Stmt::Error => {}
        }
    }

    pub(crate) fn register_local(
        &mut self,
        block: BlockId,
        name: Ident<'a>,
        ty: Option<ExprId>,
    ) -> Result<u32> {
        let table = self.unit.blocks[block].symbol_table;

        if let Some(prev) = self.unit.lookup_local(table, name.name) {
            // Re-analysis re-registers the same local; only a genuinely
            // different binding is a redefinition.
            if let Symbol::Local {
                block: prev_block,
                index,
            } = prev
            {
                if prev_block == block
                    && self.unit.blocks[block].locals[index as usize].name.name == name.name
                {
                    return Ok(index);
                }
            }
            self.err_redefinition(name.name, name.ast, prev);
            return Err(AnalysisError);
        }

        let index = self.unit.blocks[block].locals.len() as u32;
        self.unit.blocks[block].locals.push(Local {
            ast: name.ast,
            name,
            ty,
            unmanaged: false,
        });

        let symbol = Symbol::Local { block, index };
        self.unit.tables[table].symbols.insert(name.name, symbol);
        self.symbol_uses.add(name.ast, symbol);
        Ok(index)
    }

    fn analyze_var_stmt(
        &mut self,
        stmt: crate::sir::StmtId,
        block: BlockId,
        name: Ident<'a>,
        ty: Option<ExprId>,
        value: Option<ExprId>,
    ) -> Result {
        let index = self.register_local(block, name, ty)?;

        if let Stmt::Var(var_stmt) = &mut self.unit.stmts[stmt] {
            var_stmt.local = Some((block, index));
        }

        let final_ty = match (ty, value) {
            (Some(ty), Some(value)) => {
                self.analyze_expr(ty, None)?;
                self.analyze_expr(value, Some(ty))?;
                Some(ty)
            }
            (Some(ty), None) => {
                self.analyze_expr(ty, None)?;
                Some(ty)
            }
            (None, Some(value)) => {
                self.analyze_expr(value, None)?;
                self.unit.expr_type(value)
            }
            (None, None) => None,
        };

        self.unit.blocks[block].locals[index as usize].ty = final_ty;
        if let Stmt::Var(var_stmt) = &mut self.unit.stmts[stmt] {
            var_stmt.ty = final_ty;
        }
        Ok(())
    }

    fn analyze_assign_stmt(&mut self, lhs: ExprId, rhs: ExprId, ast: AstRef<'a>) -> Result {
        self.analyze_expr(lhs, None)?;

        if !self.is_assignable(lhs) {
            self.err_cannot_assign(ast);
        }

        match self.unit.expr_type(lhs) {
            Some(lhs_ty) => self.analyze_expr(rhs, Some(lhs_ty)),
            None => self.analyze_expr(rhs, None),
        }
    }

    fn is_assignable(&self, expr: ExprId) -> bool {
        match &self.unit.exprs[expr] {
            Expr::SymbolExpr(symbol_expr) => matches!(
                self.unit.resolve_use_symbol(symbol_expr.symbol),
                Symbol::Local { .. }
                    | Symbol::Param { .. }
                    | Symbol::Decl(_)
            ),
            Expr::Field(field) => self.is_assignable(field.base),
            Expr::Index(_) => true,
            Expr::Unary(unary) => unary.op == UnaryOp::Deref,
            _ => false,
        }
    }

    fn analyze_return_stmt(&mut self, value: Option<ExprId>, ast: AstRef<'a>) -> Result {
        let return_ty = self.current_return_type();

        match value {
            Some(value) => {
                match return_ty {
                    Some(ty) => self.analyze_expr(value, Some(ty))?,
                    None => self.analyze_expr(value, None)?,
                }

                // A pointer to a local must not leave the function.
                if let Expr::Unary(unary) = &self.unit.exprs[value] {
                    if unary.op == UnaryOp::Ref {
                        if let Expr::SymbolExpr(symbol_expr) = &self.unit.exprs[unary.value] {
                            if matches!(symbol_expr.symbol, Symbol::Local { .. }) {
                                let value_ast = self.unit.expr_ast(unary.value);
                                self.err_pointer_to_local_escapes(ast, value_ast);
                                return Err(AnalysisError);
                            }
                        }
                    }
                }
                Ok(())
            }
            None => {
                if let Some(ty) = return_ty {
                    if !self.is_void_type(ty) {
                        let expected = self.print_expr(ty);
                        self.err_return_missing_value(ast, expected);
                        return Err(AnalysisError);
                    }
                }
                Ok(())
            }
        }
    }

    pub(crate) fn current_return_type(&self) -> Option<ExprId> {
        let func = self.scope().func?;
        match &self.unit.decls[func] {
            Decl::FuncDef(def) => self.unit.func_type(def.ty).map(|ft| ft.return_type),
            _ => None,
        }
    }

    pub(crate) fn is_void_type(&self, ty: ExprId) -> bool {
        self.unit.as_primitive(ty) == Some(Primitive::Void)
    }

    fn analyze_loop(&mut self, condition: ExprId, block: BlockId, latch: Option<BlockId>) {
        let bool_ty = self.alloc_primitive(Primitive::Bool);
        let _ = self.analyze_expr(condition, Some(bool_ty));

        let scope = self.push_scope();
        scope.in_loop = true;
        self.analyze_block(block);
        if let Some(latch) = latch {
            self.analyze_block(latch);
        }
        self.pop_scope();
    }

    /// `for x in a .. b { .. }` becomes a block holding `var x = a;` and a
    /// canonical loop with condition `x < b` and latch `x = x + 1`.
    fn desugar_for_stmt(&mut self, stmt: crate::sir::StmtId, for_stmt: &crate::sir::ForStmt<'a>) {
        let Expr::Range(range) = self.unit.exprs[for_stmt.range].clone() else {
            let _ = self.analyze_expr(for_stmt.range, None);
            let ast = self.unit.expr_ast(for_stmt.range);
            let ty = self.print_type_of(for_stmt.range);
            self.err_cannot_iter(ast, ty);
            return;
        };

        let parent_table = self.scope().symbol_table;
        let outer = self.unit.create_block(Some(parent_table));
        let outer_table = self.unit.blocks[outer].symbol_table;

        let var_stmt = self.unit.stmts.alloc(Stmt::Var(crate::sir::VarStmt {
            ast: None,
            name: for_stmt.ident,
            ty: None,
            value: Some(range.lhs),
            local: None,
        }));

        let cond_ident = self.unit.exprs.alloc(Expr::Ident(crate::sir::IdentExpr {
            ast: None,
            value: for_stmt.ident.name,
        }));
        let condition = self.unit.exprs.alloc(Expr::Binary(BinaryExpr {
            ast: None,
            ty: None,
            op: BinaryOp::Lt,
            lhs: cond_ident,
            rhs: range.rhs,
        }));

        let latch = self.unit.create_block(Some(outer_table));
        let latch_lhs = self.unit.exprs.alloc(Expr::Ident(crate::sir::IdentExpr {
            ast: None,
            value: for_stmt.ident.name,
        }));
        let latch_rhs_ident = self.unit.exprs.alloc(Expr::Ident(crate::sir::IdentExpr {
            ast: None,
            value: for_stmt.ident.name,
        }));
        let one = self.unit.exprs.alloc(Expr::IntLiteral(IntLiteral {
            ast: None,
            ty: None,
            value: 1,
        }));
        let latch_rhs = self.unit.exprs.alloc(Expr::Binary(BinaryExpr {
            ast: None,
            ty: None,
            op: BinaryOp::Add,
            lhs: latch_rhs_ident,
            rhs: one,
        }));
        let latch_assign = self.unit.stmts.alloc(Stmt::Assign(AssignStmt {
            ast: None,
            lhs: latch_lhs,
            rhs: latch_rhs,
        }));
        self.unit.blocks[latch].stmts.push(latch_assign);

        // The loop body keeps its own block, re-parented under the
        // synthesized outer block.
        let body = for_stmt.block;
        let body_table = self.unit.blocks[body].symbol_table;
        self.unit.tables[body_table].parent = Some(outer_table);

        let loop_stmt = self.unit.stmts.alloc(Stmt::Loop(LoopStmt {
            ast: None,
            condition,
            block: body,
            latch: Some(latch),
        }));

        self.unit.blocks[outer].stmts = vec![var_stmt, loop_stmt];
        self.unit.stmts[stmt] = Stmt::Block(outer);
        self.analyze_block(outer);
    }

    fn analyze_try_stmt(&mut self, try_stmt: &crate::sir::TryStmt<'a>) {
        if self.analyze_expr(try_stmt.success_branch.expr, None).is_err() {
            return;
        }

        let Some(expr_ty) = self.unit.expr_type(try_stmt.success_branch.expr) else {
            self.err_cannot_use_in_try(try_stmt.success_branch.expr);
            return;
        };

        let Some((wrapper, args)) = self.std_wrapper_args(expr_ty) else {
            self.err_cannot_use_in_try(try_stmt.success_branch.expr);
            return;
        };

        let (value_ty, error_ty) = match (wrapper.as_str(), args.as_slice()) {
            ("Optional", [value]) => (*value, None),
            ("Result", [value, error]) => (*value, Some(*error)),
            _ => {
                self.err_cannot_use_in_try(try_stmt.success_branch.expr);
                return;
            }
        };

        let _ = self.register_local(
            try_stmt.success_branch.block,
            try_stmt.success_branch.ident,
            Some(value_ty),
        );
        self.analyze_block(try_stmt.success_branch.block);

        if let Some(except) = &try_stmt.except_branch {
            match error_ty {
                Some(error_ty) => {
                    let _ = self.analyze_expr(except.ty, None);
                    let _ = self.register_local(except.block, except.ident, Some(error_ty));
                    self.analyze_block(except.block);
                }
                None => {
                    self.err_try_no_error_field(except.ident.ast);
                }
            }
        }

        if let Some(else_block) = try_stmt.else_branch {
            self.analyze_block(else_block);
        }
    }

    /// If the type is a specialization of a standard wrapper struct,
    /// return the generic's name and the specialization args.
    pub(crate) fn std_wrapper_args(&self, ty: ExprId) -> Option<(String, Vec<ExprId>)> {
        let decl = self.unit.type_as_struct(ty)?;
        let (generic_def, index) = match &self.unit.decls[decl] {
            Decl::StructDef(def) => def.parent_specialization?,
            _ => return None,
        };

        match &self.unit.decls[generic_def] {
            Decl::StructDef(generic) => {
                let name = self.unit.interner.resolve(generic.ident.name).to_string();
                let args = generic.specializations.get(index as usize)?.args.clone();
                Some((name, args))
            }
            _ => None,
        }
    }
}
