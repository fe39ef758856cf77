//! Expansion of `meta if` and `meta for` at analysis time. Decl-level
//! expansion inlines the taken branch into the enclosing decl block and
//! re-runs collection and interface analysis over the inlined decls;
//! stmt-level expansion splices statements into the enclosing block and
//! analyzes them immediately.
//!
//! While the inlined nodes of a branch are processed, the scope's meta
//! condition carries the branch's truth table (condition atom plus the
//! negations of the branches before it). Guarded-symbol resolution checks
//! usage conditions against declaration conditions with these tables.

use tracing::trace;

use crate::ast::AstRef;
use crate::sir::cloner::Cloner;
use crate::sir::{
    BlockId, Decl, DeclBlockId, DeclId, Expr, ExprId, FieldExpr, GuardedSymbol, GuardedVariant,
    MetaBlock, MetaCond, MetaIfStmt, MetaNode, Stmt, Symbol,
};

use super::{AnalysisError, Result, SemanticAnalyzer};

impl<'u, 'a> SemanticAnalyzer<'u, 'a> {
    pub(crate) fn expand_meta_decls(&mut self) {
        self.for_each_module("meta-expansion", |analyzer, module| {
            let block = analyzer.unit.modules[module].block;
            analyzer.run_meta_expansion_on_decl_block(block);
        });
    }

    /// Expand every pending decl-level `meta if` in a block. Re-entrant:
    /// identifier resolution calls this while a block is mid-expansion,
    /// and `blocked_decls` keeps a decl from expanding into itself.
    pub(crate) fn run_meta_expansion_on_decl_block(&mut self, decl_block: DeclBlockId) {
        let prev_in_meta_expansion = self.in_meta_expansion;
        self.in_meta_expansion = true;

        let mut index = 0;
        while index < self.unit.decl_blocks[decl_block].decls.len() {
            let decl = self.unit.decl_blocks[decl_block].decls[index];

            if self.blocked_decls.contains(&decl) {
                index += 1;
                continue;
            }

            if matches!(self.unit.decls[decl], Decl::MetaIf(_)) {
                self.blocked_decls.insert(decl);
                self.expand_meta_if_decl(decl_block, decl);
                self.blocked_decls.remove(&decl);
            }

            index += 1;
        }

        self.in_meta_expansion = prev_in_meta_expansion;
    }

    /// On-demand expansion triggered by a lookup that hit a guarded scope.
    pub(crate) fn expand_guarded_scope(
        &mut self,
        decl_block: DeclBlockId,
        decl: DeclId,
    ) -> Result {
        if self.blocked_decls.contains(&decl) {
            return Ok(());
        }
        if !matches!(self.unit.decls[decl], Decl::MetaIf(_)) {
            return Ok(());
        }

        trace!("expanding guarded scope on demand");
        self.blocked_decls.insert(decl);
        self.expand_meta_if_decl(decl_block, decl);
        self.blocked_decls.remove(&decl);
        Ok(())
    }

    fn expand_meta_if_decl(&mut self, decl_block: DeclBlockId, decl: DeclId) {
        let Decl::MetaIf(meta_if) = self.unit.decls[decl].clone() else {
            return;
        };

        let mut branch_cond = MetaCond::always();

        for branch in &meta_if.cond_branches {
            let _ = self.analyze_expr_uncoerced(branch.condition);
            let taken = self.const_eval_bool(branch.condition);
            let atom = MetaCond::atom(branch.condition);

            if taken {
                let cond = branch_cond.merge_and(&atom);
                self.expand_decl_branch(decl_block, decl, &branch.block, cond);
                return;
            }

            branch_cond = branch_cond.merge_and(&atom.negate());
        }

        if let Some(else_block) = &meta_if.else_branch {
            self.expand_decl_branch(decl_block, decl, else_block, branch_cond);
        } else {
            // No branch taken; leave the marker so the statement cannot
            // expand twice.
            self.unit.decls[decl] = Decl::ExpandedMeta;
        }
    }

    fn expand_decl_branch(
        &mut self,
        decl_block: DeclBlockId,
        decl: DeclId,
        block: &MetaBlock<'a>,
        cond: MetaCond,
    ) {
        self.blocked_decls.clear();
        self.blocked_decls.insert(decl);

        self.unit.decls[decl] = Decl::ExpandedMeta;

        for node in &block.nodes {
            if let MetaNode::Decl(inlined) = node {
                self.unit.decl_blocks[decl_block].decls.push(*inlined);
            }
        }

        let scope = self.push_scope();
        scope.meta_cond = cond;

        self.collect_in_meta_block(&block.nodes, decl_block);
        self.resolve_uses_in_decl_block(decl_block);

        for node in &block.nodes {
            if let MetaNode::Decl(inlined) = node {
                self.analyze_decl_interface(*inlined);
            }
        }

        self.pop_scope();
    }

    // ---- statement level --------------------------------------------------

    /// Expand a stmt-level `meta if` in place. `index` points at the meta
    /// statement; inlined statements are analyzed as they are spliced in,
    /// and the caller continues after them.
    pub(crate) fn expand_meta_if_stmt(&mut self, block: BlockId, index: usize) {
        let Stmt::MetaIf(meta_if) = self.unit.stmts[self.unit.blocks[block].stmts[index]].clone()
        else {
            return;
        };

        let mut branch_cond = MetaCond::always();

        for branch in &meta_if.cond_branches {
            let _ = self.analyze_expr_uncoerced(branch.condition);
            let taken = self.const_eval_bool(branch.condition);
            let atom = MetaCond::atom(branch.condition);

            if taken {
                let cond = branch_cond.merge_and(&atom);
                self.expand_stmt_branch(block, index, &branch.block, cond);
                return;
            }

            branch_cond = branch_cond.merge_and(&atom.negate());
        }

        if let Some(else_block) = meta_if.else_branch {
            self.expand_stmt_branch(block, index, &else_block, branch_cond);
        } else {
            let stmt = self.unit.blocks[block].stmts[index];
            self.unit.stmts[stmt] = Stmt::ExpandedMeta;
        }
    }

    fn expand_stmt_branch(
        &mut self,
        block: BlockId,
        index: usize,
        meta_block: &MetaBlock<'a>,
        cond: MetaCond,
    ) {
        let marker = self.unit.blocks[block].stmts[index];
        self.unit.stmts[marker] = Stmt::ExpandedMeta;

        let scope = self.push_scope();
        scope.meta_cond = cond;

        let mut insert_at = index;
        for node in &meta_block.nodes {
            if let MetaNode::Stmt(stmt) = node {
                insert_at += 1;
                self.unit.blocks[block].stmts.insert(insert_at, *stmt);
                self.analyze_stmt_at(block, insert_at);
            }
        }

        self.pop_scope();
    }

    /// Expand a stmt-level `meta for`: evaluate the range to a sequence of
    /// compile-time values, then clone the body once per value with the
    /// loop variable bound as a generic arg.
    pub(crate) fn expand_meta_for_stmt(&mut self, block: BlockId, index: usize) {
        let Stmt::MetaFor(meta_for) = self.unit.stmts[self.unit.blocks[block].stmts[index]].clone()
        else {
            return;
        };

        let Some(values) = self.eval_meta_for_range(meta_for.range) else {
            return;
        };

        let marker = self.unit.blocks[block].stmts[index];
        self.unit.stmts[marker] = Stmt::ExpandedMeta;

        let parent_table = self.unit.blocks[block].symbol_table;
        let mut insert_at = index;

        for value in values {
            let scope = self.push_scope();
            scope.generic_args.insert(meta_for.ident.name, value);

            for node in &meta_for.block.nodes {
                if let MetaNode::Stmt(stmt) = node {
                    let clone = Cloner::new(self.unit).clone_stmt(*stmt, parent_table);
                    insert_at += 1;
                    self.unit.blocks[block].stmts.insert(insert_at, clone);
                    self.analyze_stmt_at(block, insert_at);
                }
            }

            self.pop_scope();
        }
    }

    fn eval_meta_for_range(&mut self, range: ExprId) -> Option<Vec<ExprId>> {
        // A literal int range unrolls without const evaluation.
        if let Expr::Range(range_expr) = self.unit.exprs[range].clone() {
            let _ = self.analyze_expr_uncoerced(range_expr.lhs);
            let _ = self.analyze_expr_uncoerced(range_expr.rhs);
            let lhs = self.const_eval_int(range_expr.lhs)?;
            let rhs = self.const_eval_int(range_expr.rhs)?;

            let values = (lhs..rhs)
                .map(|value| {
                    self.unit.exprs.alloc(Expr::IntLiteral(crate::sir::IntLiteral {
                        ast: None,
                        ty: None,
                        value,
                    }))
                })
                .collect();
            return Some(values);
        }

        if self.analyze_expr_uncoerced(range).is_err() {
            return None;
        }

        let evaluated = self.const_eval(range).ok()?;

        match self.unit.exprs[evaluated].clone() {
            Expr::ArrayLiteral(array) => Some(array.values),
            Expr::Tuple(tuple) => Some(tuple.exprs),
            Expr::SymbolExpr(symbol_expr) => {
                // A tuple-typed symbol iterates over its fields.
                let ty = symbol_expr.ty?;
                if let Expr::Tuple(tuple_ty) = self.unit.exprs[ty].clone() {
                    let values = tuple_ty
                        .exprs
                        .iter()
                        .enumerate()
                        .map(|(i, &field_ty)| {
                            self.unit.exprs.alloc(Expr::Field(FieldExpr {
                                ast: None,
                                ty: Some(field_ty),
                                base: evaluated,
                                field_index: i as u32,
                            }))
                        })
                        .collect();
                    Some(values)
                } else {
                    self.err_compile_time_unknown(range);
                    None
                }
            }
            _ => {
                self.err_meta_for_cannot_iter(range);
                None
            }
        }
    }

    // ---- guarded symbols --------------------------------------------------

    /// Resolve a guarded name from a context with a non-trivial meta
    /// condition: build the guarded symbol's variant table and select the
    /// variant whose condition the usage condition implies.
    pub(crate) fn resolve_guarded_symbol(
        &mut self,
        meta_decl: DeclId,
        name: crate::intern::Name,
        use_ast: AstRef<'a>,
    ) -> std::result::Result<Symbol, AnalysisError> {
        let Decl::MetaIf(meta_if) = self.unit.decls[meta_decl].clone() else {
            self.err_guarded_by_different_condition(name, use_ast);
            return Err(AnalysisError);
        };

        let guarded = self.build_guarded_symbol(&meta_if, name);
        let current = self.scope().meta_cond.clone();

        match self.unit.guarded_symbols[guarded].select(&current) {
            Some(variant) => Ok(variant.symbol),
            None => {
                self.err_guarded_by_different_condition(name, use_ast);
                Err(AnalysisError)
            }
        }
    }

    fn build_guarded_symbol(
        &mut self,
        meta_if: &MetaIfStmt<'a>,
        name: crate::intern::Name,
    ) -> crate::sir::GuardedId {
        let mut variants = Vec::new();
        let mut branch_cond = MetaCond::always();

        for branch in &meta_if.cond_branches {
            let atom = MetaCond::atom(branch.condition);
            let cond = branch_cond.merge_and(&atom);

            if let Some(decl) = find_decl_in_meta_block(self, &branch.block, name) {
                variants.push(GuardedVariant {
                    condition: cond,
                    symbol: Symbol::Decl(decl),
                });
            }

            branch_cond = branch_cond.merge_and(&atom.negate());
        }

        if let Some(else_block) = &meta_if.else_branch {
            if let Some(decl) = find_decl_in_meta_block(self, else_block, name) {
                variants.push(GuardedVariant {
                    condition: branch_cond,
                    symbol: Symbol::Decl(decl),
                });
            }
        }

        self.unit
            .guarded_symbols
            .alloc(GuardedSymbol { name, variants })
    }
}

fn find_decl_in_meta_block(
    analyzer: &SemanticAnalyzer<'_, '_>,
    block: &MetaBlock<'_>,
    name: crate::intern::Name,
) -> Option<DeclId> {
    block.nodes.iter().find_map(|node| match node {
        MetaNode::Decl(decl) => {
            let ident = analyzer.unit.decls[*decl].ident()?;
            (ident.name == name).then_some(*decl)
        }
        MetaNode::Stmt(_) => None,
    })
}
