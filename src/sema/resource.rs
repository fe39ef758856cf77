//! Resource and move analysis. Runs after body analysis, rewriting uses
//! of resource values into Init/Move/Deinit markers and rejecting uses
//! after moves, moves out of pointers or deinit-carrying resources, and
//! moves inside loops.
//!
//! A resource mirrors part of a type: a struct, tuple, or closure
//! contributes one when it has `__deinit__` or a sub-field that does.
//! Each block scope tracks per-resource init and move states; branch
//! scopes merge into their parent as conditional moves.

use std::collections::HashMap;

use crate::sir::{
    BlockId, Decl, DeclBlockId, DeclId, DeinitExpr, Expr, ExprId, InitExpr, MoveExpr, Ownership,
    Resource, ResourceId, Stmt, Symbol, UnaryOp,
};

use super::{AnalysisError, Result, SemanticAnalyzer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InitState {
    Uninitialized,
    Initialized,
    CondInitialized,
}

#[derive(Debug, Clone, Copy)]
struct MoveState {
    moved: bool,
    conditional: bool,
    partial: bool,
    move_expr: Option<ExprId>,
}

impl MoveState {
    fn unmoved() -> Self {
        Self {
            moved: false,
            conditional: false,
            partial: false,
            move_expr: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    Generic,
    Loop,
}

struct RScope {
    kind: ScopeKind,
    block: BlockId,
    init_states: HashMap<ResourceId, InitState>,
    move_states: HashMap<ResourceId, MoveState>,
}

#[derive(Debug, Clone, Copy)]
struct Context {
    moving: bool,
    conditional: bool,
    field_expr_lhs: bool,
    in_resource_with_deinit: bool,
    in_pointer: bool,
    cur_resource: Option<ResourceId>,
}

impl Context {
    fn new(moving: bool, conditional: bool) -> Self {
        Self {
            moving,
            conditional,
            field_expr_lhs: false,
            in_resource_with_deinit: false,
            in_pointer: false,
            cur_resource: None,
        }
    }
}

impl<'u, 'a> SemanticAnalyzer<'u, 'a> {
    pub(crate) fn analyze_resources(&mut self) {
        self.for_each_module("resource", |analyzer, module| {
            let block = analyzer.unit.modules[module].block;
            analyzer.resource_in_decl_block(block);
        });
    }

    fn resource_in_decl_block(&mut self, decl_block: DeclBlockId) {
        let mut index = 0;

        while index < self.unit.decl_blocks[decl_block].decls.len() {
            let decl = self.unit.decl_blocks[decl_block].decls[index];
            self.resource_analyze_decl(decl);
            index += 1;
        }
    }

    pub(crate) fn resource_analyze_decl(&mut self, decl: DeclId) {
        match &self.unit.decls[decl] {
            Decl::FuncDef(def) => {
                if !def.is_generic() {
                    self.resource_analyze_func(decl);
                }
            }
            Decl::StructDef(def) => {
                if !def.is_generic() {
                    let block = def.block;
                    self.resource_in_decl_block(block);
                }
            }
            Decl::UnionDef(def) => {
                let block = def.block;
                self.resource_in_decl_block(block);
            }
            _ => {}
        }
    }

    pub(crate) fn resource_analyze_func(&mut self, func: DeclId) {
        let (func_ty, block) = match &self.unit.decls[func] {
            Decl::FuncDef(def) => (def.ty, def.block),
            _ => return,
        };

        let params: Vec<(Symbol, ExprId, bool)> = self
            .unit
            .func_type(func_ty)
            .map(|ft| {
                ft.params
                    .iter()
                    .enumerate()
                    .map(|(index, p)| {
                        (
                            Symbol::Param {
                                func,
                                index: index as u32,
                            },
                            p.ty,
                            p.attrs.unmanaged,
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut check = ResourceCheck {
            analyzer: self,
            scopes: Vec::new(),
            resources_by_symbols: HashMap::new(),
            resource_locations: HashMap::new(),
        };
        check.analyze_block(block, ScopeKind::Generic, &params);
    }

    /// Build a resource tree for a type, if the type needs tracking.
    pub(crate) fn create_resource(&mut self, ty: ExprId) -> Option<ResourceId> {
        if let Some(struct_decl) = self.unit.type_as_struct(ty) {
            return self.create_struct_resource(struct_decl, ty);
        }

        if matches!(self.unit.exprs[ty], Expr::Tuple(_)) {
            let element_tys = match &self.unit.exprs[ty] {
                Expr::Tuple(tuple) => tuple.exprs.clone(),
                _ => return None,
            };
            return self.create_aggregate_resource(ty, &element_tys, false);
        }

        None
    }

    fn create_struct_resource(&mut self, struct_decl: DeclId, ty: ExprId) -> Option<ResourceId> {
        let has_deinit = self.struct_has_deinit(struct_decl);

        let field_tys: Vec<ExprId> = match &self.unit.decls[struct_decl] {
            Decl::StructDef(def) => def
                .fields
                .iter()
                .filter_map(|&field| match &self.unit.decls[field] {
                    Decl::StructField(f) if !f.attrs.unmanaged => Some(f.ty),
                    _ => None,
                })
                .collect(),
            _ => return None,
        };

        self.create_aggregate_resource(ty, &field_tys, has_deinit)
    }

    fn create_aggregate_resource(
        &mut self,
        ty: ExprId,
        element_tys: &[ExprId],
        has_deinit: bool,
    ) -> Option<ResourceId> {
        let mut sub_resources = Vec::new();

        for (index, &element_ty) in element_tys.iter().enumerate() {
            if let Some(sub) = self.create_resource(element_ty) {
                self.unit.resources[sub].field_index = Some(index as u32);
                sub_resources.push(sub);
            }
        }

        if !has_deinit && sub_resources.is_empty() {
            return None;
        }

        Some(self.unit.resources.alloc(Resource {
            ty,
            has_deinit,
            ownership: Ownership::Owned,
            field_index: None,
            sub_resources,
        }))
    }

    pub(crate) fn struct_has_deinit(&self, struct_decl: DeclId) -> bool {
        let Decl::StructDef(def) = &self.unit.decls[struct_decl] else {
            return false;
        };
        let table = self.unit.decl_blocks[def.block].symbol_table;

        matches!(
            self.unit.lookup_local(table, self.unit.magic.deinit),
            Some(Symbol::Decl(decl)) if matches!(self.unit.decls[decl], Decl::FuncDef(_))
        )
    }

    /// Read-only probe used for move-out-of-pointer checks.
    pub(crate) fn is_resource_type(&self, ty: ExprId) -> bool {
        if let Some(struct_decl) = self.unit.type_as_struct(ty) {
            if self.struct_has_deinit(struct_decl) {
                return true;
            }
            let Decl::StructDef(def) = &self.unit.decls[struct_decl] else {
                return false;
            };
            return def.fields.iter().any(|&field| match &self.unit.decls[field] {
                Decl::StructField(f) => !f.attrs.unmanaged && self.is_resource_type(f.ty),
                _ => false,
            });
        }

        if let Expr::Tuple(tuple) = &self.unit.exprs[ty] {
            return tuple.exprs.iter().any(|&e| self.is_resource_type(e));
        }

        false
    }
}

struct ResourceCheck<'r, 'u, 'a> {
    analyzer: &'r mut SemanticAnalyzer<'u, 'a>,
    scopes: Vec<RScope>,
    resources_by_symbols: HashMap<Symbol, ResourceId>,
    /// Declaring block and parent resource of each tracked resource.
    resource_locations: HashMap<ResourceId, (Option<BlockId>, Option<ResourceId>)>,
}

impl<'r, 'u, 'a> ResourceCheck<'r, 'u, 'a> {
    fn analyze_block(
        &mut self,
        block: BlockId,
        kind: ScopeKind,
        params: &[(Symbol, ExprId, bool)],
    ) -> RScope {
        self.scopes.push(RScope {
            kind,
            block,
            init_states: HashMap::new(),
            move_states: HashMap::new(),
        });

        for &(symbol, ty, unmanaged) in params {
            if unmanaged {
                continue;
            }
            if let Some(resource) = self.analyzer.create_resource(ty) {
                self.analyzer.unit.blocks[block].resources.push((symbol, resource));
                self.insert_states(resource, InitState::Initialized, Some(block), None);
                self.resources_by_symbols.insert(symbol, resource);
            }
        }

        let local_count = self.analyzer.unit.blocks[block].locals.len();
        for index in 0..local_count {
            let local = &self.analyzer.unit.blocks[block].locals[index];
            if local.unmanaged {
                continue;
            }
            let Some(ty) = local.ty else { continue };

            if let Some(resource) = self.analyzer.create_resource(ty) {
                let symbol = Symbol::Local {
                    block,
                    index: index as u32,
                };
                self.analyzer.unit.blocks[block].resources.push((symbol, resource));
                self.insert_states(resource, InitState::Uninitialized, Some(block), None);
                self.resources_by_symbols.insert(symbol, resource);
            }
        }

        let stmts = self.analyzer.unit.blocks[block].stmts.clone();
        for stmt in stmts {
            self.analyze_stmt(stmt);
        }

        let scope = self.scopes.pop().expect("resource scope stack is empty");

        for (&resource, state) in &scope.move_states {
            if scope.init_states.get(&resource) == Some(&InitState::CondInitialized) {
                self.analyzer.unit.resources[resource].ownership = Ownership::InitCond;
                continue;
            }

            self.analyzer.unit.resources[resource].ownership = if state.moved {
                if state.conditional {
                    Ownership::MovedCond
                } else {
                    Ownership::Moved
                }
            } else {
                Ownership::Owned
            };
        }

        scope
    }

    fn insert_states(
        &mut self,
        resource: ResourceId,
        init_state: InitState,
        block: Option<BlockId>,
        super_resource: Option<ResourceId>,
    ) {
        self.resource_locations
            .insert(resource, (block, super_resource));

        let scope = self.scopes.last_mut().expect("no resource scope");
        scope.init_states.insert(resource, init_state);
        scope.move_states.insert(resource, MoveState::unmoved());

        let subs = self.analyzer.unit.resources[resource].sub_resources.clone();
        for sub in subs {
            self.insert_states(sub, init_state, block, Some(resource));
        }
    }

    fn analyze_stmt(&mut self, stmt: crate::sir::StmtId) {
        match self.analyzer.unit.stmts[stmt].clone() {
            Stmt::Var(var_stmt) => {
                let Some(value) = var_stmt.value else { return };
                let _ = self.analyze_expr_entry(value, true, false);

                // Already wrapped by a previous run.
                if matches!(self.analyzer.unit.exprs[value], Expr::Init(_)) {
                    return;
                }

                let Some((block, index)) = var_stmt.local else {
                    return;
                };
                let symbol = Symbol::Local { block, index };
                let Some(&resource) = self.resources_by_symbols.get(&symbol) else {
                    return;
                };

                let scope = self.scopes.last_mut().expect("no resource scope");
                if scope.init_states.get(&resource) == Some(&InitState::Uninitialized) {
                    self.update_init_state(resource, InitState::Initialized);
                }

                let inner = self.analyzer.unit.exprs[value].clone();
                let ast = inner.ast();
                let ty = inner.ty();
                let inner_id = self.analyzer.unit.exprs.alloc(inner);
                self.analyzer.unit.exprs[value] = Expr::Init(InitExpr {
                    ast,
                    ty,
                    value: inner_id,
                    resource,
                });
            }
            Stmt::Assign(assign) => {
                let _ = self.analyze_expr_entry(assign.lhs, false, false);
                let _ = self.analyze_expr_entry(assign.rhs, true, false);
            }
            Stmt::CompAssign(comp) => {
                let _ = self.analyze_expr_entry(comp.lhs, false, false);
                let _ = self.analyze_expr_entry(comp.rhs, true, false);
            }
            Stmt::Return(ret) => {
                if let Some(value) = ret.value {
                    let _ = self.analyze_expr_entry(value, true, false);
                }

                for index in (0..self.scopes.len()).rev() {
                    self.mark_uninit_as_cond_init(index);
                }
            }
            Stmt::If(if_stmt) => {
                let mut children = Vec::new();

                for (index, branch) in if_stmt.cond_branches.iter().enumerate() {
                    let _ = self.analyze_expr_entry(branch.condition, true, index != 0);
                    children.push(self.analyze_block(branch.block, ScopeKind::Generic, &[]));
                }
                if let Some(else_branch) = &if_stmt.else_branch {
                    children.push(self.analyze_block(else_branch.block, ScopeKind::Generic, &[]));
                }

                for child in children {
                    self.merge_move_states(child, true);
                }
            }
            Stmt::Try(try_stmt) => {
                let mut children = vec![self.analyze_block(
                    try_stmt.success_branch.block,
                    ScopeKind::Generic,
                    &[],
                )];

                let _ = self.analyze_expr_entry(try_stmt.success_branch.expr, false, false);

                if let Some(except) = &try_stmt.except_branch {
                    children.push(self.analyze_block(except.block, ScopeKind::Generic, &[]));
                }
                if let Some(else_block) = try_stmt.else_branch {
                    children.push(self.analyze_block(else_block, ScopeKind::Generic, &[]));
                }

                for child in children {
                    self.merge_move_states(child, true);
                }
            }
            Stmt::Loop(loop_stmt) => {
                let mut children = vec![self.analyze_block(loop_stmt.block, ScopeKind::Loop, &[])];

                let _ = self.analyze_expr_entry(loop_stmt.condition, false, false);

                if let Some(latch) = loop_stmt.latch {
                    children.push(self.analyze_block(latch, ScopeKind::Loop, &[]));
                }

                for child in children {
                    self.merge_move_states(child, true);
                }
            }
            Stmt::Continue(_) | Stmt::Break(_) => {
                for index in (0..self.scopes.len()).rev() {
                    self.mark_uninit_as_cond_init(index);
                    if self.scopes[index].kind == ScopeKind::Loop {
                        break;
                    }
                }
            }
            Stmt::Expr(expr) => {
                let _ = self.analyze_expr_entry(expr, true, false);
            }
            Stmt::Block(block) => {
                let child = self.analyze_block(block, ScopeKind::Generic, &[]);
                self.merge_move_states(child, false);
            }
            _ => {}
        }
    }

    fn analyze_expr_entry(&mut self, expr: ExprId, moving: bool, conditional: bool) -> Result {
        let mut ctx = Context::new(moving, conditional);
        self.analyze_expr(expr, &mut ctx)
    }

    fn analyze_expr(&mut self, expr: ExprId, ctx: &mut Context) -> Result {
        let result = match self.analyzer.unit.exprs[expr].clone() {
            Expr::ArrayLiteral(array) => {
                let mut result = Ok(());
                for value in array.values {
                    if self.analyze_expr_entry(value, true, ctx.conditional).is_err() {
                        result = Err(AnalysisError);
                    }
                }
                result
            }
            Expr::StructLiteral(literal) => {
                let mut result = Ok(());
                for entry in literal.entries {
                    if self
                        .analyze_expr_entry(entry.value, true, ctx.conditional)
                        .is_err()
                    {
                        result = Err(AnalysisError);
                    }
                }
                result
            }
            Expr::UnionCaseLiteral(literal) => {
                let mut result = Ok(());
                for arg in literal.args {
                    if self.analyze_expr_entry(arg, true, ctx.conditional).is_err() {
                        result = Err(AnalysisError);
                    }
                }
                result
            }
            Expr::Tuple(tuple) => {
                let mut result = Ok(());
                for value in tuple.exprs {
                    if self.analyze_expr_entry(value, true, ctx.conditional).is_err() {
                        result = Err(AnalysisError);
                    }
                }
                result
            }
            Expr::SymbolExpr(symbol_expr) => {
                match self.resources_by_symbols.get(&symbol_expr.symbol).copied() {
                    Some(resource) => self.analyze_resource_use(resource, expr, ctx),
                    None => Ok(()),
                }
            }
            Expr::Unary(unary) => match unary.op {
                UnaryOp::Deref => {
                    let result = if ctx.moving
                        && unary
                            .ty
                            .is_some_and(|ty| self.analyzer.is_resource_type(ty))
                    {
                        let ast = self.analyzer.unit.expr_ast(expr);
                        self.analyzer.err_move_out_pointer(ast);
                        Err(AnalysisError)
                    } else {
                        self.analyze_expr(unary.value, ctx)
                    };
                    ctx.in_pointer = true;
                    result
                }
                UnaryOp::Ref => self.analyze_expr_entry(unary.value, false, ctx.conditional),
                _ => self.analyze_expr(unary.value, ctx),
            },
            Expr::Call(call) => {
                let mut result = Ok(());
                for arg in call.args {
                    if self.analyze_expr_entry(arg, true, ctx.conditional).is_err() {
                        result = Err(AnalysisError);
                    }
                }
                result
            }
            Expr::Field(field) => self.analyze_field_expr(expr, &field, ctx),
            Expr::Deinit(deinit) => {
                if deinit.resource.is_none() {
                    let ty = deinit.ty;
                    match ty.and_then(|ty| self.analyzer.create_resource(ty)) {
                        Some(resource) => {
                            if let Expr::Deinit(deinit) = &mut self.analyzer.unit.exprs[expr] {
                                deinit.resource = Some(resource);
                            }
                        }
                        None => {
                            self.analyzer.unit.exprs[expr] =
                                self.analyzer.unit.exprs[deinit.value].clone();
                        }
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        };

        if let Some(resource) = ctx.cur_resource {
            if self.analyzer.unit.resources[resource].has_deinit {
                ctx.in_resource_with_deinit = true;
            }
        }

        // A call producing a resource that nobody moves leaves a
        // temporary that needs a deinit marker.
        if !ctx.moving && matches!(self.analyzer.unit.exprs[expr], Expr::Call(_)) {
            if let Some(ty) = self.analyzer.unit.expr_type(expr) {
                if let Some(resource) = self.analyzer.create_resource(ty) {
                    let inner = self.analyzer.unit.exprs[expr].clone();
                    let ast = inner.ast();
                    let inner_id = self.analyzer.unit.exprs.alloc(inner);
                    self.analyzer.unit.exprs[expr] = Expr::Deinit(DeinitExpr {
                        ast,
                        ty: Some(ty),
                        value: inner_id,
                        resource: Some(resource),
                    });

                    ctx.cur_resource = Some(resource);
                    self.insert_states(resource, InitState::Initialized, None, None);
                }
            }
        }

        result
    }

    fn analyze_field_expr(
        &mut self,
        expr: ExprId,
        field: &crate::sir::FieldExpr<'a>,
        ctx: &mut Context,
    ) -> Result {
        let mut lhs_ctx = Context {
            moving: false,
            conditional: ctx.conditional,
            field_expr_lhs: true,
            in_resource_with_deinit: false,
            in_pointer: false,
            cur_resource: ctx.cur_resource,
        };

        let lhs_result = self.analyze_expr(field.base, &mut lhs_ctx);

        ctx.in_resource_with_deinit = lhs_ctx.in_resource_with_deinit;
        ctx.in_pointer = lhs_ctx.in_pointer;
        ctx.cur_resource = lhs_ctx.cur_resource;

        lhs_result?;

        let Some(cur_resource) = ctx.cur_resource else {
            if ctx.moving
                && ctx.in_pointer
                && field.ty.is_some_and(|ty| self.analyzer.is_resource_type(ty))
            {
                let ast = self.analyzer.unit.expr_ast(expr);
                self.analyzer.err_move_out_pointer(ast);
                return Err(AnalysisError);
            }
            return Ok(());
        };

        let subs = self.analyzer.unit.resources[cur_resource].sub_resources.clone();
        for sub in subs {
            if self.analyzer.unit.resources[sub].field_index == Some(field.field_index) {
                if ctx.moving && ctx.in_resource_with_deinit {
                    let ast = self.analyzer.unit.expr_ast(expr);
                    self.analyzer.err_move_out_deinit(ast);
                    return Err(AnalysisError);
                }

                return self.analyze_resource_use(sub, expr, ctx);
            }
        }

        ctx.cur_resource = None;
        Ok(())
    }

    fn analyze_resource_use(
        &mut self,
        resource: ResourceId,
        expr: ExprId,
        ctx: &mut Context,
    ) -> Result {
        ctx.cur_resource = Some(resource);

        let Some(state) = self.find_move_state(resource) else {
            return Ok(());
        };

        if state.moved && !(state.partial && ctx.field_expr_lhs) {
            let use_ast = self.analyzer.unit.expr_ast(expr);
            let move_ast = state
                .move_expr
                .and_then(|e| self.analyzer.unit.expr_ast(e));
            self.analyzer
                .err_use_after_move(use_ast, move_ast, state.partial, state.conditional);
            return Err(AnalysisError);
        }

        if ctx.moving {
            self.check_for_move_in_loop(resource, expr)?;

            let scope = self.scopes.last_mut().expect("no resource scope");
            scope.move_states.insert(
                resource,
                MoveState {
                    moved: true,
                    conditional: ctx.conditional,
                    partial: false,
                    move_expr: Some(expr),
                },
            );

            self.move_sub_resources(resource, expr, ctx);
            self.partially_move_super_resources(resource, expr, ctx);

            let inner = self.analyzer.unit.exprs[expr].clone();
            let ast = inner.ast();
            let ty = inner.ty();
            let inner_id = self.analyzer.unit.exprs.alloc(inner);
            self.analyzer.unit.exprs[expr] = Expr::Move(MoveExpr {
                ast,
                ty,
                value: inner_id,
                resource,
            });
        }

        Ok(())
    }

    fn find_move_state(&self, resource: ResourceId) -> Option<MoveState> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.move_states.get(&resource).copied())
    }

    /// Moving a resource declared outside a loop, from inside the loop,
    /// would move it on every iteration.
    fn check_for_move_in_loop(&mut self, resource: ResourceId, expr: ExprId) -> Result {
        let Some(&(declaring_block, _)) = self.resource_locations.get(&resource) else {
            return Ok(());
        };
        let Some(declaring_block) = declaring_block else {
            return Ok(());
        };

        let mut crossed_loop = false;

        for scope in self.scopes.iter().rev() {
            if scope.kind == ScopeKind::Loop {
                crossed_loop = true;
                continue;
            }

            if scope.block == declaring_block {
                if crossed_loop {
                    let ast = self.analyzer.unit.expr_ast(expr);
                    self.analyzer.err_move_in_loop(ast);
                    return Err(AnalysisError);
                }
                break;
            }
        }

        Ok(())
    }

    fn move_sub_resources(&mut self, resource: ResourceId, move_expr: ExprId, ctx: &Context) {
        let subs = self.analyzer.unit.resources[resource].sub_resources.clone();

        for sub in subs {
            let scope = self.scopes.last_mut().expect("no resource scope");
            scope.move_states.insert(
                sub,
                MoveState {
                    moved: true,
                    conditional: ctx.conditional,
                    partial: true,
                    move_expr: Some(move_expr),
                },
            );

            self.move_sub_resources(sub, move_expr, ctx);
        }
    }

    fn partially_move_super_resources(
        &mut self,
        resource: ResourceId,
        move_expr: ExprId,
        ctx: &Context,
    ) {
        let mut current = resource;

        while let Some(&(_, Some(super_resource))) = self.resource_locations.get(&current) {
            let scope = self.scopes.last_mut().expect("no resource scope");
            scope.move_states.insert(
                super_resource,
                MoveState {
                    moved: true,
                    conditional: ctx.conditional,
                    partial: true,
                    move_expr: Some(move_expr),
                },
            );

            current = super_resource;
        }
    }

    fn update_init_state(&mut self, resource: ResourceId, state: InitState) {
        let scope_index = self.scopes.len() - 1;
        self.update_init_state_in(scope_index, resource, state);
    }

    fn update_init_state_in(&mut self, scope_index: usize, resource: ResourceId, state: InitState) {
        if let Some(entry) = self.scopes[scope_index].init_states.get_mut(&resource) {
            *entry = state;
        }

        let subs = self.analyzer.unit.resources[resource].sub_resources.clone();
        for sub in subs {
            self.update_init_state_in(scope_index, sub, state);
        }
    }

    /// Resources not yet initialized when a branch leaves the scope are
    /// only initialized on the paths that stay, so they become
    /// conditionally initialized.
    fn mark_uninit_as_cond_init(&mut self, scope_index: usize) {
        let uninit: Vec<ResourceId> = self.scopes[scope_index]
            .init_states
            .iter()
            .filter(|(_, &state)| state == InitState::Uninitialized)
            .map(|(&resource, _)| resource)
            .collect();

        for resource in uninit {
            self.update_init_state_in(scope_index, resource, InitState::CondInitialized);
        }
    }

    fn merge_move_states(&mut self, child: RScope, conditional: bool) {
        let parent = self.scopes.last_mut().expect("no resource scope");

        for (resource, mut state) in child.move_states {
            if !state.moved {
                continue;
            }

            let moved_conditionally = conditional || state.conditional;

            match parent.move_states.get_mut(&resource) {
                None => {
                    state.conditional = moved_conditionally;
                    parent.move_states.insert(resource, state);
                }
                Some(parent_state) => {
                    if parent_state.moved {
                        if !moved_conditionally && parent_state.conditional {
                            // Unconditional in the child upgrades a
                            // conditional parent move.
                            parent_state.conditional = false;
                            parent_state.move_expr = state.move_expr;
                        }
                    } else {
                        parent_state.moved = true;
                        parent_state.conditional = moved_conditionally;
                        parent_state.partial = state.partial;
                        parent_state.move_expr = state.move_expr;
                    }
                }
            }
        }
    }
}
