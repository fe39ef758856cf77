//! Test harness: builds unresolved SIR units programmatically (parsing
//! lives outside this crate) and runs the analyzer over them.

#![allow(dead_code)]

use smallvec::SmallVec;

use tarn::config::Config;
use tarn::loader::NoLoader;
use tarn::sema::{self, Analysis};
use tarn::sir::{
    AssignStmt, BinaryExpr, BinaryOp, BlockId, BoolLiteral, CallExpr, ClosureLiteral,
    ClosureType, ConstDef, Decl, DeclBlockId, DeclId, DotExpr, Expr, ExprId, FpLiteral, FuncDef,
    FuncType, GenericParam, Ident, IdentExpr, IfCondBranch, IfStmt, IntLiteral, LoopStmt,
    MetaAccess, MetaBlock, MetaFieldExpr, MetaIfCondBranch, MetaIfStmt, MetaNode, ModuleId, Param,
    ParamAttrs, Primitive, PrimitiveType, RangeExpr, ReturnStmt, StarExpr, Stmt, StmtId,
    StringLiteral, StructDef, StructLiteral, StructLiteralEntry, TableId, Unit, VarDecl, VarStmt,
    WhileStmt,
};
use tarn::source::ModulePath;

pub struct TestUnit {
    pub unit: Unit<'static>,
}

/// A module under construction: its id, root decl block, and root table.
#[derive(Clone, Copy)]
pub struct ModuleCtx {
    pub module: ModuleId,
    pub block: DeclBlockId,
    pub table: TableId,
}

/// A struct definition under construction.
#[derive(Clone, Copy)]
pub struct StructCtx {
    pub decl: DeclId,
    pub block: DeclBlockId,
    pub table: TableId,
}

impl TestUnit {
    pub fn new() -> Self {
        Self { unit: Unit::new() }
    }

    pub fn analyze(&mut self) -> Analysis {
        let config = Config::default();
        let mut loader = NoLoader;
        sema::analyze(&mut self.unit, &config, &mut loader)
    }

    pub fn name(&mut self, s: &str) -> tarn::intern::Name {
        self.unit.interner.intern(s)
    }

    pub fn ident(&mut self, s: &str) -> Ident<'static> {
        Ident::new(self.name(s))
    }

    pub fn module(&mut self, path: &[&str]) -> ModuleCtx {
        let path = ModulePath::from_strs(&mut self.unit.interner, path);
        let module = self.unit.create_module(path, None, None);
        let block = self.unit.modules[module].block;
        let table = self.unit.decl_blocks[block].symbol_table;
        ModuleCtx {
            module,
            block,
            table,
        }
    }

    // ---- expressions ------------------------------------------------------

    pub fn prim(&mut self, p: Primitive) -> ExprId {
        self.unit.exprs.alloc(Expr::PrimitiveType(PrimitiveType {
            ast: None,
            primitive: p,
        }))
    }

    pub fn ident_expr(&mut self, name: &str) -> ExprId {
        let value = self.name(name);
        self.unit
            .exprs
            .alloc(Expr::Ident(IdentExpr { ast: None, value }))
    }

    pub fn int(&mut self, value: i64) -> ExprId {
        self.unit.exprs.alloc(Expr::IntLiteral(IntLiteral {
            ast: None,
            ty: None,
            value,
        }))
    }

    pub fn float(&mut self, value: f64) -> ExprId {
        self.unit.exprs.alloc(Expr::FpLiteral(FpLiteral {
            ast: None,
            ty: None,
            value,
        }))
    }

    pub fn boolean(&mut self, value: bool) -> ExprId {
        self.unit.exprs.alloc(Expr::BoolLiteral(BoolLiteral {
            ast: None,
            ty: None,
            value,
        }))
    }

    pub fn string(&mut self, value: &str) -> ExprId {
        self.unit.exprs.alloc(Expr::StringLiteral(StringLiteral {
            ast: None,
            ty: None,
            value: value.to_string(),
        }))
    }

    pub fn star(&mut self, value: ExprId) -> ExprId {
        self.unit
            .exprs
            .alloc(Expr::Star(StarExpr { ast: None, value }))
    }

    pub fn dot(&mut self, lhs: ExprId, name: &str) -> ExprId {
        let rhs = self.ident(name);
        self.unit
            .exprs
            .alloc(Expr::Dot(DotExpr { ast: None, lhs, rhs }))
    }

    pub fn call(&mut self, callee: ExprId, args: &[ExprId]) -> ExprId {
        self.unit.exprs.alloc(Expr::Call(CallExpr {
            ast: None,
            ty: None,
            callee,
            args: SmallVec::from_slice(args),
        }))
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.unit.exprs.alloc(Expr::Binary(BinaryExpr {
            ast: None,
            ty: None,
            op,
            lhs,
            rhs,
        }))
    }

    pub fn range(&mut self, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.unit
            .exprs
            .alloc(Expr::Range(RangeExpr { ast: None, lhs, rhs }))
    }

    pub fn struct_literal(&mut self, ty: ExprId, entries: &[(&str, ExprId)]) -> ExprId {
        let entries = entries
            .iter()
            .map(|(name, value)| StructLiteralEntry {
                ident: Ident::new(self.unit.interner.intern(name)),
                value: *value,
                field: None,
            })
            .collect();

        self.unit.exprs.alloc(Expr::StructLiteral(StructLiteral {
            ast: None,
            ty: Some(ty),
            entries,
        }))
    }

    pub fn meta_field(&mut self, base: ExprId, field: &str) -> ExprId {
        let access = self
            .unit
            .exprs
            .alloc(Expr::MetaAccess(MetaAccess {
                ast: None,
                expr: base,
            }));
        let field = self.ident(field);
        self.unit.exprs.alloc(Expr::MetaField(MetaFieldExpr {
            ast: None,
            base: access,
            field,
        }))
    }

    pub fn func_type(&mut self, params: &[(&str, ExprId)], return_type: ExprId) -> ExprId {
        let params = params
            .iter()
            .map(|(name, ty)| Param {
                ast: None,
                name: Ident::new(self.unit.interner.intern(name)),
                ty: *ty,
                attrs: ParamAttrs::default(),
            })
            .collect();

        self.unit.exprs.alloc(Expr::FuncType(FuncType {
            ast: None,
            params,
            return_type,
        }))
    }

    pub fn closure_type(&mut self, func_type: ExprId, closure_struct: DeclId) -> ExprId {
        self.unit.exprs.alloc(Expr::ClosureType(ClosureType {
            ast: None,
            func_type,
            underlying_struct: closure_struct,
        }))
    }

    pub fn closure_literal(&mut self, func_type: ExprId, block: BlockId) -> ExprId {
        self.unit.exprs.alloc(Expr::ClosureLiteral(ClosureLiteral {
            ast: None,
            ty: None,
            func_type,
            block,
        }))
    }

    // ---- statements -------------------------------------------------------

    pub fn var(&mut self, name: &str, ty: Option<ExprId>, value: Option<ExprId>) -> StmtId {
        let name = self.ident(name);
        self.unit.stmts.alloc(Stmt::Var(VarStmt {
            ast: None,
            name,
            ty,
            value,
            local: None,
        }))
    }

    pub fn assign(&mut self, lhs: ExprId, rhs: ExprId) -> StmtId {
        self.unit
            .stmts
            .alloc(Stmt::Assign(AssignStmt { ast: None, lhs, rhs }))
    }

    pub fn ret(&mut self, value: Option<ExprId>) -> StmtId {
        self.unit
            .stmts
            .alloc(Stmt::Return(ReturnStmt { ast: None, value }))
    }

    pub fn expr_stmt(&mut self, expr: ExprId) -> StmtId {
        self.unit.stmts.alloc(Stmt::Expr(expr))
    }

    pub fn block(&mut self, parent: TableId, stmts: &[StmtId]) -> BlockId {
        let block = self.unit.create_block(Some(parent));
        self.unit.blocks[block].stmts = stmts.to_vec();
        block
    }

    /// Empty body block to build nested statements against; pair with
    /// `func_with_body`.
    pub fn body(&mut self, parent: TableId) -> (BlockId, TableId) {
        let block = self.unit.create_block(Some(parent));
        let table = self.unit.blocks[block].symbol_table;
        (block, table)
    }

    pub fn func_with_body(
        &mut self,
        m: &ModuleCtx,
        name: &str,
        params: &[(&str, ExprId)],
        return_type: ExprId,
        body: BlockId,
        stmts: &[StmtId],
    ) -> DeclId {
        self.unit.blocks[body].stmts = stmts.to_vec();
        let ty = self.func_type(params, return_type);
        let ident = self.ident(name);

        let decl = self.unit.decls.alloc(Decl::FuncDef(FuncDef {
            ast: None,
            ident,
            ty,
            block: body,
            attrs: Default::default(),
            generic_params: Vec::new(),
            specializations: Vec::new(),
            parent_specialization: None,
        }));
        self.push_decl(m.block, decl)
    }

    pub fn if_stmt(&mut self, condition: ExprId, then_block: BlockId) -> StmtId {
        self.unit.stmts.alloc(Stmt::If(IfStmt {
            ast: None,
            cond_branches: vec![IfCondBranch {
                ast: None,
                condition,
                block: then_block,
            }],
            else_branch: None,
        }))
    }

    pub fn while_stmt(&mut self, condition: ExprId, block: BlockId) -> StmtId {
        self.unit.stmts.alloc(Stmt::While(WhileStmt {
            ast: None,
            condition,
            block,
        }))
    }

    pub fn loop_stmt(&mut self, condition: ExprId, block: BlockId) -> StmtId {
        self.unit.stmts.alloc(Stmt::Loop(LoopStmt {
            ast: None,
            condition,
            block,
            latch: None,
        }))
    }

    pub fn meta_if_decl(
        &mut self,
        m: &ModuleCtx,
        branches: Vec<(ExprId, Vec<DeclId>)>,
        else_decls: Option<Vec<DeclId>>,
    ) -> DeclId {
        let cond_branches = branches
            .into_iter()
            .map(|(condition, decls)| MetaIfCondBranch {
                condition,
                block: MetaBlock {
                    ast: None,
                    nodes: decls.into_iter().map(MetaNode::Decl).collect(),
                },
            })
            .collect();

        let else_branch = else_decls.map(|decls| MetaBlock {
            ast: None,
            nodes: decls.into_iter().map(MetaNode::Decl).collect(),
        });

        let decl = self.unit.decls.alloc(Decl::MetaIf(MetaIfStmt {
            ast: None,
            cond_branches,
            else_branch,
        }));
        self.unit.decl_blocks[m.block].decls.push(decl);
        decl
    }

    // ---- declarations -----------------------------------------------------

    /// A function definition whose body block is parented to the module
    /// table. The decl is NOT pushed into a block; pair with `push_decl`.
    pub fn func_decl(
        &mut self,
        parent_table: TableId,
        name: &str,
        params: &[(&str, ExprId)],
        return_type: ExprId,
        stmts: &[StmtId],
    ) -> DeclId {
        let ty = self.func_type(params, return_type);
        let block = self.block(parent_table, stmts);
        let ident = self.ident(name);

        self.unit.decls.alloc(Decl::FuncDef(FuncDef {
            ast: None,
            ident,
            ty,
            block,
            attrs: Default::default(),
            generic_params: Vec::new(),
            specializations: Vec::new(),
            parent_specialization: None,
        }))
    }

    pub fn push_decl(&mut self, block: DeclBlockId, decl: DeclId) -> DeclId {
        self.unit.decl_blocks[block].decls.push(decl);
        decl
    }

    pub fn add_func(
        &mut self,
        m: &ModuleCtx,
        name: &str,
        params: &[(&str, ExprId)],
        return_type: ExprId,
        stmts: &[StmtId],
    ) -> DeclId {
        let decl = self.func_decl(m.table, name, params, return_type, stmts);
        self.push_decl(m.block, decl)
    }

    pub fn add_generic_func(
        &mut self,
        m: &ModuleCtx,
        name: &str,
        generic_params: &[&str],
        params: &[(&str, ExprId)],
        return_type: ExprId,
        stmts: &[StmtId],
    ) -> DeclId {
        let decl = self.func_decl(m.table, name, params, return_type, stmts);
        let generic_params = generic_params
            .iter()
            .map(|p| GenericParam {
                ast: None,
                ident: Ident::new(self.unit.interner.intern(p)),
            })
            .collect();
        if let Decl::FuncDef(def) = &mut self.unit.decls[decl] {
            def.generic_params = generic_params;
        }
        self.push_decl(m.block, decl)
    }

    pub fn add_const(&mut self, m: &ModuleCtx, name: &str, ty: ExprId, value: ExprId) -> DeclId {
        let ident = self.ident(name);
        let decl = self.unit.decls.alloc(Decl::ConstDef(ConstDef {
            ast: None,
            ident,
            ty,
            value,
        }));
        self.push_decl(m.block, decl)
    }

    pub fn add_struct(&mut self, m: &ModuleCtx, name: &str, generic_params: &[&str]) -> StructCtx {
        let block = self.unit.create_decl_block(Some(m.table));
        let table = self.unit.decl_blocks[block].symbol_table;
        let ident = self.ident(name);

        let generic_params = generic_params
            .iter()
            .map(|p| GenericParam {
                ast: None,
                ident: Ident::new(self.unit.interner.intern(p)),
            })
            .collect();

        let decl = self.unit.decls.alloc(Decl::StructDef(StructDef {
            ast: None,
            ident,
            block,
            fields: Vec::new(),
            impls: Vec::new(),
            attrs: Default::default(),
            generic_params,
            specializations: Vec::new(),
            parent_specialization: None,
        }));
        self.push_decl(m.block, decl);

        StructCtx { decl, block, table }
    }

    /// Struct fields are written as var decls; interface analysis turns
    /// them into fields.
    pub fn add_field(&mut self, s: &StructCtx, name: &str, ty: ExprId) -> DeclId {
        let ident = self.ident(name);
        let decl = self.unit.decls.alloc(Decl::VarDecl(VarDecl {
            ast: None,
            ident,
            ty,
            value: None,
        }));
        self.push_decl(s.block, decl)
    }

    pub fn add_method(
        &mut self,
        s: &StructCtx,
        name: &str,
        params: &[(&str, ExprId)],
        return_type: ExprId,
        stmts: &[StmtId],
    ) -> DeclId {
        let decl = self.func_decl(s.table, name, params, return_type, stmts);
        self.push_decl(s.block, decl)
    }

    /// `self` parameter placeholder; interface analysis rewrites the type
    /// against the enclosing container.
    pub fn self_param(&mut self) -> (&'static str, ExprId) {
        let placeholder = self.ident_expr("self");
        ("self", placeholder)
    }

    // ---- standard library stubs -------------------------------------------

    /// Minimal standard modules the analyzer lowers against: Array, Map,
    /// Optional, Result, Set, String, Closure, and the preamble functions.
    pub fn add_std(&mut self) {
        let void = self.prim(Primitive::Void);
        let boolean = self.prim(Primitive::Bool);
        let u8_ty = self.prim(Primitive::U8);
        let u8_ptr = {
            let base = u8_ty;
            self.unit
                .exprs
                .alloc(Expr::PointerType(tarn::sir::PointerType { ast: None, base }))
        };
        let usize_ty = self.prim(Primitive::Usize);
        let addr = self.prim(Primitive::Addr);

        self.module(&["internal"]);
        self.module(&["std"]);

        let preamble = self.module(&["internal", "preamble"]);
        self.add_func(&preamble, "print", &[("value", u8_ptr)], void, &[]);
        let u8_ptr2 = {
            let base = self.prim(Primitive::U8);
            self.unit
                .exprs
                .alloc(Expr::PointerType(tarn::sir::PointerType { ast: None, base }))
        };
        self.add_func(&preamble, "println", &[("value", u8_ptr2)], void, &[]);
        self.add_func(&preamble, "assert", &[("condition", boolean)], void, &[]);

        let array_mod = self.module(&["std", "array"]);
        let array = self.add_struct(&array_mod, "Array", &["T"]);
        let elem_ptr = {
            let base = self.ident_expr("T");
            self.unit
                .exprs
                .alloc(Expr::PointerType(tarn::sir::PointerType { ast: None, base }))
        };
        self.add_field(&array, "data", elem_ptr);
        self.add_field(&array, "length", usize_ty);

        let optional_mod = self.module(&["std", "optional"]);
        let optional = self.add_struct(&optional_mod, "Optional", &["T"]);
        let opt_value_ty = self.ident_expr("T");
        self.add_field(&optional, "value", opt_value_ty);
        let has_ty = self.prim(Primitive::Bool);
        self.add_field(&optional, "has_value", has_ty);

        let result_mod = self.module(&["std", "result"]);
        let result = self.add_struct(&result_mod, "Result", &["T", "E"]);
        let res_value_ty = self.ident_expr("T");
        self.add_field(&result, "value", res_value_ty);
        let res_error_ty = self.ident_expr("E");
        self.add_field(&result, "error", res_error_ty);

        let string_mod = self.module(&["std", "string"]);
        let string = self.add_struct(&string_mod, "String", &[]);
        let string_data_ty = {
            let base = self.prim(Primitive::U8);
            self.unit
                .exprs
                .alloc(Expr::PointerType(tarn::sir::PointerType { ast: None, base }))
        };
        self.add_field(&string, "data", string_data_ty);
        let string_len_ty = self.prim(Primitive::Usize);
        self.add_field(&string, "length", string_len_ty);

        let set_mod = self.module(&["std", "set"]);
        let set = self.add_struct(&set_mod, "Set", &["T"]);
        let set_elem_ptr = {
            let base = self.ident_expr("T");
            self.unit
                .exprs
                .alloc(Expr::PointerType(tarn::sir::PointerType { ast: None, base }))
        };
        self.add_field(&set, "entries", set_elem_ptr);

        let map_mod = self.module(&["std", "map"]);
        let map = self.add_struct(&map_mod, "Map", &["K", "V"]);
        let map_keys_ty = {
            let base = self.ident_expr("K");
            self.unit
                .exprs
                .alloc(Expr::PointerType(tarn::sir::PointerType { ast: None, base }))
        };
        self.add_field(&map, "keys", map_keys_ty);
        let map_values_ty = {
            let base = self.ident_expr("V");
            self.unit
                .exprs
                .alloc(Expr::PointerType(tarn::sir::PointerType { ast: None, base }))
        };
        self.add_field(&map, "values", map_values_ty);

        let closure_mod = self.module(&["std", "closure"]);
        let closure = self.add_struct(&closure_mod, "Closure", &["T"]);
        let closure_func_ty = self.prim(Primitive::Addr);
        self.add_field(&closure, "func", closure_func_ty);
        let closure_data_ty = self.prim(Primitive::Addr);
        self.add_field(&closure, "data", closure_data_ty);

        let null = self
            .unit
            .exprs
            .alloc(Expr::NullLiteral(tarn::sir::NullLiteral { ast: None, ty: None }));
        let new_ret = self.ret(Some(null));
        let data_param_ty = self.ident_expr("T");
        let new_decl_ret_ty = self.prim(Primitive::Addr);
        let new_decl = self.func_decl(
            closure.table,
            "new",
            &[("func", addr), ("data", data_param_ty)],
            new_decl_ret_ty,
            &[new_ret],
        );
        let generic_t = GenericParam {
            ast: None,
            ident: Ident::new(self.unit.interner.intern("T")),
        };
        if let Decl::FuncDef(def) = &mut self.unit.decls[new_decl] {
            def.generic_params = vec![generic_t];
        }
        self.push_decl(closure.block, new_decl);
    }

    pub fn std_closure_struct(&mut self) -> DeclId {
        let path = ModulePath::from_strs(&mut self.unit.interner, &["std", "closure"]);
        let module = self.unit.mods_by_path[&path];
        let block = self.unit.modules[module].block;
        let name = self.unit.interner.intern("Closure");
        self.unit.decl_blocks[block]
            .decls
            .iter()
            .copied()
            .find(|&decl| matches!(&self.unit.decls[decl], Decl::StructDef(def) if def.ident.name == name))
            .unwrap_or_else(|| panic!("std closure struct missing"))
    }
}

pub fn error_messages(analysis: &Analysis) -> Vec<String> {
    analysis
        .reports
        .iter()
        .map(|r| r.message.clone())
        .collect()
}

pub fn assert_no_errors(analysis: &Analysis) {
    let errors: Vec<&str> = analysis
        .reports
        .iter()
        .filter(|r| r.is_error())
        .map(|r| r.message.as_str())
        .collect();
    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
}

pub fn assert_error_containing(analysis: &Analysis, fragment: &str) {
    assert!(
        analysis
            .reports
            .iter()
            .any(|r| r.is_error() && r.message.contains(fragment)),
        "no error containing {:?} in {:?}",
        fragment,
        error_messages(analysis),
    );
}
