//! Deep cloning of SIR subtrees, used by the generics specializer and the
//! `meta for` expander. Clones keep their AST references so diagnostics in
//! specialized code point at the original source.

use super::{
    Block, BlockId, Decl, DeclBlock, DeclBlockId, DeclId, Expr, ExprId, MetaBlock, MetaNode, Stmt,
    StmtId, TableId, Unit,
};

pub struct Cloner<'u, 'a> {
    unit: &'u mut Unit<'a>,
}

impl<'u, 'a> Cloner<'u, 'a> {
    pub fn new(unit: &'u mut Unit<'a>) -> Self {
        Self { unit }
    }

    pub fn clone_expr(&mut self, id: ExprId) -> ExprId {
        let expr = self.unit.exprs[id].clone();

        let cloned = match expr {
            Expr::ArrayLiteral(mut e) => {
                e.values = e.values.iter().map(|&v| self.clone_expr(v)).collect();
                Expr::ArrayLiteral(e)
            }
            Expr::StructLiteral(mut e) => {
                e.ty = e.ty.map(|ty| self.clone_expr(ty));
                for entry in &mut e.entries {
                    entry.value = self.clone_expr(entry.value);
                }
                Expr::StructLiteral(e)
            }
            Expr::UnionCaseLiteral(mut e) => {
                e.args = e.args.iter().map(|&v| self.clone_expr(v)).collect();
                Expr::UnionCaseLiteral(e)
            }
            Expr::MapLiteral(mut e) => {
                e.entries = e
                    .entries
                    .iter()
                    .map(|&(k, v)| (self.clone_expr(k), self.clone_expr(v)))
                    .collect();
                Expr::MapLiteral(e)
            }
            Expr::ClosureLiteral(mut e) => {
                e.func_type = self.clone_expr(e.func_type);
                e.block = self.clone_block(e.block, self.unit.blocks[e.block].symbol_table);
                Expr::ClosureLiteral(e)
            }
            Expr::Binary(mut e) => {
                e.lhs = self.clone_expr(e.lhs);
                e.rhs = self.clone_expr(e.rhs);
                Expr::Binary(e)
            }
            Expr::Unary(mut e) => {
                e.value = self.clone_expr(e.value);
                Expr::Unary(e)
            }
            Expr::Cast(mut e) => {
                e.ty = e.ty.map(|ty| self.clone_expr(ty));
                e.value = self.clone_expr(e.value);
                Expr::Cast(e)
            }
            Expr::Index(mut e) => {
                e.base = self.clone_expr(e.base);
                e.index = self.clone_expr(e.index);
                Expr::Index(e)
            }
            Expr::Call(mut e) => {
                e.callee = self.clone_expr(e.callee);
                e.args = e.args.iter().map(|&a| self.clone_expr(a)).collect();
                Expr::Call(e)
            }
            Expr::Field(mut e) => {
                e.base = self.clone_expr(e.base);
                Expr::Field(e)
            }
            Expr::Range(mut e) => {
                e.lhs = self.clone_expr(e.lhs);
                e.rhs = self.clone_expr(e.rhs);
                Expr::Range(e)
            }
            Expr::Tuple(mut e) => {
                e.exprs = e.exprs.iter().map(|&v| self.clone_expr(v)).collect();
                Expr::Tuple(e)
            }
            Expr::Coercion(mut e) => {
                e.value = self.clone_expr(e.value);
                Expr::Coercion(e)
            }
            Expr::PointerType(mut e) => {
                e.base = self.clone_expr(e.base);
                Expr::PointerType(e)
            }
            Expr::StaticArrayType(mut e) => {
                e.base = self.clone_expr(e.base);
                e.length = self.clone_expr(e.length);
                Expr::StaticArrayType(e)
            }
            Expr::FuncType(mut e) => {
                for param in &mut e.params {
                    param.ty = self.clone_expr(param.ty);
                }
                e.return_type = self.clone_expr(e.return_type);
                Expr::FuncType(e)
            }
            Expr::OptionalType(mut e) => {
                e.base = self.clone_expr(e.base);
                Expr::OptionalType(e)
            }
            Expr::ResultType(mut e) => {
                e.value_type = self.clone_expr(e.value_type);
                e.error_type = self.clone_expr(e.error_type);
                Expr::ResultType(e)
            }
            Expr::ArrayType(mut e) => {
                e.base = self.clone_expr(e.base);
                Expr::ArrayType(e)
            }
            Expr::MapType(mut e) => {
                e.key = self.clone_expr(e.key);
                e.value = self.clone_expr(e.value);
                Expr::MapType(e)
            }
            Expr::ReferenceType(mut e) => {
                e.base = self.clone_expr(e.base);
                Expr::ReferenceType(e)
            }
            Expr::Star(mut e) => {
                e.value = self.clone_expr(e.value);
                Expr::Star(e)
            }
            Expr::Bracket(mut e) => {
                e.lhs = self.clone_expr(e.lhs);
                e.rhs = e.rhs.iter().map(|&v| self.clone_expr(v)).collect();
                Expr::Bracket(e)
            }
            Expr::Dot(mut e) => {
                e.lhs = self.clone_expr(e.lhs);
                Expr::Dot(e)
            }
            Expr::MetaAccess(mut e) => {
                e.expr = self.clone_expr(e.expr);
                Expr::MetaAccess(e)
            }
            Expr::MetaField(mut e) => {
                e.base = self.clone_expr(e.base);
                Expr::MetaField(e)
            }
            Expr::MetaCall(mut e) => {
                e.callee = self.clone_expr(e.callee);
                e.args = e.args.iter().map(|&a| self.clone_expr(a)).collect();
                Expr::MetaCall(e)
            }
            // Leaves: literals, symbol refs, idents, primitive types,
            // pseudo types, markers.
            other => other,
        };

        self.unit.exprs.alloc(cloned)
    }

    pub fn clone_stmt(&mut self, id: StmtId, parent_table: TableId) -> StmtId {
        let stmt = self.unit.stmts[id].clone();

        let cloned = match stmt {
            Stmt::Var(mut s) => {
                s.ty = s.ty.map(|ty| self.clone_expr(ty));
                s.value = s.value.map(|v| self.clone_expr(v));
                s.local = None;
                Stmt::Var(s)
            }
            Stmt::Assign(mut s) => {
                s.lhs = self.clone_expr(s.lhs);
                s.rhs = self.clone_expr(s.rhs);
                Stmt::Assign(s)
            }
            Stmt::CompAssign(mut s) => {
                s.lhs = self.clone_expr(s.lhs);
                s.rhs = self.clone_expr(s.rhs);
                Stmt::CompAssign(s)
            }
            Stmt::Return(mut s) => {
                s.value = s.value.map(|v| self.clone_expr(v));
                Stmt::Return(s)
            }
            Stmt::If(mut s) => {
                for branch in &mut s.cond_branches {
                    branch.condition = self.clone_expr(branch.condition);
                    branch.block = self.clone_block(branch.block, parent_table);
                }
                if let Some(else_branch) = &mut s.else_branch {
                    else_branch.block = self.clone_block(else_branch.block, parent_table);
                }
                Stmt::If(s)
            }
            Stmt::Switch(mut s) => {
                s.value = self.clone_expr(s.value);
                for case in &mut s.cases {
                    case.ty = self.clone_expr(case.ty);
                    case.block = self.clone_block(case.block, parent_table);
                }
                Stmt::Switch(s)
            }
            Stmt::Try(mut s) => {
                s.success_branch.expr = self.clone_expr(s.success_branch.expr);
                s.success_branch.block = self.clone_block(s.success_branch.block, parent_table);
                if let Some(except) = &mut s.except_branch {
                    except.ty = self.clone_expr(except.ty);
                    except.block = self.clone_block(except.block, parent_table);
                }
                s.else_branch = s.else_branch.map(|b| self.clone_block(b, parent_table));
                Stmt::Try(s)
            }
            Stmt::While(mut s) => {
                s.condition = self.clone_expr(s.condition);
                s.block = self.clone_block(s.block, parent_table);
                Stmt::While(s)
            }
            Stmt::For(mut s) => {
                s.range = self.clone_expr(s.range);
                s.block = self.clone_block(s.block, parent_table);
                Stmt::For(s)
            }
            Stmt::Loop(mut s) => {
                s.condition = self.clone_expr(s.condition);
                s.block = self.clone_block(s.block, parent_table);
                s.latch = s.latch.map(|b| self.clone_block(b, parent_table));
                Stmt::Loop(s)
            }
            Stmt::MetaIf(mut s) => {
                for branch in &mut s.cond_branches {
                    branch.condition = self.clone_expr(branch.condition);
                    branch.block = self.clone_meta_block(branch.block.clone(), parent_table);
                }
                s.else_branch = s
                    .else_branch
                    .take()
                    .map(|block| self.clone_meta_block(block, parent_table));
                Stmt::MetaIf(s)
            }
            Stmt::MetaFor(mut s) => {
                s.range = self.clone_expr(s.range);
                s.block = self.clone_meta_block(s.block.clone(), parent_table);
                Stmt::MetaFor(s)
            }
            Stmt::Expr(expr) => Stmt::Expr(self.clone_expr(expr)),
            Stmt::Block(block) => Stmt::Block(self.clone_block(block, parent_table)),
            other @ (Stmt::Continue(_) | Stmt::Break(_) | Stmt::ExpandedMeta | Stmt::Error) => {
                other
            }
        };

        self.unit.stmts.alloc(cloned)
    }

    /// Clone a block with a fresh, empty symbol table parented to
    /// `parent_table`. Locals and resources are re-created by analysis of
    /// the clone.
    pub fn clone_block(&mut self, id: BlockId, parent_table: TableId) -> BlockId {
        let ast = self.unit.blocks[id].ast;
        let stmts = self.unit.blocks[id].stmts.clone();

        let table = self.unit.create_table(Some(parent_table));
        let new_block = self.unit.blocks.alloc(Block {
            ast,
            stmts: Vec::new(),
            symbol_table: table,
            locals: Vec::new(),
            resources: Vec::new(),
        });

        let cloned_stmts: Vec<StmtId> = stmts
            .iter()
            .map(|&stmt| self.clone_stmt(stmt, table))
            .collect();
        self.unit.blocks[new_block].stmts = cloned_stmts;

        new_block
    }

    pub fn clone_meta_block(&mut self, block: MetaBlock<'a>, parent_table: TableId) -> MetaBlock<'a> {
        let nodes = block
            .nodes
            .iter()
            .map(|node| match *node {
                MetaNode::Stmt(stmt) => MetaNode::Stmt(self.clone_stmt(stmt, parent_table)),
                MetaNode::Decl(decl) => MetaNode::Decl(self.clone_decl(decl, parent_table)),
            })
            .collect();

        MetaBlock {
            ast: block.ast,
            nodes,
        }
    }

    pub fn clone_decl(&mut self, id: DeclId, parent_table: TableId) -> DeclId {
        let decl = self.unit.decls[id].clone();

        let cloned = match decl {
            Decl::FuncDef(mut d) => {
                d.ty = self.clone_expr(d.ty);
                d.block = self.clone_block(d.block, parent_table);
                d.specializations = Vec::new();
                Decl::FuncDef(d)
            }
            Decl::FuncDecl(mut d) => {
                d.ty = self.clone_expr(d.ty);
                Decl::FuncDecl(d)
            }
            Decl::NativeFuncDecl(mut d) => {
                d.ty = self.clone_expr(d.ty);
                Decl::NativeFuncDecl(d)
            }
            Decl::ConstDef(mut d) => {
                d.ty = self.clone_expr(d.ty);
                d.value = self.clone_expr(d.value);
                Decl::ConstDef(d)
            }
            Decl::StructDef(mut d) => {
                d.block = self.clone_decl_block(d.block, parent_table);
                d.fields = Vec::new();
                d.impls = d.impls.iter().map(|&i| self.clone_expr(i)).collect();
                d.specializations = Vec::new();
                Decl::StructDef(d)
            }
            Decl::StructField(mut d) => {
                d.ty = self.clone_expr(d.ty);
                Decl::StructField(d)
            }
            Decl::VarDecl(mut d) => {
                d.ty = self.clone_expr(d.ty);
                d.value = d.value.map(|v| self.clone_expr(v));
                Decl::VarDecl(d)
            }
            Decl::NativeVarDecl(mut d) => {
                d.ty = self.clone_expr(d.ty);
                Decl::NativeVarDecl(d)
            }
            Decl::EnumDef(mut d) => {
                d.block = self.clone_decl_block(d.block, parent_table);
                d.variants = Vec::new();
                Decl::EnumDef(d)
            }
            Decl::EnumVariant(mut d) => {
                d.ty = None;
                d.value = d.value.map(|v| self.clone_expr(v));
                Decl::EnumVariant(d)
            }
            Decl::UnionDef(mut d) => {
                d.block = self.clone_decl_block(d.block, parent_table);
                d.cases = Vec::new();
                Decl::UnionDef(d)
            }
            Decl::UnionCase(mut d) => {
                for field in &mut d.fields {
                    field.ty = self.clone_expr(field.ty);
                }
                Decl::UnionCase(d)
            }
            Decl::ProtoDef(mut d) => {
                d.block = self.clone_decl_block(d.block, parent_table);
                Decl::ProtoDef(d)
            }
            Decl::TypeAlias(mut d) => {
                d.ty = self.clone_expr(d.ty);
                Decl::TypeAlias(d)
            }
            other @ (Decl::Use(_) | Decl::MetaIf(_) | Decl::ExpandedMeta | Decl::Error) => other,
        };

        self.unit.decls.alloc(cloned)
    }

    pub fn clone_decl_block(&mut self, id: DeclBlockId, parent_table: TableId) -> DeclBlockId {
        let ast = self.unit.decl_blocks[id].ast;
        let decls = self.unit.decl_blocks[id].decls.clone();

        let table = self.unit.create_table(Some(parent_table));
        let new_block = self.unit.decl_blocks.alloc(DeclBlock {
            ast,
            decls: Vec::new(),
            symbol_table: table,
        });

        let cloned_decls: Vec<DeclId> = decls
            .iter()
            .map(|&decl| self.clone_decl(decl, table))
            .collect();
        self.unit.decl_blocks[new_block].decls = cloned_decls;

        new_block
    }
}
