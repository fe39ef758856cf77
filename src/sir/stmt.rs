use crate::ast::AstRef;

use super::{BinaryOp, BlockId, DeclId, ExprId, Ident, StmtId};

#[derive(Debug, Clone)]
pub struct VarStmt<'a> {
    pub ast: AstRef<'a>,
    pub name: Ident<'a>,
    pub ty: Option<ExprId>,
    pub value: Option<ExprId>,
    /// Index of the local registered in the enclosing block, filled in by
    /// statement analysis.
    pub local: Option<(BlockId, u32)>,
}

#[derive(Debug, Clone)]
pub struct AssignStmt<'a> {
    pub ast: AstRef<'a>,
    pub lhs: ExprId,
    pub rhs: ExprId,
}

#[derive(Debug, Clone)]
pub struct CompAssignStmt<'a> {
    pub ast: AstRef<'a>,
    pub op: BinaryOp,
    pub lhs: ExprId,
    pub rhs: ExprId,
}

#[derive(Debug, Clone)]
pub struct ReturnStmt<'a> {
    pub ast: AstRef<'a>,
    pub value: Option<ExprId>,
}

#[derive(Debug, Clone)]
pub struct IfCondBranch<'a> {
    pub ast: AstRef<'a>,
    pub condition: ExprId,
    pub block: BlockId,
}

#[derive(Debug, Clone)]
pub struct IfElseBranch<'a> {
    pub ast: AstRef<'a>,
    pub block: BlockId,
}

#[derive(Debug, Clone)]
pub struct IfStmt<'a> {
    pub ast: AstRef<'a>,
    pub cond_branches: Vec<IfCondBranch<'a>>,
    pub else_branch: Option<IfElseBranch<'a>>,
}

#[derive(Debug, Clone)]
pub struct SwitchCase<'a> {
    pub ast: AstRef<'a>,
    pub ident: Ident<'a>,
    pub ty: ExprId,
    pub block: BlockId,
}

#[derive(Debug, Clone)]
pub struct SwitchStmt<'a> {
    pub ast: AstRef<'a>,
    pub value: ExprId,
    pub cases: Vec<SwitchCase<'a>>,
}

#[derive(Debug, Clone)]
pub struct TrySuccessBranch<'a> {
    pub ast: AstRef<'a>,
    pub ident: Ident<'a>,
    pub expr: ExprId,
    pub block: BlockId,
}

#[derive(Debug, Clone)]
pub struct TryExceptBranch<'a> {
    pub ast: AstRef<'a>,
    pub ident: Ident<'a>,
    pub ty: ExprId,
    pub block: BlockId,
}

#[derive(Debug, Clone)]
pub struct TryStmt<'a> {
    pub ast: AstRef<'a>,
    pub success_branch: TrySuccessBranch<'a>,
    pub except_branch: Option<TryExceptBranch<'a>>,
    pub else_branch: Option<BlockId>,
}

#[derive(Debug, Clone)]
pub struct WhileStmt<'a> {
    pub ast: AstRef<'a>,
    pub condition: ExprId,
    pub block: BlockId,
}

#[derive(Debug, Clone)]
pub struct ForStmt<'a> {
    pub ast: AstRef<'a>,
    pub ident: Ident<'a>,
    pub range: ExprId,
    pub block: BlockId,
}

/// Canonical loop form every sugared loop lowers into.
#[derive(Debug, Clone)]
pub struct LoopStmt<'a> {
    pub ast: AstRef<'a>,
    pub condition: ExprId,
    pub block: BlockId,
    pub latch: Option<BlockId>,
}

#[derive(Debug, Clone)]
pub struct ContinueStmt<'a> {
    pub ast: AstRef<'a>,
}

#[derive(Debug, Clone)]
pub struct BreakStmt<'a> {
    pub ast: AstRef<'a>,
}

/// A node inside an unexpanded `meta if` / `meta for` body. Decl blocks
/// hold decls, statement blocks hold stmts; both appear because the same
/// meta statements are legal at either level.
#[derive(Debug, Clone, Copy)]
pub enum MetaNode {
    Decl(DeclId),
    Stmt(StmtId),
}

#[derive(Debug, Clone)]
pub struct MetaBlock<'a> {
    pub ast: AstRef<'a>,
    pub nodes: Vec<MetaNode>,
}

#[derive(Debug, Clone)]
pub struct MetaIfCondBranch<'a> {
    pub condition: ExprId,
    pub block: MetaBlock<'a>,
}

#[derive(Debug, Clone)]
pub struct MetaIfStmt<'a> {
    pub ast: AstRef<'a>,
    pub cond_branches: Vec<MetaIfCondBranch<'a>>,
    pub else_branch: Option<MetaBlock<'a>>,
}

#[derive(Debug, Clone)]
pub struct MetaForStmt<'a> {
    pub ast: AstRef<'a>,
    pub ident: Ident<'a>,
    pub range: ExprId,
    pub block: MetaBlock<'a>,
}

#[derive(Debug, Clone)]
pub enum Stmt<'a> {
    Var(VarStmt<'a>),
    Assign(AssignStmt<'a>),
    CompAssign(CompAssignStmt<'a>),
    Return(ReturnStmt<'a>),
    If(IfStmt<'a>),
    Switch(SwitchStmt<'a>),
    Try(TryStmt<'a>),
    While(WhileStmt<'a>),
    For(ForStmt<'a>),
    Loop(LoopStmt<'a>),
    Continue(ContinueStmt<'a>),
    Break(BreakStmt<'a>),
    MetaIf(MetaIfStmt<'a>),
    MetaFor(MetaForStmt<'a>),
    /// Placeholder left behind once a meta statement has been expanded.
    ExpandedMeta,
    Expr(ExprId),
    Block(BlockId),
    Error,
}

impl<'a> Stmt<'a> {
    pub fn ast(&self) -> AstRef<'a> {
        match self {
            Stmt::Var(s) => s.ast,
            Stmt::Assign(s) => s.ast,
            Stmt::CompAssign(s) => s.ast,
            Stmt::Return(s) => s.ast,
            Stmt::If(s) => s.ast,
            Stmt::Switch(s) => s.ast,
            Stmt::Try(s) => s.ast,
            Stmt::While(s) => s.ast,
            Stmt::For(s) => s.ast,
            Stmt::Loop(s) => s.ast,
            Stmt::Continue(s) => s.ast,
            Stmt::Break(s) => s.ast,
            Stmt::MetaIf(s) => s.ast,
            Stmt::MetaFor(s) => s.ast,
            Stmt::ExpandedMeta => None,
            Stmt::Expr(_) => None,
            Stmt::Block(_) => None,
            Stmt::Error => None,
        }
    }
}
