use crate::ast::AstRef;

use super::stmt::MetaIfStmt;
use super::{BlockId, DeclBlockId, DeclId, ExprId, Ident, UseItemId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeclAttrs {
    /// Declaration participates in no resource tracking.
    pub unmanaged: bool,
    /// Struct with `overlapping` layout (all fields share storage).
    pub overlapping: bool,
}

#[derive(Debug, Clone)]
pub struct GenericParam<'a> {
    pub ast: AstRef<'a>,
    pub ident: Ident<'a>,
}

/// A fully-typed clone of a generic declaration, cached on its definition.
#[derive(Debug, Clone)]
pub struct Specialization {
    pub args: Vec<ExprId>,
    pub def: DeclId,
}

#[derive(Debug, Clone)]
pub struct FuncDef<'a> {
    pub ast: AstRef<'a>,
    pub ident: Ident<'a>,
    /// `FuncType` expr.
    pub ty: ExprId,
    pub block: BlockId,
    pub attrs: DeclAttrs,
    pub generic_params: Vec<GenericParam<'a>>,
    pub specializations: Vec<Specialization>,
    /// Set on specialization instances: the generic definition this was
    /// cloned from and the index into its specialization list.
    pub parent_specialization: Option<(DeclId, u32)>,
}

impl FuncDef<'_> {
    pub fn is_generic(&self) -> bool {
        !self.generic_params.is_empty()
    }
}

/// Method signature inside a `proto` definition.
#[derive(Debug, Clone)]
pub struct FuncDecl<'a> {
    pub ast: AstRef<'a>,
    pub ident: Ident<'a>,
    pub ty: ExprId,
}

#[derive(Debug, Clone)]
pub struct NativeFuncDecl<'a> {
    pub ast: AstRef<'a>,
    pub ident: Ident<'a>,
    pub ty: ExprId,
}

#[derive(Debug, Clone)]
pub struct ConstDef<'a> {
    pub ast: AstRef<'a>,
    pub ident: Ident<'a>,
    pub ty: ExprId,
    pub value: ExprId,
}

#[derive(Debug, Clone)]
pub struct StructDef<'a> {
    pub ast: AstRef<'a>,
    pub ident: Ident<'a>,
    pub block: DeclBlockId,
    pub fields: Vec<DeclId>,
    /// Protos this struct implements, as written (resolved to proto defs
    /// during interface analysis).
    pub impls: Vec<ExprId>,
    pub attrs: DeclAttrs,
    pub generic_params: Vec<GenericParam<'a>>,
    pub specializations: Vec<Specialization>,
    pub parent_specialization: Option<(DeclId, u32)>,
}

impl StructDef<'_> {
    pub fn is_generic(&self) -> bool {
        !self.generic_params.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct StructField<'a> {
    pub ast: AstRef<'a>,
    pub ident: Ident<'a>,
    pub ty: ExprId,
    pub index: u32,
    pub attrs: DeclAttrs,
}

#[derive(Debug, Clone)]
pub struct VarDecl<'a> {
    pub ast: AstRef<'a>,
    pub ident: Ident<'a>,
    pub ty: ExprId,
    pub value: Option<ExprId>,
}

#[derive(Debug, Clone)]
pub struct NativeVarDecl<'a> {
    pub ast: AstRef<'a>,
    pub ident: Ident<'a>,
    pub ty: ExprId,
}

#[derive(Debug, Clone)]
pub struct EnumDef<'a> {
    pub ast: AstRef<'a>,
    pub ident: Ident<'a>,
    pub block: DeclBlockId,
    pub variants: Vec<DeclId>,
}

#[derive(Debug, Clone)]
pub struct EnumVariant<'a> {
    pub ast: AstRef<'a>,
    pub ident: Ident<'a>,
    /// `SymbolExpr` of the owning enum, assigned by interface analysis.
    pub ty: Option<ExprId>,
    pub value: Option<ExprId>,
}

#[derive(Debug, Clone)]
pub struct UnionDef<'a> {
    pub ast: AstRef<'a>,
    pub ident: Ident<'a>,
    pub block: DeclBlockId,
    pub cases: Vec<DeclId>,
}

#[derive(Debug, Clone)]
pub struct UnionCaseField<'a> {
    pub ast: AstRef<'a>,
    pub ident: Ident<'a>,
    pub ty: ExprId,
}

#[derive(Debug, Clone)]
pub struct UnionCase<'a> {
    pub ast: AstRef<'a>,
    pub ident: Ident<'a>,
    pub fields: Vec<UnionCaseField<'a>>,
}

#[derive(Debug, Clone)]
pub struct ProtoDef<'a> {
    pub ast: AstRef<'a>,
    pub ident: Ident<'a>,
    pub block: DeclBlockId,
}

#[derive(Debug, Clone)]
pub struct TypeAlias<'a> {
    pub ast: AstRef<'a>,
    pub ident: Ident<'a>,
    /// Alias target; rewritten to the resolved type expr by the alias
    /// resolution pass.
    pub ty: ExprId,
}

#[derive(Debug, Clone)]
pub struct UseDecl<'a> {
    pub ast: AstRef<'a>,
    pub root_item: UseItemId,
}

#[derive(Debug, Clone)]
pub enum Decl<'a> {
    FuncDef(FuncDef<'a>),
    FuncDecl(FuncDecl<'a>),
    NativeFuncDecl(NativeFuncDecl<'a>),
    ConstDef(ConstDef<'a>),
    StructDef(StructDef<'a>),
    StructField(StructField<'a>),
    VarDecl(VarDecl<'a>),
    NativeVarDecl(NativeVarDecl<'a>),
    EnumDef(EnumDef<'a>),
    EnumVariant(EnumVariant<'a>),
    UnionDef(UnionDef<'a>),
    UnionCase(UnionCase<'a>),
    ProtoDef(ProtoDef<'a>),
    TypeAlias(TypeAlias<'a>),
    Use(UseDecl<'a>),
    MetaIf(MetaIfStmt<'a>),
    ExpandedMeta,
    Error,
}

impl<'a> Decl<'a> {
    pub fn ident(&self) -> Option<&Ident<'a>> {
        match self {
            Decl::FuncDef(d) => Some(&d.ident),
            Decl::FuncDecl(d) => Some(&d.ident),
            Decl::NativeFuncDecl(d) => Some(&d.ident),
            Decl::ConstDef(d) => Some(&d.ident),
            Decl::StructDef(d) => Some(&d.ident),
            Decl::StructField(d) => Some(&d.ident),
            Decl::VarDecl(d) => Some(&d.ident),
            Decl::NativeVarDecl(d) => Some(&d.ident),
            Decl::EnumDef(d) => Some(&d.ident),
            Decl::EnumVariant(d) => Some(&d.ident),
            Decl::UnionDef(d) => Some(&d.ident),
            Decl::UnionCase(d) => Some(&d.ident),
            Decl::ProtoDef(d) => Some(&d.ident),
            Decl::TypeAlias(d) => Some(&d.ident),
            Decl::Use(_) | Decl::MetaIf(_) | Decl::ExpandedMeta | Decl::Error => None,
        }
    }

    pub fn ast(&self) -> AstRef<'a> {
        match self {
            Decl::FuncDef(d) => d.ast,
            Decl::FuncDecl(d) => d.ast,
            Decl::NativeFuncDecl(d) => d.ast,
            Decl::ConstDef(d) => d.ast,
            Decl::StructDef(d) => d.ast,
            Decl::StructField(d) => d.ast,
            Decl::VarDecl(d) => d.ast,
            Decl::NativeVarDecl(d) => d.ast,
            Decl::EnumDef(d) => d.ast,
            Decl::EnumVariant(d) => d.ast,
            Decl::UnionDef(d) => d.ast,
            Decl::UnionCase(d) => d.ast,
            Decl::ProtoDef(d) => d.ast,
            Decl::TypeAlias(d) => d.ast,
            Decl::Use(d) => d.ast,
            Decl::MetaIf(d) => d.ast,
            Decl::ExpandedMeta | Decl::Error => None,
        }
    }

    /// Decl block owned by this declaration, for container decls.
    pub fn decl_block(&self) -> Option<DeclBlockId> {
        match self {
            Decl::StructDef(d) => Some(d.block),
            Decl::EnumDef(d) => Some(d.block),
            Decl::UnionDef(d) => Some(d.block),
            Decl::ProtoDef(d) => Some(d.block),
            _ => None,
        }
    }
}
