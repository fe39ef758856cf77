use indexmap::IndexMap;

use crate::ast::AstRef;
use crate::intern::Name;

use super::cond::MetaCond;
use super::{
    BlockId, DeclBlockId, DeclId, GuardedId, Ident, ModuleId, OverloadSetId, TableId, UseItemId,
};

/// Any referenceable entity. `Copy` so lookups hand out plain values;
/// everything behind it lives in the unit's arenas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    Module(ModuleId),
    Decl(DeclId),
    /// Let-binding inside a block.
    Local { block: BlockId, index: u32 },
    /// Parameter of a function decl.
    Param { func: DeclId, index: u32 },
    OverloadSet(OverloadSetId),
    Guarded(GuardedId),
    UseIdent(UseItemId),
    UseRebind(UseItemId),
}

/// Let-binding storage; blocks own their locals.
#[derive(Debug, Clone)]
pub struct Local<'a> {
    pub ast: AstRef<'a>,
    pub name: Ident<'a>,
    pub ty: Option<super::ExprId>,
    pub unmanaged: bool,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    pub parent: Option<TableId>,
    pub symbols: IndexMap<Name, Symbol>,
    /// Names that would be introduced by an as-yet-unexpanded `meta if` in
    /// this block, pointing at the enclosing decl block and the pending
    /// decl. A lookup miss that hits this map expands the meta decl on
    /// demand and retries.
    pub guarded_scopes: IndexMap<Name, (DeclBlockId, DeclId)>,
}

impl SymbolTable {
    pub fn with_parent(parent: Option<TableId>) -> Self {
        Self {
            parent,
            symbols: IndexMap::new(),
            guarded_scopes: IndexMap::new(),
        }
    }
}

/// Same-named function definitions, resolved per call site by argument
/// matching. Created lazily when a second def lands on an occupied name.
#[derive(Debug, Default)]
pub struct OverloadSet {
    pub func_defs: Vec<DeclId>,
}

/// One candidate of a conditionally-existing symbol, guarded by the meta
/// condition of the branch that declares it.
#[derive(Debug)]
pub struct GuardedVariant {
    pub condition: MetaCond,
    pub symbol: Symbol,
}

#[derive(Debug)]
pub struct GuardedSymbol {
    pub name: Name,
    pub variants: Vec<GuardedVariant>,
}

impl GuardedSymbol {
    /// Variant whose condition is implied by `current`, if exactly one
    /// qualifies.
    pub fn select(&self, current: &MetaCond) -> Option<&GuardedVariant> {
        let mut selected = None;

        for variant in &self.variants {
            if current.is_subset_of(&variant.condition) {
                if selected.is_some() {
                    return None;
                }
                selected = Some(variant);
            }
        }

        selected
    }
}

#[derive(Debug, Clone)]
pub struct UseIdent<'a> {
    pub ident: Ident<'a>,
    pub symbol: Option<Symbol>,
}

#[derive(Debug, Clone)]
pub struct UseRebind<'a> {
    pub ast: AstRef<'a>,
    pub target_ident: Ident<'a>,
    pub local_ident: Ident<'a>,
    pub symbol: Option<Symbol>,
}

#[derive(Debug, Clone)]
pub struct UseDotExpr<'a> {
    pub ast: AstRef<'a>,
    pub lhs: UseItemId,
    pub rhs: UseItemId,
}

#[derive(Debug, Clone)]
pub struct UseList<'a> {
    pub ast: AstRef<'a>,
    pub items: Vec<UseItemId>,
}

#[derive(Debug, Clone)]
pub enum UseItem<'a> {
    Ident(UseIdent<'a>),
    Rebind(UseRebind<'a>),
    Dot(UseDotExpr<'a>),
    List(UseList<'a>),
}
