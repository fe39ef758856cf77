//! Semantic intermediate representation: the typed node graph the analyzer
//! passes rewrite in place.
//!
//! Nodes live in growable typed-index arenas on the [`Unit`]; handles are
//! `Copy` ids. Back-references (decl parents, specialization parents,
//! symbols) are ids too, which keeps the cyclic shape of the graph out of
//! the ownership story.

pub mod arena;
pub mod cloner;
pub mod cond;
pub mod decl;
pub mod expr;
pub mod magic;
pub mod printer;
pub mod resource;
pub mod stmt;
pub mod symbol;

use std::collections::HashMap;

use crate::ast::{AstRef, Node};
use crate::define_id;
use crate::intern::{Interner, Name};
use crate::source::{ModulePath, SourceId};

use arena::Arena;
pub use cond::MetaCond;
pub use decl::{
    Decl, DeclAttrs, ConstDef, EnumDef, EnumVariant, FuncDecl, FuncDef, GenericParam,
    NativeFuncDecl, NativeVarDecl, ProtoDef, Specialization, StructDef, StructField, TypeAlias,
    UnionCase, UnionCaseField, UnionDef, UseDecl, VarDecl,
};
pub use expr::{
    ArrayLiteral, ArrayType, BinaryExpr, BinaryOp, BoolLiteral, BracketExpr, CallExpr, CastExpr,
    CharLiteral, ClosureLiteral, ClosureType, CoercionExpr, DeinitExpr, DotExpr, Expr, FieldExpr,
    FpLiteral, FuncType, IdentExpr, IndexExpr, InitExpr, IntLiteral, MapLiteral, MapType,
    MetaAccess, MetaCallExpr, MetaFieldExpr, MoveExpr, NoneLiteral, NullLiteral, OptionalType,
    Param, ParamAttrs, PointerType, Primitive, PrimitiveType, PseudoTypeKind, RangeExpr,
    ReferenceType, ResultType, StarExpr, StaticArrayType, StringLiteral, StructLiteral,
    StructLiteralEntry, SymbolExpr, TupleExpr, UnaryExpr, UnaryOp, UndefinedLiteral,
    UnionCaseLiteral,
};
pub use magic::MagicMethods;
pub use resource::{Ownership, Resource};
pub use stmt::{
    AssignStmt, BreakStmt, CompAssignStmt, ContinueStmt, ForStmt, IfCondBranch, IfElseBranch,
    IfStmt, LoopStmt, MetaBlock, MetaForStmt, MetaIfCondBranch, MetaIfStmt, MetaNode, ReturnStmt,
    Stmt, SwitchCase, SwitchStmt, TryExceptBranch, TryStmt, TrySuccessBranch, VarStmt, WhileStmt,
};
pub use symbol::{
    GuardedSymbol, GuardedVariant, Local, OverloadSet, Symbol, SymbolTable, UseDotExpr, UseIdent,
    UseItem, UseList, UseRebind,
};

define_id!(ExprId);
define_id!(StmtId);
define_id!(DeclId);
define_id!(BlockId);
define_id!(DeclBlockId);
define_id!(UseItemId);
define_id!(TableId);
define_id!(OverloadSetId);
define_id!(GuardedId);
define_id!(ResourceId);
define_id!(ModuleId);

/// Identifier occurrence: the interned name plus the syntax node it came
/// from (absent on synthesized nodes).
#[derive(Debug, Clone, Copy, Default)]
pub struct Ident<'a> {
    pub ast: AstRef<'a>,
    pub name: Name,
}

impl<'a> Ident<'a> {
    pub fn new(name: Name) -> Self {
        Self { ast: None, name }
    }
}

/// Statement block with its own symbol table and local storage.
#[derive(Debug)]
pub struct Block<'a> {
    pub ast: AstRef<'a>,
    pub stmts: Vec<StmtId>,
    pub symbol_table: TableId,
    pub locals: Vec<Local<'a>>,
    /// Resources created for locals/params of this block, filled in by the
    /// resource analyzer.
    pub resources: Vec<(Symbol, ResourceId)>,
}

/// Declaration block (module root or the body of a struct/enum/union/
/// proto definition).
#[derive(Debug)]
pub struct DeclBlock<'a> {
    pub ast: AstRef<'a>,
    pub decls: Vec<DeclId>,
    pub symbol_table: TableId,
}

#[derive(Debug)]
pub struct Module<'a> {
    pub path: ModulePath,
    pub block: DeclBlockId,
    pub ast_root: Option<&'a Node<'a>>,
    pub file: Option<SourceId>,
}

/// Value-vs-type classification of an analyzed expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprCategory {
    Value,
    Type,
    Module,
    Overloads,
}

/// Outcome of inserting a name into a symbol table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// Second or later function definition under the name; wrapped into an
    /// overload set.
    Overloaded,
    /// Name already taken by something that cannot overload.
    Duplicate(Symbol),
}

/// A compilation unit: all modules reachable from the roots, their SIR
/// arenas, and the interner. Arenas are append-only; passes mutate node
/// fields but never free nodes.
pub struct Unit<'a> {
    pub exprs: Arena<ExprId, Expr<'a>>,
    pub stmts: Arena<StmtId, Stmt<'a>>,
    pub decls: Arena<DeclId, Decl<'a>>,
    pub blocks: Arena<BlockId, Block<'a>>,
    pub decl_blocks: Arena<DeclBlockId, DeclBlock<'a>>,
    pub use_items: Arena<UseItemId, UseItem<'a>>,
    pub tables: Arena<TableId, SymbolTable>,
    pub overload_sets: Arena<OverloadSetId, OverloadSet>,
    pub guarded_symbols: Arena<GuardedId, GuardedSymbol>,
    pub resources: Arena<ResourceId, Resource>,
    pub modules: Arena<ModuleId, Module<'a>>,

    pub interner: Interner,
    pub magic: MagicMethods,
    pub mods_by_path: HashMap<ModulePath, ModuleId>,
    pub decl_parents: HashMap<DeclId, Symbol>,
}

impl<'a> Unit<'a> {
    pub fn new() -> Self {
        let mut interner = Interner::new();
        let magic = MagicMethods::intern(&mut interner);

        Self {
            exprs: Arena::new(),
            stmts: Arena::new(),
            decls: Arena::new(),
            blocks: Arena::new(),
            decl_blocks: Arena::new(),
            use_items: Arena::new(),
            tables: Arena::new(),
            overload_sets: Arena::new(),
            guarded_symbols: Arena::new(),
            resources: Arena::new(),
            modules: Arena::new(),
            interner,
            magic,
            mods_by_path: HashMap::new(),
            decl_parents: HashMap::new(),
        }
    }

    pub fn create_table(&mut self, parent: Option<TableId>) -> TableId {
        self.tables.alloc(SymbolTable::with_parent(parent))
    }

    pub fn create_block(&mut self, parent_table: Option<TableId>) -> BlockId {
        let table = self.create_table(parent_table);
        self.blocks.alloc(Block {
            ast: None,
            stmts: Vec::new(),
            symbol_table: table,
            locals: Vec::new(),
            resources: Vec::new(),
        })
    }

    pub fn create_decl_block(&mut self, parent_table: Option<TableId>) -> DeclBlockId {
        let table = self.create_table(parent_table);
        self.decl_blocks.alloc(DeclBlock {
            ast: None,
            decls: Vec::new(),
            symbol_table: table,
        })
    }

    pub fn create_module(
        &mut self,
        path: ModulePath,
        ast_root: Option<&'a Node<'a>>,
        file: Option<SourceId>,
    ) -> ModuleId {
        let block = self.create_decl_block(None);
        let id = self.modules.alloc(Module {
            path: path.clone(),
            block,
            ast_root,
            file,
        });
        self.mods_by_path.insert(path, id);
        id
    }

    // ---- symbol tables ----------------------------------------------------

    /// Walk the parent chain. Guarded-scope handling happens a level up, in
    /// the analyzer, because it can trigger meta expansion.
    pub fn lookup(&self, table: TableId, name: Name) -> Option<Symbol> {
        let mut current = Some(table);

        while let Some(id) = current {
            let table = &self.tables[id];
            if let Some(&symbol) = table.symbols.get(&name) {
                return Some(symbol);
            }
            current = table.parent;
        }

        None
    }

    pub fn lookup_local(&self, table: TableId, name: Name) -> Option<Symbol> {
        self.tables[table].symbols.get(&name).copied()
    }

    /// Innermost table (walking parents) whose `guarded_scopes` holds the
    /// name, along with the pending decl.
    pub fn lookup_guarded_scope(&self, table: TableId, name: Name) -> Option<(TableId, DeclId)> {
        let mut current = Some(table);

        while let Some(id) = current {
            let table = &self.tables[id];
            if let Some(&(_, decl)) = table.guarded_scopes.get(&name) {
                return Some((id, decl));
            }
            current = table.parent;
        }

        None
    }

    /// Insert a declaration symbol, promoting colliding function
    /// definitions into an overload set. Re-inserting the exact same
    /// symbol is a no-op so that re-analysis stays idempotent.
    pub fn insert_symbol(&mut self, table: TableId, name: Name, symbol: Symbol) -> InsertOutcome {
        let existing = self.tables[table].symbols.get(&name).copied();

        if existing == Some(symbol) {
            return InsertOutcome::Inserted;
        }

        match existing {
            None => {
                self.tables[table].symbols.insert(name, symbol);
                InsertOutcome::Inserted
            }
            Some(Symbol::Decl(prev_decl)) => {
                let prev_is_func = matches!(self.decls[prev_decl], Decl::FuncDef(_));
                let new_func = match symbol {
                    Symbol::Decl(d) if matches!(self.decls[d], Decl::FuncDef(_)) => Some(d),
                    _ => None,
                };

                match (prev_is_func, new_func) {
                    (true, Some(new_decl)) => {
                        let set = self.overload_sets.alloc(OverloadSet {
                            func_defs: vec![prev_decl, new_decl],
                        });
                        self.tables[table]
                            .symbols
                            .insert(name, Symbol::OverloadSet(set));
                        InsertOutcome::Overloaded
                    }
                    _ => InsertOutcome::Duplicate(Symbol::Decl(prev_decl)),
                }
            }
            Some(Symbol::OverloadSet(set)) => match symbol {
                Symbol::Decl(d) if matches!(self.decls[d], Decl::FuncDef(_)) => {
                    if !self.overload_sets[set].func_defs.contains(&d) {
                        self.overload_sets[set].func_defs.push(d);
                    }
                    InsertOutcome::Overloaded
                }
                _ => InsertOutcome::Duplicate(Symbol::OverloadSet(set)),
            },
            Some(prev) => InsertOutcome::Duplicate(prev),
        }
    }

    // ---- symbols ----------------------------------------------------------

    pub fn symbol_name(&self, symbol: Symbol) -> Name {
        match symbol {
            Symbol::Module(id) => self.modules[id]
                .path
                .segments()
                .last()
                .copied()
                .unwrap_or_default(),
            Symbol::Decl(id) => self.decls[id].ident().map(|i| i.name).unwrap_or_default(),
            Symbol::Local { block, index } => self.blocks[block].locals[index as usize].name.name,
            Symbol::Param { func, index } => {
                let ty = self.decl_func_type(func);
                match ty.and_then(|ty| self.func_type(ty)) {
                    Some(func_type) => func_type.params[index as usize].name.name,
                    None => Name::EMPTY,
                }
            }
            Symbol::OverloadSet(id) => {
                let first = self.overload_sets[id].func_defs.first().copied();
                first
                    .and_then(|d| self.decls[d].ident().map(|i| i.name))
                    .unwrap_or_default()
            }
            Symbol::Guarded(id) => self.guarded_symbols[id].name,
            Symbol::UseIdent(id) => match &self.use_items[id] {
                UseItem::Ident(item) => item.ident.name,
                _ => Name::EMPTY,
            },
            Symbol::UseRebind(id) => match &self.use_items[id] {
                UseItem::Rebind(item) => item.local_ident.name,
                _ => Name::EMPTY,
            },
        }
    }

    /// See through `use` items to the symbol they resolved to.
    pub fn resolve_use_symbol(&self, symbol: Symbol) -> Symbol {
        match symbol {
            Symbol::UseIdent(id) => match &self.use_items[id] {
                UseItem::Ident(item) => item.symbol.map(|s| self.resolve_use_symbol(s)),
                _ => None,
            }
            .unwrap_or(symbol),
            Symbol::UseRebind(id) => match &self.use_items[id] {
                UseItem::Rebind(item) => item.symbol.map(|s| self.resolve_use_symbol(s)),
                _ => None,
            }
            .unwrap_or(symbol),
            _ => symbol,
        }
    }

    pub fn symbol_type(&self, symbol: Symbol) -> Option<ExprId> {
        match self.resolve_use_symbol(symbol) {
            Symbol::Decl(id) => match &self.decls[id] {
                Decl::FuncDef(d) => Some(d.ty),
                Decl::FuncDecl(d) => Some(d.ty),
                Decl::NativeFuncDecl(d) => Some(d.ty),
                Decl::ConstDef(d) => Some(d.ty),
                Decl::StructField(d) => Some(d.ty),
                Decl::VarDecl(d) => Some(d.ty),
                Decl::NativeVarDecl(d) => Some(d.ty),
                Decl::EnumVariant(d) => d.ty,
                _ => None,
            },
            Symbol::Local { block, index } => self.blocks[block].locals[index as usize].ty,
            Symbol::Param { func, index } => {
                let ty = self.decl_func_type(func)?;
                let func_type = self.func_type(ty)?;
                Some(func_type.params[index as usize].ty)
            }
            _ => None,
        }
    }

    /// Symbol table carried by a symbol's decl block, for member lookups.
    pub fn symbol_table_of(&self, symbol: Symbol) -> Option<TableId> {
        match self.resolve_use_symbol(symbol) {
            Symbol::Module(id) => Some(self.decl_blocks[self.modules[id].block].symbol_table),
            Symbol::Decl(id) => self.decls[id]
                .decl_block()
                .map(|block| self.decl_blocks[block].symbol_table),
            _ => None,
        }
    }

    pub fn symbol_decl_block(&self, symbol: Symbol) -> Option<DeclBlockId> {
        match self.resolve_use_symbol(symbol) {
            Symbol::Module(id) => Some(self.modules[id].block),
            Symbol::Decl(id) => self.decls[id].decl_block(),
            _ => None,
        }
    }

    pub fn symbol_ast(&self, symbol: Symbol) -> AstRef<'a> {
        match symbol {
            Symbol::Decl(id) => self.decls[id].ast(),
            Symbol::Local { block, index } => self.blocks[block].locals[index as usize].ast,
            _ => None,
        }
    }

    // ---- expression helpers -----------------------------------------------

    pub fn expr_type(&self, expr: ExprId) -> Option<ExprId> {
        self.exprs[expr].ty()
    }

    pub fn expr_ast(&self, expr: ExprId) -> AstRef<'a> {
        self.exprs[expr].ast()
    }

    pub fn func_type(&self, expr: ExprId) -> Option<&FuncType<'a>> {
        match &self.exprs[expr] {
            Expr::FuncType(func_type) => Some(func_type),
            _ => None,
        }
    }

    fn decl_func_type(&self, decl: DeclId) -> Option<ExprId> {
        match &self.decls[decl] {
            Decl::FuncDef(d) => Some(d.ty),
            Decl::FuncDecl(d) => Some(d.ty),
            Decl::NativeFuncDecl(d) => Some(d.ty),
            _ => None,
        }
    }

    pub fn expr_category(&self, expr: ExprId) -> ExprCategory {
        match &self.exprs[expr] {
            Expr::PrimitiveType(_)
            | Expr::PointerType(_)
            | Expr::StaticArrayType(_)
            | Expr::FuncType(_)
            | Expr::OptionalType(_)
            | Expr::ResultType(_)
            | Expr::ArrayType(_)
            | Expr::MapType(_)
            | Expr::ClosureType(_)
            | Expr::ReferenceType(_)
            | Expr::PseudoType(_) => ExprCategory::Type,
            // A tuple of types is itself a type (the data tuple of a
            // closure, for one).
            Expr::Tuple(tuple) => {
                if !tuple.exprs.is_empty() && tuple.exprs.iter().all(|&e| self.is_type_expr(e)) {
                    ExprCategory::Type
                } else {
                    ExprCategory::Value
                }
            }
            Expr::SymbolExpr(symbol_expr) => {
                match self.resolve_use_symbol(symbol_expr.symbol) {
                    Symbol::Module(_) => ExprCategory::Module,
                    Symbol::OverloadSet(_) => ExprCategory::Overloads,
                    Symbol::Decl(decl) => match &self.decls[decl] {
                        Decl::StructDef(_)
                        | Decl::EnumDef(_)
                        | Decl::UnionDef(_)
                        | Decl::ProtoDef(_)
                        | Decl::TypeAlias(_) => ExprCategory::Type,
                        _ => ExprCategory::Value,
                    },
                    _ => ExprCategory::Value,
                }
            }
            _ => ExprCategory::Value,
        }
    }

    pub fn is_type_expr(&self, expr: ExprId) -> bool {
        self.expr_category(expr) == ExprCategory::Type
    }

    // ---- type predicates --------------------------------------------------

    pub fn as_primitive(&self, ty: ExprId) -> Option<Primitive> {
        match &self.exprs[ty] {
            Expr::PrimitiveType(p) => Some(p.primitive),
            _ => None,
        }
    }

    pub fn is_int_type(&self, ty: ExprId) -> bool {
        self.as_primitive(ty).is_some_and(|p| p.is_int())
    }

    pub fn is_signed_type(&self, ty: ExprId) -> bool {
        self.as_primitive(ty).is_some_and(|p| p.is_signed())
    }

    pub fn is_unsigned_type(&self, ty: ExprId) -> bool {
        self.as_primitive(ty)
            .is_some_and(|p| p.is_int() && !p.is_signed())
    }

    pub fn is_fp_type(&self, ty: ExprId) -> bool {
        self.as_primitive(ty).is_some_and(|p| p.is_fp())
    }

    pub fn is_bool_type(&self, ty: ExprId) -> bool {
        self.as_primitive(ty) == Some(Primitive::Bool)
    }

    /// Pointers, `addr`, and function types all hold addresses.
    pub fn is_addr_like_type(&self, ty: ExprId) -> bool {
        match &self.exprs[ty] {
            Expr::PointerType(_) | Expr::FuncType(_) => true,
            Expr::PrimitiveType(p) => p.primitive == Primitive::Addr,
            _ => false,
        }
    }

    pub fn is_u8_ptr_type(&self, ty: ExprId) -> bool {
        match &self.exprs[ty] {
            Expr::PointerType(p) => self.as_primitive(p.base) == Some(Primitive::U8),
            _ => false,
        }
    }

    /// Struct definition a type expression refers to, seeing through
    /// references and symbol exprs.
    pub fn type_as_struct(&self, ty: ExprId) -> Option<DeclId> {
        match &self.exprs[ty] {
            Expr::SymbolExpr(symbol_expr) => {
                match self.resolve_use_symbol(symbol_expr.symbol) {
                    Symbol::Decl(decl) if matches!(self.decls[decl], Decl::StructDef(_)) => {
                        Some(decl)
                    }
                    _ => None,
                }
            }
            Expr::ClosureType(closure) => Some(closure.underlying_struct),
            _ => None,
        }
    }

    pub fn type_as_decl(&self, ty: ExprId) -> Option<DeclId> {
        match &self.exprs[ty] {
            Expr::SymbolExpr(symbol_expr) => match self.resolve_use_symbol(symbol_expr.symbol) {
                Symbol::Decl(decl) => Some(decl),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn find_field(&self, struct_decl: DeclId, name: Name) -> Option<DeclId> {
        let Decl::StructDef(struct_def) = &self.decls[struct_decl] else {
            return None;
        };

        struct_def.fields.iter().copied().find(|&field| {
            matches!(&self.decls[field], Decl::StructField(f) if f.ident.name == name)
        })
    }

    /// Structural type equality, used by the specialization cache and by
    /// const evaluation of type values.
    pub fn types_equal(&self, a: ExprId, b: ExprId) -> bool {
        if a == b {
            return true;
        }

        match (&self.exprs[a], &self.exprs[b]) {
            (Expr::PrimitiveType(x), Expr::PrimitiveType(y)) => x.primitive == y.primitive,
            (Expr::PointerType(x), Expr::PointerType(y)) => self.types_equal(x.base, y.base),
            (Expr::ReferenceType(x), Expr::ReferenceType(y)) => {
                x.mutable == y.mutable && self.types_equal(x.base, y.base)
            }
            (Expr::StaticArrayType(x), Expr::StaticArrayType(y)) => {
                self.types_equal(x.base, y.base)
                    && match (&self.exprs[x.length], &self.exprs[y.length]) {
                        (Expr::IntLiteral(m), Expr::IntLiteral(n)) => m.value == n.value,
                        _ => x.length == y.length,
                    }
            }
            (Expr::FuncType(x), Expr::FuncType(y)) => {
                x.params.len() == y.params.len()
                    && self.types_equal(x.return_type, y.return_type)
                    && x.params
                        .iter()
                        .zip(&y.params)
                        .all(|(p, q)| self.types_equal(p.ty, q.ty))
            }
            (Expr::Tuple(x), Expr::Tuple(y)) => {
                x.exprs.len() == y.exprs.len()
                    && x.exprs
                        .iter()
                        .zip(&y.exprs)
                        .all(|(&p, &q)| self.types_equal(p, q))
            }
            (Expr::SymbolExpr(x), Expr::SymbolExpr(y)) => {
                self.resolve_use_symbol(x.symbol) == self.resolve_use_symbol(y.symbol)
            }
            (Expr::ClosureType(x), Expr::ClosureType(y)) => {
                self.types_equal(x.func_type, y.func_type)
            }
            (Expr::PseudoType(x), Expr::PseudoType(y)) => x == y,
            _ => false,
        }
    }
}

impl Default for Unit<'_> {
    fn default() -> Self {
        Self::new()
    }
}
