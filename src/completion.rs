//! Completion bridge: when analysis reaches a completion token (the
//! synthetic token the IDE inserts at the cursor), the analyzer captures
//! its surrounding context and halts that path. Tooling then asks the
//! captured context for candidate names.

use crate::sir::{
    BlockId, Decl, DeclBlockId, DeclId, Expr, ExprId, Symbol, TableId, Unit,
};

/// One-shot context captured at the completion token, at most once per
/// analysis run.
#[derive(Debug, Clone, Copy)]
pub enum CompletionContext {
    /// Inside a statement block: locals and enclosing decls complete.
    InBlock { block: BlockId, func: DeclId },
    /// Inside a decl block (module or type body).
    InDeclBlock { decl_block: DeclBlockId },
    /// After `expr.`: members of the left-hand side's type complete.
    AfterDot { lhs_type: ExprId },
    /// At the root of a `use` path.
    InUse,
    /// After a dot inside a `use` path.
    AfterUseDot { symbol: Symbol },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionItemKind {
    Module,
    Function,
    Struct,
    Enum,
    EnumVariant,
    Union,
    UnionCase,
    Proto,
    Constant,
    Variable,
    Field,
    TypeAlias,
}

#[derive(Debug, Clone)]
pub struct CompletionItem {
    pub name: String,
    pub kind: CompletionItemKind,
}

pub fn collect_items(unit: &Unit, context: &CompletionContext) -> Vec<CompletionItem> {
    match context {
        CompletionContext::InBlock { block, .. } => {
            let table = unit.blocks[*block].symbol_table;
            collect_from_table_chain(unit, table)
        }
        CompletionContext::InDeclBlock { decl_block } => {
            let table = unit.decl_blocks[*decl_block].symbol_table;
            collect_from_table_chain(unit, table)
        }
        CompletionContext::AfterDot { lhs_type } => collect_members(unit, *lhs_type),
        CompletionContext::InUse => unit
            .mods_by_path
            .keys()
            .filter(|path| path.segments().len() == 1)
            .map(|path| CompletionItem {
                name: path.display(&unit.interner),
                kind: CompletionItemKind::Module,
            })
            .collect(),
        CompletionContext::AfterUseDot { symbol } => {
            let mut items = Vec::new();

            if let Some(table) = unit.symbol_table_of(*symbol) {
                items.extend(collect_from_table(unit, table));
            }

            if let Symbol::Module(module) = unit.resolve_use_symbol(*symbol) {
                let base = unit.modules[module].path.clone();
                let depth = base.segments().len() + 1;
                for (path, _) in unit.mods_by_path.iter() {
                    if path.segments().len() == depth
                        && path.segments().starts_with(base.segments())
                    {
                        items.push(CompletionItem {
                            name: unit
                                .interner
                                .resolve(path.segments()[depth - 1])
                                .to_string(),
                            kind: CompletionItemKind::Module,
                        });
                    }
                }
            }

            items
        }
    }
}

fn collect_from_table_chain(unit: &Unit, table: TableId) -> Vec<CompletionItem> {
    let mut items = Vec::new();
    let mut current = Some(table);

    while let Some(id) = current {
        items.extend(collect_from_table(unit, id));
        current = unit.tables[id].parent;
    }

    items
}

fn collect_from_table(unit: &Unit, table: TableId) -> Vec<CompletionItem> {
    unit.tables[table]
        .symbols
        .iter()
        .map(|(&name, &symbol)| CompletionItem {
            name: unit.interner.resolve(name).to_string(),
            kind: symbol_kind(unit, symbol),
        })
        .collect()
}

fn collect_members(unit: &Unit, lhs_type: ExprId) -> Vec<CompletionItem> {
    let mut items = Vec::new();

    // Module member access completes from the module's table.
    if let Expr::SymbolExpr(symbol_expr) = &unit.exprs[lhs_type] {
        if let Symbol::Module(_) = unit.resolve_use_symbol(symbol_expr.symbol) {
            if let Some(table) = unit.symbol_table_of(symbol_expr.symbol) {
                return collect_from_table(unit, table);
            }
        }
    }

    if let Some(struct_decl) = unit.type_as_struct(lhs_type) {
        if let Decl::StructDef(def) = &unit.decls[struct_decl] {
            for &field in &def.fields {
                if let Some(ident) = unit.decls[field].ident() {
                    items.push(CompletionItem {
                        name: unit.interner.resolve(ident.name).to_string(),
                        kind: CompletionItemKind::Field,
                    });
                }
            }

            let table = unit.decl_blocks[def.block].symbol_table;
            items.extend(collect_from_table(unit, table));
        }
        return items;
    }

    if let Some(decl) = unit.type_as_decl(lhs_type) {
        if let Some(table) = unit.symbol_table_of(Symbol::Decl(decl)) {
            items.extend(collect_from_table(unit, table));
        }
    }

    items
}

fn symbol_kind(unit: &Unit, symbol: Symbol) -> CompletionItemKind {
    match unit.resolve_use_symbol(symbol) {
        Symbol::Module(_) => CompletionItemKind::Module,
        Symbol::Decl(decl) => match &unit.decls[decl] {
            Decl::FuncDef(_) | Decl::FuncDecl(_) | Decl::NativeFuncDecl(_) => {
                CompletionItemKind::Function
            }
            Decl::ConstDef(_) => CompletionItemKind::Constant,
            Decl::StructDef(_) => CompletionItemKind::Struct,
            Decl::StructField(_) => CompletionItemKind::Field,
            Decl::EnumDef(_) => CompletionItemKind::Enum,
            Decl::EnumVariant(_) => CompletionItemKind::EnumVariant,
            Decl::UnionDef(_) => CompletionItemKind::Union,
            Decl::UnionCase(_) => CompletionItemKind::UnionCase,
            Decl::ProtoDef(_) => CompletionItemKind::Proto,
            Decl::TypeAlias(_) => CompletionItemKind::TypeAlias,
            _ => CompletionItemKind::Variable,
        },
        Symbol::OverloadSet(_) => CompletionItemKind::Function,
        _ => CompletionItemKind::Variable,
    }
}
