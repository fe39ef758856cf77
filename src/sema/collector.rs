//! Symbol collection: walk every decl block and register top-level
//! declarations in symbol tables. Declarations inside `meta if` bodies are
//! recorded as guarded scopes instead, to be materialized on demand.
//! Generic declarations are registered but their contents stay
//! uncollected until specialization.

use crate::intern::Name;
use crate::sir::{Decl, DeclBlockId, DeclId, InsertOutcome, MetaNode, Symbol, UseItemId};

use super::SemanticAnalyzer;

impl<'u, 'a> SemanticAnalyzer<'u, 'a> {
    pub(crate) fn collect_symbols(&mut self) {
        self.for_each_module("collect", |analyzer, module| {
            let block = analyzer.unit.modules[module].block;
            analyzer.collect_in_decl_block(block);
        });
    }

    pub(crate) fn collect_in_decl_block(&mut self, decl_block: DeclBlockId) {
        let mut index = 0;

        while index < self.unit.decl_blocks[decl_block].decls.len() {
            let decl = self.unit.decl_blocks[decl_block].decls[index];
            self.collect_decl(decl, decl_block);
            index += 1;
        }
    }

    /// Collect decls that a meta expansion just inlined into `decl_block`.
    pub(crate) fn collect_in_meta_block(
        &mut self,
        nodes: &[MetaNode],
        decl_block: DeclBlockId,
    ) {
        for node in nodes {
            if let MetaNode::Decl(decl) = node {
                self.collect_decl(*decl, decl_block);
            }
        }
    }

    fn collect_decl(&mut self, decl: DeclId, decl_block: DeclBlockId) {
        let parent = self.scope().decl;
        self.unit.decl_parents.insert(decl, parent);

        match &self.unit.decls[decl] {
            Decl::FuncDef(_)
            | Decl::FuncDecl(_)
            | Decl::NativeFuncDecl(_)
            | Decl::ConstDef(_)
            | Decl::NativeVarDecl(_)
            | Decl::EnumVariant(_)
            | Decl::UnionCase(_)
            | Decl::TypeAlias(_)
            | Decl::StructField(_) => {
                self.insert_decl_symbol(decl);
            }
            Decl::VarDecl(_) => {
                // Struct-level var decls become fields during interface
                // analysis and are found through field lookup instead.
                if self.scope().struct_def.is_none() {
                    self.insert_decl_symbol(decl);
                }
            }
            Decl::StructDef(def) => {
                let block = def.block;
                let generic = def.is_generic();
                self.insert_decl_symbol(decl);

                if !generic {
                    let table = self.unit.decl_blocks[block].symbol_table;
                    let scope = self.push_scope();
                    scope.decl = Symbol::Decl(decl);
                    scope.struct_def = Some(decl);
                    scope.symbol_table = table;
                    self.collect_in_decl_block(block);
                    self.pop_scope();
                }
            }
            Decl::EnumDef(def) => {
                let block = def.block;
                self.insert_decl_symbol(decl);

                let table = self.unit.decl_blocks[block].symbol_table;
                let scope = self.push_scope();
                scope.decl = Symbol::Decl(decl);
                scope.symbol_table = table;
                self.collect_in_decl_block(block);
                self.pop_scope();
            }
            Decl::UnionDef(def) => {
                let block = def.block;
                self.insert_decl_symbol(decl);

                let table = self.unit.decl_blocks[block].symbol_table;
                let scope = self.push_scope();
                scope.decl = Symbol::Decl(decl);
                scope.union_def = Some(decl);
                scope.symbol_table = table;
                self.collect_in_decl_block(block);
                self.pop_scope();
            }
            Decl::ProtoDef(def) => {
                let block = def.block;
                self.insert_decl_symbol(decl);

                let table = self.unit.decl_blocks[block].symbol_table;
                let scope = self.push_scope();
                scope.decl = Symbol::Decl(decl);
                scope.proto_def = Some(decl);
                scope.symbol_table = table;
                self.collect_in_decl_block(block);
                self.pop_scope();
            }
            Decl::Use(use_decl) => {
                let root_item = use_decl.root_item;
                self.collect_use_item(root_item);
            }
            Decl::MetaIf(meta_if) => {
                // Names declared under an unexpanded `meta if` resolve on
                // demand through the guarded-scope map.
                let mut guarded_names: Vec<Name> = Vec::new();

                for branch in &meta_if.cond_branches {
                    collect_meta_block_names(self, &branch.block.nodes, &mut guarded_names);
                }
                if let Some(else_block) = &meta_if.else_branch {
                    collect_meta_block_names(self, &else_block.nodes, &mut guarded_names);
                }

                let table = self.scope().symbol_table;
                for name in guarded_names {
                    self.unit.tables[table]
                        .guarded_scopes
                        .entry(name)
                        .or_insert((decl_block, decl));
                }
            }
            Decl::ExpandedMeta | Decl::Error => {}
        }
    }

    fn insert_decl_symbol(&mut self, decl: DeclId) {
        let Some(ident) = self.unit.decls[decl].ident() else {
            return;
        };
        let name = ident.name;
        let ast = ident.ast;

        let table = self.scope().symbol_table;
        match self.unit.insert_symbol(table, name, Symbol::Decl(decl)) {
            InsertOutcome::Inserted | InsertOutcome::Overloaded => {}
            InsertOutcome::Duplicate(prev) => {
                self.err_redefinition(name, ast, prev);
            }
        }
    }

    fn collect_use_item(&mut self, item: UseItemId) {
        match &self.unit.use_items[item] {
            crate::sir::UseItem::Ident(use_ident) => {
                let name = use_ident.ident.name;
                let table = self.scope().symbol_table;
                self.unit.insert_symbol(table, name, Symbol::UseIdent(item));
            }
            crate::sir::UseItem::Rebind(rebind) => {
                let name = rebind.local_ident.name;
                let table = self.scope().symbol_table;
                self.unit.insert_symbol(table, name, Symbol::UseRebind(item));
            }
            crate::sir::UseItem::Dot(dot) => {
                let rhs = dot.rhs;
                self.collect_use_item(rhs);
            }
            crate::sir::UseItem::List(list) => {
                let items = list.items.clone();
                for item in items {
                    self.collect_use_item(item);
                }
            }
        }
    }
}

fn collect_meta_block_names(
    analyzer: &SemanticAnalyzer<'_, '_>,
    nodes: &[MetaNode],
    out: &mut Vec<Name>,
) {
    for node in nodes {
        if let MetaNode::Decl(decl) = node {
            if let Some(ident) = analyzer.unit.decls[*decl].ident() {
                out.push(ident.name);
            }
        }
    }
}
