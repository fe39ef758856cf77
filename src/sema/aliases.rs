//! Type alias resolution. Runs before interface analysis so every later
//! pass sees through aliases to their target types.

use crate::sir::{Decl, DeclBlockId, Symbol};

use super::SemanticAnalyzer;

impl<'u, 'a> SemanticAnalyzer<'u, 'a> {
    pub(crate) fn resolve_aliases(&mut self) {
        self.for_each_module("alias-resolution", |analyzer, module| {
            let block = analyzer.unit.modules[module].block;
            analyzer.resolve_aliases_in_decl_block(block);
        });
    }

    fn resolve_aliases_in_decl_block(&mut self, decl_block: DeclBlockId) {
        let mut index = 0;

        while index < self.unit.decl_blocks[decl_block].decls.len() {
            let decl = self.unit.decl_blocks[decl_block].decls[index];
            index += 1;

            match &self.unit.decls[decl] {
                Decl::TypeAlias(alias) => {
                    let target = alias.ty;
                    let _ = self.analyze_expr(target, None);
                }
                Decl::StructDef(def) => {
                    if def.is_generic() {
                        continue;
                    }
                    let inner = def.block;
                    let table = self.unit.decl_blocks[inner].symbol_table;
                    let scope = self.push_scope();
                    scope.decl = Symbol::Decl(decl);
                    scope.struct_def = Some(decl);
                    scope.symbol_table = table;
                    self.resolve_aliases_in_decl_block(inner);
                    self.pop_scope();
                }
                Decl::EnumDef(def) => {
                    let inner = def.block;
                    let table = self.unit.decl_blocks[inner].symbol_table;
                    let scope = self.push_scope();
                    scope.decl = Symbol::Decl(decl);
                    scope.symbol_table = table;
                    self.resolve_aliases_in_decl_block(inner);
                    self.pop_scope();
                }
                Decl::UnionDef(def) => {
                    let inner = def.block;
                    let table = self.unit.decl_blocks[inner].symbol_table;
                    let scope = self.push_scope();
                    scope.decl = Symbol::Decl(decl);
                    scope.union_def = Some(decl);
                    scope.symbol_table = table;
                    self.resolve_aliases_in_decl_block(inner);
                    self.pop_scope();
                }
                Decl::ProtoDef(def) => {
                    let inner = def.block;
                    let table = self.unit.decl_blocks[inner].symbol_table;
                    let scope = self.push_scope();
                    scope.decl = Symbol::Decl(decl);
                    scope.proto_def = Some(decl);
                    scope.symbol_table = table;
                    self.resolve_aliases_in_decl_block(inner);
                    self.pop_scope();
                }
                _ => {}
            }
        }
    }
}
