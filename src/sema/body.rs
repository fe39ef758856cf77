//! Decl body analysis: drives statement and expression analysis over
//! function bodies, then checks return-path coverage.

use crate::sir::{Decl, DeclBlockId, DeclId, Symbol};

use super::return_check::ReturnResult;
use super::SemanticAnalyzer;

impl<'u, 'a> SemanticAnalyzer<'u, 'a> {
    pub(crate) fn analyze_decl_bodies(&mut self) {
        self.for_each_module("body", |analyzer, module| {
            let block = analyzer.unit.modules[module].block;
            analyzer.bodies_in_decl_block(block);
        });
    }

    pub(crate) fn bodies_in_decl_block(&mut self, decl_block: DeclBlockId) {
        let mut index = 0;

        while index < self.unit.decl_blocks[decl_block].decls.len() {
            let decl = self.unit.decl_blocks[decl_block].decls[index];
            self.analyze_decl_bodies_in(decl);
            index += 1;
        }
    }

    pub(crate) fn analyze_decl_bodies_in(&mut self, decl: DeclId) {
        match &self.unit.decls[decl] {
            Decl::FuncDef(def) => {
                if !def.is_generic() {
                    self.analyze_func_body(decl);
                }
            }
            Decl::StructDef(def) => {
                if def.is_generic() {
                    return;
                }
                let block = def.block;
                let table = self.unit.decl_blocks[block].symbol_table;
                let scope = self.push_scope();
                scope.decl = Symbol::Decl(decl);
                scope.struct_def = Some(decl);
                scope.symbol_table = table;
                self.bodies_in_decl_block(block);
                self.pop_scope();
            }
            Decl::UnionDef(def) => {
                let block = def.block;
                let table = self.unit.decl_blocks[block].symbol_table;
                let scope = self.push_scope();
                scope.decl = Symbol::Decl(decl);
                scope.union_def = Some(decl);
                scope.symbol_table = table;
                self.bodies_in_decl_block(block);
                self.pop_scope();
            }
            // Proto default bodies are analyzed on the clones that land in
            // implementing structs.
            _ => {}
        }
    }

    pub(crate) fn analyze_func_body(&mut self, func: DeclId) {
        let (func_ty, block, ident_ast, name) = match &self.unit.decls[func] {
            Decl::FuncDef(def) => (def.ty, def.block, def.ident.ast, def.ident.name),
            _ => return,
        };

        // Parameters resolve through the body block's symbol table.
        let params: Vec<(crate::intern::Name, u32)> = self
            .unit
            .func_type(func_ty)
            .map(|ft| {
                ft.params
                    .iter()
                    .enumerate()
                    .map(|(i, p)| (p.name.name, i as u32))
                    .collect()
            })
            .unwrap_or_default();

        let table = self.unit.blocks[block].symbol_table;
        for (param_name, index) in params {
            self.unit
                .tables[table]
                .symbols
                .insert(param_name, Symbol::Param { func, index });
        }

        let scope = self.push_scope();
        scope.func = Some(func);
        self.analyze_block(block);

        let returns = self.check_returns(block);
        let return_ty = self.current_return_type();
        if let Some(return_ty) = return_ty {
            if !self.is_void_type(return_ty) {
                match returns {
                    ReturnResult::Never => {
                        let func_str = self.name_str(name);
                        self.err_does_not_return(ident_ast, func_str);
                    }
                    ReturnResult::Sometimes => {
                        let func_str = self.name_str(name);
                        self.err_does_not_always_return(ident_ast, func_str);
                    }
                    ReturnResult::Always => {}
                }
            }
        }

        self.pop_scope();
    }
}
