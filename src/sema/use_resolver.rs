//! Resolution of `use` import trees into target symbols. Roots name
//! top-level modules; nested segments resolve inside the symbol table (or
//! child modules) of the symbol accumulated so far.

use tracing::trace;

use crate::ast::NodeKind;
use crate::completion::CompletionContext;
use crate::intern::Name;
use crate::sir::{Decl, DeclBlockId, Ident, Symbol, UseItem, UseItemId};

use super::{AnalysisError, Result, SemanticAnalyzer};

impl<'u, 'a> SemanticAnalyzer<'u, 'a> {
    pub(crate) fn resolve_uses(&mut self) {
        self.for_each_module("use-resolution", |analyzer, module| {
            let block = analyzer.unit.modules[module].block;
            analyzer.resolve_uses_in_decl_block(block);
        });
    }

    pub(crate) fn resolve_uses_in_decl_block(&mut self, decl_block: DeclBlockId) {
        let mut index = 0;

        while index < self.unit.decl_blocks[decl_block].decls.len() {
            let decl = self.unit.decl_blocks[decl_block].decls[index];
            if let Decl::Use(use_decl) = &self.unit.decls[decl] {
                let root_item = use_decl.root_item;
                let mut symbol = None;
                let _ = self.resolve_use_item(root_item, &mut symbol);
            }
            index += 1;
        }
    }

    fn resolve_use_item(&mut self, item: UseItemId, symbol: &mut Option<Symbol>) -> Result {
        match self.unit.use_items[item].clone() {
            UseItem::Ident(use_ident) => {
                let resolved = self.resolve_use_segment(use_ident.ident, *symbol)?;
                *symbol = Some(resolved);
                if let UseItem::Ident(use_ident) = &mut self.unit.use_items[item] {
                    use_ident.symbol = Some(resolved);
                }
                self.symbol_uses.add(use_ident.ident.ast, resolved);
                Ok(())
            }
            UseItem::Rebind(rebind) => {
                let resolved = self.resolve_use_segment(rebind.target_ident, *symbol)?;
                *symbol = Some(resolved);
                if let UseItem::Rebind(rebind) = &mut self.unit.use_items[item] {
                    rebind.symbol = Some(resolved);
                }
                self.symbol_uses.add(rebind.target_ident.ast, resolved);
                Ok(())
            }
            UseItem::Dot(dot) => {
                self.resolve_use_item(dot.lhs, symbol)?;
                self.resolve_use_item(dot.rhs, symbol)
            }
            UseItem::List(list) => {
                for item in list.items {
                    let mut branch_symbol = *symbol;
                    let _ = self.resolve_use_item(item, &mut branch_symbol);
                }
                Ok(())
            }
        }
    }

    fn resolve_use_segment(
        &mut self,
        ident: Ident<'a>,
        symbol: Option<Symbol>,
    ) -> std::result::Result<Symbol, AnalysisError> {
        if self.is_completion_ident(&ident) {
            let context = match symbol {
                None => CompletionContext::InUse,
                Some(symbol) => CompletionContext::AfterUseDot { symbol },
            };
            self.capture_completion(context);
            return Err(AnalysisError);
        }

        match symbol {
            None => self.resolve_root_module(ident),
            Some(base) => self.resolve_use_member(ident, base),
        }
    }

    fn resolve_root_module(
        &mut self,
        ident: Ident<'a>,
    ) -> std::result::Result<Symbol, AnalysisError> {
        let path = crate::source::ModulePath::new(vec![ident.name]);

        if let Some(&module) = self.unit.mods_by_path.get(&path) {
            return Ok(Symbol::Module(module));
        }

        if let Some(module) = self.load_module_lazily(&path) {
            return Ok(Symbol::Module(module));
        }

        self.err_module_not_found(ident.name, ident.ast);
        Err(AnalysisError)
    }

    fn resolve_use_member(
        &mut self,
        ident: Ident<'a>,
        base: Symbol,
    ) -> std::result::Result<Symbol, AnalysisError> {
        if let Some(table) = self.unit.symbol_table_of(base) {
            if let Some(found) = self.lookup_symbol(table, ident.name)? {
                return Ok(found);
            }
        }

        if let Symbol::Module(module) = self.unit.resolve_use_symbol(base) {
            let sub_path = self.unit.modules[module].path.appended(ident.name);

            if let Some(&sub_module) = self.unit.mods_by_path.get(&sub_path) {
                return Ok(Symbol::Module(sub_module));
            }

            if let Some(sub_module) = self.load_module_lazily(&sub_path) {
                return Ok(Symbol::Module(sub_module));
            }
        }

        let base_name = self.symbol_str(base);
        self.err_symbol_not_found_in(ident.name, ident.ast, base_name);
        Err(AnalysisError)
    }

    fn load_module_lazily(&mut self, path: &crate::source::ModulePath) -> Option<crate::sir::ModuleId> {
        self.loader.find_module(path)?;
        trace!(path = %path.display(&self.unit.interner), "loading module lazily");

        let module = self.loader.load_module(self.unit, path)?;

        // Freshly loaded modules go through the early pipeline before
        // anything can resolve into them.
        self.enter_mod(module);
        let block = self.unit.modules[module].block;
        self.collect_in_decl_block(block);
        self.resolve_uses_in_decl_block(block);
        self.exit_mod();

        Some(module)
    }

    pub(crate) fn is_completion_ident(&self, ident: &Ident<'a>) -> bool {
        ident.name == Name::EMPTY
            && ident
                .ast
                .is_some_and(|node| node.kind == NodeKind::CompletionToken)
    }

    pub(crate) fn capture_completion(&mut self, context: CompletionContext) {
        // One-shot: the first captured context wins.
        if self.completion.is_none() {
            self.completion = Some(context);
        }
    }
}
