//! Implicit standard-library imports, prepended to every module before
//! symbol collection.

use crate::intern::Name;
use crate::sir::{Decl, Ident, UseDecl, UseDotExpr, UseIdent, UseItem, UseItemId, UseList};
use crate::source::ModulePath;

use super::SemanticAnalyzer;

const PREAMBLE_DECLS: &[(&[&str], &[&str])] = &[
    (&["internal", "preamble"], &["print", "println", "assert"]),
    (&["std", "optional"], &["Optional"]),
    (&["std", "array"], &["Array"]),
    (&["std", "string"], &["String"]),
    (&["std", "set"], &["Set"]),
    (&["std", "closure"], &["Closure"]),
    (&["std", "map"], &["Map"]),
    (&["std", "result"], &["Result"]),
];

impl<'u, 'a> SemanticAnalyzer<'u, 'a> {
    pub(crate) fn insert_preamble(&mut self) {
        let decls: Vec<(ModulePath, Vec<Name>)> = PREAMBLE_DECLS
            .iter()
            .map(|(path, names)| {
                let path = ModulePath::from_strs(&mut self.unit.interner, path);
                let names = names
                    .iter()
                    .map(|name| self.unit.interner.intern(name))
                    .collect();
                (path, names)
            })
            .collect();

        for module in self.module_ids() {
            let module_path = self.unit.modules[module].path.clone();

            for (path, names) in &decls {
                if path == &module_path {
                    continue;
                }

                // A freestanding unit has no standard library; silently
                // skipping keeps it analyzable.
                if !self.unit.mods_by_path.contains_key(path) {
                    continue;
                }

                let use_decl = self.create_preamble_use(path, names);
                let block = self.unit.modules[module].block;
                self.unit.decl_blocks[block].decls.insert(0, use_decl);
            }
        }
    }

    fn create_preamble_use(
        &mut self,
        path: &ModulePath,
        names: &[Name],
    ) -> crate::sir::DeclId {
        let mut lhs = self.create_use_ident(path.segments()[0]);

        for &segment in &path.segments()[1..] {
            let rhs = self.create_use_ident(segment);
            lhs = self.unit.use_items.alloc(UseItem::Dot(UseDotExpr {
                ast: None,
                lhs,
                rhs,
            }));
        }

        let rhs_items: Vec<UseItemId> = names
            .iter()
            .map(|&name| self.create_use_ident(name))
            .collect();

        let rhs = self.unit.use_items.alloc(UseItem::List(UseList {
            ast: None,
            items: rhs_items,
        }));

        let root_item = self.unit.use_items.alloc(UseItem::Dot(UseDotExpr {
            ast: None,
            lhs,
            rhs,
        }));

        self.unit.decls.alloc(Decl::Use(UseDecl {
            ast: None,
            root_item,
        }))
    }

    fn create_use_ident(&mut self, name: Name) -> UseItemId {
        self.unit.use_items.alloc(UseItem::Ident(UseIdent {
            ident: Ident::new(name),
            symbol: None,
        }))
    }
}
