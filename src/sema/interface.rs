//! Declaration interface analysis: function signatures, struct fields and
//! proto impls, enum variant values, union case layouts. Bodies are left
//! for the decl body pass; generic declarations wait for specialization.

use crate::ast::AstRef;
use crate::intern::Name;
use crate::sir::cloner::Cloner;
use crate::sir::{
    Decl, DeclBlockId, DeclId, Expr, ExprId, IntLiteral, ParamAttrs, PointerType, StructField,
    Symbol, SymbolExpr,
};

use super::SemanticAnalyzer;

impl<'u, 'a> SemanticAnalyzer<'u, 'a> {
    pub(crate) fn analyze_decl_interfaces(&mut self) {
        self.for_each_module("interface", |analyzer, module| {
            let block = analyzer.unit.modules[module].block;
            analyzer.interface_in_decl_block(block);
        });
    }

    pub(crate) fn interface_in_decl_block(&mut self, decl_block: DeclBlockId) {
        let mut index = 0;

        while index < self.unit.decl_blocks[decl_block].decls.len() {
            let decl = self.unit.decl_blocks[decl_block].decls[index];
            self.analyze_decl_interface(decl);
            index += 1;
        }
    }

    pub(crate) fn analyze_decl_interface(&mut self, decl: DeclId) {
        match &self.unit.decls[decl] {
            Decl::FuncDef(def) => {
                if def.is_generic() {
                    return;
                }
                let ty = def.ty;
                self.analyze_func_interface(ty);
            }
            Decl::FuncDecl(func_decl) => {
                let ty = func_decl.ty;
                let ast = func_decl.ast;
                if self.scope().proto_def.is_none() {
                    self.err_func_decl_outside_proto(ast);
                }
                self.analyze_func_interface(ty);
            }
            Decl::NativeFuncDecl(func_decl) => {
                let ty = func_decl.ty;
                self.analyze_func_interface(ty);
            }
            Decl::ConstDef(def) => {
                let ty = def.ty;
                let value = def.value;
                let _ = self.analyze_expr(ty, None);
                let _ = self.analyze_expr(value, Some(ty));
            }
            Decl::StructDef(def) => {
                if def.is_generic() {
                    return;
                }
                self.analyze_struct_interface(decl);
            }
            Decl::VarDecl(var_decl) => {
                let ty = var_decl.ty;
                let value = var_decl.value;

                if self.scope().struct_def.is_some() {
                    self.convert_var_decl_to_field(decl);
                } else {
                    let _ = self.analyze_expr(ty, None);
                    if let Some(value) = value {
                        let _ = self.analyze_expr(value, Some(ty));
                    }
                }
            }
            Decl::NativeVarDecl(var_decl) => {
                let ty = var_decl.ty;
                let _ = self.analyze_expr(ty, None);
            }
            Decl::StructField(field) => {
                let ty = field.ty;
                let _ = self.analyze_expr(ty, None);
            }
            Decl::EnumDef(_) => {
                self.analyze_enum_interface(decl);
            }
            Decl::EnumVariant(_) => {
                // Assigned a value and type while the enclosing enum is
                // analyzed.
            }
            Decl::UnionDef(_) => {
                self.analyze_union_interface(decl);
            }
            Decl::UnionCase(case) => {
                let ast = case.ast;
                if self.scope().union_def.is_none() {
                    self.err_case_outside_union(ast);
                }
            }
            Decl::ProtoDef(def) => {
                let block = def.block;
                let table = self.unit.decl_blocks[block].symbol_table;
                let scope = self.push_scope();
                scope.decl = Symbol::Decl(decl);
                scope.proto_def = Some(decl);
                scope.symbol_table = table;
                self.interface_in_decl_block(block);
                self.pop_scope();
            }
            Decl::TypeAlias(_)
            | Decl::Use(_)
            | Decl::MetaIf(_)
            | Decl::ExpandedMeta
            | Decl::Error => {}
        }
    }

    /// Resolve every parameter type and the return type of a `FuncType`
    /// expr, rewriting `self` parameters against the enclosing container.
    pub(crate) fn analyze_func_interface(&mut self, func_ty: ExprId) {
        let (params, return_type) = {
            let Some(func_type) = self.unit.func_type(func_ty) else {
                return;
            };
            let params: Vec<(usize, ExprId, Name, ParamAttrs, AstRef<'a>)> = func_type
                .params
                .iter()
                .enumerate()
                .map(|(i, p)| (i, p.ty, p.name.name, p.attrs, p.name.ast))
                .collect();
            (params, func_type.return_type)
        };

        for (index, param_ty, param_name, attrs, param_ast) in params {
            if param_name == self.self_name {
                self.analyze_self_param(param_ty, index, attrs, param_ast);
            } else {
                let _ = self.analyze_expr(param_ty, None);
            }
        }

        let _ = self.analyze_expr(return_type, None);
    }

    fn analyze_self_param(
        &mut self,
        param_ty: ExprId,
        index: usize,
        attrs: ParamAttrs,
        ast: AstRef<'a>,
    ) {
        let scope = self.scope();
        let container = scope
            .struct_def
            .or(scope.union_def)
            .or(scope.proto_def);

        let Some(container) = container else {
            self.err_self_not_allowed(ast);
            return;
        };

        if index != 0 {
            self.err_self_not_first(ast);
        }

        let container_expr = self.unit.exprs.alloc(Expr::SymbolExpr(SymbolExpr {
            ast: None,
            ty: None,
            symbol: Symbol::Decl(container),
        }));

        if attrs.byval {
            self.unit.exprs[param_ty] = Expr::SymbolExpr(SymbolExpr {
                ast: None,
                ty: None,
                symbol: Symbol::Decl(container),
            });
        } else {
            self.unit.exprs[param_ty] = Expr::PointerType(PointerType {
                ast: None,
                base: container_expr,
            });
        }
    }

    fn convert_var_decl_to_field(&mut self, decl: DeclId) {
        let Decl::VarDecl(var_decl) = &self.unit.decls[decl] else {
            return;
        };
        let ident = var_decl.ident;
        let ty = var_decl.ty;
        let ast = var_decl.ast;

        let _ = self.analyze_expr(ty, None);

        let struct_decl = self.scope().struct_def.expect("field outside struct");
        let index = match &self.unit.decls[struct_decl] {
            Decl::StructDef(def) => def.fields.len() as u32,
            _ => unreachable!("struct scope points at a non-struct decl"),
        };

        self.unit.decls[decl] = Decl::StructField(StructField {
            ast,
            ident,
            ty,
            index,
            attrs: Default::default(),
        });

        if let Decl::StructDef(def) = &mut self.unit.decls[struct_decl] {
            def.fields.push(decl);
        }
    }

    fn analyze_struct_interface(&mut self, decl: DeclId) {
        let (block, impls, attrs, ident_ast, name) = match &self.unit.decls[decl] {
            Decl::StructDef(def) => (
                def.block,
                def.impls.clone(),
                def.attrs,
                def.ident.ast,
                def.ident.name,
            ),
            _ => return,
        };

        let table = self.unit.decl_blocks[block].symbol_table;
        let scope = self.push_scope();
        scope.decl = Symbol::Decl(decl);
        scope.struct_def = Some(decl);
        scope.union_def = None;
        scope.proto_def = None;
        scope.symbol_table = table;
        self.interface_in_decl_block(block);
        self.pop_scope();

        for impl_expr in impls {
            self.verify_struct_impl(decl, impl_expr);
        }

        if attrs.overlapping {
            let has_fields = match &self.unit.decls[decl] {
                Decl::StructDef(def) => !def.fields.is_empty(),
                _ => false,
            };
            if !has_fields {
                let name = self.name_str(name);
                self.err_struct_overlapping_no_fields(ident_ast, name);
            }
        }
    }

    fn verify_struct_impl(&mut self, struct_decl: DeclId, impl_expr: ExprId) {
        if self.analyze_expr(impl_expr, None).is_err() {
            return;
        }

        let proto_decl = match self.unit.type_as_decl(impl_expr) {
            Some(decl) if matches!(self.unit.decls[decl], Decl::ProtoDef(_)) => decl,
            _ => {
                let ast = self.unit.expr_ast(impl_expr);
                self.err_expected_proto(ast);
                return;
            }
        };

        let proto_block = match &self.unit.decls[proto_decl] {
            Decl::ProtoDef(def) => def.block,
            _ => return,
        };
        let proto_decls = self.unit.decl_blocks[proto_block].decls.clone();

        let (struct_block, struct_table, struct_ident_ast) = match &self.unit.decls[struct_decl] {
            Decl::StructDef(def) => (
                def.block,
                self.unit.decl_blocks[def.block].symbol_table,
                def.ident.ast,
            ),
            _ => return,
        };

        for member in proto_decls {
            match &self.unit.decls[member] {
                Decl::FuncDecl(func_decl) => {
                    let method_name = func_decl.ident.name;
                    let decl_ast = func_decl.ast;

                    if self.unit.lookup_local(struct_table, method_name).is_some() {
                        continue;
                    }

                    // A default implementation in the proto fills the gap;
                    // struct methods of the same name take precedence.
                    if let Some(default_def) =
                        self.find_proto_default(proto_block, method_name)
                    {
                        self.clone_default_impl(struct_decl, struct_block, default_def);
                        continue;
                    }

                    let method = self.name_str(method_name);
                    let proto = self.symbol_str(Symbol::Decl(proto_decl));
                    self.err_impl_missing_func(struct_ident_ast, method, proto, decl_ast);
                }
                Decl::FuncDef(def) => {
                    // A default implementation: cloned in unless the
                    // struct already defines the method itself.
                    let method_name = def.ident.name;
                    if self.unit.lookup_local(struct_table, method_name).is_none() {
                        self.clone_default_impl(struct_decl, struct_block, member);
                    }
                }
                _ => {}
            }
        }
    }

    fn find_proto_default(&self, proto_block: DeclBlockId, name: Name) -> Option<DeclId> {
        self.unit.decl_blocks[proto_block]
            .decls
            .iter()
            .copied()
            .find(|&d| matches!(&self.unit.decls[d], Decl::FuncDef(def) if def.ident.name == name))
    }

    fn clone_default_impl(
        &mut self,
        struct_decl: DeclId,
        struct_block: DeclBlockId,
        default_def: DeclId,
    ) {
        let struct_table = self.unit.decl_blocks[struct_block].symbol_table;
        let clone = Cloner::new(self.unit).clone_decl(default_def, struct_table);

        self.unit.decl_blocks[struct_block].decls.push(clone);
        self.unit
            .decl_parents
            .insert(clone, Symbol::Decl(struct_decl));

        let name = self.unit.decls[clone]
            .ident()
            .map(|i| i.name)
            .unwrap_or_default();
        self.unit
            .insert_symbol(struct_table, name, Symbol::Decl(clone));

        let scope = self.push_scope();
        scope.decl = Symbol::Decl(struct_decl);
        scope.struct_def = Some(struct_decl);
        scope.union_def = None;
        scope.proto_def = None;
        scope.symbol_table = struct_table;
        self.analyze_decl_interface(clone);
        self.pop_scope();
    }

    fn analyze_enum_interface(&mut self, decl: DeclId) {
        let block = match &self.unit.decls[decl] {
            Decl::EnumDef(def) => def.block,
            _ => return,
        };
        let members = self.unit.decl_blocks[block].decls.clone();

        if let Decl::EnumDef(def) = &mut self.unit.decls[decl] {
            def.variants.clear();
        }

        let enum_symbol_expr = self.unit.exprs.alloc(Expr::SymbolExpr(SymbolExpr {
            ast: None,
            ty: None,
            symbol: Symbol::Decl(decl),
        }));

        let mut next_value: i64 = 0;

        for member in members {
            let Decl::EnumVariant(variant) = &self.unit.decls[member] else {
                continue;
            };
            let explicit = variant.value;

            let value = match explicit {
                Some(value_expr) => {
                    let _ = self.analyze_expr_uncoerced(value_expr);
                    match self.const_eval_int(value_expr) {
                        Some(v) => v,
                        None => next_value,
                    }
                }
                None => next_value,
            };
            next_value = value + 1;

            let value_expr = self.unit.exprs.alloc(Expr::IntLiteral(IntLiteral {
                ast: None,
                ty: None,
                value,
            }));

            if let Decl::EnumVariant(variant) = &mut self.unit.decls[member] {
                variant.ty = Some(enum_symbol_expr);
                variant.value = Some(value_expr);
            }

            if let Decl::EnumDef(def) = &mut self.unit.decls[decl] {
                def.variants.push(member);
            }
        }
    }

    fn analyze_union_interface(&mut self, decl: DeclId) {
        let block = match &self.unit.decls[decl] {
            Decl::UnionDef(def) => def.block,
            _ => return,
        };
        let members = self.unit.decl_blocks[block].decls.clone();

        if let Decl::UnionDef(def) = &mut self.unit.decls[decl] {
            def.cases.clear();
        }

        let table = self.unit.decl_blocks[block].symbol_table;
        let scope = self.push_scope();
        scope.decl = Symbol::Decl(decl);
        scope.union_def = Some(decl);
        scope.symbol_table = table;

        for member in members {
            match &self.unit.decls[member] {
                Decl::UnionCase(case) => {
                    let field_types: Vec<ExprId> = case.fields.iter().map(|f| f.ty).collect();
                    for ty in field_types {
                        let _ = self.analyze_expr(ty, None);
                    }

                    if let Decl::UnionDef(def) = &mut self.unit.decls[decl] {
                        def.cases.push(member);
                    }
                }
                _ => {
                    self.analyze_decl_interface(member);
                }
            }
        }

        self.pop_scope();
    }
}
