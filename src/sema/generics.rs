//! Generic parameter inference and specialization. Specializing clones
//! the generic declaration with its parameters bound in the scope's
//! generic-arg environment, analyzes the clone, and caches it on the
//! definition keyed by the argument types.

use tracing::trace;

use crate::ast::AstRef;
use crate::sir::cloner::Cloner;
use crate::sir::{Decl, DeclId, Expr, ExprId, ModuleId, Specialization, Symbol};
use crate::source::ModulePath;

use super::{AnalysisError, Result, SemanticAnalyzer};

impl<'u, 'a> SemanticAnalyzer<'u, 'a> {
    // ---- inference --------------------------------------------------------

    /// Infer generic args for a generic function from call-site argument
    /// types, matching bare parameter names and pointer types.
    pub(crate) fn infer_generic_args(
        &mut self,
        call_ast: AstRef<'a>,
        generic_func: DeclId,
        args: &[ExprId],
    ) -> Result<Vec<ExprId>> {
        let (generic_params, param_types) = match &self.unit.decls[generic_func] {
            Decl::FuncDef(def) => {
                let params: Vec<(crate::intern::Name, AstRef<'a>)> = def
                    .generic_params
                    .iter()
                    .map(|p| (p.ident.name, p.ident.ast))
                    .collect();
                let param_types: Vec<ExprId> = self
                    .unit
                    .func_type(def.ty)
                    .map(|ft| ft.params.iter().map(|p| p.ty).collect())
                    .unwrap_or_default();
                (params, param_types)
            }
            _ => return Err(AnalysisError),
        };

        let mut inferred: Vec<Option<ExprId>> = vec![None; generic_params.len()];
        let mut sources: Vec<AstRef<'a>> = vec![None; generic_params.len()];
        let mut failed = false;

        for (arg, &param_ty) in args.iter().zip(param_types.iter()) {
            let Some(arg_ty) = self.unit.expr_type(*arg) else {
                continue;
            };
            let arg_ast = self.unit.expr_ast(*arg);

            self.infer_from_type(
                call_ast,
                &generic_params,
                param_ty,
                arg_ty,
                arg_ast,
                &mut inferred,
                &mut sources,
                &mut failed,
            );
        }

        let mut result = Vec::with_capacity(inferred.len());
        for (index, slot) in inferred.into_iter().enumerate() {
            match slot {
                Some(ty) => result.push(ty),
                None => {
                    let param = self.name_str(generic_params[index].0);
                    self.err_cannot_infer_generic_arg(call_ast, param);
                    failed = true;
                }
            }
        }

        if failed {
            Err(AnalysisError)
        } else {
            Ok(result)
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn infer_from_type(
        &mut self,
        call_ast: AstRef<'a>,
        generic_params: &[(crate::intern::Name, AstRef<'a>)],
        param_ty: ExprId,
        arg_ty: ExprId,
        arg_ast: AstRef<'a>,
        inferred: &mut [Option<ExprId>],
        sources: &mut [AstRef<'a>],
        failed: &mut bool,
    ) {
        match self.unit.exprs[param_ty].clone() {
            Expr::Ident(ident) => {
                for (index, &(name, _)) in generic_params.iter().enumerate() {
                    if name != ident.value {
                        continue;
                    }

                    if let Some(existing) = inferred[index] {
                        if !self.unit.types_equal(existing, arg_ty) {
                            let param = self.name_str(name);
                            self.err_generic_arg_inference_conflict(
                                call_ast,
                                param,
                                sources[index],
                                arg_ast,
                            );
                            *failed = true;
                        }
                    } else {
                        inferred[index] = Some(arg_ty);
                        sources[index] = arg_ast;
                    }
                }
            }
            Expr::Star(star) => {
                if let Expr::PointerType(pointer) = self.unit.exprs[arg_ty].clone() {
                    self.infer_from_type(
                        call_ast,
                        generic_params,
                        star.value,
                        pointer.base,
                        arg_ast,
                        inferred,
                        sources,
                        failed,
                    );
                }
            }
            Expr::PointerType(param_pointer) => {
                if let Expr::PointerType(arg_pointer) = self.unit.exprs[arg_ty].clone() {
                    self.infer_from_type(
                        call_ast,
                        generic_params,
                        param_pointer.base,
                        arg_pointer.base,
                        arg_ast,
                        inferred,
                        sources,
                        failed,
                    );
                }
            }
            _ => {}
        }
    }

    // ---- specialization ---------------------------------------------------

    pub(crate) fn specialize_func(
        &mut self,
        generic_def: DeclId,
        args: &[ExprId],
    ) -> Result<DeclId> {
        if let Some(existing) = self.find_existing_specialization(generic_def, args) {
            return Ok(existing);
        }

        trace!("specializing generic function");

        let (generic_params, parent) = match &self.unit.decls[generic_def] {
            Decl::FuncDef(def) => {
                if def.generic_params.len() != args.len() {
                    return Err(AnalysisError);
                }
                let params: Vec<crate::intern::Name> =
                    def.generic_params.iter().map(|p| p.ident.name).collect();
                (params, self.unit.decl_parents.get(&generic_def).copied())
            }
            _ => return Err(AnalysisError),
        };

        let parent_symbol = parent.unwrap_or(Symbol::Module(self.scope().module));
        let parent_table = self
            .unit
            .symbol_table_of(parent_symbol)
            .unwrap_or(self.scope().symbol_table);

        let clone = Cloner::new(self.unit).clone_decl(generic_def, parent_table);

        if let Decl::FuncDef(def) = &mut self.unit.decls[clone] {
            def.generic_params = Vec::new();
        }

        // The record goes in before the clone is analyzed so a recursive
        // use inside the body hits the cache.
        let index = self.record_specialization(generic_def, clone, args);
        if let Decl::FuncDef(def) = &mut self.unit.decls[clone] {
            def.parent_specialization = Some((generic_def, index));
        }
        self.unit.decl_parents.insert(clone, parent_symbol);

        let def_module = self.defining_module(generic_def);
        self.enter_mod(def_module);
        let scope = self.push_scope();
        scope.decl = parent_symbol;
        scope.symbol_table = parent_table;
        if let Symbol::Decl(parent_decl) = parent_symbol {
            if matches!(self.unit.decls[parent_decl], Decl::StructDef(_)) {
                self.scope_mut().struct_def = Some(parent_decl);
            }
        }
        for (name, &arg) in generic_params.iter().zip(args.iter()) {
            self.scope_mut().generic_args.insert(*name, arg);
        }

        let func_ty = match &self.unit.decls[clone] {
            Decl::FuncDef(def) => def.ty,
            _ => unreachable!("specialized a non-function"),
        };
        self.analyze_func_interface(func_ty);
        self.analyze_func_body(clone);
        self.resource_analyze_func(clone);

        self.pop_scope();
        self.exit_mod();

        Ok(clone)
    }

    pub(crate) fn specialize_struct(
        &mut self,
        generic_def: DeclId,
        args: &[ExprId],
    ) -> Result<DeclId> {
        if let Some(existing) = self.find_existing_specialization(generic_def, args) {
            return Ok(existing);
        }

        trace!("specializing generic struct");

        let (generic_params, expected_count) = match &self.unit.decls[generic_def] {
            Decl::StructDef(def) => (
                def.generic_params
                    .iter()
                    .map(|p| p.ident.name)
                    .collect::<Vec<_>>(),
                def.generic_params.len(),
            ),
            _ => return Err(AnalysisError),
        };
        if expected_count != args.len() {
            return Err(AnalysisError);
        }

        let parent_symbol = self
            .unit
            .decl_parents
            .get(&generic_def)
            .copied()
            .unwrap_or(Symbol::Module(self.scope().module));
        let parent_table = self
            .unit
            .symbol_table_of(parent_symbol)
            .unwrap_or(self.scope().symbol_table);

        let clone = Cloner::new(self.unit).clone_decl(generic_def, parent_table);

        if let Decl::StructDef(def) = &mut self.unit.decls[clone] {
            def.generic_params = Vec::new();
        }

        let index = self.record_specialization(generic_def, clone, args);
        if let Decl::StructDef(def) = &mut self.unit.decls[clone] {
            def.parent_specialization = Some((generic_def, index));
        }
        self.unit.decl_parents.insert(clone, parent_symbol);

        let def_module = self.defining_module(generic_def);
        self.enter_mod(def_module);
        let scope = self.push_scope();
        scope.decl = parent_symbol;
        scope.symbol_table = parent_table;
        for (name, &arg) in generic_params.iter().zip(args.iter()) {
            self.scope_mut().generic_args.insert(*name, arg);
        }

        let block = match &self.unit.decls[clone] {
            Decl::StructDef(def) => def.block,
            _ => unreachable!("specialized a non-struct"),
        };

        let inner_table = self.unit.decl_blocks[block].symbol_table;
        let scope = self.push_scope();
        scope.decl = Symbol::Decl(clone);
        scope.struct_def = Some(clone);
        scope.symbol_table = inner_table;
        self.collect_in_decl_block(block);
        self.pop_scope();

        self.analyze_struct_spec_interface(clone);
        self.analyze_decl_bodies_in(clone);
        self.resource_analyze_decl(clone);

        self.pop_scope();
        self.exit_mod();

        Ok(clone)
    }

    fn analyze_struct_spec_interface(&mut self, clone: DeclId) {
        // Same path as a plain struct; the generic-arg environment in the
        // current scope substitutes the parameters.
        self.analyze_decl_interface(clone);
    }

    fn find_existing_specialization(
        &self,
        generic_def: DeclId,
        args: &[ExprId],
    ) -> Option<DeclId> {
        let specializations = match &self.unit.decls[generic_def] {
            Decl::FuncDef(def) => &def.specializations,
            Decl::StructDef(def) => &def.specializations,
            _ => return None,
        };

        specializations
            .iter()
            .find(|s| {
                s.args.len() == args.len()
                    && s.args
                        .iter()
                        .zip(args.iter())
                        .all(|(&a, &b)| self.unit.types_equal(a, b))
            })
            .map(|s| s.def)
    }

    fn record_specialization(
        &mut self,
        generic_def: DeclId,
        clone: DeclId,
        args: &[ExprId],
    ) -> u32 {
        let record = Specialization {
            args: args.to_vec(),
            def: clone,
        };

        match &mut self.unit.decls[generic_def] {
            Decl::FuncDef(def) => {
                def.specializations.push(record);
                (def.specializations.len() - 1) as u32
            }
            Decl::StructDef(def) => {
                def.specializations.push(record);
                (def.specializations.len() - 1) as u32
            }
            _ => 0,
        }
    }

    pub(crate) fn defining_module(&self, decl: DeclId) -> ModuleId {
        let mut current = Symbol::Decl(decl);

        loop {
            match current {
                Symbol::Module(module) => return module,
                Symbol::Decl(decl) => match self.unit.decl_parents.get(&decl) {
                    Some(&parent) => current = parent,
                    None => return self.scope().module,
                },
                _ => return self.scope().module,
            }
        }
    }

    // ---- standard library structs -----------------------------------------

    pub(crate) fn find_std_struct(&mut self, module: &[&str], name: &str) -> Option<DeclId> {
        let path = ModulePath::from_strs(&mut self.unit.interner, module);
        let name = self.unit.interner.intern(name);

        let module = self.unit.mods_by_path.get(&path).copied().or_else(|| {
            self.loader.find_module(&path)?;
            self.loader.load_module(self.unit, &path)
        })?;

        let table = self.unit.decl_blocks[self.unit.modules[module].block].symbol_table;
        match self.unit.lookup_local(table, name) {
            Some(Symbol::Decl(decl)) if matches!(self.unit.decls[decl], Decl::StructDef(_)) => {
                Some(decl)
            }
            _ => None,
        }
    }

    /// Specialize a standard-library struct (Array, Map, Optional, Result,
    /// Closure, String) over the given type args. Reports a missing-symbol
    /// error when the standard module is absent.
    pub(crate) fn specialize_std_struct(
        &mut self,
        ast: AstRef<'a>,
        module: &[&str],
        name: &str,
        args: &[ExprId],
    ) -> Result<DeclId> {
        let Some(generic_def) = self.find_std_struct(module, name) else {
            let interned = self.unit.interner.intern(name);
            self.err_symbol_not_found(interned, ast);
            return Err(AnalysisError);
        };

        self.specialize_struct(generic_def, args)
    }
}
