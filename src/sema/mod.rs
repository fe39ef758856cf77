//! The multi-pass semantic analyzer.
//!
//! Passes run in pipeline order over a unit: preamble injection, symbol
//! collection, use resolution, alias resolution, decl interface analysis,
//! meta expansion, decl body analysis, resource analysis. Some edges are
//! lazy: identifier resolution can trigger on-demand meta expansion, call
//! analysis can trigger generic specialization, and specialization re-runs
//! collection and interface analysis on the clone.

mod aliases;
mod body;
mod call;
mod collector;
mod const_eval;
mod expr;
mod finalizer;
mod generics;
mod interface;
mod meta_eval;
mod meta_expansion;
mod overloads;
mod preamble;
pub mod reports;
mod resource;
mod return_check;
mod stmt;
mod use_resolver;

use std::collections::{HashMap, HashSet};

use tracing::debug_span;

use crate::completion::CompletionContext;
use crate::config::Config;
use crate::index::SymbolUseIndex;
use crate::intern::Name;
use crate::loader::ModuleLoader;
use crate::report::Report;
use crate::sir::{BlockId, DeclId, ExprId, MetaCond, ModuleId, Symbol, TableId, Unit};

/// Marker that a diagnostic has already been attached to the unit; the
/// enclosing analysis short-circuits but the pipeline keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisError;

pub type Result<T = ()> = std::result::Result<T, AnalysisError>;

/// Capture context for identifiers referenced inside a closure literal.
#[derive(Debug)]
pub struct ClosureContext {
    pub captured_vars: Vec<Symbol>,
    /// `TupleExpr` collecting the captured variables' types.
    pub data_type: ExprId,
    pub parent_block: Option<BlockId>,
    pub parent_table: TableId,
}

/// One level of the analysis scope stack. Pushing clones the top, so
/// nested scopes inherit everything they don't override.
#[derive(Debug, Clone)]
pub struct Scope {
    pub module: ModuleId,
    /// Innermost declaration container: module, struct, union, or proto.
    pub decl: Symbol,
    pub func: Option<DeclId>,
    pub struct_def: Option<DeclId>,
    pub union_def: Option<DeclId>,
    pub proto_def: Option<DeclId>,
    pub block: Option<BlockId>,
    pub symbol_table: TableId,
    pub generic_args: HashMap<Name, ExprId>,
    /// Index into the analyzer's closure context stack.
    pub closure_ctx: Option<usize>,
    pub meta_cond: MetaCond,
    pub in_loop: bool,
}

pub struct SemanticAnalyzer<'u, 'a> {
    pub(crate) unit: &'u mut Unit<'a>,
    #[allow(dead_code)]
    pub(crate) config: &'u Config,
    pub(crate) loader: &'u mut dyn ModuleLoader,

    scopes: Vec<Scope>,
    pub(crate) closure_ctxs: Vec<ClosureContext>,
    pub(crate) reports: Vec<Report>,
    pub(crate) symbol_uses: SymbolUseIndex,
    pub(crate) completion: Option<CompletionContext>,

    pub(crate) in_meta_expansion: bool,
    pub(crate) blocked_decls: HashSet<DeclId>,

    pub(crate) self_name: Name,
}

/// Everything an analysis run produces besides the rewritten SIR.
pub struct Analysis {
    pub reports: Vec<Report>,
    pub index: SymbolUseIndex,
    pub completion: Option<CompletionContext>,
}

impl Analysis {
    pub fn has_errors(&self) -> bool {
        self.reports.iter().any(|r| r.is_error())
    }

    pub fn into_result(self) -> std::result::Result<(SymbolUseIndex, Option<CompletionContext>), Vec<Report>> {
        if self.reports.iter().any(|r| r.is_error()) {
            Err(self.reports)
        } else {
            Ok((self.index, self.completion))
        }
    }
}

/// Run the full pipeline over a unit.
pub fn analyze<'a>(
    unit: &mut Unit<'a>,
    config: &Config,
    loader: &mut dyn ModuleLoader,
) -> Analysis {
    let mut analyzer = SemanticAnalyzer::new(unit, config, loader);
    analyzer.run();

    Analysis {
        reports: std::mem::take(&mut analyzer.reports),
        index: std::mem::take(&mut analyzer.symbol_uses),
        completion: analyzer.completion.take(),
    }
}

impl<'u, 'a> SemanticAnalyzer<'u, 'a> {
    pub fn new(
        unit: &'u mut Unit<'a>,
        config: &'u Config,
        loader: &'u mut dyn ModuleLoader,
    ) -> Self {
        let self_name = unit.interner.intern("self");

        Self {
            unit,
            config,
            loader,
            scopes: Vec::new(),
            closure_ctxs: Vec::new(),
            reports: Vec::new(),
            symbol_uses: SymbolUseIndex::default(),
            completion: None,
            in_meta_expansion: false,
            blocked_decls: HashSet::new(),
            self_name,
        }
    }

    fn run(&mut self) {
        self.insert_preamble();
        self.collect_symbols();
        self.resolve_uses();
        self.resolve_aliases();
        self.analyze_decl_interfaces();
        self.expand_meta_decls();
        self.analyze_decl_bodies();
        self.analyze_resources();
    }

    // ---- scope stack ------------------------------------------------------

    pub(crate) fn scope(&self) -> &Scope {
        self.scopes.last().expect("scope stack is empty")
    }

    pub(crate) fn scope_mut(&mut self) -> &mut Scope {
        self.scopes.last_mut().expect("scope stack is empty")
    }

    pub(crate) fn push_scope(&mut self) -> &mut Scope {
        let top = self.scope().clone();
        self.scopes.push(top);
        self.scope_mut()
    }

    pub(crate) fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    pub(crate) fn enter_mod(&mut self, module: ModuleId) {
        let table = self.unit.decl_blocks[self.unit.modules[module].block].symbol_table;
        self.scopes.push(Scope {
            module,
            decl: Symbol::Module(module),
            func: None,
            struct_def: None,
            union_def: None,
            proto_def: None,
            block: None,
            symbol_table: table,
            generic_args: HashMap::new(),
            closure_ctx: None,
            meta_cond: MetaCond::always(),
            in_loop: false,
        });
    }

    pub(crate) fn exit_mod(&mut self) {
        self.scopes.pop();
    }

    pub(crate) fn module_ids(&self) -> Vec<ModuleId> {
        self.unit.modules.ids().collect()
    }

    /// Run `f` once per module, inside that module's scope. Modules loaded
    /// lazily during the pass are picked up too.
    pub(crate) fn for_each_module(&mut self, pass: &str, mut f: impl FnMut(&mut Self, ModuleId)) {
        let mut index = 0;

        while index < self.unit.modules.len() {
            let module = self
                .unit
                .modules
                .ids()
                .nth(index)
                .expect("module index in range");

            let span = debug_span!("pass", name = pass, module = index);
            let _enter = span.enter();

            self.enter_mod(module);
            f(self, module);
            self.exit_mod();

            index += 1;
        }
    }

    // ---- symbol lookup ----------------------------------------------------

    /// Look up a name walking the table chain, expanding guarded scopes on
    /// demand. Guarded names reached from inside a meta branch resolve
    /// through guarded-symbol variant selection instead of expansion.
    pub(crate) fn lookup_symbol(&mut self, table: TableId, name: Name) -> Result<Option<Symbol>> {
        self.lookup_symbol_at(table, name, None)
    }

    pub(crate) fn lookup_symbol_at(
        &mut self,
        table: TableId,
        name: Name,
        use_ast: crate::ast::AstRef<'a>,
    ) -> Result<Option<Symbol>> {
        let mut current = Some(table);

        while let Some(id) = current {
            if let Some(&symbol) = self.unit.tables[id].symbols.get(&name) {
                return Ok(Some(symbol));
            }

            if let Some(&(decl_block, decl)) = self.unit.tables[id].guarded_scopes.get(&name) {
                if self.scope().meta_cond.is_always() {
                    self.expand_guarded_scope(decl_block, decl)?;
                    if let Some(&symbol) = self.unit.tables[id].symbols.get(&name) {
                        return Ok(Some(symbol));
                    }
                } else {
                    return self
                        .resolve_guarded_symbol(decl, name, use_ast)
                        .map(Some);
                }
            }

            current = self.unit.tables[id].parent;
        }

        Ok(None)
    }
}
