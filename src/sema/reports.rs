//! Diagnostic constructors. Each analysis error has one `err_*` function
//! here so message wording lives in a single place; passes hand over
//! pre-rendered argument strings and AST references for locations.

use crate::ast::AstRef;
use crate::report::{format_message, Note, Report, Severity};
use crate::sir::printer;
use crate::sir::{ExprId, Symbol};
use crate::source::SourceLocation;

use super::SemanticAnalyzer;

pub struct ReportBuilder<'r, 'u, 'a> {
    analyzer: &'r mut SemanticAnalyzer<'u, 'a>,
    report: Report,
}

impl<'r, 'u, 'a> ReportBuilder<'r, 'u, 'a> {
    pub fn add_note(mut self, format: &str, ast: AstRef<'a>, args: &[String]) -> Self {
        self.report.notes.push(Note {
            message: format_message(format, args),
            location: location_of(ast),
        });
        self
    }

    pub fn report(self) {
        self.analyzer.reports.push(self.report);
    }
}

pub(crate) fn location_of(ast: AstRef<'_>) -> Option<SourceLocation> {
    ast.map(|node| SourceLocation {
        file: node.file,
        range: node.range,
    })
}

impl<'u, 'a> SemanticAnalyzer<'u, 'a> {
    pub(crate) fn build_error(
        &mut self,
        format: &str,
        ast: AstRef<'a>,
        args: &[String],
    ) -> ReportBuilder<'_, 'u, 'a> {
        let report = Report {
            severity: Severity::Error,
            message: format_message(format, args),
            location: location_of(ast),
            notes: Vec::new(),
        };
        ReportBuilder {
            analyzer: self,
            report,
        }
    }

    pub(crate) fn build_warning(
        &mut self,
        format: &str,
        ast: AstRef<'a>,
        args: &[String],
    ) -> ReportBuilder<'_, 'u, 'a> {
        let report = Report {
            severity: Severity::Warning,
            message: format_message(format, args),
            location: location_of(ast),
            notes: Vec::new(),
        };
        ReportBuilder {
            analyzer: self,
            report,
        }
    }

    pub(crate) fn error(&mut self, format: &str, ast: AstRef<'a>, args: &[String]) {
        self.build_error(format, ast, args).report();
    }

    pub(crate) fn warning(&mut self, format: &str, ast: AstRef<'a>, args: &[String]) {
        self.build_warning(format, ast, args).report();
    }

    // ---- rendering helpers ------------------------------------------------

    pub(crate) fn print_expr(&self, expr: ExprId) -> String {
        printer::print_expr(self.unit, expr)
    }

    pub(crate) fn print_type_of(&self, expr: ExprId) -> String {
        match self.unit.expr_type(expr) {
            Some(ty) => printer::print_expr(self.unit, ty),
            None => "<unknown>".to_string(),
        }
    }

    pub(crate) fn print_opt_type(&self, ty: Option<ExprId>) -> String {
        match ty {
            Some(ty) => printer::print_expr(self.unit, ty),
            None => "<unknown>".to_string(),
        }
    }

    pub(crate) fn name_str(&self, name: crate::intern::Name) -> String {
        self.unit.interner.resolve(name).to_string()
    }

    pub(crate) fn symbol_str(&self, symbol: Symbol) -> String {
        printer::print_symbol(self.unit, symbol)
    }

    // ---- structural -------------------------------------------------------

    pub(crate) fn err_symbol_not_found(&mut self, name: crate::intern::Name, ast: AstRef<'a>) {
        let name = self.name_str(name);
        self.error("cannot find '$'", ast, &[name]);
    }

    pub(crate) fn err_symbol_not_found_in(
        &mut self,
        name: crate::intern::Name,
        ast: AstRef<'a>,
        base: String,
    ) {
        let name = self.name_str(name);
        self.error("cannot find '$' in '$'", ast, &[name, base]);
    }

    pub(crate) fn err_module_not_found(&mut self, name: crate::intern::Name, ast: AstRef<'a>) {
        let name = self.name_str(name);
        self.error("cannot find module '$'", ast, &[name]);
    }

    pub(crate) fn err_redefinition(
        &mut self,
        name: crate::intern::Name,
        ast: AstRef<'a>,
        prev: Symbol,
    ) {
        let name = self.name_str(name);
        let prev_ast = self.unit.symbol_ast(prev);
        self.build_error("redefinition of '$'", ast, &[name])
            .add_note("previously defined here", prev_ast, &[])
            .report();
    }

    // ---- types ------------------------------------------------------------

    pub(crate) fn err_type_mismatch(
        &mut self,
        ast: AstRef<'a>,
        expected: String,
        actual: String,
    ) {
        self.error(
            "type mismatch (expected '$', got '$')",
            ast,
            &[expected, actual],
        );
    }

    pub(crate) fn err_cannot_coerce(&mut self, ast: AstRef<'a>, actual: String, expected: String) {
        self.error(
            "cannot coerce value with type '$' to type '$'",
            ast,
            &[actual, expected],
        );
    }

    pub(crate) fn err_cannot_coerce_literal(
        &mut self,
        ast: AstRef<'a>,
        literal_kind: &str,
        expected: String,
    ) {
        let format = match literal_kind {
            "null" | "none" => "cannot coerce `$` to type '$'",
            _ => "cannot coerce $ to type '$'",
        };
        self.error(format, ast, &[literal_kind.to_string(), expected]);
    }

    pub(crate) fn err_cannot_infer_type(&mut self, ast: AstRef<'a>, what: &str) {
        self.error("cannot infer type of $", ast, &[what.to_string()]);
    }

    pub(crate) fn err_cannot_cast(&mut self, ast: AstRef<'a>, from: String, to: String) {
        self.error("cannot cast from '$' to '$'", ast, &[from, to]);
    }

    pub(crate) fn err_cannot_call(&mut self, ast: AstRef<'a>, ty: String) {
        self.error("cannot call value with type '$'", ast, &[ty]);
    }

    pub(crate) fn err_cannot_deref(&mut self, ast: AstRef<'a>, ty: String) {
        self.error("cannot dereference value with type '$'", ast, &[ty]);
    }

    pub(crate) fn err_cannot_iter(&mut self, ast: AstRef<'a>, ty: String) {
        self.build_error("cannot iterate over value with type '$'", ast, &[ty])
            .add_note(
                "implement '__iter__', '__refiter__', or '__mutiter__' for this type to support iteration",
                None,
                &[],
            )
            .report();
    }

    pub(crate) fn err_expected_integer(&mut self, ast: AstRef<'a>, ty: String) {
        self.error("expected integer, got '$'", ast, &[ty]);
    }

    pub(crate) fn err_expected_bool(&mut self, ast: AstRef<'a>, ty: String) {
        self.error("expected 'bool', got '$'", ast, &[ty]);
    }

    pub(crate) fn err_expected_proto(&mut self, ast: AstRef<'a>) {
        self.error("expected proto", ast, &[]);
    }

    pub(crate) fn err_no_members(&mut self, ast: AstRef<'a>, ty: String) {
        self.error("type '$' doesn't have members", ast, &[ty]);
    }

    pub(crate) fn err_no_field(
        &mut self,
        ast: AstRef<'a>,
        container_kind: &str,
        container: String,
        field: String,
    ) {
        self.error(
            "$ '$' has no field named '$'",
            ast,
            &[container_kind.to_string(), container, field],
        );
    }

    pub(crate) fn err_no_method(&mut self, ast: AstRef<'a>, strct: String, method: String) {
        self.error("struct '$' has no method named '$'", ast, &[strct, method]);
    }

    pub(crate) fn err_missing_field(&mut self, ast: AstRef<'a>, field: String, strct: String) {
        self.error(
            "missing value for field '$' of struct '$'",
            ast,
            &[field, strct],
        );
    }

    pub(crate) fn err_duplicate_field(
        &mut self,
        ast: AstRef<'a>,
        field: String,
        strct: String,
        prev: AstRef<'a>,
    ) {
        self.build_error(
            "more than one value specified for field '$' of struct '$'",
            ast,
            &[field, strct],
        )
        .add_note("value first specified here", prev, &[])
        .report();
    }

    pub(crate) fn err_operator_overload_not_found(
        &mut self,
        ast: AstRef<'a>,
        ty: String,
        operator: &str,
        impl_name: String,
    ) {
        self.build_error(
            "no implementation of operator '$' for type '$'",
            ast,
            &[operator.to_string(), ty],
        )
        .add_note(
            "implement '$' for this type to support this operator",
            None,
            &[impl_name],
        )
        .report();
    }

    // ---- signatures -------------------------------------------------------

    pub(crate) fn err_unexpected_arg_count(
        &mut self,
        ast: AstRef<'a>,
        expected: usize,
        got: usize,
        callee_ty: Option<String>,
    ) {
        let format = if got < expected {
            "too few arguments (expected $, got $)"
        } else {
            "too many arguments (expected $, got $)"
        };

        let builder = self.build_error(format, ast, &[expected.to_string(), got.to_string()]);
        match callee_ty {
            Some(ty) => builder
                .add_note("function declared with type '$'", None, &[ty])
                .report(),
            None => builder.report(),
        }
    }

    pub(crate) fn err_no_matching_overload(
        &mut self,
        ast: AstRef<'a>,
        candidates: Vec<(AstRef<'a>, String)>,
    ) {
        let mut builder = self.build_error("no matching overload found", ast, &[]);
        for (candidate_ast, ty) in candidates {
            builder = builder.add_note(
                "type of this candidate does not match: '$'",
                candidate_ast,
                &[ty],
            );
        }
        builder.report();
    }

    pub(crate) fn err_unexpected_generic_arg_count(
        &mut self,
        ast: AstRef<'a>,
        expected: usize,
        got: usize,
    ) {
        let format = if got < expected {
            "too few generic arguments (expected $, got $)"
        } else {
            "too many generic arguments (expected $, got $)"
        };
        self.error(format, ast, &[expected.to_string(), got.to_string()]);
    }

    pub(crate) fn err_cannot_infer_generic_arg(&mut self, ast: AstRef<'a>, param: String) {
        self.error("cannot infer value for generic parameter '$'", ast, &[param]);
    }

    pub(crate) fn err_generic_arg_inference_conflict(
        &mut self,
        ast: AstRef<'a>,
        param: String,
        first: AstRef<'a>,
        second: AstRef<'a>,
    ) {
        self.build_error(
            "conflicting values inferred for generic parameter '$'",
            ast,
            &[param],
        )
        .add_note("first inferred from this argument", first, &[])
        .add_note("then inferred differently from this argument", second, &[])
        .report();
    }

    // ---- resources --------------------------------------------------------

    pub(crate) fn err_use_after_move(
        &mut self,
        use_ast: AstRef<'a>,
        move_ast: AstRef<'a>,
        partial: bool,
        conditional: bool,
    ) {
        let mut note = String::from("previously moved");
        if partial {
            note.push_str(" partially");
        }
        if conditional {
            note.push_str(" in conditional branch");
        }
        note.push_str(" here");

        self.build_error("resource used after move", use_ast, &[])
            .add_note(&note, move_ast, &[])
            .report();
    }

    pub(crate) fn err_move_out_pointer(&mut self, ast: AstRef<'a>) {
        self.error("cannot move resource out of pointer", ast, &[]);
    }

    pub(crate) fn err_move_out_deinit(&mut self, ast: AstRef<'a>) {
        self.error(
            "cannot move out of resource implementing '__deinit__'",
            ast,
            &[],
        );
    }

    pub(crate) fn err_move_in_loop(&mut self, ast: AstRef<'a>) {
        self.error("resource moved in every iteration of a loop", ast, &[]);
    }

    pub(crate) fn err_cannot_assign(&mut self, ast: AstRef<'a>) {
        self.error("cannot assign to immutable", ast, &[]);
    }

    pub(crate) fn err_pointer_to_local_escapes(&mut self, ast: AstRef<'a>, value: AstRef<'a>) {
        self.build_error("pointer to local value escapes function", ast, &[])
            .add_note("value is referenced here", value, &[])
            .report();
    }

    // ---- meta -------------------------------------------------------------

    pub(crate) fn err_invalid_meta_field(&mut self, ast: AstRef<'a>, field: String) {
        self.error("invalid meta field '$'", ast, &[field]);
    }

    pub(crate) fn err_invalid_meta_method(&mut self, ast: AstRef<'a>, method: String) {
        self.error("invalid meta method '$'", ast, &[method]);
    }

    pub(crate) fn err_compile_time_unknown(&mut self, expr: ExprId) {
        let ast = self.unit.expr_ast(expr);
        self.error("value is not known at compile time", ast, &[]);
    }

    pub(crate) fn err_guarded_by_different_condition(
        &mut self,
        name: crate::intern::Name,
        ast: AstRef<'a>,
    ) {
        let name = self.name_str(name);
        self.error(
            "definition of '$' is guarded by different condition than usage",
            ast,
            &[name],
        );
    }

    pub(crate) fn err_meta_for_cannot_iter(&mut self, expr: ExprId) {
        let ast = self.unit.expr_ast(expr);
        self.error("'meta for' cannot iterate over this value", ast, &[]);
    }

    // ---- self and layout --------------------------------------------------

    pub(crate) fn err_self_not_allowed(&mut self, ast: AstRef<'a>) {
        self.error(
            "'self' parameter is only allowed inside structs, unions, and protos",
            ast,
            &[],
        );
    }

    pub(crate) fn err_self_not_first(&mut self, ast: AstRef<'a>) {
        self.error("'self' must be the first parameter of the method", ast, &[]);
    }

    pub(crate) fn err_case_outside_union(&mut self, ast: AstRef<'a>) {
        self.error("'case' definition outside of a 'union' definition", ast, &[]);
    }

    pub(crate) fn err_func_decl_outside_proto(&mut self, ast: AstRef<'a>) {
        self.error(
            "function declaration outside of a 'proto' definition",
            ast,
            &[],
        );
    }

    pub(crate) fn err_struct_overlapping_no_fields(&mut self, ast: AstRef<'a>, strct: String) {
        self.error(
            "structs with `overlapping` layout require at least one field",
            ast,
            &[strct],
        );
    }

    pub(crate) fn err_struct_overlapping_not_one_field(&mut self, ast: AstRef<'a>, strct: String) {
        self.error(
            "struct '$' has layout `overlapping` and therefore requires exactly one field value",
            ast,
            &[strct],
        );
    }

    pub(crate) fn err_impl_missing_func(
        &mut self,
        struct_ast: AstRef<'a>,
        method: String,
        proto: String,
        decl_ast: AstRef<'a>,
    ) {
        self.build_error(
            "missing implementation of method '$' from proto '$'",
            struct_ast,
            &[method, proto],
        )
        .add_note("method declared here", decl_ast, &[])
        .report();
    }

    // ---- control flow -----------------------------------------------------

    pub(crate) fn err_continue_outside_loop(&mut self, ast: AstRef<'a>) {
        self.error("'continue' statement outside of a loop", ast, &[]);
    }

    pub(crate) fn err_break_outside_loop(&mut self, ast: AstRef<'a>) {
        self.error("'break' statement outside of a loop", ast, &[]);
    }

    pub(crate) fn err_does_not_return(&mut self, ast: AstRef<'a>, func: String) {
        self.error("function '$' does not return a value", ast, &[func]);
    }

    pub(crate) fn err_does_not_always_return(&mut self, ast: AstRef<'a>, func: String) {
        self.error(
            "function '$' does not return a value in all control paths",
            ast,
            &[func],
        );
    }

    pub(crate) fn err_return_missing_value(&mut self, ast: AstRef<'a>, expected: String) {
        self.error(
            "'return' statement without a value (expected '$')",
            ast,
            &[expected],
        );
    }

    pub(crate) fn warn_unreachable_code(&mut self, ast: AstRef<'a>) {
        self.warning("unreachable code", ast, &[]);
    }

    // ---- try --------------------------------------------------------------

    pub(crate) fn err_cannot_use_in_try(&mut self, expr: ExprId) {
        let ast = self.unit.expr_ast(expr);
        let ty = self.print_type_of(expr);
        self.error(
            "cannot use value with type '$' in a 'try' statement",
            ast,
            &[ty],
        );
    }

    pub(crate) fn err_try_no_error_field(&mut self, ast: AstRef<'a>) {
        self.error("optional types don't have an error field", ast, &[]);
    }
}
