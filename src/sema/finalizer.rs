//! Expression finalization: pseudo-typed literals either coerce to an
//! expected type or fall back to their default. Every value expression
//! leaves analysis with a concrete type or a diagnostic.

use crate::sir::{Decl, DeclId, Expr, ExprId, Primitive, PrimitiveType, PseudoTypeKind, Symbol};

use super::{AnalysisError, Result, SemanticAnalyzer};

impl<'u, 'a> SemanticAnalyzer<'u, 'a> {
    pub(crate) fn pseudo_kind(&self, expr: ExprId) -> Option<PseudoTypeKind> {
        let ty = self.unit.expr_type(expr)?;
        match &self.unit.exprs[ty] {
            Expr::PseudoType(kind) => Some(*kind),
            _ => None,
        }
    }

    pub(crate) fn alloc_primitive(&mut self, primitive: Primitive) -> ExprId {
        self.unit.exprs.alloc(Expr::PrimitiveType(PrimitiveType {
            ast: None,
            primitive,
        }))
    }

    /// Finalize with no expected type: apply literal defaults.
    pub(crate) fn finalize(&mut self, expr: ExprId) -> Result {
        match &self.unit.exprs[expr] {
            Expr::NoneLiteral(literal) => {
                if literal.ty.is_none() {
                    let ast = literal.ast;
                    self.err_cannot_infer_type(ast, "`none`");
                    return Err(AnalysisError);
                }
                return Ok(());
            }
            Expr::UndefinedLiteral(literal) => {
                if literal.ty.is_none() {
                    let ast = literal.ast;
                    self.err_cannot_infer_type(ast, "`undefined`");
                    return Err(AnalysisError);
                }
                return Ok(());
            }
            Expr::StructLiteral(literal) => {
                if literal.ty.is_none() {
                    let ast = literal.ast;
                    self.err_cannot_infer_type(ast, "struct literal");
                    return Err(AnalysisError);
                }
            }
            _ => {}
        }

        let Some(kind) = self.pseudo_kind(expr) else {
            return Ok(());
        };

        match kind {
            PseudoTypeKind::IntLiteral => {
                let ty = self.alloc_primitive(Primitive::I32);
                self.unit.exprs[expr].set_ty(ty);
                Ok(())
            }
            PseudoTypeKind::FpLiteral => {
                let ty = self.alloc_primitive(Primitive::F32);
                self.unit.exprs[expr].set_ty(ty);
                Ok(())
            }
            PseudoTypeKind::BoolLiteral => {
                let ty = self.alloc_primitive(Primitive::Bool);
                self.unit.exprs[expr].set_ty(ty);
                Ok(())
            }
            PseudoTypeKind::NullLiteral => {
                let ty = self.alloc_primitive(Primitive::Addr);
                self.unit.exprs[expr].set_ty(ty);
                Ok(())
            }
            PseudoTypeKind::StringLiteral => {
                let base = self.alloc_primitive(Primitive::U8);
                let ty = self
                    .unit
                    .exprs
                    .alloc(Expr::PointerType(crate::sir::PointerType { ast: None, base }));
                self.unit.exprs[expr].set_ty(ty);
                Ok(())
            }
            PseudoTypeKind::ArrayLiteral => self.finalize_array_default(expr),
            PseudoTypeKind::MapLiteral => self.finalize_map_default(expr),
        }
    }

    fn finalize_array_default(&mut self, expr: ExprId) -> Result {
        let (ast, values) = match &self.unit.exprs[expr] {
            Expr::ArrayLiteral(literal) => (literal.ast, literal.values.clone()),
            _ => return Ok(()),
        };

        if values.is_empty() {
            self.err_cannot_infer_type(ast, "empty array literal");
            return Err(AnalysisError);
        }

        self.finalize(values[0])?;
        let element_ty = self
            .unit
            .expr_type(values[0])
            .ok_or(AnalysisError)?;

        for &value in &values[1..] {
            self.finalize_by_coercion(value, element_ty)?;
        }

        let spec = self.specialize_std_struct(ast, &["std", "array"], "Array", &[element_ty])?;
        let ty = self.unit.exprs.alloc(Expr::SymbolExpr(crate::sir::SymbolExpr {
            ast: None,
            ty: None,
            symbol: Symbol::Decl(spec),
        }));
        self.unit.exprs[expr].set_ty(ty);
        Ok(())
    }

    fn finalize_map_default(&mut self, expr: ExprId) -> Result {
        let (ast, entries) = match &self.unit.exprs[expr] {
            Expr::MapLiteral(literal) => (literal.ast, literal.entries.clone()),
            _ => return Ok(()),
        };

        if entries.is_empty() {
            self.err_cannot_infer_type(ast, "empty map literal");
            return Err(AnalysisError);
        }

        let (first_key, first_value) = entries[0];
        self.finalize(first_key)?;
        self.finalize(first_value)?;
        let key_ty = self.unit.expr_type(first_key).ok_or(AnalysisError)?;
        let value_ty = self.unit.expr_type(first_value).ok_or(AnalysisError)?;

        for &(key, value) in &entries[1..] {
            self.finalize_by_coercion(key, key_ty)?;
            self.finalize_by_coercion(value, value_ty)?;
        }

        let spec =
            self.specialize_std_struct(ast, &["std", "map"], "Map", &[key_ty, value_ty])?;
        let ty = self.unit.exprs.alloc(Expr::SymbolExpr(crate::sir::SymbolExpr {
            ast: None,
            ty: None,
            symbol: Symbol::Decl(spec),
        }));
        self.unit.exprs[expr].set_ty(ty);
        Ok(())
    }

    /// Finalize against an expected type, coercing pseudo-typed literals
    /// and checking concrete types for equality.
    pub(crate) fn finalize_by_coercion(&mut self, expr: ExprId, expected: ExprId) -> Result {
        // `none` takes whatever optional type is expected.
        if matches!(self.unit.exprs[expr], Expr::NoneLiteral(_)) {
            return self.coerce_none(expr, expected);
        }
        if matches!(self.unit.exprs[expr], Expr::UndefinedLiteral(_)) {
            self.unit.exprs[expr].set_ty(expected);
            return Ok(());
        }
        if let Expr::StructLiteral(literal) = &self.unit.exprs[expr] {
            if literal.ty.is_none() {
                return self.coerce_struct_literal(expr, expected);
            }
        }

        let Some(kind) = self.pseudo_kind(expr) else {
            return self.check_concrete(expr, expected);
        };

        match kind {
            PseudoTypeKind::IntLiteral => {
                if self.unit.is_int_type(expected)
                    || self.unit.is_fp_type(expected)
                    || self.unit.is_addr_like_type(expected)
                {
                    self.unit.exprs[expr].set_ty(expected);
                    Ok(())
                } else {
                    self.report_literal_coercion_error(expr, "int literal", expected)
                }
            }
            PseudoTypeKind::FpLiteral => {
                if self.unit.is_fp_type(expected) {
                    self.unit.exprs[expr].set_ty(expected);
                    Ok(())
                } else {
                    self.report_literal_coercion_error(expr, "float literal", expected)
                }
            }
            PseudoTypeKind::BoolLiteral => {
                if self.unit.is_bool_type(expected) {
                    self.unit.exprs[expr].set_ty(expected);
                    Ok(())
                } else {
                    self.report_literal_coercion_error(expr, "bool literal", expected)
                }
            }
            PseudoTypeKind::NullLiteral => {
                if self.unit.is_addr_like_type(expected) {
                    self.unit.exprs[expr].set_ty(expected);
                    Ok(())
                } else {
                    self.report_literal_coercion_error(expr, "null", expected)
                }
            }
            PseudoTypeKind::StringLiteral => self.coerce_string_literal(expr, expected),
            PseudoTypeKind::ArrayLiteral => self.coerce_array_literal(expr, expected),
            PseudoTypeKind::MapLiteral => self.coerce_map_literal(expr, expected),
        }
    }

    fn report_literal_coercion_error(
        &mut self,
        expr: ExprId,
        kind: &str,
        expected: ExprId,
    ) -> Result {
        let ast = self.unit.expr_ast(expr);
        let expected = self.print_expr(expected);
        self.err_cannot_coerce_literal(ast, kind, expected);
        Err(AnalysisError)
    }

    fn check_concrete(&mut self, expr: ExprId, expected: ExprId) -> Result {
        let Some(actual) = self.unit.expr_type(expr) else {
            // Type expressions and the like pass through unchecked; the
            // caller decides whether a type was legal here.
            return Ok(());
        };

        if self.unit.types_equal(actual, expected) {
            return Ok(());
        }

        // A reference parameter takes the base value; the analyzer
        // records the conversion so codegen inserts the reference.
        if let Expr::ReferenceType(reference) = self.unit.exprs[expected].clone() {
            if self.unit.types_equal(actual, reference.base) {
                let inner = self.unit.exprs[expr].clone();
                let inner_id = self.unit.exprs.alloc(inner);
                let ast = self.unit.expr_ast(expr);
                self.unit.exprs[expr] = Expr::Coercion(crate::sir::CoercionExpr {
                    ast,
                    ty: Some(expected),
                    value: inner_id,
                });
                return Ok(());
            }
        }

        let ast = self.unit.expr_ast(expr);
        let actual = self.print_expr(actual);
        let expected = self.print_expr(expected);
        self.err_cannot_coerce(ast, actual, expected);
        Err(AnalysisError)
    }

    fn coerce_none(&mut self, expr: ExprId, expected: ExprId) -> Result {
        if self.unit.type_as_struct(expected).is_some() {
            self.unit.exprs[expr].set_ty(expected);
            Ok(())
        } else {
            self.report_literal_coercion_error(expr, "none", expected)
        }
    }

    fn coerce_string_literal(&mut self, expr: ExprId, expected: ExprId) -> Result {
        if self.unit.is_u8_ptr_type(expected) {
            self.unit.exprs[expr].set_ty(expected);
            return Ok(());
        }

        // The standard string and string-slice structs absorb literals.
        if let Some(decl) = self.unit.type_as_struct(expected) {
            if self.is_std_string_struct(decl) {
                self.unit.exprs[expr].set_ty(expected);
                return Ok(());
            }
        }

        self.report_literal_coercion_error(expr, "string literal", expected)
    }

    fn is_std_string_struct(&mut self, decl: DeclId) -> bool {
        let string_name = self.unit.interner.intern("String");
        let slice_name = self.unit.interner.intern("StringSlice");

        match &self.unit.decls[decl] {
            Decl::StructDef(def) => def.ident.name == string_name || def.ident.name == slice_name,
            _ => false,
        }
    }

    fn coerce_array_literal(&mut self, expr: ExprId, expected: ExprId) -> Result {
        let values = match &self.unit.exprs[expr] {
            Expr::ArrayLiteral(literal) => literal.values.clone(),
            _ => return Ok(()),
        };

        // Static arrays check their length; the standard Array and any
        // other struct target coerce elementwise against the element type.
        if let Expr::StaticArrayType(static_array) = self.unit.exprs[expected].clone() {
            let expected_len = match &self.unit.exprs[static_array.length] {
                Expr::IntLiteral(literal) => literal.value as usize,
                _ => values.len(),
            };

            if values.len() != expected_len {
                let ast = self.unit.expr_ast(expr);
                let expected_str = self.print_expr(expected);
                self.err_cannot_coerce_literal(ast, "array literal", expected_str);
                return Err(AnalysisError);
            }

            for &value in &values {
                self.finalize_by_coercion(value, static_array.base)?;
            }

            self.unit.exprs[expr].set_ty(expected);
            return Ok(());
        }

        if let Some(element_ty) = self.std_array_element_type(expected) {
            for &value in &values {
                self.finalize_by_coercion(value, element_ty)?;
            }
            self.unit.exprs[expr].set_ty(expected);
            return Ok(());
        }

        self.report_literal_coercion_error(expr, "array literal", expected)
    }

    /// Element type of a specialized standard Array, if `expected` is one.
    fn std_array_element_type(&self, expected: ExprId) -> Option<ExprId> {
        let decl = self.unit.type_as_struct(expected)?;
        let (generic_def, index) = match &self.unit.decls[decl] {
            Decl::StructDef(def) => def.parent_specialization?,
            _ => return None,
        };

        match &self.unit.decls[generic_def] {
            Decl::StructDef(def) => def
                .specializations
                .get(index as usize)
                .and_then(|s| s.args.first().copied()),
            _ => None,
        }
    }

    fn coerce_map_literal(&mut self, expr: ExprId, expected: ExprId) -> Result {
        let entries = match &self.unit.exprs[expr] {
            Expr::MapLiteral(literal) => literal.entries.clone(),
            _ => return Ok(()),
        };

        let Some(decl) = self.unit.type_as_struct(expected) else {
            return self.report_literal_coercion_error(expr, "map literal", expected);
        };

        let args = match &self.unit.decls[decl] {
            Decl::StructDef(def) => def.parent_specialization.and_then(|(generic, index)| {
                match &self.unit.decls[generic] {
                    Decl::StructDef(generic_def) => generic_def
                        .specializations
                        .get(index as usize)
                        .map(|s| s.args.clone()),
                    _ => None,
                }
            }),
            _ => None,
        };

        let Some(args) = args.filter(|args| args.len() == 2) else {
            return self.report_literal_coercion_error(expr, "map literal", expected);
        };

        for &(key, value) in &entries {
            self.finalize_by_coercion(key, args[0])?;
            self.finalize_by_coercion(value, args[1])?;
        }

        self.unit.exprs[expr].set_ty(expected);
        Ok(())
    }

    fn coerce_struct_literal(&mut self, expr: ExprId, expected: ExprId) -> Result {
        if self.unit.type_as_struct(expected).is_none() {
            let ast = self.unit.expr_ast(expr);
            let expected = self.print_expr(expected);
            self.err_cannot_coerce_literal(ast, "struct literal", expected);
            return Err(AnalysisError);
        }

        self.unit.exprs[expr].set_ty(expected);
        self.analyze_struct_literal_entries(expr)
    }
}
