//! Evaluation of the `meta(...)` reflection operator: `meta(T).field` and
//! `meta(T).method(args)` over type values.

use crate::intern::Name;
use crate::sir::{
    ArrayLiteral, BoolLiteral, Decl, DotExpr, Expr, ExprId, Ident, IntLiteral, Primitive,
    StringLiteral, Symbol, TupleExpr,
};

use super::{AnalysisError, SemanticAnalyzer};

impl<'u, 'a> SemanticAnalyzer<'u, 'a> {
    /// Evaluate a meta-field or meta-call expression, rewriting it in
    /// place to the produced value.
    pub(crate) fn eval_meta_expr(&mut self, expr: ExprId) -> Result<ExprId, AnalysisError> {
        match self.unit.exprs[expr].clone() {
            Expr::MetaField(meta_field) => self.eval_meta_field(expr, meta_field.base, meta_field.field),
            Expr::MetaCall(meta_call) => {
                self.eval_meta_call(expr, meta_call.callee, meta_call.args)
            }
            _ => Err(AnalysisError),
        }
    }

    fn eval_meta_field(
        &mut self,
        expr: ExprId,
        base: ExprId,
        field: Ident<'a>,
    ) -> Result<ExprId, AnalysisError> {
        let base_expr = self.meta_access_base(base)?;
        self.analyze_expr(base_expr, None)?;
        let base_expr = self.unwrap_reference(base_expr);

        let field_name = self.name_str(field.name);

        let produced: Expr<'a> = match field_name.as_str() {
            "size" => Expr::IntLiteral(IntLiteral {
                ast: None,
                ty: None,
                value: self.compute_size(base_expr),
            }),
            "name" => {
                let name = match &self.unit.exprs[base_expr] {
                    Expr::SymbolExpr(symbol_expr) => self
                        .unit
                        .interner
                        .resolve(self.unit.symbol_name(symbol_expr.symbol))
                        .to_string(),
                    _ => String::new(),
                };
                Expr::StringLiteral(StringLiteral {
                    ast: None,
                    ty: None,
                    value: name,
                })
            }
            "is_pointer" => {
                bool_expr(matches!(self.unit.exprs[base_expr], Expr::PointerType(_)))
            }
            "is_struct" => bool_expr(self.unit.type_as_struct(base_expr).is_some()),
            "is_enum" => bool_expr(matches!(
                self.unit.type_as_decl(base_expr),
                Some(decl) if matches!(self.unit.decls[decl], Decl::EnumDef(_))
            )),
            "fields" => self.compute_meta_fields(base_expr),
            "variants" => self.compute_meta_variants(base_expr),
            "is_resource" => bool_expr(self.create_resource(base_expr).is_some()),
            _ => {
                self.err_invalid_meta_field(field.ast, field_name);
                return Err(AnalysisError);
            }
        };

        self.unit.exprs[expr] = produced;
        self.analyze_expr_uncoerced(expr)?;
        Ok(expr)
    }

    fn eval_meta_call(
        &mut self,
        expr: ExprId,
        callee: ExprId,
        args: Vec<ExprId>,
    ) -> Result<ExprId, AnalysisError> {
        let Expr::MetaField(meta_field) = self.unit.exprs[callee].clone() else {
            return Err(AnalysisError);
        };

        let base_expr = self.meta_access_base(meta_field.base)?;
        self.analyze_expr(base_expr, None)?;
        let base_expr = self.unwrap_reference(base_expr);

        for &arg in &args {
            let _ = self.analyze_expr_uncoerced(arg);
        }

        let callee_name = self.name_str(meta_field.field.name);

        match callee_name.as_str() {
            "has_method" => {
                let has = match self.string_arg(&args) {
                    Some(name) => self.type_has_method(base_expr, name),
                    None => false,
                };
                self.unit.exprs[expr] = bool_expr(has);
                self.analyze_expr_uncoerced(expr)?;
                Ok(expr)
            }
            "field" => {
                let Some(name) = self.string_arg(&args) else {
                    self.err_invalid_meta_method(meta_field.field.ast, callee_name);
                    return Err(AnalysisError);
                };

                self.unit.exprs[expr] = Expr::Dot(DotExpr {
                    ast: None,
                    lhs: base_expr,
                    rhs: Ident::new(name),
                });
                self.analyze_expr_uncoerced(expr)?;
                Ok(expr)
            }
            _ => {
                self.err_invalid_meta_method(meta_field.field.ast, callee_name);
                Err(AnalysisError)
            }
        }
    }

    fn meta_access_base(&self, base: ExprId) -> Result<ExprId, AnalysisError> {
        match &self.unit.exprs[base] {
            Expr::MetaAccess(access) => Ok(access.expr),
            _ => Err(AnalysisError),
        }
    }

    fn unwrap_reference(&self, expr: ExprId) -> ExprId {
        match &self.unit.exprs[expr] {
            Expr::ReferenceType(reference) => reference.base,
            _ => expr,
        }
    }

    fn string_arg(&mut self, args: &[ExprId]) -> Option<Name> {
        if args.len() != 1 {
            return None;
        }
        match self.unit.exprs[args[0]].clone() {
            Expr::StringLiteral(literal) => Some(self.unit.interner.intern(&literal.value)),
            _ => None,
        }
    }

    fn type_has_method(&self, ty: ExprId, name: Name) -> bool {
        let Some(struct_decl) = self.unit.type_as_struct(ty) else {
            return false;
        };
        let Decl::StructDef(def) = &self.unit.decls[struct_decl] else {
            return false;
        };
        let table = self.unit.decl_blocks[def.block].symbol_table;

        match self.unit.lookup_local(table, name) {
            Some(Symbol::Decl(decl)) => match &self.unit.decls[decl] {
                Decl::FuncDef(func) => {
                    let is_method = self
                        .unit
                        .func_type(func.ty)
                        .and_then(|ft| ft.params.first())
                        .is_some_and(|p| p.name.name == self.self_name);
                    is_method
                }
                _ => false,
            },
            Some(Symbol::OverloadSet(_)) => true,
            _ => false,
        }
    }

    fn compute_meta_fields(&mut self, ty: ExprId) -> Expr<'a> {
        let mut values = Vec::new();

        if let Some(struct_decl) = self.unit.type_as_struct(ty) {
            if let Decl::StructDef(def) = &self.unit.decls[struct_decl] {
                let names: Vec<String> = def
                    .fields
                    .iter()
                    .filter_map(|&field| self.unit.decls[field].ident())
                    .map(|ident| self.unit.interner.resolve(ident.name).to_string())
                    .collect();

                for name in names {
                    values.push(self.unit.exprs.alloc(Expr::StringLiteral(StringLiteral {
                        ast: None,
                        ty: None,
                        value: name,
                    })));
                }
            }
        }

        Expr::ArrayLiteral(ArrayLiteral {
            ast: None,
            ty: None,
            values,
        })
    }

    fn compute_meta_variants(&mut self, ty: ExprId) -> Expr<'a> {
        let mut values = Vec::new();

        if let Some(decl) = self.unit.type_as_decl(ty) {
            if let Decl::EnumDef(def) = self.unit.decls[decl].clone() {
                for variant in def.variants {
                    let Decl::EnumVariant(variant) = self.unit.decls[variant].clone() else {
                        continue;
                    };

                    let name = self
                        .unit
                        .interner
                        .resolve(variant.ident.name)
                        .to_string();
                    let name_expr = self.unit.exprs.alloc(Expr::StringLiteral(StringLiteral {
                        ast: None,
                        ty: None,
                        value: name,
                    }));

                    let mut exprs = vec![name_expr];
                    if let Some(value) = variant.value {
                        exprs.push(value);
                    }

                    values.push(self.unit.exprs.alloc(Expr::Tuple(TupleExpr {
                        ast: None,
                        ty: None,
                        exprs,
                    })));
                }
            }
        }

        Expr::ArrayLiteral(ArrayLiteral {
            ast: None,
            ty: None,
            values,
        })
    }

    /// Layout oracle: byte sizes on a 64-bit target.
    pub(crate) fn compute_size(&self, ty: ExprId) -> i64 {
        match &self.unit.exprs[ty] {
            Expr::PrimitiveType(p) => match p.primitive {
                Primitive::I8 | Primitive::U8 | Primitive::Bool => 1,
                Primitive::I16 | Primitive::U16 => 2,
                Primitive::I32 | Primitive::U32 | Primitive::F32 => 4,
                Primitive::I64
                | Primitive::U64
                | Primitive::Usize
                | Primitive::F64
                | Primitive::Addr => 8,
                Primitive::Void => 0,
            },
            Expr::PointerType(_) | Expr::FuncType(_) | Expr::ReferenceType(_) => 8,
            Expr::StaticArrayType(array) => {
                let length = match &self.unit.exprs[array.length] {
                    Expr::IntLiteral(literal) => literal.value,
                    _ => 0,
                };
                self.compute_size(array.base) * length
            }
            Expr::Tuple(tuple) => tuple.exprs.iter().map(|&e| self.compute_size(e)).sum(),
            Expr::SymbolExpr(symbol_expr) => {
                match self.unit.resolve_use_symbol(symbol_expr.symbol) {
                    Symbol::Decl(decl) => match &self.unit.decls[decl] {
                        Decl::StructDef(def) => {
                            let field_sizes = def.fields.iter().map(|&field| {
                                match &self.unit.decls[field] {
                                    Decl::StructField(f) => self.compute_size(f.ty),
                                    _ => 0,
                                }
                            });
                            if def.attrs.overlapping {
                                field_sizes.max().unwrap_or(0)
                            } else {
                                field_sizes.sum()
                            }
                        }
                        Decl::EnumDef(_) => 4,
                        Decl::UnionDef(def) => {
                            let case_sizes = def.cases.iter().map(|&case| {
                                match &self.unit.decls[case] {
                                    Decl::UnionCase(c) => c
                                        .fields
                                        .iter()
                                        .map(|f| self.compute_size(f.ty))
                                        .sum::<i64>(),
                                    _ => 0,
                                }
                            });
                            4 + case_sizes.max().unwrap_or(0)
                        }
                        _ => 0,
                    },
                    _ => 0,
                }
            }
            Expr::ClosureType(_) => 16,
            _ => 0,
        }
    }
}

fn bool_expr<'a>(value: bool) -> Expr<'a> {
    Expr::BoolLiteral(BoolLiteral {
        ast: None,
        ty: None,
        value,
    })
}
