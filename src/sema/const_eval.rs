//! Compile-time evaluation over already-analyzed expressions: literal
//! arithmetic, constant and enum-variant lookup, type values, and the
//! `meta(...)` reflection operators.

use crate::sir::cloner::Cloner;
use crate::sir::{
    ArrayLiteral, BinaryOp, BoolLiteral, Decl, Expr, ExprId, FpLiteral, IntLiteral, Symbol,
    TupleExpr, UnaryOp,
};

use super::{AnalysisError, SemanticAnalyzer};

impl<'u, 'a> SemanticAnalyzer<'u, 'a> {
    /// Evaluate to a literal/type-value expression. Reports "value is not
    /// known at compile time" on anything unsupported.
    pub(crate) fn const_eval(&mut self, expr: ExprId) -> Result<ExprId, AnalysisError> {
        match self.unit.exprs[expr].clone() {
            Expr::IntLiteral(_)
            | Expr::FpLiteral(_)
            | Expr::BoolLiteral(_)
            | Expr::CharLiteral(_)
            | Expr::StringLiteral(_)
            | Expr::PrimitiveType(_)
            | Expr::PointerType(_)
            | Expr::StaticArrayType(_)
            | Expr::FuncType(_)
            | Expr::OptionalType(_)
            | Expr::ResultType(_)
            | Expr::ArrayType(_)
            | Expr::MapType(_)
            | Expr::ClosureType(_)
            | Expr::ReferenceType(_) => Ok(expr),

            Expr::Coercion(coercion) => self.const_eval(coercion.value),

            Expr::ArrayLiteral(array) => {
                let mut values = Vec::with_capacity(array.values.len());
                for value in array.values {
                    values.push(self.const_eval(value)?);
                }
                Ok(self.unit.exprs.alloc(Expr::ArrayLiteral(ArrayLiteral {
                    ast: array.ast,
                    ty: array.ty,
                    values,
                })))
            }

            Expr::Tuple(tuple) => {
                let mut exprs = Vec::with_capacity(tuple.exprs.len());
                for value in tuple.exprs {
                    exprs.push(self.const_eval(value)?);
                }
                Ok(self.unit.exprs.alloc(Expr::Tuple(TupleExpr {
                    ast: tuple.ast,
                    ty: tuple.ty,
                    exprs,
                })))
            }

            Expr::SymbolExpr(symbol_expr) => {
                match self.unit.resolve_use_symbol(symbol_expr.symbol) {
                    Symbol::Decl(decl) => match &self.unit.decls[decl] {
                        Decl::ConstDef(def) => {
                            let value = def.value;
                            let evaluated = self.const_eval(value)?;
                            Ok(Cloner::new(self.unit).clone_expr(evaluated))
                        }
                        Decl::EnumVariant(variant) => {
                            let value = variant.value.ok_or(AnalysisError)?;
                            let evaluated = self.const_eval(value)?;
                            Ok(Cloner::new(self.unit).clone_expr(evaluated))
                        }
                        Decl::StructDef(_) | Decl::EnumDef(_) | Decl::UnionDef(_) => Ok(expr),
                        _ => Ok(expr),
                    },
                    // Locals and params are opaque but keep their identity,
                    // which `meta for` needs for tuple iteration.
                    _ => Ok(expr),
                }
            }

            Expr::Binary(binary) => self.const_eval_binary(expr, binary.op, binary.lhs, binary.rhs),

            Expr::Unary(unary) => self.const_eval_unary(expr, unary.op, unary.value),

            Expr::MetaField(_) | Expr::MetaCall(_) => self.eval_meta_expr(expr),

            _ => {
                self.err_compile_time_unknown(expr);
                Err(AnalysisError)
            }
        }
    }

    fn const_eval_binary(
        &mut self,
        expr: ExprId,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    ) -> Result<ExprId, AnalysisError> {
        let lhs = self.const_eval(lhs)?;
        let rhs = self.const_eval(rhs)?;

        if let (Expr::IntLiteral(a), Expr::IntLiteral(b)) =
            (&self.unit.exprs[lhs], &self.unit.exprs[rhs])
        {
            let (a, b) = (a.value, b.value);
            let int = |value| {
                Expr::IntLiteral(IntLiteral {
                    ast: None,
                    ty: None,
                    value,
                })
            };

            let result = match op {
                BinaryOp::Add => int(a.wrapping_add(b)),
                BinaryOp::Sub => int(a.wrapping_sub(b)),
                BinaryOp::Mul => int(a.wrapping_mul(b)),
                BinaryOp::Div if b != 0 => int(a.wrapping_div(b)),
                BinaryOp::Mod if b != 0 => int(a.wrapping_rem(b)),
                BinaryOp::Eq => bool_literal(a == b),
                BinaryOp::Ne => bool_literal(a != b),
                BinaryOp::Lt => bool_literal(a < b),
                BinaryOp::Gt => bool_literal(a > b),
                BinaryOp::Le => bool_literal(a <= b),
                BinaryOp::Ge => bool_literal(a >= b),
                _ => {
                    self.err_compile_time_unknown(expr);
                    return Err(AnalysisError);
                }
            };
            return Ok(self.unit.exprs.alloc(result));
        }

        if let (Expr::BoolLiteral(a), Expr::BoolLiteral(b)) =
            (&self.unit.exprs[lhs], &self.unit.exprs[rhs])
        {
            let (a, b) = (a.value, b.value);
            let result = match op {
                BinaryOp::And => bool_literal(a && b),
                BinaryOp::Or => bool_literal(a || b),
                BinaryOp::Eq => bool_literal(a == b),
                BinaryOp::Ne => bool_literal(a != b),
                _ => {
                    self.err_compile_time_unknown(expr);
                    return Err(AnalysisError);
                }
            };
            return Ok(self.unit.exprs.alloc(result));
        }

        if self.unit.is_type_expr(lhs) && self.unit.is_type_expr(rhs) {
            let equal = self.unit.types_equal(lhs, rhs);
            let result = match op {
                BinaryOp::Eq => bool_literal(equal),
                BinaryOp::Ne => bool_literal(!equal),
                _ => {
                    self.err_compile_time_unknown(expr);
                    return Err(AnalysisError);
                }
            };
            return Ok(self.unit.exprs.alloc(result));
        }

        self.err_compile_time_unknown(expr);
        Err(AnalysisError)
    }

    fn const_eval_unary(
        &mut self,
        expr: ExprId,
        op: UnaryOp,
        value: ExprId,
    ) -> Result<ExprId, AnalysisError> {
        let value = self.const_eval(value)?;

        let result = match (&self.unit.exprs[value], op) {
            (Expr::IntLiteral(literal), UnaryOp::Neg) => Expr::IntLiteral(IntLiteral {
                ast: None,
                ty: None,
                value: -literal.value,
            }),
            (Expr::FpLiteral(literal), UnaryOp::Neg) => Expr::FpLiteral(FpLiteral {
                ast: None,
                ty: None,
                value: -literal.value,
            }),
            (Expr::BoolLiteral(literal), UnaryOp::Not) => bool_literal(!literal.value),
            _ => {
                self.err_compile_time_unknown(expr);
                return Err(AnalysisError);
            }
        };

        Ok(self.unit.exprs.alloc(result))
    }

    pub(crate) fn const_eval_int(&mut self, expr: ExprId) -> Option<i64> {
        let evaluated = self.const_eval(expr).ok()?;
        match &self.unit.exprs[evaluated] {
            Expr::IntLiteral(literal) => Some(literal.value),
            _ => None,
        }
    }

    /// Evaluate a meta condition. Unknown values have already been
    /// reported; they count as false so analysis continues.
    pub(crate) fn const_eval_bool(&mut self, expr: ExprId) -> bool {
        let Ok(evaluated) = self.const_eval(expr) else {
            return false;
        };
        match &self.unit.exprs[evaluated] {
            Expr::BoolLiteral(literal) => literal.value,
            _ => false,
        }
    }
}

fn bool_literal<'a>(value: bool) -> Expr<'a> {
    Expr::BoolLiteral(BoolLiteral {
        ast: None,
        ty: None,
        value,
    })
}
