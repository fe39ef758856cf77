//! Overload resolution: pick the first function in a set whose parameter
//! types match the argument types, with a limited coercion allowance for
//! pseudo-typed literals.

use crate::sir::{Decl, DeclId, Expr, ExprId, OverloadSetId, PseudoTypeKind};

use super::SemanticAnalyzer;

impl<'u, 'a> SemanticAnalyzer<'u, 'a> {
    pub(crate) fn resolve_overload(
        &self,
        set: OverloadSetId,
        args: &[ExprId],
    ) -> Option<DeclId> {
        self.unit.overload_sets[set]
            .func_defs
            .iter()
            .copied()
            .find(|&func| self.is_matching_overload(func, args))
    }

    pub(crate) fn overload_candidates(
        &self,
        set: OverloadSetId,
    ) -> Vec<(crate::ast::AstRef<'a>, String)> {
        self.unit.overload_sets[set]
            .func_defs
            .iter()
            .filter_map(|&func| match &self.unit.decls[func] {
                Decl::FuncDef(def) => Some((
                    def.ident.ast,
                    crate::sir::printer::print_expr(self.unit, def.ty),
                )),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn is_matching_overload(&self, func: DeclId, args: &[ExprId]) -> bool {
        let Decl::FuncDef(def) = &self.unit.decls[func] else {
            return false;
        };
        let Some(func_type) = self.unit.func_type(def.ty) else {
            return false;
        };

        if func_type.params.len() != args.len() {
            return false;
        }

        func_type.params.iter().zip(args.iter()).all(|(param, &arg)| {
            let Some(arg_ty) = self.unit.expr_type(arg) else {
                return false;
            };

            // Reference parameters match against their base type.
            let param_ty = match &self.unit.exprs[param.ty] {
                Expr::ReferenceType(reference) => reference.base,
                _ => param.ty,
            };

            self.unit.types_equal(arg_ty, param_ty) || self.is_coercible(arg_ty, param_ty)
        })
    }

    /// Pseudo-typed literals may coerce to a parameter during overload
    /// matching; anything concrete must match exactly.
    fn is_coercible(&self, arg_ty: ExprId, param_ty: ExprId) -> bool {
        let Expr::PseudoType(kind) = &self.unit.exprs[arg_ty] else {
            return false;
        };

        match kind {
            PseudoTypeKind::IntLiteral => {
                self.unit.is_int_type(param_ty) || self.unit.is_addr_like_type(param_ty)
            }
            PseudoTypeKind::FpLiteral => self.unit.is_fp_type(param_ty),
            PseudoTypeKind::BoolLiteral => self.unit.is_bool_type(param_ty),
            PseudoTypeKind::NullLiteral => self.unit.is_addr_like_type(param_ty),
            PseudoTypeKind::StringLiteral => {
                if self.unit.is_u8_ptr_type(param_ty) {
                    return true;
                }
                match self.unit.type_as_struct(param_ty) {
                    Some(decl) => match &self.unit.decls[decl] {
                        Decl::StructDef(def) => {
                            let name = self.unit.interner.resolve(def.ident.name);
                            name == "String" || name == "StringSlice"
                        }
                        _ => false,
                    },
                    None => false,
                }
            }
            PseudoTypeKind::ArrayLiteral | PseudoTypeKind::MapLiteral => false,
        }
    }
}
