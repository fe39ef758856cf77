//! Pretty-printing of SIR expressions for diagnostics. Types print in
//! surface syntax; values print a best-effort sketch.

use super::{Decl, Expr, ExprId, PseudoTypeKind, Symbol, Unit};

pub fn print_expr(unit: &Unit, expr: ExprId) -> String {
    match &unit.exprs[expr] {
        Expr::IntLiteral(e) => e.value.to_string(),
        Expr::FpLiteral(e) => e.value.to_string(),
        Expr::BoolLiteral(e) => e.value.to_string(),
        Expr::CharLiteral(e) => format!("'{}'", e.value),
        Expr::NullLiteral(_) => "null".to_string(),
        Expr::NoneLiteral(_) => "none".to_string(),
        Expr::UndefinedLiteral(_) => "undefined".to_string(),
        Expr::StringLiteral(e) => format!("\"{}\"", e.value),
        Expr::ArrayLiteral(e) => {
            let values: Vec<String> = e.values.iter().map(|&v| print_expr(unit, v)).collect();
            format!("[{}]", values.join(", "))
        }
        Expr::Tuple(e) => {
            let exprs: Vec<String> = e.exprs.iter().map(|&v| print_expr(unit, v)).collect();
            format!("({})", exprs.join(", "))
        }
        Expr::SymbolExpr(e) => print_symbol(unit, e.symbol),
        Expr::PrimitiveType(e) => e.primitive.name().to_string(),
        Expr::PointerType(e) => format!("*{}", print_expr(unit, e.base)),
        Expr::ReferenceType(e) => {
            if e.mutable {
                format!("ref mut {}", print_expr(unit, e.base))
            } else {
                format!("ref {}", print_expr(unit, e.base))
            }
        }
        Expr::StaticArrayType(e) => format!(
            "[{}; {}]",
            print_expr(unit, e.base),
            print_expr(unit, e.length)
        ),
        Expr::FuncType(e) => {
            let params: Vec<String> = e.params.iter().map(|p| print_expr(unit, p.ty)).collect();
            format!(
                "func({}) -> {}",
                params.join(", "),
                print_expr(unit, e.return_type)
            )
        }
        Expr::OptionalType(e) => format!("?{}", print_expr(unit, e.base)),
        Expr::ResultType(e) => format!(
            "{} except {}",
            print_expr(unit, e.value_type),
            print_expr(unit, e.error_type)
        ),
        Expr::ArrayType(e) => format!("Array[{}]", print_expr(unit, e.base)),
        Expr::MapType(e) => format!(
            "Map[{}, {}]",
            print_expr(unit, e.key),
            print_expr(unit, e.value)
        ),
        Expr::ClosureType(e) => {
            let func = unit.func_type(e.func_type);
            match func {
                Some(func) => {
                    let params: Vec<String> =
                        func.params.iter().map(|p| print_expr(unit, p.ty)).collect();
                    format!(
                        "|{}| -> {}",
                        params.join(", "),
                        print_expr(unit, func.return_type)
                    )
                }
                None => "|..|".to_string(),
            }
        }
        Expr::PseudoType(kind) => match kind {
            PseudoTypeKind::IntLiteral => "int literal".to_string(),
            PseudoTypeKind::FpLiteral => "float literal".to_string(),
            PseudoTypeKind::BoolLiteral => "bool literal".to_string(),
            PseudoTypeKind::NullLiteral => "null".to_string(),
            PseudoTypeKind::ArrayLiteral => "array literal".to_string(),
            PseudoTypeKind::MapLiteral => "map literal".to_string(),
            PseudoTypeKind::StringLiteral => "string literal".to_string(),
        },
        Expr::Ident(e) => unit.interner.resolve(e.value).to_string(),
        Expr::Dot(e) => format!(
            "{}.{}",
            print_expr(unit, e.lhs),
            unit.interner.resolve(e.rhs.name)
        ),
        Expr::Star(e) => format!("*{}", print_expr(unit, e.value)),
        Expr::Field(e) => format!("{}.{}", print_expr(unit, e.base), e.field_index),
        Expr::Call(e) => {
            let args: Vec<String> = e.args.iter().map(|&a| print_expr(unit, a)).collect();
            format!("{}({})", print_expr(unit, e.callee), args.join(", "))
        }
        Expr::Coercion(e) => print_expr(unit, e.value),
        Expr::Init(e) => print_expr(unit, e.value),
        Expr::Move(e) => print_expr(unit, e.value),
        Expr::Deinit(e) => print_expr(unit, e.value),
        _ => "<expr>".to_string(),
    }
}

pub fn print_symbol(unit: &Unit, symbol: Symbol) -> String {
    match unit.resolve_use_symbol(symbol) {
        Symbol::Module(id) => unit.modules[id].path.display(&unit.interner),
        symbol @ Symbol::Decl(decl) => {
            let name = unit.interner.resolve(unit.symbol_name(symbol)).to_string();
            // Specializations print with their argument list.
            if let Decl::StructDef(def) = &unit.decls[decl] {
                if let Some((generic_def, index)) = def.parent_specialization {
                    if let Decl::StructDef(generic) = &unit.decls[generic_def] {
                        let args: Vec<String> = generic.specializations[index as usize]
                            .args
                            .iter()
                            .map(|&a| print_expr(unit, a))
                            .collect();
                        return format!("{}[{}]", name, args.join(", "));
                    }
                }
            }
            name
        }
        other => unit.interner.resolve(unit.symbol_name(other)).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sir::{Primitive, PrimitiveType, PointerType};

    #[test]
    fn prints_pointer_to_primitive() {
        let mut unit = Unit::new();
        let base = unit.exprs.alloc(Expr::PrimitiveType(PrimitiveType {
            ast: None,
            primitive: Primitive::U8,
        }));
        let ptr = unit
            .exprs
            .alloc(Expr::PointerType(PointerType { ast: None, base }));

        assert_eq!(print_expr(&unit, ptr), "*u8");
    }

    #[test]
    fn prints_pseudo_types_by_literal_kind() {
        let mut unit = Unit::new();
        let pseudo = unit.exprs.alloc(Expr::PseudoType(PseudoTypeKind::IntLiteral));
        assert_eq!(print_expr(&unit, pseudo), "int literal");
    }
}
