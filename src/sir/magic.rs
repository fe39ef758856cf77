//! Fixed method names the analyzer resolves operators and protocols
//! against. The names are part of the language's compatibility surface.

use crate::intern::{Interner, Name};

use super::{BinaryOp, UnaryOp};

#[derive(Debug, Clone, Copy)]
pub struct MagicMethods {
    pub op_add: Name,
    pub op_sub: Name,
    pub op_mul: Name,
    pub op_div: Name,
    pub op_mod: Name,
    pub op_bit_and: Name,
    pub op_bit_or: Name,
    pub op_bit_xor: Name,
    pub op_shl: Name,
    pub op_shr: Name,
    pub op_eq: Name,
    pub op_ne: Name,
    pub op_gt: Name,
    pub op_lt: Name,
    pub op_ge: Name,
    pub op_le: Name,
    pub op_neg: Name,
    pub op_bit_not: Name,
    pub op_deref: Name,
    pub op_index: Name,
    pub op_mut_index: Name,
    pub iter: Name,
    pub ref_iter: Name,
    pub mut_iter: Name,
    pub next: Name,
    pub deinit: Name,
    pub new: Name,
}

impl MagicMethods {
    pub fn intern(interner: &mut Interner) -> Self {
        Self {
            op_add: interner.intern("__add__"),
            op_sub: interner.intern("__sub__"),
            op_mul: interner.intern("__mul__"),
            op_div: interner.intern("__div__"),
            op_mod: interner.intern("__mod__"),
            op_bit_and: interner.intern("__bitand__"),
            op_bit_or: interner.intern("__bitor__"),
            op_bit_xor: interner.intern("__bitxor__"),
            op_shl: interner.intern("__shl__"),
            op_shr: interner.intern("__shr__"),
            op_eq: interner.intern("__eq__"),
            op_ne: interner.intern("__ne__"),
            op_gt: interner.intern("__gt__"),
            op_lt: interner.intern("__lt__"),
            op_ge: interner.intern("__ge__"),
            op_le: interner.intern("__le__"),
            op_neg: interner.intern("__neg__"),
            op_bit_not: interner.intern("__bitnot__"),
            op_deref: interner.intern("__deref__"),
            op_index: interner.intern("__index__"),
            op_mut_index: interner.intern("__mutindex__"),
            iter: interner.intern("__iter__"),
            ref_iter: interner.intern("__refiter__"),
            mut_iter: interner.intern("__mutiter__"),
            next: interner.intern("__next__"),
            deinit: interner.intern("__deinit__"),
            new: interner.intern("new"),
        }
    }

    pub fn for_binary_op(&self, op: BinaryOp) -> Name {
        match op {
            BinaryOp::Add => self.op_add,
            BinaryOp::Sub => self.op_sub,
            BinaryOp::Mul => self.op_mul,
            BinaryOp::Div => self.op_div,
            BinaryOp::Mod => self.op_mod,
            BinaryOp::BitAnd => self.op_bit_and,
            BinaryOp::BitOr => self.op_bit_or,
            BinaryOp::BitXor => self.op_bit_xor,
            BinaryOp::Shl => self.op_shl,
            BinaryOp::Shr => self.op_shr,
            BinaryOp::Eq => self.op_eq,
            BinaryOp::Ne => self.op_ne,
            BinaryOp::Gt => self.op_gt,
            BinaryOp::Lt => self.op_lt,
            BinaryOp::Ge => self.op_ge,
            BinaryOp::Le => self.op_le,
            BinaryOp::And | BinaryOp::Or => unreachable!("logical ops have no overloads"),
        }
    }

    pub fn for_unary_op(&self, op: UnaryOp) -> Name {
        match op {
            UnaryOp::Neg => self.op_neg,
            UnaryOp::BitNot => self.op_bit_not,
            UnaryOp::Deref => self.op_deref,
            UnaryOp::Ref | UnaryOp::Not => unreachable!("ref and not have no overloads"),
        }
    }
}
