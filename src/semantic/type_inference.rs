//! Best-effort static types for expressions.
//!
//! Inference never fails loudly: an expression whose type cannot be worked out is
//! simply left untyped, and later stages treat it as unknown.

use crate::ast::*;

use super::scope::builtin_of;

/// Literal types are fixed by their syntax.
pub fn literal_type(kind: &ExprKind) -> Option<ExprType> {
    let builtin = match kind {
        ExprKind::Int(_) | ExprKind::Hex(_) => BuiltinType::Integer,
        ExprKind::Float(_) => BuiltinType::Double,
        ExprKind::Str(s) if s.chars().count() == 1 => BuiltinType::Char,
        ExprKind::Str(_) => BuiltinType::String,
        ExprKind::Symbol(SpecialSymbol::True | SpecialSymbol::False) => BuiltinType::Boolean,
        _ => return None,
    };
    Some(ExprType::Builtin(builtin))
}

/// Rank of a numeric built-in in the promotion order Integer < Int64 < Double.
fn numeric_rank(ty: BuiltinType) -> Option<u8> {
    match ty {
        BuiltinType::Char | BuiltinType::Integer => Some(0),
        BuiltinType::Int64 => Some(1),
        BuiltinType::Double => Some(2),
        _ => None,
    }
}

/// The wider of two numeric types, or `None` when either is not numeric.
pub fn common_numeric(lhs: BuiltinType, rhs: BuiltinType) -> Option<BuiltinType> {
    let (l, r) = (numeric_rank(lhs)?, numeric_rank(rhs)?);
    Some(match l.max(r) {
        0 => BuiltinType::Integer,
        1 => BuiltinType::Int64,
        _ => BuiltinType::Double,
    })
}

/// Type of `lhs op rhs` given the operand types.
pub fn binary_type(ast: &Ast, op: BinaryOp, lhs: Option<ExprType>, rhs: Option<ExprType>) -> Option<ExprType> {
    if op.is_comparison() {
        return Some(ExprType::Builtin(BuiltinType::Boolean));
    }
    if op == BinaryOp::As {
        return rhs;
    }
    let l = builtin_of(ast, lhs);
    let r = builtin_of(ast, rhs);
    let builtin = match op {
        BinaryOp::Divide => BuiltinType::Double,
        BinaryOp::IntDiv | BinaryOp::Mod | BinaryOp::Shl | BinaryOp::Shr => {
            if l == Some(BuiltinType::Int64) || r == Some(BuiltinType::Int64) {
                BuiltinType::Int64
            } else {
                BuiltinType::Integer
            }
        }
        BinaryOp::Add if l == Some(BuiltinType::String) || r == Some(BuiltinType::String) => BuiltinType::String,
        BinaryOp::Add if l == Some(BuiltinType::Char) && r == Some(BuiltinType::Char) => BuiltinType::String,
        BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply => common_numeric(l?, r?)?,
        BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => match (l?, r?) {
            (BuiltinType::Boolean, BuiltinType::Boolean) => BuiltinType::Boolean,
            (a, b) => common_numeric(a, b)?,
        },
        // a range has the type of its bounds
        BinaryOp::Interval => return lhs,
        _ => return None,
    };
    Some(ExprType::Builtin(builtin))
}

/// Type of a prefix operation.
pub fn unary_type(ast: &Ast, op: UnaryOp, operand: Option<ExprType>) -> Option<ExprType> {
    match op {
        UnaryOp::Not => builtin_of(ast, operand).map(ExprType::Builtin),
        UnaryOp::Positive | UnaryOp::Negative => operand,
        UnaryOp::AddressOf => None,
    }
}

/// Whether an operand of `and`/`or`/`xor`/`not` is an integer, making the operator bitwise.
pub fn is_integral(ast: &Ast, ty: Option<ExprType>) -> bool {
    matches!(builtin_of(ast, ty), Some(BuiltinType::Integer | BuiltinType::Int64))
}

/// Whether `and`/`or` over these operands is bitwise: one side is an integer and
/// neither side is known to be Boolean. An untyped side takes the other side's kind.
pub fn is_bitwise_pair(ast: &Ast, lhs: Option<ExprType>, rhs: Option<ExprType>) -> bool {
    let boolean = |ty| builtin_of(ast, ty) == Some(BuiltinType::Boolean);
    (is_integral(ast, lhs) || is_integral(ast, rhs)) && !boolean(lhs) && !boolean(rhs)
}
