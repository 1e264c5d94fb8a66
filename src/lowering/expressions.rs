//! Expression lowering.

use crate::ast::*;
use crate::semantic::type_inference::{is_bitwise_pair, is_integral};
use crate::target::*;

use super::Lowerer;
use super::types::{object_type, primitive_name, rename_type};

fn binary_op(op: BinaryOp) -> Option<CsBinaryOp> {
    let lowered = match op {
        BinaryOp::As => CsBinaryOp::As,
        BinaryOp::Is => CsBinaryOp::Is,
        BinaryOp::Multiply => CsBinaryOp::Mul,
        BinaryOp::Divide | BinaryOp::IntDiv => CsBinaryOp::Div,
        BinaryOp::Mod => CsBinaryOp::Rem,
        BinaryOp::Shl => CsBinaryOp::Shl,
        BinaryOp::Shr => CsBinaryOp::Shr,
        BinaryOp::Add => CsBinaryOp::Add,
        BinaryOp::Subtract => CsBinaryOp::Sub,
        BinaryOp::Equal => CsBinaryOp::Eq,
        BinaryOp::NotEqual => CsBinaryOp::Ne,
        BinaryOp::Less => CsBinaryOp::Lt,
        BinaryOp::Greater => CsBinaryOp::Gt,
        BinaryOp::LessEqual => CsBinaryOp::Le,
        BinaryOp::GreaterEqual => CsBinaryOp::Ge,
        BinaryOp::And => CsBinaryOp::And,
        BinaryOp::Or => CsBinaryOp::Or,
        BinaryOp::Xor => CsBinaryOp::BitXor,
        BinaryOp::Interval | BinaryOp::In => return None,
    };
    Some(lowered)
}

impl Lowerer<'_> {
    pub(crate) fn lower_expr(&mut self, expr: &Expr) -> CsExpr {
        self.lower_expr_as(expr, false)
    }

    /// Whether `expr` names a procedure or function.
    pub(crate) fn is_routine(&self, expr: &Expr) -> bool {
        expr.decl().is_some_and(|id| self.ast.get(id).as_procedure().is_some())
    }

    /// Lowers `expr`; a routine named outside callee position is called with no
    /// arguments, as Pascal allows.
    fn lower_expr_as(&mut self, expr: &Expr, callee: bool) -> CsExpr {
        let lowered = match &expr.kind {
            ExprKind::Paren(items) => match items.as_slice() {
                [single] => self.lower_expr(single),
                _ => CsExpr::Tuple(items.iter().map(|item| self.lower_expr(item)).collect()),
            },
            ExprKind::Brackets(items) => CsExpr::SetOf(items.iter().map(|item| self.lower_expr(item)).collect()),
            ExprKind::Int(v) => CsExpr::Int(*v),
            ExprKind::Hex(v) => CsExpr::Hex(*v),
            ExprKind::Str(s) => CsExpr::Str(s.clone()),
            ExprKind::Float(v) => CsExpr::Float(*v),
            ExprKind::Symbol(SpecialSymbol::Nil | SpecialSymbol::Null) => CsExpr::Null,
            ExprKind::Symbol(SpecialSymbol::True) => CsExpr::Bool(true),
            ExprKind::Symbol(SpecialSymbol::False) => CsExpr::Bool(false),
            ExprKind::Name(r) => self.lower_name(r),
            ExprKind::Member { base, name } => {
                let base = self.lower_expr(base);
                CsExpr::member(base, self.spelling(name))
            }
            ExprKind::Call { base, args } => return self.lower_call(base, args),
            ExprKind::Index { base, args } => CsExpr::Index {
                base: Box::new(self.lower_expr(base)),
                args: args.iter().map(|arg| self.lower_expr(arg)).collect(),
            },
            // pointers are references in C#
            ExprKind::Deref { base } => return self.lower_expr_as(base, callee),
            ExprKind::Unary { op, operand } => self.lower_unary(*op, operand),
            ExprKind::Binary { op, lhs, rhs } => self.lower_binary(*op, lhs, rhs),
        };
        if !callee && self.is_routine(expr) {
            CsExpr::call(lowered, Vec::new())
        } else {
            lowered
        }
    }

    /// The declared spelling of a bound name, else the name as written.
    fn spelling(&self, r: &Ref) -> String {
        match r.decl {
            Some(id) if !self.ast.name_of(id).is_empty() => self.ast.name_of(id).to_string(),
            _ => r.name.clone(),
        }
    }

    fn lower_name(&mut self, r: &Ref) -> CsExpr {
        let Some(id) = r.decl else {
            if r.name.eq_ignore_ascii_case("Self") {
                return CsExpr::This;
            }
            return CsExpr::name(r.name.clone());
        };
        match &self.ast.get(id).kind {
            // enum constants are qualified by their enum
            DeclKind::EnumConst { owner } => {
                CsExpr::member(CsExpr::name(self.ast.name_of(*owner)), self.spelling(r))
            }
            _ => CsExpr::name(self.spelling(r)),
        }
    }

    /// `T(x)` with a type `T` is a cast; anything else is a call.
    fn lower_call(&mut self, base: &Expr, args: &[Expr]) -> CsExpr {
        if let [value] = args
            && let Some(ty) = self.cast_target(base)
        {
            return CsExpr::Cast {
                ty,
                value: Box::new(self.lower_expr(value)),
            };
        }
        CsExpr::call(
            self.lower_expr_as(base, true),
            args.iter().map(|arg| self.lower_expr(arg)).collect(),
        )
    }

    fn cast_target(&mut self, base: &Expr) -> Option<CsType> {
        match base.decl() {
            Some(id) if self.ast.get(id).is_type() => self.lower_type_ref(&Ref::to(id)),
            Some(_) => None,
            None => match &base.kind {
                ExprKind::Name(r) => primitive_name(&r.name).map(CsType::named),
                _ => None,
            },
        }
    }

    /// Right operand of `is`/`as`.
    fn type_operand(&mut self, expr: &Expr) -> CsType {
        match expr.decl() {
            Some(id) => self.lower_type_ref(&Ref::to(id)).unwrap_or_else(object_type),
            None => expr.ident().map(rename_type).map_or_else(object_type, CsType::Named),
        }
    }

    fn lower_unary(&mut self, op: UnaryOp, operand: &Expr) -> CsExpr {
        let op = match op {
            UnaryOp::AddressOf => return self.lower_expr_as(operand, true),
            UnaryOp::Not if is_integral(self.ast, operand.ty) => CsUnaryOp::BitNot,
            UnaryOp::Not => CsUnaryOp::Not,
            UnaryOp::Positive => CsUnaryOp::Plus,
            UnaryOp::Negative => CsUnaryOp::Minus,
        };
        CsExpr::Unary {
            op,
            operand: Box::new(self.lower_expr(operand)),
        }
    }

    fn lower_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> CsExpr {
        let lowered = match binary_op(op) {
            Some(lowered) => lowered,
            None if op == BinaryOp::In => {
                return CsExpr::Belongs {
                    value: Box::new(self.lower_expr(lhs)),
                    set: Box::new(self.lower_expr(rhs)),
                };
            }
            None => {
                return CsExpr::Range {
                    lo: Box::new(self.lower_expr(lhs)),
                    hi: Box::new(self.lower_expr(rhs)),
                };
            }
        };
        let bitwise = op.is_logical() && is_bitwise_pair(self.ast, lhs.ty, rhs.ty);
        let lowered = match lowered {
            CsBinaryOp::And if bitwise => CsBinaryOp::BitAnd,
            CsBinaryOp::Or if bitwise => CsBinaryOp::BitOr,
            other => other,
        };
        let lhs = self.lower_expr(lhs);
        let rhs = match op {
            BinaryOp::As | BinaryOp::Is => CsExpr::TypeName(self.type_operand(rhs)),
            _ => self.lower_expr(rhs),
        };
        CsExpr::Binary {
            op: lowered,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }
}
