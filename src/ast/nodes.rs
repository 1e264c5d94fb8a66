//! Declaration, statement and expression variants of the source tree.

use bitflags::bitflags;

use super::{DeclId, Ref};
use crate::source::Position;

/// Member and unit-level visibility as written in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Default,
    Private,
    Protected,
    Public,
    Published,
}

#[derive(Debug, Clone)]
pub enum DeclKind {
    Unit(UnitDecl),
    Type(TypeDecl),
    Var(VarDecl),
    Const(ConstDecl),
    Param(ParamDecl),
    Procedure(ProcedureDecl),
    Property(PropertyDecl),
    EnumConst { owner: DeclId },
}

/// Whether the root is a `unit` or a `program`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnitKind {
    #[default]
    Unit,
    Program,
}

#[derive(Debug, Clone, Default)]
pub struct UnitDecl {
    pub kind: UnitKind,
    pub interface_uses: Vec<String>,
    pub implementation_uses: Vec<String>,
    pub interface: Vec<DeclId>,
    pub implementation: Vec<DeclId>,
    pub initialization: Vec<Stmt>,
    pub finalization: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum TypeDecl {
    Enum {
        consts: Vec<DeclId>,
    },
    Array {
        packed: bool,
        /// Empty for an open or dynamic array.
        ranges: Vec<Expr>,
        item: Ref,
    },
    Set {
        item: Ref,
    },
    Record {
        packed: bool,
        fields: Vec<DeclId>,
    },
    Pointer {
        target: Ref,
    },
    StringAlias {
        max_len: Option<Expr>,
    },
    Alias {
        target: Ref,
    },
    ProcedureType(ProcedureSignature),
    Class(ClassDecl),
    Metaclass {
        class: Ref,
    },
}

/// Parameters and result of a procedural type
#[derive(Debug, Clone, Default)]
pub struct ProcedureSignature {
    pub params: Vec<DeclId>,
    pub return_type: Option<Ref>,
    pub of_object: bool,
    pub stdcall: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ClassDecl {
    pub forward: bool,
    pub is_interface: bool,
    pub ancestor: Option<Ref>,
    pub interfaces: Vec<Ref>,
    pub members: Vec<DeclId>,
}

#[derive(Debug, Clone)]
pub struct VarDecl {
    pub type_ref: Ref,
    pub initial: Option<Expr>,
    /// Introduced by an inline `var` statement rather than a declaration section.
    pub inline: bool,
}

#[derive(Debug, Clone)]
pub struct ConstDecl {
    pub type_ref: Option<Ref>,
    pub value: Expr,
}

/// Parameter passing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamBinding {
    #[default]
    Copy,
    Const,
    Var,
    In,
    Out,
}

#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub binding: ParamBinding,
    /// `None` for untyped `var`/`const` parameters.
    pub type_ref: Option<Ref>,
    pub default: Option<Expr>,
}

/// Which keyword introduced a routine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Approach {
    Procedure,
    Function,
    Constructor,
    Destructor,
}

bitflags! {
    /// Directives written after a routine header
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ProcModifiers: u16 {
        const VIRTUAL = 1 << 0;
        const ABSTRACT = 1 << 1;
        const OVERRIDE = 1 << 2;
        const DYNAMIC = 1 << 3;
        const STDCALL = 1 << 4;
        const CDECL = 1 << 5;
        const OVERLOAD = 1 << 6;
        const REINTRODUCE = 1 << 7;
        const FORWARD = 1 << 8;
        const EXTERNAL = 1 << 9;
        const STATIC = 1 << 10;
        const INLINE = 1 << 11;
    }
}

#[derive(Debug, Clone)]
pub struct ProcedureDecl {
    pub approach: Approach,
    pub params: Vec<DeclId>,
    pub return_type: Option<Ref>,
    pub modifiers: ProcModifiers,
    pub external_lib: Option<String>,
    /// Owning class of a `TClass.Method` implementation header.
    pub in_class: Option<Ref>,
    /// Local types, vars, consts and nested routines.
    pub decls: Vec<DeclId>,
    /// `None` for a header without a body.
    pub body: Option<Vec<Stmt>>,
}

impl ProcedureDecl {
    pub fn is_function(&self) -> bool {
        self.approach == Approach::Function || self.return_type.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PropertyDecl {
    pub type_ref: Option<Ref>,
    pub index_params: Vec<DeclId>,
    pub reader: Option<Expr>,
    pub writer: Option<Expr>,
    pub default_value: Option<Expr>,
    pub stored: Option<Expr>,
    /// Trailing `; default` marking the class's default array property.
    pub is_default: bool,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub location: Position,
}

impl Stmt {
    pub fn new(kind: StmtKind, location: Position) -> Self {
        Stmt { kind, location }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForDirection {
    Up,
    Down,
}

#[derive(Debug, Clone)]
pub struct CaseArm {
    pub values: Vec<Expr>,
    pub body: Vec<Stmt>,
}

/// `on [name:] Type do stmt`
#[derive(Debug, Clone)]
pub struct ExceptHandler {
    pub var_name: Option<String>,
    pub exception_type: Ref,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Block(Vec<Stmt>),
    If {
        cond: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Vec<Stmt>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    For {
        var: Expr,
        from: Expr,
        to: Expr,
        direction: ForDirection,
        body: Vec<Stmt>,
    },
    Repeat {
        body: Vec<Stmt>,
        until: Expr,
    },
    Case {
        subject: Expr,
        arms: Vec<CaseArm>,
        default: Vec<Stmt>,
    },
    Assign {
        target: Expr,
        value: Expr,
    },
    Try {
        body: Vec<Stmt>,
        handlers: Vec<ExceptHandler>,
        /// `else` part after typed handlers.
        else_handler: Option<Vec<Stmt>>,
        /// Plain `except stmts end` with no `on` clauses.
        untyped_handler: Option<Vec<Stmt>>,
        finally: Option<Vec<Stmt>>,
    },
    With {
        subjects: Vec<Expr>,
        body: Vec<Stmt>,
    },
    Raise(Option<Expr>),
    Call(Expr),
    /// `inherited` alone or followed by a member call.
    Inherited(Option<Expr>),
    LocalVar(DeclId),
}

/// Prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Positive,
    Negative,
    AddressOf,
}

/// Binary operators, listed roughly from tightest to loosest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    As,
    Is,
    Multiply,
    Divide,
    IntDiv,
    Mod,
    Shl,
    Shr,
    Add,
    Subtract,
    Interval,
    In,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    And,
    Or,
    Xor,
}

impl BinaryOp {
    /// Slicing precedence: a larger number binds more loosely and is split first.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::As => 0,
            BinaryOp::Is => 1,
            BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::IntDiv | BinaryOp::Mod | BinaryOp::Shl | BinaryOp::Shr => 2,
            BinaryOp::Add | BinaryOp::Subtract => 3,
            BinaryOp::Interval => 4,
            BinaryOp::In => 5,
            BinaryOp::Equal
            | BinaryOp::NotEqual
            | BinaryOp::Less
            | BinaryOp::Greater
            | BinaryOp::LessEqual
            | BinaryOp::GreaterEqual => 6,
            BinaryOp::And => 7,
            BinaryOp::Or | BinaryOp::Xor => 8,
        }
    }

    pub fn is_comparison(self) -> bool {
        self.precedence() == 6 || matches!(self, BinaryOp::In | BinaryOp::Is)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or | BinaryOp::Xor)
    }

    /// Source spelling, used by the dumper.
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::As => "as",
            BinaryOp::Is => "is",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::IntDiv => "div",
            BinaryOp::Mod => "mod",
            BinaryOp::Shl => "shl",
            BinaryOp::Shr => "shr",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Interval => "..",
            BinaryOp::In => "in",
            BinaryOp::Equal => "=",
            BinaryOp::NotEqual => "<>",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
            BinaryOp::LessEqual => "<=",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialSymbol {
    Nil,
    True,
    False,
    Null,
}

/// Built-in types known to type inference without a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BuiltinType {
    Boolean,
    Char,
    Integer,
    Int64,
    Double,
    String,
}

impl BuiltinType {
    pub fn from_name(name: &str) -> Option<Self> {
        let ty = match name.to_ascii_lowercase().as_str() {
            "boolean" | "bool" | "bytebool" | "wordbool" | "longbool" => BuiltinType::Boolean,
            "char" | "ansichar" | "widechar" => BuiltinType::Char,
            "integer" | "int32" | "longint" | "smallint" | "shortint" | "byte" | "word" | "cardinal"
            | "longword" | "nativeint" => BuiltinType::Integer,
            "int64" | "uint64" => BuiltinType::Int64,
            "double" | "real" | "single" | "extended" | "currency" => BuiltinType::Double,
            "string" | "ansistring" | "widestring" | "unicodestring" | "shortstring" => BuiltinType::String,
            _ => return None,
        };
        Some(ty)
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, BuiltinType::Integer | BuiltinType::Int64 | BuiltinType::Double)
    }
}

/// Best-effort static type of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprType {
    Decl(DeclId),
    Builtin(BuiltinType),
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub location: Position,
    /// Filled by the resolver when inference succeeds.
    pub ty: Option<ExprType>,
}

impl Expr {
    pub fn new(kind: ExprKind, location: Position) -> Self {
        Expr {
            kind,
            location,
            ty: None,
        }
    }

    /// The bound declaration of a `Name` or `Member` node.
    pub fn decl(&self) -> Option<DeclId> {
        match &self.kind {
            ExprKind::Name(r) | ExprKind::Member { name: r, .. } => r.decl,
            _ => None,
        }
    }

    /// Identifier text of a `Name` or `Member` node.
    pub fn ident(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Name(r) | ExprKind::Member { name: r, .. } => Some(&r.name),
            _ => None,
        }
    }

    pub fn is_name(&self, name: &str) -> bool {
        matches!(&self.kind, ExprKind::Name(r) if r.name.eq_ignore_ascii_case(name))
    }
}

/// Expression variants. Suffix nodes (`Member`, `Call`, `Index`, `Deref`) own the
/// expression they apply to, so a chain `a.b(c)[d]` nests outward from its root `a`.
#[derive(Debug, Clone)]
pub enum ExprKind {
    Paren(Vec<Expr>),
    /// Bracketed list `[a, b..c]`, a set constructor.
    Brackets(Vec<Expr>),
    Int(i64),
    Hex(i64),
    Str(String),
    Float(f64),
    Name(Ref),
    Member { base: Box<Expr>, name: Ref },
    Call { base: Box<Expr>, args: Vec<Expr> },
    Index { base: Box<Expr>, args: Vec<Expr> },
    Deref { base: Box<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Symbol(SpecialSymbol),
}
