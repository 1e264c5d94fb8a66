//! Declaration, statement and expression variants of the C# tree.

use bitflags::bitflags;

use super::{RefId, TargetDeclId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CsVisibility {
    #[default]
    Default,
    Private,
    Protected,
    Public,
}

impl CsVisibility {
    pub fn keyword(self) -> Option<&'static str> {
        match self {
            CsVisibility::Default => None,
            CsVisibility::Private => Some("private"),
            CsVisibility::Protected => Some("protected"),
            CsVisibility::Public => Some("public"),
        }
    }
}

/// A type as written in C#.
#[derive(Debug, Clone, PartialEq)]
pub enum CsType {
    /// Primitive or pass-through name.
    Named(String),
    /// Reference to a converted declaration, solved after lowering.
    Slot(RefId),
    Generic { name: String, args: Vec<CsType> },
    Array(Box<CsType>),
}

impl CsType {
    pub fn named(name: impl Into<String>) -> Self {
        CsType::Named(name.into())
    }
}

#[derive(Debug, Clone)]
pub struct CsDecl {
    pub name: String,
    pub kind: CsDeclKind,
    pub visibility: CsVisibility,
}

impl CsDecl {
    pub fn new(name: impl Into<String>, kind: CsDeclKind) -> Self {
        CsDecl {
            name: name.into(),
            kind,
            visibility: CsVisibility::Default,
        }
    }

    pub fn with_visibility(mut self, visibility: CsVisibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn as_method(&self) -> Option<&CsMethod> {
        match &self.kind {
            CsDeclKind::Method(method) => Some(method),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum CsDeclKind {
    Namespace(CsNamespace),
    Enum { consts: Vec<TargetDeclId> },
    EnumConst,
    /// `using Name = Target;`
    Alias { target: CsType },
    Class(CsClass),
    Delegate { params: Vec<TargetDeclId>, return_type: Option<CsType> },
    Method(CsMethod),
    Param(CsParam),
    Field(CsField),
    Property(CsProperty),
}

#[derive(Debug, Clone, Default)]
pub struct CsNamespace {
    pub usings: Vec<String>,
    pub members: Vec<TargetDeclId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Struct,
    Interface,
    /// The container for a unit's free-standing routines and variables.
    Static,
}

#[derive(Debug, Clone)]
pub struct CsClass {
    pub kind: ClassKind,
    /// Ancestor first, then implemented interfaces.
    pub bases: Vec<CsType>,
    pub members: Vec<TargetDeclId>,
}

bitflags! {
    /// Member modifiers
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct MemberFlags: u8 {
        const STATIC = 1 << 0;
        const ABSTRACT = 1 << 1;
        const VIRTUAL = 1 << 2;
        const OVERRIDE = 1 << 3;
        const CONST = 1 << 4;
        const EXTERN = 1 << 5;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Normal,
    Constructor,
    Destructor,
    /// Body of a unit's `initialization` section.
    StaticConstructor,
    /// Body of a program.
    Main,
}

#[derive(Debug, Clone)]
pub struct CsMethod {
    pub kind: MethodKind,
    pub flags: MemberFlags,
    pub params: Vec<TargetDeclId>,
    pub return_type: Option<CsType>,
    /// `: base(args)` on a constructor.
    pub base_call: Option<Vec<CsExpr>>,
    /// Library of an `extern` import.
    pub extern_lib: Option<String>,
    /// `None` for a bodiless declaration.
    pub body: Option<Vec<CsStmt>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamMode {
    Value,
    Ref,
}

#[derive(Debug, Clone)]
pub struct CsParam {
    pub mode: ParamMode,
    /// `None` for untyped parameters.
    pub ty: Option<CsType>,
    pub default: Option<CsExpr>,
}

#[derive(Debug, Clone)]
pub struct CsField {
    pub flags: MemberFlags,
    /// `None` lets the emitter write `var` or `object`.
    pub ty: Option<CsType>,
    pub initial: Option<CsExpr>,
}

#[derive(Debug, Clone)]
pub struct CsProperty {
    pub flags: MemberFlags,
    pub ty: Option<CsType>,
    /// Indexer parameters; non-empty turns the property into `this[...]`.
    pub params: Vec<TargetDeclId>,
    /// Value returned by `get`.
    pub getter: Option<CsExpr>,
    /// Body of `set`, reading `value`.
    pub setter: Option<Box<CsStmt>>,
}

#[derive(Debug, Clone)]
pub struct CsCase {
    pub labels: Vec<CsExpr>,
    pub body: Vec<CsStmt>,
}

#[derive(Debug, Clone)]
pub struct CsCatch {
    pub ty: CsType,
    pub var: Option<String>,
    pub body: Vec<CsStmt>,
}

#[derive(Debug, Clone)]
pub enum CsStmt {
    Block(Vec<CsStmt>),
    Expr(CsExpr),
    Assign {
        target: CsExpr,
        value: CsExpr,
    },
    /// Local variable; `ty == None` renders as `var`.
    Local {
        name: String,
        ty: Option<CsType>,
        value: Option<CsExpr>,
    },
    /// Nested routine, rendered as a delegate-typed local lambda.
    LocalFunction {
        name: String,
        params: Vec<TargetDeclId>,
        return_type: Option<CsType>,
        body: Vec<CsStmt>,
    },
    If {
        cond: CsExpr,
        then_branch: Vec<CsStmt>,
        else_branch: Vec<CsStmt>,
    },
    While {
        cond: CsExpr,
        body: Vec<CsStmt>,
    },
    DoWhile {
        body: Vec<CsStmt>,
        cond: CsExpr,
    },
    For {
        var: CsExpr,
        from: CsExpr,
        to: CsExpr,
        down: bool,
        body: Vec<CsStmt>,
    },
    Switch {
        subject: CsExpr,
        cases: Vec<CsCase>,
        default: Vec<CsStmt>,
    },
    Try {
        body: Vec<CsStmt>,
        catches: Vec<CsCatch>,
        /// Untyped `catch`, either alone or after typed catches.
        catch_all: Option<Vec<CsStmt>>,
        finally: Option<Vec<CsStmt>>,
    },
    Throw(Option<CsExpr>),
    Return(Option<CsExpr>),
    Break,
    Continue,
    Goto(String),
    /// Jump target, rendered on its own line before an empty statement.
    Label(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsUnaryOp {
    Not,
    BitNot,
    Plus,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsBinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    Is,
    As,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
}

impl CsBinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CsBinaryOp::Mul => "*",
            CsBinaryOp::Div => "/",
            CsBinaryOp::Rem => "%",
            CsBinaryOp::Add => "+",
            CsBinaryOp::Sub => "-",
            CsBinaryOp::Shl => "<<",
            CsBinaryOp::Shr => ">>",
            CsBinaryOp::Lt => "<",
            CsBinaryOp::Gt => ">",
            CsBinaryOp::Le => "<=",
            CsBinaryOp::Ge => ">=",
            CsBinaryOp::Is => "is",
            CsBinaryOp::As => "as",
            CsBinaryOp::Eq => "==",
            CsBinaryOp::Ne => "!=",
            CsBinaryOp::BitAnd => "&",
            CsBinaryOp::BitXor => "^",
            CsBinaryOp::BitOr => "|",
            CsBinaryOp::And => "&&",
            CsBinaryOp::Or => "||",
        }
    }

    /// C# binding strength; larger binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            CsBinaryOp::Mul | CsBinaryOp::Div | CsBinaryOp::Rem => 12,
            CsBinaryOp::Add | CsBinaryOp::Sub => 11,
            CsBinaryOp::Shl | CsBinaryOp::Shr => 10,
            CsBinaryOp::Lt
            | CsBinaryOp::Gt
            | CsBinaryOp::Le
            | CsBinaryOp::Ge
            | CsBinaryOp::Is
            | CsBinaryOp::As => 9,
            CsBinaryOp::Eq | CsBinaryOp::Ne => 8,
            CsBinaryOp::BitAnd => 7,
            CsBinaryOp::BitXor => 6,
            CsBinaryOp::BitOr => 5,
            CsBinaryOp::And => 4,
            CsBinaryOp::Or => 3,
        }
    }
}

#[derive(Debug, Clone)]
pub enum CsExpr {
    Int(i64),
    Hex(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
    This,
    Base,
    /// Identifier as written in the source.
    Name(String),
    Member {
        base: Box<CsExpr>,
        name: String,
    },
    Call {
        callee: Box<CsExpr>,
        args: Vec<CsExpr>,
    },
    New {
        ty: CsType,
        args: Vec<CsExpr>,
    },
    Cast {
        ty: CsType,
        value: Box<CsExpr>,
    },
    Index {
        base: Box<CsExpr>,
        args: Vec<CsExpr>,
    },
    Unary {
        op: CsUnaryOp,
        operand: Box<CsExpr>,
    },
    Binary {
        op: CsBinaryOp,
        lhs: Box<CsExpr>,
        rhs: Box<CsExpr>,
    },
    /// Type operand of `is`/`as`.
    TypeName(CsType),
    /// `lo..hi`, rendered as a helper call.
    Range {
        lo: Box<CsExpr>,
        hi: Box<CsExpr>,
    },
    /// Set membership `value in set`, rendered as a helper call.
    Belongs {
        value: Box<CsExpr>,
        set: Box<CsExpr>,
    },
    /// Set constructor `[a, b]`.
    SetOf(Vec<CsExpr>),
    Tuple(Vec<CsExpr>),
}

impl CsExpr {
    pub fn name(name: impl Into<String>) -> Self {
        CsExpr::Name(name.into())
    }

    pub fn call(callee: CsExpr, args: Vec<CsExpr>) -> Self {
        CsExpr::Call {
            callee: Box::new(callee),
            args,
        }
    }

    pub fn member(base: CsExpr, name: impl Into<String>) -> Self {
        CsExpr::Member {
            base: Box::new(base),
            name: name.into(),
        }
    }
}
