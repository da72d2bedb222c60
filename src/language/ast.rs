use crate::language::token::Token;
use std::sync::Arc;

/// Root node of every parse.
#[derive(Clone, Debug)]
pub struct Program {
    pub statements: Vec<Statement>,
}

#[derive(Clone, Debug)]
pub enum Statement {
    Let(LetStmt),
    Assign(AssignStmt),
    Expr(ExprStmt),
    If(IfStmt),
    Return(ReturnStmt),
    ForIn(ForInStmt),
}

/// `let x = expr`
#[derive(Clone, Debug)]
pub struct LetStmt {
    pub token: Token,
    pub name: String,
    pub value: Expr,
}

/// `x = expr`
#[derive(Clone, Debug)]
pub struct AssignStmt {
    pub token: Token,
    pub name: String,
    pub value: Expr,
}

#[derive(Clone, Debug)]
pub struct ExprStmt {
    pub token: Token,
    pub expr: Expr,
}

/// `if (condition) { consequence } else { alternative }`
#[derive(Clone, Debug)]
pub struct IfStmt {
    pub token: Token,
    pub condition: Expr,
    pub consequence: Block,
    pub alternative: Option<Block>,
}

/// `return [expr]`
#[derive(Clone, Debug)]
pub struct ReturnStmt {
    pub token: Token,
    pub value: Option<Expr>,
}

/// `for (variable in iterable) { body }`
#[derive(Clone, Debug)]
pub struct ForInStmt {
    pub token: Token,
    pub variable: String,
    pub iterable: Expr,
    pub body: Block,
}

/// Brace-delimited statement sequence; a building block of `if`, `for`, and
/// function literals rather than a standalone statement.
#[derive(Clone, Debug)]
pub struct Block {
    pub token: Token,
    pub statements: Vec<Statement>,
}

#[derive(Clone, Debug)]
pub enum Expr {
    Number(NumberLit),
    Str(StrLit),
    Bool(BoolLit),
    Null(NullLit),
    Ident(Ident),
    Unary(Box<UnaryExpr>),
    Binary(Box<BinaryExpr>),
    Property(Box<PropertyExpr>),
    SafeProperty(Box<PropertyExpr>),
    Elvis(Box<ElvisExpr>),
    Index(Box<IndexExpr>),
    Array(ArrayLit),
    Object(ObjectLit),
    Function(FunctionLit),
    Call(Box<CallExpr>),
    Template(TemplateLit),
}

impl Expr {
    /// The token the expression originates from, for diagnostics.
    pub fn token(&self) -> &Token {
        match self {
            Expr::Number(e) => &e.token,
            Expr::Str(e) => &e.token,
            Expr::Bool(e) => &e.token,
            Expr::Null(e) => &e.token,
            Expr::Ident(e) => &e.token,
            Expr::Unary(e) => &e.token,
            Expr::Binary(e) => &e.token,
            Expr::Property(e) | Expr::SafeProperty(e) => &e.token,
            Expr::Elvis(e) => &e.token,
            Expr::Index(e) => &e.token,
            Expr::Array(e) => &e.token,
            Expr::Object(e) => &e.token,
            Expr::Function(e) => &e.token,
            Expr::Call(e) => &e.token,
            Expr::Template(e) => &e.token,
        }
    }
}

#[derive(Clone, Debug)]
pub struct NumberLit {
    pub token: Token,
    pub value: f64,
}

#[derive(Clone, Debug)]
pub struct StrLit {
    pub token: Token,
    pub value: String,
}

#[derive(Clone, Debug)]
pub struct BoolLit {
    pub token: Token,
    pub value: bool,
}

#[derive(Clone, Debug)]
pub struct NullLit {
    pub token: Token,
}

#[derive(Clone, Debug)]
pub struct Ident {
    pub token: Token,
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct UnaryExpr {
    pub token: Token,
    pub op: UnaryOp,
    pub right: Expr,
}

#[derive(Clone, Debug)]
pub struct BinaryExpr {
    pub token: Token,
    pub op: BinaryOp,
    pub left: Expr,
    pub right: Expr,
}

/// `object.property` and `object?.property`; the safe variant short-circuits
/// to null on a null receiver.
#[derive(Clone, Debug)]
pub struct PropertyExpr {
    pub token: Token,
    pub object: Expr,
    pub property: String,
}

/// `left ?: default` — yields `left` unless it is null.
#[derive(Clone, Debug)]
pub struct ElvisExpr {
    pub token: Token,
    pub left: Expr,
    pub default: Expr,
}

#[derive(Clone, Debug)]
pub struct IndexExpr {
    pub token: Token,
    pub object: Expr,
    pub index: Expr,
}

#[derive(Clone, Debug)]
pub struct ArrayLit {
    pub token: Token,
    pub elements: Vec<Expr>,
}

/// Insertion order of the source is preserved.
#[derive(Clone, Debug)]
pub struct ObjectLit {
    pub token: Token,
    pub pairs: Vec<(String, Expr)>,
}

/// The body is shared so closures over a cached program stay cheap to build.
#[derive(Clone, Debug)]
pub struct FunctionLit {
    pub token: Token,
    pub params: Vec<String>,
    pub body: Arc<Block>,
}

#[derive(Clone, Debug)]
pub struct CallExpr {
    pub token: Token,
    pub callee: Expr,
    pub args: Vec<Expr>,
}

/// Ordered literal chunks and embedded expressions; chunks are plain string
/// literals.
#[derive(Clone, Debug)]
pub struct TemplateLit {
    pub token: Token,
    pub parts: Vec<Expr>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::LtEq => "<=",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}
