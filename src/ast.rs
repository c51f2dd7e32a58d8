use crate::error::Span;
use crate::value::Value;
use std::fmt;
use std::rc::Rc;

/// Reserved name a class constructor is recorded under.
pub const CONSTRUCTOR_NAME: &str = "__init__";

#[derive(Debug, Clone)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

/// A parsed `f name(params) ... endf` or `init(params) ... endinit` block.
#[derive(Debug)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ClassMember {
    Property { name: String, value: Expr, span: Span },
    Method(Rc<FunctionDecl>),
    Constructor(Rc<FunctionDecl>),
}

#[derive(Debug, Clone)]
pub enum AssignTarget {
    Variable { name: String },
    Index { object: Expr, index: Expr },
    Property { object: Expr, name: String },
}

#[derive(Debug, Clone)]
pub struct ConditionalBlock {
    pub condition: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum ForKind {
    /// `for (i = start to end)`, inclusive on both ends.
    Range { var: String, start: Expr, end: Expr },
    /// `for (item in iterable)`
    Each { var: String, iterable: Expr },
    /// `for (key, value in iterable)`
    KeyValue { key: String, value: String, iterable: Expr },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportItems {
    All,
    Names(Vec<String>),
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expression {
        expr: Expr,
        span: Span,
    },
    Print {
        expr: Expr,
        span: Span,
    },
    Assign {
        target: AssignTarget,
        value: Expr,
        span: Span,
    },
    /// `if` followed by any number of `elif` branches, in source order.
    If {
        branches: Vec<ConditionalBlock>,
        else_branch: Option<Vec<Stmt>>,
        span: Span,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
        span: Span,
    },
    For {
        kind: ForKind,
        body: Vec<Stmt>,
        span: Span,
    },
    Break {
        span: Span,
    },
    Return {
        value: Option<Expr>,
        span: Span,
    },
    Function {
        decl: Rc<FunctionDecl>,
        span: Span,
    },
    Init {
        decl: Rc<FunctionDecl>,
        span: Span,
    },
    Class {
        name: String,
        parent: Option<Vec<String>>,
        members: Vec<ClassMember>,
        span: Span,
    },
    Super {
        args: Vec<Expr>,
        span: Span,
    },
    Share {
        names: Vec<String>,
        span: Span,
    },
    Import {
        path: String,
        items: ImportItems,
        span: Span,
    },
    Load {
        path: String,
        alias: String,
        span: Span,
    },
}

impl Stmt {
    pub fn span(&self) -> &Span {
        match self {
            Stmt::Expression { span, .. } => span,
            Stmt::Print { span, .. } => span,
            Stmt::Assign { span, .. } => span,
            Stmt::If { span, .. } => span,
            Stmt::While { span, .. } => span,
            Stmt::For { span, .. } => span,
            Stmt::Break { span } => span,
            Stmt::Return { span, .. } => span,
            Stmt::Function { span, .. } => span,
            Stmt::Init { span, .. } => span,
            Stmt::Class { span, .. } => span,
            Stmt::Super { span, .. } => span,
            Stmt::Share { span, .. } => span,
            Stmt::Import { span, .. } => span,
            Stmt::Load { span, .. } => span,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal {
        value: Value,
        span: Span,
    },
    Variable {
        name: String,
        span: Span,
    },
    Binary {
        left: Box<Expr>,
        operator: BinaryOp,
        right: Box<Expr>,
        span: Span,
    },
    Unary {
        operator: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },
    Logical {
        left: Box<Expr>,
        operator: LogicalOp,
        right: Box<Expr>,
        span: Span,
    },
    /// Call of a script function by name: `add(1, 2)`.
    Call {
        name: String,
        args: Vec<Expr>,
        span: Span,
    },
    MethodCall {
        object: Box<Expr>,
        method: String,
        args: Vec<Expr>,
        span: Span,
    },
    Property {
        object: Box<Expr>,
        name: String,
        span: Span,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },
    Grouping {
        expr: Box<Expr>,
        span: Span,
    },
    List {
        elements: Vec<Expr>,
        span: Span,
    },
    Object {
        entries: Vec<(String, Expr)>,
        span: Span,
    },
    /// `new Name(args)` or `new alias.Name(args)`.
    New {
        class_path: Vec<String>,
        args: Vec<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> &Span {
        match self {
            Expr::Literal { span, .. } => span,
            Expr::Variable { span, .. } => span,
            Expr::Binary { span, .. } => span,
            Expr::Unary { span, .. } => span,
            Expr::Logical { span, .. } => span,
            Expr::Call { span, .. } => span,
            Expr::MethodCall { span, .. } => span,
            Expr::Property { span, .. } => span,
            Expr::Index { span, .. } => span,
            Expr::Grouping { span, .. } => span,
            Expr::List { span, .. } => span,
            Expr::Object { span, .. } => span,
            Expr::New { span, .. } => span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    FloorDivide,
    Modulo,
    Power,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    In,
}

impl BinaryOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let op = match symbol {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Subtract,
            "*" => BinaryOp::Multiply,
            "/" => BinaryOp::Divide,
            "//" => BinaryOp::FloorDivide,
            "%" => BinaryOp::Modulo,
            "**" => BinaryOp::Power,
            "==" => BinaryOp::Equal,
            "!=" => BinaryOp::NotEqual,
            "<" => BinaryOp::Less,
            "<=" => BinaryOp::LessEqual,
            ">" => BinaryOp::Greater,
            ">=" => BinaryOp::GreaterEqual,
            "in" => BinaryOp::In,
            _ => return None,
        };
        Some(op)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::FloorDivide => "//",
            BinaryOp::Modulo => "%",
            BinaryOp::Power => "**",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::In => "in",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}
