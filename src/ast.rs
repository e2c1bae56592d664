//! Abstract syntax tree shared by every pass.
//!
//! Expressions and statements are closed enums; each pass (resolver,
//! interpreter, code generator, printer) is one exhaustive `match` over them.
//! Nodes are immutable after parsing. Nodes that name a binding (`Variable`,
//! `Assign`, `This`, `Super`) carry an [`ExprId`] which keys the resolver's
//! scope‑distance side table.

use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::token::{Offset, Token};

/// Stable identity of a binding‑referencing expression node.
///
/// Ids are process‑unique so that a persistent interpreter (REPL) can keep
/// resolutions from earlier parses without collisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(usize);

impl ExprId {
    pub fn fresh() -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(0);

        ExprId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A **literal constant** that appears directly in the source code.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone)]
pub enum Expr {
    /// `name = value`
    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },

    /// Infix arithmetic, comparison and equality operators.
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// `callee(arguments...)`; `paren` is the closing `)`.
    Call {
        callee: Box<Expr>,
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// `object.name`
    Get { object: Box<Expr>, name: Token },

    Grouping(Box<Expr>),

    Literal { value: LiteralValue, offset: Offset },

    /// Short‑circuiting `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// `object.name = value`
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    /// `super.method`
    Super {
        id: ExprId,
        keyword: Token,
        method: Token,
    },

    This { id: ExprId, keyword: Token },

    /// `condition ? then_branch : else_branch`
    Ternary {
        condition: Box<Expr>,
        question: Token,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    Unary { operator: Token, right: Box<Expr> },

    Variable { id: ExprId, name: Token },
}

impl Expr {
    pub fn offset(&self) -> Offset {
        match self {
            Expr::Assign { name, .. } => name.offset,
            Expr::Binary { operator, .. } => operator.offset,
            Expr::Call { paren, .. } => paren.offset,
            Expr::Get { name, .. } => name.offset,
            Expr::Grouping(inner) => inner.offset(),
            Expr::Literal { offset, .. } => *offset,
            Expr::Logical { operator, .. } => operator.offset,
            Expr::Set { name, .. } => name.offset,
            Expr::Super { keyword, .. } => keyword.offset,
            Expr::This { keyword, .. } => keyword.offset,
            Expr::Ternary { question, .. } => question.offset,
            Expr::Unary { operator, .. } => operator.offset,
            Expr::Variable { name, .. } => name.offset,
        }
    }

    #[inline]
    pub fn line(&self) -> usize {
        self.offset().line
    }
}

/// A function or method declaration. Shared (`Rc`) between the AST and every
/// runtime closure created from it.
#[derive(Debug)]
pub struct FunctionDecl {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Block {
        statements: Vec<Stmt>,
        offset: Offset,
    },

    Class {
        name: Token,
        /// Always an `Expr::Variable` when present.
        superclass: Option<Expr>,
        methods: Vec<Rc<FunctionDecl>>,
    },

    Expression(Expr),

    Function(Rc<FunctionDecl>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    Print(Expr),

    Return {
        keyword: Token,
        value: Option<Expr>,
    },

    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    While { condition: Expr, body: Box<Stmt> },

    Break { keyword: Token },

    Continue { keyword: Token },
}

impl Stmt {
    pub fn offset(&self) -> Offset {
        match self {
            Stmt::Block { offset, .. } => *offset,
            Stmt::Class { name, .. } => name.offset,
            Stmt::Expression(expr) | Stmt::Print(expr) => expr.offset(),
            Stmt::Function(decl) => decl.name.offset,
            Stmt::If { condition, .. } => condition.offset(),
            Stmt::Return { keyword, .. } => keyword.offset,
            Stmt::Var { name, .. } => name.offset,
            Stmt::While { condition, .. } => condition.offset(),
            Stmt::Break { keyword } | Stmt::Continue { keyword } => keyword.offset,
        }
    }
}
