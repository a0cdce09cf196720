// program ::= definition* stmt* EOF
// definition ::= var_def | func_def
// var_def ::= ID ':' type '=' literal NEWLINE
// func_def ::= def ID '(' [ID ':' type (',' ID ':' type)*] ')' ['->' type] ':' NEWLINE
//              INDENT func_decl* stmt+ DEDENT
// func_decl ::= global ID NEWLINE
//             | nonlocal ID NEWLINE
//             | var_def
// type ::= int | bool | str | object | '[' type ']'
// stmt ::= pass NEWLINE
//        | return [expr] NEWLINE
//        | if expr ':' block (elif expr ':' block)* [else ':' block]
//        | while expr ':' block
//        | for ID in expr ':' block
//        | (expr '=')* expr NEWLINE
// block ::= NEWLINE INDENT stmt+ DEDENT
// expr ::= expr if expr else expr
//        | expr or expr
//        | expr and expr
//        | not expr
//        | expr (== | != | < | <= | > | >= | is) expr
//        | expr (+ | -) expr
//        | expr (* | // | %) expr
//        | '-' expr
//        | expr '[' expr ']'
//        | ID '(' [expr (',' expr)*] ')'
//        | '[' [expr (',' expr)*] ']'
//        | '(' expr ')'
//        | ID
//        | literal
// literal ::= None | True | False | integer | string

// Precedence
//
// [ ] (index)
// - (unary)
// * // %
// + -
// == != < <= > >= is (non associative)
// not
// and
// or
// if else

use crate::{token::Span, util::intern::Symbol};

#[derive(Debug, PartialEq)]
pub struct Program {
    pub definitions: Vec<Definition>,
    pub statements: Vec<Stmt>,
    /// Number of expression nodes; every [`ExprId`] in the program is below it.
    pub expr_count: u32,
}

#[derive(Debug, PartialEq)]
pub enum Definition {
    Var(VarDef),
    Func(FuncDef),
}

#[derive(Debug, PartialEq)]
pub struct VarDef {
    pub var: TypedVar,
    /// Always an [`ExprKind::Literal`].
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, PartialEq)]
pub struct TypedVar {
    pub name: Ident,
    pub ty: TypeAnnotation,
}

#[derive(Debug, PartialEq)]
pub struct FuncDef {
    pub name: Ident,
    pub params: Vec<TypedVar>,
    /// `None` when the `->` annotation is absent (the function returns `<None>`).
    pub return_ty: Option<TypeAnnotation>,
    pub declarations: Vec<Declaration>,
    /// Non empty list of statements.
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, PartialEq)]
pub enum Declaration {
    Var(VarDef),
    Global(Ident),
    NonLocal(Ident),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeAnnotation {
    pub kind: TypeAnnotationKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeAnnotationKind {
    Named(NamedType),
    List(Box<TypeAnnotation>),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NamedType {
    Int,
    Bool,
    Str,
    Object,
}

#[derive(Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, PartialEq)]
pub enum StmtKind {
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        /// Empty if there is no `else`. An `elif` is an `If` nested here.
        else_body: Vec<Stmt>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    For {
        target: Ident,
        iter: Expr,
        body: Vec<Stmt>,
    },
    Pass,
    Return(Option<Expr>),
    /// `a = b = ... = value`, with the targets in source order.
    Assign {
        targets: Vec<Expr>,
        value: Expr,
    },
    Expr(Expr),
}

/// Index of an expression node, unique within its [`Program`]. Side tables
/// (such as the type hints) are keyed by it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub u32);

impl ExprId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    pub id: ExprId,
}

#[derive(Debug, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    Ident(Ident),
    Unary {
        op: UnaryOperator,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOperator,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    IfExpr {
        cond: Box<Expr>,
        then_arm: Box<Expr>,
        else_arm: Box<Expr>,
    },
    List(Vec<Expr>),
    Call {
        func: Ident,
        args: Vec<Expr>,
    },
    Index {
        value: Box<Expr>,
        index: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    None,
    Bool(bool),
    Int(i32),
    Str(Box<str>),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UnaryOperator {
    Neg,
    Not,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    FloorDiv,
    Mod,
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Is,
    And,
    Or,
}

impl BinaryOperator {
    pub fn is_comparison(self) -> bool {
        use BinaryOperator::*;
        matches!(
            self,
            Eq | NotEq | Less | LessEq | Greater | GreaterEq | Is
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: Symbol,
    pub span: Span,
}

impl From<Ident> for Symbol {
    fn from(value: Ident) -> Self {
        value.name
    }
}

impl From<&Ident> for Symbol {
    fn from(value: &Ident) -> Self {
        value.name
    }
}
