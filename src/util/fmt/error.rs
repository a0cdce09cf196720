#![allow(clippy::items_after_statements)]

use std::fmt;

use crate::{
    codegen, lexer, parser, scope,
    token::{Spanned, TokenKind},
    type_checker,
    util::fmt::Show,
};

impl Show for Spanned<type_checker::Error> {
    fn show(&self, f: &mut fmt::Formatter<'_>, ctx: &super::Context<'_>) -> fmt::Result {
        let i = ctx.ident_interner;
        let Spanned { span, inner: error } = self;

        if f.alternate() {
            write!(f, "{span}: ")?;
        }

        use type_checker::Error::*;
        match error {
            NotAssignmentCompatible { expected, actual } => {
                write!(f, "expected type {expected}, but got {actual}")
            }
            UnexpectedType { expected, actual } => {
                write!(f, "expected an expression of type {expected}, but got {actual}")
            }
            ExpectedListType(ty) => write!(f, "expected a str or list, but got {ty}"),
            UnknownIdentifierUsed(name) => {
                let name = i.get(name);
                write!(f, "unknown identifier {name}")
            }
            ExpectedVariableIdentifier(name) => {
                let name = i.get(name);
                write!(f, "{name} is a function, not a variable")
            }
            ExpectedFunctionIdentifier(name) => {
                let name = i.get(name);
                write!(f, "{name} is not a function")
            }
            ExpectedNonNoneListType => {
                write!(f, "cannot assign a list of None to multiple targets")
            }
            IsBinaryExpectedTwoObjectTypes { lhs, rhs } => {
                write!(f, "`is` expects two object operands, but got {lhs} and {rhs}")
            }
            FunctionCallArgumentMismatch {
                func,
                expected,
                actual,
            } => {
                let func = i.get(func);
                write!(f, "{func} expects {expected} argument(s), but got {actual}")
            }
            AssignTargetInvalid => write!(f, "cannot assign to an index of a str"),
        }
    }
}

impl Show for Spanned<scope::Error> {
    fn show(&self, f: &mut fmt::Formatter<'_>, ctx: &super::Context<'_>) -> fmt::Result {
        let i = ctx.ident_interner;
        let Spanned { span, inner: error } = self;

        if f.alternate() {
            write!(f, "{span}: ")?;
        }

        use scope::Error::*;
        match error {
            IdentifierAlreadyDefined(name) => {
                write!(f, "identifier {} is already defined", i.get(name))
            }
            IdentifierUndefined(name) => write!(f, "identifier {} is not defined", i.get(name)),
            AssignTargetOutOfScope(name) => write!(
                f,
                "cannot assign to {}, which is not defined in this scope",
                i.get(name)
            ),
            IdentifierNotInParentScope(name) => write!(
                f,
                "identifier {} is not defined in an enclosing function scope",
                i.get(name)
            ),
            IdentifierNotInGlobalScope(name) => write!(
                f,
                "identifier {} is not defined in the global scope",
                i.get(name)
            ),
            AssignTargetInvalid => write!(f, "cannot assign to this expression"),
        }
    }
}

impl Show for Spanned<parser::Error> {
    fn show(&self, f: &mut fmt::Formatter<'_>, ctx: &super::Context<'_>) -> fmt::Result {
        let Spanned { span, inner: error } = self;

        if f.alternate() {
            write!(f, "{span}: ")?;
        }

        use parser::Error::*;
        match error {
            CommaExpected => write!(f, "expected ','"),
            ComparisonNotAssociative => write!(f, "comparison operators are not associative"),
            ExpectedExpression => write!(f, "expected an expression"),
            ExpectedLiteral => write!(f, "expected a literal"),
            Indentation => write!(f, "expected an indented block"),
            NoLhsInAssignment => write!(f, "assignment has no left-hand side"),
            TokenNotFound { actual, expected } => {
                let expected = describe(*expected);
                let actual = describe(*actual);
                write!(f, "expected token {expected}, but got {actual}")
            }
            UnexpectedIndentation => write!(f, "unexpected indent"),
            UnknownType(Some(name)) => {
                write!(f, "unknown type `{}`", ctx.ident_interner.get(name))
            }
            UnknownType(None) => write!(f, "expected a type"),
            UnmatchedParentheses => write!(f, "unmatched parentheses"),
            VariableDefinedLater => write!(f, "definitions must precede all statements"),
            ReturnOutsideFunction => write!(f, "'return' outside function"),
            IntegerOutOfRange => write!(f, "integer literal is out of range"),
            Lexer(error) => show_lexer_error(f, error),
        }
    }
}

impl Show for Spanned<lexer::Error> {
    fn show(&self, f: &mut fmt::Formatter<'_>, _: &super::Context<'_>) -> fmt::Result {
        let Spanned { span, inner: error } = self;

        if f.alternate() {
            write!(f, "{span}: ")?;
        }
        show_lexer_error(f, error)
    }
}

impl Show for Spanned<codegen::Error> {
    fn show(&self, f: &mut fmt::Formatter<'_>, ctx: &super::Context<'_>) -> fmt::Result {
        let Spanned { span, inner: error } = self;

        if f.alternate() {
            write!(f, "{span}: ")?;
        }

        match error {
            codegen::Error::Unsupported(what) => write!(f, "unsupported: {what}"),
            codegen::Error::UnknownSymbol(name) => {
                let name = ctx.ident_interner.get(name);
                write!(f, "no storage was allocated for {name}")
            }
        }
    }
}

fn show_lexer_error(f: &mut fmt::Formatter<'_>, error: &lexer::Error) -> fmt::Result {
    use lexer::Error::*;
    match error {
        InvalidSymbol(c) => write!(f, "invalid symbol {c:?}"),
        UnknownEscape(c) => write!(f, "unknown escape sequence \\{c}"),
        MismatchedIndentation => {
            write!(f, "unindent does not match any outer indentation level")
        }
        UnclosedString => write!(f, "unterminated string literal"),
        UnescapedLineBreak => write!(f, "unescaped line break in string literal"),
    }
}

/// Keyword and structural tokens are named as is; punctuation is quoted.
fn describe(kind: TokenKind) -> String {
    let name = kind.name();
    if name.starts_with(|c: char| c.is_ascii_uppercase()) {
        name.to_owned()
    } else {
        format!("'{name}'")
    }
}
