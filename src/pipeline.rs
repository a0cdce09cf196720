//! Runs the phases in order, stopping at the first error.

use log::debug;

use crate::{
    ast::Program,
    codegen, lexer, parser, scope,
    token::{Span, Spanned, Token},
    type_checker::{self, TypeHints},
    util::{fmt::Context, intern::Interner},
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    Lexer(Spanned<lexer::Error>),
    Syntax(Spanned<parser::Error>),
    Scope(Spanned<scope::Error>),
    Type(Spanned<type_checker::Error>),
    Codegen(Spanned<codegen::Error>),
}

impl Error {
    pub fn span(&self) -> Span {
        match self {
            Error::Lexer(e) => e.span,
            Error::Syntax(e) => e.span,
            Error::Scope(e) => e.span,
            Error::Type(e) => e.span,
            Error::Codegen(e) => e.span,
        }
    }

    /// The error's message, without location.
    pub fn message(&self, ident_interner: &Interner) -> String {
        let ctx = Context::new(ident_interner);
        match self {
            Error::Lexer(e) => ctx.render(e, false),
            Error::Syntax(e) => ctx.render(e, false),
            Error::Scope(e) => ctx.render(e, false),
            Error::Type(e) => ctx.render(e, false),
            Error::Codegen(e) => ctx.render(e, false),
        }
    }

    /// Renders the diagnostic shown to users. Syntax errors point at the
    /// offending line and column.
    pub fn report(&self, src: &str, ident_interner: &Interner) -> String {
        let message = self.message(ident_interner);
        match self {
            Error::Lexer(_) | Error::Syntax(_) => {
                let location = self.span().location(src);
                let caret_pad = " ".repeat(location.column - 1);
                format!(
                    "SyntaxError: {message}\n  --> line {}, column {}\n{}\n{caret_pad}^",
                    location.line, location.column, location.line_literal,
                )
            }
            Error::Scope(_) | Error::Type(_) | Error::Codegen(_) => {
                format!("Semantic Error: {message}")
            }
        }
    }
}

impl From<Spanned<lexer::Error>> for Error {
    fn from(e: Spanned<lexer::Error>) -> Error {
        Error::Lexer(e)
    }
}

impl From<Spanned<parser::Error>> for Error {
    fn from(e: Spanned<parser::Error>) -> Error {
        // The parser wraps errors of the lexer it drives.
        match e.inner {
            parser::Error::Lexer(inner) => Error::Lexer(e.span.wrap(inner)),
            _ => Error::Syntax(e),
        }
    }
}

impl From<Spanned<scope::Error>> for Error {
    fn from(e: Spanned<scope::Error>) -> Error {
        Error::Scope(e)
    }
}

impl From<Spanned<type_checker::Error>> for Error {
    fn from(e: Spanned<type_checker::Error>) -> Error {
        Error::Type(e)
    }
}

impl From<Spanned<codegen::Error>> for Error {
    fn from(e: Spanned<codegen::Error>) -> Error {
        Error::Codegen(e)
    }
}

pub fn lex(src: &str) -> Result<Vec<Token>> {
    let tokens = lexer::lex_in_new(src)?;
    debug!("lexed {} tokens", tokens.len());
    Ok(tokens)
}

pub fn parse(src: &str, ident_interner: &mut Interner) -> Result<Program> {
    let mut tokens = Vec::with_capacity(src.len() / 4);
    let program = parser::parse_program(src, &mut tokens, ident_interner)?;
    debug!(
        "parsed {} definitions and {} statements",
        program.definitions.len(),
        program.statements.len()
    );
    Ok(program)
}

/// Parses and runs the name-scope analysis.
pub fn check_scopes(src: &str, ident_interner: &mut Interner) -> Result<Program> {
    let program = parse(src, ident_interner)?;
    scope::check(&program)?;
    debug!("scopes resolved");
    Ok(program)
}

/// Parses and runs both semantic analyses.
pub fn check_types(src: &str, ident_interner: &mut Interner) -> Result<(Program, TypeHints)> {
    let program = check_scopes(src, ident_interner)?;
    let hints = type_checker::check(&program)?;
    debug!("type checked {} expressions", hints.len());
    Ok((program, hints))
}

/// Runs every phase, returning the module's IR text.
pub fn emit_ir(src: &str, ident_interner: &mut Interner, options: &codegen::Options) -> Result<String> {
    let (program, hints) = check_types(src, ident_interner)?;
    Ok(codegen::emit(&program, &hints, ident_interner, options)?)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn report(src: &str) -> String {
        let mut interner = Interner::new();
        let error = emit_ir(src, &mut interner, &codegen::Options::default()).unwrap_err();
        error.report(src, &interner)
    }

    #[test]
    fn test_syntax_error_points_at_column() {
        assert_eq!(
            report("x: int = 1\nprint(x +)\n"),
            indoc::indoc! {"
                SyntaxError: expected an expression
                  --> line 2, column 10
                print(x +)
                         ^"
            }
        );
    }

    #[test]
    fn test_lexer_errors_are_syntax_errors() {
        let src = "x = $\n";
        let mut interner = Interner::new();
        let error = parse(src, &mut interner).unwrap_err();
        assert!(matches!(error, Error::Lexer(_)));
        assert!(error.report(src, &interner).starts_with("SyntaxError: invalid symbol '$'"));
    }

    #[test]
    fn test_semantic_errors_name_the_culprit() {
        assert_eq!(
            report("x: int = True\n"),
            "Semantic Error: expected type int, but got bool"
        );
        assert_eq!(
            report("a = b = 1\n"),
            "Semantic Error: cannot assign to a, which is not defined in this scope"
        );
    }

    #[test]
    fn test_unlowerable_programs_are_semantic_errors() {
        assert_eq!(
            report("print([1])\n"),
            "Semantic Error: unsupported: printing a value of this type"
        );
    }

    #[test]
    fn test_phases_stop_where_asked() {
        let mut interner = Interner::new();
        // Ill-typed, but well-scoped.
        let src = "x: int = 0\nx = \"a\"\n";
        assert!(check_scopes(src, &mut interner).is_ok());
        assert!(matches!(check_types(src, &mut interner), Err(Error::Type(_))));
        assert_eq!(lex(src).unwrap().len(), 11);
    }
}
