use std::io::Write;

use crate::{
    ast::*,
    lexer::extract,
    token::{Token, TokenKind},
    type_checker::TypeHints,
    types::ValueType,
    util::intern::Interner,
};

const INDENT_WIDTH: usize = 2;

/// Prints the tree of `program`. When `hints` are given, each expression is
/// suffixed with its type.
pub fn print_program_string(
    idents: &Interner,
    program: &Program,
    hints: Option<&TypeHints>,
) -> String {
    let mut buf = Vec::with_capacity(1024);
    // SAFETY: Writes to a Vec don't fail.
    print_program(&mut buf, &Printer { idents, hints }, program).unwrap();
    // SAFETY: Only UTF-8 is written.
    String::from_utf8(buf).unwrap()
}

pub fn print_expr_string(idents: &Interner, expr: &Expr, hints: Option<&TypeHints>) -> String {
    let mut buf = Vec::with_capacity(512);
    print_expr(&mut buf, &Printer { idents, hints }, 0, expr).unwrap();
    String::from_utf8(buf).unwrap()
}

/// One token per line, as in `IDENTIFIER x (0..1)`.
pub fn print_tokens(w: &mut impl Write, src: &str, tokens: &[Token]) -> std::io::Result<()> {
    for &token in tokens {
        let span = token.span();
        let name = token.kind.name();
        match token.kind {
            TokenKind::Identifier => {
                writeln!(w, "{name} {} ({span})", extract::ident(token, src))?;
            }
            TokenKind::Integer => writeln!(w, "{name} {} ({span})", span.substr(src))?,
            TokenKind::String | TokenKind::EscapedString => {
                writeln!(w, "{name} {:?} ({span})", extract::any_string(token, src))?;
            }
            _ => writeln!(w, "{name} ({span})")?,
        }
    }
    Ok(())
}

pub fn print_tokens_string(src: &str, tokens: &[Token]) -> String {
    let mut buf = Vec::with_capacity(tokens.len() * 16);
    print_tokens(&mut buf, src, tokens).unwrap();
    String::from_utf8(buf).unwrap()
}

pub struct Printer<'a> {
    pub idents: &'a Interner,
    pub hints: Option<&'a TypeHints>,
}

pub fn print_program(w: &mut impl Write, p: &Printer<'_>, program: &Program) -> std::io::Result<()> {
    for definition in &program.definitions {
        match definition {
            Definition::Var(var_def) => print_var_def(w, p, 0, var_def)?,
            Definition::Func(func_def) => print_func_def(w, p, 0, func_def)?,
        }
    }
    print_stmts(w, p, 0, &program.statements)
}

fn print_var_def(w: &mut impl Write, p: &Printer<'_>, i: usize, var_def: &VarDef) -> std::io::Result<()> {
    sp(w, i)?;
    let name = p.idents.get(var_def.var.name);
    let ty = ValueType::from_annotation(&var_def.var.ty);
    writeln!(w, "vardef {name}: {ty} ({})", var_def.span)?;
    print_expr(w, p, i + 1, &var_def.value)
}

fn print_func_def(
    w: &mut impl Write,
    p: &Printer<'_>,
    i: usize,
    func_def: &FuncDef,
) -> std::io::Result<()> {
    sp(w, i)?;
    write!(w, "funcdef {}(", p.idents.get(func_def.name))?;
    for (idx, param) in func_def.params.iter().enumerate() {
        if idx > 0 {
            write!(w, ", ")?;
        }
        let ty = ValueType::from_annotation(&param.ty);
        write!(w, "{}: {ty}", p.idents.get(param.name))?;
    }
    write!(w, ")")?;
    if let Some(return_ty) = &func_def.return_ty {
        write!(w, " -> {}", ValueType::from_annotation(return_ty))?;
    }
    writeln!(w, " ({})", func_def.span)?;

    for declaration in &func_def.declarations {
        match declaration {
            Declaration::Var(var_def) => print_var_def(w, p, i + 1, var_def)?,
            Declaration::Global(name) => {
                sp(w, i + 1)?;
                writeln!(w, "global {} ({})", p.idents.get(name), name.span)?;
            }
            Declaration::NonLocal(name) => {
                sp(w, i + 1)?;
                writeln!(w, "nonlocal {} ({})", p.idents.get(name), name.span)?;
            }
        }
    }
    print_stmts(w, p, i + 1, &func_def.body)
}

fn print_stmts(w: &mut impl Write, p: &Printer<'_>, i: usize, stmts: &[Stmt]) -> std::io::Result<()> {
    for stmt in stmts {
        print_stmt(w, p, i, stmt)?;
    }
    Ok(())
}

/// Prints a `label` line followed by the statements one level deeper.
fn print_body(
    w: &mut impl Write,
    p: &Printer<'_>,
    i: usize,
    label: &str,
    stmts: &[Stmt],
) -> std::io::Result<()> {
    sp(w, i)?;
    writeln!(w, "{label}")?;
    print_stmts(w, p, i + 1, stmts)
}

fn print_stmt(w: &mut impl Write, p: &Printer<'_>, i: usize, stmt: &Stmt) -> std::io::Result<()> {
    sp(w, i)?;
    let span = stmt.span;
    match &stmt.kind {
        StmtKind::If {
            cond,
            then_body,
            else_body,
        } => {
            writeln!(w, "if ({span})")?;
            print_expr(w, p, i + 1, cond)?;
            print_body(w, p, i + 1, "then", then_body)?;
            if !else_body.is_empty() {
                print_body(w, p, i + 1, "else", else_body)?;
            }
        }
        StmtKind::While { cond, body } => {
            writeln!(w, "while ({span})")?;
            print_expr(w, p, i + 1, cond)?;
            print_body(w, p, i + 1, "body", body)?;
        }
        StmtKind::For { target, iter, body } => {
            writeln!(w, "for {} ({span})", p.idents.get(target))?;
            print_expr(w, p, i + 1, iter)?;
            print_body(w, p, i + 1, "body", body)?;
        }
        StmtKind::Pass => writeln!(w, "pass ({span})")?,
        StmtKind::Return(value) => {
            writeln!(w, "return ({span})")?;
            if let Some(value) = value {
                print_expr(w, p, i + 1, value)?;
            }
        }
        StmtKind::Assign { targets, value } => {
            writeln!(w, "assign ({span})")?;
            for target in targets {
                print_expr(w, p, i + 1, target)?;
            }
            print_expr(w, p, i + 1, value)?;
        }
        StmtKind::Expr(expr) => {
            writeln!(w, "expr ({span})")?;
            print_expr(w, p, i + 1, expr)?;
        }
    }
    Ok(())
}

pub fn print_expr(w: &mut impl Write, p: &Printer<'_>, i: usize, expr: &Expr) -> std::io::Result<()> {
    sp(w, i)?;
    let span = expr.span;
    // Inferred type, for checked programs.
    let info = match p.hints.and_then(|hints| hints.get(expr.id)) {
        Some(ty) => format!(" %: {ty}"),
        None => String::new(),
    };
    match &expr.kind {
        ExprKind::Literal(Literal::None) => writeln!(w, "none ({span}){info}")?,
        ExprKind::Literal(Literal::Bool(val)) => writeln!(w, "bool {val} ({span}){info}")?,
        ExprKind::Literal(Literal::Int(val)) => writeln!(w, "int {val} ({span}){info}")?,
        ExprKind::Literal(Literal::Str(val)) => writeln!(w, "string {val:?} ({span}){info}")?,
        ExprKind::Ident(ident) => writeln!(w, "ident {} ({span}){info}", p.idents.get(ident))?,
        ExprKind::Unary {
            op,
            expr: inner_expr,
        } => {
            writeln!(w, "unary {op:?} ({span}){info}")?;
            print_expr(w, p, i + 1, inner_expr)?;
        }
        ExprKind::Binary { op, lhs, rhs } => {
            writeln!(w, "binary {op:?} ({span}){info}")?;
            print_expr(w, p, i + 1, lhs)?;
            print_expr(w, p, i + 1, rhs)?;
        }
        ExprKind::IfExpr {
            cond,
            then_arm,
            else_arm,
        } => {
            writeln!(w, "if_expr ({span}){info}")?;
            print_expr(w, p, i + 1, cond)?;
            print_expr(w, p, i + 1, then_arm)?;
            print_expr(w, p, i + 1, else_arm)?;
        }
        ExprKind::List(elements) => {
            writeln!(w, "list ({span}){info}")?;
            for element in elements {
                print_expr(w, p, i + 1, element)?;
            }
        }
        ExprKind::Call { func, args } => {
            writeln!(w, "call {} ({span}){info}", p.idents.get(func))?;
            for arg in args {
                print_expr(w, p, i + 1, arg)?;
            }
        }
        ExprKind::Index { value, index } => {
            writeln!(w, "index ({span}){info}")?;
            print_expr(w, p, i + 1, value)?;
            print_expr(w, p, i + 1, index)?;
        }
    }
    Ok(())
}

fn sp(w: &mut impl Write, i: usize) -> std::io::Result<()> {
    write!(w, "{:width$}", "", width = i * INDENT_WIDTH)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::lexer;

    #[test]
    fn test_token_dump() {
        let src = "x = \"a\\n\" + 42\n";
        let tokens = lexer::lex_in_new(src).unwrap();
        assert_eq!(
            print_tokens_string(src, &tokens),
            indoc::indoc! {r#"
                IDENTIFIER x (0..1)
                = (2..3)
                STRING "a\n" (4..9)
                + (10..11)
                INTEGER 42 (12..14)
                NEWLINE (14..15)
                EOF (15..15)
            "#}
        );
    }
}
