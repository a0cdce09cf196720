use log::debug;

use crate::{
    ast::{
        BinaryOperator, Declaration, Definition, Expr, ExprId, ExprKind, FuncDef, Ident, Literal,
        NamedType, Program, Stmt, StmtKind, TypeAnnotation, TypeAnnotationKind, TypedVar,
        UnaryOperator, VarDef,
    },
    lexer::{self, extract},
    token::{Span, Spanned, Token, TokenKind},
    util::intern::{Interner, Symbol},
};

type Result<T, E = Spanned<Error>> = std::result::Result<T, E>;

/// Lexes and parses a whole program. The first error aborts.
pub fn parse_program(
    src: &str,
    tokens: &mut Vec<Token>,
    ident_interner: &mut Interner,
) -> Result<Program> {
    parse(src, tokens, ident_interner, Parser::parse_program)
}

/// Lexes and parses a single expression (which may be followed by a line
/// break).
pub fn parse_expr(src: &str, tokens: &mut Vec<Token>, ident_interner: &mut Interner) -> Result<Expr> {
    parse(src, tokens, ident_interner, |p| {
        let expr = p.parse_expr()?;
        p.take(TokenKind::Newline);
        p.consume(TokenKind::Eof)?;
        Ok(expr)
    })
}

fn parse<'src, 'tok, 'ident, T>(
    src: &'src str,
    tokens: &'tok mut Vec<Token>,
    ident_interner: &'ident mut Interner,
    f: impl FnOnce(&mut Parser<'src, 'tok, 'ident>) -> Result<T>,
) -> Result<T> {
    assert!(tokens.is_empty());
    lexer::lex(src, tokens).map_err(|e| e.span.wrap(Error::Lexer(e.inner)))?;
    debug!("lexed {} tokens", tokens.len());
    let mut p = Parser::new(src, tokens, ident_interner);
    f(&mut p)
}

struct Parser<'src, 'tok, 'ident> {
    src: &'src str,
    tokens: &'tok [Token],
    ident_interner: &'ident mut Interner,
    cursor: usize,
    expr_count: u32,
    in_function: bool,
}

impl Parser<'_, '_, '_> {
    fn parse_program(&mut self) -> Result<Program> {
        let mut definitions = Vec::new();
        loop {
            if self.is_var_def() {
                definitions.push(Definition::Var(self.parse_var_def()?));
            } else if self.is(TokenKind::Def) {
                definitions.push(Definition::Func(self.parse_func_def()?));
            } else {
                break;
            }
        }

        let mut statements = Vec::new();
        while !self.is(TokenKind::Eof) {
            if self.is_var_def() || self.is(TokenKind::Def) {
                return Err(self.peek().span().wrap(Error::VariableDefinedLater));
            }
            statements.push(self.parse_stmt()?);
        }

        debug!(
            "parsed {} definitions and {} statements",
            definitions.len(),
            statements.len()
        );
        Ok(Program {
            definitions,
            statements,
            expr_count: self.expr_count,
        })
    }

    /// `IDENT ':'` starts a variable definition.
    fn is_var_def(&self) -> bool {
        self.is(TokenKind::Identifier) && self.peek_nth(1).kind == TokenKind::Colon
    }

    fn parse_var_def(&mut self) -> Result<VarDef> {
        let var = self.parse_typed_var()?;
        self.consume(TokenKind::Assign)?;
        let value = self.parse_literal()?;
        let span = var.name.span.to(value.span);
        self.consume(TokenKind::Newline)?;
        Ok(VarDef { var, value, span })
    }

    fn parse_typed_var(&mut self) -> Result<TypedVar> {
        let name = self.parse_ident()?;
        self.consume(TokenKind::Colon)?;
        let ty = self.parse_type()?;
        Ok(TypedVar { name, ty })
    }

    fn parse_func_def(&mut self) -> Result<FuncDef> {
        let def = self.consume(TokenKind::Def)?;
        let name = self.parse_ident()?;
        let open = self.consume(TokenKind::LParen)?;
        let params = self.parse_list(open, TokenKind::RParen, Parser::parse_typed_var)?;
        self.consume(TokenKind::RParen)?;
        let return_ty = if self.take(TokenKind::Arrow) {
            Some(self.parse_type()?)
        } else {
            None
        };
        self.consume(TokenKind::Colon)?;
        self.consume(TokenKind::Newline)?;
        self.consume_indent()?;

        let mut declarations = Vec::new();
        loop {
            if self.is_var_def() {
                declarations.push(Declaration::Var(self.parse_var_def()?));
            } else if self.take(TokenKind::Global) {
                declarations.push(Declaration::Global(self.parse_ident()?));
                self.consume(TokenKind::Newline)?;
            } else if self.take(TokenKind::NonLocal) {
                declarations.push(Declaration::NonLocal(self.parse_ident()?));
                self.consume(TokenKind::Newline)?;
            } else {
                break;
            }
        }

        let was_in_function = std::mem::replace(&mut self.in_function, true);
        let mut body = Vec::new();
        while !self.is(TokenKind::Dedent) && !self.is(TokenKind::Eof) {
            if self.is_var_def() || self.is(TokenKind::Global) || self.is(TokenKind::NonLocal) {
                return Err(self.peek().span().wrap(Error::VariableDefinedLater));
            }
            body.push(self.parse_stmt()?);
        }
        self.in_function = was_in_function;

        let Some(last) = body.last() else {
            return Err(self.peek().span().wrap(Error::Indentation));
        };
        let span = def.span().to(last.span);
        self.consume(TokenKind::Dedent)?;

        Ok(FuncDef {
            name,
            params,
            return_ty,
            declarations,
            body,
            span,
        })
    }

    fn parse_type(&mut self) -> Result<TypeAnnotation> {
        let token = self.advance();
        let kind = match token.kind {
            TokenKind::Int => TypeAnnotationKind::Named(NamedType::Int),
            TokenKind::Bool => TypeAnnotationKind::Named(NamedType::Bool),
            TokenKind::Str => TypeAnnotationKind::Named(NamedType::Str),
            TokenKind::Object => TypeAnnotationKind::Named(NamedType::Object),
            TokenKind::LBracket => {
                let inner = self.parse_type()?;
                let end = self.consume(TokenKind::RBracket)?;
                return Ok(TypeAnnotation {
                    kind: TypeAnnotationKind::List(Box::new(inner)),
                    span: token.span().to(end.span()),
                });
            }
            TokenKind::Identifier => {
                let name = self.intern(token);
                return Err(token.span().wrap(Error::UnknownType(Some(name))));
            }
            _ => return Err(token.span().wrap(Error::UnknownType(None))),
        };
        Ok(TypeAnnotation {
            kind,
            span: token.span(),
        })
    }

    /// Parses `':' NEWLINE INDENT stmt+ DEDENT`.
    fn parse_block(&mut self) -> Result<Vec<Stmt>> {
        self.consume(TokenKind::Colon)?;
        self.consume(TokenKind::Newline)?;
        self.consume_indent()?;
        let mut body = Vec::new();
        while !self.is(TokenKind::Dedent) && !self.is(TokenKind::Eof) {
            body.push(self.parse_stmt()?);
        }
        if body.is_empty() {
            return Err(self.peek().span().wrap(Error::Indentation));
        }
        self.consume(TokenKind::Dedent)?;
        Ok(body)
    }

    fn parse_stmt(&mut self) -> Result<Stmt> {
        let token = self.peek();
        let (kind, span) = match token.kind {
            TokenKind::Pass => {
                self.advance();
                self.consume(TokenKind::Newline)?;
                (StmtKind::Pass, token.span())
            }
            TokenKind::Return => {
                if !self.in_function {
                    return Err(token.span().wrap(Error::ReturnOutsideFunction));
                }
                self.advance();
                let value = if self.is(TokenKind::Newline) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                let span = value.as_ref().map_or(token.span(), |v| token.span().to(v.span));
                self.consume(TokenKind::Newline)?;
                (StmtKind::Return(value), span)
            }
            TokenKind::If => {
                self.advance();
                return self.parse_if(token);
            }
            TokenKind::While => {
                self.advance();
                let cond = self.parse_expr()?;
                let body = self.parse_block()?;
                let span = token.span().to(Self::last_span(&body));
                (StmtKind::While { cond, body }, span)
            }
            TokenKind::For => {
                self.advance();
                let target = self.parse_ident()?;
                self.consume(TokenKind::In)?;
                let iter = self.parse_expr()?;
                let body = self.parse_block()?;
                let span = token.span().to(Self::last_span(&body));
                (StmtKind::For { target, iter, body }, span)
            }
            TokenKind::Indent => return Err(token.span().wrap(Error::UnexpectedIndentation)),
            _ => return self.parse_expr_stmt(),
        };
        Ok(Stmt { kind, span })
    }

    /// Parses the rest of an `if` (or `elif`) whose keyword has already been
    /// consumed. An `elif` becomes an `If` nested in the else body.
    fn parse_if(&mut self, keyword: Token) -> Result<Stmt> {
        let cond = self.parse_expr()?;
        let then_body = self.parse_block()?;
        let else_body = if self.is(TokenKind::Elif) {
            let elif = self.advance();
            vec![self.parse_if(elif)?]
        } else if self.take(TokenKind::Else) {
            self.parse_block()?
        } else {
            Vec::new()
        };
        let last = else_body.last().unwrap_or_else(|| {
            then_body
                .last()
                .expect("parse_block returns a non empty body")
        });
        let span = keyword.span().to(last.span);
        Ok(Stmt {
            kind: StmtKind::If {
                cond,
                then_body,
                else_body,
            },
            span,
        })
    }

    /// Parses either an expression statement or a (possibly chained)
    /// assignment.
    fn parse_expr_stmt(&mut self) -> Result<Stmt> {
        if self.is(TokenKind::Assign) {
            return Err(self.peek().span().wrap(Error::NoLhsInAssignment));
        }
        let first = self.parse_expr()?;
        if !self.is(TokenKind::Assign) {
            self.consume(TokenKind::Newline)?;
            let span = first.span;
            return Ok(Stmt {
                kind: StmtKind::Expr(first),
                span,
            });
        }

        let mut exprs = vec![first];
        while self.take(TokenKind::Assign) {
            if self.is(TokenKind::Newline) {
                return Err(self.peek().span().wrap(Error::ExpectedExpression));
            }
            exprs.push(self.parse_expr()?);
        }
        self.consume(TokenKind::Newline)?;

        let value = exprs.pop().expect("at least two expressions");
        let span = exprs[0].span.to(value.span);
        Ok(Stmt {
            kind: StmtKind::Assign {
                targets: exprs,
                value,
            },
            span,
        })
    }

    fn parse_literal(&mut self) -> Result<Expr> {
        let token = self.peek();
        match token.kind {
            TokenKind::None
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Integer
            | TokenKind::String
            | TokenKind::EscapedString => {
                self.advance();
                self.parse_nud(token)
            }
            _ => Err(token.span().wrap(Error::ExpectedLiteral)),
        }
    }

    fn parse_ident(&mut self) -> Result<Ident> {
        let token = self.consume(TokenKind::Identifier)?;
        Ok(Ident {
            name: self.intern(token),
            span: token.span(),
        })
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_expr_bp(0)
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Expr> {
        let lhs_token = self.advance();
        let mut lhs = self.parse_nud(lhs_token)?;

        loop {
            let op_token = self.peek();

            if let Some((lbp, rbp)) = Self::infix_binding_power(op_token.kind) {
                if lbp < min_bp {
                    // Operator binds less tightly than the minimum required
                    break;
                }

                self.advance(); // Operator
                lhs = self.parse_led(op_token, lhs, rbp)?;
            } else {
                break;
            }
        }

        Ok(lhs)
    }

    /// nud: Parses tokens that start an expression
    /// (prefix operators, literals, atoms)
    fn parse_nud(&mut self, token: Token) -> Result<Expr> {
        let (kind, span) = match token.kind {
            TokenKind::Identifier => {
                let ident = Ident {
                    name: self.intern(token),
                    span: token.span(),
                };
                if self.is(TokenKind::LParen) {
                    let open = self.advance();
                    let args = self.parse_list(open, TokenKind::RParen, Parser::parse_expr)?;
                    let end = self.consume(TokenKind::RParen)?;
                    let call = ExprKind::Call { func: ident, args };
                    (call, token.span().to(end.span()))
                } else {
                    (ExprKind::Ident(ident), token.span())
                }
            }
            TokenKind::Integer => {
                let Ok(parsed) = extract::int(token, self.src) else {
                    return Err(token.span().wrap(Error::IntegerOutOfRange));
                };
                (ExprKind::Literal(Literal::Int(parsed)), token.span())
            }
            TokenKind::String | TokenKind::EscapedString => {
                let value = extract::any_string(token, self.src);
                (ExprKind::Literal(Literal::Str(value)), token.span())
            }
            TokenKind::True => (ExprKind::Literal(Literal::Bool(true)), token.span()),
            TokenKind::False => (ExprKind::Literal(Literal::Bool(false)), token.span()),
            TokenKind::None => (ExprKind::Literal(Literal::None), token.span()),

            // Grouping: ( expr ). Produces no node of its own.
            TokenKind::LParen => {
                let expr = self.parse_expr()?;
                if !self.take(TokenKind::RParen) {
                    return Err(token.span().wrap(Error::UnmatchedParentheses));
                }
                return Ok(expr);
            }

            // List display: [ expr, ... ]
            TokenKind::LBracket => {
                let elements = self.parse_list(token, TokenKind::RBracket, Parser::parse_expr)?;
                let end = self.consume(TokenKind::RBracket)?;
                (ExprKind::List(elements), token.span().to(end.span()))
            }

            kind @ (TokenKind::Minus | TokenKind::Not) => {
                let op = match kind {
                    TokenKind::Minus => UnaryOperator::Neg,
                    TokenKind::Not => UnaryOperator::Not,
                    _ => unreachable!(),
                };
                let ((), rbp) = Self::prefix_binding_power(kind).unwrap();
                let expr = self.parse_expr_bp(rbp)?;
                let span = token.span().to(expr.span);
                let unary = ExprKind::Unary {
                    op,
                    expr: Box::new(expr),
                };
                (unary, span)
            }

            _ => return Err(token.span().wrap(Error::ExpectedExpression)),
        };

        Ok(self.make_expr(kind, span))
    }

    /// led: Parses tokens that follow a left-hand-side expression
    /// (infix/postfix operators)
    fn parse_led(&mut self, op_token: Token, lhs: Expr, rbp: u8) -> Result<Expr> {
        let (kind, span) = match op_token.kind {
            // Conditional: expr if expr else expr
            TokenKind::If => {
                let cond = self.parse_expr_bp(3)?;
                self.consume(TokenKind::Else)?;
                let else_arm = self.parse_expr_bp(rbp)?;
                let span = lhs.span.to(else_arm.span);
                let cond = ExprKind::IfExpr {
                    cond: Box::new(cond),
                    then_arm: Box::new(lhs),
                    else_arm: Box::new(else_arm),
                };
                (cond, span)
            }

            // Index: expr [ expr ]
            TokenKind::LBracket => {
                let index = self.parse_expr()?;
                let end = self.consume(TokenKind::RBracket)?;
                let span = lhs.span.to(end.span());
                let index = ExprKind::Index {
                    value: Box::new(lhs),
                    index: Box::new(index),
                };
                (index, span)
            }

            kind => {
                let op = match kind {
                    TokenKind::Plus => BinaryOperator::Add,
                    TokenKind::Minus => BinaryOperator::Sub,
                    TokenKind::Star => BinaryOperator::Mul,
                    TokenKind::DoubleSlash => BinaryOperator::FloorDiv,
                    TokenKind::Percent => BinaryOperator::Mod,
                    TokenKind::EqEq => BinaryOperator::Eq,
                    TokenKind::NotEq => BinaryOperator::NotEq,
                    TokenKind::Less => BinaryOperator::Less,
                    TokenKind::LessEq => BinaryOperator::LessEq,
                    TokenKind::Greater => BinaryOperator::Greater,
                    TokenKind::GreaterEq => BinaryOperator::GreaterEq,
                    TokenKind::Is => BinaryOperator::Is,
                    TokenKind::And => BinaryOperator::And,
                    TokenKind::Or => BinaryOperator::Or,
                    _ => unreachable!("not an infix operator: {kind:?}"),
                };
                let rhs = self.parse_expr_bp(rbp)?;
                if op.is_comparison() && self.peek().kind.is_comparison() {
                    let next = self.peek();
                    return Err(next.span().wrap(Error::ComparisonNotAssociative));
                }

                let span = lhs.span.to(rhs.span);
                let binary = ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                };
                (binary, span)
            }
        };

        Ok(self.make_expr(kind, span))
    }

    /// Parses `item (',' item)*` until `end_delim` is found. Does **NOT**
    /// consume the end delimiter.
    fn parse_list<T>(
        &mut self,
        open: Token,
        end_delim: TokenKind,
        parse_item: impl Fn(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        if self.is(end_delim) {
            return Ok(items);
        }
        loop {
            items.push(parse_item(self)?);
            if self.take(TokenKind::Comma) {
                continue;
            }
            if self.is(end_delim) {
                break;
            }
            let c = self.peek();
            if matches!(c.kind, TokenKind::Newline | TokenKind::Eof) {
                return Err(open.span().wrap(Error::UnmatchedParentheses));
            }
            return Err(c.span().wrap(Error::CommaExpected));
        }
        Ok(items)
    }

    fn infix_binding_power(kind: TokenKind) -> Option<(u8, u8)> {
        let bp = match kind {
            // Conditional (right-associative in its else arm)
            TokenKind::If => (1, 1),

            TokenKind::Or => (3, 4),
            TokenKind::And => (5, 6),

            // Comparisons (non-associative, checked after the rhs)
            TokenKind::EqEq
            | TokenKind::NotEq
            | TokenKind::Less
            | TokenKind::LessEq
            | TokenKind::Greater
            | TokenKind::GreaterEq
            | TokenKind::Is => (9, 10),

            TokenKind::Plus | TokenKind::Minus => (11, 12),
            TokenKind::Star | TokenKind::DoubleSlash | TokenKind::Percent => (13, 14),

            // Index
            TokenKind::LBracket => (17, 18),

            _ => return None,
        };
        Some(bp)
    }

    fn prefix_binding_power(kind: TokenKind) -> Option<((), u8)> {
        let bp = match kind {
            TokenKind::Not => ((), 7),
            TokenKind::Minus => ((), 15),
            _ => return None,
        };
        Some(bp)
    }
}

impl Parser<'_, '_, '_> {
    fn new<'src, 'tok, 'ident>(
        src: &'src str,
        tokens: &'tok [Token],
        ident_interner: &'ident mut Interner,
    ) -> Parser<'src, 'tok, 'ident> {
        assert!(tokens.last().is_some_and(Token::is_eof));
        Parser {
            src,
            tokens,
            ident_interner,
            cursor: 0,
            expr_count: 0,
            in_function: false,
        }
    }

    fn make_expr(&mut self, kind: ExprKind, span: Span) -> Expr {
        let id = ExprId(self.expr_count);
        self.expr_count += 1;
        Expr { kind, span, id }
    }

    fn intern(&mut self, token: Token) -> Symbol {
        self.ident_interner.intern(extract::ident(token, self.src))
    }

    fn last_span(body: &[Stmt]) -> Span {
        body.last().expect("non empty body").span
    }

    /// Returns the current token. Past the end, this is always `EOF`.
    #[inline]
    fn peek(&self) -> Token {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> Token {
        let last = self.tokens.len() - 1;
        self.tokens[(self.cursor + n).min(last)]
    }

    /// Returns the current token and advances.
    fn advance(&mut self) -> Token {
        let c = self.peek();
        if !c.is_eof() {
            self.cursor += 1;
        }
        c
    }

    /// Checks whether the current token matches the given one.
    fn is(&self, expect: TokenKind) -> bool {
        self.peek().kind == expect
    }

    /// Advances if the current token matches the provided one, returning true.
    /// If not, returns false and doesn't advance.
    fn take(&mut self, expect: TokenKind) -> bool {
        if self.is(expect) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Advances if the current token matches the provided one. If not,
    /// returns an error.
    fn consume(&mut self, expect: TokenKind) -> Result<Token> {
        let c = self.peek();
        if self.is(expect) {
            self.advance();
            Ok(c)
        } else {
            Err(c.span().wrap(Error::TokenNotFound {
                actual: c.kind,
                expected: expect,
            }))
        }
    }

    fn consume_indent(&mut self) -> Result<Token> {
        if self.is(TokenKind::Indent) {
            Ok(self.advance())
        } else {
            Err(self.peek().span().wrap(Error::Indentation))
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    CommaExpected,
    ComparisonNotAssociative,
    ExpectedExpression,
    ExpectedLiteral,
    /// A block without an indented body.
    Indentation,
    NoLhsInAssignment,
    TokenNotFound {
        actual: TokenKind,
        expected: TokenKind,
    },
    UnexpectedIndentation,
    /// `None` if the token isn't even an identifier.
    UnknownType(Option<Symbol>),
    UnmatchedParentheses,
    VariableDefinedLater,
    ReturnOutsideFunction,
    IntegerOutOfRange,
    Lexer(lexer::Error),
}


#[cfg(test)]
mod tests {
    use crate::util::test_utils::tree_tests;

    tree_tests!(
        use parser;

        fn test_simple_expression() {
            let expr = "(1 * 2 + 3) - (1 + 2 * 3)";
            let tree_ok = "
                binary Sub (1..24)
                  binary Add (1..10)
                    binary Mul (1..6)
                      int 1 (1..2)
                      int 2 (5..6)
                    int 3 (9..10)
                  binary Add (15..24)
                    int 1 (15..16)
                    binary Mul (19..24)
                      int 2 (19..20)
                      int 3 (23..24)
            ";
        }

        fn test_literals() {
            let expr = r#"[None, True, False, 42, "a\tb"]"#;
            let tree_ok = r#"
                list (0..31)
                  none (1..5)
                  bool true (7..11)
                  bool false (13..18)
                  int 42 (20..22)
                  string "a\tb" (24..30)
            "#;
        }

        fn test_nested_index_is_left_associative() {
            let expr = "a[i][j]";
            let tree_ok = "
                index (0..7)
                  index (0..4)
                    ident a (0..1)
                    ident i (2..3)
                  ident j (5..6)
            ";
        }

        fn test_call_and_unary() {
            let expr = "-f(x, 1) + len(y)";
            let tree_ok = "
                binary Add (0..17)
                  unary Neg (0..8)
                    call f (1..8)
                      ident x (3..4)
                      int 1 (6..7)
                  call len (11..17)
                    ident y (15..16)
            ";
        }

        fn test_boolean_precedence() {
            let expr = "not a == b and c or d";
            let tree_ok = "
                binary Or (0..21)
                  binary And (0..16)
                    unary Not (0..10)
                      binary Eq (4..10)
                        ident a (4..5)
                        ident b (9..10)
                    ident c (15..16)
                  ident d (20..21)
            ";
        }

        fn test_conditional_expression() {
            let expr = "a if b or c else d if e else f";
            let tree_ok = "
                if_expr (0..30)
                  binary Or (5..11)
                    ident b (5..6)
                    ident c (10..11)
                  ident a (0..1)
                  if_expr (17..30)
                    ident e (22..23)
                    ident d (17..18)
                    ident f (29..30)
            ";
        }

        fn test_mod_and_floordiv() {
            let expr = "a // b % c - d";
            let tree_ok = "
                binary Sub (0..14)
                  binary Mod (0..10)
                    binary FloorDiv (0..6)
                      ident a (0..1)
                      ident b (5..6)
                    ident c (9..10)
                  ident d (13..14)
            ";
        }

        fn test_is_operator() {
            let expr = "x is None";
            let tree_ok = "
                binary Is (0..9)
                  ident x (0..1)
                  none (5..9)
            ";
        }

        fn test_program_with_definitions() {
            let program = indoc::indoc! {"
                x: int = 1
                def f(a: int, b: [str]) -> bool:
                    global x
                    y: object = None
                    return a == x
                print(f(x, [\"s\"]))
            "};
            let tree_ok = r#"
                vardef x: int (0..10)
                  int 1 (9..10)
                funcdef f(a: int, b: [str]) -> bool (11..95)
                  global x (55..56)
                  vardef y: object (61..77)
                    none (73..77)
                  return (82..95)
                    binary Eq (89..95)
                      ident a (89..90)
                      ident x (94..95)
                expr (96..114)
                  call print (96..114)
                    call f (102..113)
                      ident x (104..105)
                      list (107..112)
                        string "s" (108..111)
            "#;
        }

        fn test_control_flow() {
            let program = indoc::indoc! {"
                while x < 3:
                    x = x + 1
                for c in s:
                    pass
                if a:
                    pass
                elif b:
                    pass
                else:
                    a = b = c
            "};
            let tree_ok = "
                while (0..26)
                  binary Less (6..11)
                    ident x (6..7)
                    int 3 (10..11)
                  body
                    assign (17..26)
                      ident x (17..18)
                      binary Add (21..26)
                        ident x (21..22)
                        int 1 (25..26)
                for c (27..47)
                  ident s (36..37)
                  body
                    pass (43..47)
                if (48..99)
                  ident a (51..52)
                  then
                    pass (58..62)
                  else
                    if (63..99)
                      ident b (68..69)
                      then
                        pass (75..79)
                      else
                        assign (90..99)
                          ident a (90..91)
                          ident b (94..95)
                          ident c (98..99)
            ";
        }

        fn test_error_comparison_not_associative() {
            let expr = "a < b < c";
            let expected_errors = &["6..7: comparison operators are not associative"];
        }

        fn test_error_expected_expression() {
            let expr = "1 + ";
            let expected_errors = &["4..4: expected an expression"];
        }

        fn test_error_unmatched_paren() {
            let expr = "(1 + 2";
            let expected_errors = &["0..1: unmatched parentheses"];
        }

        fn test_error_unmatched_call_paren() {
            let expr = "f(1, 2";
            let expected_errors = &["1..2: unmatched parentheses"];
        }

        fn test_error_comma_expected() {
            let expr = "[1 2]";
            let expected_errors = &["3..4: expected ','"];
        }

        fn test_error_integer_out_of_range() {
            let expr = "2147483648";
            let expected_errors = &["0..10: integer literal is out of range"];
        }

        fn test_error_lexer() {
            let expr = "a $ b";
            let expected_errors = &["2..3: invalid symbol '$'"];
        }

        fn test_error_no_lhs_in_assignment() {
            let program = "= 1\n";
            let expected_errors = &["0..1: assignment has no left-hand side"];
        }

        fn test_error_unknown_type() {
            let program = "x: float = 1\n";
            let expected_errors = &["3..8: unknown type `float`"];
        }

        fn test_error_var_def_after_statement() {
            let program = "print(1)\nx: int = 1\n";
            let expected_errors = &["9..10: definitions must precede all statements"];
        }

        fn test_error_var_def_after_statement_in_function() {
            let program = "def f():\n    pass\n    x: int = 1\n";
            let expected_errors = &["22..23: definitions must precede all statements"];
        }

        fn test_error_empty_block() {
            let program = "if True:\npass\n";
            let expected_errors = &["9..13: expected an indented block"];
        }

        fn test_error_unexpected_indentation() {
            let program = "x = 1\n    y = 2\n";
            let expected_errors = &["10..10: unexpected indent"];
        }

        fn test_error_return_outside_function() {
            let program = "return 1\n";
            let expected_errors = &["0..6: 'return' outside function"];
        }

        fn test_error_literal_expected() {
            let program = "x: int = y\n";
            let expected_errors = &["9..10: expected a literal"];
        }

        fn test_error_token_not_found() {
            let program = "while x\n    pass\n";
            let expected_errors = &["7..8: expected token ':', but got NEWLINE"];
        }
    );

    #[test]
    fn test_parse_is_deterministic() {
        let src = include_str!("../demos/lists.py");
        let (_, a) = super::test_utils::parse_program(src);
        let (_, b) = super::test_utils::parse_program(src);
        assert_eq!(a, b);
    }

    #[test]
    fn test_expression_ids_are_dense() {
        let (_, prog) = super::test_utils::parse_program("x: int = 1\nprint(x + 2)\n");
        // `1`, `x`, `2`, `x + 2` and the call.
        assert_eq!(prog.expr_count, 5);
    }
}
