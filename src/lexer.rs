use std::num::ParseIntError;

use crate::{
    scanner::Scanner,
    token::{Span, Spanned, Token, TokenKind, KEYWORDS},
};

pub const SUGGESTED_TOKENS_CAPACITY: usize = 8_192;

/// Tabs advance the indentation level to the next multiple of this width.
pub const TAB_WIDTH: usize = 8;

type Result<T, E = Spanned<Error>> = std::result::Result<T, E>;

/// Lexes the provided string, producing the tokens into the provided buffer.
///
/// On error, the buffer holds every token produced before the offending one.
pub fn lex(src: &str, tokens: &mut Vec<Token>) -> Result<()> {
    Lexer::new(src, tokens).lex()
}

/// A convenience function that allocates a new buffer per lexed input and
/// returns it.
pub fn lex_in_new(src: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::with_capacity(SUGGESTED_TOKENS_CAPACITY);
    lex(src, &mut tokens)?;
    Ok(tokens)
}

/// The ChocoPy lexer.
///
/// Physical lines are translated into logical ones: blank and comment-only
/// lines produce nothing, and changes of the leading indentation produce
/// `INDENT`/`DEDENT` tokens.
struct Lexer<'src, 'tok> {
    scanner: Scanner<'src>,
    tokens: &'tok mut Vec<Token>,
    /// Set at start-of-file and after each emitted `NEWLINE`.
    is_new_line: bool,
    /// Running column of the current line, while still in its leading
    /// whitespace.
    indent_level: usize,
    /// Never empty; its bottom is always zero.
    indent_stack: Vec<usize>,
}

impl Lexer<'_, '_> {
    /// Scans the source string until the input is exhausted.
    fn lex(mut self) -> Result<()> {
        assert_eq!(self.tokens.len(), 0, "must pass clean tokens buffer");
        loop {
            self.scanner.mark();
            if self.scanner.is_at_end() {
                self.finish();
                return Ok(());
            }
            match self.scanner.peek() {
                ' ' => {
                    self.scanner.advance();
                    if self.is_new_line {
                        self.indent_level += 1;
                    }
                }
                '\t' => {
                    self.scanner.advance();
                    if self.is_new_line {
                        self.indent_level = (self.indent_level / TAB_WIDTH + 1) * TAB_WIDTH;
                    }
                }
                '\n' | '\r' => {
                    let (_, span) = self.scanner.advance_with_span();
                    if !self.is_new_line {
                        self.produce_spanned(TokenKind::Newline, span);
                        self.is_new_line = true;
                    }
                    self.indent_level = 0;
                }
                '#' => self.comment(),
                _ => {
                    if self.is_new_line {
                        self.indentation()?;
                    }
                    let kind = self.scan_token_kind()?;
                    self.produce(kind);
                }
            }
        }
    }

    /// Emits the `INDENT` or `DEDENT` tokens implied by the indentation of
    /// the line which is about to start.
    fn indentation(&mut self) -> Result<()> {
        let span = Span::new_of_length(self.scanner.cursor(), 0);
        let level = self.indent_level;
        let top = self.top();
        if level > top {
            self.indent_stack.push(level);
            self.produce_spanned(TokenKind::Indent, span);
        } else if level < top {
            if !self.indent_stack.contains(&level) {
                return Err(span.wrap(Error::MismatchedIndentation));
            }
            while self.top() > level {
                self.indent_stack.pop();
                self.produce_spanned(TokenKind::Dedent, span);
            }
        }
        self.is_new_line = false;
        Ok(())
    }

    /// Closes the token stream: the last logical line is terminated and every
    /// open indentation level is closed.
    fn finish(&mut self) {
        let span = Span::new_of_length(self.scanner.cursor(), 0);
        if self
            .tokens
            .last()
            .is_some_and(|last| last.kind != TokenKind::Newline)
        {
            self.produce_spanned(TokenKind::Newline, span);
        }
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            self.produce_spanned(TokenKind::Dedent, span);
        }
        self.produce_spanned(TokenKind::Eof, span);
    }

    /// Tries to scan the current character.
    fn scan_token_kind(&mut self) -> Result<TokenKind> {
        use TokenKind::*;
        let kind = match self.scanner.advance() {
            '+' => Plus,
            '-' => match self.scanner.peek() {
                '>' => self.scanner.advance_with(Arrow),
                _ => Minus,
            },
            '*' => Star,
            '/' => match self.scanner.peek() {
                '/' => self.scanner.advance_with(DoubleSlash),
                _ => return Err(self.scanner.span().wrap(Error::InvalidSymbol('/'))),
            },
            '%' => Percent,
            '=' => match self.scanner.peek() {
                '=' => self.scanner.advance_with(EqEq),
                _ => Assign,
            },
            '!' => match self.scanner.peek() {
                '=' => self.scanner.advance_with(NotEq),
                _ => return Err(self.scanner.span().wrap(Error::InvalidSymbol('!'))),
            },
            '<' => match self.scanner.peek() {
                '=' => self.scanner.advance_with(LessEq),
                _ => Less,
            },
            '>' => match self.scanner.peek() {
                '=' => self.scanner.advance_with(GreaterEq),
                _ => Greater,
            },
            '(' => LParen,
            ')' => RParen,
            '[' => LBracket,
            ']' => RBracket,
            ':' => Colon,
            ',' => Comma,
            '"' => self.string()?,
            c if c.is_ascii_alphabetic() || c == '_' => self.identifier_or_keyword(),
            c if c.is_ascii_digit() => self.number(),
            c => return Err(self.scanner.span().wrap(Error::InvalidSymbol(c))),
        };
        Ok(kind)
    }

    /// Lexes a string token, validating its escape sequences.
    ///
    /// The escapes themselves are only performed when the token value is
    /// extracted (see [`extract::escaped_string`]), and only for tokens that
    /// contain at least one of them.
    fn string(&mut self) -> Result<TokenKind> {
        let mut has_escaped = false;
        loop {
            let (current, current_span) = self.scanner.advance_with_span();
            match current {
                // The scanner didn't move, so the input is exhausted.
                _ if current_span.len == 0 => {
                    return Err(self.scanner.span().wrap(Error::UnclosedString));
                }
                '"' => {
                    return Ok(if has_escaped {
                        TokenKind::EscapedString
                    } else {
                        TokenKind::String
                    });
                }
                '\n' | '\r' => {
                    return Err(current_span.wrap(Error::UnescapedLineBreak));
                }
                '\\' => {
                    has_escaped = true;
                    let (escaped, escaped_span) = self.scanner.advance_with_span();
                    if escaped_span.len == 0 {
                        return Err(self.scanner.span().wrap(Error::UnclosedString));
                    }
                    if !matches!(escaped, 't' | 'n' | '\\' | '"') {
                        let span = current_span.to(escaped_span);
                        return Err(span.wrap(Error::UnknownEscape(escaped)));
                    }
                }
                _ => (),
            }
        }
    }

    fn identifier_or_keyword(&mut self) -> TokenKind {
        let valid_identifier_suffix = |c: char| c.is_ascii_alphanumeric() || c == '_';
        while valid_identifier_suffix(self.scanner.peek()) {
            self.scanner.advance();
        }
        KEYWORDS
            .get(self.scanner.substr())
            .copied()
            .unwrap_or(TokenKind::Identifier)
    }

    fn number(&mut self) -> TokenKind {
        while self.scanner.peek().is_ascii_digit() {
            self.scanner.advance();
        }
        TokenKind::Integer
    }

    /// Skips a comment up to (but not including) the line break.
    fn comment(&mut self) {
        while !matches!(self.scanner.peek(), '\n' | '\r') && !self.scanner.is_at_end() {
            self.scanner.advance();
        }
        self.indent_level = 0;
    }
}

impl Lexer<'_, '_> {
    /// Constructs a new lexer with the default state.
    fn new<'src, 'tok>(src: &'src str, tokens: &'tok mut Vec<Token>) -> Lexer<'src, 'tok> {
        Lexer {
            scanner: Scanner::new(src),
            tokens,
            is_new_line: true,
            indent_level: 0,
            indent_stack: vec![0],
        }
    }

    fn top(&self) -> usize {
        self.indent_stack.last().copied().unwrap_or(0)
    }

    /// Produces a token using the marked bounds.
    fn produce(&mut self, kind: TokenKind) {
        self.produce_spanned(kind, self.scanner.span());
    }

    /// Produces a token with the provided span.
    fn produce_spanned(&mut self, kind: TokenKind, span: Span) {
        self.tokens.push(Token::new(kind, span));
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    InvalidSymbol(char),
    UnknownEscape(char),
    MismatchedIndentation,
    UnclosedString,
    UnescapedLineBreak,
}

pub mod extract {
    use super::*;

    pub fn int(token: Token, src: &str) -> Result<i32, ParseIntError> {
        debug_assert_eq!(token.kind, TokenKind::Integer);
        token.span().substr(src).parse()
    }

    pub fn ident(token: Token, src: &str) -> &str {
        debug_assert_eq!(token.kind, TokenKind::Identifier);
        token.span().substr(src)
    }

    pub fn string(token: Token, src: &str) -> Box<str> {
        debug_assert_eq!(token.kind, TokenKind::String);
        let s = token.span().offset(1, -1).substr(src);
        s.to_string().into_boxed_str()
    }

    pub fn escaped_string(token: Token, src: &str) -> Box<str> {
        debug_assert_eq!(token.kind, TokenKind::EscapedString);
        let s = token.span().offset(1, -1).substr(src);
        perform_escape(s).into_boxed_str()
    }

    /// Returns the content of either kind of string token.
    pub fn any_string(token: Token, src: &str) -> Box<str> {
        match token.kind {
            TokenKind::EscapedString => escaped_string(token, src),
            _ => string(token, src),
        }
    }
}

fn perform_escape(raw: &str) -> String {
    let mut buf = String::with_capacity(raw.len());
    let mut escaped = false;
    for char in raw.chars() {
        let char = match (escaped, char) {
            (true, 't') => '\t',
            (true, 'n') => '\n',
            (false, '\\') => {
                escaped = true;
                continue;
            }
            // `\\` and `\"` map to themselves. The lexer has already rejected
            // any other sequence.
            (_, char) => char,
        };
        escaped = false;
        buf.push(char);
    }
    buf.shrink_to_fit();
    debug_assert!(buf.len() < raw.len(), "original string MUST be greater");
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_demos_lex_without_errors() {
        for input in [
            include_str!("../demos/fib.py"),
            include_str!("../demos/lists.py"),
            include_str!("../demos/strings.py"),
        ] {
            let tokens = lex_in_new(input).expect("demo should lex");
            assert!(tokens.last().is_some_and(Token::is_eof));
        }
    }

    #[test]
    fn tests_with_span() {
        use TokenKind::*;
        let cases = cases!(match .. {
            "" => [(Eof, 0..0)],
            "x" => [(Identifier, 0..1), (Newline, 1..1), (Eof, 1..1)],
            "x = 1\n" => [
                (Identifier, 0..1),
                (Assign, 2..3),
                (Integer, 4..5),
                (Newline, 5..6),
                (Eof, 6..6),
            ],
            "+ - * // % == != <= >= < > = -> ( ) [ ] : ," => [
                (Plus, 0..1),
                (Minus, 2..3),
                (Star, 4..5),
                (DoubleSlash, 6..8),
                (Percent, 9..10),
                (EqEq, 11..13),
                (NotEq, 14..16),
                (LessEq, 17..19),
                (GreaterEq, 20..22),
                (Less, 23..24),
                (Greater, 25..26),
                (Assign, 27..28),
                (Arrow, 29..31),
                (LParen, 32..33),
                (RParen, 34..35),
                (LBracket, 36..37),
                (RBracket, 38..39),
                (Colon, 40..41),
                (Comma, 42..43),
                (Newline, 43..43),
                (Eof, 43..43),
            ],
            "if x:\n  pass\ny\n" => [
                (If, 0..2),
                (Identifier, 3..4),
                (Colon, 4..5),
                (Newline, 5..6),
                (Indent, 8..8),
                (Pass, 8..12),
                (Newline, 12..13),
                (Dedent, 13..13),
                (Identifier, 13..14),
                (Newline, 14..15),
                (Eof, 15..15),
            ],
            "def f():\n    if x:\n        pass\nx\n" => [
                (Def, 0..3),
                (Identifier, 4..5),
                (LParen, 5..6),
                (RParen, 6..7),
                (Colon, 7..8),
                (Newline, 8..9),
                (Indent, 13..13),
                (If, 13..15),
                (Identifier, 16..17),
                (Colon, 17..18),
                (Newline, 18..19),
                (Indent, 27..27),
                (Pass, 27..31),
                (Newline, 31..32),
                (Dedent, 32..32),
                (Dedent, 32..32),
                (Identifier, 32..33),
                (Newline, 33..34),
                (Eof, 34..34),
            ],
            "if x:\n\tpass\n" => [
                (If, 0..2),
                (Identifier, 3..4),
                (Colon, 4..5),
                (Newline, 5..6),
                (Indent, 7..7),
                (Pass, 7..11),
                (Newline, 11..12),
                (Dedent, 12..12),
                (Eof, 12..12),
            ],
            "# c\n\nx # t\n  \n" => [
                (Identifier, 5..6),
                (Newline, 10..11),
                (Eof, 14..14),
            ],
            r#""a\tb" "q\"" "plain""# => [
                (EscapedString, 0..6),
                (EscapedString, 7..12),
                (String, 13..20),
                (Newline, 20..20),
                (Eof, 20..20),
            ],
            "while True: pass" => [
                (While, 0..5),
                (True, 6..10),
                (Colon, 10..11),
                (Pass, 12..16),
                (Newline, 16..16),
                (Eof, 16..16),
            ],
            "_a1 None nonlocal global" => [
                (Identifier, 0..3),
                (None, 4..8),
                (NonLocal, 9..17),
                (Global, 18..24),
                (Newline, 24..24),
                (Eof, 24..24),
            ],
        });

        for (input, tokens) in cases {
            let lexed = lex_in_new(input).expect("should lex");
            assert_eq!(lexed, tokens.as_slice(), "input: {input:?}");
        }
    }

    #[test]
    fn test_errors() {
        let cases = [
            ("x\n  y\n z\n", Span::new_of_bounds(7..7), Error::MismatchedIndentation),
            ("a ! b", Span::new_of_bounds(2..3), Error::InvalidSymbol('!')),
            ("a / b", Span::new_of_bounds(2..3), Error::InvalidSymbol('/')),
            ("a $", Span::new_of_bounds(2..3), Error::InvalidSymbol('$')),
            (r#""\q""#, Span::new_of_bounds(1..3), Error::UnknownEscape('q')),
            ("\"abc", Span::new_of_bounds(0..4), Error::UnclosedString),
            ("\"ab\ncd\"", Span::new_of_bounds(3..4), Error::UnescapedLineBreak),
        ];
        for (input, span, error) in cases {
            assert_eq!(lex_in_new(input), Err(span.wrap(error)), "input: {input:?}");
        }
    }

    #[test]
    fn test_partial_tokens_are_kept_on_error() {
        let mut tokens = Vec::new();
        let result = lex("x = 1 ! 2", &mut tokens);
        assert!(result.is_err());
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            [TokenKind::Identifier, TokenKind::Assign, TokenKind::Integer]
        );
    }

    #[test]
    fn test_string_escapes_round_trip() {
        let src = r#""a\tb\nc\\d\"e""#;
        let tokens = lex_in_new(src).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::EscapedString);
        assert_eq!(&*extract::any_string(tokens[0], src), "a\tb\nc\\d\"e");

        let src = r#""plain""#;
        let tokens = lex_in_new(src).unwrap();
        assert_eq!(&*extract::any_string(tokens[0], src), "plain");
    }

    #[test]
    fn test_indentation_is_balanced() {
        let input = include_str!("../demos/fib.py");
        let tokens = lex_in_new(input).unwrap();
        let indents = tokens.iter().filter(|t| t.kind == TokenKind::Indent).count();
        let dedents = tokens.iter().filter(|t| t.kind == TokenKind::Dedent).count();
        assert!(indents > 0);
        assert_eq!(indents, dedents);

        // No logical line is empty.
        let mut previous = None;
        for token in &tokens {
            if token.kind == TokenKind::Newline {
                assert_ne!(previous, Some(TokenKind::Newline));
                assert!(previous.is_some());
            }
            previous = Some(token.kind);
        }
    }

    #[test]
    fn test_lexing_is_deterministic() {
        let input = include_str!("../demos/lists.py");
        assert_eq!(lex_in_new(input), lex_in_new(input));
    }

    macro_rules! cases {
        (match .. {
            $($str:expr => [$(($kind:expr, $range:expr)),* $(,)?]),* $(,)?
        }) => {{
            &[$((
                $str,
                vec![
                    $(Token::new($kind, Span::new_of_bounds($range.start..$range.end))),*
                ],
            )),*]
        }};
    }
    use cases;
}
