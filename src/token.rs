use std::{fmt, ops::Range};

#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    lo: usize,
    len: u32,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Token {
        Token {
            kind,
            len: span.len,
            lo: span.lo,
        }
    }

    pub fn span(&self) -> Span {
        Span {
            len: self.len,
            lo: self.lo,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({:?}, {})", self.kind, self.span())
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Span {
    pub len: u32,
    pub lo: usize,
}

impl Span {
    pub fn new_of_bounds(Range { start: lo, end: hi }: Range<usize>) -> Span {
        debug_assert!(hi >= lo);
        Self::new_of_length(lo, u32::try_from(hi - lo).unwrap())
    }

    pub fn new_of_length(lo: usize, len: u32) -> Span {
        Span { len, lo }
    }

    pub fn hi(&self) -> usize {
        self.lo + self.len as usize
    }

    /// Returns a span that covers both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        let lo = self.lo.min(other.lo);
        let hi = self.hi().max(other.hi());
        Span::new_of_bounds(lo..hi)
    }

    /// Shrinks (or grows) both ends of the span.
    pub fn offset(self, lo: isize, hi: isize) -> Span {
        let new_lo = self.lo.saturating_add_signed(lo);
        let new_hi = self.hi().saturating_add_signed(hi).max(new_lo);
        Span::new_of_bounds(new_lo..new_hi)
    }

    pub fn substr(self, src: &str) -> &str {
        &src[self.lo..self.hi()]
    }

    pub fn wrap<T>(self, inner: T) -> Spanned<T> {
        Spanned { span: self, inner }
    }

    /// Resolves the line and column (both 1-based) of the span's start.
    pub fn location(self, src: &str) -> Location<'_> {
        let lo = self.lo.min(src.len());
        let line_start = src[..lo]
            .rfind(['\n', '\r'])
            .map_or(0, |i| i + 1);
        let line_end = src[lo..]
            .find(['\n', '\r'])
            .map_or(src.len(), |i| lo + i);
        // `\r\n` counts once, a lone `\r` like `\n`.
        let before = src[..line_start].as_bytes();
        let line = before
            .iter()
            .enumerate()
            .filter(|&(i, &b)| b == b'\n' || (b == b'\r' && before.get(i + 1) != Some(&b'\n')))
            .count()
            + 1;
        Location {
            line,
            column: src[line_start..lo].chars().count() + 1,
            line_literal: &src[line_start..line_end],
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span({self}, len: {})", self.len)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lo = self.lo;
        let hi = self.hi();
        write!(f, "{lo}..{hi}")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spanned<T> {
    pub span: Span,
    pub inner: T,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Location<'src> {
    pub line: usize,
    pub column: usize,
    pub line_literal: &'src str,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Eof,
    Newline,
    Indent,
    Dedent,

    Def,
    If,
    Elif,
    Else,
    While,
    For,
    In,
    Return,
    Pass,
    Global,
    NonLocal,
    Class,
    None,
    True,
    False,
    And,
    Or,
    Not,
    Is,
    Object,
    Int,
    Bool,
    Str,

    Identifier,
    Integer,
    String,
    /// A string literal that contains at least one escape sequence.
    EscapedString,

    Plus,
    Minus,
    Star,
    /// `//`
    DoubleSlash,
    Percent,
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    LessEq,
    GreaterEq,
    Less,
    Greater,
    /// `=`
    Assign,
    /// `->`
    Arrow,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Colon,
    Comma,
}

impl TokenKind {
    pub fn is_comparison(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            EqEq | NotEq | LessEq | GreaterEq | Less | Greater | Is
        )
    }

    /// The name used by the token dump.
    pub fn name(self) -> &'static str {
        use TokenKind::*;
        match self {
            Eof => "EOF",
            Newline => "NEWLINE",
            Indent => "INDENT",
            Dedent => "DEDENT",
            Def => "DEF",
            If => "IF",
            Elif => "ELIF",
            Else => "ELSE",
            While => "WHILE",
            For => "FOR",
            In => "IN",
            Return => "RETURN",
            Pass => "PASS",
            Global => "GLOBAL",
            NonLocal => "NONLOCAL",
            Class => "CLASS",
            None => "NONE",
            True => "TRUE",
            False => "FALSE",
            And => "AND",
            Or => "OR",
            Not => "NOT",
            Is => "IS",
            Object => "OBJECT",
            Int => "INT",
            Bool => "BOOL",
            Str => "STR",
            Identifier => "IDENTIFIER",
            Integer => "INTEGER",
            String | EscapedString => "STRING",
            Plus => "+",
            Minus => "-",
            Star => "*",
            DoubleSlash => "//",
            Percent => "%",
            EqEq => "==",
            NotEq => "!=",
            LessEq => "<=",
            GreaterEq => ">=",
            Less => "<",
            Greater => ">",
            Assign => "=",
            Arrow => "->",
            LParen => "(",
            RParen => ")",
            LBracket => "[",
            RBracket => "]",
            Colon => ":",
            Comma => ",",
        }
    }
}

pub static KEYWORDS: phf::Map<&'static str, TokenKind> = phf::phf_map! {
    "def" => TokenKind::Def,
    "if" => TokenKind::If,
    "elif" => TokenKind::Elif,
    "else" => TokenKind::Else,
    "while" => TokenKind::While,
    "for" => TokenKind::For,
    "in" => TokenKind::In,
    "return" => TokenKind::Return,
    "pass" => TokenKind::Pass,
    "global" => TokenKind::Global,
    "nonlocal" => TokenKind::NonLocal,
    "class" => TokenKind::Class,
    "None" => TokenKind::None,
    "True" => TokenKind::True,
    "False" => TokenKind::False,
    "and" => TokenKind::And,
    "or" => TokenKind::Or,
    "not" => TokenKind::Not,
    "is" => TokenKind::Is,
    "object" => TokenKind::Object,
    "int" => TokenKind::Int,
    "bool" => TokenKind::Bool,
    "str" => TokenKind::Str,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_of_span() {
        let src = "x: int = 1\nif x:\n    y = 2\n";
        let loc = Span::new_of_length(21, 1).location(src);
        assert_eq!(
            loc,
            Location {
                line: 3,
                column: 5,
                line_literal: "    y = 2",
            }
        );
    }

    #[test]
    fn location_with_carriage_returns() {
        let src = "x: int = 1\rprint(x +)\r";
        let loc = Span::new_of_length(20, 1).location(src);
        assert_eq!((loc.line, loc.column, loc.line_literal), (2, 10, "print(x +)"));

        let src = "a\r\nb\r\n\rc";
        let loc = Span::new_of_length(7, 1).location(src);
        assert_eq!((loc.line, loc.column, loc.line_literal), (4, 1, "c"));
    }

    #[test]
    fn location_at_end_of_input() {
        let src = "a\nb";
        let loc = Span::new_of_length(3, 0).location(src);
        assert_eq!(loc.line, 2);
        assert_eq!(loc.column, 2);
        assert_eq!(loc.line_literal, "b");
    }

    #[test]
    fn span_to_and_offset() {
        let a = Span::new_of_bounds(2..4);
        let b = Span::new_of_bounds(7..9);
        assert_eq!(a.to(b), Span::new_of_bounds(2..9));
        assert_eq!(b.to(a), Span::new_of_bounds(2..9));
        assert_eq!(a.to(b).offset(1, -1), Span::new_of_bounds(3..8));
    }
}
