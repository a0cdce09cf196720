use std::{iter::Peekable, str::Chars};

use crate::token::Span;

/// Single character look-ahead over the source, tracking byte offsets.
///
/// The scanner yields `'\0'` once the input is exhausted.
pub(crate) struct Scanner<'src> {
    src: &'src str,
    iter: Peekable<Chars<'src>>,
    cursor: usize,
    current_lo: usize,
}

impl<'src> Scanner<'src> {
    pub fn new(src: &'src str) -> Scanner<'src> {
        Scanner {
            src,
            iter: src.chars().peekable(),
            cursor: 0,
            current_lo: 0,
        }
    }

    /// Starts a new token "mark" at the current position.
    pub fn mark(&mut self) {
        self.current_lo = self.cursor;
    }

    /// Returns the next char and advances the iterator.
    pub fn advance(&mut self) -> char {
        self.iter
            .next()
            .inspect(|c| self.cursor += c.len_utf8())
            .unwrap_or('\0')
    }

    /// Advances and returns the provided value.
    pub fn advance_with<T>(&mut self, value: T) -> T {
        self.advance();
        value
    }

    /// Returns the next char (with its span) and advances the iterator.
    pub fn advance_with_span(&mut self) -> (char, Span) {
        let lo = self.cursor;
        let char = self.advance();
        (char, Span::new_of_bounds(lo..self.cursor))
    }

    /// Returns the next char without advancing the iterator.
    pub fn peek(&mut self) -> char {
        self.iter.peek().copied().unwrap_or('\0')
    }

    /// Whether the input has been fully consumed.
    pub fn is_at_end(&mut self) -> bool {
        self.iter.peek().is_none()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Returns the span from the last mark up to the cursor.
    pub fn span(&self) -> Span {
        Span::new_of_bounds(self.current_lo..self.cursor)
    }

    /// Returns the substring of the current marked bounds.
    pub fn substr(&self) -> &'src str {
        self.span().substr(self.src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_byte_offsets() {
        let mut s = Scanner::new("aé\n");
        s.mark();
        assert_eq!(s.advance(), 'a');
        assert_eq!(s.peek(), 'é');
        let (c, span) = s.advance_with_span();
        assert_eq!(c, 'é');
        assert_eq!(span, Span::new_of_bounds(1..3));
        assert_eq!(s.substr(), "aé");
        assert_eq!(s.advance(), '\n');
        assert!(s.is_at_end());
        assert_eq!(s.advance(), '\0');
        assert_eq!(s.cursor(), 4);
    }
}
