//! Tokens and the pull-based stream the parser consumes.
//!
//! The parser owns lookahead management; the stream only has to hand out
//! tokens one at a time and accept at most one pushed-back token. Any
//! lexer can feed the parser by implementing [`TokenStream`], and
//! [`TokenIter`] adapts a plain iterator of tokens.

use crate::error::ParseError;
use smartstring::alias::String;
use std::iter::FusedIterator;

/// One lexed token: the terminal name it matched, the matched text, and
/// the source line it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    /// Terminal name, all-uppercase by the naming convention.
    pub unit: String,
    /// Matched source text.
    pub lexeme: String,
    /// One-based source line, used in parse errors.
    pub line_no: usize,
}

impl Token {
    pub fn new(unit: impl Into<String>, lexeme: impl Into<String>, line_no: usize) -> Self {
        Self {
            unit: unit.into(),
            lexeme: lexeme.into(),
            line_no,
        }
    }
}

/// A pull-based token source with single-slot push-back.
pub trait TokenStream {
    /// The next token, or `None` at end of input. A pushed-back token is
    /// returned before anything else.
    fn try_next(&mut self) -> Result<Option<Token>, ParseError>;

    /// Returns a token to the stream so the next [`try_next`] yields it
    /// again. At most one token may be outstanding; a second push-back
    /// fails with [`ParseError::PushBackConflict`].
    ///
    /// [`try_next`]: TokenStream::try_next
    fn push_back(&mut self, token: Token) -> Result<(), ParseError>;
}

/// Adapts any fused token iterator into a [`TokenStream`].
#[derive(Debug)]
pub struct TokenIter<I>
where
    I: FusedIterator<Item = Token>,
{
    input: I,
    pending: Option<Token>,
}

impl<I> TokenIter<I>
where
    I: FusedIterator<Item = Token>,
{
    pub fn new(input: I) -> Self {
        Self {
            input,
            pending: None,
        }
    }
}

impl<I> TokenStream for TokenIter<I>
where
    I: FusedIterator<Item = Token>,
{
    fn try_next(&mut self) -> Result<Option<Token>, ParseError> {
        if let Some(token) = self.pending.take() {
            return Ok(Some(token));
        }
        Ok(self.input.next())
    }

    fn push_back(&mut self, token: Token) -> Result<(), ParseError> {
        if self.pending.is_some() {
            return Err(ParseError::PushBackConflict);
        }
        self.pending = Some(token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(units: &[&str]) -> TokenIter<std::vec::IntoIter<Token>> {
        let tokens: Vec<Token> = units
            .iter()
            .enumerate()
            .map(|(i, unit)| Token::new(*unit, *unit, i + 1))
            .collect();
        TokenIter::new(tokens.into_iter())
    }

    #[test]
    fn yields_tokens_then_none() {
        let mut s = stream(&["ID", "PLUS"]);
        assert_eq!(s.try_next().unwrap().unwrap().unit, "ID");
        assert_eq!(s.try_next().unwrap().unwrap().unit, "PLUS");
        assert!(s.try_next().unwrap().is_none());
        assert!(s.try_next().unwrap().is_none());
    }

    #[test]
    fn pushed_back_token_comes_first() {
        let mut s = stream(&["ID", "PLUS"]);
        let first = s.try_next().unwrap().unwrap();
        s.push_back(first.clone()).unwrap();
        assert_eq!(s.try_next().unwrap().unwrap(), first);
        assert_eq!(s.try_next().unwrap().unwrap().unit, "PLUS");
    }

    #[test]
    fn second_push_back_conflicts() {
        let mut s = stream(&["ID", "PLUS"]);
        let first = s.try_next().unwrap().unwrap();
        s.push_back(first.clone()).unwrap();
        let err = s.push_back(first).unwrap_err();
        assert!(matches!(err, ParseError::PushBackConflict));
    }

    #[test]
    fn push_back_works_at_end_of_input() {
        let mut s = stream(&["ID"]);
        let only = s.try_next().unwrap().unwrap();
        assert!(s.try_next().unwrap().is_none());
        s.push_back(only.clone()).unwrap();
        assert_eq!(s.try_next().unwrap().unwrap(), only);
        assert!(s.try_next().unwrap().is_none());
    }
}
