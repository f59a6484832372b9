//! Predictive LL(1) parser construction.
//!
//! Rules are written as plain text, `"lhs : sym1 sym2 ..."`, with
//! all-uppercase names for terminals and all-lowercase names for
//! nonterminals. [`Ll1Parser`] normalizes the grammar (left-recursion
//! elimination, then left-factoring), computes FIRST/FOLLOW to a fixed
//! point, builds the predictive table and rejects grammars that remain
//! ambiguous. Parsing runs a stack automaton over any [`TokenStream`],
//! firing registered semantic actions in leftmost-derivation order.
//!
//! ```
//! use parll::{Ll1Parser, Token, TokenIter};
//!
//! let mut parser = Ll1Parser::try_from_rules(
//!     &["e : e PLUS t", "e : t", "t : ID"],
//!     &["PLUS", "ID"],
//! )?;
//! let tokens = vec![
//!     Token::new("ID", "x", 1),
//!     Token::new("PLUS", "+", 1),
//!     Token::new("ID", "y", 1),
//! ];
//! let stats = parser.parse(&mut TokenIter::new(tokens.into_iter()))?;
//! assert_eq!(stats.matches, 3);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod grammar;
mod normalize;
mod parser;
mod sets;
mod table;
mod token;

pub use crate::error::{GrammarError, ParseError};
pub use crate::grammar::{Grammar, Production, RuleGroup, Symbol, END_MARK, EPSILON};
pub use crate::normalize::normalize;
pub use crate::parser::{Expansion, Ll1Parser, ParserStats, SemanticAction};
pub use crate::sets::Sets;
pub use crate::table::ParsingTable;
pub use crate::token::{Token, TokenIter, TokenStream};
