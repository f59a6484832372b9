//! Error types for grammar construction and parsing.
//!
//! [`GrammarError`] covers construction-time failures: malformed rule text,
//! terminals missing from the declared token vocabulary, and grammars that
//! remain ambiguous after normalization. All of them are fatal; there is no
//! retry with alternate tie-breaks.
//!
//! [`ParseError`] covers parse-time failures. The parse halts on the first
//! failure; there is no resynchronization.

use thiserror::Error;

/// A construction-time grammar failure.
#[derive(Debug, Error)]
pub enum GrammarError {
    /// Malformed rule text or a symbol-naming violation.
    #[error("syntax rule `{text}` not valid: {reason}")]
    Syntax {
        /// The offending rule text or symbol.
        text: String,
        reason: String,
    },

    /// A production references a terminal that is not in the declared
    /// token vocabulary.
    #[error("terminal `{name}` not declared as a token")]
    UndeclaredTerminal { name: String },

    /// A parsing-table cell holds more than one production after
    /// normalization: the grammar is not LL(1)-expressible by
    /// left-recursion elimination and left-factoring.
    #[error("grammar is not LL(1): `{nonterminal}` on lookahead `{lookahead}` admits: {candidates}")]
    Ambiguous {
        nonterminal: String,
        lookahead: String,
        /// The conflicting productions, rendered and `; `-joined.
        candidates: String,
    },
}

/// A parse-time failure.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The expected terminal at the top of the stack does not match the
    /// lookahead token.
    #[error("unexpected token `{found}` at line {line}, expected `{expected}`")]
    UnexpectedToken {
        expected: String,
        found: String,
        line: usize,
    },

    /// The parsing table has no production for the current
    /// (nonterminal, lookahead) pair.
    #[error("no rule for `{nonterminal}` on lookahead `{found}` at line {line}")]
    NoRule {
        nonterminal: String,
        found: String,
        line: usize,
    },

    /// A second push-back was requested while one token was already
    /// pending. The stream protocol allows at most one outstanding
    /// pushed-back token.
    #[error("push-back requested while another token is pending")]
    PushBackConflict,

    /// A table cell with more than one candidate was consulted at parse
    /// time. Construction must have rejected this grammar, so hitting it
    /// here is an internal-consistency failure.
    #[error("ambiguous table cell for `{nonterminal}` on `{lookahead}`")]
    AmbiguousCell {
        nonterminal: String,
        lookahead: String,
    },

    /// A semantic-action callback returned an error; it aborts the parse.
    #[error("semantic action failed: {0}")]
    Action(#[from] anyhow::Error),
}
