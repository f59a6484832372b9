//! The table-driven LL(1) parser.
//!
//! [`Ll1Parser::try_new`] takes the grammar exactly as the user wrote it,
//! left-recursive and left-factorable alike, normalizes it and builds the
//! predictive table up front. [`Ll1Parser::parse`] then runs the stack
//! automaton over any [`TokenStream`]: a terminal on top of the stack must
//! match the lookahead, a nonterminal is expanded through the table, and
//! the parse accepts when stack and input run out together.
//!
//! Semantic actions registered against the written rules ride through
//! normalization on their productions and fire at expansion time, which
//! yields leftmost-derivation order.

use crate::error::{GrammarError, ParseError};
use crate::grammar::{is_upper_name, Grammar, Production, Symbol, END_MARK};
use crate::normalize::normalize;
use crate::table::ParsingTable;
use crate::token::{Token, TokenStream};
use smartstring::alias::String;
use std::collections::BTreeSet;
use std::fmt;

/// A per-production callback, fired every time the production is expanded.
/// Returning an error aborts the parse.
pub type SemanticAction = Box<dyn FnMut(Expansion<'_>) -> anyhow::Result<()>>;

/// What a semantic action sees: the production being expanded and the
/// lookahead token that selected it (`None` at end of input).
#[derive(Clone, Copy, Debug)]
pub struct Expansion<'a> {
    pub lhs: &'a str,
    pub rhs: &'a [Symbol],
    pub lookahead: Option<&'a Token>,
}

/// Counters accumulated over one parse.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParserStats {
    /// Tokens pulled from the stream.
    pub tokens: usize,
    /// Terminal matches between stack top and lookahead.
    pub matches: usize,
    /// Nonterminal expansions through the table.
    pub expansions: usize,
}

/// A predictive parser built from rule text.
pub struct Ll1Parser {
    declared: Grammar,
    grammar: Grammar,
    table: ParsingTable,
    actions: Vec<Option<SemanticAction>>,
}

// manual impl: boxed action closures have no Debug
impl fmt::Debug for Ll1Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ll1Parser")
            .field("declared", &self.declared)
            .field("grammar", &self.grammar)
            .field("table", &self.table)
            .field("actions", &self.actions.len())
            .finish()
    }
}

impl Ll1Parser {
    /// Builds a parser from rule texts with optional semantic actions and
    /// the declared token vocabulary.
    ///
    /// Token names must be unique and all-uppercase. Every terminal used
    /// by a rule must be declared. The grammar is normalized before the
    /// table is built; a grammar that stays conflicted afterwards is
    /// rejected as ambiguous.
    pub fn try_new<S: AsRef<str>>(
        rules: Vec<(S, Option<SemanticAction>)>,
        tokens: &[&str],
    ) -> Result<Self, GrammarError> {
        let mut vocab: BTreeSet<String> = BTreeSet::new();
        for &unit in tokens {
            if !is_upper_name(unit) {
                return Err(GrammarError::Syntax {
                    text: unit.to_string(),
                    reason: "token names must be all-uppercase".to_string(),
                });
            }
            if !vocab.insert(unit.into()) {
                return Err(GrammarError::Syntax {
                    text: unit.to_string(),
                    reason: "token declared twice".to_string(),
                });
            }
        }

        let mut declared = Grammar::new();
        let mut actions: Vec<Option<SemanticAction>> = Vec::with_capacity(rules.len());
        for (slot, (text, action)) in rules.into_iter().enumerate() {
            declared.add_production(Production::parse(text.as_ref(), Some(slot))?);
            actions.push(action);
        }
        for name in declared.terminals() {
            if !vocab.contains(name) {
                return Err(GrammarError::UndeclaredTerminal {
                    name: name.to_string(),
                });
            }
        }

        let mut grammar = normalize(&declared);
        let table = ParsingTable::build(&mut grammar)?;
        Ok(Self {
            declared,
            grammar,
            table,
            actions,
        })
    }

    /// Builds an action-less parser from rule texts.
    pub fn try_from_rules(rules: &[&str], tokens: &[&str]) -> Result<Self, GrammarError> {
        let rules: Vec<(&str, Option<SemanticAction>)> =
            rules.iter().map(|&text| (text, None)).collect();
        Self::try_new(rules, tokens)
    }

    /// The grammar as written, before normalization.
    pub fn declared_grammar(&self) -> &Grammar {
        &self.declared
    }

    /// The normalized grammar the table was built from.
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn table(&self) -> &ParsingTable {
        &self.table
    }

    /// Runs the stack automaton over a token stream.
    ///
    /// The stack starts with the start symbol and the parse accepts when
    /// stack and input are exhausted together. Leftover input and a
    /// leftover stack are both rejections.
    pub fn parse<S: TokenStream>(&mut self, stream: &mut S) -> Result<ParserStats, ParseError> {
        let mut stats = ParserStats::default();
        let Some(start) = self.grammar.start_symbol() else {
            return Ok(stats);
        };
        let mut stack: Vec<Symbol> = vec![Symbol::Nonterminal(start.into())];
        let mut lookahead = stream.try_next()?;
        if lookahead.is_some() {
            stats.tokens += 1;
        }
        let mut line = lookahead.as_ref().map_or(0, |t| t.line_no);

        loop {
            let Some(top) = stack.last().cloned() else {
                return match lookahead {
                    None => {
                        log::trace!("Accept");
                        Ok(stats)
                    }
                    Some(token) => Err(ParseError::UnexpectedToken {
                        expected: END_MARK.to_string(),
                        found: token.unit.to_string(),
                        line: token.line_no,
                    }),
                };
            };
            match top {
                Symbol::Terminal(name) => match &lookahead {
                    Some(token) if token.unit == name => {
                        log::trace!("Match {} `{}`", name, token.lexeme);
                        stack.pop();
                        stats.matches += 1;
                        line = token.line_no;
                        lookahead = stream.try_next()?;
                        if lookahead.is_some() {
                            stats.tokens += 1;
                        }
                    }
                    _ => {
                        return Err(ParseError::UnexpectedToken {
                            expected: name.to_string(),
                            found: found_name(&lookahead),
                            line: lookahead.as_ref().map_or(line, |t| t.line_no),
                        })
                    }
                },
                // productions never carry these markers, so the stack
                // never does either
                Symbol::Epsilon | Symbol::End => {
                    stack.pop();
                }
                Symbol::Nonterminal(name) => {
                    let la_sym = match &lookahead {
                        Some(token) => Symbol::Terminal(token.unit.clone()),
                        None => Symbol::End,
                    };
                    match self.table.candidates(&name, &la_sym) {
                        [] => {
                            return Err(ParseError::NoRule {
                                nonterminal: name.to_string(),
                                found: found_name(&lookahead),
                                line: lookahead.as_ref().map_or(line, |t| t.line_no),
                            })
                        }
                        &[idx] => {
                            let prod = self.table.productions()[idx].clone();
                            log::trace!("Expand {}", prod);
                            stack.pop();
                            for sym in prod.rhs().iter().rev() {
                                stack.push(sym.clone());
                            }
                            stats.expansions += 1;
                            if let Some(slot) = prod.action() {
                                if let Some(action) =
                                    self.actions.get_mut(slot).and_then(Option::as_mut)
                                {
                                    action(Expansion {
                                        lhs: prod.lhs(),
                                        rhs: prod.rhs(),
                                        lookahead: lookahead.as_ref(),
                                    })?;
                                }
                            }
                        }
                        _ => {
                            return Err(ParseError::AmbiguousCell {
                                nonterminal: name.to_string(),
                                lookahead: la_sym.to_string(),
                            })
                        }
                    }
                }
            }
        }
    }
}

fn found_name(lookahead: &Option<Token>) -> std::string::String {
    lookahead
        .as_ref()
        .map_or_else(|| END_MARK.to_string(), |t| t.unit.to_string())
}
