//! Predictive parsing table construction with conflict detection.
//!
//! Every table cell is filled before any conflict is reported, so the
//! error for a non-LL(1) grammar names the full candidate list instead of
//! the first collision encountered.

use crate::error::GrammarError;
use crate::grammar::{Grammar, Production, Symbol};
use smartstring::alias::String;
use std::collections::BTreeMap;

/// The LL(1) table: (nonterminal, lookahead terminal or end marker) to
/// production indexes. A well-formed table holds exactly one index per
/// populated cell; empty cells are parse errors at runtime.
#[derive(Clone, Debug)]
pub struct ParsingTable {
    prods: Vec<Production>,
    cells: BTreeMap<String, BTreeMap<Symbol, Vec<usize>>>,
}

impl ParsingTable {
    /// Fills the table from FIRST/FOLLOW: a production lands under every
    /// terminal in FIRST of its rhs, and additionally under every symbol
    /// in FOLLOW of its lhs when the rhs is nullable.
    pub fn build(grammar: &mut Grammar) -> Result<Self, GrammarError> {
        let sets = grammar.first_follow().clone();
        let prods: Vec<Production> = grammar.productions().cloned().collect();

        let mut cells: BTreeMap<String, BTreeMap<Symbol, Vec<usize>>> = BTreeMap::new();
        for (idx, prod) in prods.iter().enumerate() {
            let first = sets.first_of(prod.rhs());
            for sym in &first {
                match sym {
                    Symbol::Terminal(_) | Symbol::End => {
                        insert_candidate(&mut cells, prod.lhs(), sym.clone(), idx);
                    }
                    Symbol::Epsilon | Symbol::Nonterminal(_) => {}
                }
            }
            if first.contains(&Symbol::Epsilon) {
                if let Some(follow) = sets.follow(prod.lhs()) {
                    for sym in follow {
                        insert_candidate(&mut cells, prod.lhs(), sym.clone(), idx);
                    }
                }
            }
        }

        for (lhs, row) in &cells {
            for (lookahead, candidates) in row {
                if candidates.len() > 1 {
                    let rendered: Vec<std::string::String> = candidates
                        .iter()
                        .map(|&idx| prods[idx].to_string())
                        .collect();
                    return Err(GrammarError::Ambiguous {
                        nonterminal: lhs.to_string(),
                        lookahead: lookahead.to_string(),
                        candidates: rendered.join("; "),
                    });
                }
            }
        }

        Ok(Self { prods, cells })
    }

    /// Candidate production indexes for a cell; empty when the cell is
    /// unpopulated.
    pub fn candidates(&self, nonterminal: &str, lookahead: &Symbol) -> &[usize] {
        self.cells
            .get(nonterminal)
            .and_then(|row| row.get(lookahead))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn production(&self, idx: usize) -> Option<&Production> {
        self.prods.get(idx)
    }

    pub fn productions(&self) -> &[Production] {
        &self.prods
    }

    /// All populated cells in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Symbol, &[usize])> {
        self.cells.iter().flat_map(|(lhs, row)| {
            row.iter()
                .map(move |(sym, candidates)| (lhs.as_str(), sym, candidates.as_slice()))
        })
    }
}

fn insert_candidate(
    cells: &mut BTreeMap<String, BTreeMap<Symbol, Vec<usize>>>,
    lhs: &str,
    lookahead: Symbol,
    idx: usize,
) {
    let row = cells.entry(String::from(lhs)).or_default();
    let cell = row.entry(lookahead).or_default();
    if !cell.contains(&idx) {
        cell.push(idx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Production;
    use crate::normalize::normalize;

    fn grammar(rules: &[&str]) -> Grammar {
        let mut g = Grammar::new();
        for rule in rules {
            g.add_production(Production::parse(rule, None).unwrap());
        }
        g
    }

    fn expression_grammar() -> Grammar {
        grammar(&[
            "e : t e2",
            "e2 : PLUS t e2",
            "e2 : epsilon",
            "t : f t2",
            "t2 : TIMES f t2",
            "t2 : epsilon",
            "f : LPAREN e RPAREN",
            "f : ID",
        ])
    }

    fn cell(table: &ParsingTable, lhs: &str, lookahead: Symbol) -> std::string::String {
        let candidates = table.candidates(lhs, &lookahead);
        assert_eq!(candidates.len(), 1, "cell ({lhs}, {lookahead})");
        table.production(candidates[0]).unwrap().to_string()
    }

    #[test]
    fn fills_expression_grammar_cells() {
        let mut g = expression_grammar();
        let table = ParsingTable::build(&mut g).unwrap();
        assert_eq!(cell(&table, "e", Symbol::Terminal("ID".into())), "e : t e2");
        assert_eq!(
            cell(&table, "e2", Symbol::Terminal("PLUS".into())),
            "e2 : PLUS t e2"
        );
        // nullable rhs lands under FOLLOW of the lhs
        assert_eq!(
            cell(&table, "e2", Symbol::Terminal("RPAREN".into())),
            "e2 : epsilon"
        );
        assert_eq!(cell(&table, "e2", Symbol::End), "e2 : epsilon");
        assert_eq!(
            cell(&table, "f", Symbol::Terminal("LPAREN".into())),
            "f : LPAREN e RPAREN"
        );
        assert!(table
            .candidates("e", &Symbol::Terminal("PLUS".into()))
            .is_empty());
    }

    #[test]
    fn every_populated_cell_is_singular() {
        let mut g = expression_grammar();
        let table = ParsingTable::build(&mut g).unwrap();
        let mut seen = 0;
        for (_, _, candidates) in table.iter() {
            assert_eq!(candidates.len(), 1);
            seen += 1;
        }
        assert!(seen > 0);
    }

    #[test]
    fn shared_prefix_without_factoring_is_ambiguous() {
        let mut g = grammar(&["s : A B", "s : A C"]);
        let err = ParsingTable::build(&mut g).unwrap_err();
        match err {
            GrammarError::Ambiguous {
                nonterminal,
                lookahead,
                candidates,
            } => {
                assert_eq!(nonterminal, "s");
                assert_eq!(lookahead, "A");
                assert!(candidates.contains("s : A B"));
                assert!(candidates.contains("s : A C"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn first_follow_conflict_survives_normalization() {
        // FIRST(a) and FOLLOW(a) both contain B, so (a, B) stays ambiguous
        let g = grammar(&["s : a B", "a : B", "a : epsilon"]);
        let mut n = normalize(&g);
        let err = ParsingTable::build(&mut n).unwrap_err();
        assert!(matches!(err, GrammarError::Ambiguous { .. }));
    }

    #[test]
    fn normalized_expression_grammar_builds() {
        let g = grammar(&[
            "e : e PLUS t",
            "e : t",
            "t : t TIMES f",
            "t : f",
            "f : LPAREN e RPAREN",
            "f : ID",
        ]);
        let mut n = normalize(&g);
        let table = ParsingTable::build(&mut n).unwrap();
        assert_eq!(cell(&table, "e", Symbol::Terminal("ID".into())), "e : t e'");
        assert_eq!(cell(&table, "e'", Symbol::End), "e' : epsilon");
    }
}
