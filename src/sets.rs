//! Fixed-point FIRST/FOLLOW computation.
//!
//! Both sets are grown by repeated full passes over the grammar until a
//! pass changes nothing. Termination is guaranteed: the sets grow
//! monotonically inside a finite vocabulary. A single pass is not enough
//! for mutually recursive nonterminals.

use crate::grammar::{Grammar, Symbol};
use smartstring::alias::String;
use std::collections::{BTreeMap, BTreeSet};

/// A FIRST/FOLLOW snapshot for one grammar revision.
///
/// FIRST maps a nonterminal to the terminals (possibly including epsilon)
/// that can begin a derivation from it. FOLLOW maps a nonterminal to the
/// terminals (possibly including end-of-input) that can immediately
/// follow it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sets {
    revision: u64,
    first: BTreeMap<String, BTreeSet<Symbol>>,
    follow: BTreeMap<String, BTreeSet<Symbol>>,
}

impl Sets {
    pub fn compute(grammar: &Grammar) -> Self {
        let empty_entries = || -> BTreeMap<String, BTreeSet<Symbol>> {
            grammar
                .nonterminals()
                .iter()
                .map(|name| (name.clone(), BTreeSet::new()))
                .collect()
        };

        let mut first = empty_entries();
        let mut changed = true;
        while changed {
            changed = false;
            for group in grammar.rule_groups() {
                for prod in group.productions() {
                    let add = first_of_in(&first, prod.rhs());
                    if let Some(entry) = first.get_mut(group.lhs()) {
                        for sym in add {
                            if entry.insert(sym) {
                                changed = true;
                            }
                        }
                    }
                }
            }
        }

        let mut follow = empty_entries();
        if let Some(start) = grammar.start_symbol() {
            if let Some(entry) = follow.get_mut(start) {
                entry.insert(Symbol::End);
            }
        }
        changed = true;
        while changed {
            changed = false;
            for group in grammar.rule_groups() {
                for prod in group.productions() {
                    let rhs = prod.rhs();
                    for (i, sym) in rhs.iter().enumerate() {
                        let Symbol::Nonterminal(b) = sym else {
                            continue;
                        };
                        let beta = first_of_in(&first, &rhs[i + 1..]);
                        let mut add: BTreeSet<Symbol> = beta
                            .iter()
                            .filter(|s| !matches!(s, Symbol::Epsilon))
                            .cloned()
                            .collect();
                        if beta.contains(&Symbol::Epsilon) {
                            if let Some(of_lhs) = follow.get(group.lhs()) {
                                add.extend(of_lhs.iter().cloned());
                            }
                        }
                        if let Some(entry) = follow.get_mut(b.as_str()) {
                            for sym in add {
                                if entry.insert(sym) {
                                    changed = true;
                                }
                            }
                        }
                    }
                }
            }
        }

        Self {
            revision: grammar.revision(),
            first,
            follow,
        }
    }

    pub(crate) fn revision(&self) -> u64 {
        self.revision
    }

    pub fn first(&self, nonterminal: &str) -> Option<&BTreeSet<Symbol>> {
        self.first.get(nonterminal)
    }

    pub fn follow(&self, nonterminal: &str) -> Option<&BTreeSet<Symbol>> {
        self.follow.get(nonterminal)
    }

    /// FIRST of an arbitrary symbol sequence; the empty sequence yields
    /// `{epsilon}`.
    pub fn first_of(&self, seq: &[Symbol]) -> BTreeSet<Symbol> {
        first_of_in(&self.first, seq)
    }
}

/// Scans a sequence left to right, accumulating FIRST of each symbol and
/// stopping at the first symbol whose FIRST excludes epsilon. If every
/// symbol was nullable the whole sequence derives epsilon.
fn first_of_in(
    first: &BTreeMap<String, BTreeSet<Symbol>>,
    seq: &[Symbol],
) -> BTreeSet<Symbol> {
    let mut out = BTreeSet::new();
    for sym in seq {
        match sym {
            Symbol::Terminal(_) | Symbol::End => {
                out.insert(sym.clone());
                return out;
            }
            Symbol::Epsilon => continue,
            Symbol::Nonterminal(name) => {
                let of_sym = first.get(name.as_str());
                let nullable = of_sym.is_some_and(|f| f.contains(&Symbol::Epsilon));
                if let Some(of_sym) = of_sym {
                    out.extend(
                        of_sym
                            .iter()
                            .filter(|s| !matches!(s, Symbol::Epsilon))
                            .cloned(),
                    );
                }
                if !nullable {
                    return out;
                }
            }
        }
    }
    out.insert(Symbol::Epsilon);
    out
}
