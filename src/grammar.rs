//! The grammar model: symbols, productions, rule groups and the grammar
//! itself.
//!
//! Symbols follow a naming convention: an all-uppercase name is a terminal,
//! an all-lowercase name is a nonterminal. The reserved word `epsilon`
//! denotes the empty right-hand side and must appear alone in rule text;
//! internally the epsilon production is the one with an empty `rhs`.

use crate::error::GrammarError;
use crate::sets::Sets;
use smartstring::alias::String;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Reserved rule-text keyword for the empty right-hand side.
pub const EPSILON: &str = "epsilon";

/// End-of-input marker, as it appears in FOLLOW sets and table columns.
pub const END_MARK: &str = "$";

pub(crate) fn is_upper_name(name: &str) -> bool {
    !name.is_empty()
        && name.chars().any(|c| c.is_uppercase())
        && !name.chars().any(|c| c.is_lowercase())
}

pub(crate) fn is_lower_name(name: &str) -> bool {
    !name.is_empty()
        && name.chars().any(|c| c.is_lowercase())
        && !name.chars().any(|c| c.is_uppercase())
}

fn syntax(text: &str, reason: &str) -> GrammarError {
    GrammarError::Syntax {
        text: text.to_string(),
        reason: reason.to_string(),
    }
}

/// A named grammar element.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Symbol {
    Terminal(String),
    Nonterminal(String),
    Epsilon,
    End,
}

impl Symbol {
    /// Classifies a rule-text name by the casing convention.
    ///
    /// The reserved `epsilon` keyword is rejected here; rule parsing
    /// handles it before symbols are classified.
    pub fn from_name(name: &str) -> Result<Self, GrammarError> {
        if name == EPSILON {
            Err(syntax(name, "`epsilon` must appear alone"))
        } else if is_upper_name(name) {
            Ok(Symbol::Terminal(name.into()))
        } else if is_lower_name(name) {
            Ok(Symbol::Nonterminal(name.into()))
        } else {
            Err(syntax(
                name,
                "symbols must be all-uppercase (terminal) or all-lowercase (nonterminal)",
            ))
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Symbol::Terminal(name) | Symbol::Nonterminal(name) => name.as_str(),
            Symbol::Epsilon => EPSILON,
            Symbol::End => END_MARK,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Symbol::Terminal(_))
    }

    pub fn is_nonterminal(&self) -> bool {
        matches!(self, Symbol::Nonterminal(_))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One rewrite alternative for a nonterminal.
///
/// Equality and hashing are structural over (lhs, ordered rhs); the
/// semantic-action slot is carried along but never takes part in identity.
/// An empty `rhs` is the explicit epsilon production.
#[derive(Clone, Debug)]
pub struct Production {
    lhs: String,
    rhs: Vec<Symbol>,
    action: Option<usize>,
}

impl Production {
    /// Builds a production from already-classified symbols, enforcing the
    /// naming convention on the lhs and every rhs symbol.
    pub fn new(lhs: &str, rhs: Vec<Symbol>, action: Option<usize>) -> Result<Self, GrammarError> {
        if !is_lower_name(lhs) || lhs == EPSILON {
            return Err(syntax(lhs, "left-hand side must be a lowercase nonterminal"));
        }
        for sym in &rhs {
            match sym {
                Symbol::Terminal(name) if is_upper_name(name) => {}
                Symbol::Nonterminal(name)
                    if is_lower_name(name) && name.as_str() != EPSILON => {}
                _ => {
                    return Err(syntax(
                        sym.name(),
                        "symbols must be all-uppercase (terminal) or all-lowercase (nonterminal)",
                    ))
                }
            }
        }
        Ok(Self::from_parts(lhs.into(), rhs, action))
    }

    pub(crate) fn from_parts(lhs: String, rhs: Vec<Symbol>, action: Option<usize>) -> Self {
        Self { lhs, rhs, action }
    }

    /// Parses rule text of the form `"lhs : sym1 sym2 ... symN"`.
    ///
    /// The text is colon-delimited with whitespace-separated symbols. The
    /// reserved `epsilon` keyword denotes the empty right-hand side and
    /// must appear alone.
    pub fn parse(text: &str, action: Option<usize>) -> Result<Self, GrammarError> {
        let parts: Vec<&str> = text.split(':').collect();
        if parts.len() != 2 {
            return Err(syntax(text, "expected exactly one `:`"));
        }
        let lhs = parts[0].trim();
        if lhs.is_empty() {
            return Err(syntax(text, "empty left-hand side"));
        }
        if !is_lower_name(lhs) || lhs == EPSILON {
            return Err(syntax(text, "left-hand side must be a lowercase nonterminal"));
        }
        let names: Vec<&str> = parts[1].split_whitespace().collect();
        if names.is_empty() {
            return Err(syntax(text, "empty right-hand side (use `epsilon`)"));
        }
        if names.iter().any(|&name| name == EPSILON) {
            if names.len() != 1 {
                return Err(syntax(text, "`epsilon` must appear alone"));
            }
            return Ok(Self::from_parts(lhs.into(), Vec::new(), action));
        }
        let rhs = names
            .iter()
            .map(|name| Symbol::from_name(name))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_parts(lhs.into(), rhs, action))
    }

    pub fn lhs(&self) -> &str {
        self.lhs.as_str()
    }

    pub fn rhs(&self) -> &[Symbol] {
        &self.rhs
    }

    /// The registration slot of the semantic action bound to this
    /// production, if any. Normalizer rewrites carry the slot along.
    pub fn action(&self) -> Option<usize> {
        self.action
    }

    pub fn is_epsilon(&self) -> bool {
        self.rhs.is_empty()
    }
}

impl PartialEq for Production {
    fn eq(&self, other: &Self) -> bool {
        self.lhs == other.lhs && self.rhs == other.rhs
    }
}

impl Eq for Production {}

impl Hash for Production {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.lhs.hash(state);
        self.rhs.hash(state);
    }
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} :", self.lhs)?;
        if self.rhs.is_empty() {
            return write!(f, " {}", EPSILON);
        }
        for sym in &self.rhs {
            write!(f, " {}", sym)?;
        }
        Ok(())
    }
}

/// All productions sharing one left-hand side, with eagerly maintained
/// terminal and nonterminal membership.
#[derive(Clone, Debug)]
pub struct RuleGroup {
    lhs: String,
    prods: Vec<Production>,
    terminals: BTreeSet<String>,
    nonterminals: BTreeSet<String>,
}

impl RuleGroup {
    fn new(lhs: String) -> Self {
        let mut nonterminals = BTreeSet::new();
        nonterminals.insert(lhs.clone());
        Self {
            lhs,
            prods: Vec::new(),
            terminals: BTreeSet::new(),
            nonterminals,
        }
    }

    /// Adds a production; a structural duplicate is ignored.
    fn add(&mut self, prod: Production) -> bool {
        if self.prods.contains(&prod) {
            return false;
        }
        for sym in prod.rhs() {
            match sym {
                Symbol::Terminal(name) => {
                    self.terminals.insert(name.clone());
                }
                Symbol::Nonterminal(name) => {
                    self.nonterminals.insert(name.clone());
                }
                Symbol::Epsilon | Symbol::End => {}
            }
        }
        self.prods.push(prod);
        true
    }

    pub fn lhs(&self) -> &str {
        self.lhs.as_str()
    }

    /// Productions in first-added order.
    pub fn productions(&self) -> &[Production] {
        &self.prods
    }

    pub fn terminals(&self) -> &BTreeSet<String> {
        &self.terminals
    }

    pub fn nonterminals(&self) -> &BTreeSet<String> {
        &self.nonterminals
    }
}

impl fmt::Display for RuleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, prod) in self.prods.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{}", prod)?;
        }
        Ok(())
    }
}

/// A collection of rule groups keyed by nonterminal name.
///
/// Insertion order is significant: the start symbol is the lhs of the
/// first production ever added, and the normalizer walks nonterminals in
/// declaration order. Vocabularies are maintained eagerly so reads are
/// never stale; FIRST/FOLLOW snapshots are cached per revision.
#[derive(Debug)]
pub struct Grammar {
    groups: HashMap<String, RuleGroup>,
    order: Vec<String>,
    start: Option<String>,
    terminals: BTreeSet<String>,
    nonterminals: BTreeSet<String>,
    revision: u64,
    sets: Option<Sets>,
}

impl Grammar {
    pub fn new() -> Self {
        Self {
            groups: HashMap::new(),
            order: Vec::new(),
            start: None,
            terminals: BTreeSet::new(),
            nonterminals: BTreeSet::new(),
            revision: 0,
            sets: None,
        }
    }

    pub fn add_production(&mut self, prod: Production) {
        let lhs = String::from(prod.lhs());
        self.declare_group(lhs.clone());
        for sym in prod.rhs() {
            match sym {
                Symbol::Terminal(name) => {
                    self.terminals.insert(name.clone());
                }
                Symbol::Nonterminal(name) => {
                    self.nonterminals.insert(name.clone());
                }
                Symbol::Epsilon | Symbol::End => {}
            }
        }
        if let Some(group) = self.groups.get_mut(lhs.as_str()) {
            group.add(prod);
        }
        self.revision += 1;
    }

    /// Registers a rule group for `lhs` even before (or without) any
    /// production. A nonterminal whose alternatives all get dropped by
    /// normalization keeps its place this way, first-added start symbol
    /// included.
    pub(crate) fn declare_group(&mut self, lhs: String) {
        if self.start.is_none() {
            self.start = Some(lhs.clone());
        }
        self.nonterminals.insert(lhs.clone());
        if !self.groups.contains_key(lhs.as_str()) {
            self.groups.insert(lhs.clone(), RuleGroup::new(lhs.clone()));
            self.order.push(lhs);
        }
        self.revision += 1;
    }

    pub fn rule_group(&self, lhs: &str) -> Option<&RuleGroup> {
        self.groups.get(lhs)
    }

    /// Rule groups in declaration order.
    pub fn rule_groups(&self) -> impl Iterator<Item = &RuleGroup> {
        self.order.iter().filter_map(move |lhs| self.groups.get(lhs.as_str()))
    }

    /// All productions, groups in declaration order.
    pub fn productions(&self) -> impl Iterator<Item = &Production> {
        self.rule_groups().flat_map(|group| group.productions().iter())
    }

    /// The lhs of the first production ever added.
    pub fn start_symbol(&self) -> Option<&str> {
        self.start.as_deref()
    }

    /// Merged terminal vocabulary across all rule groups.
    pub fn terminals(&self) -> &BTreeSet<String> {
        &self.terminals
    }

    /// Merged nonterminal vocabulary, including nonterminals that only
    /// appear on a right-hand side.
    pub fn nonterminals(&self) -> &BTreeSet<String> {
        &self.nonterminals
    }

    /// Nonterminals that own a rule group, in declaration order.
    pub fn nonterminal_order(&self) -> &[String] {
        &self.order
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// FIRST/FOLLOW sets for the current revision, recomputed to a fixed
    /// point when any mutation happened since the last read.
    pub fn first_follow(&mut self) -> &Sets {
        let fresh = self
            .sets
            .as_ref()
            .is_some_and(|sets| sets.revision() == self.revision);
        if !fresh {
            let sets = Sets::compute(self);
            self.sets = Some(sets);
        }
        self.sets.as_ref().expect("first/follow cache populated")
    }
}

impl Default for Grammar {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, prod) in self.productions().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", prod)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_rule() {
        let prod = Production::parse("e : t PLUS e", None).unwrap();
        assert_eq!(prod.lhs(), "e");
        assert_eq!(
            prod.rhs(),
            &[
                Symbol::Nonterminal("t".into()),
                Symbol::Terminal("PLUS".into()),
                Symbol::Nonterminal("e".into()),
            ]
        );
        assert_eq!(prod.to_string(), "e : t PLUS e");
    }

    #[test]
    fn parse_epsilon_rule() {
        let prod = Production::parse("e2 : epsilon", None).unwrap();
        assert!(prod.is_epsilon());
        assert_eq!(prod.rhs(), &[]);
        assert_eq!(prod.to_string(), "e2 : epsilon");
    }

    #[test]
    fn epsilon_must_appear_alone() {
        let err = Production::parse("e : epsilon PLUS", None).unwrap_err();
        assert!(matches!(err, GrammarError::Syntax { .. }));
    }

    #[test]
    fn rejects_mixed_case_symbol() {
        let err = Production::parse("e : Plus", None).unwrap_err();
        assert!(matches!(err, GrammarError::Syntax { .. }));
    }

    #[test]
    fn rejects_uppercase_lhs() {
        let err = Production::parse("E : t", None).unwrap_err();
        assert!(matches!(err, GrammarError::Syntax { .. }));
    }

    #[test]
    fn rejects_two_colons() {
        let err = Production::parse("e : t : f", None).unwrap_err();
        assert!(matches!(err, GrammarError::Syntax { .. }));
    }

    #[test]
    fn rejects_empty_rhs() {
        let err = Production::parse("e : ", None).unwrap_err();
        assert!(matches!(err, GrammarError::Syntax { .. }));
    }

    #[test]
    fn structural_equality_ignores_action() {
        let a = Production::parse("e : t", Some(0)).unwrap();
        let b = Production::parse("e : t", Some(7)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn start_symbol_is_first_added() {
        let mut g = Grammar::new();
        g.add_production(Production::parse("e : t e2", None).unwrap());
        g.add_production(Production::parse("t : ID", None).unwrap());
        assert_eq!(g.start_symbol(), Some("e"));
        assert_eq!(g.nonterminal_order(), &["e", "t"]);
    }

    #[test]
    fn vocabulary_is_merged_across_groups() {
        let mut g = Grammar::new();
        g.add_production(Production::parse("e : t PLUS e", None).unwrap());
        g.add_production(Production::parse("t : ID", None).unwrap());
        let terminals: Vec<&str> = g.terminals().iter().map(|s| s.as_str()).collect();
        assert_eq!(terminals, vec!["ID", "PLUS"]);
        let nonterminals: Vec<&str> = g.nonterminals().iter().map(|s| s.as_str()).collect();
        assert_eq!(nonterminals, vec!["e", "t"]);
    }

    #[test]
    fn declared_group_without_productions_keeps_order_and_start() {
        let mut g = Grammar::new();
        g.declare_group("a".into());
        g.add_production(Production::parse("b : ID", None).unwrap());
        assert_eq!(g.start_symbol(), Some("a"));
        assert_eq!(g.nonterminal_order(), &["a", "b"]);
        assert_eq!(g.rule_group("a").unwrap().productions().len(), 0);
    }

    #[test]
    fn duplicate_production_is_ignored() {
        let mut g = Grammar::new();
        g.add_production(Production::parse("e : ID", None).unwrap());
        g.add_production(Production::parse("e : ID", None).unwrap());
        let group = g.rule_group("e").unwrap();
        assert_eq!(group.productions().len(), 1);
    }

    #[test]
    fn rule_group_tracks_membership() {
        let mut g = Grammar::new();
        g.add_production(Production::parse("e : t PLUS e", None).unwrap());
        g.add_production(Production::parse("e : ID", None).unwrap());
        let group = g.rule_group("e").unwrap();
        assert!(group.terminals().contains("PLUS"));
        assert!(group.terminals().contains("ID"));
        assert!(group.nonterminals().contains("e"));
        assert!(group.nonterminals().contains("t"));
    }
}
