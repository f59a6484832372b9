//! Grammar normalization: left-recursion elimination followed by
//! left-factoring.
//!
//! Both rewrites preserve the recognized language while making the
//! grammar predictively parsable. The input grammar is never touched; a
//! new derived [`Grammar`] is returned. Synthetic nonterminals are kept
//! fresh by probing the vocabulary and appending `'` until unique, which
//! also keeps them lowercase by the naming convention.

use crate::grammar::{Grammar, Production, Symbol};
use smartstring::alias::String;
use std::collections::{BTreeSet, HashMap};

/// Rewrites a grammar into an LL(1)-safe equivalent.
///
/// Left recursion is eliminated first; factoring only matters once
/// recursion is resolved. Whether the result is actually conflict-free is
/// decided by the table builder.
pub fn normalize(grammar: &Grammar) -> Grammar {
    let mut order: Vec<String> = grammar.nonterminal_order().to_vec();
    let mut prods: HashMap<String, Vec<Production>> = order
        .iter()
        .map(|lhs| {
            let list = grammar
                .rule_group(lhs.as_str())
                .map(|group| group.productions().to_vec())
                .unwrap_or_default();
            (lhs.clone(), list)
        })
        .collect();
    let mut vocab: BTreeSet<String> = grammar
        .terminals()
        .iter()
        .chain(grammar.nonterminals().iter())
        .cloned()
        .collect();

    eliminate_left_recursion(&mut order, &mut prods, &mut vocab);
    left_factor(&mut order, &mut prods, &mut vocab);

    let mut out = Grammar::new();
    for lhs in &order {
        let Some(list) = prods.get(lhs.as_str()) else {
            continue;
        };
        // an emptied group is still declared so the start symbol and
        // declaration order survive
        out.declare_group(lhs.clone());
        for prod in list {
            out.add_production(prod.clone());
        }
    }
    out
}

/// Paull's two-phase method over the declared nonterminal order: for each
/// nonterminal, substitute the alternatives of every earlier nonterminal
/// it starts with, then split immediate recursion `A -> A a | b` into
/// `A -> b A'` and `A' -> a A' | epsilon` with a fresh `A'`.
fn eliminate_left_recursion(
    order: &mut Vec<String>,
    prods: &mut HashMap<String, Vec<Production>>,
    vocab: &mut BTreeSet<String>,
) {
    let declared = order.len();
    for i in 0..declared {
        let ai = order[i].clone();
        for j in 0..i {
            let aj = order[j].clone();
            let donors = prods.get(aj.as_str()).cloned().unwrap_or_default();
            let current = prods.remove(ai.as_str()).unwrap_or_default();
            let mut next: Vec<Production> = Vec::with_capacity(current.len());
            for prod in current {
                match prod.rhs().first() {
                    Some(Symbol::Nonterminal(head)) if head.as_str() == aj.as_str() => {
                        for donor in &donors {
                            let mut rhs = donor.rhs().to_vec();
                            rhs.extend_from_slice(&prod.rhs()[1..]);
                            push_unique(
                                &mut next,
                                Production::from_parts(ai.clone(), rhs, prod.action()),
                            );
                        }
                    }
                    _ => push_unique(&mut next, prod),
                }
            }
            prods.insert(ai.clone(), next);
        }

        let current = prods.remove(ai.as_str()).unwrap_or_default();
        let (recursive, rest): (Vec<_>, Vec<_>) = current.into_iter().partition(|prod| {
            matches!(prod.rhs().first(),
                Some(Symbol::Nonterminal(head)) if head.as_str() == ai.as_str())
        });
        if recursive.is_empty() {
            prods.insert(ai.clone(), rest);
            continue;
        }
        if rest.is_empty() {
            // no base case: the nonterminal derives nothing, and neither
            // would a split, so its alternatives are dropped outright
            prods.insert(ai.clone(), Vec::new());
            continue;
        }

        let fresh = fresh_name(vocab, &ai);
        let mut base: Vec<Production> = Vec::with_capacity(rest.len());
        for prod in rest {
            let mut rhs = prod.rhs().to_vec();
            rhs.push(Symbol::Nonterminal(fresh.clone()));
            push_unique(
                &mut base,
                Production::from_parts(ai.clone(), rhs, prod.action()),
            );
        }
        let mut tail: Vec<Production> = Vec::with_capacity(recursive.len() + 1);
        for prod in recursive {
            if prod.rhs().len() == 1 {
                // a bare self cycle derives nothing new
                continue;
            }
            let mut rhs = prod.rhs()[1..].to_vec();
            rhs.push(Symbol::Nonterminal(fresh.clone()));
            push_unique(
                &mut tail,
                Production::from_parts(fresh.clone(), rhs, prod.action()),
            );
        }
        push_unique(&mut tail, Production::from_parts(fresh.clone(), Vec::new(), None));
        prods.insert(ai.clone(), base);
        prods.insert(fresh.clone(), tail);
        order.push(fresh);
    }
}

/// Factors the longest shared prefix out of every nonterminal's
/// alternatives. The scan stays on a nonterminal until it has no shared
/// prefix left, and synthetic nonterminals are appended to the scan
/// order, so the whole loop runs to a fixed point.
fn left_factor(
    order: &mut Vec<String>,
    prods: &mut HashMap<String, Vec<Production>>,
    vocab: &mut BTreeSet<String>,
) {
    let mut i = 0;
    while i < order.len() {
        let lhs = order[i].clone();
        let list = prods.get(lhs.as_str()).cloned().unwrap_or_default();
        let Some((prefix, members)) = longest_shared_prefix(&list) else {
            i += 1;
            continue;
        };

        let fresh = fresh_name(vocab, &lhs);
        let mut base: Vec<Production> = Vec::with_capacity(list.len());
        let mut tail: Vec<Production> = Vec::with_capacity(members.len());
        let mut replaced = false;
        for (k, prod) in list.into_iter().enumerate() {
            if members.contains(&k) {
                if !replaced {
                    let mut rhs = prefix.clone();
                    rhs.push(Symbol::Nonterminal(fresh.clone()));
                    base.push(Production::from_parts(lhs.clone(), rhs, None));
                    replaced = true;
                }
                push_unique(
                    &mut tail,
                    Production::from_parts(
                        fresh.clone(),
                        prod.rhs()[prefix.len()..].to_vec(),
                        prod.action(),
                    ),
                );
            } else {
                push_unique(&mut base, prod);
            }
        }
        prods.insert(lhs.clone(), base);
        prods.insert(fresh.clone(), tail);
        order.push(fresh);
    }
}

/// The longest rhs prefix shared by at least two alternatives, together
/// with the indexes of every alternative starting with it. Ties are
/// broken by sorted production order, which is deterministic.
fn longest_shared_prefix(list: &[Production]) -> Option<(Vec<Symbol>, Vec<usize>)> {
    if list.len() < 2 {
        return None;
    }
    let mut sorted: Vec<usize> = (0..list.len()).collect();
    sorted.sort_by(|&x, &y| list[x].rhs().cmp(list[y].rhs()));

    let mut best: Option<&[Symbol]> = None;
    for pair in sorted.windows(2) {
        let a = list[pair[0]].rhs();
        let b = list[pair[1]].rhs();
        let shared = a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count();
        if shared > best.map_or(0, <[Symbol]>::len) {
            best = Some(&a[..shared]);
        }
    }
    let prefix = best?.to_vec();
    let members: Vec<usize> = (0..list.len())
        .filter(|&k| list[k].rhs().starts_with(&prefix))
        .collect();
    Some((prefix, members))
}

fn fresh_name(vocab: &mut BTreeSet<String>, base: &str) -> String {
    let mut name = String::from(base);
    while vocab.contains(name.as_str()) {
        name.push('\'');
    }
    vocab.insert(name.clone());
    name
}

fn push_unique(list: &mut Vec<Production>, prod: Production) {
    if !list.contains(&prod) {
        list.push(prod);
    }
}
