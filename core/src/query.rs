//! Boolean query parsing.
//!
//! The grammar is fixed at two levels, with no parentheses:
//!
//! ```text
//! query   := group (" and " group)*
//! group   := term (" or " term)*
//! term    := ["not "] phrase | phrase " not " phrase
//! ```
//!
//! Input that does not fit is searched as a single positive phrase instead of
//! producing an error.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// Documents scored by the phrase's terms.
    Phrase(String),
    /// Leading `not x`: every document, minus those matching `x`.
    Not(String),
    /// `a not b`: documents scored by `a`, minus those matching `b`.
    Except(String, String),
}

/// Conjunction of disjunctions. An empty query matches nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Query {
    pub groups: Vec<Vec<Term>>,
}

impl Query {
    pub fn is_empty(&self) -> bool { self.groups.is_empty() }
}

pub fn parse(raw: &str) -> Query {
    let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    if normalized.is_empty() {
        return Query::default();
    }
    parse_groups(&normalized).unwrap_or_else(|| Query { groups: vec![vec![Term::Phrase(normalized)]] })
}

fn parse_groups(q: &str) -> Option<Query> {
    let groups = q
        .split(" and ")
        .map(|group| group.split(" or ").map(parse_term).collect::<Option<Vec<_>>>())
        .collect::<Option<Vec<_>>>()?;
    Some(Query { groups })
}

fn parse_term(term: &str) -> Option<Term> {
    if let Some(rest) = term.strip_prefix("not ") {
        return phrase(rest).map(|p| Term::Not(p.to_string()));
    }
    match term.split_once(" not ") {
        Some((include, exclude)) => Some(Term::Except(phrase(include)?.to_string(), phrase(exclude)?.to_string())),
        None => phrase(term).map(|p| Term::Phrase(p.to_string())),
    }
}

/// A bare phrase: non-empty, no embedded `not`, and not starting or ending on an operator word.
fn phrase(s: &str) -> Option<&str> {
    let s = s.trim();
    let is_operator = |w: Option<&str>| matches!(w, Some("and" | "or" | "not"));
    if s.is_empty() || s.contains(" not ") || is_operator(s.split(' ').next()) || is_operator(s.rsplit(' ').next()) {
        return None;
    }
    Some(s)
}
