//! The `ftr` filter language: an ordered list of AND-joined clauses, each of
//! which is itself an AND or OR over a list of literal byte terms.
//!
//! This replaces the source's parallel `operators` / `terms` arrays
//! (`simple_filter_parser` in the original) with a tagged-variant AST, per
//! the redesign flag in the spec.

use memchr::memmem;

/// One `[op|]term1 term2 ...` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    And(Vec<Vec<u8>>),
    Or(Vec<Vec<u8>>),
}

impl Clause {
    /// True iff `line` satisfies this clause. An empty-terms clause is
    /// vacuously true (defensive, matches the source).
    fn matches(&self, line: &[u8]) -> bool {
        match self {
            Clause::And(terms) => terms.iter().all(|t| memmem::find(line, t).is_some()),
            Clause::Or(terms) => {
                if terms.is_empty() {
                    true
                } else {
                    terms.iter().any(|t| memmem::find(line, t).is_some())
                }
            }
        }
    }
}

/// The full filter: clauses are AND-joined at the top level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec(pub Vec<Clause>);

impl FilterSpec {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Empty clause list matches everything.
    pub fn matches(&self, line: &[u8]) -> bool {
        self.0.iter().all(|c| c.matches(line))
    }

    /// Parse the `ftr` query parameter values into clauses. One `Clause` per
    /// `ftr` occurrence; multiple values are AND-joined by being pushed into
    /// the same top-level list.
    pub fn parse<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        FilterSpec(values.into_iter().map(parse_clause).collect())
    }
}

/// Parse one `[op|]term1 term2 ...` clause. Missing operator defaults to AND.
fn parse_clause(raw: &str) -> Clause {
    let (op, rest) = match raw.split_once('|') {
        Some((op, rest)) => (op.to_ascii_lowercase(), rest),
        None => ("and".to_string(), raw),
    };
    let terms: Vec<Vec<u8>> = rest
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(|t| t.as_bytes().to_vec())
        .collect();
    match op.as_str() {
        "or" => Clause::Or(terms),
        // Any unrecognized operator defaults to AND, same as a missing one.
        _ => Clause::And(terms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_matches_everything() {
        let f = FilterSpec::default();
        assert!(f.matches(b"anything at all"));
        assert!(f.matches(b""));
    }

    #[test]
    fn implicit_and_without_operator() {
        let f = FilterSpec::parse(["custid 4349109566"]);
        assert!(f.matches(b"req custid 4349109566 ok"));
        assert!(!f.matches(b"req custid 000 ok"));
    }

    #[test]
    fn explicit_and_short_circuits_on_first_miss() {
        let f = FilterSpec::parse(["and|err code"]);
        assert!(f.matches(b"err code 500 x"));
        assert!(!f.matches(b"ok code 200 y"));
    }

    #[test]
    fn or_matches_any_term() {
        let f = FilterSpec::parse(["or|500 404"]);
        assert!(f.matches(b"err code 500 x"));
        assert!(f.matches(b"err code 404 z"));
        assert!(!f.matches(b"ok code 200 y"));
    }

    #[test]
    fn multiple_ftr_values_are_and_joined() {
        // ftr=or|500+404&ftr=err  ==  (500 OR 404) AND err
        let f = FilterSpec::parse(["or|500 404", "err"]);
        assert!(f.matches(b"err code 500 x"));
        assert!(f.matches(b"err code 404 z"));
        assert!(!f.matches(b"ok code 500 y")); // no "err"
    }

    #[test]
    fn empty_terms_clause_is_vacuously_true() {
        assert!(Clause::And(vec![]).matches(b"x"));
        assert!(Clause::Or(vec![]).matches(b"x"));
    }

    #[test]
    fn case_insensitive_operator_parsing() {
        assert_eq!(
            parse_clause("OR|a b"),
            Clause::Or(vec![b"a".to_vec(), b"b".to_vec()])
        );
        assert_eq!(
            parse_clause("And|a b"),
            Clause::And(vec![b"a".to_vec(), b"b".to_vec()])
        );
    }

    #[test]
    fn monotone_in_clause_addition() {
        // Adding a clause can only narrow, never widen, the set of matching lines.
        let base = FilterSpec::parse(["err"]);
        let narrowed = FilterSpec::parse(["err", "500"]);
        let lines: [&[u8]; 3] = [b"err code 500", b"err code 404", b"ok code 200"];
        for line in lines {
            if narrowed.matches(line) {
                assert!(base.matches(line));
            }
        }
    }
}
