//! Boolean conditions over meta-condition atoms, in disjunctive normal
//! form. Guarded symbols carry one of these per variant; resolving a
//! guarded name checks whether the usage site's condition implies the
//! variant's condition.
//!
//! An atom is the expr id of a `meta if` branch condition; two sites share
//! an atom only when they test the very same condition expression.

use super::ExprId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Lit {
    pub atom: ExprId,
    pub positive: bool,
}

impl Lit {
    pub fn negated(self) -> Lit {
        Lit {
            atom: self.atom,
            positive: !self.positive,
        }
    }
}

/// Disjunction of conjunctions of literals. The empty disjunction is
/// `false`; a disjunction containing an empty conjunction is `true`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetaCond {
    clauses: Vec<Vec<Lit>>,
}

impl MetaCond {
    pub fn never() -> Self {
        MetaCond { clauses: vec![] }
    }

    pub fn always() -> Self {
        MetaCond {
            clauses: vec![vec![]],
        }
    }

    pub fn atom(atom: ExprId) -> Self {
        MetaCond {
            clauses: vec![vec![Lit {
                atom,
                positive: true,
            }]],
        }
    }

    pub fn is_always(&self) -> bool {
        self.clauses.iter().any(|clause| clause.is_empty())
    }

    pub fn is_never(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn merge_or(&self, other: &MetaCond) -> MetaCond {
        let mut clauses = self.clauses.clone();
        for clause in &other.clauses {
            if !clauses.contains(clause) {
                clauses.push(clause.clone());
            }
        }
        MetaCond { clauses }
    }

    pub fn merge_and(&self, other: &MetaCond) -> MetaCond {
        let mut clauses = Vec::new();

        for lhs in &self.clauses {
            'rhs: for rhs in &other.clauses {
                let mut merged = lhs.clone();
                for lit in rhs {
                    if merged.contains(&lit.negated()) {
                        // Contradictory clause, drop it.
                        continue 'rhs;
                    }
                    if !merged.contains(lit) {
                        merged.push(*lit);
                    }
                }
                merged.sort();
                if !clauses.contains(&merged) {
                    clauses.push(merged);
                }
            }
        }

        MetaCond { clauses }
    }

    pub fn negate(&self) -> MetaCond {
        // De Morgan: the negation of a DNF is the conjunction of the
        // negated clauses, each of which is a disjunction of negated
        // literals.
        let mut result = MetaCond::always();

        for clause in &self.clauses {
            let mut negated_clause = MetaCond::never();
            for lit in clause {
                negated_clause = negated_clause.merge_or(&MetaCond {
                    clauses: vec![vec![lit.negated()]],
                });
            }
            result = result.merge_and(&negated_clause);
        }

        result
    }

    /// Does `self` imply `other`? True when every clause of `self` is a
    /// superset of some clause of `other`.
    pub fn is_subset_of(&self, other: &MetaCond) -> bool {
        self.clauses.iter().all(|clause| {
            other
                .clauses
                .iter()
                .any(|required| required.iter().all(|lit| clause.contains(lit)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sir::arena::ArenaId;

    fn atom(n: usize) -> MetaCond {
        MetaCond::atom(ExprId::from_index(n))
    }

    #[test]
    fn always_implies_nothing_but_always() {
        assert!(MetaCond::always().is_subset_of(&MetaCond::always()));
        assert!(!MetaCond::always().is_subset_of(&atom(0)));
    }

    #[test]
    fn atom_implies_itself_and_always() {
        assert!(atom(1).is_subset_of(&atom(1)));
        assert!(atom(1).is_subset_of(&MetaCond::always()));
        assert!(!atom(1).is_subset_of(&atom(2)));
    }

    #[test]
    fn and_of_atoms_implies_each_atom() {
        let both = atom(1).merge_and(&atom(2));
        assert!(both.is_subset_of(&atom(1)));
        assert!(both.is_subset_of(&atom(2)));
        assert!(!atom(1).is_subset_of(&both));
    }

    #[test]
    fn or_requires_both_branches_to_imply() {
        let either = atom(1).merge_or(&atom(2));
        assert!(!either.is_subset_of(&atom(1)));
        assert!(atom(1).is_subset_of(&either));
        assert!(either.is_subset_of(&either));
    }

    #[test]
    fn negate_single_atom() {
        let not_one = atom(1).negate();
        assert!(!not_one.is_subset_of(&atom(1)));
        assert!(not_one.is_subset_of(&not_one));
    }

    #[test]
    fn contradictory_and_is_never() {
        let contradiction = atom(1).merge_and(&atom(1).negate());
        assert!(contradiction.is_never());
    }

    #[test]
    fn double_negation_round_trips_implication() {
        let cond = atom(1).merge_or(&atom(2).merge_and(&atom(3)));
        let round_tripped = cond.negate().negate();
        assert!(cond.is_subset_of(&round_tripped));
        assert!(round_tripped.is_subset_of(&cond));
    }

    #[test]
    fn else_branch_condition_tracks_negated_atoms() {
        // `meta if A { .. } else { .. }` guards the else body with !A.
        let else_cond = atom(1).negate();
        let usage_inside_else = else_cond.clone();
        assert!(usage_inside_else.is_subset_of(&else_cond));
        assert!(!MetaCond::always().is_subset_of(&else_cond));
    }
}
