//! Single-pass paging of the individuals below a gene or variant.

use std::collections::HashSet;

/// Decides which individual ids of one parent are materialized.
///
/// Ids are classified on first sight and keep their classification.  A new id
/// is included if it is a must-include id or `skip` ids have already been
/// excluded, and fewer than `limit` ids have been included so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedIndividuals {
    skip: usize,
    limit: usize,
    must_include: HashSet<String>,
    included: HashSet<String>,
    excluded: HashSet<String>,
}

impl ProcessedIndividuals {
    pub fn new(skip: usize, limit: usize, must_include: HashSet<String>) -> Self {
        Self {
            skip,
            limit,
            must_include,
            ..Default::default()
        }
    }

    /// Classify `id`, returning whether it is included.
    pub fn process(&mut self, id: &str) -> bool {
        if self.included.contains(id) {
            return true;
        }
        if self.excluded.contains(id) {
            return false;
        }
        if (self.must_include.contains(id) || self.excluded.len() >= self.skip)
            && self.included.len() < self.limit
        {
            self.included.insert(id.to_string());
            true
        } else {
            self.excluded.insert(id.to_string());
            false
        }
    }

    /// Number of distinct ids seen.
    pub fn total_processed(&self) -> usize {
        self.included.len() + self.excluded.len()
    }

    pub fn num_included(&self) -> usize {
        self.included.len()
    }

    /// Whether more ids were seen than fit into the page.
    pub fn has_next(&self) -> bool {
        self.total_processed() > self.skip + self.limit
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn verdicts(paging: &mut ProcessedIndividuals, ids: &[&str]) -> Vec<bool> {
        ids.iter().map(|id| paging.process(id)).collect()
    }

    #[rstest::rstest]
    #[case(0, 2, &[true, true, false, false])]
    #[case(1, 2, &[false, true, true, false])]
    #[case(3, 2, &[false, false, false, true])]
    #[case(0, 0, &[false, false, false, false])]
    fn skip_and_limit(#[case] skip: usize, #[case] limit: usize, #[case] expected: &[bool]) {
        let mut paging = ProcessedIndividuals::new(skip, limit, HashSet::new());
        assert_eq!(verdicts(&mut paging, &["a", "b", "c", "d"]), expected);
        assert_eq!(paging.total_processed(), 4);
    }

    #[test]
    fn repeated_ids_keep_their_verdict() {
        let mut paging = ProcessedIndividuals::new(1, 1, HashSet::new());
        assert_eq!(
            verdicts(&mut paging, &["a", "b", "a", "c", "b", "a"]),
            vec![false, true, false, false, true, false]
        );
        assert_eq!(paging.total_processed(), 3);
        assert_eq!(paging.num_included(), 1);
        assert!(paging.has_next());
    }

    #[test]
    fn must_include_ignores_skip() {
        let mut paging =
            ProcessedIndividuals::new(5, 2, ["c".to_string()].into_iter().collect());
        assert_eq!(
            verdicts(&mut paging, &["a", "b", "c", "d"]),
            vec![false, false, true, false]
        );
        assert!(!paging.has_next());
    }

    #[test]
    fn deterministic_for_same_sequence() {
        let ids = ["x", "y", "x", "z", "w", "y", "v"];
        let mut first = ProcessedIndividuals::new(1, 2, HashSet::new());
        let mut second = ProcessedIndividuals::new(1, 2, HashSet::new());
        assert_eq!(verdicts(&mut first, &ids), verdicts(&mut second, &ids));
        assert_eq!(first, second);
        assert_eq!(first.total_processed(), 5);
    }
}
