//! Goal specifications: AND across requirement groups, OR within a group.

use serde::Serialize;

use crate::domain::error::{GradeError, Result};

/// One requirement: satisfied when any of its alternatives is satisfied.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RequirementGroup<A> {
    alternatives: Vec<A>,
}

impl<A> RequirementGroup<A> {
    pub fn alternatives(&self) -> &[A] {
        &self.alternatives
    }

    pub fn len(&self) -> usize {
        self.alternatives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alternatives.is_empty()
    }
}

/// An immutable, ordered list of requirement groups.
///
/// # Invariants
///
/// - There is at least one group.
/// - Every group has at least one alternative.
/// - Declared order is preserved; matching tries alternatives in that order.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GoalSpecification<A> {
    groups: Vec<RequirementGroup<A>>,
}

impl<A> GoalSpecification<A> {
    /// Build a goal from nested `groups × alternatives`.
    ///
    /// Returns [`GradeError::Configuration`] when the goal or any group is empty.
    pub fn new(groups: Vec<Vec<A>>) -> Result<Self> {
        if groups.is_empty() {
            return Err(GradeError::config("goal has no requirement groups"));
        }
        if let Some(idx) = groups.iter().position(Vec::is_empty) {
            return Err(GradeError::config(format!(
                "requirement group {idx} has no alternatives"
            )));
        }
        Ok(Self {
            groups: groups
                .into_iter()
                .map(|alternatives| RequirementGroup { alternatives })
                .collect(),
        })
    }

    /// Build a goal from raw alternatives, converting each one.
    ///
    /// The first conversion failure aborts construction and is reported with
    /// its group/alternative position.
    pub fn try_from_raw<R, F>(raw: Vec<Vec<R>>, mut convert: F) -> Result<Self>
    where
        F: FnMut(R) -> Result<A>,
    {
        let mut groups = Vec::with_capacity(raw.len());
        for (i, raw_group) in raw.into_iter().enumerate() {
            let mut group = Vec::with_capacity(raw_group.len());
            for (j, raw_alt) in raw_group.into_iter().enumerate() {
                let alt = convert(raw_alt).map_err(|e| match e {
                    GradeError::Configuration(msg) => {
                        GradeError::config(format!("group {i} alternative {j}: {msg}"))
                    }
                    other => other,
                })?;
                group.push(alt);
            }
            groups.push(group);
        }
        Self::new(groups)
    }

    pub fn groups(&self) -> &[RequirementGroup<A>] {
        &self.groups
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn group(&self, index: usize) -> Option<&RequirementGroup<A>> {
        self.groups.get(index)
    }

    /// Iterate `(group_index, alternative_index, alternative)` in declared order.
    pub fn iter_alternatives(&self) -> impl Iterator<Item = (usize, usize, &A)> {
        self.groups.iter().enumerate().flat_map(|(i, g)| {
            g.alternatives
                .iter()
                .enumerate()
                .map(move |(j, alt)| (i, j, alt))
        })
    }

    /// Convert every alternative, keeping the group structure.
    pub fn map<B, F>(&self, mut f: F) -> GoalSpecification<B>
    where
        F: FnMut(&A) -> B,
    {
        GoalSpecification {
            groups: self
                .groups
                .iter()
                .map(|g| RequirementGroup {
                    alternatives: g.alternatives.iter().map(&mut f).collect(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goal_rejects_empty() {
        let err = GoalSpecification::<String>::new(vec![]).unwrap_err();
        assert!(matches!(err, GradeError::Configuration(_)));
    }

    #[test]
    fn test_goal_rejects_empty_group() {
        let err = GoalSpecification::new(vec![vec!["a"], vec![]]).unwrap_err();
        assert!(err.to_string().contains("group 1"));
    }

    #[test]
    fn test_iter_alternatives_in_declared_order() {
        let goal = GoalSpecification::new(vec![vec!["a", "b"], vec!["c"]]).expect("goal");
        let seen: Vec<_> = goal
            .iter_alternatives()
            .map(|(i, j, a)| (i, j, *a))
            .collect();
        assert_eq!(seen, vec![(0, 0, "a"), (0, 1, "b"), (1, 0, "c")]);
    }

    #[test]
    fn test_try_from_raw_reports_position() {
        let raw = vec![vec!["1", "2"], vec!["x"]];
        let err = GoalSpecification::<u32>::try_from_raw(raw, |s| {
            s.parse::<u32>()
                .map_err(|e| GradeError::config(e.to_string()))
        })
        .unwrap_err();
        assert!(err.to_string().contains("group 1 alternative 0"));
    }

    #[test]
    fn test_map_keeps_structure() {
        let goal = GoalSpecification::new(vec![vec![1, 2], vec![3]]).expect("goal");
        let doubled = goal.map(|x| x * 2);
        assert_eq!(doubled.group_count(), 2);
        assert_eq!(doubled.groups()[0].alternatives(), &[2, 4]);
    }
}
