//! Static validation of stage graphs.
//!
//! Checks run in a fixed order and the first failure wins:
//! labels, terminal presence, dependency resolution, loops, and finally
//! consistency (no dangling outputs, everything reachable from the entry).

use crate::stage::Stage;
use dagflow_core::{PlanError, PlanResult, StageId};
use indexmap::{IndexMap, IndexSet};

/// Successor adjacency: stage -> stages that require it
pub type Adjacency = IndexMap<StageId, Vec<StageId>>;

/// Validator for execution graph topology
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator;

impl Validator {
    /// Create a new validator
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Check caller-supplied stages before the terminals are inserted
    ///
    /// # Errors
    ///
    /// Returns `EmptyLabel`, `ReservedStage` or `DuplicateStage`
    pub fn check_labels<'a, T: 'a>(
        &self,
        stages: impl IntoIterator<Item = &'a Stage<T>>,
    ) -> PlanResult<()> {
        let mut seen = IndexSet::new();
        for stage in stages {
            let id = stage.id();
            if id.is_terminal() {
                return Err(PlanError::ReservedStage { stage: id.clone() });
            }
            if id.label().is_some_and(str::is_empty) {
                return Err(PlanError::EmptyLabel);
            }
            if !seen.insert(id) {
                return Err(PlanError::DuplicateStage { stage: id.clone() });
            }
        }
        Ok(())
    }

    /// Validate a complete stage map, terminals included
    ///
    /// # Errors
    ///
    /// Returns the first topology violation found
    pub fn validate<T>(&self, stages: &IndexMap<StageId, Stage<T>>) -> PlanResult<()> {
        for terminal in [StageId::Entry, StageId::Exit] {
            if !stages.contains_key(&terminal) {
                return Err(PlanError::MissingTerminal { stage: terminal });
            }
        }

        for (id, stage) in stages {
            if let Some(dependency) = stage.requires().iter().find(|d| !stages.contains_key(*d)) {
                return Err(PlanError::UnknownDependency {
                    stage: id.clone(),
                    dependency: dependency.clone(),
                });
            }
        }

        let graph = successors(stages);

        if contains_cycle(&graph) {
            return Err(PlanError::Cycle);
        }

        consistency_check(&graph, stages.keys())
    }
}

/// Invert `requires` into a successor map
///
/// Every stage of the map appears as a key, stages nobody requires map to
/// an empty list.
#[must_use]
pub fn successors<T>(stages: &IndexMap<StageId, Stage<T>>) -> Adjacency {
    let mut graph: Adjacency = stages.keys().map(|id| (id.clone(), Vec::new())).collect();

    for (id, stage) in stages {
        for dependency in stage.requires() {
            graph.entry(dependency.clone()).or_default().push(id.clone());
        }
    }

    graph
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Three-color DFS loop detection
///
/// Seeds the search from every node, so loops detached from the entry are
/// found too.
#[must_use]
pub fn contains_cycle(graph: &Adjacency) -> bool {
    let mut colors: IndexMap<&StageId, Color> =
        graph.keys().map(|id| (id, Color::White)).collect();

    for node in graph.keys() {
        if colors.get(node) == Some(&Color::White) && dfs_cycle(node, graph, &mut colors) {
            return true;
        }
    }

    false
}

fn dfs_cycle<'a>(
    node: &'a StageId,
    graph: &'a Adjacency,
    colors: &mut IndexMap<&'a StageId, Color>,
) -> bool {
    colors.insert(node, Color::Gray);

    for successor in graph.get(node).into_iter().flatten() {
        match colors.get(successor).copied().unwrap_or(Color::White) {
            Color::Gray => return true,
            Color::White => {
                if dfs_cycle(successor, graph, colors) {
                    return true;
                }
            }
            Color::Black => {}
        }
    }

    colors.insert(node, Color::Black);
    false
}

/// Walk forward from the entry and check every stage is consumed and reached
///
/// # Errors
///
/// Returns `DanglingOutput` for a visited non-exit stage without successors,
/// then `Unreachable` for any stage of `stages` the walk never visited.
pub fn consistency_check<'a>(
    graph: &Adjacency,
    stages: impl IntoIterator<Item = &'a StageId>,
) -> PlanResult<()> {
    let entry = StageId::Entry;
    let mut visited = IndexSet::new();
    let mut stack = vec![&entry];

    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            continue;
        }

        let next = graph.get(current).map(Vec::as_slice).unwrap_or_default();
        if next.is_empty() && *current != StageId::Exit {
            return Err(PlanError::DanglingOutput {
                stage: current.clone(),
            });
        }

        stack.extend(next.iter().rev());
    }

    for stage in stages {
        if !visited.contains(stage) {
            return Err(PlanError::Unreachable {
                stage: stage.clone(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::Inputs;
    use proptest::prelude::*;

    fn stub(id: impl Into<StageId>, requires: &[StageId]) -> Stage<()> {
        Stage::new(id, requires.to_vec(), |_: Inputs<()>| Ok(()))
    }

    fn id(label: &str) -> StageId {
        StageId::named(label)
    }

    fn stage_map(stages: Vec<Stage<()>>) -> IndexMap<StageId, Stage<()>> {
        stages.into_iter().map(|s| (s.id().clone(), s)).collect()
    }

    fn adjacency(edges: &[(&str, &[&str])]) -> Adjacency {
        edges
            .iter()
            .map(|(from, to)| (id(from), to.iter().map(|t| id(t)).collect()))
            .collect()
    }

    /// input -> {b, c, d}, {c, d} -> e, {b, e} -> final
    fn sample_graph() -> IndexMap<StageId, Stage<()>> {
        stage_map(vec![
            stub(StageId::Entry, &[]),
            stub("b", &[StageId::Entry]),
            stub("c", &[StageId::Entry]),
            stub("d", &[StageId::Entry]),
            stub("e", &[id("c"), id("d")]),
            stub(StageId::Exit, &[id("b"), id("e")]),
        ])
    }

    #[test]
    fn test_successors_empty() {
        let graph = successors(&stage_map(Vec::new()));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_successors_simple_tree() {
        let graph = successors(&stage_map(vec![
            stub("a", &[]),
            stub("b", &[id("a")]),
            stub("c", &[id("a")]),
            stub("d", &[id("b")]),
            stub("e", &[id("b")]),
            stub("f", &[id("c")]),
        ]));

        assert_eq!(graph[&id("a")], vec![id("b"), id("c")]);
        assert_eq!(graph[&id("b")], vec![id("d"), id("e")]);
        assert_eq!(graph[&id("c")], vec![id("f")]);
        assert!(graph[&id("f")].is_empty());
    }

    #[test]
    fn test_successors_diamond() {
        let graph = successors(&stage_map(vec![
            stub("a", &[]),
            stub("b", &[id("a")]),
            stub("c", &[id("a")]),
            stub("d", &[id("b"), id("c")]),
        ]));

        assert_eq!(graph[&id("a")], vec![id("b"), id("c")]);
        assert_eq!(graph[&id("b")], vec![id("d")]);
        assert_eq!(graph[&id("c")], vec![id("d")]);
    }

    #[test]
    fn test_successors_repeated_dependency() {
        let graph = successors(&stage_map(vec![stub("a", &[]), stub("b", &[id("a"), id("a")])]));
        assert_eq!(graph[&id("a")], vec![id("b"), id("b")]);
    }

    #[test]
    fn test_contains_cycle_empty() {
        assert!(!contains_cycle(&Adjacency::new()));
    }

    #[test]
    fn test_contains_cycle_tree() {
        let graph = adjacency(&[("a", &["b", "c"]), ("b", &["d", "e"]), ("c", &["f"])]);
        assert!(!contains_cycle(&graph));
    }

    #[test]
    fn test_contains_cycle_diamond() {
        let graph = adjacency(&[("a", &["b", "c"]), ("b", &["d"]), ("c", &["d"])]);
        assert!(!contains_cycle(&graph));
    }

    #[test]
    fn test_contains_cycle_single() {
        let graph = adjacency(&[("a", &["b", "c"]), ("b", &["d", "e"]), ("d", &["a", "f"])]);
        assert!(contains_cycle(&graph));
    }

    #[test]
    fn test_contains_cycle_self_loop() {
        let graph = adjacency(&[("a", &["a"])]);
        assert!(contains_cycle(&graph));
    }

    #[test]
    fn test_contains_cycle_detached() {
        let graph = adjacency(&[
            ("a", &["b"]),
            ("b", &["c"]),
            ("x", &["y"]),
            ("y", &["z"]),
            ("z", &["x"]),
        ]);
        assert!(contains_cycle(&graph));
    }

    #[test]
    fn test_consistency_ok() {
        let stages = sample_graph();
        let graph = successors(&stages);
        assert_eq!(consistency_check(&graph, stages.keys()), Ok(()));
    }

    #[test]
    fn test_consistency_dangling() {
        let mut stages = sample_graph();
        stages.insert(id("x"), stub("x", &[id("c")]));
        let graph = successors(&stages);

        assert_eq!(
            consistency_check(&graph, stages.keys()),
            Err(PlanError::DanglingOutput { stage: id("x") })
        );
    }

    #[test]
    fn test_consistency_unreachable() {
        let mut stages = sample_graph();
        stages.insert(id("x"), stub("x", &[]));
        stages.insert(StageId::Exit, stub(StageId::Exit, &[id("b"), id("e"), id("x")]));
        let graph = successors(&stages);

        assert_eq!(
            consistency_check(&graph, stages.keys()),
            Err(PlanError::Unreachable { stage: id("x") })
        );
    }

    #[test]
    fn test_consistency_entry_without_dependents() {
        let stages = stage_map(vec![stub(StageId::Entry, &[]), stub(StageId::Exit, &[])]);
        let graph = successors(&stages);

        assert_eq!(
            consistency_check(&graph, stages.keys()),
            Err(PlanError::DanglingOutput {
                stage: StageId::Entry
            })
        );
    }

    #[test]
    fn test_validate_ok() {
        assert_eq!(Validator::new().validate(&sample_graph()), Ok(()));
    }

    #[test]
    fn test_validate_missing_terminal() {
        let mut stages = sample_graph();
        stages.shift_remove(&StageId::Exit);
        assert_eq!(
            Validator::new().validate(&stages),
            Err(PlanError::MissingTerminal {
                stage: StageId::Exit
            })
        );

        stages.shift_remove(&StageId::Entry);
        assert_eq!(
            Validator::new().validate(&stages),
            Err(PlanError::MissingTerminal {
                stage: StageId::Entry
            })
        );
    }

    #[test]
    fn test_validate_unknown_dependency() {
        let mut stages = sample_graph();
        stages.insert(id("e"), stub("e", &[id("c"), id("q")]));

        assert_eq!(
            Validator::new().validate(&stages),
            Err(PlanError::UnknownDependency {
                stage: id("e"),
                dependency: id("q"),
            })
        );
    }

    #[test]
    fn test_validate_cycle_before_consistency() {
        let mut stages = sample_graph();
        stages.insert(id("c"), stub("c", &[StageId::Entry, id("e")]));
        assert_eq!(Validator::new().validate(&stages), Err(PlanError::Cycle));
    }

    #[test]
    fn test_validate_cycle_through_exit() {
        let mut stages = sample_graph();
        stages.insert(id("b"), stub("b", &[StageId::Entry, StageId::Exit]));
        assert_eq!(Validator::new().validate(&stages), Err(PlanError::Cycle));
    }

    #[test]
    fn test_check_labels() {
        let validator = Validator::new();
        let ok = [stub("a", &[]), stub("b", &[])];
        assert_eq!(validator.check_labels(&ok), Ok(()));

        let reserved = [stub("a", &[]), stub(StageId::Exit, &[])];
        assert_eq!(
            validator.check_labels(&reserved),
            Err(PlanError::ReservedStage {
                stage: StageId::Exit
            })
        );

        let empty = [stub("", &[])];
        assert_eq!(validator.check_labels(&empty), Err(PlanError::EmptyLabel));

        let duplicate = [stub("a", &[]), stub("a", &[])];
        assert_eq!(
            validator.check_labels(&duplicate),
            Err(PlanError::DuplicateStage { stage: id("a") })
        );
    }

    /// Random forward-only topology: `s{i}` may require `s{j}` for `j < i`.
    fn forward_topology(
        n: usize,
        edges: &[bool],
        from_entry: &[bool],
        to_exit: &[bool],
    ) -> IndexMap<StageId, Stage<()>> {
        let label = |i: usize| id(&format!("s{}", i));
        let mut stages = vec![stub(StageId::Entry, &[])];

        for i in 0..n {
            let mut requires: Vec<StageId> =
                (0..i).filter(|&j| edges[j * n + i]).map(label).collect();
            if from_entry[i] {
                requires.push(StageId::Entry);
            }
            stages.push(stub(label(i), &requires));
        }

        let exit: Vec<StageId> = (0..n).filter(|&i| to_exit[i]).map(label).collect();
        stages.push(stub(StageId::Exit, &exit));
        stage_map(stages)
    }

    /// Reachability computed by a forward pass over insertion order, which
    /// is a topological order for `forward_topology`.
    fn expected_consistent(stages: &IndexMap<StageId, Stage<()>>) -> bool {
        let mut reached: IndexSet<&StageId> = IndexSet::new();
        let mut consumed: IndexSet<&StageId> = IndexSet::new();

        for (id, stage) in stages {
            if *id == StageId::Entry || stage.requires().iter().any(|d| reached.contains(d)) {
                reached.insert(id);
            }
            consumed.extend(stage.requires());
        }

        stages
            .keys()
            .all(|id| reached.contains(id) && (*id == StageId::Exit || consumed.contains(id)))
    }

    fn topology_strategy() -> impl Strategy<Value = (usize, Vec<bool>, Vec<bool>, Vec<bool>)> {
        (1usize..8).prop_flat_map(|n| {
            (
                Just(n),
                proptest::collection::vec(any::<bool>(), n * n),
                proptest::collection::vec(any::<bool>(), n),
                proptest::collection::vec(any::<bool>(), n),
            )
        })
    }

    proptest! {
        #[test]
        fn prop_consistency_iff_consumed_and_reachable(
            (n, edges, from_entry, to_exit) in topology_strategy()
        ) {
            let stages = forward_topology(n, &edges, &from_entry, &to_exit);
            let graph = successors(&stages);

            prop_assert!(!contains_cycle(&graph));
            prop_assert_eq!(
                consistency_check(&graph, stages.keys()).is_ok(),
                expected_consistent(&stages)
            );
        }

        #[test]
        fn prop_detached_cycle_detected(
            (n, edges, from_entry, to_exit) in topology_strategy(),
            ring in 1usize..5
        ) {
            let mut stages = forward_topology(n, &edges, &from_entry, &to_exit);
            for i in 0..ring {
                let previous = id(&format!("r{}", (i + ring - 1) % ring));
                stages.insert(id(&format!("r{}", i)), stub(format!("r{}", i), &[previous]));
            }

            prop_assert!(contains_cycle(&successors(&stages)));
            prop_assert_eq!(Validator::new().validate(&stages), Err(PlanError::Cycle));
        }
    }
}
