//! Variation counting over a puzzle tree.
//!
//! A cutoff or terminal node, or any node without edges, is one leaf. An edge
//! without a child is an implicit leaf and counts the same way.

use std::collections::HashSet;

use crate::puzzle::tree::{NodeId, NodeKind, PuzzleTree};

/// Leaves the player must cover when every opponent branch is drilled.
/// Opponent nodes sum their branches; solver nodes take the richest accepted branch.
pub fn count_all_variations(tree: &PuzzleTree, id: NodeId) -> usize {
    if tree.is_leaf(id) {
        return 1;
    }
    let total = match tree.kind(id) {
        NodeKind::Opponent => tree
            .edges(id)
            .iter()
            .filter_map(|e| e.child)
            .map(|c| count_all_variations(tree, c))
            .sum(),
        _ => tree
            .accepted_edges(id)
            .filter_map(|e| e.child)
            .map(|c| count_all_variations(tree, c))
            .max()
            .unwrap_or(0),
    };
    total.max(1)
}

/// Same as [`count_all_variations`] but opponent nodes follow only the most
/// popular branch.
pub fn count_main_line_variations(tree: &PuzzleTree, id: NodeId) -> usize {
    if tree.is_leaf(id) {
        return 1;
    }
    match tree.kind(id) {
        NodeKind::Opponent => tree
            .main_line_edge(id)
            .and_then(|idx| tree.edges(id)[idx].child)
            .map_or(1, |c| count_main_line_variations(tree, c)),
        _ => tree
            .accepted_edges(id)
            .filter_map(|e| e.child)
            .map(|c| count_main_line_variations(tree, c))
            .max()
            .unwrap_or(1),
    }
}

/// Variations under `id` already covered, counted the way
/// [`count_all_variations`] counts them. Solver nodes take their best covered
/// accepted branch, so equivalent leaves of one solver node count once.
pub fn count_covered_variations(
    tree: &PuzzleTree,
    id: NodeId,
    visited: &HashSet<NodeId>,
) -> usize {
    if tree.is_leaf(id) {
        return usize::from(visited.contains(&id));
    }
    match tree.kind(id) {
        NodeKind::Opponent => {
            let mut children = tree.edges(id).iter().filter_map(|e| e.child).peekable();
            if children.peek().is_none() {
                return usize::from(visited.contains(&id));
            }
            children
                .map(|c| count_covered_variations(tree, c, visited))
                .sum()
        }
        _ => tree
            .accepted_edges(id)
            .map(|edge| match edge.child {
                Some(child) => count_covered_variations(tree, child, visited),
                None => usize::from(visited.contains(&id)),
            })
            .max()
            .unwrap_or_else(|| usize::from(visited.contains(&id))),
    }
}

/// True if some opponent node reachable through accepted moves offers more
/// than one computed reply.
pub fn has_deep_variations(tree: &PuzzleTree, id: NodeId) -> bool {
    if tree.is_leaf(id) {
        return false;
    }
    match tree.kind(id) {
        NodeKind::Opponent => {
            let children: Vec<NodeId> = tree.edges(id).iter().filter_map(|e| e.child).collect();
            children.len() > 1 || children.iter().any(|&c| has_deep_variations(tree, c))
        }
        _ => tree
            .accepted_edges(id)
            .filter_map(|e| e.child)
            .any(|c| has_deep_variations(tree, c)),
    }
}

/// False once every reachable leaf under `id` has been covered.
///
/// An accepted solver move without a child is covered only when the solver
/// node itself is in `visited`.
pub fn has_unvisited_leaves(tree: &PuzzleTree, id: NodeId, visited: &HashSet<NodeId>) -> bool {
    if tree.is_leaf(id) {
        return !visited.contains(&id);
    }
    match tree.kind(id) {
        NodeKind::Opponent => {
            let mut children = tree.edges(id).iter().filter_map(|e| e.child).peekable();
            if children.peek().is_none() {
                return !visited.contains(&id);
            }
            children.any(|c| has_unvisited_leaves(tree, c, visited))
        }
        _ => {
            let mut accepted = tree.accepted_edges(id).peekable();
            if accepted.peek().is_none() {
                return !visited.contains(&id);
            }
            accepted.any(|edge| match edge.child {
                Some(child) => has_unvisited_leaves(tree, child, visited),
                None => !visited.contains(&id),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::puzzle::tree::RawNode;
    use serde_json::{json, Value};

    fn tree(value: Value) -> PuzzleTree {
        let raw: RawNode = serde_json::from_value(value).unwrap();
        PuzzleTree::from_raw(&raw)
    }

    fn cutoff() -> Value {
        json!({"type": "cutoff"})
    }

    #[test]
    fn test_single_solver_node_all_terminating() {
        let t = tree(json!({
            "type": "solver",
            "moves": {
                "d1h5": {"san": "Qh5+", "accepted": true, "result": {"type": "terminal", "status": "checkmate"}},
                "f1c4": {"san": "Bc4", "accepted": true},
                "a2a3": {"san": "a3", "accepted": false, "result": cutoff()}
            }
        }));
        assert_eq!(count_all_variations(&t, t.root()), 1);
        assert_eq!(count_main_line_variations(&t, t.root()), 1);
        assert!(!has_deep_variations(&t, t.root()));
    }

    #[test]
    fn test_opponent_fan_out() {
        let t = tree(json!({
            "type": "opponent",
            "moves": {
                "a7a6": {"san": "a6", "probability": 10.0, "result": cutoff()},
                "b7b6": {"san": "b6", "probability": 50.0, "result": cutoff()},
                "c7c6": {"san": "c6", "probability": 30.0, "result": cutoff()},
                "d7d6": {"san": "d6", "probability": 90.0}
            }
        }));
        assert_eq!(count_all_variations(&t, t.root()), 3);
        assert_eq!(count_main_line_variations(&t, t.root()), 1);
        assert!(has_deep_variations(&t, t.root()));
    }

    #[test]
    fn test_solver_takes_richest_accepted_branch() {
        let t = tree(json!({
            "type": "solver",
            "moves": {
                "e2e4": {"san": "e4", "accepted": true, "result": {
                    "type": "opponent",
                    "moves": {
                        "a7a6": {"san": "a6", "probability": 5.0, "result": cutoff()},
                        "b7b6": {"san": "b6", "probability": 70.0, "result": cutoff()}
                    }
                }},
                "d2d4": {"san": "d4", "accepted": true, "result": cutoff()},
                "c2c4": {"san": "c4", "accepted": false, "result": {
                    "type": "opponent",
                    "moves": {
                        "a7a6": {"san": "a6", "result": cutoff()},
                        "b7b6": {"san": "b6", "result": cutoff()},
                        "c7c6": {"san": "c6", "result": cutoff()}
                    }
                }}
            }
        }));
        assert_eq!(count_all_variations(&t, t.root()), 2);
        assert_eq!(count_main_line_variations(&t, t.root()), 1);
        assert!(has_deep_variations(&t, t.root()));
    }

    #[test]
    fn test_main_line_follows_popular_branch_deeper() {
        let t = tree(json!({
            "type": "opponent",
            "moves": {
                "a7a6": {"san": "a6", "probability": 80.0, "result": {
                    "type": "solver",
                    "moves": {"e2e4": {"san": "e4", "accepted": true, "result": {
                        "type": "opponent",
                        "moves": {
                            "h7h6": {"san": "h6", "probability": 40.0, "result": cutoff()},
                            "g7g6": {"san": "g6", "probability": 40.0, "result": cutoff()}
                        }
                    }}}
                }},
                "b7b6": {"san": "b6", "probability": 20.0, "result": cutoff()}
            }
        }));
        assert_eq!(count_all_variations(&t, t.root()), 3);
        assert_eq!(count_main_line_variations(&t, t.root()), 1);
    }

    #[test]
    fn test_opponent_without_children_is_single_leaf() {
        let t = tree(json!({
            "type": "opponent",
            "moves": {"a7a6": {"san": "a6"}, "b7b6": {"san": "b6"}}
        }));
        assert_eq!(count_all_variations(&t, t.root()), 1);
        assert_eq!(count_main_line_variations(&t, t.root()), 1);
        assert!(!has_deep_variations(&t, t.root()));

        let mut visited = HashSet::new();
        assert!(has_unvisited_leaves(&t, t.root(), &visited));
        visited.insert(t.root());
        assert!(!has_unvisited_leaves(&t, t.root(), &visited));
    }

    #[test]
    fn test_unvisited_tracking() {
        let t = tree(json!({
            "type": "opponent",
            "moves": {
                "a7a6": {"san": "a6", "result": cutoff()},
                "b7b6": {"san": "b6", "result": {
                    "type": "solver",
                    "moves": {"e2e4": {"san": "e4", "accepted": true}}
                }}
            }
        }));
        let root = t.root();
        let a = t.edges(root)[0].child.unwrap();
        let b = t.edges(root)[1].child.unwrap();

        let mut visited = HashSet::new();
        assert!(has_unvisited_leaves(&t, root, &visited));

        visited.insert(a);
        assert!(has_unvisited_leaves(&t, root, &visited));
        assert!(!has_unvisited_leaves(&t, a, &visited));
        assert!(has_unvisited_leaves(&t, b, &visited));

        // Childless accepted move: satisfied through the solver node itself
        visited.insert(b);
        assert!(!has_unvisited_leaves(&t, root, &visited));
    }

    #[test]
    fn test_equivalent_leaves_cover_one_variation() {
        let t = tree(json!({
            "type": "opponent",
            "moves": {
                "a7a6": {"san": "a6", "result": {
                    "type": "solver",
                    "moves": {
                        "d1h5": {"san": "Qh5+", "accepted": true, "result": cutoff()},
                        "d2d4": {"san": "d4", "accepted": true, "result": cutoff()},
                        "f1c4": {"san": "Bc4", "accepted": true}
                    }
                }},
                "b7b6": {"san": "b6", "result": cutoff()}
            }
        }));
        let root = t.root();
        let solver = t.edges(root)[0].child.unwrap();
        let b = t.edges(root)[1].child.unwrap();
        assert_eq!(count_all_variations(&t, root), 2);

        let mut visited: HashSet<NodeId> = t
            .edges(solver)
            .iter()
            .filter_map(|e| e.child)
            .collect();
        visited.insert(solver);
        assert_eq!(count_covered_variations(&t, root, &visited), 1);

        visited.insert(b);
        assert_eq!(count_covered_variations(&t, root, &visited), 2);
    }

    #[test]
    fn test_covered_follows_best_solver_branch() {
        let t = tree(json!({
            "type": "solver",
            "moves": {
                "e2e4": {"san": "e4", "accepted": true, "result": {
                    "type": "opponent",
                    "moves": {
                        "a7a6": {"san": "a6", "result": cutoff()},
                        "b7b6": {"san": "b6", "result": cutoff()}
                    }
                }},
                "f1c4": {"san": "Bc4", "accepted": true}
            }
        }));
        let root = t.root();
        let opp = t.edges(root)[0].child.unwrap();
        let a = t.edges(opp)[0].child.unwrap();

        // The short line and one long-line leaf do not add up
        let visited: HashSet<NodeId> = [root, a].into_iter().collect();
        assert_eq!(count_all_variations(&t, root), 2);
        assert_eq!(count_covered_variations(&t, root, &visited), 1);
    }
}
