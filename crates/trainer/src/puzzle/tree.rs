//! Puzzle decision tree.
//!
//! The generator emits a nested JSON tree; sessions work on a flattened arena
//! where every node is addressed by a stable [`NodeId`]. Visited bookkeeping is
//! then a set of ids rather than references into the tree.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Player to move
    Solver,
    /// Auto-played reply
    Opponent,
    /// Position objectively won, tree pruned here
    Cutoff,
    /// Checkmate or stalemate reached
    Terminal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CutoffReason {
    MaxNodes,
    MaxDepth,
    AdvantageSecured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatus {
    Checkmate,
    Draw,
}

// ---- Wire format ----

/// A tree node as stored in puzzle JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawNode {
    #[serde(default)]
    pub fen: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<CutoffReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TerminalStatus>,
    /// Keyed by UCI move, in document order
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "serialize_moves",
        deserialize_with = "deserialize_moves"
    )]
    pub moves: Vec<(String, RawEdge)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEdge {
    #[serde(default)]
    pub san: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cp: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maia_pct: Option<f64>,
    #[serde(default, alias = "games", skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Box<RawNode>>,
}

fn serialize_moves<S: Serializer>(
    moves: &[(String, RawEdge)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(moves.len()))?;
    for (uci, edge) in moves {
        map.serialize_entry(uci, edge)?;
    }
    map.end()
}

fn deserialize_moves<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<(String, RawEdge)>, D::Error> {
    struct OrderedMoves;

    impl<'de> Visitor<'de> for OrderedMoves {
        type Value = Vec<(String, RawEdge)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of UCI moves to edges")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut moves = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((uci, edge)) = access.next_entry::<String, RawEdge>()? {
                moves.push((uci, edge));
            }
            Ok(moves)
        }
    }

    deserializer.deserialize_map(OrderedMoves)
}

// ---- Arena ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct MoveEdge {
    /// UCI move identifier, unique per node
    pub move_id: String,
    /// SAN for display
    pub label: String,
    /// Centipawns from the solver's point of view (±10000 = forced mate)
    pub evaluation: Option<i32>,
    pub popularity: Option<f64>,
    /// Only meaningful on edges out of solver nodes
    pub accepted: bool,
    pub child: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct TreeNode {
    pub position: String,
    pub kind: NodeKind,
    pub reason: Option<CutoffReason>,
    pub status: Option<TerminalStatus>,
    pub edges: Vec<MoveEdge>,
}

#[derive(Debug, Clone)]
pub struct PuzzleTree {
    nodes: Vec<TreeNode>,
}

impl PuzzleTree {
    /// Flatten a nested tree. The root always gets id 0.
    pub fn from_raw(root: &RawNode) -> Self {
        let mut tree = PuzzleTree { nodes: Vec::new() };
        tree.push(root);
        tree
    }

    fn push(&mut self, raw: &RawNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(TreeNode {
            position: raw.fen.clone(),
            kind: raw.kind,
            reason: raw.reason,
            status: raw.status,
            edges: Vec::new(),
        });

        let mut edges = Vec::with_capacity(raw.moves.len());
        for (uci, edge) in &raw.moves {
            let child = edge.result.as_deref().map(|child| self.push(child));
            edges.push(MoveEdge {
                move_id: uci.clone(),
                label: if edge.san.is_empty() {
                    uci.clone()
                } else {
                    edge.san.clone()
                },
                evaluation: edge.cp,
                popularity: edge.probability,
                accepted: raw.kind == NodeKind::Solver && edge.accepted.unwrap_or(false),
                child,
            });
        }
        self.nodes[id.0].edges = edges;
        id
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id.0].kind
    }

    pub fn edges(&self, id: NodeId) -> &[MoveEdge] {
        &self.nodes[id.0].edges
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Cutoff, terminal, or a node with nothing left to play.
    pub fn is_leaf(&self, id: NodeId) -> bool {
        let node = &self.nodes[id.0];
        matches!(node.kind, NodeKind::Cutoff | NodeKind::Terminal) || node.edges.is_empty()
    }

    /// An edge ends its branch when it has no child or the child is a leaf.
    pub fn ends_branch(&self, edge: &MoveEdge) -> bool {
        edge.child.map_or(true, |child| self.is_leaf(child))
    }

    pub fn find_edge(&self, id: NodeId, move_id: &str) -> Option<usize> {
        self.nodes[id.0]
            .edges
            .iter()
            .position(|e| e.move_id == move_id)
    }

    pub fn accepted_edges(&self, id: NodeId) -> impl Iterator<Item = &MoveEdge> {
        self.nodes[id.0].edges.iter().filter(|e| e.accepted)
    }

    /// Highest-evaluated accepted edge; ties keep the first one, missing
    /// evaluations rank last.
    pub fn best_accepted(&self, id: NodeId) -> Option<usize> {
        let mut best: Option<(usize, i32)> = None;
        for (idx, edge) in self.nodes[id.0].edges.iter().enumerate() {
            if !edge.accepted {
                continue;
            }
            let score = edge.evaluation.unwrap_or(i32::MIN);
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((idx, score));
            }
        }
        best.map(|(idx, _)| idx)
    }

    /// Most popular edge that has a computed child; ties keep the first one.
    pub fn main_line_edge(&self, id: NodeId) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (idx, edge) in self.nodes[id.0].edges.iter().enumerate() {
            if edge.child.is_none() {
                continue;
            }
            let popularity = edge.popularity.unwrap_or(0.0);
            if best.map_or(true, |(_, top)| popularity > top) {
                best = Some((idx, popularity));
            }
        }
        best.map(|(idx, _)| idx)
    }
}
