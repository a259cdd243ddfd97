//! The read-end string graph's data model (spec section 3).
//!
//! Nodes and edges live in flat arenas indexed by `u32`; the
//! reverse-complement relation is a pair of indices computed once at
//! insertion (spec section 9: "this removes all sharing and eliminates the
//! need for reference counting"). This replaces the teacher's
//! `HashMap<String, Node>` representation (`create_overlap_graph.rs`) with
//! an arena generalized to the `(read_id, end)` node identity the spec
//! requires.

use crate::error::GraphError;
use crate::ordered::{OrderedMap, OrderedSet, ordered_map};
use std::fmt;

pub type ReadId = String;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum End {
    B,
    E,
}

impl End {
    pub fn flip(self) -> End {
        match self {
            End::B => End::E,
            End::E => End::B,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            End::B => "B",
            End::E => "E",
        }
    }
}

impl fmt::Display for End {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `(read_id, end)` identity, e.g. the node named `"123:B"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReadEnd {
    pub read_id: ReadId,
    pub end: End,
}

impl ReadEnd {
    pub fn new(read_id: impl Into<ReadId>, end: End) -> Self {
        ReadEnd {
            read_id: read_id.into(),
            end,
        }
    }

    /// `reverse_end(x)` flips the end, per spec section 3.
    pub fn reverse(&self) -> ReadEnd {
        ReadEnd {
            read_id: self.read_id.clone(),
            end: self.end.flip(),
        }
    }

    pub fn parse(s: &str) -> Result<ReadEnd, GraphError> {
        let (rid, end) = s
            .rsplit_once(':')
            .ok_or_else(|| GraphError::BadNodeName(s.to_string()))?;
        if rid.is_empty() || !rid.bytes().all(|b| b.is_ascii_digit()) {
            return Err(GraphError::BadNodeName(s.to_string()));
        }
        let end = match end {
            "B" => End::B,
            "E" => End::E,
            _ => return Err(GraphError::BadNodeName(s.to_string())),
        };
        Ok(ReadEnd::new(rid, end))
    }
}

impl fmt::Display for ReadEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.read_id, self.end)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub u32);

/// Reduction flag carried by every string-graph edge, maintained externally
/// to the base edge attributes (spec section 3).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReductionFlag {
    Live,
    Transitive,
    Chimer,
    Removed,
    Spur,
}

impl ReductionFlag {
    /// `type` column of `sg_edges_list`: `{G, TR, C, R, S}`.
    pub fn code(self) -> &'static str {
        match self {
            ReductionFlag::Live => "G",
            ReductionFlag::Transitive => "TR",
            ReductionFlag::Chimer => "C",
            ReductionFlag::Removed => "R",
            ReductionFlag::Spur => "S",
        }
    }
}

pub struct NodeRecord {
    pub read_end: ReadEnd,
    pub rc: NodeId,
    pub out_edges: Vec<EdgeId>,
    pub in_edges: Vec<EdgeId>,
}

#[derive(Clone, Debug)]
pub struct EdgeRecord {
    pub from: NodeId,
    pub to: NodeId,
    /// The read id this extension comes from (used to build `label`).
    pub rid: ReadId,
    pub s: i64,
    pub t: i64,
    pub length: u32,
    /// Negated overlap score — lower is better (spec section 3).
    pub score: i32,
    pub identity: f64,
    pub inphase: char,
    pub rc: EdgeId,
    pub flag: ReductionFlag,
}

impl EdgeRecord {
    pub fn label(&self) -> String {
        format!("{}:{}-{}", self.rid, self.s, self.t)
    }
}

/// The directed read-end string graph.
pub struct StringGraph {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
    index: OrderedMap<ReadEnd, NodeId>,
}

impl StringGraph {
    pub fn new() -> Self {
        StringGraph {
            nodes: Vec::new(),
            edges: Vec::new(),
            index: ordered_map(),
        }
    }

    /// Returns the existing node for `read_end`, or inserts it together with
    /// its reverse-complement counterpart (which always exists in pairs).
    pub fn intern(&mut self, read_end: &ReadEnd) -> NodeId {
        if let Some(&id) = self.index.get(read_end) {
            return id;
        }
        let rc_read_end = read_end.reverse();
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeRecord {
            read_end: read_end.clone(),
            rc: id, // patched below once the rc node exists
            out_edges: Vec::new(),
            in_edges: Vec::new(),
        });
        self.index.insert(read_end.clone(), id);

        let rc_id = if let Some(&existing) = self.index.get(&rc_read_end) {
            existing
        } else {
            let rc_id = NodeId(self.nodes.len() as u32);
            self.nodes.push(NodeRecord {
                read_end: rc_read_end.clone(),
                rc: id,
                out_edges: Vec::new(),
                in_edges: Vec::new(),
            });
            self.index.insert(rc_read_end, rc_id);
            rc_id
        };
        self.nodes[id.0 as usize].rc = rc_id;
        self.nodes[rc_id.0 as usize].rc = id;
        id
    }

    pub fn node(&self, id: NodeId) -> &NodeRecord {
        &self.nodes[id.0 as usize]
    }

    pub fn edge(&self, id: EdgeId) -> &EdgeRecord {
        &self.edges[id.0 as usize]
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> &mut EdgeRecord {
        &mut self.edges[id.0 as usize]
    }

    pub fn rc_node(&self, id: NodeId) -> NodeId {
        self.nodes[id.0 as usize].rc
    }

    /// Appends a single directed edge (caller is responsible for also
    /// appending the reverse-complement edge and linking the two via `rc`).
    fn push_edge(
        &mut self,
        from: NodeId,
        to: NodeId,
        rid: ReadId,
        s: i64,
        t: i64,
        score: i32,
        identity: f64,
        inphase: char,
    ) -> EdgeId {
        let length = s.abs_diff(t) as u32;
        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(EdgeRecord {
            from,
            to,
            rid,
            s,
            t,
            length,
            score,
            identity,
            inphase,
            rc: id, // patched by caller
            flag: ReductionFlag::Live,
        });
        self.nodes[from.0 as usize].out_edges.push(id);
        self.nodes[to.0 as usize].in_edges.push(id);
        id
    }

    /// Adds a directed edge together with its reverse-complement
    /// counterpart, maintaining the complement invariant (spec section 3).
    #[allow(clippy::too_many_arguments)]
    pub fn add_edge_pair(
        &mut self,
        from: NodeId,
        to: NodeId,
        rid: ReadId,
        s: i64,
        t: i64,
        score: i32,
        identity: f64,
        inphase: char,
    ) -> (EdgeId, EdgeId) {
        let rc_from = self.rc_node(to);
        let rc_to = self.rc_node(from);
        let fwd = self.push_edge(from, to, rid.clone(), s, t, score, identity, inphase);
        let rev = self.push_edge(rc_from, rc_to, rid, s, t, score, identity, inphase);
        self.edges[fwd.0 as usize].rc = rev;
        self.edges[rev.0 as usize].rc = fwd;
        (fwd, rev)
    }

    pub fn live_out_edges(&self, id: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        self.node(id)
            .out_edges
            .iter()
            .copied()
            .filter(move |&e| self.edge(e).flag == ReductionFlag::Live)
    }

    pub fn live_in_edges(&self, id: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        self.node(id)
            .in_edges
            .iter()
            .copied()
            .filter(move |&e| self.edge(e).flag == ReductionFlag::Live)
    }

    pub fn live_out_degree(&self, id: NodeId) -> usize {
        self.live_out_edges(id).count()
    }

    pub fn live_in_degree(&self, id: NodeId) -> usize {
        self.live_in_edges(id).count()
    }

    /// Sets an edge's flag and its complement's, asserting the invariant
    /// holds (spec section 7: complement breaches are a debug assertion).
    pub fn set_flag(&mut self, id: EdgeId, flag: ReductionFlag) {
        let rc = self.edge(id).rc;
        self.edges[id.0 as usize].flag = flag;
        self.edges[rc.0 as usize].flag = flag;
        debug_assert_eq!(self.edges[id.0 as usize].flag, self.edges[rc.0 as usize].flag);
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + use<> {
        (0..self.nodes.len() as u32).map(NodeId)
    }
}

impl Default for StringGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Names distinct nodes reachable via live edges; used by several passes
/// that need a deterministic node set rather than an arena scan.
pub fn live_node_set(g: &StringGraph) -> OrderedSet<NodeId> {
    let mut set = OrderedSet::new();
    for id in g.node_ids() {
        if g.live_out_degree(id) > 0 || g.live_in_degree(id) > 0 {
            set.insert(id);
        }
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_end_flips_b_and_e() {
        let n = ReadEnd::new("7", End::B);
        assert_eq!(n.reverse(), ReadEnd::new("7", End::E));
        assert_eq!(n.reverse().reverse(), n);
    }

    #[test]
    fn parse_rejects_bad_names() {
        assert!(ReadEnd::parse("NA").is_err());
        assert!(ReadEnd::parse("12x:B").is_err());
        assert!(ReadEnd::parse("12:Q").is_err());
        assert_eq!(ReadEnd::parse("12:B").unwrap(), ReadEnd::new("12", End::B));
    }

    #[test]
    fn intern_creates_complement_pair() {
        let mut g = StringGraph::new();
        let b = g.intern(&ReadEnd::new("1", End::B));
        let e = g.intern(&ReadEnd::new("1", End::E));
        assert_eq!(g.rc_node(b), e);
        assert_eq!(g.rc_node(e), b);
    }

    #[test]
    fn add_edge_pair_links_complements() {
        let mut g = StringGraph::new();
        let a_b = g.intern(&ReadEnd::new("1", End::B));
        let b_b = g.intern(&ReadEnd::new("2", End::B));
        let (fwd, rev) = g.add_edge_pair(a_b, b_b, "2".to_string(), 0, 10, -10, 0.99, 'u');
        assert_eq!(g.edge(fwd).rc, rev);
        assert_eq!(g.edge(rev).rc, fwd);
        let rc_from = g.rc_node(b_b);
        let rc_to = g.rc_node(a_b);
        assert_eq!(g.edge(rev).from, rc_from);
        assert_eq!(g.edge(rev).to, rc_to);
    }

    #[test]
    fn set_flag_applies_to_complement() {
        let mut g = StringGraph::new();
        let a_b = g.intern(&ReadEnd::new("1", End::B));
        let b_b = g.intern(&ReadEnd::new("2", End::B));
        let (fwd, rev) = g.add_edge_pair(a_b, b_b, "2".to_string(), 0, 10, -10, 0.99, 'u');
        g.set_flag(fwd, ReductionFlag::Transitive);
        assert_eq!(g.edge(rev).flag, ReductionFlag::Transitive);
    }
}
