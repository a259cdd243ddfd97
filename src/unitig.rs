//! Component E: unitig (maximal simple path) construction and bubble
//! collapse.
//!
//! Grounded on `original_source/scripts/ipa2_ovlp_to_graph.py`'s
//! `identify_simple_paths`, `find_bundle`, `construct_compound_paths_0..3`,
//! `identify_spurs` and `remove_dup_simple_path`, generalized from the
//! original's `networkx` multigraph (keyed edges) to an explicit
//! `(s, t, via)` unitig-edge key over the arena `StringGraph`.

use std::collections::VecDeque;

use tracing::{debug, info};

use crate::model::{NodeId, ReductionFlag, StringGraph};
use crate::ordered::{OrderedMap, OrderedSet, ordered_map, ordered_set};

/// Disambiguates parallel unitig edges between the same `(s, t)` pair: the
/// second node of the path for a simple unitig, or `Compound` for a
/// bundle-collapsed one (the original's literal `"NA"` key).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Via {
    Node(NodeId),
    Compound,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtgKey {
    pub s: NodeId,
    pub t: NodeId,
    pub via: Via,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UtgType {
    Simple,
    Compound,
    Contained,
    Spur2,
    SimpleDup,
    RepeatBridge,
}

impl UtgType {
    pub fn code(self) -> &'static str {
        match self {
            UtgType::Simple => "simple",
            UtgType::Compound => "compound",
            UtgType::Contained => "contained",
            UtgType::Spur2 => "spur:2",
            UtgType::SimpleDup => "simple_dup",
            UtgType::RepeatBridge => "repeat_bridge",
        }
    }
}

#[derive(Clone, Debug)]
pub enum UtgPayload {
    /// Node sequence of a simple path, `n0, n1, ..., nk`.
    Path(Vec<NodeId>),
    /// String-graph unitig edges a compound path collapses.
    Bundle(Vec<UtgKey>),
}

#[derive(Clone, Debug)]
pub struct UtgEdge {
    pub length: u32,
    pub score: i32,
    pub payload: UtgPayload,
    pub utype: UtgType,
}

/// The unitig graph. `edges` holds every entry ever created, including
/// ones later retyped out of the live set (spur, dup, contained, repeat
/// bridge) — this mirrors the original's `u_edge_data`, which is dumped in
/// full regardless of liveness. `out_adj`/`in_adj` index only the live
/// subset, mirroring the original's separate `ug`/`ug2` graph object.
#[derive(Clone)]
pub struct UnitigGraph {
    edges: OrderedMap<UtgKey, UtgEdge>,
    live: OrderedSet<UtgKey>,
    out_adj: OrderedMap<NodeId, Vec<UtgKey>>,
    in_adj: OrderedMap<NodeId, Vec<UtgKey>>,
}

impl UnitigGraph {
    pub fn new() -> Self {
        UnitigGraph {
            edges: ordered_map(),
            live: ordered_set(),
            out_adj: ordered_map(),
            in_adj: ordered_map(),
        }
    }

    pub fn insert(&mut self, key: UtgKey, edge: UtgEdge) {
        self.out_adj.entry(key.s).or_default().push(key);
        self.in_adj.entry(key.t).or_default().push(key);
        self.live.insert(key);
        self.edges.insert(key, edge);
    }

    /// Retypes an entry, removing it from the live adjacency if the new
    /// type is not `Simple`/`Compound`. A no-op if `key` is already gone
    /// from the live set (mirrors the original's swallowed remove-edge
    /// exception).
    pub fn retype(&mut self, key: &UtgKey, new_type: UtgType) {
        if let Some(e) = self.edges.get_mut(key) {
            e.utype = new_type;
        }
        if self.live.shift_remove(key) {
            if let Some(v) = self.out_adj.get_mut(&key.s) {
                v.retain(|k| k != key);
            }
            if let Some(v) = self.in_adj.get_mut(&key.t) {
                v.retain(|k| k != key);
            }
        }
    }

    pub fn get(&self, key: &UtgKey) -> Option<&UtgEdge> {
        self.edges.get(key)
    }

    pub fn is_live(&self, key: &UtgKey) -> bool {
        self.live.contains(key)
    }

    pub fn out_edges(&self, n: NodeId) -> &[UtgKey] {
        self.out_adj.get(&n).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn in_edges(&self, n: NodeId) -> &[UtgKey] {
        self.in_adj.get(&n).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn out_degree(&self, n: NodeId) -> usize {
        self.out_edges(n).len()
    }

    pub fn in_degree(&self, n: NodeId) -> usize {
        self.in_edges(n).len()
    }

    pub fn live_nodes(&self) -> OrderedSet<NodeId> {
        let mut set = ordered_set();
        for (&n, v) in self.out_adj.iter() {
            if !v.is_empty() {
                set.insert(n);
            }
        }
        for (&n, v) in self.in_adj.iter() {
            if !v.is_empty() {
                set.insert(n);
            }
        }
        set
    }

    pub fn live_iter(&self) -> impl Iterator<Item = (&UtgKey, &UtgEdge)> {
        self.live.iter().map(move |k| (k, self.edges.get(k).unwrap()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UtgKey, &UtgEdge)> {
        self.edges.iter()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

impl Default for UnitigGraph {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn reverse_key(sg: &StringGraph, key: &UtgKey) -> UtgKey {
    UtgKey {
        s: sg.rc_node(key.t),
        t: sg.rc_node(key.s),
        via: match key.via {
            Via::Node(w) => Via::Node(sg.rc_node(w)),
            Via::Compound => Via::Compound,
        },
    }
}

fn live_edge_between(sg: &StringGraph, v: NodeId, w: NodeId) -> Option<crate::model::EdgeId> {
    sg.live_out_edges(v).find(|&e| sg.edge(e).to == w)
}

fn pop_arbitrary(set: &mut OrderedSet<NodeId>) -> Option<NodeId> {
    let v = *set.iter().next()?;
    set.shift_remove(&v);
    Some(v)
}

/// Phase 1: walks every maximal run of in/out-degree-1 nodes in the live
/// string graph into a single unitig, emitting both the forward path and
/// its reverse-complement as distinct `u_edge_data` entries.
pub fn identify_simple_paths(sg: &StringGraph) -> OrderedMap<UtgKey, (u32, i32, Vec<NodeId>)> {
    let mut simple_nodes: OrderedSet<NodeId> = ordered_set();
    let mut s_nodes: OrderedSet<NodeId> = ordered_set();

    for n in sg.node_ids() {
        let indeg = sg.live_in_degree(n);
        let outdeg = sg.live_out_degree(n);
        if indeg == 1 && outdeg == 1 {
            simple_nodes.insert(n);
        } else if outdeg != 0 {
            s_nodes.insert(n);
        }
    }

    let mut free_edges: OrderedSet<(NodeId, NodeId)> = ordered_set();
    for e in &sg.edges {
        if e.flag == ReductionFlag::Live {
            free_edges.insert((e.from, e.to));
        }
    }

    let mut simple_paths: OrderedMap<UtgKey, (u32, i32, Vec<NodeId>)> = ordered_map();

    while !free_edges.is_empty() {
        let n = match pop_arbitrary(&mut s_nodes) {
            Some(n) => n,
            None => free_edges.iter().next().unwrap().0,
        };

        let starts: Vec<(NodeId, NodeId)> = sg
            .node(n)
            .out_edges
            .iter()
            .map(|&e| (sg.edge(e).from, sg.edge(e).to))
            .filter(|p| free_edges.contains(p))
            .collect();

        for (v, w) in starts {
            if !free_edges.contains(&(v, w)) {
                continue;
            }
            let rv = sg.rc_node(v);
            let rw = sg.rc_node(w);
            let (v0, w0) = (v, w);
            let (rv0, rw0) = (rv, rw);

            let mut path = vec![v, w];
            let e_vw = live_edge_between(sg, v, w).expect("free edge must be live");
            let mut path_length = sg.edge(e_vw).length;
            let mut path_score = sg.edge(e_vw).score;
            free_edges.shift_remove(&(v, w));

            let mut r_path = vec![rw, rv];
            let e_wv_r = live_edge_between(sg, rw, rv).expect("complement edge must be live");
            let mut r_path_length = sg.edge(e_wv_r).length;
            let mut r_path_score = sg.edge(e_wv_r).score;
            free_edges.shift_remove(&(rw, rv));

            let mut path_edges: OrderedSet<(NodeId, NodeId)> = ordered_set();
            path_edges.insert((v, w));

            let mut w_cur = w;
            loop {
                if !simple_nodes.contains(&w_cur) {
                    break;
                }
                let Some(e_next) = sg.live_out_edges(w_cur).next() else { break };
                let w_next = sg.edge(e_next).to;
                if !free_edges.contains(&(w_cur, w_next)) {
                    break;
                }
                let rw_next = sg.rc_node(w_next);
                let rw_cur = sg.rc_node(w_cur);
                if path_edges.contains(&(rw_next, rw_cur)) {
                    break;
                }

                path.push(w_next);
                path_edges.insert((w_cur, w_next));
                path_length += sg.edge(e_next).length;
                path_score += sg.edge(e_next).score;
                free_edges.shift_remove(&(w_cur, w_next));

                r_path.push(rw_next);
                let e_r = live_edge_between(sg, rw_next, rw_cur).expect("complement edge must be live");
                r_path_length += sg.edge(e_r).length;
                r_path_score += sg.edge(e_r).score;
                free_edges.shift_remove(&(rw_next, rw_cur));

                w_cur = w_next;
            }

            let end = *path.last().unwrap();
            simple_paths.insert(
                UtgKey { s: v0, t: end, via: Via::Node(w0) },
                (path_length, path_score, path),
            );
            r_path.reverse();
            let r_start = r_path[0];
            simple_paths.insert(
                UtgKey { s: r_start, t: rv0, via: Via::Node(rw0) },
                (r_path_length, r_path_score, r_path),
            );
        }
    }

    simple_paths
}

/// BFS node set reachable from `start` within `radius` hops over live
/// unitig out-edges (the original's `nx.ego_graph(..., undirected=False)`).
fn ego_node_set(ug: &UnitigGraph, start: NodeId, radius: usize) -> OrderedSet<NodeId> {
    let mut dist: OrderedMap<NodeId, usize> = ordered_map();
    dist.insert(start, 0);
    let mut frontier = vec![start];
    let mut d = 0;
    while d < radius && !frontier.is_empty() {
        let mut next = Vec::new();
        for v in frontier {
            for key in ug.out_edges(v) {
                if !dist.contains_key(&key.t) {
                    dist.insert(key.t, d + 1);
                    next.push(key.t);
                }
            }
        }
        frontier = next;
        d += 1;
    }
    dist.keys().copied().collect()
}

fn local_out_edges(ug: &UnitigGraph, node_set: &OrderedSet<NodeId>, v: NodeId) -> Vec<UtgKey> {
    ug.out_edges(v).iter().filter(|k| node_set.contains(&k.t)).copied().collect()
}

fn local_in_edges(ug: &UnitigGraph, node_set: &OrderedSet<NodeId>, v: NodeId) -> Vec<UtgKey> {
    ug.in_edges(v).iter().filter(|k| node_set.contains(&k.s)).copied().collect()
}

struct BundleResult {
    end: NodeId,
    bundle_edges: Vec<UtgKey>,
    length: u32,
    score: i32,
    depth: usize,
}

/// Bounded ego-DFS bubble finder: walks tips outward from `start_node`
/// until they reconverge on a single node, or one of several termination
/// conditions (tip fan-out, width, depth, length, cyclic re-entry) aborts
/// the attempt. See spec section 4.E / 8 for the boundary behaviours this
/// must reproduce exactly.
/// Predecessor scores are compared against `i64::MIN`, not zero: unitig
/// scores are sums of negated overlap scores and are routinely negative, so
/// a zero floor would silently reject every real predecessor.
fn find_bundle(
    sg: &StringGraph,
    ug: &UnitigGraph,
    start_node: NodeId,
    depth_cutoff: usize,
    width_cutoff: f64,
    length_cutoff: u64,
) -> Option<BundleResult> {
    let node_set = ego_node_set(ug, start_node, depth_cutoff);

    let mut length_to_node: OrderedMap<NodeId, u64> = ordered_map();
    let mut score_to_node: OrderedMap<NodeId, i64> = ordered_map();
    length_to_node.insert(start_node, 0);
    score_to_node.insert(start_node, 0);

    let mut bundle_edges: OrderedSet<UtgKey> = ordered_set();
    let mut bundle_nodes: OrderedSet<NodeId> = ordered_set();
    let mut tips: OrderedSet<NodeId> = ordered_set();

    bundle_nodes.insert(start_node);
    for key in local_out_edges(ug, &node_set, start_node) {
        let w = key.t;
        if !bundle_edges.contains(&key) && !bundle_nodes.contains(&sg.rc_node(w)) {
            bundle_edges.insert(key);
            tips.insert(w);
        }
    }
    for v in tips.iter().copied().collect::<Vec<_>>() {
        bundle_nodes.insert(v);
    }

    let mut depth = 1usize;

    loop {
        if tips.len() > 4 {
            return None;
        }

        if tips.len() == 1 {
            let end_node = pop_arbitrary(&mut tips).unwrap();
            if !length_to_node.contains_key(&end_node) {
                let mut max_score_edge: Option<UtgKey> = None;
                let mut max_score = i64::MIN;
                for key in local_in_edges(ug, &node_set, end_node) {
                    if !length_to_node.contains_key(&key.s) {
                        continue;
                    }
                    let score = ug.get(&key).unwrap().score as i64;
                    if score > max_score {
                        max_score = score;
                        max_score_edge = Some(key);
                    }
                }
                let Some(me) = max_score_edge else { return None };
                let e = ug.get(&me).unwrap();
                length_to_node.insert(end_node, length_to_node[&me.s] + e.length as u64);
                score_to_node.insert(end_node, score_to_node[&me.s] + e.score as i64);
            }
            return Some(BundleResult {
                end: end_node,
                bundle_edges: bundle_edges.into_iter().collect(),
                length: length_to_node[&end_node] as u32,
                score: score_to_node[&end_node] as i32,
                depth,
            });
        }

        depth += 1;
        let width = bundle_edges.len() as f64 / depth as f64;
        if depth > 10 && width > width_cutoff {
            return None;
        }
        if depth > depth_cutoff {
            return None;
        }

        let tips_list: Vec<NodeId> = tips.iter().copied().collect();
        let mut tip_updated = false;
        let mut loop_detect = false;
        let mut length_limit_reached = false;

        for v in tips_list {
            let out_edges_v = local_out_edges(ug, &node_set, v);
            if out_edges_v.is_empty() {
                continue;
            }

            let mut max_score_edge: Option<UtgKey> = None;
            let mut max_score = i64::MIN;
            let mut extend_tip = true;
            for key in local_in_edges(ug, &node_set, v) {
                if !length_to_node.contains_key(&key.s) {
                    extend_tip = false;
                    break;
                }
                let score = ug.get(&key).unwrap().score as i64;
                if score > max_score {
                    max_score = score;
                    max_score_edge = Some(key);
                }
            }

            if extend_tip {
                let Some(me) = max_score_edge else { continue };
                let e = ug.get(&me).unwrap();
                let new_length = length_to_node[&me.s] + e.length as u64;
                let new_score = score_to_node[&me.s] + e.score as i64;
                length_to_node.insert(v, new_length);
                score_to_node.insert(v, new_score);

                if new_length > length_cutoff {
                    length_limit_reached = true;
                    break;
                }

                let mut v_updated = false;
                for key in local_out_edges(ug, &node_set, v) {
                    let ww = key.t;
                    if length_to_node.contains_key(&ww) {
                        loop_detect = true;
                        break;
                    }
                    if !bundle_edges.contains(&key) && !bundle_nodes.contains(&sg.rc_node(ww)) {
                        tips.insert(ww);
                        bundle_edges.insert(key);
                        tip_updated = true;
                        v_updated = true;
                    }
                }

                if v_updated {
                    tips.shift_remove(&v);
                    if tips.len() == 1 {
                        break;
                    }
                }
            }

            if loop_detect {
                break;
            }
        }

        if length_limit_reached || loop_detect {
            return None;
        }
        if !tip_updated {
            return None;
        }

        for v in tips.iter().copied().collect::<Vec<_>>() {
            bundle_nodes.insert(v);
        }
    }
}

#[derive(Clone)]
struct CompoundCandidate {
    s: NodeId,
    t: NodeId,
    length: u32,
    score: i32,
    bundle_edges: Vec<UtgKey>,
}

fn construct_compound_paths_0(
    sg: &StringGraph,
    ug: &UnitigGraph,
    depth_cutoff: usize,
    width_cutoff: f64,
    length_cutoff: u64,
) -> Vec<CompoundCandidate> {
    let branch_nodes: Vec<NodeId> = ug.live_nodes().into_iter().filter(|&n| ug.out_degree(n) > 1).collect();
    let mut out = Vec::new();
    for p in branch_nodes {
        if let Some(b) = find_bundle(sg, ug, p, depth_cutoff, width_cutoff, length_cutoff) {
            out.push(CompoundCandidate { s: p, t: b.end, length: b.length, score: b.score, bundle_edges: b.bundle_edges });
        }
    }
    out.sort_by(|a, b| b.bundle_edges.len().cmp(&a.bundle_edges.len()));
    out
}

fn construct_compound_paths_1(sg: &StringGraph, candidates: Vec<CompoundCandidate>) -> OrderedMap<UtgKey, CompoundCandidate> {
    let mut claimed: OrderedSet<UtgKey> = ordered_set();
    let mut out: OrderedMap<UtgKey, CompoundCandidate> = ordered_map();

    for cand in candidates {
        let overlapped = cand.bundle_edges.iter().any(|key| {
            claimed.contains(key) || claimed.contains(&reverse_key(sg, key))
        });
        if overlapped {
            continue;
        }

        let rs = sg.rc_node(cand.t);
        let rt = sg.rc_node(cand.s);
        let fwd_key = UtgKey { s: cand.s, t: cand.t, via: Via::Compound };
        let rev_key = UtgKey { s: rs, t: rt, via: Via::Compound };

        let mut bundle_edges_r = Vec::with_capacity(cand.bundle_edges.len());
        for key in &cand.bundle_edges {
            claimed.insert(*key);
            let rkey = reverse_key(sg, key);
            claimed.insert(rkey);
            bundle_edges_r.push(rkey);
        }

        out.insert(
            rev_key,
            CompoundCandidate { s: rs, t: rt, length: cand.length, score: cand.score, bundle_edges: bundle_edges_r },
        );
        out.insert(fwd_key, cand);
    }

    out
}

fn construct_compound_paths_2(
    sg: &StringGraph,
    cp1: &OrderedMap<UtgKey, CompoundCandidate>,
) -> (OrderedMap<UtgKey, CompoundCandidate>, OrderedMap<UtgKey, usize>) {
    let mut cp2 = ordered_map();
    let mut edge_to_cpath: OrderedMap<UtgKey, usize> = ordered_map();
    for (key, cand) in cp1.iter() {
        let rkey = UtgKey { s: sg.rc_node(key.t), t: sg.rc_node(key.s), via: Via::Compound };
        if !cp1.contains_key(&rkey) {
            continue;
        }
        cp2.insert(*key, cand.clone());
        for e in &cand.bundle_edges {
            *edge_to_cpath.entry(*e).or_insert(0) += 1;
        }
    }
    (cp2, edge_to_cpath)
}

fn construct_compound_paths_3(
    sg: &StringGraph,
    ug: &UnitigGraph,
    cp2: &OrderedMap<UtgKey, CompoundCandidate>,
    edge_to_cpath: &OrderedMap<UtgKey, usize>,
) -> OrderedMap<UtgKey, CompoundCandidate> {
    let mut cp3 = ordered_map();
    for (key, val) in cp2.iter() {
        let rkey = UtgKey { s: sg.rc_node(key.t), t: sg.rc_node(key.s), via: Via::Compound };
        debug_assert!(cp2.contains_key(&rkey));
        let contained = ug.out_edges(key.s).iter().any(|k| edge_to_cpath.get(k).copied().unwrap_or(0) > 1);
        if !contained {
            cp3.insert(*key, val.clone());
        }
    }
    cp3
}

fn construct_compound_paths(
    sg: &StringGraph,
    ug: &UnitigGraph,
    depth_cutoff: usize,
    width_cutoff: f64,
    length_cutoff: u64,
) -> OrderedMap<UtgKey, CompoundCandidate> {
    let cp0 = construct_compound_paths_0(sg, ug, depth_cutoff, width_cutoff, length_cutoff);
    let cp1 = construct_compound_paths_1(sg, cp0);
    let (cp2, edge_to_cpath) = construct_compound_paths_2(sg, &cp1);
    let cp3 = construct_compound_paths_3(sg, ug, &cp2, &edge_to_cpath);

    let mut result = ordered_map();
    for (key, val) in cp3.iter() {
        let rkey = UtgKey { s: sg.rc_node(key.t), t: sg.rc_node(key.s), via: Via::Compound };
        if !cp3.contains_key(&rkey) {
            continue;
        }
        result.insert(*key, val.clone());
    }
    result
}

fn shortest_path(ug: &UnitigGraph, start: NodeId, goal: NodeId) -> Option<Vec<NodeId>> {
    if start == goal {
        return Some(vec![start]);
    }
    let mut prev: OrderedMap<NodeId, NodeId> = ordered_map();
    let mut visited: OrderedSet<NodeId> = ordered_set();
    visited.insert(start);
    let mut queue = VecDeque::new();
    queue.push_back(start);
    while let Some(v) = queue.pop_front() {
        for key in ug.out_edges(v) {
            let w = key.t;
            if visited.insert(w) {
                prev.insert(w, v);
                if w == goal {
                    let mut path = vec![w];
                    let mut cur = w;
                    while cur != start {
                        cur = prev[&cur];
                        path.push(cur);
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(w);
            }
        }
    }
    None
}

/// Removes unitigs that bridge into a node with more than one live
/// in-neighbour, whose total run length stays under `spur_len`, repeated
/// from every current source node. Mutates `ug` and its `u_edge_data`
/// types in place.
pub fn identify_spurs(sg: &StringGraph, ug: &mut UnitigGraph, spur_len: u64) {
    let mut s_candidates: OrderedSet<NodeId> = ordered_set();
    for n in ug.live_nodes() {
        if ug.in_degree(n) == 0 {
            s_candidates.insert(n);
        }
    }

    while let Some(n) = pop_arbitrary(&mut s_candidates) {
        if ug.in_degree(n) != 0 {
            continue;
        }
        let ego_nodes = ego_node_set(ug, n, 10);

        for &b_node in ego_nodes.iter() {
            if ug.in_degree(b_node) <= 1 {
                continue;
            }
            let b_in: Vec<NodeId> = ug.in_edges(b_node).iter().map(|k| k.s).collect();
            if b_in.len() == 1 {
                continue;
            }
            let with_extern_node = b_in.iter().any(|v| !ego_nodes.contains(v));
            if !with_extern_node {
                continue;
            }

            let Some(s_path) = shortest_path(ug, n, b_node) else { continue };

            let mut total_length = 0u64;
            for w in 1..s_path.len() {
                let (v1, v2) = (s_path[w - 1], s_path[w]);
                for key in ug.out_edges(v1) {
                    if key.t == v2 {
                        total_length += ug.get(key).unwrap().length as u64;
                    }
                }
            }
            if total_length >= spur_len {
                continue;
            }

            for w in 1..s_path.len() {
                let (v1, v2) = (s_path[w - 1], s_path[w]);
                let keys: Vec<UtgKey> = ug.out_edges(v1).iter().filter(|k| k.t == v2).copied().collect();
                for key in keys {
                    let rkey = reverse_key(sg, &key);
                    ug.retype(&key, UtgType::Spur2);
                    ug.retype(&rkey, UtgType::Spur2);
                }
                if ug.in_degree(v2) == 0 {
                    s_candidates.insert(v2);
                }
            }
        }
    }
}

/// Collapses parallel simple unitigs between the same `(s, t)` pair down to
/// one survivor, chosen by lexicographically smallest `via` node name. Only
/// ever applies to unitigs whose path has at most three nodes (spec section
/// 4.E). Deliberately does not retype the reverse-complement pair — each
/// orientation's duplicate set is collapsed independently, matching the
/// original, so the surviving `via` can differ between the two strands.
pub fn remove_dup_simple_path(sg: &StringGraph, ug: &mut UnitigGraph) {
    let mut simple_edges: OrderedSet<(NodeId, NodeId)> = ordered_set();
    let mut dup_edges: OrderedMap<(NodeId, NodeId), Vec<NodeId>> = ordered_map();

    let all_keys: Vec<UtgKey> = ug.edges.keys().copied().collect();
    for key in all_keys {
        let edge = ug.edges.get(&key).unwrap();
        if !matches!(edge.utype, UtgType::Simple) {
            continue;
        }
        let path_len = match &edge.payload {
            UtgPayload::Path(p) => p.len(),
            UtgPayload::Bundle(b) => b.len(),
        };
        if path_len > 3 {
            continue;
        }
        let Via::Node(w) = key.via else { continue };
        if simple_edges.insert((key.s, key.t)) {
            dup_edges.insert((key.s, key.t), vec![w]);
        } else {
            dup_edges.get_mut(&(key.s, key.t)).unwrap().push(w);
        }
    }

    for ((s, t), mut vl) in dup_edges {
        vl.sort_by_key(|&w| sg.node(w).read_end.to_string());
        for w in vl.into_iter().skip(1) {
            ug.retype(&UtgKey { s, t, via: Via::Node(w) }, UtgType::SimpleDup);
        }
    }
}

/// Flags unitigs that look like a short repeat-induced bridge: a single
/// in-edge fanning out to two and immediately funnelling back to one
/// (spec section 4.E's ASCII diagram), under 60kb. Returns both
/// orientations of each flagged key.
pub fn identify_short_edges_to_remove(sg: &StringGraph, ug: &UnitigGraph) -> Vec<UtgKey> {
    let mut out = Vec::new();
    for (key, edge) in ug.live_iter() {
        if ug.in_degree(key.s) == 1
            && ug.out_degree(key.s) == 2
            && ug.in_degree(key.t) == 2
            && ug.out_degree(key.t) == 1
            && edge.length < 60_000
        {
            out.push(*key);
            out.push(reverse_key(sg, key));
        }
    }
    out
}

pub struct UnitigConfig {
    pub depth_cutoff: usize,
    pub width_cutoff: usize,
    pub length_cutoff: u64,
}

impl Default for UnitigConfig {
    fn default() -> Self {
        UnitigConfig { depth_cutoff: 48, width_cutoff: 16, length_cutoff: 500_000 }
    }
}

pub struct UnitigBuildResult {
    pub graph: UnitigGraph,
    /// Snapshot of the unitig graph right after `identify_simple_paths`,
    /// before the spur pass, duplicate collapse, compound consolidation and
    /// repeat-bridge removal below touch it. This is what `utg_data0` dumps.
    pub simple_graph: UnitigGraph,
    pub circular_paths: Vec<(UtgKey, UtgEdge)>,
    /// Compound-path bundle records, kept for the `c_path` dump (component
    /// F) which needs the bundle membership independent of `UnitigGraph`'s
    /// post-collapse state.
    pub compound_paths: Vec<(UtgKey, u32, i32, Vec<UtgKey>)>,
}

/// Runs the full component-E pipeline in the order the original's
/// `ovlp_to_graph` driver does: simple paths, a conservative spur pass,
/// simple-duplicate collapse, compound-path consolidation, repeat-bridge
/// removal, then a wider final spur pass.
pub fn build_unitig_graph(sg: &StringGraph, cfg: &UnitigConfig) -> UnitigBuildResult {
    let simple_paths = identify_simple_paths(sg);
    let mut ug = UnitigGraph::new();
    let mut circular_paths = Vec::new();
    for (key, (length, score, path)) in simple_paths {
        let edge = UtgEdge { length, score, payload: UtgPayload::Path(path), utype: UtgType::Simple };
        if key.s == key.t {
            circular_paths.push((key, edge));
        } else {
            ug.insert(key, edge);
        }
    }
    info!(unitigs = ug.len(), circular = circular_paths.len(), "simple unitig construction complete");

    let simple_graph = ug.clone();

    identify_spurs(sg, &mut ug, 50_000);
    remove_dup_simple_path(sg, &mut ug);

    let width_cutoff = cfg.width_cutoff as f64;
    let compound = construct_compound_paths(sg, &ug, cfg.depth_cutoff, width_cutoff, cfg.length_cutoff);
    debug!(compound = compound.len(), "compound path consolidation complete");

    let mut compound_paths = Vec::with_capacity(compound.len());
    for (key, cand) in compound.iter() {
        for bkey in &cand.bundle_edges {
            if ug.is_live(bkey) {
                ug.retype(bkey, UtgType::Contained);
            }
        }
        compound_paths.push((*key, cand.length, cand.score, cand.bundle_edges.clone()));
    }
    for (key, cand) in compound {
        let edge = UtgEdge { length: cand.length, score: cand.score, payload: UtgPayload::Bundle(cand.bundle_edges), utype: UtgType::Compound };
        ug.insert(key, edge);
    }

    let short_edges = identify_short_edges_to_remove(sg, &ug);
    if !short_edges.is_empty() {
        debug!(removed = short_edges.len() / 2, "repeat-bridge unitigs removed");
    }
    for key in &short_edges {
        ug.retype(key, UtgType::RepeatBridge);
    }

    identify_spurs(sg, &mut ug, 80_000);

    UnitigBuildResult { graph: ug, simple_graph, circular_paths, compound_paths }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{End, ReadEnd};

    /// Chains `n` reads' `B` ends so every interior node is in/out-degree 1.
    fn linear_chain(n: usize) -> StringGraph {
        let mut g = StringGraph::new();
        let mut prev = g.intern(&ReadEnd::new("0", End::B));
        for i in 1..n {
            let cur = g.intern(&ReadEnd::new(i.to_string(), End::B));
            g.add_edge_pair(prev, cur, i.to_string(), 0, 5, -5, 99.0, 'u');
            prev = cur;
        }
        g
    }

    #[test]
    fn identify_simple_paths_collapses_linear_chain_to_one_unitig() {
        let g = linear_chain(5);
        let paths = identify_simple_paths(&g);
        // four forward edges collapse into exactly one forward unitig plus
        // its reverse-complement
        assert_eq!(paths.len(), 2);
        let start = g.node_ids().find(|&n| g.node(n).read_end == ReadEnd::new("0", End::B)).unwrap();
        let (_key, (length, _score, path)) = paths.iter().find(|(k, _)| k.s == start).unwrap();
        assert_eq!(path.len(), 5);
        assert_eq!(*length, 20);
    }

    fn diamond_graph() -> StringGraph {
        // s --a--> m1 --e--> m1b --b--> t
        // s --c--> m2 --f--> m2b --d--> t
        // Each leg is a 4-node simple path (s, m*, m*b, t) so
        // `remove_dup_simple_path`'s `path_len > 3` skip leaves both legs
        // intact for `find_bundle` to bundle into a compound, instead of
        // collapsing them as duplicate 3-node (s, v, t) paths first.
        let mut g = StringGraph::new();
        let s = g.intern(&ReadEnd::new("1", End::B));
        let m1 = g.intern(&ReadEnd::new("2", End::B));
        let m1b = g.intern(&ReadEnd::new("5", End::B));
        let m2 = g.intern(&ReadEnd::new("3", End::B));
        let m2b = g.intern(&ReadEnd::new("6", End::B));
        let t = g.intern(&ReadEnd::new("4", End::B));
        g.add_edge_pair(s, m1, "2".into(), 0, 5, -5, 99.0, 'u');
        g.add_edge_pair(m1, m1b, "5".into(), 5, 10, -2, 99.0, 'u');
        g.add_edge_pair(m1b, t, "4".into(), 10, 15, -5, 99.0, 'u');
        g.add_edge_pair(s, m2, "3".into(), 0, 5, -3, 99.0, 'u');
        g.add_edge_pair(m2, m2b, "6".into(), 5, 10, -2, 99.0, 'u');
        g.add_edge_pair(m2b, t, "4".into(), 15, 20, -5, 99.0, 'u');
        g
    }

    #[test]
    fn find_bundle_collapses_a_simple_diamond() {
        let sg = diamond_graph();
        let cfg = UnitigConfig::default();
        let result = build_unitig_graph(&sg, &cfg);
        let compound_count = result.graph.iter().filter(|(_, e)| matches!(e.utype, UtgType::Compound)).count();
        assert_eq!(compound_count, 2, "forward and reverse-complement compound paths");
    }

    #[test]
    fn find_bundle_bails_when_more_than_four_tips() {
        // a branch node with 5 out-edges to 5 dead-end nodes can never
        // reconverge and must report no bundle.
        let mut g = StringGraph::new();
        let s = g.intern(&ReadEnd::new("1", End::B));
        for i in 2..=6 {
            let m = g.intern(&ReadEnd::new(i.to_string(), End::B));
            g.add_edge_pair(s, m, i.to_string(), 0, 5, -5, 99.0, 'u');
        }
        let cfg = UnitigConfig::default();
        let result = build_unitig_graph(&g, &cfg);
        assert_eq!(result.compound_paths.len(), 0);
    }

    #[test]
    fn find_bundle_respects_length_cutoff() {
        let sg = diamond_graph();
        let mut ug = UnitigGraph::new();
        for (key, (length, score, path)) in identify_simple_paths(&sg) {
            ug.insert(key, UtgEdge { length, score, payload: UtgPayload::Path(path), utype: UtgType::Simple });
        }
        let s = sg.node_ids().find(|&n| sg.node(n).read_end == ReadEnd::new("1", End::B)).unwrap();
        let bundle = find_bundle(&sg, &ug, s, 48, 16.0, 1);
        assert!(bundle.is_none(), "length_cutoff of 1 must reject any real path");
    }

    #[test]
    fn identify_short_edges_to_remove_flags_narrow_repeat_bridge() {
        // p->s (in=1,out=2) -s->t- (bridge, in=2,out=1) -> z, short bridge
        let mut g = StringGraph::new();
        let p = g.intern(&ReadEnd::new("1", End::B));
        let s = g.intern(&ReadEnd::new("2", End::B));
        let t = g.intern(&ReadEnd::new("4", End::B));
        let x = g.intern(&ReadEnd::new("3", End::B));
        let y = g.intern(&ReadEnd::new("8", End::B));
        let z = g.intern(&ReadEnd::new("5", End::B));
        g.add_edge_pair(p, s, "2".into(), 0, 5, -5, 99.0, 'u');
        g.add_edge_pair(s, t, "4".into(), 0, 5, -5, 99.0, 'u');
        g.add_edge_pair(s, x, "3".into(), 0, 5, -4, 99.0, 'u');
        g.add_edge_pair(y, t, "4".into(), 0, 5, -3, 99.0, 'u');
        g.add_edge_pair(t, z, "5".into(), 0, 5, -5, 99.0, 'u');

        let mut ug = UnitigGraph::new();
        for (key, (length, score, path)) in identify_simple_paths(&g) {
            ug.insert(key, UtgEdge { length, score, payload: UtgPayload::Path(path), utype: UtgType::Simple });
        }
        let flagged = identify_short_edges_to_remove(&g, &ug);
        assert!(flagged.iter().any(|k| k.s == s && k.t == t));
    }
}
