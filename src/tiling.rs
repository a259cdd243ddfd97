//! Component H: tiling-path emitter.
//!
//! Grounded on `original_source/scripts/graph_to_contig.py::run`'s
//! tiling-path section: reconstructs the node-level path a contig's unitig
//! chain represents, resolving each compound unitig to its highest-score
//! internal simple path, and emits alternates for every compound whose
//! internal DAG has more than one s→t route.

use std::io::Write;

use crate::contig::ContigRecord;
use crate::error::GraphError;
use crate::model::{NodeId, StringGraph};
use crate::ordered::{OrderedMap, ordered_map};
use crate::unitig::{UnitigGraph, UtgKey, UtgPayload, UtgType};

/// One hop of a tiling path: the string-graph edge `v -> w` and the read
/// extension it came from.
pub struct TilingHop {
    pub ctg_id: String,
    pub v: NodeId,
    pub w: NodeId,
    pub rid: String,
    pub s: i64,
    pub t: i64,
    pub aln_score: i32,
    pub identity: f64,
    pub inphase: char,
}

pub struct AltTiling {
    pub atg_id: String,
    pub hops: Vec<TilingHop>,
}

fn live_edge(sg: &StringGraph, v: NodeId, w: NodeId) -> Option<&crate::model::EdgeRecord> {
    sg.live_out_edges(v).map(|e| sg.edge(e)).find(|e| e.to == w)
}

fn hops_from_node_path(sg: &StringGraph, ctg_id: &str, nodes: &[NodeId]) -> Vec<TilingHop> {
    let mut hops = Vec::with_capacity(nodes.len().saturating_sub(1));
    for pair in nodes.windows(2) {
        let (v, w) = (pair[0], pair[1]);
        let Some(e) = live_edge(sg, v, w) else { continue };
        hops.push(TilingHop {
            ctg_id: ctg_id.to_string(),
            v,
            w,
            rid: e.rid.clone(),
            s: e.s,
            t: e.t,
            aln_score: e.score,
            identity: e.identity,
            inphase: e.inphase,
        });
    }
    hops
}

/// Finds the minimum-weight s→t route in a small acyclic node graph via
/// memoized DFS (`adj` is guaranteed acyclic: it is always built from a
/// bundle's converging sub-paths).
fn shortest_path_dag(
    adj: &OrderedMap<NodeId, Vec<(NodeId, i64)>>,
    s: NodeId,
    t: NodeId,
) -> Option<(i64, Vec<NodeId>)> {
    fn visit(
        node: NodeId,
        t: NodeId,
        adj: &OrderedMap<NodeId, Vec<(NodeId, i64)>>,
        memo: &mut OrderedMap<NodeId, Option<(i64, Vec<NodeId>)>>,
    ) -> Option<(i64, Vec<NodeId>)> {
        if node == t {
            return Some((0, vec![t]));
        }
        if let Some(cached) = memo.get(&node) {
            return cached.clone();
        }
        let mut best: Option<(i64, Vec<NodeId>)> = None;
        if let Some(edges) = adj.get(&node) {
            for &(next, w) in edges {
                if let Some((d, rest)) = visit(next, t, adj, memo) {
                    let total = w + d;
                    if best.as_ref().map(|(bd, _)| total < *bd).unwrap_or(true) {
                        let mut path = vec![node];
                        path.extend(rest);
                        best = Some((total, path));
                    }
                }
            }
        }
        memo.insert(node, best.clone());
        best
    }
    let mut memo = ordered_map();
    visit(s, t, adj, &mut memo)
}

fn remove_path_edges(adj: &mut OrderedMap<NodeId, Vec<(NodeId, i64)>>, path: &[NodeId]) {
    for pair in path.windows(2) {
        let (n0, n1) = (pair[0], pair[1]);
        if let Some(v) = adj.get_mut(&n0) {
            v.retain(|&(w, _)| w != n1);
        }
    }
}

/// Enumerates every s→t route through a compound unitig's internal DAG by
/// repeatedly taking the current minimum-weight path and removing its
/// edges, until no route remains. Returns candidates sorted by descending
/// score (the first is the primary continuation).
fn compound_internal_paths(
    sg: &StringGraph,
    ug: &UnitigGraph,
    bundle: &[UtgKey],
    s: NodeId,
    t: NodeId,
) -> Vec<(i64, Vec<NodeId>)> {
    let mut adj: OrderedMap<NodeId, Vec<(NodeId, i64)>> = ordered_map();
    for member in bundle {
        let Some(edge) = ug.get(member) else { continue };
        if let UtgPayload::Path(nodes) = &edge.payload {
            for pair in nodes.windows(2) {
                let (v1, v2) = (pair[0], pair[1]);
                let Some(e) = live_edge(sg, v1, v2) else { continue };
                adj.entry(v1).or_default().push((v2, e.score as i64));
            }
        }
    }

    let mut candidates = Vec::new();
    loop {
        let Some((score, path)) = shortest_path_dag(&adj, s, t) else { break };
        remove_path_edges(&mut adj, &path);
        candidates.push((score, path));
    }
    candidates.sort_by(|a, b| b.0.cmp(&a.0));
    candidates
}

/// Builds the primary tiling path for one contig plus every alternate
/// tiling path contributed by a compound unitig with more than one
/// internal route.
pub fn build_tiling_paths(sg: &StringGraph, ug: &UnitigGraph, record: &ContigRecord) -> (Vec<TilingHop>, Vec<AltTiling>) {
    let mut one_path: Vec<NodeId> = Vec::new();
    let mut alt_groups: OrderedMap<(NodeId, NodeId), Vec<(i64, Vec<NodeId>)>> = ordered_map();

    for key in &record.members {
        let Some(edge) = ug.get(key) else { continue };
        match (&edge.payload, edge.utype) {
            (UtgPayload::Path(nodes), _) => {
                if one_path.is_empty() {
                    one_path.extend(nodes.iter().copied());
                } else {
                    one_path.extend(nodes.iter().skip(1).copied());
                }
            }
            (UtgPayload::Bundle(bundle), UtgType::Compound) => {
                let candidates = compound_internal_paths(sg, ug, bundle, key.s, key.t);
                let Some((_, best_path)) = candidates.first().cloned() else { continue };
                if one_path.is_empty() {
                    one_path.extend(best_path.iter().copied());
                } else {
                    one_path.extend(best_path.iter().skip(1).copied());
                }
                alt_groups.insert((key.s, key.t), candidates);
            }
            (UtgPayload::Bundle(_), _) => {}
        }
    }

    let primary = hops_from_node_path(sg, &record.name, &one_path);

    let mut alternates = Vec::new();
    let mut a_id = 0u32;
    for ((_, _), candidates) in alt_groups {
        if candidates.len() <= 1 {
            continue;
        }
        a_id += 1;
        for (sub_id, (_, path)) in candidates.iter().enumerate() {
            let atg_id = format!("{}-{:03}-{:02}", record.name, a_id, sub_id);
            alternates.push(AltTiling { hops: hops_from_node_path(sg, &atg_id, path), atg_id });
        }
    }

    (primary, alternates)
}

pub fn write_tiling_path<W: Write>(sg: &StringGraph, hops: &[TilingHop], mut out: W) -> Result<(), GraphError> {
    for h in hops {
        writeln!(
            out,
            "{} {} {} {} {} {} {} {:.2} {}",
            h.ctg_id,
            sg.node(h.v).read_end,
            sg.node(h.w).read_end,
            h.rid,
            h.s,
            h.t,
            h.aln_score,
            h.identity,
            h.inphase,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{End, ReadEnd};
    use crate::unitig::{UtgEdge, Via};

    fn node(g: &mut StringGraph, id: &str) -> NodeId {
        g.intern(&ReadEnd::new(id, End::B))
    }

    #[test]
    fn simple_member_chain_emits_one_hop_per_edge() {
        let mut g = StringGraph::new();
        let a = node(&mut g, "1");
        let b = node(&mut g, "2");
        let c = node(&mut g, "3");
        g.add_edge_pair(a, b, "2".into(), 0, 5, -5, 99.0, 'u');
        g.add_edge_pair(b, c, "3".into(), 5, 10, -4, 98.0, 'u');

        let mut ug = UnitigGraph::new();
        let key = UtgKey { s: a, t: c, via: Via::Node(b) };
        ug.insert(key, UtgEdge { length: 10, score: -9, payload: UtgPayload::Path(vec![a, b, c]), utype: UtgType::Simple });

        let record = ContigRecord {
            name: "ctg000000F".to_string(),
            ctype: "ctg_linear",
            first_triple: String::new(),
            end_node: c,
            length: 10,
            score: -9,
            payload: String::new(),
            members: vec![key],
        };

        let (primary, alternates) = build_tiling_paths(&g, &ug, &record);
        assert_eq!(primary.len(), 2);
        assert!(alternates.is_empty());
        assert_eq!(primary[0].v, a);
        assert_eq!(primary[1].w, c);
    }

    #[test]
    fn compound_member_with_two_routes_emits_alternates() {
        let mut g = StringGraph::new();
        let s = node(&mut g, "1");
        let m1 = node(&mut g, "2");
        let m2 = node(&mut g, "3");
        let t = node(&mut g, "4");
        g.add_edge_pair(s, m1, "2".into(), 0, 5, -3, 99.0, 'u');
        g.add_edge_pair(m1, t, "4".into(), 5, 10, -3, 99.0, 'u');
        g.add_edge_pair(s, m2, "3".into(), 0, 5, -9, 99.0, 'u');
        g.add_edge_pair(m2, t, "4".into(), 5, 10, -9, 99.0, 'u');

        let mut ug = UnitigGraph::new();
        let leg1 = UtgKey { s, t: m1, via: Via::Node(m1) };
        let leg2 = UtgKey { s, t: m2, via: Via::Node(m2) };
        ug.insert(leg1, UtgEdge { length: 5, score: -3, payload: UtgPayload::Path(vec![s, m1, t]), utype: UtgType::Contained });
        ug.insert(leg2, UtgEdge { length: 5, score: -9, payload: UtgPayload::Path(vec![s, m2, t]), utype: UtgType::Contained });

        let compound_key = UtgKey { s, t, via: Via::Compound };
        ug.insert(
            compound_key,
            UtgEdge { length: 10, score: -3, payload: UtgPayload::Bundle(vec![leg1, leg2]), utype: UtgType::Compound },
        );

        let record = ContigRecord {
            name: "ctg000000F".to_string(),
            ctype: "ctg_linear",
            first_triple: String::new(),
            end_node: t,
            length: 10,
            score: -3,
            payload: String::new(),
            members: vec![compound_key],
        };

        let (primary, alternates) = build_tiling_paths(&g, &ug, &record);
        assert_eq!(primary.len(), 2, "primary picks the higher-scoring leg through m1");
        assert_eq!(primary[0].w, m1);
        assert_eq!(alternates.len(), 2, "both legs become alternates since the group has two routes");
    }
}
