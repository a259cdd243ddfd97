//! Component G: contig extractor, haplospur refinement.
//!
//! Grounded on `original_source/scripts/ipa2_ovlp_to_graph.py`'s
//! `construct_c_path_from_utgs`, `extract_contigs` and
//! `find_best_in_for_simple_ctg_paths`.

use std::io::Write;

use tracing::info;

use crate::error::GraphError;
use crate::model::{NodeId, StringGraph};
use crate::ordered::{OrderedMap, OrderedSet, ordered_map, ordered_set};
use crate::unitig::{UnitigGraph, UtgEdge, UtgKey, UtgPayload, UtgType, reverse_key};

fn pop_arbitrary(set: &mut OrderedSet<NodeId>) -> Option<NodeId> {
    let v = *set.iter().next()?;
    set.shift_remove(&v);
    Some(v)
}

fn triple(sg: &StringGraph, key: &UtgKey) -> String {
    let via = match key.via {
        crate::unitig::Via::Node(w) => sg.node(w).read_end.to_string(),
        crate::unitig::Via::Compound => "NA".to_string(),
    };
    format!("{}~{}~{}", sg.node(key.s).read_end, via, sg.node(key.t).read_end)
}

/// One entry of the `c_path` chain built by [`construct_c_path_from_utgs`]:
/// a maximal walk through unitig-graph edges before it forks, terminates,
/// or a best-in check rejects further extension.
#[derive(Clone, Debug)]
pub struct ContigPath {
    pub start: NodeId,
    pub key: NodeId,
    pub end: NodeId,
    pub length: u32,
    pub score: i32,
    pub path: Vec<UtgKey>,
    pub n_edges: usize,
    pub is_spur: bool,
}

/// Nodes in the string graph that feed into `t` through the unitig edge
/// `member`, used by the best-in check at a compound unitig's target.
fn predecessor_of(ug: &UnitigGraph, member: &UtgKey, t: NodeId) -> Option<NodeId> {
    let edge = ug.get(member)?;
    match &edge.payload {
        UtgPayload::Path(p) if p.last() == Some(&t) && p.len() >= 2 => Some(p[p.len() - 2]),
        _ => None,
    }
}

fn predecessor_nodes_for_compound(ug: &UnitigGraph, bundle: &[UtgKey], t: NodeId) -> OrderedSet<NodeId> {
    let mut out = ordered_set();
    for member in bundle {
        if member.t != t {
            continue;
        }
        if let Some(p) = predecessor_of(ug, member, t) {
            out.insert(p);
        }
    }
    out
}

/// Walks maximal chains through unitig-graph nodes of out-degree 1,
/// consulting `best_in` at every node with more than one live in-edge to
/// decide whether to keep extending through it (spec section 4.G).
pub fn construct_c_path_from_utgs(
    sg: &StringGraph,
    ug: &UnitigGraph,
    best_in: Option<&OrderedMap<NodeId, NodeId>>,
    use_bestin_heuristic: bool,
) -> Vec<ContigPath> {
    let live_nodes = ug.live_nodes();
    let mut s_nodes: OrderedSet<NodeId> = ordered_set();
    let mut simple_out: OrderedSet<NodeId> = ordered_set();
    let mut sources: OrderedSet<NodeId> = ordered_set();

    for &n in live_nodes.iter() {
        let indeg = ug.in_degree(n);
        let outdeg = ug.out_degree(n);
        if !(indeg == 1 && outdeg == 1) && outdeg != 0 {
            s_nodes.insert(n);
        }
        if outdeg == 1 {
            simple_out.insert(n);
        }
        if indeg == 0 && outdeg > 0 {
            sources.insert(n);
        }
    }

    let mut free_edges: OrderedSet<UtgKey> = ug.live_iter().map(|(k, _)| *k).collect();
    let mut c_path = Vec::new();

    while !free_edges.is_empty() {
        let n = match pop_arbitrary(&mut s_nodes) {
            Some(n) => n,
            None => free_edges.iter().next().unwrap().s,
        };

        for start_key in ug.out_edges(n).to_vec() {
            let path_start = n;
            let path_key = start_key.t;
            let mut path: Vec<UtgKey> = Vec::new();
            let mut path_length = 0u32;
            let mut path_score = 0i32;
            let mut path_nodes: OrderedSet<NodeId> = ordered_set();
            path_nodes.insert(start_key.s);

            let mut cur = start_key;
            loop {
                let t = cur.t;
                if !simple_out.contains(&t) {
                    break;
                }
                if path_nodes.contains(&t) {
                    break;
                }
                if path_nodes.contains(&sg.rc_node(t)) {
                    break;
                }

                let edge = ug.get(&cur).expect("unitig edge must exist in the full map");

                if ug.in_degree(t) > 1 {
                    if !use_bestin_heuristic {
                        break;
                    }
                    let best_in_node = best_in.and_then(|m| m.get(&t).copied());
                    let extends = match (&edge.payload, edge.utype) {
                        (UtgPayload::Path(p), UtgType::Simple) => {
                            p.len() >= 2 && best_in_node == Some(p[p.len() - 2])
                        }
                        (UtgPayload::Bundle(b), UtgType::Compound) => {
                            let t_in_nodes = predecessor_nodes_for_compound(ug, b, t);
                            best_in_node.map(|bn| t_in_nodes.contains(&bn)).unwrap_or(false)
                        }
                        _ => true,
                    };
                    if !extends {
                        break;
                    }
                }

                path.push(cur);
                path_nodes.insert(t);
                path_length += edge.length;
                path_score += edge.score;

                cur = ug.out_edges(t)[0];
            }

            path.push(cur);
            let edge = ug.get(&cur).expect("unitig edge must exist in the full map");
            path_length += edge.length;
            path_score += edge.score;
            path_nodes.insert(cur.t);
            let path_end = cur.t;
            let is_spur = sources.contains(&path_start);
            let n_edges = path.len();

            for e in &path {
                free_edges.shift_remove(e);
            }

            c_path.push(ContigPath {
                start: path_start,
                key: path_key,
                end: path_end,
                length: path_length,
                score: path_score,
                path,
                n_edges,
                is_spur,
            });
        }
    }

    c_path
}

/// One emitted contig (forward/reverse pair, or a standalone circular
/// path), matching the `ctg_paths` record shape of spec section 6.
pub struct ContigRecord {
    pub name: String,
    pub ctype: &'static str,
    pub first_triple: String,
    pub end_node: NodeId,
    pub length: u32,
    pub score: i32,
    pub payload: String,
    /// The unitig-graph keys this contig walks, in order; consulted by the
    /// tiling-path emitter (component H) to resolve compound unitigs.
    pub members: Vec<UtgKey>,
}

/// Walks each `ContigPath`, trimming it where an edge (or its
/// reverse-complement) was already consumed by an earlier, longer contig,
/// and emits the forward/reverse pair. Standalone circular unitigs from
/// component E each become one additional circular contig.
pub fn extract_contigs(
    sg: &StringGraph,
    ug: &UnitigGraph,
    c_path: &[ContigPath],
    circular_paths: &[(UtgKey, UtgEdge)],
    ctg_prefix: &str,
) -> Vec<ContigRecord> {
    let mut free_edges: OrderedSet<UtgKey> = ug.live_iter().map(|(k, _)| *k).collect();
    let mut ctg_id = 0u32;
    let mut out = Vec::new();

    for cp in c_path {
        let mut length = 0u32;
        let mut score = 0i32;
        let mut length_r = 0u32;
        let mut score_r = 0i32;
        let mut non_overlapped: Vec<UtgKey> = Vec::new();
        let mut non_overlapped_r: Vec<UtgKey> = Vec::new();

        for key in &cp.path {
            let rkey = reverse_key(sg, key);
            if free_edges.contains(key) && free_edges.contains(&rkey) {
                let e = ug.get(key).expect("unitig edge must exist in the full map");
                let er = ug.get(&rkey).expect("reverse-complement unitig edge must exist");
                non_overlapped.push(*key);
                non_overlapped_r.push(rkey);
                length += e.length;
                score += e.score;
                length_r += er.length;
                score_r += er.score;
            } else {
                break;
            }
        }

        if non_overlapped.is_empty() {
            continue;
        }

        let first = non_overlapped[0];
        let end_node = non_overlapped.last().unwrap().t;
        let ctype = if end_node != first.s { "ctg_linear" } else { "ctg_circular" };

        out.push(ContigRecord {
            name: format!("{}{:06}F", ctg_prefix, ctg_id),
            ctype,
            first_triple: triple(sg, &first),
            end_node,
            length,
            score,
            payload: non_overlapped.iter().map(|k| triple(sg, k)).collect::<Vec<_>>().join("|"),
            members: non_overlapped.clone(),
        });

        non_overlapped_r.reverse();
        let first_r = non_overlapped_r[0];
        let end_node_r = non_overlapped_r.last().unwrap().t;

        out.push(ContigRecord {
            name: format!("{}{:06}R", ctg_prefix, ctg_id),
            ctype,
            first_triple: triple(sg, &first_r),
            end_node: end_node_r,
            length: length_r,
            score: score_r,
            payload: non_overlapped_r.iter().map(|k| triple(sg, k)).collect::<Vec<_>>().join("|"),
            members: non_overlapped_r.clone(),
        });

        ctg_id += 1;
        for k in &non_overlapped {
            free_edges.shift_remove(k);
        }
        for k in &non_overlapped_r {
            free_edges.shift_remove(k);
        }
    }

    for (key, edge) in circular_paths {
        out.push(ContigRecord {
            name: format!("{}{}", ctg_prefix, ctg_id),
            ctype: "ctg_circular",
            first_triple: triple(sg, key),
            end_node: key.t,
            length: edge.length,
            score: edge.score,
            payload: triple(sg, key),
            members: vec![*key],
        });
        ctg_id += 1;
    }

    info!(contigs = out.len(), "contig extraction complete");
    out
}

pub fn write_ctg_paths<W: Write>(sg: &StringGraph, contigs: &[ContigRecord], mut out: W) -> Result<(), GraphError> {
    for c in contigs {
        writeln!(
            out,
            "{} {} {} {} {} {} {}",
            c.name,
            c.ctype,
            c.first_triple,
            sg.node(c.end_node).read_end,
            c.length,
            c.score,
            c.payload,
        )?;
    }
    Ok(())
}

/// A contig-level multigraph used only by [`find_best_in_for_simple_ctg_paths`]
/// to resolve haplotig spurs; keyed the same way as `UnitigGraph` but over
/// `ContigPath`s instead of string-graph edges.
struct ContigGraph {
    out_adj: OrderedMap<NodeId, Vec<usize>>,
    in_adj: OrderedMap<NodeId, Vec<usize>>,
}

impl ContigGraph {
    fn build(paths: &[ContigPath]) -> Self {
        let mut out_adj: OrderedMap<NodeId, Vec<usize>> = ordered_map();
        let mut in_adj: OrderedMap<NodeId, Vec<usize>> = ordered_map();
        for (i, p) in paths.iter().enumerate() {
            out_adj.entry(p.start).or_default().push(i);
            in_adj.entry(p.end).or_default().push(i);
        }
        ContigGraph { out_adj, in_adj }
    }
}

/// Resolves haplotig spurs ahead of the final `best_in`-guided extraction
/// pass: builds a contig-level graph from the "simple" (heuristic-off)
/// contig paths, then iteratively drops short spur contigs feeding into
/// shared nodes and recomputes `best_in` for the nodes this changes.
pub fn find_best_in_for_simple_ctg_paths(
    simple_ctg_paths: &[ContigPath],
    sg: &StringGraph,
    ug: &UnitigGraph,
    best_in: &mut OrderedMap<NodeId, NodeId>,
) {
    let mut lengths: Vec<u32> = simple_ctg_paths.iter().map(|p| p.length).collect();
    let mut alive: Vec<bool> = vec![true; simple_ctg_paths.len()];
    let cg = ContigGraph::build(simple_ctg_paths);

    let nontrivial: Vec<NodeId> = cg
        .in_adj
        .keys()
        .copied()
        .filter(|&v| {
            let indeg = cg.in_adj.get(&v).map(|v| v.iter().filter(|&&i| alive[i]).count()).unwrap_or(0);
            let outdeg = cg.out_adj.get(&v).map(|v| v.iter().filter(|&&i| alive[i]).count()).unwrap_or(0);
            indeg > 1 && outdeg == 1
        })
        .collect();

    let mut num_iterations = 0;
    let mut converged = false;
    while num_iterations < 100 && !converged {
        converged = true;
        for &v in &nontrivial {
            let mut in_edges: Vec<usize> = cg.in_adj.get(&v).map(|v| v.iter().copied().filter(|&i| alive[i]).collect()).unwrap_or_default();
            if in_edges.len() <= 1 {
                continue;
            }
            in_edges.sort_by(|&a, &b| lengths[b].cmp(&lengths[a]));
            let max_len = lengths[in_edges[0]];

            for &i in &in_edges {
                if simple_ctg_paths[i].is_spur && lengths[i] < max_len / 2 {
                    alive[i] = false;
                    converged = false;
                }
            }

            let v_in: Vec<usize> = cg.in_adj.get(&v).map(|v| v.iter().copied().filter(|&i| alive[i]).collect()).unwrap_or_default();
            let v_out: Vec<usize> = cg.out_adj.get(&v).map(|v| v.iter().copied().filter(|&i| alive[i]).collect()).unwrap_or_default();
            if v_in.len() == 1 && v_out.len() == 1 {
                let new_len = lengths[v_in[0]] + lengths[v_out[0]];
                lengths[v_in[0]] = new_len;
                lengths[v_out[0]] = new_len;
            }
        }
        num_iterations += 1;
    }

    let mut changed: Vec<(NodeId, Option<NodeId>, NodeId)> = Vec::new();
    for &v in &nontrivial {
        let in_edges: Vec<usize> = cg.in_adj.get(&v).map(|v| v.iter().copied().filter(|&i| alive[i]).collect()).unwrap_or_default();
        let mut predecessor_nodes: OrderedSet<NodeId> = ordered_set();
        for &i in &in_edges {
            for pred in predecessor_nodes_for_contig_end(ug, &simple_ctg_paths[i]) {
                predecessor_nodes.insert(pred);
            }
        }

        let prev_best_in = best_in.get(&v).copied();
        let mut best_score: Option<i32> = None;
        let mut new_best_in = prev_best_in;
        for pred in predecessor_nodes.iter().copied() {
            if let Some(e) = sg.live_out_edges(pred).find(|&e| sg.edge(e).to == v) {
                let score = sg.edge(e).score;
                if best_score.is_none_or(|bs| score > bs) {
                    best_score = Some(score);
                    new_best_in = Some(pred);
                }
            }
        }

        if let Some(nb) = new_best_in {
            best_in.insert(v, nb);
            if Some(nb) != prev_best_in {
                changed.push((v, prev_best_in, nb));
            }
        }
    }

    if !changed.is_empty() {
        info!(changed = changed.len(), "haplospur refinement changed best_in preferences");
    }
}

/// The string-graph node(s) feeding into a contig path's final unitig edge,
/// used by the haplospur pass to recompute `best_in` once short spurs are
/// dropped from the candidate set.
fn predecessor_nodes_for_contig_end(ug: &UnitigGraph, p: &ContigPath) -> OrderedSet<NodeId> {
    let mut out = ordered_set();
    let Some(last_key) = p.path.last() else { return out };
    let Some(edge) = ug.get(last_key) else { return out };
    match &edge.payload {
        UtgPayload::Path(path_nodes) if path_nodes.len() >= 2 => {
            out.insert(path_nodes[path_nodes.len() - 2]);
        }
        UtgPayload::Path(_) => {}
        UtgPayload::Bundle(bundle) => {
            out = predecessor_nodes_for_compound(ug, bundle, last_key.t);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{End, ReadEnd};
    use crate::unitig::{Via, build_unitig_graph};
    use crate::unitig::UnitigConfig;

    fn chain_graph(n: usize) -> StringGraph {
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
    fn linear_chain_becomes_one_forward_and_one_reverse_contig() {
        let sg = chain_graph(5);
        let cfg = UnitigConfig::default();
        let build = build_unitig_graph(&sg, &cfg);
        let best_in: OrderedMap<NodeId, NodeId> = ordered_map();
        let c_path = construct_c_path_from_utgs(&sg, &build.graph, Some(&best_in), true);
        assert_eq!(c_path.len(), 2, "one forward walk, one reverse-complement walk");
        let contigs = extract_contigs(&sg, &build.graph, &c_path, &build.circular_paths, "ctg");
        assert_eq!(contigs.len(), 2);
        assert!(contigs.iter().any(|c| c.name == "ctg000000F"));
        assert!(contigs.iter().any(|c| c.name == "ctg000000R"));
    }

    #[test]
    fn circular_path_emits_a_single_contig() {
        let mut g = StringGraph::new();
        let a = g.intern(&ReadEnd::new("0", End::B));
        let b = g.intern(&ReadEnd::new("1", End::B));
        g.add_edge_pair(a, b, "1".into(), 0, 5, -5, 99.0, 'u');
        g.add_edge_pair(b, a, "0".into(), 0, 5, -5, 99.0, 'u');
        let cfg = UnitigConfig::default();
        let build = build_unitig_graph(&g, &cfg);
        assert!(!build.circular_paths.is_empty(), "a->b->a must form a circular unitig");
        let contigs = extract_contigs(&g, &build.graph, &[], &build.circular_paths, "ctg");
        assert_eq!(contigs.len(), build.circular_paths.len());
        assert_eq!(contigs[0].ctype, "ctg_circular");
    }

    #[test]
    fn bestin_heuristic_lets_the_matching_predecessor_extend_through_a_merge() {
        // a --score -3--> b, c --score -5--> b, b --> d.
        // best_in[b] = a, so only a's walk should continue past b to d.
        let mut g = StringGraph::new();
        let a = g.intern(&ReadEnd::new("1", End::B));
        let b = g.intern(&ReadEnd::new("2", End::B));
        let c = g.intern(&ReadEnd::new("3", End::B));
        let d = g.intern(&ReadEnd::new("4", End::B));
        g.add_edge_pair(a, b, "2".into(), 0, 5, -3, 99.0, 'u');
        g.add_edge_pair(c, b, "2".into(), 0, 5, -5, 99.0, 'u');
        g.add_edge_pair(b, d, "4".into(), 0, 5, -5, 99.0, 'u');

        let cfg = UnitigConfig::default();
        let build = build_unitig_graph(&g, &cfg);

        let mut best_in: OrderedMap<NodeId, NodeId> = ordered_map();
        best_in.insert(b, a);

        let with_heuristic = construct_c_path_from_utgs(&g, &build.graph, Some(&best_in), true);
        let a_walk = with_heuristic.iter().find(|p| p.start == a).unwrap();
        assert_eq!(a_walk.end, d, "a's walk must extend through b to d");

        let c_walk = with_heuristic.iter().find(|p| p.start == c).unwrap();
        assert_eq!(c_walk.end, b, "c's walk must stop at b, its best_in doesn't match");

        let without_heuristic = construct_c_path_from_utgs(&g, &build.graph, None, false);
        let a_walk_plain = without_heuristic.iter().find(|p| p.start == a).unwrap();
        assert_eq!(a_walk_plain.end, b, "without the heuristic every merge point halts the walk");
    }

    #[test]
    fn predecessor_nodes_for_contig_end_reads_the_second_to_last_path_node() {
        let mut g = StringGraph::new();
        let s = g.intern(&ReadEnd::new("1", End::B));
        let m = g.intern(&ReadEnd::new("2", End::B));
        let t = g.intern(&ReadEnd::new("3", End::B));
        let mut ug = UnitigGraph::new();
        let key = UtgKey { s, t, via: Via::Node(m) };
        ug.insert(key, UtgEdge { length: 10, score: -5, payload: UtgPayload::Path(vec![s, m, t]), utype: UtgType::Simple });

        let cp = ContigPath { start: s, key: m, end: t, length: 10, score: -5, path: vec![key], n_edges: 1, is_spur: false };
        let preds = predecessor_nodes_for_contig_end(&ug, &cp);
        assert_eq!(preds.into_iter().collect::<Vec<_>>(), vec![m]);
    }
}
