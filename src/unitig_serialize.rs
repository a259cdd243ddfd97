//! Component F: unitig-graph dumps — `utg_data`/`utg_data0`, the `c_path`
//! compound-bundle listing, and both GFA renderings.
//!
//! Grounded on `original_source/scripts/ipa2_ovlp_to_graph.py`'s
//! `print_edge_data`, `print_utg_data0`, `identify_edges_to_remove`'s
//! file-writing half, `generic_nx_to_gfa` and `unitig_nx_to_gfa`.

use std::io::Write;

use crate::error::GraphError;
use crate::model::StringGraph;
use crate::ordered::{OrderedMap, ordered_map};
use crate::unitig::{UnitigGraph, UtgKey, UtgPayload, UtgType};

fn join_path(sg: &StringGraph, path: &[crate::model::NodeId]) -> String {
    path.iter().map(|&n| sg.node(n).read_end.to_string()).collect::<Vec<_>>().join("~")
}

fn join_bundle(sg: &StringGraph, bundle: &[UtgKey]) -> String {
    bundle
        .iter()
        .map(|k| {
            let via = via_label(sg, k);
            format!("{}~{}~{}", sg.node(k.s).read_end, via, sg.node(k.t).read_end)
        })
        .collect::<Vec<_>>()
        .join("|")
}

fn via_label(sg: &StringGraph, key: &UtgKey) -> String {
    match key.via {
        crate::unitig::Via::Node(w) => sg.node(w).read_end.to_string(),
        crate::unitig::Via::Compound => "NA".to_string(),
    }
}

/// Writes `utg_data`: every entry ever created, live or retyped, one line
/// `s via t type length score payload`. Payload shape is decided by the
/// entry's `via` (compound vs. node), which stays correct even after a
/// compound entry is retyped to `contained`/`repeat_bridge`.
pub fn write_utg_data<W: Write>(sg: &StringGraph, ug: &UnitigGraph, mut out: W) -> Result<(), GraphError> {
    for (key, edge) in ug.iter() {
        let payload = match &edge.payload {
            UtgPayload::Path(p) => join_path(sg, p),
            UtgPayload::Bundle(b) => join_bundle(sg, b),
        };
        writeln!(
            out,
            "{} {} {} {} {} {} {}",
            sg.node(key.s).read_end,
            via_label(sg, key),
            sg.node(key.t).read_end,
            edge.utype.code(),
            edge.length,
            edge.score,
            payload,
        )?;
    }
    Ok(())
}

/// Writes `utg_data0`, the pre-haplospur-pass snapshot. Payload shape is
/// decided by `type_ == "compound"` rather than `via`, matching the
/// original's earlier dump site — equivalent in practice since `utg_data0`
/// is written before any entry can be retyped away from `compound`.
pub fn write_utg_data0<W: Write>(sg: &StringGraph, ug: &UnitigGraph, mut out: W) -> Result<(), GraphError> {
    for (key, edge) in ug.iter() {
        let payload = match (&edge.payload, edge.utype) {
            (UtgPayload::Bundle(b), UtgType::Compound) => join_bundle(sg, b),
            (UtgPayload::Path(p), _) => join_path(sg, p),
            (UtgPayload::Bundle(b), _) => join_bundle(sg, b),
        };
        writeln!(
            out,
            "{} {} {} {} {} {} {}",
            sg.node(key.s).read_end,
            via_label(sg, key),
            sg.node(key.t).read_end,
            edge.utype.code(),
            edge.length,
            edge.score,
            payload,
        )?;
    }
    Ok(())
}

/// Writes `c_path`: one line per compound unitig, `s v t width length score
/// <bundle edges as s~v~t joined by |>`.
pub fn write_c_path<W: Write>(
    sg: &StringGraph,
    compound_paths: &[(UtgKey, u32, i32, Vec<UtgKey>)],
    mut out: W,
) -> Result<(), GraphError> {
    for (key, length, score, bundle_edges) in compound_paths {
        let width = bundle_edges.len();
        writeln!(
            out,
            "{} {} {} {} {} {} {}",
            sg.node(key.s).read_end,
            via_label(sg, key),
            sg.node(key.t).read_end,
            width,
            length,
            score,
            join_bundle(sg, bundle_edges),
        )?;
    }
    Ok(())
}

/// Writes the standard GFA: one `S` line per live unitig-graph node (fixed
/// 1000bp placeholder length, matching the original's `node_len_dict=None`
/// default) and one `L` line per live unitig edge.
pub fn write_gfa<W: Write>(sg: &StringGraph, ug: &UnitigGraph, mut out: W) -> Result<(), GraphError> {
    writeln!(out, "H\tVN:Z:1.0")?;
    for n in ug.live_nodes() {
        writeln!(out, "S\t{}\t*\tLN:i:1000", sg.node(n).read_end)?;
    }
    for (key, _) in ug.live_iter() {
        writeln!(out, "L\t{}\t+\t{}\t+\t0M", sg.node(key.s).read_end, sg.node(key.t).read_end)?;
    }
    Ok(())
}

/// Writes the dual GFA: each live unitig edge becomes a node named
/// `s~via~t`, connected through shared endpoints rather than directly.
pub fn write_dual_gfa<W: Write>(sg: &StringGraph, ug: &UnitigGraph, mut out: W) -> Result<(), GraphError> {
    writeln!(out, "H\tVN:Z:1.0")?;

    let mut inlets: OrderedMap<crate::model::NodeId, Vec<String>> = ordered_map();
    let mut outlets: OrderedMap<crate::model::NodeId, Vec<String>> = ordered_map();
    let mut node_names: Vec<(String, UtgKey)> = Vec::new();

    for (key, edge) in ug.live_iter() {
        let name = format!("{}~{}~{}", sg.node(key.s).read_end, via_label(sg, key), sg.node(key.t).read_end);
        writeln!(out, "S\t{}\t*\tLN:i:{}", name, edge.length)?;
        inlets.entry(key.s).or_default().push(name.clone());
        outlets.entry(key.t).or_default().push(name.clone());
        node_names.push((name, *key));
    }

    let mut seen: crate::ordered::OrderedSet<(String, String)> = crate::ordered::ordered_set();
    for (name, key) in &node_names {
        if let Some(ws) = outlets.get(&key.t) {
            for w in ws {
                if seen.insert((name.clone(), w.clone())) {
                    writeln!(out, "L\t{}\t+\t{}\t+\t0M", name, w)?;
                }
            }
        }
        if let Some(ws) = inlets.get(&key.s) {
            for w in ws {
                if seen.insert((w.clone(), name.clone())) {
                    writeln!(out, "L\t{}\t+\t{}\t+\t0M", w, name)?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{End, ReadEnd};
    use crate::unitig::{UtgEdge, Via};

    fn small_graph() -> (StringGraph, UnitigGraph) {
        let mut g = StringGraph::new();
        let s = g.intern(&ReadEnd::new("1", End::B));
        let m = g.intern(&ReadEnd::new("2", End::B));
        let t = g.intern(&ReadEnd::new("3", End::B));
        let mut ug = UnitigGraph::new();
        ug.insert(
            UtgKey { s, t, via: Via::Node(m) },
            UtgEdge { length: 10, score: -5, payload: UtgPayload::Path(vec![s, m, t]), utype: UtgType::Simple },
        );
        (g, ug)
    }

    #[test]
    fn utg_data_line_has_expected_shape() {
        let (g, ug) = small_graph();
        let mut buf = Vec::new();
        write_utg_data(&g, &ug, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.trim(), "1:B 2:B 3:B simple 10 -5 1:B~2:B~3:B");
    }

    #[test]
    fn gfa_has_header_and_node_lines() {
        let (g, ug) = small_graph();
        let mut buf = Vec::new();
        write_gfa(&g, &ug, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("H\tVN:Z:1.0\n"));
        assert!(text.contains("S\t1:B\t*\tLN:i:1000"));
        assert!(text.contains("L\t1:B\t+\t3:B\t+\t0M"));
    }

    #[test]
    fn compound_payload_joins_bundle_edges_with_pipes() {
        let mut g = StringGraph::new();
        let s = g.intern(&ReadEnd::new("1", End::B));
        let m1 = g.intern(&ReadEnd::new("2", End::B));
        let m2 = g.intern(&ReadEnd::new("3", End::B));
        let t = g.intern(&ReadEnd::new("4", End::B));
        let mut ug = UnitigGraph::new();
        let bundle = vec![
            UtgKey { s, t: m1, via: Via::Node(m1) },
            UtgKey { s, t: m2, via: Via::Node(m2) },
        ];
        ug.insert(
            UtgKey { s, t, via: Via::Compound },
            UtgEdge { length: 20, score: -8, payload: UtgPayload::Bundle(bundle.clone()), utype: UtgType::Compound },
        );
        let mut buf = Vec::new();
        write_utg_data(&g, &ug, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("1:B NA 4:B compound"));
        assert!(text.contains("1:B~2:B~2:B|1:B~3:B~3:B"));
    }
}
