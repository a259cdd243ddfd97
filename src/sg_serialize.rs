//! Component D: serialises the reduced string graph's edge list and the
//! chimer-bridge node dump.
//!
//! Grounded on `original_source/scripts/ipa2_ovlp_to_graph.py::init_digraph`
//! for the exact `sg_edges_list` format string and on the same module's
//! `chimers_nodes` writer in `generate_nx_string_graph`.

use std::io::Write;

use crate::error::GraphError;
use crate::model::{NodeId, StringGraph};

/// Writes one line per edge: `v w rid s t score identity type inphase`.
pub fn write_sg_edges_list<W: Write>(g: &StringGraph, mut out: W) -> Result<(), GraphError> {
    for edge in &g.edges {
        writeln!(
            out,
            "{} {} {} {:5} {:5} {:5} {:5.2} {} {}",
            g.node(edge.from).read_end,
            g.node(edge.to).read_end,
            edge.rid,
            edge.s,
            edge.t,
            edge.score,
            edge.identity,
            edge.flag.code(),
            edge.inphase,
        )?;
    }
    Ok(())
}

/// Writes one chimer-bridge node name per line.
pub fn write_chimers_nodes<W: Write>(
    g: &StringGraph,
    chimer_nodes: &[NodeId],
    mut out: W,
) -> Result<(), GraphError> {
    for &n in chimer_nodes {
        writeln!(out, "{}", g.node(n).read_end)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{End, ReadEnd};

    #[test]
    fn formats_edge_line() {
        let mut g = StringGraph::new();
        let a = g.intern(&ReadEnd::new("1", End::B));
        let b = g.intern(&ReadEnd::new("2", End::B));
        g.add_edge_pair(a, b, "2".into(), 0, 5, -10, 98.5, 'u');

        let mut buf = Vec::new();
        write_sg_edges_list(&g, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let first_line = text.lines().next().unwrap();
        assert!(first_line.starts_with("1:B 2:B 2"));
        assert!(first_line.ends_with("G u"));
    }
}
