//! Component B: string-graph builder.
//!
//! Grounded on `original_source/scripts/ipa2_ovlp_to_graph.py::init_string_graph`
//! for the exact four-case edge table, and on the teacher's
//! `create_overlap_graph.rs` for the idiom of matching on coordinate
//! relations to pick edge endpoints.

use crate::model::{End, ReadEnd, StringGraph};
use crate::overlap::OverlapRecord;

/// Builds the directed read-end string graph from ingested overlaps,
/// applying the four-case edge table of spec section 4.B. Overlaps whose
/// projected extension would be zero-length are skipped entirely.
pub fn build_string_graph(overlaps: &[OverlapRecord]) -> StringGraph {
    let mut sg = StringGraph::new();

    for od in overlaps {
        let f_id = od.f_id.clone();
        let g_id = od.g_id.clone();
        let score = -od.score;
        let identity = od.identity;
        let inphase = od.inphase;

        if od.f_b > 0 {
            if od.g_b < od.g_e {
                // f.B --------> f.E
                //         g.B ------------> g.E
                if od.f_b == 0 || od.g_e - od.g_l == 0 {
                    continue;
                }
                let g_b_node = sg.intern(&ReadEnd::new(g_id.clone(), End::B));
                let f_b_node = sg.intern(&ReadEnd::new(f_id.clone(), End::B));
                sg.add_edge_pair(g_b_node, f_b_node, f_id.clone(), od.f_b, 0, score, identity, inphase);
                let f_e_node = sg.intern(&ReadEnd::new(f_id.clone(), End::E));
                let g_e_node = sg.intern(&ReadEnd::new(g_id.clone(), End::E));
                sg.add_edge_pair(f_e_node, g_e_node, g_id.clone(), od.g_e, od.g_l, score, identity, inphase);
            } else {
                // f.B --------> f.E
                //         g.E <------------ g.B
                if od.f_b == 0 || od.g_e == 0 {
                    continue;
                }
                let g_e_node = sg.intern(&ReadEnd::new(g_id.clone(), End::E));
                let f_b_node = sg.intern(&ReadEnd::new(f_id.clone(), End::B));
                sg.add_edge_pair(g_e_node, f_b_node, f_id.clone(), od.f_b, 0, score, identity, inphase);
                let f_e_node = sg.intern(&ReadEnd::new(f_id.clone(), End::E));
                let g_b_node = sg.intern(&ReadEnd::new(g_id.clone(), End::B));
                sg.add_edge_pair(f_e_node, g_b_node, g_id.clone(), od.g_e, 0, score, identity, inphase);
            }
        } else if od.g_b < od.g_e {
            //             f.B --------> f.E
            //     g.B ------------> g.E
            if od.g_b == 0 || od.f_e - od.f_l == 0 {
                continue;
            }
            let f_b_node = sg.intern(&ReadEnd::new(f_id.clone(), End::B));
            let g_b_node = sg.intern(&ReadEnd::new(g_id.clone(), End::B));
            sg.add_edge_pair(f_b_node, g_b_node, g_id.clone(), od.g_b, 0, score, identity, inphase);
            let g_e_node = sg.intern(&ReadEnd::new(g_id.clone(), End::E));
            let f_e_node = sg.intern(&ReadEnd::new(f_id.clone(), End::E));
            sg.add_edge_pair(g_e_node, f_e_node, f_id.clone(), od.f_e, od.f_l, score, identity, inphase);
        } else {
            //             f.B --------> f.E
            //     g.E <------------ g.B
            if od.g_b - od.g_l == 0 || od.f_e - od.f_l == 0 {
                continue;
            }
            let f_b_node = sg.intern(&ReadEnd::new(f_id.clone(), End::B));
            let g_e_node = sg.intern(&ReadEnd::new(g_id.clone(), End::E));
            sg.add_edge_pair(f_b_node, g_e_node, g_id.clone(), od.g_b, od.g_l, score, identity, inphase);
            let g_b_node = sg.intern(&ReadEnd::new(g_id.clone(), End::B));
            let f_e_node = sg.intern(&ReadEnd::new(f_id.clone(), End::E));
            sg.add_edge_pair(g_b_node, f_e_node, f_id.clone(), od.f_e, od.f_l, score, identity, inphase);
        }
    }

    sg
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(f_id: &str, g_id: &str, f_b: i64, f_e: i64, f_l: i64, g_b: i64, g_e: i64, g_l: i64) -> OverlapRecord {
        OverlapRecord {
            f_id: f_id.to_string(),
            g_id: g_id.to_string(),
            score: 100,
            identity: 99.0,
            f_strand: 0,
            f_b,
            f_e,
            f_l,
            g_strand: 0,
            g_b,
            g_e,
            g_l,
            inphase: 'u',
        }
    }

    #[test]
    fn case_f_b_positive_g_forward_adds_expected_edges() {
        let overlaps = vec![rec("1", "2", 5, 20, 20, 0, 15, 20)];
        let sg = build_string_graph(&overlaps);
        assert_eq!(sg.edges.len(), 4); // 2 edges + 2 rc edges
        let g_b = ReadEnd::new("2", End::B);
        let f_b = ReadEnd::new("1", End::B);
        let found = sg.edges.iter().any(|e| {
            e.label() == "1:5-0" && sg.node(e.to).read_end == f_b && sg.node(e.from).read_end == g_b
        });
        assert!(found, "expected g:B->f:B edge with label 1:5-0");
    }

    #[test]
    fn zero_length_projection_is_skipped() {
        // f_b > 0, g forward, but g_e == g_l -> second edge zero length -> whole overlap skipped
        let overlaps = vec![rec("1", "2", 5, 20, 20, 0, 20, 20)];
        let sg = build_string_graph(&overlaps);
        assert_eq!(sg.edges.len(), 0);
    }

    #[test]
    fn every_edge_has_a_complement() {
        let overlaps = vec![
            rec("1", "2", 5, 20, 20, 0, 15, 20),
            rec("2", "3", 0, 18, 20, 3, 20, 20),
        ];
        let sg = build_string_graph(&overlaps);
        for e in &sg.edges {
            let rc = sg.edge(e.rc);
            assert_eq!(sg.rc_node(e.from), rc.to);
            assert_eq!(sg.rc_node(e.to), rc.from);
        }
    }
}
