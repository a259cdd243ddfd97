pub mod cli;
pub mod config;
pub mod contig;
pub mod error;
pub mod model;
pub mod ordered;
pub mod overlap;
pub mod reduce;
pub mod sg_serialize;
pub mod string_graph;
pub mod tiling;
pub mod unitig;
pub mod unitig_serialize;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use tracing::info;

use crate::config::GraphConfig;
use crate::error::GraphError;

fn create(out_dir: &Path, name: &str) -> Result<BufWriter<File>, GraphError> {
    Ok(BufWriter::new(File::create(out_dir.join(name))?))
}

/// Runs the full overlap-to-graph pipeline: ingest overlaps, build the
/// string graph, reduce it, build the unitig graph, extract contigs and
/// emit tiling paths, writing every external-interface file (spec
/// section 6) under `cfg.out_dir`.
pub fn run_pipeline(cfg: &GraphConfig) -> Result<(), GraphError> {
    std::fs::create_dir_all(&cfg.out_dir)?;

    let overlaps = overlap::ingest_overlaps_from_path(&cfg.overlap_file)?;
    info!(overlaps = overlaps.len(), "ingested overlaps");

    let mut sg = string_graph::build_string_graph(&overlaps);
    info!(nodes = sg.nodes.len(), edges = sg.edges.len(), "built string graph");

    let reduce_cfg = reduce::ReduceConfig {
        fuzz: reduce::FUZZ,
        chimer_bridge_removal: !cfg.disable_chimer_bridge_removal,
        repeat_resolution: cfg.repeat_resolution,
    };
    let reduce_result = reduce::reduce(&mut sg, &reduce_cfg);
    info!(chimers = reduce_result.chimer_nodes.len(), "reduced string graph");

    sg_serialize::write_sg_edges_list(&sg, create(&cfg.out_dir, "sg_edges_list")?)?;
    if !cfg.disable_chimer_bridge_removal {
        sg_serialize::write_chimers_nodes(&sg, &reduce_result.chimer_nodes, create(&cfg.out_dir, "chimers_nodes")?)?;
    }

    let unitig_cfg = unitig::UnitigConfig {
        depth_cutoff: cfg.depth_cutoff,
        width_cutoff: cfg.width_cutoff,
        length_cutoff: cfg.length_cutoff,
    };
    let build = unitig::build_unitig_graph(&sg, &unitig_cfg);
    info!(unitigs = build.graph.len(), circular = build.circular_paths.len(), "built unitig graph");

    unitig_serialize::write_utg_data0(&sg, &build.simple_graph, create(&cfg.out_dir, "utg_data0")?)?;
    unitig_serialize::write_c_path(&sg, &build.compound_paths, create(&cfg.out_dir, "c_path")?)?;
    unitig_serialize::write_gfa(&sg, &build.graph, create(&cfg.out_dir, "utg.gfa")?)?;
    unitig_serialize::write_dual_gfa(&sg, &build.graph, create(&cfg.out_dir, "utg_dual.gfa")?)?;

    let mut best_in = reduce_result.best_in;
    if cfg.haplospur {
        let simple_ctg_paths = contig::construct_c_path_from_utgs(&sg, &build.graph, None, false);
        contig::find_best_in_for_simple_ctg_paths(&simple_ctg_paths, &sg, &build.graph, &mut best_in);
        info!("haplospur refinement complete");
    }

    let mut c_path = contig::construct_c_path_from_utgs(&sg, &build.graph, Some(&best_in), true);
    c_path.sort_by_key(|p| std::cmp::Reverse(p.length));

    let contigs = contig::extract_contigs(&sg, &build.graph, &c_path, &build.circular_paths, &cfg.ctg_prefix);

    unitig_serialize::write_utg_data(&sg, &build.graph, create(&cfg.out_dir, "utg_data")?)?;
    contig::write_ctg_paths(&sg, &contigs, create(&cfg.out_dir, "ctg_paths")?)?;

    let mut p_ctg_out = create(&cfg.out_dir, "p_ctg_tiling_path")?;
    let mut a_ctg_out = create(&cfg.out_dir, "a_ctg_all_tiling_path")?;
    for record in &contigs {
        let (primary, alternates) = tiling::build_tiling_paths(&sg, &build.graph, record);
        tiling::write_tiling_path(&sg, &primary, &mut p_ctg_out)?;
        for alt in &alternates {
            tiling::write_tiling_path(&sg, &alt.hops, &mut a_ctg_out)?;
        }
    }

    info!(contigs = contigs.len(), "pipeline complete");
    Ok(())
}
