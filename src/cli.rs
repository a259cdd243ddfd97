use std::path::PathBuf;

use clap::Parser;

/// Reduces a string graph of read overlaps to contigs and tiling paths.
#[derive(Parser)]
#[command(
    name = "ovlp2graph",
    version,
    about = "String-graph reduction and contig extraction for long-read overlaps"
)]
pub struct Args {
    /// Overlap file (m4-like format, component A)
    #[arg(long, default_value = "preads.m4")]
    pub overlap_file: PathBuf,

    /// Resolve repeat edges with local-flow consistency instead of best-overlap
    #[arg(long)]
    pub lfc: bool,

    /// Skip chimeric-read bridge detection and removal
    #[arg(long)]
    pub disable_chimer_bridge_removal: bool,

    /// Prefix prepended to every emitted contig name
    #[arg(long, default_value = "")]
    pub ctg_prefix: String,

    /// Refine best-in edges by dropping short haplotype spurs before the
    /// final contig extraction pass
    #[arg(long)]
    pub haplospur: bool,

    /// Maximum ego-network depth `find_bundle` will search before giving up
    #[arg(long, default_value_t = 48)]
    pub depth_cutoff: usize,

    /// Maximum number of open tips `find_bundle` will track before giving up
    #[arg(long, default_value_t = 16)]
    pub width_cutoff: usize,

    /// Unitig length above which a bundle candidate is no longer considered
    #[arg(long, default_value_t = 500_000)]
    pub length_cutoff: u64,

    /// Directory the component D/F/G/H output files are written to
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Fixed seed for the deterministic hasher, stabilising output ordering
    /// across runs
    #[arg(long, env = "OVLP2GRAPH_HASH_SEED", default_value_t = 0x5347_4152_4150_4831)]
    pub hash_seed: u64,
}
