//! Component J: `GraphConfig`, the runtime configuration the pipeline
//! driver (`lib.rs::run_pipeline`) consumes.
//!
//! Grounded on the teacher's `configs.rs`/`cli.rs` `From<&Args> for Config`
//! pattern.

use std::path::PathBuf;

use crate::reduce::RepeatResolution;

pub struct GraphConfig {
    pub overlap_file: PathBuf,
    pub repeat_resolution: RepeatResolution,
    pub disable_chimer_bridge_removal: bool,
    pub ctg_prefix: String,
    pub haplospur: bool,
    pub depth_cutoff: usize,
    pub width_cutoff: usize,
    pub length_cutoff: u64,
    pub out_dir: PathBuf,
}

impl From<&crate::cli::Args> for GraphConfig {
    fn from(args: &crate::cli::Args) -> Self {
        GraphConfig {
            overlap_file: args.overlap_file.clone(),
            repeat_resolution: if args.lfc { RepeatResolution::LocalFlow } else { RepeatResolution::BestOverlap },
            disable_chimer_bridge_removal: args.disable_chimer_bridge_removal,
            ctg_prefix: args.ctg_prefix.clone(),
            haplospur: args.haplospur,
            depth_cutoff: args.depth_cutoff,
            width_cutoff: args.width_cutoff,
            length_cutoff: args.length_cutoff,
            out_dir: args.out_dir.clone(),
        }
    }
}
