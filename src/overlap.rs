//! Component A: overlap record ingester.
//!
//! Grounded on `original_source/scripts/ipa2_ovlp_to_graph.py::yield_from_overlap_file`
//! for the line format and `init_string_graph`'s duplicate-pair and
//! reverse-coordinate-swap handling, and on the teacher's
//! `alignment_filtering.rs::filter_paf` for the parse-then-dedup two-pass
//! idiom.

use std::io::BufRead;
use std::path::Path;

use tracing::{info, warn};

use crate::error::GraphError;
use crate::model::ReadId;
use crate::ordered::{OrderedSet, ordered_set};

#[derive(Clone, Debug)]
pub struct OverlapRecord {
    pub f_id: ReadId,
    pub g_id: ReadId,
    pub score: i32,
    pub identity: f64,
    pub f_strand: u8,
    pub f_b: i64,
    pub f_e: i64,
    pub f_l: i64,
    /// `g_strand` is retained only for diagnostics; the coordinate swap that
    /// depends on it has already been applied by the time this record is
    /// produced.
    pub g_strand: u8,
    pub g_b: i64,
    pub g_e: i64,
    pub g_l: i64,
    pub inphase: char,
}

const FIELD_NAMES: [&str; 12] = [
    "f_id", "g_id", "score", "identity", "f_strand", "f_b", "f_e", "f_l", "g_strand", "g_b",
    "g_e", "g_l",
];

fn parse_field<T: std::str::FromStr>(
    path: &Path,
    line_no: usize,
    field: &'static str,
    raw: &str,
    kind: &'static str,
) -> Result<T, GraphError> {
    raw.parse::<T>().map_err(|_| GraphError::NotNumeric {
        path: path.to_path_buf(),
        line: line_no,
        field,
        value: raw.to_string(),
        kind,
    })
}

/// Parses one non-terminator line into an `OverlapRecord`, applying the
/// reverse-alignment coordinate swap so that `g_b < g_e` means forward.
fn parse_line(path: &Path, line_no: usize, line: &str) -> Result<OverlapRecord, GraphError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 12 {
        return Err(GraphError::FieldCount {
            path: path.to_path_buf(),
            line: line_no,
            expected: 12,
            found: fields.len(),
        });
    }

    let f_id = fields[0].to_string();
    let g_id = fields[1].to_string();
    let score: i32 = parse_field(path, line_no, FIELD_NAMES[2], fields[2], "integer")?;
    let identity: f64 = parse_field(path, line_no, FIELD_NAMES[3], fields[3], "float")?;
    let f_strand: u8 = parse_field(path, line_no, FIELD_NAMES[4], fields[4], "integer")?;
    let f_b: i64 = parse_field(path, line_no, FIELD_NAMES[5], fields[5], "integer")?;
    let f_e: i64 = parse_field(path, line_no, FIELD_NAMES[6], fields[6], "integer")?;
    let f_l: i64 = parse_field(path, line_no, FIELD_NAMES[7], fields[7], "integer")?;
    let g_strand: u8 = parse_field(path, line_no, FIELD_NAMES[8], fields[8], "integer")?;
    let mut g_b: i64 = parse_field(path, line_no, FIELD_NAMES[9], fields[9], "integer")?;
    let mut g_e: i64 = parse_field(path, line_no, FIELD_NAMES[10], fields[10], "integer")?;
    let g_l: i64 = parse_field(path, line_no, FIELD_NAMES[11], fields[11], "integer")?;
    let inphase = fields.get(14).and_then(|s| s.chars().next()).unwrap_or('u');

    if g_strand == 1 {
        std::mem::swap(&mut g_b, &mut g_e);
    }

    Ok(OverlapRecord {
        f_id,
        g_id,
        score,
        identity,
        f_strand,
        f_b,
        f_e,
        f_l,
        g_strand,
        g_b,
        g_e,
        g_l,
        inphase,
    })
}

/// Reads overlap records from `reader` until a terminator line starting
/// with `-`, deduplicating unordered `(f_id, g_id)` pairs (first wins).
pub fn ingest_overlaps<R: BufRead>(
    reader: R,
    path_for_diagnostics: &Path,
) -> Result<Vec<OverlapRecord>, GraphError> {
    let mut seen: OrderedSet<(ReadId, ReadId)> = ordered_set();
    let mut records = Vec::new();
    let mut dup_count = 0usize;

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line?;
        if line.starts_with('-') {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        let record = parse_line(path_for_diagnostics, line_no, &line)?;
        let key = if record.f_id <= record.g_id {
            (record.f_id.clone(), record.g_id.clone())
        } else {
            (record.g_id.clone(), record.f_id.clone())
        };
        if !seen.insert(key) {
            dup_count += 1;
            continue;
        }
        records.push(record);
    }

    if dup_count > 0 {
        warn!(dup_count, "dropped duplicate overlap pairs (first occurrence kept)");
    }
    info!(records = records.len(), "overlap ingestion complete");
    Ok(records)
}

pub fn ingest_overlaps_from_path(path: impl AsRef<Path>) -> Result<Vec<OverlapRecord>, GraphError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let total_bytes = file.metadata().ok().map(|m| m.len());
    let reader = crate::ordered::ProgressReader::new(
        std::io::BufReader::new(file),
        "overlap ingest",
        total_bytes,
    );
    ingest_overlaps(std::io::BufReader::new(reader), path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn stops_at_terminator() {
        let data = "1 2 100 0.99 0 0 10 20 0 5 15 20\n-\n1 3 100 0.99 0 0 10 20 0 5 15 20\n";
        let recs = ingest_overlaps(Cursor::new(data), Path::new("test")).unwrap();
        assert_eq!(recs.len(), 1);
    }

    #[test]
    fn dedups_unordered_pairs_keeping_first() {
        let data = "1 2 100 0.99 0 0 10 20 0 5 15 20\n2 1 200 0.50 0 0 10 20 0 5 15 20\n";
        let recs = ingest_overlaps(Cursor::new(data), Path::new("test")).unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].score, 100);
    }

    #[test]
    fn defaults_inphase_to_u() {
        let data = "1 2 100 0.99 0 0 10 20 0 5 15 20\n";
        let recs = ingest_overlaps(Cursor::new(data), Path::new("test")).unwrap();
        assert_eq!(recs[0].inphase, 'u');
    }

    #[test]
    fn swaps_g_coords_for_reverse_strand() {
        let data = "1 2 100 0.99 0 0 10 20 1 5 15 20\n";
        let recs = ingest_overlaps(Cursor::new(data), Path::new("test")).unwrap();
        assert_eq!((recs[0].g_b, recs[0].g_e), (15, 5));
    }

    #[test]
    fn rejects_short_lines() {
        let data = "1 2 100 0.99 0 0 10 20\n";
        let err = ingest_overlaps(Cursor::new(data), Path::new("test")).unwrap_err();
        assert!(matches!(err, GraphError::FieldCount { .. }));
    }

    #[test]
    fn rejects_non_numeric_score() {
        let data = "1 2 NaNish 0.99 0 0 10 20 0 5 15 20\n";
        let err = ingest_overlaps(Cursor::new(data), Path::new("test")).unwrap_err();
        assert!(matches!(err, GraphError::NotNumeric { .. }));
    }
}
