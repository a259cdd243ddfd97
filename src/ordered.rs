//! Deterministic containers and progress meters (component I).
//!
//! Every container that participates in a non-commutative pass (edge lists,
//! node iteration, tip sets) must iterate in insertion order — see spec
//! section 9's "insertion-ordered maps/sets are required for determinism".
//! `IndexMap`/`IndexSet` already provide exactly that; these are thin
//! newtypes so the rest of the crate names its intent rather than reaching
//! for a raw `indexmap` type everywhere.

use std::hash::Hash;
use std::io::{BufRead, Read};

use indexmap::{IndexMap, IndexSet};
use tracing::info;

pub type OrderedSet<T> = IndexSet<T>;
pub type OrderedMap<K, V> = IndexMap<K, V>;

pub fn ordered_set<T: Hash + Eq>() -> OrderedSet<T> {
    IndexSet::new()
}

pub fn ordered_map<K: Hash + Eq, V>() -> OrderedMap<K, V> {
    IndexMap::new()
}

/// Wraps a reader and logs decile byte-progress at `info` level.
///
/// Grounded on `original_source/scripts/graph_to_contig.py`'s
/// `open_progress` helper, which logs a percentage of bytes consumed while
/// streaming large overlap/edge-list files.
pub struct ProgressReader<R> {
    inner: R,
    label: String,
    total_bytes: Option<u64>,
    bytes_read: u64,
    last_decile_logged: u64,
}

impl<R: Read> ProgressReader<R> {
    pub fn new(inner: R, label: impl Into<String>, total_bytes: Option<u64>) -> Self {
        ProgressReader {
            inner,
            label: label.into(),
            total_bytes,
            bytes_read: 0,
            last_decile_logged: 0,
        }
    }

    fn note_progress(&mut self, n: usize) {
        self.bytes_read += n as u64;
        let Some(total) = self.total_bytes else {
            return;
        };
        if total == 0 {
            return;
        }
        let decile = (self.bytes_read * 10 / total).min(10);
        if decile > self.last_decile_logged {
            self.last_decile_logged = decile;
            info!(
                target: "strandgraph::progress",
                stage = %self.label,
                percent = decile * 10,
                bytes_read = self.bytes_read,
                total_bytes = total,
                "progress"
            );
        }
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.note_progress(n);
        Ok(n)
    }
}

impl<R: BufRead> BufRead for ProgressReader<R> {
    fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt);
        self.note_progress(amt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Cursor};

    #[test]
    fn ordered_set_preserves_insertion_order() {
        let mut s: OrderedSet<&str> = ordered_set();
        s.insert("c");
        s.insert("a");
        s.insert("b");
        assert_eq!(s.iter().copied().collect::<Vec<_>>(), vec!["c", "a", "b"]);
    }

    #[test]
    fn progress_reader_passes_bytes_through() {
        let data = b"hello world".to_vec();
        let len = data.len() as u64;
        let mut pr = ProgressReader::new(BufReader::new(Cursor::new(data)), "test", Some(len));
        let mut out = String::new();
        std::io::Read::read_to_string(&mut pr, &mut out).unwrap();
        assert_eq!(out, "hello world");
    }
}
