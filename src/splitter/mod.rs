// Recursive multi-separator text splitter
// Splits raw text into bounded-size chunks with overlap carried across
// chunk boundaries, preferring coarse separators over fine ones.


use tracing::debug;

use crate::config::ChunkingConfig;
use crate::extract::RawUnit;

/// Separators in decreasing granularity: paragraph, line, CJK sentence
/// punctuation, clause punctuation, space, and character-level fallback.
/// The order is part of the splitting contract.
pub const DEFAULT_SEPARATORS: &[&str] =
    &["\n\n", "\n", "。", "！", "？", "：", "；", "，", " ", ""];

/// A chunk of text ready for embedding, carrying its source unit's
/// page number forward when one exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkCandidate {
    pub text: String,
    pub page: Option<u32>,
}

pub struct RecursiveSplitter {
    chunk_size: usize,
    overlap: usize,
    separators: Vec<String>,
}

impl RecursiveSplitter {
    #[inline]
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            overlap: config.chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    #[inline]
    pub fn with_separators(mut self, separators: Vec<String>) -> Self {
        self.separators = separators;
        self
    }

    /// Split text into chunks of at most `chunk_size` characters, with up to
    /// `overlap` characters repeated between consecutive chunks.
    ///
    /// Runs in two stages: a pure recursive pass over the separator list
    /// producing leaf fragments, then a stateful packing pass that merges
    /// fragments into near-target-size chunks. A leaf fragment that no
    /// separator can break below `chunk_size` is emitted as sliding
    /// character windows instead.
    #[inline]
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut fragments = Vec::new();
        self.split_by_separators(text, 0, &mut fragments);

        let chunks = self.pack(&fragments);
        debug!(
            "Split {} chars into {} chunks",
            text.chars().count(),
            chunks.len()
        );
        chunks
    }

    /// Split every unit and carry its metadata onto each resulting chunk.
    /// Ordering is unit order, then chunk order within the unit.
    #[inline]
    pub fn split_units(&self, units: &[RawUnit]) -> Vec<ChunkCandidate> {
        units
            .iter()
            .flat_map(|unit| {
                self.split(&unit.text)
                    .into_iter()
                    .map(|text| ChunkCandidate {
                        text,
                        page: unit.page,
                    })
            })
            .collect()
    }

    /// Recursively split on the separator at `index`, then refine every
    /// non-empty piece with the next separator. The empty-string separator
    /// (or an exhausted list) terminates the recursion.
    fn split_by_separators<'a>(&self, text: &'a str, index: usize, out: &mut Vec<&'a str>) {
        let separator = match self.separators.get(index) {
            Some(sep) if !sep.is_empty() => sep,
            _ => {
                out.push(text);
                return;
            }
        };

        for piece in text.split(separator.as_str()) {
            if !piece.is_empty() {
                self.split_by_separators(piece, index + 1, out);
            }
        }
    }

    /// Pack leaf fragments into chunks. Lengths are Unicode scalar counts.
    fn pack(&self, fragments: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut buffer = String::new();
        let mut buffer_len = 0usize;
        let stride = self.chunk_size.saturating_sub(self.overlap).max(1);

        for fragment in fragments {
            let fragment_len = fragment.chars().count();

            if fragment_len > self.chunk_size {
                // No separator could break this fragment down; fall back to
                // fixed windows of chunk_size with overlap-sized stride.
                if !buffer.is_empty() {
                    chunks.push(std::mem::take(&mut buffer));
                    buffer_len = 0;
                }

                let chars: Vec<char> = fragment.chars().collect();
                let mut start = 0;
                while start < chars.len() {
                    let end = (start + self.chunk_size).min(chars.len());
                    chunks.push(chars[start..end].iter().collect());
                    start += stride;
                }
                continue;
            }

            if buffer_len + fragment_len > self.chunk_size && !buffer.is_empty() {
                let flushed = std::mem::take(&mut buffer);
                // Seed the next buffer with the flushed chunk's tail,
                // clipped to the flushed chunk's own length.
                let keep = self.overlap.min(buffer_len);
                buffer = flushed.chars().skip(buffer_len - keep).collect();
                buffer_len = keep;
                chunks.push(flushed);
            }

            buffer.push_str(fragment);
            buffer_len += fragment_len;
        }

        if !buffer.is_empty() {
            chunks.push(buffer);
        }

        chunks
    }
}
