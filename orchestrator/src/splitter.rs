//! Recursive character text splitting.
//!
//! Text is split on the first separator (in priority order) that occurs in
//! it; pieces still longer than `chunk_size` are split again with the next
//! separator. Small pieces are merged back into chunks of at most
//! `chunk_size` characters, and each new chunk starts with up to
//! `chunk_overlap` characters carried over from the end of the previous one.
//! Separators stay attached to the start of the piece that follows them.
//! Lengths are measured in characters, not bytes.

use tracing::warn;

use crate::models::{ChunkMetadata, DocumentChunk};

const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone)]
pub struct RecursiveCharacterSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveCharacterSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    /// Splits every document, copying its metadata onto each chunk and
    /// recording where the chunk starts in the source text.
    pub fn split_documents(&self, docs: &[DocumentChunk]) -> Vec<DocumentChunk> {
        let mut out = Vec::new();
        for doc in docs {
            let text = &doc.page_content;
            let mut search_from = 0usize;
            let mut prev_len = 0usize;

            for chunk in self.split_text(text) {
                // Chunks overlap, so the next one starts no later than the end
                // of the previous one minus the overlap.
                let floor = search_from
                    .saturating_add(prev_len)
                    .saturating_sub(self.chunk_overlap);
                let start = find_from(text, &chunk, floor).or_else(|| find_from(text, &chunk, 0));

                if let Some(start) = start {
                    search_from = start;
                }
                prev_len = chunk.chars().count();

                let metadata = ChunkMetadata {
                    start_index: start,
                    ..doc.metadata.clone()
                };
                out.push(DocumentChunk::new(chunk, metadata));
            }
        }
        out
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut final_chunks = Vec::new();

        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut remaining: &[String] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                separator = "";
                break;
            }
            if text.contains(sep.as_str()) {
                separator = sep.as_str();
                remaining = &separators[i + 1..];
                break;
            }
        }

        let splits = split_keeping_separator(text, separator);

        let mut good_splits: Vec<String> = Vec::new();
        for piece in splits {
            if char_len(&piece) < self.chunk_size {
                good_splits.push(piece);
                continue;
            }

            if !good_splits.is_empty() {
                final_chunks.extend(self.merge_splits(&good_splits));
                good_splits.clear();
            }

            if remaining.is_empty() {
                final_chunks.push(piece);
            } else {
                final_chunks.extend(self.split_recursive(&piece, remaining));
            }
        }

        if !good_splits.is_empty() {
            final_chunks.extend(self.merge_splits(&good_splits));
        }

        final_chunks
    }

    /// Greedily packs pieces into chunks, keeping a tail of at most
    /// `chunk_overlap` characters as the head of the next chunk.
    fn merge_splits(&self, splits: &[String]) -> Vec<String> {
        let mut docs = Vec::new();
        let mut current: std::collections::VecDeque<&str> = std::collections::VecDeque::new();
        let mut total = 0usize;

        for piece in splits {
            let len = char_len(piece);

            if total + len > self.chunk_size {
                if total > self.chunk_size {
                    warn!(
                        "Created a chunk of size {}, which is longer than the specified {}",
                        total, self.chunk_size
                    );
                }

                if !current.is_empty() {
                    if let Some(doc) = join_docs(current.iter().copied()) {
                        docs.push(doc);
                    }

                    while total > self.chunk_overlap
                        || (total + len > self.chunk_size && total > 0)
                    {
                        match current.pop_front() {
                            Some(first) => total -= char_len(first),
                            None => break,
                        }
                    }
                }
            }

            current.push_back(piece);
            total += len;
        }

        if let Some(doc) = join_docs(current.iter().copied()) {
            docs.push(doc);
        }

        docs
    }
}

/// Splits `text` on `separator`, attaching each separator to the piece that
/// follows it. An empty separator splits into single characters.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(|c| c.to_string()).collect();
    }

    let mut pieces = Vec::new();
    let mut last = 0usize;
    for (idx, _) in text.match_indices(separator) {
        pieces.push(text[last..idx].to_string());
        last = idx;
    }
    pieces.push(text[last..].to_string());

    pieces.into_iter().filter(|p| !p.is_empty()).collect()
}

fn join_docs<'a>(parts: impl Iterator<Item = &'a str>) -> Option<String> {
    let joined: String = parts.collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Character offset of `needle` in `haystack`, searching from character
/// offset `from`.
fn find_from(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let byte_from = haystack
        .char_indices()
        .nth(from)
        .map(|(i, _)| i)
        .unwrap_or(haystack.len());
    haystack[byte_from..]
        .find(needle)
        .map(|b| from + haystack[byte_from..byte_from + b].chars().count())
}
