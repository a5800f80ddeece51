//! Boundary-preferring text chunker.
//!
//! Splits a recipe's text into [`Chunk`]s of at most `max_chars`
//! characters with no overlap between neighbours.
//!
//! # Algorithm
//!
//! 1. If the text fits, it is one piece.
//! 2. Otherwise split it on the strongest separator present, in order:
//!    paragraph (`\n\n`), line (`\n`), sentence (`. `, `! `, `? `),
//!    word (` `). Each
//!    separator stays attached to the piece before it, so pieces tile the
//!    original text exactly.
//! 3. Pieces that still exceed `max_chars` are split again with the next
//!    separator; when none is left they are hard-cut every `max_chars`
//!    characters (always on a UTF-8 char boundary).
//! 4. Adjacent pieces are merged greedily while the merged run stays within
//!    `max_chars`.
//! 5. Each run is trimmed; whitespace-only runs are dropped.
//!
//! Lengths are counted in `char`s, not bytes, so Turkish letters count as
//! one each.
//!
//! # Example
//!
//! ```rust
//! use recipe_agent::chunk::chunk_text;
//!
//! let chunks = chunk_text("corba.txt", "Mercimek çorbası.\n\nAfiyet olsun.", 1000);
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].chunk_index, 0);
//! ```

use sha2::{Digest, Sha256};

use crate::models::Chunk;

/// Break points, strongest first. Separators in one group rank equally.
const SEPARATORS: &[&[&str]] = &[&["\n\n"], &["\n"], &[". ", "! ", "? "], &[" "]];

/// Split text into chunks of at most `max_chars` characters.
///
/// Returns chunks with contiguous indices starting at 0. Whitespace-only
/// text yields no chunks. Output depends only on the inputs, so rebuilding
/// over unchanged files reproduces the same ids, texts and hashes.
pub fn chunk_text(document_path: &str, text: &str, max_chars: usize) -> Vec<Chunk> {
    let max_chars = max_chars.max(1);

    let mut pieces = Vec::new();
    split_ranges(text, 0, max_chars, 0, &mut pieces);

    let mut runs: Vec<(usize, usize)> = Vec::new();
    let mut current: Option<(usize, usize, usize)> = None;

    for (start, end) in pieces {
        let len = text[start..end].chars().count();
        current = match current {
            Some((run_start, _, run_len)) if run_len + len <= max_chars => {
                Some((run_start, end, run_len + len))
            }
            Some((run_start, run_end, _)) => {
                runs.push((run_start, run_end));
                Some((start, end, len))
            }
            None => Some((start, end, len)),
        };
    }
    if let Some((run_start, run_end, _)) = current {
        runs.push((run_start, run_end));
    }

    runs.into_iter()
        .map(|(start, end)| text[start..end].trim())
        .filter(|piece| !piece.is_empty())
        .enumerate()
        .map(|(index, piece)| make_chunk(document_path, index as i64, piece))
        .collect()
}

/// Recursively split `text` (which starts at byte `offset` of the original)
/// into byte ranges that each fit in `max_chars`.
fn split_ranges(
    text: &str,
    offset: usize,
    max_chars: usize,
    level: usize,
    out: &mut Vec<(usize, usize)>,
) {
    if text.is_empty() {
        return;
    }
    if text.chars().count() <= max_chars {
        out.push((offset, offset + text.len()));
        return;
    }

    match SEPARATORS.get(level) {
        Some(group) => {
            let mut start = 0;
            for piece in split_after_any(text, group) {
                split_ranges(piece, offset + start, max_chars, level + 1, out);
                start += piece.len();
            }
        }
        None => hard_cut(text, offset, max_chars, out),
    }
}

/// Split after each occurrence of any separator in `group`, keeping the
/// separator on the preceding piece.
fn split_after_any<'a>(text: &'a str, group: &[&str]) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    while let Some((pos, len)) = group
        .iter()
        .filter_map(|sep| text[start..].find(sep).map(|pos| (pos, sep.len())))
        .min_by_key(|(pos, _)| *pos)
    {
        let end = start + pos + len;
        pieces.push(&text[start..end]);
        start = end;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

/// Cut every `max_chars` characters, on char boundaries.
fn hard_cut(text: &str, offset: usize, max_chars: usize, out: &mut Vec<(usize, usize)>) {
    let mut start = 0;
    let mut count = 0;
    for (i, _) in text.char_indices() {
        if count == max_chars {
            out.push((offset + start, offset + i));
            start = i;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        out.push((offset + start, offset + text.len()));
    }
}

/// Create a single [`Chunk`] with a path-derived id and SHA-256 content hash.
fn make_chunk(document_path: &str, index: i64, text: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    let mut id_hasher = Sha256::new();
    id_hasher.update(document_path.as_bytes());
    id_hasher.update([0u8]);
    id_hasher.update(index.to_le_bytes());
    let id = format!("{:x}", id_hasher.finalize())[..32].to_string();

    Chunk {
        id,
        document_path: document_path.to_string(),
        chunk_index: index,
        text: text.to_string(),
        hash,
    }
}
