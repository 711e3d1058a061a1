use std::collections::VecDeque;

use crate::config::Config;
use crate::load_pdfs::PageText;
use crate::models::{Chunk, ChunkMetadata};

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Splits every page into overlapping chunks, each tagged with its page's
/// source and page index.
pub fn chunk_pages(pages: &[PageText], cfg: &Config) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for page in pages {
        for text in chunk_text(&page.text, cfg) {
            chunks.push(Chunk {
                text,
                metadata: ChunkMetadata {
                    source: page.source.clone(),
                    page: page.page,
                },
            });
        }
    }
    chunks
}

/// Recursive character splitting: break on paragraphs, then lines, then
/// words, then characters, and merge the pieces back up to `chunk_size`
/// with up to `chunk_overlap` characters shared between neighbours.
pub fn chunk_text(text: &str, cfg: &Config) -> Vec<String> {
    let size = cfg.chunk_size;
    let mut overlap = cfg.chunk_overlap;

    if size == 0 {
        let trimmed = text.trim();
        return if trimmed.is_empty() { vec![] } else { vec![trimmed.to_string()] };
    }
    if overlap >= size {
        overlap = size / 4;
    }

    split_recursive(text, &SEPARATORS, size, overlap)
}

fn split_recursive(text: &str, separators: &[&str], size: usize, overlap: usize) -> Vec<String> {
    let position = separators
        .iter()
        .position(|sep| sep.is_empty() || text.contains(sep))
        .unwrap_or(separators.len() - 1);
    let separator = separators[position];
    let remaining = &separators[position + 1..];

    let pieces: Vec<&str> = if separator.is_empty() {
        text.char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect()
    } else {
        text.split(separator).filter(|s| !s.is_empty()).collect()
    };

    let mut chunks = Vec::new();
    let mut fitting: Vec<&str> = Vec::new();
    for piece in pieces {
        if char_len(piece) < size {
            fitting.push(piece);
            continue;
        }
        if !fitting.is_empty() {
            chunks.extend(merge_pieces(&fitting, separator, size, overlap));
            fitting.clear();
        }
        if remaining.is_empty() {
            let trimmed = piece.trim();
            if !trimmed.is_empty() {
                chunks.push(trimmed.to_string());
            }
        } else {
            chunks.extend(split_recursive(piece, remaining, size, overlap));
        }
    }
    if !fitting.is_empty() {
        chunks.extend(merge_pieces(&fitting, separator, size, overlap));
    }
    chunks
}

fn merge_pieces(pieces: &[&str], separator: &str, size: usize, overlap: usize) -> Vec<String> {
    let sep_len = char_len(separator);
    let mut chunks = Vec::new();
    let mut window: VecDeque<&str> = VecDeque::new();
    let mut total = 0usize;

    for &piece in pieces {
        let len = char_len(piece);
        let joined_sep = if window.is_empty() { 0 } else { sep_len };
        if total + len + joined_sep > size && !window.is_empty() {
            push_joined(&mut chunks, &window, separator);
            // Drop from the front until the kept tail fits inside the overlap
            // and leaves room for the incoming piece.
            while total > overlap
                || (total > 0 && total + len + if window.is_empty() { 0 } else { sep_len } > size)
            {
                let Some(front) = window.pop_front() else { break };
                total -= char_len(front) + if window.is_empty() { 0 } else { sep_len };
            }
        }
        total += len + if window.is_empty() { 0 } else { sep_len };
        window.push_back(piece);
    }
    push_joined(&mut chunks, &window, separator);
    chunks
}

fn push_joined(chunks: &mut Vec<String>, window: &VecDeque<&str>, separator: &str) {
    let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(size: usize, overlap: usize) -> Config {
        Config {
            chunk_size: size,
            chunk_overlap: overlap,
            ..Config::default()
        }
    }

    #[test]
    fn short_text_is_a_single_trimmed_chunk() {
        let chunks = chunk_text("  Reset your password by visiting the portal.\n", &cfg(800, 100));
        assert_eq!(chunks, vec!["Reset your password by visiting the portal."]);
    }

    #[test]
    fn blank_text_yields_nothing() {
        assert!(chunk_text(" \n\n \n", &cfg(800, 100)).is_empty());
    }

    #[test]
    fn long_text_respects_size_and_overlaps_neighbours() {
        let words: Vec<String> = (0..400).map(|i| format!("word{}", i)).collect();
        let text = words.join(" ");
        let chunks = chunk_text(&text, &cfg(100, 30));

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 100, "chunk too long: {}", chunk.len());
        }
        for pair in chunks.windows(2) {
            let last_word = pair[0].split(' ').last().unwrap();
            assert!(
                pair[1].contains(last_word),
                "expected overlap between {:?} and {:?}",
                pair[0],
                pair[1]
            );
        }
        // Nothing is lost: every word lands in some chunk.
        for word in &words {
            assert!(chunks.iter().any(|c| c.split(' ').any(|w| w == word)));
        }
    }

    #[test]
    fn paragraphs_are_preferred_split_points() {
        let para = "a".repeat(60);
        let text = format!("{}\n\n{}\n\n{}", para, para, para);
        let chunks = chunk_text(&text, &cfg(100, 10));
        assert_eq!(chunks, vec![para.clone(), para.clone(), para]);
    }

    #[test]
    fn unbroken_text_falls_back_to_characters() {
        let text = "x".repeat(250);
        let chunks = chunk_text(&text, &cfg(100, 20));
        assert!(chunks.len() >= 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 100));
    }

    #[test]
    fn overlap_not_smaller_than_size_is_clamped() {
        let text = "y".repeat(40);
        let chunks = chunk_text(&text, &cfg(10, 10));
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert!(chunks.len() >= 4);
    }

    #[test]
    fn chunk_pages_tags_every_chunk_with_its_page() {
        let pages = vec![
            PageText { source: "vpn.pdf".into(), page: 0, text: "Connect to the VPN.".into() },
            PageText { source: "vpn.pdf".into(), page: 1, text: "   ".into() },
            PageText { source: "vpn.pdf".into(), page: 2, text: "Restart the client.".into() },
        ];
        let chunks = chunk_pages(&pages, &cfg(800, 100));
        let pages: Vec<u32> = chunks.iter().map(|c| c.metadata.page).collect();
        assert_eq!(pages, vec![0, 2]);
        assert!(chunks.iter().all(|c| c.metadata.source == "vpn.pdf"));
    }
}
