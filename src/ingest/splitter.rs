use std::collections::VecDeque;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Split points tried in order, tuned for the syllabus layout: unit
/// headings first, then course headings, paragraphs, lines, words, and
/// finally single characters.
pub const SYLLABUS_SEPARATORS: [&str; 6] = ["\nUNIT ", "\nCourse Title", "\n\n", "\n", " ", ""];

/// Recursive character splitter.
///
/// Text is cut at the highest-priority separator it contains; pieces that
/// are still longer than `chunk_size` are cut again with the remaining
/// separators. Short neighbouring pieces are then merged back up to
/// `chunk_size`, and each new chunk starts with up to `chunk_overlap`
/// characters carried over from the end of the previous one. Sizes are in
/// characters.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self::with_separators(chunk_size, chunk_overlap, &SYLLABUS_SEPARATORS)
    }

    pub fn with_separators(chunk_size: usize, chunk_overlap: usize, separators: &[&str]) -> Self {
        assert!(chunk_size > 0, "chunk_size must be positive");
        assert!(
            chunk_overlap < chunk_size,
            "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
        );
        Self {
            chunk_size,
            chunk_overlap,
            separators: separators.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Splits `text` into trimmed, non-empty chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_with(text, &self.separators)
    }

    fn split_with(&self, text: &str, separators: &[String]) -> Vec<String> {
        // Pick the first separator present in the text; "" always matches.
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut remaining: &[String] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate.as_str();
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut short_pieces: Vec<&str> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                short_pieces.push(piece);
                continue;
            }
            if !short_pieces.is_empty() {
                chunks.extend(self.merge(&short_pieces));
                short_pieces.clear();
            }
            if remaining.is_empty() {
                if let Some(trimmed) = non_blank(piece) {
                    chunks.push(trimmed);
                }
            } else {
                chunks.extend(self.split_with(piece, remaining));
            }
        }
        if !short_pieces.is_empty() {
            chunks.extend(self.merge(&short_pieces));
        }
        chunks
    }

    /// Greedily packs consecutive pieces into chunks of at most
    /// `chunk_size` characters. Separators are already part of the pieces.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                if let Some(chunk) = non_blank(&window.iter().copied().collect::<String>()) {
                    chunks.push(chunk);
                }
                // Keep at most `chunk_overlap` characters, and leave room for
                // the incoming piece.
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some(dropped) => total -= char_len(dropped),
                        None => break,
                    }
                }
            }
            window.push_back(piece);
            total += len;
        }

        if let Some(chunk) = non_blank(&window.iter().copied().collect::<String>()) {
            chunks.push(chunk);
        }
        chunks
    }
}

/// Splits before every occurrence of `separator`, so each piece after the
/// first starts with the separator. An empty separator splits into
/// characters. Empty pieces are dropped.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (at, _) in text.match_indices(separator) {
        if at > start {
            pieces.push(&text[start..at]);
        }
        start = at;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_a_single_trimmed_chunk() {
        let splitter = TextSplitter::default();
        assert_eq!(
            splitter.split("  Course Title: Machine Learning  \n"),
            vec!["Course Title: Machine Learning"]
        );
    }

    #[test]
    fn blank_text_yields_nothing() {
        let splitter = TextSplitter::default();
        assert!(splitter.split("").is_empty());
        assert!(splitter.split(" \n\n \t").is_empty());
    }

    #[test]
    fn separator_stays_with_the_following_piece() {
        assert_eq!(
            split_keeping_separator("intro\nUNIT 1 sets\nUNIT 2 graphs", "\nUNIT "),
            vec!["intro", "\nUNIT 1 sets", "\nUNIT 2 graphs"]
        );
        assert_eq!(split_keeping_separator("\nUNIT 1", "\nUNIT "), vec!["\nUNIT 1"]);
        assert_eq!(split_keeping_separator("añb", ""), vec!["a", "ñ", "b"]);
    }

    #[test]
    fn units_become_separate_chunks_when_they_do_not_fit_together() {
        let unit = |n: usize| format!("\nUNIT {n} {}", "x".repeat(40));
        let text = format!("{}{}{}", unit(1), unit(2), unit(3));
        let splitter = TextSplitter::with_separators(60, 0, &SYLLABUS_SEPARATORS);

        let chunks = splitter.split(&text);

        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].starts_with("UNIT 1"));
        assert!(chunks[1].starts_with("UNIT 2"));
        assert!(chunks[2].starts_with("UNIT 3"));
    }

    #[test]
    fn chunks_respect_the_size_limit() {
        let text = "word ".repeat(1000);
        let splitter = TextSplitter::new(100, 20);

        let chunks = splitter.split(&text);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 100));
    }

    #[test]
    fn consecutive_chunks_overlap() {
        let text = (0..60).map(|i| format!("w{i:02}")).collect::<Vec<_>>().join(" ");
        let splitter = TextSplitter::new(40, 12);

        let chunks = splitter.split(&text);

        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let last_word = pair[0].split(' ').last().unwrap();
            assert!(
                pair[1].contains(last_word),
                "{:?} should repeat the tail of {:?}",
                pair[1],
                pair[0]
            );
        }
    }

    #[test]
    fn unbroken_text_falls_back_to_characters() {
        let text = "a".repeat(250);
        let splitter = TextSplitter::new(100, 0);

        let chunks = splitter.split(&text);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.iter().map(|c| c.len()).sum::<usize>(), 250);
    }

    #[test]
    #[should_panic]
    fn overlap_must_be_smaller_than_chunk_size() {
        TextSplitter::new(100, 100);
    }
}
