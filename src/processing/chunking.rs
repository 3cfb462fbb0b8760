//! Word-window chunking.
//!
//! Text is tokenized on whitespace and cut into windows of `window` words. Consecutive
//! windows share `overlap` words so spans around a boundary stay retrievable from either
//! side. Windowed fragments under [`MIN_CHUNK_WORDS`] are dropped; a text that fits in one
//! window is returned whole.

use super::types::ChunkingError;

/// Default words per chunk.
pub const DEFAULT_CHUNK_WORDS: usize = 500;
/// Default words repeated between consecutive chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;
/// Windowed chunks with fewer words than this are discarded.
pub const MIN_CHUNK_WORDS: usize = 20;

/// Validated window/overlap pair used by the ingestion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingPolicy {
    window: usize,
    overlap: usize,
}

impl ChunkingPolicy {
    /// Build a policy, rejecting a zero window or an overlap that would stall the window.
    pub fn new(window: usize, overlap: usize) -> Result<Self, ChunkingError> {
        if window == 0 {
            return Err(ChunkingError::InvalidChunkSize);
        }
        if overlap >= window {
            return Err(ChunkingError::OverlapTooLarge { window, overlap });
        }
        Ok(Self { window, overlap })
    }

    /// Words per chunk.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Words shared by consecutive chunks.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` according to this policy.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        chunk_words(text, self.window, self.overlap)
    }
}

impl Default for ChunkingPolicy {
    fn default() -> Self {
        Self {
            window: DEFAULT_CHUNK_WORDS,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Split `text` into overlapping word windows.
///
/// Callers must pass `overlap < window`; [`ChunkingPolicy::new`] enforces this. Out-of-range
/// values are clamped so the window always advances.
pub fn chunk_words(text: &str, window: usize, overlap: usize) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let words: Vec<&str> = trimmed.split_whitespace().collect();
    let window = window.max(1);
    if words.len() <= window {
        return vec![trimmed.to_string()];
    }

    let step = window.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + window).min(words.len());
        let span = &words[start..end];
        if span.len() >= MIN_CHUNK_WORDS {
            chunks.push(span.join(" "));
        }
        if end == words.len() {
            break;
        }
        start += step;
    }

    chunks
}

/// Whitespace word count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_words(count: usize) -> String {
        (0..count)
            .map(|idx| format!("w{idx}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn twelve_hundred_words_yield_three_windows() {
        let text = "word ".repeat(1200);
        let chunks = chunk_words(&text, 500, 50);
        let sizes: Vec<usize> = chunks.iter().map(|chunk| word_count(chunk)).collect();
        assert_eq!(sizes, vec![500, 500, 300]);
        assert!(sizes.iter().all(|size| *size >= MIN_CHUNK_WORDS));
    }

    #[test]
    fn consecutive_chunks_overlap_by_exactly_the_configured_words() {
        let text = numbered_words(1337);
        let chunks = chunk_words(&text, 100, 30);
        assert!(chunks.len() > 2);

        for pair in chunks.windows(2) {
            let left: Vec<&str> = pair[0].split_whitespace().collect();
            let right: Vec<&str> = pair[1].split_whitespace().collect();
            assert_eq!(left.len(), 100);
            assert_eq!(&left[left.len() - 30..], &right[..30]);
        }

        let last = chunks.last().expect("last chunk");
        assert!(last.ends_with("w1336"));
    }

    #[test]
    fn short_text_returns_whole_trimmed_input() {
        let chunks = chunk_words("  just a few\nwords here  ", 500, 50);
        assert_eq!(chunks, vec!["just a few\nwords here".to_string()]);
    }

    #[test]
    fn text_of_exactly_one_window_is_a_single_chunk() {
        let text = numbered_words(500);
        let chunks = chunk_words(&text, 500, 50);
        assert_eq!(chunks.len(), 1);
        assert_eq!(word_count(&chunks[0]), 500);
    }

    #[test]
    fn blank_input_yields_no_chunks() {
        assert!(chunk_words("", 500, 50).is_empty());
        assert!(chunk_words(" \n\t ", 500, 50).is_empty());
    }

    #[test]
    fn undersized_trailing_window_is_dropped() {
        // Windows start at 0 and 90; the second covers 15 words.
        let text = numbered_words(105);
        let chunks = chunk_words(&text, 100, 10);
        assert_eq!(chunks.len(), 1);
        assert_eq!(word_count(&chunks[0]), 100);
    }

    #[test]
    fn trailing_window_of_exactly_twenty_words_is_kept() {
        let text = numbered_words(110);
        let chunks = chunk_words(&text, 100, 10);
        let sizes: Vec<usize> = chunks.iter().map(|chunk| word_count(chunk)).collect();
        assert_eq!(sizes, vec![100, 20]);
    }

    #[test]
    fn policy_rejects_degenerate_configuration() {
        assert!(matches!(
            ChunkingPolicy::new(0, 0),
            Err(ChunkingError::InvalidChunkSize)
        ));
        assert!(matches!(
            ChunkingPolicy::new(50, 50),
            Err(ChunkingError::OverlapTooLarge { .. })
        ));
        let policy = ChunkingPolicy::new(200, 20).expect("valid policy");
        assert_eq!((policy.window(), policy.overlap()), (200, 20));
        assert_eq!(ChunkingPolicy::default().window(), DEFAULT_CHUNK_WORDS);
    }
}
