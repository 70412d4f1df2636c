//! Word-granularity re-chunking of streamed model text.

/// Buffers text deltas and releases them a whole word at a time.
///
/// A released chunk is everything up to and including the first word that is
/// followed by whitespace, plus that whitespace. Whatever is left waits for
/// more text or for [`WordChunker::flush`].
#[derive(Debug, Default)]
pub struct WordChunker {
    buffer: String,
}

impl WordChunker {
    /// Creates an empty chunker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a delta and returns every complete word chunk now available.
    pub fn push(&mut self, delta: &str) -> Vec<String> {
        self.buffer.push_str(delta);
        let mut chunks = Vec::new();
        while let Some(end) = self.next_boundary() {
            chunks.push(self.buffer.drain(..end).collect());
        }
        chunks
    }

    /// Returns the buffered remainder, if any.
    pub fn flush(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buffer))
        }
    }

    /// Byte offset just past the first `word + whitespace` run.
    fn next_boundary(&self) -> Option<usize> {
        let text = self.buffer.as_str();
        let word_start = text.find(|c: char| !c.is_whitespace())?;
        let word_len = text[word_start..].find(char::is_whitespace)?;
        let gap_start = word_start + word_len;
        let gap_len = text[gap_start..]
            .find(|c: char| !c.is_whitespace())
            .unwrap_or(text.len() - gap_start);
        Some(gap_start + gap_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_splits_fragments_at_word_boundaries() {
        // Arrange
        let mut chunker = WordChunker::new();

        // Act
        let first = chunker.push("Once up");
        let second = chunker.push("on a ti");
        let rest = chunker.flush();

        // Assert
        assert_eq!(first, vec!["Once ".to_owned()]);
        assert_eq!(second, vec!["upon ".to_owned(), "a ".to_owned()]);
        assert_eq!(rest.as_deref(), Some("ti"));
    }

    #[test]
    fn test_chunks_reassemble_to_original_text() {
        let mut chunker = WordChunker::new();
        let text = "  Alee  ran\nto the river, then stopped.";

        let mut out: String = text
            .as_bytes()
            .chunks(3)
            .flat_map(|piece| chunker.push(std::str::from_utf8(piece).unwrap()))
            .collect();
        out.push_str(&chunker.flush().unwrap_or_default());

        assert_eq!(out, text);
    }

    #[test]
    fn test_multibyte_text_is_split_on_char_boundaries() {
        let mut chunker = WordChunker::new();

        let chunks = chunker.push("café olé ");

        assert_eq!(chunks, vec!["café ".to_owned(), "olé ".to_owned()]);
        assert_eq!(chunker.flush(), None);
    }
}
