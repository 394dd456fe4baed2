//! This module splits extracted document text into overlapping, bounded-size
//! chunks suitable for embedding and retrieval.
//!
//! The chunker works on *normalized* text: the input is trimmed, split into
//! tokens on a separator pattern (whitespace by default), and the tokens are
//! rejoined with single spaces. Chunks are then packed greedily from those
//! tokens so that no chunk exceeds the configured maximum size, measured in
//! characters.
//!
//! The module defines three main items:
//! - [`ChunkerConfig`]: maximum chunk size, overlap, and separator pattern.
//! - [`Chunker`]: a validated, reusable splitter built from a config.
//! - [`TextChunk`]: a single chunk along with its position in the normalized text.
//!
//! # Overlap
//!
//! Every chunk after the first starts with the trailing `chunk_overlap`
//! characters of the chunk before it, followed by a space and then the
//! chunk's own tokens. This preserves context that straddles a boundary.
//! When the carried window and the next token do not fit together, the window
//! is shortened from the left; it may disappear entirely.
//!
//! # Oversized tokens
//!
//! A single token longer than `max_chunk_size` is never cut. It is emitted as
//! a chunk of its own, which is the only case where a chunk exceeds the limit.
//!
//! # Example
//!
//! ```
//! use docent_context::text::{Chunker, ChunkerConfig};
//!
//! let chunker = Chunker::new(ChunkerConfig::new(9, 2)).unwrap();
//! let chunks = chunker.chunk("AAAA BBBB CCCC DDDD").unwrap();
//!
//! let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
//! assert_eq!(contents, vec!["AAAA BBBB", "BB CCCC", "CC DDDD"]);
//!
//! // Dropping the carried prefixes gives back the normalized input.
//! let fresh: Vec<&str> = chunks.iter().map(|c| c.fresh_text()).collect();
//! assert_eq!(fresh.join(" "), "AAAA BBBB CCCC DDDD");
//! ```
use regex::Regex;
use serde::Serialize;

/// Default maximum chunk size, in characters.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 250;

/// Default number of characters carried over from one chunk into the next.
pub const DEFAULT_CHUNK_OVERLAP: usize = 30;

/// Default token separator: any run of whitespace.
pub const DEFAULT_SEPARATOR: &str = r"\s+";

/// String used to join tokens back together.
const JOINER: &str = " ";

/// Errors raised while chunking text.
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    /// The input was empty or contained only whitespace.
    #[error("no text to chunk: input is empty after trimming")]
    EmptyInput,

    /// The size/overlap combination cannot produce progress.
    #[error("invalid chunker configuration: {message}")]
    InvalidConfig { message: String },

    /// The separator pattern failed to compile.
    #[error("invalid separator pattern: {source}")]
    InvalidSeparator {
        #[from]
        source: regex::Error,
    },
}

/// Configuration for [`Chunker`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Maximum size of each chunk in characters
    pub max_chunk_size: usize,
    /// Characters of the previous chunk repeated at the start of the next one
    pub chunk_overlap: usize,
    /// Regular expression splitting the text into tokens
    pub separator: String,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }
}

impl ChunkerConfig {
    pub fn new(max_chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            max_chunk_size,
            chunk_overlap,
            ..Self::default()
        }
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Check the size/overlap preconditions.
    pub fn validate(&self) -> Result<(), ChunkError> {
        if self.max_chunk_size == 0 {
            return Err(ChunkError::InvalidConfig {
                message: "max_chunk_size must be greater than zero".to_string(),
            });
        }
        if self.chunk_overlap >= self.max_chunk_size {
            return Err(ChunkError::InvalidConfig {
                message: format!(
                    "chunk_overlap ({}) must be smaller than max_chunk_size ({})",
                    self.chunk_overlap, self.max_chunk_size
                ),
            });
        }
        Ok(())
    }
}

/// A single chunk of normalized document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextChunk {
    /// The sequence number of this chunk within the document (0-indexed).
    pub sequence: usize,
    /// Character offset, in the normalized text, where this chunk's own
    /// (non-carried) content begins.
    pub offset: usize,
    /// Number of leading characters repeated from the previous chunk,
    /// including the joining space. Zero for the first chunk.
    pub carried: usize,
    /// The text content of this chunk.
    pub content: String,
}

impl TextChunk {
    /// The chunk content without the prefix carried over from the previous chunk.
    pub fn fresh_text(&self) -> &str {
        let start = self
            .content
            .char_indices()
            .nth(self.carried)
            .map(|(idx, _)| idx)
            .unwrap_or(self.content.len());
        &self.content[start..]
    }

    /// Length of the chunk in characters.
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Splits document text into overlapping chunks.
///
/// A `Chunker` is cheap to clone and holds no state between calls, so
/// `chunk` is deterministic for identical input.
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
    separator: Regex,
}

impl Chunker {
    /// Creates a chunker after validating the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::InvalidConfig`] when `chunk_overlap >= max_chunk_size`
    /// or the size is zero, and [`ChunkError::InvalidSeparator`] when the
    /// separator pattern is not a valid regular expression.
    pub fn new(config: ChunkerConfig) -> Result<Self, ChunkError> {
        config.validate()?;
        let separator = Regex::new(&config.separator)?;
        Ok(Self { config, separator })
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Normalizes the text: trim, split on the separator, rejoin with single spaces.
    pub fn normalize(&self, text: &str) -> String {
        self.tokens(text).join(JOINER)
    }

    fn tokens<'a>(&self, text: &'a str) -> Vec<&'a str> {
        self.separator
            .split(text.trim())
            .filter(|token| !token.is_empty())
            .collect()
    }

    /// Splits `text` into chunks.
    ///
    /// Tokens are packed greedily up to `max_chunk_size` characters. Each new
    /// chunk re-includes the trailing `chunk_overlap` characters of the
    /// previous one.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::EmptyInput`] if the text is empty after trimming.
    ///
    /// # Examples
    ///
    /// ```
    /// use docent_context::text::{Chunker, ChunkerConfig};
    ///
    /// let chunker = Chunker::new(ChunkerConfig::default()).unwrap();
    /// let chunks = chunker.chunk("  a short document  ").unwrap();
    /// assert_eq!(chunks.len(), 1);
    /// assert_eq!(chunks[0].content, "a short document");
    ///
    /// assert!(chunker.chunk(" \n\t ").is_err());
    /// ```
    pub fn chunk(&self, text: &str) -> Result<Vec<TextChunk>, ChunkError> {
        let tokens = self.tokens(text);
        if tokens.is_empty() {
            return Err(ChunkError::EmptyInput);
        }

        let max = self.config.max_chunk_size;
        let mut chunks: Vec<TextChunk> = Vec::new();
        let mut current: Option<PendingChunk> = None;
        let mut offset = 0;

        for token in tokens {
            let token_len = token.chars().count();
            let token_offset = offset;
            offset += token_len + JOINER.len();

            current = Some(match current.take() {
                Some(mut pending) if pending.len + JOINER.len() + token_len <= max => {
                    pending.push(token, token_len);
                    pending
                }
                Some(pending) => {
                    let tail = overlap_tail(&pending.content, self.config.chunk_overlap)
                        .to_string();
                    chunks.push(pending.finish(chunks.len()));
                    self.start_chunk(&tail, token, token_len, token_offset)
                }
                None => self.start_chunk("", token, token_len, token_offset),
            });
        }

        if let Some(pending) = current {
            chunks.push(pending.finish(chunks.len()));
        }

        Ok(chunks)
    }

    // Starts a chunk with as much of the carried tail as fits beside the token.
    fn start_chunk(
        &self,
        tail: &str,
        token: &str,
        token_len: usize,
        token_offset: usize,
    ) -> PendingChunk {
        let room = self
            .config
            .max_chunk_size
            .saturating_sub(token_len + JOINER.len());
        let tail = shrink_from_left(tail, room);

        if tail.is_empty() {
            return PendingChunk {
                content: token.to_string(),
                len: token_len,
                carried: 0,
                offset: token_offset,
            };
        }

        let tail_len = tail.chars().count();
        PendingChunk {
            content: format!("{tail}{JOINER}{token}"),
            len: tail_len + JOINER.len() + token_len,
            carried: tail_len + JOINER.len(),
            offset: token_offset,
        }
    }
}

struct PendingChunk {
    content: String,
    len: usize,
    carried: usize,
    offset: usize,
}

impl PendingChunk {
    fn push(&mut self, token: &str, token_len: usize) {
        self.content.push_str(JOINER);
        self.content.push_str(token);
        self.len += JOINER.len() + token_len;
    }

    fn finish(self, sequence: usize) -> TextChunk {
        TextChunk {
            sequence,
            offset: self.offset,
            carried: self.carried,
            content: self.content,
        }
    }
}

// The last `overlap` characters of `content`, without leading whitespace.
fn overlap_tail(content: &str, overlap: usize) -> &str {
    shrink_from_left(content, overlap)
}

// Keeps at most `max_chars` trailing characters and trims leading whitespace.
fn shrink_from_left(text: &str, max_chars: usize) -> &str {
    if max_chars == 0 {
        return "";
    }
    let len = text.chars().count();
    let start = if len <= max_chars {
        0
    } else {
        text.char_indices()
            .nth(len - max_chars)
            .map(|(idx, _)| idx)
            .unwrap_or(text.len())
    };
    text[start..].trim_start()
}

/// Chunk `text` with the given size and overlap, returning only the chunk contents.
///
/// ```
/// let chunks = docent_context::chunk("AAAA BBBB CCCC DDDD", 9, 2).unwrap();
/// assert_eq!(chunks, vec!["AAAA BBBB", "BB CCCC", "CC DDDD"]);
/// ```
pub fn chunk(text: &str, max_size: usize, overlap: usize) -> Result<Vec<String>, ChunkError> {
    let chunker = Chunker::new(ChunkerConfig::new(max_size, overlap))?;
    Ok(chunker
        .chunk(text)?
        .into_iter()
        .map(|chunk| chunk.content)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(max: usize, overlap: usize) -> Chunker {
        Chunker::new(ChunkerConfig::new(max, overlap)).unwrap()
    }

    fn reconstruct(chunks: &[TextChunk]) -> String {
        chunks
            .iter()
            .map(|c| c.fresh_text())
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_overlap_example() {
        let chunks = chunker(9, 2).chunk("AAAA BBBB CCCC DDDD").unwrap();
        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["AAAA BBBB", "BB CCCC", "CC DDDD"]);

        assert_eq!(chunks[0].carried, 0);
        assert_eq!(chunks[1].carried, 3);
        assert_eq!(chunks[1].offset, 10);
        assert_eq!(chunks[2].offset, 15);
        assert_eq!(chunks.iter().map(|c| c.sequence).collect::<Vec<_>>(), [0, 1, 2]);
    }

    #[test]
    fn test_default_policy() {
        let text = (0..200)
            .map(|i| format!("word{i}"))
            .collect::<Vec<_>>()
            .join(" ");
        let chunker = Chunker::new(ChunkerConfig::default()).unwrap();
        let chunks = chunker.chunk(&text).unwrap();

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.char_len() <= DEFAULT_MAX_CHUNK_SIZE);
        }
        for pair in chunks.windows(2) {
            let tail = overlap_tail(&pair[0].content, DEFAULT_CHUNK_OVERLAP);
            assert!(pair[1].content.starts_with(tail));
            assert!(tail.chars().count() <= DEFAULT_CHUNK_OVERLAP);
        }
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn test_single_chunk() {
        let chunks = chunker(250, 30).chunk("This is a very short document.").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "This is a very short document.");
        assert_eq!(chunks[0].offset, 0);
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(chunker(250, 30).chunk(""), Err(ChunkError::EmptyInput)));
        assert!(matches!(
            chunker(250, 30).chunk("  \n\t  "),
            Err(ChunkError::EmptyInput)
        ));
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            Chunker::new(ChunkerConfig::new(10, 10)),
            Err(ChunkError::InvalidConfig { .. })
        ));
        assert!(matches!(
            Chunker::new(ChunkerConfig::new(0, 0)),
            Err(ChunkError::InvalidConfig { .. })
        ));
        assert!(matches!(
            Chunker::new(ChunkerConfig::new(10, 2).with_separator("(")),
            Err(ChunkError::InvalidSeparator { .. })
        ));
    }

    #[test]
    fn test_oversized_token_kept_whole() {
        let long = "x".repeat(25);
        let text = format!("aa bb {long} cc dd");
        let chunks = chunker(10, 2).chunk(&text).unwrap();

        let oversized: Vec<&TextChunk> = chunks.iter().filter(|c| c.char_len() > 10).collect();
        assert_eq!(oversized.len(), 1);
        assert_eq!(oversized[0].content, long);
        assert_eq!(oversized[0].carried, 0);
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn test_overlap_shrinks_to_fit() {
        // "BB" cannot be carried in front of an 8-char token with max 9.
        let chunks = chunker(9, 2).chunk("AAAA BBBB CCCCCCCC").unwrap();
        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["AAAA BBBB", "CCCCCCCC"]);
        assert_eq!(chunks[1].carried, 0);

        // A 7-char token leaves room for a single carried character.
        let chunks = chunker(9, 4).chunk("AAAA BBBB CCCCCCC").unwrap();
        assert_eq!(chunks[1].content, "B CCCCCCC");
    }

    #[test]
    fn test_zero_overlap() {
        let chunks = chunker(9, 0).chunk("AAAA BBBB CCCC DDDD").unwrap();
        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["AAAA BBBB", "CCCC DDDD"]);
    }

    #[test]
    fn test_whitespace_is_normalized() {
        let chunker = chunker(250, 30);
        let chunks = chunker.chunk("  first line\n\nsecond\tline   end ").unwrap();
        assert_eq!(chunks[0].content, "first line second line end");
        assert_eq!(
            chunker.normalize("  first line\n\nsecond\tline   end "),
            "first line second line end"
        );
    }

    #[test]
    fn test_multibyte_characters_counted_as_chars() {
        let text = "héllo wörld ünïcode ñañaña";
        let chunks = chunker(12, 3).chunk(text).unwrap();
        for chunk in &chunks {
            assert!(chunk.char_len() <= 12, "chunk too long: {:?}", chunk.content);
        }
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn test_deterministic() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(40);
        let chunker = chunker(80, 15);
        assert_eq!(chunker.chunk(&text).unwrap(), chunker.chunk(&text).unwrap());
    }

    #[test]
    fn test_free_function() {
        assert_eq!(
            chunk("AAAA BBBB CCCC DDDD", 9, 2).unwrap(),
            vec!["AAAA BBBB", "BB CCCC", "CC DDDD"]
        );
        assert!(chunk("a b", 5, 5).is_err());
    }
}
