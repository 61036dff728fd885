use crate::error::{EngineError, Result};
use async_trait::async_trait;
use svdb_protocol::vector::normalize;

/// One embedded piece of a larger content item.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedChunk {
    pub content: String,
    pub vector: Vec<f32>,
}

/// External embedding provider: splits content into chunks and embeds each.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Length of every vector this embedder returns.
    fn dimension(&self) -> usize;

    async fn embed(&self, content: &str) -> Result<Vec<EmbeddedChunk>>;
}

pub const DEFAULT_STUB_DIMENSION: usize = 64;
const DEFAULT_CHUNK_CHARS: usize = 1000;
const DEFAULT_OVERLAP_CHARS: usize = 200;

/// Deterministic hash-based embedder for tests and offline use.
///
/// Content is split into overlapping character windows; each window maps to a
/// pseudo-random unit vector seeded by its text and position. Equal content
/// gives equal vectors, but there is no semantic similarity between
/// different texts.
#[derive(Debug, Clone)]
pub struct StubEmbedder {
    dimension: usize,
    chunk_chars: usize,
    overlap_chars: usize,
}

impl StubEmbedder {
    #[must_use]
    pub const fn new(dimension: usize) -> Self {
        Self {
            dimension,
            chunk_chars: DEFAULT_CHUNK_CHARS,
            overlap_chars: DEFAULT_OVERLAP_CHARS,
        }
    }

    /// Window size and overlap in characters; `overlap` is capped below `chunk_chars`.
    #[must_use]
    pub fn with_chunking(mut self, chunk_chars: usize, overlap_chars: usize) -> Self {
        self.chunk_chars = chunk_chars.max(1);
        self.overlap_chars = overlap_chars.min(self.chunk_chars - 1);
        self
    }

    #[must_use]
    pub fn chunks(&self, content: &str) -> Vec<String> {
        let chars: Vec<char> = content.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }
        let step = self.chunk_chars - self.overlap_chars;
        let mut chunks = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.chunk_chars).min(chars.len());
            chunks.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += step;
        }
        chunks
    }
}

impl Default for StubEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_STUB_DIMENSION)
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, content: &str) -> Result<Vec<EmbeddedChunk>> {
        if self.dimension == 0 {
            return Err(EngineError::Embedding(
                "stub embedder dimension must be at least 1".to_string(),
            ));
        }
        Ok(self
            .chunks(content)
            .into_iter()
            .enumerate()
            .map(|(position, chunk)| {
                let vector =
                    ChunkStream::new(&chunk, position, self.dimension).unit_vector(self.dimension);
                EmbeddedChunk {
                    content: chunk,
                    vector,
                }
            })
            .collect())
    }
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// Pseudo-random stream keyed by a chunk's text, its position in the
/// content, and the output dimension.
struct ChunkStream {
    state: u64,
}

impl ChunkStream {
    fn new(text: &str, position: usize, dimension: usize) -> Self {
        let text_hash = text
            .bytes()
            .fold(FNV_OFFSET, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME));
        let state = text_hash
            ^ (position as u64).rotate_left(32)
            ^ (dimension as u64).wrapping_mul(GOLDEN_GAMMA);
        Self { state }
    }

    /// Next value in `[-1, 1)`, built from the top 24 bits of a splitmix64 step.
    fn next_signed(&mut self) -> f32 {
        self.state = self.state.wrapping_add(GOLDEN_GAMMA);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;
        #[allow(clippy::cast_precision_loss)]
        let unit = (z >> 40) as f32 / 16_777_216.0;
        unit.mul_add(2.0, -1.0)
    }

    fn unit_vector(mut self, dimension: usize) -> Vec<f32> {
        let mut vector: Vec<f32> = (0..dimension).map(|_| self.next_signed()).collect();
        normalize(&mut vector);
        vector
    }
}
