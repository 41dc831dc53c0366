//! In-process memory stores.
//!
//! [`VectorMemorySystem`] keeps embedded snippets and answers cosine-similarity
//! queries; [`EpisodicMemory`] records what each agent run tried and learned.
//! Both are explicit instances; nothing here is global.

pub mod embeddings;
pub mod episodic;
pub mod vector;

pub use embeddings::{EmbeddingProvider, OpenAiEmbeddings};
pub use episodic::{Episode, EpisodeAction, EpisodicMemory, EpisodicStats, MemoryPatterns};
pub use vector::{cosine_similarity, MemoryEntry, MemoryStats, SearchHit, VectorMemorySystem};
