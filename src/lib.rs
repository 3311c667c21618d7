//! Better Bible: age-tiered study material for Bible verses.
//!
//! A verse and an age tier go in; a paraphrase, story, prayer, activities
//! and key points come out. Results are produced by an LLM provider, repaired
//! into a fixed schema and cached per (verse, tier).

pub mod api;
pub mod cache;
pub mod config;
pub mod content;
pub mod error;
pub mod health;
pub mod images;
pub mod providers;
pub mod subscription;

pub use cache::{ContentStore, MemoryStore, PostgresStore};
pub use config::Config;
pub use content::{AgeGroup, CacheKey, ContentGenerator, GeneratedContent, Generation};
pub use error::{BibleError, Result};
pub use providers::{GeminiProvider, LLMProvider};
