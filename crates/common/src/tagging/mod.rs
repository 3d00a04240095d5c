//! Automatic tag extraction for paper descriptions
//!
//! Tags come from a remote chat-completion service when a credential is
//! configured, and from a local keyword heuristic otherwise. Successful
//! remote results are cached by content hash.

pub mod cache;
pub mod client;
pub mod extractor;

pub use cache::{content_key, MemoryTagCache, RedisTagCache, TagCache};
pub use client::{
    create_completion_client, CompletionClient, CompletionError, CompletionRequest,
    OpenAiChatClient,
};
pub use extractor::{
    build_prompt, keyword_tags, parse_tags, FallbackReason, TagExtraction, TagExtractor,
    TagSource, SYSTEM_PROMPT,
};
