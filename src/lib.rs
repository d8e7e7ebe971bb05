//! # Lectern
//!
//! A retrieval-augmented question answering engine for structured course
//! materials.
//!
//! Lectern parses course documents into lessons, chunks lesson text into
//! overlapping sentence-aligned units, indexes them in a two-collection
//! semantic store (course catalog + content chunks), and answers questions
//! through a tool-using conversational model with bounded per-session
//! history.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌───────────────┐
//! │  Documents   │──▶│   Pipeline   │──▶│ SemanticStore │
//! │ (txt corpus) │   │ Parse+Chunk  │   │ catalog+chunks│
//! └──────────────┘   └──────────────┘   └───────┬───────┘
//!                                               │
//!                          ┌────────────────────┤
//!                          ▼                    ▼
//!                   ┌─────────────┐      ┌──────────────┐
//!                   │ SearchTool/ │◀─────│ Conversation │
//!                   │ OutlineTool │      │ Orchestrator │
//!                   └─────────────┘      └──────┬───────┘
//!                                               ▼
//!                                        ┌─────────────┐
//!                                        │     CLI     │
//!                                        │  (lectern)  │
//!                                        └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! lectern ingest                  # parse + chunk + index the corpus
//! lectern courses                 # list indexed course titles
//! lectern ask "What is lesson 1 of the MCP course about?"
//! lectern chat                    # multi-turn session REPL
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Core data types |
//! | [`error`] | Typed error conditions |
//! | [`parser`] | Course document parsing |
//! | [`chunk`] | Sentence-aligned text chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | Nearest-neighbor index abstraction |
//! | [`store`] | Two-collection semantic store |
//! | [`tools`] | Tool trait, registry, and built-in tools |
//! | [`model`] | Conversational model client |
//! | [`orchestrator`] | Bounded tool-use conversation loop |
//! | [`session`] | Per-session exchange history |
//! | [`coordinator`] | Ingest and answer composition |

pub mod chunk;
pub mod config;
pub mod coordinator;
pub mod embedding;
pub mod error;
pub mod index;
pub mod model;
pub mod models;
pub mod orchestrator;
pub mod parser;
pub mod session;
pub mod store;
pub mod tools;
