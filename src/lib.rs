//! Private journaling with on-device AI insights.
//!
//! Tulip keeps one journal entry per day in SQLite and generates reflective
//! insights and actionable suggestions from the most recent entries with a
//! small local language model. Generated results are cached until the
//! journal changes.
//!
//! # Pipeline
//!
//! 1. [`insights::InsightGenerator`] answers from the [`cache`] when it can.
//! 2. Otherwise it reads recent entries from the [`journal`], makes sure the
//!    [`model`] is downloaded and initialized, and streams a completion.
//! 3. [`session::GenerationSession`] feeds the stream through the
//!    [`filter::ThinkTagFilter`] so observers see only visible text, and
//!    tracks the lifecycle flags of the generation.
//!
//! # Modules
//!
//! - [`config`]: configuration from TOML files and environment variables
//! - [`db`]: SQLite initialization, schema and migrations
//! - [`journal`]: journal entries and the entry store
//! - [`cache`]: typed cache of generated results over a key-value store
//! - [`filter`]: streaming removal of `<think>` reasoning blocks
//! - [`model`]: the language model seam, its manager and the local backend
//! - [`insights`]: prompts, generation and result records
//! - [`session`]: observable generation lifecycle

pub mod cache;
pub mod config;
pub mod db;
pub mod filter;
pub mod insights;
pub mod journal;
pub mod model;
pub mod session;
