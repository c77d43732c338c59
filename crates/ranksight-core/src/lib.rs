//! # Ranksight Core
//!
//! Platform-independent library for evaluating project search: retrieval
//! scoring, reciprocal rank fusion, and pairwise LLM judging.
//!
//! This crate provides the algorithms and traits used by the `ranksight` CLI.
//! Search backends and chat models plug in through the [`search::SearchChannel`]
//! and [`judge::ChatModel`] traits, so everything here runs without a network.
//!
//! ## Modules
//!
//! - [`search`] - Search channels, hybrid retrieval and RRF fusion
//! - [`evaluation`] - MRR / Hit@K scoring, aggregation and bootstrap statistics
//! - [`judge`] - Pairwise judge trait, prompt building and the tournament
//! - [`preference`] - Win-rate preference scores from judgments
//! - [`pipeline`] - Resumable retrieval, judging and preference runs
//! - [`storage`] - Evaluation store trait with in-memory and redb backends
//! - [`config`] - Evaluation constants
//! - [`error`] - Error types for judging and pipeline runs

pub mod config;
pub mod error;
pub mod evaluation;
pub mod judge;
pub mod pipeline;
pub mod preference;
pub mod search;
pub mod storage;

#[cfg(test)]
mod test_utils;
