//! # SVDB Search
//!
//! Interchangeable ranking strategies over a [`Corpus`].
//!
//! | Strategy          | Candidates                                    | Ranking        |
//! |-------------------|-----------------------------------------------|----------------|
//! | [`ExactSearch`]     | every item                                    | exact cosine   |
//! | [`AmplifiedSearch`] | items whose best similarity exceeds `τ`       | exact cosine   |
//! | [`BucketSearch`]    | items in the `max_buckets` nearest buckets    | exact cosine   |
//!
//! All strategies break ties by insertion order.

mod amplified;
mod bucketed;
mod corpus;
mod error;
mod strategy;

pub use amplified::{
    amplification_rounds, success_probability, AmplifiedSearch, SearchStats, DEFAULT_THRESHOLD,
};
pub use bucketed::BucketSearch;
pub use corpus::Corpus;
pub use error::{Result, SearchError};
pub use strategy::{strategy_for, ExactSearch, Query, SearchStrategy, StrategyKind};
