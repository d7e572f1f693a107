//! Text helpers shared by the recommendation pipelines.
//!
//! - [`normalize`] / [`clean_track_name`] turn noisy provider titles into
//!   comparable strings.
//! - [`similarity`] scores two strings with the Dice coefficient over
//!   character bigrams.

mod normalize;
mod similarity;

pub use normalize::{clean_track_name, dedup_key, normalize, session_key};
pub use similarity::similarity;
