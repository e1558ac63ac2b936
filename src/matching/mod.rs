// matching/ — Complementary peer scoring.
//
// A good tutoring pair is one where each student's strengths cover the other's
// weaknesses. Scores come from cosine similarity of sentence embeddings, so
// "Calculus" can cover "Mathematics" without sharing a keyword.

pub mod ranking;
pub mod score;
pub mod similarity;

pub use ranking::{find_best_matches, MatchResult};
