//! Data quality scoring.
//!
//! This module turns the findings of one analysis run into the four
//! sub-scores (completeness, uniqueness, consistency, validity) and a
//! weighted, graded overall score.

mod scorer;

pub use scorer::QualityScorer;
