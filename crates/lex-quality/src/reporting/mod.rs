//! Report output.
//!
//! This module renders reports for people and writes reports, cleaning
//! summaries and cleaned tables to disk.
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_quality::reporting::{ReportWriter, render_report};
//!
//! println!("{}", render_report(&report));
//!
//! let writer = ReportWriter::new("outputs");
//! writer.write_json(&report, "train", "_report")?;
//! writer.write_table(&mut cleaned, "train")?;
//! ```

mod summary;
mod writer;

pub use summary::{describe_finding, render_cleaning, render_report};
pub use writer::{ReportWriter, file_stem, read_csv};
