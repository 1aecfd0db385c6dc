//! # Data Sweeper
//!
//! Cleans and converts tabular files. Each supplied file is parsed into a
//! typed, column-oriented table, previewed, optionally cleaned, reduced to a
//! selection of columns and exported to a new format.
//!
//! ## Features
//!
//! - **Input formats**: comma-separated text (`.csv`) and Excel workbooks (`.xlsx`, first worksheet)
//! - **Type inference**: Boolean, BigInt, Double, Varchar, Date, Time and Timestamp columns,
//!   including Excel number formats and both workbook date systems
//! - **Cleaning**: removal of duplicate rows and mean-filling of missing numbers
//! - **Column selection**: keep any subset of columns in table order
//! - **Output formats**: `.csv` and `.xlsx`, written entirely in memory
//! - **Independent files**: a failing file is reported and the others carry on
//!
//! ## Example
//!
//! ```
//! use data_sweeper::config::FileOptions;
//! use data_sweeper::pipeline::{process, UploadedFile};
//!
//! let file = UploadedFile::new("data.csv", b"a,b\n1,2\n1,2\n3,\n".to_vec());
//! let options = FileOptions {
//!     remove_duplicates: true,
//!     fill_missing_numeric: true,
//!     ..FileOptions::default()
//! };
//! let report = process(file, &options);
//! let artifact = report.artifact.unwrap();
//! assert_eq!(artifact.filename, "data.csv");
//! assert_eq!(artifact.bytes, b"a,b\n1,2\n3,2\n");
//! ```
pub mod config;
pub mod error;
pub mod export;
mod helpers;
pub mod output;
pub mod pipeline;
pub mod spreadsheet;
pub mod table;

pub use error::SweeperError;
pub use export::ExportArtifact;
pub use export::ExportFormat;
pub use pipeline::process;
pub use pipeline::process_batch;
pub use pipeline::FileContext;
pub use pipeline::UploadedFile;
pub use table::Table;
