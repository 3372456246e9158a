//! Local-file collaborators.
//!
//! [`FileReadingSource`] reads a JSON capture file, gzip-compressed when the
//! name ends in `.gz`. [`CsvMetadataSource`] reads the hierarchy CSVs from a
//! directory.

mod metadata;
mod readings;

pub use metadata::CsvMetadataSource;
pub use readings::FileReadingSource;
