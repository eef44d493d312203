//! Struct archiving functionality
//!
//! To add archiving functionality to a struct implement the `Archived` trait.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use std::fs::{self, File};
use std::path::Path;
use csv::WriterBuilder;
pub use csv::Writer;
use serde::Serialize;
use thiserror::Error;

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files.
#[derive(Default)]
pub struct Archiver {
    writer: Option<Writer<File>>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur while archiving.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Could not create the archive file: {0}")]
    FileError(std::io::Error),

    #[error("Could not write the record: {0}")]
    CsvError(csv::Error),

    #[error("The archiver has not been initialised")]
    NotInitialised
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A trait which enables a struct to be archived as a csv.
///
/// To implement this trait, the struct shall have an `Archiver` member which
/// shall be setup in the struct's `init` or `new` functions. 
pub trait Archived {
    /// Write the archives for this struct
    fn write(&mut self) -> Result<(), ArchiveError>;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create an archiver writing to `path`, relative to the session's archive root.
    ///
    /// Any existing file at that path is truncated. The CSV header is written with the first
    /// record.
    pub fn from_path<P: AsRef<Path>>(session: &Session, path: P) -> Result<Self, ArchiveError> {
        Self::create(&session.arch_root.join(path))
    }

    fn create(full_path: &Path) -> Result<Self, ArchiveError> {
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).map_err(ArchiveError::FileError)?;
        }

        let file = File::create(full_path).map_err(ArchiveError::FileError)?;

        Ok(Self {
            writer: Some(WriterBuilder::new().has_headers(true).from_writer(file)),
        })
    }

    /// Returns true if the archiver has a file to write to.
    pub fn is_init(&self) -> bool {
        self.writer.is_some()
    }

    /// Serialise a record into the archive.
    pub fn serialise<T: Serialize>(
        &mut self, record: T
    ) -> Result<(), ArchiveError> {
        match self.writer {
            Some(ref mut w) => {
                w.serialize(record).map_err(ArchiveError::CsvError)?;
                w.flush().map_err(ArchiveError::FileError)
            },
            None => Err(ArchiveError::NotInitialised)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Serialize)]
    struct Record {
        cycle: u64,
    }

    #[derive(Serialize)]
    struct Status {
        cycle: u64,
        index: Option<usize>,
    }

    #[test]
    fn test_write_records() {
        let path = std::env::temp_dir().join("ctrl_util_archive_test/status.csv");
        let _ = fs::remove_file(&path);

        let mut arch = Archiver::create(&path).unwrap();
        assert!(arch.is_init());
        arch.serialise(Status { cycle: 0, index: Some(3) }).unwrap();
        arch.serialise(Status { cycle: 1, index: None }).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, "cycle,index\n0,3\n1,\n");
    }

    #[test]
    fn test_uninit_archiver() {
        let mut arch = Archiver::default();
        assert!(!arch.is_init());

        match arch.serialise(Record { cycle: 0 }) {
            Err(ArchiveError::NotInitialised) => (),
            _ => panic!("Expected a not initialised error")
        }
    }
}
