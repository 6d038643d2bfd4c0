//! Exchange-document extraction and CSV output.
//!
//! The extractor walks the download directory for XML files, parses each
//! into an in-memory tree, pulls every `exchange-document` out, and appends
//! one normalized row per document to the output CSV under a single writer
//! mutex. File-level parallelism is bounded by `parse.workers`.

mod error;
mod extractor;
mod record;
mod writer;
mod xml;

pub use error::{ParseError, Result};
pub use extractor::{Extractor, ParseOptions, ParseStats};
pub use record::{
    Citation, CsvRow, DocId, ExchangeDocument, FamilyMember, PatentClassification,
    PublicationReference,
};
pub use writer::RowWriter;
pub use xml::extract_documents;
