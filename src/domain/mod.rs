pub mod doc_path;
pub mod error;
pub mod fetch;
pub mod fixture;
pub mod report;
