pub mod context;
pub mod error;
pub mod loader;
pub mod validator;

pub use context::ImportContext;
pub use error::{ImporterError, Result};
pub use loader::{
    BulkImportSummary, discover_json_files, import_directory, import_file, load_submission,
};
pub use validator::{SubmissionValidator, ValidationReport};
