pub mod batch;
pub mod lexicon;
pub mod normalizer;
pub mod table_reader;
pub mod table_writer;
pub mod types;

pub use batch::{clean_columns, process_job, run_batch};
pub use lexicon::{IdentityLemmatizer, Lemmatize, Stopwords, WordNetLemmatizer};
pub use normalizer::TextNormalizer;
pub use table_reader::read_table;
pub use table_writer::write_records_json;
pub use types::{
    BatchJob, BatchOptions, BatchSummary, CleanError, DEFAULT_COLUMNS, DEFAULT_INPUT_TEMPLATE,
    DEFAULT_OUTPUT_TEMPLATE, Table, TableFormat,
};
