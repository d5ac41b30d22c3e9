pub mod aggregate;
pub mod config;
pub mod errors;
pub mod export;
pub mod fingerprint;
pub mod ingest;
pub mod model;
pub mod normalize;
pub mod storage;

pub use aggregate::{aggregate, AggregateOptions, AggregateReport};
pub use ingest::{IngestReceipt, Ingestor};
pub use model::{EvalRecord, EvalRun, SchemaKind};
pub use storage::{open_store, RecordStore};
