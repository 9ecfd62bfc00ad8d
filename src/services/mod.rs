pub mod charts;
pub mod cleaner;
pub mod export;
pub mod inference;
pub mod ingest;
pub mod insights;
pub mod pipeline;
pub mod report;
pub mod session;
pub mod statistics;
