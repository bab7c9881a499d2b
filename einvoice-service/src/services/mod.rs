pub mod fbr;
pub mod metrics;
pub mod repository;

pub use fbr::{FbrClient, Submission, SubmitError};
pub use metrics::get_metrics;
pub use repository::{InMemoryInvoiceRepository, InvoiceRepository};
