pub mod invoice;

pub use invoice::{Address, FbrSubmission, Invoice, InvoiceItem, SubmissionOutcome};
