use crate::models::{FbrSubmission, Invoice};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Storage boundary for invoice records.
///
/// The host ERP owns canonical invoice storage; this service works on copies
/// registered through the API. `update_submission` replaces the whole
/// integration-result block in one call, so a record never carries a partial
/// mix of attempts.
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    async fn insert(&self, invoice: Invoice) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<Invoice>>;

    async fn update_submission(&self, id: &str, submission: &FbrSubmission) -> Result<()>;
}

#[derive(Clone, Default)]
pub struct InMemoryInvoiceRepository {
    invoices: Arc<RwLock<HashMap<String, Invoice>>>,
}

impl InMemoryInvoiceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InvoiceRepository for InMemoryInvoiceRepository {
    async fn insert(&self, invoice: Invoice) -> Result<()> {
        let mut invoices = self.invoices.write().await;
        if invoices.contains_key(&invoice.id) {
            bail!("invoice {} is already registered", invoice.id);
        }
        invoices.insert(invoice.id.clone(), invoice);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Invoice>> {
        Ok(self.invoices.read().await.get(id).cloned())
    }

    async fn update_submission(&self, id: &str, submission: &FbrSubmission) -> Result<()> {
        let mut invoices = self.invoices.write().await;
        match invoices.get_mut(id) {
            Some(invoice) => {
                invoice.fbr = submission.clone();
                Ok(())
            }
            None => bail!("invoice {} is not registered", id),
        }
    }
}
