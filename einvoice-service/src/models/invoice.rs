//! Invoice model for einvoice-service.
//!
//! These structs carry exactly the field set the FBR integration reads from
//! a host sales invoice, plus the integration-result block it writes back.
//! The host ERP remains the owner of the record; this service works on a
//! registered copy.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sales invoice copy registered by the host system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    /// Host document name; doubles as the FBR `invoiceRefNo`.
    pub id: String,
    pub invoice_type: String,
    pub posting_date: NaiveDate,
    /// Seller business name.
    pub company: String,
    /// Seller NTN/CNIC.
    pub company_tax_id: String,
    /// Buyer business name.
    pub customer: String,
    /// Buyer NTN/CNIC.
    #[serde(default)]
    pub buyer_tax_id: String,
    pub company_address: Option<Address>,
    pub customer_address: Option<Address>,
    /// FBR scenario classification; `SN006` switches rate formatting to the
    /// literal `Exempt` marker.
    #[serde(default)]
    pub scenario_id: String,
    /// FBR taxpayer category, e.g. `Registered` or `Unregistered`.
    #[serde(default)]
    pub buyer_registration_type: String,
    pub items: Vec<InvoiceItem>,
    /// Integration-result block, replaced wholesale on every submission
    /// attempt.
    #[serde(default)]
    pub fbr: FbrSubmission,
}

/// Postal address of a transaction party.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    pub address_line1: String,
    pub city: String,
    pub state: String,
}

/// Invoice line item.
///
/// The rate, quantity, and monetary inputs come from user-editable host
/// custom fields and arrive as free-form JSON scalars (number, numeric
/// string, blank, null). They are normalized once, during payload assembly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceItem {
    pub item_name: String,
    pub hs_code: String,
    /// FBR unit-of-measure label.
    pub uom: String,
    pub sale_type: String,
    pub sro_schedule_no: String,
    pub sro_item_serial_no: String,
    pub qty: Value,
    /// Unit price; maps to `fixedNotifiedValueOrRetailPrice`.
    pub unit_price: Value,
    /// Line amount excluding sales tax; maps to `valueSalesExcludingST`.
    pub net_amount: Value,
    /// Line amount including sales tax; maps to `totalValues`.
    pub tax_inclusive_amount: Value,
    pub sales_tax: Value,
    /// Sales tax percentage used for the formatted `rate` field.
    pub sales_tax_rate: Value,
    pub extra_tax: Value,
    pub further_tax: Value,
    pub discount_amount: Value,
}

/// Integration-result block written back onto the invoice record.
///
/// All fields are persisted in a single repository save so the record always
/// reflects exactly one attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FbrSubmission {
    /// Environment label (`sandbox`/`production`) the invoice was accepted
    /// under.
    pub integration_type: Option<String>,
    /// Invoice number assigned by FBR.
    pub invoice_no: Option<String>,
    pub submission_time: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub status_code: Option<String>,
    pub error: Option<String>,
    /// Per-item validation statuses, serialized as returned by FBR.
    pub item_statuses: Option<String>,
    /// Comma-joined per-item invoice numbers.
    pub item_invoice_numbers: Option<String>,
    /// QR payload for the printed invoice; mirrors `invoice_no`.
    pub qr_code: Option<String>,
    /// Raw response body, or the error text on transport failures.
    pub response_body: Option<String>,
    pub outcome: Option<SubmissionOutcome>,
}

/// Outcome label of the last submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionOutcome {
    Success,
    Error,
    #[serde(rename = "HTTPError")]
    HttpError,
    Exception,
}

impl SubmissionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionOutcome::Success => "Success",
            SubmissionOutcome::Error => "Error",
            SubmissionOutcome::HttpError => "HTTPError",
            SubmissionOutcome::Exception => "Exception",
        }
    }
}
