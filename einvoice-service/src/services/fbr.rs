//! FBR digital-invoicing client.
//!
//! Builds the authority's JSON document from a sales invoice, performs the
//! single authenticated POST, and writes the outcome back onto the record
//! through the repository. Every persisting exit path replaces the whole
//! integration-result block in one save before the error is signaled to the
//! caller.

use crate::config::{FbrConfig, FbrEndpoint};
use crate::models::{Address, FbrSubmission, Invoice, SubmissionOutcome};
use crate::services::metrics::record_submission;
use crate::services::repository::InvoiceRepository;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Scenario whose line items report the literal `Exempt` rate marker.
const EXEMPT_SCENARIO_ID: &str = "SN006";

/// Sale-type categories the FBR schema forbids an extra-tax figure on,
/// compared after lowercasing and stripping spaces.
const REDUCED_RATE_SALE_TYPES: [&str; 3] = ["goodsatreducedrate", "reducedrate", "rr"];

/// Result of one submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Integration disabled; nothing was sent and the record is untouched.
    Skipped,
    /// FBR accepted the invoice and assigned a number.
    Accepted { invoice_number: String },
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("invalid FBR environment `{0}`, expected `sandbox` or `production`")]
    InvalidEnvironment(String),

    #[error("FBR rejected the invoice: {response}")]
    Rejected { response: String },

    #[error("FBR request failed with HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("FBR request failed: {0}")]
    Transport(String),

    #[error("failed to persist submission result: {0}")]
    Repository(anyhow::Error),
}

/// Extra-tax figure for a line item: either a positive amount or the blank
/// marker the authority's schema expects in its place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExtraTax {
    Empty,
    Amount(f64),
}

impl Serialize for ExtraTax {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ExtraTax::Empty => serializer.serialize_str(""),
            ExtraTax::Amount(value) => serializer.serialize_f64(*value),
        }
    }
}

/// Parse a host scalar as a non-negative number; blank, unparsable, or
/// negative inputs collapse to zero.
pub fn safe_number(value: &Value) -> f64 {
    match parse_number(value) {
        Some(n) if n >= 0.0 => n,
        _ => 0.0,
    }
}

/// Extra-tax figure per the authority's rules: blank for reduced-rate sale
/// types regardless of value, blank for non-positive or unparsable values,
/// otherwise the parsed amount.
pub fn extra_tax_value(value: &Value, sale_type: &str) -> ExtraTax {
    let normalized = sale_type.to_lowercase().replace(' ', "");
    if REDUCED_RATE_SALE_TYPES.contains(&normalized.as_str()) {
        return ExtraTax::Empty;
    }
    match parse_number(value) {
        Some(n) if n > 0.0 => ExtraTax::Amount(n),
        _ => ExtraTax::Empty,
    }
}

fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Invoice document as posted to the FBR DI endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FbrInvoicePayload {
    pub invoice_type: String,
    pub invoice_date: String,
    #[serde(rename = "sellerNTNCNIC")]
    pub seller_ntn_cnic: String,
    pub seller_business_name: String,
    pub seller_address: String,
    pub seller_province: String,
    #[serde(rename = "buyerNTNCNIC")]
    pub buyer_ntn_cnic: String,
    pub buyer_business_name: String,
    pub buyer_address: String,
    pub buyer_province: String,
    pub invoice_ref_no: String,
    pub scenario_id: String,
    pub buyer_registration_type: String,
    pub items: Vec<FbrInvoiceItem>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FbrInvoiceItem {
    pub hs_code: String,
    pub product_description: String,
    pub rate: String,
    #[serde(rename = "uoM")]
    pub uo_m: String,
    pub quantity: f64,
    pub total_values: f64,
    #[serde(rename = "valueSalesExcludingST")]
    pub value_sales_excluding_st: f64,
    pub fixed_notified_value_or_retail_price: f64,
    pub sales_tax_applicable: f64,
    pub sales_tax_withheld_at_source: f64,
    pub extra_tax: ExtraTax,
    pub further_tax: f64,
    pub sro_schedule_no: String,
    pub fed_payable: f64,
    pub discount: f64,
    pub sale_type: String,
    pub sro_item_serial_no: String,
}

/// Response from the FBR DI endpoint. All fields are tolerated absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FbrInvoiceResponse {
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub dated: Option<String>,
    #[serde(default)]
    pub validation_response: Option<FbrValidationResponse>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FbrValidationResponse {
    #[serde(default)]
    pub status_code: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub invoice_statuses: Vec<Value>,
}

/// Build the FBR payload from an invoice record. Pure field mapping plus the
/// normalization rules above.
pub fn build_payload(invoice: &Invoice) -> FbrInvoicePayload {
    let (seller_address, seller_province) = format_address(invoice.company_address.as_ref());
    let (buyer_address, buyer_province) = format_address(invoice.customer_address.as_ref());

    let items = invoice
        .items
        .iter()
        .map(|item| {
            let rate = if invoice.scenario_id == EXEMPT_SCENARIO_ID {
                "Exempt".to_string()
            } else {
                format!("{:.2}%", safe_number(&item.sales_tax_rate))
            };
            FbrInvoiceItem {
                hs_code: item.hs_code.clone(),
                product_description: item.item_name.clone(),
                rate,
                uo_m: item.uom.clone(),
                quantity: safe_number(&item.qty),
                total_values: safe_number(&item.tax_inclusive_amount),
                value_sales_excluding_st: safe_number(&item.net_amount),
                fixed_notified_value_or_retail_price: safe_number(&item.unit_price),
                sales_tax_applicable: safe_number(&item.sales_tax),
                // The DI schema always expects these two as zero in this
                // workflow.
                sales_tax_withheld_at_source: 0.0,
                extra_tax: extra_tax_value(&item.extra_tax, &item.sale_type),
                further_tax: safe_number(&item.further_tax),
                sro_schedule_no: item.sro_schedule_no.clone(),
                fed_payable: 0.0,
                discount: safe_number(&item.discount_amount),
                sale_type: item.sale_type.clone(),
                sro_item_serial_no: item.sro_item_serial_no.clone(),
            }
        })
        .collect();

    FbrInvoicePayload {
        invoice_type: invoice.invoice_type.clone(),
        invoice_date: invoice.posting_date.to_string(),
        seller_ntn_cnic: invoice.company_tax_id.clone(),
        seller_business_name: invoice.company.clone(),
        seller_address,
        seller_province,
        buyer_ntn_cnic: invoice.buyer_tax_id.clone(),
        buyer_business_name: invoice.customer.clone(),
        buyer_address,
        buyer_province,
        invoice_ref_no: invoice.id.clone(),
        scenario_id: invoice.scenario_id.clone(),
        buyer_registration_type: invoice.buyer_registration_type.clone(),
        items,
    }
}

fn format_address(address: Option<&Address>) -> (String, String) {
    match address {
        Some(a) => (format!("{}, {}", a.address_line1, a.city), a.state.clone()),
        None => (String::new(), String::new()),
    }
}

fn parse_submission_time(dated: Option<&str>) -> DateTime<Utc> {
    let Some(raw) = dated else {
        return Utc::now();
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Utc::now();
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.with_timezone(&Utc);
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Utc.from_utc_datetime(&naive);
        }
    }
    Utc::now()
}

/// FBR client for submitting invoices to the DI endpoint.
#[derive(Clone)]
pub struct FbrClient {
    client: reqwest::Client,
    config: FbrConfig,
}

impl FbrClient {
    pub fn new(config: FbrConfig) -> anyhow::Result<Self> {
        // TLS certificate verification is intentionally disabled to match the
        // deployed integration's behavior against the FBR gateways.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self { client, config })
    }

    /// Whether submissions are enabled at all.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn endpoint(&self) -> Result<&FbrEndpoint, SubmitError> {
        match self.config.environment.as_str() {
            "sandbox" => Ok(&self.config.sandbox),
            "production" => Ok(&self.config.production),
            other => Err(SubmitError::InvalidEnvironment(other.to_string())),
        }
    }

    /// Submit one invoice to FBR.
    ///
    /// Exactly one outbound attempt is made. On every outcome past the
    /// disabled/configuration guards the integration-result block is
    /// persisted before this function returns, success and failure alike.
    pub async fn submit(
        &self,
        repository: &dyn InvoiceRepository,
        invoice: &mut Invoice,
    ) -> Result<Submission, SubmitError> {
        if !self.config.enabled {
            tracing::info!(invoice_id = %invoice.id, "FBR integration disabled, skipping submission");
            return Ok(Submission::Skipped);
        }

        let endpoint = self.endpoint()?;
        let environment = self.config.environment.clone();
        let payload = build_payload(invoice);

        tracing::info!(
            invoice_id = %invoice.id,
            environment = %environment,
            url = %endpoint.api_url,
            items = payload.items.len(),
            "Submitting invoice to FBR"
        );

        let response = match self
            .client
            .post(&endpoint.api_url)
            .bearer_auth(endpoint.security_token.expose_secret())
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let text = e.to_string();
                tracing::error!(invoice_id = %invoice.id, error = %text, "FBR request failed to complete");
                self.persist(
                    repository,
                    invoice,
                    &environment,
                    FbrSubmission {
                        response_body: Some(text.clone()),
                        outcome: Some(SubmissionOutcome::Exception),
                        ..Default::default()
                    },
                )
                .await?;
                return Err(SubmitError::Transport(text));
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                let text = format!("failed to read FBR response body: {}", e);
                tracing::error!(invoice_id = %invoice.id, error = %text, "FBR response unreadable");
                self.persist(
                    repository,
                    invoice,
                    &environment,
                    FbrSubmission {
                        response_body: Some(text.clone()),
                        outcome: Some(SubmissionOutcome::Exception),
                        ..Default::default()
                    },
                )
                .await?;
                return Err(SubmitError::Transport(text));
            }
        };

        if !status.is_success() {
            let text = format!("HTTP {}: {}", status.as_u16(), body);
            tracing::error!(invoice_id = %invoice.id, status = %status, "FBR request failed");
            self.persist(
                repository,
                invoice,
                &environment,
                FbrSubmission {
                    response_body: Some(text),
                    outcome: Some(SubmissionOutcome::HttpError),
                    ..Default::default()
                },
            )
            .await?;
            return Err(SubmitError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let raw: Value = match serde_json::from_str(&body) {
            Ok(raw) => raw,
            Err(e) => {
                let text = format!("failed to parse FBR response: {}", e);
                tracing::error!(invoice_id = %invoice.id, error = %text, body = %body, "FBR response is not JSON");
                self.persist(
                    repository,
                    invoice,
                    &environment,
                    FbrSubmission {
                        response_body: Some(text.clone()),
                        outcome: Some(SubmissionOutcome::Exception),
                        ..Default::default()
                    },
                )
                .await?;
                return Err(SubmitError::Transport(text));
            }
        };
        let pretty = serde_json::to_string_pretty(&raw).unwrap_or(body);
        let parsed: FbrInvoiceResponse = serde_json::from_value(raw).unwrap_or_default();
        let validation = parsed.validation_response.unwrap_or_default();

        if validation.status_code.as_deref() == Some("00") {
            let invoice_number = parsed.invoice_number.clone().unwrap_or_default();
            let item_invoice_numbers = validation
                .invoice_statuses
                .iter()
                .filter_map(|status| status.get("invoiceNo").and_then(Value::as_str))
                .filter(|number| !number.is_empty())
                .collect::<Vec<_>>()
                .join(", ");

            let submission = FbrSubmission {
                integration_type: Some(environment.clone()),
                invoice_no: Some(invoice_number.clone()),
                submission_time: Some(parse_submission_time(parsed.dated.as_deref())),
                status: validation.status.clone(),
                status_code: validation.status_code.clone(),
                error: validation.error.clone(),
                item_statuses: serde_json::to_string_pretty(&validation.invoice_statuses).ok(),
                item_invoice_numbers: Some(item_invoice_numbers),
                qr_code: Some(invoice_number.clone()),
                response_body: Some(pretty),
                outcome: Some(SubmissionOutcome::Success),
            };
            self.persist(repository, invoice, &environment, submission).await?;

            tracing::info!(
                invoice_id = %invoice.id,
                fbr_invoice_no = %invoice_number,
                "Invoice accepted by FBR"
            );
            Ok(Submission::Accepted {
                invoice_number,
            })
        } else {
            tracing::warn!(
                invoice_id = %invoice.id,
                status_code = ?validation.status_code,
                "FBR rejected invoice"
            );
            self.persist(
                repository,
                invoice,
                &environment,
                FbrSubmission {
                    response_body: Some(pretty.clone()),
                    outcome: Some(SubmissionOutcome::Error),
                    ..Default::default()
                },
            )
            .await?;
            Err(SubmitError::Rejected { response: pretty })
        }
    }

    async fn persist(
        &self,
        repository: &dyn InvoiceRepository,
        invoice: &mut Invoice,
        environment: &str,
        submission: FbrSubmission,
    ) -> Result<(), SubmitError> {
        let outcome = submission
            .outcome
            .map(|outcome| outcome.as_str())
            .unwrap_or("Unknown");
        invoice.fbr = submission;
        repository
            .update_submission(&invoice.id, &invoice.fbr)
            .await
            .map_err(SubmitError::Repository)?;
        record_submission(environment, outcome);
        Ok(())
    }
}
