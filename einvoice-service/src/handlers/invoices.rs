//! Invoice registration, readback, and the FBR submission trigger.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    models::{Address, Invoice, InvoiceItem},
    services::Submission,
    utils::qr_png_base64,
    AppState,
};

/// Request to register a working copy of a host invoice.
#[derive(Debug, Deserialize)]
pub struct CreateInvoiceRequest {
    /// Host document name; doubles as the FBR `invoiceRefNo`.
    pub id: String,
    pub invoice_type: String,
    pub posting_date: NaiveDate,
    pub company: String,
    pub company_tax_id: String,
    pub customer: String,
    #[serde(default)]
    pub buyer_tax_id: String,
    pub company_address: Option<Address>,
    pub customer_address: Option<Address>,
    #[serde(default)]
    pub scenario_id: String,
    #[serde(default)]
    pub buyer_registration_type: String,
    #[serde(default)]
    pub items: Vec<InvoiceItem>,
}

/// Uniform result of the submission trigger.
#[derive(Debug, Serialize)]
pub struct SubmitInvoiceResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response of the QR rendering endpoint.
#[derive(Debug, Serialize)]
pub struct InvoiceQrResponse {
    pub qr_payload: String,
    pub qr_image_base64: String,
}

/// Register an invoice copy for later submission.
pub async fn create_invoice(
    State(state): State<AppState>,
    Json(payload): Json<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<Invoice>), AppError> {
    let invoice = Invoice {
        id: payload.id,
        invoice_type: payload.invoice_type,
        posting_date: payload.posting_date,
        company: payload.company,
        company_tax_id: payload.company_tax_id,
        customer: payload.customer,
        buyer_tax_id: payload.buyer_tax_id,
        company_address: payload.company_address,
        customer_address: payload.customer_address,
        scenario_id: payload.scenario_id,
        buyer_registration_type: payload.buyer_registration_type,
        items: payload.items,
        fbr: Default::default(),
    };

    state
        .repository
        .insert(invoice.clone())
        .await
        .map_err(AppError::Conflict)?;

    tracing::info!(
        invoice_id = %invoice.id,
        items = invoice.items.len(),
        "Invoice registered"
    );

    Ok((StatusCode::CREATED, Json(invoice)))
}

/// Read an invoice back, including its integration-result block.
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Invoice>, AppError> {
    let invoice = load_invoice(&state, &id).await?;
    Ok(Json(invoice))
}

/// Submit an invoice to FBR and report a uniform result.
///
/// Every failure the submitter signals is logged with full diagnostic detail
/// and downgraded to `{success: false, error}`; only an unknown invoice id
/// surfaces as an HTTP error, since loading the record precedes the
/// submitter's contract.
pub async fn submit_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SubmitInvoiceResponse>, AppError> {
    let mut invoice = load_invoice(&state, &id).await?;

    match state
        .fbr
        .submit(state.repository.as_ref(), &mut invoice)
        .await
    {
        Ok(Submission::Accepted { invoice_number }) => Ok(Json(SubmitInvoiceResponse {
            success: true,
            invoice_no: Some(invoice_number),
            error: None,
        })),
        Ok(Submission::Skipped) => Ok(Json(SubmitInvoiceResponse {
            success: true,
            invoice_no: invoice.fbr.invoice_no.clone(),
            error: None,
        })),
        Err(e) => {
            tracing::error!(invoice_id = %id, error = %e, "FBR submission failed");
            Ok(Json(SubmitInvoiceResponse {
                success: false,
                invoice_no: None,
                error: Some(e.to_string()),
            }))
        }
    }
}

/// Render the stored FBR invoice number as a printable QR image.
pub async fn invoice_qr(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<InvoiceQrResponse>, AppError> {
    let invoice = load_invoice(&state, &id).await?;

    let payload = invoice
        .fbr
        .qr_code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!(
                "invoice {} has no FBR invoice number recorded",
                id
            ))
        })?;

    let qr_image_base64 = qr_png_base64(&payload).map_err(AppError::InternalError)?;

    Ok(Json(InvoiceQrResponse {
        qr_payload: payload,
        qr_image_base64,
    }))
}

async fn load_invoice(state: &AppState, id: &str) -> Result<Invoice, AppError> {
    state
        .repository
        .get(id)
        .await
        .map_err(AppError::InternalError)?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("invoice {} not found", id)))
}
