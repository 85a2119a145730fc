//! Backend seams between domain controllers and the clinic REST API.
//!
//! Controllers never construct HTTP clients; they hold `Arc<dyn …Backend>`
//! objects. The `chairside-api` crate provides the production implementation
//! over HTTP, and tests substitute hand-rolled mocks that record calls and
//! queue responses.

use async_trait::async_trait;
use uuid::Uuid;

use chairside_types::Money;

use crate::appointment::{Appointment, StagePatch};
use crate::billing::{
    AppliedDiscount, DraftInvoice, FinalisedInvoice, FinaliseRequest, ItemQuantity, TransferQr,
};

/// Errors surfaced by any backend operation.
///
/// This is the shared taxonomy the controllers match on: validation never
/// reaches a backend, so everything here is either transport, protocol, or a
/// server-side rejection.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The bearer session is no longer valid (401). The session handle has
    /// already been torn down by the time this is returned.
    #[error("session expired")]
    SessionExpired,
    /// The server rejected the operation for a business-rule reason and
    /// supplied a message (invalid discount code, closed appointment, …).
    #[error("{0}")]
    Rejected(String),
    /// The request never completed (DNS, connection, TLS, body read).
    #[error("transport failure: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// A 2xx response body did not match the expected shape.
    #[error("failed to decode server response: {0}")]
    Decode(#[source] serde_json::Error),
    /// A success envelope arrived without its `data` payload.
    #[error("server response was missing its data payload")]
    MissingData,
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Appointment read/write operations used by the visit workflow.
#[async_trait]
pub trait ClinicalBackend: Send + Sync {
    /// Fetches the full appointment snapshot.
    async fn fetch_appointment(&self, id: Uuid) -> BackendResult<Appointment>;

    /// Applies a stage-specific partial update and returns the new snapshot.
    async fn patch_appointment(&self, id: Uuid, patch: &StagePatch) -> BackendResult<Appointment>;
}

/// Result-image storage operations, delegated to the remote file service.
#[async_trait]
pub trait FileBackend: Send + Sync {
    /// Uploads one result image and returns its served URL.
    async fn upload_result_image(
        &self,
        appointment_id: Uuid,
        filename: &str,
        bytes: Vec<u8>,
    ) -> BackendResult<String>;

    /// Deletes a previously uploaded result image.
    async fn delete_result_image(&self, appointment_id: Uuid, url: &str) -> BackendResult<()>;
}

/// Draft-invoice operations used by the billing cart.
#[async_trait]
pub trait BillingBackend: Send + Sync {
    /// Idempotently creates or fetches the draft invoice for an appointment.
    async fn open_draft(&self, appointment_id: Uuid) -> BackendResult<DraftInvoice>;

    /// Replaces the draft's full item list; the server recomputes the total.
    async fn replace_items(
        &self,
        invoice_id: Uuid,
        items: &[ItemQuantity],
    ) -> BackendResult<DraftInvoice>;

    /// Validates a discount code against the current pre-discount total.
    async fn apply_discount(
        &self,
        invoice_id: Uuid,
        code: &str,
        current_total: Money,
    ) -> BackendResult<AppliedDiscount>;

    /// Fetches the transfer-payment QR payload for the draft.
    async fn generate_qr(&self, invoice_id: Uuid) -> BackendResult<TransferQr>;

    /// Finalises payment, destroying the draft.
    async fn finalise(
        &self,
        invoice_id: Uuid,
        request: &FinaliseRequest,
    ) -> BackendResult<FinalisedInvoice>;
}

/// Patient-profile completeness check used by the profile gate.
#[async_trait]
pub trait ProfileBackend: Send + Sync {
    /// Returns whether the signed-in patient's profile is complete.
    async fn profile_complete(&self) -> BackendResult<bool>;
}
