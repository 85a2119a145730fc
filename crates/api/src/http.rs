//! HTTP implementation of the backend seams.
//!
//! One [`HttpBackend`] serves all four `chairside-core` backend traits over
//! the clinic REST API. Requests carry the bearer token from the shared
//! session handle; a 401 from any endpoint tears the session down before the
//! error is returned, so the caller never retries against dead credentials.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use chairside_core::appointment::{Appointment, StagePatch};
use chairside_core::backend::{
    BackendError, BackendResult, BillingBackend, ClinicalBackend, FileBackend, ProfileBackend,
};
use chairside_core::billing::{
    AppliedDiscount, DraftInvoice, FinalisedInvoice, FinaliseRequest, ItemQuantity, TransferQr,
};
use chairside_types::Money;

use crate::config::ApiConfig;
use crate::envelope::Envelope;
use crate::session::SessionHandle;

/// Backend implementation over the clinic REST API.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    config: ApiConfig,
    session: SessionHandle,
}

impl HttpBackend {
    pub fn new(config: ApiConfig, session: SessionHandle) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            session,
        }
    }

    async fn authorised(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.session.bearer_token().await {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Sends a request and decodes the enveloped payload.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> BackendResult<T> {
        let envelope = self.execute_envelope(request).await?;
        envelope.into_data()
    }

    /// Sends a request whose payload does not matter.
    async fn execute_unit(&self, request: reqwest::RequestBuilder) -> BackendResult<()> {
        let envelope: Envelope<serde_json::Value> = self.execute_envelope(request).await?;
        envelope.into_unit()
    }

    async fn execute_envelope<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> BackendResult<Envelope<T>> {
        let request = self.authorised(request).await;
        let response = request.send().await.map_err(transport)?;
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.session.expire().await;
            return Err(BackendError::SessionExpired);
        }

        let bytes = response.bytes().await.map_err(transport)?;

        if !status.is_success() {
            // Prefer the server's own message when the error body is an
            // envelope; otherwise report the bare status.
            let message = serde_json::from_slice::<Envelope<serde_json::Value>>(&bytes)
                .ok()
                .and_then(|envelope| envelope.message)
                .unwrap_or_else(|| format!("request failed with status {status}"));
            tracing::warn!(%status, %message, "clinic API rejected a request");
            return Err(BackendError::Rejected(message));
        }

        serde_json::from_slice(&bytes).map_err(BackendError::Decode)
    }
}

fn transport(error: reqwest::Error) -> BackendError {
    BackendError::Transport(Box::new(error))
}

// ============================================================================
// Request/response wire types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateInvoiceBody {
    appointment_id: Uuid,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplaceItemsBody<'a> {
    items: &'a [ItemQuantity],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApplyDiscountBody<'a> {
    code: &'a str,
    current_total: Money,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteImageBody<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadedImage {
    url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompletionStatus {
    complete: bool,
}

// ============================================================================
// Trait implementations
// ============================================================================

#[async_trait]
impl ClinicalBackend for HttpBackend {
    async fn fetch_appointment(&self, id: Uuid) -> BackendResult<Appointment> {
        let url = self.config.endpoint(&format!("doctor/appointments/{id}"));
        self.execute(self.client.get(url)).await
    }

    async fn patch_appointment(&self, id: Uuid, patch: &StagePatch) -> BackendResult<Appointment> {
        let url = self.config.endpoint(&format!("doctor/appointments/{id}"));
        self.execute(self.client.patch(url).json(patch)).await
    }
}

#[async_trait]
impl FileBackend for HttpBackend {
    async fn upload_result_image(
        &self,
        appointment_id: Uuid,
        filename: &str,
        bytes: Vec<u8>,
    ) -> BackendResult<String> {
        let url = self
            .config
            .endpoint(&format!("doctor/appointments/{appointment_id}/result-images"));
        let uploaded: UploadedImage = self
            .execute(
                self.client
                    .post(url)
                    .query(&[("filename", filename)])
                    .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                    .body(bytes),
            )
            .await?;
        Ok(uploaded.url)
    }

    async fn delete_result_image(&self, appointment_id: Uuid, url: &str) -> BackendResult<()> {
        let endpoint = self
            .config
            .endpoint(&format!("doctor/appointments/{appointment_id}/result-images"));
        self.execute_unit(self.client.delete(endpoint).json(&DeleteImageBody { url }))
            .await
    }
}

#[async_trait]
impl BillingBackend for HttpBackend {
    async fn open_draft(&self, appointment_id: Uuid) -> BackendResult<DraftInvoice> {
        let url = self.config.endpoint("staff/receptionist/invoices/create");
        self.execute(
            self.client
                .post(url)
                .json(&CreateInvoiceBody { appointment_id }),
        )
        .await
    }

    async fn replace_items(
        &self,
        invoice_id: Uuid,
        items: &[ItemQuantity],
    ) -> BackendResult<DraftInvoice> {
        let url = self
            .config
            .endpoint(&format!("staff/receptionist/invoices/{invoice_id}/items"));
        self.execute(self.client.put(url).json(&ReplaceItemsBody { items }))
            .await
    }

    async fn apply_discount(
        &self,
        invoice_id: Uuid,
        code: &str,
        current_total: Money,
    ) -> BackendResult<AppliedDiscount> {
        let url = self.config.endpoint(&format!(
            "staff/receptionist/invoices/{invoice_id}/apply-discount"
        ));
        self.execute(self.client.post(url).json(&ApplyDiscountBody {
            code,
            current_total,
        }))
        .await
    }

    async fn generate_qr(&self, invoice_id: Uuid) -> BackendResult<TransferQr> {
        let url = self.config.endpoint(&format!(
            "staff/receptionist/invoices/{invoice_id}/generate-qr"
        ));
        self.execute(self.client.post(url)).await
    }

    async fn finalise(
        &self,
        invoice_id: Uuid,
        request: &FinaliseRequest,
    ) -> BackendResult<FinalisedInvoice> {
        let url = self
            .config
            .endpoint(&format!("staff/receptionist/invoices/{invoice_id}/finalize"));
        self.execute(self.client.post(url).json(request)).await
    }
}

#[async_trait]
impl ProfileBackend for HttpBackend {
    async fn profile_complete(&self) -> BackendResult<bool> {
        let url = self.config.endpoint("patient/profile/completion-status");
        let status: CompletionStatus = self.execute(self.client.get(url)).await?;
        Ok(status.complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chairside_core::events::EventBus;

    #[test]
    fn wire_bodies_use_the_documented_field_names() {
        let body = CreateInvoiceBody {
            appointment_id: Uuid::from_u128(0xA1),
        };
        let json = serde_json::to_value(&body).expect("serialize");
        assert!(json.get("appointmentId").is_some());

        let discount = ApplyDiscountBody {
            code: "WELCOME10",
            current_total: Money::new(300_000),
        };
        let json = serde_json::to_value(&discount).expect("serialize");
        assert_eq!(json["code"], "WELCOME10");
        assert_eq!(json["currentTotal"], 300_000);
    }

    #[tokio::test]
    async fn backend_construction_wires_config_and_session() {
        let config = ApiConfig::new("https://api.clinic.example").expect("valid config");
        let session = SessionHandle::new(EventBus::default());
        let backend = HttpBackend::new(config, session);

        // Authorisation is skipped entirely while no session is open.
        let request = backend.client.get("https://api.clinic.example/health");
        let request = backend.authorised(request).await.build().expect("build");
        assert!(request.headers().get(reqwest::header::AUTHORIZATION).is_none());
    }
}
