//! Draft-invoice cart and payment finalisation.
//!
//! The server owns the draft invoice: every cart mutation sends the full
//! item list and the server's recomputed draft replaces local state. The cart
//! only adds what the server cannot: local validation (insufficient cash,
//! unknown line items) and the rule that a discount never survives a change
//! to the cart contents it was computed against.
//!
//! Responsibilities:
//! - Idempotent open of the one active draft per appointment
//! - Add/overwrite/remove line items with server-authoritative totals
//! - At most one applied discount, invalidated by any cart mutation
//! - Cash and transfer finalisation with change computation

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use chairside_types::Money;

use crate::backend::{BackendError, BillingBackend};
use crate::events::{AppEvent, EventBus};

/// A billable service from the clinic catalog, as picked in the UI.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillableService {
    pub id: Uuid,
    pub name: String,
    pub price: Money,
}

/// One line of a draft invoice.
///
/// Name and unit price are captured at add time; the server echoes them back
/// on every recompute.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub item_id: Uuid,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

/// The in-progress billing cart for one appointment, server-computed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftInvoice {
    pub id: Uuid,
    pub appointment_id: Uuid,
    #[serde(default)]
    pub items: Vec<LineItem>,
    pub total: Money,
}

/// An `{itemId, quantity}` pair sent when replacing the draft's item list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemQuantity {
    pub item_id: Uuid,
    pub quantity: u32,
}

/// A discount validated by the server against a total snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedDiscount {
    pub code: String,
    #[serde(rename = "discountAmount")]
    pub amount: Money,
}

/// QR payload for a bank-transfer payment.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferQr {
    pub qr_code_url: String,
    pub memo: String,
    pub amount: Money,
}

/// Payment method selected at the till.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Transfer,
}

/// Body for the finalisation call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinaliseRequest {
    pub payment_method: PaymentMethod,
    pub amount_given: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_code: Option<String>,
    pub original_total: Money,
    pub final_total: Money,
}

/// An immutable finalised invoice, as returned by the server.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalisedInvoice {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub payment_method: PaymentMethod,
    pub original_total: Money,
    #[serde(default)]
    pub discount_code: Option<String>,
    pub final_total: Money,
}

/// What the caller gets back from a successful finalisation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentOutcome {
    pub invoice: FinalisedInvoice,
    /// Cash change owed to the patient. Always zero for transfers.
    pub change: Money,
}

/// Errors from cart operations.
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    /// The referenced line item is not in the cart. Raised locally, before
    /// any network call.
    #[error("no such line item in the cart: {0}")]
    UnknownItem(Uuid),
    /// Transfer QR was requested for an empty cart.
    #[error("cannot prepare a transfer payment for an empty cart")]
    EmptyCart,
    /// Cash tendered is below the amount due. Raised locally.
    #[error("insufficient amount tendered: {required} due, {given} given")]
    InsufficientAmount { required: Money, given: Money },
    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub type BillingResult<T> = std::result::Result<T, BillingError>;

/// The billing cart for one appointment.
///
/// Obtained via [`BillingCart::open`]; consumed by [`BillingCart::finalise`],
/// after which the draft no longer exists server-side.
pub struct BillingCart {
    backend: Arc<dyn BillingBackend>,
    events: EventBus,
    draft: DraftInvoice,
    discount: Option<AppliedDiscount>,
}

impl BillingCart {
    /// Opens the cart for an appointment, creating or fetching its draft.
    ///
    /// Opening twice for the same appointment yields the same draft invoice:
    /// the create endpoint is idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::Backend`] when the draft cannot be created or
    /// fetched.
    pub async fn open(
        backend: Arc<dyn BillingBackend>,
        events: EventBus,
        appointment_id: Uuid,
    ) -> BillingResult<Self> {
        let draft = backend.open_draft(appointment_id).await?;
        tracing::debug!(invoice = %draft.id, appointment = %appointment_id, "opened draft invoice");
        Ok(Self {
            backend,
            events,
            draft,
            discount: None,
        })
    }

    pub fn draft(&self) -> &DraftInvoice {
        &self.draft
    }

    pub fn items(&self) -> &[LineItem] {
        &self.draft.items
    }

    pub fn discount(&self) -> Option<&AppliedDiscount> {
        self.discount.as_ref()
    }

    /// Pre-discount total, as last reported by the server.
    pub fn subtotal(&self) -> Money {
        self.draft.total
    }

    /// Amount due: subtotal less any applied discount, floored at zero.
    pub fn final_total(&self) -> Money {
        match &self.discount {
            Some(discount) => self.draft.total.saturating_sub_to_zero(discount.amount),
            None => self.draft.total,
        }
    }

    /// Adds one unit of a catalog service to the cart.
    ///
    /// If the service is already a line item its quantity is incremented;
    /// otherwise a new line item is appended at the service's current price
    /// and name. Any applied discount is cleared first, because the total is
    /// about to change. The full item list round-trips to the server and the
    /// response replaces the local draft.
    pub async fn add_item(&mut self, service: &BillableService) -> BillingResult<()> {
        self.discount = None;

        let mut desired: Vec<ItemQuantity> = self.item_quantities();
        match desired.iter_mut().find(|entry| entry.item_id == service.id) {
            Some(entry) => entry.quantity += 1,
            None => desired.push(ItemQuantity {
                item_id: service.id,
                quantity: 1,
            }),
        }

        self.sync_items(&desired).await
    }

    /// Overwrites a line item's quantity; zero removes the line entirely.
    ///
    /// Same discount invalidation and round trip as [`Self::add_item`].
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::UnknownItem`] before any network call when the
    /// item is not in the cart.
    pub async fn set_item_quantity(&mut self, item_id: Uuid, quantity: u32) -> BillingResult<()> {
        if !self.draft.items.iter().any(|item| item.item_id == item_id) {
            return Err(BillingError::UnknownItem(item_id));
        }

        self.discount = None;

        let mut desired = self.item_quantities();
        if quantity == 0 {
            desired.retain(|entry| entry.item_id != item_id);
        } else if let Some(entry) = desired.iter_mut().find(|entry| entry.item_id == item_id) {
            entry.quantity = quantity;
        }

        self.sync_items(&desired).await
    }

    /// Applies a discount code against the current pre-discount total.
    ///
    /// On rejection the cart is untouched and the server's reason is
    /// surfaced. A later cart mutation clears the discount again.
    pub async fn apply_discount(&mut self, code: &str) -> BillingResult<()> {
        let discount = self
            .backend
            .apply_discount(self.draft.id, code, self.subtotal())
            .await?;
        tracing::info!(invoice = %self.draft.id, code = %discount.code, amount = %discount.amount, "discount applied");
        self.discount = Some(discount);
        Ok(())
    }

    /// Clears the applied discount. Local only; no network call.
    pub fn remove_discount(&mut self) {
        self.discount = None;
    }

    /// Fetches the QR payload for a transfer payment.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::EmptyCart`] before any network call when the
    /// cart has no line items.
    pub async fn transfer_qr(&self) -> BillingResult<TransferQr> {
        if self.draft.items.is_empty() {
            return Err(BillingError::EmptyCart);
        }
        Ok(self.backend.generate_qr(self.draft.id).await?)
    }

    /// Finalises payment and consumes the cart.
    ///
    /// Cash requires `amount_given` to cover the final total and computes the
    /// change; a shortfall is rejected locally with no network call. Transfer
    /// finalisation is a manual staff confirmation: `amount_given` is ignored
    /// and the recorded change is zero.
    ///
    /// On success an [`AppEvent::InvoiceFinalised`] event is published so
    /// pending-payment views refresh.
    pub async fn finalise(
        self,
        method: PaymentMethod,
        amount_given: Money,
    ) -> BillingResult<PaymentOutcome> {
        let due = self.final_total();

        let (sent_amount, change) = match method {
            PaymentMethod::Cash => {
                if amount_given < due {
                    return Err(BillingError::InsufficientAmount {
                        required: due,
                        given: amount_given,
                    });
                }
                (amount_given, amount_given - due)
            }
            PaymentMethod::Transfer => (due, Money::ZERO),
        };

        let request = FinaliseRequest {
            payment_method: method,
            amount_given: sent_amount,
            discount_code: self.discount.as_ref().map(|d| d.code.clone()),
            original_total: self.subtotal(),
            final_total: due,
        };

        let invoice = self.backend.finalise(self.draft.id, &request).await?;
        tracing::info!(invoice = %invoice.id, ?method, total = %due, "invoice finalised");
        self.events.publish(AppEvent::InvoiceFinalised {
            invoice_id: invoice.id,
        });

        Ok(PaymentOutcome { invoice, change })
    }

    fn item_quantities(&self) -> Vec<ItemQuantity> {
        self.draft
            .items
            .iter()
            .map(|item| ItemQuantity {
                item_id: item.item_id,
                quantity: item.quantity,
            })
            .collect()
    }

    async fn sync_items(&mut self, desired: &[ItemQuantity]) -> BillingResult<()> {
        let draft = self.backend.replace_items(self.draft.id, desired).await?;
        self.draft = draft;
        Ok(())
    }
}
