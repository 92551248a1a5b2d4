//! Payment provider port
//!
//! The provider is consumed as a signed RPC boundary: orders are created
//! server-side, the client pays, and the service verifies the returned
//! signature and re-reads the payment before trusting it.

use std::collections::BTreeMap;

use async_trait::async_trait;
use callslot_domain::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    /// Minor units.
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    pub notes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub status: String,
}

/// Payment object as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentRecord {
    pub id: String,
    #[serde(default)]
    pub order_id: Option<String>,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub captured: bool,
}

impl PaymentRecord {
    pub fn is_captured(&self) -> bool {
        self.captured || self.status.eq_ignore_ascii_case("captured")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefundOrder {
    pub payment_id: String,
    pub amount: i64,
    pub notes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRefund {
    pub id: String,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub status: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Public key id handed to the client's payment sheet.
    fn key_id(&self) -> &str;

    async fn create_order(&self, request: OrderRequest) -> Result<ProviderOrder>;

    /// Check the provider signature over `order_id|payment_id`.
    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool;

    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentRecord>;

    async fn create_refund(&self, refund: RefundOrder) -> Result<ProviderRefund>;
}
