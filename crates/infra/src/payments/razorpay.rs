//! Razorpay REST adapter.
//!
//! Orders, payment lookups and refunds go through Basic-auth JSON calls.
//! Checkout signatures are HMAC-SHA256 over `order_id|payment_id` keyed with
//! the key secret, hex encoded.

use async_trait::async_trait;
use callslot_core::{
    OrderRequest, PaymentGateway, PaymentRecord, ProviderOrder, ProviderRefund, RefundOrder,
};
use callslot_domain::{CallSlotError, PaymentConfig, Result};
use hmac::{Hmac, Mac};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::errors::InfraError;
use crate::http::HttpClient;

type HmacSha256 = Hmac<Sha256>;

/// Hex HMAC-SHA256 of `order_id|payment_id`.
pub fn sign_payment(secret: &str, order_id: &str, payment_id: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|err| CallSlotError::Internal(format!("hmac key rejected: {err}")))?;
    mac.update(format!("{order_id}|{payment_id}").as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[derive(Serialize)]
struct RefundBody<'a> {
    amount: i64,
    notes: &'a BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    description: Option<String>,
}

pub struct RazorpayGateway {
    key_id: String,
    key_secret: String,
    api_base: String,
    http: HttpClient,
}

impl RazorpayGateway {
    /// One attempt per call and no client timeout: a stuck provider call
    /// stalls only the request that made it.
    pub fn new(
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Result<Self> {
        let http = HttpClient::builder().max_attempts(1).timeout(None).build()?;
        Ok(Self {
            key_id: key_id.into().trim().to_string(),
            key_secret: key_secret.into().trim().to_string(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    /// `None` when the key pair is incomplete.
    pub fn from_config(config: &PaymentConfig) -> Result<Option<Self>> {
        if !config.is_configured() {
            return Ok(None);
        }
        let key_id = config.key_id.clone().unwrap_or_default();
        let key_secret = config.key_secret.clone().unwrap_or_default();
        Self::new(key_id, key_secret, config.api_base.clone()).map(Some)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.api_base))
            .basic_auth(&self.key_id, Some(&self.key_secret))
    }

    async fn call<T: DeserializeOwned>(&self, builder: RequestBuilder, action: &str) -> Result<T> {
        let response = self.http.send(builder).await?;
        decode(response, action).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response, action: &str) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map_err(|err| InfraError::from(err).into());
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorEnvelope>(&body)
        .ok()
        .and_then(|envelope| envelope.error.description)
        .filter(|d| !d.trim().is_empty())
        .unwrap_or(body);
    warn!(action, status = status.as_u16(), detail = %detail, "razorpay request failed");

    let message = if detail.trim().is_empty() { format!("Failed to {action}") } else { detail };
    Err(CallSlotError::Network(message))
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    fn key_id(&self) -> &str {
        &self.key_id
    }

    async fn create_order(&self, request: OrderRequest) -> Result<ProviderOrder> {
        let builder = self.request(Method::POST, "/v1/orders").json(&request);
        let order: ProviderOrder = self.call(builder, "create Razorpay order").await?;
        debug!(order_id = %order.id, amount = order.amount, "razorpay order created");
        Ok(order)
    }

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        let Ok(provided) = hex::decode(signature.trim()) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(self.key_secret.as_bytes()) else {
            return false;
        };
        mac.update(format!("{order_id}|{payment_id}").as_bytes());
        mac.verify_slice(&provided).is_ok()
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentRecord> {
        let builder = self.request(Method::GET, &format!("/v1/payments/{payment_id}"));
        self.call(builder, "fetch Razorpay payment").await
    }

    async fn create_refund(&self, refund: RefundOrder) -> Result<ProviderRefund> {
        let body = RefundBody { amount: refund.amount, notes: &refund.notes };
        let builder = self
            .request(Method::POST, &format!("/v1/payments/{}/refund", refund.payment_id))
            .json(&body);
        let created: ProviderRefund = self.call(builder, "create Razorpay refund").await?;
        debug!(refund_id = %created.id, payment_id = %refund.payment_id, "razorpay refund created");
        Ok(created)
    }
}
