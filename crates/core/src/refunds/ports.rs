//! Port interface for refund request persistence

use async_trait::async_trait;
use callslot_domain::{RefundRequest, RefundStatus, Result};
use uuid::Uuid;

/// Newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundQuery {
    pub status: Option<RefundStatus>,
    pub limit: u32,
    pub skip: u32,
}

#[async_trait]
pub trait RefundRequestRepository: Send + Sync {
    /// Insert a request. A duplicate provider payment id fails with a
    /// conflict.
    async fn insert(&self, request: &RefundRequest) -> Result<()>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<RefundRequest>>;

    /// Write the mutable processing fields of `request` only if the stored
    /// status is still `from`. Returns `false` when another writer got there
    /// first or the id is unknown.
    async fn transition(&self, request: &RefundRequest, from: RefundStatus) -> Result<bool>;

    /// Page of requests plus the total count matching the filter.
    async fn list(&self, query: &RefundQuery) -> Result<(Vec<RefundRequest>, u64)>;
}
