//! Ledger hygiene
//!
//! Reads already ignore expired holds, so nothing here is needed for
//! correctness. The sweep only keeps the tables small.

use std::sync::Arc;

use callslot_domain::Result;
use serde::Serialize;
use tracing::debug;

use crate::booking::ports::CheckoutRepository;
use crate::clock::Clock;
use crate::ledger_ports::SlotLockLedger;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub expired_holds: usize,
    pub expired_checkouts: usize,
}

pub struct HousekeepingService {
    ledger: Arc<dyn SlotLockLedger>,
    checkouts: Arc<dyn CheckoutRepository>,
    clock: Arc<dyn Clock>,
}

impl HousekeepingService {
    pub fn new(
        ledger: Arc<dyn SlotLockLedger>,
        checkouts: Arc<dyn CheckoutRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { ledger, checkouts, clock }
    }

    /// Delete expired hold rows and checkouts past retention.
    pub async fn sweep(&self) -> Result<SweepReport> {
        let now = self.clock.now();
        let report = SweepReport {
            expired_holds: self.ledger.purge_expired(now).await?,
            expired_checkouts: self.checkouts.purge_expired(now).await?,
        };
        debug!(?report, "housekeeping sweep finished");
        Ok(report)
    }
}
