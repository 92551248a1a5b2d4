//! Application context - dependency injection container

use std::sync::Arc;
use std::time::Duration;

use callslot_core::{
    AvailabilityService, BookingService, CheckoutService, Clock, HousekeepingService,
    NotificationDispatcher, PaymentGateway, RefundService, SystemClock,
};
use callslot_domain::{AppConfig, CallSlotError, Result, SchedulingConfig};
use callslot_infra::{
    mailer_from_config, DbManager, RazorpayGateway, SqliteBookingRepository,
    SqliteCheckoutRepository, SqliteRefundRepository, SqliteSlotLockLedger, SweepScheduler,
    SweepSchedulerConfig,
};
use chrono::Utc;
use tracing::{error, info, warn};

use crate::utils::health::{ComponentHealth, HealthStatus};

const SCHEDULER_START_TIMEOUT: Duration = Duration::from_secs(10);

/// Application context - holds every service the handlers need
pub struct AppContext {
    pub config: AppConfig,
    pub scheduling: Arc<SchedulingConfig>,
    pub db: Arc<DbManager>,
    pub availability: AvailabilityService,
    pub bookings: BookingService,
    pub checkout: CheckoutService,
    pub refunds: RefundService,
    pub housekeeping: Arc<HousekeepingService>,
    payments_enabled: bool,
}

impl AppContext {
    /// Open the database, apply the schema and wire the services.
    pub fn new(config: AppConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Same as [`AppContext::new`] with an injected time source.
    pub fn with_clock(config: AppConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let db = Arc::new(DbManager::new(&config.database.path, config.database.pool_size)?);
        db.run_migrations()?;

        let scheduling = Arc::new(config.scheduling.clone());
        let ledger = Arc::new(SqliteSlotLockLedger::new(Arc::clone(&db)));
        let bookings = Arc::new(SqliteBookingRepository::new(Arc::clone(&db)));
        let checkouts = Arc::new(SqliteCheckoutRepository::new(Arc::clone(&db)));
        let refund_requests = Arc::new(SqliteRefundRepository::new(Arc::clone(&db)));

        let mailer = mailer_from_config(&config.email)?;
        let notifier = NotificationDispatcher::new(mailer, scheduling.time_zone)
            .with_admin_recipients(config.email.to.clone())
            .with_subject_prefix(config.email.subject_prefix.clone())
            .with_customer_emails(config.email.send_customer_emails);

        let gateway: Option<Arc<dyn PaymentGateway>> = match RazorpayGateway::from_config(&config.payments)? {
            Some(gateway) => Some(Arc::new(gateway)),
            None => {
                if scheduling.require_payment {
                    warn!("payment is required but Razorpay keys are missing; checkout will answer 501");
                }
                None
            }
        };

        let availability = AvailabilityService::new(Arc::clone(&scheduling), ledger.clone(), Arc::clone(&clock));
        let booking_service = BookingService::new(
            Arc::clone(&scheduling),
            ledger.clone(),
            bookings.clone(),
            notifier.clone(),
            Arc::clone(&clock),
        );
        let mut checkout = CheckoutService::new(
            Arc::clone(&scheduling),
            ledger.clone(),
            bookings.clone(),
            checkouts.clone(),
            notifier,
            Arc::clone(&clock),
        );
        let mut refunds = RefundService::new(bookings, refund_requests, Arc::clone(&clock));
        if let Some(gateway) = &gateway {
            checkout = checkout.with_gateway(Arc::clone(gateway));
            refunds = refunds.with_gateway(Arc::clone(gateway));
        }
        let housekeeping = Arc::new(HousekeepingService::new(ledger, checkouts, clock));

        info!(
            db_path = %db.path().display(),
            time_zone = %scheduling.time_zone,
            require_payment = scheduling.require_payment,
            payments = gateway.is_some(),
            "application context ready"
        );

        Ok(Self {
            payments_enabled: gateway.is_some(),
            config,
            scheduling,
            db,
            availability,
            bookings: booking_service,
            checkout,
            refunds,
            housekeeping,
        })
    }

    /// Configured admin bearer token, if any.
    pub fn admin_token(&self) -> Option<&str> {
        self.config.admin.token.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    /// Build and start the housekeeping sweep. `None` when disabled.
    pub async fn start_housekeeping(&self) -> Result<Option<SweepScheduler>> {
        if !self.config.housekeeping.enabled {
            info!("housekeeping sweep disabled");
            return Ok(None);
        }

        let config = SweepSchedulerConfig {
            cron_expression: self.config.housekeeping.cron_expression.clone(),
            ..SweepSchedulerConfig::default()
        };
        let mut scheduler = SweepScheduler::with_config(config, self.housekeeping.clone()).await.map_err(|err| {
            error!(error = %err, "failed to construct SweepScheduler");
            CallSlotError::from(err)
        })?;

        tokio::time::timeout(SCHEDULER_START_TIMEOUT, scheduler.start())
            .await
            .map_err(|_| {
                error!(timeout_secs = SCHEDULER_START_TIMEOUT.as_secs(), "SweepScheduler start timed out");
                CallSlotError::Internal("SweepScheduler start timed out".into())
            })?
            .map_err(|err| {
                error!(error = %err, "failed to start SweepScheduler");
                CallSlotError::from(err)
            })?;

        Ok(Some(scheduler))
    }

    /// Database ping plus a note on the payment provider.
    pub async fn health_check(&self) -> HealthStatus {
        let db = Arc::clone(&self.db);
        let database = match tokio::task::spawn_blocking(move || db.health_check()).await {
            Ok(Ok(())) => ComponentHealth::healthy("database"),
            Ok(Err(err)) => ComponentHealth::unhealthy("database", err.to_string()),
            Err(err) => ComponentHealth::unhealthy("database", format!("health check task failed: {err}")),
        };

        let payments = match (self.payments_enabled, self.scheduling.require_payment) {
            (true, _) => ComponentHealth::healthy("payments"),
            (false, false) => ComponentHealth::healthy_with("payments", "free bookings only"),
            (false, true) => ComponentHealth::unhealthy("payments", "payment required but provider not configured"),
        };

        HealthStatus::at(Utc::now().timestamp()).add_component(database).add_component(payments).finish()
    }
}
