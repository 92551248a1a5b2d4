//! Conversions from external infrastructure errors into domain errors.

use callslot_domain::CallSlotError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;
use tokio::task::JoinError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub CallSlotError);

impl InfraError {
    /// The wrapped error is a uniqueness violation.
    pub fn is_conflict(&self) -> bool {
        self.0.is_conflict()
    }
}

impl From<InfraError> for CallSlotError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<CallSlotError> for InfraError {
    fn from(value: CallSlotError) -> Self {
        Self(value)
    }
}

trait IntoCallSlotError {
    fn into_callslot(self) -> CallSlotError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → CallSlotError */
/* -------------------------------------------------------------------------- */

/// `SQLITE_CONSTRAINT_PRIMARYKEY`
const SQLITE_CONSTRAINT_PRIMARYKEY: i32 = 1555;
/// `SQLITE_CONSTRAINT_UNIQUE`
const SQLITE_CONSTRAINT_UNIQUE: i32 = 2067;

impl IntoCallSlotError for SqlError {
    fn into_callslot(self) -> CallSlotError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => CallSlotError::Database("database is busy".into()),
                    (ErrorCode::DatabaseLocked, _) => {
                        CallSlotError::Database("database is locked".into())
                    }
                    (
                        ErrorCode::ConstraintViolation,
                        SQLITE_CONSTRAINT_PRIMARYKEY | SQLITE_CONSTRAINT_UNIQUE,
                    ) => CallSlotError::Conflict("unique constraint violation".into()),
                    (ErrorCode::ConstraintViolation, _) => {
                        CallSlotError::Database(format!("constraint violation: {message}"))
                    }
                    _ => CallSlotError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => CallSlotError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                CallSlotError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                CallSlotError::Database(format!("invalid column type: {ty}"))
            }
            RE::InvalidPath(path) => CallSlotError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => CallSlotError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        Self(value.into_callslot())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → CallSlotError */
/* -------------------------------------------------------------------------- */

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        Self(CallSlotError::Database(format!("connection pool: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → CallSlotError */
/* -------------------------------------------------------------------------- */

impl IntoCallSlotError for HttpError {
    fn into_callslot(self) -> CallSlotError {
        if self.is_timeout() {
            return CallSlotError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return CallSlotError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            return CallSlotError::Network(format!(
                "HTTP {} {}",
                code,
                status.canonical_reason().unwrap_or("unknown status")
            ));
        }

        if self.is_decode() {
            return CallSlotError::Network(format!("invalid provider response: {self}"));
        }

        CallSlotError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        Self(value.into_callslot())
    }
}

/// Map a failed `spawn_blocking` join into the domain error.
pub fn map_join_error(err: JoinError) -> CallSlotError {
    if err.is_cancelled() {
        CallSlotError::Internal("blocking task cancelled".into())
    } else {
        CallSlotError::Internal(format!("blocking task failed: {err}"))
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
