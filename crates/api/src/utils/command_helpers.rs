//! Command execution helpers
//!
//! Every handler runs its body through [`execute_command`] so timing and
//! outcome logging stay uniform.

use std::future::Future;
use std::time::Instant;

use crate::error::ApiResult;
use crate::utils::logging::log_command_execution;

/// Run `operation`, then log its duration and outcome under `command`.
///
/// # Example
///
/// ```rust,ignore
/// pub async fn get_thing(State(ctx): State<Arc<AppContext>>) -> ApiResult<Json<Thing>> {
///     execute_command("things::get", async {
///         Ok(Json(ctx.things.get().await?))
///     })
///     .await
/// }
/// ```
pub async fn execute_command<T, Fut>(command: &str, operation: Fut) -> ApiResult<T>
where
    Fut: Future<Output = ApiResult<T>>,
{
    let start = Instant::now();
    let result = operation.await;
    log_command_execution(command, start.elapsed(), result.as_ref().map(|_| ()));
    result
}
