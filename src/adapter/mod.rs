//! Hosting-independent HTTP boundary.
//!
//! Both entry points translate their native request into an [`ApiRequest`],
//! run [`process`] and translate the resulting [`ApiResponse`] back.

mod request;
mod response;

pub use request::{ApiRequest, RequestBody};
pub use response::{ApiResponse, ResponseWriter};

use log::debug;

use crate::{rate_limit::RateLimitDecision, routes, types::AppState};

/// Runs one request through the rate limit decision and the router.
///
/// `decision` is `None` when the caller has no limiter in front of it.
pub async fn process(
    state: &AppState,
    mut req: ApiRequest,
    decision: Option<RateLimitDecision>,
) -> ApiResponse {
    let mut res = ResponseWriter::new();

    if let Some(decision) = decision {
        decision.apply(&mut res);
        if decision.exceeded() && state.limiter.is_blocking() {
            debug!("Blocking {} {} after rate limit", req.method, req.path);
            return res.finish();
        }
    }

    routes::dispatch(state, &mut req, &mut res).await;
    res.finish()
}
