use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tether_core::Principal;

use crate::state::AppState;

/// The requester, as asserted by the upstream authentication layer.
///
/// A missing, empty or non-UTF-8 header means an anonymous caller.
#[derive(Debug, Clone)]
pub struct Caller(pub Principal);

impl FromRequestParts<AppState> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let principal = parts
            .headers
            .get(state.principal_header())
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map_or(Principal::Anonymous, Principal::user);
        Ok(Caller(principal))
    }
}
