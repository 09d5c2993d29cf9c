use axum::extract::{Path, State};
use axum::response::Redirect;
use tether_core::ShortCode;
use tracing::trace;
use url::Url;

use crate::error::Result;
use crate::state::AppState;

pub async fn redirect_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Redirect> {
    let code = ShortCode::new(&code)?;
    let target = state.shortener().resolve(&code).await?;
    trace!(code = %code, target = %target, "redirecting");

    // Header values must be ASCII; the parsed form percent-encodes the rest.
    let location = Url::parse(&target).map_or(target, String::from);
    Ok(Redirect::temporary(&location))
}
