use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tether_core::ShortCode;

use crate::error::{AppError, Result};
use crate::model::{CreateLinkRequest, LinkResponse};
use crate::principal::Caller;
use crate::state::AppState;

pub async fn create_link_handler(
    State(state): State<AppState>,
    Caller(principal): Caller,
    request: std::result::Result<Json<CreateLinkRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LinkResponse>)> {
    let Json(request) = request.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let link = state
        .shortener()
        .create(&principal, request.into())
        .await?;
    let short_url = state.short_url(&link.code);

    Ok((StatusCode::CREATED, Json(LinkResponse::new(link, short_url))))
}

pub async fn list_links_handler(
    State(state): State<AppState>,
    Caller(principal): Caller,
) -> Result<Json<Vec<LinkResponse>>> {
    let links = state.shortener().list(&principal).await?;

    Ok(Json(
        links
            .into_iter()
            .map(|link| {
                let short_url = state.short_url(&link.code);
                LinkResponse::new(link, short_url)
            })
            .collect(),
    ))
}

pub async fn get_link_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<LinkResponse>> {
    let code = ShortCode::new(&code)?;
    let link = state.shortener().resolve_link(&code).await?;
    let short_url = state.short_url(&link.code);

    Ok(Json(LinkResponse::new(link, short_url)))
}

pub async fn delete_link_handler(
    State(state): State<AppState>,
    Caller(principal): Caller,
    Path(code): Path<String>,
) -> Result<StatusCode> {
    let code = ShortCode::new(&code)?;
    state.shortener().delete(&principal, &code).await?;

    Ok(StatusCode::NO_CONTENT)
}
