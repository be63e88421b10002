//! Deck endpoints
//!
//! A thin layer over the deck service: the handlers translate HTTP shapes
//! (path ids, JSON bodies, 404s) and nothing else.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use dv_adapters::DeckService;
use dv_domain::{Deck, DeckBrief, DeckMeta};
use dv_ports::{KeyValueStore, ThumbnailRenderer};

use super::error::{ApiError, ApiResult};

pub async fn list_decks<S, R>(
    State(service): State<Arc<DeckService<S, R>>>,
) -> ApiResult<Json<Vec<DeckBrief>>>
where
    S: KeyValueStore + 'static,
    R: ThumbnailRenderer + 'static,
{
    Ok(Json(service.list_decks().await?))
}

pub async fn get_deck<S, R>(
    State(service): State<Arc<DeckService<S, R>>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Deck>>
where
    S: KeyValueStore + 'static,
    R: ThumbnailRenderer + 'static,
{
    match service.get_deck(&id).await? {
        Some(deck) => Ok(Json(deck)),
        None => Err(ApiError::not_found("Deck", &id)),
    }
}

pub async fn put_deck<S, R>(
    State(service): State<Arc<DeckService<S, R>>>,
    Path(id): Path<String>,
    Json(deck): Json<Deck>,
) -> ApiResult<Json<DeckMeta>>
where
    S: KeyValueStore + 'static,
    R: ThumbnailRenderer + 'static,
{
    let manifest = service.save_deck(&id, &deck).await?;
    Ok(Json(manifest.meta))
}

pub async fn delete_deck<S, R>(
    State(service): State<Arc<DeckService<S, R>>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode>
where
    S: KeyValueStore + 'static,
    R: ThumbnailRenderer + 'static,
{
    service.delete_deck(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_deck_meta<S, R>(
    State(service): State<Arc<DeckService<S, R>>>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeckMeta>>
where
    S: KeyValueStore + 'static,
    R: ThumbnailRenderer + 'static,
{
    match service.get_deck_metadata(&id).await? {
        Some(meta) => Ok(Json(meta)),
        None => Err(ApiError::not_found("Deck", &id)),
    }
}

pub async fn get_deck_thumbnail<S, R>(
    State(service): State<Arc<DeckService<S, R>>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse>
where
    S: KeyValueStore + 'static,
    R: ThumbnailRenderer + 'static,
{
    match service.get_deck_thumbnail(&id).await? {
        Some(bytes) => Ok(([(header::CONTENT_TYPE, "image/webp")], bytes)),
        None => Err(ApiError::not_found("Thumbnail", &id)),
    }
}
