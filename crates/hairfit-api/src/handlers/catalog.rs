//! Catalog admin handlers.
//!
//! Every mutation opens the store's single edit session, applies one edit and
//! commits. A concurrent mutation gets 409 instead of waiting.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use hairfit_core::{
    check_remote_url, Catalog, Category, EditSession, Error, Gender, ImageSource, Result, Style,
    StyleId,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AddStyleRequest {
    /// Data URL or public https URL of the reference image.
    pub image: ImageSource,
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStyleRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    /// Zero-based target position within the category.
    #[serde(default)]
    pub position: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct StyleLookup {
    pub style: Style,
    pub gender: String,
    pub category: String,
}

/// Run one edit in a fresh session and commit it.
async fn apply<T>(
    state: &AppState,
    op: &'static str,
    edit: impl FnOnce(&mut EditSession) -> Result<T>,
) -> std::result::Result<T, ApiError> {
    let mut session = state.catalog.begin_edit().await?;
    let value = edit(&mut session)?;
    let catalog = state.catalog.commit(session).await?;
    info!(
        subsystem = "api",
        op,
        style_count = catalog.style_count(),
        "Catalog updated"
    );
    Ok(value)
}

pub async fn get_catalog(State(state): State<AppState>) -> Json<Catalog> {
    Json(state.catalog.current().await.as_ref().clone())
}

pub async fn add_gender(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NameRequest>, JsonRejection>,
) -> std::result::Result<(StatusCode, Json<Gender>), ApiError> {
    let Json(req) = payload?;
    let gender = apply(&state, "add_gender", |session| {
        session.add_gender(&req.name)?;
        session
            .catalog()
            .genders()
            .last()
            .cloned()
            .ok_or_else(|| Error::Internal("gender missing after insert".to_string()))
    })
    .await?;
    Ok((StatusCode::CREATED, Json(gender)))
}

pub async fn remove_gender(
    State(state): State<AppState>,
    Path(gender): Path<String>,
) -> std::result::Result<StatusCode, ApiError> {
    apply(&state, "remove_gender", |session| session.remove_gender(&gender)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_category(
    State(state): State<AppState>,
    Path(gender): Path<String>,
    payload: std::result::Result<Json<NameRequest>, JsonRejection>,
) -> std::result::Result<(StatusCode, Json<Category>), ApiError> {
    let Json(req) = payload?;
    let category = apply(&state, "add_category", |session| {
        session.add_category(&gender, &req.name)?;
        session
            .catalog()
            .categories(&gender)?
            .last()
            .cloned()
            .ok_or_else(|| Error::Internal("category missing after insert".to_string()))
    })
    .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn remove_category(
    State(state): State<AppState>,
    Path((gender, category)): Path<(String, String)>,
) -> std::result::Result<StatusCode, ApiError> {
    apply(&state, "remove_category", |session| {
        session.remove_category(&gender, &category)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_styles(
    State(state): State<AppState>,
    Path((gender, category)): Path<(String, String)>,
) -> std::result::Result<Json<Vec<Style>>, ApiError> {
    let catalog = state.catalog.current().await;
    Ok(Json(catalog.styles(&gender, &category)?.to_vec()))
}

pub async fn add_style(
    State(state): State<AppState>,
    Path((gender, category)): Path<(String, String)>,
    payload: std::result::Result<Json<AddStyleRequest>, JsonRejection>,
) -> std::result::Result<(StatusCode, Json<Style>), ApiError> {
    let Json(req) = payload?;
    match &req.image {
        ImageSource::Inline(image) => {
            let size = image.len() as u64;
            let limit = state.config.max_photo_bytes;
            if size > limit {
                return Err(Error::PayloadTooLarge { size, limit }.into());
            }
        }
        ImageSource::Remote(url) => {
            check_remote_url(url, state.config.allow_insecure_style_urls)?;
        }
    }
    let style = apply(&state, "add_style", |session| {
        session.add_style(&gender, &category, req.image, req.prompt)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(style)))
}

/// Update a style's prompt and/or position.
pub async fn update_style(
    State(state): State<AppState>,
    Path((gender, category, id)): Path<(String, String, String)>,
    payload: std::result::Result<Json<UpdateStyleRequest>, JsonRejection>,
) -> std::result::Result<Json<Style>, ApiError> {
    let Json(req) = payload?;
    if req.prompt.is_none() && req.position.is_none() {
        return Err(ApiError::BadRequest(
            "expected at least one of prompt or position".to_string(),
        ));
    }
    let id = StyleId::new(id);
    let style = apply(&state, "update_style", |session| {
        if let Some(prompt) = &req.prompt {
            session.set_style_prompt(&gender, &category, &id, prompt)?;
        }
        if let Some(position) = req.position {
            session.move_style(&gender, &category, &id, position)?;
        }
        session
            .catalog()
            .category(&gender, &category)?
            .style(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("style '{}'", id)))
    })
    .await?;
    Ok(Json(style))
}

pub async fn remove_style(
    State(state): State<AppState>,
    Path((gender, category, id)): Path<(String, String, String)>,
) -> std::result::Result<StatusCode, ApiError> {
    let id = StyleId::new(id);
    apply(&state, "remove_style", |session| {
        session.remove_style(&gender, &category, &id)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_style(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> std::result::Result<Json<StyleLookup>, ApiError> {
    let catalog = state.catalog.current().await;
    let id = StyleId::new(id);
    let (style, membership) = catalog
        .find_style(&id)
        .ok_or_else(|| Error::NotFound(format!("style '{}'", id)))?;
    Ok(Json(StyleLookup {
        style: style.clone(),
        gender: membership.gender,
        category: membership.category,
    }))
}
