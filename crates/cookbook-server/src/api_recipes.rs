//! Recipe API handlers.

use crate::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Extension, Path,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cookbook_recipes::{
    create_recipe, get_recipe, list_recipes, NewRecipe, Recipe, RecipeError,
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use utoipa::ToSchema;

/// Body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found")]
    NotFound,
    #[error("unprocessable entity: {0}")]
    Unprocessable(String),
    /// Rejected while reading the body, before any parsing (size limit,
    /// broken stream). Carries the extractor's own status.
    #[error("{1}")]
    Rejected(StatusCode, String),
    /// Logged in full; clients only see a generic message.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, "not found".to_string()),
            ApiError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::Rejected(status, msg) => (status, msg),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "recipe request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { detail })).into_response()
    }
}

impl From<RecipeError> for ApiError {
    fn from(e: RecipeError) -> Self {
        match e {
            RecipeError::Constraint(_) => ApiError::Unprocessable(e.to_string()),
            RecipeError::Database(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::BytesRejection(r) => ApiError::Rejected(r.status(), r.body_text()),
            other => ApiError::Unprocessable(other.body_text()),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Unprocessable(rejection.body_text())
    }
}

/// Runs blocking recipe work on a pooled connection off the async runtime.
async fn with_connection<T, F>(state: Arc<AppState>, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&mut rusqlite::Connection) -> Result<T, RecipeError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut conn = state
            .pool
            .get()
            .map_err(|e| ApiError::Internal(format!("db connection failed: {e}")))?;
        op(&mut conn).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("task join error: {e}")))?
}

#[utoipa::path(
    get,
    path = "/recipes",
    tag = "recipes",
    summary = "List all recipes",
    description = "Every recipe, most viewed first; equal view counts are ordered by cooking time.",
    responses(
        (status = 200, description = "All recipes", body = [Recipe]),
        (status = 500, description = "Storage failure", body = ErrorBody),
    )
)]
pub async fn list_recipes_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<Recipe>>, ApiError> {
    let recipes = with_connection(state, |conn| list_recipes(conn)).await?;
    Ok(Json(recipes))
}

/// Each successful fetch records a view before the recipe is returned.
#[utoipa::path(
    get,
    path = "/recipes/{id}",
    tag = "recipes",
    summary = "Get a recipe by id",
    description = "Recipe details. Every successful request increments the view count.",
    params(("id" = i64, Path, description = "Recipe id")),
    responses(
        (status = 200, description = "The recipe with its updated view count", body = Recipe),
        (status = 404, description = "No recipe with this id", body = ErrorBody),
        (status = 422, description = "Id is not an integer", body = ErrorBody),
    )
)]
pub async fn get_recipe_handler(
    Extension(state): Extension<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Recipe>, ApiError> {
    let Path(id) = id?;
    let recipe = with_connection(state, move |conn| get_recipe(conn, id)).await?;
    recipe.map(Json).ok_or(ApiError::NotFound)
}

/// Responds `200 OK`, not `201 Created`, with the stored recipe.
#[utoipa::path(
    post,
    path = "/recipes",
    tag = "recipes",
    summary = "Create a recipe",
    description = "Stores a new recipe from its title, cooking time, ingredients and description.",
    request_body = NewRecipe,
    responses(
        (status = 200, description = "The stored recipe with zero views", body = Recipe),
        (status = 413, description = "Body over the size limit", body = ErrorBody),
        (status = 422, description = "Missing or mistyped field", body = ErrorBody),
    )
)]
pub async fn create_recipe_handler(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<NewRecipe>, JsonRejection>,
) -> Result<Json<Recipe>, ApiError> {
    let Json(new) = payload?;
    let recipe = with_connection(state, move |conn| create_recipe(conn, &new)).await?;
    Ok(Json(recipe))
}
