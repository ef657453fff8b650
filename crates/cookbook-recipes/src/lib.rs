//! Recipe model and data access for the cookbook service.
//!
//! Every read and write of the `recipes` table goes through this crate.
//! Fetching a single recipe is a view event: the stored `views` counter is
//! incremented and committed before the recipe is returned.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::{self, Deserializer, Unexpected, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use utoipa::ToSchema;

/// Errors that can occur during recipe operations.
#[derive(Debug, Error)]
pub enum RecipeError {
    /// The store rejected the row (NOT NULL, CHECK, ...).
    #[error("recipe rejected by store: {0}")]
    Constraint(String),
    #[error("database error: {0}")]
    Database(rusqlite::Error),
}

impl From<rusqlite::Error> for RecipeError {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::SqliteFailure(code, msg)
                if code.code == rusqlite::ffi::ErrorCode::ConstraintViolation =>
            {
                RecipeError::Constraint(msg.unwrap_or_else(|| code.to_string()))
            }
            other => RecipeError::Database(other),
        }
    }
}

/// A stored recipe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct Recipe {
    /// Store-assigned identifier, never reused.
    pub id: i64,
    pub title: String,
    /// Cooking time in minutes.
    pub cook_time: i64,
    /// Free-form ingredient list.
    pub ingredients: String,
    pub description: String,
    /// Number of times this recipe has been fetched by id.
    pub views: i64,
}

/// Fields supplied by the caller when creating a recipe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct NewRecipe {
    pub title: String,
    /// Minutes. Numeric strings (`"60"`) and whole floats (`60.0`) are
    /// accepted and stored as integers.
    #[serde(deserialize_with = "deserialize_minutes")]
    pub cook_time: i64,
    pub ingredients: String,
    pub description: String,
}

fn deserialize_minutes<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(MinutesVisitor)
}

struct MinutesVisitor;

impl<'de> Visitor<'de> for MinutesVisitor {
    type Value = i64;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a whole number of minutes")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
        Ok(v)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
        i64::try_from(v).map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<i64, E> {
        // The upper bound is exclusive: i64::MAX rounds up to 2^63 as f64.
        if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
            Ok(v as i64)
        } else {
            Err(E::invalid_value(Unexpected::Float(v), &self))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
        v.trim()
            .parse()
            .map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
    }
}

const RECIPE_COLUMNS: &str = "id, title, cook_time, ingredients, description, views";

/// Lists every recipe, most viewed first, then quickest to cook.
pub fn list_recipes(conn: &Connection) -> Result<Vec<Recipe>, RecipeError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes
        ORDER BY views DESC, cook_time ASC, id ASC"
    ))?;

    let rows = stmt.query_map([], map_row_to_recipe)?;
    let mut recipes = Vec::new();
    for row in rows {
        recipes.push(row?);
    }
    Ok(recipes)
}

/// Fetches a recipe by id, recording a view.
///
/// The increment and the read run in one `IMMEDIATE` transaction, so
/// concurrent fetches of the same recipe are serialized by SQLite and each
/// observes a distinct view count. Returns `Ok(None)` when no recipe has
/// this id; nothing is written in that case.
pub fn get_recipe(conn: &mut Connection, id: i64) -> Result<Option<Recipe>, RecipeError> {
    let tx = cookbook_db::begin_write(conn)?;

    let updated = tx.execute("UPDATE recipes SET views = views + 1 WHERE id = ?1", [id])?;
    if updated == 0 {
        tracing::debug!(recipe_id = id, "recipe not found");
        // Dropping the transaction rolls it back.
        return Ok(None);
    }

    let recipe = tx
        .query_row(
            &format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = ?1"),
            [id],
            map_row_to_recipe,
        )
        .optional()?;
    tx.commit()?;

    if let Some(ref r) = recipe {
        tracing::debug!(recipe_id = r.id, views = r.views, "recipe viewed");
    }
    Ok(recipe)
}

/// Stores a new recipe with zero views and returns the stored row.
pub fn create_recipe(conn: &mut Connection, new: &NewRecipe) -> Result<Recipe, RecipeError> {
    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO recipes (title, cook_time, ingredients, description, views)
        VALUES (?1, ?2, ?3, ?4, 0)",
        params![new.title, new.cook_time, new.ingredients, new.description],
    )?;
    let id = tx.last_insert_rowid();

    let recipe = tx.query_row(
        &format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = ?1"),
        [id],
        map_row_to_recipe,
    )?;
    tx.commit()?;

    tracing::info!(recipe_id = recipe.id, title = %recipe.title, "recipe created");
    Ok(recipe)
}

fn map_row_to_recipe(row: &Row) -> rusqlite::Result<Recipe> {
    Ok(Recipe {
        id: row.get(0)?,
        title: row.get(1)?,
        cook_time: row.get(2)?,
        ingredients: row.get(3)?,
        description: row.get(4)?,
        views: row.get(5)?,
    })
}
