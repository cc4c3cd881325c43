use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{Recipe, RecipeDraft};

/// Retrieve every recipe in insertion order. The query doubles as the single
/// source of truth for how the list screen orders its rows.
pub fn fetch_recipes(conn: &Connection) -> Result<Vec<Recipe>> {
    let mut stmt = conn
        .prepare("SELECT id, name, ingredient, image FROM recipes ORDER BY id")
        .context("failed to prepare recipe query")?;

    let recipes = stmt
        .query_map([], |row| {
            Ok(Recipe {
                id: row.get(0)?,
                name: row.get(1)?,
                ingredient: row.get(2)?,
                image: row.get(3)?,
            })
        })
        .context("failed to load recipes")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect recipes")?;

    Ok(recipes)
}

/// Look up a single recipe by id. Absent ids resolve to `None` rather than an
/// error; the detail screen treats that as "nothing to show".
pub fn fetch_recipe(conn: &Connection, id: i64) -> Result<Option<Recipe>> {
    conn.query_row(
        "SELECT id, name, ingredient, image FROM recipes WHERE id = ?1",
        params![id],
        |row| {
            Ok(Recipe {
                id: row.get(0)?,
                name: row.get(1)?,
                ingredient: row.get(2)?,
                image: row.get(3)?,
            })
        },
    )
    .optional()
    .context("failed to load recipe")
}

/// Insert a draft, returning the hydrated struct so the caller can hand it
/// straight to whoever needs the assigned id. Empty names and ingredients are
/// stored as-is; there is deliberately no validation here.
pub fn insert_recipe(conn: &Connection, draft: &RecipeDraft) -> Result<Recipe> {
    conn.execute(
        "INSERT INTO recipes (name, ingredient, image) VALUES (?1, ?2, ?3)",
        params![draft.name, draft.ingredient, draft.image],
    )
    .context("failed to insert recipe")?;

    let id = conn.last_insert_rowid();
    Ok(Recipe {
        id,
        name: draft.name.clone(),
        ingredient: draft.ingredient.clone(),
        image: draft.image.clone(),
    })
}

/// Remove a recipe row. Returns whether a row was actually removed; deleting
/// an id that is already gone is a quiet no-op, not an error.
pub fn delete_recipe(conn: &Connection, id: i64) -> Result<bool> {
    let deleted = conn
        .execute("DELETE FROM recipes WHERE id = ?1", params![id])
        .context("failed to delete recipe")?;

    Ok(deleted > 0)
}
