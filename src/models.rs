//! Domain models that mirror the SQLite schema and get passed throughout the
//! TUI. The intent is that these types stay light-weight data holders so other
//! layers can focus on presentation and persistence logic. A recipe is only
//! ever created or deleted, never edited in place, so nothing here supports
//! partial mutation.

use std::fmt;

/// Identity carried by navigation when no persisted record is targeted. New
/// recipes travel with this sentinel until the store assigns a real id.
pub const NO_RECIPE_ID: i64 = -1;

#[derive(Debug, Clone)]
/// A persisted recipe as read back from the store. The image travels with the
/// record because the detail screen needs the bytes to rebuild its preview.
pub struct Recipe {
    /// Primary key from the database. The list screen bubbles this id back to
    /// the detail screen so it can fetch the full record on its own.
    pub id: i64,
    /// Display name shown in the list. Empty names are stored as-is; display
    /// code substitutes a placeholder instead of rejecting them.
    pub name: String,
    /// Free-text ingredient field. One blob of text, not a structured list.
    pub ingredient: String,
    /// PNG-encoded bytes of the downscaled image, exactly as stored.
    pub image: Vec<u8>,
}

impl Recipe {
    /// Name suitable for list rows, substituting a placeholder when the stored
    /// name is blank so the row stays selectable.
    pub fn display_name(&self) -> String {
        if self.name.trim().is_empty() {
            String::from("(untitled)")
        } else {
            self.name.clone()
        }
    }
}

impl fmt::Display for Recipe {
    /// Write the display name to any formatter so the type plays nicely with
    /// Ratatui widgets that consume strings implicitly.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[derive(Debug, Clone)]
/// A recipe without identity: what the detail screen hands to the store on
/// save. The store assigns the id and echoes back a full [`Recipe`].
pub struct RecipeDraft {
    /// Name taken from the form as-is; empty is accepted.
    pub name: String,
    /// Ingredient text taken from the form as-is; empty is accepted.
    pub ingredient: String,
    /// PNG-encoded bytes of the already-downscaled image.
    pub image: Vec<u8>,
}
