use anyhow::{Context, Result};
use image::DynamicImage;
use tracing::debug;

use crate::db::{StoreHandle, Subscriptions};
use crate::imaging;
use crate::models::{Recipe, RecipeDraft, NO_RECIPE_ID};

use super::forms::RecipeFields;

/// Flag value that opens the detail screen as a blank draft.
pub(crate) const MODE_NEW: &str = "new";
/// Flag value that opens the detail screen on a stored record.
pub(crate) const MODE_OLD: &str = "old";

/// Navigation arguments for the detail screen: a textual mode flag plus the
/// record id it applies to (`NO_RECIPE_ID` when there is none).
pub(crate) struct DetailRequest {
    pub(crate) mode_flag: String,
    pub(crate) recipe_id: i64,
}

impl DetailRequest {
    /// Arguments for drafting a brand new recipe.
    pub(crate) fn create() -> Self {
        Self {
            mode_flag: MODE_NEW.to_string(),
            recipe_id: NO_RECIPE_ID,
        }
    }

    /// Arguments for viewing the recipe with the given id.
    pub(crate) fn open(id: i64) -> Self {
        Self {
            mode_flag: MODE_OLD.to_string(),
            recipe_id: id,
        }
    }
}

/// How the detail screen was entered. Decided once from the navigation
/// arguments; nothing afterwards moves a screen between the two.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum EditMode {
    New,
    Old,
}

impl EditMode {
    /// Any flag other than [`MODE_NEW`] opens an existing record.
    pub(crate) fn from_flag(flag: &str) -> Self {
        if flag == MODE_NEW {
            EditMode::New
        } else {
            EditMode::Old
        }
    }
}

/// Backing state for the recipe list screen.
pub(crate) struct ListScreen {
    pub(crate) recipes: Vec<Recipe>,
    pub(crate) selected: usize,
    pub(crate) loading: bool,
    pub(crate) subs: Subscriptions,
}

impl ListScreen {
    /// Construct the screen and immediately request the full recipe set.
    pub(crate) fn open(handle: &StoreHandle) -> Result<Self> {
        let mut screen = Self {
            recipes: Vec::new(),
            selected: 0,
            loading: true,
            subs: Subscriptions::default(),
        };
        screen.reload(handle)?;
        Ok(screen)
    }

    /// Request a fresh copy of every recipe. Replies to anything requested
    /// earlier are dropped once this runs.
    pub(crate) fn reload(&mut self, handle: &StoreHandle) -> Result<()> {
        self.subs.clear();
        let ticket = handle.fetch_all()?;
        self.subs.track(ticket);
        self.loading = true;
        Ok(())
    }

    /// Replace the displayed rows with a fetch result. Rows are never merged;
    /// every load is wholesale.
    pub(crate) fn set_recipes(&mut self, recipes: Vec<Recipe>) {
        self.recipes = recipes;
        self.loading = false;
        self.ensure_in_bounds();
    }

    pub(crate) fn current_recipe(&self) -> Option<&Recipe> {
        self.recipes.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        if self.recipes.is_empty() {
            return;
        }
        let len = self.recipes.len() as isize;
        let mut new = self.selected as isize + offset;
        if new < 0 {
            new = 0;
        }
        if new >= len {
            new = len - 1;
        }
        self.selected = new as usize;
    }

    pub(crate) fn select_first(&mut self) {
        if !self.recipes.is_empty() {
            self.selected = 0;
        }
    }

    pub(crate) fn select_last(&mut self) {
        if !self.recipes.is_empty() {
            self.selected = self.recipes.len() - 1;
        }
    }

    fn ensure_in_bounds(&mut self) {
        if self.recipes.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.recipes.len() {
            self.selected = self.recipes.len() - 1;
        }
    }
}

/// Load state for an opened record.
pub(crate) enum DetailState {
    /// Drafting from scratch; nothing persisted yet.
    New,
    /// Waiting for the fetch of the carried id to come back.
    Loading { id: i64 },
    /// The fetched record. Display only, apart from delete.
    Existing(Recipe),
}

/// Backing state for the recipe detail screen.
pub(crate) struct DetailScreen {
    pub(crate) state: DetailState,
    pub(crate) fields: RecipeFields,
    pub(crate) image: Option<DynamicImage>,
    pub(crate) subs: Subscriptions,
}

impl DetailScreen {
    /// Construct the screen from navigation arguments. Opening an existing
    /// record issues its fetch immediately; the screen stays blank until the
    /// reply lands.
    pub(crate) fn open(request: &DetailRequest, handle: &StoreHandle) -> Result<Self> {
        match EditMode::from_flag(&request.mode_flag) {
            EditMode::New => Ok(Self::new_draft()),
            EditMode::Old => {
                let mut screen = Self {
                    state: DetailState::Loading {
                        id: request.recipe_id,
                    },
                    fields: RecipeFields::default(),
                    image: None,
                    subs: Subscriptions::default(),
                };
                let ticket = handle.fetch_by_id(request.recipe_id)?;
                screen.subs.track(ticket);
                Ok(screen)
            }
        }
    }

    /// A blank draft with nothing requested from the store.
    pub(crate) fn new_draft() -> Self {
        Self {
            state: DetailState::New,
            fields: RecipeFields::default(),
            image: None,
            subs: Subscriptions::default(),
        }
    }

    /// Whether typing currently edits the fields. Only drafts are editable;
    /// a stored record is shown as-is.
    pub(crate) fn editable(&self) -> bool {
        matches!(self.state, DetailState::New)
    }

    /// Whether save currently does anything: a draft with an image chosen.
    pub(crate) fn can_save(&self) -> bool {
        matches!(self.state, DetailState::New) && self.image.is_some()
    }

    /// The record delete would remove, if one has been loaded.
    pub(crate) fn deletable_recipe(&self) -> Option<&Recipe> {
        match &self.state {
            DetailState::Existing(recipe) => Some(recipe),
            _ => None,
        }
    }

    /// Apply the reply to the fetch issued at construction. A missing record
    /// leaves the screen blank, with delete still inert.
    pub(crate) fn apply_fetch(&mut self, recipe: Option<Recipe>) -> Result<()> {
        match recipe {
            Some(recipe) => {
                let decoded = imaging::decode_image(&recipe.image)
                    .context("stored recipe image could not be decoded")?;
                self.fields = RecipeFields::from_recipe(&recipe);
                self.image = Some(decoded);
                self.state = DetailState::Existing(recipe);
            }
            None => {
                if let DetailState::Loading { id } = self.state {
                    debug!("recipe {id} is no longer stored; screen stays blank");
                }
            }
        }
        Ok(())
    }

    /// Attach a freshly picked image to the draft.
    pub(crate) fn set_image(&mut self, image: DynamicImage) {
        self.image = Some(image);
    }

    /// Build the record to persist, downscaling and encoding the chosen
    /// image. Returns `None` when save should do nothing, either because the
    /// record already exists or because no image has been chosen yet.
    pub(crate) fn draft(&self) -> Result<Option<RecipeDraft>> {
        if !self.can_save() {
            return Ok(None);
        }
        let image = match &self.image {
            Some(image) => image,
            None => return Ok(None),
        };
        let bytes =
            imaging::encode_for_storage(image).context("chosen image could not be encoded")?;
        Ok(Some(RecipeDraft {
            name: self.fields.name.clone(),
            ingredient: self.fields.ingredient.clone(),
            image: bytes,
        }))
    }
}

#[cfg(test)]
mod tests {
    use image::{GenericImageView, Rgba, RgbaImage};

    use super::*;

    fn solid_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([200, 60, 60, 255]),
        ))
    }

    fn sample_recipe(id: i64) -> Recipe {
        Recipe {
            id,
            name: String::from("Pasta"),
            ingredient: String::from("Tomato, Basil"),
            image: imaging::encode_for_storage(&solid_image(200, 100)).unwrap(),
        }
    }

    #[test]
    fn test_mode_flag_parsing_defaults_to_old() {
        assert_eq!(EditMode::from_flag(MODE_NEW), EditMode::New);
        assert_eq!(EditMode::from_flag(MODE_OLD), EditMode::Old);
        assert_eq!(EditMode::from_flag("anything-else"), EditMode::Old);
    }

    #[test]
    fn test_navigation_requests_carry_flag_and_id() {
        let request = DetailRequest::create();
        assert_eq!(request.mode_flag, MODE_NEW);
        assert_eq!(request.recipe_id, NO_RECIPE_ID);

        let request = DetailRequest::open(7);
        assert_eq!(request.mode_flag, MODE_OLD);
        assert_eq!(request.recipe_id, 7);
    }

    #[test]
    fn test_new_draft_starts_blank_with_delete_inert() {
        let screen = DetailScreen::new_draft();
        assert!(screen.editable());
        assert!(!screen.can_save());
        assert!(screen.deletable_recipe().is_none());
        assert!(screen.fields.name.is_empty());
        assert!(screen.fields.ingredient.is_empty());
    }

    #[test]
    fn test_draft_becomes_saveable_once_an_image_is_chosen() {
        let mut screen = DetailScreen::new_draft();
        assert!(screen.draft().unwrap().is_none());

        screen.set_image(solid_image(200, 100));
        assert!(screen.can_save());

        let draft = screen.draft().unwrap().unwrap();
        let decoded = imaging::decode_image(&draft.image).unwrap();
        assert_eq!(decoded.dimensions(), (300, 150));
    }

    #[test]
    fn test_applying_a_fetch_locks_the_screen() {
        let mut screen = DetailScreen::new_draft();
        screen.state = DetailState::Loading { id: 3 };
        screen.apply_fetch(Some(sample_recipe(3))).unwrap();

        assert!(!screen.editable());
        assert!(!screen.can_save());
        assert_eq!(screen.fields.name, "Pasta");
        assert_eq!(screen.fields.ingredient, "Tomato, Basil");
        assert!(screen.image.is_some());
        assert_eq!(screen.deletable_recipe().map(|recipe| recipe.id), Some(3));

        // Even with an image present, a loaded record is never re-saved.
        assert!(screen.draft().unwrap().is_none());
    }

    #[test]
    fn test_fetch_miss_leaves_the_screen_blank() {
        let mut screen = DetailScreen::new_draft();
        screen.state = DetailState::Loading { id: 99 };
        screen.apply_fetch(None).unwrap();

        assert!(screen.deletable_recipe().is_none());
        assert!(screen.fields.name.is_empty());
        assert!(screen.image.is_none());
    }

    #[test]
    fn test_corrupt_stored_image_is_an_error() {
        let mut screen = DetailScreen::new_draft();
        screen.state = DetailState::Loading { id: 4 };
        let mut recipe = sample_recipe(4);
        recipe.image = b"not a png".to_vec();

        assert!(screen.apply_fetch(Some(recipe)).is_err());
    }

    #[test]
    fn test_list_selection_stays_in_bounds() {
        let mut screen = ListScreen {
            recipes: Vec::new(),
            selected: 0,
            loading: false,
            subs: Subscriptions::default(),
        };
        screen.move_selection(-1);
        assert_eq!(screen.selected, 0);

        screen.set_recipes(vec![sample_recipe(1), sample_recipe(2), sample_recipe(3)]);
        screen.move_selection(10);
        assert_eq!(screen.selected, 2);
        screen.move_selection(-1);
        assert_eq!(screen.selected, 1);
        screen.select_first();
        assert_eq!(screen.selected, 0);
        screen.select_last();
        assert_eq!(screen.selected, 2);
    }

    #[test]
    fn test_list_loads_replace_rows_wholesale() {
        let mut screen = ListScreen {
            recipes: vec![sample_recipe(1), sample_recipe(2), sample_recipe(3)],
            selected: 2,
            loading: false,
            subs: Subscriptions::default(),
        };
        screen.set_recipes(vec![sample_recipe(5)]);

        assert_eq!(screen.recipes.len(), 1);
        assert_eq!(screen.recipes[0].id, 5);
        assert_eq!(screen.selected, 0);
        assert!(screen.current_recipe().is_some());
    }
}
