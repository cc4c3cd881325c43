use std::path::PathBuf;

use anyhow::{anyhow, Result};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::models::Recipe;
use crate::picker::expand_home;

/// Internal representation of the detail screen's text fields.
#[derive(Default, Clone)]
pub(crate) struct RecipeFields {
    pub(crate) name: String,
    pub(crate) ingredient: String,
    pub(crate) active: RecipeField,
}

/// Fields available on the detail screen.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum RecipeField {
    Name,
    Ingredient,
}

impl Default for RecipeField {
    fn default() -> Self {
        RecipeField::Name
    }
}

impl RecipeFields {
    /// Populate the fields from a fetched record. Blank values stay blank;
    /// nothing here second-guesses what was stored.
    pub(crate) fn from_recipe(recipe: &Recipe) -> Self {
        Self {
            name: recipe.name.clone(),
            ingredient: recipe.ingredient.clone(),
            active: RecipeField::Name,
        }
    }

    /// Swap focus between the name and ingredient fields.
    pub(crate) fn toggle_field(&mut self) {
        self.active = match self.active {
            RecipeField::Name => RecipeField::Ingredient,
            RecipeField::Ingredient => RecipeField::Name,
        };
    }

    /// Append a character to the active field. Both fields are free text, so
    /// only control characters are rejected.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.active {
            RecipeField::Name => self.name.push(ch),
            RecipeField::Ingredient => self.ingredient.push(ch),
        }
        true
    }

    /// Remove the last character from the active field.
    pub(crate) fn backspace(&mut self) {
        match self.active {
            RecipeField::Name => {
                self.name.pop();
            }
            RecipeField::Ingredient => {
                self.ingredient.pop();
            }
        }
    }

    /// Render a single line for the fields widget.
    pub(crate) fn build_line(&self, field_name: &str, field: RecipeField) -> Line<'static> {
        let (value, is_active) = match field {
            RecipeField::Name => (&self.name, self.active == RecipeField::Name),
            RecipeField::Ingredient => (&self.ingredient, self.active == RecipeField::Ingredient),
        };

        let display = if value.is_empty() {
            "<optional>".to_string()
        } else {
            value.clone()
        };

        let style = if is_active {
            Style::default().fg(Color::Yellow)
        } else if value.is_empty() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        Line::from(vec![
            Span::raw(format!("{field_name}: ")),
            Span::styled(display, style),
        ])
    }

    /// Return the character count for the requested field.
    pub(crate) fn value_len(&self, field: RecipeField) -> usize {
        match field {
            RecipeField::Name => self.name.chars().count(),
            RecipeField::Ingredient => self.ingredient.chars().count(),
        }
    }
}

/// Form state for the image picker modal: a single path input.
#[derive(Default, Clone)]
pub(crate) struct ImagePathForm {
    pub(crate) path: String,
    pub(crate) error: Option<String>,
}

impl ImagePathForm {
    /// Append a character to the path input.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        self.path.push(ch);
        true
    }

    /// Remove the last character from the path input.
    pub(crate) fn backspace(&mut self) {
        self.path.pop();
    }

    /// Validate the input and return the path ready for the picker, with `~`
    /// expanded to the home directory.
    pub(crate) fn parse_input(&self) -> Result<PathBuf> {
        let raw = self.path.trim();
        if raw.is_empty() {
            return Err(anyhow!("Image path is required."));
        }
        Ok(expand_home(raw))
    }

    /// Render the single input line for the modal.
    pub(crate) fn build_line(&self) -> Line<'static> {
        let display = if self.path.is_empty() {
            "<path to an image file>".to_string()
        } else {
            self.path.clone()
        };
        let style = if self.path.is_empty() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Yellow)
        };

        Line::from(vec![Span::raw("Path: "), Span::styled(display, style)])
    }

    /// Character count of the path input, for cursor placement.
    pub(crate) fn value_len(&self) -> usize {
        self.path.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_edit_the_active_field() {
        let mut fields = RecipeFields::default();
        assert!(fields.push_char('P'));
        assert!(fields.push_char('a'));
        fields.toggle_field();
        assert!(fields.push_char('T'));
        fields.backspace();

        assert_eq!(fields.name, "Pa");
        assert_eq!(fields.ingredient, "");
    }

    #[test]
    fn test_fields_reject_control_characters() {
        let mut fields = RecipeFields::default();
        assert!(!fields.push_char('\n'));
        assert_eq!(fields.name, "");
    }

    #[test]
    fn test_fields_populate_from_recipe() {
        let recipe = Recipe {
            id: 3,
            name: String::from("Pasta"),
            ingredient: String::from("Tomato"),
            image: Vec::new(),
        };
        let fields = RecipeFields::from_recipe(&recipe);
        assert_eq!(fields.name, "Pasta");
        assert_eq!(fields.ingredient, "Tomato");
        assert_eq!(fields.active, RecipeField::Name);
    }

    #[test]
    fn test_path_form_requires_input() {
        let form = ImagePathForm::default();
        assert!(form.parse_input().is_err());
    }

    #[test]
    fn test_path_form_expands_home() {
        let form = ImagePathForm {
            path: String::from("~/pasta.png"),
            error: None,
        };
        let parsed = form.parse_input().unwrap();
        assert!(!parsed.starts_with("~"));
        assert!(parsed.ends_with("pasta.png"));
    }
}
