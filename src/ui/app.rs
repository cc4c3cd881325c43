use std::mem;
use std::path::Path;
use std::sync::mpsc::{Receiver, TryRecvError};

use anyhow::{anyhow, Result};
use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use tracing::{debug, trace, warn};

use crate::db::{StoreEvent, StoreHandle, StoreReply};
use crate::picker::{self, PickError};

use super::forms::{ImagePathForm, RecipeField};
use super::helpers::{centered_rect, image_preview_lines, surface_error};
use super::screens::{DetailRequest, DetailScreen, DetailState, ListScreen};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Rows taken by the name and ingredient inputs, including their border.
const FIELDS_HEIGHT: u16 = 4;

/// High-level navigation states. Keeping this explicit makes it easy to reason
/// about which rendering path runs and what keyboard shortcuts should do.
enum Screen {
    List(ListScreen),
    Detail(DetailScreen),
}

/// Fine-grained modes scoped to the current screen.
enum Mode {
    Normal,
    PickingImage(ImagePathForm),
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI.
pub struct App {
    handle: StoreHandle,
    events: Receiver<StoreEvent>,
    screen: Screen,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl App {
    /// Build the initial state and request the first list load.
    pub fn new(handle: StoreHandle, events: Receiver<StoreEvent>) -> Result<Self> {
        let list = ListScreen::open(&handle)?;
        Ok(Self {
            handle,
            events,
            screen: Screen::List(list),
            mode: Mode::Normal,
            status: None,
        })
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mut mode = mem::replace(&mut self.mode, Mode::Normal);

        mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::PickingImage(form) => self.handle_pick_image(code, form)?,
        };

        self.mode = mode;
        Ok(exit)
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match self.screen {
            Screen::List(ref mut list) => {
                let mut open_request: Option<DetailRequest> = None;
                let mut missing_selection = false;

                match code {
                    KeyCode::Char('q') | KeyCode::Esc => {
                        *exit = true;
                    }
                    KeyCode::Up => list.move_selection(-1),
                    KeyCode::Down => list.move_selection(1),
                    KeyCode::PageUp => list.move_selection(-5),
                    KeyCode::PageDown => list.move_selection(5),
                    KeyCode::Home => list.select_first(),
                    KeyCode::End => list.select_last(),
                    KeyCode::Enter => {
                        if let Some(recipe) = list.current_recipe() {
                            open_request = Some(DetailRequest::open(recipe.id));
                        } else {
                            missing_selection = true;
                        }
                    }
                    KeyCode::Char('n') | KeyCode::Char('+') => {
                        open_request = Some(DetailRequest::create());
                    }
                    _ => {}
                }

                if let Some(request) = open_request {
                    self.clear_status();
                    self.open_detail(&request)?;
                } else if missing_selection {
                    self.set_status("No recipe selected.", StatusKind::Error);
                }
                Ok(Mode::Normal)
            }
            Screen::Detail(ref mut detail) => {
                let mut back_to_list = false;

                match code {
                    KeyCode::Esc => {
                        back_to_list = true;
                    }
                    KeyCode::Tab | KeyCode::BackTab => {
                        if detail.editable() {
                            detail.fields.toggle_field();
                        }
                    }
                    KeyCode::Backspace => {
                        if detail.editable() {
                            detail.fields.backspace();
                        }
                    }
                    KeyCode::Char(ch) => {
                        if detail.editable() {
                            detail.fields.push_char(ch);
                        }
                    }
                    _ => {}
                }

                if back_to_list {
                    self.clear_status();
                    self.open_list()?;
                }
                Ok(Mode::Normal)
            }
        }
    }

    fn handle_pick_image(&mut self, code: KeyCode, mut form: ImagePathForm) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                self.set_status("Image selection cancelled.", StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match form.parse_input() {
                Ok(path) => {
                    keep_open = false;
                    self.apply_picked_image(&path);
                }
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        if keep_open {
            Ok(Mode::PickingImage(form))
        } else {
            Ok(Mode::Normal)
        }
    }

    /// Run the actual pick once the modal closes. Denied access is surfaced in
    /// the footer; any other failure is logged and the screen keeps whatever
    /// image it already had.
    fn apply_picked_image(&mut self, path: &Path) {
        match picker::pick_image(path) {
            Ok(image) => {
                if let Screen::Detail(detail) = &mut self.screen {
                    detail.set_image(image);
                }
                self.clear_status();
            }
            Err(PickError::PermissionDenied { .. }) => {
                self.set_status("No permission to read that image.", StatusKind::Error);
            }
            Err(err) => {
                warn!("image pick failed: {err}");
            }
        }
    }

    pub(crate) fn handle_ctrl_p(&mut self) -> Result<()> {
        if !matches!(self.mode, Mode::Normal) {
            return Ok(());
        }
        if let Screen::Detail(_) = self.screen {
            self.clear_status();
            self.mode = Mode::PickingImage(ImagePathForm::default());
        }
        Ok(())
    }

    pub(crate) fn handle_ctrl_s(&mut self) -> Result<()> {
        if !matches!(self.mode, Mode::Normal) {
            return Ok(());
        }

        let draft = match &self.screen {
            Screen::Detail(detail) => detail.draft()?,
            Screen::List(_) => None,
        };

        // No draft means there is nothing save should do: either the record
        // already exists or no image has been chosen yet.
        if let Some(draft) = draft {
            let ticket = self.handle.insert(draft)?;
            if let Screen::Detail(detail) = &mut self.screen {
                detail.subs.track(ticket);
            }
        }
        Ok(())
    }

    pub(crate) fn handle_ctrl_d(&mut self) -> Result<()> {
        if !matches!(self.mode, Mode::Normal) {
            return Ok(());
        }

        let target = match &self.screen {
            Screen::Detail(detail) => detail.deletable_recipe().cloned(),
            Screen::List(_) => None,
        };

        if let Some(recipe) = target {
            let ticket = self.handle.delete(&recipe)?;
            if let Screen::Detail(detail) = &mut self.screen {
                detail.subs.track(ticket);
            }
        }
        Ok(())
    }

    /// Deliver every store reply that has arrived since the last frame.
    pub(crate) fn drain_store_events(&mut self) -> Result<()> {
        loop {
            let event = match self.events.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => return Ok(()),
                Err(TryRecvError::Disconnected) => {
                    return Err(anyhow!("store workers stopped unexpectedly"));
                }
            };
            self.on_store_event(event)?;
        }
    }

    fn on_store_event(&mut self, event: StoreEvent) -> Result<()> {
        let claimed = match &mut self.screen {
            Screen::List(list) => list.subs.claim(event.ticket),
            Screen::Detail(detail) => detail.subs.claim(event.ticket),
        };
        if !claimed {
            // The screen that submitted this job has been replaced.
            trace!("dropping store reply no screen is waiting for");
            return Ok(());
        }

        match event.outcome? {
            StoreReply::Recipes(recipes) => {
                if let Screen::List(list) = &mut self.screen {
                    list.set_recipes(recipes);
                }
            }
            StoreReply::Recipe(recipe) => {
                if let Screen::Detail(detail) = &mut self.screen {
                    detail.apply_fetch(recipe)?;
                }
            }
            StoreReply::Inserted(recipe) => {
                debug!("saved recipe {}", recipe.id);
                self.open_list()?;
                self.set_status(format!("Saved {}.", recipe.display_name()), StatusKind::Info);
            }
            StoreReply::Deleted(removed) => {
                debug!("delete finished (removed: {removed})");
                self.open_list()?;
                self.set_status("Recipe deleted.", StatusKind::Info);
            }
        }
        Ok(())
    }

    fn open_list(&mut self) -> Result<()> {
        self.screen = Screen::List(ListScreen::open(&self.handle)?);
        Ok(())
    }

    fn open_detail(&mut self, request: &DetailRequest) -> Result<()> {
        self.screen = Screen::Detail(DetailScreen::open(request, &self.handle)?);
        Ok(())
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let footer_height = FOOTER_HEIGHT.min(area.height);

        let (content_area, footer_area) = if area.height > footer_height {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(footer_height)])
                .split(area);
            (chunks[0], chunks[1])
        } else {
            (area, area)
        };

        match &self.screen {
            Screen::List(list) => self.draw_list(frame, content_area, list),
            Screen::Detail(detail) => self.draw_detail(frame, content_area, detail),
        }

        if area.height >= footer_height {
            self.draw_footer(frame, footer_area);
        }

        match &self.mode {
            Mode::PickingImage(form) => self.draw_path_form(frame, area, form),
            Mode::Normal => {}
        }
    }

    fn draw_list(&self, frame: &mut Frame, area: Rect, list: &ListScreen) {
        let block = Block::default().borders(Borders::ALL).title("Recipes");

        if list.loading {
            let message = Paragraph::new("Loading recipes...")
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(message, area);
            return;
        }

        if list.recipes.is_empty() {
            let message = Paragraph::new("No recipes yet. Press 'n' to add one.")
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(message, area);
            return;
        }

        let items: Vec<ListItem> = list
            .recipes
            .iter()
            .map(|recipe| ListItem::new(recipe.display_name()))
            .collect();
        let mut state = ListState::default();
        state.select(Some(list.selected));

        let widget = List::new(items)
            .block(block)
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▶ ");
        frame.render_stateful_widget(widget, area, &mut state);
    }

    fn draw_detail(&self, frame: &mut Frame, area: Rect, detail: &DetailScreen) {
        let fields_height = FIELDS_HEIGHT.min(area.height);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(fields_height), Constraint::Min(0)])
            .split(area);

        let title = match detail.state {
            DetailState::New => "New Recipe",
            _ => "Recipe",
        };
        let block = Block::default().borders(Borders::ALL).title(title);
        frame.render_widget(block.clone(), chunks[0]);
        let fields_inner = block.inner(chunks[0]);

        let name_line = detail.fields.build_line("Name", RecipeField::Name);
        let ingredient_line = detail.fields.build_line("Ingredients", RecipeField::Ingredient);
        let fields = Paragraph::new(vec![name_line, ingredient_line]).wrap(Wrap { trim: true });
        frame.render_widget(fields, fields_inner);

        self.draw_image_panel(frame, chunks[1], detail);

        if detail.editable() && matches!(self.mode, Mode::Normal) {
            let (cursor_x, cursor_y) = match detail.fields.active {
                RecipeField::Name => {
                    let prefix = "Name: ".len() as u16;
                    (
                        fields_inner.x + prefix + detail.fields.value_len(RecipeField::Name) as u16,
                        fields_inner.y,
                    )
                }
                RecipeField::Ingredient => {
                    let prefix = "Ingredients: ".len() as u16;
                    (
                        fields_inner.x
                            + prefix
                            + detail.fields.value_len(RecipeField::Ingredient) as u16,
                        fields_inner.y + 1,
                    )
                }
            };
            frame.set_cursor_position((cursor_x, cursor_y));
        }
    }

    fn draw_image_panel(&self, frame: &mut Frame, area: Rect, detail: &DetailScreen) {
        let block = Block::default().borders(Borders::ALL).title("Image");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        match &detail.image {
            Some(image) if inner.width > 0 && inner.height > 0 => {
                let lines = image_preview_lines(image, inner.width, inner.height);
                let preview = Paragraph::new(lines).alignment(Alignment::Center);
                frame.render_widget(preview, inner);
            }
            _ => {
                let placeholder = match detail.state {
                    DetailState::Loading { .. } => "Loading recipe...",
                    _ => "No image yet. Press Ctrl+P to pick one.",
                };
                let message = Paragraph::new(placeholder).alignment(Alignment::Center);
                frame.render_widget(message, inner);
            }
        }
    }

    fn draw_path_form(&self, frame: &mut Frame, area: Rect, form: &ImagePathForm) {
        let popup_area = centered_rect(70, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Select Image").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![form.build_line(), Line::from("")];

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to load • Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);

        let cursor_x = inner.x + "Path: ".len() as u16 + form.value_len() as u16;
        frame.set_cursor_position((cursor_x, inner.y));
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let instructions = self.footer_instructions();

        let paragraph = Paragraph::new(vec![status_line, instructions]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        match (&self.screen, &self.mode) {
            (_, Mode::PickingImage(_)) => Line::from(vec![
                Span::styled("[Enter]", key_style),
                Span::raw(" Load   "),
                Span::styled("[Esc]", key_style),
                Span::raw(" Cancel"),
            ]),
            (Screen::Detail(detail), _) => {
                if detail.editable() {
                    Line::from(vec![
                        Span::styled("[Tab]", key_style),
                        Span::raw(" Switch Field   "),
                        Span::styled("[Ctrl+P]", key_style),
                        Span::raw(" Pick Image   "),
                        Span::styled("[Ctrl+S]", key_style),
                        Span::raw(" Save   "),
                        Span::styled("[Esc]", key_style),
                        Span::raw(" Back"),
                    ])
                } else {
                    Line::from(vec![
                        Span::styled("[Ctrl+D]", key_style),
                        Span::raw(" Delete   "),
                        Span::styled("[Esc]", key_style),
                        Span::raw(" Back"),
                    ])
                }
            }
            (Screen::List(_), _) => Line::from(vec![
                Span::styled("[↑↓]", key_style),
                Span::raw(" Select   "),
                Span::styled("[Enter]", key_style),
                Span::raw(" Open   "),
                Span::styled("[n]", key_style),
                Span::raw(" New   "),
                Span::styled("[q]", key_style),
                Span::raw(" Quit"),
            ]),
        }
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }
}
