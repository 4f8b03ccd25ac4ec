//! Terminal UI: sign-in screen and the flipbook dashboard.

use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::Context as _;
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{event, terminal};
use flipshelf_application::{
    AppContext, BookDraft, Bounds, ContextMenu, MenuItem, MenuTarget, MoveDestination,
    PendingAction, Target, WizardOutcome, template_draft,
};
use flipshelf_auth::AuthClient;
use flipshelf_core::{BookId, DEFAULT_FOLDER_NAME, FolderId, Session, Theme};
use flipshelf_engine::Engine;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, HighlightSpacing, List, ListItem, ListState, Paragraph, Row,
    Table, TableState, Wrap,
};
use unicode_width::UnicodeWidthStr;

mod auth_form;
mod wizard_panel;

use auth_form::{AuthForm, AuthMode};
use wizard_panel::{WizardAction, WizardPanel};

#[derive(Debug, Clone, PartialEq)]
pub enum UiExit {
    Quit,
    SignedIn(Session),
    SignedOut,
}

#[derive(Debug, Clone)]
pub struct UiOutcome {
    pub ctx: AppContext,
    pub exit: UiExit,
}

const TICK_RATE: Duration = Duration::from_millis(100);
const TOAST_TTL: Duration = Duration::from_secs(3);

pub struct Ui {
    ctx: AppContext,
    auth: AuthClient,
    engine: Engine,
    auth_form: AuthForm,
    focus: Focus,
    folder_cursor: usize,
    folder_offset: usize,
    book_cursor: usize,
    book_offset: usize,
    context_menu: Option<ContextMenu>,
    name_panel: NamePanel,
    move_panel: MovePanel,
    wizard_panel: Option<WizardPanel>,
    toast: Option<Toast>,
    hit: HitAreas,
}

impl Ui {
    pub fn new(ctx: AppContext) -> Self {
        let auth = AuthClient::new(&ctx.settings.backend_url);
        Self {
            ctx,
            auth,
            engine: Engine::new(),
            auth_form: AuthForm::default(),
            focus: Focus::Books,
            folder_cursor: 0,
            folder_offset: 0,
            book_cursor: 0,
            book_offset: 0,
            context_menu: None,
            name_panel: NamePanel::default(),
            move_panel: MovePanel::default(),
            wizard_panel: None,
            toast: None,
            hit: HitAreas::default(),
        }
    }

    pub fn run(&mut self) -> anyhow::Result<UiOutcome> {
        let mut terminal = setup_terminal()?;
        terminal.clear().ok();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.event_loop(&mut terminal)
        }));
        let restore_result = restore_terminal(&mut terminal);

        match (result, restore_result) {
            (Ok(Ok(outcome)), Ok(())) => Ok(outcome),
            (Ok(Ok(_)), Err(err)) => Err(err),
            (Ok(Err(err)), _) => Err(err),
            (Err(panic), Ok(())) => Err(anyhow::anyhow!(panic_to_string(panic))),
            (Err(panic), Err(err)) => Err(anyhow::anyhow!(
                "{}\n(additionally failed to restore terminal: {err})",
                panic_to_string(panic)
            )),
        }
    }

    fn accent_color(&self) -> Color {
        match self.ctx.settings.theme {
            Theme::Light => Color::Blue,
            Theme::Dark => Color::Yellow,
        }
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ) -> anyhow::Result<UiOutcome> {
        let mut needs_redraw = true;

        loop {
            needs_redraw |= self.on_tick(Instant::now());
            if needs_redraw {
                terminal.draw(|frame| self.draw(frame.area(), frame))?;
                needs_redraw = false;
            }

            if !event::poll(TICK_RATE)? {
                continue;
            }

            let exit = match event::read()? {
                Event::Resize(_, _) => {
                    self.on_resize();
                    None
                }
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Release {
                        continue;
                    }
                    self.handle_key(key)?
                }
                Event::Mouse(mouse) => {
                    self.handle_mouse(mouse);
                    None
                }
                _ => continue,
            };
            needs_redraw = true;

            if let Some(exit) = exit {
                return Ok(UiOutcome {
                    ctx: self.ctx.clone(),
                    exit,
                });
            }
        }
    }

    /// Advances upload progress and expires toasts. Returns true when the
    /// screen changed.
    fn on_tick(&mut self, now: Instant) -> bool {
        let mut changed = false;
        if let Some(panel) = self.wizard_panel.as_mut() {
            changed |= panel.tick(now);
        }
        if self
            .toast
            .as_ref()
            .is_some_and(|t| now.duration_since(t.shown_at) >= TOAST_TTL)
        {
            self.toast = None;
            changed = true;
        }
        changed
    }

    fn on_resize(&mut self) {
        self.context_menu = None;
    }

    fn show_info(&mut self, message: impl Into<String>) {
        self.toast = Some(Toast::new(message.into(), ToastKind::Info));
    }

    fn show_error(&mut self, message: impl Into<String>) {
        self.toast = Some(Toast::new(message.into(), ToastKind::Error));
    }

    fn handle_key(&mut self, key: KeyEvent) -> anyhow::Result<Option<UiExit>> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Ok(Some(UiExit::Quit));
        }
        if !self.ctx.is_signed_in() {
            return Ok(self.handle_auth_key(key));
        }
        if self.wizard_panel.is_some() {
            self.handle_wizard_key(key);
            return Ok(None);
        }
        match self.ctx.library.pending() {
            Some(PendingAction::MoveBooks(_)) => {
                self.handle_move_panel_key(key);
                return Ok(None);
            }
            Some(_) => {
                self.handle_confirm_key(key);
                return Ok(None);
            }
            None => {}
        }
        if self.name_panel.open {
            self.handle_name_panel_key(key);
            return Ok(None);
        }
        if self.context_menu.is_some() {
            self.handle_menu_key(key);
            return Ok(None);
        }
        Ok(self.handle_dashboard_key(key))
    }

    fn handle_auth_key(&mut self, key: KeyEvent) -> Option<UiExit> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('t') => self.auth_form.toggle_mode(),
                KeyCode::Char('u') => self.auth_form.input_mut().clear(),
                _ => {}
            }
            return None;
        }

        match key.code {
            KeyCode::Esc => return Some(UiExit::Quit),
            KeyCode::Tab | KeyCode::Down => self.auth_form.next_field(),
            KeyCode::BackTab | KeyCode::Up => self.auth_form.prev_field(),
            KeyCode::Enter => return self.submit_auth(),
            KeyCode::Backspace => {
                self.auth_form.input_mut().pop();
            }
            KeyCode::Char(ch) => {
                if !ch.is_control() {
                    self.auth_form.input_mut().push(ch);
                }
            }
            _ => {}
        }
        None
    }

    fn submit_auth(&mut self) -> Option<UiExit> {
        let credentials = match self.auth_form.validate() {
            Ok(credentials) => credentials,
            Err(err) => {
                self.auth_form.error = Some(err.to_string());
                return None;
            }
        };
        self.auth_form.error = None;

        let result = match self.auth_form.mode {
            AuthMode::SignIn => self.auth.login(&credentials),
            AuthMode::SignUp => self.auth.signup(&credentials),
        };
        match result {
            Ok(session) => {
                self.auth_form = AuthForm::default();
                Some(UiExit::SignedIn(session))
            }
            Err(err) => {
                self.show_error(err.user_message());
                None
            }
        }
    }

    fn handle_wizard_key(&mut self, key: KeyEvent) {
        let Some(panel) = self.wizard_panel.as_mut() else {
            return;
        };
        match panel.handle_key(key, Instant::now()) {
            WizardAction::Stay => {}
            WizardAction::Close => self.wizard_panel = None,
            WizardAction::Submit(outcome) => {
                self.wizard_panel = None;
                self.apply_outcome(outcome);
            }
        }
    }

    fn apply_outcome(&mut self, outcome: WizardOutcome) {
        match outcome {
            WizardOutcome::Upload(paths) => {
                let mut added = 0;
                let mut skipped = 0;
                for path in paths {
                    match self.engine.inspect(&path) {
                        Ok(info) => {
                            self.ctx.library.add_book(BookDraft {
                                title: info.title,
                                pages: info.pages,
                                size: info.size,
                                image: None,
                            });
                            added += 1;
                        }
                        Err(err) => {
                            tracing::warn!(path = %path.display(), error = %format!("{err:#}"), "skipping unreadable pdf");
                            skipped += 1;
                        }
                    }
                }
                if skipped > 0 {
                    self.show_error(format!("Added {added}, skipped {skipped} unreadable PDF(s)"));
                } else {
                    self.show_info(format!("Added {added} flipbook(s)"));
                }
            }
            WizardOutcome::Template {
                template_id,
                page_count,
            } => {
                self.ctx
                    .library
                    .add_book(template_draft(&template_id, page_count));
                self.show_info("Flipbook created");
            }
        }
        self.focus = Focus::Books;
        self.book_cursor = 0;
    }

    fn handle_dashboard_key(&mut self, key: KeyEvent) -> Option<UiExit> {
        match key.code {
            KeyCode::Char('q') => return Some(UiExit::Quit),
            KeyCode::Esc => {
                if self.ctx.library.selection().is_empty() {
                    return Some(UiExit::Quit);
                }
                self.ctx.library.clear_selection();
            }
            KeyCode::Char('o') => return Some(UiExit::SignedOut),
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = match self.focus {
                    Focus::Folders => Focus::Books,
                    Focus::Books => Focus::Folders,
                };
            }
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1),
            KeyCode::Enter => match self.focus {
                Focus::Folders => self.activate_folder_at_cursor(),
                Focus::Books => self.open_menu_at_cursor(),
            },
            KeyCode::Char('m') => self.open_menu_at_cursor(),
            KeyCode::Char(' ') => {
                if let Some(id) = self.book_at_cursor() {
                    self.ctx.library.toggle_select(&id);
                }
            }
            KeyCode::Char('a') => self.ctx.library.select_all(),
            KeyCode::Char('n') => self.name_panel.open_for(NameMode::CreateFolder, String::new()),
            KeyCode::Char('c') => {
                self.wizard_panel = Some(WizardPanel::new(self.ctx.wizard()));
            }
            KeyCode::Char('r') => self.run_on_focused(MenuItem::Rename),
            KeyCode::Char('d') => self.run_on_focused(MenuItem::Duplicate),
            KeyCode::Char('x') | KeyCode::Delete => {
                if self.focus == Focus::Books && !self.ctx.library.selection().is_empty() {
                    if let Err(err) = self.ctx.library.request_delete_selected() {
                        self.show_error(err.to_string());
                    }
                } else {
                    self.run_on_focused(MenuItem::Delete);
                }
            }
            KeyCode::Char('v') => {
                if !self.ctx.library.selection().is_empty() {
                    match self.ctx.library.request_move_selected() {
                        Ok(()) => self.move_panel.reset(),
                        Err(err) => self.show_error(err.to_string()),
                    }
                } else if let Some(id) = self.book_at_cursor() {
                    self.run_menu_item(MenuTarget::Book(id), MenuItem::Move);
                }
            }
            KeyCode::Char('t') => self.ctx.settings.cycle_theme(),
            _ => {}
        }
        None
    }

    fn move_cursor(&mut self, delta: isize) {
        let (cursor, len) = match self.focus {
            Focus::Folders => (&mut self.folder_cursor, self.ctx.library.folders().len()),
            Focus::Books => (&mut self.book_cursor, self.ctx.library.visible_books().len()),
        };
        *cursor = step_cursor(*cursor, delta, len);
    }

    fn clamp_cursors(&mut self) {
        let folders = self.ctx.library.folders().len();
        self.folder_cursor = self.folder_cursor.min(folders.saturating_sub(1));
        let books = self.ctx.library.visible_books().len();
        self.book_cursor = self.book_cursor.min(books.saturating_sub(1));
    }

    fn folder_at_cursor(&self) -> Option<FolderId> {
        self.ctx
            .library
            .folders()
            .get(self.folder_cursor)
            .map(|f| f.id.clone())
    }

    fn book_at_cursor(&self) -> Option<BookId> {
        self.ctx
            .library
            .visible_books()
            .get(self.book_cursor)
            .map(|b| b.id.clone())
    }

    fn activate_folder_at_cursor(&mut self) {
        if let Some(id) = self.folder_at_cursor()
            && self.ctx.library.set_active_folder(&id).is_ok()
        {
            self.book_cursor = 0;
            self.book_offset = 0;
        }
    }

    fn focused_target(&self) -> Option<MenuTarget> {
        match self.focus {
            Focus::Folders => self.folder_at_cursor().map(MenuTarget::Folder),
            Focus::Books => self.book_at_cursor().map(MenuTarget::Book),
        }
    }

    fn run_on_focused(&mut self, item: MenuItem) {
        if let Some(target) = self.focused_target() {
            self.run_menu_item(target, item);
        }
    }

    fn open_menu_at_cursor(&mut self) {
        let Some(target) = self.focused_target() else {
            return;
        };
        let row = match &target {
            MenuTarget::Folder(id) => self.hit.folder_rows.iter().find(|(_, f)| f == id).map(|(r, _)| *r),
            MenuTarget::Book(id) => self.hit.book_rows.iter().find(|(_, b)| b == id).map(|(r, _)| *r),
        };
        let trigger = row.map(to_bounds).unwrap_or_default();
        self.open_menu(target, trigger);
    }

    fn open_menu(&mut self, target: MenuTarget, trigger: Bounds) {
        self.context_menu = Some(ContextMenu::open(target, trigger, self.hit.viewport.height));
    }

    fn handle_menu_key(&mut self, key: KeyEvent) {
        let Some(menu) = self.context_menu.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => menu.next(),
            KeyCode::Up | KeyCode::Char('k') => menu.prev(),
            KeyCode::Enter => {
                if let Some(menu) = self.context_menu.take() {
                    self.run_menu_item(menu.target.clone(), menu.selected_item());
                }
            }
            _ => self.context_menu = None,
        }
    }

    fn run_menu_item(&mut self, target: MenuTarget, item: MenuItem) {
        let library = &mut self.ctx.library;
        let result = match (&target, item) {
            (MenuTarget::Book(id), MenuItem::Rename) => {
                let title = library.book(id).map(|b| b.title.clone()).unwrap_or_default();
                self.name_panel.open_for(NameMode::RenameBook(id.clone()), title);
                Ok(())
            }
            (MenuTarget::Book(id), MenuItem::Duplicate) => library.duplicate_book(id).map(|_| {
                self.book_cursor = 0;
                self.toast = Some(Toast::new("Flipbook duplicated".to_string(), ToastKind::Info));
            }),
            (MenuTarget::Book(id), MenuItem::Move) => library
                .request_move_book(id)
                .map(|_| self.move_panel.reset()),
            (MenuTarget::Book(id), MenuItem::Delete) => library.request_delete_book(id),
            (MenuTarget::Folder(id), MenuItem::Rename) => {
                let name = library.folder(id).map(|f| f.name.clone()).unwrap_or_default();
                self.name_panel.open_for(NameMode::RenameFolder(id.clone()), name);
                Ok(())
            }
            (MenuTarget::Folder(id), MenuItem::Duplicate) => library.duplicate_folder(id).map(|_| {
                self.toast = Some(Toast::new("Folder duplicated".to_string(), ToastKind::Info));
            }),
            (MenuTarget::Folder(id), MenuItem::Delete) => library.request_delete_folder(id),
            (MenuTarget::Folder(_), MenuItem::Move) => Ok(()),
        };
        if let Err(err) = result {
            self.show_error(err.to_string());
        }
        self.clamp_cursors();
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                match self.ctx.library.confirm_delete() {
                    Ok(()) => self.show_info("Deleted"),
                    Err(err) => self.show_error(err.to_string()),
                }
                self.clamp_cursors();
            }
            KeyCode::Char('n') | KeyCode::Esc => self.ctx.library.cancel_pending(),
            _ => {}
        }
    }

    fn handle_move_panel_key(&mut self, key: KeyEvent) {
        let folder_count = self.ctx.library.folders().len();
        let on_new_row = self.move_panel.cursor >= folder_count;
        match key.code {
            KeyCode::Esc => {
                self.ctx.library.cancel_pending();
                self.move_panel.reset();
            }
            KeyCode::Up => self.move_panel.cursor = self.move_panel.cursor.saturating_sub(1),
            KeyCode::Down => {
                self.move_panel.cursor = (self.move_panel.cursor + 1).min(folder_count);
            }
            KeyCode::Enter => {
                let destination = if on_new_row {
                    MoveDestination::New(self.move_panel.input.clone())
                } else {
                    MoveDestination::Existing(
                        self.ctx.library.folders()[self.move_panel.cursor].id.clone(),
                    )
                };
                match self.ctx.library.confirm_move(destination) {
                    Ok(folder) => {
                        let name = self
                            .ctx
                            .library
                            .folder(&folder)
                            .map(|f| f.name.clone())
                            .unwrap_or_default();
                        self.move_panel.reset();
                        self.show_info(format!("Moved to {name}"));
                        self.clamp_cursors();
                    }
                    Err(err) => self.move_panel.error = Some(err.to_string()),
                }
            }
            KeyCode::Backspace if on_new_row => {
                self.move_panel.input.pop();
            }
            KeyCode::Char(ch) if on_new_row && !ch.is_control() => {
                self.move_panel.input.push(ch);
            }
            _ => {}
        }
    }

    fn handle_name_panel_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && let KeyCode::Char('u') = key.code
        {
            self.name_panel.input.clear();
            return;
        }

        match key.code {
            KeyCode::Esc => self.name_panel.close(),
            KeyCode::Enter => {
                let input = self.name_panel.input.clone();
                let library = &mut self.ctx.library;
                let applied = match &self.name_panel.mode {
                    NameMode::CreateFolder => match library.create_folder(&input) {
                        Ok(id) => {
                            self.folder_cursor = library
                                .folders()
                                .iter()
                                .position(|f| f.id == id)
                                .unwrap_or(0);
                            self.book_cursor = 0;
                            true
                        }
                        Err(_) => false,
                    },
                    NameMode::RenameFolder(id) => library.rename_folder(id, &input),
                    NameMode::RenameBook(id) => library.rename_book(id, &input),
                };
                if applied {
                    self.name_panel.close();
                } else {
                    self.name_panel.error = Some("Name cannot be empty".to_string());
                }
            }
            KeyCode::Backspace => {
                self.name_panel.input.pop();
            }
            KeyCode::Char(ch) => {
                if !ch.is_control() {
                    self.name_panel.input.push(ch);
                }
            }
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let modal_open = self.wizard_panel.is_some()
            || self.name_panel.open
            || self.ctx.library.pending().is_some();
        if !self.ctx.is_signed_in() || modal_open {
            return;
        }

        let (column, row) = (mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::ScrollDown | MouseEventKind::ScrollUp => {
                self.context_menu = None;
                let delta = if mouse.kind == MouseEventKind::ScrollDown { 1 } else { -1 };
                self.move_cursor(delta);
            }
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(menu_rect) = self.hit.menu {
                    let inside = to_bounds(menu_rect).contains(column, row);
                    let menu = self.context_menu.take();
                    if inside
                        && let Some(menu) = menu
                        && let Some(idx) = (row as usize).checked_sub(menu_rect.y as usize + 1)
                        && let Some(item) = menu.items().get(idx)
                    {
                        self.run_menu_item(menu.target.clone(), *item);
                    }
                    return;
                }
                if let Some(id) = self.folder_hit(column, row) {
                    self.focus = Focus::Folders;
                    self.folder_cursor = self.folder_index(&id);
                    self.activate_folder_at_cursor();
                } else if let Some((rect, id)) = self.book_hit(column, row) {
                    self.focus = Focus::Books;
                    self.book_cursor = self.book_index(&id);
                    if column < rect.x + CHECKBOX_WIDTH {
                        self.ctx.library.toggle_select(&id);
                    }
                }
            }
            MouseEventKind::Down(MouseButton::Right) => {
                let trigger = Bounds::new(column, row, 1, 1);
                if let Some(id) = self.folder_hit(column, row) {
                    self.focus = Focus::Folders;
                    self.folder_cursor = self.folder_index(&id);
                    self.open_menu(MenuTarget::Folder(id), trigger);
                } else if let Some((_, id)) = self.book_hit(column, row) {
                    self.focus = Focus::Books;
                    self.book_cursor = self.book_index(&id);
                    self.open_menu(MenuTarget::Book(id), trigger);
                } else {
                    self.context_menu = None;
                }
            }
            _ => {}
        }
    }

    fn folder_hit(&self, column: u16, row: u16) -> Option<FolderId> {
        self.hit
            .folder_rows
            .iter()
            .find(|(rect, _)| to_bounds(*rect).contains(column, row))
            .map(|(_, id)| id.clone())
    }

    fn book_hit(&self, column: u16, row: u16) -> Option<(Rect, BookId)> {
        self.hit
            .book_rows
            .iter()
            .find(|(rect, _)| to_bounds(*rect).contains(column, row))
            .cloned()
    }

    fn folder_index(&self, id: &FolderId) -> usize {
        self.ctx
            .library
            .folders()
            .iter()
            .position(|f| &f.id == id)
            .unwrap_or(0)
    }

    fn book_index(&self, id: &BookId) -> usize {
        self.ctx
            .library
            .visible_books()
            .iter()
            .position(|b| &b.id == id)
            .unwrap_or(0)
    }

    fn draw(&mut self, area: Rect, frame: &mut ratatui::Frame) {
        frame.render_widget(Clear, area);
        self.hit = HitAreas {
            viewport: area,
            ..HitAreas::default()
        };

        if !self.ctx.is_signed_in() {
            let banner = Paragraph::new(Line::styled(
                "Flipshelf",
                Style::default()
                    .fg(self.accent_color())
                    .add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Center);
            frame.render_widget(banner, Rect { height: 1, ..area });
            self.auth_form.draw(area, frame, self.accent_color());
            self.draw_toast(area, frame);
            return;
        }

        self.clamp_cursors();

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ])
            .split(area);

        let header = Paragraph::new(Text::from(self.main_header_lines()))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::BOTTOM));
        frame.render_widget(header, layout[0]);

        let body_layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
            .split(layout[1]);

        self.draw_folders(frame, body_layout[0]);
        self.draw_books(frame, body_layout[1]);

        let footer = Paragraph::new(Text::from(self.main_footer_lines()))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::TOP));
        frame.render_widget(footer, layout[2]);

        if self.context_menu.is_some() {
            self.draw_context_menu(area, frame);
        }
        if self.name_panel.open {
            self.draw_name_panel(area, frame);
        }
        match self.ctx.library.pending() {
            Some(PendingAction::MoveBooks(target)) => {
                self.draw_move_panel(target.clone(), area, frame)
            }
            Some(pending) => self.draw_confirm_panel(pending.clone(), area, frame),
            None => {}
        }
        if let Some(panel) = &self.wizard_panel {
            panel.draw(area, frame, self.accent_color());
        }
        self.draw_toast(area, frame);
    }

    fn main_header_lines(&self) -> Vec<Line<'static>> {
        let user = self
            .ctx
            .session
            .as_ref()
            .map(|s| s.display_name().to_string())
            .unwrap_or_default();
        vec![Line::from(vec![
            Span::styled(
                "Flipshelf",
                Style::default()
                    .fg(self.accent_color())
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  ·  "),
            Span::raw(user),
        ])]
    }

    fn main_footer_lines(&self) -> Vec<Line<'static>> {
        let key = |k: &'static str| Span::styled(k, Style::default().add_modifier(Modifier::BOLD));
        let mut spans = vec![
            key("c"),
            Span::raw(" create  "),
            key("n"),
            Span::raw(" new folder  "),
            key("r"),
            Span::raw(" rename  "),
            key("d"),
            Span::raw(" duplicate  "),
            key("x"),
            Span::raw(" delete  "),
        ];
        if self.focus == Focus::Books {
            spans.extend([
                key("Space"),
                Span::raw(" select  "),
                key("a"),
                Span::raw(" all  "),
                key("v"),
                Span::raw(" move  "),
            ]);
        }
        spans.extend([
            key("m"),
            Span::raw(" menu  "),
            key("Tab"),
            Span::raw(" focus  "),
            key("t"),
            Span::raw(" theme  "),
            key("o"),
            Span::raw(" sign out  "),
            key("q"),
            Span::raw(" quit"),
        ]);
        vec![Line::from(spans)]
    }

    fn draw_folders(&mut self, frame: &mut ratatui::Frame, area: Rect) {
        let focused = self.focus == Focus::Folders;
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style(focused, self.accent_color()))
            .title("Folders");
        let inner = block.inner(area);
        let rows = inner.height as usize;
        let library = &self.ctx.library;
        self.folder_offset = scroll_offset(self.folder_cursor, self.folder_offset, rows);

        let items: Vec<ListItem> = library
            .folders()
            .iter()
            .map(|folder| {
                let active = &folder.id == library.active_folder_id();
                let marker = if active { "● " } else { "  " };
                let style = if active {
                    Style::default().add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{marker}{}", folder.name), style),
                    Span::styled(
                        format!(" ({})", library.book_count(&folder.id)),
                        Style::default().fg(Color::Gray),
                    ),
                ]))
            })
            .collect();

        for (idx, folder) in library
            .folders()
            .iter()
            .enumerate()
            .skip(self.folder_offset)
            .take(rows)
        {
            let y = inner.y + (idx - self.folder_offset) as u16;
            self.hit
                .folder_rows
                .push((Rect::new(inner.x, y, inner.width, 1), folder.id.clone()));
        }

        let list = List::new(items)
            .block(block)
            .highlight_style(highlight_style(focused, self.accent_color()))
            .highlight_spacing(HighlightSpacing::Always)
            .highlight_symbol("> ");
        let mut state = ListState::default()
            .with_offset(self.folder_offset)
            .with_selected(Some(self.folder_cursor));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_books(&mut self, frame: &mut ratatui::Frame, area: Rect) {
        let focused = self.focus == Focus::Books;
        let view = self.ctx.library.view();
        let mut title = format!("{} — {} flipbook(s)", view.active.name, view.books.len());
        if !view.selected.is_empty() {
            title.push_str(&format!(" · {} selected", view.selected.len()));
        }
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style(focused, self.accent_color()))
            .title(title);

        if view.books.is_empty() {
            let lines = vec![
                Line::raw(format!("No flipbooks in {}.", view.active.name)),
                Line::raw(""),
                Line::raw("Press c to create one, or move flipbooks here with v."),
            ];
            frame.render_widget(
                Paragraph::new(Text::from(lines))
                    .block(block)
                    .wrap(Wrap { trim: true }),
                area,
            );
            return;
        }

        let inner = block.inner(area);
        let rows = (inner.height as usize).saturating_sub(1);
        let offset = scroll_offset(self.book_cursor, self.book_offset, rows);

        let header = Row::new(["", "Title", "Pages", "Created", "Size", "Views"])
            .style(Style::default().add_modifier(Modifier::BOLD));
        let mut hit_rows = Vec::new();
        let table_rows: Vec<Row> = view
            .books
            .iter()
            .enumerate()
            .map(|(idx, book)| {
                if idx >= offset && idx < offset + rows {
                    let y = inner.y + 1 + (idx - offset) as u16;
                    hit_rows.push((Rect::new(inner.x, y, inner.width, 1), book.id.clone()));
                }
                let checkbox = if view.selected.contains(&book.id) {
                    "[x]"
                } else {
                    "[ ]"
                };
                Row::new(vec![
                    Cell::from(checkbox),
                    Cell::from(book.title.clone()),
                    Cell::from(book.pages.to_string()),
                    Cell::from(book.created_label()),
                    Cell::from(format_bytes(book.size)),
                    Cell::from(book.views.to_string()),
                ])
            })
            .collect();

        let table = Table::new(
            table_rows,
            [
                Constraint::Length(CHECKBOX_WIDTH),
                Constraint::Min(10),
                Constraint::Length(6),
                Constraint::Length(11),
                Constraint::Length(9),
                Constraint::Length(6),
            ],
        )
        .header(header)
        .block(block)
        .row_highlight_style(highlight_style(focused, self.accent_color()));
        let mut state = TableState::default()
            .with_offset(offset)
            .with_selected(Some(self.book_cursor));
        frame.render_stateful_widget(table, area, &mut state);

        self.book_offset = offset;
        self.hit.book_rows = hit_rows;
    }

    fn draw_context_menu(&mut self, area: Rect, frame: &mut ratatui::Frame) {
        let Some(menu) = &self.context_menu else {
            return;
        };
        let width = menu
            .items()
            .iter()
            .map(|item| item.label().width() as u16)
            .max()
            .unwrap_or(0)
            + 6;
        let bounds = menu.bounds(width);
        let width = bounds.width.min(area.width);
        let height = bounds.height.min(area.height);
        let x = bounds.x.min(area.right().saturating_sub(width));
        let y = bounds.y.min(area.bottom().saturating_sub(height));
        let rect = Rect::new(x, y, width, height);

        let items: Vec<ListItem> = menu
            .items()
            .iter()
            .map(|item| {
                let style = if *item == MenuItem::Delete {
                    Style::default().fg(Color::Red)
                } else {
                    Style::default()
                };
                ListItem::new(Line::styled(item.label(), style))
            })
            .collect();
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL))
            .highlight_style(highlight_style(true, self.accent_color()))
            .highlight_symbol("> ");
        let mut state = ListState::default().with_selected(Some(menu.cursor));
        frame.render_widget(Clear, rect);
        frame.render_stateful_widget(list, rect, &mut state);
        self.hit.menu = Some(rect);
    }

    fn draw_name_panel(&self, area: Rect, frame: &mut ratatui::Frame) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let (title, prompt) = match self.name_panel.mode {
            NameMode::CreateFolder => ("New folder", "Folder: "),
            NameMode::RenameFolder(_) => ("Rename folder", "Folder: "),
            NameMode::RenameBook(_) => ("Rename flipbook", "Title: "),
        };
        let block = Block::default().borders(Borders::ALL).title(Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(block.clone(), popup_area);

        let inner = block.inner(popup_area);
        let mut lines = vec![
            Line::from(vec![
                Span::styled(prompt, Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(self.name_panel.input.clone()),
                Span::styled("▏", Style::default().fg(self.accent_color())),
            ]),
            Line::raw(""),
            Line::from(vec![
                Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" apply  "),
                Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" cancel  "),
                Span::styled("Ctrl+U", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" clear"),
            ]),
        ];
        if let Some(err) = &self.name_panel.error {
            lines.push(Line::raw(""));
            lines.push(Line::styled(
                err.clone(),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ));
        }
        frame.render_widget(
            Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true }),
            inner,
        );
    }

    fn draw_confirm_panel(&self, pending: PendingAction, area: Rect, frame: &mut ratatui::Frame) {
        let popup_area = centered_rect(50, 30, area);
        frame.render_widget(Clear, popup_area);

        let library = &self.ctx.library;
        let (title, message) = match &pending {
            PendingAction::DeleteFolder { name, .. } => (
                "Delete folder",
                format!("Delete folder “{name}”? Its flipbooks move to {DEFAULT_FOLDER_NAME}."),
            ),
            PendingAction::DeleteBooks(Target::Single(id)) => {
                let title = library.book(id).map(|b| b.title.as_str()).unwrap_or("this flipbook");
                ("Delete flipbook", format!("Delete “{title}”? This cannot be undone."))
            }
            PendingAction::DeleteBooks(Target::Bulk(ids)) => (
                "Delete flipbooks",
                format!("Delete {} flipbooks? This cannot be undone.", ids.len()),
            ),
            PendingAction::MoveBooks(_) => return,
        };

        let block = Block::default().borders(Borders::ALL).title(Span::styled(
            title,
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
        let lines = vec![
            Line::raw(message),
            Line::raw(""),
            Line::from(vec![
                Span::styled("y", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" delete  "),
                Span::styled("n", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" cancel"),
            ]),
        ];
        frame.render_widget(
            Paragraph::new(Text::from(lines))
                .block(block)
                .wrap(Wrap { trim: true }),
            popup_area,
        );
    }

    fn draw_move_panel(&self, target: Target, area: Rect, frame: &mut ratatui::Frame) {
        let popup_area = centered_rect(50, 60, area);
        frame.render_widget(Clear, popup_area);

        let title = match &target {
            Target::Single(_) => "Move flipbook".to_string(),
            Target::Bulk(ids) => format!("Move {} flipbooks", ids.len()),
        };
        let block = Block::default().borders(Borders::ALL).title(Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3)])
            .split(inner);

        let folders = self.ctx.library.folders();
        let mut items: Vec<ListItem> = folders
            .iter()
            .map(|f| ListItem::new(Line::raw(f.name.clone())))
            .collect();
        let new_row = if self.move_panel.cursor >= folders.len() {
            format!("+ New folder: {}▏", self.move_panel.input)
        } else {
            "+ New folder…".to_string()
        };
        items.push(ListItem::new(Line::styled(
            new_row,
            Style::default().add_modifier(Modifier::ITALIC),
        )));

        let list = List::new(items)
            .highlight_style(highlight_style(true, self.accent_color()))
            .highlight_symbol("> ");
        let mut state = ListState::default().with_selected(Some(self.move_panel.cursor));
        frame.render_stateful_widget(list, sections[0], &mut state);

        let mut help = vec![Line::from(vec![
            Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" move  "),
            Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" cancel"),
        ])];
        if let Some(err) = &self.move_panel.error {
            help.push(Line::styled(
                err.clone(),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ));
        }
        frame.render_widget(Paragraph::new(Text::from(help)), sections[1]);
    }

    fn draw_toast(&self, area: Rect, frame: &mut ratatui::Frame) {
        let Some(toast) = &self.toast else {
            return;
        };
        let width = u16::try_from(toast.message.width())
            .unwrap_or(u16::MAX)
            .saturating_add(4)
            .min(area.width);
        let rect = Rect::new(
            area.right().saturating_sub(width),
            area.bottom().saturating_sub(3),
            width,
            area.height.min(3),
        );
        let color = match toast.kind {
            ToastKind::Info => Color::Green,
            ToastKind::Error => Color::Red,
        };
        frame.render_widget(Clear, rect);
        frame.render_widget(
            Paragraph::new(toast.message.clone())
                .style(Style::default().fg(color))
                .block(Block::default().borders(Borders::ALL)),
            rect,
        );
    }
}

const CHECKBOX_WIDTH: u16 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Folders,
    Books,
}

#[derive(Debug, Default)]
struct HitAreas {
    viewport: Rect,
    folder_rows: Vec<(Rect, FolderId)>,
    book_rows: Vec<(Rect, BookId)>,
    menu: Option<Rect>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NameMode {
    CreateFolder,
    RenameFolder(FolderId),
    RenameBook(BookId),
}

#[derive(Debug)]
struct NamePanel {
    open: bool,
    mode: NameMode,
    input: String,
    error: Option<String>,
}

impl Default for NamePanel {
    fn default() -> Self {
        Self {
            open: false,
            mode: NameMode::CreateFolder,
            input: String::new(),
            error: None,
        }
    }
}

impl NamePanel {
    fn open_for(&mut self, mode: NameMode, input: String) {
        self.open = true;
        self.mode = mode;
        self.input = input;
        self.error = None;
    }

    fn close(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Default)]
struct MovePanel {
    cursor: usize,
    input: String,
    error: Option<String>,
}

impl MovePanel {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ToastKind {
    Info,
    Error,
}

#[derive(Debug, Clone)]
struct Toast {
    message: String,
    kind: ToastKind,
    shown_at: Instant,
}

impl Toast {
    fn new(message: String, kind: ToastKind) -> Self {
        Self {
            message,
            kind,
            shown_at: Instant::now(),
        }
    }
}

fn setup_terminal() -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
    terminal::enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("enter alt screen")?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("create terminal")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    terminal::disable_raw_mode().context("disable raw mode")?;
    crossterm::execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("leave alt screen")?;
    Ok(())
}

fn panic_to_string(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic: (unknown payload)".to_string()
    }
}

pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

pub(crate) fn option_chip(label: &str, selected: bool, accent: Color) -> Span<'static> {
    let style = if selected {
        Style::default()
            .fg(Color::Black)
            .bg(accent)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    Span::styled(label.to_string(), style)
}

fn border_style(focused: bool, accent: Color) -> Style {
    if focused {
        Style::default().fg(accent)
    } else {
        Style::default()
    }
}

fn highlight_style(focused: bool, accent: Color) -> Style {
    if focused {
        Style::default()
            .fg(Color::Black)
            .bg(accent)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::REVERSED)
    }
}

fn to_bounds(rect: Rect) -> Bounds {
    Bounds::new(rect.x, rect.y, rect.width, rect.height)
}

fn step_cursor(cursor: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    cursor.saturating_add_signed(delta).min(len - 1)
}

/// Keeps `cursor` inside a window of `rows` lines starting at the returned offset.
fn scroll_offset(cursor: usize, offset: usize, rows: usize) -> usize {
    if rows == 0 {
        return cursor;
    }
    if cursor < offset {
        cursor
    } else if cursor >= offset + rows {
        cursor + 1 - rows
    } else {
        offset
    }
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
