use std::path::PathBuf;
use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use flipshelf_application::{Wizard, WizardOutcome, WizardView};
use flipshelf_core::PageCount;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

pub(crate) enum WizardAction {
    Stay,
    Close,
    Submit(WizardOutcome),
}

const METHOD_UPLOAD: usize = 0;
const METHOD_TEMPLATE: usize = 1;

#[derive(Debug, Clone)]
pub(crate) struct WizardPanel {
    wizard: Wizard,
    method_cursor: usize,
    path_input: String,
    file_cursor: usize,
    page_digits: String,
    error: Option<String>,
}

impl WizardPanel {
    pub(crate) fn new(wizard: Wizard) -> Self {
        Self {
            wizard,
            method_cursor: METHOD_UPLOAD,
            path_input: String::new(),
            file_cursor: 0,
            page_digits: String::new(),
            error: None,
        }
    }

    /// Advances simulated uploads. Returns true when anything moved.
    pub(crate) fn tick(&mut self, now: Instant) -> bool {
        !self.wizard.tick(now).is_empty()
    }

    fn back(&mut self) {
        self.wizard.back();
        self.path_input.clear();
        self.file_cursor = 0;
        self.page_digits.clear();
        self.error = None;
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent, now: Instant) -> WizardAction {
        if matches!(self.wizard.view(), WizardView::Upload(_)) {
            self.handle_upload_key(key, now)
        } else if matches!(self.wizard.view(), WizardView::Template(_)) {
            self.handle_template_key(key)
        } else {
            self.handle_selection_key(key)
        }
    }

    fn handle_selection_key(&mut self, key: KeyEvent) -> WizardAction {
        match key.code {
            KeyCode::Esc => return WizardAction::Close,
            KeyCode::Up | KeyCode::Down => {
                self.method_cursor = if self.method_cursor == METHOD_UPLOAD {
                    METHOD_TEMPLATE
                } else {
                    METHOD_UPLOAD
                };
            }
            KeyCode::Char('1') | KeyCode::Char('u') => {
                self.wizard.choose_upload();
            }
            KeyCode::Char('2') | KeyCode::Char('t') => {
                self.wizard.choose_template();
            }
            KeyCode::Enter => {
                if self.method_cursor == METHOD_UPLOAD {
                    self.wizard.choose_upload();
                } else {
                    self.wizard.choose_template();
                }
            }
            _ => {}
        }
        WizardAction::Stay
    }

    fn handle_upload_key(&mut self, key: KeyEvent, now: Instant) -> WizardAction {
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && let KeyCode::Char('u') = key.code
        {
            self.path_input.clear();
            return WizardAction::Stay;
        }

        match key.code {
            KeyCode::Esc => self.back(),
            KeyCode::Enter => {
                let input = self.path_input.trim().to_string();
                if input.is_empty() {
                    return self.submit();
                }
                let Some(queue) = self.wizard.upload_mut() else {
                    return WizardAction::Stay;
                };
                match queue.attach(expand_home(&input), now) {
                    Ok(true) => {
                        self.path_input.clear();
                        self.file_cursor = queue.files().len() - 1;
                        self.error = None;
                    }
                    Ok(false) => self.error = Some("Already added".to_string()),
                    Err(err) => self.error = Some(err.to_string()),
                }
            }
            KeyCode::Up => self.file_cursor = self.file_cursor.saturating_sub(1),
            KeyCode::Down => {
                if let Some(queue) = self.wizard.upload_mut() {
                    let last = queue.files().len().saturating_sub(1);
                    self.file_cursor = (self.file_cursor + 1).min(last);
                }
            }
            KeyCode::Delete => {
                if let Some(queue) = self.wizard.upload_mut() {
                    queue.remove(self.file_cursor);
                    self.file_cursor = self
                        .file_cursor
                        .min(queue.files().len().saturating_sub(1));
                }
            }
            KeyCode::Backspace => {
                self.path_input.pop();
            }
            KeyCode::Char(ch) => {
                if !ch.is_control() {
                    self.path_input.push(ch);
                }
            }
            _ => {}
        }
        WizardAction::Stay
    }

    fn handle_template_key(&mut self, key: KeyEvent) -> WizardAction {
        if key.code == KeyCode::Esc {
            self.back();
            return WizardAction::Stay;
        }
        if key.code == KeyCode::Enter {
            return self.submit();
        }
        let digit = match key.code {
            KeyCode::Char(ch) => ch.to_digit(10),
            _ => None,
        };
        if digit.is_none() {
            self.page_digits.clear();
        }
        let Some(picker) = self.wizard.template_mut() else {
            return WizardAction::Stay;
        };
        match key.code {
            KeyCode::Left => picker.select_prev(),
            KeyCode::Right => picker.select_next(),
            KeyCode::Up | KeyCode::Char('+') => picker.page_count.increment(),
            KeyCode::Down | KeyCode::Char('-') => picker.page_count.decrement(),
            KeyCode::Char(ch) if digit.is_some() => {
                // Up to two typed digits form one number.
                if self.page_digits.len() >= 2 {
                    self.page_digits.clear();
                }
                self.page_digits.push(ch);
                if let Ok(value) = self.page_digits.parse::<u32>() {
                    picker.page_count.set(value);
                }
            }
            _ => {}
        }
        WizardAction::Stay
    }

    fn submit(&mut self) -> WizardAction {
        match self.wizard.submit() {
            Ok(outcome) => WizardAction::Submit(outcome),
            Err(err) => {
                self.error = Some(err.to_string());
                WizardAction::Stay
            }
        }
    }

    pub(crate) fn draw(&self, area: Rect, frame: &mut ratatui::Frame, accent: Color) {
        let popup_area = crate::centered_rect(70, 70, area);
        frame.render_widget(Clear, popup_area);

        let title = match self.wizard.view() {
            WizardView::Selection => "Create flipbook",
            WizardView::Upload(_) => "Create flipbook — upload PDF",
            WizardView::Template(_) => "Create flipbook — from template",
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

        let mut lines = match self.wizard.view() {
            WizardView::Selection => self.selection_lines(accent),
            WizardView::Upload(queue) => {
                let mut lines = vec![
                    Line::from(vec![
                        Span::styled("PDF path: ", Style::default().add_modifier(Modifier::BOLD)),
                        Span::raw(self.path_input.clone()),
                        Span::styled("▏", Style::default().fg(accent)),
                    ]),
                    Line::raw(""),
                ];
                if queue.is_empty() {
                    lines.push(Line::styled(
                        "No files yet. Type a path and press Enter.",
                        Style::default().fg(Color::Gray),
                    ));
                }
                let bar_width = (inner.width as usize).saturating_sub(40).clamp(10, 30);
                for (idx, file) in queue.files().iter().enumerate() {
                    let marker = if idx == self.file_cursor { "> " } else { "  " };
                    let style = if file.is_complete() {
                        Style::default().fg(Color::Green)
                    } else {
                        Style::default()
                    };
                    lines.push(Line::from(vec![
                        Span::raw(marker),
                        Span::styled(progress_bar(file.progress, bar_width), style),
                        Span::raw(format!(" {:>3}%  ", file.progress)),
                        Span::raw(file.file_name()),
                    ]));
                }
                lines
            }
            WizardView::Template(picker) => {
                let mut chips = vec![Span::styled(
                    "Template: ",
                    Style::default().add_modifier(Modifier::BOLD),
                )];
                for (idx, template) in picker.templates().iter().enumerate() {
                    chips.push(crate::option_chip(
                        &format!(" {} ", template.name),
                        idx == picker.selected_index(),
                        accent,
                    ));
                    chips.push(Span::raw(" "));
                }
                vec![
                    Line::from(chips),
                    Line::raw(""),
                    Line::from(vec![
                        Span::styled("Pages: ", Style::default().add_modifier(Modifier::BOLD)),
                        Span::raw(format!("◀ {} ▶", picker.page_count.get())),
                        Span::styled(
                            format!("  (even, {}–{})", PageCount::MIN, PageCount::MAX),
                            Style::default().fg(Color::Gray),
                        ),
                    ]),
                ]
            }
        };

        if let Some(err) = &self.error {
            lines.push(Line::raw(""));
            lines.push(Line::styled(
                err.clone(),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ));
        }
        frame.render_widget(
            Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false }),
            sections[0],
        );

        let help = match self.wizard.view() {
            WizardView::Selection => "↑/↓ choose  Enter open  1 upload  2 template  Esc close",
            WizardView::Upload(_) => {
                "Enter add path / submit when empty  ↑/↓ file  Del remove  Ctrl+U clear  Esc back"
            }
            WizardView::Template(_) => "←/→ template  ↑/↓ or +/- pages  Enter create  Esc back",
        };
        frame.render_widget(
            Paragraph::new(help)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::TOP)),
            sections[1],
        );
    }

    fn selection_lines(&self, accent: Color) -> Vec<Line<'static>> {
        let option = |idx: usize, label: &str, detail: &str| {
            let selected = idx == self.method_cursor;
            let style = if selected {
                Style::default()
                    .fg(Color::Black)
                    .bg(accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            };
            vec![
                Line::styled(format!(" {label} "), style),
                Line::styled(format!("   {detail}"), Style::default().fg(Color::Gray)),
                Line::raw(""),
            ]
        };
        let mut lines = option(METHOD_UPLOAD, "1  Upload PDF", "Turn one or more PDF files into flipbooks");
        lines.extend(option(
            METHOD_TEMPLATE,
            "2  Start from template",
            "Pick a design and a page count",
        ));
        lines
    }
}

fn expand_home(input: &str) -> PathBuf {
    if let Some(rest) = input.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return PathBuf::from(home).join(rest);
    }
    PathBuf::from(input)
}

fn progress_bar(progress: u8, width: usize) -> String {
    let filled = (progress.min(100) as usize * width) / 100;
    format!("[{}{}]", "█".repeat(filled), "░".repeat(width - filled))
}
