use flipshelf_core::{Credentials, ValidationError, validate_sign_in, validate_sign_up};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AuthMode {
    SignIn,
    SignUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AuthField {
    Email,
    Password,
    Confirm,
}

const SIGN_IN_FIELDS: &[AuthField] = &[AuthField::Email, AuthField::Password];
const SIGN_UP_FIELDS: &[AuthField] = &[AuthField::Email, AuthField::Password, AuthField::Confirm];

#[derive(Debug, Clone)]
pub(crate) struct AuthForm {
    pub(crate) mode: AuthMode,
    pub(crate) focus: AuthField,
    pub(crate) email: String,
    pub(crate) password: String,
    pub(crate) confirm: String,
    pub(crate) error: Option<String>,
}

impl Default for AuthForm {
    fn default() -> Self {
        Self {
            mode: AuthMode::SignIn,
            focus: AuthField::Email,
            email: String::new(),
            password: String::new(),
            confirm: String::new(),
            error: None,
        }
    }
}

impl AuthForm {
    pub(crate) fn fields(&self) -> &'static [AuthField] {
        match self.mode {
            AuthMode::SignIn => SIGN_IN_FIELDS,
            AuthMode::SignUp => SIGN_UP_FIELDS,
        }
    }

    fn focus_index(&self) -> usize {
        self.fields()
            .iter()
            .position(|f| *f == self.focus)
            .unwrap_or(0)
    }

    pub(crate) fn next_field(&mut self) {
        let fields = self.fields();
        self.focus = fields[(self.focus_index() + 1) % fields.len()];
    }

    pub(crate) fn prev_field(&mut self) {
        let fields = self.fields();
        self.focus = fields[(self.focus_index() + fields.len() - 1) % fields.len()];
    }

    pub(crate) fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::SignIn => AuthMode::SignUp,
            AuthMode::SignUp => AuthMode::SignIn,
        };
        if !self.fields().contains(&self.focus) {
            self.focus = AuthField::Email;
        }
        self.password.clear();
        self.confirm.clear();
        self.error = None;
    }

    pub(crate) fn input_mut(&mut self) -> &mut String {
        match self.focus {
            AuthField::Email => &mut self.email,
            AuthField::Password => &mut self.password,
            AuthField::Confirm => &mut self.confirm,
        }
    }

    pub(crate) fn validate(&self) -> Result<Credentials, ValidationError> {
        match self.mode {
            AuthMode::SignIn => validate_sign_in(&self.email, &self.password),
            AuthMode::SignUp => validate_sign_up(&self.email, &self.password, &self.confirm),
        }
    }

    pub(crate) fn draw(&self, area: Rect, frame: &mut ratatui::Frame, accent: Color) {
        let popup_area = crate::centered_rect(60, 60, area);
        frame.render_widget(Clear, popup_area);

        let title = match self.mode {
            AuthMode::SignIn => "Sign in to Flipshelf",
            AuthMode::SignUp => "Create your Flipshelf account",
        };
        let block = Block::default().borders(Borders::ALL).title(Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(block.clone(), popup_area);

        let inner = block.inner(popup_area);
        let sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(4)])
            .split(inner);

        let mut lines = Vec::new();
        for field in self.fields() {
            let (label, value) = match field {
                AuthField::Email => ("Email", self.email.clone()),
                AuthField::Password => ("Password", mask(&self.password)),
                AuthField::Confirm => ("Confirm password", mask(&self.confirm)),
            };
            let focused = *field == self.focus;
            let label_style = if focused {
                Style::default().fg(accent).add_modifier(Modifier::BOLD)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            };
            let cursor = if focused { "▏" } else { "" };
            lines.push(Line::from(vec![
                Span::styled(format!("{label:>17}: "), label_style),
                Span::raw(value),
                Span::styled(cursor, Style::default().fg(accent)),
            ]));
            lines.push(Line::raw(""));
        }
        if let Some(err) = &self.error {
            lines.push(Line::styled(
                err.clone(),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ));
        }
        let body = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });
        frame.render_widget(body, sections[0]);

        let switch_hint = match self.mode {
            AuthMode::SignIn => " no account? sign up",
            AuthMode::SignUp => " have an account? sign in",
        };
        let help = Paragraph::new(Text::from(vec![
            Line::from(vec![
                Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" submit  "),
                Span::styled("Tab", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" next field  "),
                Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" quit"),
            ]),
            Line::from(vec![
                Span::styled("Ctrl+T", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(switch_hint),
            ]),
        ]))
        .alignment(Alignment::Center);
        frame.render_widget(help, sections[1]);
    }
}

fn mask(secret: &str) -> String {
    "•".repeat(secret.chars().count())
}
