use std::sync::OnceLock;

use ratatui::style::{Color, Modifier, Style};

/// Visual tokens shared by the dashboard, chat, toast and tooltip widgets.
///
/// The palette is resolved exactly once per process; repeated calls to
/// [`theme`] hand back the same instance.
#[derive(Debug, Clone)]
pub struct Theme {
    pub accent: Color,
    pub muted: Color,
    pub user: Style,
    pub assistant: Style,
    pub error: Style,
    pub pending: Style,
    pub code: Style,
    pub code_block: Style,
    pub card_border: Color,
    pub card_revealed: Color,
    pub toast_success: Color,
    pub toast_error: Color,
    pub toast_info: Color,
    pub tooltip: Style,
}

impl Theme {
    fn dark() -> Self {
        Self {
            accent: Color::Cyan,
            muted: Color::DarkGray,
            user: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            assistant: Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            error: Style::default().fg(Color::Red),
            pending: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
            code: Style::default().fg(Color::Green),
            code_block: Style::default().fg(Color::Green).bg(Color::Black),
            card_border: Color::DarkGray,
            card_revealed: Color::Cyan,
            toast_success: Color::Green,
            toast_error: Color::Red,
            toast_info: Color::Blue,
            tooltip: Style::default().fg(Color::Black).bg(Color::Gray),
        }
    }
}

static THEME: OnceLock<Theme> = OnceLock::new();

/// Returns the process-wide theme, initializing it on first use.
pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::dark)
}
