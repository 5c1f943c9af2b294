use ratatui::style::{Color, Modifier, Style};

use crate::summary_view::ColorVariant;

pub struct Theme {
    pub border: Color,
    pub text: Color,
    pub text_secondary: Color,
    pub selection_fg: Color,

    // Status colours, one per display variant
    pub green: Color,
    pub amber: Color,
    pub mint: Color,
    pub red: Color,

    // Specific components
    pub big_number: Style,
    pub stat_label: Style,
    pub repo_name: Style,
    pub repo_commit_count: Style,
    pub badge: Style,
    pub commit_sha: Style,
    pub commit_datetime: Style,
    pub commit_author: Style,
    pub additions: Style,
    pub deletions: Style,
    pub link: Style,
    pub error: Style,
    pub footer: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            border: Color::Cyan,
            text: Color::White,
            text_secondary: Color::Gray,
            selection_fg: Color::Yellow,

            green: Color::Green,
            amber: Color::Rgb(255, 191, 0),
            mint: Color::Rgb(152, 255, 152),
            red: Color::Red,

            big_number: Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            stat_label: Style::default().fg(Color::Gray).add_modifier(Modifier::DIM),
            repo_name: Style::default().fg(Color::Cyan),
            repo_commit_count: Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            badge: Style::default().fg(Color::Black).bg(Color::White),
            commit_sha: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            commit_datetime: Style::default().fg(Color::Magenta),
            commit_author: Style::default().fg(Color::Green),
            additions: Style::default().fg(Color::Green),
            deletions: Style::default().fg(Color::Red),
            link: Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
            error: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            footer: Style::default().fg(Color::Gray).add_modifier(Modifier::DIM),
        }
    }
}

impl Theme {
    pub fn variant(&self, variant: ColorVariant) -> Color {
        match variant {
            ColorVariant::Green => self.green,
            ColorVariant::Amber => self.amber,
            ColorVariant::Mint => self.mint,
            ColorVariant::Red => self.red,
        }
    }
}
