use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    layout::{Constraint, Direction, Layout},
    style::{Modifier, Style},
    text::{Line, Span},
};

use crate::app::App;
use crate::config::TickerStyle;
use crate::detail::{DetailPhase, RepoDetail};
use crate::models::{CommitRecord, RepoMetrics, Screen};
use crate::summary_view::SummaryView;
use crate::theme::Theme;
use crate::utils::{format_local, format_optional, marquee, progress_track, short_sha};

pub fn render(f: &mut Frame, app: &App) {
    let theme = Theme::default();
    match app.screen {
        Screen::Summary => render_summary(f, app, &theme),
        Screen::Detail => match &app.detail {
            Some(detail) => render_detail(f, detail, &theme),
            None => render_summary(f, app, &theme),
        },
    }
}

/// Renders the summary screen: headline numbers, status ticker, progress and repos.
pub fn render_summary(f: &mut Frame, app: &App, theme: &Theme) {
    let view = &app.summary;
    let display = view.display();
    let status_color = theme.variant(display.color_variant);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Length(5), // numbers
            Constraint::Length(1), // ticker
            Constraint::Length(1), // progress
            Constraint::Min(3),    // repos
            Constraint::Length(1), // error indicator
            Constraint::Length(3), // footer
        ])
        .split(f.area());

    let header = Paragraph::new(Line::from(vec![
        Span::styled("Git Habit Tracker", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(
            format!("  commit activity over the last {}", app.window),
            Style::default().fg(theme.text_secondary),
        ),
    ]))
    .block(Block::default().borders(Borders::ALL).style(Style::default().fg(theme.border)));
    f.render_widget(header, chunks[0]);

    render_numbers(f, chunks[1], view, theme);

    let ticker_width = chunks[2].width as usize;
    let ticker_text = match app.ticker_style {
        TickerStyle::Marquee => marquee(&display.ticker_text, ticker_width, app.frame as usize),
        TickerStyle::Static => display.ticker_text.clone(),
    };
    f.render_widget(
        Paragraph::new(ticker_text).style(Style::default().fg(status_color).add_modifier(Modifier::BOLD)),
        chunks[2],
    );

    if display.progress_visible {
        let track = progress_track(chunks[3].width as usize, app.frame);
        f.render_widget(Paragraph::new(track).style(Style::default().fg(status_color)), chunks[3]);
    }

    render_repo_list(f, chunks[4], app, theme);

    if view.error().is_some() {
        f.render_widget(Paragraph::new("Error loading data").style(theme.error), chunks[5]);
    }

    let refresh_hint = if app.refresh_in_flight() { "r: refreshing…" } else { "r: Refresh now" };
    let footer = Paragraph::new(format!("{refresh_hint} | ↑/↓ or j/k Select | <Enter> Details | q Quit"))
        .block(Block::default().borders(Borders::ALL))
        .style(theme.footer);
    f.render_widget(footer, chunks[6]);
}

fn render_numbers(f: &mut Frame, area: Rect, view: &SummaryView, theme: &Theme) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(30),
            Constraint::Percentage(20),
            Constraint::Percentage(20),
            Constraint::Percentage(30),
        ])
        .split(area);

    let snapshot = view.snapshot();
    let placeholder = || "…".to_string();
    let lines = snapshot.map(|s| s.total_lines_updated.to_string()).unwrap_or_else(placeholder);
    let repos = snapshot.map(|s| s.repos_updated_count.to_string()).unwrap_or_else(placeholder);
    let commits = snapshot.map(|s| s.total_commits.to_string()).unwrap_or_else(placeholder);
    let checked = format_optional(snapshot.and_then(|s| s.last_checked_at.as_ref()));

    let stat = |label: &str, value: String, style: Style| {
        Paragraph::new(vec![
            Line::from(Span::styled(label.to_string(), theme.stat_label)),
            Line::from(Span::styled(value, style)),
        ])
        .block(Block::default().borders(Borders::ALL).style(Style::default().fg(theme.border)))
    };

    f.render_widget(stat("Lines updated", lines, theme.big_number), columns[0]);
    f.render_widget(stat("Repos updated", repos, theme.repo_commit_count), columns[1]);
    f.render_widget(stat("Commits", commits, theme.repo_commit_count), columns[2]);
    f.render_widget(stat("Last checked", checked, Style::default().fg(theme.text)), columns[3]);
}

fn render_repo_list(f: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let repos = app.repos();
    let block = Block::default()
        .title("Repositories")
        .borders(Borders::ALL)
        .style(Style::default().fg(theme.border));

    if repos.is_empty() {
        let text = if app.summary.snapshot().is_some() {
            "No repositories tracked yet."
        } else {
            "Waiting for the first summary…"
        };
        let placeholder = Paragraph::new(text)
            .block(block)
            .alignment(Alignment::Center)
            .style(Style::default().fg(theme.text_secondary));
        f.render_widget(placeholder, area);
        return;
    }

    let items: Vec<ListItem> = repos
        .iter()
        .enumerate()
        .map(|(i, repo)| {
            let selected = i == app.selected_repo;
            let name_style = if selected {
                Style::default().fg(theme.selection_fg).add_modifier(Modifier::BOLD)
            } else {
                theme.repo_name
            };
            let visibility = if repo.is_private { "private" } else { "public" };
            ListItem::new(Line::from(vec![
                Span::styled(repo.full_name.clone(), name_style),
                Span::raw(" "),
                Span::styled(format!(" {visibility} "), theme.badge),
                Span::raw("  "),
                Span::styled(
                    format!("{} commit{}", repo.commits_count, if repo.commits_count == 1 { "" } else { "s" }),
                    theme.repo_commit_count,
                ),
            ]))
        })
        .collect();

    let mut state = ListState::default();
    state.select(Some(app.selected_repo));
    let list = List::new(items).block(block).highlight_symbol("→ ");
    f.render_stateful_widget(list, area, &mut state);
}

/// Renders the per-repo detail screen.
pub fn render_detail(f: &mut Frame, detail: &RepoDetail, theme: &Theme) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(3), Constraint::Length(3)])
        .split(f.area());

    render_detail_header(f, chunks[0], detail, theme);

    let block = Block::default()
        .title(format!("Recent commits ({})", detail.commits().len()))
        .borders(Borders::ALL)
        .style(Style::default().fg(theme.border));

    match detail.phase() {
        DetailPhase::Loading => {
            f.render_widget(Paragraph::new("Loading…").block(block).style(theme.footer), chunks[1]);
        }
        DetailPhase::Error if detail.metrics().is_none() || detail.commits().is_empty() => {
            let message = detail
                .error()
                .map(|e| format!("Error loading data: {e}"))
                .unwrap_or_else(|| "Error loading data".to_string());
            f.render_widget(
                Paragraph::new(message).block(block).style(theme.error).wrap(Wrap { trim: true }),
                chunks[1],
            );
        }
        _ if detail.commits().is_empty() => {
            f.render_widget(
                Paragraph::new("No commits in this window.")
                    .block(block)
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(theme.text_secondary)),
                chunks[1],
            );
        }
        _ => {
            let items: Vec<ListItem> = detail.commits().iter().map(|c| commit_item(c, theme)).collect();
            let mut state = ListState::default();
            state.select(Some(detail.scroll));
            let list = List::new(items).block(block).highlight_symbol("→ ");
            f.render_stateful_widget(list, chunks[1], &mut state);
        }
    }

    let footer = Paragraph::new("↑/↓ or j/k Scroll | <Esc> Back | q Quit")
        .block(Block::default().borders(Borders::ALL))
        .style(theme.footer);
    f.render_widget(footer, chunks[2]);
}

fn render_detail_header(f: &mut Frame, area: Rect, detail: &RepoDetail, theme: &Theme) {
    let metrics: Option<&RepoMetrics> = detail.metrics();
    let name = metrics.map(|m| m.full_name.as_str()).unwrap_or("Repo");
    let window = metrics.map(|m| m.window.as_str()).unwrap_or("");
    let commits = metrics.map(|m| m.commits_count).unwrap_or(0);
    let added = metrics.map(|m| m.lines_added).unwrap_or(0);
    let deleted = metrics.map(|m| m.lines_deleted).unwrap_or(0);

    let mut title_line = vec![Span::styled(name.to_string(), Style::default().add_modifier(Modifier::BOLD))];
    if detail.phase() == DetailPhase::Loading {
        title_line.push(Span::styled("  loading…", theme.footer));
    } else if detail.is_refreshing() {
        title_line.push(Span::styled("  refreshing…", theme.footer));
    }

    let header = Paragraph::new(vec![
        Line::from(title_line),
        Line::from(vec![
            Span::styled(format!("Window: {window}"), theme.stat_label),
            Span::raw("   "),
            Span::styled(format!("Commits: {commits}"), theme.repo_commit_count),
        ]),
        Line::from(vec![
            Span::styled(format!("+{added}"), theme.additions),
            Span::raw(" / "),
            Span::styled(format!("-{deleted}"), theme.deletions),
        ]),
    ])
    .block(Block::default().borders(Borders::ALL).style(Style::default().fg(theme.border)));
    f.render_widget(header, area);
}

fn commit_item(commit: &CommitRecord, theme: &Theme) -> ListItem<'static> {
    let mut lines = vec![
        Line::from(vec![
            Span::styled(short_sha(&commit.sha).to_string(), theme.commit_sha),
            Span::raw(" "),
            Span::raw(commit.headline().to_string()),
            Span::raw("  "),
            Span::styled(format_local(&commit.committed_at), theme.commit_datetime),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled(commit.author().to_string(), theme.commit_author),
            Span::raw(" • "),
            Span::styled(format!("+{}", commit.additions), theme.additions),
            Span::raw(" / "),
            Span::styled(format!("-{}", commit.deletions), theme.deletions),
            Span::raw(format!(" • {} files", commit.changed_files)),
        ]),
    ];
    if let Some(url) = &commit.url {
        lines.push(Line::from(vec![Span::raw("  "), Span::styled(url.clone(), theme.link)]));
    }
    ListItem::new(lines)
}
