use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::config::{ColorConfig, UiConfig};
use crate::domain::Post;
use crate::tui::app::{Browser, Screen};
use crate::tui::list::FilterState;
use crate::tui::viewport::Viewport;

/// Rows taken by one entry in the listing.
pub const ITEM_HEIGHT: usize = 2;

const LIST_HEADER: u16 = 2;
const DETAIL_HEADER: u16 = 3;
const STATUS_BAR: u16 = 1;
const MARGIN: u16 = 2;

/// Sizes derived from the terminal area, shared by drawing and navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub list_rows: usize,
    pub page_size: usize,
    pub body_width: usize,
    pub body_height: usize,
}

pub fn geometry(width: u16, height: u16) -> Geometry {
    let list_rows = height.saturating_sub(LIST_HEADER + STATUS_BAR) as usize;
    Geometry {
        list_rows,
        page_size: (list_rows / ITEM_HEIGHT).max(1),
        body_width: width.saturating_sub(MARGIN * 2) as usize,
        body_height: height.saturating_sub(DETAIL_HEADER + STATUS_BAR) as usize,
    }
}

pub fn render(frame: &mut Frame, browser: &mut Browser, ui: &UiConfig, colors: &ColorConfig) {
    match browser.screen() {
        Screen::Splash { prompt_visible } => render_splash(frame, ui, *prompt_visible, colors),
        Screen::Detail { post, viewport } => render_detail(frame, post, viewport, colors),
        Screen::Listing => render_listing(frame, browser, colors),
        Screen::Exited => {}
    }
}

fn render_splash(frame: &mut Frame, ui: &UiConfig, prompt_visible: bool, colors: &ColorConfig) {
    let area = frame.area();
    let top = area.height.saturating_sub(3) / 2;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(top),
            Constraint::Length(1), // Title
            Constraint::Length(1),
            Constraint::Length(1), // Prompt
            Constraint::Min(0),
        ])
        .split(area);

    let title = Paragraph::new(Line::from(Span::styled(
        ui.title.as_str(),
        Style::default()
            .fg(colors.title)
            .add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center);
    frame.render_widget(title, chunks[1]);

    if prompt_visible {
        let prompt = Paragraph::new(Span::styled(
            ui.prompt.as_str(),
            Style::default().fg(colors.prompt),
        ))
        .alignment(Alignment::Center);
        frame.render_widget(prompt, chunks[3]);
    }
}

fn render_listing(frame: &mut Frame, browser: &mut Browser, colors: &ColorConfig) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(LIST_HEADER),
            Constraint::Min(1),
            Constraint::Length(STATUS_BAR),
        ])
        .split(frame.area());

    render_list_header(frame, browser, chunks[0], colors);

    if browser.is_loading() && browser.list().is_empty() {
        render_message(frame, chunks[1], "Fetching posts...", colors.summary);
    } else if let Some(error) = browser.error() {
        let message = format!("Error: {}", error);
        render_message(frame, chunks[1], &message, colors.error);
    } else if browser.list().visible_len() == 0 {
        let message = if browser.list().is_empty() {
            "No posts found."
        } else {
            "No matching posts."
        };
        render_message(frame, chunks[1], message, colors.summary);
    } else {
        render_entries(frame, browser, chunks[1], colors);
    }

    let list = browser.list();
    let status = match list.filter_state() {
        FilterState::Editing => "type to filter  enter:Apply  esc:Cancel".to_string(),
        _ => format!(
            "{}/{}  j/k:Nav  enter:Open  /:Filter  esc:Back  q:Quit",
            (list.selected_index() + 1).min(list.visible_len()),
            list.visible_len()
        ),
    };
    render_status_bar(frame, chunks[2], status, colors);
}

fn render_list_header(frame: &mut Frame, browser: &Browser, area: Rect, colors: &ColorConfig) {
    let list = browser.list();
    let title = Line::from(Span::styled(
        format!(" Posts ({})", list.len()),
        Style::default()
            .fg(colors.title)
            .add_modifier(Modifier::BOLD),
    ));

    let filter = match list.filter_state() {
        FilterState::Off => Line::from(""),
        FilterState::Editing => Line::from(Span::styled(
            format!(" Filter: {}_", list.query()),
            Style::default().fg(colors.filter),
        )),
        FilterState::Applied => Line::from(Span::styled(
            format!(" Filter: {}", list.query()),
            Style::default().fg(colors.filter),
        )),
    };

    frame.render_widget(Paragraph::new(Text::from(vec![title, filter])), area);
}

fn render_entries(frame: &mut Frame, browser: &mut Browser, area: Rect, colors: &ColorConfig) {
    let items: Vec<ListItem> = browser
        .list()
        .visible()
        .map(|post| {
            let title = Line::from(Span::styled(
                post.display_title().to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ));

            let mut meta = vec![Span::styled(
                post.published_at.format("%Y-%m-%d").to_string(),
                Style::default().fg(colors.metadata_date),
            )];
            if !post.summary.is_empty() {
                meta.push(Span::raw("  "));
                meta.push(Span::styled(
                    post.summary.clone(),
                    Style::default().fg(colors.summary),
                ));
            }

            ListItem::new(vec![title, Line::from(meta)])
        })
        .collect();

    let highlight_style = Style::default()
        .bg(colors.selection_bg)
        .fg(colors.selection_fg)
        .add_modifier(Modifier::BOLD);

    let list = List::new(items)
        .highlight_style(highlight_style)
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut browser.list_mut().state);
}

fn render_detail(frame: &mut Frame, post: &Post, viewport: &Viewport, colors: &ColorConfig) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(DETAIL_HEADER),
            Constraint::Min(1),
            Constraint::Length(STATUS_BAR),
        ])
        .split(frame.area());

    let mut meta = vec![Span::styled(
        post.published_at.format("%B %d, %Y").to_string(),
        Style::default().fg(colors.metadata_date),
    )];
    if let Some(category) = &post.category {
        meta.push(Span::raw("  "));
        meta.push(Span::styled(
            category.clone(),
            Style::default().fg(colors.summary),
        ));
    }
    if !post.tags.is_empty() {
        meta.push(Span::raw("  "));
        meta.push(Span::styled(
            post.tags.iter().map(|t| format!("#{}", t)).collect::<Vec<_>>().join(" "),
            Style::default().fg(colors.metadata_tags),
        ));
    }

    let header = Paragraph::new(vec![
        Line::from(Span::styled(
            post.display_title().to_string(),
            Style::default()
                .fg(colors.title)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(meta),
    ])
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(colors.border)),
    );
    frame.render_widget(header, padded(chunks[0]));

    let body = Paragraph::new(Text::from(viewport.visible_lines().to_vec()));
    frame.render_widget(body, padded(chunks[1]));

    let status = format!(
        "{}%  j/k:Scroll  f/b:Page  g/G:Top/Bottom  esc:Back",
        viewport.scroll_percent()
    );
    render_status_bar(frame, chunks[2], status, colors);
}

fn render_message(frame: &mut Frame, area: Rect, message: &str, color: ratatui::style::Color) {
    let paragraph = Paragraph::new(Span::styled(message.to_string(), Style::default().fg(color)))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, padded(area));
}

fn render_status_bar(frame: &mut Frame, area: Rect, status: String, colors: &ColorConfig) {
    let paragraph =
        Paragraph::new(status).style(Style::default().fg(colors.status_fg).bg(colors.status_bg));

    frame.render_widget(paragraph, area);
}

fn padded(area: Rect) -> Rect {
    let margin = MARGIN.min(area.width / 2);
    Rect {
        x: area.x + margin,
        width: area.width - margin * 2,
        ..area
    }
}
