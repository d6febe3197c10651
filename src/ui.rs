use ratatui::{
    layout::{Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Focus, Mode, SettingsField};
use crate::format::{self, Segment};
use crate::models::{Message, Role};

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    let [list_area, chat_area] =
        Layout::horizontal([Constraint::Length(28), Constraint::Min(0)]).areas(body_area);
    let [thread_area, input_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(chat_area);

    render_chat_list(app, frame, list_area);
    render_thread(app, frame, thread_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    match app.mode {
        Mode::Settings => render_settings(app, frame, area),
        Mode::UploadPrompt => render_upload_prompt(app, frame, area),
        Mode::History => render_history(app, frame, area),
        Mode::HistoryEdit => {
            render_history(app, frame, area);
            render_history_editor(app, frame, area);
        }
        _ => {}
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = app
        .current
        .as_ref()
        .map(|c| {
            if c.title.is_empty() {
                "Untitled chat".to_string()
            } else {
                c.title.clone()
            }
        })
        .unwrap_or_else(|| "No chat selected".to_string());
    let model = app
        .current
        .as_ref()
        .map(|c| c.model.clone())
        .unwrap_or_default();

    let line = Line::from(vec![
        Span::styled(" chatterm ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(title, Style::default().fg(Color::White)),
        Span::styled(
            if model.is_empty() {
                String::new()
            } else {
                format!("  [{}]", model)
            },
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_chat_list(app: &mut App, frame: &mut Frame, area: Rect) {
    let items: Vec<ListItem> = app
        .chats
        .iter()
        .map(|chat| {
            let title = if chat.title.is_empty() {
                "New chat"
            } else {
                chat.title.as_str()
            };
            let mut lines = vec![Line::from(Span::raw(title.to_string()))];
            if !chat.last_message.is_empty() {
                let mut preview: String = chat.last_message.chars().take(24).collect();
                if chat.last_message.chars().count() > 24 {
                    preview.push('…');
                }
                lines.push(Line::from(Span::styled(
                    preview,
                    Style::default().fg(Color::DarkGray),
                )));
            }
            ListItem::new(lines)
        })
        .collect();

    let border_style = if app.focus == Focus::ChatList {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(" Chats "),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        );

    frame.render_stateful_widget(list, area, &mut app.chat_state);
}

fn render_thread(app: &mut App, frame: &mut Frame, area: Rect) {
    let border_style = if app.focus == Focus::Thread {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(" Messages ");
    let inner = block.inner(area);

    // Remember the viewport so scroll math in the app matches what is drawn.
    app.thread_height = inner.height;
    app.thread_width = inner.width;

    let mut lines: Vec<Line> = Vec::new();
    if let Some(chat) = app.current.as_ref() {
        for msg in &chat.messages {
            lines.push(role_line(msg));
            lines.extend(content_lines(&msg.content));
            lines.push(Line::default());
        }
    }

    if app.loading {
        let dots = ".".repeat((app.animation_frame + 1) as usize);
        lines.push(Line::from(Span::styled(
            "AI:",
            Style::default().fg(Color::Green).bold(),
        )));
        lines.push(Line::from(Span::styled(
            format!("{}{}", app.loading_label, dots),
            Style::default().fg(Color::DarkGray).italic(),
        )));
    }

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.thread_scroll, 0));
    frame.render_widget(paragraph, area);
}

fn role_line(msg: &Message) -> Line<'static> {
    let (label, style) = match msg.role {
        Role::User => ("You:", Style::default().fg(Color::Cyan).bold()),
        Role::Assistant => ("AI:", Style::default().fg(Color::Green).bold()),
    };
    let mut spans = vec![Span::styled(label, style)];
    if let Some(ts) = msg.timestamp {
        spans.push(Span::styled(
            format!("  {}", ts.format("%H:%M")),
            Style::default().fg(Color::DarkGray),
        ));
    }
    Line::from(spans)
}

/// Message content split into plain and fenced segments; code is styled
/// distinctly with its language tag in the block header.
fn content_lines(content: &str) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for segment in format::split_segments(content) {
        match segment {
            Segment::Text(text) => {
                for line in text.lines() {
                    lines.push(Line::from(Span::raw(line.to_string())));
                }
            }
            Segment::Code { language, body } => {
                let header = match language {
                    Some(lang) if !lang.is_empty() => format!("┌─ {} ", lang),
                    _ => "┌─ code ".to_string(),
                };
                lines.push(Line::from(Span::styled(
                    header,
                    Style::default().fg(Color::DarkGray),
                )));
                for line in body.lines() {
                    lines.push(Line::from(vec![
                        Span::styled("│ ", Style::default().fg(Color::DarkGray)),
                        Span::styled(line.to_string(), Style::default().fg(Color::Yellow)),
                    ]));
                }
                lines.push(Line::from(Span::styled(
                    "└─",
                    Style::default().fg(Color::DarkGray),
                )));
            }
        }
    }
    lines
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let (title, style) = match app.mode {
        Mode::Insert => (
            " Message (Enter sends, Esc leaves) ",
            Style::default().fg(Color::Cyan),
        ),
        _ => (
            " Message (press i to type) ",
            Style::default().fg(Color::DarkGray),
        ),
    };

    let paragraph = Paragraph::new(app.input.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(style)
            .title(title),
    );
    frame.render_widget(paragraph, area);

    if app.mode == Mode::Insert {
        let x = area.x + 1 + app.input_cursor.min(area.width.saturating_sub(2) as usize) as u16;
        frame.set_cursor_position(Position::new(x, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    if let Some(status) = &app.status {
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(
                format!(" {} ", status),
                Style::default().fg(Color::White).bg(Color::Red),
            ))),
            area,
        );
        return;
    }

    let hints = match app.mode {
        Mode::Normal => " i type  Enter open  n new  d delete  x clear  s settings  u upload  H history  q quit ",
        Mode::Insert => " Enter send  Esc back ",
        Mode::Settings => " Tab next field  ←/→ model  Enter save  Esc cancel ",
        Mode::UploadPrompt => " Enter upload  Esc cancel ",
        Mode::History => " e edit  d delete  X clear all  Esc back ",
        Mode::HistoryEdit => " Enter save  Esc back ",
    };
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            hints,
            Style::default().fg(Color::DarkGray),
        ))),
        area,
    );
}

fn render_settings(app: &App, frame: &mut Frame, area: Rect) {
    let popup = centered_rect(60, 12, area);
    frame.render_widget(Clear, popup);

    let field_style = |field: SettingsField| {
        if app.settings_field == field {
            Style::default().fg(Color::Cyan).bold()
        } else {
            Style::default().fg(Color::White)
        }
    };

    let model = app
        .models
        .get(app.model_index)
        .map(String::as_str)
        .unwrap_or("-");

    let lines = vec![
        Line::default(),
        Line::from(vec![
            Span::styled(" Title:         ", field_style(SettingsField::Title)),
            Span::raw(app.title_input.clone()),
        ]),
        Line::default(),
        Line::from(vec![
            Span::styled(" System prompt: ", field_style(SettingsField::SystemPrompt)),
            Span::raw(app.prompt_input.clone()),
        ]),
        Line::default(),
        Line::from(vec![
            Span::styled(" Model:         ", field_style(SettingsField::Model)),
            Span::styled(format!("< {} >", model), Style::default().fg(Color::Yellow)),
        ]),
    ];

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Chat settings "),
        );
    frame.render_widget(paragraph, popup);
}

fn render_upload_prompt(app: &App, frame: &mut Frame, area: Rect) {
    let popup = centered_rect(60, 5, area);
    frame.render_widget(Clear, popup);

    let lines = vec![
        Line::from(Span::raw(
            " File path(s), space separated; quote paths containing spaces:",
        )),
        Line::from(Span::styled(
            format!(" {}", app.upload_input),
            Style::default().fg(Color::Yellow),
        )),
    ];
    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Upload files "),
    );
    frame.render_widget(paragraph, popup);
}

fn render_history(app: &mut App, frame: &mut Frame, area: Rect) {
    let popup = centered_rect(70, area.height.saturating_sub(4).max(8), area);
    frame.render_widget(Clear, popup);

    let items: Vec<ListItem> = app
        .history
        .iter()
        .map(|msg| {
            let (label, style) = match msg.role {
                Role::User => ("You ", Style::default().fg(Color::Cyan)),
                Role::Assistant => ("AI  ", Style::default().fg(Color::Green)),
            };
            let preview: String = msg.content.chars().take(60).collect();
            ListItem::new(Line::from(vec![
                Span::styled(label, style),
                Span::raw(preview),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Legacy history "),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_stateful_widget(list, popup, &mut app.history_state);
}

fn render_history_editor(app: &App, frame: &mut Frame, area: Rect) {
    let popup = centered_rect(60, 5, area);
    frame.render_widget(Clear, popup);

    let paragraph = Paragraph::new(app.history_input.as_str())
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title(" Edit message "),
        );
    frame.render_widget(paragraph, popup);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    }
}
