use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::{AnswerState, App, FocusPane, InputMode, NoticeLevel, SettingsField, TextInput};
use crate::config::mask_secret;

const TITLE: &str = " Workspace Support Agent ";

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let notice_height = if app.notice.is_some() { 1 } else { 0 };

    // Main layout: header, notice, body, footer
    let [header_area, notice_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(notice_height),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    if notice_height > 0 {
        render_notice(app, frame, notice_area);
    }

    let [workspaces_area, chat_area] = Layout::horizontal([
        Constraint::Percentage(30),
        Constraint::Percentage(70),
    ])
    .areas(body_area);
    let [answer_area, question_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(chat_area);

    render_workspaces(app, frame, workspaces_area);
    render_answer(app, frame, answer_area);
    render_question(app, frame, question_area);
    render_footer(app, frame, footer_area);

    if app.settings.is_some() {
        render_settings(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(TITLE, Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{} ", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(app.config().base_url.clone(), Style::default().fg(Color::White)),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_notice(app: &App, frame: &mut Frame, area: Rect) {
    let Some(notice) = &app.notice else {
        return;
    };
    let (label, style) = match notice.level {
        NoticeLevel::Success => (" OK ", Style::default().bg(Color::Green).fg(Color::Black)),
        NoticeLevel::Warning => (" WARN ", Style::default().bg(Color::Yellow).fg(Color::Black)),
        NoticeLevel::Error => (" ERROR ", Style::default().bg(Color::Red).fg(Color::White)),
    };
    let line = Line::from(vec![
        Span::styled(label, style.add_modifier(Modifier::BOLD)),
        Span::raw(" "),
        Span::raw(notice.text.as_str()),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn border_color(focused: bool) -> Color {
    if focused {
        Color::Cyan
    } else {
        Color::DarkGray
    }
}

fn render_workspaces(app: &mut App, frame: &mut Frame, area: Rect) {
    let title = if app.workspaces_loading() {
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        format!(" Workspaces (loading{}) ", dots)
    } else {
        format!(" Workspaces ({}) ", app.workspaces.len())
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(app.focus == FocusPane::Workspaces)))
        .title(title);

    if app.workspaces.is_empty() {
        let hint = if app.workspaces_loading() {
            ""
        } else {
            "No workspaces available. Press r to retry, s for settings."
        };
        let empty = Paragraph::new(Span::styled(hint, Style::default().fg(Color::DarkGray)))
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = app
        .workspaces
        .iter()
        .map(|workspace| ListItem::new(workspace.name()))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.workspace_state);
}

fn render_answer(app: &App, frame: &mut Frame, area: Rect) {
    let title = match app.selected_workspace() {
        Some(workspace) => format!(" Answer: {} ", workspace.name()),
        None => " Answer ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(app.focus == FocusPane::Answer)))
        .title(title);

    let text = match &app.answer {
        AnswerState::Idle => Text::from(Span::styled(
            "Pick a workspace, then ask a question...",
            Style::default().fg(Color::DarkGray),
        )),
        AnswerState::Loading => {
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            Text::from(Span::styled(
                format!("Processing your question{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            ))
        }
        AnswerState::Answered(answer) => Text::from(
            answer
                .lines()
                .map(|line| Line::from(line.to_string()))
                .collect::<Vec<_>>(),
        ),
        AnswerState::Failed(message) => Text::from(Span::styled(
            message.as_str(),
            Style::default().fg(Color::Red),
        )),
    };

    let answer = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.answer_scroll, 0));
    frame.render_widget(answer, area);
}

/// Slice of `input` that fits in `width` columns with the cursor visible,
/// plus the cursor column inside that slice.
fn visible_window(input: &TextInput, width: usize) -> (String, u16) {
    let scroll_offset = if width == 0 {
        0
    } else if input.cursor >= width {
        input.cursor - width + 1
    } else {
        0
    };
    let visible: String = input.value.chars().skip(scroll_offset).take(width).collect();
    (visible, (input.cursor - scroll_offset) as u16)
}

fn render_question(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing && app.settings.is_none();
    let color = if editing {
        Color::Yellow
    } else {
        border_color(app.focus == FocusPane::Question)
    };
    let title = if app.question_pending() {
        " Ask (waiting for answer) "
    } else {
        " Ask "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(title);

    let inner_width = area.width.saturating_sub(2) as usize;
    let (visible, cursor_x) = visible_window(&app.question, inner_width);
    let input = Paragraph::new(visible)
        .style(Style::default().fg(Color::Cyan))
        .block(block);
    frame.render_widget(input, area);

    if editing {
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = if app.settings.is_some() {
        " SETTINGS "
    } else if app.input_mode == InputMode::Editing {
        " ASK "
    } else {
        " BROWSE "
    };

    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let hint = |key: &'static str, label: &'static str| {
        [Span::styled(key, key_style), Span::styled(label, label_style)]
    };

    let mut hints: Vec<Span> = Vec::new();
    if app.settings.is_some() {
        hints.extend(hint(" Tab ", " next field "));
        hints.extend(hint(" Enter ", " apply "));
        hints.extend(hint(" Esc ", " cancel "));
    } else if app.input_mode == InputMode::Editing {
        // No submit hint while the previous question is in flight
        if !app.question_pending() {
            hints.extend(hint(" Enter ", " send "));
        }
        hints.extend(hint(" Esc ", " stop typing "));
    } else {
        hints.extend(hint(" Tab ", " focus "));
        hints.extend(hint(" j/k ", " move "));
        hints.extend(hint(" i ", " ask "));
        hints.extend(hint(" r ", " refresh "));
        hints.extend(hint(" s ", " settings "));
        hints.extend(hint(" q ", " quit "));
    }

    let footer_content = Line::from(
        vec![Span::styled(mode_text, mode_style), Span::styled(" ", label_style)]
            .into_iter()
            .chain(hints)
            .collect::<Vec<_>>(),
    );
    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_settings(app: &App, frame: &mut Frame, area: Rect) {
    let Some(form) = &app.settings else {
        return;
    };

    // Calculate popup size and position (centered)
    let popup_width = 70.min(area.width.saturating_sub(4));
    let popup_height = 9;
    if area.height < popup_height || popup_width < 10 {
        return;
    }
    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Advanced Settings ");
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let label = |text: &'static str, active: bool| {
        let style = if active {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        Paragraph::new(text).style(style)
    };

    let url_active = form.field == SettingsField::BaseUrl;
    frame.render_widget(label("API URL", url_active), Rect::new(inner.x, inner.y, inner.width, 1));
    let (url_visible, url_cursor) = visible_window(&form.base_url, inner.width as usize);
    frame.render_widget(
        Paragraph::new(url_visible).style(Style::default().fg(Color::Cyan)),
        Rect::new(inner.x, inner.y + 1, inner.width, 1),
    );

    frame.render_widget(label("API Key", !url_active), Rect::new(inner.x, inner.y + 3, inner.width, 1));
    // The key is never drawn in clear text
    let masked = mask_secret(&form.api_key.value);
    frame.render_widget(
        Paragraph::new(masked).style(Style::default().fg(Color::Cyan)),
        Rect::new(inner.x, inner.y + 4, inner.width, 1),
    );

    let status = Paragraph::new(format!("{} characters", form.api_key.value.chars().count()))
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(status, Rect::new(inner.x, inner.y + 6, inner.width, 1));

    if url_active {
        frame.set_cursor_position((inner.x + url_cursor, inner.y + 1));
    } else {
        let masked_len = mask_secret(&form.api_key.value).chars().count() as u16;
        frame.set_cursor_position((inner.x + masked_len.min(inner.width), inner.y + 4));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn draw(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn answer_text_is_rendered() {
        let mut app = App::new(Config::new("http://localhost:3001/api/v1", "supersecretkey"));
        app.answer = AnswerState::Answered("Hi there".to_string());
        let screen = draw(&mut app);
        assert!(screen.contains("Hi there"));
        assert!(screen.contains("http://localhost:3001/api/v1"));
    }

    #[test]
    fn settings_popup_masks_key() {
        let mut app = App::new(Config::new("http://localhost:3001/api/v1", "supersecretkey"));
        app.open_settings();
        let screen = draw(&mut app);
        assert!(screen.contains("Advanced Settings"));
        assert!(!screen.contains("supersecretkey"));
        assert!(screen.contains("tkey"));
    }

    #[test]
    fn failed_state_shows_error() {
        let mut app = App::new(Config::default());
        app.answer = AnswerState::Failed("Request error: server returned 500".to_string());
        let screen = draw(&mut app);
        assert!(screen.contains("Request error: server returned 500"));
    }

    #[test]
    fn visible_window_follows_cursor() {
        let input = TextInput::with_value("abcdefgh");
        let (visible, cursor) = visible_window(&input, 4);
        assert_eq!(visible, "fgh");
        assert_eq!(cursor, 3);
    }
}
