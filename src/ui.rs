use ratatui::{
    layout::{Constraint, Layout, Margin, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
    Frame,
};

use textwrap::{wrap, Options, WordSplitter, WrapAlgorithm};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::{App, FocusPane, InputMode};
use crate::blocks::{render_blocks, DisplayBlock};
use crate::persona;
use crate::reference::ReferencePanel;
use crate::state::{ChatRole, Conversation};

const BULLET: &str = "• ";
const PENDING_MARKER: &str = "●";

/// Most wrapped lines the chat pane keeps; older lines scroll out of reach
const MAX_CHAT_LINES: usize = u16::MAX as usize;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    let [reference_area, chat_column] = Layout::horizontal([
        Constraint::Percentage(50),
        Constraint::Percentage(50),
    ])
    .areas(body_area);

    let [chat_area, input_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(chat_column);

    // Store areas for mouse hit-testing
    app.reference_area = Some(reference_area);
    app.chat_area = Some(chat_area);

    render_header(app, frame, header_area);
    render_reference(app, frame, reference_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(format!(" {} ", persona::NAME), Style::default().fg(Color::Cyan).bold()),
        Span::styled(persona::TAGLINE, Style::default().fg(Color::White)),
        Span::raw("  "),
        Span::styled(app.model_name().to_string(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match (app.input_mode, app.focus) {
        (InputMode::Editing, _) => " TYPING ",
        (InputMode::Normal, FocusPane::Reference) => " GUIDE ",
        (InputMode::Normal, FocusPane::Chat) => " CHAT ",
        (InputMode::Normal, FocusPane::Input) => " INPUT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hint = |key: &'static str, label: &'static str| {
        [
            Span::styled(format!(" {} ", key), key_style),
            Span::styled(format!(" {} ", label), label_style),
        ]
    };

    let mut hints: Vec<Span> = Vec::new();
    match (app.input_mode, app.focus) {
        (InputMode::Editing, _) => {
            let send = if app.conversation.is_pending() { "wait" } else { "send" };
            hints.extend(hint("Enter", send));
            hints.extend(hint("Esc", "stop typing"));
            hints.extend(hint("Tab", "focus"));
        }
        (InputMode::Normal, FocusPane::Reference) => {
            hints.extend(hint("j/k", "stage"));
            hints.extend(hint("Enter", "expand"));
            hints.extend(hint("Tab", "focus"));
            hints.extend(hint("q", "quit"));
        }
        (InputMode::Normal, FocusPane::Chat) => {
            hints.extend(hint("j/k", "scroll"));
            hints.extend(hint("^d/^u", "half page"));
            hints.extend(hint("i", "type"));
            hints.extend(hint("Tab", "focus"));
            hints.extend(hint("q", "quit"));
        }
        (InputMode::Normal, FocusPane::Input) => {
            hints.extend(hint("i", "type"));
            hints.extend(hint("Tab", "focus"));
            hints.extend(hint("q", "quit"));
        }
    }

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

/// Word-wrap `text` to `width` terminal columns. Words wider than a line
/// are split; wide characters count as two columns.
fn wrap_text_to_width(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let options = Options::new(width)
        .wrap_algorithm(WrapAlgorithm::FirstFit)
        .word_splitter(WordSplitter::NoHyphenation)
        .break_words(true);

    let lines: Vec<String> = wrap(text, options)
        .into_iter()
        .map(|line| line.into_owned())
        .collect();

    if lines.is_empty() {
        vec![String::new()]
    } else {
        lines
    }
}

/// Wrap with a first-line prefix and a matching hanging indent
fn wrap_with_prefix(text: &str, prefix: &str, width: usize, style: Style) -> Vec<Line<'static>> {
    let indent = " ".repeat(prefix.width());
    let body_width = width.saturating_sub(indent.len()).max(1);

    wrap_text_to_width(text, body_width)
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            let lead = if i == 0 { prefix.to_string() } else { indent.clone() };
            Line::from(vec![Span::raw(lead), Span::styled(line, style)])
        })
        .collect()
}

fn role_label(role: ChatRole) -> Line<'static> {
    let (label, color) = match role {
        ChatRole::Model => (format!("{}:", persona::NAME), Color::Yellow),
        ChatRole::User => ("You:".to_string(), Color::Cyan),
        ChatRole::System => ("System:".to_string(), Color::DarkGray),
    };
    Line::from(Span::styled(
        label,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
}

fn block_lines(block: &DisplayBlock, width: usize, lines: &mut Vec<Line<'static>>) {
    match block {
        DisplayBlock::Heading { level, text } => {
            let style = match level {
                1 => Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
                2 => Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
                _ => Style::default().add_modifier(Modifier::BOLD),
            };
            lines.extend(
                wrap_text_to_width(text, width)
                    .into_iter()
                    .map(|line| Line::from(Span::styled(line, style))),
            );
        }
        DisplayBlock::List(items) => {
            for item in items {
                lines.extend(wrap_with_prefix(item, BULLET, width, Style::default()));
            }
        }
        DisplayBlock::Paragraph(text) => {
            lines.extend(wrap_text_to_width(text, width).into_iter().map(Line::from));
        }
    }
}

/// Every line of the chat pane, wrapped to `width`.
///
/// The view wraps text itself (rather than letting the widget do it) so the
/// line count used for scrolling is exact.
fn chat_lines(conversation: &Conversation, width: usize, frame: u8) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let in_flight = conversation.in_flight_index();

    for (i, msg) in conversation.messages().iter().enumerate() {
        lines.push(role_label(msg.role));
        for block in render_blocks(&msg.content) {
            block_lines(&block, width, &mut lines);
        }

        if in_flight == Some(i) {
            append_pending_marker(&mut lines, width, frame);
        }
        lines.push(Line::default());
    }

    if conversation.awaiting_first_fragment() {
        lines.push(role_label(ChatRole::Model));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((frame as usize % 3) + 1);
        lines.push(Line::from(Span::styled(
            format!("{}{}", persona::THINKING, dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    keep_tail(&mut lines, MAX_CHAT_LINES);
    lines
}

/// Drop the oldest lines so at most `max` remain
fn keep_tail(lines: &mut Vec<Line<'static>>, max: usize) {
    if lines.len() > max {
        let excess = lines.len() - max;
        lines.drain(..excess);
    }
}

/// Pulsing dot after the last block of the streaming message
fn append_pending_marker(lines: &mut Vec<Line<'static>>, width: usize, frame: u8) {
    let style = match frame % 3 {
        0 => Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        1 => Style::default().fg(Color::Magenta),
        _ => Style::default().fg(Color::DarkGray),
    };

    match lines.last_mut() {
        Some(last) if last.width() + 2 <= width => {
            if last.width() > 0 {
                last.spans.push(Span::raw(" "));
            }
            last.spans.push(Span::styled(PENDING_MARKER, style));
        }
        _ => lines.push(Line::from(Span::styled(PENDING_MARKER, style))),
    }
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Chat;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" {} ", persona::NAME));

    let inner_width = area.width.saturating_sub(2) as usize;
    let lines = chat_lines(&app.conversation, inner_width, app.animation_frame);

    // Store chat dimensions for scroll calculations (inner size minus borders)
    app.chat_height = area.height.saturating_sub(2);
    app.chat_total_lines = u16::try_from(lines.len()).unwrap_or(u16::MAX);

    // Snap to the end whenever the conversation changed since the last frame
    let revision = app.conversation.revision();
    if app.rendered_revision != Some(revision) {
        app.rendered_revision = Some(revision);
        app.scroll_chat_to_bottom();
    } else {
        app.scroll_chat_down(0);
    }

    let chat = Paragraph::new(lines)
        .block(chat_block)
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);

    if app.chat_total_lines > app.chat_height {
        render_scrollbar(frame, area, app.chat_total_lines, app.chat_scroll);
    }
}

fn render_scrollbar(frame: &mut Frame, area: Rect, total: u16, position: u16) {
    let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
        .begin_symbol(Some("^"))
        .end_symbol(Some("v"));

    let mut scrollbar_state = ScrollbarState::new(total as usize).position(position as usize);

    frame.render_stateful_widget(
        scrollbar,
        area.inner(Margin {
            vertical: 1,
            horizontal: 0,
        }),
        &mut scrollbar_state,
    );
}

/// Lines of the reference pane plus the line index of each stage title
fn reference_lines(
    panel: &ReferencePanel,
    focused: bool,
    width: usize,
) -> (Vec<Line<'static>>, Vec<usize>) {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut title_rows = Vec::new();

    for (i, stage) in panel.stages().iter().enumerate() {
        let expanded = panel.is_expanded(i);
        let chevron = if expanded { "▾" } else { "▸" };

        let mut title_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
        if focused && panel.selected() == i {
            title_style = Style::default()
                .bg(Color::Cyan)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD);
        }

        title_rows.push(lines.len());
        lines.extend(wrap_with_prefix(
            &format!("{}. {}", i + 1, stage.title),
            &format!("{} ", chevron),
            width,
            title_style,
        ));

        if expanded {
            lines.extend(wrap_with_prefix(
                stage.description,
                "  ",
                width,
                Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
            ));
            for item in stage.items {
                lines.extend(wrap_with_prefix(item, "  • ", width, Style::default()));
            }
        }
        lines.push(Line::default());
    }

    (lines, title_rows)
}

fn render_reference(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Reference;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Project Workflow ");

    let inner_width = area.width.saturating_sub(2) as usize;
    let height = area.height.saturating_sub(2);
    let (lines, title_rows) = reference_lines(&app.reference, focused, inner_width);
    let total = u16::try_from(lines.len()).unwrap_or(u16::MAX);

    let panel = &mut app.reference;
    if panel.take_follow_selection() {
        let row = title_rows
            .get(panel.selected())
            .map(|&r| u16::try_from(r).unwrap_or(u16::MAX))
            .unwrap_or(0);
        if row < panel.scroll {
            panel.scroll = row;
        } else if height > 0 && row >= panel.scroll.saturating_add(height) {
            panel.scroll = row - height + 1;
        }
    }
    panel.scroll = panel.scroll.min(total.saturating_sub(height));

    let reference = Paragraph::new(lines)
        .block(block)
        .scroll((panel.scroll, 0));
    frame.render_widget(reference, area);

    if total > height {
        render_scrollbar(frame, area, total, app.reference.scroll);
    }
}

/// Slice of `input` that fits `width` columns with the cursor (a char
/// index) kept visible. Returns the text and the cursor's column in it.
fn input_window(input: &str, cursor: usize, width: usize) -> (String, u16) {
    if width == 0 {
        return (String::new(), 0);
    }

    let chars: Vec<char> = input.chars().collect();
    let cursor = cursor.min(chars.len());
    let col = |c: char| c.width().unwrap_or(0);

    // Leave one column for the cursor itself
    let mut start = cursor;
    let mut before = 0;
    while start > 0 && before + col(chars[start - 1]) < width {
        start -= 1;
        before += col(chars[start]);
    }

    let mut used = 0;
    let visible: String = chars[start..]
        .iter()
        .take_while(|c| {
            used += col(**c);
            used <= width
        })
        .collect();

    (visible, u16::try_from(before).unwrap_or(u16::MAX))
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let pending = app.conversation.is_pending();
    let editing = app.input_mode == InputMode::Editing;

    let border_color = if pending {
        Color::DarkGray
    } else if editing || app.focus == FocusPane::Input {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let title = if pending {
        format!(" {} is replying... ", persona::NAME)
    } else {
        " Message (i to type) ".to_string()
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let inner_width = area.width.saturating_sub(2) as usize;
    let (visible_text, cursor_x) = input_window(&app.input, app.input_cursor, inner_width);

    let input = if app.input.is_empty() {
        Paragraph::new(persona::INPUT_PLACEHOLDER)
            .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC))
    } else {
        let style = if pending {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Cyan)
        };
        Paragraph::new(visible_text).style(style)
    };

    frame.render_widget(input.block(input_block), area);

    // Show cursor when editing
    if editing && inner_width > 0 {
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}
