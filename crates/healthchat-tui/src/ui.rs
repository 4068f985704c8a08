use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use healthchat_core::ChatRole;
use crate::app::App;

const INPUT_PLACEHOLDER: &str = "Ask your AI health consultant...";

/// Shown while the conversation is empty
const HELP_CARDS: [(&str, &str); 3] = [
    (
        "How do you search?",
        "Simply type your health-related query in the chat box below and hit send. \
         The AI will analyze your question and provide insights, suggestions, or steps you can take next.",
    ),
    (
        "What can you search?",
        "Explore symptoms, possible causes, medications, treatments, mental health tips, diet plans, \
         and get support for chronic illnesses. Your AI consultant is here 24/7.",
    ),
    (
        "Stay Motivated",
        "Your health journey starts with a single question. Stay curious, stay informed, \
         and take charge of your wellbeing with confidence.",
    ),
];

const ACCENT: Color = Color::Magenta;

pub fn render(app: &mut App, frame: &mut Frame) {
    let [chat_area, input_area, help_area] = Layout::vertical([
        Constraint::Min(5),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    if app.entries().is_empty() && !app.is_busy() {
        render_help_cards(frame, chat_area);
    } else {
        render_chat(app, frame, chat_area);
    }
    render_input(app, frame, input_area);
    render_help_line(app, frame, help_area);
}

fn render_help_cards(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT))
        .title(" AI Health Consult ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let card_areas = Layout::vertical([Constraint::Ratio(1, 3); 3]).split(inner);
    for ((title, body), card_area) in HELP_CARDS.iter().zip(card_areas.iter()) {
        let card = Paragraph::new(*body)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::DarkGray))
                    .title(Span::styled(
                        format!(" {} ", title),
                        Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
                    )),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(card, *card_area);
    }
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);
    app.sync_scroll();

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT))
        .title(" AI Health Consult ");

    let chat = chat_paragraph(app)
        .block(chat_block)
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

/// The chat transcript without its frame, shared by rendering and scroll math
/// so the scroll position always matches what is drawn.
pub fn chat_paragraph(app: &App) -> Paragraph<'static> {
    let dots = ".".repeat((app.animation_frame as usize) + 1);
    let mut lines: Vec<Line<'static>> = Vec::new();

    for entry in app.entries() {
        match entry.role {
            ChatRole::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                for line in entry.text.lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            ChatRole::Assistant => {
                lines.push(Line::from(Span::styled(
                    "AI:",
                    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
                )));
                let mut text_lines: Vec<Line<'static>> = entry
                    .text
                    .lines()
                    .map(|line| Line::from(line.to_string()))
                    .collect();
                if entry.text.is_empty() || entry.text.ends_with('\n') {
                    text_lines.push(Line::default());
                }
                if entry.revealing {
                    if let Some(last) = text_lines.last_mut() {
                        last.spans.push(Span::styled(
                            format!("{:<3}", dots),
                            Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD),
                        ));
                    }
                }
                lines.extend(text_lines);
            }
        }
        lines.push(Line::default());
    }

    if app.awaiting_reply() {
        lines.push(Line::from(Span::styled(
            "AI:",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false })
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let busy = app.is_busy();
    let border_color = if busy { Color::DarkGray } else { ACCENT };

    let content = if app.input.is_empty() {
        Span::styled(INPUT_PLACEHOLDER, Style::default().fg(Color::DarkGray))
    } else if busy {
        Span::styled(app.input.as_str(), Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(app.input.as_str())
    };

    let input = Paragraph::new(Line::from(content)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color))
            .title(if busy { " Waiting for reply " } else { " Message " }),
    );
    frame.render_widget(input, area);

    if !busy {
        let x = area.x + 1 + app.cursor as u16;
        frame.set_cursor_position((x.min(area.right().saturating_sub(2)), area.y + 1));
    }
}

fn render_help_line(app: &App, frame: &mut Frame, area: Rect) {
    let help = if app.is_busy() {
        "Esc: stop reply | Up/Down/PgUp/PgDn: scroll | Ctrl-C: quit"
    } else {
        "Enter: send | Up/Down/PgUp/PgDn: scroll | Esc/Ctrl-C: quit"
    };
    frame.render_widget(
        Paragraph::new(Span::styled(help, Style::default().fg(Color::DarkGray))),
        area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::app_with_reply;
    use ratatui::{backend::TestBackend, Terminal};

    fn screen_text(app: &mut App) -> String {
        screen_text_sized(app, 100, 40)
    }

    fn screen_text_sized(app: &mut App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[tokio::test]
    async fn test_empty_chat_shows_help_cards_and_placeholder() {
        let mut app = app_with_reply("ok");
        let screen = screen_text(&mut app);

        assert!(screen.contains("How do you search?"));
        assert!(screen.contains("What can you search?"));
        assert!(screen.contains("Stay Motivated"));
        assert!(screen.contains(INPUT_PLACEHOLDER));
    }

    #[tokio::test(start_paused = true)]
    async fn test_conversation_is_rendered_by_role() {
        let mut app = app_with_reply("Try resting.");
        app.input = "I have a headache".to_string();
        app.submit_input();

        let waiting = screen_text(&mut app);
        assert!(waiting.contains("Thinking"));
        assert!(waiting.contains("Waiting for reply"));

        app.engine.run_until_idle().await;
        let screen = screen_text(&mut app);

        assert!(screen.contains("You:"));
        assert!(screen.contains("I have a headache"));
        assert!(screen.contains("AI:"));
        assert!(screen.contains("Try resting."));
        assert!(!screen.contains("Thinking"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_word_wrapped_reply_scrolls_to_last_word() {
        let mut app = app_with_reply(
            "a bb ccc dddddddddd e ff ggggggggg hh i jjjjjjjjjj k ll mmmmmmmmm n oo FINALWORD",
        );
        app.input = "narrow".to_string();
        app.submit_input();
        app.engine.run_until_idle().await;

        let screen = screen_text_sized(&mut app, 14, 14);

        assert!(screen.contains("FINALWORD"));
        assert_eq!(app.chat_line_count() as usize, chat_paragraph(&app).line_count(12));
    }
}
