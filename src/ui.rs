use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use ecoquest::{GameEngine, MAX_COMBO_MULTIPLIER};

use crate::{App, AppState};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

fn status_line(engine: &GameEngine, progress: (usize, usize)) -> Line<'static> {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);

    let hearts: String = (0..engine.max_lives())
        .map(|i| if i < engine.lives() { '♥' } else { '♡' })
        .collect();

    let mut spans = vec![
        Span::styled(format!("Score {}", engine.score()), bold_style),
        Span::raw("  "),
        Span::styled(
            format!("Streak {} (x{})", engine.streak(), engine.multiplier()),
            if engine.multiplier() == MAX_COMBO_MULTIPLIER {
                bold_style.fg(Color::Magenta)
            } else {
                Style::default().fg(Color::Cyan)
            },
        ),
        Span::raw("  "),
        Span::styled(hearts, Style::default().fg(Color::Red)),
        Span::raw("  "),
        Span::raw(format!("{}/{}", progress.0, progress.1)),
    ];

    if let Some(remaining) = engine.time_remaining_ms() {
        let style = if remaining < 10_000 {
            bold_style.fg(Color::Yellow)
        } else {
            Style::default()
        };
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("{:.1}s", remaining as f64 / 1000.0),
            style,
        ));
    }

    if !engine.is_running() && !engine.is_expired() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            "PAUSED",
            bold_style.fg(Color::Yellow).add_modifier(Modifier::ITALIC),
        ));
    }

    Line::from(spans)
}

/// Numbered choices padded to a common display width so they line up as a
/// column once the paragraph is centered
fn choice_lines(choices: &[String]) -> Vec<Line<'static>> {
    let labels: Vec<String> = choices
        .iter()
        .enumerate()
        .map(|(i, choice)| format!("{}) {}", i + 1, choice))
        .collect();
    let widest = labels.iter().map(|l| l.width()).max().unwrap_or(0);

    labels
        .into_iter()
        .map(|label| {
            let pad = widest - label.width();
            Line::from(format!("{label}{}", " ".repeat(pad)))
        })
        .collect()
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let dim_style = Style::default().add_modifier(Modifier::DIM);
        let green_bold_style = Style::default().patch(bold_style).fg(Color::Green);
        let red_bold_style = Style::default().patch(bold_style).fg(Color::Red);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(3), // status
                Constraint::Min(6),    // prompt and choices
                Constraint::Length(4), // feedback and notifications
                Constraint::Length(1), // help
            ])
            .split(area);

        let engine = self.round.engine();
        Paragraph::new(status_line(engine, self.round.progress()))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" EcoQuest: {} ", self.round.kind())),
            )
            .alignment(Alignment::Center)
            .render(chunks[0], buf);

        let body: Vec<Line> = match self.state {
            AppState::Playing => {
                let mut lines = vec![
                    Line::from(Span::styled(
                        self.round.prompt().unwrap_or_default(),
                        bold_style,
                    )),
                    Line::default(),
                ];
                lines.extend(choice_lines(&self.round.choices()));
                lines
            }
            AppState::Results => {
                let (answered, total) = self.round.progress();
                let reason = if engine.is_expired() {
                    "Time's up!"
                } else if engine.lives() == 0 {
                    "Out of lives!"
                } else {
                    "Round complete!"
                };
                let mut lines = vec![
                    Line::from(Span::styled(reason, bold_style)),
                    Line::default(),
                    Line::from(format!("Final score: {}", engine.score())),
                    Line::from(format!("Answered: {answered} of {total}")),
                ];
                if let Some(status) = &self.save_status {
                    lines.push(Line::from(Span::styled(status.clone(), dim_style)));
                }
                lines
            }
        };
        Paragraph::new(body)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: false })
            .render(chunks[1], buf);

        let mut feedback = vec![];
        if let Some(outcome) = self.round.last_outcome() {
            feedback.push(if outcome.correct {
                Line::from(Span::styled(
                    format!("Correct! +{}", outcome.points),
                    green_bold_style,
                ))
            } else {
                Line::from(Span::styled("Not quite, you lost a life.", red_bold_style))
            });
            feedback.push(Line::from(Span::styled(
                outcome.feedback.clone(),
                Style::default().add_modifier(Modifier::ITALIC),
            )));
        }
        if let Some(message) = self.messages.last() {
            feedback.push(Line::from(Span::styled(
                message.clone(),
                Style::default().fg(Color::Yellow),
            )));
        }
        Paragraph::new(feedback)
            .wrap(Wrap { trim: true })
            .render(chunks[2], buf);

        let help = match self.state {
            AppState::Playing => "1-9 answer / (p)ause / (r)estart / (esc)ape",
            AppState::Results => "(r)estart / (q)uit",
        };
        Paragraph::new(Span::styled(help, dim_style.add_modifier(Modifier::ITALIC)))
            .alignment(Alignment::Center)
            .render(chunks[3], buf);
    }
}
