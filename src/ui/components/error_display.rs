use crate::error::FetchError;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Widget, Wrap};

/// Bordered error box with the user-facing message and an optional retry hint
pub struct ErrorDisplay<'a> {
  title: &'a str,
  error: &'a FetchError,
  retry: bool,
}

impl<'a> ErrorDisplay<'a> {
  pub fn new(title: &'a str, error: &'a FetchError) -> Self {
    Self {
      title,
      error,
      retry: false,
    }
  }

  /// Mention that `r` retries.
  pub fn with_retry(mut self) -> Self {
    self.retry = true;
    self
  }

  fn lines(&self) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(self.error.user_message())];
    if self.retry {
      lines.push(Line::default());
      lines.push(Line::from(vec![
        Span::raw("Press "),
        Span::styled("r", Style::default().fg(Color::Cyan)),
        Span::raw(" to retry."),
      ]));
    }
    lines
  }
}

impl Widget for ErrorDisplay<'_> {
  fn render(self, area: Rect, buf: &mut Buffer) {
    let block = Block::default()
      .title(format!(" ⚠ {} ", self.title))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Red));
    Paragraph::new(self.lines())
      .block(block)
      .wrap(Wrap { trim: true })
      .style(Style::default().fg(Color::Red))
      .render(area, buf);
  }
}
