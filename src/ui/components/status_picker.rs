use super::KeyResult;
use crate::parts::types::PartStatus;
use crate::ui::renderfns::status_color;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState};

/// Events emitted by status picker that parent needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusPickerEvent {
  /// A status other than the current one was chosen
  Selected(PartStatus),
  /// Picker cancelled
  Cancelled,
}

/// Overlay for choosing a part's next status among the allowed ones
#[derive(Debug, Clone, Default)]
pub struct StatusPicker {
  active: bool,
  statuses: Vec<PartStatus>,
  current: Option<PartStatus>,
  selected: usize,
  title: String,
}

impl StatusPicker {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Show the picker with the cursor on `current`.
  pub fn show(&mut self, title: String, statuses: Vec<PartStatus>, current: PartStatus) {
    self.selected = statuses.iter().position(|s| *s == current).unwrap_or(0);
    self.active = true;
    self.statuses = statuses;
    self.current = Some(current);
    self.title = title;
  }

  pub fn hide(&mut self) {
    self.active = false;
    self.statuses.clear();
    self.current = None;
    self.selected = 0;
  }

  fn highlighted(&self) -> Option<PartStatus> {
    self.statuses.get(self.selected).copied()
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<StatusPickerEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Esc | KeyCode::Char('q') => {
        self.hide();
        KeyResult::Event(StatusPickerEvent::Cancelled)
      }
      KeyCode::Enter => match self.highlighted() {
        // Saving the unchanged status is disabled
        Some(status) if Some(status) == self.current => KeyResult::Handled,
        Some(status) => {
          self.hide();
          KeyResult::Event(StatusPickerEvent::Selected(status))
        }
        None => {
          self.hide();
          KeyResult::Event(StatusPickerEvent::Cancelled)
        }
      },
      KeyCode::Char('j') | KeyCode::Down => {
        if !self.statuses.is_empty() {
          self.selected = (self.selected + 1) % self.statuses.len();
        }
        KeyResult::Handled
      }
      KeyCode::Char('k') | KeyCode::Up => {
        if !self.statuses.is_empty() {
          self.selected = if self.selected == 0 {
            self.statuses.len() - 1
          } else {
            self.selected - 1
          };
        }
        KeyResult::Handled
      }
      _ => KeyResult::Handled,
    }
  }

  /// Render the status picker overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let max_len = self
      .statuses
      .iter()
      .map(|s| s.as_str().len() + " (current)".len())
      .chain(std::iter::once(self.title.len()))
      .max()
      .unwrap_or(10);
    let width = (max_len as u16 + 6)
      .min(area.width.saturating_sub(4))
      .max(20);
    let height = (self.statuses.len().max(1) as u16 + 2)
      .min(area.height.saturating_sub(4))
      .max(3);

    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let overlay_area = Rect::new(x, y, width.min(area.width), height.min(area.height));

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", self.title));

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    if self.statuses.is_empty() {
      frame.render_widget(
        Line::styled("No transitions allowed", Style::default().fg(Color::DarkGray)),
        inner,
      );
      return;
    }

    let items: Vec<ListItem> = self
      .statuses
      .iter()
      .map(|status| {
        let mut style = Style::default().fg(status_color(*status));
        let mut spans = vec![];
        if Some(*status) == self.current {
          style = style.bold();
          spans.push(Span::styled(status.as_str(), style));
          spans.push(Span::styled(" (current)", Style::default().fg(Color::DarkGray)));
        } else {
          spans.push(Span::styled(status.as_str(), style));
        }
        ListItem::new(Line::from(spans))
      })
      .collect();

    let list =
      List::new(items).highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let mut state = ListState::default();
    state.select(Some(self.selected));

    frame.render_stateful_widget(list, inner, &mut state);
  }
}
