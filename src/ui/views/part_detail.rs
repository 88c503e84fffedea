use crate::cache::MutationState;
use crate::parts::types::{Configuration, Part, PartStatus, PartUpdate};
use crate::parts::{AllowableStatusesKey, CachedPartsClient, HttpPartsApi, PartKey, PartsApi};
use crate::query::{Query, QueryState};
use crate::ui::components::{ErrorDisplay, KeyResult, StatusPicker, StatusPickerEvent};
use crate::ui::renderfns::{short_uuid, status_color};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use tracing::debug;

/// Part of the selected configuration, with status editing
pub struct PartDetailView<A: PartsApi = HttpPartsApi> {
  client: CachedPartsClient<A>,
  config: Configuration,
  part: Query<PartKey, A>,
  allowed: Query<AllowableStatusesKey, A>,
  picker: StatusPicker,
  /// Edit requested; the picker opens once the allowed statuses are known
  editing: bool,
}

impl<A: PartsApi> PartDetailView<A> {
  pub fn new(config: Configuration, client: CachedPartsClient<A>) -> Self {
    let part_uuid = config.part_uuid.clone();
    Self {
      part: Query::new(PartKey(part_uuid.clone()), client.clone()),
      allowed: Query::new(AllowableStatusesKey(part_uuid), client.clone()),
      client,
      config,
      picker: StatusPicker::new(),
      editing: false,
    }
  }

  fn part_id(&self) -> &str {
    &self.config.part_uuid
  }

  fn mutation(&self) -> MutationState {
    self.client.mutation_state(self.part_id())
  }

  fn start_editing(&mut self) {
    if self.mutation().is_pending() || self.part.data().is_none() {
      return;
    }
    self.client.reset_mutation(self.part_id());
    self.editing = true;
    self.open_picker();
  }

  fn stop_editing(&mut self) {
    self.editing = false;
    self.picker.hide();
  }

  /// Show the picker if editing and everything it needs is loaded.
  fn open_picker(&mut self) {
    if !self.editing || self.picker.is_active() {
      return;
    }
    let (Some(part), Some(allowed)) = (self.part.data(), self.allowed.data()) else {
      return;
    };
    // Nothing to pick; the detail pane says so instead
    if allowed.allowable_statuses.is_empty() {
      return;
    }
    let title = format!("Status of {}", part.name);
    self
      .picker
      .show(title, allowed.allowable_statuses.clone(), part.status);
  }

  fn save(&mut self, status: PartStatus) {
    self.editing = false;
    if self.part.data().map(|p| p.status) == Some(status) {
      return;
    }

    let client = self.client.clone();
    let id = self.part_id().to_string();
    tokio::spawn(async move {
      if let Err(error) = client.update_part(&id, PartUpdate::status(status)).await {
        debug!(part = %id, error = %error, "status update failed");
      }
    });
  }

  fn render_part(&self, part: &Part, frame: &mut Frame, area: Rect) {
    let label = |text: &'static str| Span::styled(text, Style::default().fg(Color::DarkGray));
    let mut lines = vec![
      Line::from(Span::styled(part.name.clone(), Style::default().bold())),
      Line::default(),
      Line::from(vec![label("Part UUID: "), Span::raw(part.uuid.clone())]),
      Line::from(vec![label("Unit: "), Span::raw(part.unit.clone())]),
    ];
    if let Some(version) = &part.version {
      lines.push(Line::from(vec![label("Version: "), Span::raw(version.clone())]));
    }

    let mut status = vec![
      label("Status: "),
      Span::styled(
        part.status.to_string(),
        Style::default().fg(status_color(part.status)).bold(),
      ),
    ];
    match self.mutation() {
      MutationState::Pending => {
        status.push(Span::styled("  Saving...", Style::default().fg(Color::Yellow)));
      }
      MutationState::Committed => {
        status.push(Span::styled("  ✓ Saved", Style::default().fg(Color::Green)));
      }
      _ if self.part.last_error().is_some() => {
        status.push(Span::styled("  (refresh failed)", Style::default().fg(Color::Red)));
      }
      _ if self.part.is_refreshing() => {
        status.push(Span::styled("  (refreshing)", Style::default().fg(Color::DarkGray)));
      }
      _ => {}
    }
    lines.push(Line::default());
    lines.push(Line::from(status));

    if self.editing && !self.picker.is_active() {
      lines.push(Line::default());
      match self.allowed.state() {
        QueryState::Loading | QueryState::Idle => {
          lines.push(Line::from(label("Loading available statuses...")))
        }
        QueryState::Success(allowed) if allowed.allowable_statuses.is_empty() => {
          lines.push(Line::from(label("No status changes allowed")))
        }
        _ => {}
      }
    }

    let rows = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(lines.len() as u16), Constraint::Min(0)])
      .split(area);
    frame.render_widget(Paragraph::new(lines), rows[0]);

    // Errors below the details
    let error_area = rows[1].inner(Margin::new(0, 1));
    if let MutationState::RolledBack(error) = self.mutation() {
      frame.render_widget(ErrorDisplay::new("Failed to Update Status", &error), error_area);
    } else if let (true, QueryState::Error(error)) = (self.editing, self.allowed.state()) {
      frame.render_widget(
        ErrorDisplay::new("Failed to Load Status Options", error).with_retry(),
        error_area,
      );
    }
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(format!(" {} ", self.breadcrumb_label()))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    match self.part.state() {
      QueryState::Success(part) => self.render_part(part, frame, inner),
      QueryState::Error(error) => frame.render_widget(
        ErrorDisplay::new("Failed to Load Part Details", error).with_retry(),
        inner,
      ),
      QueryState::Loading | QueryState::Idle => frame.render_widget(
        Paragraph::new("Loading part details...").style(Style::default().fg(Color::DarkGray)),
        inner,
      ),
    }
  }
}

impl<A: PartsApi> View for PartDetailView<A> {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.picker.handle_key(key) {
      KeyResult::Event(StatusPickerEvent::Selected(status)) => {
        self.save(status);
        return ViewAction::None;
      }
      KeyResult::Event(StatusPickerEvent::Cancelled) => {
        self.stop_editing();
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('e') => self.start_editing(),
      KeyCode::Char('r') => {
        if self.part.data().is_none() || self.part.is_error() {
          self.part.refetch();
        }
        if self.allowed.is_error() {
          self.allowed.refetch();
        }
      }
      KeyCode::Esc if self.editing => self.stop_editing(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_detail(frame, area);
    self.picker.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    match self.part.data() {
      Some(part) => part.name.clone(),
      None => format!("Part {}", short_uuid(self.part_id())),
    }
  }

  fn tick(&mut self) -> ViewAction {
    self.part.poll();
    self.allowed.poll();
    self.open_picker();
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("e", "edit status").with_priority(10),
      ShortcutInfo::new("r", "retry").with_priority(20),
      ShortcutInfo::new("q", "back").with_priority(30),
    ]
  }
}
