use crate::parts::types::Configuration;
use crate::parts::{CachedPartsClient, ChildrenKey, HttpPartsApi, PartsApi};
use crate::query::{Query, QueryState};
use crate::ui::components::ErrorDisplay;
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::short_uuid;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::ConfigTreeView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use tracing::{info, warn};

/// Root view: the machines at the top of the configuration tree
pub struct MachineListView<A: PartsApi = HttpPartsApi> {
  client: CachedPartsClient<A>,
  query: Query<ChildrenKey, A>,
  list_state: ListState,
  /// Machine uuid or serial to open once the list is loaded
  preselect: Option<String>,
}

impl<A: PartsApi> MachineListView<A> {
  pub fn new(client: CachedPartsClient<A>, preselect: Option<String>) -> Self {
    Self {
      query: Query::new(ChildrenKey::root(), client.clone()),
      client,
      list_state: ListState::default(),
      preselect,
    }
  }

  fn machines(&self) -> &[Configuration] {
    self.query.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  fn open(&self, machine: &Configuration) -> ViewAction {
    ViewAction::Push(Box::new(ConfigTreeView::new(
      machine.clone(),
      self.client.clone(),
    )))
  }

  /// Open the machine requested on the command line, once the list is known.
  fn take_preselect(&mut self) -> ViewAction {
    if self.query.data().is_none() {
      return ViewAction::None;
    }
    let Some(wanted) = self.preselect.take() else {
      return ViewAction::None;
    };

    let found = self.machines().iter().position(|m| {
      m.uuid == wanted || m.end_unit_serial_no.as_deref() == Some(wanted.as_str())
    });
    match found {
      Some(idx) => {
        info!(machine = %wanted, "opening preselected machine");
        self.list_state.select(Some(idx));
        let machine = self.machines()[idx].clone();
        self.open(&machine)
      }
      None => {
        warn!(machine = %wanted, "preselected machine not found");
        ViewAction::None
      }
    }
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.machines().len();
    ensure_valid_selection(&mut self.list_state, len);

    let title = match self.query.state() {
      QueryState::Loading | QueryState::Idle => " Time Machines (loading...) ".to_string(),
      _ if self.query.is_refreshing() => format!(" Time Machines ({}, refreshing) ", len),
      _ => format!(" Time Machines ({}) ", len),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if let QueryState::Error(error) = self.query.state() {
      frame.render_widget(
        ErrorDisplay::new("Failed to Load Time Machines", error).with_retry(),
        area,
      );
      return;
    }

    if len == 0 {
      let content = if self.query.is_loading() {
        "Loading time machines..."
      } else {
        "No time machines available"
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray).italic());
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = self
      .machines()
      .iter()
      .map(|machine| {
        let serial = machine.end_unit_serial_no.as_deref().unwrap_or("-");
        ListItem::new(Line::from(vec![
          Span::styled("Serial: ", Style::default().fg(Color::DarkGray)),
          Span::styled(format!("{:<16}", serial), Style::default().fg(Color::Cyan)),
          Span::styled(
            format!(" (UUID: {}...)", short_uuid(&machine.uuid)),
            Style::default().fg(Color::DarkGray),
          ),
        ]))
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

impl<A: PartsApi> View for MachineListView<A> {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.list_state.select_next();
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
      }
      KeyCode::Char('r') => {
        self.query.refetch();
      }
      KeyCode::Enter => {
        let selected = self
          .list_state
          .selected()
          .and_then(|idx| self.machines().get(idx))
          .cloned();
        if let Some(machine) = selected {
          return self.open(&machine);
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Time Machines".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    self.query.poll();
    self.take_preselect()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("enter", "open").with_priority(10),
      ShortcutInfo::new("r", "refresh").with_priority(20),
      ShortcutInfo::new("q", "quit").with_priority(30),
    ]
  }
}
