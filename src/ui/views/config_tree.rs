use crate::cache::FetchStatus;
use crate::error::FetchError;
use crate::parts::types::{ConfigWithPart, Configuration, Part};
use crate::parts::{CachedPartsClient, ChildrenKey, HttpPartsApi, PartKey, PartsApi};
use crate::query::{Query, QueryState};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{short_uuid, status_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::PartDetailView;
use crossterm::event::{KeyCode, KeyEvent};
use futures::FutureExt;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use std::collections::{HashMap, HashSet};
use tokio::task::JoinHandle;

/// One visible line of the tree
#[derive(Debug, Clone, PartialEq)]
enum TreeRow {
  Node {
    config: Configuration,
    resolved: Resolved,
    depth: usize,
    parent: Option<usize>,
  },
  /// Loading, empty or error line under an expanded node
  Notice {
    depth: usize,
    text: String,
    error: bool,
    parent: usize,
  },
}

impl TreeRow {
  fn parent(&self) -> Option<usize> {
    match self {
      TreeRow::Node { parent, .. } => *parent,
      TreeRow::Notice { parent, .. } => Some(*parent),
    }
  }
}

/// What the joined children list said about a node's part
#[derive(Debug, Clone, PartialEq)]
enum Resolved {
  /// Not part of a settled join (the machine itself)
  Unknown,
  Part(Part),
  Failed,
}

impl From<Option<Part>> for Resolved {
  fn from(part: Option<Part>) -> Self {
    part.map_or(Resolved::Failed, Resolved::Part)
  }
}

type JoinResult = Result<Vec<ConfigWithPart>, FetchError>;

/// Children of an expanded node, paired with their parts
#[derive(Default)]
struct Branch {
  /// Latest settled join; kept on screen while a newer one runs
  current: Option<JoinResult>,
  pending: Option<JoinHandle<JoinResult>>,
}

impl Branch {
  /// Take the pending join's result if it has finished.
  fn settle(&mut self) -> bool {
    let Some(handle) = self.pending.as_mut() else {
      return false;
    };
    if !handle.is_finished() {
      return false;
    }
    let result = match handle.now_or_never() {
      Some(Ok(result)) => result,
      Some(Err(error)) => Err(FetchError::Unknown(error.to_string())),
      None => return false,
    };
    self.pending = None;
    self.current = Some(result);
    true
  }
}

/// How a part reads in a tree row
#[derive(Debug, Clone, PartialEq)]
enum PartLabel {
  Loaded(Part),
  Loading,
  Failed,
}

/// Configuration tree of one machine, with lazily loaded children
pub struct ConfigTreeView<A: PartsApi = HttpPartsApi> {
  client: CachedPartsClient<A>,
  machine: Configuration,
  expanded: HashSet<String>,
  /// Children of every node that has been shown, keyed by configuration uuid
  children: HashMap<String, Query<ChildrenKey, A>>,
  /// Joined children of expanded nodes
  branches: HashMap<String, Branch>,
  rows: Vec<TreeRow>,
  list_state: ListState,
}

impl<A: PartsApi> ConfigTreeView<A> {
  pub fn new(machine: Configuration, client: CachedPartsClient<A>) -> Self {
    drop(client.prefetch_part(&machine.part_uuid));
    let mut view = Self {
      client,
      machine,
      expanded: HashSet::new(),
      children: HashMap::new(),
      branches: HashMap::new(),
      rows: Vec::new(),
      // The machine itself starts out as the selected configuration
      list_state: ListState::default().with_selected(Some(0)),
    };
    view.rebuild_rows();
    view
  }

  /// Start (or restart) joining the children of `uuid` with their parts.
  fn join_children(&mut self, uuid: &str) {
    let join = self.client.children_with_parts(Some(uuid));
    let branch = self.branches.entry(uuid.to_string()).or_default();
    branch.settle();
    branch.pending = Some(tokio::spawn(join));
  }

  /// Flatten the visible part of the tree.
  ///
  /// Every shown node gets a children query so its expander is known before
  /// the user opens it. Expanded nodes list their joined children.
  fn rebuild_rows(&mut self) {
    let mut rows = Vec::new();
    let mut stack = vec![(self.machine.clone(), Resolved::Unknown, 0, None)];

    while let Some((config, resolved, depth, parent)) = stack.pop() {
      self
        .children
        .entry(config.uuid.clone())
        .or_insert_with(|| Query::new(ChildrenKey::of(config.uuid.as_str()), self.client.clone()));
      let joined = self.expanded.contains(&config.uuid).then(|| {
        self
          .branches
          .get(&config.uuid)
          .and_then(|branch| branch.current.clone())
      });

      let index = rows.len();
      rows.push(TreeRow::Node {
        config,
        resolved,
        depth,
        parent,
      });
      let Some(joined) = joined else {
        continue;
      };

      let notice = |text: String, error: bool| TreeRow::Notice {
        depth: depth + 1,
        text,
        error,
        parent: index,
      };
      match joined {
        Some(Ok(children)) if children.is_empty() => {
          rows.push(notice("No child configurations".to_string(), false));
        }
        Some(Ok(children)) => {
          for child in children.into_iter().rev() {
            stack.push((child.item, child.resolved.into(), depth + 1, Some(index)));
          }
        }
        Some(Err(error)) => rows.push(notice(
          format!("⚠ Failed to load child configurations: {}", error.user_message()),
          true,
        )),
        None => rows.push(notice("Loading...".to_string(), false)),
      }
    }

    self.rows = rows;
    ensure_valid_selection(&mut self.list_state, self.rows.len());
  }

  fn selected_row(&self) -> Option<&TreeRow> {
    self.list_state.selected().and_then(|idx| self.rows.get(idx))
  }

  fn selected_config(&self) -> Option<&Configuration> {
    match self.selected_row() {
      Some(TreeRow::Node { config, .. }) => Some(config),
      _ => None,
    }
  }

  fn has_children(&self, uuid: &str) -> Option<bool> {
    self
      .children
      .get(uuid)
      .and_then(|query| query.data())
      .map(|children| !children.is_empty())
  }

  fn expand(&mut self) {
    let Some(uuid) = self.selected_config().map(|c| c.uuid.clone()) else {
      return;
    };
    // Known leaves have nothing to expand
    if self.has_children(&uuid) == Some(false) {
      return;
    }
    let settled_ok = self
      .branches
      .get(&uuid)
      .is_some_and(|branch| matches!(branch.current, Some(Ok(_))));
    if !settled_ok {
      self.join_children(&uuid);
    }
    self.expanded.insert(uuid);
    self.rebuild_rows();
  }

  /// Collapse the selected node, or jump to its parent if already collapsed.
  fn collapse(&mut self) {
    let Some(row) = self.selected_row().cloned() else {
      return;
    };
    if let TreeRow::Node { config, .. } = &row {
      if self.expanded.remove(&config.uuid) {
        self.rebuild_rows();
        return;
      }
    }
    if let Some(parent) = row.parent() {
      self.list_state.select(Some(parent));
    }
  }

  fn toggle(&mut self) {
    let expanded = self
      .selected_config()
      .is_some_and(|c| self.expanded.contains(&c.uuid));
    if expanded {
      self.collapse();
    } else {
      self.expand();
    }
  }

  /// Retry whatever failed for the selected node.
  fn refresh_selected(&mut self) {
    let target = match self.selected_row() {
      Some(TreeRow::Node { config, .. }) => Some(config.clone()),
      Some(TreeRow::Notice { parent, .. }) => match self.rows.get(*parent) {
        Some(TreeRow::Node { config, .. }) => Some(config.clone()),
        _ => None,
      },
      None => None,
    };
    let Some(config) = target else {
      return;
    };

    if let Some(query) = self.children.get_mut(&config.uuid) {
      query.refetch();
    }
    self.client.refetch(&PartKey(config.part_uuid.clone()));
    if self.expanded.contains(&config.uuid) {
      self.join_children(&config.uuid);
    }
    self.rebuild_rows();
  }

  /// The store wins so later writes (status edits) show up in the tree;
  /// the join decides while the store has nothing.
  fn part_label(&self, part_uuid: &str, resolved: &Resolved) -> PartLabel {
    let snapshot = self
      .client
      .store()
      .peek(&PartKey(part_uuid.to_string()), self.client.policy().parts_stale_after);
    let loading = snapshot.is_loading();
    match (snapshot.value, resolved) {
      (Some(part), _) => PartLabel::Loaded(part),
      (None, Resolved::Part(part)) => PartLabel::Loaded(part.clone()),
      (None, _) if loading => PartLabel::Loading,
      (None, Resolved::Failed) => PartLabel::Failed,
      (None, Resolved::Unknown) if snapshot.status == FetchStatus::Error => PartLabel::Failed,
      (None, Resolved::Unknown) => PartLabel::Loading,
    }
  }

  fn expander(&self, uuid: &str) -> &'static str {
    let Some(query) = self.children.get(uuid) else {
      return " ";
    };
    match query.state() {
      QueryState::Loading => "⋯",
      QueryState::Error(_) => "!",
      QueryState::Success(children) if children.is_empty() => " ",
      QueryState::Success(_) if self.expanded.contains(uuid) => "▾",
      QueryState::Success(_) => "▸",
      QueryState::Idle => " ",
    }
  }

  fn row_line(&self, row: &TreeRow) -> Line<'static> {
    match row {
      TreeRow::Node {
        config,
        resolved,
        depth,
        ..
      } => {
        let mut spans = vec![
          Span::raw("  ".repeat(*depth)),
          Span::styled(
            format!("{} ", self.expander(&config.uuid)),
            Style::default().fg(Color::DarkGray),
          ),
        ];
        match self.part_label(&config.part_uuid, resolved) {
          PartLabel::Loaded(part) => {
            spans.push(Span::raw(truncate(&part.name, 48)));
            spans.push(Span::styled(
              format!(" [{}]", part.status),
              Style::default().fg(status_color(part.status)),
            ));
          }
          PartLabel::Loading => {
            spans.push(Span::styled("Loading...", Style::default().fg(Color::DarkGray)));
          }
          PartLabel::Failed => {
            spans.push(Span::styled(
              "⚠ Error loading part",
              Style::default().fg(Color::Red),
            ));
          }
        }
        if let Some(serial) = &config.end_unit_serial_no {
          spans.push(Span::styled(
            format!(" (Serial: {})", serial),
            Style::default().fg(Color::DarkGray),
          ));
        }
        Line::from(spans)
      }
      TreeRow::Notice {
        depth, text, error, ..
      } => {
        let color = if *error { Color::Red } else { Color::DarkGray };
        Line::from(vec![
          Span::raw("  ".repeat(*depth + 1)),
          Span::styled(text.clone(), Style::default().fg(color).italic()),
        ])
      }
    }
  }

  fn render_tree(&mut self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(format!(" {} ", self.breadcrumb_label()))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let items: Vec<ListItem> = self
      .rows
      .iter()
      .map(|row| ListItem::new(self.row_line(row)))
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

  /// Summary of the selected configuration's part
  fn render_summary(&self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(" Part ")
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::DarkGray));

    let label = |text: &'static str| Span::styled(text, Style::default().fg(Color::DarkGray));
    let selected = match self.selected_row() {
      Some(TreeRow::Node {
        config, resolved, ..
      }) => Some((config, resolved)),
      _ => None,
    };
    let lines = match selected {
      None => vec![],
      Some((config, resolved)) => match self.part_label(&config.part_uuid, resolved) {
        PartLabel::Loaded(part) => {
          let mut lines = vec![
            Line::from(Span::styled(part.name.clone(), Style::default().bold())),
            Line::default(),
            Line::from(vec![label("Part UUID: "), Span::raw(part.uuid.clone())]),
            Line::from(vec![label("Unit: "), Span::raw(part.unit.clone())]),
          ];
          if let Some(version) = &part.version {
            lines.push(Line::from(vec![label("Version: "), Span::raw(version.clone())]));
          }
          lines.push(Line::from(vec![
            label("Status: "),
            Span::styled(
              part.status.to_string(),
              Style::default().fg(status_color(part.status)),
            ),
          ]));
          lines.push(Line::default());
          lines.push(Line::from(label("Press enter for details")));
          lines
        }
        PartLabel::Loading => vec![Line::from(label("Loading part details..."))],
        PartLabel::Failed => vec![Line::from(Span::styled(
          "⚠ Failed to load part details. Press r to retry.",
          Style::default().fg(Color::Red),
        ))],
      },
    };

    frame.render_widget(Paragraph::new(lines).block(block), area);
  }
}

impl<A: PartsApi> View for ConfigTreeView<A> {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.list_state.select_next();
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
      }
      KeyCode::Char('l') | KeyCode::Right => self.expand(),
      KeyCode::Char('h') | KeyCode::Left => self.collapse(),
      KeyCode::Char(' ') | KeyCode::Tab => self.toggle(),
      KeyCode::Char('r') => self.refresh_selected(),
      KeyCode::Enter => {
        if let Some(config) = self.selected_config() {
          return ViewAction::Push(Box::new(PartDetailView::new(
            config.clone(),
            self.client.clone(),
          )));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let columns = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
      .split(area);
    self.render_tree(frame, columns[0]);
    self.render_summary(frame, columns[1]);
  }

  fn breadcrumb_label(&self) -> String {
    match &self.machine.end_unit_serial_no {
      Some(serial) => format!("Serial {}", serial),
      None => short_uuid(&self.machine.uuid).to_string(),
    }
  }

  fn tick(&mut self) -> ViewAction {
    for branch in self.branches.values_mut() {
      branch.settle();
    }

    // A refreshed child list means the joined rows are out of date
    let mut rejoin = Vec::new();
    for (uuid, query) in self.children.iter_mut() {
      let changed = query.poll();
      if changed && query.data().is_some() && self.expanded.contains(uuid) {
        rejoin.push(uuid.clone());
      }
    }
    for uuid in rejoin {
      self.join_children(&uuid);
    }
    self.rebuild_rows();
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("space", "expand").with_priority(10),
      ShortcutInfo::new("enter", "part").with_priority(15),
      ShortcutInfo::new("r", "retry").with_priority(20),
      ShortcutInfo::new("q", "back").with_priority(30),
    ]
  }
}
