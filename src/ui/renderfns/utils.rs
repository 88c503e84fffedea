use crate::parts::types::PartStatus;
use ratatui::prelude::Color;

/// Truncate a string to at most `max_len` characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// First eight characters of a uuid, as shown next to serials
pub fn short_uuid(uuid: &str) -> &str {
  match uuid.char_indices().nth(8) {
    Some((end, _)) => &uuid[..end],
    None => uuid,
  }
}

/// Display color for a part status
pub fn status_color(status: PartStatus) -> Color {
  match status {
    PartStatus::Active => Color::Green,
    PartStatus::Configuration | PartStatus::Draft | PartStatus::Experimental => Color::Yellow,
    PartStatus::Recalled => Color::Red,
    PartStatus::Deprecated | PartStatus::Obsolete | PartStatus::Retired => Color::DarkGray,
  }
}
