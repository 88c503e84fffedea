//! In-memory configuration service for tests.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Notify;

use crate::error::FetchError;
use crate::parts::client::PartsApi;
use crate::parts::types::{AllowableStatuses, Configuration, Part, PartStatus, PartUpdate};

#[derive(Clone, Default)]
pub struct FakeApi {
  inner: Arc<FakeState>,
}

#[derive(Default)]
struct FakeState {
  /// `None` holds the machines
  children: Mutex<HashMap<Option<String>, Vec<Configuration>>>,
  parts: Mutex<HashMap<String, Part>>,
  broken_parts: Mutex<HashSet<String>>,
  reject_updates: Mutex<bool>,
  update_gate: Mutex<Option<Arc<Notify>>>,
  calls: Mutex<Vec<String>>,
}

/// Transitions the fake server allows out of each status.
pub fn transitions(status: PartStatus) -> Vec<PartStatus> {
  use PartStatus::*;
  match status {
    Configuration => vec![Configuration, Active, Recalled],
    Recalled => vec![Configuration, Active],
    Draft => vec![Draft, Active],
    Active => vec![Active, Deprecated, Recalled],
    Retired => vec![],
    other => vec![other],
  }
}

impl FakeApi {
  pub fn with_part(self, id: &str, status: PartStatus) -> Self {
    self.inner.parts.lock().insert(
      id.to_string(),
      Part {
        uuid: id.to_string(),
        name: format!("Part {}", id),
        version: None,
        status,
        unit: "ea".to_string(),
      },
    );
    self
  }

  /// Children of `parent` referencing `parts`, with uuids `<parent>-<index>`
  /// (`m-<index>` for machines).
  pub fn with_children(self, parent: Option<&str>, parts: &[&str]) -> Self {
    let parent_label = parent.unwrap_or("m");
    let children = parts
      .iter()
      .enumerate()
      .map(|(i, part)| Configuration {
        uuid: format!("{}-{}", parent_label, i),
        part_uuid: part.to_string(),
        end_unit_serial_no: None,
      })
      .collect();
    self
      .inner
      .children
      .lock()
      .insert(parent.map(String::from), children);
    self
  }

  /// Add a machine with a serial number to the root listing.
  pub fn with_machine(self, uuid: &str, part: &str, serial: &str) -> Self {
    self
      .inner
      .children
      .lock()
      .entry(None)
      .or_default()
      .push(Configuration {
        uuid: uuid.to_string(),
        part_uuid: part.to_string(),
        end_unit_serial_no: Some(serial.to_string()),
      });
    self
  }

  pub fn break_part(&self, id: &str) {
    self.inner.broken_parts.lock().insert(id.to_string());
  }

  pub fn repair_part(&self, id: &str) {
    self.inner.broken_parts.lock().remove(id);
  }

  pub fn reject_updates(&self) {
    *self.inner.reject_updates.lock() = true;
  }

  /// Hold every update until the returned gate is notified.
  pub fn gate_updates(&self) -> Arc<Notify> {
    let gate = Arc::new(Notify::new());
    *self.inner.update_gate.lock() = Some(Arc::clone(&gate));
    gate
  }

  fn record(&self, call: String) {
    self.inner.calls.lock().push(call);
  }

  /// How often `call` (e.g. `"part p-1"`) was made.
  pub fn calls(&self, call: &str) -> usize {
    self.inner.calls.lock().iter().filter(|c| *c == call).count()
  }
}

impl PartsApi for FakeApi {
  async fn list_children(&self, parent: Option<&str>) -> Result<Vec<Configuration>, FetchError> {
    self.record(format!("children {}", parent.unwrap_or("root")));
    let children = self
      .inner
      .children
      .lock()
      .get(&parent.map(String::from))
      .cloned();
    match (children, parent) {
      (Some(children), _) => Ok(children),
      (None, None) => Ok(Vec::new()),
      (None, Some(parent)) => Err(FetchError::not_found(format!("configuration {}", parent))),
    }
  }

  async fn get_part(&self, id: &str) -> Result<Part, FetchError> {
    self.record(format!("part {}", id));
    if self.inner.broken_parts.lock().contains(id) {
      return Err(FetchError::Server {
        status: 500,
        message: String::new(),
      });
    }
    let part = self.inner.parts.lock().get(id).cloned();
    part.ok_or_else(|| FetchError::not_found(format!("part {}", id)))
  }

  async fn get_allowable_statuses(&self, id: &str) -> Result<AllowableStatuses, FetchError> {
    self.record(format!("allowable {}", id));
    let part = self.inner.parts.lock().get(id).cloned();
    let part = part.ok_or_else(|| FetchError::not_found(format!("part {}", id)))?;
    Ok(AllowableStatuses {
      part_uuid: part.uuid,
      current_status: part.status,
      allowable_statuses: transitions(part.status),
    })
  }

  async fn update_part(&self, id: &str, update: &PartUpdate) -> Result<Part, FetchError> {
    self.record(format!("update {}", id));
    let gate = self.inner.update_gate.lock().clone();
    if let Some(gate) = gate {
      gate.notified().await;
    }
    if *self.inner.reject_updates.lock() {
      return Err(FetchError::Validation {
        status: 422,
        message: "Invalid status transition".to_string(),
      });
    }
    let mut parts = self.inner.parts.lock();
    let part = parts
      .get_mut(id)
      .ok_or_else(|| FetchError::not_found(format!("part {}", id)))?;
    *part = update.apply_to(part);
    Ok(part.clone())
  }
}
