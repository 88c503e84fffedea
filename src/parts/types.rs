use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cache::Joined;

/// Node of the configuration tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
  pub uuid: String,
  pub part_uuid: String,
  #[serde(default)]
  pub end_unit_serial_no: Option<String>,
}

/// Lifecycle status of a part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartStatus {
  Configuration,
  Active,
  Draft,
  Deprecated,
  Obsolete,
  Experimental,
  Retired,
  Recalled,
}

impl PartStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      PartStatus::Configuration => "configuration",
      PartStatus::Active => "active",
      PartStatus::Draft => "draft",
      PartStatus::Deprecated => "deprecated",
      PartStatus::Obsolete => "obsolete",
      PartStatus::Experimental => "experimental",
      PartStatus::Retired => "retired",
      PartStatus::Recalled => "recalled",
    }
  }
}

impl fmt::Display for PartStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Part referenced by a configuration node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
  pub uuid: String,
  pub name: String,
  #[serde(default)]
  pub version: Option<String>,
  pub status: PartStatus,
  pub unit: String,
}

/// Status transitions the server currently allows for a part
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowableStatuses {
  pub part_uuid: String,
  pub current_status: PartStatus,
  pub allowable_statuses: Vec<PartStatus>,
}

/// Partial update of a part. Unset fields are neither sent nor merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub unit: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<PartStatus>,
}

impl PartUpdate {
  pub fn status(status: PartStatus) -> Self {
    Self {
      status: Some(status),
      ..Self::default()
    }
  }

  /// The part as it would look after this update.
  pub fn apply_to(&self, part: &Part) -> Part {
    Part {
      unit: self.unit.clone().unwrap_or_else(|| part.unit.clone()),
      status: self.status.unwrap_or(part.status),
      ..part.clone()
    }
  }
}

/// Configuration node joined with its part; `None` if the part failed to load
pub type ConfigWithPart = Joined<Configuration, Part>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_configuration_wire_format() {
    let config: Configuration = serde_json::from_str(
      r#"{"uuid":"c-1","partUuid":"p-1","endUnitSerialNo":"DMC-12"}"#,
    )
    .unwrap();
    assert_eq!(config.part_uuid, "p-1");
    assert_eq!(config.end_unit_serial_no.as_deref(), Some("DMC-12"));

    let bare: Configuration = serde_json::from_str(r#"{"uuid":"c-2","partUuid":"p-2"}"#).unwrap();
    assert_eq!(bare.end_unit_serial_no, None);
  }

  #[test]
  fn test_allowable_statuses_wire_format() {
    let allowed: AllowableStatuses = serde_json::from_str(
      r#"{"partUuid":"p-1","currentStatus":"configuration","allowableStatuses":["configuration","active"]}"#,
    )
    .unwrap();
    assert_eq!(allowed.current_status, PartStatus::Configuration);
    assert_eq!(
      allowed.allowable_statuses,
      vec![PartStatus::Configuration, PartStatus::Active]
    );
  }

  #[test]
  fn test_update_serializes_only_set_fields() {
    let body = serde_json::to_string(&PartUpdate::status(PartStatus::Recalled)).unwrap();
    assert_eq!(body, r#"{"status":"recalled"}"#);
  }

  #[test]
  fn test_update_merge() {
    let part = Part {
      uuid: "p-1".into(),
      name: "Flux capacitor".into(),
      version: Some("1.21".into()),
      status: PartStatus::Draft,
      unit: "ea".into(),
    };
    let updated = PartUpdate::status(PartStatus::Active).apply_to(&part);
    assert_eq!(updated.status, PartStatus::Active);
    assert_eq!(updated.unit, "ea");
    assert_eq!(updated.name, part.name);

    let unit_only = PartUpdate {
      unit: Some("kg".into()),
      status: None,
    };
    assert_eq!(unit_only.apply_to(&part).status, PartStatus::Draft);
  }

  #[test]
  fn test_status_names_round_trip_serde() {
    let all = [
      PartStatus::Configuration,
      PartStatus::Active,
      PartStatus::Draft,
      PartStatus::Deprecated,
      PartStatus::Obsolete,
      PartStatus::Experimental,
      PartStatus::Retired,
      PartStatus::Recalled,
    ];
    for status in all {
      let json = serde_json::to_string(&status).unwrap();
      assert_eq!(json, format!("\"{}\"", status));
    }
  }
}
