//! Scenario files: the villages and commands of one resolution run.

use std::path::Path;

use bastion_core::village::VillageCombatState;
use bastion_types::Command;
use serde::Deserialize;

use crate::error::EngineError;

/// A set of villages and the commands arriving at them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Scenario {
    /// Initial village states.
    #[serde(default)]
    pub villages: Vec<VillageCombatState>,

    /// Commands to resolve in one tick.
    #[serde(default)]
    pub commands: Vec<Command>,
}

impl Scenario {
    /// Load a scenario from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, EngineError> {
        let contents = std::fs::read_to_string(path).map_err(|e| EngineError::Scenario {
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        Self::parse(&contents)
    }

    /// Parse a scenario from YAML.
    pub fn parse(yaml: &str) -> Result<Self, EngineError> {
        serde_yml::from_str(yaml).map_err(|e| EngineError::Scenario {
            message: format!("failed to parse scenario YAML: {e}"),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn parses_villages_and_commands() {
        let yaml = r"
villages:
  - id: 0190a7c2-0000-7000-8000-000000000001
    owner_points: 700
    garrison: { spear: 100 }
    allegiance:
      allegiance: 100
      floor: 0
      last_regen_at: 0
commands:
  - id: 0190a7c2-0000-7000-8000-0000000000a1
    arrival: 43200
    sequence: 1
    kind: attack
    origin: 0190a7c2-0000-7000-8000-000000000002
    target: 0190a7c2-0000-7000-8000-000000000001
    player: 0190a7c2-0000-7000-8000-0000000000f1
    attacker_points: 1000
    units: { axe: 100 }
";
        let scenario = Scenario::parse(yaml).unwrap();
        assert_eq!(scenario.villages.len(), 1);
        assert_eq!(scenario.villages.first().unwrap().garrison.get("spear"), 100);
        assert_eq!(scenario.commands.first().unwrap().units.get("axe"), 100);
    }

    #[test]
    fn garbage_is_a_scenario_error() {
        assert!(matches!(
            Scenario::parse("villages: 12"),
            Err(EngineError::Scenario { .. })
        ));
    }
}
