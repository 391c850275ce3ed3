//! Robot/player status model consumed by the console.
//!
//! Every constructor funnels through [`StatusSnapshot::sanitized`] so that the
//! published values always satisfy the range invariants: inventory quantities
//! are unsigned, battery sits in `[0, 100]`, gas and visibility in `[0, 1]`,
//! and a contact distance is either a finite non-negative number or unknown.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A contact closer than this (metres) counts as detected.
pub const DETECTION_RANGE_M: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Supply items the robot can carry and deploy.
pub enum ItemKind {
    Water,
    Food,
}

impl ItemKind {
    pub const ALL: [ItemKind; 2] = [ItemKind::Water, ItemKind::Food];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Water => "water",
            Self::Food => "food",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown item kind '{0}'")]
pub struct ItemKindParseError(pub String);

impl FromStr for ItemKind {
    type Err = ItemKindParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "water" => Ok(Self::Water),
            "food" => Ok(Self::Food),
            _ => Err(ItemKindParseError(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
/// Item counts keyed by kind; quantities are unsigned by construction.
pub struct Inventory {
    items: BTreeMap<ItemKind, u32>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: ItemKind, quantity: u32) -> Self {
        self.set(kind, quantity);
        self
    }

    /// Builds an inventory from wire counts, clamping negatives to zero.
    pub fn from_signed<I>(counts: I) -> Self
    where
        I: IntoIterator<Item = (ItemKind, i64)>,
    {
        let mut inventory = Self::new();
        for (kind, count) in counts {
            let clamped = u32::try_from(count.max(0)).unwrap_or(u32::MAX);
            inventory.set(kind, clamped);
        }
        inventory
    }

    pub fn set(&mut self, kind: ItemKind, quantity: u32) {
        self.items.insert(kind, quantity);
    }

    pub fn quantity(&self, kind: ItemKind) -> u32 {
        self.items.get(&kind).copied().unwrap_or(0)
    }

    pub fn has_stock(&self, kind: ItemKind) -> bool {
        self.quantity(kind) > 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (ItemKind, u32)> + '_ {
        self.items.iter().map(|(kind, quantity)| (*kind, *quantity))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Environmental sensor readings.
pub struct Environment {
    pub battery_percent: f64,
    pub temperature_c: f64,
    pub gas_level: f64,
    pub visibility: f64,
    pub person_detected: bool,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            battery_percent: 85.0,
            temperature_c: 25.0,
            gas_level: 0.3,
            visibility: 0.8,
            person_detected: false,
        }
    }
}

impl Environment {
    pub fn clamped(self) -> Self {
        Self {
            battery_percent: clamp_finite(self.battery_percent, 0.0, 100.0),
            temperature_c: if self.temperature_c.is_finite() {
                self.temperature_c
            } else {
                0.0
            },
            gas_level: clamp_finite(self.gas_level, 0.0, 1.0),
            visibility: clamp_finite(self.visibility, 0.0, 1.0),
            person_detected: self.person_detected,
        }
    }
}

fn clamp_finite(value: f64, low: f64, high: f64) -> f64 {
    if value.is_nan() {
        return low;
    }
    value.clamp(low, high)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Last fully decoded robot/player state.
pub struct StatusSnapshot {
    pub inventory: Inventory,
    pub position: Position,
    pub distance_to_contact: Option<f64>,
    pub contact_id: Option<String>,
    pub player_id: Option<String>,
    #[serde(flatten)]
    pub environment: Environment,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            inventory: Inventory::new()
                .with(ItemKind::Water, 10)
                .with(ItemKind::Food, 10),
            position: Position::default(),
            distance_to_contact: None,
            contact_id: None,
            player_id: None,
            environment: Environment::default(),
        }
    }
}

impl StatusSnapshot {
    /// Returns the snapshot with every range invariant enforced.
    pub fn sanitized(mut self) -> Self {
        self.environment = self.environment.clamped();
        self.distance_to_contact = self
            .distance_to_contact
            .filter(|distance| distance.is_finite() && *distance >= 0.0);
        self
    }

    /// Replaces the environment block, keeping every other field.
    pub fn with_environment(&self, environment: Environment) -> Self {
        Self {
            environment,
            ..self.clone()
        }
        .sanitized()
    }

    /// True when a known contact lies inside [`DETECTION_RANGE_M`].
    pub fn contact_in_range(&self) -> bool {
        self.distance_to_contact
            .is_some_and(|distance| distance < DETECTION_RANGE_M)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_kind_parses_case_insensitively_and_rejects_unknown() {
        assert_eq!("Water".parse::<ItemKind>(), Ok(ItemKind::Water));
        assert_eq!(" food ".parse::<ItemKind>(), Ok(ItemKind::Food));
        assert_eq!(
            "medkit".parse::<ItemKind>(),
            Err(ItemKindParseError("medkit".to_string()))
        );
    }

    #[test]
    fn inventory_from_signed_clamps_negative_counts() {
        let inventory = Inventory::from_signed([(ItemKind::Water, -4), (ItemKind::Food, 7)]);
        assert_eq!(inventory.quantity(ItemKind::Water), 0);
        assert_eq!(inventory.quantity(ItemKind::Food), 7);
        assert!(!inventory.has_stock(ItemKind::Water));
    }

    #[test]
    fn sanitized_clamps_environment_and_drops_bad_distance() {
        let snapshot = StatusSnapshot {
            distance_to_contact: Some(f64::NAN),
            environment: Environment {
                battery_percent: 140.0,
                temperature_c: 22.0,
                gas_level: -0.5,
                visibility: f64::NAN,
                person_detected: false,
            },
            ..StatusSnapshot::default()
        }
        .sanitized();

        assert_eq!(snapshot.environment.battery_percent, 100.0);
        assert_eq!(snapshot.environment.gas_level, 0.0);
        assert_eq!(snapshot.environment.visibility, 0.0);
        assert_eq!(snapshot.distance_to_contact, None);
    }

    #[test]
    fn with_environment_replaces_only_environment() {
        let base = StatusSnapshot {
            player_id: Some("p-1".to_string()),
            ..StatusSnapshot::default()
        };
        let next = base.with_environment(Environment {
            battery_percent: 12.0,
            ..Environment::default()
        });
        assert_eq!(next.player_id.as_deref(), Some("p-1"));
        assert_eq!(next.environment.battery_percent, 12.0);
        assert_eq!(base.environment.battery_percent, 85.0);
    }

    #[test]
    fn snapshot_serializes_inventory_as_kind_map() {
        let value = serde_json::to_value(StatusSnapshot::default()).expect("serialize");
        assert_eq!(value["inventory"]["water"], 10);
        assert_eq!(value["batteryPercent"], 85.0);
        assert!(value["distanceToContact"].is_null());
    }

    #[test]
    fn contact_in_range_uses_strict_threshold() {
        let mut snapshot = StatusSnapshot {
            distance_to_contact: Some(14.9),
            ..StatusSnapshot::default()
        };
        assert!(snapshot.contact_in_range());
        snapshot.distance_to_contact = Some(DETECTION_RANGE_M);
        assert!(!snapshot.contact_in_range());
        snapshot.distance_to_contact = None;
        assert!(!snapshot.contact_in_range());
    }
}
