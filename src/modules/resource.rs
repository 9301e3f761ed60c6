use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Energy,
    Hydrogen,
    Oxygen,
    Utrium,
    Lemergium,
    Keanium,
    Zynthium,
    Catalyst,
    Ghodium,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 9] = [
        ResourceKind::Energy,
        ResourceKind::Hydrogen,
        ResourceKind::Oxygen,
        ResourceKind::Utrium,
        ResourceKind::Lemergium,
        ResourceKind::Keanium,
        ResourceKind::Zynthium,
        ResourceKind::Catalyst,
        ResourceKind::Ghodium,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ResourceKind::Energy => "energy",
            ResourceKind::Hydrogen => "hydrogen",
            ResourceKind::Oxygen => "oxygen",
            ResourceKind::Utrium => "utrium",
            ResourceKind::Lemergium => "lemergium",
            ResourceKind::Keanium => "keanium",
            ResourceKind::Zynthium => "zynthium",
            ResourceKind::Catalyst => "catalyst",
            ResourceKind::Ghodium => "ghodium",
        }
    }
}

impl Default for ResourceKind {
    fn default() -> Self {
        ResourceKind::Energy
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for ResourceKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.label() == wanted)
            .ok_or(())
    }
}

/// Resource amounts keyed by kind. Zero entries are never stored, so an empty
/// map always means "holds nothing".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<ResourceKind, u32>",
    into = "BTreeMap<ResourceKind, u32>"
)]
pub struct Carry(BTreeMap<ResourceKind, u32>);

impl From<BTreeMap<ResourceKind, u32>> for Carry {
    fn from(map: BTreeMap<ResourceKind, u32>) -> Self {
        map.into_iter().collect()
    }
}

impl From<Carry> for BTreeMap<ResourceKind, u32> {
    fn from(carry: Carry) -> Self {
        carry.0
    }
}

impl Carry {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, kind: ResourceKind) -> u32 {
        self.0.get(&kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.0.values().fold(0u32, |acc, v| acc.saturating_add(*v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn add(&mut self, kind: ResourceKind, amount: u32) {
        if amount == 0 {
            return;
        }
        let slot = self.0.entry(kind).or_insert(0);
        *slot = slot.saturating_add(amount);
    }

    /// Removes up to `amount` of `kind` and returns how much was actually taken.
    pub fn take(&mut self, kind: ResourceKind, amount: u32) -> u32 {
        let Some(slot) = self.0.get_mut(&kind) else {
            return 0;
        };
        let taken = (*slot).min(amount);
        *slot -= taken;
        if *slot == 0 {
            self.0.remove(&kind);
        }
        taken
    }

    pub fn merge(&mut self, other: &Carry) {
        for (kind, amount) in other.iter() {
            self.add(kind, amount);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, u32)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}

impl FromIterator<(ResourceKind, u32)> for Carry {
    fn from_iter<I: IntoIterator<Item = (ResourceKind, u32)>>(iter: I) -> Self {
        let mut carry = Carry::new();
        for (kind, amount) in iter {
            carry.add(kind, amount);
        }
        carry
    }
}

impl fmt::Display for Carry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "-");
        }
        let parts: Vec<String> = self
            .iter()
            .map(|(kind, amount)| format!("{}={}", kind, amount))
            .collect();
        write!(f, "{}", parts.join(","))
    }
}
