//! Block states, items, and build targets.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Name of the empty block.
pub const AIR: &str = "air";

/// How long a block takes to break with the best tool available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hardness {
    /// Broken in the tick it is hit.
    #[default]
    Instant,
    /// Broken after the given number of ticks.
    Ticks(u32),
    /// Cannot be broken at all.
    Unbreakable,
}

/// One concrete state of a block: its name plus property values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockState {
    /// Block name, e.g. `stone` or `oak_slab`.
    pub name: String,
    /// Property values, e.g. `type = bottom`.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    /// Breaking behaviour.
    #[serde(default)]
    pub hardness: Hardness,
    /// Whether placing another block here replaces this one.
    #[serde(default)]
    pub replaceable: bool,
    /// Whether this state is a fluid.
    #[serde(default)]
    pub liquid: bool,
}

impl BlockState {
    /// A solid, non-replaceable block with no properties.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
            hardness: Hardness::Ticks(30),
            replaceable: false,
            liquid: false,
        }
    }

    /// The empty block.
    pub fn air() -> Self {
        Self {
            name: AIR.to_owned(),
            properties: BTreeMap::new(),
            hardness: Hardness::Instant,
            replaceable: true,
            liquid: false,
        }
    }

    /// A fluid source block.
    pub fn fluid(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
            hardness: Hardness::Unbreakable,
            replaceable: true,
            liquid: true,
        }
    }

    /// Builder: set a property value.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Builder: set the hardness.
    #[must_use]
    pub const fn with_hardness(mut self, hardness: Hardness) -> Self {
        self.hardness = hardness;
        self
    }

    /// Builder: mark the state as replaceable.
    #[must_use]
    pub const fn replaceable(mut self) -> Self {
        self.replaceable = true;
        self
    }

    /// Whether this is the empty block.
    pub fn is_air(&self) -> bool {
        self.name == AIR
    }

    /// Value of a property, if the state has it.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Whether both states belong to the same block.
    pub fn same_block(&self, other: &Self) -> bool {
        self.name == other.name
    }

    /// Names of the properties whose values differ between the two states.
    pub fn differing_properties<'a>(&'a self, other: &'a Self) -> BTreeSet<&'a str> {
        self.properties
            .keys()
            .chain(other.properties.keys())
            .map(String::as_str)
            .filter(|key| self.property(key) != other.property(key))
            .collect()
    }

    /// Whether the states match once the `ignored` properties are disregarded.
    pub fn matches_ignoring(&self, other: &Self, ignored: &BTreeSet<String>) -> bool {
        self.same_block(other)
            && self
                .differing_properties(other)
                .iter()
                .all(|key| ignored.contains(*key))
    }
}

impl core::fmt::Display for BlockState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.name)?;
        if !self.properties.is_empty() {
            let props: Vec<String> = self
                .properties
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            write!(f, "[{}]", props.join(","))?;
        }
        Ok(())
    }
}

/// An item that can be held in a hotbar slot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Item(pub String);

impl Item {
    /// Create an item from its name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The item that places `state`.
    pub fn placing(state: &BlockState) -> Self {
        Self(state.name.clone())
    }

    /// Item name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Item {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The desired state of one position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetState {
    /// The position should be empty.
    Empty,
    /// The position should hold exactly this state.
    Exact(BlockState),
}

impl TargetState {
    /// Whether `current` already satisfies the target.
    pub fn is_satisfied_by(&self, current: &BlockState) -> bool {
        match self {
            Self::Empty => current.is_air(),
            Self::Exact(state) => state == current,
        }
    }

    /// The block state the target resolves to.
    pub fn state(&self) -> BlockState {
        match self {
            Self::Empty => BlockState::air(),
            Self::Exact(state) => state.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn differing_properties_covers_both_sides() {
        let a = BlockState::new("oak_slab").with("type", "bottom").with("waterlogged", "false");
        let b = BlockState::new("oak_slab").with("type", "top");
        let diff = a.differing_properties(&b);
        assert_eq!(diff.into_iter().collect::<Vec<_>>(), vec!["type", "waterlogged"]);
    }

    #[test]
    fn matches_ignoring_listed_properties() {
        let a = BlockState::new("lamp").with("lit", "true");
        let b = BlockState::new("lamp").with("lit", "false");
        let ignored: BTreeSet<String> = ["lit".to_owned()].into_iter().collect();
        assert!(a.matches_ignoring(&b, &ignored));
        assert!(!a.matches_ignoring(&b, &BTreeSet::new()));
        assert!(!a.matches_ignoring(&BlockState::new("stone"), &ignored));
    }

    #[test]
    fn empty_target_is_satisfied_by_air_only() {
        assert!(TargetState::Empty.is_satisfied_by(&BlockState::air()));
        assert!(!TargetState::Empty.is_satisfied_by(&BlockState::new("stone")));
    }

    #[test]
    fn display_lists_properties() {
        let state = BlockState::new("oak_slab").with("type", "top");
        assert_eq!(state.to_string(), "oak_slab[type=top]");
    }
}
