//! Core data models for delta_fetcher
//!
//! This module defines the reconciliation data structures: a [`LinkItem`]
//! describing one downloadable unit, and the [`LinkItemCollection`] mapping
//! remote locators to items with the time-based `actualize` merge at the
//! heart of incremental updates.

use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, Duration, DurationRound, NaiveDateTime, TimeZone, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::info;

use crate::constants::time::COMPACT_FORMAT;
use crate::errors::{ModelError, ModelResult};

/// The Unix epoch, used as the "never updated" sentinel time
pub fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

/// Format a timestamp in the compact wire format (`YYYYMMDDThhmmss.ffffffZ`)
pub fn format_compact_time(time: DateTime<Utc>) -> String {
    time.format(COMPACT_FORMAT).to_string()
}

/// Parse a compact wire-format timestamp
///
/// # Errors
///
/// Returns `ModelError::InvalidTimestamp` if the value does not match the
/// compact format.
pub fn parse_compact_time(value: &str) -> ModelResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, COMPACT_FORMAT)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|_| ModelError::InvalidTimestamp {
            value: value.to_string(),
        })
}

/// Serde adapter for timestamps in the compact wire format
pub mod compact_time {
    use super::*;

    pub fn serialize<S>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_compact_time(*time))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_compact_time(&raw).map_err(serde::de::Error::custom)
    }
}

/// Truncate a timestamp to the microsecond precision of the wire format
pub(crate) fn truncate_to_micros(time: DateTime<Utc>) -> DateTime<Utc> {
    time.duration_trunc(Duration::microseconds(1))
        .unwrap_or(time)
}

/// One downloadable unit: a target file name and an update timestamp
///
/// The name is never empty and the time is always a valid instant; both are
/// enforced at construction and on every setter, including deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LinkItemRecord", into = "LinkItemRecord")]
pub struct LinkItem {
    name: String,
    time: DateTime<Utc>,
}

impl LinkItem {
    /// Create a new link item
    ///
    /// The time is truncated to microsecond precision so that the compact
    /// wire format round-trips losslessly.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::EmptyField` if the name is empty.
    pub fn new(name: impl Into<String>, time: DateTime<Utc>) -> ModelResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(ModelError::EmptyField {
                field: "link item name",
            });
        }
        Ok(Self {
            name,
            time: truncate_to_micros(time),
        })
    }

    /// Target file name of the item
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Update time of the item
    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    /// Replace the name, rejecting empty values
    pub fn set_name(&mut self, name: impl Into<String>) -> ModelResult<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(ModelError::EmptyField {
                field: "link item name",
            });
        }
        self.name = name;
        Ok(())
    }

    /// Replace the update time
    pub fn set_time(&mut self, time: DateTime<Utc>) {
        self.time = truncate_to_micros(time);
    }
}

impl fmt::Display for LinkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.name, format_compact_time(self.time))
    }
}

/// Wire representation of a [`LinkItem`]
///
/// A missing `name` or `time` key is a hard deserialization failure, not a
/// skipped entry.
#[derive(Serialize, Deserialize)]
struct LinkItemRecord {
    name: String,
    #[serde(with = "compact_time")]
    time: DateTime<Utc>,
}

impl TryFrom<LinkItemRecord> for LinkItem {
    type Error = ModelError;

    fn try_from(record: LinkItemRecord) -> ModelResult<Self> {
        LinkItem::new(record.name, record.time)
    }
}

impl From<LinkItem> for LinkItemRecord {
    fn from(item: LinkItem) -> Self {
        Self {
            name: item.name,
            time: item.time,
        }
    }
}

/// Insertion-ordered mapping from remote locator to [`LinkItem`]
///
/// Iteration and serialization follow insertion order so that progress
/// output and persisted records are reproducible across runs. Equality is
/// map equality; the order entries arrived in does not affect it.
#[derive(Debug, Clone, Default)]
pub struct LinkItemCollection {
    items: HashMap<String, LinkItem>,
    order: Vec<String>,
}

impl LinkItemCollection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items in the collection
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the collection holds no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether a locator is present
    pub fn contains(&self, locator: &str) -> bool {
        self.items.contains_key(locator)
    }

    /// Look up the item for a locator
    pub fn get(&self, locator: &str) -> Option<&LinkItem> {
        self.items.get(locator)
    }

    /// Insert or replace an item, returning the previous one if any
    ///
    /// A replaced locator keeps its original position in iteration order.
    pub fn insert(&mut self, locator: impl Into<String>, item: LinkItem) -> Option<LinkItem> {
        let locator = locator.into();
        let previous = self.items.insert(locator.clone(), item);
        if previous.is_none() {
            self.order.push(locator);
        }
        previous
    }

    /// Iterate over `(locator, item)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &LinkItem)> {
        self.order
            .iter()
            .filter_map(|locator| self.items.get(locator).map(|item| (locator.as_str(), item)))
    }

    /// Iterate over locators in insertion order
    pub fn locators(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// One-directional, time-based merge of `new` into this collection
    ///
    /// Every entry of `new` whose locator is absent here, or whose item
    /// carries a strictly newer time than the entry already present, replaces
    /// the base entry. Entries only present in the base are retained
    /// untouched; `actualize` never prunes. Re-applying the same `new` is a
    /// no-op because the comparison is strict.
    pub fn actualize(&mut self, new: &LinkItemCollection) {
        for (locator, item) in new.iter() {
            let replace = match self.items.get(locator) {
                Some(existing) if item.time() > existing.time() => {
                    info!("actualize {}: {} -> {}", locator, existing, item);
                    true
                }
                Some(_) => false,
                None => true,
            };
            if replace {
                self.insert(locator, item.clone());
            }
        }
    }

    /// Partition the collection by target-file presence
    ///
    /// Returns `(present, missing)` where an entry lands in `present` iff
    /// its item name is contained in `on_disk`. The partition is exhaustive
    /// and disjoint, and both halves keep their relative insertion order.
    pub fn split_by_presence(&self, on_disk: &HashSet<String>) -> (Self, Self) {
        let mut present = Self::new();
        let mut missing = Self::new();
        for (locator, item) in self.iter() {
            if on_disk.contains(item.name()) {
                present.insert(locator, item.clone());
            } else {
                missing.insert(locator, item.clone());
            }
        }
        (present, missing)
    }
}

impl PartialEq for LinkItemCollection {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl Eq for LinkItemCollection {}

impl FromIterator<(String, LinkItem)> for LinkItemCollection {
    fn from_iter<I: IntoIterator<Item = (String, LinkItem)>>(iter: I) -> Self {
        let mut collection = Self::new();
        for (locator, item) in iter {
            collection.insert(locator, item);
        }
        collection
    }
}

impl Serialize for LinkItemCollection {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (locator, item) in self.iter() {
            map.serialize_entry(locator, item)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for LinkItemCollection {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CollectionVisitor;

        impl<'de> Visitor<'de> for CollectionVisitor {
            type Value = LinkItemCollection;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of locator to link item")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut collection = LinkItemCollection::new();
                while let Some((locator, item)) = access.next_entry::<String, LinkItem>()? {
                    collection.insert(locator, item);
                }
                Ok(collection)
            }
        }

        deserializer.deserialize_map(CollectionVisitor)
    }
}
