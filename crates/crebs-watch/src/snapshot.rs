use std::collections::HashMap;
use std::fmt::{self, Display};

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::{BookingRecord, ResultRecord};

pub const RESULT_PREFIX: &str = "RES_";
pub const BOOKING_PREFIX: &str = "BOOK_";

/// Flat key → value view of the portal at one point in time.
///
/// Entries keep insertion order, which fixes the order changes are reported
/// in. Re-inserting a key replaces its value in place. Equality ignores order.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizes extracted rows into a snapshot: results first, then bookings.
    pub fn from_records(results: &[ResultRecord], bookings: &[BookingRecord]) -> Self {
        let mut snapshot = Self::new();
        for result in results {
            snapshot.insert(
                format!("{}{}", RESULT_PREFIX, result.paper),
                result.status.clone(),
            );
        }
        for booking in bookings {
            snapshot.insert(
                format!("{}{}", BOOKING_PREFIX, booking.paper),
                format!("{} | {}", booking.status, booking.display_date()),
            );
        }
        snapshot
    }

    pub fn insert(&mut self, key: String, value: String) {
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.index.get(key).map(|&i| self.entries[i].1.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl Eq for Snapshot {}

impl FromIterator<(String, String)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for (key, value) in iter {
            snapshot.insert(key, value);
        }
        snapshot
    }
}

impl Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in self.iter() {
            writeln!(f, "{} = {}", key, value)?;
        }
        Ok(())
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct SnapshotVisitor;

impl<'de> Visitor<'de> for SnapshotVisitor {
    type Value = Snapshot;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object of string keys to string values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut snapshot = Snapshot::new();
        while let Some((key, value)) = access.next_entry::<String, String>()? {
            snapshot.insert(key, value);
        }
        Ok(snapshot)
    }
}

impl<'de> Deserialize<'de> for Snapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(SnapshotVisitor)
    }
}
