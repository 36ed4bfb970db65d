//! Longest-prefix routing of relative paths to destination folders.

use std::collections::BTreeMap;

use crate::error::{Result, SyncError};
use crate::path;

/// One `prefix -> destination` row of the mapping table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    prefix: String,
    segments: Vec<String>,
    destination_id: String,
}

impl MappingEntry {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn destination_id(&self) -> &str {
        &self.destination_id
    }

    /// True if every segment of this prefix equals the path segment at the
    /// same index.
    fn is_prefix_of(&self, path_segments: &[&str]) -> bool {
        if self.segments.len() > path_segments.len() {
            return false;
        }
        self.segments
            .iter()
            .zip(path_segments)
            .all(|(key, seg)| key == seg)
    }
}

/// Immutable table of normalized path prefixes to destination-folder ids.
#[derive(Debug, Clone)]
pub struct MappingTable {
    entries: Vec<MappingEntry>,
}

impl MappingTable {
    /// Build a table from raw configuration keys.
    ///
    /// Fails when the table is empty, when a destination id is blank, or when
    /// two keys normalize to the same prefix.
    pub fn new<I, K, V>(raw: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut seen: BTreeMap<String, String> = BTreeMap::new();
        let mut entries = Vec::new();

        for (key, destination) in raw {
            let raw_key = key.as_ref();
            let destination_id: String = destination.into();
            let destination_id = destination_id.trim().to_string();
            if destination_id.is_empty() {
                return Err(SyncError::Config(format!(
                    "Mapping '{}' has an empty destination id",
                    raw_key
                )));
            }

            let prefix = path::normalize(raw_key);
            if let Some(previous) = seen.insert(prefix.clone(), raw_key.to_string()) {
                return Err(SyncError::Config(format!(
                    "Mapping keys '{}' and '{}' both normalize to '{}'",
                    previous, raw_key, prefix
                )));
            }

            entries.push(MappingEntry {
                segments: path::segments(&prefix).map(str::to_string).collect(),
                prefix,
                destination_id,
            });
        }

        if entries.is_empty() {
            return Err(SyncError::Config(
                "Mapping table is empty: at least one prefix -> folder id entry is required"
                    .to_string(),
            ));
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Where a candidate file should be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedDestination {
    Mapped {
        destination_id: String,
        matched_prefix: String,
    },
    Unmapped,
}

impl ResolvedDestination {
    pub fn destination_id(&self) -> Option<&str> {
        match self {
            ResolvedDestination::Mapped { destination_id, .. } => Some(destination_id),
            ResolvedDestination::Unmapped => None,
        }
    }
}

/// Resolve `path` to the mapping entry with the most segments among those
/// whose key is a path-prefix of it.
///
/// Selection compares segment counts strictly, so the winner does not depend
/// on table order. An entry whose prefix normalizes to nothing matches every
/// path with the lowest specificity.
pub fn resolve(path: &str, table: &MappingTable) -> ResolvedDestination {
    let path_segments: Vec<&str> = path::segments(path).collect();

    let mut best: Option<&MappingEntry> = None;
    for entry in table.entries() {
        if !entry.is_prefix_of(&path_segments) {
            continue;
        }
        if best.map_or(true, |b| entry.segments.len() > b.segments.len()) {
            best = Some(entry);
        }
    }

    match best {
        Some(entry) => ResolvedDestination::Mapped {
            destination_id: entry.destination_id.clone(),
            matched_prefix: entry.prefix.clone(),
        },
        None => ResolvedDestination::Unmapped,
    }
}
