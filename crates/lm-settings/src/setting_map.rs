//! Per-entity settings with a `default` fallback row

use indexmap::IndexMap;

/// Row key of the fallback settings record
pub const DEFAULT_ID: &str = "default";

/// Flat parameter record: parameter key (or label) to cell value
pub type SettingsRecord = IndexMap<String, String>;

/// Ordered map from entity ID to its settings record
///
/// A value is unset if and only if it is the empty string. Unset values
/// resolve to the `default` record's value for the same key. Values such as
/// `"0"` are set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingMap {
    entries: IndexMap<String, SettingsRecord>,
}

impl SettingMap {
    /// Create empty map
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(id, record)` pairs
    ///
    /// Later duplicates overwrite earlier ones but keep the first-seen position.
    #[must_use]
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, SettingsRecord)>,
        K: Into<String>,
    {
        let mut map = Self::new();
        for (id, record) in pairs {
            map.insert(id, record);
        }
        map
    }

    /// Insert or overwrite the record for `id`
    #[inline]
    pub fn insert(&mut self, id: impl Into<String>, record: SettingsRecord) {
        self.entries.insert(id.into(), record);
    }

    /// Raw record for `id`, without fallback
    #[inline]
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&SettingsRecord> {
        self.entries.get(id)
    }

    /// The `default` record, if present
    #[inline]
    #[must_use]
    pub fn default_record(&self) -> Option<&SettingsRecord> {
        self.entries.get(DEFAULT_ID)
    }

    /// Resolve the settings for `id`
    ///
    /// Iterates the keys of the entity's record (or of the `default` record
    /// when the entity is unknown). Each blank value falls back to the
    /// `default` record, then to `""`.
    #[must_use]
    pub fn get_or_default(&self, id: &str) -> SettingsRecord {
        let default = self.default_record();
        let Some(base) = self.entries.get(id).or(default) else {
            return SettingsRecord::new();
        };

        base.iter()
            .map(|(key, value)| {
                let resolved = if value.is_empty() {
                    default
                        .and_then(|d| d.get(key))
                        .cloned()
                        .unwrap_or_default()
                } else {
                    value.clone()
                };
                (key.clone(), resolved)
            })
            .collect()
    }

    /// Check if a record exists for `id`
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Entity IDs in first-seen order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterate `(id, record)` pairs in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingsRecord)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of records, including `default`
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if map is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, SettingsRecord)> for SettingMap {
    fn from_iter<T: IntoIterator<Item = (K, SettingsRecord)>>(iter: T) -> Self {
        Self::from_pairs(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> SettingsRecord {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn blank_falls_back_to_default() {
        let map = SettingMap::from_pairs([
            ("default", record(&[("a", "X")])),
            ("e1", record(&[("a", "")])),
        ]);
        assert_eq!(map.get_or_default("e1")["a"], "X");
    }

    #[test]
    fn zero_is_not_blank() {
        let map = SettingMap::from_pairs([
            ("default", record(&[("a", "X")])),
            ("e1", record(&[("a", "0")])),
        ]);
        assert_eq!(map.get_or_default("e1")["a"], "0");
    }

    #[test]
    fn unknown_entity_uses_default_record() {
        let map = SettingMap::from_pairs([("default", record(&[("a", "X"), ("b", "")]))]);
        let resolved = map.get_or_default("missing");
        assert_eq!(resolved["a"], "X");
        assert_eq!(resolved["b"], "");
    }

    #[test]
    fn missing_default_resolves_to_empty() {
        let map = SettingMap::from_pairs([("e1", record(&[("a", ""), ("b", "1")]))]);
        let resolved = map.get_or_default("e1");
        assert_eq!(resolved["a"], "");
        assert_eq!(resolved["b"], "1");
    }

    #[test]
    fn empty_map_resolves_to_empty_record() {
        assert!(SettingMap::new().get_or_default("e1").is_empty());
    }

    #[test]
    fn duplicate_ids_last_write_wins_first_position_kept() {
        let map = SettingMap::from_pairs([
            ("e1", record(&[("a", "1")])),
            ("e2", record(&[("a", "2")])),
            ("e1", record(&[("a", "3")])),
        ]);
        assert_eq!(map.ids().collect::<Vec<_>>(), vec!["e1", "e2"]);
        assert_eq!(map.get("e1").unwrap()["a"], "3");
    }
}
