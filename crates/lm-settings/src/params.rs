//! Rule parameter schemas
//!
//! Parameters are persisted by label, not by key. Renaming a key keeps the
//! stored values; renaming a label starts a fresh column.

use crate::setting_map::{SettingMap, DEFAULT_ID};

/// Predicate a non-blank cell value must satisfy
pub type Validator = fn(&str) -> bool;

/// One rule parameter
#[derive(Debug, Clone)]
pub struct ParamDef {
    /// Internal key, used by evaluation callbacks
    pub key: String,
    /// Column label, used for persistence
    pub label: String,
    /// Value written to the `default` row for a new column
    pub default_value: Option<String>,
    /// Optional check applied to non-blank values
    pub validator: Option<Validator>,
}

impl ParamDef {
    /// Create new parameter
    #[inline]
    #[must_use]
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            default_value: None,
            validator: None,
        }
    }

    /// With schema default
    #[inline]
    #[must_use]
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// With validation predicate
    #[inline]
    #[must_use]
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Check a cell value; blanks always pass
    #[inline]
    #[must_use]
    pub fn accepts(&self, value: &str) -> bool {
        value.is_empty() || self.validator.map_or(true, |check| check(value))
    }
}

/// A stored value rejected by its parameter's validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidValue {
    /// Entity row holding the value (may be `default`)
    pub entity_id: String,
    /// Parameter label
    pub label: String,
    /// Offending value
    pub value: String,
}

/// Ordered parameter schema of one rule
#[derive(Debug, Clone, Default)]
pub struct RuleParams {
    params: Vec<ParamDef>,
}

impl RuleParams {
    /// Create empty schema
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter
    #[inline]
    #[must_use]
    pub fn with(mut self, param: ParamDef) -> Self {
        self.push(param);
        self
    }

    /// Append a parameter in place
    ///
    /// A parameter reusing an existing label replaces the earlier one.
    pub fn push(&mut self, param: ParamDef) {
        if let Some(existing) = self.params.iter_mut().find(|p| p.label == param.label) {
            *existing = param;
        } else {
            self.params.push(param);
        }
    }

    /// Iterate parameters in declared order
    pub fn iter(&self) -> impl Iterator<Item = &ParamDef> {
        self.params.iter()
    }

    /// Labels in declared order
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|p| p.label.as_str())
    }

    /// Parameter with the given label
    #[inline]
    #[must_use]
    pub fn by_label(&self, label: &str) -> Option<&ParamDef> {
        self.params.iter().find(|p| p.label == label)
    }

    /// Parameter with the given key
    #[inline]
    #[must_use]
    pub fn by_key(&self, key: &str) -> Option<&ParamDef> {
        self.params.iter().find(|p| p.key == key)
    }

    /// Number of parameters
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check if schema has no parameters
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Values in a label-keyed map that fail their validator
    #[must_use]
    pub fn invalid_values(&self, settings: &SettingMap) -> Vec<InvalidValue> {
        let mut invalid = Vec::new();
        for (entity_id, record) in settings.iter() {
            for (label, value) in record {
                let Some(param) = self.by_label(label) else {
                    continue;
                };
                if !param.accepts(value) {
                    invalid.push(InvalidValue {
                        entity_id: entity_id.to_string(),
                        label: label.clone(),
                        value: value.clone(),
                    });
                }
            }
        }
        invalid
    }

    /// `default` record built purely from schema defaults, keyed by label
    #[must_use]
    pub fn default_record(&self) -> SettingMap {
        SettingMap::from_pairs([(
            DEFAULT_ID,
            self.params
                .iter()
                .map(|p| (p.label.clone(), p.default_value.clone().unwrap_or_default()))
                .collect(),
        )])
    }
}

impl FromIterator<ParamDef> for RuleParams {
    fn from_iter<T: IntoIterator<Item = ParamDef>>(iter: T) -> Self {
        let mut params = Self::new();
        for param in iter {
            params.push(param);
        }
        params
    }
}

/// Any finite number
#[must_use]
pub fn is_number(value: &str) -> bool {
    value.trim().parse::<f64>().is_ok_and(f64::is_finite)
}

/// A number in `[0, 1]`
#[must_use]
pub fn is_percent(value: &str) -> bool {
    value
        .trim()
        .parse::<f64>()
        .is_ok_and(|v| (0.0..=1.0).contains(&v))
}

/// Comma separated list with no empty entries
#[must_use]
pub fn is_geo_list(value: &str) -> bool {
    value.split(',').all(|geo| !geo.trim().is_empty())
}
