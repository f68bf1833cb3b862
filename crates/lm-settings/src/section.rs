//! Sections and the shared row index
//!
//! A [`Section`] is the column span of one rule (or of the identity block,
//! [`NONE_SECTION`]). Rows are keyed by entity ID; their order comes from the
//! [`RowIndex`] shared by every section, so row *i* of section A and row *i*
//! of section B always describe the same entity.

use std::collections::HashMap;

/// Name of the identity section (ID, name, advertiser metadata)
pub const NONE_SECTION: &str = "none";

/// Row key of the column label row
pub const ID_ROW: &str = "ID";

/// Names no rule section may take: the identity section and the fixed row keys
pub const RESERVED_NAMES: [&str; 3] = [NONE_SECTION, ID_ROW, crate::setting_map::DEFAULT_ID];

/// Check if `name` cannot be used as a rule section name
#[inline]
#[must_use]
pub fn is_reserved_name(name: &str) -> bool {
    name.trim().is_empty() || RESERVED_NAMES.contains(&name)
}

/// Column labels of the identity section
pub const IDENTITY_LABELS: [&str; 4] = ["ID", "Name", "Advertiser ID", "Advertiser Name"];

/// Column span of the settings grid owned by one rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    name: String,
    width: usize,
    helper: Vec<String>,
    rows: HashMap<String, Vec<String>>,
}

impl Section {
    /// Create empty section of `width` columns
    #[must_use]
    pub fn new(name: impl Into<String>, width: usize) -> Self {
        Self {
            name: name.into(),
            width,
            helper: vec![String::new(); width],
            rows: HashMap::new(),
        }
    }

    /// Create the identity section with its fixed labels
    #[must_use]
    pub fn identity() -> Self {
        let mut section = Self::new(NONE_SECTION, IDENTITY_LABELS.len());
        section.set_row(ID_ROW, IDENTITY_LABELS.iter().map(ToString::to_string).collect());
        section
    }

    /// Section name (rule name or `none`)
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if this is the identity section
    #[inline]
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.name == NONE_SECTION
    }

    /// Number of columns
    #[inline]
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grow to `width` columns, padding every row with blanks
    pub fn widen(&mut self, width: usize) {
        if width <= self.width {
            return;
        }
        self.width = width;
        self.helper.resize(width, String::new());
        for row in self.rows.values_mut() {
            row.resize(width, String::new());
        }
    }

    /// Helper text row, exactly `width` cells
    #[inline]
    #[must_use]
    pub fn helper(&self) -> &[String] {
        &self.helper
    }

    /// Replace the helper row
    pub fn set_helper(&mut self, mut cells: Vec<String>) {
        cells.resize(self.width, String::new());
        self.helper = cells;
    }

    /// Column labels (the `ID` row), if recorded
    #[inline]
    #[must_use]
    pub fn labels(&self) -> Option<&[String]> {
        self.row(ID_ROW)
    }

    /// Row for `id`, exactly `width` cells
    #[inline]
    #[must_use]
    pub fn row(&self, id: &str) -> Option<&[String]> {
        self.rows.get(id).map(Vec::as_slice)
    }

    /// Row for `id`, or `width` blanks when absent
    #[must_use]
    pub fn row_or_blank(&self, id: &str) -> Vec<String> {
        self.rows
            .get(id)
            .cloned()
            .unwrap_or_else(|| vec![String::new(); self.width])
    }

    /// Store a row; cells are padded or cut to the section width
    pub fn set_row(&mut self, id: impl Into<String>, mut cells: Vec<String>) {
        cells.resize(self.width, String::new());
        self.rows.insert(id.into(), cells);
    }

    /// Check if a row is recorded for `id`
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.rows.contains_key(id)
    }

    /// Recorded row IDs, unordered
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    /// Number of recorded rows, including `ID` and `default`
    #[inline]
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Entity ID to row ordinal, shared by all sections
///
/// Seeded with the fixed `ID` and `default` rows. Grows as new IDs are seen
/// and never shrinks within a load/save cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowIndex {
    ordinals: HashMap<String, usize>,
    next: usize,
}

impl RowIndex {
    /// Rows that always lead the data block
    pub const FIXED_ROWS: [&'static str; 2] = [ID_ROW, crate::setting_map::DEFAULT_ID];

    /// Grid rows above the first indexed row (section header and helper text)
    pub const HEADER_ROWS: usize = 2;

    /// Create index seeded with the fixed rows
    #[must_use]
    pub fn new() -> Self {
        let mut index = Self {
            ordinals: HashMap::new(),
            next: 0,
        };
        for id in Self::FIXED_ROWS {
            index.ensure(id);
        }
        index
    }

    /// Ordinal for `id`, assigning the next one if unseen
    pub fn ensure(&mut self, id: &str) -> usize {
        if let Some(&ordinal) = self.ordinals.get(id) {
            return ordinal;
        }
        let ordinal = self.next;
        self.ordinals.insert(id.to_string(), ordinal);
        self.next += 1;
        ordinal
    }

    /// Ordinal for `id`
    #[inline]
    #[must_use]
    pub fn get(&self, id: &str) -> Option<usize> {
        self.ordinals.get(id).copied()
    }

    /// Grid row of `id` once recomposed
    #[inline]
    #[must_use]
    pub fn grid_row(&self, id: &str) -> Option<usize> {
        self.get(id).map(|ordinal| ordinal + Self::HEADER_ROWS)
    }

    /// Check if `id` is one of the fixed rows
    #[inline]
    #[must_use]
    pub fn is_fixed(id: &str) -> bool {
        Self::FIXED_ROWS.contains(&id)
    }

    /// IDs sorted by ordinal
    #[must_use]
    pub fn ordered_ids(&self) -> Vec<String> {
        let mut entries: Vec<(&String, &usize)> = self.ordinals.iter().collect();
        entries.sort_by_key(|(_, ordinal)| **ordinal);
        entries.into_iter().map(|(id, _)| id.clone()).collect()
    }

    /// Same order, renumbered densely from zero
    #[must_use]
    pub fn rebuild(&self) -> Self {
        let ordered = self.ordered_ids();
        let next = ordered.len();
        Self {
            ordinals: ordered
                .into_iter()
                .enumerate()
                .map(|(ordinal, id)| (id, ordinal))
                .collect(),
            next,
        }
    }

    /// Number of indexed rows, including fixed rows
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ordinals.len()
    }

    /// Always false: the fixed rows are present
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordinals.is_empty()
    }
}

impl Default for RowIndex {
    fn default() -> Self {
        Self::new()
    }
}
