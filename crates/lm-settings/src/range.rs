//! Rule settings grid codec
//!
//! [`RuleRange::decompose`] splits a persisted grid into sections and
//! [`RuleRange::recompose`] joins them back. Row order is owned by the
//! [`RowIndex`]; section order by insertion order of the section map.

use crate::granularity::Granularity;
use crate::params::RuleParams;
use crate::section::{RowIndex, Section, ID_ROW, NONE_SECTION};
use crate::setting_map::{SettingMap, SettingsRecord, DEFAULT_ID};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::ops::Range;

/// Persisted 2-D string grid
pub type Grid = Vec<Vec<String>>;

/// Grid row holding column labels
const LABEL_ROW: usize = 2;

/// Decomposed settings grid
#[derive(Debug, Clone, Default)]
pub struct RuleRange {
    pub(crate) sections: IndexMap<String, Section>,
    pub(crate) row_index: RowIndex,
    pub(crate) granularities: HashMap<String, Granularity>,
    pub(crate) column_orders: HashMap<String, Vec<String>>,
}

impl RuleRange {
    /// Create empty range
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create range and load `grid`
    #[must_use]
    pub fn from_grid(grid: &[Vec<String>]) -> Self {
        let mut range = Self::new();
        range.decompose(grid);
        range
    }

    /// Load a persisted grid
    ///
    /// Column 0 always starts the identity section; any other column starts a
    /// new section when its row-0 cell is non-empty. Rows with a blank ID are
    /// skipped. Previously seen IDs keep their ordinal, so decomposing the same
    /// grid twice leaves the row index unchanged.
    pub fn decompose(&mut self, grid: &[Vec<String>]) {
        let Some(header) = grid.first() else {
            tracing::debug!("Empty settings grid, nothing to load");
            return;
        };
        let width = grid.iter().map(Vec::len).max().unwrap_or(0);
        if width == 0 {
            tracing::debug!("Settings grid has no columns, nothing to load");
            return;
        }

        let spans = section_spans(header, width);
        for (name, span) in &spans {
            let mut section = Section::new(name.clone(), span.len());
            if let Some(helper) = grid.get(1) {
                section.set_helper(slice(helper, span));
            }
            self.sections.insert(name.clone(), section);
        }

        for (row_no, row) in grid.iter().enumerate().skip(LABEL_ROW) {
            let id = if row_no == LABEL_ROW {
                ID_ROW
            } else {
                match row.first().map(String::as_str) {
                    Some(id) if !id.trim().is_empty() && id != ID_ROW => id,
                    _ => continue,
                }
            };
            self.set_row_cells(id, &spans, row);
        }

        tracing::debug!(
            "Decomposed settings grid into {} sections and {} rows",
            self.sections.len(),
            self.row_index.len()
        );
    }

    fn set_row_cells(&mut self, id: &str, spans: &[(String, Range<usize>)], row: &[String]) {
        self.row_index.ensure(id);
        for (name, span) in spans {
            if let Some(section) = self.sections.get_mut(name) {
                section.set_row(id, slice(row, span));
            }
        }
    }

    /// Rebuild a single grid from the recorded sections
    ///
    /// With a granularity filter only the identity section and sections of
    /// rules registered with that granularity are emitted. Every indexed row is
    /// emitted either way, blank-filled where a section has no row for it. The
    /// row index is renumbered densely and becomes the authoritative index
    /// afterwards.
    pub fn recompose(&mut self, filter: Option<Granularity>) -> Grid {
        self.row_index = self.row_index.rebuild();

        let included: Vec<&Section> = self
            .sections
            .values()
            .filter(|section| {
                section.is_identity()
                    || filter.map_or(true, |g| self.granularities.get(section.name()) == Some(&g))
            })
            .collect();

        let ids = self.row_index.ordered_ids();

        let mut header = Vec::new();
        let mut helper = Vec::new();
        let mut rows = vec![Vec::new(); ids.len()];
        for section in &included {
            let title = if section.is_identity() { "" } else { section.name() };
            header.extend(std::iter::repeat(title.to_string()).take(section.width()));
            helper.extend(section.helper().iter().cloned());
            for (row, id) in rows.iter_mut().zip(&ids) {
                row.extend(section.row_or_blank(id));
            }
        }
        collapse_header(&mut header);

        tracing::debug!(
            "Recomposed {} sections into {} rows x {} columns",
            included.len(),
            rows.len() + RowIndex::HEADER_ROWS,
            header.len()
        );

        let mut grid = Vec::with_capacity(rows.len() + RowIndex::HEADER_ROWS);
        grid.push(header);
        grid.push(helper);
        grid.extend(rows);
        grid
    }

    /// Record a row in `section`, registering `id` in the row index
    ///
    /// Returns `false` without changes when the section is unknown or the ID
    /// is blank.
    pub fn set_row(&mut self, section: &str, id: &str, cells: Vec<String>) -> bool {
        if id.trim().is_empty() {
            return false;
        }
        let Some(target) = self.sections.get_mut(section) else {
            return false;
        };
        target.set_row(id, cells);
        self.row_index.ensure(id);
        true
    }

    /// Associate a rule section with its granularity
    #[inline]
    pub fn register_granularity(&mut self, rule: impl Into<String>, granularity: Granularity) {
        self.granularities.insert(rule.into(), granularity);
    }

    /// Granularity registered for a rule section
    #[inline]
    #[must_use]
    pub fn granularity(&self, rule: &str) -> Option<Granularity> {
        self.granularities.get(rule).copied()
    }

    /// Section by name
    #[inline]
    #[must_use]
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    /// The identity section, if loaded
    #[inline]
    #[must_use]
    pub fn identity(&self) -> Option<&Section> {
        self.sections.get(NONE_SECTION)
    }

    /// Sections in grid order
    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.values()
    }

    /// Number of recorded sections
    #[inline]
    #[must_use]
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Shared row index
    #[inline]
    #[must_use]
    pub fn row_index(&self) -> &RowIndex {
        &self.row_index
    }

    /// Cached column order (labels) of a rule
    #[inline]
    #[must_use]
    pub fn column_order(&self, rule: &str) -> Option<&[String]> {
        self.column_orders.get(rule).map(Vec::as_slice)
    }

    /// Label-keyed settings of a rule section, in row order
    ///
    /// The `ID` row is excluded. Unknown sections yield an empty map.
    #[must_use]
    pub fn label_settings(&self, rule: &str) -> SettingMap {
        let Some(section) = self.sections.get(rule) else {
            return SettingMap::new();
        };
        let Some(labels) = section.labels() else {
            return SettingMap::new();
        };
        self.row_index
            .ordered_ids()
            .into_iter()
            .filter(|id| id != ID_ROW)
            .filter_map(|id| {
                let row = section.row(&id)?;
                let record: SettingsRecord = labels
                    .iter()
                    .zip(row)
                    .filter(|(label, _)| !label.is_empty())
                    .map(|(label, value)| (label.clone(), value.clone()))
                    .collect();
                Some((id, record))
            })
            .collect()
    }

    /// Key-keyed settings of a rule, ready for evaluation
    ///
    /// Columns whose label is not in `params` are dropped. The `default`
    /// record always carries every parameter: the stored value when
    /// non-blank, otherwise the schema default.
    #[must_use]
    pub fn rule_settings(&self, rule: &str, params: &RuleParams) -> SettingMap {
        let by_label = self.label_settings(rule);
        let stored_default = by_label.get(DEFAULT_ID);

        let default: SettingsRecord = params
            .iter()
            .map(|param| {
                let value = stored_default
                    .and_then(|record| record.get(&param.label))
                    .filter(|value| !value.is_empty())
                    .cloned()
                    .or_else(|| param.default_value.clone())
                    .unwrap_or_default();
                (param.key.clone(), value)
            })
            .collect();

        let mut settings = SettingMap::new();
        settings.insert(DEFAULT_ID, default);
        for (id, record) in by_label.iter().filter(|(id, _)| *id != DEFAULT_ID) {
            let keyed: SettingsRecord = params
                .iter()
                .map(|param| {
                    (
                        param.key.clone(),
                        record.get(&param.label).cloned().unwrap_or_default(),
                    )
                })
                .collect();
            settings.insert(id, keyed);
        }
        settings
    }
}

/// Column spans of each section, keyed by section name
fn section_spans(header: &[String], width: usize) -> Vec<(String, Range<usize>)> {
    let mut starts: Vec<(String, usize)> = vec![(NONE_SECTION.to_string(), 0)];
    starts.extend(
        header
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, cell)| !cell.is_empty())
            .map(|(col, cell)| (cell.clone(), col)),
    );

    let ends = starts
        .iter()
        .skip(1)
        .map(|(_, start)| *start)
        .chain(std::iter::once(width));
    starts
        .iter()
        .zip(ends)
        .map(|((name, start), end)| (name.clone(), *start..end))
        .collect()
}

/// Cells of `row` in `span`, blank where the row is short
fn slice(row: &[String], span: &Range<usize>) -> Vec<String> {
    span.clone()
        .map(|col| row.get(col).cloned().unwrap_or_default())
        .collect()
}

/// Blank every header cell equal to its left neighbour
fn collapse_header(header: &mut [String]) {
    for col in (1..header.len()).rev() {
        if header[col] == header[col - 1] {
            header[col].clear();
        }
    }
}
