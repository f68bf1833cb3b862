//! Entity granularity tags

use crate::error::SettingsError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Which entity collection a rule applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Granularity {
    /// DV360 campaign
    #[serde(rename = "Campaign")]
    Campaign,
    /// Insertion order
    #[serde(rename = "Insertion Order")]
    InsertionOrder,
    /// Line item
    #[serde(rename = "Line Item")]
    LineItem,
}

impl Granularity {
    /// All granularities in display order
    pub const ALL: [Self; 3] = [Self::Campaign, Self::InsertionOrder, Self::LineItem];

    /// Display string, also used in persisted sheets
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Campaign => "Campaign",
            Self::InsertionOrder => "Insertion Order",
            Self::LineItem => "Line Item",
        }
    }
}

impl Display for Granularity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "campaign" => Ok(Self::Campaign),
            "insertionorder" | "io" => Ok(Self::InsertionOrder),
            "lineitem" | "li" => Ok(Self::LineItem),
            _ => Err(SettingsError::UnsupportedGranularity(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_display_strings() {
        for g in Granularity::ALL {
            assert_eq!(g.as_str().parse::<Granularity>().unwrap(), g);
        }
    }

    #[test]
    fn parses_loose_spellings() {
        assert_eq!(
            "insertion_order".parse::<Granularity>().unwrap(),
            Granularity::InsertionOrder
        );
        assert_eq!("LINE-ITEM".parse::<Granularity>().unwrap(), Granularity::LineItem);
    }

    #[test]
    fn rejects_unknown() {
        let err = "Advertiser".parse::<Granularity>().unwrap_err();
        assert_eq!(err, SettingsError::UnsupportedGranularity("Advertiser".to_string()));
    }
}
