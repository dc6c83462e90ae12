//! Table set catalog: the fixed, ordered list of size classes and the naming
//! rule for the three tables of each set.
//!
//! Set `416K` joins left table `lpt416K` against lookup table `pt416K` and is
//! verified against reference table `rt416K`. The declaration order of
//! [`TableSetId`] is the size order used for range selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A named size class. Variants are declared smallest to largest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TableSetId {
    #[serde(rename = "208K")]
    S208K,
    #[serde(rename = "416K")]
    S416K,
    #[serde(rename = "832K")]
    S832K,
    #[serde(rename = "2M")]
    S2M,
    #[serde(rename = "3M")]
    S3M,
    #[serde(rename = "7M")]
    S7M,
    #[serde(rename = "10M")]
    S10M,
    #[serde(rename = "13M")]
    S13M,
    #[serde(rename = "16M")]
    S16M,
}

/// Sets larger than this run a single timed iteration.
pub const EARLY_EXIT_AFTER: TableSetId = TableSetId::S3M;

impl TableSetId {
    /// Every set, in size order.
    pub const ALL: [TableSetId; 9] = [
        TableSetId::S208K,
        TableSetId::S416K,
        TableSetId::S832K,
        TableSetId::S2M,
        TableSetId::S3M,
        TableSetId::S7M,
        TableSetId::S10M,
        TableSetId::S13M,
        TableSetId::S16M,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TableSetId::S208K => "208K",
            TableSetId::S416K => "416K",
            TableSetId::S832K => "832K",
            TableSetId::S2M => "2M",
            TableSetId::S3M => "3M",
            TableSetId::S7M => "7M",
            TableSetId::S10M => "10M",
            TableSetId::S13M => "13M",
            TableSetId::S16M => "16M",
        }
    }

    /// Position in the size order.
    pub fn order_index(self) -> usize {
        self as usize
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.label() == label)
    }

    /// Parse a lookup table identifier such as `pt832K`.
    pub fn from_lookup_table(name: &str) -> Option<Self> {
        name.strip_prefix("pt").and_then(Self::from_label)
    }

    /// Identifier of this set's lookup table, e.g. `pt832K`.
    pub fn lookup_table(self) -> String {
        format!("pt{}", self.label())
    }

    /// Whether the scheduler stops after the first timed iteration.
    pub fn is_large(self) -> bool {
        self > EARLY_EXIT_AFTER
    }
}

impl fmt::Display for TableSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TableSetId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s.trim()).ok_or_else(|| {
            format!(
                "unknown table set '{}'. Valid: {}",
                s,
                TableSetId::ALL
                    .iter()
                    .map(|s| s.label())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })
    }
}

/// Identifiers of the three tables joined for one set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableTriple {
    pub left: String,
    pub lookup: String,
    pub reference: String,
}

/// Compose the table identifiers for `id`. A fixed lookup table, when
/// given, replaces the set's own lookup table.
pub fn resolve(id: TableSetId, fixed_lookup: Option<TableSetId>) -> TableTriple {
    let lookup = fixed_lookup.unwrap_or(id);
    TableTriple {
        left: format!("lpt{}", id.label()),
        lookup: lookup.lookup_table(),
        reference: format!("rt{}", id.label()),
    }
}

/// Leading run of `sets` (already in size order) whose members are not
/// larger than `bound`.
pub fn range_leq(sets: &[TableSetId], bound: TableSetId) -> Vec<TableSetId> {
    sets.iter()
        .copied()
        .take_while(|s| s.order_index() <= bound.order_index())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_matches_declaration() {
        for (i, set) in TableSetId::ALL.iter().enumerate() {
            assert_eq!(set.order_index(), i);
        }
        for w in TableSetId::ALL.windows(2) {
            assert!(w[0] < w[1]);
        }
    }

    #[test]
    fn test_labels_roundtrip() {
        for set in TableSetId::ALL {
            assert_eq!(set.label().parse::<TableSetId>().unwrap(), set);
        }
        assert!("4K".parse::<TableSetId>().is_err());
        assert!("all".parse::<TableSetId>().is_err());
    }

    #[test]
    fn test_resolve_default_triple() {
        let t = resolve(TableSetId::S416K, None);
        assert_eq!(t.left, "lpt416K");
        assert_eq!(t.lookup, "pt416K");
        assert_eq!(t.reference, "rt416K");
    }

    #[test]
    fn test_resolve_fixed_lookup() {
        let t = resolve(TableSetId::S208K, Some(TableSetId::S832K));
        assert_eq!(t.left, "lpt208K");
        assert_eq!(t.lookup, "pt832K");
        assert_eq!(t.reference, "rt208K");
    }

    #[test]
    fn test_lookup_table_parse() {
        assert_eq!(TableSetId::from_lookup_table("pt13M"), Some(TableSetId::S13M));
        assert_eq!(TableSetId::from_lookup_table("13M"), None);
        assert_eq!(TableSetId::from_lookup_table("pt99M"), None);
    }

    #[test]
    fn test_range_leq_truncates() {
        use TableSetId::*;
        let sets = [S208K, S416K, S832K, S2M];
        assert_eq!(range_leq(&sets, S832K), vec![S208K, S416K, S832K]);
        assert_eq!(range_leq(&sets, S16M), sets.to_vec());
        assert!(range_leq(&[S2M], S208K).is_empty());
    }

    #[test]
    fn test_large_sets() {
        assert!(!TableSetId::S3M.is_large());
        assert!(TableSetId::S7M.is_large());
        assert!(TableSetId::S16M.is_large());
        assert!(!TableSetId::S208K.is_large());
    }
}
