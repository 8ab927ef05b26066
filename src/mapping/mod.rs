//! Forward and reverse Monarch ↔ OMIM mapping tables and the workflows that produce them.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod builder;
pub mod normalize;
pub mod reverse;
pub mod store;
mod table;

pub use table::MappingTable;

/// Knowledge-base ID → OMIM number + display name.
pub type ForwardTable = MappingTable<ForwardEntry>;

/// OMIM number → knowledge-base ID + display name.
pub type ReverseTable = MappingTable<ReverseEntry>;

/// Partition of the Monarch search space queried independently during a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Disease,
    Gene,
    Phenotype,
}

impl Category {
    pub fn biolink(self) -> &'static str {
        match self {
            Self::Disease => "biolink:Disease",
            Self::Gene => "biolink:Gene",
            Self::Phenotype => "biolink:PhenotypicFeature",
        }
    }

    /// Namespace prefix of the knowledge-base IDs this category yields.
    pub fn expected_prefix(self) -> &'static str {
        match self {
            Self::Disease => "MONDO:",
            Self::Gene => "HGNC:",
            Self::Phenotype => "HP:",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Disease => "disease",
            Self::Gene => "gene",
            Self::Phenotype => "phenotype",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardEntry {
    pub external_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseEntry {
    pub knowledge_base_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}
