use std::str::FromStr;

use serde::{Deserialize, Serialize};

use cm_core::CmError;

use crate::record::{ChangeKind, HierarchicalRecord, CONSOLIDATED_COLUMNS, HIERARCHICAL_COLUMNS, LINEAR_COLUMNS};

/// Which paragraph groups the hierarchical strategy keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HierarchyFilter {
    #[default]
    All,
    /// Only paragraphs with at least one intervention row.
    WithInterventions,
    /// Only paragraphs with at least one comment row.
    WithComments,
}

impl HierarchyFilter {
    /// Commit predicate for one paragraph's intervention rows.
    pub fn admits(&self, changes: &[HierarchicalRecord]) -> bool {
        match self {
            HierarchyFilter::All => true,
            HierarchyFilter::WithInterventions => !changes.is_empty(),
            HierarchyFilter::WithComments => changes.iter().any(|c| c.kind == ChangeKind::Comment),
        }
    }
}

/// Output shape of the change extractor.
///
/// Parsed from, and serialized as, the method names `padrao`, `alternativo`,
/// `hierarquico`, `hierarquico_filtrado` and `hierarquico_comentarios`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Strategy {
    /// One record per buffer flush.
    #[default]
    Linear,
    /// One record per paragraph with an intervention log.
    Consolidated,
    /// Paragraph rows followed by positioned intervention rows.
    Hierarchical(HierarchyFilter),
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Linear => "padrao",
            Strategy::Consolidated => "alternativo",
            Strategy::Hierarchical(HierarchyFilter::All) => "hierarquico",
            Strategy::Hierarchical(HierarchyFilter::WithInterventions) => "hierarquico_filtrado",
            Strategy::Hierarchical(HierarchyFilter::WithComments) => "hierarquico_comentarios",
        }
    }

    /// Column names of this strategy's rows.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Strategy::Linear => &LINEAR_COLUMNS,
            Strategy::Consolidated => &CONSOLIDATED_COLUMNS,
            Strategy::Hierarchical(_) => &HIERARCHICAL_COLUMNS,
        }
    }
}

impl FromStr for Strategy {
    type Err = CmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "padrao" | "linear" => Ok(Strategy::Linear),
            "alternativo" | "consolidated" => Ok(Strategy::Consolidated),
            "hierarquico" | "hierarchical" => Ok(Strategy::Hierarchical(HierarchyFilter::All)),
            "hierarquico_filtrado" | "hierarchical_filtered" => {
                Ok(Strategy::Hierarchical(HierarchyFilter::WithInterventions))
            }
            "hierarquico_comentarios" | "hierarchical_comments" => {
                Ok(Strategy::Hierarchical(HierarchyFilter::WithComments))
            }
            other => Err(CmError::InvalidInput(format!("unknown extraction strategy: {other}"))),
        }
    }
}

impl TryFrom<String> for Strategy {
    type Error = CmError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Strategy> for String {
    fn from(value: Strategy) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
