use crate::error::Result;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

/// Gauge identifiers known to be unusable, skipped before any analysis.
///
/// The on-disk form is a flat list of identifiers separated by commas or
/// newlines, each optionally wrapped in single quotes:
///
/// ```text
/// '09380000', '09402500'
/// '09404200'
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionList(BTreeSet<String>);

impl ExclusionList {
    pub fn parse(text: &str) -> Self {
        let ids = text
            .split([',', '\n', '\r'])
            .map(|token| token.trim().trim_matches('\'').trim())
            .filter(|token| !token.is_empty())
            .map(String::from)
            .collect();
        ExclusionList(ids)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(ExclusionList::parse(&text))
    }

    pub fn contains(&self, site_no: &str) -> bool {
        self.0.contains(site_no)
    }

    /// Returns true if the site was not already listed.
    pub fn insert(&mut self, site_no: impl Into<String>) -> bool {
        self.0.insert(site_no.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ExclusionList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quoted: Vec<String> = self.0.iter().map(|id| format!("'{id}'")).collect();
        write!(f, "{}", quoted.join(", "))
    }
}
