//! Parsing of `hab svc status` output.

use std::sync::LazyLock;

use regex::Regex;

static COLUMN_GAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("valid column pattern"));

/// One row of `hab svc status`, keyed by column header.
///
/// Columns keep the order of the header line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceStatus {
    columns: Vec<(String, String)>,
}

impl ServiceStatus {
    /// Cell under `column`, if the header has that column.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Column headers in header order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// Header and cell pairs in header order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl FromIterator<(String, String)> for ServiceStatus {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

/// Parse columnar status output.
///
/// The first non-blank line holds the headers; each following non-blank line
/// becomes one record. Missing trailing cells are recorded as empty strings
/// and extra cells are dropped.
#[must_use]
pub fn parse_status(output: &str) -> Vec<ServiceStatus> {
    let mut lines = output
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty());

    let Some(header) = lines.next() else {
        return Vec::new();
    };
    let headers: Vec<&str> = COLUMN_GAP.split(header.trim()).collect();

    lines
        .map(|line| {
            let mut cells = COLUMN_GAP.split(line.trim());
            headers
                .iter()
                .map(|h| ((*h).to_string(), cells.next().unwrap_or_default().to_string()))
                .collect()
        })
        .collect()
}
