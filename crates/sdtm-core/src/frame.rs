use polars::prelude::DataFrame;

use sdtm_model::IssueLog;

/// A canonical domain table and what the build observed producing it.
#[derive(Debug, Clone)]
pub struct DomainFrame {
    /// Domain code (e.g., "AE").
    pub domain_code: String,
    /// Canonical table in declared variable order.
    pub data: DataFrame,
    /// Source row of every output row; `None` for synthesized rows.
    pub source_rows: Vec<Option<usize>>,
    /// Non-fatal issues resolved during the build.
    pub issues: IssueLog,
}

impl DomainFrame {
    pub fn new(domain_code: impl Into<String>, data: DataFrame) -> Self {
        let domain_code = domain_code.into();
        let source_rows = (0..data.height()).map(Some).collect();
        Self {
            issues: IssueLog::new(domain_code.clone()),
            domain_code,
            data,
            source_rows,
        }
    }

    pub fn record_count(&self) -> usize {
        self.data.height()
    }

    /// Output rows created by the build rather than copied from the source.
    pub fn synthesized_rows(&self) -> Vec<usize> {
        self.source_rows
            .iter()
            .enumerate()
            .filter(|(_, source)| source.is_none())
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.data
            .get_column_names()
            .into_iter()
            .map(ToString::to_string)
            .collect()
    }
}
