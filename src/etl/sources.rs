use std::fs;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};
use tracing::debug;

use super::headers::HeaderRules;
use crate::error::{ObservatoryError, Result};

/// A spreadsheet export read verbatim, with cleaned headers.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub source: &'static str,
    pub path: PathBuf,
    headers: Vec<String>,
    rows: Vec<StringRecord>,
}

impl RawTable {
    pub fn read(path: &Path, rules: &HeaderRules) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| ObservatoryError::data_source(path, e))?;
        Self::parse(&text, path, rules)
    }

    /// Parse CSV text. The delimiter (`,` or `;`) is picked from the header
    /// line, since spreadsheet exports in pt-BR locales default to `;`.
    pub fn parse(text: &str, path: &Path, rules: &HeaderRules) -> Result<Self> {
        let header_line = text.lines().next().unwrap_or_default();
        let delimiter = if header_line.matches(';').count() > header_line.matches(',').count() {
            b';'
        } else {
            b','
        };
        let mut rdr = ReaderBuilder::new()
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(text.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| ObservatoryError::data_source(path, e))?
            .iter()
            .map(|h| rules.apply(h))
            .collect::<Vec<_>>();
        let rows = rdr
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ObservatoryError::data_source(path, e))?;
        debug!(source = rules.source, columns = ?headers, rows = rows.len(), "source read");
        Ok(Self {
            source: rules.source,
            path: path.to_path_buf(),
            headers,
            rows,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[StringRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a cleaned column name, or a schema error.
    pub fn column(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ObservatoryError::schema(self.source, name))
    }

    /// Resolve several columns at once, failing on the first missing one.
    pub fn columns<const N: usize>(&self, names: [&str; N]) -> Result<[usize; N]> {
        let mut out = [0usize; N];
        for (slot, name) in out.iter_mut().zip(names) {
            *slot = self.column(name)?;
        }
        Ok(out)
    }
}

/// Cell text, `None` past the end of a short row.
pub fn cell(row: &StringRecord, idx: usize) -> Option<&str> {
    row.get(idx)
}
