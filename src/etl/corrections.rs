//! Crime-label corrections.
//!
//! Historical label drift in the general source is folded into the current
//! labels before anything is grouped or counted. The table is plain data
//! with a version number so it can be shipped and reviewed on its own.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ObservatoryError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionTable {
    pub version: u32,
    pub corrections: BTreeMap<String, String>,
}

impl Default for CorrectionTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CorrectionTable {
    pub fn builtin() -> Self {
        Self {
            version: 1,
            corrections: BTreeMap::from([
                (
                    "Lesão Corporal Dolosa".to_string(),
                    "Lesão corporal grave ou gravíssima - Dolosa".to_string(),
                ),
                ("Estupro coletivo".to_string(), "Estupro".to_string()),
            ]),
        }
    }

    /// Load a table from a JSON document
    /// `{"version": N, "corrections": {"old": "new"}}`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| ObservatoryError::data_source(path, e))?;
        serde_json::from_str(&text).map_err(|e| ObservatoryError::data_source(path, e))
    }

    /// Exact, whole-label replacement. Labels not in the table pass through.
    pub fn apply<'a>(&'a self, label: &'a str) -> &'a str {
        self.corrections
            .get(label)
            .map(String::as_str)
            .unwrap_or(label)
    }

    pub fn len(&self) -> usize {
        self.corrections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corrections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builtin_folds_legacy_labels() {
        let table = CorrectionTable::builtin();
        assert_eq!(
            table.apply("Lesão Corporal Dolosa"),
            "Lesão corporal grave ou gravíssima - Dolosa"
        );
        assert_eq!(table.apply("Estupro coletivo"), "Estupro");
        assert_eq!(table.apply("Ameaça"), "Ameaça");
    }

    #[test]
    fn matching_is_exact() {
        let table = CorrectionTable::builtin();
        assert_eq!(table.apply("lesão corporal dolosa"), "lesão corporal dolosa");
        assert_eq!(table.apply("Estupro coletivo "), "Estupro coletivo ");
    }

    #[test]
    fn loads_from_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"version": 2, "corrections": {{"Injúria": "Injúria racial"}}}}"#
        )
        .unwrap();
        let table = CorrectionTable::from_path(file.path()).unwrap();
        assert_eq!(table.version, 2);
        assert_eq!(table.apply("Injúria"), "Injúria racial");
    }

    #[test]
    fn missing_file_is_a_data_source_error() {
        let err = CorrectionTable::from_path(Path::new("/nonexistent/corrections.json")).unwrap_err();
        assert!(matches!(err, ObservatoryError::DataSource { .. }));
    }
}
