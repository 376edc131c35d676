use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RouteError};
use crate::schema::labels;
use crate::search::BoxFilter;
use crate::table::CsvOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Field separator of CSV exports (`;` for most French spreadsheets)
    pub csv_separator: char,

    /// Parse free-text route cells when no column carries a segment role
    pub legacy_fallback: bool,

    /// Box search keeps only hops whose state is STOCKEE
    pub stored_only: bool,

    /// Columns whose name contains this token are skipped by box search
    pub excluded_column_token: String,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            csv_separator: ',',
            legacy_fallback: true,
            stored_only: false,
            excluded_column_token: labels::END_POINT.to_string(),
        }
    }
}

impl RouteConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: RouteConfig = toml::from_str(content)?;
        config.csv_options()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| RouteError::General(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    pub fn csv_options(&self) -> Result<CsvOptions> {
        let separator = u8::try_from(self.csv_separator)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                RouteError::InvalidData(format!(
                    "csv_separator must be a single ASCII character, got {:?}",
                    self.csv_separator
                ))
            })?;
        Ok(CsvOptions { separator })
    }

    pub fn box_filter(&self) -> BoxFilter {
        BoxFilter {
            stored_only: self.stored_only,
            excluded_column_token: self.excluded_column_token.clone(),
        }
    }
}
