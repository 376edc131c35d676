use std::path::PathBuf;

use chrono::{DateTime, Utc};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3_polars::PyDataFrame;

use crate::config::RouteConfig;
use crate::error::RouteError;
use crate::render;
use crate::search::{SearchMode, SearchResults};
use crate::session::RouteSession;

/// Python handle on a route session: one route table, an optional lookup
/// table, and their cached derived data.
#[pyclass]
pub struct RouteOptique {
    session: RouteSession,
}

#[pymethods]
impl RouteOptique {
    #[new]
    #[pyo3(signature = (config_path=None, csv_separator=None))]
    fn new(config_path: Option<PathBuf>, csv_separator: Option<char>) -> PyResult<Self> {
        let mut config = match config_path {
            Some(path) => RouteConfig::load_from_file(path)?,
            None => RouteConfig::default(),
        };
        if let Some(separator) = csv_separator {
            config.csv_separator = separator;
        }
        Ok(Self {
            session: RouteSession::new(config),
        })
    }

    // ── Data loading ────────────────────────────────────────────────────────

    /// Load the route (ROP) table from a CSV or Excel file. Returns it with
    /// every column as string.
    fn load_route(&mut self, path: PathBuf) -> PyResult<PyDataFrame> {
        self.session.load_route_path(&path)?;
        self.route_frame()
    }

    /// Load the route table from uploaded bytes; `name`'s extension picks
    /// the reader.
    fn load_route_bytes(&mut self, name: &str, data: &[u8]) -> PyResult<PyDataFrame> {
        self.session.load_route_bytes(name, data.to_vec())?;
        self.route_frame()
    }

    /// Load the lookup (STBAN) table used for prises counts.
    fn load_lookup(&mut self, path: PathBuf) -> PyResult<PyDataFrame> {
        self.session.load_lookup_path(&path)?;
        self.lookup_frame()
    }

    fn load_lookup_bytes(&mut self, name: &str, data: &[u8]) -> PyResult<PyDataFrame> {
        self.session.load_lookup_bytes(name, data.to_vec())?;
        self.lookup_frame()
    }

    fn clear_lookup(&mut self) {
        self.session.clear_lookup();
    }

    // ── Catalogues ──────────────────────────────────────────────────────────

    /// Box names for a picker, optionally filtered by a substring.
    #[pyo3(signature = (query=None))]
    fn boxes(&mut self, query: Option<&str>) -> PyResult<Vec<String>> {
        Ok(self.session.suggest_boxes(query.unwrap_or(""))?)
    }

    fn unique_values(&mut self) -> PyResult<Vec<String>> {
        Ok(self.session.unique_values()?.to_vec())
    }

    /// (column name, role) for every route-table column.
    fn column_roles(&mut self) -> PyResult<Vec<(String, String)>> {
        let roles = self.session.roles()?;
        Ok((0..roles.width())
            .map(|i| {
                (
                    roles.column_name(i).unwrap_or("").to_string(),
                    roles.role_of(i).as_str().to_string(),
                )
            })
            .collect())
    }

    // ── Queries ─────────────────────────────────────────────────────────────

    /// Search and return the results as JSON.
    ///
    /// Args:
    ///     term: search text, or the box name when `box_mode` is set
    ///     box_mode: exact match on box and cable columns (default: False)
    #[pyo3(signature = (term, box_mode=false))]
    fn search(&mut self, term: String, box_mode: bool) -> PyResult<String> {
        let results = self.run_search(term, box_mode)?;
        serde_json::to_string(&results).map_err(|e| PyValueError::new_err(e.to_string()))
    }

    /// Search and return an HTML fragment: prises badge, then each route or
    /// the "no results" block.
    #[pyo3(signature = (term, box_mode=false))]
    fn search_html(&mut self, term: String, box_mode: bool) -> PyResult<String> {
        let results = self.run_search(term, box_mode)?;
        Ok(render::render_results_html(&results))
    }

    fn route_html(&mut self, row: usize) -> PyResult<String> {
        let route = self.session.route_for_row(row)?;
        Ok(render::render_route_html(&route))
    }

    /// Prises count for a box, or None when unavailable.
    fn prises_count(&mut self, box_name: &str) -> PyResult<Option<usize>> {
        Ok(self.session.prises_count(box_name)?.map(|c| c.total()))
    }

    // ── Properties ──────────────────────────────────────────────────────────

    #[getter]
    fn route_df(&self) -> PyResult<Option<PyDataFrame>> {
        Ok(self
            .session
            .route_table()
            .map(|t| PyDataFrame(t.frame().clone())))
    }

    /// When the current route table was loaded (UTC).
    #[getter]
    fn route_loaded_at(&self) -> Option<DateTime<Utc>> {
        self.session.route_info().map(|info| info.loaded_at)
    }

    #[getter]
    fn lookup_df(&self) -> PyResult<Option<PyDataFrame>> {
        Ok(self
            .session
            .lookup_table()
            .map(|t| PyDataFrame(t.frame().clone())))
    }
}

// ── Private helpers ─────────────────────────────────────────────────────────

impl RouteOptique {
    fn run_search(&mut self, term: String, box_mode: bool) -> Result<SearchResults, RouteError> {
        let mode = if box_mode {
            SearchMode::Box(term)
        } else {
            SearchMode::General(term)
        };
        self.session.search(mode)
    }

    fn route_frame(&self) -> PyResult<PyDataFrame> {
        let table = self
            .session
            .route_table()
            .ok_or_else(|| RouteError::NotLoaded("route table".into()))?;
        Ok(PyDataFrame(table.frame().clone()))
    }

    fn lookup_frame(&self) -> PyResult<PyDataFrame> {
        let table = self
            .session
            .lookup_table()
            .ok_or_else(|| RouteError::NotLoaded("lookup table".into()))?;
        Ok(PyDataFrame(table.frame().clone()))
    }
}
