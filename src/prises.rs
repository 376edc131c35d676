//! Connection-point ("prise") count for a box, from the STBAN lookup sheet.

use polars::prelude::*;
use serde::Serialize;

use crate::error::{Result, RouteError};
use crate::schema::lookup;

const SOCKET_KEY: &str = "_socket";
const PANEL_KEY: &str = "_panel";

/// The socket and patch-panel columns of a lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupColumns {
    pub socket: String,
    pub panel: String,
}

impl LookupColumns {
    /// First column containing each token, case-insensitive. Both must exist.
    pub fn identify<S: AsRef<str>>(columns: &[S]) -> Option<Self> {
        let find = |token: &str| {
            columns
                .iter()
                .map(AsRef::<str>::as_ref)
                .find(|c| c.to_uppercase().contains(token))
                .map(str::to_string)
        };
        Some(Self {
            socket: find(lookup::SOCKET_TOKEN)?,
            panel: find(lookup::PATCH_PANEL_TOKEN)?,
        })
    }

    /// Like `identify`, naming the first missing token in the error.
    pub fn require<S: AsRef<str>>(columns: &[S]) -> Result<Self> {
        Self::identify(columns).ok_or_else(|| {
            let missing = [lookup::SOCKET_TOKEN, lookup::PATCH_PANEL_TOKEN]
                .into_iter()
                .find(|token| {
                    !columns
                        .iter()
                        .any(|c| AsRef::<str>::as_ref(c).to_uppercase().contains(token))
                })
                .unwrap_or(lookup::SOCKET_TOKEN);
            RouteError::ColumnNotFound(missing.to_string())
        })
    }
}

/// Breakdown of a prises count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PrisesCount {
    pub socket: usize,
    pub panel_only: usize,
    pub socket_with_other_panel: usize,
}

impl PrisesCount {
    /// `socket + panel_only - socket_with_other_panel`.
    pub fn total(&self) -> usize {
        // socket_with_other_panel is a subset of socket, so this never underflows
        self.socket + self.panel_only - self.socket_with_other_panel
    }
}

/// Lookup columns normalized once (trimmed, uppercased, missing as empty).
#[derive(Debug, Clone)]
pub struct PreparedLookup {
    columns: LookupColumns,
    sockets: Vec<String>,
    panels: Vec<String>,
}

impl PreparedLookup {
    pub fn prepare(frame: &DataFrame, columns: LookupColumns) -> Result<Self> {
        let normalized = frame
            .clone()
            .lazy()
            .select([
                normalize(&columns.socket).alias(SOCKET_KEY),
                normalize(&columns.panel).alias(PANEL_KEY),
            ])
            .collect()?;

        let sockets = to_strings(&normalized, SOCKET_KEY)?;
        let panels = to_strings(&normalized, PANEL_KEY)?;

        Ok(Self {
            columns,
            sockets,
            panels,
        })
    }

    /// Locate both columns of `frame` and prepare them.
    pub fn for_frame(frame: &DataFrame) -> Result<Self> {
        let columns = LookupColumns::require(&frame.get_column_names_str())?;
        Self::prepare(frame, columns)
    }

    pub fn columns(&self) -> &LookupColumns {
        &self.columns
    }

    /// `None` for a blank box name.
    pub fn count(&self, box_name: &str) -> Option<PrisesCount> {
        let target = normalize_box_name(box_name);
        if target.is_empty() {
            return None;
        }

        let mut count = PrisesCount {
            socket: 0,
            panel_only: 0,
            socket_with_other_panel: 0,
        };
        for (socket, panel) in self.sockets.iter().zip(&self.panels) {
            let is_socket = *socket == target;
            let is_panel = *panel == target;
            if is_socket {
                count.socket += 1;
                if !panel.is_empty() && !is_panel {
                    count.socket_with_other_panel += 1;
                }
            } else if is_panel {
                count.panel_only += 1;
            }
        }
        Some(count)
    }
}

/// Case-insensitive, whitespace-trimmed key of a box.
pub fn normalize_box_name(name: &str) -> String {
    name.trim().to_uppercase()
}

/// One-shot count: `None` when the lookup table is absent, lacks either
/// column, or the name is blank.
pub fn count_prises(frame: Option<&DataFrame>, box_name: &str) -> Result<Option<PrisesCount>> {
    let Some(frame) = frame else {
        return Ok(None);
    };
    let Some(columns) = LookupColumns::identify(&frame.get_column_names_str()) else {
        return Ok(None);
    };
    Ok(PreparedLookup::prepare(frame, columns)?.count(box_name))
}

fn normalize(column: &str) -> Expr {
    col(column)
        .cast(DataType::String)
        .fill_null(lit(""))
        .str()
        .strip_chars(lit(NULL)) // all Unicode whitespace, as `str::trim`
        .str()
        .to_uppercase()
}

fn to_strings(frame: &DataFrame, column: &str) -> Result<Vec<String>> {
    Ok(frame
        .column(column)?
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or("").to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(sockets: &[&str], panels: &[&str]) -> DataFrame {
        df!(
            "ID" => (0..sockets.len() as i64).collect::<Vec<_>>(),
            "REF_PBO_PRISE" => sockets,
            "ref_pbo_pto" => panels,
        )
        .unwrap()
    }

    #[test]
    fn counts_socket_and_panel_rows() {
        let frame = lookup(&["BOX1", "BOX2", ""], &["", "BOX1", "BOX1"]);
        let count = count_prises(Some(&frame), "BOX1").unwrap().unwrap();

        assert_eq!(count.socket, 1);
        assert_eq!(count.panel_only, 2);
        assert_eq!(count.socket_with_other_panel, 0);
        assert_eq!(count.total(), 3);
    }

    #[test]
    fn sockets_patched_elsewhere_are_subtracted() {
        let frame = lookup(
            &["BOX1", "box1 ", "BOX1", "BOX3"],
            &["BOX9", "BOX1", "", "BOX1"],
        );
        let count = count_prises(Some(&frame), " Box1").unwrap().unwrap();

        assert_eq!(count.socket, 3);
        assert_eq!(count.panel_only, 1);
        assert_eq!(count.socket_with_other_panel, 1);
        assert_eq!(count.total(), 3);
    }

    #[test]
    fn nulls_are_treated_as_empty() {
        let frame = df!(
            "REF_PBO_PRISE" => [Some("BOX1"), None],
            "REF_PBO_PTO" => [None::<&str>, Some("BOX1")],
        )
        .unwrap();
        let count = count_prises(Some(&frame), "BOX1").unwrap().unwrap();
        assert_eq!(count.total(), 2);
    }

    #[test]
    fn cells_padded_with_non_breaking_spaces_match() {
        let frame = lookup(&["\u{a0}BOX1\u{a0}", "box1\u{2007}"], &["", " BOX1\u{a0}"]);
        let count = count_prises(Some(&frame), "\u{a0}box1").unwrap().unwrap();
        assert_eq!(count.socket, 2);
        assert_eq!(count.socket_with_other_panel, 0);
        assert_eq!(count.total(), 2);
    }

    #[test]
    fn unavailable_without_table_columns_or_name() {
        assert_eq!(count_prises(None, "BOX1").unwrap(), None);

        let frame = df!("REF_PBO_PRISE" => ["BOX1"], "AUTRE" => ["BOX1"]).unwrap();
        assert_eq!(count_prises(Some(&frame), "BOX1").unwrap(), None);

        let frame = lookup(&["BOX1"], &[""]);
        assert_eq!(count_prises(Some(&frame), "  ").unwrap(), None);
    }

    #[test]
    fn identify_picks_first_match_per_token() {
        let columns = LookupColumns::identify(&[
            "nom",
            "ref_pbo_prise_1",
            "REF_PBO_PTO",
            "REF_PBO_PRISE_2",
        ])
        .unwrap();
        assert_eq!(columns.socket, "ref_pbo_prise_1");
        assert_eq!(columns.panel, "REF_PBO_PTO");
    }

    #[test]
    fn missing_column_is_named() {
        let frame = df!("REF_PBO_PRISE" => ["BOX1"], "AUTRE" => ["BOX1"]).unwrap();
        match PreparedLookup::for_frame(&frame) {
            Err(RouteError::ColumnNotFound(token)) => assert_eq!(token, "REF_PBO_PTO"),
            other => panic!("expected ColumnNotFound, got {:?}", other.map(|p| p.columns().clone())),
        }
    }

    #[test]
    fn unknown_box_counts_zero() {
        let frame = lookup(&["BOX1"], &["BOX2"]);
        let count = count_prises(Some(&frame), "BOX7").unwrap().unwrap();
        assert_eq!(count.total(), 0);
    }
}
