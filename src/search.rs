use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::classify::{ColumnRole, RoleAssignment};
use crate::error::Result;
use crate::prises::{normalize_box_name, PrisesCount};
use crate::route::Route;
use crate::schema::{labels, lookup};
use crate::segment::SpliceState;
use crate::table::{present, RouteTable};

/// How a search term is matched against the route table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SearchMode {
    /// Case-insensitive substring over every cell.
    General(String),
    /// Exact (trimmed, case-insensitive) match on a box name.
    Box(String),
}

impl SearchMode {
    pub fn term(&self) -> &str {
        match self {
            Self::General(term) | Self::Box(term) => term,
        }
    }
}

/// Box-mode options.
#[derive(Debug, Clone)]
pub struct BoxFilter {
    /// Keep only rows where the matched hop is STORED.
    pub stored_only: bool,
    /// Columns whose uppercased name contains this token are skipped.
    pub excluded_column_token: String,
}

impl Default for BoxFilter {
    fn default() -> Self {
        Self {
            stored_only: false,
            excluded_column_token: labels::END_POINT.to_string(),
        }
    }
}

/// Outcome of one search; an empty route list is the "no results" state.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub mode: SearchMode,
    pub routes: Vec<Route>,
    pub prises: Option<PrisesCount>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Rows with a cell containing `term`, case-insensitive. A blank term matches nothing.
pub fn search_general(table: &RouteTable, term: &str) -> Result<Vec<usize>> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return Ok(Vec::new());
    }

    let columns = table.text_columns()?;
    let rows: Vec<usize> = (0..table.height())
        .filter(|&row| {
            columns.iter().any(|ca| {
                ca.get(row)
                    .map(|cell| cell.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
        })
        .collect();

    debug!(term = %term, matches = rows.len(), "general search");
    Ok(rows)
}

/// Rows where a box (or cable) cell equals `name`.
///
/// Tables without box/cable columns are searched across every column; there
/// the stored filter reads the state three columns right of the match.
pub fn search_box(
    table: &RouteTable,
    roles: &RoleAssignment,
    name: &str,
    filter: &BoxFilter,
) -> Result<Vec<usize>> {
    let key = normalize_box_name(name);
    if key.is_empty() {
        return Ok(Vec::new());
    }

    let excluded = filter.excluded_column_token.to_uppercase();
    let allowed = |column: usize| {
        excluded.is_empty()
            || !roles
                .column_name(column)
                .map(|n| n.to_uppercase().contains(&excluded))
                .unwrap_or(false)
    };

    // (column, slot in its role list)
    let mut candidates: Vec<(usize, Option<usize>)> = [ColumnRole::Box, ColumnRole::Cable]
        .iter()
        .flat_map(|role| {
            roles
                .columns(*role)
                .iter()
                .enumerate()
                .map(|(slot, &column)| (column, Some(slot)))
        })
        .filter(|(column, _)| allowed(*column))
        .collect();
    let by_role = !candidates.is_empty();
    if !by_role {
        candidates = (0..roles.width())
            .filter(|c| allowed(*c))
            .map(|c| (c, None))
            .collect();
    }

    let columns = table.text_columns()?;
    let cell = |column: usize, row: usize| present(columns.get(column).and_then(|ca| ca.get(row)));
    let state_columns = roles.columns(ColumnRole::State);

    let rows: Vec<usize> = (0..table.height())
        .filter(|&row| {
            candidates.iter().any(|&(column, slot)| {
                let matches = cell(column, row)
                    .map(|text| normalize_box_name(text) == key)
                    .unwrap_or(false);
                if !matches || !filter.stored_only {
                    return matches;
                }
                match slot {
                    Some(slot) => state_columns
                        .get(slot)
                        .and_then(|&c| cell(c, row))
                        .and_then(SpliceState::parse)
                        == Some(SpliceState::Stored),
                    None => cell(column + 3, row) == Some(labels::STORED_CELL),
                }
            })
        })
        .collect();

    debug!(box_name = %name, by_role, matches = rows.len(), "box search");
    Ok(rows)
}

/// Distinct box names: box and cable cells of the route table, plus the box
/// column of the lookup table when one is given. Names differing only by case
/// are one entry, spelled as first seen; entries sort case-insensitively.
pub fn box_catalogue(
    route: &RouteTable,
    roles: &RoleAssignment,
    lookup_table: Option<&RouteTable>,
) -> Result<Vec<String>> {
    let mut names: BTreeMap<String, String> = BTreeMap::new();

    let columns = route.text_columns()?;
    for role in [ColumnRole::Box, ColumnRole::Cable] {
        for &column in roles.columns(role) {
            collect_box_names(&mut names, columns[column].into_iter());
        }
    }

    if let Some(lookup_table) = lookup_table {
        let box_column = lookup_table.column_names().iter().position(|c| {
            let lower = c.trim().to_lowercase();
            lookup::BOX_NAME_FRAGMENTS.iter().any(|f| lower.contains(f))
        });
        if let Some(index) = box_column {
            let columns = lookup_table.text_columns()?;
            collect_box_names(&mut names, columns[index].into_iter());
        }
    }

    Ok(names.into_values().collect())
}

/// Catalogue entries containing `query`, case-insensitive; all of them for a blank query.
pub fn suggest<'a>(catalogue: &'a [String], query: &str) -> Vec<&'a str> {
    let needle = query.trim().to_lowercase();
    catalogue
        .iter()
        .filter(|name| needle.is_empty() || name.to_lowercase().contains(&needle))
        .map(String::as_str)
        .collect()
}

/// Every distinct non-empty cell text, sorted (autocomplete source).
pub fn unique_values(table: &RouteTable) -> Result<Vec<String>> {
    let mut values = BTreeSet::new();
    for ca in table.text_columns()? {
        collect_present(&mut values, ca.into_iter());
    }
    Ok(values.into_iter().collect())
}

fn collect_present<'a>(into: &mut BTreeSet<String>, cells: impl Iterator<Item = Option<&'a str>>) {
    into.extend(cells.filter_map(present).map(str::to_string));
}

fn collect_box_names<'a>(
    into: &mut BTreeMap<String, String>,
    cells: impl Iterator<Item = Option<&'a str>>,
) {
    for name in cells.filter_map(present) {
        into.entry(normalize_box_name(name)).or_insert_with(|| name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use polars::prelude::*;

    use super::*;

    fn route_table() -> RouteTable {
        let frame = df!(
            "ROP" => ["R1", "R2", "R3"],
            "Câble 1" => [Some("CAB1"), Some("CAB2"), None],
            "Boîte 1" => [Some("BPE-01"), Some("bpe-02 "), Some("BPE-01")],
            "Etat 1" => [Some("STOCKEE"), Some("EPISSUREE"), Some("EPISSUREE")],
            "Boîte EXTREMITE" => [Some("BPE-09"), None, None],
        )
        .unwrap();
        RouteTable::from_frame("rop", frame).unwrap()
    }

    fn roles(table: &RouteTable) -> RoleAssignment {
        RoleAssignment::classify(&table.column_names())
    }

    #[test]
    fn general_search_is_case_insensitive_substring() {
        let table = route_table();
        assert_eq!(search_general(&table, "bpe-0").unwrap(), vec![0, 1, 2]);
        assert_eq!(search_general(&table, "cab2").unwrap(), vec![1]);
    }

    #[test]
    fn unmatched_or_blank_term_returns_no_rows() {
        let table = route_table();
        assert!(search_general(&table, "ZZZ").unwrap().is_empty());
        assert!(search_general(&table, "  ").unwrap().is_empty());
        let roles = roles(&table);
        assert!(search_box(&table, &roles, "NOPE", &BoxFilter::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn box_search_matches_exact_normalized_name() {
        let table = route_table();
        let roles = roles(&table);
        let filter = BoxFilter::default();

        assert_eq!(search_box(&table, &roles, "bpe-01", &filter).unwrap(), vec![0, 2]);
        assert_eq!(search_box(&table, &roles, "BPE-02", &filter).unwrap(), vec![1]);
        assert!(search_box(&table, &roles, "BPE-0", &filter).unwrap().is_empty());
    }

    #[test]
    fn box_search_skips_end_point_columns() {
        let table = route_table();
        let roles = roles(&table);
        assert!(search_box(&table, &roles, "BPE-09", &BoxFilter::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn stored_only_keeps_stored_hops() {
        let table = route_table();
        let roles = roles(&table);
        let filter = BoxFilter {
            stored_only: true,
            ..BoxFilter::default()
        };
        assert_eq!(search_box(&table, &roles, "BPE-01", &filter).unwrap(), vec![0]);
    }

    #[test]
    fn box_search_without_roles_scans_every_column() {
        let frame = df!(
            "A" => ["PM-1", "PM-2"],
            "B" => ["x", "y"],
            "C" => ["x", "y"],
            "D" => ["STOCKEE", "EPISSUREE"],
        )
        .unwrap();
        let table = RouteTable::from_frame("legacy", frame).unwrap();
        let roles = roles(&table);

        assert_eq!(search_box(&table, &roles, "pm-2", &BoxFilter::default()).unwrap(), vec![1]);
        let stored = BoxFilter {
            stored_only: true,
            ..BoxFilter::default()
        };
        assert_eq!(search_box(&table, &roles, "PM-1", &stored).unwrap(), vec![0]);
        assert!(search_box(&table, &roles, "PM-2", &stored).unwrap().is_empty());
    }

    #[test]
    fn catalogue_merges_route_and_lookup_names() {
        let table = route_table();
        let roles = roles(&table);
        let lookup = RouteTable::from_frame(
            "stban",
            df!("NOM_BOITE" => ["BPE-77", " BPE-01 ", ""], "REF_PBO_PTO" => ["X", "Y", "Z"]).unwrap(),
        )
        .unwrap();

        let catalogue = box_catalogue(&table, &roles, Some(&lookup)).unwrap();
        assert_eq!(
            catalogue,
            vec!["BPE-01", "bpe-02", "BPE-09", "BPE-77", "CAB1", "CAB2"]
        );
    }

    #[test]
    fn catalogue_folds_case_variants_into_first_spelling() {
        let table = RouteTable::from_frame(
            "rop",
            df!(
                "Boîte 1" => [Some("BPE-01"), Some("bpe-01"), None],
                "Câble 1" => [Some("cab1"), Some("CAB1"), Some("Bpe-01")]
            )
            .unwrap(),
        )
        .unwrap();
        let roles = roles(&table);
        let lookup = RouteTable::from_frame(
            "stban",
            df!("NOM_BOITE" => ["Cab1", "BPE-05"]).unwrap(),
        )
        .unwrap();

        let catalogue = box_catalogue(&table, &roles, Some(&lookup)).unwrap();
        assert_eq!(catalogue, vec!["BPE-01", "BPE-05", "cab1"]);
    }

    #[test]
    fn suggestions_filter_catalogue() {
        let catalogue = vec!["BPE-01".to_string(), "BPE-02".to_string(), "PM-1".to_string()];
        assert_eq!(suggest(&catalogue, "bpe"), vec!["BPE-01", "BPE-02"]);
        assert_eq!(suggest(&catalogue, "").len(), 3);
        assert!(suggest(&catalogue, "zz").is_empty());
    }

    #[test]
    fn unique_values_are_sorted_and_distinct() {
        let frame = df!("A" => ["b", "a", " "], "B" => [Some("a"), None, Some("c")]).unwrap();
        let table = RouteTable::from_frame("t", frame).unwrap();
        assert_eq!(unique_values(&table).unwrap(), vec!["a", "b", "c"]);
    }
}
