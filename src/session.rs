use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::classify::RoleAssignment;
use crate::config::RouteConfig;
use crate::error::{Result, RouteError};
use crate::legacy::LegacyCellParser;
use crate::prises::{normalize_box_name, PreparedLookup, PrisesCount};
use crate::route::Route;
use crate::search::{self, SearchMode, SearchResults};
use crate::segment::{ColumnRoleExtractor, RouteParser};
use crate::table::{RouteTable, TableId, TableInfo};

/// Prises counts kept per lookup table before the cache is cleared. General
/// searches add one entry per distinct term.
const PRISES_CACHE_LIMIT: usize = 256;

/// A derived value and the identity of the table(s) it was computed from.
#[derive(Debug)]
struct Cached<K, V> {
    key: K,
    value: V,
}

/// Reuse `slot` while its key matches, otherwise rebuild it.
fn cached<K: PartialEq, V>(
    slot: &mut Option<Cached<K, V>>,
    key: K,
    build: impl FnOnce() -> Result<V>,
) -> Result<&V> {
    let entry = match slot.take() {
        Some(entry) if entry.key == key => entry,
        _ => Cached {
            key,
            value: build()?,
        },
    };
    Ok(&slot.insert(entry).value)
}

/// The loaded route (ROP) and lookup (STBAN) tables of one user session,
/// plus everything derived from them.
///
/// Tables are replaced wholesale, never edited. Every derived value is keyed by
/// the `TableId` of its source, so a reload can never serve stale results.
pub struct RouteSession {
    config: RouteConfig,
    route: Option<RouteTable>,
    lookup: Option<RouteTable>,
    roles: Option<Cached<TableId, RoleAssignment>>,
    catalogue: Option<Cached<(TableId, Option<TableId>), Vec<String>>>,
    unique_values: Option<Cached<TableId, Vec<String>>>,
    prepared: Option<Cached<TableId, Option<PreparedLookup>>>,
    prises: HashMap<(TableId, String), Option<PrisesCount>>,
}

impl Default for RouteSession {
    fn default() -> Self {
        Self::new(RouteConfig::default())
    }
}

impl RouteSession {
    pub fn new(config: RouteConfig) -> Self {
        Self {
            config,
            route: None,
            lookup: None,
            roles: None,
            catalogue: None,
            unique_values: None,
            prepared: None,
            prises: HashMap::new(),
        }
    }

    pub fn config(&self) -> &RouteConfig {
        &self.config
    }

    /// Box searches keep only STOCKEE hops. No cache depends on this flag.
    pub fn set_stored_only(&mut self, stored_only: bool) {
        self.config.stored_only = stored_only;
    }

    // ── Loading ─────────────────────────────────────────────────────────────

    /// Load the route table from a CSV or workbook file, by extension.
    pub fn load_route_path(&mut self, path: &Path) -> Result<TableInfo> {
        let table = RouteTable::load_path(path, self.config.csv_options()?)?;
        Ok(self.set_route_table(table))
    }

    pub fn load_route_bytes(&mut self, name: &str, bytes: Vec<u8>) -> Result<TableInfo> {
        let table = RouteTable::from_bytes(name, bytes, self.config.csv_options()?)?;
        Ok(self.set_route_table(table))
    }

    /// Replace the route table and drop everything derived from the old one.
    pub fn set_route_table(&mut self, table: RouteTable) -> TableInfo {
        self.roles = None;
        self.catalogue = None;
        self.unique_values = None;
        let info = table.info();
        info!(table = %info.name, id = %info.id, "route table replaced");
        self.route = Some(table);
        info
    }

    pub fn load_lookup_path(&mut self, path: &Path) -> Result<TableInfo> {
        let table = RouteTable::load_path(path, self.config.csv_options()?)?;
        Ok(self.set_lookup_table(table))
    }

    pub fn load_lookup_bytes(&mut self, name: &str, bytes: Vec<u8>) -> Result<TableInfo> {
        let table = RouteTable::from_bytes(name, bytes, self.config.csv_options()?)?;
        Ok(self.set_lookup_table(table))
    }

    /// Replace the lookup table. Route-derived caches other than the box
    /// catalogue are kept.
    pub fn set_lookup_table(&mut self, table: RouteTable) -> TableInfo {
        self.drop_lookup_caches();
        let info = table.info();
        info!(table = %info.name, id = %info.id, "lookup table replaced");
        self.lookup = Some(table);
        info
    }

    pub fn clear_lookup(&mut self) {
        self.drop_lookup_caches();
        self.lookup = None;
    }

    fn drop_lookup_caches(&mut self) {
        self.prepared = None;
        self.prises.clear();
        self.catalogue = None;
    }

    pub fn route_info(&self) -> Option<TableInfo> {
        self.route.as_ref().map(RouteTable::info)
    }

    pub fn lookup_info(&self) -> Option<TableInfo> {
        self.lookup.as_ref().map(RouteTable::info)
    }

    pub fn route_table(&self) -> Option<&RouteTable> {
        self.route.as_ref()
    }

    pub fn lookup_table(&self) -> Option<&RouteTable> {
        self.lookup.as_ref()
    }

    // ── Derived data ────────────────────────────────────────────────────────

    pub fn roles(&mut self) -> Result<&RoleAssignment> {
        let table = require_route(&self.route)?;
        cached(&mut self.roles, table.id(), || Ok(classify(table)))
    }

    /// Sorted distinct box names of the route table and, if loaded, the lookup table.
    pub fn box_catalogue(&mut self) -> Result<&[String]> {
        let table = require_route(&self.route)?;
        let roles = cached(&mut self.roles, table.id(), || Ok(classify(table)))?;
        let lookup = self.lookup.as_ref();
        let key = (table.id(), lookup.map(RouteTable::id));

        let catalogue = cached(&mut self.catalogue, key, || {
            let names = search::box_catalogue(table, roles, lookup)?;
            info!(boxes = names.len(), "box catalogue built");
            Ok(names)
        })?;
        Ok(catalogue.as_slice())
    }

    pub fn suggest_boxes(&mut self, query: &str) -> Result<Vec<String>> {
        let catalogue = self.box_catalogue()?;
        Ok(search::suggest(catalogue, query)
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    pub fn unique_values(&mut self) -> Result<&[String]> {
        let table = require_route(&self.route)?;
        let values = cached(&mut self.unique_values, table.id(), || {
            search::unique_values(table)
        })?;
        Ok(values.as_slice())
    }

    // ── Queries ─────────────────────────────────────────────────────────────

    /// Matching routes, each fully extracted, plus the prises count for the
    /// term when a usable lookup table is loaded.
    pub fn search(&mut self, mode: SearchMode) -> Result<SearchResults> {
        let table = require_route(&self.route)?;
        let roles = cached(&mut self.roles, table.id(), || Ok(classify(table)))?;

        let rows = match &mode {
            SearchMode::General(term) => search::search_general(table, term)?,
            SearchMode::Box(name) => {
                search::search_box(table, roles, name, &self.config.box_filter())?
            }
        };

        let routes = {
            let parser = select_parser(&self.config, roles);
            rows.iter()
                .map(|&index| Ok(Route::build(&table.row(index)?, roles, parser.as_ref())))
                .collect::<Result<Vec<_>>>()?
        };

        let prises = self.prises_count(mode.term())?;
        info!(
            term = %mode.term(),
            routes = routes.len(),
            prises = prises.map(|p| p.total()),
            "search complete"
        );
        Ok(SearchResults {
            mode,
            routes,
            prises,
        })
    }

    pub fn route_for_row(&mut self, index: usize) -> Result<Route> {
        let table = require_route(&self.route)?;
        let roles = cached(&mut self.roles, table.id(), || Ok(classify(table)))?;
        let parser = select_parser(&self.config, roles);
        Ok(Route::build(&table.row(index)?, roles, parser.as_ref()))
    }

    /// `None` when no lookup table is loaded, it lacks the socket or panel
    /// column, or the name is blank.
    pub fn prises_count(&mut self, box_name: &str) -> Result<Option<PrisesCount>> {
        let Some(lookup) = self.lookup.as_ref() else {
            return Ok(None);
        };
        let name = normalize_box_name(box_name);
        if name.is_empty() {
            return Ok(None);
        }

        let key = (lookup.id(), name);
        if let Some(hit) = self.prises.get(&key) {
            debug!(box_name = %key.1, "prises count cache hit");
            return Ok(*hit);
        }

        let prepared = cached(&mut self.prepared, lookup.id(), || prepare_lookup(lookup))?;
        let count = prepared.as_ref().and_then(|p| p.count(&key.1));
        if self.prises.len() >= PRISES_CACHE_LIMIT {
            debug!(entries = self.prises.len(), "prises count cache full, clearing");
            self.prises.clear();
        }
        self.prises.insert(key, count);
        Ok(count)
    }
}

fn require_route(route: &Option<RouteTable>) -> Result<&RouteTable> {
    route
        .as_ref()
        .ok_or_else(|| RouteError::NotLoaded("route table".into()))
}

fn classify(table: &RouteTable) -> RoleAssignment {
    let roles = RoleAssignment::classify(&table.column_names());
    info!(
        table = %table.name(),
        segment_slots = roles.segment_slots(),
        "columns classified"
    );
    roles
}

/// Column roles when the table has any; free-text cells otherwise.
fn select_parser<'a>(config: &RouteConfig, roles: &'a RoleAssignment) -> Box<dyn RouteParser + 'a> {
    if roles.has_segment_columns() || !config.legacy_fallback {
        Box::new(ColumnRoleExtractor::new(roles))
    } else {
        Box::new(LegacyCellParser)
    }
}

fn prepare_lookup(table: &RouteTable) -> Result<Option<PreparedLookup>> {
    match PreparedLookup::for_frame(table.frame()) {
        Ok(prepared) => {
            info!(
                table = %table.name(),
                socket = %prepared.columns().socket,
                panel = %prepared.columns().panel,
                "lookup columns prepared"
            );
            Ok(Some(prepared))
        }
        Err(RouteError::ColumnNotFound(token)) => {
            warn!(table = %table.name(), missing = %token, "prises count unavailable");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::SpliceState;

    const ROP: &str = "\
Tiroir;Position;Câble 1;Capacité 1;Longueur 1;Tube 1;Fibre 1;Boîte 1;Etat 1;Câble 2;Longueur 2;Boîte 2;Etat 2
T01;1;CAB1;12;100;1;1;BPE-01;EPISSUREE;CAB2;50;BPE-02;STOCKEE
T01;2;CAB1;12;100;1;2;BPE-01;STOCKEE;;;;
";

    const STBAN: &str = "\
NOM_BOITE;REF_PBO_PRISE;REF_PBO_PTO
BPE-02;BPE-02;
X;BOX2;BPE-02
Y;;BPE-02
";

    fn session() -> RouteSession {
        let config = RouteConfig {
            csv_separator: ';',
            ..RouteConfig::default()
        };
        let mut session = RouteSession::new(config);
        session.load_route_bytes("rop.csv", ROP.as_bytes().to_vec()).unwrap();
        session
    }

    #[test]
    fn queries_before_loading_are_rejected() {
        let mut session = RouteSession::default();
        assert!(matches!(
            session.search(SearchMode::General("BPE".into())),
            Err(RouteError::NotLoaded(_))
        ));
        assert!(matches!(session.roles(), Err(RouteError::NotLoaded(_))));
        assert_eq!(session.prises_count("BPE-01").unwrap(), None);
    }

    #[test]
    fn box_search_builds_full_routes() {
        let mut session = session();
        let results = session.search(SearchMode::Box("bpe-02".into())).unwrap();

        assert_eq!(results.routes.len(), 1);
        let route = &results.routes[0];
        assert_eq!(route.steps.len(), 2);
        assert_eq!(route.steps[1].segment.state, Some(SpliceState::Stored));
        assert_eq!(route.identifier.to_string(), "T01 / 1 / T1 / F1");
        let total = route.total_length().unwrap();
        assert!((total - 157.5).abs() < 1e-9);
        assert_eq!(results.prises, None);
    }

    #[test]
    fn unmatched_search_is_empty_not_an_error() {
        let mut session = session();
        let results = session.search(SearchMode::General("ZZZ".into())).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn stored_only_comes_from_config() {
        let config = RouteConfig {
            csv_separator: ';',
            stored_only: true,
            ..RouteConfig::default()
        };
        let mut session = RouteSession::new(config);
        session.load_route_bytes("rop.csv", ROP.as_bytes().to_vec()).unwrap();

        let results = session.search(SearchMode::Box("BPE-01".into())).unwrap();
        assert_eq!(results.routes.len(), 1);
        assert_eq!(results.routes[0].row, 1);
    }

    #[test]
    fn prises_count_joins_search_results() {
        let mut session = session();
        session.load_lookup_bytes("stban.csv", STBAN.as_bytes().to_vec()).unwrap();

        let results = session.search(SearchMode::Box("BPE-02".into())).unwrap();
        let prises = results.prises.unwrap();
        assert_eq!(prises.socket, 1);
        assert_eq!(prises.panel_only, 2);
        assert_eq!(prises.total(), 3);
    }

    #[test]
    fn lookup_without_columns_leaves_prises_unavailable() {
        let mut session = session();
        session
            .load_lookup_bytes("stban.csv", b"NOM_BOITE;AUTRE\nBPE-02;x\n".to_vec())
            .unwrap();

        let results = session.search(SearchMode::Box("BPE-02".into())).unwrap();
        assert_eq!(results.routes.len(), 1);
        assert_eq!(results.prises, None);
    }

    #[test]
    fn reloading_tables_invalidates_caches() {
        let mut session = session();
        assert_eq!(session.roles().unwrap().segment_slots(), 2);
        session.load_lookup_bytes("stban.csv", STBAN.as_bytes().to_vec()).unwrap();
        assert_eq!(session.prises_count("BPE-02").unwrap().map(|p| p.total()), Some(3));
        assert!(session.box_catalogue().unwrap().contains(&"X".to_string()));

        session
            .load_route_bytes("rop2.csv", b"Boite;Etat\nPM-9;OK\n".to_vec())
            .unwrap();
        assert_eq!(session.roles().unwrap().segment_slots(), 1);
        assert!(session.box_catalogue().unwrap().contains(&"PM-9".to_string()));
        assert!(!session.box_catalogue().unwrap().contains(&"CAB1".to_string()));

        session
            .load_lookup_bytes(
                "stban2.csv",
                b"NOM_BOITE;REF_PBO_PRISE;REF_PBO_PTO\nZ;BPE-02;\n".to_vec(),
            )
            .unwrap();
        assert_eq!(session.prises_count("BPE-02").unwrap().map(|p| p.total()), Some(1));
        assert!(!session.box_catalogue().unwrap().contains(&"X".to_string()));

        session.clear_lookup();
        assert_eq!(session.prises_count("BPE-02").unwrap(), None);
    }

    #[test]
    fn failed_load_keeps_previous_table() {
        let mut session = session();
        let before = session.route_info().unwrap().id;
        assert!(session.load_route_bytes("empty.csv", b"\n".to_vec()).is_err());
        assert_eq!(session.route_info().unwrap().id, before);
    }

    #[test]
    fn suggestions_and_unique_values() {
        let mut session = session();
        assert_eq!(session.suggest_boxes("bpe").unwrap(), vec!["BPE-01", "BPE-02"]);
        let values = session.unique_values().unwrap();
        assert!(values.contains(&"EPISSUREE".to_string()));
        assert!(values.contains(&"T01".to_string()));
    }

    #[test]
    fn free_text_tables_use_the_legacy_parser() {
        let legacy = "A,B\nPM-NORD,TE2-CA-0000101_72F0 / 10ml (10ml) T2\n";
        let mut session = RouteSession::default();
        session.load_route_bytes("legacy.csv", legacy.as_bytes().to_vec()).unwrap();

        let route = session.route_for_row(0).unwrap();
        assert_eq!(route.steps.len(), 2);
        assert_eq!(route.steps[0].segment.box_id.as_deref(), Some("PM-NORD"));
        assert_eq!(route.steps[1].segment.cable.as_deref(), Some("TE2-CA-0000101_72F0"));

        let config = RouteConfig {
            legacy_fallback: false,
            ..RouteConfig::default()
        };
        let mut session = RouteSession::new(config);
        session.load_route_bytes("legacy.csv", legacy.as_bytes().to_vec()).unwrap();
        assert!(!session.route_for_row(0).unwrap().has_detail());
    }

    #[test]
    fn repeated_hop_headers_with_stray_spaces_still_pair() {
        let mut session = RouteSession::new(RouteConfig {
            csv_separator: ';',
            ..RouteConfig::default()
        });
        let rop = "Câble;Boîte;Câble ;Boîte \nCAB1;BPE-01;CAB2;BPE-02\n";
        session.load_route_bytes("rop.csv", rop.as_bytes().to_vec()).unwrap();

        let route = session.route_for_row(0).unwrap();
        assert_eq!(route.steps.len(), 2);
        assert_eq!(route.steps[1].segment.cable.as_deref(), Some("CAB2"));
        assert_eq!(route.steps[1].segment.box_id.as_deref(), Some("BPE-02"));
    }

    #[test]
    fn workbook_files_load_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rop.xlsx");
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, header) in ["Câble 1", "Longueur 1", "Boîte 1"].iter().enumerate() {
            sheet.write_string(0, col as u16, *header).unwrap();
        }
        sheet.write_string(1, 0, "CAB1").unwrap();
        sheet.write_number(1, 1, 100.0).unwrap();
        sheet.write_string(1, 2, "BPE-01").unwrap();
        workbook.save(&path).unwrap();

        let mut session = RouteSession::default();
        let info = session.load_route_path(&path).unwrap();
        assert_eq!(info.rows, 1);

        let results = session.search(SearchMode::Box("bpe-01".into())).unwrap();
        assert_eq!(results.routes.len(), 1);
        let total = results.routes[0].total_length().unwrap();
        assert!((total - 105.0).abs() < 1e-9);
    }

    #[test]
    fn prises_cache_stays_bounded() {
        let mut session = session();
        session.load_lookup_bytes("stban.csv", STBAN.as_bytes().to_vec()).unwrap();
        for i in 0..PRISES_CACHE_LIMIT + 10 {
            session.prises_count(&format!("term {i}")).unwrap();
        }
        assert!(session.prises.len() <= PRISES_CACHE_LIMIT);
        assert_eq!(session.prises_count("BPE-02").unwrap().map(|p| p.total()), Some(3));
    }
}
