/// Column-name vocabulary for route (ROP) and lookup (STBAN) spreadsheets.
/// Single source of truth - exported to Python via PyO3.

// ── Route column synonyms (lowercase, matched as substrings) ────────────────
pub mod synonyms {
    pub const CABLE: &[&str] = &["câble", "cable"];
    pub const CAPACITY: &[&str] = &[
        "capacité", "capacite", "capacity", "nb fo", "nb_fo", "nbfo", "nb fibre",
    ];
    pub const LENGTH: &[&str] = &["longueur", "length", "long."];
    pub const TUBE: &[&str] = &["tube"];
    pub const FIBER: &[&str] = &["fibre", "fiber"];
    pub const BOX: &[&str] = &["boîte", "boite", "box", "bpe"];
    pub const STATE: &[&str] = &["état", "etat", "statut", "status", "state"];
    pub const CASSETTE: &[&str] = &["cassette", "k7"];
    pub const DRAWER: &[&str] = &["tiroir", "drawer"];
    pub const POSITION: &[&str] = &["position"];

    /// Aggregate length columns ("Longueur totale") are never per-hop lengths.
    pub const LENGTH_EXCLUDED: &str = "total";
}

// ── Lookup (STBAN) columns ──────────────────────────────────────────────────
pub mod lookup {
    pub const SOCKET_TOKEN: &str = "REF_PBO_PRISE";
    pub const PATCH_PANEL_TOKEN: &str = "REF_PBO_PTO";

    /// Lowercase fragments identifying the box-name column of a lookup table.
    pub const BOX_NAME_FRAGMENTS: &[&str] = &["boite", "boîte", "box"];
}

// ── Splice-state vocabulary (uppercase) ─────────────────────────────────────
pub mod state {
    pub const STORED: &[&str] = &["STOCKEE", "STOCKÉE", "STORED"];
    pub const SPLICED: &[&str] = &["EPISSUREE", "ÉPISSURÉE", "SPLICED"];
    pub const IN_TRANSIT: &[&str] = &["EN PASSAGE", "IN-TRANSIT"];
    pub const OK: &[&str] = &["OK"];
    pub const NOT_OK: &[&str] = &["NOK", "NOT-OK"];
}

// ── Free-text labels found in legacy route cells ────────────────────────────
pub mod labels {
    pub const DRAWER: &str = "TIROIR";
    pub const POSITION: &str = "POSITION";
    pub const STORED_CELL: &str = "STOCKEE";
    /// End-point columns are skipped by box-mode search.
    pub const END_POINT: &str = "EXTREMI";
}

// ── Route physics ───────────────────────────────────────────────────────────
pub mod length {
    /// Slack added to every laid cable length.
    pub const SLACK_FACTOR: f64 = 1.05;
}
