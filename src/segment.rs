use serde::Serialize;

use crate::classify::{ColumnRole, RoleAssignment};
use crate::schema::state;
use crate::table::Row;

/// A numeric cell: original text plus its value when it parses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measure {
    pub raw: String,
    pub value: Option<f64>,
}

impl Measure {
    /// Accepts a decimal comma and a trailing `ml` / `m` unit.
    pub fn parse(text: &str) -> Self {
        let raw = text.trim().to_string();
        let lowered = raw.to_lowercase();
        let number = lowered
            .strip_suffix("ml")
            .or_else(|| lowered.strip_suffix('m'))
            .unwrap_or(&lowered)
            .trim()
            .replace(',', ".");
        let value = number.parse::<f64>().ok().filter(|v| v.is_finite());
        Self { raw, value }
    }

    /// Value as a 1-based ordinal (tube, fiber, capacity), if it is one.
    pub fn ordinal(&self) -> Option<u32> {
        let v = self.value?;
        if v >= 1.0 && v.fract() == 0.0 && v <= u32::MAX as f64 {
            Some(v as u32)
        } else {
            None
        }
    }
}

/// Fixed splice-state vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SpliceState {
    Stored,
    Spliced,
    InTransit,
    Ok,
    NotOk,
}

impl SpliceState {
    /// Exact match on the uppercased, trimmed cell. Anything else is dropped.
    pub fn parse(text: &str) -> Option<Self> {
        let upper = text.trim().to_uppercase();
        let table: [(&[&str], SpliceState); 5] = [
            (state::STORED, Self::Stored),
            (state::SPLICED, Self::Spliced),
            (state::IN_TRANSIT, Self::InTransit),
            (state::OK, Self::Ok),
            (state::NOT_OK, Self::NotOk),
        ];
        table
            .iter()
            .find(|(words, _)| words.contains(&upper.as_str()))
            .map(|(_, s)| *s)
    }

    /// Field label used in the spreadsheets.
    pub fn label(self) -> &'static str {
        match self {
            Self::Stored => "STOCKEE",
            Self::Spliced => "EPISSUREE",
            Self::InTransit => "EN PASSAGE",
            Self::Ok => "OK",
            Self::NotOk => "NOK",
        }
    }
}

/// One hop of a route.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Segment {
    /// 1-based position among the emitted segments of the row.
    pub index: usize,
    /// 0-based column group this segment was read from.
    pub slot: usize,
    pub cable: Option<String>,
    pub capacity: Option<Measure>,
    pub length: Option<Measure>,
    pub tube: Option<Measure>,
    pub fiber: Option<Measure>,
    pub box_id: Option<String>,
    pub state: Option<SpliceState>,
    pub cassette: Option<String>,
}

impl Segment {
    pub fn is_empty(&self) -> bool {
        self.cable.is_none()
            && self.capacity.is_none()
            && self.length.is_none()
            && self.tube.is_none()
            && self.fiber.is_none()
            && self.box_id.is_none()
            && self.state.is_none()
            && self.cassette.is_none()
    }
}

/// Turns one table row into its ordered route segments.
pub trait RouteParser {
    fn segments(&self, row: &Row) -> Vec<Segment>;
}

/// Reads segments positionally from role-classified columns: the i-th cable
/// column pairs with the i-th capacity column, the i-th tube column, and so on.
pub struct ColumnRoleExtractor<'a> {
    roles: &'a RoleAssignment,
}

impl<'a> ColumnRoleExtractor<'a> {
    pub fn new(roles: &'a RoleAssignment) -> Self {
        Self { roles }
    }

    fn cell<'r>(&self, row: &'r Row, role: ColumnRole, slot: usize) -> Option<&'r str> {
        let column = *self.roles.columns(role).get(slot)?;
        row.text(column)
    }
}

impl RouteParser for ColumnRoleExtractor<'_> {
    fn segments(&self, row: &Row) -> Vec<Segment> {
        let mut out = Vec::new();

        for slot in 0..self.roles.segment_slots() {
            let candidate = Segment {
                index: out.len() + 1,
                slot,
                cable: self.cell(row, ColumnRole::Cable, slot).map(str::to_string),
                capacity: self.cell(row, ColumnRole::Capacity, slot).map(Measure::parse),
                length: self.cell(row, ColumnRole::Length, slot).map(Measure::parse),
                tube: self.cell(row, ColumnRole::Tube, slot).map(Measure::parse),
                fiber: self.cell(row, ColumnRole::Fiber, slot).map(Measure::parse),
                box_id: self.cell(row, ColumnRole::Box, slot).map(str::to_string),
                state: self
                    .cell(row, ColumnRole::State, slot)
                    .and_then(SpliceState::parse),
                cassette: self.cell(row, ColumnRole::Cassette, slot).map(str::to_string),
            };
            if !candidate.is_empty() {
                out.push(candidate);
            }
        }

        out
    }
}
