//! Parser for route sheets that store each hop as free text in a single cell,
//! e.g. `TE2-CA-0000101_72F0 / 10ml (10ml), T2, F5, BPE-12, EPISSUREE`.

use lazy_static::lazy_static;
use regex::Regex;

use crate::schema::labels;
use crate::segment::{Measure, RouteParser, Segment, SpliceState};
use crate::table::Row;

lazy_static! {
    static ref CABLE_CELL: Regex =
        Regex::new(r"^([A-Z0-9\-]+_\d+F\d*)\s*/\s*(\d+ml)\s*\((\d+ml)\)").unwrap();
    static ref CABLE_CAPACITY: Regex = Regex::new(r"_(\d+)F").unwrap();
}

pub struct LegacyCellParser;

impl RouteParser for LegacyCellParser {
    fn segments(&self, row: &Row) -> Vec<Segment> {
        let mut out = Vec::new();

        for (column, text) in row.present_cells() {
            let segment = match CABLE_CELL.captures(text) {
                Some(caps) => {
                    let name = &caps[1];
                    let mut segment = Segment {
                        cable: Some(name.to_string()),
                        capacity: CABLE_CAPACITY
                            .captures(name)
                            .map(|c| Measure::parse(&c[1])),
                        length: Some(Measure::parse(&caps[2])),
                        ..Default::default()
                    };
                    let rest = &text[caps.get(0).map(|m| m.end()).unwrap_or(0)..];
                    for part in rest.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                        apply_detail(&mut segment, part);
                    }
                    segment
                }
                None => {
                    if is_drawer_or_position(text) {
                        continue;
                    }
                    Segment {
                        box_id: Some(text.to_string()),
                        ..Default::default()
                    }
                }
            };

            out.push(Segment {
                index: out.len() + 1,
                slot: column,
                ..segment
            });
        }

        out
    }
}

pub(crate) fn is_drawer_or_position(text: &str) -> bool {
    let upper = text.to_uppercase();
    upper.contains(labels::DRAWER) || upper.contains(labels::POSITION)
}

fn apply_detail(segment: &mut Segment, part: &str) {
    if let Some(state) = detail_state(part) {
        segment.state = Some(state);
        return;
    }

    let upper = part.to_uppercase();
    if upper.contains("BPE") || upper.contains("CAS") {
        segment.box_id = Some(part.to_string());
    } else if upper.starts_with("K7") {
        segment.cassette = Some(part.to_string());
    } else if let Some(rest) = upper.strip_prefix('T') {
        segment.tube = Some(Measure::parse(rest.trim_start_matches("UBE")));
    } else if let Some(rest) = upper.strip_prefix('F') {
        let rest = rest
            .trim_start_matches("IBRE")
            .trim_start_matches("IBER");
        segment.fiber = Some(Measure::parse(rest));
    }
}

/// Loose state detection for free text; `nok` is tested before `ok`.
fn detail_state(part: &str) -> Option<SpliceState> {
    let lower = part.to_lowercase();
    if lower.contains("nok") {
        Some(SpliceState::NotOk)
    } else if lower.contains("epissure") {
        Some(SpliceState::Spliced)
    } else if lower.contains("passage") {
        Some(SpliceState::InTransit)
    } else if lower.contains("stockee") {
        Some(SpliceState::Stored)
    } else if lower.contains("ok") {
        Some(SpliceState::Ok)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Row {
        Row::new(0, cells.iter().map(|c| Some(c.to_string())).collect())
    }

    #[test]
    fn parses_cable_cell_with_details() {
        let segments = LegacyCellParser.segments(&row(&[
            "TE2-CA-0000101_72F0 / 10ml (10ml), T2, F5, BPE-12, EPISSUREE",
        ]));

        assert_eq!(segments.len(), 1);
        let s = &segments[0];
        assert_eq!(s.cable.as_deref(), Some("TE2-CA-0000101_72F0"));
        assert_eq!(s.capacity.as_ref().and_then(Measure::ordinal), Some(72));
        assert_eq!(s.length.as_ref().and_then(|m| m.value), Some(10.0));
        assert_eq!(s.tube.as_ref().and_then(Measure::ordinal), Some(2));
        assert_eq!(s.fiber.as_ref().and_then(Measure::ordinal), Some(5));
        assert_eq!(s.box_id.as_deref(), Some("BPE-12"));
        assert_eq!(s.state, Some(SpliceState::Spliced));
    }

    #[test]
    fn plain_cells_become_pass_through_points() {
        let segments = LegacyCellParser.segments(&row(&[
            "TIROIR : 3",
            "Position: 12",
            "PM-NORD",
            "CAB-1_12F / 25ml (35ml), NOK",
        ]));

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].index, 1);
        assert_eq!(segments[0].slot, 2);
        assert_eq!(segments[0].box_id.as_deref(), Some("PM-NORD"));
        assert_eq!(segments[1].index, 2);
        assert_eq!(segments[1].state, Some(SpliceState::NotOk));
    }

    #[test]
    fn cassette_detail_is_kept_apart_from_the_box() {
        let segments = LegacyCellParser.segments(&row(&["CAB-9_24F / 5ml (5ml), K7-3, BPE-4, T1"]));

        assert_eq!(segments.len(), 1);
        let s = &segments[0];
        assert_eq!(s.cassette.as_deref(), Some("K7-3"));
        assert_eq!(s.box_id.as_deref(), Some("BPE-4"));
        assert_eq!(s.tube.as_ref().and_then(Measure::ordinal), Some(1));
        assert_eq!(s.state, None);
    }

    #[test]
    fn detail_state_prefers_nok_over_ok() {
        assert_eq!(detail_state("NOK"), Some(SpliceState::NotOk));
        assert_eq!(detail_state("ok"), Some(SpliceState::Ok));
        assert_eq!(detail_state("En passage"), Some(SpliceState::InTransit));
        assert_eq!(detail_state("T3"), None);
    }
}
