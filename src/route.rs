use std::fmt;

use serde::Serialize;

use crate::classify::{ColumnRole, RoleAssignment};
use crate::legacy::is_drawer_or_position;
use crate::length::cumulative_lengths;
use crate::schema::labels;
use crate::segment::{RouteParser, Segment};
use crate::table::Row;

/// Display key of a route: where it starts (drawer, position) and the optical
/// values at its far end.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RouteIdentifier {
    pub drawer: Option<String>,
    pub position: Option<String>,
    pub tube: Option<String>,
    pub fiber: Option<String>,
}

impl RouteIdentifier {
    pub fn from_row(row: &Row, roles: &RoleAssignment, segments: &[Segment]) -> Self {
        let drawer = first_in_role(row, roles, ColumnRole::Drawer)
            .or_else(|| labelled_cell(row, labels::DRAWER));
        let position = first_in_role(row, roles, ColumnRole::Position)
            .or_else(|| labelled_cell(row, labels::POSITION));

        let tube = segments
            .iter()
            .rev()
            .find_map(|s| s.tube.as_ref())
            .map(|m| m.raw.clone());
        let fiber = segments
            .iter()
            .rev()
            .find_map(|s| s.fiber.as_ref())
            .map(|m| m.raw.clone());

        Self {
            drawer,
            position,
            tube,
            fiber,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.drawer.is_none() && self.position.is_none() && self.tube.is_none() && self.fiber.is_none()
    }
}

impl fmt::Display for RouteIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [
            self.drawer.clone(),
            self.position.clone(),
            self.tube.as_ref().map(|t| format!("T{t}")),
            self.fiber.as_ref().map(|t| format!("F{t}")),
        ]
        .into_iter()
        .flatten()
        .collect();
        f.write_str(&parts.join(" / "))
    }
}

fn first_in_role(row: &Row, roles: &RoleAssignment, role: ColumnRole) -> Option<String> {
    roles
        .columns(role)
        .iter()
        .find_map(|&c| row.text(c))
        .map(str::to_string)
}

/// Legacy sheets carry "TIROIR : 3" style cells; keep the text after the last colon.
fn labelled_cell(row: &Row, label: &str) -> Option<String> {
    row.present_cells()
        .find(|(_, text)| text.to_uppercase().contains(label))
        .map(|(_, text)| text.rsplit(':').next().unwrap_or(text).trim().to_string())
}

/// A segment together with the laid length up to and including it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteStep {
    pub segment: Segment,
    pub cumulative_length: Option<f64>,
}

/// The rendered-ready route of one table row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub row: usize,
    pub title: Option<String>,
    pub identifier: RouteIdentifier,
    pub steps: Vec<RouteStep>,
}

impl Route {
    pub fn build(row: &Row, roles: &RoleAssignment, parser: &dyn RouteParser) -> Self {
        let segments = parser.segments(row);
        let identifier = RouteIdentifier::from_row(row, roles, &segments);
        let totals = cumulative_lengths(&segments);

        let title = row
            .present_cells()
            .map(|(_, text)| text)
            .find(|text| !is_drawer_or_position(text))
            .map(str::to_string);

        let steps = segments
            .into_iter()
            .zip(totals)
            .map(|(segment, cumulative_length)| RouteStep {
                segment,
                cumulative_length,
            })
            .collect();

        Self {
            row: row.index(),
            title,
            identifier,
            steps,
        }
    }

    /// No hop detail could be read from the row.
    pub fn has_detail(&self) -> bool {
        !self.steps.is_empty()
    }

    pub fn total_length(&self) -> Option<f64> {
        self.steps.last().and_then(|s| s.cumulative_length)
    }
}
