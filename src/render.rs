/// Presentation module: view-models and HTML fragments for route display.
///
/// The engine hands the UI a `RouteView` per matched row: labels are already
/// formatted, tube and fiber badges carry their colour-code colour, state
/// badges carry a CSS class. The HTML emitters produce small escaped fragments;
/// styling lives with the caller.
use serde::Serialize;

use crate::prises::PrisesCount;
use crate::route::{Route, RouteStep};
use crate::search::SearchResults;
use crate::segment::{Measure, SpliceState};

// ── Fiber colour code ───────────────────────────────────────────────────────

/// The 12-colour fiber/tube identification code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FiberColor {
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
    White,
    Orange,
    Gray,
    Brown,
    Black,
    Cyan,
    Pink,
}

impl FiberColor {
    pub const PALETTE: [FiberColor; 12] = [
        FiberColor::Red,
        FiberColor::Blue,
        FiberColor::Green,
        FiberColor::Yellow,
        FiberColor::Purple,
        FiberColor::White,
        FiberColor::Orange,
        FiberColor::Gray,
        FiberColor::Brown,
        FiberColor::Black,
        FiberColor::Cyan,
        FiberColor::Pink,
    ];

    /// Colour of tube/fiber `number`; non-positive numbers get the default gray.
    pub fn for_number(number: i64) -> Self {
        if number <= 0 {
            return FiberColor::Gray;
        }
        Self::PALETTE[((number - 1) % 12) as usize]
    }

    pub fn for_measure(measure: &Measure) -> Self {
        measure
            .ordinal()
            .map(|n| Self::for_number(i64::from(n)))
            .unwrap_or(FiberColor::Gray)
    }

    pub fn hex(self) -> &'static str {
        match self {
            Self::Red => "#FF0000",
            Self::Blue => "#0000FF",
            Self::Green => "#008000",
            Self::Yellow => "#FFFF00",
            Self::Purple => "#800080",
            Self::White => "#FFFFFF",
            Self::Orange => "#FFA500",
            Self::Gray => "#808080",
            Self::Brown => "#8B4513",
            Self::Black => "#000000",
            Self::Cyan => "#00FFFF",
            Self::Pink => "#FFC0CB",
        }
    }

    /// Badge text colour: black on white or yellow, white otherwise.
    pub fn text_hex(self) -> &'static str {
        match self {
            Self::White | Self::Yellow => "#000000",
            _ => "#FFFFFF",
        }
    }
}

// ── View-models ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Badge {
    pub text: String,
    pub class: &'static str,
    /// Set on tube and fiber badges only.
    pub color: Option<FiberColor>,
}

impl Badge {
    fn plain(text: impl Into<String>, class: &'static str) -> Self {
        Self {
            text: text.into(),
            class,
            color: None,
        }
    }

    fn colored(prefix: char, measure: &Measure, class: &'static str) -> Self {
        Self {
            text: format!("{prefix}{}", measure.raw),
            class,
            color: Some(FiberColor::for_measure(measure)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentView {
    pub index: usize,
    pub cable_label: Option<String>,
    pub length_label: Option<String>,
    pub cumulative_label: Option<String>,
    pub box_badge: Option<Badge>,
    pub tube_badge: Option<Badge>,
    pub fiber_badge: Option<Badge>,
    pub state_badge: Option<Badge>,
    pub cassette_badge: Option<Badge>,
}

impl SegmentView {
    pub fn from_step(step: &RouteStep) -> Self {
        let segment = &step.segment;
        Self {
            index: segment.index,
            cable_label: cable_label(segment.cable.as_deref(), segment.capacity.as_ref()),
            length_label: segment.length.as_ref().map(|m| match m.value {
                Some(v) => metres(v),
                None => m.raw.clone(),
            }),
            cumulative_label: step.cumulative_length.map(metres),
            box_badge: segment
                .box_id
                .as_ref()
                .map(|b| Badge::plain(b.as_str(), "boite-badge")),
            tube_badge: segment
                .tube
                .as_ref()
                .map(|m| Badge::colored('T', m, "tube-badge")),
            fiber_badge: segment
                .fiber
                .as_ref()
                .map(|m| Badge::colored('F', m, "fiber-badge")),
            state_badge: segment
                .state
                .map(|s| Badge::plain(s.label(), status_class(s))),
            cassette_badge: segment
                .cassette
                .as_ref()
                .map(|k| Badge::plain(k.as_str(), "k7-badge")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteView {
    pub row: usize,
    pub title: Option<String>,
    pub identifier: String,
    pub segments: Vec<SegmentView>,
    pub total_length_label: Option<String>,
}

impl RouteView {
    pub fn from_route(route: &Route) -> Self {
        Self {
            row: route.row,
            title: route.title.clone(),
            identifier: route.identifier.to_string(),
            segments: route.steps.iter().map(SegmentView::from_step).collect(),
            total_length_label: route.total_length().map(metres),
        }
    }
}

/// `CAB1_12FO`; a capacity that is not a fiber count is shown as written.
pub fn cable_label(cable: Option<&str>, capacity: Option<&Measure>) -> Option<String> {
    let capacity = capacity.map(|m| match m.ordinal() {
        Some(n) => format!("{n}FO"),
        None => m.raw.clone(),
    });
    match (cable, capacity) {
        (Some(cable), Some(capacity)) => Some(format!("{cable}_{capacity}")),
        (Some(cable), None) => Some(cable.to_string()),
        (None, capacity) => capacity,
    }
}

pub fn status_class(state: SpliceState) -> &'static str {
    match state {
        SpliceState::Stored => "status-stockee",
        SpliceState::Spliced => "status-epissuree",
        SpliceState::InTransit => "status-en-passage",
        SpliceState::Ok => "status-ok",
        SpliceState::NotOk => "status-nok",
    }
}

/// Metres to one decimal, without a trailing `.0`.
fn metres(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{rounded:.0} m")
    } else {
        format!("{rounded:.1} m")
    }
}

// ── HTML fragments ──────────────────────────────────────────────────────────

pub fn render_route_html(route: &Route) -> String {
    let view = RouteView::from_route(route);
    let mut html = String::from(r#"<div class="route">"#);

    if let Some(title) = &view.title {
        html.push_str(&format!(
            r#"<h3 class="route-title">ROP pour <span class="search-term-highlight">{}</span></h3>"#,
            escape_html(title)
        ));
    }
    if !view.identifier.is_empty() {
        html.push_str(&format!(
            r#"<div class="route-identifier">{}</div>"#,
            escape_html(&view.identifier)
        ));
    }

    if view.segments.is_empty() {
        html.push_str(r#"<div class="route-empty">Pas de détails de route disponibles</div>"#);
    }
    for segment in &view.segments {
        html.push_str(&segment_html(segment));
    }

    if let Some(total) = &view.total_length_label {
        html.push_str(&format!(
            r#"<div class="route-total">Longueur totale : {}</div>"#,
            escape_html(total)
        ));
    }
    html.push_str("</div>");
    html
}

fn segment_html(view: &SegmentView) -> String {
    let mut html = format!(r#"<div class="segment" data-index="{}">"#, view.index);

    if let Some(label) = &view.cable_label {
        let length = match (&view.length_label, &view.cumulative_label) {
            (Some(l), Some(c)) => format!(" ({} / {})", l, c),
            (Some(l), None) => format!(" ({})", l),
            (None, Some(c)) => format!(" ({})", c),
            (None, None) => String::new(),
        };
        html.push_str(&format!(
            r#"<div class="cable-name">{}{}</div>"#,
            escape_html(label),
            escape_html(&length)
        ));
    }

    let badges = [
        &view.box_badge,
        &view.tube_badge,
        &view.fiber_badge,
        &view.cassette_badge,
        &view.state_badge,
    ];
    for badge in badges.into_iter().flatten() {
        html.push_str(&badge_html(badge));
    }

    html.push_str("</div>");
    html
}

fn badge_html(badge: &Badge) -> String {
    match badge.color {
        Some(color) => format!(
            r#"<span class="{}" style="background-color:{};color:{};">{}</span>"#,
            badge.class,
            color.hex(),
            color.text_hex(),
            escape_html(&badge.text)
        ),
        None => format!(
            r#"<span class="{}">{}</span>"#,
            badge.class,
            escape_html(&badge.text)
        ),
    }
}

pub fn render_prises_badge(count: &PrisesCount) -> String {
    format!(
        r#"<div class="prises-badge">Nombre de prises : <strong>{}</strong></div>"#,
        count.total()
    )
}

pub fn render_no_results(term: &str) -> String {
    format!(
        r#"<div class="no-results">Aucune ROP trouvée pour <strong>{}</strong></div>"#,
        escape_html(term)
    )
}

/// Full result block: prises badge, then one route per match or the empty state.
pub fn render_results_html(results: &SearchResults) -> String {
    let mut html = String::new();
    if let Some(count) = &results.prises {
        html.push_str(&render_prises_badge(count));
    }
    if results.is_empty() {
        html.push_str(&render_no_results(results.mode.term()));
    }
    for route in &results.routes {
        html.push_str(&render_route_html(route));
    }
    html
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
