use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::info;

use route_optique::classify::ColumnRole;
use route_optique::config::RouteConfig;
use route_optique::render::{self, RouteView};
use route_optique::search::{SearchMode, SearchResults};
use route_optique::session::RouteSession;

use crate::cli::{BoxesArgs, PrisesArgs, SearchArgs, TableArgs};

/// Build a session from the config file and load the tables named on the command line.
pub fn open_session(tables: &TableArgs) -> Result<RouteSession> {
    let mut config = match &tables.config {
        Some(path) => RouteConfig::load_from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => RouteConfig::default(),
    };
    if let Some(separator) = tables.separator {
        config.csv_separator = separator;
    }

    let mut session = RouteSession::new(config);
    if let Some(path) = &tables.route {
        session
            .load_route_path(path)
            .with_context(|| format!("failed to load route table {}", path.display()))?;
    }
    if let Some(path) = &tables.lookup {
        session
            .load_lookup_path(path)
            .with_context(|| format!("failed to load lookup table {}", path.display()))?;
    }
    Ok(session)
}

pub fn search(session: &mut RouteSession, tables: &TableArgs, args: SearchArgs) -> Result<()> {
    require_route(tables)?;
    if args.stored_only && !args.box_mode {
        bail!("--stored-only applies to --box searches");
    }

    if args.stored_only {
        session.set_stored_only(true);
    }

    let mode = if args.box_mode {
        SearchMode::Box(args.term)
    } else {
        SearchMode::General(args.term)
    };
    let results = session.search(mode).context("search failed")?;
    info!(routes = results.routes.len(), "search finished");

    if args.html {
        println!("{}", render::render_results_html(&results));
    } else if tables.json {
        print_json(&results)?;
    } else {
        print_results(&results);
    }
    Ok(())
}

pub fn boxes(session: &mut RouteSession, tables: &TableArgs, args: BoxesArgs) -> Result<()> {
    require_route(tables)?;
    let names = session.suggest_boxes(args.query.as_deref().unwrap_or(""))?;

    if tables.json {
        print_json(&names)?;
    } else {
        for name in names {
            println!("{name}");
        }
    }
    Ok(())
}

pub fn prises(session: &mut RouteSession, tables: &TableArgs, args: PrisesArgs) -> Result<()> {
    if tables.lookup.is_none() {
        bail!("--lookup is required to count prises");
    }
    let count = session.prises_count(&args.box_name)?;

    if tables.json {
        print_json(&count)?;
        return Ok(());
    }
    match count {
        Some(count) => println!(
            "{}: {} prises ({} socket, {} panel only, {} socket patched elsewhere)",
            args.box_name,
            count.total(),
            count.socket,
            count.panel_only,
            count.socket_with_other_panel
        ),
        None => println!("{}: prises count unavailable", args.box_name),
    }
    Ok(())
}

#[derive(Serialize)]
struct ColumnReport<'a> {
    index: usize,
    name: &'a str,
    role: &'static str,
}

pub fn columns(session: &mut RouteSession, tables: &TableArgs) -> Result<()> {
    require_route(tables)?;
    let roles = session.roles()?;

    let report: Vec<ColumnReport> = (0..roles.width())
        .map(|index| ColumnReport {
            index,
            name: roles.column_name(index).unwrap_or(""),
            role: roles.role_of(index).as_str(),
        })
        .collect();

    if tables.json {
        print_json(&report)?;
        return Ok(());
    }
    for column in &report {
        println!("{:>3}  {:<12}  {}", column.index, column.role, column.name);
    }
    let unclassified = report
        .iter()
        .filter(|c| c.role == ColumnRole::Unclassified.as_str())
        .count();
    println!(
        "{} columns, {} unclassified, {} segment slots",
        report.len(),
        unclassified,
        roles.segment_slots()
    );
    Ok(())
}

fn require_route(tables: &TableArgs) -> Result<()> {
    if tables.route.is_none() {
        bail!("--route is required");
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to serialize output")?
    );
    Ok(())
}

fn print_results(results: &SearchResults) {
    if let Some(count) = &results.prises {
        println!("Prises: {}", count.total());
    }
    if results.is_empty() {
        println!("No route found for \"{}\"", results.mode.term());
        return;
    }
    println!("{} route(s) found", results.routes.len());

    for route in &results.routes {
        let view = RouteView::from_route(route);
        println!();
        println!(
            "ROP {} - {}",
            view.row + 1,
            view.title.as_deref().unwrap_or("?")
        );
        if !view.identifier.is_empty() {
            println!("  {}", view.identifier);
        }
        if view.segments.is_empty() {
            println!("  (no route detail)");
        }
        for segment in &view.segments {
            let mut parts: Vec<String> = Vec::new();
            if let Some(label) = &segment.cable_label {
                parts.push(label.clone());
            }
            match (&segment.length_label, &segment.cumulative_label) {
                (Some(l), Some(c)) => parts.push(format!("{l} (cumul {c})")),
                (Some(l), None) => parts.push(l.clone()),
                (None, Some(c)) => parts.push(format!("cumul {c}")),
                (None, None) => {}
            }
            let badges = [
                &segment.box_badge,
                &segment.tube_badge,
                &segment.fiber_badge,
                &segment.cassette_badge,
                &segment.state_badge,
            ];
            parts.extend(badges.into_iter().flatten().map(|b| b.text.clone()));
            println!("  {:>2}. {}", segment.index, parts.join("  "));
        }
        if let Some(total) = &view.total_length_label {
            println!("  total {total}");
        }
    }
}
