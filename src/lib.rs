pub mod classify;
pub mod config;
pub mod error;
pub mod legacy;
pub mod length;
pub mod prises;
pub mod render;
pub mod route;
pub mod schema;
pub mod search;
pub mod segment;
pub mod session;
pub mod table;

#[cfg(feature = "python")]
mod python;

#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use pyo3::types::PyModule;

/// Export schema constants as Python submodules
#[cfg(feature = "python")]
fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Synonyms
    let synonyms = PyModule::new(m.py(), "synonyms")?;
    synonyms.add("CABLE", schema::synonyms::CABLE.to_vec())?;
    synonyms.add("CAPACITY", schema::synonyms::CAPACITY.to_vec())?;
    synonyms.add("LENGTH", schema::synonyms::LENGTH.to_vec())?;
    synonyms.add("TUBE", schema::synonyms::TUBE.to_vec())?;
    synonyms.add("FIBER", schema::synonyms::FIBER.to_vec())?;
    synonyms.add("BOX", schema::synonyms::BOX.to_vec())?;
    synonyms.add("STATE", schema::synonyms::STATE.to_vec())?;
    synonyms.add("CASSETTE", schema::synonyms::CASSETTE.to_vec())?;
    synonyms.add("DRAWER", schema::synonyms::DRAWER.to_vec())?;
    synonyms.add("POSITION", schema::synonyms::POSITION.to_vec())?;
    synonyms.add("LENGTH_EXCLUDED", schema::synonyms::LENGTH_EXCLUDED)?;
    m.add_submodule(&synonyms)?;

    // Lookup
    let lookup = PyModule::new(m.py(), "lookup")?;
    lookup.add("SOCKET_TOKEN", schema::lookup::SOCKET_TOKEN)?;
    lookup.add("PATCH_PANEL_TOKEN", schema::lookup::PATCH_PANEL_TOKEN)?;
    lookup.add(
        "BOX_NAME_FRAGMENTS",
        schema::lookup::BOX_NAME_FRAGMENTS.to_vec(),
    )?;
    m.add_submodule(&lookup)?;

    // State
    let state = PyModule::new(m.py(), "state")?;
    state.add("STORED", schema::state::STORED.to_vec())?;
    state.add("SPLICED", schema::state::SPLICED.to_vec())?;
    state.add("IN_TRANSIT", schema::state::IN_TRANSIT.to_vec())?;
    state.add("OK", schema::state::OK.to_vec())?;
    state.add("NOT_OK", schema::state::NOT_OK.to_vec())?;
    m.add_submodule(&state)?;

    // Length
    let length = PyModule::new(m.py(), "length")?;
    length.add("SLACK_FACTOR", schema::length::SLACK_FACTOR)?;
    m.add_submodule(&length)?;

    Ok(())
}

#[cfg(feature = "python")]
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<python::RouteOptique>()?;
    add_schema_exports(m)?;
    Ok(())
}
