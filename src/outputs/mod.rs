//! HTML output: the map fragment and the page around it.
//!
//! # Submodules
//!
//! - [`map`]: computes the viewport for a set of locations and renders the
//!   Leaflet fragment with one popup per marker
//! - [`page`]: the single-page UI (form, notices, map, results table)
//!
//! Everything the LLM or the user supplied is HTML-escaped before it is
//! written out.

pub mod map;
pub mod page;
