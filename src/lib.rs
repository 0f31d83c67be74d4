//! Review panels, projects and mark entry for capstone projects.
//!
//! [`store::Store`] holds every operation over the database and [`http`]
//! exposes them as a REST API. [`marking::MarkEntry`] drives guided mark entry
//! for one team.

pub mod algos;
pub mod checks;
pub mod config;
pub mod display;
pub mod error;
pub mod export;
pub mod http;
pub mod marking;
pub mod model;
pub mod store;
