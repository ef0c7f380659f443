pub mod geo;
pub mod hhmm;
