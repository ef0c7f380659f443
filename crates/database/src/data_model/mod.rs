//! Row structs mirroring the SQL schema, with conversions to and from
//! the domain models. Enum-ish columns are plain text in the database;
//! unknown values fall back to the safest variant on read.

pub mod billing;
pub mod carrier;
pub mod cache;
pub mod config;
pub mod historico;
pub mod pedido_listo;
pub mod remito;
pub mod ruta;
