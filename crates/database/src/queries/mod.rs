use reparto::store::StoreError;

pub mod billing;
pub mod carrier;
pub mod config;
pub mod geo_cache;
pub mod historico;
pub mod matrix_cache;
pub mod pedido_listo;
pub mod remito;
pub mod ruta;

pub(crate) fn convert_error(why: sqlx::Error) -> StoreError {
    match why {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(db.message().to_owned())
        }
        _ => StoreError::Other(Box::new(why)),
    }
}
