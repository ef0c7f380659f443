use std::{error::Error, fmt, result};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{
    billing::BillingTrace,
    cache::{GeoCacheEntry, MatrixCacheEntry},
    carrier::Carrier,
    config::ConfigEntry,
    historico::HistoricoEntregado,
    pedido_listo::PedidoListo,
    remito::{Clasificacion, Lifecycle, Remito},
    ruta::{ParadaEstado, Ruta, RutaEstado, RutaExcluido, RutaParada},
    Coordinate,
};

#[derive(Debug)]
pub enum StoreError {
    NotFound,
    Conflict(String),
    Other(Box<dyn Error + Send + Sync>),
}

pub type Result<T> = result::Result<T, StoreError>;

impl StoreError {
    pub fn other<E: Error + Send + Sync + 'static>(why: E) -> Self {
        Self::Other(Box::new(why))
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "row not found"),
            Self::Conflict(detail) => write!(f, "unique violation: {detail}"),
            Self::Other(why) => write!(f, "store error: {why}"),
        }
    }
}

impl Error for StoreError {}

/// Paging/filter parameters for the remito listing.
#[derive(Debug, Clone, Default)]
pub struct RemitoFilter {
    pub clasificacion: Option<Clasificacion>,
    pub lifecycle: Option<Lifecycle>,
    pub query: Option<String>,
    pub page: usize,
    pub size: usize,
}

#[async_trait]
pub trait RemitoRepo {
    async fn remito_by_id(&self, id: i32) -> Result<Option<Remito>>;
    async fn remito_by_numero(&self, numero: &str) -> Result<Option<Remito>>;
    async fn insert_remito(&self, remito: &Remito) -> Result<Remito>;
    /// Unconditional overwrite by id; used by explicit operator overrides.
    async fn update_remito(&self, remito: &Remito) -> Result<Remito>;
    /// Optimistic overwrite: commits only when the stored `updated_at`
    /// still equals the one the caller loaded. `None` means the caller
    /// lost the race and must retry against refreshed state.
    async fn update_remito_guarded(&self, remito: &Remito)
        -> Result<Option<Remito>>;
    async fn delete_remito(&self, id: i32) -> Result<()>;
    async fn remitos_pendientes(&self) -> Result<Vec<Remito>>;
    /// Route candidates: clasificacion=enviar, lifecycle=armado and
    /// coordinates present.
    async fn candidatos_ruta(&self) -> Result<Vec<Remito>>;
    async fn list_remitos(&self, filter: &RemitoFilter)
        -> Result<(Vec<Remito>, i64)>;
}

#[async_trait]
pub trait CarrierRepo {
    async fn carrier_by_id(&self, id: i32) -> Result<Option<Carrier>>;
    async fn carrier_by_nombre(&self, nombre: &str) -> Result<Option<Carrier>>;
    async fn carriers_activos(&self) -> Result<Vec<Carrier>>;
    async fn list_carriers(&self) -> Result<Vec<Carrier>>;
    async fn insert_carrier(&self, carrier: &Carrier) -> Result<Carrier>;
    async fn update_carrier(&self, carrier: &Carrier) -> Result<Carrier>;
}

#[async_trait]
pub trait RutaRepo {
    /// Persists the route and its stops in one transaction. Exclusion
    /// rows go through [`RutaRepo::insert_excluido`] afterwards, one by
    /// one, so a single bad row cannot abort the route.
    async fn insert_ruta(&self, ruta: &Ruta, paradas: &[RutaParada])
        -> Result<Ruta>;
    async fn insert_excluido(&self, excluido: &RutaExcluido) -> Result<()>;
    async fn ruta_by_id(&self, id: i32) -> Result<Option<Ruta>>;
    async fn ruta_latest(&self) -> Result<Option<Ruta>>;
    async fn list_rutas(&self, limit: i64) -> Result<Vec<Ruta>>;
    async fn delete_ruta(&self, id: i32) -> Result<()>;
    async fn paradas_de_ruta(&self, ruta_id: i32) -> Result<Vec<RutaParada>>;
    async fn excluidos_de_ruta(&self, ruta_id: i32)
        -> Result<Vec<RutaExcluido>>;
    async fn set_ruta_estado(&self, ruta_id: i32, estado: RutaEstado)
        -> Result<()>;
    async fn set_parada_estado(
        &self,
        ruta_id: i32,
        parada_id: i32,
        estado: ParadaEstado,
    ) -> Result<()>;
    /// Latest still-pending stop referencing the remito, if any.
    async fn parada_pendiente_de_remito(&self, remito_id: i32)
        -> Result<Option<RutaParada>>;
}

#[async_trait]
pub trait GeoCacheRepo {
    /// Hit only when the row exists and has not expired at `now`.
    async fn geo_cache_lookup(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<GeoCacheEntry>>;
    async fn geo_cache_store(&self, entry: &GeoCacheEntry) -> Result<()>;
}

#[async_trait]
pub trait MatrixCacheRepo {
    /// Duration in seconds for an origin/destination pair within
    /// `tolerance_deg` per axis, any provider, not expired at `now`.
    async fn matrix_cache_lookup(
        &self,
        origin: Coordinate,
        dest: Coordinate,
        tolerance_deg: f64,
        now: DateTime<Utc>,
    ) -> Result<Option<f64>>;
    async fn matrix_cache_store(&self, entry: &MatrixCacheEntry) -> Result<()>;
}

#[async_trait]
pub trait ConfigRepo {
    async fn config_entries(&self) -> Result<Vec<ConfigEntry>>;
    async fn upsert_config(&self, entry: &ConfigEntry) -> Result<()>;
}

#[async_trait]
pub trait BillingRepo {
    /// Independent, best-effort append: never coupled to a business
    /// transaction. Callers log and swallow the error.
    async fn append_billing(&self, trace: &BillingTrace) -> Result<()>;
    async fn list_billing(&self, run_id: Option<&str>, limit: i64)
        -> Result<Vec<BillingTrace>>;
}

#[async_trait]
pub trait HistoricoRepo {
    async fn historico_by_id(&self, id: i32)
        -> Result<Option<HistoricoEntregado>>;
    async fn insert_historico(&self, row: &HistoricoEntregado)
        -> Result<HistoricoEntregado>;
    async fn delete_historico(&self, id: i32) -> Result<()>;
    async fn list_historico(&self, limit: i64)
        -> Result<Vec<HistoricoEntregado>>;
    async fn numero_en_historico(&self, numero: &str) -> Result<bool>;
}

#[async_trait]
pub trait PedidoListoRepo {
    async fn pedido_listo_by_numero(&self, numero: &str)
        -> Result<Option<PedidoListo>>;
    async fn insert_pedido_listo(&self, pedido: &PedidoListo)
        -> Result<PedidoListo>;
    async fn update_pedido_listo(&self, pedido: &PedidoListo)
        -> Result<PedidoListo>;
}

/// Everything the services need from the durable store.
pub trait Store:
    RemitoRepo
    + CarrierRepo
    + RutaRepo
    + GeoCacheRepo
    + MatrixCacheRepo
    + ConfigRepo
    + BillingRepo
    + HistoricoRepo
    + PedidoListoRepo
    + Send
    + Sync
{
}

impl<T> Store for T where
    T: RemitoRepo
        + CarrierRepo
        + RutaRepo
        + GeoCacheRepo
        + MatrixCacheRepo
        + ConfigRepo
        + BillingRepo
        + HistoricoRepo
        + PedidoListoRepo
        + Send
        + Sync
{
}
