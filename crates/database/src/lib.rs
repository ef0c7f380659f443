use std::error::Error;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{
    billing::BillingTrace,
    cache::{GeoCacheEntry, MatrixCacheEntry},
    carrier::Carrier,
    config::ConfigEntry,
    historico::HistoricoEntregado,
    pedido_listo::PedidoListo,
    remito::Remito,
    ruta::{ParadaEstado, Ruta, RutaEstado, RutaExcluido, RutaParada},
    Coordinate,
};
use reparto::store::{
    BillingRepo, CarrierRepo, ConfigRepo, GeoCacheRepo, HistoricoRepo,
    MatrixCacheRepo, PedidoListoRepo, RemitoFilter, RemitoRepo, Result,
    RutaRepo,
};

use queries::convert_error;

pub mod data_model;
pub mod queries;

/// Postgres-backed implementation of every repo trait the domain crate
/// defines. One pool for the whole process.
#[derive(Clone)]
pub struct PgStore {
    pool: sqlx::PgPool,
}

impl PgStore {
    /// Connects with a `postgres://` URL (see
    /// `reparto::settings::Settings::database_url`) and applies the
    /// pending migrations.
    pub async fn connect(
        database_url: &str,
    ) -> std::result::Result<Self, Box<dyn Error>> {
        let pool = sqlx::postgres::PgPool::connect(database_url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }

    /// Cache compaction: deletes every expired geocode and travel-time
    /// row. Returns the number of rows removed.
    pub async fn purge_expired_caches(&self, now: DateTime<Utc>) -> Result<u64> {
        let geo = queries::geo_cache::purge_expired(&self.pool, now).await?;
        let matrix = queries::matrix_cache::purge_expired(&self.pool, now).await?;
        Ok(geo + matrix)
    }
}

#[async_trait]
impl RemitoRepo for PgStore {
    async fn remito_by_id(&self, id: i32) -> Result<Option<Remito>> {
        queries::remito::by_id(&self.pool, id).await
    }

    async fn remito_by_numero(&self, numero: &str) -> Result<Option<Remito>> {
        queries::remito::by_numero(&self.pool, numero).await
    }

    async fn insert_remito(&self, remito: &Remito) -> Result<Remito> {
        queries::remito::insert(&self.pool, remito).await
    }

    async fn update_remito(&self, remito: &Remito) -> Result<Remito> {
        queries::remito::update(&self.pool, remito).await
    }

    async fn update_remito_guarded(
        &self,
        remito: &Remito,
    ) -> Result<Option<Remito>> {
        queries::remito::update_guarded(&self.pool, remito).await
    }

    async fn delete_remito(&self, id: i32) -> Result<()> {
        queries::remito::delete(&self.pool, id).await
    }

    async fn remitos_pendientes(&self) -> Result<Vec<Remito>> {
        queries::remito::pendientes(&self.pool).await
    }

    async fn candidatos_ruta(&self) -> Result<Vec<Remito>> {
        queries::remito::candidatos_ruta(&self.pool).await
    }

    async fn list_remitos(
        &self,
        filter: &RemitoFilter,
    ) -> Result<(Vec<Remito>, i64)> {
        let items = queries::remito::list(&self.pool, filter).await?;
        let total = queries::remito::count(&self.pool, filter).await?;
        Ok((items, total))
    }
}

#[async_trait]
impl CarrierRepo for PgStore {
    async fn carrier_by_id(&self, id: i32) -> Result<Option<Carrier>> {
        queries::carrier::by_id(&self.pool, id).await
    }

    async fn carrier_by_nombre(&self, nombre: &str) -> Result<Option<Carrier>> {
        queries::carrier::by_nombre(&self.pool, nombre).await
    }

    async fn carriers_activos(&self) -> Result<Vec<Carrier>> {
        queries::carrier::activos(&self.pool).await
    }

    async fn list_carriers(&self) -> Result<Vec<Carrier>> {
        queries::carrier::all(&self.pool).await
    }

    async fn insert_carrier(&self, carrier: &Carrier) -> Result<Carrier> {
        queries::carrier::insert(&self.pool, carrier).await
    }

    async fn update_carrier(&self, carrier: &Carrier) -> Result<Carrier> {
        queries::carrier::update(&self.pool, carrier).await
    }
}

#[async_trait]
impl RutaRepo for PgStore {
    async fn insert_ruta(
        &self,
        ruta: &Ruta,
        paradas: &[RutaParada],
    ) -> Result<Ruta> {
        let mut tx = self.pool.begin().await.map_err(convert_error)?;
        let saved = queries::ruta::insert(&mut *tx, ruta).await?;
        for parada in paradas {
            queries::ruta::insert_parada(&mut *tx, saved.id, parada).await?;
        }
        tx.commit().await.map_err(convert_error)?;
        Ok(saved)
    }

    async fn insert_excluido(&self, excluido: &RutaExcluido) -> Result<()> {
        queries::ruta::insert_excluido(&self.pool, excluido).await
    }

    async fn ruta_by_id(&self, id: i32) -> Result<Option<Ruta>> {
        queries::ruta::by_id(&self.pool, id).await
    }

    async fn ruta_latest(&self) -> Result<Option<Ruta>> {
        queries::ruta::latest(&self.pool).await
    }

    async fn list_rutas(&self, limit: i64) -> Result<Vec<Ruta>> {
        queries::ruta::list(&self.pool, limit).await
    }

    async fn delete_ruta(&self, id: i32) -> Result<()> {
        queries::ruta::delete(&self.pool, id).await
    }

    async fn paradas_de_ruta(&self, ruta_id: i32) -> Result<Vec<RutaParada>> {
        queries::ruta::paradas(&self.pool, ruta_id).await
    }

    async fn excluidos_de_ruta(
        &self,
        ruta_id: i32,
    ) -> Result<Vec<RutaExcluido>> {
        queries::ruta::excluidos(&self.pool, ruta_id).await
    }

    async fn set_ruta_estado(
        &self,
        ruta_id: i32,
        estado: RutaEstado,
    ) -> Result<()> {
        queries::ruta::set_estado(&self.pool, ruta_id, estado).await
    }

    async fn set_parada_estado(
        &self,
        ruta_id: i32,
        parada_id: i32,
        estado: ParadaEstado,
    ) -> Result<()> {
        queries::ruta::set_parada_estado(&self.pool, ruta_id, parada_id, estado)
            .await
    }

    async fn parada_pendiente_de_remito(
        &self,
        remito_id: i32,
    ) -> Result<Option<RutaParada>> {
        queries::ruta::parada_pendiente_de_remito(&self.pool, remito_id).await
    }
}

#[async_trait]
impl GeoCacheRepo for PgStore {
    async fn geo_cache_lookup(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<GeoCacheEntry>> {
        queries::geo_cache::lookup(&self.pool, key, now).await
    }

    async fn geo_cache_store(&self, entry: &GeoCacheEntry) -> Result<()> {
        queries::geo_cache::store(&self.pool, entry).await
    }
}

#[async_trait]
impl MatrixCacheRepo for PgStore {
    async fn matrix_cache_lookup(
        &self,
        origin: Coordinate,
        dest: Coordinate,
        tolerance_deg: f64,
        now: DateTime<Utc>,
    ) -> Result<Option<f64>> {
        queries::matrix_cache::lookup(&self.pool, origin, dest, tolerance_deg, now)
            .await
    }

    async fn matrix_cache_store(&self, entry: &MatrixCacheEntry) -> Result<()> {
        queries::matrix_cache::store(&self.pool, entry).await
    }
}

#[async_trait]
impl ConfigRepo for PgStore {
    async fn config_entries(&self) -> Result<Vec<ConfigEntry>> {
        queries::config::all(&self.pool).await
    }

    async fn upsert_config(&self, entry: &ConfigEntry) -> Result<()> {
        queries::config::upsert(&self.pool, entry).await
    }
}

#[async_trait]
impl BillingRepo for PgStore {
    async fn append_billing(&self, trace: &BillingTrace) -> Result<()> {
        queries::billing::append(&self.pool, trace).await
    }

    async fn list_billing(
        &self,
        run_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<BillingTrace>> {
        queries::billing::list(&self.pool, run_id, limit).await
    }
}

#[async_trait]
impl HistoricoRepo for PgStore {
    async fn historico_by_id(
        &self,
        id: i32,
    ) -> Result<Option<HistoricoEntregado>> {
        queries::historico::by_id(&self.pool, id).await
    }

    async fn insert_historico(
        &self,
        row: &HistoricoEntregado,
    ) -> Result<HistoricoEntregado> {
        queries::historico::insert(&self.pool, row).await
    }

    async fn delete_historico(&self, id: i32) -> Result<()> {
        queries::historico::delete(&self.pool, id).await
    }

    async fn list_historico(&self, limit: i64) -> Result<Vec<HistoricoEntregado>> {
        queries::historico::list(&self.pool, limit).await
    }

    async fn numero_en_historico(&self, numero: &str) -> Result<bool> {
        queries::historico::numero_exists(&self.pool, numero).await
    }
}

#[async_trait]
impl PedidoListoRepo for PgStore {
    async fn pedido_listo_by_numero(
        &self,
        numero: &str,
    ) -> Result<Option<PedidoListo>> {
        queries::pedido_listo::by_numero(&self.pool, numero).await
    }

    async fn insert_pedido_listo(
        &self,
        pedido: &PedidoListo,
    ) -> Result<PedidoListo> {
        queries::pedido_listo::insert(&self.pool, pedido).await
    }

    async fn update_pedido_listo(
        &self,
        pedido: &PedidoListo,
    ) -> Result<PedidoListo> {
        queries::pedido_listo::update(&self.pool, pedido).await
    }
}
