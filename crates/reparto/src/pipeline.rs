//! The seven-step order pipeline: from a raw remito to a terminal
//! classification. Runs at ingest and on explicit reprocess; it never
//! advances the lifecycle — that is the operator's call.

use std::sync::Arc;

use log::{error, warn};
use model::{
    carrier,
    config::RouteConfig,
    remito::{Clasificacion, Remito},
};
use serde::Serialize;

use crate::{
    direccion,
    error::{ServiceError, ServiceResult},
    geocode::Geocoder,
    new_run_id,
    provider::TransportClassifier,
    region,
    store::{Store, StoreError},
    transportista, ventana,
};

#[derive(Debug, Clone, Serialize)]
pub struct IngestResult {
    pub total: usize,
    pub nuevos: usize,
    pub duplicados: usize,
    pub errores: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessPendingResult {
    pub processed: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct NuevoRemito {
    pub numero: String,
    pub cliente: Option<String>,
    pub telefono: Option<String>,
    pub direccion: Option<String>,
    pub localidad: Option<String>,
    pub observaciones: Option<String>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct RemitoUpdate {
    pub cliente: Option<String>,
    pub telefono: Option<String>,
    pub observaciones: Option<String>,
    pub es_urgente: Option<bool>,
    pub es_prioridad: Option<bool>,
}

pub struct Pipeline<S> {
    store: Arc<S>,
    geocoder: Geocoder,
    ai: Option<Arc<dyn TransportClassifier>>,
}

impl<S: Store> Pipeline<S> {
    pub fn new(
        store: Arc<S>,
        geocoder: Geocoder,
        ai: Option<Arc<dyn TransportClassifier>>,
    ) -> Self {
        Self {
            store,
            geocoder,
            ai,
        }
    }

    async fn load_config(&self) -> ServiceResult<RouteConfig> {
        let entries = self.store.config_entries().await?;
        Ok(RouteConfig::from_entries(&entries))
    }

    /// Batch ingest by order number. Numbers already present in the
    /// active set or the archive count as duplicates; one bad order
    /// never stops the batch.
    pub async fn ingest_batch(
        &self,
        numeros: &[String],
        source: &str,
    ) -> ServiceResult<IngestResult> {
        let config = self.load_config().await?;
        let run_id = new_run_id();

        let mut result = IngestResult {
            total: numeros.len(),
            nuevos: 0,
            duplicados: 0,
            errores: vec![],
        };

        for numero in numeros {
            let numero = numero.trim().to_uppercase();
            if numero.is_empty() {
                continue;
            }
            match self.ingest_one(&numero, source, &config, &run_id).await {
                Ok(true) => result.nuevos += 1,
                Ok(false) => result.duplicados += 1,
                Err(why) => {
                    error!("ingest failed for {numero}: {why}");
                    result.errores.push(format!("{numero}: {why}"));
                }
            }
        }

        Ok(result)
    }

    async fn ingest_one(
        &self,
        numero: &str,
        source: &str,
        config: &RouteConfig,
        run_id: &str,
    ) -> ServiceResult<bool> {
        if self.store.remito_by_numero(numero).await?.is_some() {
            return Ok(false);
        }
        if self.store.numero_en_historico(numero).await? {
            return Ok(false);
        }

        let inserted = match self
            .store
            .insert_remito(&Remito::nuevo(numero, source))
            .await
        {
            Ok(remito) => remito,
            // Lost an insert race: that is a duplicate, not an error.
            Err(StoreError::Conflict(_)) => return Ok(false),
            Err(why) => return Err(why.into()),
        };

        self.commit_run(inserted, config, run_id).await?;
        Ok(true)
    }

    /// Re-runs the pipeline for one order and persists the outcome.
    pub async fn reprocess(&self, numero: &str) -> ServiceResult<Remito> {
        let remito = self
            .store
            .remito_by_numero(&numero.trim().to_uppercase())
            .await?
            .ok_or_else(|| ServiceError::not_found("Remito"))?;
        let config = self.load_config().await?;
        self.commit_run(remito, &config, &new_run_id()).await
    }

    /// Reprocesses every order still classified `pendiente`.
    pub async fn process_pending(&self) -> ServiceResult<ProcessPendingResult> {
        let pending = self.store.remitos_pendientes().await?;
        let config = self.load_config().await?;
        let run_id = new_run_id();

        let mut result = ProcessPendingResult {
            processed: 0,
            errors: 0,
        };
        for remito in pending {
            let numero = remito.numero.clone();
            match self.commit_run(remito, &config, &run_id).await {
                Ok(_) => result.processed += 1,
                Err(why) => {
                    result.errors += 1;
                    error!("reprocess failed for {numero}: {why}");
                }
            }
        }
        Ok(result)
    }

    /// Runs the steps over a loaded remito and commits with the
    /// optimistic guard. The losing writer reloads and reruns once.
    async fn commit_run(
        &self,
        mut remito: Remito,
        config: &RouteConfig,
        run_id: &str,
    ) -> ServiceResult<Remito> {
        for _ in 0..2 {
            let mut work = remito.clone();
            self.process(&mut work, config, run_id).await?;
            match self.store.update_remito_guarded(&work).await? {
                Some(saved) => return Ok(saved),
                None => {
                    warn!(
                        "pipeline lost a write race on {}, retrying",
                        remito.numero
                    );
                    remito = self
                        .store
                        .remito_by_numero(&remito.numero)
                        .await?
                        .ok_or_else(|| ServiceError::not_found("Remito"))?;
                }
            }
        }
        Err(ServiceError::Conflict(format!(
            "corridas concurrentes sobre el remito {}",
            remito.numero
        )))
    }

    /// The classification steps. Mutates the remito in memory only; all
    /// provider results are materialized before the caller writes.
    pub async fn process(
        &self,
        remito: &mut Remito,
        config: &RouteConfig,
        run_id: &str,
    ) -> ServiceResult<()> {
        // Step 0 — merge the prepared-order record, if one arrived.
        self.merge_pedido_listo(remito).await?;

        let domicilio = remito
            .direccion_raw
            .clone()
            .or_else(|| remito.direccion_normalizada.clone())
            .unwrap_or_default();
        let observaciones = remito.observaciones.clone().unwrap_or_default();

        // Step 0.5 — normalize and fold locality aliases.
        if !domicilio.is_empty() {
            let normalized =
                direccion::fold_city_aliases(&direccion::normalize(&domicilio));
            remito.direccion_normalizada = Some(normalized);
        }

        // Step 1 — depot pickup?
        if transportista::detect_pickup(&observaciones)
            || transportista::detect_pickup(&domicilio)
        {
            let pickup = self
                .store
                .carrier_by_nombre(carrier::RETIRO_EN_GALPON)
                .await?;
            remito.carrier_id = pickup.map(|c| c.id);
            remito.estado_clasificacion = Clasificacion::RetiroSospechado;
            remito.motivo_clasificacion =
                Some("Detectado como retiro en galpón".to_owned());
            return Ok(());
        }

        // Step 2 — third-party carrier?
        let carriers = self.store.carriers_activos().await?;
        let texto = if observaciones.is_empty() {
            remito.transporte_raw.clone().unwrap_or_default()
        } else {
            observaciones.clone()
        };
        let provincia = remito
            .provincia
            .clone()
            .unwrap_or_else(|| "Mendoza".to_owned());
        let detection = transportista::detect(
            &carriers,
            &texto,
            Some(&provincia),
            self.ai.as_deref(),
        )
        .await;
        if !model::carrier::Carrier::es_flujo_propio(&detection.nombre_canonico) {
            remito.carrier_id = detection.carrier_id;
            remito.estado_clasificacion = Clasificacion::TransporteExterno;
            remito.motivo_clasificacion = Some(format!(
                "Carrier detectado: {}",
                detection.nombre_canonico
            ));
            return Ok(());
        }
        remito.carrier_id = detection.carrier_id;

        // Step 3 — address sanity.
        if domicilio.trim().chars().count() < 5 {
            remito.estado_clasificacion = Clasificacion::Corregir;
            remito.motivo_clasificacion =
                Some("Dirección vacía o muy corta".to_owned());
            return Ok(());
        }

        // Step 4 — make sure a locality token and the region are present.
        if let Some(normalized) = remito.direccion_normalizada.clone() {
            if !region::has_known_locality(&normalized.to_uppercase()) {
                let completed = match remito.localidad.as_deref() {
                    Some(localidad) if !localidad.trim().is_empty() => {
                        direccion::reorder_components(&normalized, localidad)
                    }
                    _ => format!("{normalized}, Mendoza"),
                };
                remito.direccion_normalizada = Some(completed);
            }
        }

        // Step 5 — geocode.
        let address = remito
            .direccion_normalizada
            .clone()
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| domicilio.clone());
        match self
            .geocoder
            .lookup(
                self.store.as_ref(),
                &address,
                config.geocode_cache_days,
                run_id,
                "pipeline",
            )
            .await
        {
            Some(geo) => {
                remito.lat = Some(geo.lat);
                remito.lng = Some(geo.lng);
                remito.geocode_provider = Some(geo.provider);
                remito.geocode_score = Some(geo.confidence);
                remito.geocode_formatted = Some(geo.formatted_address);
                remito.geocode_has_street_num = Some(geo.has_street_number);
                if !geo.has_street_number {
                    remito.estado_clasificacion = Clasificacion::Corregir;
                    remito.motivo_clasificacion =
                        Some("Sin número de calle en geocodificación".to_owned());
                    return Ok(());
                }
            }
            None => {
                remito.estado_clasificacion = Clasificacion::NoEncontrado;
                remito.motivo_clasificacion =
                    Some("Geocodificación sin resultado".to_owned());
                return Ok(());
            }
        }

        // Step 6 — delivery window.
        let parsed = ventana::parse(&observaciones);
        remito.ventana_tipo = Some(parsed.ventana_tipo);
        remito.ventana_desde_min = parsed.desde_min;
        remito.ventana_hasta_min = parsed.hasta_min;
        remito.ventana_raw = parsed.raw;
        remito.llamar_antes = parsed.llamar_antes;

        // Step 7 — ready to dispatch.
        remito.estado_clasificacion = Clasificacion::Enviar;
        remito.motivo_clasificacion = None;
        Ok(())
    }

    async fn merge_pedido_listo(&self, remito: &mut Remito) -> ServiceResult<()> {
        let Some(mut pedido) = self
            .store
            .pedido_listo_by_numero(&remito.numero)
            .await?
        else {
            return Ok(());
        };

        // Gap-fill only: operator-entered or corrected values survive a
        // reprocess, the prepared record fills what is still missing.
        remito.cliente = remito.cliente.take().or_else(|| pedido.cliente.clone());
        remito.direccion_raw = remito
            .direccion_raw
            .take()
            .or_else(|| pedido.domicilio.clone());
        remito.localidad = remito.localidad.take().or_else(|| pedido.localidad.clone());
        remito.provincia = remito.provincia.take().or_else(|| pedido.provincia.clone());
        remito.observaciones = remito
            .observaciones
            .take()
            .or_else(|| pedido.observaciones.clone());
        remito.transporte_raw = remito
            .transporte_raw
            .take()
            .or_else(|| pedido.transporte.clone());

        if pedido.remito_id != Some(remito.id) && remito.id != 0 {
            pedido.remito_id = Some(remito.id);
            if let Err(why) = self.store.update_pedido_listo(&pedido).await {
                warn!(
                    "could not link pedido listo {} to remito: {why}",
                    pedido.numero_remito
                );
            }
        }
        Ok(())
    }

    /// Operator override: new address, coordinates reset, classification
    /// back to `pendiente`, then a fresh pipeline run.
    pub async fn correct_address(
        &self,
        numero: &str,
        direccion: &str,
    ) -> ServiceResult<Remito> {
        let mut remito = self
            .store
            .remito_by_numero(&numero.trim().to_uppercase())
            .await?
            .ok_or_else(|| ServiceError::not_found("Remito"))?;

        remito.direccion_raw = Some(direccion.to_owned());
        remito.direccion_normalizada = Some(direccion::fold_city_aliases(
            &direccion::normalize(direccion),
        ));
        remito.lat = None;
        remito.lng = None;
        remito.geocode_provider = None;
        remito.geocode_score = None;
        remito.geocode_formatted = None;
        remito.geocode_has_street_num = None;
        remito.estado_clasificacion = Clasificacion::Pendiente;
        remito.motivo_clasificacion = None;

        let saved = self.store.update_remito(&remito).await?;
        let config = self.load_config().await?;
        self.commit_run(saved, &config, &new_run_id()).await
    }

    /// Single creation with attributes, immediately classified.
    pub async fn create_single(&self, input: NuevoRemito) -> ServiceResult<Remito> {
        let numero = input.numero.trim().to_uppercase();
        if numero.is_empty() {
            return Err(ServiceError::Validation(
                "número de remito vacío".to_owned(),
            ));
        }
        if self.store.remito_by_numero(&numero).await?.is_some()
            || self.store.numero_en_historico(&numero).await?
        {
            return Err(ServiceError::Conflict(format!(
                "remito {numero} ya existe"
            )));
        }

        let mut remito = Remito::nuevo(numero.as_str(), "manual");
        remito.cliente = input.cliente;
        remito.telefono = input.telefono;
        remito.direccion_raw = input.direccion;
        remito.localidad = input.localidad;
        remito.observaciones = input.observaciones;

        let inserted = self.store.insert_remito(&remito).await?;
        let config = self.load_config().await?;
        self.commit_run(inserted, &config, &new_run_id()).await
    }

    /// Operator attribute update; no reclassification.
    pub async fn update_attributes(
        &self,
        numero: &str,
        cambios: RemitoUpdate,
    ) -> ServiceResult<Remito> {
        let mut remito = self
            .store
            .remito_by_numero(&numero.trim().to_uppercase())
            .await?
            .ok_or_else(|| ServiceError::not_found("Remito"))?;

        if let Some(cliente) = cambios.cliente {
            remito.cliente = Some(cliente);
        }
        if let Some(telefono) = cambios.telefono {
            remito.telefono = Some(telefono);
        }
        if let Some(observaciones) = cambios.observaciones {
            remito.observaciones = Some(observaciones);
        }
        if let Some(urgente) = cambios.es_urgente {
            remito.es_urgente = urgente;
        }
        if let Some(prioridad) = cambios.es_prioridad {
            remito.es_prioridad = prioridad;
        }

        Ok(self.store.update_remito(&remito).await?)
    }

    /// Operator override of the terminal classification.
    pub async fn override_clasificacion(
        &self,
        numero: &str,
        clasificacion: Clasificacion,
        motivo: Option<String>,
    ) -> ServiceResult<Remito> {
        let mut remito = self
            .store
            .remito_by_numero(&numero.trim().to_uppercase())
            .await?
            .ok_or_else(|| ServiceError::not_found("Remito"))?;
        remito.estado_clasificacion = clasificacion;
        remito.motivo_clasificacion = motivo;
        Ok(self.store.update_remito(&remito).await?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use model::{
        billing::BillingTrace,
        cache::{GeoCacheEntry, MatrixCacheEntry},
        carrier::{self, Carrier},
        config::ConfigEntry,
        historico::HistoricoEntregado,
        pedido_listo::PedidoListo,
        remito::Lifecycle,
        ruta::{ParadaEstado, Ruta, RutaEstado, RutaExcluido, RutaParada},
        Coordinate,
    };

    use super::*;
    use crate::provider::{GeocodeCandidate, GeocodeProvider, ProviderError};
    use crate::store::{
        BillingRepo, CarrierRepo, ConfigRepo, GeoCacheRepo, HistoricoRepo,
        MatrixCacheRepo, PedidoListoRepo, RemitoFilter, RemitoRepo,
        Result as StoreResult, RutaRepo,
    };

    /// In-memory store covering the whole `Store` supertrait; shared by
    /// the pipeline, delivery and route-builder tests.
    #[derive(Default)]
    pub(crate) struct MemStore {
        pub remitos: Mutex<Vec<Remito>>,
        pub carriers: Mutex<Vec<Carrier>>,
        pub rutas: Mutex<Vec<Ruta>>,
        pub paradas: Mutex<Vec<RutaParada>>,
        pub excluidos: Mutex<Vec<RutaExcluido>>,
        pub geo: Mutex<Vec<GeoCacheEntry>>,
        pub matrix: Mutex<Vec<MatrixCacheEntry>>,
        pub config: Mutex<Vec<ConfigEntry>>,
        pub traces: Mutex<Vec<BillingTrace>>,
        pub historico: Mutex<Vec<HistoricoEntregado>>,
        pub pedidos: Mutex<Vec<PedidoListo>>,
        pub fail_excluido_inserts: Mutex<bool>,
    }

    impl MemStore {
        pub fn with_carriers() -> Self {
            let store = Self::default();
            let seed = [
                (1, carrier::RETIRO_EN_GALPON, None::<&str>, false, true, 10),
                (2, "ANDREANI", Some(r"(?i)andreani"), true, false, 20),
                (3, "OCA", Some(r"(?i)\boca\b"), true, false, 20),
                (4, carrier::ENVIO_PROPIO, None, false, false, 30),
                (5, carrier::DESCONOCIDO, None, true, false, 99),
            ];
            *store.carriers.lock().unwrap() = seed
                .into_iter()
                .map(|(id, nombre, regex, externo, pickup, prioridad)| Carrier {
                    id,
                    nombre_canonico: nombre.to_owned(),
                    aliases: vec![],
                    regex_pattern: regex.map(str::to_owned),
                    es_externo: externo,
                    es_pickup: pickup,
                    activo: true,
                    prioridad_regex: prioridad,
                    created_at: None,
                    updated_at: None,
                })
                .collect();
            store
        }
    }

    #[async_trait]
    impl RemitoRepo for MemStore {
        async fn remito_by_id(&self, id: i32) -> StoreResult<Option<Remito>> {
            Ok(self
                .remitos
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.id == id)
                .cloned())
        }

        async fn remito_by_numero(
            &self,
            numero: &str,
        ) -> StoreResult<Option<Remito>> {
            Ok(self
                .remitos
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.numero == numero)
                .cloned())
        }

        async fn insert_remito(&self, remito: &Remito) -> StoreResult<Remito> {
            let mut remitos = self.remitos.lock().unwrap();
            if remitos.iter().any(|r| r.numero == remito.numero) {
                return Err(crate::store::StoreError::Conflict(
                    remito.numero.clone(),
                ));
            }
            let mut stored = remito.clone();
            stored.id = remitos.len() as i32 + 1;
            stored.created_at = Some(Utc::now());
            stored.updated_at = Some(Utc::now());
            stored.fecha_ingreso = Some(Utc::now());
            remitos.push(stored.clone());
            Ok(stored)
        }

        async fn update_remito(&self, remito: &Remito) -> StoreResult<Remito> {
            let mut remitos = self.remitos.lock().unwrap();
            let slot = remitos
                .iter_mut()
                .find(|r| r.id == remito.id)
                .ok_or(crate::store::StoreError::NotFound)?;
            let mut updated = remito.clone();
            updated.updated_at = Some(Utc::now());
            *slot = updated.clone();
            Ok(updated)
        }

        async fn update_remito_guarded(
            &self,
            remito: &Remito,
        ) -> StoreResult<Option<Remito>> {
            let mut remitos = self.remitos.lock().unwrap();
            let slot = remitos
                .iter_mut()
                .find(|r| r.id == remito.id)
                .ok_or(crate::store::StoreError::NotFound)?;
            if slot.updated_at != remito.updated_at {
                return Ok(None);
            }
            let mut updated = remito.clone();
            updated.updated_at = Some(Utc::now());
            *slot = updated.clone();
            Ok(Some(updated))
        }

        async fn delete_remito(&self, id: i32) -> StoreResult<()> {
            self.remitos.lock().unwrap().retain(|r| r.id != id);
            Ok(())
        }

        async fn remitos_pendientes(&self) -> StoreResult<Vec<Remito>> {
            Ok(self
                .remitos
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.estado_clasificacion == Clasificacion::Pendiente)
                .cloned()
                .collect())
        }

        async fn candidatos_ruta(&self) -> StoreResult<Vec<Remito>> {
            Ok(self
                .remitos
                .lock()
                .unwrap()
                .iter()
                .filter(|r| {
                    r.estado_clasificacion == Clasificacion::Enviar
                        && r.estado_lifecycle == Lifecycle::Armado
                        && r.lat.is_some()
                        && r.lng.is_some()
                })
                .cloned()
                .collect())
        }

        async fn list_remitos(
            &self,
            _filter: &RemitoFilter,
        ) -> StoreResult<(Vec<Remito>, i64)> {
            let remitos = self.remitos.lock().unwrap().clone();
            let total = remitos.len() as i64;
            Ok((remitos, total))
        }
    }

    #[async_trait]
    impl CarrierRepo for MemStore {
        async fn carrier_by_id(&self, id: i32) -> StoreResult<Option<Carrier>> {
            Ok(self
                .carriers
                .lock()
                .unwrap()
                .iter()
                .find(|c| c.id == id)
                .cloned())
        }

        async fn carrier_by_nombre(
            &self,
            nombre: &str,
        ) -> StoreResult<Option<Carrier>> {
            Ok(self
                .carriers
                .lock()
                .unwrap()
                .iter()
                .find(|c| c.nombre_canonico == nombre)
                .cloned())
        }

        async fn carriers_activos(&self) -> StoreResult<Vec<Carrier>> {
            Ok(self
                .carriers
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.activo)
                .cloned()
                .collect())
        }

        async fn list_carriers(&self) -> StoreResult<Vec<Carrier>> {
            Ok(self.carriers.lock().unwrap().clone())
        }

        async fn insert_carrier(&self, carrier: &Carrier) -> StoreResult<Carrier> {
            let mut carriers = self.carriers.lock().unwrap();
            let mut stored = carrier.clone();
            stored.id = carriers.len() as i32 + 1;
            carriers.push(stored.clone());
            Ok(stored)
        }

        async fn update_carrier(&self, carrier: &Carrier) -> StoreResult<Carrier> {
            let mut carriers = self.carriers.lock().unwrap();
            let slot = carriers
                .iter_mut()
                .find(|c| c.id == carrier.id)
                .ok_or(crate::store::StoreError::NotFound)?;
            *slot = carrier.clone();
            Ok(carrier.clone())
        }
    }

    #[async_trait]
    impl RutaRepo for MemStore {
        async fn insert_ruta(
            &self,
            ruta: &Ruta,
            paradas: &[RutaParada],
        ) -> StoreResult<Ruta> {
            let mut rutas = self.rutas.lock().unwrap();
            let mut stored = ruta.clone();
            stored.id = rutas.len() as i32 + 1;
            stored.created_at = Some(Utc::now());
            rutas.push(stored.clone());

            let mut all = self.paradas.lock().unwrap();
            for parada in paradas {
                let mut p = parada.clone();
                p.id = all.len() as i32 + 1;
                p.ruta_id = stored.id;
                all.push(p);
            }
            Ok(stored)
        }

        async fn insert_excluido(
            &self,
            excluido: &RutaExcluido,
        ) -> StoreResult<()> {
            if *self.fail_excluido_inserts.lock().unwrap() {
                return Err(crate::store::StoreError::NotFound);
            }
            let mut all = self.excluidos.lock().unwrap();
            let mut e = excluido.clone();
            e.id = all.len() as i32 + 1;
            all.push(e);
            Ok(())
        }

        async fn ruta_by_id(&self, id: i32) -> StoreResult<Option<Ruta>> {
            Ok(self.rutas.lock().unwrap().iter().find(|r| r.id == id).cloned())
        }

        async fn ruta_latest(&self) -> StoreResult<Option<Ruta>> {
            Ok(self.rutas.lock().unwrap().last().cloned())
        }

        async fn list_rutas(&self, _limit: i64) -> StoreResult<Vec<Ruta>> {
            Ok(self.rutas.lock().unwrap().clone())
        }

        async fn delete_ruta(&self, id: i32) -> StoreResult<()> {
            self.rutas.lock().unwrap().retain(|r| r.id != id);
            self.paradas.lock().unwrap().retain(|p| p.ruta_id != id);
            self.excluidos.lock().unwrap().retain(|e| e.ruta_id != id);
            Ok(())
        }

        async fn paradas_de_ruta(
            &self,
            ruta_id: i32,
        ) -> StoreResult<Vec<RutaParada>> {
            let mut paradas: Vec<RutaParada> = self
                .paradas
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.ruta_id == ruta_id)
                .cloned()
                .collect();
            paradas.sort_by_key(|p| p.orden);
            Ok(paradas)
        }

        async fn excluidos_de_ruta(
            &self,
            ruta_id: i32,
        ) -> StoreResult<Vec<RutaExcluido>> {
            Ok(self
                .excluidos
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.ruta_id == ruta_id)
                .cloned()
                .collect())
        }

        async fn set_ruta_estado(
            &self,
            ruta_id: i32,
            estado: RutaEstado,
        ) -> StoreResult<()> {
            let mut rutas = self.rutas.lock().unwrap();
            let ruta = rutas
                .iter_mut()
                .find(|r| r.id == ruta_id)
                .ok_or(crate::store::StoreError::NotFound)?;
            ruta.estado = estado;
            Ok(())
        }

        async fn set_parada_estado(
            &self,
            ruta_id: i32,
            parada_id: i32,
            estado: ParadaEstado,
        ) -> StoreResult<()> {
            let mut paradas = self.paradas.lock().unwrap();
            let parada = paradas
                .iter_mut()
                .find(|p| p.id == parada_id && p.ruta_id == ruta_id)
                .ok_or(crate::store::StoreError::NotFound)?;
            parada.estado = estado;
            Ok(())
        }

        async fn parada_pendiente_de_remito(
            &self,
            remito_id: i32,
        ) -> StoreResult<Option<RutaParada>> {
            Ok(self
                .paradas
                .lock()
                .unwrap()
                .iter()
                .filter(|p| {
                    p.remito_id == Some(remito_id)
                        && p.estado == ParadaEstado::Pendiente
                })
                .last()
                .cloned())
        }
    }

    #[async_trait]
    impl GeoCacheRepo for MemStore {
        async fn geo_cache_lookup(
            &self,
            key: &str,
            now: DateTime<Utc>,
        ) -> StoreResult<Option<GeoCacheEntry>> {
            Ok(self
                .geo
                .lock()
                .unwrap()
                .iter()
                .find(|entry| {
                    entry.key_normalizada == key
                        && entry.expires_at.map(|ts| ts > now).unwrap_or(true)
                })
                .cloned())
        }

        async fn geo_cache_store(&self, entry: &GeoCacheEntry) -> StoreResult<()> {
            self.geo.lock().unwrap().push(entry.clone());
            Ok(())
        }
    }

    #[async_trait]
    impl MatrixCacheRepo for MemStore {
        async fn matrix_cache_lookup(
            &self,
            origin: Coordinate,
            dest: Coordinate,
            tolerance_deg: f64,
            now: DateTime<Utc>,
        ) -> StoreResult<Option<f64>> {
            Ok(self
                .matrix
                .lock()
                .unwrap()
                .iter()
                .find(|entry| {
                    (entry.origin_lat - origin.lat).abs() <= tolerance_deg
                        && (entry.origin_lng - origin.lng).abs() <= tolerance_deg
                        && (entry.dest_lat - dest.lat).abs() <= tolerance_deg
                        && (entry.dest_lng - dest.lng).abs() <= tolerance_deg
                        && entry.expires_at > now
                })
                .map(|entry| entry.duration_sec))
        }

        async fn matrix_cache_store(
            &self,
            entry: &MatrixCacheEntry,
        ) -> StoreResult<()> {
            self.matrix.lock().unwrap().push(entry.clone());
            Ok(())
        }
    }

    #[async_trait]
    impl ConfigRepo for MemStore {
        async fn config_entries(&self) -> StoreResult<Vec<ConfigEntry>> {
            Ok(self.config.lock().unwrap().clone())
        }

        async fn upsert_config(&self, entry: &ConfigEntry) -> StoreResult<()> {
            let mut config = self.config.lock().unwrap();
            if let Some(slot) = config.iter_mut().find(|e| e.key == entry.key) {
                *slot = entry.clone();
            } else {
                config.push(entry.clone());
            }
            Ok(())
        }
    }

    #[async_trait]
    impl BillingRepo for MemStore {
        async fn append_billing(&self, trace: &BillingTrace) -> StoreResult<()> {
            self.traces.lock().unwrap().push(trace.clone());
            Ok(())
        }

        async fn list_billing(
            &self,
            _run_id: Option<&str>,
            _limit: i64,
        ) -> StoreResult<Vec<BillingTrace>> {
            Ok(self.traces.lock().unwrap().clone())
        }
    }

    #[async_trait]
    impl HistoricoRepo for MemStore {
        async fn historico_by_id(
            &self,
            id: i32,
        ) -> StoreResult<Option<HistoricoEntregado>> {
            Ok(self
                .historico
                .lock()
                .unwrap()
                .iter()
                .find(|h| h.id == id)
                .cloned())
        }

        async fn insert_historico(
            &self,
            row: &HistoricoEntregado,
        ) -> StoreResult<HistoricoEntregado> {
            let mut historico = self.historico.lock().unwrap();
            let mut stored = row.clone();
            stored.id = historico.len() as i32 + 1;
            stored.fecha_archivado = Some(Utc::now());
            historico.push(stored.clone());
            Ok(stored)
        }

        async fn delete_historico(&self, id: i32) -> StoreResult<()> {
            self.historico.lock().unwrap().retain(|h| h.id != id);
            Ok(())
        }

        async fn list_historico(
            &self,
            _limit: i64,
        ) -> StoreResult<Vec<HistoricoEntregado>> {
            Ok(self.historico.lock().unwrap().clone())
        }

        async fn numero_en_historico(&self, numero: &str) -> StoreResult<bool> {
            Ok(self
                .historico
                .lock()
                .unwrap()
                .iter()
                .any(|h| h.numero == numero))
        }
    }

    #[async_trait]
    impl PedidoListoRepo for MemStore {
        async fn pedido_listo_by_numero(
            &self,
            numero: &str,
        ) -> StoreResult<Option<PedidoListo>> {
            Ok(self
                .pedidos
                .lock()
                .unwrap()
                .iter()
                .find(|p| p.numero_remito == numero)
                .cloned())
        }

        async fn insert_pedido_listo(
            &self,
            pedido: &PedidoListo,
        ) -> StoreResult<PedidoListo> {
            let mut pedidos = self.pedidos.lock().unwrap();
            let mut stored = pedido.clone();
            stored.id = pedidos.len() as i32 + 1;
            pedidos.push(stored.clone());
            Ok(stored)
        }

        async fn update_pedido_listo(
            &self,
            pedido: &PedidoListo,
        ) -> StoreResult<PedidoListo> {
            let mut pedidos = self.pedidos.lock().unwrap();
            let slot = pedidos
                .iter_mut()
                .find(|p| p.id == pedido.id)
                .ok_or(crate::store::StoreError::NotFound)?;
            *slot = pedido.clone();
            Ok(pedido.clone())
        }
    }

    pub(crate) struct FixedGeo {
        pub answer: Option<GeocodeCandidate>,
    }

    #[async_trait]
    impl GeocodeProvider for FixedGeo {
        fn name(&self) -> &'static str {
            "ors"
        }

        async fn geocode(
            &self,
            _address: &str,
        ) -> Result<Option<GeocodeCandidate>, ProviderError> {
            Ok(self.answer.clone())
        }
    }

    pub(crate) fn rooftop(lat: f64, lng: f64) -> GeocodeCandidate {
        GeocodeCandidate {
            lat,
            lng,
            formatted_address: "Av. San Martín 1200, Godoy Cruz, Mendoza".to_owned(),
            has_street_number: true,
            confidence: 0.95,
        }
    }

    fn pipeline_with(
        store: Arc<MemStore>,
        answer: Option<GeocodeCandidate>,
    ) -> Pipeline<MemStore> {
        let geocoder = Geocoder::new(vec![Arc::new(FixedGeo { answer })]);
        Pipeline::new(store, geocoder, None)
    }

    fn pedido(numero: &str, domicilio: &str, observaciones: &str) -> PedidoListo {
        PedidoListo {
            id: 0,
            remito_id: None,
            numero_remito: numero.to_owned(),
            cliente: Some("Cliente SA".to_owned()),
            domicilio: Some(domicilio.to_owned()),
            localidad: Some("Godoy Cruz".to_owned()),
            provincia: Some("Mendoza".to_owned()),
            observaciones: Some(observaciones.to_owned()),
            transporte: None,
            fecha_remito: None,
            synced_at: None,
            raw_data: None,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let store = Arc::new(MemStore::with_carriers());
        let pipeline = pipeline_with(store.clone(), None);
        let result = pipeline.ingest_batch(&[], "manual").await.unwrap();
        assert_eq!(result.total, 0);
        assert_eq!(result.nuevos, 0);
        assert_eq!(result.duplicados, 0);
        assert!(result.errores.is_empty());
    }

    #[tokio::test]
    async fn happy_path_ends_in_enviar_with_am_window() {
        let store = Arc::new(MemStore::with_carriers());
        store
            .pedidos
            .lock()
            .unwrap()
            .push(pedido(
                "R-1001",
                "Av San Martin 1200, Godoy Cruz",
                "entregar por la mañana",
            ));

        let pipeline =
            pipeline_with(store.clone(), Some(rooftop(-32.95, -68.84)));
        let result = pipeline
            .ingest_batch(&["R-1001".to_owned()], "manual")
            .await
            .unwrap();
        assert_eq!(result.nuevos, 1);
        assert!(result.errores.is_empty());

        let remito = store
            .remito_by_numero("R-1001")
            .await
            .unwrap()
            .expect("ingested");
        assert_eq!(remito.estado_clasificacion, Clasificacion::Enviar);
        assert_eq!(remito.estado_lifecycle, Lifecycle::Ingresado);
        assert_eq!(remito.ventana_tipo, Some(model::remito::VentanaTipo::Am));
        assert_eq!(remito.ventana_desde_min, Some(480));
        assert_eq!(remito.ventana_hasta_min, Some(780));
        assert!(remito.lat.is_some());
        assert!(remito.motivo_clasificacion.is_none());
        // Own fleet carrier assigned.
        assert_eq!(remito.carrier_id, Some(4));
    }

    #[tokio::test]
    async fn duplicate_numbers_are_counted_not_errored() {
        let store = Arc::new(MemStore::with_carriers());
        store.pedidos.lock().unwrap().push(pedido(
            "R-2",
            "Belgrano 450, Godoy Cruz",
            "",
        ));
        let pipeline =
            pipeline_with(store.clone(), Some(rooftop(-32.95, -68.84)));

        let first = pipeline
            .ingest_batch(&["r-2 ".to_owned()], "manual")
            .await
            .unwrap();
        assert_eq!(first.nuevos, 1);

        let second = pipeline
            .ingest_batch(&["R-2".to_owned()], "manual")
            .await
            .unwrap();
        assert_eq!(second.nuevos, 0);
        assert_eq!(second.duplicados, 1);
    }

    #[tokio::test]
    async fn pickup_observation_ends_at_step_one() {
        let store = Arc::new(MemStore::with_carriers());
        store.pedidos.lock().unwrap().push(pedido(
            "R-3",
            "Belgrano 450, Godoy Cruz",
            "el cliente retira en depósito",
        ));
        let pipeline = pipeline_with(store.clone(), None);
        pipeline
            .ingest_batch(&["R-3".to_owned()], "manual")
            .await
            .unwrap();

        let remito = store.remito_by_numero("R-3").await.unwrap().unwrap();
        assert_eq!(
            remito.estado_clasificacion,
            Clasificacion::RetiroSospechado
        );
        assert_eq!(remito.carrier_id, Some(1));
        // Step 5 never ran.
        assert!(remito.lat.is_none());
    }

    #[tokio::test]
    async fn external_carrier_ends_at_step_two() {
        let store = Arc::new(MemStore::with_carriers());
        store.pedidos.lock().unwrap().push(pedido(
            "R-4",
            "Belgrano 450, Godoy Cruz",
            "enviar via Andreani",
        ));
        let pipeline = pipeline_with(store.clone(), None);
        pipeline
            .ingest_batch(&["R-4".to_owned()], "manual")
            .await
            .unwrap();

        let remito = store.remito_by_numero("R-4").await.unwrap().unwrap();
        assert_eq!(
            remito.estado_clasificacion,
            Clasificacion::TransporteExterno
        );
        assert_eq!(remito.carrier_id, Some(2));
        assert!(remito
            .motivo_clasificacion
            .as_deref()
            .unwrap()
            .contains("ANDREANI"));
    }

    #[tokio::test]
    async fn empty_address_needs_correction() {
        let store = Arc::new(MemStore::with_carriers());
        let pipeline = pipeline_with(store.clone(), None);
        pipeline
            .ingest_batch(&["R-5".to_owned()], "manual")
            .await
            .unwrap();

        let remito = store.remito_by_numero("R-5").await.unwrap().unwrap();
        assert_eq!(remito.estado_clasificacion, Clasificacion::Corregir);
        assert!(remito
            .motivo_clasificacion
            .as_deref()
            .unwrap()
            .contains("Dirección"));
    }

    #[tokio::test]
    async fn geocode_miss_is_no_encontrado() {
        let store = Arc::new(MemStore::with_carriers());
        store.pedidos.lock().unwrap().push(pedido(
            "R-6",
            "Calle Inexistente 999, Godoy Cruz",
            "",
        ));
        let pipeline = pipeline_with(store.clone(), None);
        pipeline
            .ingest_batch(&["R-6".to_owned()], "manual")
            .await
            .unwrap();

        let remito = store.remito_by_numero("R-6").await.unwrap().unwrap();
        assert_eq!(remito.estado_clasificacion, Clasificacion::NoEncontrado);
    }

    #[tokio::test]
    async fn missing_street_number_needs_correction() {
        let store = Arc::new(MemStore::with_carriers());
        store.pedidos.lock().unwrap().push(pedido(
            "R-7",
            "Calle San Juan s/n, Godoy Cruz",
            "",
        ));
        let mut candidate = rooftop(-32.95, -68.84);
        candidate.has_street_number = false;
        let pipeline = pipeline_with(store.clone(), Some(candidate));
        pipeline
            .ingest_batch(&["R-7".to_owned()], "manual")
            .await
            .unwrap();

        let remito = store.remito_by_numero("R-7").await.unwrap().unwrap();
        assert_eq!(remito.estado_clasificacion, Clasificacion::Corregir);
        assert!(remito
            .motivo_clasificacion
            .as_deref()
            .unwrap()
            .contains("número de calle"));
    }

    #[tokio::test]
    async fn address_without_locality_gets_the_region_appended() {
        let store = Arc::new(MemStore::with_carriers());
        store.pedidos.lock().unwrap().push(pedido(
            "R-8",
            "Calle Remota 1234",
            "",
        ));
        let pipeline =
            pipeline_with(store.clone(), Some(rooftop(-32.95, -68.84)));
        pipeline
            .ingest_batch(&["R-8".to_owned()], "manual")
            .await
            .unwrap();

        let remito = store.remito_by_numero("R-8").await.unwrap().unwrap();
        assert!(remito
            .direccion_normalizada
            .as_deref()
            .unwrap()
            .ends_with(", Mendoza"));
    }

    #[tokio::test]
    async fn correct_address_resets_and_reruns() {
        let store = Arc::new(MemStore::with_carriers());
        let pipeline =
            pipeline_with(store.clone(), Some(rooftop(-32.95, -68.84)));
        pipeline
            .ingest_batch(&["R-9".to_owned()], "manual")
            .await
            .unwrap();
        // Ingested with no address at all → corregir.
        let before = store.remito_by_numero("R-9").await.unwrap().unwrap();
        assert_eq!(before.estado_clasificacion, Clasificacion::Corregir);

        let after = pipeline
            .correct_address("R-9", "Av San Martin 1200, Godoy Cruz")
            .await
            .unwrap();
        assert_eq!(after.estado_clasificacion, Clasificacion::Enviar);
        assert!(after.lat.is_some());
    }
}
