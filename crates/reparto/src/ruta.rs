//! Daily route generation: candidate selection, exclusion filters,
//! travel-time matrix, ordering, materialization into an immutable
//! snapshot aggregate.

use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use log::warn;
use model::{
    config::{RouteConfig, RouteConfigOverride},
    remito::Remito,
    ruta::{ParadaEstado, Ruta, RutaEstado, RutaExcluido, RutaParada},
    Coordinate,
};
use utility::geo::{haversine_distance, haversine_minutes};

use crate::{
    error::ServiceResult,
    links,
    matrix,
    new_run_id,
    optimizer::{self, RoutePoint},
    provider::MatrixProvider,
    store::Store,
    ventana,
};

pub struct RouteBuilder<S> {
    store: Arc<S>,
    matrix_providers: HashMap<String, Arc<dyn MatrixProvider>>,
    matrix_cache_ttl_secs: i64,
}

struct Exclusion {
    point_idx: usize,
    motivo: String,
    distancia_km: Option<f64>,
}

impl<S: Store> RouteBuilder<S> {
    pub fn new(
        store: Arc<S>,
        matrix_providers: HashMap<String, Arc<dyn MatrixProvider>>,
        matrix_cache_ttl_secs: i64,
    ) -> Self {
        Self {
            store,
            matrix_providers,
            matrix_cache_ttl_secs,
        }
    }

    /// Generates and persists today's route. Always produces exactly one
    /// route aggregate, even with zero candidates.
    pub async fn generate(
        &self,
        config_override: Option<RouteConfigOverride>,
    ) -> ServiceResult<Ruta> {
        let entries = self.store.config_entries().await?;
        let mut config = RouteConfig::from_entries(&entries);
        if let Some(over) = &config_override {
            config.merge_override(over);
        }

        let run_id = new_run_id();
        let candidates = self.store.candidatos_ruta().await?;
        let all_points = to_route_points(&candidates);

        // Pre-matrix exclusion filters, in order. Urgent skips them all;
        // priority skips all but the operating window.
        let mut excluded: Vec<Exclusion> = Vec::new();
        let mut is_excluded = vec![false; all_points.len()];

        for (i, point) in all_points.iter().enumerate() {
            let dist = haversine_distance(
                config.deposito_lat,
                config.deposito_lng,
                point.lat,
                point.lng,
            );
            if dist > config.distancia_max_km && !point.urgente && !point.prioridad {
                is_excluded[i] = true;
                excluded.push(Exclusion {
                    point_idx: i,
                    motivo: format!(
                        "distancia_maxima ({dist:.1} km > {} km)",
                        config.distancia_max_km
                    ),
                    distancia_km: Some(dist),
                });
            }
        }

        if config.utilizar_ventana {
            for (i, point) in all_points.iter().enumerate() {
                if is_excluded[i] || point.urgente {
                    continue;
                }
                let inside = ventana::dentro_de_ventana_operativa(
                    Some(point.ventana_tipo),
                    point.ventana_desde_min,
                    point.ventana_hasta_min,
                    &config.hora_desde,
                    &config.hora_hasta,
                );
                if !inside {
                    is_excluded[i] = true;
                    excluded.push(Exclusion {
                        point_idx: i,
                        motivo: "ventana_horaria".to_owned(),
                        distancia_km: None,
                    });
                }
            }
        }

        for (i, point) in all_points.iter().enumerate() {
            if is_excluded[i] || point.urgente || point.prioridad {
                continue;
            }
            let vuelta_min = haversine_minutes(
                point.lat,
                point.lng,
                config.deposito_lat,
                config.deposito_lng,
                config.velocidad_urbana_kmh,
            );
            if vuelta_min > config.vuelta_galpon_min {
                is_excluded[i] = true;
                excluded.push(Exclusion {
                    point_idx: i,
                    motivo: format!(
                        "vuelta_galpon ({vuelta_min:.1} min > {} min)",
                        config.vuelta_galpon_min
                    ),
                    distancia_km: None,
                });
            }
        }

        // Re-index the survivors so point idx == matrix row/column.
        let active_points: Vec<RoutePoint> = all_points
            .iter()
            .enumerate()
            .filter(|(i, _)| !is_excluded[*i])
            .enumerate()
            .map(|(active_idx, (_, point))| {
                let mut point = point.clone();
                point.idx = active_idx;
                point
            })
            .collect();

        if active_points.is_empty() {
            return self
                .persist(
                    &config,
                    vec![],
                    &[],
                    excluded,
                    &all_points,
                    &candidates,
                )
                .await;
        }

        let coords: Vec<Coordinate> = active_points
            .iter()
            .map(|p| Coordinate::new(p.lat, p.lng))
            .collect();
        let provider = self.matrix_providers.get(&config.proveedor_matrix);
        if provider.is_none() {
            warn!(
                "matrix provider '{}' not configured, using haversine estimates",
                config.proveedor_matrix
            );
        }
        let travel_matrix = matrix::matrix_nxn(
            self.store.as_ref(),
            provider.map(|p| p.as_ref() as &dyn MatrixProvider),
            &coords,
            config.dm_block_size,
            config.velocidad_urbana_kmh,
            self.matrix_cache_ttl_secs,
            &run_id,
        )
        .await;

        let optimized = optimizer::optimize(
            &active_points,
            &travel_matrix,
            config.deposito_lat,
            config.deposito_lng,
            config.evitar_saltos_min,
        );

        // Jump exclusions come back as active indices; fold them into the
        // global exclusion list.
        let active_to_global: Vec<usize> = all_points
            .iter()
            .enumerate()
            .filter(|(i, _)| !is_excluded[*i])
            .map(|(i, _)| i)
            .collect();
        for active_idx in &optimized.excluded_idxs {
            excluded.push(Exclusion {
                point_idx: active_to_global[*active_idx],
                motivo: "salto".to_owned(),
                distancia_km: None,
            });
        }

        self.persist(
            &config,
            optimized.ordered,
            &travel_matrix,
            excluded,
            &all_points,
            &candidates,
        )
        .await
    }

    /// Builds the aggregate, writes route + stops transactionally, then
    /// appends exclusion rows one by one (best-effort).
    async fn persist(
        &self,
        config: &RouteConfig,
        ordered: Vec<RoutePoint>,
        travel_matrix: &[Vec<f64>],
        excluded: Vec<Exclusion>,
        all_points: &[RoutePoint],
        candidates: &[Remito],
    ) -> ServiceResult<Ruta> {
        let depot_lat = config.deposito_lat;
        let depot_lng = config.deposito_lng;

        let mut paradas = Vec::with_capacity(ordered.len());
        let mut minutos_acumulados = 0.0_f64;
        let mut total_km = 0.0_f64;

        for (i, point) in ordered.iter().enumerate() {
            let (minutos, km) = if i == 0 {
                (
                    haversine_minutes(
                        depot_lat,
                        depot_lng,
                        point.lat,
                        point.lng,
                        config.velocidad_urbana_kmh,
                    ),
                    haversine_distance(depot_lat, depot_lng, point.lat, point.lng),
                )
            } else {
                let prev = &ordered[i - 1];
                let minutos = travel_matrix
                    .get(prev.idx)
                    .and_then(|row| row.get(point.idx))
                    .copied()
                    .unwrap_or_else(|| {
                        haversine_minutes(
                            prev.lat,
                            prev.lng,
                            point.lat,
                            point.lng,
                            config.velocidad_urbana_kmh,
                        )
                    });
                (
                    minutos,
                    haversine_distance(prev.lat, prev.lng, point.lat, point.lng),
                )
            };

            minutos_acumulados += minutos + config.tiempo_espera_min;
            total_km += km;

            paradas.push(RutaParada {
                id: 0,
                ruta_id: 0,
                remito_id: Some(point.remito_id),
                remito_numero: Some(point.numero.clone()),
                orden: i as i32 + 1,
                lat_snapshot: Some(point.lat),
                lng_snapshot: Some(point.lng),
                cliente_snapshot: Some(point.cliente.clone()),
                direccion_snapshot: Some(point.direccion.clone()),
                observaciones_snapshot: Some(point.observaciones.clone()),
                minutos_desde_anterior: minutos,
                tiempo_espera_min: config.tiempo_espera_min,
                minutos_acumulados,
                distancia_desde_anterior_km: km,
                es_urgente: point.urgente,
                es_prioridad: point.prioridad,
                ventana_tipo: Some(point.ventana_tipo),
                estado: ParadaEstado::Pendiente,
                created_at: None,
                updated_at: None,
            });
        }

        let stop_coords: Vec<(f64, f64)> =
            ordered.iter().map(|p| (p.lat, p.lng)).collect();
        let gmaps_links = links::build_gmaps_links(&stop_coords, depot_lat, depot_lng);

        let ruta_linea = if ordered.is_empty() {
            None
        } else {
            let mut line = Vec::with_capacity(ordered.len() + 2);
            line.push((depot_lng, depot_lat));
            line.extend(ordered.iter().map(|p| (p.lng, p.lat)));
            line.push((depot_lng, depot_lat));
            Some(line)
        };

        let ruta = Ruta {
            id: 0,
            fecha: Utc::now().date_naive(),
            estado: RutaEstado::Generada,
            total_paradas: ordered.len() as i32,
            total_excluidos: excluded.len() as i32,
            duracion_estimada_min: Some(minutos_acumulados.round() as i32),
            distancia_total_km: Some((total_km * 100.0).round() / 100.0),
            gmaps_links,
            ruta_linea,
            config_snapshot: config.snapshot(),
            api_cost_estimate: None,
            deposito_lat: depot_lat,
            deposito_lng: depot_lng,
            created_at: None,
            completed_at: None,
            updated_at: None,
        };

        let saved = self.store.insert_ruta(&ruta, &paradas).await?;

        for exclusion in excluded {
            let point = &all_points[exclusion.point_idx];
            let observaciones = candidates
                .iter()
                .find(|r| r.id == point.remito_id)
                .and_then(|r| r.observaciones.clone());
            let row = RutaExcluido {
                id: 0,
                ruta_id: saved.id,
                remito_id: Some(point.remito_id),
                remito_numero: Some(point.numero.clone()),
                cliente_snapshot: Some(point.cliente.clone()),
                direccion_snapshot: Some(point.direccion.clone()),
                motivo: exclusion.motivo,
                distancia_km: exclusion.distancia_km,
                observaciones_snapshot: observaciones,
                created_at: None,
            };
            if let Err(why) = self.store.insert_excluido(&row).await {
                warn!(
                    "could not persist exclusion for {} ({}): {why}",
                    point.numero, row.motivo
                );
            }
        }

        Ok(saved)
    }
}

fn to_route_points(candidates: &[Remito]) -> Vec<RoutePoint> {
    candidates
        .iter()
        .filter_map(|remito| {
            let coordinate = remito.coordinate()?;
            Some(RoutePoint {
                idx: 0, // re-assigned before the matrix is built
                lat: coordinate.lat,
                lng: coordinate.lng,
                remito_id: remito.id,
                numero: remito.numero.clone(),
                cliente: remito.cliente.clone().unwrap_or_default(),
                direccion: remito
                    .direccion_normalizada
                    .clone()
                    .or_else(|| remito.direccion_raw.clone())
                    .unwrap_or_default(),
                observaciones: remito.observaciones.clone().unwrap_or_default(),
                urgente: remito.es_urgente,
                prioridad: remito.es_prioridad,
                ventana_tipo: remito
                    .ventana_tipo
                    .unwrap_or(model::remito::VentanaTipo::SinHorario),
                ventana_desde_min: remito.ventana_desde_min,
                ventana_hasta_min: remito.ventana_hasta_min,
                llamar_antes: remito.llamar_antes,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use model::remito::{Clasificacion, Lifecycle, VentanaTipo};
    use model::ruta::RutaEstado;

    use super::*;
    use crate::pipeline::tests::MemStore;
    use crate::provider::ProviderError;
    use crate::store::{RemitoRepo as _, RutaRepo as _};

    struct FlatMatrix {
        fail: bool,
        seconds: f64,
    }

    #[async_trait]
    impl MatrixProvider for FlatMatrix {
        fn name(&self) -> &'static str {
            "ors"
        }

        async fn matrix_block(
            &self,
            origins: &[Coordinate],
            destinations: &[Coordinate],
        ) -> Result<Vec<Vec<Option<f64>>>, ProviderError> {
            if self.fail {
                return Err(ProviderError::status(502, "bad gateway"));
            }
            Ok(origins
                .iter()
                .map(|_| destinations.iter().map(|_| Some(self.seconds)).collect())
                .collect())
        }
    }

    async fn armed_remito(
        store: &MemStore,
        numero: &str,
        lat: f64,
        lng: f64,
    ) -> Remito {
        let mut remito = Remito::nuevo(numero, "manual");
        remito.estado_clasificacion = Clasificacion::Enviar;
        remito.estado_lifecycle = Lifecycle::Armado;
        remito.lat = Some(lat);
        remito.lng = Some(lng);
        remito.cliente = Some(format!("Cliente {numero}"));
        remito.direccion_normalizada = Some("CALLE 1, MENDOZA".to_owned());
        store.insert_remito(&remito).await.unwrap()
    }

    fn builder(
        store: Arc<MemStore>,
        provider: Option<FlatMatrix>,
    ) -> RouteBuilder<MemStore> {
        let mut providers: HashMap<String, Arc<dyn MatrixProvider>> = HashMap::new();
        if let Some(p) = provider {
            providers.insert("ors".to_owned(), Arc::new(p));
        }
        RouteBuilder::new(store, providers, 21_600)
    }

    #[tokio::test]
    async fn empty_candidate_set_still_persists_a_route() {
        let store = Arc::new(MemStore::with_carriers());
        let ruta = builder(store.clone(), None).generate(None).await.unwrap();
        assert_eq!(ruta.estado, RutaEstado::Generada);
        assert_eq!(ruta.total_paradas, 0);
        assert_eq!(ruta.total_excluidos, 0);
        assert!(ruta.gmaps_links.is_empty());
        assert!(store.ruta_by_id(ruta.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn stops_get_monotonic_cumulative_minutes() {
        let store = Arc::new(MemStore::with_carriers());
        armed_remito(&store, "R-1", -32.95, -68.84).await;
        armed_remito(&store, "R-2", -32.96, -68.85).await;

        let ruta = builder(
            store.clone(),
            Some(FlatMatrix {
                fail: false,
                seconds: 600.0,
            }),
        )
        .generate(None)
        .await
        .unwrap();

        assert_eq!(ruta.total_paradas, 2);
        let paradas = store.paradas_de_ruta(ruta.id).await.unwrap();
        assert_eq!(paradas.len(), 2);
        assert!(paradas[0].minutos_desde_anterior > 0.0);
        assert_eq!(
            paradas[0].minutos_acumulados,
            paradas[0].minutos_desde_anterior + 10.0
        );
        assert!(paradas[1].minutos_acumulados > paradas[0].minutos_acumulados);
        assert_eq!(paradas[0].orden, 1);
        assert_eq!(paradas[1].orden, 2);
        assert_eq!(paradas[0].estado, ParadaEstado::Pendiente);
        assert_eq!(ruta.gmaps_links.len(), 1);
        assert!(ruta.ruta_linea.as_ref().unwrap().len() == 4);
    }

    #[tokio::test]
    async fn matrix_provider_failure_degrades_to_haversine() {
        let store = Arc::new(MemStore::with_carriers());
        armed_remito(&store, "R-1", -32.95, -68.84).await;
        armed_remito(&store, "R-2", -32.96, -68.85).await;

        let ruta = builder(
            store.clone(),
            Some(FlatMatrix {
                fail: true,
                seconds: 0.0,
            }),
        )
        .generate(None)
        .await
        .unwrap();

        assert_eq!(ruta.total_paradas, 2);
        assert!(ruta.duracion_estimada_min.unwrap() > 0);
        let paradas = store.paradas_de_ruta(ruta.id).await.unwrap();
        assert!(paradas
            .iter()
            .all(|p| p.minutos_desde_anterior.is_finite()));
    }

    #[tokio::test]
    async fn far_candidate_is_excluded_unless_flagged() {
        let store = Arc::new(MemStore::with_carriers());
        armed_remito(&store, "R-CLOSE", -32.93, -68.82).await;
        // San Rafael is well beyond 45 km from the Guaymallén depot.
        armed_remito(&store, "R-FAR", -34.6, -68.33).await;

        let ruta = builder(store.clone(), None).generate(None).await.unwrap();
        // The far point is outside the region bbox too, but distance is
        // what this filter sees.
        assert_eq!(ruta.total_paradas, 1);
        assert_eq!(ruta.total_excluidos, 1);
        let excluidos = store.excluidos_de_ruta(ruta.id).await.unwrap();
        assert_eq!(excluidos.len(), 1);
        assert!(excluidos[0].motivo.starts_with("distancia_maxima"));
        assert_eq!(excluidos[0].remito_numero.as_deref(), Some("R-FAR"));

        // Flagged urgent, the same point rides along. The jump threshold
        // is widened so only the radius filter is under test here.
        let mut far = store.remito_by_numero("R-FAR").await.unwrap().unwrap();
        far.es_urgente = true;
        store.update_remito(&far).await.unwrap();
        let over = RouteConfigOverride {
            evitar_saltos_min: Some(10_000.0),
            ..Default::default()
        };
        let ruta2 = builder(store.clone(), None)
            .generate(Some(over))
            .await
            .unwrap();
        assert_eq!(ruta2.total_paradas, 2);
    }

    #[tokio::test]
    async fn pm_window_outside_operating_hours_is_excluded() {
        let store = Arc::new(MemStore::with_carriers());
        let mut pm = armed_remito(&store, "R-PM", -32.93, -68.82).await;
        pm.ventana_tipo = Some(VentanaTipo::Pm);
        pm.ventana_desde_min = Some(900);
        pm.ventana_hasta_min = Some(1080);
        store.update_remito(&pm).await.unwrap();
        armed_remito(&store, "R-OK", -32.94, -68.83).await;

        // Default operating window is 09:00-14:00.
        let ruta = builder(store.clone(), None).generate(None).await.unwrap();
        assert_eq!(ruta.total_paradas, 1);
        let excluidos = store.excluidos_de_ruta(ruta.id).await.unwrap();
        assert_eq!(excluidos[0].motivo, "ventana_horaria");

        // Disabling the window filter lets it back in.
        let over = RouteConfigOverride {
            utilizar_ventana: Some(false),
            ..Default::default()
        };
        let ruta2 = builder(store.clone(), None)
            .generate(Some(over))
            .await
            .unwrap();
        assert_eq!(ruta2.total_paradas, 2);
    }

    #[tokio::test]
    async fn outlier_jump_is_excluded_with_salto() {
        let store = Arc::new(MemStore::with_carriers());
        // Three near points and one outlier, all within 45 km and within
        // the return-to-depot threshold, provider gives a huge edge to
        // the outlier only.
        armed_remito(&store, "R-1", -32.920, -68.820).await;
        armed_remito(&store, "R-2", -32.925, -68.825).await;
        armed_remito(&store, "R-3", -32.930, -68.830).await;
        let outlier = armed_remito(&store, "R-OUT", -33.000, -68.900).await;

        struct OutlierMatrix {
            outlier_pos: usize,
        }

        #[async_trait]
        impl MatrixProvider for OutlierMatrix {
            fn name(&self) -> &'static str {
                "ors"
            }

            async fn matrix_block(
                &self,
                origins: &[Coordinate],
                destinations: &[Coordinate],
            ) -> Result<Vec<Vec<Option<f64>>>, ProviderError> {
                // 5 min everywhere, 30+ min into the outlier column.
                Ok(origins
                    .iter()
                    .map(|_| {
                        destinations
                            .iter()
                            .enumerate()
                            .map(|(j, _)| {
                                if j == self.outlier_pos {
                                    Some(1860.0)
                                } else {
                                    Some(300.0)
                                }
                            })
                            .collect()
                    })
                    .collect())
            }
        }

        let mut providers: HashMap<String, Arc<dyn MatrixProvider>> = HashMap::new();
        providers.insert(
            "ors".to_owned(),
            Arc::new(OutlierMatrix { outlier_pos: 3 }),
        );
        let ruta = RouteBuilder::new(store.clone(), providers, 21_600)
            .generate(None)
            .await
            .unwrap();

        assert_eq!(ruta.total_paradas, 3);
        let excluidos = store.excluidos_de_ruta(ruta.id).await.unwrap();
        assert_eq!(excluidos.len(), 1);
        assert!(excluidos[0].motivo.starts_with("salto"));
        assert_eq!(excluidos[0].remito_id, Some(outlier.id));
    }

    #[tokio::test]
    async fn failed_exclusion_insert_does_not_abort_the_route() {
        let store = Arc::new(MemStore::with_carriers());
        armed_remito(&store, "R-NEAR", -32.93, -68.82).await;
        armed_remito(&store, "R-FAR", -34.6, -68.33).await;
        *store.fail_excluido_inserts.lock().unwrap() = true;

        let ruta = builder(store.clone(), None).generate(None).await.unwrap();
        assert_eq!(ruta.total_paradas, 1);
        assert_eq!(ruta.total_excluidos, 1);
        assert!(store.excluidos_de_ruta(ruta.id).await.unwrap().is_empty());
    }
}
