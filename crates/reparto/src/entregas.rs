//! Operator-driven lifecycle progression: armado, entregado, archive and
//! restore. The lifecycle only ever moves forward; the one sanctioned
//! exception is the explicit restore from the archive.

use chrono::Utc;
use log::warn;
use model::{
    historico::HistoricoEntregado,
    remito::{Lifecycle, Remito},
    ruta::ParadaEstado,
};

use crate::{
    error::{ServiceError, ServiceResult},
    store::{CarrierRepo, HistoricoRepo, RemitoRepo, RutaRepo},
};

/// Marks an order as physically prepared and route-eligible. Idempotent
/// on an already-armed order; refuses to regress a later state.
pub async fn advance_to_armado<S>(store: &S, numero: &str) -> ServiceResult<Remito>
where
    S: RemitoRepo + Sync + ?Sized,
{
    let numero = numero.trim().to_uppercase();
    for _ in 0..2 {
        let mut remito = store
            .remito_by_numero(&numero)
            .await?
            .ok_or_else(|| ServiceError::not_found("Remito"))?;

        match remito.estado_lifecycle {
            Lifecycle::Armado => return Ok(remito),
            Lifecycle::Ingresado => {}
            later => {
                return Err(ServiceError::InvalidTransition(format!(
                    "remito {numero} ya está {}",
                    later.as_str()
                )))
            }
        }

        remito.estado_lifecycle = Lifecycle::Armado;
        remito.fecha_armado = Some(Utc::now());
        if let Some(saved) = store.update_remito_guarded(&remito).await? {
            return Ok(saved);
        }
    }
    Err(ServiceError::Conflict(format!(
        "escrituras concurrentes sobre el remito {numero}"
    )))
}

/// Marks a batch as delivered: lifecycle forward to `entregado` and the
/// order's still-pending stop, if any, flipped to delivered. Returns how
/// many orders were stamped.
pub async fn mark_entregado<S>(store: &S, ids: &[i32]) -> ServiceResult<usize>
where
    S: RemitoRepo + RutaRepo + Sync + ?Sized,
{
    let now = Utc::now();
    let mut count = 0;

    for &id in ids {
        let Some(mut remito) = store.remito_by_id(id).await? else {
            continue;
        };
        match remito.estado_lifecycle {
            Lifecycle::Entregado => {
                count += 1;
                continue;
            }
            Lifecycle::Historico => continue,
            _ => {}
        }

        remito.estado_lifecycle = Lifecycle::Entregado;
        remito.fecha_entregado = Some(now);
        store.update_remito(&remito).await?;

        match store.parada_pendiente_de_remito(id).await {
            Ok(Some(parada)) => {
                if let Err(why) = store
                    .set_parada_estado(
                        parada.ruta_id,
                        parada.id,
                        ParadaEstado::Entregada,
                    )
                    .await
                {
                    warn!("could not flip stop {} to entregada: {why}", parada.id);
                }
            }
            Ok(None) => {}
            Err(why) => warn!("pending-stop lookup failed for remito {id}: {why}"),
        }

        count += 1;
    }

    Ok(count)
}

/// Moves delivered orders into the archive with a full snapshot.
pub async fn move_to_historico<S>(store: &S, ids: &[i32]) -> ServiceResult<usize>
where
    S: RemitoRepo + CarrierRepo + HistoricoRepo + Sync + ?Sized,
{
    let now = Utc::now();
    let mes_cierre = now.format("%Y-%m").to_string();
    let mut count = 0;

    for &id in ids {
        let Some(mut remito) = store.remito_by_id(id).await? else {
            continue;
        };
        if remito.estado_lifecycle == Lifecycle::Historico {
            continue;
        }

        let carrier_nombre = match remito.carrier_id {
            Some(carrier_id) => store
                .carrier_by_id(carrier_id)
                .await?
                .map(|c| c.nombre_canonico),
            None => None,
        };

        let row = HistoricoEntregado {
            id: 0,
            remito_id: Some(remito.id),
            numero: remito.numero.clone(),
            cliente: remito.cliente.clone(),
            direccion_snapshot: remito
                .direccion_normalizada
                .clone()
                .or_else(|| remito.direccion_raw.clone()),
            localidad: remito.localidad.clone(),
            provincia: remito.provincia.clone(),
            observaciones: remito.observaciones.clone(),
            lat: remito.lat,
            lng: remito.lng,
            carrier_nombre,
            es_urgente: remito.es_urgente,
            es_prioridad: remito.es_prioridad,
            obs_entrega: None,
            estado_al_archivar: Some(remito.estado_lifecycle.as_str().to_owned()),
            fecha_ingreso: remito.fecha_ingreso,
            fecha_armado: remito.fecha_armado,
            fecha_entregado: remito.fecha_entregado.unwrap_or(now),
            fecha_archivado: None,
            mes_cierre: Some(mes_cierre.clone()),
        };
        store.insert_historico(&row).await?;

        remito.estado_lifecycle = Lifecycle::Historico;
        remito.fecha_historico = Some(now);
        store.update_remito(&remito).await?;
        count += 1;
    }

    Ok(count)
}

/// Brings an archived order back into the active set as `ingresado` and
/// deletes the archive row.
pub async fn restore_from_historico<S>(
    store: &S,
    historico_id: i32,
) -> ServiceResult<()>
where
    S: RemitoRepo + HistoricoRepo + Sync + ?Sized,
{
    let row = store
        .historico_by_id(historico_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Histórico"))?;

    if let Some(remito_id) = row.remito_id {
        if let Some(mut remito) = store.remito_by_id(remito_id).await? {
            remito.estado_lifecycle = Lifecycle::Ingresado;
            remito.fecha_entregado = None;
            remito.fecha_historico = None;
            store.update_remito(&remito).await?;
        }
    }

    store.delete_historico(historico_id).await?;
    Ok(())
}
