//! Route handlers.
//!
//! Writes go through the transaction pipeline and block until the receipt
//! is observed or the confirmation window closes. Reads go straight to the
//! query layer.

use alloy::dyn_abi::DynSolValue;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::contract::{ADD_STATION, CREATE_RESERVATION};
use crate::http::response::{ApiError, WriteReceipt};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::queries::{PaymentRecord, ReservationRecord, StationRecord};

const MAX_NAME_CHARS: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStation {
    pub nome: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReservation {
    pub nome_cliente: String,
    pub nome_carro: String,
    pub nome_posto: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub blockchain_connected: bool,
    pub contract_deployed: bool,
    pub block_number: Option<u64>,
}

fn check_name(field: &str, value: &str) -> Result<(), ApiError> {
    let chars = value.chars().count();
    if chars == 0 || chars > MAX_NAME_CHARS {
        return Err(ApiError::Validation(format!(
            "{field} must be between 1 and {MAX_NAME_CHARS} characters, got {chars}"
        )));
    }
    Ok(())
}

/// Submit a contract write and wait for its outcome.
async fn write(
    state: &AppState,
    method: &str,
    args: &[DynSolValue],
    message: &str,
) -> Result<Json<WriteReceipt>, ApiError> {
    let call = state.binding.transaction(method, args)?;
    let outcome = state.pipeline.submit(call).await?;

    if !outcome.is_confirmed() {
        return Err(ApiError::Reverted(outcome.tx_hash));
    }
    Ok(Json(WriteReceipt::new(message, outcome.tx_hash)))
}

pub async fn add_station(
    State(state): State<AppState>,
    body: Result<Json<NewStation>, JsonRejection>,
) -> Result<Json<WriteReceipt>, ApiError> {
    let Json(station) = body?;
    check_name("nome", &station.nome)?;

    tracing::info!(nome = %station.nome, "Adding station");
    write(
        &state,
        ADD_STATION,
        &[DynSolValue::String(station.nome)],
        "Posto adicionado com sucesso",
    )
    .await
}

pub async fn list_stations(
    State(state): State<AppState>,
) -> Result<Json<Vec<StationRecord>>, ApiError> {
    Ok(Json(state.queries.list_stations().await?))
}

pub async fn create_reservation(
    State(state): State<AppState>,
    body: Result<Json<NewReservation>, JsonRejection>,
) -> Result<Json<WriteReceipt>, ApiError> {
    let Json(reservation) = body?;
    check_name("nomeCliente", &reservation.nome_cliente)?;
    check_name("nomeCarro", &reservation.nome_carro)?;
    check_name("nomePosto", &reservation.nome_posto)?;

    tracing::info!(posto = %reservation.nome_posto, "Creating reservation");
    write(
        &state,
        CREATE_RESERVATION,
        &[
            DynSolValue::String(reservation.nome_cliente),
            DynSolValue::String(reservation.nome_carro),
            DynSolValue::String(reservation.nome_posto),
        ],
        "Reserva criada com sucesso",
    )
    .await
}

pub async fn list_reservations(
    State(state): State<AppState>,
) -> Result<Json<Vec<ReservationRecord>>, ApiError> {
    Ok(Json(state.queries.list_reservations().await?))
}

pub async fn list_payments(
    State(state): State<AppState>,
) -> Result<Json<Vec<PaymentRecord>>, ApiError> {
    Ok(Json(state.queries.list_payments().await?))
}

/// Liveness plus a probe of the node and of the contract code.
pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    let block_number = state.chain.block_number().await.ok();
    let connected = block_number.is_some();
    metrics::record_chain_health(connected);

    let contract_deployed = connected
        && state
            .chain
            .code_at(state.binding.address())
            .await
            .map(|code| !code.is_empty())
            .unwrap_or(false);

    Json(HealthStatus {
        status: "healthy".to_string(),
        blockchain_connected: connected,
        contract_deployed,
        block_number,
    })
}
