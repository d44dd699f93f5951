//! Demo data seeding.
//!
//! Runs once on the replica that deployed a fresh contract. Every item is an
//! independent write with its own outcome; a failed item is logged and the
//! batch continues.

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::TxHash;

use crate::blockchain::{TransactionPipeline, TxCall};
use crate::contract::{ContractBinding, ADD_STATION, CREATE_RESERVATION};

pub const STATION_NAMES: [&str; 10] = [
    "Posto Central",
    "Posto Express",
    "Posto 24 Horas",
    "Posto Premium",
    "Posto Econômico",
    "Posto VIP",
    "Posto Shell",
    "Posto Ipiranga",
    "Posto BR",
    "Posto Petrobras",
];

pub const CLIENT_NAMES: [&str; 5] = [
    "João Silva",
    "Maria Santos",
    "Pedro Oliveira",
    "Ana Costa",
    "Carlos Souza",
];

pub const CAR_NAMES: [&str; 10] = [
    "Gol", "Uno", "Civic", "Corolla", "HB20", "Onix", "Celta", "Palio", "Sandero", "Cobalt",
];

/// Reservations are created at this many of the first stations.
const RESERVED_STATIONS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedItem {
    Station(String),
    Reservation {
        client: String,
        car: String,
        station: String,
    },
}

impl SeedItem {
    fn call(&self, binding: &ContractBinding) -> Result<TxCall, String> {
        let result = match self {
            SeedItem::Station(name) => {
                binding.transaction(ADD_STATION, &[DynSolValue::String(name.clone())])
            }
            SeedItem::Reservation {
                client,
                car,
                station,
            } => binding.transaction(
                CREATE_RESERVATION,
                &[
                    DynSolValue::String(client.clone()),
                    DynSolValue::String(car.clone()),
                    DynSolValue::String(station.clone()),
                ],
            ),
        };
        result.map_err(|e| e.to_string())
    }
}

impl std::fmt::Display for SeedItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeedItem::Station(name) => write!(f, "station '{}'", name),
            SeedItem::Reservation {
                client, station, ..
            } => write!(f, "reservation for '{}' at '{}'", client, station),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SeedOutcome {
    pub item: SeedItem,
    pub result: Result<TxHash, String>,
}

impl SeedOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Ten stations, then one reservation with a random client and car at each
/// of the first five.
pub fn demo_plan(rng: &mut fastrand::Rng) -> Vec<SeedItem> {
    let mut items: Vec<SeedItem> = STATION_NAMES
        .iter()
        .map(|name| SeedItem::Station(name.to_string()))
        .collect();

    for station in STATION_NAMES.iter().take(RESERVED_STATIONS) {
        items.push(SeedItem::Reservation {
            client: CLIENT_NAMES[rng.usize(..CLIENT_NAMES.len())].to_string(),
            car: CAR_NAMES[rng.usize(..CAR_NAMES.len())].to_string(),
            station: station.to_string(),
        });
    }
    items
}

/// Submit `items` one after another; reservations depend on the stations
/// before them being mined.
pub async fn seed_demo_data(
    pipeline: &TransactionPipeline,
    binding: &ContractBinding,
    items: Vec<SeedItem>,
) -> Vec<SeedOutcome> {
    tracing::info!(items = items.len(), "Seeding demo data");
    let mut outcomes = Vec::with_capacity(items.len());

    for item in items {
        let result = match item.call(binding) {
            Ok(call) => match pipeline.submit(call).await {
                Ok(outcome) if outcome.is_confirmed() => Ok(outcome.tx_hash),
                Ok(outcome) => Err(format!("transaction {} reverted", outcome.tx_hash)),
                Err(e) => Err(e.to_string()),
            },
            Err(e) => Err(e),
        };

        match &result {
            Ok(tx_hash) => tracing::info!(item = %item, tx_hash = %tx_hash, "Seeded"),
            Err(reason) => tracing::error!(item = %item, reason = %reason, "Seeding item failed"),
        }
        outcomes.push(SeedOutcome { item, result });
    }

    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    tracing::info!(succeeded, failed = outcomes.len() - succeeded, "Demo data seeding finished");
    outcomes
}
