//! Shared utilities for integration tests.
//!
//! `MockChain` stands in for a node: it decodes signed raw transactions,
//! tracks the deployer's nonces, "executes" the ledger methods against
//! in-memory lists and answers `eth_call` with ABI-encoded results.
#![allow(dead_code)]

use alloy::consensus::{Transaction as _, TxEnvelope};
use alloy::dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt};
use alloy::eips::eip2718::Decodable2718;
use alloy::json_abi::{Function, JsonAbi};
use alloy::primitives::{Address, Bytes, TxHash, TxKind, U256};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

use station_ledger::blockchain::types::{BlockchainResult, ReceiptSummary};
use station_ledger::blockchain::{BlockchainError, ChainClient, ChainId, Wallet};
use station_ledger::config::AppConfig;
use station_ledger::contract::ContractArtifact;
use station_ledger::lifecycle::{Application, Shutdown};
use station_ledger::HttpServer;

/// Hardhat's first default account.
pub const DEPLOYER_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const CHAIN_ID: u64 = 31337;

/// Block timestamp the mock stamps on every record (2023-11-14 22:13:20 UTC).
pub const BLOCK_TIMESTAMP: u64 = 1_700_000_000;

pub fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/PostosAbastecimento.json")
}

pub fn artifact() -> ContractArtifact {
    ContractArtifact::load(fixture_path()).unwrap()
}

pub fn wallet() -> Wallet {
    Wallet::from_private_key(DEPLOYER_KEY, CHAIN_ID).unwrap()
}

/// Defaults tightened for tests.
pub fn test_config(deployer: bool) -> AppConfig {
    let mut config = AppConfig::default();
    config.blockchain.chain_id = CHAIN_ID;
    config.blockchain.receipt_poll_interval_ms = 5;
    config.blockchain.confirmation_timeout_secs = 2;
    config.blockchain.node_ready_attempts = 1;
    config.timeouts.request_secs = 10;
    config.coordination.deployer = deployer;
    config.coordination.poll_interval_ms = 10;
    config.coordination.max_wait_secs = 5;
    config
}

/// One transaction as the mock node accepted it.
#[derive(Debug, Clone)]
pub struct Submitted {
    pub nonce: u64,
    pub kind: TxKind,
    pub tx_hash: TxHash,
}

#[derive(Default)]
struct ChainState {
    base_nonce: u64,
    used_nonces: BTreeSet<u64>,
    submitted: Vec<Submitted>,
    receipts: HashMap<TxHash, ReceiptSummary>,
    code: HashMap<Address, Bytes>,
    block: u64,
    stations: Vec<(String, bool)>,
    reservations: Vec<(String, String, String)>,
}

impl ChainState {
    /// Lowest nonce not yet used, like a node's pending count.
    fn pending_count(&self) -> u64 {
        let mut next = self.base_nonce;
        while self.used_nonces.contains(&next) {
            next += 1;
        }
        next
    }
}

pub struct MockChain {
    deployer: Address,
    abi: JsonAbi,
    state: Mutex<ChainState>,
    /// Every RPC fails as if the node were down.
    pub offline: AtomicBool,
    /// The next state-changing call is mined with a failed status.
    pub revert_next: AtomicBool,
    /// Submissions wait a random few milliseconds to shuffle arrival order.
    pub jitter: AtomicBool,
    /// Submissions wait this long before reaching the node.
    pub send_delay_ms: AtomicU64,
    /// The next submission is lost on the wire: an error, and the node never sees it.
    pub lose_next: AtomicBool,
    /// Only the next expected nonce is accepted, like an automining dev node.
    pub strict: AtomicBool,
}

impl MockChain {
    pub fn new(base_nonce: u64) -> Arc<Self> {
        Arc::new(Self {
            deployer: wallet().address(),
            abi: artifact().abi,
            state: Mutex::new(ChainState {
                base_nonce,
                block: 1,
                ..ChainState::default()
            }),
            offline: AtomicBool::new(false),
            revert_next: AtomicBool::new(false),
            jitter: AtomicBool::new(false),
            send_delay_ms: AtomicU64::new(0),
            lose_next: AtomicBool::new(false),
            strict: AtomicBool::new(false),
        })
    }

    pub fn submitted(&self) -> Vec<Submitted> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn deployments(&self) -> usize {
        self.submitted()
            .iter()
            .filter(|s| s.kind == TxKind::Create)
            .count()
    }

    pub fn station_names(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.stations.iter().map(|(name, _)| name.clone()).collect()
    }

    fn function(&self, name: &str) -> &Function {
        &self.abi.function(name).unwrap()[0]
    }

    fn check_online(&self) -> BlockchainResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BlockchainError::Unavailable("connection refused".into()));
        }
        Ok(())
    }

    /// Apply a ledger call; returns false if the call reverts.
    fn execute(&self, state: &mut ChainState, input: &[u8]) -> bool {
        if input.len() < 4 {
            return false;
        }
        let (selector, args) = input.split_at(4);

        let add = self.function("adicionarPosto");
        let reserve = self.function("criarReserva");

        if selector == add.selector().as_slice() {
            let values = add.abi_decode_input(args).unwrap();
            let name = values[0].as_str().unwrap().to_string();
            state.stations.push((name, false));
            true
        } else if selector == reserve.selector().as_slice() {
            let values = reserve.abi_decode_input(args).unwrap();
            let text = |i: usize| values[i].as_str().unwrap().to_string();
            let station = text(2);
            match state.stations.iter_mut().find(|(name, _)| *name == station) {
                Some(entry) => {
                    entry.1 = true;
                    state.reservations.push((text(0), text(1), station));
                    true
                }
                None => false,
            }
        } else {
            false
        }
    }

    fn encode_list(&self, state: &ChainState, input: &[u8]) -> BlockchainResult<Bytes> {
        let timestamp = DynSolValue::Uint(U256::from(BLOCK_TIMESTAMP), 256);

        for name in ["listarPostos", "listarReservas", "listarPagamentos"] {
            let function = self.function(name);
            if input != function.selector().as_slice() {
                continue;
            }
            let items = match name {
                "listarPostos" => state
                    .stations
                    .iter()
                    .map(|(nome, ocupado)| {
                        DynSolValue::Tuple(vec![
                            DynSolValue::String(nome.clone()),
                            timestamp.clone(),
                            DynSolValue::Bool(*ocupado),
                        ])
                    })
                    .collect(),
                "listarReservas" => state
                    .reservations
                    .iter()
                    .map(|(client, car, station)| {
                        DynSolValue::Tuple(vec![
                            DynSolValue::String(client.clone()),
                            DynSolValue::String(car.clone()),
                            DynSolValue::String(station.clone()),
                            timestamp.clone(),
                        ])
                    })
                    .collect(),
                _ => Vec::new(),
            };
            let encoded = function
                .abi_encode_output(&[DynSolValue::Array(items)])
                .unwrap();
            return Ok(encoded.into());
        }

        Err(BlockchainError::Unavailable("execution reverted".into()))
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn transaction_count(&self, address: Address) -> BlockchainResult<u64> {
        self.check_online()?;
        assert_eq!(address, self.deployer);
        Ok(self.state.lock().unwrap().pending_count())
    }

    async fn gas_price(&self) -> BlockchainResult<u128> {
        self.check_online()?;
        Ok(1_000_000_000)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> BlockchainResult<TxHash> {
        self.check_online()?;
        if self.jitter.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(fastrand::u64(0..8))).await;
        }
        let delay = self.send_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.lose_next.swap(false, Ordering::SeqCst) {
            return Err(BlockchainError::Unavailable("connection reset by peer".into()));
        }

        let envelope = TxEnvelope::decode_2718(&mut raw.as_ref())
            .map_err(|e| BlockchainError::Rejected(format!("malformed transaction: {e}")))?;
        let nonce = envelope.nonce();
        let tx_hash = *envelope.tx_hash();

        let mut state = self.state.lock().unwrap();
        let expected = state.pending_count();
        if self.strict.load(Ordering::SeqCst) && nonce > expected {
            return Err(BlockchainError::Rejected(format!(
                "Nonce too high. Expected nonce to be {expected} but got {nonce}"
            )));
        }
        if nonce < state.base_nonce || !state.used_nonces.insert(nonce) {
            return Err(BlockchainError::Rejected(format!("nonce too low: {nonce}")));
        }

        state.block += 1;
        let block_number = state.block;
        let reverted = self.revert_next.swap(false, Ordering::SeqCst);

        let (success, contract_address) = match envelope.kind() {
            TxKind::Create => {
                let address = self.deployer.create(nonce);
                state.code.insert(address, Bytes::from_static(&[0x60, 0x80]));
                (!reverted, Some(address))
            }
            TxKind::Call(_) => {
                let input = envelope.input().clone();
                let success = !reverted && self.execute(&mut state, &input);
                (success, None)
            }
        };

        state.submitted.push(Submitted {
            nonce,
            kind: envelope.kind(),
            tx_hash,
        });
        state.receipts.insert(
            tx_hash,
            ReceiptSummary {
                tx_hash,
                success,
                block_number: Some(block_number),
                contract_address,
            },
        );
        Ok(tx_hash)
    }

    async fn transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> BlockchainResult<Option<ReceiptSummary>> {
        self.check_online()?;
        Ok(self.state.lock().unwrap().receipts.get(&tx_hash).cloned())
    }

    async fn block_number(&self) -> BlockchainResult<u64> {
        self.check_online()?;
        Ok(self.state.lock().unwrap().block)
    }

    async fn chain_id(&self) -> BlockchainResult<ChainId> {
        self.check_online()?;
        Ok(ChainId(CHAIN_ID))
    }

    async fn call(&self, to: Address, data: Bytes) -> BlockchainResult<Bytes> {
        self.check_online()?;
        let state = self.state.lock().unwrap();
        if !state.code.contains_key(&to) {
            return Ok(Bytes::new());
        }
        self.encode_list(&state, &data)
    }

    async fn balance(&self, _address: Address) -> BlockchainResult<U256> {
        self.check_online()?;
        Ok(U256::from(10_000u64) * U256::from(10u64).pow(U256::from(18u64)))
    }

    async fn code_at(&self, address: Address) -> BlockchainResult<Bytes> {
        self.check_online()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .code
            .get(&address)
            .cloned()
            .unwrap_or_default())
    }
}

/// Serve `app` on an ephemeral port.
pub async fn start_server(config: &AppConfig, app: Application) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, app.state);
    let receiver = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, receiver).await;
    });

    (addr, shutdown)
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
