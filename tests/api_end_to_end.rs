//! End-to-end HTTP tests against an ephemeral-port server on a mock chain.

use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use station_ledger::coordination::MemoryAddressStore;
use station_ledger::lifecycle::{prepare, spawn_seeding, Application};
use station_ledger::seeding::{demo_plan, seed_demo_data, SeedItem};

mod common;

async fn deployed_app(chain: Arc<common::MockChain>) -> Application {
    prepare(
        &common::test_config(true),
        common::wallet(),
        chain,
        Arc::new(MemoryAddressStore::new()),
        common::artifact(),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_add_and_list_station() {
    let chain = common::MockChain::new(0);
    let config = common::test_config(true);
    let (addr, shutdown) = common::start_server(&config, deployed_app(chain.clone()).await).await;
    let client = common::http_client();

    let res = client
        .post(format!("http://{}/postos", addr))
        .json(&json!({ "nome": "Posto Central" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Posto adicionado com sucesso");
    let hash = body["transaction_hash"].as_str().unwrap();
    assert!(hash.starts_with("0x") && hash.len() == 66);

    let stations: Value = client
        .get(format!("http://{}/postos", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        stations,
        json!([{ "nome": "Posto Central", "dataCadastro": "14/11/2023", "ocupado": false }])
    );

    shutdown.trigger();
}

#[tokio::test]
async fn test_reservation_flow() {
    let chain = common::MockChain::new(0);
    let config = common::test_config(true);
    let (addr, shutdown) = common::start_server(&config, deployed_app(chain.clone()).await).await;
    let client = common::http_client();

    client
        .post(format!("http://{}/postos", addr))
        .json(&json!({ "nome": "Posto BR" }))
        .send()
        .await
        .unwrap();

    let res = client
        .post(format!("http://{}/reservas", addr))
        .json(&json!({ "nomeCliente": "Ana Costa", "nomeCarro": "Gol", "nomePosto": "Posto BR" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Reserva criada com sucesso");

    let reservations: Value = client
        .get(format!("http://{}/reservas", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        reservations,
        json!([{
            "nomeCliente": "Ana Costa",
            "nomeCarro": "Gol",
            "nomePosto": "Posto BR",
            "dataReserva": "14/11/2023",
            "horaReserva": "19:13:20"
        }])
    );

    let payments: Value = client
        .get(format!("http://{}/pagamentos", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(payments, json!([]));

    shutdown.trigger();
}

#[tokio::test]
async fn test_write_failures_are_500_with_kind() {
    let chain = common::MockChain::new(0);
    let config = common::test_config(true);
    let (addr, shutdown) = common::start_server(&config, deployed_app(chain.clone()).await).await;
    let client = common::http_client();

    // Reservation at an unknown station reverts on chain.
    let res = client
        .post(format!("http://{}/reservas", addr))
        .json(&json!({ "nomeCliente": "Ana Costa", "nomeCarro": "Gol", "nomePosto": "Nowhere" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 500);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["kind"], "Reverted");
    assert!(body["transaction_hash"].is_string());

    chain.offline.store(true, Ordering::SeqCst);
    let res = client
        .post(format!("http://{}/postos", addr))
        .json(&json!({ "nome": "Posto VIP" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 500);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["kind"], "ChainUnavailable");

    // Reads fail independently and do not take the server down.
    let res = client.get(format!("http://{}/postos", addr)).send().await.unwrap();
    assert_eq!(res.status(), 500);

    shutdown.trigger();
}

#[tokio::test]
async fn test_validation_rejects_bad_names() {
    let chain = common::MockChain::new(0);
    let config = common::test_config(true);
    let (addr, shutdown) = common::start_server(&config, deployed_app(chain.clone()).await).await;
    let client = common::http_client();

    let res = client
        .post(format!("http://{}/postos", addr))
        .json(&json!({ "nome": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 422);

    let res = client
        .post(format!("http://{}/postos", addr))
        .json(&json!({ "nome": "x".repeat(101) }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 422);

    let res = client
        .post(format!("http://{}/reservas", addr))
        .json(&json!({ "nomeCliente": "Ana Costa" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 422);

    // Nothing reached the chain apart from the deployment.
    assert_eq!(chain.submitted().len(), 1);
    shutdown.trigger();
}

#[tokio::test]
async fn test_health() {
    let chain = common::MockChain::new(0);
    let config = common::test_config(true);
    let (addr, shutdown) = common::start_server(&config, deployed_app(chain.clone()).await).await;
    let client = common::http_client();

    let health: Value = client
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["blockchain_connected"], true);
    assert_eq!(health["contract_deployed"], true);
    assert!(health["block_number"].is_u64());

    chain.offline.store(true, Ordering::SeqCst);
    let res = client.get(format!("http://{}/health", addr)).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let health: Value = res.json().await.unwrap();
    assert_eq!(health["blockchain_connected"], false);
    assert_eq!(health["contract_deployed"], false);
    assert!(health["block_number"].is_null());

    shutdown.trigger();
}

#[tokio::test]
async fn test_seeding_runs_only_after_own_deployment() {
    let chain = common::MockChain::new(0);
    let mut config = common::test_config(true);
    config.seeding.enabled = true;

    let app = prepare(
        &config,
        common::wallet(),
        chain.clone(),
        Arc::new(MemoryAddressStore::new()),
        common::artifact(),
    )
    .await
    .unwrap();

    let outcomes = spawn_seeding(&config, &app).unwrap().await.unwrap();
    assert_eq!(outcomes.len(), 15);
    assert!(outcomes.iter().all(|o| o.is_success()));
    assert_eq!(chain.station_names().len(), 10);
    assert_eq!(chain.station_names()[0], "Posto Central");

    // A replica that found the address already stored never seeds.
    let existing = Arc::new(MemoryAddressStore::with_address(app.deployment.address));
    let follower = prepare(&config, common::wallet(), chain, existing, common::artifact())
        .await
        .unwrap();
    assert!(spawn_seeding(&config, &follower).is_none());
}

#[tokio::test]
async fn test_seeding_failure_does_not_abort_batch() {
    let chain = common::MockChain::new(0);
    let app = deployed_app(chain.clone()).await;

    // "Posto Express" is never created, so its reservation reverts.
    let mut items = demo_plan(&mut fastrand::Rng::with_seed(7));
    items[1] = SeedItem::Station("Posto Novo".to_string());
    let failing = items
        .iter()
        .position(|item| {
            matches!(item, SeedItem::Reservation { station, .. } if station == "Posto Express")
        })
        .unwrap();

    let outcomes = seed_demo_data(&app.state.pipeline, &app.state.binding, items).await;
    assert_eq!(outcomes.len(), 15);

    for (index, outcome) in outcomes.iter().enumerate() {
        if index == failing {
            let reason = outcome.result.as_ref().unwrap_err();
            assert!(reason.contains("reverted"), "unexpected reason: {reason}");
        } else {
            assert!(outcome.is_success(), "item {index} ({}) failed", outcome.item);
        }
    }
    assert!(outcomes[failing + 1..].iter().all(|o| o.is_success()));
    assert_eq!(chain.station_names().len(), 10);
}
