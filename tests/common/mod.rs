//! Mock SPARK services for pipeline tests
//!
//! A single [`MockServer`] plays all four collaborators:
//! - round API under `/rounds/...`
//! - Lotus JSON-RPC at `/rpc`
//! - IPNI under `/ipni/multihash/...`
//! - the provider's HTTP gateway under `/ipfs/...`

#![allow(dead_code)]

use spark_spot_check::Config;
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Raw-leaf CIDv1 served by the provider
pub const CID_SERVED: &str = "bafkreih25dih6ug3xtj73vswccw423b56ilrwmnos4cbwhrceudopdp5sq";
/// Base58 multihash of [`CID_SERVED`]
pub const MULTIHASH_SERVED: &str = "QmfE6Y4CkCxXXN8yW94r2JVA7ajQ9KayAKmd5mwjTsCfjZ";
/// DAG-PB CIDv1 only advertised by some other peer
pub const CID_ELSEWHERE: &str = "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi";
/// Base58 multihash of [`CID_ELSEWHERE`]
pub const MULTIHASH_ELSEWHERE: &str = "QmbWqxBEKC3P8tqsKc98xmWNzrzDtRLMiMPL8wBuTGsMnR";

pub const PEER_ID: &str = "12D3KooWC8gXxg9LoJ9h3hy3jzBkEAxamyHEQJKtRmAuBuvoMzpr";
pub const OTHER_PEER_ID: &str = "12D3KooWHKeaNCnYByQUMS2n5PAZ1KZ9xKXqsb4bhpxVJ6bBJg5V";

pub const CAR_BYTES: &[u8] = b"hello";
/// `1220` + sha256("hello")
pub const CAR_CHECKSUM: &str =
    "12202cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

pub fn http_multiaddr(server: &MockServer) -> String {
    let addr = server.address();
    format!("/ip4/{}/tcp/{}/http", addr.ip(), addr.port())
}

pub fn task(cid: &str, miner_id: &str) -> serde_json::Value {
    serde_json::json!({"cid": cid, "minerId": miner_id, "clients": ["f0100"]})
}

pub async fn mount_round(server: &MockServer, round_path: &str, tasks: Vec<serde_json::Value>) {
    Mock::given(method("GET"))
        .and(path(round_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "roundId": "18000",
            "startEpoch": "4200000",
            "maxTasksPerNode": 15,
            "retrievalTasks": tasks,
        })))
        .mount(server)
        .await;
}

pub async fn mount_miner(server: &MockServer, miner_id: &str, peer_id: &str) {
    Mock::given(method("POST"))
        .and(path("/rpc"))
        .and(body_partial_json(serde_json::json!({
            "method": "Filecoin.StateMinerInfo",
            "params": [miner_id, null],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {"PeerId": peer_id, "Multiaddrs": null},
        })))
        .mount(server)
        .await;
}

pub async fn mount_advertisement(server: &MockServer, multihash: &str, peer_id: &str, addr: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/ipni/multihash/{multihash}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "MultihashResults": [{
                "Multihash": multihash,
                "ProviderResults": [{
                    "ContextID": "Y29udGV4dA==",
                    "Metadata": "oBIA",
                    "Provider": {"ID": peer_id, "Addrs": [addr]},
                }],
            }],
        })))
        .mount(server)
        .await;
}

pub async fn mount_car(server: &MockServer, cid: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/ipfs/{cid}")))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/vnd.ipld.car")
                .set_body_bytes(CAR_BYTES.to_vec()),
        )
        .mount(server)
        .await;
}

/// Gateway that answers only after `delay`.
pub async fn mount_slow_car(server: &MockServer, cid: &str, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(format!("/ipfs/{cid}")))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/vnd.ipld.car")
                .set_body_bytes(CAR_BYTES.to_vec())
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

/// Configuration pointing every endpoint at `server`, with fast timeouts and retries.
pub fn test_config(server: &MockServer, output: &Path) -> Config {
    let mut config = Config {
        output: output.to_path_buf(),
        ..Default::default()
    };
    config.endpoints.round_api = server.uri();
    config.endpoints.rpc_url = format!("{}/rpc", server.uri());
    config.endpoints.ipni_url = format!("{}/ipni", server.uri());
    config.check.seed = Some(1);
    config.check.max_concurrent_checks = 4;
    config.timeouts.fetch = Duration::from_secs(5);
    config.timeouts.inactivity = Duration::from_secs(5);
    config.retry.max_attempts = 1;
    config.retry.initial_delay = Duration::from_millis(10);
    config.retry.jitter = false;
    config
}
