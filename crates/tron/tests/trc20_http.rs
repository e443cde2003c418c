use alloy::primitives::U256;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tron::{FeePolicy, TronAddress, TronHttp, TronWallet, Trc20Token};
use wiremock::{Mock, MockServer, ResponseTemplate, matchers};

const USDT: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";

fn owner() -> TronAddress {
    let mut pk = [0u8; 32];
    pk[31] = 1;
    TronWallet::new(pk).unwrap().address()
}

fn client(server: &MockServer) -> TronHttp {
    TronHttp::new(&server.uri(), Some("test-key"), Duration::from_secs(5)).unwrap()
}

fn node_tx(raw_data_hex: &str, fee_limit: u64) -> serde_json::Value {
    let txid = Sha256::digest(hex::decode(raw_data_hex).unwrap());
    json!({
        "txID": hex::encode(txid),
        "raw_data": {"fee_limit": fee_limit, "expiration": 1_700_000_060_000u64},
        "raw_data_hex": raw_data_hex,
        "visible": true
    })
}

#[tokio::test]
async fn balance_of_decodes_constant_result() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/wallet/triggerconstantcontract"))
        .and(matchers::header("TRON-PRO-API-KEY", "test-key"))
        .and(matchers::body_partial_json(json!({
            "function_selector": "balanceOf(address)",
            "contract_address": USDT,
            "visible": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {"result": true},
            "energy_used": 935,
            "constant_result": [format!("{:064x}", 12_345_678u64)]
        })))
        .mount(&server)
        .await;

    let token = Trc20Token::new(USDT.parse().unwrap());
    let balance = token.balance_of(&client(&server), owner()).await.unwrap();
    assert_eq!(balance, U256::from(12_345_678u64));
}

#[tokio::test]
async fn allowance_with_empty_result_is_zero() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/wallet/triggerconstantcontract"))
        .and(matchers::body_partial_json(json!({
            "function_selector": "allowance(address,address)"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {"result": true},
            "constant_result": []
        })))
        .mount(&server)
        .await;

    let token = Trc20Token::new(USDT.parse().unwrap());
    let allowance = token
        .allowance(&client(&server), owner(), USDT.parse().unwrap())
        .await
        .unwrap();
    assert_eq!(allowance, U256::ZERO);
}

#[tokio::test]
async fn constant_call_failure_surfaces_decoded_message() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/wallet/triggerconstantcontract"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {
                "code": "CONTRACT_VALIDATE_ERROR",
                "message": hex::encode("Contract validate error : No contract or not a smart contract")
            }
        })))
        .mount(&server)
        .await;

    let token = Trc20Token::new(USDT.parse().unwrap());
    let err = token
        .balance_of(&client(&server), owner())
        .await
        .unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("No contract or not a smart contract"), "{msg}");
}

#[tokio::test]
async fn build_approve_quotes_fee_limit_from_chain_parameters() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/wallet/getchainparameters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "chainParameter": [
                {"key": "getTransactionFee", "value": 1000},
                {"key": "getEnergyFee", "value": 100}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/wallet/triggerconstantcontract"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {"result": true},
            "energy_used": 14_000,
            "constant_result": [format!("{:064x}", 1u64)]
        })))
        .mount(&server)
        .await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/wallet/triggersmartcontract"))
        .and(matchers::body_partial_json(json!({
            "function_selector": "approve(address,uint256)"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {"result": true},
            "transaction": node_tx("0a0203e8", 1_535_000)
        })))
        .mount(&server)
        .await;

    let policy = FeePolicy {
        fee_limit_cap_sun: 100_000_000,
        fee_limit_headroom_ppm: 0,
    };
    let token = Trc20Token::new(USDT.parse().unwrap());
    let prepared = token
        .build_approve(
            &client(&server),
            owner(),
            USDT.parse().unwrap(),
            U256::from(5_000_000u64),
            policy,
        )
        .await
        .unwrap();

    // 14_000 energy * 100 sun + (4 raw + 131 signature/ret) bytes * 1000 sun.
    assert_eq!(prepared.energy_required, 14_000);
    assert_eq!(prepared.tx_size_bytes, 135);
    assert_eq!(prepared.fee_limit_sun, 1_535_000);
    assert!(!prepared.tx.is_signed());
}

#[tokio::test]
async fn broadcast_rejection_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/wallet/broadcasttransaction"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": false,
            "code": "SIGERROR",
            "message": hex::encode("validate signature error")
        })))
        .mount(&server)
        .await;

    let mut pk = [0u8; 32];
    pk[31] = 1;
    let wallet = TronWallet::new(pk).unwrap();
    let tx: tron::Transaction = serde_json::from_value(node_tx("0a0203e8", 1)).unwrap();
    let err = wallet
        .sign_and_broadcast(&client(&server), tx)
        .await
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("SIGERROR"), "{msg}");
    assert!(msg.contains("validate signature error"), "{msg}");
}

#[tokio::test]
async fn transaction_info_is_none_until_mined() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/wallet/gettransactioninfobyid"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let info = client(&server)
        .get_transaction_info_by_id([1u8; 32])
        .await
        .unwrap();
    assert!(info.is_none());
}
