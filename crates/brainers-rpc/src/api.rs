use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::debug;

use brainers_core::constants::NATIVE_TOKEN;
use brainers_core::error::LedgerError;
use brainers_core::transaction::{Transaction, TxKind};
use brainers_core::types::Address;
use brainers_state::Engine;

use crate::types::{
    BurnRequest, CreateContractRequest, CreateTokenRequest, ExecuteContractRequest, LimitQuery,
    StakeRequest, TokenQuery,
};

type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

fn failure(e: LedgerError) -> (StatusCode, Json<Value>) {
    let status = if e.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        match e {
            LedgerError::StoreFailure(_) | LedgerError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        }
    };
    debug!(error = %e, kind = e.kind(), "request failed");
    (status, Json(json!({ "success": false, "error": e.kind() })))
}

fn not_found(resource: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "error": format!("{resource} not found") })),
    )
}

fn to_json<T: serde::Serialize>(value: &T) -> ApiResult {
    serde_json::to_value(value)
        .map(Json)
        .map_err(|e| failure(LedgerError::Serialization(e.to_string())))
}

fn now_micros() -> i64 {
    chrono::Utc::now().timestamp_micros()
}

pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/balance/:address", get(get_balance))
        .route("/transaction/:hash", get(get_transaction))
        .route("/block/:hash", get(get_block))
        .route("/token/:address", get(get_token))
        .route("/validator/:address", get(get_validator))
        .route("/state", get(get_state))
        .route("/history/:address", get(get_history))
        .route("/fee", get(get_fee))
        .route("/dex/pool/:token", get(get_pool))
        .route("/dex/orderbook/:token", get(get_order_book))
        .route("/dex/chat/:token", get(get_chat))
        .route("/tuv/:id", get(get_vault))
        .route("/transaction", post(post_transaction))
        .route("/stake", post(post_stake))
        .route("/unstake", post(post_unstake))
        .route("/burn", post(post_burn))
        .route("/create_token", post(post_create_token))
        .route("/create_smart_contract", post(post_create_contract))
        .route("/execute_smart_contract", post(post_execute_contract))
        .with_state(engine)
}

// ── Reads ────────────────────────────────────────────────────────────────────

async fn get_balance(
    State(engine): State<Arc<Engine>>,
    Path(address): Path<String>,
    Query(q): Query<TokenQuery>,
) -> ApiResult {
    let address = Address::parse(&address).map_err(failure)?;
    let token = q.token.unwrap_or_else(|| NATIVE_TOKEN.into());
    let balance = engine.balance(&address, &token);
    Ok(Json(json!({ "balance": balance.to_string() })))
}

async fn get_transaction(
    State(engine): State<Arc<Engine>>,
    Path(hash): Path<String>,
) -> ApiResult {
    match engine.transaction(&hash).map_err(failure)? {
        Some((block_hash, tx)) => {
            let mut value = serde_json::to_value(&tx)
                .map_err(|e| failure(LedgerError::Serialization(e.to_string())))?;
            value["block_hash"] = Value::String(block_hash);
            Ok(Json(value))
        }
        None => Err(not_found("transaction")),
    }
}

async fn get_block(State(engine): State<Arc<Engine>>, Path(hash): Path<String>) -> ApiResult {
    match engine.block_by_hash(&hash).map_err(failure)? {
        Some(block) => to_json(&block),
        None => Err(not_found("block")),
    }
}

async fn get_token(State(engine): State<Arc<Engine>>, Path(address): Path<String>) -> ApiResult {
    match engine.token_info(&address) {
        Some(token) => to_json(&token),
        None => Err(not_found("token")),
    }
}

async fn get_validator(
    State(engine): State<Arc<Engine>>,
    Path(address): Path<String>,
) -> ApiResult {
    let address = Address::parse(&address).map_err(failure)?;
    match engine.validator_info(&address) {
        Some(validator) => to_json(&validator),
        None => Err(not_found("validator")),
    }
}

async fn get_state(State(engine): State<Arc<Engine>>) -> ApiResult {
    to_json(&engine.chain_summary())
}

async fn get_history(
    State(engine): State<Arc<Engine>>,
    Path(address): Path<String>,
) -> ApiResult {
    let address = Address::parse(&address).map_err(failure)?;
    let history = engine.history(&address).map_err(failure)?;
    to_json(&history)
}

async fn get_fee(State(engine): State<Arc<Engine>>) -> ApiResult {
    Ok(Json(json!({ "fee": engine.current_fee().to_string() })))
}

async fn get_pool(State(engine): State<Arc<Engine>>, Path(token): Path<String>) -> ApiResult {
    match engine.pool_info(&token) {
        Some(info) => to_json(&info),
        None => Err(not_found("pool")),
    }
}

async fn get_order_book(
    State(engine): State<Arc<Engine>>,
    Path(token): Path<String>,
) -> ApiResult {
    to_json(&engine.order_book(&token))
}

async fn get_chat(
    State(engine): State<Arc<Engine>>,
    Path(token): Path<String>,
    Query(q): Query<LimitQuery>,
) -> ApiResult {
    let limit = q.limit.unwrap_or(100);
    to_json(&engine.chat_tail(&token, limit))
}

async fn get_vault(State(engine): State<Arc<Engine>>, Path(id): Path<String>) -> ApiResult {
    match engine.vault_info(&id, now_micros()) {
        Some(info) => to_json(&info),
        None => Err(not_found("vault")),
    }
}

// ── Writes (pre-signed envelopes) ────────────────────────────────────────────

fn admit(engine: &Engine, tx: Transaction) -> ApiResult {
    let hash = tx.hash.clone();
    engine.admit_transaction(tx, now_micros()).map_err(failure)?;
    Ok(Json(json!({ "success": true, "hash": hash })))
}

async fn post_transaction(
    State(engine): State<Arc<Engine>>,
    Json(tx): Json<Transaction>,
) -> ApiResult {
    admit(&engine, tx)
}

async fn post_stake(
    State(engine): State<Arc<Engine>>,
    Json(req): Json<StakeRequest>,
) -> ApiResult {
    admit(&engine, req.into_transaction(TxKind::Stake))
}

async fn post_unstake(
    State(engine): State<Arc<Engine>>,
    Json(req): Json<StakeRequest>,
) -> ApiResult {
    admit(&engine, req.into_transaction(TxKind::Unstake))
}

async fn post_burn(State(engine): State<Arc<Engine>>, Json(req): Json<BurnRequest>) -> ApiResult {
    admit(&engine, req.into_transaction())
}

async fn post_create_token(
    State(engine): State<Arc<Engine>>,
    Json(req): Json<CreateTokenRequest>,
) -> ApiResult {
    admit(&engine, req.into_transaction())
}

async fn post_create_contract(
    State(engine): State<Arc<Engine>>,
    Json(req): Json<CreateContractRequest>,
) -> ApiResult {
    admit(&engine, req.into_transaction())
}

async fn post_execute_contract(
    State(engine): State<Arc<Engine>>,
    Json(req): Json<ExecuteContractRequest>,
) -> ApiResult {
    admit(&engine, req.into_transaction())
}
