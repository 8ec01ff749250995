//! REST routes.
//!
//! Every handler moves its bank call onto the blocking pool with a fresh
//! [`Context`], so each request runs its units of work on its own
//! connection without blocking the async runtime.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use teller_bank::{
    Account, AccountService, Context, Executor, LedgerService, PaymentOrder, PaymentOrderService,
    PaymentOrderState, StatementLine, Transactor,
};
use tower_http::trace::TraceLayer;

use crate::errors::ApiError;
use crate::health::{self, HealthResponse};

/// Shared state accessible from handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Account service.
    pub accounts: AccountService,
    /// Payment order service.
    pub orders: PaymentOrderService,
    /// Ledger service.
    pub ledger: LedgerService,
    /// Transactor, reported by `/health`.
    pub transactor: Arc<Transactor>,
    /// When the state was built.
    pub start_time: Instant,
}

impl AppState {
    /// Wire the services over `executor`.
    pub fn new(executor: &Arc<Executor>, transactor: Arc<Transactor>) -> Self {
        Self {
            accounts: AccountService::new(Arc::clone(executor)),
            orders: PaymentOrderService::new(Arc::clone(executor)),
            ledger: LedgerService::new(Arc::clone(executor)),
            transactor,
            start_time: Instant::now(),
        }
    }
}

/// `POST /api/accounts` body.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    /// Account holder name.
    pub name: String,
}

/// `POST /api/payment-orders` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    /// Paying personal account.
    pub from_account_id: i64,
    /// Receiving personal account.
    pub to_account_id: i64,
    /// Amount in minor units.
    pub amount: i64,
}

/// Top-up and withdrawal body.
#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    /// Amount in minor units.
    pub amount: i64,
}

/// Reply to any request that creates a payment order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOrderCreated {
    /// Id to poll with `GET /api/payment-orders/{id}/state`.
    pub payment_order_id: i64,
}

/// `GET /api/payment-orders/{id}/state` reply.
#[derive(Debug, Serialize)]
pub struct PaymentOrderStateResponse {
    /// Current state.
    pub state: PaymentOrderState,
}

/// `GET /api/accounts/{id}/calculated-balance` reply.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    /// Account name.
    pub account_name: String,
    /// Balance recomputed from the ledger.
    pub balance: i64,
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/accounts", get(list_accounts).post(create_account))
        .route("/accounts/{id}", get(get_account))
        .route("/accounts/{id}/transactions", get(account_transactions))
        .route("/accounts/{id}/calculated-balance", get(calculated_balance))
        .route("/accounts/{id}/payment-orders", get(account_payment_orders))
        .route("/accounts/{id}/top-up", post(top_up))
        .route("/accounts/{id}/withdrawal", post(withdrawal))
        .route("/payment-orders", post(receive_payment))
        .route("/payment-orders/{id}/state", get(payment_order_state));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run one bank call on the blocking pool with its own execution context.
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Context) -> teller_bank::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || work(&Context::new()))
        .await
        .map_err(|e| ApiError::Worker(e.to_string()))?
        .map_err(ApiError::from)
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(state.start_time, state.transactor.is_running()))
}

/// GET /api/accounts
async fn list_accounts(State(state): State<AppState>) -> Result<Json<Vec<Account>>, ApiError> {
    blocking(move |ctx| state.accounts.list_accounts(ctx)).await.map(Json)
}

/// POST /api/accounts
async fn create_account(
    State(state): State<AppState>,
    Json(req): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    let account = blocking(move |ctx| state.accounts.create_personal_account(ctx, &req.name)).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// GET /api/accounts/{id}
async fn get_account(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Account>, ApiError> {
    blocking(move |ctx| state.accounts.find_account(ctx, id)).await.map(Json)
}

/// GET /api/accounts/{id}/transactions
async fn account_transactions(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<StatementLine>>, ApiError> {
    blocking(move |ctx| state.ledger.account_statement(ctx, id)).await.map(Json)
}

/// GET /api/accounts/{id}/calculated-balance
async fn calculated_balance(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<BalanceResponse>, ApiError> {
    blocking(move |ctx| {
        let account = state.accounts.find_account(ctx, id)?;
        let balance = state.ledger.calculate_balance(ctx, id)?;
        Ok(BalanceResponse {
            account_name: account.name,
            balance,
        })
    })
    .await
    .map(Json)
}

/// GET /api/accounts/{id}/payment-orders
async fn account_payment_orders(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<PaymentOrder>>, ApiError> {
    blocking(move |ctx| state.orders.list_orders_for_personal_account(ctx, id))
        .await
        .map(Json)
}

/// POST /api/accounts/{id}/top-up
async fn top_up(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<AmountRequest>,
) -> Result<(StatusCode, Json<PaymentOrderCreated>), ApiError> {
    let order = blocking(move |ctx| state.orders.top_up_request(ctx, id, req.amount)).await?;
    Ok(accepted(&order))
}

/// POST /api/accounts/{id}/withdrawal
async fn withdrawal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<AmountRequest>,
) -> Result<(StatusCode, Json<PaymentOrderCreated>), ApiError> {
    let order = blocking(move |ctx| state.orders.withdrawal_request(ctx, id, req.amount)).await?;
    Ok(accepted(&order))
}

/// POST /api/payment-orders
async fn receive_payment(
    State(state): State<AppState>,
    Json(req): Json<PaymentRequest>,
) -> Result<(StatusCode, Json<PaymentOrderCreated>), ApiError> {
    let order = blocking(move |ctx| {
        state
            .orders
            .receive_payment_request(ctx, req.from_account_id, req.to_account_id, req.amount)
    })
    .await?;
    Ok(accepted(&order))
}

/// GET /api/payment-orders/{id}/state
async fn payment_order_state(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PaymentOrderStateResponse>, ApiError> {
    blocking(move |ctx| state.orders.payment_order_state(ctx, id))
        .await
        .map(|state| Json(PaymentOrderStateResponse { state }))
}

fn accepted(order: &PaymentOrder) -> (StatusCode, Json<PaymentOrderCreated>) {
    (
        StatusCode::ACCEPTED,
        Json(PaymentOrderCreated {
            payment_order_id: order.id,
        }),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
