use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use aledger_core::{
    parse_id, AccountView, Direction, EntryCommand, LedgerError, PostTransactionCommand,
    RegisterAccountCommand, Transaction, ValidationError,
};

use crate::service::LedgerService;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(LedgerError),
    #[error("{0}")]
    Application(LedgerError),
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Body(#[from] JsonRejection),
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::AccountNotFound(_) | LedgerError::TransactionNotFound(_) => ApiError::NotFound(e),
            LedgerError::Validation(v) => ApiError::Validation(v),
            e => ApiError::Application(e),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "error.generic_error"),
            ApiError::Application(_) => (StatusCode::BAD_REQUEST, "error.application_error"),
            ApiError::Validation(_) | ApiError::Body(_) => (StatusCode::BAD_REQUEST, "error.field_validation_failure"),
        };
        let body = ErrorBody {
            error: error.to_string(),
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterAccountRequest {
    pub id: Option<String>,
    pub name: Option<String>,
    pub direction: Option<String>,
}

impl RegisterAccountRequest {
    pub fn into_command(self) -> Result<RegisterAccountCommand, ValidationError> {
        let id = self.id.as_deref().map(|raw| parse_id("id", raw)).transpose()?;
        let name = self.name.ok_or(ValidationError::MissingField("name"))?;
        let direction = parse_direction(self.direction)?;
        RegisterAccountCommand::new(id, &name, direction)
    }
}

#[derive(Debug, Deserialize)]
pub struct EntryRequest {
    pub id: Option<String>,
    pub account_id: Option<String>,
    pub direction: Option<String>,
    pub amount: Option<i64>,
}

impl EntryRequest {
    pub fn into_command(self) -> Result<EntryCommand, ValidationError> {
        let id = self.id.as_deref().map(|raw| parse_id("id", raw)).transpose()?;
        let account_id = self.account_id.ok_or(ValidationError::MissingField("account_id"))?;
        let account_id = parse_id("account_id", &account_id)?;
        let direction = parse_direction(self.direction)?;
        let amount = self.amount.ok_or(ValidationError::MissingField("amount"))?;
        EntryCommand::new(id, account_id, direction, amount)
    }
}

#[derive(Debug, Deserialize)]
pub struct PostTransactionRequest {
    pub id: Option<String>,
    #[serde(default)]
    pub entries: Vec<EntryRequest>,
}

impl PostTransactionRequest {
    pub fn into_command(self) -> Result<PostTransactionCommand, ValidationError> {
        let id = self.id.as_deref().map(|raw| parse_id("id", raw)).transpose()?;
        let entries = self.entries.into_iter()
            .map(EntryRequest::into_command)
            .collect::<Result<Vec<_>, _>>()?;
        PostTransactionCommand::new(id, entries)
    }
}

fn parse_direction(raw: Option<String>) -> Result<Direction, ValidationError> {
    raw.ok_or(ValidationError::MissingField("direction"))?.parse()
}

pub fn router(service: Arc<LedgerService>) -> Router {
    Router::new()
        .route("/account", post(register_account))
        .route("/account/:id", get(retrieve_account))
        .route("/accounts", get(list_accounts))
        .route("/transaction", post(post_transaction))
        .route("/transaction/:id", get(retrieve_transaction))
        .route("/health", get(health))
        .with_state(service)
}

pub async fn register_account(
    State(service): State<Arc<LedgerService>>,
    payload: Result<Json<RegisterAccountRequest>, JsonRejection>,
) -> Result<Json<AccountView>, ApiError> {
    let Json(request) = payload?;
    let command = request.into_command()?;
    Ok(Json(service.register_account(&command)?))
}

pub async fn retrieve_account(
    State(service): State<Arc<LedgerService>>,
    Path(id): Path<String>,
) -> Result<Json<AccountView>, ApiError> {
    let id = parse_id("account_id", &id)?;
    Ok(Json(service.retrieve_account(id)?))
}

pub async fn list_accounts(State(service): State<Arc<LedgerService>>) -> Json<Vec<AccountView>> {
    Json(service.list_accounts())
}

pub async fn post_transaction(
    State(service): State<Arc<LedgerService>>,
    payload: Result<Json<PostTransactionRequest>, JsonRejection>,
) -> Result<Json<Transaction>, ApiError> {
    let Json(request) = payload?;
    let command = request.into_command()?;
    // A missing account is a bad posting, not a missing resource.
    let txn = service.post_transaction(&command).map_err(|e| match e {
        LedgerError::Validation(v) => ApiError::Validation(v),
        e => ApiError::Application(e),
    })?;
    Ok(Json(txn))
}

pub async fn retrieve_transaction(
    State(service): State<Arc<LedgerService>>,
    Path(id): Path<String>,
) -> Result<Json<Transaction>, ApiError> {
    let id = parse_id("transaction_id", &id)?;
    Ok(Json(service.retrieve_transaction(id)?))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
