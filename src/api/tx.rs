use actix_web::{HttpResponse, Responder, get, post, web};
use log::warn;

use super::models::{AppState, ErrorResponse};
use crate::error::{NodeError, TransactionValidationError};
use crate::transaction::Transaction;

/// Pending pool contents.
#[get("/transactions")]
pub async fn get_transactions(state: web::Data<AppState>) -> impl Responder {
    let ledger = state.ledger.lock().expect("mutex poisoned");
    HttpResponse::Ok().json(ledger.get_all_transactions())
}

/// Submit a signed transaction to the pending pool. Structural failures come
/// back as 400, conflicts with already-claimed outputs as 409.
#[post("/transactions")]
pub async fn post_transaction(
    state: web::Data<AppState>,
    body: web::Json<Transaction>,
) -> impl Responder {
    let transaction = body.into_inner();
    let result = {
        let mut ledger = state.ledger.lock().expect("mutex poisoned");
        ledger.add_transaction(transaction)
    };
    match result {
        Ok(transaction) => HttpResponse::Created().json(transaction),
        Err(err) => rejection_response(&err),
    }
}

/// Conflicts with already-claimed outputs or ids map to 409, everything else
/// a transaction can fail with maps to 400.
pub(super) fn rejection_response(err: &NodeError) -> HttpResponse {
    warn!("rejected transaction: {err}");
    let body = ErrorResponse::from_error(err);
    match err {
        NodeError::Transaction(
            TransactionValidationError::AlreadyConfirmed { .. }
            | TransactionValidationError::AlreadyPending { .. }
            | TransactionValidationError::InputAlreadySpent { .. }
            | TransactionValidationError::InputClaimedByPending { .. },
        ) => HttpResponse::Conflict().json(body),
        _ => HttpResponse::BadRequest().json(body),
    }
}

/// Spendable outputs owned by an address, pending spends excluded.
#[get("/transactions/unspent/{address}")]
pub async fn get_unspent_outputs(
    state: web::Data<AppState>,
    path: web::Path<(String,)>,
) -> impl Responder {
    let address = path.into_inner().0;
    let ledger = state.ledger.lock().expect("mutex poisoned");
    HttpResponse::Ok().json(ledger.get_unspent_transactions_for_address(&address))
}
