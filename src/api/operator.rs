use actix_web::{HttpResponse, Responder, post, web};
use log::info;
use serde::Serialize;

use super::models::{AppState, BuildTransactionRequest, ErrorResponse};
use super::tx::rejection_response;
use crate::transaction::{TransactionBuilder, UnspentOutput};
use crate::wallet;

#[derive(Serialize)]
struct NewWalletResponse {
    secret: String,
    address: String,
}

/// Mint a fresh wallet: a random secret seed and its derived address. The
/// node keeps nothing; the caller owns the secret.
#[post("/wallets")]
pub async fn post_wallet() -> impl Responder {
    let secret = wallet::generate_secret_hex();
    match wallet::address_from_secret(&secret) {
        Ok(address) => HttpResponse::Created().json(NewWalletResponse { secret, address }),
        Err(err) => HttpResponse::InternalServerError().json(ErrorResponse::new(err)),
    }
}

/// Build, sign and submit a transaction on behalf of a wallet secret. The
/// node selects just enough of the address's unspent outputs to cover amount,
/// fee and a non-zero change output.
#[post("/transactions")]
pub async fn post_build_transaction(
    state: web::Data<AppState>,
    body: web::Json<BuildTransactionRequest>,
) -> impl Responder {
    let request = body.into_inner();
    let address = match wallet::address_from_secret(&request.secret) {
        Ok(address) => address,
        Err(err) => return HttpResponse::BadRequest().json(ErrorResponse::new(err)),
    };

    let result = {
        let mut ledger = state.ledger.lock().expect("mutex poisoned");

        let required = u128::from(request.amount) + u128::from(request.fee);
        let mut selected: Vec<UnspentOutput> = Vec::new();
        // Strictly more than amount + fee, so the change output is non-zero.
        for utxo in ledger.get_unspent_transactions_for_address(&address) {
            if UnspentOutput::total(&selected) > required {
                break;
            }
            selected.push(utxo);
        }

        let mut builder = TransactionBuilder::new()
            .from(selected)
            .to(request.to, request.amount)
            .change(&address)
            .fee(request.fee)
            .sign(&request.secret);
        if let Some(student_id) = request.student_id {
            builder = builder.student_id(student_id);
        }

        match builder.build() {
            Ok(tx) => ledger.add_transaction(tx),
            Err(err) => Err(err.into()),
        }
    };

    match result {
        Ok(tx) => {
            info!("built and submitted transaction '{}' for {address}", tx.id);
            HttpResponse::Created().json(tx)
        }
        Err(err) => rejection_response(&err),
    }
}
