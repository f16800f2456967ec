use actix_web::{HttpResponse, Responder, get, put, web};
use log::debug;

use super::models::{AppState, DifficultyResponse, ErrorResponse};
use crate::blockchain::Block;

/// Get the full block sequence.
#[get("/blocks")]
pub async fn get_blocks(state: web::Data<AppState>) -> impl Responder {
    let ledger = state.ledger.lock().expect("mutex poisoned");
    HttpResponse::Ok().json(ledger.get_all_blocks())
}

/// Get the chain tip.
#[get("/blocks/latest")]
pub async fn get_latest_block(state: web::Data<AppState>) -> impl Responder {
    let ledger = state.ledger.lock().expect("mutex poisoned");
    HttpResponse::Ok().json(ledger.get_last_block())
}

/// A peer pushed us its tip; run fork resolution over it and answer with our
/// resulting tip. Rejections are resolved internally, never echoed back.
#[put("/blocks/latest")]
pub async fn put_latest_block(
    state: web::Data<AppState>,
    body: web::Json<Block>,
) -> impl Responder {
    let block = body.into_inner();
    debug!("received tip {} from a peer", block.index);
    state.node.on_received_blocks(vec![block]).await;

    let ledger = state.ledger.lock().expect("mutex poisoned");
    HttpResponse::Ok().json(ledger.get_last_block())
}

/// Presence check for a confirmed transaction: the containing block or 404.
/// Peers use this for confirmation counting.
#[get("/blocks/transactions/{transaction_id}")]
pub async fn get_block_with_transaction(
    state: web::Data<AppState>,
    path: web::Path<(String,)>,
) -> impl Responder {
    let transaction_id = path.into_inner().0;
    let ledger = state.ledger.lock().expect("mutex poisoned");
    match ledger.get_transaction_from_blocks(&transaction_id) {
        Some(block) => HttpResponse::Ok().json(block),
        None => HttpResponse::NotFound().json(ErrorResponse::new(format!(
            "transaction '{transaction_id}' not found in any block"
        ))),
    }
}

#[get("/blocks/hash/{hash}")]
pub async fn get_block_by_hash(
    state: web::Data<AppState>,
    path: web::Path<(String,)>,
) -> impl Responder {
    let hash = path.into_inner().0;
    let ledger = state.ledger.lock().expect("mutex poisoned");
    match ledger.get_block_by_hash(&hash) {
        Some(block) => HttpResponse::Ok().json(block),
        None => HttpResponse::NotFound()
            .json(ErrorResponse::new(format!("block with hash '{hash}' not found"))),
    }
}

#[get("/blocks/{index}")]
pub async fn get_block_by_index(
    state: web::Data<AppState>,
    path: web::Path<(u64,)>,
) -> impl Responder {
    let index = path.into_inner().0;
    let ledger = state.ledger.lock().expect("mutex poisoned");
    match ledger.get_block_by_index(index) {
        Some(block) => HttpResponse::Ok().json(block),
        None => HttpResponse::NotFound()
            .json(ErrorResponse::new(format!("block '{index}' not found"))),
    }
}

/// Attendance audit trail: one record per block carrying a signed-in
/// regular transaction.
#[get("/sign-ins")]
pub async fn get_sign_ins(state: web::Data<AppState>) -> impl Responder {
    let ledger = state.ledger.lock().expect("mutex poisoned");
    HttpResponse::Ok().json(ledger.get_sign_in_info())
}

/// Difficulty the next mined block must satisfy.
#[get("/difficulty")]
pub async fn get_difficulty(state: web::Data<AppState>) -> impl Responder {
    let mut ledger = state.ledger.lock().expect("mutex poisoned");
    HttpResponse::Ok().json(DifficultyResponse {
        difficulty: ledger.difficulty_for_next_block(),
    })
}
