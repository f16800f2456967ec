use actix_web::{HttpResponse, Responder, get, post, web};

use super::models::{AppState, ConfirmationsResponse};
use crate::node::Peer;

/// Register a peer and sync against it. Idempotent for known peers.
#[post("/peers")]
pub async fn post_peer(state: web::Data<AppState>, body: web::Json<Peer>) -> impl Responder {
    let peer = body.into_inner();
    state.node.connect_to_peer(peer.clone()).await;
    HttpResponse::Created().json(peer)
}

#[get("/peers")]
pub async fn get_peers(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.node.peers())
}

/// Count how many nodes, us included, have the transaction confirmed.
#[get("/transactions/{transaction_id}/confirmations")]
pub async fn get_confirmations(
    state: web::Data<AppState>,
    path: web::Path<(String,)>,
) -> impl Responder {
    let transaction_id = path.into_inner().0;
    let confirmations = state.node.get_confirmations(&transaction_id).await;
    HttpResponse::Ok().json(ConfirmationsResponse { confirmations })
}
