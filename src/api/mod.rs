mod blocks;
pub mod models;
mod operator;
mod peers;
mod tx;

use actix_web::web::{self, ServiceConfig};

pub use models::AppState;

pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.service(
        web::scope("/blockchain")
            .service(blocks::get_blocks)
            .service(blocks::get_latest_block)
            .service(blocks::put_latest_block)
            .service(blocks::get_block_with_transaction)
            .service(blocks::get_block_by_hash)
            .service(blocks::get_block_by_index)
            .service(blocks::get_sign_ins)
            .service(blocks::get_difficulty)
            .service(tx::get_transactions)
            .service(tx::post_transaction)
            .service(tx::get_unspent_outputs),
    );
    cfg.service(
        web::scope("/operator")
            .service(operator::post_wallet)
            .service(operator::post_build_transaction),
    );
    cfg.service(
        web::scope("/node")
            .service(peers::post_peer)
            .service(peers::get_peers)
            .service(peers::get_confirmations),
    );
}
