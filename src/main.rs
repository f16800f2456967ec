mod api;
mod blockchain;
mod error;
mod node;
mod storage;
mod transaction;
mod wallet;

use actix_web::{App, HttpServer, web};
use dotenvy::dotenv;
use std::env;
use std::sync::{Arc, Mutex};

use api::AppState;
use blockchain::Blockchain;
use node::{Node, Peer};
use storage::ChainStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let _ = dotenv();
    env_logger::init();

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3001);
    let data_dir = env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string());
    let bootstrap: Vec<Peer> = env::var("PEERS")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(|url| Peer { url: url.to_string() })
        .collect();

    let store = ChainStore::open(std::path::Path::new(&data_dir)).map_err(std::io::Error::other)?;
    let ledger = Blockchain::open(store).map_err(std::io::Error::other)?;
    let ledger = Arc::new(Mutex::new(ledger));

    let node = Node::new(&host, port, Arc::clone(&ledger));
    node.spawn_event_loop();

    // Bootstrap in the background so the server is already listening when
    // peers answer back with their own announcements.
    if !bootstrap.is_empty() {
        let node = Arc::clone(&node);
        tokio::spawn(async move {
            node.connect_to_peers(bootstrap).await;
        });
    }

    println!("⛓️ Starting ledger node at http://{host}:{port}");

    let state = web::Data::new(AppState { ledger, node });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::init_routes)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
