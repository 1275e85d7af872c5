//! Lobby server: one WebSocket endpoint for all game traffic plus a health check.
//! Run with: cargo run --bin server
//! Listens on 0.0.0.0:5000 by default. Override with env: HOST, PORT, WS_PATH.

use actix_web::{
    get,
    web::{self, Data, Payload},
    App, HttpRequest, HttpResponse, HttpServer, Responder,
};
use actix_ws::Message;
use chess_lobby::{Config, Gateway, Lobby};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(serde::Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "chess-lobby",
    })
}

/// Upgrade to WebSocket. A writer task drains the connection's outbox; this task reads
/// frames one at a time, so each connection's messages are handled in arrival order.
async fn ws_endpoint(
    req: HttpRequest,
    body: Payload,
    gateway: Data<Gateway>,
) -> Result<HttpResponse, actix_web::Error> {
    let (response, mut session, mut stream) = actix_ws::handle(&req, body)?;
    let (outbox, mut outbound) = mpsc::unbounded_channel::<Arc<str>>();
    let mut conn = gateway.connect(outbox);

    let mut writer = session.clone();
    actix_web::rt::spawn(async move {
        while let Some(text) = outbound.recv().await {
            if writer.text(text.to_string()).await.is_err() {
                break;
            }
        }
    });

    actix_web::rt::spawn(async move {
        while let Some(frame) = stream.recv().await {
            match frame {
                Ok(Message::Text(text)) => gateway.handle_text(&mut conn, &text),
                Ok(Message::Ping(bytes)) => {
                    if session.pong(&bytes).await.is_err() {
                        break;
                    }
                }
                Ok(Message::Close(reason)) => {
                    log::debug!("Connection {} sent close: {:?}", conn.id(), reason);
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    log::warn!("Connection {} protocol error: {}", conn.id(), e);
                    break;
                }
            }
        }
        gateway.disconnect(&conn);
        let _ = session.close(None).await;
    });

    Ok(response)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env();
    let bind = (config.host.clone(), config.port);
    let ws_path = config.ws_path.clone();
    log::info!(
        "Starting server at http://{}:{} (WebSocket at {})",
        bind.0,
        bind.1,
        ws_path
    );

    let gateway = Data::new(Gateway::new(Lobby::with_default_rules(config)));

    HttpServer::new(move || {
        App::new()
            .app_data(gateway.clone())
            .service(api_health)
            .route(&ws_path, web::get().to(ws_endpoint))
    })
    .bind(bind)?
    .run()
    .await
}
