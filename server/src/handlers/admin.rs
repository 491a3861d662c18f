use crate::actix_web::Responder;
use crate::engine::Engine;
use actix_web::{web, HttpResponse};
use system::serde_json::json;

pub fn configure_admin_handlers(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin").service(web::resource("/rooms").route(web::get().to(list_rooms))),
    );
}

/// Live rooms only; nothing here touches the board store.
async fn list_rooms(engine: web::Data<Engine>) -> Result<impl Responder, actix_web::error::Error> {
    let rooms = engine.room_summaries().await;
    Ok(HttpResponse::Ok().json(json!({
        "connections": engine.connection_count(),
        "rooms": rooms,
    })))
}
