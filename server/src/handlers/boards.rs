use crate::actix_web::Responder;
use crate::engine::Engine;
use crate::error::EngineError;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use system::serde_json::json;
use system::{validate_room_id, StrokeOp};

/// Activity user for requests that carry no name.
const ANONYMOUS: &str = "anonymous";

pub fn configure_board_handlers(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/boards").route(web::get().to(list)))
        .service(web::resource("/boards/create").route(web::post().to(create)))
        .service(
            web::resource("/boards/{room_id}")
                .route(web::get().to(show))
                .route(web::post().to(save)),
        );
}

#[derive(Deserialize)]
struct SaveBoardRequest {
    strokes: Vec<StrokeOp>,
    #[serde(default)]
    username: Option<String>,
}

fn failure(context: &str, error: EngineError) -> HttpResponse {
    match error {
        EngineError::InvalidInput(e) => {
            HttpResponse::BadRequest().json(json!({ "error": e.to_string() }))
        }
        error => {
            log::error!("{}: {}", context, error);
            HttpResponse::InternalServerError().finish()
        }
    }
}

async fn list(engine: web::Data<Engine>) -> Result<impl Responder, actix_web::error::Error> {
    match engine.board_store().list().await {
        Ok(room_ids) => Ok(HttpResponse::Ok().json(json!(room_ids))),
        Err(e) => {
            log::error!("Cannot list boards: {}", e);
            Ok(HttpResponse::InternalServerError().finish())
        }
    }
}

async fn create(engine: web::Data<Engine>) -> Result<impl Responder, actix_web::error::Error> {
    match engine.create_board(ANONYMOUS).await {
        Ok(room_id) => Ok(HttpResponse::Ok().json(json!({ "roomId": room_id }))),
        Err(e) => Ok(failure("Cannot create board", e)),
    }
}

async fn show(
    engine: web::Data<Engine>,
    room_id: web::Path<String>,
) -> Result<impl Responder, actix_web::error::Error> {
    let room_id = room_id.into_inner();
    if let Err(e) = validate_room_id(&room_id) {
        return Ok(HttpResponse::BadRequest().json(json!({ "error": e.to_string() })));
    }
    match engine.board_store().load(&room_id).await {
        Ok(Some(strokes)) => Ok(HttpResponse::Ok().json(json!({
            "roomId": room_id,
            "strokeCount": strokes.len(),
            "strokes": strokes,
        }))),
        Ok(None) => Ok(HttpResponse::NotFound().json(json!({ "error": "Board not found" }))),
        Err(e) => {
            log::error!("Cannot load board {}: {}", room_id, e);
            Ok(HttpResponse::InternalServerError().finish())
        }
    }
}

/// Upsert, last write wins.
async fn save(
    engine: web::Data<Engine>,
    room_id: web::Path<String>,
    body: web::Json<SaveBoardRequest>,
) -> Result<impl Responder, actix_web::error::Error> {
    let room_id = room_id.into_inner();
    let request = body.into_inner();
    let username = request.username.as_deref().unwrap_or(ANONYMOUS);
    match engine
        .store_board(&room_id, username, &request.strokes)
        .await
    {
        Ok(stroke_count) => Ok(HttpResponse::Ok().json(json!({
            "roomId": room_id,
            "strokeCount": stroke_count,
        }))),
        Err(e) => Ok(failure(&format!("Cannot save board {}", room_id), e)),
    }
}
