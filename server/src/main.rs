use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;

use server::handlers::root;
use server::{
    ActivityRecorder, Config, Engine, FileBoardStore, JsonLinesActivityRecorder,
    LogActivityRecorder,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e));
        }
    };
    log::info!("Starting with {:?}", config);

    let activity: Arc<dyn ActivityRecorder> = match &config.activity_log {
        Some(path) => Arc::new(JsonLinesActivityRecorder::spawn(path.clone())),
        None => Arc::new(LogActivityRecorder),
    };
    tokio::fs::create_dir_all(&config.board_dir).await?;
    let boards = Arc::new(FileBoardStore::new(config.board_dir.clone()));
    let engine = web::Data::from(Arc::new(Engine::from_config(&config, activity, boards)));

    let allowed_origin = config.allowed_origin.clone();
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&allowed_origin)
            .allowed_methods(vec!["GET", "POST"])
            .allow_any_header()
            .supports_credentials();
        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(engine.clone())
            .configure(root)
    })
    .bind(&config.bind_address)?
    .run()
    .await
}
