use crate::connection::ws_index;
use crate::handlers::admin::configure_admin_handlers;
use crate::handlers::boards::configure_board_handlers;
use actix_web::web;

mod admin;
mod boards;

pub fn root(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ws/").route(web::get().to(ws_index)));

    configure_board_handlers(cfg);
    configure_admin_handlers(cfg);
}
