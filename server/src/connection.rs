use actix::{Actor, ActorContext, AsyncContext, Handler, Message, Running, StreamHandler};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use actix_web_actors::ws::{CloseCode, CloseReason};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

use system::{
    decode_command, encode_event, ClientCommand, ConnectionId, Frame, ServerEvent, WireFormat,
};

use crate::engine::Engine;

#[derive(Message)]
#[rtype(result = "()")]
struct Egress(ServerEvent);

/// One websocket client.
///
/// Commands go through a per-connection worker so they reach the engine in
/// arrival order, one at a time. Events come back through the queue the
/// engine was given in `Engine::connect`.
struct ConnectionActor {
    engine: Arc<Engine>,
    connection_id: Option<ConnectionId>,
    worker: Option<mpsc::Sender<ClientCommand>>,
    /// Replies use the format of the most recent ingress frame.
    format: WireFormat,
}

impl ConnectionActor {
    fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            connection_id: None,
            worker: None,
            format: WireFormat::Json,
        }
    }

    fn ingress(&mut self, frame: Frame, ctx: &mut ws::WebsocketContext<Self>) {
        let command = match decode_command(&frame) {
            Ok(command) => command,
            Err(e) => {
                log::warn!("Dropping frame from {:?}: {}", self.connection_id, e);
                self.egress(ServerEvent::Error(e.to_string()), ctx);
                return;
            }
        };
        let worker = match self.worker.as_mut() {
            Some(worker) => worker,
            None => return,
        };
        match worker.try_send(command) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                log::warn!(
                    "Connection {:?} is sending faster than it is served, closing",
                    self.connection_id
                );
                ctx.close(Some(CloseReason {
                    code: CloseCode::Policy,
                    description: Some("too many pending commands".to_string()),
                }));
                ctx.stop();
            }
            Err(TrySendError::Closed(_)) => ctx.stop(),
        }
    }

    fn egress(&self, event: ServerEvent, ctx: &mut ws::WebsocketContext<Self>) {
        match encode_event(&event, self.format) {
            Ok(Frame::Text(text)) => ctx.text(text),
            Ok(Frame::Binary(bytes)) => ctx.binary(bytes),
            Err(e) => log::error!("Failed to encode {:?}: {}", event, e),
        }
    }
}

impl Actor for ConnectionActor {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let buffer = self.engine.connection_buffer();
        let (tx, mut rx) = mpsc::channel::<ServerEvent>(buffer);
        let connection_id = self.engine.connect(tx);
        self.connection_id = Some(connection_id);

        let addr = ctx.address().recipient();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if addr.do_send(Egress(event)).is_err() {
                    break;
                }
            }
            log::debug!("Egress of connection {} finished", connection_id);
        });

        let (worker, mut commands) = mpsc::channel::<ClientCommand>(buffer);
        self.worker = Some(worker);
        let engine = self.engine.clone();
        tokio::spawn(async move {
            while let Some(command) = commands.recv().await {
                engine.handle_command(connection_id, command).await;
            }
            engine.disconnect(connection_id).await;
        });
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        // the worker disconnects once the commands already queued are done
        self.worker.take();
        Running::Stop
    }
}

/// Ingress
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ConnectionActor {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => ctx.pong(&msg),
            Ok(ws::Message::Text(text)) => {
                self.format = WireFormat::Json;
                self.ingress(Frame::Text(text), ctx);
            }
            Ok(ws::Message::Binary(bin)) => {
                log::debug!("Ingress size: {}", bin.len());
                self.format = WireFormat::Bincode;
                self.ingress(Frame::Binary(bin.to_vec()), ctx);
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Err(e) => {
                log::warn!("Protocol error on {:?}: {}", self.connection_id, e);
                ctx.stop();
            }
            _ => (),
        }
    }
}

/// Egress
impl Handler<Egress> for ConnectionActor {
    type Result = ();

    fn handle(&mut self, msg: Egress, ctx: &mut ws::WebsocketContext<Self>) -> Self::Result {
        self.egress(msg.0, ctx);
    }
}

pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    engine: web::Data<Engine>,
) -> Result<HttpResponse, Error> {
    ws::start(ConnectionActor::new(engine.into_inner()), &req, stream)
}
