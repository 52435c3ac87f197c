//! Transport wiring: the axum front end, the single-job worker task and the
//! downstream forward sink.
//!
//! The HTTP layer does nothing semantic. It turns a request into a
//! [`RawRequest`], queues it for the worker, and turns the worker's outcome
//! back into a response or a forward to the next pipeline stage.

use std::sync::Arc;

use axum::body::{self, Body};
use axum::extract::{Request, State};
use axum::http::{header, Method, StatusCode};
use axum::response::Response;
use axum::Router;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::graph::TileStore;
use crate::request::RawRequest;
use crate::worker::{HttpReply, Outcome, Worker};

/// Large inline documents are legitimate (many-location requests); anything
/// bigger than this is not.
const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Worker queue depth. The worker drains jobs strictly in order; this only
/// bounds how far the front end can run ahead.
const QUEUE_DEPTH: usize = 64;

struct Job {
    raw: RawRequest,
    reply: oneshot::Sender<Outcome>,
}

/// Cloneable handle the HTTP handlers use to reach the worker.
#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<Job>,
}

/// Spawn the worker loop on a blocking thread: one job at a time, in queue
/// order, cleanup after each.
pub fn spawn_worker<S>(mut worker: Worker<S>) -> WorkerHandle
where
    S: TileStore + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<Job>(QUEUE_DEPTH);
    tokio::task::spawn_blocking(move || {
        while let Some(job) = rx.blocking_recv() {
            let outcome = worker.handle(&job.raw);
            // a dropped receiver means the client went away; nothing to do
            let _ = job.reply.send(outcome);
        }
    });
    WorkerHandle { tx }
}

/// Newline-delimited forward sink to the next pipeline stage.
pub struct Downstream {
    addr: String,
}

impl Downstream {
    pub fn new(addr: String) -> Self {
        Self { addr }
    }

    pub async fn send(&self, message: &str) -> std::io::Result<()> {
        let mut stream = TcpStream::connect(&self.addr).await?;
        stream.write_all(message.as_bytes()).await?;
        stream.write_all(b"\n").await?;
        stream.flush().await?;
        Ok(())
    }
}

#[derive(Clone)]
struct AppState {
    handle: WorkerHandle,
    downstream: Option<Arc<Downstream>>,
}

/// Build the router. Every path funnels through one fallback handler: path
/// routing is the worker's job, so the action table lives there, not here.
pub fn build_router(handle: WorkerHandle, downstream: Option<Downstream>) -> Router {
    let state = AppState {
        handle,
        downstream: downstream.map(Arc::new),
    };
    Router::new()
        .fallback(dispatch)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn dispatch(State(state): State<AppState>, request: Request) -> Response {
    if request.method() != Method::GET && request.method() != Method::POST {
        return into_response(HttpReply::plain(
            StatusCode::METHOD_NOT_ALLOWED,
            "Try a POST or GET request instead",
        ));
    }

    let (parts, body) = request.into_parts();
    let query: Vec<(String, String)> = parts
        .uri
        .query()
        .map(|raw| {
            url::form_urlencoded::parse(raw.as_bytes())
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect()
        })
        .unwrap_or_default();
    let body = match body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes.to_vec(),
        Err(_) => {
            return into_response(HttpReply::plain(
                StatusCode::BAD_REQUEST,
                "Failed to read request body",
            ))
        }
    };

    let raw = RawRequest {
        method: parts.method,
        path: parts.uri.path().to_string(),
        query,
        body,
    };

    let (reply_tx, reply_rx) = oneshot::channel();
    if state
        .handle
        .tx
        .send(Job {
            raw,
            reply: reply_tx,
        })
        .await
        .is_err()
    {
        return into_response(HttpReply::plain(
            StatusCode::SERVICE_UNAVAILABLE,
            "worker unavailable",
        ));
    }

    match reply_rx.await {
        Ok(Outcome::Respond(reply)) => into_response(reply),
        Ok(Outcome::Forward(message)) => {
            if let Some(downstream) = &state.downstream {
                let downstream = downstream.clone();
                let payload = message.clone();
                tokio::spawn(async move {
                    if let Err(err) = downstream.send(&payload).await {
                        warn!(error = %err, "forward to downstream failed");
                    }
                });
            }
            // echo the forward message so callers without a wired pipeline
            // can still see the correlated request
            into_response(HttpReply::json(StatusCode::OK, message))
        }
        Err(_) => into_response(HttpReply::plain(
            StatusCode::SERVICE_UNAVAILABLE,
            "worker dropped the job",
        )),
    }
}

/// Every response carries the CORS header; JSON replies add the content
/// type.
fn into_response(reply: HttpReply) -> Response {
    let mut builder = Response::builder()
        .status(reply.status)
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*");
    if reply.json {
        builder = builder.header(header::CONTENT_TYPE, "application/json;charset=utf-8");
    }
    builder.body(Body::from(reply.body)).unwrap()
}

/// Bind and serve until the process is torn down.
pub async fn run_server(listen: &str, router: Router) -> anyhow::Result<()> {
    let listener = TcpListener::bind(listen).await?;
    info!(addr = %listen, "waypost worker listening");
    axum::serve(listener, router).await?;
    Ok(())
}
