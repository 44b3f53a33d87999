//! HTTP server for the Stockload API.
//!
//! # API Endpoints
//!
//! | Method | Path                     | Description                         |
//! |--------|--------------------------|-------------------------------------|
//! | GET    | `/health`                | Health check                        |
//! | POST   | `/api/stocks/import`     | CSV import (dry_run/upsert query)   |
//! | POST   | `/api/stocks/inspect`    | Pre-flight format sniffing          |
//! | GET    | `/api/stocks/export.csv` | Streaming CSV export                |
//! | GET    | `/api/logs`              | SSE stream for real-time logs       |
//!
//! The store behind the endpoints is the in-memory reference
//! implementation; a real deployment substitutes its own
//! `StockStore`/`RecordSource`.

use std::{convert::Infallible, net::SocketAddr, sync::{Arc, RwLock}, time::Duration};

use axum::{
    body::Body,
    extract::{Multipart, Query, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use futures::stream::Stream;
use serde_json::{json, Value};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::LOG_BROADCASTER;
use super::types::{error_response, ExportQuery, ImportQuery, ImportResponse};
use crate::export::{export_filename, ExportSpec, ExportStream};
use crate::import::run_import;
use crate::models::ImportOptions;
use crate::sniffer;
use crate::store::{MemoryStore, RecordSource};

type SharedStore = Arc<RwLock<MemoryStore>>;

/// Start the HTTP server.
pub async fn start_server(port: u16, store: MemoryStore) -> Result<(), Box<dyn std::error::Error>> {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    let state: SharedStore = Arc::new(RwLock::new(store));

    let app = Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/stocks/import", post(import_csv))
        .route("/api/stocks/inspect", post(inspect_csv))
        .route("/api/stocks/export.csv", get(export_csv))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("stockload server on http://localhost:{}", port);
    println!("  POST /api/stocks/import      - CSV import (dry_run=true by default)");
    println!("  POST /api/stocks/inspect     - format sniffing pre-flight");
    println!("  GET  /api/stocks/export.csv  - streaming export");
    println!("  GET  /api/logs               - SSE log stream");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "stockload",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// SSE endpoint for real-time log streaming.
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Pull the uploaded `file` field out of a multipart body.
async fn read_upload(multipart: &mut Multipart) -> Result<(Vec<u8>, Option<String>), (StatusCode, Json<Value>)> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (StatusCode::BAD_REQUEST, Json(error_response(&format!("multipart error: {}", e))))
    })? {
        if field.name() == Some("file") {
            file_name = field.file_name().map(|s| s.to_string());
            file_data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| {
                        (StatusCode::BAD_REQUEST, Json(error_response(&format!("read error: {}", e))))
                    })?
                    .to_vec(),
            );
        }
    }

    let bytes = file_data.ok_or_else(|| {
        (StatusCode::BAD_REQUEST, Json(error_response("no file provided")))
    })?;
    Ok((bytes, file_name))
}

/// CSV import endpoint. Returns the full report; fatal sniffing or
/// header failures map to 400 with an error body and no report.
async fn import_csv(
    State(store): State<SharedStore>,
    Query(query): Query<ImportQuery>,
    mut multipart: Multipart,
) -> Result<Json<ImportResponse>, (StatusCode, Json<Value>)> {
    let (bytes, file_name) = read_upload(&mut multipart).await?;

    let options = ImportOptions { dry_run: query.dry_run, upsert: query.upsert };
    let report = {
        let mut store = store
            .write()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, Json(error_response("store lock poisoned"))))?;
        run_import(&bytes, file_name.as_deref(), options, &mut *store)
    }
    .map_err(|e| (StatusCode::BAD_REQUEST, Json(error_response(&e.to_string()))))?;

    Ok(Json(ImportResponse::from(report)))
}

/// Pre-flight sniffing endpoint: encoding, delimiter, headers, sample rows.
async fn inspect_csv(
    mut multipart: Multipart,
) -> Result<Json<sniffer::FormatInfo>, (StatusCode, Json<Value>)> {
    let (bytes, file_name) = read_upload(&mut multipart).await?;

    let info = sniffer::inspect(&bytes, file_name.as_deref(), None, None)
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(error_response(&e.to_string()))))?;

    Ok(Json(info))
}

/// Streaming CSV export. The sort key is validated before the response
/// starts, so a bad request is a clean 400, never a truncated file.
async fn export_csv(
    State(store): State<SharedStore>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, (StatusCode, Json<Value>)> {
    let spec = ExportSpec::from_params(query.keyword, query.category_id, query.sort.as_deref())
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(error_response(&e.to_string()))))?;

    let source = {
        let store = store
            .read()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, Json(error_response("store lock poisoned"))))?;
        store.records(&spec)
    };

    let stream = ExportStream::new(source);
    let filename = export_filename(Utc::now());
    let body = Body::from_stream(futures::stream::iter(stream.map(Ok::<_, Infallible>)));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/csv; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(body)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, Json(error_response(&e.to_string()))))
}
