//! Purpose: Provide the HTTP front end for the grid and its admin settings form.
//! Exports: `ServeConfig`, `serve`.
//! Role: Axum-based server; grid pages, the content API, and the admin surface.
//! Invariants: Admin writes require a valid one-time form token; a failed check
//! modifies nothing and answers with the fixed message `Security check failed`.
//! Invariants: Loopback-only unless explicitly allowed.

use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use axum::extract::{Form, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use getrandom::fill as fill_random;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::future::IntoFuture;
use tokio::time::Duration;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use postgrid::api::{
    Error, ErrorKind, ExpandContext, GRID_TAG, LocalClient, OrderBy, PostStatus, SETTING_KEYS,
    SettingKey, Settings, ShortcodeRegistry, SortOrder, render,
};
use postgrid::core::content::{ContentHost, ContentQuery};
use postgrid::core::html::{escape_attr, escape_text};

#[derive(Clone, Debug)]
pub struct ServeConfig {
    pub bind: SocketAddr,
    pub data_dir: PathBuf,
    pub token: Option<String>,
    pub allow_non_loopback: bool,
}

struct AppState {
    client: LocalClient,
    settings: RwLock<Settings>,
    form_tokens: Mutex<HashSet<String>>,
    api_token: Option<String>,
}

const SECURITY_FAILED: &str = "Security check failed";
const NONCE_FIELD: &str = "post_grid_nonce";

const PAGE_STYLE: &str = r#"
.post-grid { display: grid; gap: 1rem; }
.post-grid.one-column { grid-template-columns: 1fr; }
.post-grid.two-columns { grid-template-columns: repeat(2, 1fr); }
.post-grid.three-columns { grid-template-columns: repeat(3, 1fr); }
.post-item.image-left { display: flex; gap: 1rem; }
.post-item .img-fluid { max-width: 100%; height: auto; }
.pagination { margin-top: 1rem; }
.pagination .page-numbers { margin-right: 0.5rem; }
"#;

pub async fn serve(config: ServeConfig) -> Result<(), Error> {
    validate_config(&config)?;

    init_tracing();

    let client = LocalClient::new().with_data_dir(config.data_dir);
    let settings = client.load_settings();
    let state = Arc::new(AppState {
        client,
        settings: RwLock::new(settings),
        form_tokens: Mutex::new(HashSet::new()),
        api_token: config.token,
    });

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/", get(grid_page))
        .route("/grid", get(grid_fragment))
        .route("/v0/content", get(content_api))
        .route("/admin/settings", get(settings_form).post(settings_submit))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to bind server")
                .with_source(err)
        })?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            result.map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("server failed")
                    .with_source(err)
            })?;
        }
        _ = shutdown_signal() => {
            let _ = shutdown_tx.send(());
            match tokio::time::timeout(Duration::from_secs(10), &mut server).await {
                Ok(result) => result.map_err(|err| {
                    Error::new(ErrorKind::Io)
                        .with_message("server failed")
                        .with_source(err)
                })?,
                Err(_) => {
                    return Err(Error::new(ErrorKind::Io).with_message("server shutdown timed out"));
                }
            }
        }
    };
    Ok(())
}

fn is_loopback(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(addr) => addr.is_loopback(),
        IpAddr::V6(addr) => addr.is_loopback(),
    }
}

fn validate_config(config: &ServeConfig) -> Result<(), Error> {
    if !is_loopback(config.bind.ip()) && !config.allow_non_loopback {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("non-loopback bind requires explicit opt-in")
            .with_hint("Re-run with --allow-non-loopback or use a loopback address."));
    }
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        let mut signal = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler");
        signal.recv().await;
    };
    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    #[cfg(not(unix))]
    ctrl_c.await;
}

fn authorize(headers: &HeaderMap, state: &AppState) -> Result<(), Error> {
    let Some(token) = state.api_token.as_ref() else {
        return Ok(());
    };
    let Some(value) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Err(Error::new(ErrorKind::Permission).with_message("missing bearer token"));
    };
    let value = value.to_str().unwrap_or_default();
    let expected = format!("Bearer {token}");
    if value != expected {
        return Err(Error::new(ErrorKind::Permission).with_message("invalid bearer token"));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct PageParams {
    paged: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ContentParams {
    limit: Option<u64>,
    offset: Option<u64>,
    orderby: Option<String>,
    order: Option<String>,
    post_type: Option<String>,
    post_status: Option<String>,
}

async fn healthz() -> Response {
    Json(json!({ "ok": true })).into_response()
}

async fn grid_page(State(state): State<Arc<AppState>>, Query(params): Query<PageParams>) -> Response {
    let page = params.paged.unwrap_or(1).max(1);
    match expand_page(&state, page) {
        Ok(body) => Html(body).into_response(),
        Err(err) => html_error_response(err),
    }
}

async fn grid_fragment(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageParams>,
) -> Response {
    let page = params.paged.unwrap_or(1).max(1);
    let settings = state.settings.read().expect("settings lock").clone();
    let store = state.client.content_store();
    match render(&settings, &store, page) {
        Ok(fragment) => Html(fragment).into_response(),
        Err(err) => html_error_response(err),
    }
}

// The document a template host would own: a page whose body carries the
// grid trigger, expanded on each request.
fn expand_page(state: &AppState, page: u64) -> Result<String, Error> {
    let settings = state.settings.read().expect("settings lock").clone();
    let store = state.client.content_store();
    let mut registry = ShortcodeRegistry::new();
    registry.register(GRID_TAG, |ctx: &ExpandContext| {
        render(&settings, &store, ctx.page)
    });
    let body = registry.expand("[post-grid]", &ExpandContext { page })?;
    Ok(page_shell("Posts", &body))
}

fn page_shell(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape_text(title),
        PAGE_STYLE,
        body
    )
}

async fn content_api(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<ContentParams>,
) -> Response {
    if let Err(err) = authorize(&headers, &state) {
        return error_response(err);
    }
    let query = match content_query_from_params(&params) {
        Ok(query) => query,
        Err(err) => return error_response(err),
    };
    let store = state.client.content_store();
    match store.query(&query) {
        Ok(result) => Json(json!({
            "items": result.items,
            "total_pages": result.total_pages,
        }))
        .into_response(),
        Err(err) => error_response(err),
    }
}

fn content_query_from_params(params: &ContentParams) -> Result<ContentQuery, Error> {
    let orderby = match params.orderby.as_deref() {
        None => OrderBy::Date,
        Some(token) => OrderBy::parse(token).ok_or_else(|| {
            Error::new(ErrorKind::Usage).with_message(format!("unknown orderby `{token}`"))
        })?,
    };
    let order = match params.order.as_deref() {
        None => SortOrder::Asc,
        Some(token) => SortOrder::parse(token).ok_or_else(|| {
            Error::new(ErrorKind::Usage).with_message(format!("unknown order `{token}`"))
        })?,
    };
    let post_status = match params.post_status.as_deref() {
        None => PostStatus::Publish,
        Some(token) => PostStatus::parse(token).ok_or_else(|| {
            Error::new(ErrorKind::Usage).with_message(format!("unknown post_status `{token}`"))
        })?,
    };
    Ok(ContentQuery {
        limit: params.limit.unwrap_or(10).max(1),
        offset: params.offset.unwrap_or(0),
        orderby,
        order,
        post_type: params.post_type.clone().unwrap_or_else(|| "post".to_string()),
        post_status,
    })
}

async fn settings_form(State(state): State<Arc<AppState>>) -> Response {
    let nonce = match issue_form_token(&state) {
        Ok(nonce) => nonce,
        Err(err) => return html_error_response(err),
    };
    let settings = state.settings.read().expect("settings lock").clone();
    Html(page_shell("Post Grid Settings", &settings_form_body(&settings, &nonce))).into_response()
}

fn settings_form_body(settings: &Settings, nonce: &str) -> String {
    let mut body = String::new();
    body.push_str("<h1>Post Grid Settings</h1>\n");
    body.push_str("<form method=\"post\" action=\"/admin/settings\">\n");
    body.push_str(&format!(
        "<input type=\"hidden\" name=\"{NONCE_FIELD}\" value=\"{}\">\n",
        escape_attr(nonce)
    ));

    body.push_str(&number_field(
        SettingKey::PostsPerPage,
        "Posts Per Page",
        settings.posts_per_page,
    ));
    body.push_str(&select_field(
        SettingKey::Columns,
        "Number of Columns",
        &[("1", "1 Column"), ("2", "2 Columns"), ("3", "3 Columns")],
        &settings.columns.as_u8().to_string(),
    ));
    body.push_str(&select_field(
        SettingKey::OrderBy,
        "Order By",
        &[
            ("date", "Date"),
            ("title", "Title"),
            ("author", "Author"),
            ("modified", "Modified"),
        ],
        settings.orderby.as_str(),
    ));
    body.push_str(&select_field(
        SettingKey::Order,
        "Order",
        &[("ASC", "Ascending"), ("DESC", "Descending")],
        settings.order.as_str(),
    ));
    body.push_str(&text_field(
        SettingKey::PostType,
        "Post Type",
        &settings.post_type,
    ));
    body.push_str(&select_field(
        SettingKey::PostStatus,
        "Post Status",
        &[
            ("publish", "Published"),
            ("draft", "Draft"),
            ("pending", "Pending"),
        ],
        settings.post_status.as_str(),
    ));
    body.push_str(&checkbox_field(
        SettingKey::ShowFeaturedImage,
        "Show Featured Image",
        settings.show_featured_image,
    ));
    body.push_str(&select_field(
        SettingKey::FeaturedImagePosition,
        "Featured Image Position",
        &[("top", "Top"), ("left", "Left")],
        settings.featured_image_position.as_str(),
    ));
    body.push_str(&checkbox_field(
        SettingKey::EnableReadMore,
        "Enable Read More Button",
        settings.enable_read_more,
    ));
    body.push_str(&text_field(
        SettingKey::ReadMoreText,
        "Read More Text",
        &settings.read_more_text,
    ));
    body.push_str(&number_field(
        SettingKey::ExcerptLength,
        "Excerpt Length",
        settings.excerpt_length,
    ));

    body.push_str("<p><button type=\"submit\">Save Changes</button></p>\n");
    body.push_str("</form>\n");
    body
}

fn number_field(key: SettingKey, label: &str, value: u64) -> String {
    format!(
        "<p><label>{label} <input type=\"number\" name=\"{}\" value=\"{value}\"></label></p>\n",
        key.as_str()
    )
}

fn text_field(key: SettingKey, label: &str, value: &str) -> String {
    format!(
        "<p><label>{label} <input type=\"text\" name=\"{}\" value=\"{}\"></label></p>\n",
        key.as_str(),
        escape_attr(value)
    )
}

fn checkbox_field(key: SettingKey, label: &str, checked: bool) -> String {
    let checked = if checked { " checked" } else { "" };
    format!(
        "<p><label><input type=\"checkbox\" name=\"{}\" value=\"1\"{checked}> {label}</label></p>\n",
        key.as_str()
    )
}

fn select_field(key: SettingKey, label: &str, options: &[(&str, &str)], current: &str) -> String {
    let mut field = format!(
        "<p><label>{label} <select name=\"{}\">\n",
        key.as_str()
    );
    for (value, text) in options {
        let selected = if *value == current { " selected" } else { "" };
        field.push_str(&format!(
            "<option value=\"{value}\"{selected}>{text}</option>\n"
        ));
    }
    field.push_str("</select></label></p>\n");
    field
}

async fn settings_submit(
    State(state): State<Arc<AppState>>,
    Form(fields): Form<HashMap<String, String>>,
) -> Response {
    if !consume_form_token(&state, fields.get(NONCE_FIELD)) {
        return (StatusCode::FORBIDDEN, SECURITY_FAILED).into_response();
    }

    let mut settings = state.settings.read().expect("settings lock").clone();
    for key in SETTING_KEYS {
        let raw = match fields.get(key.as_str()) {
            Some(raw) => raw.as_str(),
            // Unchecked checkboxes are absent from the form payload.
            None if is_checkbox(key) => "0",
            None => continue,
        };
        if let Err(rejected) = settings.apply(key, raw) {
            tracing::debug!(%rejected, "keeping stored value");
        }
    }

    if let Err(err) = state.client.save_settings(&settings) {
        return html_error_response(err);
    }
    *state.settings.write().expect("settings lock") = settings;

    let notice = format!(
        "<div class=\"updated\"><p>{}</p></div>\n<p><a href=\"/admin/settings\">Back to settings</a></p>\n",
        escape_text("Shortcode Output: [post-grid]")
    );
    Html(page_shell("Settings Saved", &notice)).into_response()
}

fn is_checkbox(key: SettingKey) -> bool {
    matches!(
        key,
        SettingKey::ShowFeaturedImage | SettingKey::EnableReadMore
    )
}

fn issue_form_token(state: &AppState) -> Result<String, Error> {
    let mut bytes = [0u8; 16];
    fill_random(&mut bytes).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message(format!("failed to generate form token: {err}"))
    })?;
    let token = hex_encode(&bytes);
    state
        .form_tokens
        .lock()
        .expect("token lock")
        .insert(token.clone());
    Ok(token)
}

fn consume_form_token(state: &AppState, token: Option<&String>) -> bool {
    let Some(token) = token else {
        return false;
    };
    state.form_tokens.lock().expect("token lock").remove(token)
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(nibble_hex(byte >> 4));
        out.push(nibble_hex(byte & 0x0f));
    }
    out
}

fn nibble_hex(nibble: u8) -> char {
    char::from_digit(nibble as u32, 16).unwrap_or('0')
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Usage => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Permission => StatusCode::UNAUTHORIZED,
        ErrorKind::Host => StatusCode::BAD_GATEWAY,
        ErrorKind::Corrupt | ErrorKind::Io | ErrorKind::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(err: Error) -> Response {
    let status = status_for(err.kind());
    let body = json!({
        "error": {
            "kind": format!("{:?}", err.kind()),
            "message": err.message().unwrap_or("error"),
        }
    });
    (status, Json(body)).into_response()
}

fn html_error_response(err: Error) -> Response {
    let status = status_for(err.kind());
    tracing::error!(%err, "request failed");
    (status, err.to_string()).into_response()
}
