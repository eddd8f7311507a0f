//! Purpose: End-to-end tests for the HTTP server and remote content host.
//! Role: Validate grid pages, the admin form token flow, and the content API.
//! Invariants: Uses loopback-only servers with temp data directories.
//! Invariants: Server processes are cleaned up on drop.

use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, MutexGuard};
use std::thread::sleep;
use std::time::{Duration, Instant};

use postgrid::api::{ContentHost, ContentQuery, RemoteHost, Settings, render};
use serde_json::Value;

static SERVER_LOCK: Mutex<()> = Mutex::new(());

struct TestServer {
    child: Child,
    base_url: String,
    _server_guard: MutexGuard<'static, ()>,
}

impl TestServer {
    fn start(data_dir: &std::path::Path) -> Self {
        Self::start_with_args(data_dir, &[])
    }

    fn start_with_args(data_dir: &std::path::Path, extra: &[&str]) -> Self {
        let guard = SERVER_LOCK
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());

        let port = pick_port();
        let bind = format!("127.0.0.1:{port}");
        let base_url = format!("http://{bind}");

        let mut command = Command::new(env!("CARGO_BIN_EXE_postgrid"));
        command
            .arg("--dir")
            .arg(data_dir)
            .arg("serve")
            .arg("--bind")
            .arg(&bind)
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        for arg in extra {
            command.arg(arg);
        }
        let mut child = command.spawn().expect("spawn server");

        wait_for_server(&mut child, &base_url);
        Self {
            child,
            base_url,
            _server_guard: guard,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn pick_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    listener.local_addr().expect("local addr").port()
}

fn wait_for_server(child: &mut Child, base_url: &str) {
    let deadline = Instant::now() + Duration::from_secs(10);
    let health = format!("{base_url}/healthz");
    loop {
        if let Some(status) = child.try_wait().expect("try_wait") {
            panic!("server exited early with {status}");
        }
        if ureq::get(&health)
            .timeout(Duration::from_millis(500))
            .call()
            .is_ok()
        {
            return;
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(50));
    }
}

fn cli(data_dir: &std::path::Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_postgrid"));
    command.arg("--dir").arg(data_dir);
    command
}

fn seed_posts(data_dir: &std::path::Path, count: u64) {
    for n in 1..=count {
        let item = serde_json::json!({
            "title": format!("Post {n}"),
            "excerpt": format!("body of post {n}"),
            "date": format!("2026-01-{:02}T00:00:00Z", n),
        });
        let output = cli(data_dir)
            .args(["content", "add", &item.to_string()])
            .output()
            .expect("content add");
        assert!(output.status.success(), "seed failed: {output:?}");
    }
}

fn set_setting(data_dir: &std::path::Path, name: &str, value: &str) {
    let output = cli(data_dir)
        .args(["settings", "set", name, value])
        .output()
        .expect("settings set");
    assert!(output.status.success(), "set {name} failed: {output:?}");
}

fn get_text(url: &str) -> String {
    ureq::get(url)
        .call()
        .expect("request")
        .into_string()
        .expect("body")
}

fn extract_nonce(form_body: &str) -> String {
    let marker = "name=\"post_grid_nonce\" value=\"";
    let start = form_body.find(marker).expect("nonce field") + marker.len();
    let rest = &form_body[start..];
    let end = rest.find('"').expect("nonce end");
    rest[..end].to_string()
}

#[test]
fn grid_pages_respect_the_paged_parameter() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dir = temp.path().join("data");
    seed_posts(&dir, 3);
    set_setting(&dir, "posts_per_page", "2");

    let server = TestServer::start(&dir);

    let first = get_text(&server.url("/grid"));
    assert_eq!(first.matches("post-item").count(), 2);
    assert!(first.contains("Next &raquo;"));
    assert!(!first.contains("&laquo; Previous"));

    let second = get_text(&server.url("/grid?paged=2"));
    assert_eq!(second.matches("post-item").count(), 1);
    assert!(second.contains("&laquo; Previous"));
    assert!(!second.contains("Next &raquo;"));

    // Past the last page is the normal no-content outcome.
    let beyond = get_text(&server.url("/grid?paged=9"));
    assert_eq!(beyond.trim(), "No posts found");

    let page = get_text(&server.url("/?paged=1"));
    assert!(page.contains("<!doctype html>"));
    assert!(page.contains("post-grid one-column"));
}

#[test]
fn admin_form_round_trip_applies_settings() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dir = temp.path().join("data");
    seed_posts(&dir, 1);

    let server = TestServer::start(&dir);

    let form = get_text(&server.url("/admin/settings"));
    let nonce = extract_nonce(&form);

    let response = ureq::post(&server.url("/admin/settings"))
        .send_form(&[
            ("post_grid_nonce", nonce.as_str()),
            ("columns", "3"),
            ("orderby", "title"),
            ("show_featured_image", "1"),
        ])
        .expect("submit form");
    let body = response.into_string().expect("body");
    assert!(body.contains("Shortcode Output: [post-grid]"));

    let fragment = get_text(&server.url("/grid"));
    assert!(fragment.contains("post-grid three-columns"));

    // Tokens are single-use: replaying the same nonce is refused.
    let replay = ureq::post(&server.url("/admin/settings"))
        .send_form(&[("post_grid_nonce", nonce.as_str()), ("columns", "2")]);
    match replay {
        Err(ureq::Error::Status(403, response)) => {
            assert_eq!(response.into_string().expect("body"), "Security check failed");
        }
        other => panic!("expected 403, got {other:?}"),
    }
    let fragment = get_text(&server.url("/grid"));
    assert!(fragment.contains("post-grid three-columns"));
}

#[test]
fn admin_post_without_valid_token_changes_nothing() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dir = temp.path().join("data");
    seed_posts(&dir, 1);

    let server = TestServer::start(&dir);

    let result = ureq::post(&server.url("/admin/settings"))
        .send_form(&[("post_grid_nonce", "forged"), ("columns", "3")]);
    match result {
        Err(ureq::Error::Status(403, response)) => {
            assert_eq!(response.into_string().expect("body"), "Security check failed");
        }
        other => panic!("expected 403, got {other:?}"),
    }

    let fragment = get_text(&server.url("/grid"));
    assert!(fragment.contains("post-grid one-column"));
}

#[test]
fn content_api_feeds_the_remote_host() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dir = temp.path().join("data");
    seed_posts(&dir, 3);

    let server = TestServer::start(&dir);

    let raw = get_text(&server.url(
        "/v0/content?limit=2&offset=0&orderby=date&order=DESC&post_type=post&post_status=publish",
    ));
    let value: Value = serde_json::from_str(&raw).expect("json");
    assert_eq!(value["total_pages"], 2);
    let items = value["items"].as_array().expect("items");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["title"], "Post 3");

    // The remote host is a drop-in content host for the renderer.
    let remote = RemoteHost::new(&server.base_url).expect("remote host");
    let mut settings = Settings::default();
    settings.posts_per_page = 2;
    let result = remote
        .query(&ContentQuery::for_page(&settings, 1))
        .expect("remote query");
    assert_eq!(result.items.len(), 2);
    assert_eq!(result.total_pages, 2);

    let fragment = render(&settings, &remote, 1).expect("render via remote");
    assert!(fragment.contains("post-grid one-column"));
    assert_eq!(fragment.matches("post-item").count(), 2);
}

#[test]
fn content_api_enforces_the_bearer_token() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dir = temp.path().join("data");
    seed_posts(&dir, 1);

    let server = TestServer::start_with_args(&dir, &["--token", "sekrit"]);

    let denied = ureq::get(&server.url("/v0/content")).call();
    assert!(matches!(denied, Err(ureq::Error::Status(401, _))));

    let remote = RemoteHost::new(&server.base_url)
        .expect("remote host")
        .with_token("sekrit");
    let result = remote
        .query(&ContentQuery::for_page(&Settings::default(), 1))
        .expect("authorized query");
    assert_eq!(result.items.len(), 1);

    // The grid itself stays public.
    let fragment = get_text(&server.url("/grid"));
    assert!(fragment.contains("Post 1"));
}
