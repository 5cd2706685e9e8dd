//! urlnav RPC server: JSON-RPC over stdin/stdout.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"tree.add_bookmark", "params":{"parent":["Toolbox"],"name":"...","url":"..."}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}
//! Events:   {"event":"tree_changed", ...} and {"event":"progress", ...}, written
//!           before the response of the request that caused them.
//!
//! Logs go to stderr so stdout carries protocol lines only.

use std::io::{self, BufRead, Write};
use std::sync::Mutex;
use std::time::Instant;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use urlnav::app::App;
use urlnav::rpc_handler::handle_method;
use urlnav::services::settings_engine::{SettingsEngine, SettingsEngineTrait};

use serde_json::{json, Value};

/// Simple rate limiter: max requests per second.
struct RateLimiter {
    window_start: Instant,
    request_count: u32,
    max_per_second: u32,
}

impl RateLimiter {
    fn new(max_per_second: u32) -> Self {
        Self { window_start: Instant::now(), request_count: 0, max_per_second }
    }

    /// Returns true if the request is allowed, false if rate-limited.
    fn check(&mut self) -> bool {
        let elapsed = self.window_start.elapsed();
        if elapsed.as_secs() >= 1 {
            self.window_start = Instant::now();
            self.request_count = 0;
        }
        self.request_count += 1;
        self.request_count <= self.max_per_second
    }
}

/// Writes one protocol line. A closed stdout ends the session on the next read.
fn send(line: &Value) {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if writeln!(out, "{}", line).and_then(|_| out.flush()).is_err() {
        error!("stdout closed");
    }
}

fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    // URLNAV_CONFIG overrides the settings file location
    let mut settings_engine = SettingsEngine::new(std::env::var("URLNAV_CONFIG").ok());
    let settings_error = settings_engine.load().err();
    init_logging(&settings_engine.get_settings().logging.filter);
    if let Some(e) = settings_error {
        warn!(error = %e, "settings unreadable, using defaults");
    }

    let mut app = App::new(settings_engine);
    if let Err(e) = app.startup() {
        error!(error = %e, "library could not be loaded");
    }

    app.interchange.subscribe_progress(|event| {
        send(&json!({"event": "progress", "progress": event}));
    });
    match app.tree.lock() {
        Ok(mut tree) => {
            tree.subscribe(|change| {
                send(&json!({"event": "tree_changed", "change": change}));
            });
        }
        Err(e) => error!(error = %e, "tree lock poisoned at startup"),
    }

    let app = Mutex::new(app);

    // Signal ready
    send(&json!({"event":"ready","version":env!("CARGO_PKG_VERSION")}));
    info!("rpc server ready");

    // Rate limiting: max 200 RPC requests per second
    let mut rate_limiter = RateLimiter::new(200);

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        if line.trim().is_empty() { continue; }

        let req: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                send(&json!({"id":null,"error":format!("parse error: {}",e)}));
                continue;
            }
        };

        let id = req.get("id").cloned().unwrap_or(Value::Null);

        if !rate_limiter.check() {
            send(&json!({"id": id, "error": "rate limit exceeded"}));
            continue;
        }

        let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
        let params = req.get("params").cloned().unwrap_or(json!({}));

        let result = handle_method(&app, method, &params);

        let response = match result {
            Ok(val) => json!({"id": id, "result": val}),
            Err(err) => {
                warn!(method, error = %err, "request failed");
                json!({"id": id, "error": err})
            }
        };
        send(&response);
    }

    // stdin closed: persist the library before exiting
    match app.lock() {
        Ok(mut a) => match a.shutdown() {
            Ok(count) => info!(count, "library saved on shutdown"),
            Err(e) => error!(error = %e, "library could not be saved"),
        },
        Err(e) => error!(error = %e, "app lock poisoned, library not saved"),
    };
}
