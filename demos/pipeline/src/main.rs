//! Request Pipeline Demo
//!
//! Runs a handful of HTTP-like requests through a Waypost dispatcher. Nothing
//! here talks to a network: a request is just an `Input` record and the
//! response is a shared, mutable struct.
//!
//! # Pipeline
//!
//! ```text
//! timing          (every request, wraps the rest of the chain)
//! /admin   auth   (prefix mount, fails without a token)
//! errors          (consumes the auth failure and ends the run)
//! /admin   stats
//! /api     api    (nested dispatcher, sees the path without /api)
//! fallback        (404)
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package waypost-pipeline
//! cargo run --package waypost-pipeline -- "GET /api/users/7" "DELETE /admin/cache"
//! WAYPOST_LOGGING__LEVEL=trace cargo run --package waypost-pipeline
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;
use parking_lot::Mutex;
use serde_json::json;
use tracing::{info, warn};
use waypost::prelude::*;

const SAMPLE_REQUESTS: &[&str] = &[
    "GET /api/users",
    "GET /api/users/7",
    "POST /api/users",
    "GET /admin/stats",
    "GET /nowhere",
];

#[derive(Debug, Parser)]
#[command(about = "Run sample requests through a Waypost dispatcher")]
struct Args {
    /// Configuration file (TOML); searched in the usual locations if omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile.
    #[arg(short, long)]
    profile: Option<String>,

    /// Send an admin token with every request.
    #[arg(long)]
    admin: bool,

    /// Requests as "METHOD PATH".
    requests: Vec<String>,
}

#[derive(Debug, Default)]
struct Response {
    status: u16,
    body: String,
    elapsed_us: u128,
}

type Out = Arc<Mutex<Response>>;

// ============================================================================
// Middleware
// ============================================================================

async fn timing(_input: Input, out: Out, next: Next<Out>) -> HandlerResult {
    let started = Instant::now();
    let result = next.run().await;
    out.lock().elapsed_us = started.elapsed().as_micros();
    result
}

async fn require_admin(input: Input, _out: Out, next: Next<Out>) -> HandlerResult {
    if input.get("token") == Some(&json!("admin")) {
        next.run().await
    } else {
        next.fail("admin token required").await
    }
}

async fn report_error(err: BoxError, input: Input, out: Out, _next: Next<Out>) -> HandlerResult {
    warn!(path = input.get_str("path"), error = %err, "Request rejected");
    let mut response = out.lock();
    response.status = 403;
    response.body = err.to_string();
    Ok(())
}

async fn list_users(_input: Input, out: Out) -> HandlerResult {
    let mut response = out.lock();
    response.status = 200;
    response.body = json!(["ada", "grace", "linus"]).to_string();
    Ok(())
}

async fn show_user(input: Input, out: Out) -> HandlerResult {
    let id = input.param("id").unwrap_or_default().to_string();
    let mut response = out.lock();
    response.status = 200;
    response.body = json!({ "id": id }).to_string();
    Ok(())
}

async fn create_user(_input: Input, out: Out) -> HandlerResult {
    out.lock().status = 201;
    Ok(())
}

async fn admin_stats(input: Input, out: Out) -> HandlerResult {
    let mut response = out.lock();
    response.status = 200;
    response.body = format!("stats for {}", input.get_str("originalPath").unwrap_or("?"));
    Ok(())
}

async fn not_found(input: Input, out: Out) -> HandlerResult {
    let mut response = out.lock();
    response.status = 404;
    response.body = format!("no route for {}", input.get_str("path").unwrap_or("?"));
    Ok(())
}

// ============================================================================
// Setup
// ============================================================================

fn build_api(config: &WaypostConfig) -> Result<Dispatcher<Out>> {
    let api = config.build_dispatcher::<Out>()?;

    let get = api.when(Conditions::new().equals("method", "GET"));
    get.handle_at("/users", basic(list_users))?;
    get.handle_at("/users/:id", basic(show_user))?;

    api.when_at(Conditions::new().equals("method", "POST"), "/users")
        .handle(basic(create_user))?;

    Ok(api)
}

fn build_app(config: &WaypostConfig) -> Result<Dispatcher<Out>> {
    if config.dispatcher.path_property.is_none() {
        bail!("this demo mounts middleware by path; set dispatcher.path_property");
    }

    let app = config.build_dispatcher::<Out>()?;
    app.use_middleware(with_next(timing));
    app.use_at("/admin", with_next(require_admin))?;
    // A pending error is only consumed by an error handler directly after it.
    app.when(Conditions::new()).handle(on_error(report_error))?;
    app.use_at("/admin", basic(admin_stats))?;
    app.use_at("/api", build_api(config)?)?;
    app.use_middleware(basic(not_found));

    info!(entries = app.len(), "Pipeline ready");
    Ok(app)
}

fn parse_request(line: &str, path_property: &str, admin: bool) -> Result<Input> {
    let (method, path) = line
        .split_once(' ')
        .with_context(|| format!("expected \"METHOD PATH\", got {line:?}"))?;

    let mut input = Input::new()
        .with("method", method.to_uppercase())
        .with(path_property, path.trim());
    if admin {
        input.insert("token", "admin");
    }
    Ok(input)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new();
    if let Some(profile) = &args.profile {
        loader = loader.profile(profile);
    }
    if let Some(path) = &args.config {
        loader = loader.file(path);
    }
    let mut config = loader.load().context("failed to load configuration")?;
    config
        .dispatcher
        .path_property
        .get_or_insert_with(|| "path".to_string());
    init_from_config(&config.logging);

    let app = build_app(&config)?;
    let path_property = app.path_property().unwrap_or("path").to_string();

    let requests: Vec<String> = if args.requests.is_empty() {
        SAMPLE_REQUESTS.iter().map(|r| r.to_string()).collect()
    } else {
        args.requests
    };

    for line in &requests {
        let input = parse_request(line, &path_property, args.admin)?;
        match app.run(input, Out::default()).await {
            Ok(out) => {
                let response = out.lock();
                info!(
                    request = %line,
                    status = response.status,
                    elapsed_us = response.elapsed_us as u64,
                    "{}",
                    response.body
                );
            }
            Err(err) => warn!(request = %line, error = %err, "Unhandled error"),
        }
    }

    Ok(())
}
