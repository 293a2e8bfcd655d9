//! End-to-end dispatch through the facade crate.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;
use waypost::prelude::*;

#[derive(Debug, Default)]
struct Response {
    status: u16,
    body: String,
    log: Vec<String>,
}

type Out = Arc<Mutex<Response>>;

fn request(method: &str, path: &str) -> Input {
    Input::new().with("method", method).with("url", path)
}

fn app() -> Dispatcher<Out> {
    let config = ConfigLoader::new()
        .without_env()
        .set("dispatcher.path_property", "url")
        .load()
        .unwrap();
    let app = config.build_dispatcher::<Out>().unwrap();

    app.use_middleware(with_next(|input: Input, out: Out, next: Next<Out>| async move {
        let url = input.get_str("url").unwrap_or_default().to_string();
        out.lock().log.push(format!("-> {url}"));
        let result = next.run().await;
        let status = out.lock().status;
        out.lock().log.push(format!("<- {status}"));
        result
    }));

    app.use_at(
        "/api",
        with_next(|input: Input, _out: Out, next: Next<Out>| async move {
            if input.get("token") == Some(&json!("secret")) {
                next.run().await
            } else {
                next.fail("unauthorized").await
            }
        }),
    )
    .unwrap();

    // Entries registered through a binding end the run once they settle.
    app.when(Conditions::new())
        .handle(on_error(
            |err: BoxError, _input: Input, out: Out, _next: Next<Out>| async move {
                let mut response = out.lock();
                response.status = 401;
                response.body = err.to_string();
                Ok::<_, BoxError>(())
            },
        ))
        .unwrap();

    let api = Dispatcher::with_path_property("url").unwrap();
    let get = api.when(Conditions::new().equals("method", "GET"));
    get.handle_at(
        "/users/:id",
        basic(|input: Input, out: Out| async move {
            let mut response = out.lock();
            response.status = 200;
            response.body = format!("user {}", input.param("id").unwrap_or_default());
            Ok::<_, BoxError>(())
        }),
    )
    .unwrap();
    app.use_at("/api", api).unwrap();

    app.use_middleware(basic(|_input: Input, out: Out| async move {
        out.lock().status = 404;
        Ok::<_, BoxError>(())
    }));

    app
}

#[tokio::test]
async fn test_authorized_request_reaches_nested_handler() {
    let input = request("GET", "/api/users/42").with("token", "secret");
    let out = app().run(input, Out::default()).await.unwrap();

    let response = out.lock();
    assert_eq!(response.status, 200);
    assert_eq!(response.body, "user 42");
    assert_eq!(response.log, ["-> /api/users/42", "<- 200"]);
}

#[tokio::test]
async fn test_unauthorized_request_is_recovered_by_error_handler() {
    let out = app()
        .run(request("GET", "/api/users/42"), Out::default())
        .await
        .unwrap();

    let response = out.lock();
    assert_eq!(response.status, 401);
    assert_eq!(response.body, "unauthorized");
}

#[tokio::test]
async fn test_unmatched_request_falls_through() {
    let out = app()
        .run(request("GET", "/elsewhere"), Out::default())
        .await
        .unwrap();

    assert_eq!(out.lock().status, 404);
    assert_eq!(out.lock().log, ["-> /elsewhere", "<- 404"]);
}
