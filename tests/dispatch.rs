use std::sync::Arc;

use http::{HeaderValue, StatusCode};
use http_body_util::BodyExt;
use parking_lot::Mutex;
use perch::{
    Dispatcher, Method,
    body::PerchBody,
    cache::{RouteCache, RouteSource},
    collector::RouteCollector,
    error::RouteError,
    middleware::{
        Middleware, Next,
        json_body::{JsonBody, ParsedJson},
        set_header::SetHeader,
    },
    params::PathParams,
    resolver::Registry,
    responder::Json,
    table::RouteTable,
    types::{Request, Response},
};
use serde_json::json;

type Log = Arc<Mutex<Vec<String>>>;

fn request(method: &str, uri: &str, body: &'static str) -> Request {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(PerchBody::from(body))
        .unwrap()
}

async fn text(res: Response) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn tagging(log: Log, tag: &'static str) -> impl Middleware {
    move |req: Request, next: Next| {
        let log = log.clone();
        async move {
            log.lock().push(format!("{tag}>"));
            let res = next.run(req).await?;
            log.lock().push(format!("<{tag}"));
            Ok::<_, anyhow::Error>(res)
        }
    }
}

fn registry(log: &Log) -> Registry {
    Registry::new()
        .action("UserController", "index", |_req: Request, _p: PathParams| async {
            Ok::<_, anyhow::Error>("users")
        })
        .action("UserController", "show", |_req: Request, p: PathParams| async move {
            Ok::<_, anyhow::Error>(format!("user {}", p.get("id").unwrap_or("?")))
        })
        .action("UserController", "store", |req: Request, _p: PathParams| async move {
            let name = ParsedJson::from_request(&req)
                .and_then(|v| v.get("name"))
                .and_then(|v| v.as_str())
                .unwrap_or("anonymous")
                .to_string();
            Ok::<_, anyhow::Error>((StatusCode::CREATED, name))
        })
        .function("apiShow", |_req: Request, p: PathParams| async move {
            Ok::<_, anyhow::Error>(Json(json!({ "id": p.parse::<u64>("id") })))
        })
        .middleware("api", tagging(log.clone(), "api"))
        .middleware("auth", tagging(log.clone(), "auth"))
        .middleware("global", tagging(log.clone(), "global"))
        .middleware("json", JsonBody::new())
        .middleware("example", SetHeader::from_static("x-example-middleware", "executed"))
}

fn register(table: &mut RouteTable) -> Result<(), RouteError> {
    let mut routes = RouteCollector::new(table);
    routes.define_group("auth", &["auth"]);

    routes.get("/", ("UserController", "index"), &[])?;
    routes.group("/user", &[], |routes| {
        routes.get("/{id:\\d+}", ("UserController", "show"), &[])?;
        Ok(())
    })?;
    routes.group("/api", &["api"], |routes| {
        routes.use_group("auth", |routes| {
            routes.post("/users", ("UserController", "store"), &["json"])?;
            Ok(())
        })?;
        routes.get("/users/{id}", perch::handler::HandlerRef::function("apiShow"), &[])?;
        Ok(())
    })
}

fn dispatcher(table: RouteTable, log: &Log) -> Dispatcher {
    let mut dispatcher = Dispatcher::new(table, Arc::new(registry(log))).debug(true);
    dispatcher.add_middleware("global").add_middleware("example");
    dispatcher
}

#[tokio::test]
async fn grouped_routes_run_middleware_outer_to_inner() {
    let log = Log::default();
    let mut table = RouteTable::new();
    register(&mut table).unwrap();
    let dispatcher = dispatcher(table, &log);

    let res = dispatcher
        .dispatch(request("POST", "/api/users/", r#"{"name":"ada"}"#))
        .await;

    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(
        res.headers().get("x-example-middleware"),
        Some(&HeaderValue::from_static("executed"))
    );
    assert_eq!(text(res).await, "ada");
    assert_eq!(
        *log.lock(),
        ["global>", "api>", "auth>", "<auth", "<api", "<global"]
    );
}

#[tokio::test]
async fn invalid_json_stops_before_the_handler() {
    let log = Log::default();
    let mut table = RouteTable::new();
    register(&mut table).unwrap();
    let dispatcher = dispatcher(table, &log);

    let res = dispatcher
        .dispatch(request("POST", "/api/users", "{oops"))
        .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = serde_json::from_str(&text(res).await).unwrap();
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .starts_with("Invalid JSON payload: ")
    );
}

#[tokio::test]
async fn constraints_and_options_discovery() {
    let log = Log::default();
    let mut table = RouteTable::new();
    register(&mut table).unwrap();
    let dispatcher = dispatcher(table, &log);

    let res = dispatcher.dispatch(request("GET", "/user/12", "")).await;
    assert_eq!(text(res).await, "user 12");

    let res = dispatcher.dispatch(request("GET", "/user/abc", "")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    log.lock().clear();
    let res = dispatcher.dispatch(request("OPTIONS", "/user/12", "")).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(res.headers()["allow"], "GET, HEAD");
    assert!(log.lock().is_empty());

    let res = dispatcher.dispatch(request("GET", "/api/users/7", "")).await;
    assert_eq!(res.headers()["content-type"], "application/json");
    assert_eq!(text(res).await, r#"{"id":7}"#);
}

#[tokio::test]
async fn cached_routes_dispatch_like_registered_ones() {
    let path = std::env::temp_dir()
        .join(format!("perch-e2e-{}", std::process::id()))
        .join("routes.json");
    let _ = std::fs::remove_file(&path);
    let cache = RouteCache::new(&path);

    let mut registered = RouteTable::new();
    let source = cache.load_or_register(&mut registered, false, register).unwrap();
    assert_eq!(source, RouteSource::Registered);

    let mut restored = RouteTable::new();
    let source = cache.load_or_register(&mut restored, false, register).unwrap();
    assert_eq!(source, RouteSource::Cache);

    let fresh_log = Log::default();
    let cached_log = Log::default();
    let fresh = dispatcher(registered, &fresh_log);
    let cached = dispatcher(restored, &cached_log);

    for (method, uri, body) in [
        ("GET", "/", ""),
        ("GET", "/user/5", ""),
        ("HEAD", "/user/5", ""),
        ("POST", "/api/users", r#"{"name":"grace"}"#),
        ("GET", "/api/users/9", ""),
        ("DELETE", "/api/users/9", ""),
    ] {
        let a = fresh.dispatch(request(method, uri, body)).await;
        let b = cached.dispatch(request(method, uri, body)).await;
        assert_eq!(a.status(), b.status(), "{method} {uri}");
        assert_eq!(a.headers(), b.headers(), "{method} {uri}");
        assert_eq!(text(a).await, text(b).await, "{method} {uri}");
    }
    assert_eq!(*fresh_log.lock(), *cached_log.lock());

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn every_method_gets_a_response_for_unknown_paths() {
    let log = Log::default();
    let dispatcher = dispatcher(RouteTable::new(), &log);

    for method in Method::ALL {
        let res = dispatcher
            .dispatch(request(method.as_str(), "/nowhere", ""))
            .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{method}");
        assert_eq!(res.headers()["access-control-allow-origin"], "*");
    }
}
