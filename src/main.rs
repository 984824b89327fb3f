use std::sync::Arc;

use anyhow::Context;
use http::StatusCode;
use perch::{
    Dispatcher,
    cache::RouteCache,
    collector::RouteCollector,
    config::AppConfig,
    error::RouteError,
    middleware::{json_body::JsonBody, set_header::SetHeader},
    params::PathParams,
    resolver::Registry,
    responder::{Json, Responder},
    table::RouteTable,
    types::{Request, Response},
};
use serde::Serialize;
use tokio::net::TcpListener;

#[derive(Clone, Debug, Serialize)]
pub struct User {
    pub id: u32,
    pub name: &'static str,
    pub email: &'static str,
}

static USERS: &[User] = &[
    User {
        id: 1,
        name: "Ada Lovelace",
        email: "ada@example.com",
    },
    User {
        id: 2,
        name: "Grace Hopper",
        email: "grace@example.com",
    },
];

fn find_user(params: &PathParams) -> Option<&'static User> {
    let id = params.parse::<u32>("id")?;
    USERS.iter().find(|u| u.id == id)
}

pub async fn index(_: Request, _: PathParams) -> anyhow::Result<String> {
    let names: Vec<_> = USERS.iter().map(|u| format!("{}: {}", u.id, u.name)).collect();
    Ok(names.join("\n"))
}

pub async fn show(_: Request, params: PathParams) -> anyhow::Result<Response> {
    Ok(match find_user(&params) {
        Some(user) => format!("{} <{}>", user.name, user.email).into_response(),
        None => (StatusCode::NOT_FOUND, "User not found").into_response(),
    })
}

pub async fn api_index(_: Request, _: PathParams) -> anyhow::Result<Json<&'static [User]>> {
    Ok(Json(USERS))
}

pub async fn api_show(
    _: Request,
    params: PathParams,
) -> anyhow::Result<Json<Option<&'static User>>> {
    Ok(Json(find_user(&params)))
}

fn web_routes(routes: &mut RouteCollector<'_>) -> Result<(), RouteError> {
    routes.get("/", ("UserController", "index"), &[])?;
    routes.group("/user", &[], |routes| {
        routes.get("/{id:\\d+}", ("UserController", "show"), &[])?;
        Ok(())
    })
}

fn api_routes(routes: &mut RouteCollector<'_>) -> Result<(), RouteError> {
    routes.group("/api", &["json"], |routes| {
        routes.group("/users", &[], |routes| {
            routes.get("/", ("UserController", "apiIndex"), &[])?;
            routes.get("/{id}", ("UserController", "apiShow"), &[])?;
            Ok(())
        })
    })
}

fn register(table: &mut RouteTable) -> Result<(), RouteError> {
    let mut routes = RouteCollector::new(table);
    let files: [fn(&mut RouteCollector<'_>) -> Result<(), RouteError>; 2] =
        [web_routes, api_routes];
    for file in files {
        file(&mut routes)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    #[cfg(feature = "perch-tracing")]
    perch::tracing::init_tracing();

    let config = AppConfig::from_env().context("invalid APP_* configuration")?;
    if config.debug && config.is_production() {
        tracing::warn!("APP_DEBUG is enabled in production");
    }

    let registry = Registry::new()
        .action("UserController", "index", index)
        .action("UserController", "show", show)
        .action("UserController", "apiIndex", api_index)
        .action("UserController", "apiShow", api_show)
        .middleware("json", JsonBody::new())
        .middleware(
            "example",
            SetHeader::from_static("x-example-middleware", "executed"),
        );

    let mut table = RouteTable::new();
    match &config.route_cache {
        Some(path) => {
            let source =
                RouteCache::new(path).load_or_register(&mut table, config.debug, register)?;
            tracing::info!(?source, routes = table.len(), "routes loaded");
        }
        None => register(&mut table)?,
    }

    let mut dispatcher = Dispatcher::new(table, Arc::new(registry)).debug(config.debug);
    dispatcher.add_middleware("example");

    let listener = TcpListener::bind(&config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    tracing::info!(app = %config.name, url = %config.url, "starting");

    perch::serve(listener, dispatcher)
        .await
        .map_err(|e| anyhow::anyhow!(e))
}
