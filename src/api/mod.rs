use rocket::{serde::json::Json, Route};
use serde::Serialize;

mod candidates;
mod common;
mod elections;
mod geo;
mod hierarchy;
mod results;

pub fn routes() -> Vec<Route> {
    let mut routes = routes![health];
    routes.extend(elections::routes());
    routes.extend(candidates::routes());
    routes.extend(hierarchy::routes());
    routes.extend(results::routes());
    routes.extend(geo::routes());
    routes
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
}

/// Liveness probe, open to unauthenticated callers.
#[get("/health")]
fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::Status,
        local::asynchronous::Client,
        serde::json::serde_json::{self, json},
    };

    use super::*;

    #[backend_test]
    async fn health_needs_no_token(client: Client) {
        let response = client.get(uri!(health)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let body: serde_json::Value = response.into_json().await.unwrap();
        assert_eq!(body, json!({"status": "ok"}));
    }
}
