use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use waypost_core::{
    Error, LatLon, Place, PlaceDraft, PlaceFilter, PlaceId, PlacePatch, RadiusFilter, Visit,
    VisitDraft, VisitId, VisitPatch, DEFAULT_RADIUS_KM,
};
use waypost_storage::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
}

pub fn router(store: Arc<dyn Store>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/places", post(create_place).get(list_places))
        .route(
            "/places/:id",
            get(get_place).put(update_place).delete(delete_place),
        )
        .route("/places/:id/visits", post(create_visit))
        .route("/visits/:id", put(update_visit).delete(delete_visit))
        .route("/tags", get(list_tags))
        .with_state(AppState { store })
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Maps core errors onto HTTP statuses: client-input failures are 400s,
/// missing entities 404s, store failures 500s.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::InvalidLocation(_) | Error::InvalidFilter(_) | Error::InvalidInput(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::PlaceNotFound | Error::VisitNotFound => StatusCode::NOT_FOUND,
            Error::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("store failure: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

async fn root() -> impl IntoResponse {
    Json(json!({ "message": "waypost api" }))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn create_place(
    State(app): State<AppState>,
    Json(draft): Json<PlaceDraft>,
) -> Result<(StatusCode, Json<Place>), ApiError> {
    let place = app.store.create_place(draft).await?;
    Ok((StatusCode::CREATED, Json(place)))
}

#[derive(Debug, Default)]
pub struct ListParams {
    text_search: Option<String>,
    max_cost: Option<u8>,
    /// repeated keys and/or comma-delimited values
    tags: Vec<String>,
    /// literal "lat,lon"
    distance_from: Option<String>,
    radius_km: Option<f64>,
}

impl ListParams {
    /// Builds from raw query pairs so `tags` works both repeated
    /// (`?tags=a&tags=b`) and as one comma-joined string.
    fn from_pairs(pairs: Vec<(String, String)>) -> Result<Self, Error> {
        let mut params = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "text_search" => params.text_search = Some(value),
                "max_cost" => {
                    params.max_cost = Some(value.parse().map_err(|_| {
                        Error::InvalidFilter(format!(
                            "max_cost must be an integer, got {value:?}"
                        ))
                    })?)
                }
                "tags" => params.tags.push(value),
                "distance_from" => params.distance_from = Some(value),
                "radius_km" => {
                    params.radius_km = Some(value.parse().map_err(|_| {
                        Error::InvalidFilter(format!("radius_km must be a number, got {value:?}"))
                    })?)
                }
                _ => {}
            }
        }
        Ok(params)
    }
}

fn build_filter(params: ListParams) -> Result<PlaceFilter, Error> {
    if let Some(max) = params.max_cost {
        if max > 3 {
            return Err(Error::InvalidFilter(format!(
                "max_cost must be between 0 and 3, got {max}"
            )));
        }
    }
    let radius_km = params.radius_km.unwrap_or(DEFAULT_RADIUS_KM);
    if !radius_km.is_finite() || radius_km <= 0.0 {
        return Err(Error::InvalidFilter(format!(
            "radius_km must be positive, got {radius_km}"
        )));
    }
    let within = match params
        .distance_from
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        Some(raw) => Some(RadiusFilter::new(LatLon::parse(raw)?, radius_km)?),
        None => None,
    };
    Ok(PlaceFilter {
        text_search: params.text_search,
        max_cost: params.max_cost,
        tags_any: params
            .tags
            .iter()
            .flat_map(|s| s.split(','))
            .map(str::to_owned)
            .collect(),
        within,
    })
}

async fn list_places(
    State(app): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<Place>>, ApiError> {
    let filter = build_filter(ListParams::from_pairs(pairs)?)?;
    Ok(Json(app.store.list_places(filter).await?))
}

async fn get_place(
    State(app): State<AppState>,
    Path(id): Path<PlaceId>,
) -> Result<Json<Place>, ApiError> {
    Ok(Json(app.store.get_place(id).await?))
}

async fn update_place(
    State(app): State<AppState>,
    Path(id): Path<PlaceId>,
    Json(patch): Json<PlacePatch>,
) -> Result<Json<Place>, ApiError> {
    Ok(Json(app.store.update_place(id, patch).await?))
}

async fn delete_place(
    State(app): State<AppState>,
    Path(id): Path<PlaceId>,
) -> Result<StatusCode, ApiError> {
    app.store.delete_place(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_visit(
    State(app): State<AppState>,
    Path(place_id): Path<PlaceId>,
    Json(draft): Json<VisitDraft>,
) -> Result<(StatusCode, Json<Visit>), ApiError> {
    let visit = app.store.create_visit(place_id, draft).await?;
    Ok((StatusCode::CREATED, Json(visit)))
}

async fn update_visit(
    State(app): State<AppState>,
    Path(id): Path<VisitId>,
    Json(patch): Json<VisitPatch>,
) -> Result<Json<Visit>, ApiError> {
    Ok(Json(app.store.update_visit(id, patch).await?))
}

async fn delete_visit(
    State(app): State<AppState>,
    Path(id): Path<VisitId>,
) -> Result<StatusCode, ApiError> {
    app.store.delete_visit(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_tags(State(app): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(app.store.tag_vocabulary().await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request};
    use serde_json::Value;
    use tower::ServiceExt;
    use waypost_storage::InMemoryStore;

    fn app() -> Router {
        router(Arc::new(InMemoryStore::new()))
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn place_crud_over_http() {
        let app = app();
        let (status, created) = send(
            &app,
            Method::POST,
            "/places",
            Some(json!({
                "name": "Corner Cafe",
                "location": "12.3,45.6",
                "tags": "Cafe, WIFI",
                "cost": 2,
                "website_url": "https://example.com/cafe"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["location"], "12.300000,45.600000");
        assert_eq!(created["tags"], json!(["cafe", "wifi"]));
        assert!(created.get("geom").is_none());
        let id = created["id"].as_i64().unwrap();

        let (status, fetched) = send(&app, Method::GET, &format!("/places/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["name"], "Corner Cafe");

        let (status, updated) = send(
            &app,
            Method::PUT,
            &format!("/places/{id}"),
            Some(json!({ "cost": null, "description": "open late" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["cost"], Value::Null);
        assert_eq!(updated["description"], "open late");
        assert_eq!(updated["name"], "Corner Cafe");

        let (status, _) = send(&app, Method::DELETE, &format!("/places/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::GET, &format!("/places/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_applies_query_filters() {
        let app = app();
        for (name, cost, tags) in [
            ("Corner Cafe", Some(1), "wifi"),
            ("Grand Cafe", Some(3), "wifi"),
            ("Bookshop", Some(1), "wifi"),
        ] {
            let mut body = json!({ "name": name, "tags": tags });
            if let Some(c) = cost {
                body["cost"] = json!(c);
            }
            let (status, _) = send(&app, Method::POST, "/places", Some(body)).await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, listed) = send(
            &app,
            Method::GET,
            "/places?text_search=cafe&max_cost=2&tags=wifi,terrace",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = listed
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Corner Cafe"]);

        // no filters: everything, most recent first
        let (_, all) = send(&app, Method::GET, "/places", None).await;
        let names: Vec<&str> = all
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Bookshop", "Grand Cafe", "Corner Cafe"]);
    }

    #[tokio::test]
    async fn tags_accept_repeated_keys_and_comma_joined() {
        let app = app();
        for (name, tags) in [
            ("Corner Cafe", json!("wifi")),
            ("Reading Room", json!(["quiet"])),
            ("Arcade", json!(["loud"])),
        ] {
            let (status, _) = send(
                &app,
                Method::POST,
                "/places",
                Some(json!({ "name": name, "tags": tags })),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let names = |listed: &Value| -> Vec<String> {
            listed
                .as_array()
                .unwrap()
                .iter()
                .map(|p| p["name"].as_str().unwrap().to_owned())
                .collect()
        };

        let (status, repeated) =
            send(&app, Method::GET, "/places?tags=wifi&tags=quiet", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(names(&repeated), vec!["Reading Room", "Corner Cafe"]);

        // one comma-joined value selects the same places
        let (status, joined) = send(&app, Method::GET, "/places?tags=wifi,quiet", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(names(&joined), names(&repeated));
    }

    #[tokio::test]
    async fn geo_filter_and_bad_inputs() {
        let app = app();
        let (status, _) = send(
            &app,
            Method::POST,
            "/places",
            Some(json!({ "name": "Versailles", "location": "48.8049,2.1204" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        send(
            &app,
            Method::POST,
            "/places",
            Some(json!({ "name": "Unlocated" })),
        )
        .await;

        let (status, listed) = send(
            &app,
            Method::GET,
            "/places?distance_from=48.8566,2.3522&radius_km=50",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (status, body) =
            send(&app, Method::GET, "/places?distance_from=somewhere", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("invalid location"));

        let (status, _) = send(
            &app,
            Method::GET,
            "/places?distance_from=0,0&radius_km=0",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::GET, "/places?max_cost=7", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            Method::POST,
            "/places",
            Some(json!({ "name": "Pole", "location": "91,0" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn visit_endpoints_and_cascade() {
        let app = app();
        let (_, place) = send(
            &app,
            Method::POST,
            "/places",
            Some(json!({ "name": "Park" })),
        )
        .await;
        let place_id = place["id"].as_i64().unwrap();

        let (status, visit) = send(
            &app,
            Method::POST,
            &format!("/places/{place_id}/visits"),
            Some(json!({ "visit_date": "2024-03-01", "rating": 4 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(visit.get("place_id").is_none());
        let visit_id = visit["id"].as_i64().unwrap();

        let (status, _) = send(
            &app,
            Method::POST,
            "/places/999/visits",
            Some(json!({ "visit_date": "2024-03-01" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, updated) = send(
            &app,
            Method::PUT,
            &format!("/visits/{visit_id}"),
            Some(json!({ "notes": "crowded" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["notes"], "crowded");
        assert_eq!(updated["rating"], 4);

        let (status, _) = send(&app, Method::DELETE, &format!("/places/{place_id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::DELETE, &format!("/visits/{visit_id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn tags_endpoint_returns_vocabulary() {
        let app = app();
        send(
            &app,
            Method::POST,
            "/places",
            Some(json!({ "name": "a", "tags": "Quiet, Cafe" })),
        )
        .await;
        send(
            &app,
            Method::POST,
            "/places",
            Some(json!({ "name": "b", "tags": ["cafe", "terrace"] })),
        )
        .await;

        let (status, tags) = send(&app, Method::GET, "/tags", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tags, json!(["cafe", "quiet", "terrace"]));
    }
}
