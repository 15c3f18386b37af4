use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use reqwest::Client;

use crate::cache::{self, Cache};
use crate::fetch::fetch_page;
use crate::ics::{CONTENT_TYPE, FILE_NAME};
use crate::{compile, Error};

const CALENDAR_PATH: &str = "/timetable.ics";

/// Query parameter that switches the response to JSON. It is consumed here
/// and never forwarded upstream.
const JSON_PARAM: &str = "json";

pub struct Config {
    pub upstream: Option<String>,
    pub cache: cache::Config,
}

struct AppState {
    upstream: Option<String>,
    client: Client,
    /// Upstream pages keyed by the forwarded query pairs.
    pages: Cache<Vec<(String, String)>, String>,
}

type SharedState = Arc<AppState>;

pub fn router(config: Config) -> Router {
    let state = AppState {
        upstream: config.upstream,
        client: Client::new(),
        pages: Cache::new(config.cache),
    };

    Router::new()
        .route(CALENDAR_PATH, get(handle_fetch).post(handle_upload))
        .fallback(|| async { Redirect::permanent(env!("CARGO_PKG_REPOSITORY")) })
        .with_state(Arc::new(state))
}

/// Compiles a timetable page posted as the request body.
async fn handle_upload(Query(query): Query<BTreeMap<String, String>>, body: String) -> Response {
    render(&body, wants_json(&query))
}

/// Fetches the upstream timetable page, forwarding the request's query, and
/// compiles it.
async fn handle_fetch(
    State(state): State<SharedState>,
    Query(mut query): Query<BTreeMap<String, String>>,
) -> Response {
    let json = wants_json(&query);
    query.remove(JSON_PARAM);

    let Some(upstream) = &state.upstream else {
        return (StatusCode::NOT_FOUND, "No upstream timetable configured").into_response();
    };

    let forwarded = query.into_iter().collect::<Vec<_>>();

    let page = match state.pages.get(&forwarded) {
        Some(page) => page,
        None => match fetch_page(&state.client, upstream, &forwarded).await {
            Ok(page) => state.pages.insert(forwarded, page),
            Err(err) => {
                log::error!("Failed to fetch {upstream}: {err}");
                return (StatusCode::BAD_GATEWAY, "Failed to fetch timetable").into_response();
            }
        },
    };

    render(&page, json)
}

fn wants_json(query: &BTreeMap<String, String>) -> bool {
    query.get(JSON_PARAM).is_some_and(|value| value == "true")
}

fn render(html: &str, json: bool) -> Response {
    let calendar = match compile(html, Utc::now()) {
        Ok(calendar) => calendar,
        Err(err) => return error_response(&err),
    };

    if json {
        return Json(calendar).into_response();
    }

    match calendar.to_ics() {
        Ok(ics) => (
            [
                (header::CONTENT_TYPE, CONTENT_TYPE.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{FILE_NAME}\""),
                ),
            ],
            ics.to_string(),
        )
            .into_response(),
        Err(err) => error_response(&err),
    }
}

fn error_response(err: &Error) -> Response {
    log::warn!("Rejecting timetable: {err:?}");

    let status = match err {
        Error::Configuration(_) => StatusCode::BAD_REQUEST,
        Error::EmptyResult => StatusCode::UNPROCESSABLE_ENTITY,
    };

    (status, err.to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{
        body::{to_bytes, Body},
        http::Request,
    };
    use tower::ServiceExt;

    use super::*;

    const PAGE: &str = r#"
<select id="P2_MY_PERIOD">
  <option value="sem1" selected>Semester 1</option>
  <option value="w1">Sem 1 - Wk 1 (starting 08-JAN-2024)</option>
</select>
<table><tbody>
  <tr class="tt_info_row">
    <td class="weekday_col"><span class="weekday">Monday</span></td>
    <td class="tt_info_cell" colspan="2"><table><tbody>
      <tr class="tt_module_id_row"><td>24COA101</td></tr>
      <tr class="tt_module_name_row"><td>Mathematics</td></tr>
      <tr class="tt_weeks_row"><td>Sem 1: 1</td></tr>
    </tbody></table></td>
  </tr>
</tbody></table>"#;

    fn app() -> Router {
        app_with(None, false)
    }

    fn app_with(upstream: Option<String>, enable_cache: bool) -> Router {
        router(Config {
            upstream,
            cache: cache::Config {
                enabled: enable_cache,
                ttl: Duration::from_secs(60),
                capacity: 16,
            },
        })
    }

    /// Serves `PAGE` with the module renamed after the number of query
    /// parameters received.
    async fn spawn_upstream() -> String {
        let upstream = Router::new().route(
            "/",
            get(|Query(query): Query<BTreeMap<String, String>>| async move {
                PAGE.replace("Mathematics", &format!("Params {}", query.len()))
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, upstream).await });

        format!("http://{address}/")
    }

    async fn get_summary(app: &Router, uri: &str) -> String {
        let response = app
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let calendar: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        calendar["events"][0]["summary"].as_str().unwrap().to_string()
    }

    async fn post(uri: &str, body: &str) -> Response {
        app()
            .oneshot(
                Request::post(uri)
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn upload_returns_calendar_attachment() {
        let response = post(CALENDAR_PATH, PAGE).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/calendar");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"timetable.ics\""
        );

        let body = body_text(response).await;
        assert!(body.contains("UID:20240108T090000-24COA101@lboro\r\n"));
        assert!(body.contains("LOCATION:Online\r\n"));
    }

    #[tokio::test]
    async fn upload_can_return_json() {
        let response = post("/timetable.ics?json=true", PAGE).await;

        assert_eq!(response.status(), StatusCode::OK);
        let events: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(events["events"][0]["summary"], "Mathematics");
    }

    #[tokio::test]
    async fn missing_semester_is_a_bad_request() {
        let response = post(CALENDAR_PATH, "<p>no timetable</p>").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Please select Semester 1 or 2.");
    }

    #[tokio::test]
    async fn page_without_sessions_is_unprocessable() {
        let page = PAGE.replace("Sem 1: 1", "Sem 1: 5");
        let response = post(CALENDAR_PATH, &page).await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_text(response).await, "No sessions found.");
    }

    #[tokio::test]
    async fn cached_pages_are_keyed_by_each_forwarded_pair() {
        let app = app_with(Some(spawn_upstream().await), true);

        let joined = get_summary(&app, "/timetable.ics?json=true&key=abc%26salt%3D1").await;
        let split = get_summary(&app, "/timetable.ics?json=true&key=abc&salt=1").await;
        let again = get_summary(&app, "/timetable.ics?salt=1&key=abc&json=true").await;

        assert_eq!(joined, "Params 1");
        assert_eq!(split, "Params 2");
        assert_eq!(again, "Params 2");
    }

    #[tokio::test]
    async fn fetch_without_upstream_is_not_found() {
        let response = app()
            .oneshot(Request::get(CALENDAR_PATH).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
