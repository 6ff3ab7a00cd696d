//! In-process stand-ins for the CREBS portal and the Telegram Bot API.

use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, Mutex};

use axum::extract::{Form, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;

pub const SESSION_COOKIE: &str = "ASP.NET_SessionId=fake-session";
pub const BOT_TOKEN: &str = "test-token";

const LOGIN_PAGE: &str = r#"<html><body><form method="post"><input id="txtEmail" name="txtEmail"><input id="txtPassword" name="txtPassword" type="password"></form></body></html>"#;

#[derive(Debug, Clone)]
pub struct PortalBehaviour {
    pub login_status: StatusCode,
    /// Whether the login POST answers with the signed-in results page.
    pub signed_in: bool,
    pub set_cookie: bool,
    pub results_html: String,
    pub bookings_html: String,
}

impl Default for PortalBehaviour {
    fn default() -> Self {
        Self {
            login_status: StatusCode::OK,
            signed_in: true,
            set_cookie: true,
            results_html: fixture("results.html"),
            bookings_html: fixture("bookings.html"),
        }
    }
}

#[derive(Debug, Default)]
pub struct Recorded {
    pub warmups: usize,
    pub logins: Vec<HashMap<String, String>>,
    pub booking_requests: usize,
    pub messages: Vec<String>,
}

#[derive(Clone)]
struct AppState {
    behaviour: Arc<PortalBehaviour>,
    recorded: Arc<Mutex<Recorded>>,
}

pub struct FakePortal {
    pub base_url: String,
    pub telegram_api: String,
    recorded: Arc<Mutex<Recorded>>,
}

impl FakePortal {
    pub async fn spawn(behaviour: PortalBehaviour) -> Self {
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let state = AppState {
            behaviour: Arc::new(behaviour),
            recorded: recorded.clone(),
        };

        let router = Router::new()
            .route("/CREBS/", get(login_page).post(login))
            .route("/CREBS/Booking/BookingList", get(booking_list))
            .route(&format!("/bot{}/sendMessage", BOT_TOKEN), post(send_message))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base_url: format!("http://{}/CREBS/", address),
            telegram_api: format!("http://{}", address),
            recorded,
        }
    }

    pub fn recorded<T>(&self, read: impl FnOnce(&Recorded) -> T) -> T {
        read(&self.recorded.lock().unwrap())
    }
}

pub fn fixture(name: &str) -> String {
    fs::read_to_string(format!("fixtures/{}", name)).expect("Failed to read fixture")
}

async fn login_page(State(state): State<AppState>) -> &'static str {
    state.recorded.lock().unwrap().warmups += 1;
    LOGIN_PAGE
}

async fn login(
    State(state): State<AppState>,
    Form(fields): Form<HashMap<String, String>>,
) -> Response {
    state.recorded.lock().unwrap().logins.push(fields);

    let behaviour = &state.behaviour;
    if behaviour.login_status != StatusCode::OK {
        return (behaviour.login_status, "Server Error").into_response();
    }

    let body = if behaviour.signed_in {
        behaviour.results_html.clone()
    } else {
        LOGIN_PAGE.to_string()
    };
    if behaviour.set_cookie {
        (
            [(header::SET_COOKIE, format!("{}; Path=/", SESSION_COOKIE))],
            body,
        )
            .into_response()
    } else {
        body.into_response()
    }
}

async fn booking_list(State(state): State<AppState>, headers: HeaderMap) -> Response {
    state.recorded.lock().unwrap().booking_requests += 1;

    let has_session = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.contains(SESSION_COOKIE));
    if !has_session {
        return (StatusCode::FORBIDDEN, "Session expired").into_response();
    }
    state.behaviour.bookings_html.clone().into_response()
}

async fn send_message(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    let text = payload["text"].as_str().unwrap_or_default().to_string();
    state.recorded.lock().unwrap().messages.push(text);
    Json(serde_json::json!({"ok": true}))
}
