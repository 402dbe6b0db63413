//! Single binary web server: HTML from templates/, static from /static, API via REST.
//! Run with: cargo run --bin web
//! Listens on 0.0.0.0:8080 by default. See `raffle_draw_web::config` for the
//! environment variables (admin password, predetermined winner, cookie secret).

use actix_files::Files;
use actix_session::config::PersistentSession;
use actix_session::storage::CookieSessionStore;
use actix_session::{Session, SessionMiddleware};
use actix_web::{
    cookie::{time, Key},
    delete, get, http::header, post,
    web::{self, Data, Json, Path, Query},
    App, HttpResponse, HttpServer, Responder,
};
use chrono::{TimeZone, Utc};
use raffle_draw_web::logic::EffectLog;
use raffle_draw_web::{
    AppConfig, DrawMachine, Registration, RegistrationError, Registry, StaticWinnerSource,
    TokioScheduler,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Session key holding the admin token.
const ADMIN_SESSION_KEY: &str = "admin-auth";

/// How long an admin login stays valid.
const ADMIN_TOKEN_TTL_HOURS: i64 = 48;

/// Draw sessions not polled for this long are dropped (timers cancelled).
const DRAW_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(2 * 3600);

/// One open draw view: its machine plus the effect cues waiting for the browser.
struct DrawEntry {
    machine: DrawMachine,
    effects: Arc<EffectLog>,
    last_activity: Instant,
}

/// Shared server state. Registrants live in memory; draws are never persisted.
struct AppState {
    config: AppConfig,
    registry: RwLock<Registry>,
    draws: RwLock<HashMap<Uuid, DrawEntry>>,
}

type State = Data<AppState>;

/// Stateless admin capability: authenticated flag plus expiry (unix millis).
#[derive(Debug, Serialize, Deserialize)]
struct AdminToken {
    authenticated: bool,
    expires: i64,
    timestamp: i64,
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

#[derive(Deserialize)]
struct LoginBody {
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WinnerIdBody {
    #[serde(default)]
    winner_id: Option<String>,
}

#[derive(Deserialize)]
struct DrawPath {
    id: Uuid,
}

#[derive(Deserialize)]
struct SnapshotQuery {
    /// Last effect cue sequence the client has played.
    #[serde(default)]
    after: u64,
}

fn fail(mut builder: actix_web::HttpResponseBuilder, message: impl Into<String>) -> HttpResponse {
    builder.json(serde_json::json!({ "success": false, "message": message.into() }))
}

fn lock_error() -> HttpResponse {
    fail(HttpResponse::InternalServerError(), "lock error")
}

/// Valid, unexpired admin token in the session, if any.
fn admin_token(session: &Session) -> Option<AdminToken> {
    session
        .get::<AdminToken>(ADMIN_SESSION_KEY)
        .ok()
        .flatten()
        .filter(|t| t.authenticated && t.expires > Utc::now().timestamp_millis())
}

/// Gate for admin routes. Clears a stale or malformed token on the way out.
fn require_admin(session: &Session) -> Result<(), HttpResponse> {
    if admin_token(session).is_some() {
        return Ok(());
    }
    session.remove(ADMIN_SESSION_KEY);
    Err(fail(HttpResponse::Unauthorized(), "Admin login required"))
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "raffle-draw-web",
    })
}

/// Avoid 404 in browser tab: favicon not required for app logic.
#[get("/favicon.ico")]
async fn favicon() -> HttpResponse {
    HttpResponse::NoContent().finish()
}

/// Register a visitor for the raffle.
#[post("/api/participants")]
async fn api_register(state: State, body: Json<Registration>) -> HttpResponse {
    let mut registry = match state.registry.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match registry.register(&body) {
        Ok(candidate) => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "message": "You are registered for the raffle. Good luck!",
            "data": candidate,
        })),
        Err(e @ RegistrationError::DuplicateEmail) => fail(HttpResponse::Conflict(), e.to_string()),
        Err(e) => fail(HttpResponse::BadRequest(), e.to_string()),
    }
}

/// List registrants (admin only).
#[get("/api/participants")]
async fn api_list_participants(state: State, session: Session) -> HttpResponse {
    if let Err(resp) = require_admin(&session) {
        return resp;
    }
    let registry = match state.registry.read() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    let message = format!("{} participants registered", registry.len());
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": message,
        "data": {
            "participants": registry.candidates(),
            "total": registry.len(),
            "message": message,
        },
    }))
}

/// Configured predetermined winner id, or null for a fully random draw (admin only).
#[get("/api/predetermined-winner")]
async fn api_get_predetermined_winner(state: State, session: Session) -> HttpResponse {
    if let Err(resp) = require_admin(&session) {
        return resp;
    }
    let winner_id = state.config.predetermined_winner_id.as_deref();
    let message = match winner_id {
        Some(_) => "Predetermined winner active",
        None => "No predetermined winner configured - drawing at random",
    };
    HttpResponse::Ok().json(serde_json::json!({ "winnerId": winner_id, "message": message }))
}

/// The winner id is environment configuration; this only acknowledges the request.
#[post("/api/predetermined-winner")]
async fn api_set_predetermined_winner(
    state: State,
    session: Session,
    body: Json<WinnerIdBody>,
) -> HttpResponse {
    if let Err(resp) = require_admin(&session) {
        return resp;
    }
    let requested = body
        .winner_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());
    match requested {
        Some(requested) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Configuration noted (restart the server with PREDETERMINED_WINNER_ID to apply)",
            "currentWinnerId": state.config.predetermined_winner_id,
            "requestedWinnerId": requested,
        })),
        None => fail(HttpResponse::BadRequest(), "Winner id required"),
    }
}

/// Admin login: compares against ADMIN_PASSWORD and stores a 48h token in the cookie session.
#[post("/api/admin/auth")]
async fn api_admin_login(state: State, session: Session, body: Json<LoginBody>) -> HttpResponse {
    let Some(expected) = state.config.admin_password.as_deref() else {
        log::error!("ADMIN_PASSWORD is not configured");
        return fail(HttpResponse::InternalServerError(), "Server configuration error");
    };
    if body.password != expected {
        return fail(HttpResponse::Unauthorized(), "Wrong password");
    }
    let now = Utc::now();
    let expires = now + chrono::Duration::hours(ADMIN_TOKEN_TTL_HOURS);
    let token = AdminToken {
        authenticated: true,
        expires: expires.timestamp_millis(),
        timestamp: now.timestamp_millis(),
    };
    session.renew();
    if let Err(e) = session.insert(ADMIN_SESSION_KEY, &token) {
        log::error!("Could not store admin session: {e}");
        return fail(HttpResponse::InternalServerError(), "Internal server error");
    }
    log::info!("Admin logged in");
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Authenticated",
        "expiresAt": Utc.timestamp_millis_opt(token.expires).single().map(|t| t.to_rfc3339()),
    }))
}

#[delete("/api/admin/auth")]
async fn api_admin_logout(session: Session) -> HttpResponse {
    session.purge();
    HttpResponse::Ok().json(serde_json::json!({ "success": true, "message": "Logged out" }))
}

/// Open a draw over the current registrants. The predetermined winner is resolved once, here.
#[post("/api/draw/sessions")]
async fn api_open_draw(state: State, session: Session) -> HttpResponse {
    if let Err(resp) = require_admin(&session) {
        return resp;
    }
    let candidates = match state.registry.read() {
        Ok(guard) => guard.candidates().to_vec(),
        Err(_) => return lock_error(),
    };
    let effects = Arc::new(EffectLog::new());
    let machine = DrawMachine::builder(candidates, Arc::new(TokioScheduler::current()))
        .effects(effects.clone())
        .timing(state.config.draw.clone())
        .build();
    machine
        .open(&StaticWinnerSource(state.config.predetermined_winner_id.clone()))
        .await;

    let id = Uuid::new_v4();
    let snapshot = machine.snapshot();
    let mut draws = match state.draws.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    draws.insert(
        id,
        DrawEntry {
            machine,
            effects,
            last_activity: Instant::now(),
        },
    );
    HttpResponse::Ok().json(serde_json::json!({ "id": id, "snapshot": snapshot, "effects": [] }))
}

/// Current draw snapshot plus effect cues newer than `after`. Polling keeps the session alive.
#[get("/api/draw/sessions/{id}")]
async fn api_get_draw(
    state: State,
    session: Session,
    path: Path<DrawPath>,
    query: Query<SnapshotQuery>,
) -> HttpResponse {
    if let Err(resp) = require_admin(&session) {
        return resp;
    }
    let mut draws = match state.draws.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match draws.get_mut(&path.id) {
        Some(entry) => {
            entry.last_activity = Instant::now();
            HttpResponse::Ok().json(serde_json::json!({
                "id": path.id,
                "snapshot": entry.machine.snapshot(),
                "effects": entry.effects.since(query.after),
            }))
        }
        None => fail(HttpResponse::NotFound(), "No draw session"),
    }
}

/// Pull the lever. Busy, finished or empty draws ignore the request (`started: false`).
#[post("/api/draw/sessions/{id}/start")]
async fn api_start_draw(state: State, session: Session, path: Path<DrawPath>) -> HttpResponse {
    if let Err(resp) = require_admin(&session) {
        return resp;
    }
    let mut draws = match state.draws.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match draws.get_mut(&path.id) {
        Some(entry) => {
            entry.last_activity = Instant::now();
            let started = entry.machine.start_draw();
            HttpResponse::Ok().json(serde_json::json!({
                "id": path.id,
                "started": started,
                "snapshot": entry.machine.snapshot(),
            }))
        }
        None => fail(HttpResponse::NotFound(), "No draw session"),
    }
}

/// Close the draw view: pending timers are cancelled and the session is discarded.
#[delete("/api/draw/sessions/{id}")]
async fn api_close_draw(state: State, session: Session, path: Path<DrawPath>) -> HttpResponse {
    if let Err(resp) = require_admin(&session) {
        return resp;
    }
    let mut draws = match state.draws.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match draws.remove(&path.id) {
        Some(entry) => {
            entry.machine.close();
            HttpResponse::Ok().json(serde_json::json!({ "success": true, "message": "Draw closed" }))
        }
        None => fail(HttpResponse::NotFound(), "No draw session"),
    }
}

async fn serve_index() -> HttpResponse {
    html(include_str!("../../templates/index.html"))
}

async fn serve_login() -> HttpResponse {
    html(include_str!("../../templates/login.html"))
}

/// Draw page; without an admin token, redirect to the login page.
async fn serve_draw(session: Session) -> HttpResponse {
    if admin_token(&session).is_none() {
        session.remove(ADMIN_SESSION_KEY);
        return HttpResponse::Found()
            .insert_header((header::LOCATION, "/admin/login?redirect=/admin/draw"))
            .finish();
    }
    html(include_str!("../../templates/draw.html"))
}

fn html(body: &'static str) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body)
}

fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(serve_index))
        .route("/admin/login", web::get().to(serve_login))
        .route("/admin/draw", web::get().to(serve_draw))
        .service(api_health)
        .service(favicon)
        .service(api_register)
        .service(api_list_participants)
        .service(api_get_predetermined_winner)
        .service(api_set_predetermined_winner)
        .service(api_admin_login)
        .service(api_admin_logout)
        .service(api_open_draw)
        .service(api_get_draw)
        .service(api_start_draw)
        .service(api_close_draw);
}

fn session_middleware(key: Key, secure: bool) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name(ADMIN_SESSION_KEY.to_string())
        .cookie_secure(secure)
        .session_lifecycle(
            PersistentSession::default().session_ttl(time::Duration::hours(ADMIN_TOKEN_TTL_HOURS)),
        )
        .build()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    if config.admin_password.is_none() {
        log::warn!("ADMIN_PASSWORD is not set; admin login is disabled");
    }
    let key = match &config.session_secret {
        Some(secret) => Key::from(secret.as_slice()),
        None => Key::generate(),
    };
    let secure = config.cookie_secure;
    let bind = (config.host.clone(), config.port);
    log::info!("Starting server at http://{}:{}", bind.0, bind.1);

    let state = Data::new(AppState {
        config,
        registry: RwLock::new(Registry::new()),
        draws: RwLock::new(HashMap::new()),
    });

    // Background task: every 10 minutes, drop draw sessions nobody polled for 2 hours
    let state_cleanup = state.clone();
    actix_web::rt::spawn(async move {
        let mut interval = actix_web::rt::time::interval(Duration::from_secs(10 * 60));
        loop {
            interval.tick().await;
            let mut draws = match state_cleanup.draws.write() {
                Ok(guard) => guard,
                Err(_) => continue,
            };
            let before = draws.len();
            draws.retain(|_, entry| entry.last_activity.elapsed() < DRAW_INACTIVITY_TIMEOUT);
            let removed = before - draws.len();
            if removed > 0 {
                log::info!("Cleaned up {} inactive draw session(s)", removed);
            }
        }
    });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(session_middleware(key.clone(), secure))
            .configure(configure)
            .service(Files::new("/static", "static").show_files_listing())
    })
    .bind(bind)?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test};

    fn test_state(password: Option<&str>, winner: Option<&str>) -> State {
        let mut config = AppConfig::from_lookup(|_| None).unwrap();
        config.admin_password = password.map(str::to_string);
        config.predetermined_winner_id = winner.map(str::to_string);
        Data::new(AppState {
            config,
            registry: RwLock::new(Registry::new()),
            draws: RwLock::new(HashMap::new()),
        })
    }

    macro_rules! test_app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data($state.clone())
                    .wrap(session_middleware(Key::generate(), false))
                    .configure(configure),
            )
            .await
        };
    }

    fn register_body(email: &str, name: &str) -> serde_json::Value {
        serde_json::json!({ "email": email, "fullName": name })
    }

    #[actix_web::test]
    async fn registration_validates_and_rejects_duplicates() {
        let state = test_state(None, None);
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/api/participants")
            .set_json(register_body("ana@example.com", "Ana Díaz"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri("/api/participants")
            .set_json(register_body("ANA@example.com", "Ana Torres"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::post()
            .uri("/api/participants")
            .set_json(register_body("bad", "Bo"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/participants")
            .set_json(register_body("beto@example.com", "Beto"))
            .to_request();
        let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp["success"], false);
        assert_eq!(resp["message"], "Please enter your first and last name");
        assert_eq!(state.registry.read().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn admin_routes_need_a_login() {
        let state = test_state(Some("s3cret"), Some("C3"));
        let app = test_app!(state);

        let req = test::TestRequest::get().uri("/api/participants").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get().uri("/admin/draw").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);

        let req = test::TestRequest::post()
            .uri("/api/admin/auth")
            .set_json(serde_json::json!({ "password": "wrong" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn login_page_only_redirects_to_local_paths() {
        let state = test_state(Some("s3cret"), None);
        let app = test_app!(state);
        let req = test::TestRequest::get().uri("/admin/login").to_request();
        let body = test::call_and_read_body(&app, req).await;
        let page = std::str::from_utf8(&body).unwrap();
        assert!(page.contains("!target.startsWith('//')"));
    }

    #[actix_web::test]
    async fn login_then_open_and_start_a_draw() {
        let state = test_state(Some("s3cret"), None);
        {
            let mut registry = state.registry.write().unwrap();
            for (email, name) in [("a@example.com", "Ana Díaz"), ("b@example.com", "Beto Ruiz"), ("c@example.com", "Caro Vega")] {
                registry
                    .register(&Registration {
                        email: email.into(),
                        full_name: name.into(),
                        phone: None,
                    })
                    .unwrap();
            }
        }
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/api/admin/auth")
            .set_json(serde_json::json!({ "password": "s3cret" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let cookie = resp
            .response()
            .cookies()
            .find(|c| c.name() == ADMIN_SESSION_KEY)
            .expect("session cookie")
            .into_owned();

        let req = test::TestRequest::get()
            .uri("/api/participants")
            .cookie(cookie.clone())
            .to_request();
        let listed: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(listed["data"]["total"], 3);
        assert_eq!(listed["data"]["participants"][1]["fullName"], "Beto Ruiz");

        let req = test::TestRequest::get()
            .uri("/admin/draw")
            .cookie(cookie.clone())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = test::read_body(resp).await;
        let page = std::str::from_utf8(&body).unwrap();
        assert!(page.contains("fetch('/api/participants')"));
        assert!(page.contains("participant-filter"));
        assert!(!page.contains("sendBeacon"));

        let req = test::TestRequest::post()
            .uri("/api/draw/sessions")
            .cookie(cookie.clone())
            .to_request();
        let opened: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(opened["snapshot"]["round"], 1);
        assert_eq!(opened["snapshot"]["canStart"], true);
        assert_eq!(opened["snapshot"]["remaining"].as_array().unwrap().len(), 3);
        let id = opened["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri(&format!("/api/draw/sessions/{id}/start"))
            .cookie(cookie.clone())
            .to_request();
        let started: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(started["started"], true);
        assert_eq!(started["snapshot"]["isSpinning"], true);

        let req = test::TestRequest::post()
            .uri(&format!("/api/draw/sessions/{id}/start"))
            .cookie(cookie.clone())
            .to_request();
        let again: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(again["started"], false);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/draw/sessions/{id}"))
            .cookie(cookie)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        assert!(state.draws.read().unwrap().is_empty());
    }
}
