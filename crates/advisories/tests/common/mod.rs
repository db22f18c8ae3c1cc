//! In-process stand-in for the advisory REST API.
//!
//! Every request is recorded so tests can assert that validation failures
//! never reach the network.
#![allow(dead_code)]

use advisories::model::Role;
use advisories::session::SessionStore;
use advisories::{AppContext, ClientConfig};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

pub const PASSWORD: &str = "secret";
pub const PROFESSOR_ID: i64 = 3;
pub const STUDENT_ID: i64 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub method: String,
    pub path: String,
    pub body: Value,
}

#[derive(Default)]
struct Data {
    advisories: Vec<Value>,
    windows: Vec<Value>,
    slots: HashMap<String, Vec<Value>>,
    next_id: i64,
}

#[derive(Default)]
pub struct MockState {
    calls: Mutex<Vec<Call>>,
    data: Mutex<Data>,
    pub fail_toggle: AtomicBool,
    pub fail_professors: AtomicBool,
    pub expire_sessions: AtomicBool,
    pub null_status_replies: AtomicBool,
}

pub struct MockBackend {
    pub base_url: String,
    pub state: Arc<MockState>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        seed(&state);

        let app = Router::new().fallback(handle).with_state(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}/api"),
            state,
        }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::for_base_url(self.base_url.clone())
    }

    pub async fn login(&self, role: Role) -> AppContext {
        let ctx = AppContext::login(
            self.config(),
            SessionStore::open_in_memory().unwrap(),
            email_for(role),
            PASSWORD,
            role,
        )
        .await
        .unwrap();
        ctx.load().await.unwrap();
        self.clear_calls();
        ctx
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.state.calls.lock().unwrap().clear();
    }

    /// Calls other than reads.
    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.method != "GET")
            .collect()
    }

    pub fn set_slots(&self, date: &str, slots: Vec<Value>) {
        self.state
            .data
            .lock()
            .unwrap()
            .slots
            .insert(date.to_string(), slots);
    }

    pub fn advisory(&self, id: i64) -> Option<Value> {
        self.state
            .data
            .lock()
            .unwrap()
            .advisories
            .iter()
            .find(|a| a["id"] == id)
            .cloned()
    }
}

pub fn email_for(role: Role) -> &'static str {
    match role {
        Role::Student => "ana@up.edu.mx",
        Role::Professor => "luis@up.edu.mx",
        Role::Director => "dir@up.edu.mx",
    }
}

fn user_json(role: Role) -> Value {
    match role {
        Role::Student => json!({
            "id": 10, "email": email_for(role), "name": "Ana López", "role": "student",
            "student": {"id": STUDENT_ID, "studentCode": "213456"}
        }),
        Role::Professor => json!({
            "id": 7, "email": email_for(role), "name": "Luis Pérez", "role": "professor",
            "professor": {"id": PROFESSOR_ID}
        }),
        Role::Director => json!({
            "id": 1, "email": email_for(role), "name": "Marta Díaz", "role": "director"
        }),
    }
}

fn token_for(role: Role) -> String {
    format!("tok-{}", role.as_str())
}

fn role_of_token(token: &str) -> Option<Role> {
    [Role::Student, Role::Professor, Role::Director]
        .into_iter()
        .find(|r| token_for(*r) == token)
}

fn seed(state: &MockState) {
    let mut data = state.data.lock().unwrap();
    let student = json!({"id": STUDENT_ID, "matricula": "213456", "user": {"name": "Ana López"}});
    let professor = json!({"id": PROFESSOR_ID, "user": {"name": "Luis Pérez"}});
    data.advisories = vec![
        json!({
            "id": 1, "studentId": STUDENT_ID, "professorId": PROFESSOR_ID,
            "student": student, "professor": professor,
            "date": "2030-01-07T00:00:00.000Z", "timeSlot": "09:00 - 10:00",
            "subject": "Cálculo", "topic": "Integrales", "type": "individual",
            "status": "pending", "createdAt": "2029-12-20T15:00:00.000Z"
        }),
        json!({
            "id": 2, "studentId": STUDENT_ID, "professorId": PROFESSOR_ID,
            "student": student, "professor": professor,
            "date": "2030-01-07", "timeSlot": "10:00 - 11:00",
            "subject": "Física", "topic": "Cinemática", "type": "grupal",
            "status": "accepted"
        }),
        json!({
            "id": 3, "studentId": 2, "professorId": PROFESSOR_ID,
            "student": {"id": 2, "user": {"name": "Beto Ruiz"}}, "professor": professor,
            "date": "2029-11-05", "timeSlot": "12:00 - 13:00",
            "subject": "Cálculo", "topic": "Límites", "type": "individual",
            "status": "completed", "observations": "Repasó límites laterales"
        }),
        json!({
            "id": 4, "studentId": 2, "professorId": 4, "studentName": "Beto Ruiz",
            "professorName": "Sofía Gil",
            "date": "2029-11-06", "timeSlot": "08:00 - 09:00",
            "subject": "Química", "topic": "Enlaces", "type": "individual",
            "status": "rejected", "rejectionReason": "Sin disponibilidad"
        }),
    ];
    data.windows = vec![
        json!({"id": 1, "dayOfWeek": "monday", "startTime": "09:00:00", "endTime": "10:00:00", "isAvailable": true}),
        json!({"id": 2, "dayOfWeek": "wednesday", "startTime": "14:00", "endTime": "16:00", "isAvailable": false}),
    ];
    data.next_id = 100;
}

fn ok(data: Value) -> Response {
    Json(json!({"success": true, "data": data})).into_response()
}

fn fail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"success": false, "message": message}))).into_response()
}

async fn handle(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().trim_start_matches("/api").to_string();
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    state.calls.lock().unwrap().push(Call {
        method: method.to_string(),
        path: path.clone(),
        body: body.clone(),
    });

    if method == Method::POST && path == "/auth/login" {
        let role = [Role::Student, Role::Professor, Role::Director]
            .into_iter()
            .find(|r| body["email"] == email_for(*r));
        return match role {
            Some(role) if body["password"] == PASSWORD => {
                ok(json!({"user": user_json(role), "token": token_for(role)}))
            }
            _ => fail(StatusCode::UNAUTHORIZED, "Invalid credentials"),
        };
    }

    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default();
    let Some(role) = role_of_token(token) else {
        return fail(StatusCode::UNAUTHORIZED, "Invalid token");
    };
    if state.expire_sessions.load(Ordering::SeqCst) {
        return fail(StatusCode::UNAUTHORIZED, "Token expired");
    }

    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    let mut data = state.data.lock().unwrap();

    match (method.as_str(), segments.as_slice()) {
        ("GET", ["auth", "me"]) => ok(user_json(role)),
        ("POST", ["auth", "logout"]) => Json(json!({"success": true})).into_response(),

        ("GET", ["advisories", "student", id]) => ok(Value::Array(
            data.advisories
                .iter()
                .filter(|a| a["studentId"].to_string() == *id)
                .cloned()
                .collect(),
        )),
        ("GET", ["advisories", "professor", id]) => ok(Value::Array(
            data.advisories
                .iter()
                .filter(|a| a["professorId"].to_string() == *id)
                .cloned()
                .collect(),
        )),
        ("GET", ["advisories", "history", "director"]) => ok(Value::Array(data.advisories.clone())),
        ("POST", ["advisories"]) => {
            data.next_id += 1;
            let mut record = body.clone();
            record["id"] = json!(data.next_id);
            record["status"] = json!("pending");
            record["studentId"] = json!(STUDENT_ID);
            data.advisories.push(record.clone());
            ok(record)
        }
        ("POST", ["advisories", "manual"]) => {
            data.next_id += 1;
            let mut record = body.clone();
            record["id"] = json!(data.next_id);
            record["professorId"] = json!(PROFESSOR_ID);
            data.advisories.push(record.clone());
            ok(record)
        }
        ("PUT", ["advisories", id, "status"]) => {
            let Some(record) = data
                .advisories
                .iter_mut()
                .find(|a| a["id"].to_string() == *id)
            else {
                return fail(StatusCode::NOT_FOUND, "Advisory not found");
            };
            for key in ["status", "date", "timeSlot", "rejectionReason"] {
                if !body[key].is_null() {
                    record[key] = body[key].clone();
                }
            }
            if state.null_status_replies.load(Ordering::SeqCst) {
                return Json(json!({"success": true, "data": null})).into_response();
            }
            // Partial echo without the nested profiles.
            ok(json!({
                "id": record["id"], "status": record["status"], "date": record["date"],
                "timeSlot": record["timeSlot"], "rejectionReason": record["rejectionReason"]
            }))
        }

        ("GET", ["schedules", "my-schedules"]) => ok(Value::Array(data.windows.clone())),
        ("POST", ["schedules"]) => {
            data.next_id += 1;
            let mut record = body.clone();
            record["id"] = json!(data.next_id);
            data.windows.push(record.clone());
            ok(record)
        }
        ("DELETE", ["schedules", id]) => {
            data.windows.retain(|w| w["id"].to_string() != *id);
            Json(json!({"success": true})).into_response()
        }
        ("PUT", ["schedules", id, "availability"]) => {
            if state.fail_toggle.load(Ordering::SeqCst) {
                return fail(StatusCode::INTERNAL_SERVER_ERROR, "Database unavailable");
            }
            match data.windows.iter_mut().find(|w| w["id"].to_string() == *id) {
                Some(window) => {
                    window["isAvailable"] = body["isAvailable"].clone();
                    ok(window.clone())
                }
                None => fail(StatusCode::NOT_FOUND, "Schedule not found"),
            }
        }
        ("GET", ["schedules", "available", _professor, date]) => {
            ok(Value::Array(data.slots.get(*date).cloned().unwrap_or_default()))
        }

        ("GET", ["users", "professors"]) => {
            if state.fail_professors.load(Ordering::SeqCst) {
                return fail(StatusCode::INTERNAL_SERVER_ERROR, "Directory unavailable");
            }
            ok(json!([
                {"id": PROFESSOR_ID, "name": "Luis Pérez"},
                {"id": 4, "name": "Sofía Gil"}
            ]))
        }

        ("GET", ["reports", "advisories"]) => {
            if role != Role::Director {
                return fail(StatusCode::FORBIDDEN, "Directors only");
            }
            let query = uri.query().unwrap_or_default().to_string();
            (StatusCode::OK, format!("%PDF-1.4 range {query}")).into_response()
        }
        ("GET", ["reports", "advisories", "complete"]) => {
            (StatusCode::OK, "%PDF-1.4 complete").into_response()
        }

        _ => fail(StatusCode::NOT_FOUND, "Route not found"),
    }
}
