#![allow(dead_code)]

use actix_multipart::Multipart;
use actix_web::dev::ServerHandle;
use actix_web::http::StatusCode;
use actix_web::{App, HttpResponse, HttpServer, web};
use agri_doctor::ClientConfig;
use futures::{StreamExt, TryStreamExt};
use serde_json::{Value, json};
use shared::ImageUpload;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const HEALTH: &str = "/health";
pub const PREDICT: &str = "/predict";
pub const CLASSES: &str = "/classes";
pub const DISEASE_INFO: &str = "/disease_info";
pub const BATCH_PREDICT: &str = "/batch_predict";
pub const ADD_DISEASE: &str = "/api/healthmap/add-disease";

#[derive(Clone)]
struct Reply {
    status: u16,
    body: Value,
    delay: Duration,
}

/// One multipart field as the service received it.
#[derive(Debug, Clone)]
pub struct RecordedField {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl RecordedField {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

#[derive(Default)]
struct State {
    replies: HashMap<&'static str, Reply>,
    hits: HashMap<&'static str, usize>,
    fields: Vec<RecordedField>,
    info_requests: Vec<(String, String)>,
    reports: Vec<Value>,
}

/// In-process stand-in for both the detection service and the CropAI backend.
#[derive(Clone)]
pub struct FakeService {
    state: Arc<Mutex<State>>,
}

impl FakeService {
    pub fn new() -> Self {
        let service = Self {
            state: Arc::new(Mutex::new(State::default())),
        };
        service.reply(HEALTH, 200, json!({ "status": "ok", "model_loaded": true }));
        service.reply(PREDICT, 200, late_blight());
        service.reply(
            CLASSES,
            200,
            json!({ "classes": ["Tomato___Late_blight", "Tomato___healthy"], "total_classes": 2 }),
        );
        service.reply(
            DISEASE_INFO,
            200,
            json!({
                "disease_info": {
                    "description": "Grey leaf spots with dark borders.",
                    "symptoms": ["Rectangular lesions"],
                    "solutions": ["Rotate crops"],
                    "prevention": ["Resistant hybrids"]
                },
                "supplement_info": null,
                "class_index": 7
            }),
        );
        service.reply(BATCH_PREDICT, 200, json!([]));
        service.reply(ADD_DISEASE, 200, json!({ "success": true }));
        service
    }

    pub fn reply(&self, route: &'static str, status: u16, body: Value) -> &Self {
        let mut state = self.state.lock().unwrap();
        let delay = state.replies.get(route).map(|r| r.delay).unwrap_or_default();
        state.replies.insert(route, Reply { status, body, delay });
        self
    }

    pub fn delay(&self, route: &'static str, delay: Duration) -> &Self {
        let mut state = self.state.lock().unwrap();
        if let Some(reply) = state.replies.get_mut(route) {
            reply.delay = delay;
        }
        self
    }

    pub fn hits(&self, route: &'static str) -> usize {
        self.state.lock().unwrap().hits.get(route).copied().unwrap_or(0)
    }

    pub fn fields(&self) -> Vec<RecordedField> {
        self.state.lock().unwrap().fields.clone()
    }

    pub fn info_requests(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().info_requests.clone()
    }

    pub fn reports(&self) -> Vec<Value> {
        self.state.lock().unwrap().reports.clone()
    }

    fn hit(&self, route: &'static str) -> Reply {
        let mut state = self.state.lock().unwrap();
        *state.hits.entry(route).or_insert(0) += 1;
        state.replies[route].clone()
    }

    async fn respond(&self, route: &'static str) -> HttpResponse {
        let reply = self.hit(route);
        if !reply.delay.is_zero() {
            actix_web::rt::time::sleep(reply.delay).await;
        }
        let status = StatusCode::from_u16(reply.status).unwrap();
        if reply.body.is_null() {
            HttpResponse::build(status).finish()
        } else {
            HttpResponse::build(status).json(reply.body)
        }
    }

    async fn record_multipart(&self, mut payload: Multipart) {
        while let Ok(Some(mut field)) = payload.try_next().await {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .map(str::to_string);
            let content_type = field.content_type().map(|mime| mime.to_string());

            let mut data = Vec::new();
            while let Some(chunk) = field.next().await {
                if let Ok(chunk) = chunk {
                    data.extend_from_slice(&chunk);
                }
            }

            self.state.lock().unwrap().fields.push(RecordedField {
                name,
                file_name,
                content_type,
                data,
            });
        }
    }
}

async fn health(service: web::Data<FakeService>) -> HttpResponse {
    service.respond(HEALTH).await
}

async fn predict(service: web::Data<FakeService>, payload: Multipart) -> HttpResponse {
    service.record_multipart(payload).await;
    service.respond(PREDICT).await
}

async fn classes(service: web::Data<FakeService>) -> HttpResponse {
    service.respond(CLASSES).await
}

async fn disease_info(
    service: web::Data<FakeService>,
    path: web::Path<(String, String)>,
) -> HttpResponse {
    service
        .state
        .lock()
        .unwrap()
        .info_requests
        .push(path.into_inner());
    service.respond(DISEASE_INFO).await
}

async fn batch_predict(service: web::Data<FakeService>, payload: Multipart) -> HttpResponse {
    service.record_multipart(payload).await;
    service.respond(BATCH_PREDICT).await
}

async fn add_disease(service: web::Data<FakeService>, report: web::Json<Value>) -> HttpResponse {
    service.state.lock().unwrap().reports.push(report.into_inner());
    service.respond(ADD_DISEASE).await
}

pub struct RunningService {
    pub url: String,
    handle: ServerHandle,
}

impl RunningService {
    pub async fn stop(self) {
        self.handle.stop(false).await;
    }
}

pub fn start(service: &FakeService) -> RunningService {
    let data = web::Data::new(service.clone());
    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .route(HEALTH, web::get().to(health))
            .route(PREDICT, web::post().to(predict))
            .route(CLASSES, web::get().to(classes))
            .route("/disease_info/{crop}/{disease}", web::get().to(disease_info))
            .route(BATCH_PREDICT, web::post().to(batch_predict))
            .route(ADD_DISEASE, web::post().to(add_disease))
    })
    .workers(1)
    .disable_signals()
    .bind(("127.0.0.1", 0))
    .unwrap();

    let addr = server.addrs()[0];
    let server = server.run();
    let handle = server.handle();
    actix_web::rt::spawn(server);

    RunningService {
        url: format!("http://{}", addr),
        handle,
    }
}

/// Client config pointing both services at the fake, with short timeouts.
pub fn config(url: &str) -> ClientConfig {
    ClientConfig {
        disease_api_url: url.to_string(),
        backend_url: url.to_string(),
        health_timeout: Duration::from_millis(500),
        request_timeout: Duration::from_secs(2),
        metadata_timeout: Duration::from_millis(500),
        report_timeout: Duration::from_millis(500),
    }
}

pub fn late_blight() -> Value {
    json!({
        "predicted_class": "Tomato___Late_blight",
        "crop": "Tomato",
        "confidence": 0.912,
        "risk_assessment": {
            "overall_risk": "High",
            "risk_factors": ["Humidity above 80%"],
            "recommendations": ["Remove infected leaves", "Apply copper fungicide"]
        },
        "disease_info": {
            "description": "Late blight spreads fast in cool, wet weather.",
            "symptoms": "Dark water-soaked lesions\nWhite mould under leaves",
            "solutions": ["Apply copper fungicide"],
            "prevention": ["Avoid overhead irrigation"]
        },
        "class_probabilities": {
            "Tomato___Late_blight": 0.912,
            "Tomato___Early_blight": 0.06,
            "Tomato___healthy": 0.028
        },
        "explanation": {
            "explanation_image": "aGVhdG1hcA==",
            "attention_regions": [[10, 20, 30, 40]]
        }
    })
}

/// A JPEG-tagged upload whose bytes start with the JPEG magic number.
pub fn leaf_image(size: usize) -> ImageUpload {
    let mut bytes = vec![0u8; size];
    bytes[..3].copy_from_slice(&[0xFF, 0xD8, 0xFF]);
    ImageUpload::new("leaf.jpg", "image/jpeg", bytes)
}
