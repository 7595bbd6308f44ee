use std::time::Instant;

use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, web};
use futures::{StreamExt, TryStreamExt};
use log::{debug, info, warn};
use model::{
    PredictErr,
    audit::{AuditRecord, unix_ts},
};

use crate::{
    state::AppState,
    types::{
        Detail, FEATURE_ORDER, HealthResponse, MetadataResponse, PredictRequest, PredictResponse,
    },
};

const API_KEY_HEADER: &str = "X-API-KEY";

fn authorized(req: &HttpRequest, expected: &str) -> bool {
    req.headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        == Some(expected)
}

fn forbidden() -> HttpResponse {
    HttpResponse::Forbidden().json(Detail {
        detail: "Invalid API key".to_string(),
    })
}

/// `GET /api/metadata` - the current location list and the fixed numeric
/// feature ordering.
pub async fn metadata(state: web::Data<AppState>) -> HttpResponse {
    let bundle = state.predictor.store().snapshot();
    let locations = bundle
        .schema
        .map(|schema| schema.location_columns().to_vec())
        .unwrap_or_default();

    HttpResponse::Ok().json(MetadataResponse {
        locations,
        feature_order: FEATURE_ORDER,
    })
}

/// `POST /api/predict` - serves one prediction and records the event.
pub async fn predict(state: web::Data<AppState>, body: web::Json<PredictRequest>) -> HttpResponse {
    let req = body.into_inner();
    if let Err(detail) = req.validate() {
        return HttpResponse::UnprocessableEntity().json(Detail { detail });
    }

    let start = Instant::now();
    let prediction = match state
        .predictor
        .predict(req.total_sqft, req.bhk, req.bath, &req.location)
    {
        Ok(prediction) => prediction,
        Err(PredictErr::ModelUnavailable) => {
            warn!("predict requested with no model loaded");
            return HttpResponse::InternalServerError().json(Detail {
                detail: "Model not loaded on server".to_string(),
            });
        }
        Err(e) => {
            warn!("prediction failed: {e}");
            return HttpResponse::InternalServerError().json(Detail {
                detail: e.to_string(),
            });
        }
    };
    let latency_s = start.elapsed().as_secs_f64();

    let record = AuditRecord {
        event: "predict",
        ts: unix_ts(),
        model_version: &prediction.model_version,
        input: &req,
        prediction: prediction.value,
        latency_s,
    };
    if let Ok(line) = serde_json::to_string(&record) {
        info!("{line}");
    }
    state.audit.record(&record);

    HttpResponse::Ok().json(PredictResponse {
        predicted_price_lakhs: prediction.value,
        model_version: prediction.model_version,
        input: req,
    })
}

/// `GET /healthz` - liveness plus model status, behind the shared secret.
pub async fn healthz(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    if !authorized(&req, &state.admin_api_key) {
        return forbidden();
    }

    let ok = state.predictor.store().model_loaded();
    HttpResponse::Ok().json(HealthResponse {
        ok,
        model_loaded: ok,
        model_version: state.predictor.store().model_version(),
    })
}

/// `POST /admin/upload` - accepts optional `model_file` / `columns_file`
/// multipart parts and runs the swap protocol.
pub async fn admin_upload(
    req: HttpRequest,
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> HttpResponse {
    if !authorized(&req, &state.admin_api_key) {
        return forbidden();
    }

    let mut model_bytes: Option<Vec<u8>> = None;
    let mut schema_bytes: Option<Vec<u8>> = None;

    loop {
        let mut field = match payload.try_next().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!("malformed multipart payload: {e}");
                return HttpResponse::BadRequest().json(Detail {
                    detail: e.to_string(),
                });
            }
        };

        let name = field
            .content_disposition()
            .get_name()
            .unwrap_or_default()
            .to_string();

        let mut buf = Vec::new();
        while let Some(chunk) = field.next().await {
            match chunk {
                Ok(bytes) => buf.extend_from_slice(&bytes),
                Err(e) => {
                    warn!("upload stream error: {e}");
                    return HttpResponse::BadRequest().json(Detail {
                        detail: e.to_string(),
                    });
                }
            }
        }

        match name.as_str() {
            "model_file" => model_bytes = Some(buf),
            "columns_file" => schema_bytes = Some(buf),
            other => debug!("ignoring unknown upload field '{other}'"),
        }
    }

    match state
        .predictor
        .swap(model_bytes.as_deref(), schema_bytes.as_deref())
    {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => {
            warn!("cannot persist uploaded artifacts: {e}");
            HttpResponse::InternalServerError().json(Detail {
                detail: e.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{App, http::StatusCode, test};
    use model::{ArtifactStore, Predictor, artifacts::ArtifactPaths, audit::AuditSink};
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    const TEST_KEY: &str = "testkey";

    fn state_in(dir: &TempDir) -> web::Data<AppState> {
        let paths = ArtifactPaths {
            model: dir.path().join("home_prices_model.json"),
            columns: dir.path().join("columns.json"),
            scaler: dir.path().join("scaler.json"),
        };

        web::Data::new(AppState {
            predictor: Predictor::new(ArtifactStore::new(paths)),
            audit: AuditSink::new(false, dir.path().join("audit_log.txt")),
            admin_api_key: TEST_KEY.to_string(),
        })
    }

    fn seed_artifacts(dir: &TempDir) {
        let schema = json!({
            "data_columns": ["total_sqft", "bath", "bhk", "whitefield", "hsr layout"]
        });
        std::fs::write(dir.path().join("columns.json"), schema.to_string()).unwrap();

        let model = json!({ "coefficients": [0.1, 1.0, 2.0, 5.0, 7.0], "intercept": 3.0 });
        std::fs::write(dir.path().join("home_prices_model.json"), model.to_string()).unwrap();
    }

    macro_rules! test_app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data($state.clone())
                    .route("/api/metadata", web::get().to(metadata))
                    .route("/api/predict", web::post().to(predict))
                    .route("/healthz", web::get().to(healthz))
                    .route("/admin/upload", web::post().to(admin_upload)),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_metadata_lists_locations() {
        let dir = TempDir::new().unwrap();
        seed_artifacts(&dir);
        let state = state_in(&dir);
        state.predictor.store().ensure_ready();
        let app = test_app!(state);

        let req = test::TestRequest::get().uri("/api/metadata").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["locations"], json!(["whitefield", "hsr layout"]));
        assert_eq!(body["feature_order"], json!(["total_sqft", "bath", "bhk"]));
    }

    #[actix_web::test]
    async fn test_predict_round_trip() {
        let dir = TempDir::new().unwrap();
        seed_artifacts(&dir);
        let app = test_app!(state_in(&dir));

        let req = test::TestRequest::post()
            .uri("/api/predict")
            .set_json(json!({
                "total_sqft": 1200.0, "bhk": 3, "bath": 2, "location": "HSR Layout"
            }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        // vector [1200, 2, 3, 0, 1] -> 120 + 2 + 6 + 7 + 3
        assert_eq!(body["predicted_price_lakhs"], json!(138.0));
        assert_eq!(body["model_version"], json!("home_prices_model.json"));
        assert_eq!(body["input"]["location"], json!("HSR Layout"));
    }

    #[actix_web::test]
    async fn test_predict_rejects_out_of_range_inputs() {
        let dir = TempDir::new().unwrap();
        seed_artifacts(&dir);
        let app = test_app!(state_in(&dir));

        for bad in [
            json!({ "total_sqft": 0.0, "bhk": 2, "bath": 2, "location": "x" }),
            json!({ "total_sqft": 1200.0, "bhk": 11, "bath": 2, "location": "x" }),
            json!({ "total_sqft": 1200.0, "bhk": 2, "bath": 11, "location": "x" }),
        ] {
            let req = test::TestRequest::post()
                .uri("/api/predict")
                .set_json(&bad)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY, "{bad}");
        }

        // Boundary: barely positive area is accepted.
        let req = test::TestRequest::post()
            .uri("/api/predict")
            .set_json(json!({ "total_sqft": 0.01, "bhk": 2, "bath": 2, "location": "x" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_predict_without_model_is_server_error() {
        let dir = TempDir::new().unwrap();
        let app = test_app!(state_in(&dir));

        let req = test::TestRequest::post()
            .uri("/api/predict")
            .set_json(json!({ "total_sqft": 1200.0, "bhk": 2, "bath": 2, "location": "x" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["detail"], json!("Model not loaded on server"));
    }

    #[actix_web::test]
    async fn test_healthz_requires_shared_secret() {
        let dir = TempDir::new().unwrap();
        seed_artifacts(&dir);
        let state = state_in(&dir);
        state.predictor.store().ensure_ready();
        let app = test_app!(state);

        let req = test::TestRequest::get()
            .uri("/healthz")
            .insert_header((API_KEY_HEADER, "wrong"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::get()
            .uri("/healthz")
            .insert_header((API_KEY_HEADER, TEST_KEY))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["ok"], json!(true));
        assert_eq!(body["model_loaded"], json!(true));
        assert_eq!(body["model_version"], json!("home_prices_model.json"));
    }

    fn multipart_body(boundary: &str, parts: &[(&str, &str)]) -> String {
        let mut body = String::new();
        for (name, content) in parts {
            body.push_str(&format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"; \
                 filename=\"{name}.json\"\r\nContent-Type: application/json\r\n\r\n{content}\r\n"
            ));
        }
        body.push_str(&format!("--{boundary}--\r\n"));
        body
    }

    #[actix_web::test]
    async fn test_admin_upload_requires_shared_secret() {
        let dir = TempDir::new().unwrap();
        let app = test_app!(state_in(&dir));

        let req = test::TestRequest::post()
            .uri("/admin/upload")
            .insert_header((
                actix_web::http::header::CONTENT_TYPE,
                "multipart/form-data; boundary=frame",
            ))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_admin_upload_rejects_malformed_multipart() {
        let dir = TempDir::new().unwrap();
        let app = test_app!(state_in(&dir));

        // A part with no Content-Disposition is a protocol error.
        let body = "--frame\r\nContent-Type: application/json\r\n\r\n{}\r\n--frame--\r\n";

        let req = test::TestRequest::post()
            .uri("/admin/upload")
            .insert_header((API_KEY_HEADER, TEST_KEY))
            .insert_header((
                actix_web::http::header::CONTENT_TYPE,
                "multipart/form-data; boundary=frame",
            ))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        // The swap never ran: nothing was persisted.
        assert!(!dir.path().join("home_prices_model.json").exists());
    }

    #[actix_web::test]
    async fn test_admin_upload_swaps_and_serves_new_model() {
        let dir = TempDir::new().unwrap();
        let app = test_app!(state_in(&dir));

        let schema = json!({ "data_columns": ["total_sqft", "bath", "bhk", "whitefield"] });
        let new_model = json!({ "coefficients": [1.0, 1.0, 1.0, 1.0], "intercept": 0.0 });
        let body = multipart_body(
            "frame",
            &[
                ("model_file", &new_model.to_string()),
                ("columns_file", &schema.to_string()),
            ],
        );

        let req = test::TestRequest::post()
            .uri("/admin/upload")
            .insert_header((API_KEY_HEADER, TEST_KEY))
            .insert_header((
                actix_web::http::header::CONTENT_TYPE,
                "multipart/form-data; boundary=frame",
            ))
            .set_payload(body)
            .to_request();
        let report: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(report["saved"], json!(["model", "columns"]));
        assert_eq!(report["model_loaded"], json!(true));
        assert!(report.get("error").is_none());

        let req = test::TestRequest::post()
            .uri("/api/predict")
            .set_json(
                json!({ "total_sqft": 1000.0, "bhk": 2, "bath": 2, "location": "whitefield" }),
            )
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["predicted_price_lakhs"], json!(1005.0));
    }

    #[actix_web::test]
    async fn test_admin_upload_reports_failed_canary() {
        let dir = TempDir::new().unwrap();
        let state = state_in(&dir);
        seed_artifacts(&dir);
        let app = test_app!(state);

        // Parses fine, but too narrow for the 5-column schema on disk.
        let bad_model = json!({ "coefficients": [1.0, 1.0], "intercept": 0.0 });
        let body = multipart_body("frame", &[("model_file", &bad_model.to_string())]);

        let req = test::TestRequest::post()
            .uri("/admin/upload")
            .insert_header((API_KEY_HEADER, TEST_KEY))
            .insert_header((
                actix_web::http::header::CONTENT_TYPE,
                "multipart/form-data; boundary=frame",
            ))
            .set_payload(body)
            .to_request();
        let report: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(report["saved"], json!(["model"]));
        assert_eq!(report["model_loaded"], json!(false));
        assert!(report["error"].as_str().unwrap().contains("width mismatch"));
    }
}
