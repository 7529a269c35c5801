//! End-to-end tests for stock entry creation and listing against a mock store.

mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp, API_KEY, ENTRADAS_TABLE};
use serde_json::json;
use wiremock::matchers::{
    bearer_token, body_json, method, path, query_param, query_param_is_missing,
};
use wiremock::{Mock, ResponseTemplate};

fn entradas_path() -> String {
    TestApp::table_path(ENTRADAS_TABLE)
}

#[tokio::test]
async fn single_entry_is_created_and_reported() {
    let app = TestApp::new().await;

    Mock::given(method("POST"))
        .and(path(entradas_path()))
        .and(bearer_token(API_KEY))
        .and(body_json(json!({
            "records": [{
                "fields": {
                    "Insumos Laboratorio": ["rec123"],
                    "Cantidad Ingresa Unidades": 5,
                    "Realiza Registro": "Laura Gómez"
                }
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [{
                "id": "recNew1",
                "createdTime": "2025-02-10T14:00:00.000Z",
                "fields": {
                    "Insumos Laboratorio": ["rec123"],
                    "Cantidad Ingresa Unidades": 5,
                    "Realiza Registro": "Laura Gómez"
                }
            }]
        })))
        .expect(1)
        .mount(&app.store)
        .await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/entrada-insumos",
            Some(json!({
                "records": [{"fields": {"Insumos Laboratorio": ["rec123"], "Cantidad Ingresa Unidades": 5}}],
                "proveedor": "Merck",
                "numeroFactura": "F-0091"
            })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Se crearon 1 registros de entrada");
    assert_eq!(body["data"]["records"][0]["id"], "recNew1");
    assert_eq!(body["proveedor"], "Merck");
    assert_eq!(body["numeroFactura"], "F-0091");
    assert!(body["observaciones"].is_null());
}

#[tokio::test]
async fn caller_supplied_registrant_and_expiry_are_kept() {
    let app = TestApp::new().await;

    Mock::given(method("POST"))
        .and(path(entradas_path()))
        .and(body_json(json!({
            "records": [
                {"fields": {
                    "Insumos Laboratorio": ["recA"],
                    "Cantidad Ingresa Unidades": 2.5,
                    "Realiza Registro": "Pedro",
                    "fecha_vencimiento": "2026-01-15"
                }},
                {"fields": {
                    "Insumos Laboratorio": ["recB"],
                    "Cantidad Ingresa Unidades": 10,
                    "Realiza Registro": "Laura Gómez"
                }}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [
                {"id": "rec1", "fields": {}},
                {"id": "rec2", "fields": {}}
            ]
        })))
        .expect(1)
        .mount(&app.store)
        .await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/entrada-insumos",
            Some(json!({
                "records": [
                    {"fields": {
                        "Insumos Laboratorio": ["recA"],
                        "Cantidad Ingresa Unidades": 2.5,
                        "Realiza Registro": "Pedro",
                        "fecha_vencimiento": "2026-01-15"
                    }},
                    {"fields": {"Insumos Laboratorio": ["recB"], "Cantidad Ingresa Unidades": 10}}
                ]
            })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Se crearon 2 registros de entrada");
}

#[tokio::test]
async fn empty_batch_is_rejected_before_any_store_call() {
    let app = TestApp::new().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.store)
        .await;

    let response = app
        .request_authenticated(Method::POST, "/api/entrada-insumos", Some(json!({"records": []})))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Se requiere al menos un registro de entrada");
    assert!(body["request_id"].is_string());
}

#[tokio::test]
async fn one_bad_record_blocks_the_batch() {
    let app = TestApp::new().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.store)
        .await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/entrada-insumos",
            Some(json!({
                "records": [
                    {"fields": {"Insumos Laboratorio": ["rec1"], "Cantidad Ingresa Unidades": 3}},
                    {"fields": {"Insumos Laboratorio": [], "Cantidad Ingresa Unidades": 3}}
                ]
            })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(
        body["error"],
        "Cada registro debe tener al menos un insumo en Insumos Laboratorio"
    );
}

#[tokio::test]
async fn malformed_json_is_a_client_error() {
    let app = TestApp::new().await;

    let response = app
        .request_raw(Method::POST, "/api/entrada-insumos", "{\"records\": [")
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Cuerpo de la solicitud inválido");
}

#[tokio::test]
async fn store_rejection_is_forwarded_verbatim() {
    let app = TestApp::new().await;

    let store_error = r#"{"error":{"type":"ROW_DOES_NOT_EXIST","message":"Record ID rec404 does not exist"}}"#;
    Mock::given(method("POST"))
        .and(path(entradas_path()))
        .respond_with(ResponseTemplate::new(422).set_body_string(store_error))
        .expect(1)
        .mount(&app.store)
        .await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/entrada-insumos",
            Some(json!({
                "records": [{"fields": {"Insumos Laboratorio": ["rec404"], "Cantidad Ingresa Unidades": 1}}]
            })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Error al crear registros en Airtable");
    assert_eq!(body["details"], store_error);
}

#[tokio::test]
async fn missing_table_id_is_a_configuration_error() {
    let app = TestApp::with_config(|cfg| cfg.record_store.tables.entrada_insumos = None).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/entrada-insumos",
            Some(json!({
                "records": [{"fields": {"Insumos Laboratorio": ["rec1"], "Cantidad Ingresa Unidades": 1}}]
            })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Configuración de Airtable incompleta");
}

#[tokio::test]
async fn missing_api_key_is_a_configuration_error_for_listing() {
    let app = TestApp::with_config(|cfg| cfg.record_store.api_key = None).await;

    let response = app
        .request_authenticated(Method::GET, "/api/entrada-insumos", None)
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Configuración de Airtable incompleta");
}

#[tokio::test]
async fn listing_without_filters_sorts_by_expiry_only() {
    let app = TestApp::new().await;

    Mock::given(method("GET"))
        .and(path(entradas_path()))
        .and(query_param("maxRecords", "100"))
        .and(query_param("sort[0][field]", "fecha_vencimiento"))
        .and(query_param("sort[0][direction]", "asc"))
        .and(query_param_is_missing("filterByFormula"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [
                {"id": "recE1", "fields": {"fecha_vencimiento": "2025-03-01"}},
                {"id": "recE2", "fields": {"fecha_vencimiento": "2025-06-01"}}
            ]
        })))
        .expect(1)
        .mount(&app.store)
        .await;

    let response = app
        .request_authenticated(Method::GET, "/api/entrada-insumos", None)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 2);
    assert_eq!(body["entradas"][0]["id"], "recE1");
    assert_eq!(
        body["filtros"],
        json!({"insumoId": null, "soloDisponibles": false})
    );
}

#[tokio::test]
async fn listing_with_both_filters_sends_a_conjunction() {
    let app = TestApp::new().await;

    Mock::given(method("GET"))
        .and(path(entradas_path()))
        .and(query_param("maxRecords", "20"))
        .and(query_param(
            "filterByFormula",
            "AND(FIND('rec123', CONCATENATE({Insumos Laboratorio})), {Total Cantidad Granel Actual} > 0)",
        ))
        .and(query_param("sort[0][field]", "fecha_vencimiento"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"records": []})))
        .expect(1)
        .mount(&app.store)
        .await;

    let response = app
        .request_authenticated(
            Method::GET,
            "/api/entrada-insumos?maxRecords=20&insumoId=rec123&disponibles=true",
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["count"], 0);
    assert_eq!(
        body["filtros"],
        json!({"insumoId": "rec123", "soloDisponibles": true})
    );
}

#[tokio::test]
async fn listing_treats_non_true_availability_as_off() {
    let app = TestApp::new().await;

    Mock::given(method("GET"))
        .and(path(entradas_path()))
        .and(query_param(
            "filterByFormula",
            "FIND('rec9', CONCATENATE({Insumos Laboratorio}))",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"records": []})))
        .expect(1)
        .mount(&app.store)
        .await;

    let response = app
        .request_authenticated(
            Method::GET,
            "/api/entrada-insumos?insumoId=rec9&disponibles=yes",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn listing_with_blank_limit_uses_default_cap() {
    let app = TestApp::new().await;

    Mock::given(method("GET"))
        .and(path(entradas_path()))
        .and(query_param("maxRecords", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"records": []})))
        .expect(1)
        .mount(&app.store)
        .await;

    let response = app
        .request_authenticated(Method::GET, "/api/entrada-insumos?maxRecords=", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn listing_rejects_invalid_limits() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(Method::GET, "/api/entrada-insumos?maxRecords=0", None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request_authenticated(Method::GET, "/api/entrada-insumos?maxRecords=muchos", None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["error"], "maxRecords debe ser un entero mayor a 0");
}

#[tokio::test]
async fn listing_failure_forwards_store_status() {
    let app = TestApp::new().await;

    Mock::given(method("GET"))
        .and(path(entradas_path()))
        .respond_with(ResponseTemplate::new(401).set_body_string("AUTHENTICATION_REQUIRED"))
        .mount(&app.store)
        .await;

    let response = app
        .request_authenticated(Method::GET, "/api/entrada-insumos", None)
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Error al obtener registros de Airtable");
    assert_eq!(body["details"], "AUTHENTICATION_REQUIRED");
}
