mod common;

use common::{fbr_config, register_invoice, sample_invoice, TestApp};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DI_PATH: &str = "/di_data/v1/di/postinvoicedata_sb";

#[tokio::test]
async fn registered_invoice_reads_back_with_an_empty_result_block() {
    let app = TestApp::spawn(fbr_config("http://127.0.0.1:9/unused")).await;
    let client = Client::new();
    register_invoice(&client, &app, &sample_invoice("ACC-SINV-2025-00101")).await;

    let stored: Value = client
        .get(format!("{}/invoices/ACC-SINV-2025-00101", app.address))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");

    assert_eq!(stored["id"], json!("ACC-SINV-2025-00101"));
    assert_eq!(stored["company"], json!("Fibersoft Textiles"));
    assert_eq!(stored["items"][0]["hs_code"], json!("5208.1100"));
    assert_eq!(stored["fbr"]["outcome"], json!(null));
    assert_eq!(stored["fbr"]["invoice_no"], json!(null));
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = TestApp::spawn(fbr_config("http://127.0.0.1:9/unused")).await;
    let client = Client::new();
    register_invoice(&client, &app, &sample_invoice("ACC-SINV-2025-00102")).await;

    let response = client
        .post(format!("{}/invoices", app.address))
        .json(&sample_invoice("ACC-SINV-2025-00102"))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_invoice_returns_not_found() {
    let app = TestApp::spawn(fbr_config("http://127.0.0.1:9/unused")).await;
    let client = Client::new();

    let response = client
        .get(format!("{}/invoices/ACC-SINV-2025-09999", app.address))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client
        .post(format!("{}/invoices/ACC-SINV-2025-09999/submit", app.address))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn qr_is_unavailable_before_an_invoice_number_is_assigned() {
    let app = TestApp::spawn(fbr_config("http://127.0.0.1:9/unused")).await;
    let client = Client::new();
    register_invoice(&client, &app, &sample_invoice("ACC-SINV-2025-00103")).await;

    let response = client
        .get(format!("{}/invoices/ACC-SINV-2025-00103/qr", app.address))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn qr_renders_the_assigned_invoice_number_after_acceptance() {
    let fbr_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(DI_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "invoiceNumber": "7000007DI1747119701593",
            "dated": "2025-07-26 14:03:00",
            "validationResponse": { "statusCode": "00", "status": "Valid" }
        })))
        .mount(&fbr_server)
        .await;

    let app = TestApp::spawn(fbr_config(&format!("{}{}", fbr_server.uri(), DI_PATH))).await;
    let client = Client::new();
    register_invoice(&client, &app, &sample_invoice("ACC-SINV-2025-00104")).await;

    let submit_result: Value = client
        .post(format!("{}/invoices/ACC-SINV-2025-00104/submit", app.address))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");
    assert_eq!(submit_result["success"], json!(true));

    let qr: Value = client
        .get(format!("{}/invoices/ACC-SINV-2025-00104/qr", app.address))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");

    assert_eq!(qr["qr_payload"], json!("7000007DI1747119701593"));
    assert!(!qr["qr_image_base64"]
        .as_str()
        .expect("image present")
        .is_empty());
}
