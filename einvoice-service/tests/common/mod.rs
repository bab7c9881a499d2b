use einvoice_service::config::{Config, FbrConfig, FbrEndpoint, ServerConfig};
use einvoice_service::Application;
use secrecy::Secret;

pub struct TestApp {
    pub address: String,
    pub port: u16,
}

impl TestApp {
    pub async fn spawn(fbr: FbrConfig) -> Self {
        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Random port
            },
            fbr,
            service_name: "einvoice-service-test".to_string(),
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");
        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the HTTP server to be ready by polling the health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp { address, port }
    }
}

/// Sandbox configuration pointing at the given endpoint URL.
pub fn fbr_config(api_url: &str) -> FbrConfig {
    FbrConfig {
        enabled: true,
        environment: "sandbox".to_string(),
        sandbox: FbrEndpoint {
            api_url: api_url.to_string(),
            security_token: Secret::new("sandbox-token".to_string()),
        },
        production: FbrEndpoint {
            api_url: "https://gw.fbr.gov.pk/di_data/v1/di/postinvoicedata".to_string(),
            security_token: Secret::new(String::new()),
        },
    }
}

/// A registrable sales invoice with one standard-rate line item.
pub fn sample_invoice(id: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "invoice_type": "Sale Invoice",
        "posting_date": "2025-07-26",
        "company": "Fibersoft Textiles",
        "company_tax_id": "1234567-8",
        "customer": "Khan Fabrics",
        "buyer_tax_id": "8765432-1",
        "company_address": {
            "address_line1": "12 Shahrah-e-Faisal",
            "city": "Karachi",
            "state": "Sindh"
        },
        "customer_address": {
            "address_line1": "45 Mall Road",
            "city": "Lahore",
            "state": "Punjab"
        },
        "scenario_id": "SN001",
        "buyer_registration_type": "Registered",
        "items": [{
            "item_name": "Cotton fabric",
            "hs_code": "5208.1100",
            "uom": "Numbers, pieces, units",
            "sale_type": "Goods at standard rate (default)",
            "sro_schedule_no": "",
            "sro_item_serial_no": "",
            "qty": 100,
            "unit_price": 250,
            "net_amount": 25000,
            "tax_inclusive_amount": 29250,
            "sales_tax": 4250,
            "sales_tax_rate": 8.5,
            "extra_tax": "",
            "further_tax": 0,
            "discount_amount": 0
        }]
    })
}

/// Register an invoice and assert creation succeeded.
pub async fn register_invoice(client: &reqwest::Client, app: &TestApp, invoice: &serde_json::Value) {
    let response = client
        .post(format!("{}/invoices", app.address))
        .json(invoice)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), reqwest::StatusCode::CREATED);
}
