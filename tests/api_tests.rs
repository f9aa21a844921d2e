//! HTTP contract tests against a mock invoice service.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use invoice_console::commands::{dashboard, invoices};
use invoice_console::config::ApiConfig;
use invoice_console::error::ApiError;
use invoice_console::models::{Division, EditableField, InvoiceId, InvoiceStatus, LineItemField, Role};
use invoice_console::services::client::InvoiceQuery;
use invoice_console::services::export::ExportFormat;
use invoice_console::services::fetch::fetch_all_divisions;
use invoice_console::services::merge::merge_dedup;
use invoice_console::utils::{parse_date, DateRange};
use invoice_console::{ApiClient, AuthContext};

fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(&ApiConfig {
        base_url: server.uri(),
        timeout_secs: 5,
    })
    .unwrap()
}

fn test_auth() -> AuthContext {
    AuthContext::new("tester", Role::Admin, "tok")
}

fn invoice_body(id: i64, number: &str, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "invoice_number": number,
        "supplier_name": "Acme Water GmbH",
        "total_amount": "250.00",
        "invoice_date": "2024-03-01",
        "status": status,
        "reference_number": "R-77",
        "processed_by": "clerk",
        "approved_by": null,
        "data": "{\"line_items\":[{\"item_description\":\"Pump\",\"product_code\":\"P-1\",\"quantity\":1,\"unit_price\":\"250.00\",\"line_total\":\"250.00\"}]}"
    })
}

#[tokio::test]
async fn login_yields_an_auth_context() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"token": "t-1", "role": "store"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let auth = client.login("alice", "secret").await.unwrap();
    assert_eq!(auth.username(), "alice");
    assert_eq!(auth.role(), Role::Store);
    assert_eq!(auth.token(), "t-1");
}

#[tokio::test]
async fn login_failure_carries_the_backend_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "bad credentials"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.login("alice", "nope").await.unwrap_err();
    match err {
        ApiError::Auth(message) => assert_eq!(message, "bad credentials"),
        other => panic!("expected Auth, got {:?}", other),
    }
}

#[tokio::test]
async fn get_invoices_sends_bearer_token_and_query_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get_invoices/ultra_filtration"))
        .and(header("Authorization", "Bearer tok"))
        .and(query_param("status", "pending"))
        .and(query_param("start_date", "2024-02-01"))
        .and(query_param("end_date", "2024-03-01"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([invoice_body(1, "U1", "pending")])),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let range = DateRange::new(
        parse_date("2024-02-01").unwrap(),
        parse_date("2024-03-01").unwrap(),
    );
    let query = InvoiceQuery::pending().in_range(range);
    let invoices = client
        .get_invoices(&test_auth(), Division::UltraFiltration, &query)
        .await
        .unwrap();

    assert_eq!(invoices.len(), 1);
    assert_eq!(invoices[0].invoice_number, "U1");
    assert_eq!(invoices[0].status, InvoiceStatus::Pending);
}

#[tokio::test]
async fn missing_invoice_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get_invoice/water/99"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "no such invoice"})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .get_invoice(&test_auth(), Division::Water, &InvoiceId::from(99))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn server_error_without_json_body_uses_status_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get_invoices/water"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .get_invoices(&test_auth(), Division::Water, &InvoiceQuery::default())
        .await
        .unwrap_err();
    match err {
        ApiError::Server { status, .. } => assert_eq!(status, 500),
        other => panic!("expected Server, got {:?}", other),
    }
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_failure() {
    // Nothing listens on this port.
    let client = ApiClient::new(&ApiConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        timeout_secs: 1,
    })
    .unwrap();

    let err = client
        .get_invoices(&test_auth(), Division::Water, &InvoiceQuery::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}

#[tokio::test]
async fn unauthorized_hook_fires_on_expired_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get_invoices/engineering"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "token expired"})))
        .mount(&server)
        .await;

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    let client = client_for(&server)
        .with_unauthorized_hook(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

    let err = client
        .get_invoices(&test_auth(), Division::Engineering, &InvoiceQuery::default())
        .await
        .unwrap_err();
    assert!(err.is_auth());
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn edit_flow_sends_the_reencoded_data_blob() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get_invoice/water/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(invoice_body(7, "W7", "pending")))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/edit_invoice/water/7"))
        .and(header("Authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let auth = test_auth();
    let mut buffer = invoices::open_editor(&client, &auth, Division::Water, &InvoiceId::from(7))
        .await
        .unwrap();
    buffer
        .set_line_item(0, LineItemField::Quantity, "2")
        .unwrap();
    let saved = buffer.commit(&client, &auth).await.unwrap();

    // The committed record carries the mutation inside its data blob.
    let blob = saved.data.unwrap();
    assert!(blob.as_str().unwrap().contains("\"quantity\":\"2\""));

    let requests = server.received_requests().await.unwrap();
    let put = requests
        .iter()
        .find(|r| r.method.to_string() == "PUT")
        .unwrap();
    let sent: serde_json::Value = serde_json::from_slice(&put.body).unwrap();
    assert_eq!(sent["invoice_number"], "W7");
    assert!(sent["data"].as_str().unwrap().contains("\"quantity\":\"2\""));
}

#[tokio::test]
async fn edit_flow_echoes_the_fetched_shape_for_sparse_records() {
    let server = MockServer::start().await;
    // An older record: the amount is explicitly null and the backend never
    // stored a data blob for it.
    Mock::given(method("GET"))
        .and(path("/get_invoice/water/8"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 8,
            "invoice_number": "W8",
            "supplier_name": "Acme Water GmbH",
            "total_amount": null,
            "invoice_date": "2024-03-02",
            "status": "pending"
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/edit_invoice/water/8"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let auth = test_auth();
    let mut buffer = invoices::open_editor(&client, &auth, Division::Water, &InvoiceId::from(8))
        .await
        .unwrap();
    assert!(!buffer.can_edit_line_items());
    buffer.set_field(EditableField::SupplierName, "Acme Water AG");
    buffer.commit(&client, &auth).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let put = requests
        .iter()
        .find(|r| r.method.to_string() == "PUT")
        .unwrap();
    let sent: serde_json::Value = serde_json::from_slice(&put.body).unwrap();
    assert_eq!(sent["supplier_name"], "Acme Water AG");
    // Null stays null, and the absent blob stays absent.
    assert_eq!(sent["total_amount"], serde_json::Value::Null);
    assert!(sent.get("total_amount").is_some());
    assert!(sent.get("data").is_none());
}

#[tokio::test]
async fn failed_commit_returns_the_buffer_for_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get_invoice/water/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(invoice_body(7, "W7", "pending")))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/edit_invoice/water/7"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "storage down"})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let auth = test_auth();
    let mut buffer = invoices::open_editor(&client, &auth, Division::Water, &InvoiceId::from(7))
        .await
        .unwrap();
    buffer
        .set_line_item(0, LineItemField::UnitPrice, "260.00")
        .unwrap();
    let before = buffer.invoice().clone();

    let failed = buffer.commit(&client, &auth).await.unwrap_err();
    assert!(matches!(failed.error, ApiError::Server { status: 500, .. }));
    // Edits survive for the retry.
    assert_eq!(failed.buffer.invoice(), &before);
}

#[tokio::test]
async fn approve_hits_the_approve_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/approve_invoice/engineering/12"))
        .and(header("Authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    invoices::approve(
        &client,
        &test_auth(),
        Division::Engineering,
        &InvoiceId::from(12),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn upload_validates_before_any_request() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    let auth = test_auth();

    let err = client
        .upload_invoice(&auth, Division::Water, "scan.png", b"x".to_vec())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));

    let err = client
        .upload_invoice(&auth, Division::Water, "scan.pdf", Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));

    // No request reached the server.
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn upload_returns_the_extraction_receipt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload_invoice/engineering"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"id": 31, "data": {"line_items": []}})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let receipt = client
        .upload_invoice(
            &test_auth(),
            Division::Engineering,
            "invoice.pdf",
            b"%PDF-1.4".to_vec(),
        )
        .await
        .unwrap();
    assert_eq!(receipt.id, InvoiceId::from(31));
}

#[tokio::test]
async fn dashboard_merges_divisions_and_survives_one_failure() {
    let server = MockServer::start().await;
    // Engineering and water share invoice number A1; ultra_filtration is down.
    Mock::given(method("GET"))
        .and(path("/get_invoices/engineering"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            invoice_body(1, "A1", "pending"),
            invoice_body(2, "E2", "approved"),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/get_invoices/ultra_filtration"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "db down"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/get_invoices/water"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([invoice_body(9, "A1", "approved")])),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let auth = test_auth();
    let data = dashboard::load_dashboard(&client, &auth, DateRange::last_month()).await;

    assert_eq!(data.stats.submitted, 3);
    assert_eq!(data.stats.processed, 2);
    assert_eq!(data.stats.pending, 1);

    // Dedup keeps engineering's A1, so the distinct list is A1 + E2.
    assert_eq!(data.recent.len(), 2);
    let a1 = data
        .recent
        .iter()
        .find(|r| r.invoice.invoice_number == "A1")
        .unwrap();
    assert_eq!(a1.division, Division::Engineering);
    assert_eq!(a1.invoice.status, InvoiceStatus::Pending);

    assert_eq!(data.failed.len(), 1);
    assert_eq!(data.failed[0].division, Division::UltraFiltration);
}

#[tokio::test]
async fn dedup_is_stable_when_responses_arrive_out_of_order() {
    let server = MockServer::start().await;
    // Engineering answers slowly; water instantly. Canonical order must
    // still decide the tie-break.
    Mock::given(method("GET"))
        .and(path("/get_invoices/engineering"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([invoice_body(1, "A1", "pending")]))
                .set_delay(std::time::Duration::from_millis(200)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/get_invoices/ultra_filtration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/get_invoices/water"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([invoice_body(9, "A1", "approved")])),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let auth = test_auth();
    let fetches = fetch_all_divisions(&client, &auth, &InvoiceQuery::default()).await;
    let merged = merge_dedup(fetches);

    assert_eq!(merged.invoices.len(), 1);
    assert_eq!(merged.invoices[0].division, Division::Engineering);
    assert_eq!(merged.invoices[0].invoice.status, InvoiceStatus::Pending);
}

#[tokio::test]
async fn report_rows_export_to_both_formats() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/generate_report"))
        .and(query_param("start_date", "2024-02-01"))
        .and(query_param("end_date", "2024-03-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"division": "water", "count": 4},
            {"division": "engineering", "count": 2},
        ])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let range = DateRange::new(
        parse_date("2024-02-01").unwrap(),
        parse_date("2024-03-01").unwrap(),
    );
    let rows = client.generate_report(&test_auth(), &range).await.unwrap();
    assert_eq!(rows.len(), 2);

    let csv = invoice_console::services::export::export(&rows, ExportFormat::Tabular).unwrap();
    let text = String::from_utf8(csv).unwrap();
    assert!(text.starts_with("division,count\n"));

    let json_bytes = invoice_console::services::export::export(&rows, ExportFormat::Json).unwrap();
    assert!(String::from_utf8(json_bytes).unwrap().contains("\"count\": 4"));
}
