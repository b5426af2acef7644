//! Client example demonstrating the full registration flow against a running
//! server: bootstrap, order creation, signed confirmation, attendance, ranks.
//!
//! Run with: cargo run -p campus-app --example client_example --no-default-features --features sqlite

use std::net::SocketAddr;

use campus_client::CampusClient;
use campus_gateway::{MockGateway, signature};
use campus_hex::{RegistrationService, inbound::HttpServer};
use campus_repo::build_repo;
use campus_types::{
    ConfirmPaymentRequest, CreateOrderRequest, Currency, EventId, StudentId, SubeventId,
};
use tempfile::tempdir;
use tokio::net::TcpListener;

const GATEWAY_SECRET: &str = "demo_secret";

fn intent(student: i64, name: &str, email: &str) -> CreateOrderRequest {
    CreateOrderRequest {
        student_id: StudentId::new(student),
        event_id: EventId::new(7),
        subevent_id: SubeventId::new(3),
        student_name: name.to_string(),
        student_email: email.to_string(),
        fee: 50000,
        currency: Currency::INR,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt().with_env_filter("info").init();

    // Find an available port
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr: SocketAddr = listener.local_addr()?;
    let port = addr.port();
    drop(listener);

    // Use a temp file-backed SQLite DB
    let tmp = tempdir()?;
    let db_path = tmp.path().join("registrations.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    println!("🚀 Starting server on port {port}...");
    println!("   Database: {db_url}");

    // Build repository (handles connection and migration)
    let repo = build_repo(&db_url).await?;

    // Start server in background with the mock gateway
    let service = RegistrationService::new(repo, MockGateway::new("rzp_test_key", GATEWAY_SECRET));
    let server = HttpServer::new(service);
    let router = server.router();

    let server_addr = format!("127.0.0.1:{port}");
    tokio::spawn(async move {
        axum::serve(
            TcpListener::bind(&server_addr).await.unwrap(),
            router.into_make_service(),
        )
        .await
        .unwrap();
    });

    // Wait for server to start
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;

    // Create client
    let base_url = format!("http://127.0.0.1:{port}");
    let client = CampusClient::new(&base_url);

    // ─────────────────────────────────────────────────────────────────────────
    // Demo: Full registration flow
    // ─────────────────────────────────────────────────────────────────────────

    // Health check
    let health = client.health().await?;
    println!("✅ Server health: {health}");

    // Requests without a key are rejected
    let response = client.create_order(&intent(42, "Asha Rao", "asha@college.edu")).await;
    assert!(response.is_err());
    println!("✅ Unauthorized without key: {}", response.unwrap_err());

    // Bootstrap the first key
    let key = client.bootstrap("demo").await?;
    println!("✅ Server key generated: {key}");

    let client = client.with_api_key(key);

    // Create a gateway order for Asha
    let asha = intent(42, "Asha Rao", "asha@college.edu");
    let order = client.create_order(&asha).await?;
    println!(
        "✅ Order created: {} ({} {:?})",
        order.order_id, order.amount, order.currency
    );

    // The gateway would sign this after the charge; the mock shares its secret
    let payment_id = "pay_demo_1";
    let sig = signature::sign_confirmation(&order.order_id, payment_id, GATEWAY_SECRET);

    let registration = client
        .confirm_payment(&ConfirmPaymentRequest {
            intent: asha.clone(),
            order_id: order.order_id.clone(),
            payment_id: payment_id.to_string(),
            signature: sig,
        })
        .await?;
    println!(
        "✅ Registration committed: {} ({})",
        registration.id, registration.student_name
    );

    // A second checkout for the same triple is refused up front
    let duplicate = client.create_order(&asha).await;
    assert!(duplicate.is_err());
    println!("✅ Duplicate registration refused: {}", duplicate.unwrap_err());

    // Register a second student so the leaderboard has two entries
    let vikram = intent(43, "Vikram Shah", "vikram@college.edu");
    let order2 = client.create_order(&vikram).await?;
    let sig2 = signature::sign_confirmation(&order2.order_id, "pay_demo_2", GATEWAY_SECRET);
    let registration2 = client
        .confirm_payment(&ConfirmPaymentRequest {
            intent: vikram,
            order_id: order2.order_id,
            payment_id: "pay_demo_2".to_string(),
            signature: sig2,
        })
        .await?;
    println!(
        "✅ Registration committed: {} ({})",
        registration2.id, registration2.student_name
    );

    // Event day: attendance and ranks
    client
        .bulk_attendance(EventId::new(7), SubeventId::new(3), true)
        .await?;
    println!("✅ Marked attendance for the whole sub-event");

    client.assign_rank(registration2.id, 1).await?;
    client.assign_rank(registration.id, 2).await?;

    let board = client
        .leaderboard(EventId::new(7), SubeventId::new(3))
        .await?;
    println!("\n🏆 Leaderboard:");
    for entry in board {
        println!(
            "   {}. {} ({})",
            entry.rank.unwrap_or(0),
            entry.student_name,
            entry.student_email
        );
    }

    let count = client
        .participant_count(EventId::new(7), Some(SubeventId::new(3)))
        .await?;
    println!("\n📋 Paid participants: {count}");

    println!("\n🎉 Example completed successfully!");

    Ok(())
}
