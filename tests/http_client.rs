//! Both scan state machines talking to a live server over HTTP

mod common;

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio::{net::TcpListener, sync::oneshot};

use gearloan_server::{
    api::create_router,
    client::{
        admin::{AdminScanController, AdminScanState},
        http::HttpBackend,
        user::{PollOutcome, UserPollClient},
        AdminBackend, UserBackend,
    },
    error::AppError,
    models::ScanStatus,
};

async fn spawn_server() -> (String, gearloan_server::AppState) {
    let state = common::seeded_state().await;
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("No local address");
    let app = create_router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });
    (format!("http://{}/api/v1", addr), state)
}

#[tokio::test]
async fn test_borrow_over_http() {
    let (base_url, state) = spawn_server().await;
    let item_id = common::item_id(&state, "ITM-001").await;

    let admin = Arc::new(
        HttpBackend::login(&base_url, common::ADMIN.0, common::ADMIN.1)
            .await
            .unwrap(),
    );
    let user = HttpBackend::login(&base_url, common::USER.0, common::USER.1)
        .await
        .unwrap();
    let user_id = user.user_id();

    let mut dialog = UserPollClient::new(user, Duration::from_millis(50));
    let payload = dialog.open(item_id).await.unwrap().to_string();

    let (_close_tx, close_rx) = oneshot::channel();
    let polling = tokio::spawn(async move {
        let outcome = dialog.run(close_rx).await;
        (outcome, dialog.status())
    });

    let due_dates = state.services.borrowings.due_dates();
    let scanner = AdminScanController::new(admin.clone(), due_dates);
    scanner.on_frame(payload.as_bytes()).await;
    let review = scanner.review().expect("No review after scan");
    assert_eq!(review.intent.user_id, user_id);
    assert_eq!(review.lookup.item_name, "Laptop Dell Latitude");

    scanner
        .set_return_date(due_dates.today(Utc::now()) + chrono::Duration::days(3))
        .unwrap();
    let borrowing = scanner.submit().await.unwrap();
    assert_eq!(scanner.state(), AdminScanState::Idle);
    assert_eq!(borrowing.user_id, user_id);

    let (outcome, status) = tokio::time::timeout(Duration::from_secs(5), polling)
        .await
        .expect("Borrower never saw the approval")
        .unwrap();
    assert_eq!(outcome, PollOutcome::Approved);
    assert_eq!(status, ScanStatus::Approved);
}

#[tokio::test]
async fn test_errors_survive_the_wire() {
    let (base_url, state) = spawn_server().await;
    let item_id = common::item_id(&state, "ITM-003").await;

    let admin = HttpBackend::login(&base_url, common::ADMIN.0, common::ADMIN.1)
        .await
        .unwrap();
    let user = HttpBackend::login(&base_url, common::USER.0, common::USER.1)
        .await
        .unwrap();

    assert!(matches!(
        admin.lookup(user.user_id(), 4242).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(user.check_status().await, Ok(ScanStatus::Waiting)));
    assert!(matches!(
        admin.check_status().await,
        Err(AppError::Authorization(_))
    ));
    assert!(matches!(
        HttpBackend::login(&base_url, common::USER.0, "wrong").await,
        Err(AppError::Authentication(_))
    ));

    // The only unit goes, and the borrower's dialog refuses to open
    state.services.scan.lookup(user.user_id(), item_id).await.unwrap();
    let today = state.services.borrowings.due_dates().today(Utc::now());
    let approve = gearloan_server::services::scan::ProcessScan {
        user_id: user.user_id(),
        item_id,
        return_date: today,
    };
    admin.process_scan(&approve).await.unwrap();
    assert!(matches!(
        admin.process_scan(&approve).await,
        Err(AppError::StockUnavailable(_))
    ));

    let mut dialog = UserPollClient::new(user, Duration::from_millis(50));
    assert!(matches!(
        dialog.open(item_id).await,
        Err(AppError::StockUnavailable(_))
    ));
}
