//! API integration tests
//!
//! These run against a live server backed by a migrated database.

use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique 13 digit suffix so repeated runs don't trip unique constraints
fn unique() -> String {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64;
    let n = nanos.wrapping_add(COUNTER.fetch_add(1, Ordering::SeqCst));
    format!("{:013}", n % 10_000_000_000_000)
}

async fn send(request: reqwest::RequestBuilder) -> (StatusCode, Value) {
    let response = request.send().await.expect("Failed to send request");
    let status = response.status();
    let text = response.text().await.expect("Failed to read body");
    let body = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).expect("Failed to parse response")
    };
    (status, body)
}

async fn create_book(client: &Client, copies: i32) -> Value {
    let (status, body) = send(client.post(format!("{}/books", BASE_URL)).json(&json!({
        "title": "The Left Hand of Darkness",
        "author": "Ursula K. Le Guin",
        "isbn": unique(),
        "publisher": "Ace",
        "total_copies": copies,
        "available_copies": copies
    })))
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"].clone()
}

async fn create_member(client: &Client) -> Value {
    let (status, body) = send(client.post(format!("{}/members", BASE_URL)).json(&json!({
        "first_name": "Genly",
        "last_name": "Ai",
        "email": format!("genly.{}@example.org", unique())
    })))
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"].clone()
}

async fn borrow(client: &Client, book: &Value, member: &Value) -> (StatusCode, Value) {
    send(client.post(format!("{}/borrowings", BASE_URL)).json(&json!({
        "book": book["id"],
        "member": member["id"]
    })))
    .await
}

async fn available_copies(client: &Client, book: &Value) -> i64 {
    let (_, body) = send(client.get(format!("{}/books/{}", BASE_URL, book["id"]))).await;
    body["data"]["available_copies"].as_i64().expect("available_copies")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let (status, body) = send(client.get(format!("{}/health", BASE_URL))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_book_crud() {
    let client = Client::new();
    let book = create_book(&client, 2).await;
    let url = format!("{}/books/{}", BASE_URL, book["id"]);

    let (status, body) = send(client.patch(&url).json(&json!({ "title": "Changed" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Changed");
    assert_eq!(body["data"]["author"], "Ursula K. Le Guin");

    let (status, body) = send(client.patch(&url).json(&json!({ "available_copies": 3 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["non_field_errors"].is_array());

    let (status, body) = send(client.delete(&url)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, body) = send(client.get(&url)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_isbn_is_rejected() {
    let client = Client::new();
    let book = create_book(&client, 1).await;

    let (status, body) = send(client.post(format!("{}/books", BASE_URL)).json(&json!({
        "title": "Another",
        "author": "Someone",
        "isbn": book["isbn"]
    })))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Request validation failed");
    assert!(body["errors"]["isbn"].is_array());
}

#[tokio::test]
#[ignore]
async fn test_borrow_and_return_moves_one_copy() {
    let client = Client::new();
    let book = create_book(&client, 2).await;
    let member = create_member(&client).await;

    let (status, body) = borrow(&client, &book, &member).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let borrowing = body["data"].clone();
    assert_eq!(borrowing["status"], "ACTIVE");
    assert_eq!(borrowing["book_title"], "The Left Hand of Darkness");
    assert_eq!(borrowing["member_name"], "Genly");
    assert_eq!(borrowing["return_date"], Value::Null);
    assert_eq!(available_copies(&client, &book).await, 1);

    let return_url = format!("{}/borrowings/{}/return_book", BASE_URL, borrowing["id"]);
    let (status, body) = send(client.post(&return_url)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "RETURNED");
    assert!(body["data"]["return_date"].is_string());
    assert_eq!(available_copies(&client, &book).await, 2);

    // A second return changes nothing
    let (status, body) = send(client.post(&return_url)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["detail"], "This book has already been returned.");
    assert_eq!(available_copies(&client, &book).await, 2);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_active_loan_is_rejected() {
    let client = Client::new();
    let book = create_book(&client, 3).await;
    let member = create_member(&client).await;

    let (status, _) = borrow(&client, &book, &member).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = borrow(&client, &book, &member).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["non_field_errors"].is_array());
    assert_eq!(available_copies(&client, &book).await, 2);
}

#[tokio::test]
#[ignore]
async fn test_unavailable_book_is_rejected() {
    let client = Client::new();
    let book = create_book(&client, 1).await;
    let first = create_member(&client).await;
    let second = create_member(&client).await;

    let (status, _) = borrow(&client, &book, &first).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = borrow(&client, &book, &second).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["book"][0]
        .as_str()
        .unwrap_or_default()
        .contains("is not currently available"));
    assert_eq!(available_copies(&client, &book).await, 0);
}

#[tokio::test]
#[ignore]
async fn test_unknown_book_reference_is_rejected() {
    let client = Client::new();
    let member = create_member(&client).await;

    let (status, body) = borrow(&client, &json!({ "id": i32::MAX }), &member).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["book"].is_array());
}

#[tokio::test]
#[ignore]
async fn test_borrowed_book_cannot_be_deleted() {
    let client = Client::new();
    let book = create_book(&client, 1).await;
    let member = create_member(&client).await;
    let (status, _) = borrow(&client, &book, &member).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(client.delete(format!("{}/books/{}", BASE_URL, book["id"]))).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
#[ignore]
async fn test_borrowings_filters() {
    let client = Client::new();
    let book = create_book(&client, 2).await;
    let member = create_member(&client).await;
    let (_, body) = borrow(&client, &book, &member).await;
    let id = body["data"]["id"].clone();

    let (status, body) = send(client.get(format!(
        "{}/borrowings?member_id={}&status=ACTIVE",
        BASE_URL, member["id"]
    )))
    .await;
    assert_eq!(status, StatusCode::OK);
    let list = body["data"].as_array().expect("list");
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], id);

    let (_, body) = send(client.get(format!(
        "{}/borrowings?member_id={}&status=RETURNED",
        BASE_URL, member["id"]
    )))
    .await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
#[ignore]
async fn test_book_search() {
    let client = Client::new();
    let book = create_book(&client, 1).await;

    let (status, body) = send(
        client
            .get(format!("{}/books", BASE_URL))
            .query(&[("search", book["isbn"].as_str().unwrap_or_default())]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let list = body["data"].as_array().expect("list");
    assert!(list.iter().any(|b| b["id"] == book["id"]));
}

async fn return_loan(client: &Client, borrowing: &Value) -> (StatusCode, Value) {
    send(client.post(format!(
        "{}/borrowings/{}/return_book",
        BASE_URL, borrowing["id"]
    )))
    .await
}

async fn patch_borrowing(client: &Client, borrowing: &Value, body: Value) -> (StatusCode, Value) {
    send(
        client
            .patch(format!("{}/borrowings/{}", BASE_URL, borrowing["id"]))
            .json(&body),
    )
    .await
}

async fn lend(client: &Client, book: &Value, member: &Value) -> Value {
    let (status, body) = borrow(client, book, member).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"].clone()
}

#[tokio::test]
#[ignore]
async fn test_single_copy_lifecycle() {
    let client = Client::new();
    let book = create_book(&client, 1).await;
    let member = create_member(&client).await;

    let borrowing = lend(&client, &book, &member).await;
    assert_eq!(borrowing["status"], "ACTIVE");
    assert_eq!(available_copies(&client, &book).await, 0);

    let (status, body) = borrow(&client, &book, &member).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["non_field_errors"].is_array());
    assert_eq!(available_copies(&client, &book).await, 0);

    let (status, body) = return_loan(&client, &borrowing).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "RETURNED");
    assert_eq!(available_copies(&client, &book).await, 1);
}

#[tokio::test]
#[ignore]
async fn test_patch_status_returned_closes_the_loan() {
    let client = Client::new();
    let book = create_book(&client, 2).await;
    let member = create_member(&client).await;
    let borrowing = lend(&client, &book, &member).await;
    assert_eq!(available_copies(&client, &book).await, 1);

    let (status, body) = patch_borrowing(&client, &borrowing, json!({ "status": "RETURNED" })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "RETURNED");
    assert!(body["data"]["return_date"].is_string());
    assert_eq!(available_copies(&client, &book).await, 2);

    // RETURNED is terminal
    let (status, body) = patch_borrowing(&client, &borrowing, json!({ "status": "ACTIVE" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["status"].is_array());
    assert_eq!(available_copies(&client, &book).await, 2);
}

#[tokio::test]
#[ignore]
async fn test_moving_an_active_loan_moves_the_copy() {
    let client = Client::new();
    let first = create_book(&client, 1).await;
    let second = create_book(&client, 2).await;
    let member = create_member(&client).await;
    let borrowing = lend(&client, &first, &member).await;
    assert_eq!(available_copies(&client, &first).await, 0);

    let (status, body) = patch_borrowing(&client, &borrowing, json!({ "book": second["id"] })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["book"], second["id"]);
    assert_eq!(body["data"]["status"], "ACTIVE");
    assert_eq!(available_copies(&client, &first).await, 1);
    assert_eq!(available_copies(&client, &second).await, 1);
}

#[tokio::test]
#[ignore]
async fn test_moving_a_loan_onto_an_unavailable_book_is_rejected() {
    let client = Client::new();
    let first = create_book(&client, 1).await;
    let taken = create_book(&client, 1).await;
    let member = create_member(&client).await;
    let other = create_member(&client).await;
    let borrowing = lend(&client, &first, &member).await;
    lend(&client, &taken, &other).await;

    let (status, body) = patch_borrowing(&client, &borrowing, json!({ "book": taken["id"] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["book"].is_array());
    assert_eq!(available_copies(&client, &first).await, 0);
    assert_eq!(available_copies(&client, &taken).await, 0);
}

#[tokio::test]
#[ignore]
async fn test_moving_a_loan_onto_a_duplicate_pair_is_rejected() {
    let client = Client::new();
    let first = create_book(&client, 2).await;
    let second = create_book(&client, 2).await;
    let member = create_member(&client).await;
    let borrowing = lend(&client, &first, &member).await;
    lend(&client, &second, &member).await;

    let (status, body) = patch_borrowing(&client, &borrowing, json!({ "book": second["id"] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["non_field_errors"].is_array());
    assert_eq!(available_copies(&client, &first).await, 1);
    assert_eq!(available_copies(&client, &second).await, 1);
}

#[tokio::test]
#[ignore]
async fn test_deleting_an_active_borrowing_restores_the_copy() {
    let client = Client::new();
    let book = create_book(&client, 1).await;
    let member = create_member(&client).await;
    let borrowing = lend(&client, &book, &member).await;
    assert_eq!(available_copies(&client, &book).await, 0);

    let url = format!("{}/borrowings/{}", BASE_URL, borrowing["id"]);
    let (status, body) = send(client.delete(&url)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);
    assert_eq!(available_copies(&client, &book).await, 1);

    let (status, _) = send(client.get(&url)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_borrowings_ordering() {
    let client = Client::new();
    let first_book = create_book(&client, 1).await;
    let second_book = create_book(&client, 1).await;
    let member = create_member(&client).await;
    let older = lend(&client, &first_book, &member).await;
    let newer = lend(&client, &second_book, &member).await;

    let ids = |body: Value| -> Vec<Value> {
        body["data"]
            .as_array()
            .expect("list")
            .iter()
            .map(|b| b["id"].clone())
            .collect()
    };
    let list = |ordering: &'static str| {
        let url = format!(
            "{}/borrowings?member_id={}&ordering={}",
            BASE_URL, member["id"], ordering
        );
        send(client.get(url))
    };

    let (_, body) = list("").await;
    assert_eq!(ids(body), vec![newer["id"].clone(), older["id"].clone()]);
    let (_, body) = list("borrow_date").await;
    assert_eq!(ids(body), vec![older["id"].clone(), newer["id"].clone()]);
    let (_, body) = list("no_such_field").await;
    assert_eq!(ids(body), vec![newer["id"].clone(), older["id"].clone()]);

    let (status, _) = return_loan(&client, &older).await;
    assert_eq!(status, StatusCode::OK);

    // ACTIVE sorts before RETURNED
    let (_, body) = list("status").await;
    assert_eq!(ids(body), vec![newer["id"].clone(), older["id"].clone()]);
    let (_, body) = list("-status").await;
    assert_eq!(ids(body), vec![older["id"].clone(), newer["id"].clone()]);
}

#[tokio::test]
#[ignore]
async fn test_member_search() {
    let client = Client::new();
    let member = create_member(&client).await;
    let email = member["email"].as_str().unwrap_or_default().to_string();

    let search = |terms: String| {
        send(
            client
                .get(format!("{}/members", BASE_URL))
                .query(&[("search", terms)]),
        )
    };

    let (status, body) = search(format!("GENLY, {}", email)).await;
    assert_eq!(status, StatusCode::OK);
    let list = body["data"].as_array().expect("list");
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], member["id"]);

    // Every term must match
    let (_, body) = search(format!("{} zz-no-such-member", email)).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
#[ignore]
async fn test_put_without_counters_keeps_loans_returnable() {
    let client = Client::new();
    let book = create_book(&client, 3).await;
    let mut loans = Vec::new();
    for _ in 0..3 {
        let member = create_member(&client).await;
        loans.push(lend(&client, &book, &member).await);
    }
    assert_eq!(available_copies(&client, &book).await, 0);

    let (status, body) = send(
        client
            .put(format!("{}/books/{}", BASE_URL, book["id"]))
            .json(&json!({ "title": "T2", "author": "A", "isbn": book["isbn"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["title"], "T2");
    assert_eq!(body["data"]["publisher"], "Ace");
    assert_eq!(body["data"]["total_copies"], 3);
    assert_eq!(body["data"]["available_copies"], 0);

    for loan in &loans {
        let (status, body) = return_loan(&client, loan).await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }
    assert_eq!(available_copies(&client, &book).await, 3);
}

#[tokio::test]
#[ignore]
async fn test_counters_cannot_drop_below_copies_on_loan() {
    let client = Client::new();
    let book = create_book(&client, 2).await;
    let url = format!("{}/books/{}", BASE_URL, book["id"]);
    let mut loans = Vec::new();
    for _ in 0..2 {
        let member = create_member(&client).await;
        loans.push(lend(&client, &book, &member).await);
    }

    let (status, body) = send(client.patch(&url).json(&json!({ "total_copies": 0 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["non_field_errors"].is_array());

    let (status, _) = send(
        client
            .patch(&url)
            .json(&json!({ "total_copies": 3, "available_copies": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(client.patch(&url).json(&json!({ "total_copies": 4 }))).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    for loan in &loans {
        let (status, _) = return_loan(&client, loan).await;
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(available_copies(&client, &book).await, 2);
}

#[tokio::test]
#[ignore]
async fn test_member_email_uniqueness_is_exact() {
    let client = Client::new();
    let email = format!("Le.Guin.{}@example.org", unique());
    let create = |email: String| {
        send(client.post(format!("{}/members", BASE_URL)).json(&json!({
            "first_name": "Ursula",
            "last_name": "Le Guin",
            "email": email
        })))
    };

    let (status, _) = create(email.clone()).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = create(email.clone()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["email"][0], "member with this email already exists.");

    let (status, body) = create(email.to_lowercase()).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
}
