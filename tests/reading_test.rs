//! Integration tests for reading logs, the calendar, goals, statistics,
//! badges, the dashboard, export and rating maintenance.

mod common;

use chrono::{Datelike, Duration, Local};
use common::{id, TestHarness};
use reqwest::StatusCode;
use serde_json::{json, Value};

fn today() -> chrono::NaiveDate {
    Local::now().date_naive()
}

#[tokio::test]
async fn logs_feed_the_calendar_and_streaks() {
    let h = TestHarness::start().await;
    let s = h.register("alice").await;
    let book = s.create_book(json!({"title": "Middlemarch", "status": "reading"})).await;

    let today = today();
    for back in 0..3 {
        let date = today - Duration::days(back);
        let resp = s
            .post(
                "/logs",
                json!({"book_id": id(&book), "date": date.to_string(), "pages_read": 30, "minutes": 45}),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let negative = s
        .post("/logs", json!({"book_id": id(&book), "pages_read": -1}))
        .await;
    assert_eq!(negative.status(), StatusCode::BAD_REQUEST);

    let streaks = s.get_json("/streaks").await;
    assert_eq!(streaks["current"], 3);
    assert_eq!(streaks["longest"], 3);

    let calendar = s.get_json(&format!("/calendar?year={}", today.year())).await;
    assert_eq!(calendar["year"], today.year());
    let days = calendar["days"].as_array().unwrap();
    let today_entry = days
        .iter()
        .find(|d| d["date"] == today.to_string())
        .unwrap();
    assert_eq!(today_entry["pages"], 30);
    assert_eq!(today_entry["minutes"], 45);

    let logs = s
        .get_json(&format!("/logs?from={}", today.to_string()))
        .await;
    assert_eq!(logs.as_array().unwrap().len(), 1);
    let log_id = id(&logs[0]);

    let updated: Value = s
        .put(&format!("/logs/{log_id}"), json!({"pages_read": 50, "note": "Long session"}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(updated["pages_read"], 50);

    assert_eq!(
        s.delete(&format!("/logs/{log_id}")).await.status(),
        StatusCode::NO_CONTENT
    );
    // Without today's entry the streak still stands through yesterday.
    let streaks = s.get_json("/streaks").await;
    assert_eq!(streaks["current"], 2);
}

#[tokio::test]
async fn goals_track_books_finished_this_year() {
    let h = TestHarness::start().await;
    let s = h.register("alice").await;
    let year = today().year();

    assert_eq!(
        s.get(&format!("/goals/{year}")).await.status(),
        StatusCode::NOT_FOUND
    );

    let invalid = s
        .put(&format!("/goals/{year}"), json!({"target_books": 0}))
        .await;
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

    s.create_book(json!({"title": "Done", "status": "read", "page_count": 200}))
        .await;
    s.create_book(json!({"title": "Not yet"})).await;

    let goal: Value = s
        .put(&format!("/goals/{year}"), json!({"target_books": 2, "target_pages": 1000}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(goal["target_books"], 2);
    assert_eq!(goal["progress"]["books_read"], 1);
    assert_eq!(goal["progress"]["books_remaining"], 1);
    assert_eq!(goal["progress"]["achieved"], false);

    let goals = s.get_json("/goals").await;
    assert_eq!(goals.as_array().unwrap().len(), 1);

    assert_eq!(
        s.delete(&format!("/goals/{year}")).await.status(),
        StatusCode::NO_CONTENT
    );
}

#[tokio::test]
async fn stats_and_badges_reflect_the_shelf() {
    let h = TestHarness::start().await;
    let s = h.register("alice").await;

    s.create_book(json!({
        "title": "Short",
        "status": "read",
        "rating": 4.0,
        "page_count": 120,
        "genres": ["Poetry"],
        "authors": ["Mary Oliver"]
    }))
    .await;
    s.create_book(json!({
        "title": "Long",
        "status": "read",
        "rating": 5.0,
        "page_count": 1200,
        "genres": ["Poetry"]
    }))
    .await;
    s.create_book(json!({"title": "Later"})).await;

    let stats = s.get_json("/stats").await;
    assert!(stats["year"].is_null());
    assert_eq!(stats["books_read"], 2);
    assert_eq!(stats["pages_read"], 1320);
    assert_eq!(stats["status_counts"]["to_read"], 1);
    assert_eq!(stats["average_rating"], 4.5);
    assert_eq!(stats["genres"][0]["name"], "Poetry");
    assert_eq!(stats["longest_book"]["title"], "Long");
    assert_eq!(stats["books_per_month"].as_array().unwrap().len(), 12);

    let last_year = s.get_json(&format!("/stats?year={}", today().year() - 1)).await;
    assert_eq!(last_year["books_read"], 0);

    let badges = s.get_json("/badges").await;
    let earned = |key: &str| {
        badges
            .as_array()
            .unwrap()
            .iter()
            .find(|b| b["key"] == key)
            .map(|b| b["earned"].as_bool().unwrap())
            .unwrap()
    };
    assert!(earned("first_book"));
    assert!(earned("doorstopper"));
    assert!(!earned("bookworm"));
}

#[tokio::test]
async fn dashboard_summarises_the_library() {
    let h = TestHarness::start().await;
    let s = h.register("alice").await;
    let reading = s.create_book(json!({"title": "On the nightstand", "status": "reading"})).await;
    s.create_book(json!({"title": "Finished", "status": "read"})).await;
    s.post(
        &format!("/books/{}/quotes", id(&reading)),
        json!({"text": "A line worth keeping"}),
    )
    .await;

    let dash = s.get_json("/dashboard").await;
    assert_eq!(dash["counts"]["reading"], 1);
    assert_eq!(dash["counts"]["read"], 1);
    assert_eq!(dash["currently_reading"][0]["title"], "On the nightstand");
    assert_eq!(dash["recently_finished"][0]["title"], "Finished");
    assert_eq!(dash["latest_quotes"].as_array().unwrap().len(), 1);
    assert!(dash["goal"].is_null());
    assert!(dash["theme"]["season"].is_string());
}

#[tokio::test]
async fn export_contains_only_the_callers_data() {
    let h = TestHarness::start().await;
    let alice = h.register("alice").await;
    let bob = h.register("bob").await;
    let book = alice.create_book(json!({"title": "Mine", "authors": ["Someone"]})).await;
    bob.create_book(json!({"title": "Theirs"})).await;

    let collection: Value = alice
        .post("/collections", json!({"name": "Favourites"}))
        .await
        .json()
        .await
        .unwrap();
    alice
        .put(
            &format!("/collections/{}/books/{}", id(&collection), id(&book)),
            json!({}),
        )
        .await;

    let resp = alice.get("/export").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let disposition = resp
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("attachment"));

    let export: Value = resp.json().await.unwrap();
    assert_eq!(export["username"], "alice");
    assert_eq!(export["books"].as_array().unwrap().len(), 1);
    assert_eq!(export["books"][0]["title"], "Mine");
    assert_eq!(export["books"][0]["authors"][0]["name"], "Someone");
    assert_eq!(export["collections"][0]["book_ids"][0], id(&book));
}

#[tokio::test]
async fn rating_maintenance_is_admin_only_and_repairs_values() {
    let h = TestHarness::start().await;
    let admin = h.register("alice").await;
    let reader = h.register("bob").await;
    let off_grid = reader.create_book(json!({"title": "Off grid", "status": "read"})).await;
    let unread = reader.create_book(json!({"title": "Unread"})).await;

    {
        let conn = h.conn();
        conn.execute(
            "UPDATE books SET rating = 4.3 WHERE id = ?1",
            [id(&off_grid)],
        )
        .unwrap();
        conn.execute("UPDATE books SET rating = 3 WHERE id = ?1", [id(&unread)])
            .unwrap();
    }

    assert_eq!(
        reader.get("/maintenance/ratings").await.status(),
        StatusCode::FORBIDDEN
    );

    let scan = admin.get_json("/maintenance/ratings").await;
    assert_eq!(scan["corrupted"], 2);

    let repair: Value = admin
        .post("/maintenance/ratings/repair", json!({}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(repair["repaired"], 2);

    let fixed = reader.get_json(&format!("/books/{}", id(&off_grid))).await;
    assert_eq!(fixed["rating"], 4.5);
    let cleared = reader.get_json(&format!("/books/{}", id(&unread))).await;
    assert!(cleared["rating"].is_null());

    let rescan = admin.get_json("/maintenance/ratings").await;
    assert_eq!(rescan["corrupted"], 0);
}

#[tokio::test]
async fn theme_is_public_and_dated() {
    let h = TestHarness::start().await;
    let theme: Value = h
        .http
        .get(h.url("/api/theme?date=2024-10-31"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(theme["season"], "autumn");
    assert_eq!(theme["holiday"], "halloween");
    assert_eq!(theme["effect"], "pumpkins");

    let bad = h
        .http
        .get(h.url("/api/theme?date=31-10-2024"))
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
}
