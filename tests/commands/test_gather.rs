//! Tests for the gather command

use std::path::Path;
use std::time::{Duration, Instant};

use discord_purge::commands::gather;
use discord_purge::{Error, GatherConfig, SearchOffset, UserTarget};
use httpmock::prelude::*;
use serde_json::{json, Value};

use super::{settings_for, wait_for_calls};

const GUILD: &str = "41771983423143937";
const ME: &str = "80351110224678912";
const SEARCH_PATH: &str = "/api/v9/guilds/41771983423143937/messages/search";

fn hit(id: &str, channel: &str, author: &str) -> Value {
    json!([{
        "id": id,
        "channel_id": channel,
        "content": "text",
        "timestamp": "2023-01-01T00:00:00+00:00",
        "author": {"id": author, "username": "someone"}
    }])
}

fn config(output: &Path, offset: u64) -> GatherConfig {
    GatherConfig {
        token: "user-token".into(),
        guild_id: GUILD.into(),
        user: UserTarget::Me,
        search_offset: SearchOffset(offset),
        output: Some(output.to_path_buf()),
        verbose: false,
    }
}

async fn mock_me(server: &MockServer) {
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v9/users/@me");
            then.status(200)
                .json_body(json!({"id": ME, "username": "nelly"}));
        })
        .await;
}

fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_gather_single_page_then_exhausted() {
    let server = MockServer::start_async().await;
    mock_me(&server).await;

    let first = server
        .mock_async(|when, then| {
            when.method(GET)
                .path(SEARCH_PATH)
                .header("authorization", "user-token")
                .query_param("author_id", ME)
                .query_param("sort_by", "timestamp")
                .query_param("sort_order", "asc")
                .query_param("include_nsfw", "true")
                .query_param_missing("offset");
            then.status(200).json_body(json!({
                "total_results": 3,
                "messages": [hit("1001", "500", ME), hit("1002", "500", "999"), hit("1003", "501", ME)]
            }));
        })
        .await;
    let second = server
        .mock_async(|when, then| {
            when.method(GET).path(SEARCH_PATH).query_param("offset", "25");
            then.status(200)
                .json_body(json!({"total_results": 0, "messages": []}));
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("log.txt");
    let summary = gather::run(settings_for(&server), config(&output, 0))
        .await
        .expect("gather");

    let base = server.base_url();
    assert_eq!(
        read_lines(&output),
        vec![
            format!("{base}/channels/{GUILD}/500/1001"),
            format!("{base}/channels/{GUILD}/501/1003"),
        ]
    );
    assert_eq!(summary.messages, 2);
    assert_eq!(summary.pages, 1);
    assert_eq!(summary.next_offset, SearchOffset(25));
    first.assert_calls_async(1).await;
    second.assert_calls_async(1).await;
}

#[tokio::test]
async fn test_gather_resume_skips_consumed_pages() {
    let server = MockServer::start_async().await;
    mock_me(&server).await;

    let page0 = server
        .mock_async(|when, then| {
            when.method(GET).path(SEARCH_PATH).query_param_missing("offset");
            then.status(200).json_body(json!({
                "total_results": 30,
                "messages": [hit("1", "10", ME)]
            }));
        })
        .await;
    let page1 = server
        .mock_async(|when, then| {
            when.method(GET).path(SEARCH_PATH).query_param("offset", "25");
            then.status(200).json_body(json!({
                "total_results": 30,
                "messages": [hit("2", "10", ME), hit("3", "11", ME)]
            }));
        })
        .await;
    let end = server
        .mock_async(|when, then| {
            when.method(GET).path(SEARCH_PATH).query_param("offset", "50");
            then.status(200)
                .json_body(json!({"total_results": 30, "messages": []}));
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let continuous = dir.path().join("continuous.txt");
    gather::run(settings_for(&server), config(&continuous, 0))
        .await
        .expect("continuous run");

    let resumed = dir.path().join("resumed.txt");
    let summary = gather::run(settings_for(&server), config(&resumed, 25))
        .await
        .expect("resumed run");

    let full = read_lines(&continuous);
    let suffix = read_lines(&resumed);
    assert_eq!(suffix.len(), 2);
    assert_eq!(&full[1..], suffix.as_slice());
    assert_eq!(summary.next_offset, SearchOffset(50));

    // page 0 only requested by the continuous run
    page0.assert_calls_async(1).await;
    page1.assert_calls_async(2).await;
    end.assert_calls_async(2).await;
}

#[tokio::test]
async fn test_gather_pages_without_matches_write_nothing() {
    let server = MockServer::start_async().await;
    mock_me(&server).await;

    server
        .mock_async(|when, then| {
            when.method(GET).path(SEARCH_PATH).query_param_missing("offset");
            then.status(200).json_body(json!({
                "total_results": 26,
                "messages": [hit("1", "10", "someone-else")]
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(SEARCH_PATH).query_param("offset", "25");
            then.status(200).json_body(json!({
                "total_results": 26,
                "messages": [hit("2", "10", ME)]
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(SEARCH_PATH).query_param("offset", "50");
            then.status(200)
                .json_body(json!({"total_results": 26, "messages": []}));
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("log.txt");
    let summary = gather::run(settings_for(&server), config(&output, 0))
        .await
        .expect("gather");

    let lines = read_lines(&output);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with("/channels/41771983423143937/10/2"));
    assert_eq!(summary.pages, 2);
}

#[tokio::test]
async fn test_gather_throttled_page_is_retried_at_same_offset() {
    let server = MockServer::start_async().await;
    mock_me(&server).await;

    let mut throttled = server
        .mock_async(|when, then| {
            when.method(GET).path(SEARCH_PATH).query_param_missing("offset");
            then.status(429).json_body(json!({
                "message": "You are being rate limited.",
                "retry_after": 0.5,
                "global": false
            }));
        })
        .await;
    let end = server
        .mock_async(|when, then| {
            when.method(GET).path(SEARCH_PATH).query_param("offset", "25");
            then.status(200)
                .json_body(json!({"total_results": 0, "messages": []}));
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("log.txt");
    let settings = settings_for(&server);
    let run_config = config(&output, 0);

    let started = Instant::now();
    let task = tokio::spawn(async move { gather::run(settings, run_config).await });

    wait_for_calls(&throttled, 1).await;
    throttled.delete_async().await;
    let page = server
        .mock_async(|when, then| {
            when.method(GET).path(SEARCH_PATH).query_param_missing("offset");
            then.status(200).json_body(json!({
                "total_results": 1,
                "messages": [hit("77", "10", ME)]
            }));
        })
        .await;

    let summary = task.await.expect("join").expect("gather");

    assert!(started.elapsed() >= Duration::from_millis(500));
    assert_eq!(summary.messages, 1);
    assert_eq!(read_lines(&output).len(), 1);
    page.assert_calls_async(1).await;
    end.assert_calls_async(1).await;
}

#[tokio::test]
async fn test_gather_saves_each_page_before_requesting_the_next() {
    let server = MockServer::start_async().await;
    mock_me(&server).await;

    let first = server
        .mock_async(|when, then| {
            when.method(GET).path(SEARCH_PATH).query_param_missing("offset");
            then.status(200).json_body(json!({
                "total_results": 40,
                "messages": [hit("9", "3", ME)]
            }));
        })
        .await;
    let failing = server
        .mock_async(|when, then| {
            when.method(GET).path(SEARCH_PATH).query_param("offset", "25");
            then.status(500).body("boom");
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("log.txt");

    let err = gather::run(settings_for(&server), config(&output, 0))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Http { status: 500, .. }));
    assert_eq!(
        read_lines(&output),
        vec![format!("{}/channels/{GUILD}/3/9", server.base_url())]
    );
    first.assert_calls_async(1).await;
    failing.assert_calls_async(1).await;
}

#[tokio::test]
async fn test_gather_unknown_user_aborts_before_search() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v9/users/123");
            then.status(404)
                .json_body(json!({"message": "Unknown User", "code": 10013}));
        })
        .await;
    let search = server
        .mock_async(|when, then| {
            when.method(GET).path(SEARCH_PATH);
            then.status(200)
                .json_body(json!({"total_results": 0, "messages": []}));
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("log.txt");
    let run_config = GatherConfig {
        user: UserTarget::Id("123".into()),
        ..config(&output, 0)
    };

    let err = gather::run(settings_for(&server), run_config)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NotFound(_)));
    assert!(!output.exists());
    search.assert_calls_async(0).await;
}

#[test]
fn test_gather_default_output_name_uses_resolved_id() {
    let run_config = GatherConfig {
        output: None,
        ..config(Path::new("unused.txt"), 0)
    };
    assert_eq!(
        run_config.output_path(ME).to_string_lossy(),
        format!("messages_{ME}_{GUILD}.txt")
    );
}
