//! Property-based tests for the session pipeline through the public API
//!
//! Each case runs a mock upstream and drives a full client call: form
//! building, classification, refresh, extraction and validation.

use mh_http_client::path::{extract_one, extract_rows};
use mh_http_client::{Credentials, ExtractError, JsonPath, MhClient, MhError, Rows};
use mockito::Matcher;
use proptest::prelude::*;
use serde_json::{Value, json};

fn client(url: &str) -> MhClient {
    MhClient::builder().base_url(url).unwrap().build().unwrap()
}

fn expired(marker: &str) -> String {
    json!({"messageData": {"popup": {"messages": [{"messageData": {"body": marker}}]}}}).to_string()
}

/// Always-expired upstream: one refresh, two attempts, then a typed failure
mod always_expired {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(5))]

        #[test]
        fn refreshes_exactly_once(
            token in "[a-f0-9]{16,40}",
            unique_hash in "[a-f0-9]{8,16}",
            profile_id in 1u64..10_000_000,
        ) {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            runtime.block_on(async {
                let mut server = mockito::Server::new_async().await;
                let cookie = format!("HG_TOKEN={token}");
                let friends = server
                    .mock("POST", "/managers/ajax/pages/friends.php")
                    .match_header("cookie", cookie.as_str())
                    .match_body(Matcher::UrlEncoded("uh".into(), unique_hash.clone()))
                    .with_status(200)
                    .with_header("content-type", "application/json")
                    .with_body(expired("Your session has expired."))
                    .expect(2)
                    .create_async()
                    .await;
                let camp = server
                    .mock("GET", "/camp.php")
                    .match_header("cookie", cookie.as_str())
                    .with_status(200)
                    .with_header("content-type", "text/html")
                    .expect(1)
                    .create_async()
                    .await;

                let credentials = Credentials::new(token.clone(), unique_hash.clone());
                let result = client(&server.url())
                    .resolve_snuid(&credentials, profile_id)
                    .await;

                assert!(matches!(result, Err(MhError::SessionRefreshIneffective)));
                friends.assert_async().await;
                camp.assert_async().await;
            });
        }
    }
}

#[tokio::test]
async fn configured_marker_replaces_default() {
    let mut server = mockito::Server::new_async().await;
    let _friends = server
        .mock("POST", "/managers/ajax/pages/friends.php")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(expired("Please log in again"))
        .expect(2)
        .create_async()
        .await;
    let _camp = server
        .mock("GET", "/camp.php")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let client = MhClient::builder()
        .base_url(server.url())
        .unwrap()
        .expired_marker("Please log in again")
        .build()
        .unwrap();
    let result = client
        .resolve_snuid(&Credentials::new("t", "h"), 1)
        .await;

    assert!(matches!(result, Err(MhError::SessionRefreshIneffective)));
}

#[tokio::test]
async fn unreachable_upstream_is_request_error() {
    let client = MhClient::builder()
        .base_url("http://127.0.0.1:9")
        .unwrap()
        .timeout(std::time::Duration::from_secs(2))
        .build()
        .unwrap();
    let result = client.fetch_me(&Credentials::new("t", "h")).await;
    assert!(matches!(result, Err(MhError::Request(_))));
}

/// Path queries over documents with noise around the target
mod extraction {
    use super::*;

    fn noisy(target: Value, siblings: usize) -> Value {
        let mut subtabs: Vec<Value> = (0..siblings).map(|i| json!({"noise": i})).collect();
        subtabs.insert(0, json!({"target": target}));
        json!({"tabs": {"profile": {"subtabs": subtabs}}, "other": {"target": "decoy"}})
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn single_target_is_found(value in any::<i64>(), siblings in 0usize..5) {
            let document = noisy(json!(value), siblings);
            let path: JsonPath = "$.tabs.profile.subtabs[0].target".parse().unwrap();
            prop_assert_eq!(extract_one(&document, &path).unwrap(), &json!(value));
        }

        #[test]
        fn rows_keep_server_order(items in prop::collection::vec(any::<u32>(), 0..20)) {
            let document = noisy(json!(items), 1);
            let path: JsonPath = "$.tabs.profile.subtabs[0].target".parse().unwrap();
            let rows = extract_rows(&document, &path, Rows::AllowEmpty).unwrap();
            let read: Vec<u32> = rows.iter().map(|v| v.as_u64().unwrap() as u32).collect();
            prop_assert_eq!(read, items.clone());

            let strict = extract_rows(&document, &path, Rows::NonEmpty);
            prop_assert_eq!(strict.is_err(), items.is_empty());
        }
    }

    #[test]
    fn absent_differs_from_empty() {
        let document = json!({"list": []});
        let empty: JsonPath = "$.list".parse().unwrap();
        let absent: JsonPath = "$.missing".parse().unwrap();
        assert_eq!(
            extract_rows(&document, &empty, Rows::AllowEmpty).unwrap().len(),
            0
        );
        assert!(matches!(
            extract_rows(&document, &absent, Rows::AllowEmpty),
            Err(ExtractError::NotFound { .. })
        ));
    }
}
