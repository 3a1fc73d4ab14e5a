mod common;

use common::{StubResponse, StubServer};
use lookout_core::{CommentKind, GitHubConfig, LookoutError};
use lookout_review::github::{GitHubClient, HostingApi};

fn client(server: &StubServer) -> GitHubClient {
    let config = GitHubConfig {
        repository: Some("acme/widgets".into()),
        token: Some("t0k3n".into()),
        api_url: server.base_url.clone(),
    };
    GitHubClient::new(&config).unwrap()
}

#[tokio::test]
async fn list_files_follows_pagination() {
    let mut server = StubServer::bind().await;
    let next = format!(
        "<{}/repos/acme/widgets/pulls/7/files?per_page=100&page=2>; rel=\"next\"",
        server.base_url
    );
    server.serve(vec![
        StubResponse::json(
            200,
            serde_json::json!([
                {"filename": "src/a.rs", "status": "modified", "additions": 1, "deletions": 0,
                 "patch": "@@ -1 +1,2 @@\n a\n+b"}
            ]),
        )
        .with_header("Link", &next),
        StubResponse::json(
            200,
            serde_json::json!([
                {"filename": "logo.png", "status": "added", "additions": 0, "deletions": 0}
            ]),
        ),
    ]);

    let files = client(&server).list_files(7).await.unwrap();

    assert_eq!(files.len(), 2);
    assert_eq!(files[0].filename, "src/a.rs");
    assert!(files[1].patch.is_none());

    let requests = server.requests();
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].path, "/repos/acme/widgets/pulls/7/files?per_page=100");
    assert_eq!(
        requests[1].path,
        "/repos/acme/widgets/pulls/7/files?per_page=100&page=2"
    );
    assert_eq!(requests[0].headers["authorization"], "Bearer t0k3n");
    assert_eq!(requests[0].headers["accept"], "application/vnd.github+json");
    assert!(requests[0].headers["user-agent"].starts_with("lookout/"));
}

#[tokio::test]
async fn non_success_status_is_a_hosting_error() {
    let mut server = StubServer::bind().await;
    server.serve(vec![StubResponse::json(
        404,
        serde_json::json!({"message": "Not Found"}),
    )]);

    let err = client(&server).pull_request(9).await.unwrap_err();
    match err {
        LookoutError::Hosting(message) => {
            assert!(message.contains("404"), "{message}");
            assert!(message.contains("Not Found"), "{message}");
        }
        other => panic!("expected hosting error, got {other:?}"),
    }
}

#[tokio::test]
async fn pull_request_maps_metadata() {
    let mut server = StubServer::bind().await;
    server.serve(vec![StubResponse::json(
        200,
        serde_json::json!({
            "number": 9,
            "title": "Speed up lookups",
            "body": "Uses a map.",
            "user": {"login": "alice"},
            "head": {"sha": "abc123", "ref": "fast"},
            "base": {"sha": "000000", "ref": "main"}
        }),
    )]);

    let pr = client(&server).pull_request(9).await.unwrap();
    assert_eq!(pr.title, "Speed up lookups");
    assert_eq!(pr.author, "alice");
    assert_eq!(pr.head_sha.as_deref(), Some("abc123"));
    assert_eq!(server.requests()[0].path, "/repos/acme/widgets/pulls/9");
}

#[tokio::test]
async fn commits_and_comments_are_listed() {
    let mut server = StubServer::bind().await;
    server.serve(vec![
        StubResponse::json(200, serde_json::json!([{"sha": "one"}, {"sha": "two"}])),
        StubResponse::json(
            200,
            serde_json::json!([
                {"id": 5, "body": "<!-- lookout-review -->\nold", "user": {"login": "github-actions[bot]"}}
            ]),
        ),
        StubResponse::json(
            200,
            serde_json::json!([{"id": 6, "body": null, "user": null}]),
        ),
    ]);
    let client = client(&server);

    assert_eq!(client.list_commits(7).await.unwrap(), vec!["one", "two"]);

    let issue = client.list_issue_comments(7).await.unwrap();
    assert_eq!(issue[0].id, 5);
    assert_eq!(issue[0].kind, CommentKind::Issue);
    assert_eq!(issue[0].author, "github-actions[bot]");

    let review = client.list_review_comments(7).await.unwrap();
    assert_eq!(review[0].kind, CommentKind::Review);
    assert_eq!(review[0].body, "");

    let paths: Vec<String> = server.requests().into_iter().map(|r| r.path).collect();
    assert_eq!(
        paths,
        vec![
            "/repos/acme/widgets/pulls/7/commits?per_page=100",
            "/repos/acme/widgets/issues/7/comments?per_page=100",
            "/repos/acme/widgets/pulls/7/comments?per_page=100",
        ]
    );
}

#[tokio::test]
async fn review_comment_is_anchored_by_position() {
    let mut server = StubServer::bind().await;
    server.serve(vec![StubResponse::json(201, serde_json::json!({"id": 77}))]);

    let id = client(&server)
        .create_review_comment(7, "deadbeef", "src/a.rs", 3, "Consider a bound here")
        .await
        .unwrap();
    assert_eq!(id, 77);

    let request = &server.requests()[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/repos/acme/widgets/pulls/7/comments");
    let body = request.json();
    assert_eq!(body["commit_id"], "deadbeef");
    assert_eq!(body["path"], "src/a.rs");
    assert_eq!(body["position"], 3);
    assert_eq!(body["body"], "Consider a bound here");
}

#[tokio::test]
async fn summary_and_approval_are_posted() {
    let mut server = StubServer::bind().await;
    server.serve(vec![
        StubResponse::json(201, serde_json::json!({"id": 88})),
        StubResponse::json(200, serde_json::json!({"id": 1, "state": "APPROVED"})),
    ]);
    let client = client(&server);

    assert_eq!(client.create_issue_comment(7, "summary").await.unwrap(), 88);
    client.approve(7, "ok").await.unwrap();

    let requests = server.requests();
    assert_eq!(requests[0].path, "/repos/acme/widgets/issues/7/comments");
    assert_eq!(requests[0].json()["body"], "summary");
    assert_eq!(requests[1].path, "/repos/acme/widgets/pulls/7/reviews");
    assert_eq!(requests[1].json()["event"], "APPROVE");
}

#[tokio::test]
async fn delete_targets_the_comment_kind() {
    let mut server = StubServer::bind().await;
    server.serve(vec![StubResponse::empty(204), StubResponse::empty(204)]);
    let client = client(&server);

    client.delete_comment(CommentKind::Issue, 55).await.unwrap();
    client.delete_comment(CommentKind::Review, 56).await.unwrap();

    let requests = server.requests();
    assert_eq!(requests[0].method, "DELETE");
    assert_eq!(requests[0].path, "/repos/acme/widgets/issues/comments/55");
    assert_eq!(requests[1].path, "/repos/acme/widgets/pulls/comments/56");
}

#[tokio::test]
async fn unreachable_server_is_a_hosting_error() {
    let server = StubServer::bind().await;
    let base_url = server.base_url.clone();
    drop(server);

    let config = GitHubConfig {
        repository: Some("acme/widgets".into()),
        token: None,
        api_url: base_url,
    };
    let err = GitHubClient::new(&config)
        .unwrap()
        .list_files(1)
        .await
        .unwrap_err();
    assert!(matches!(err, LookoutError::Hosting(_)));
}
