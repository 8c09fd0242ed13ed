use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use anyhow::Result;
use http::{HeaderValue, StatusCode};
use mautic_sdk::{
    AuthPhase, BlockingClient, BlockingClientBuilder, ContactId, ContactLookup, ContactQuery,
    Error, RetryConfig, Signer, SigningRequest,
};
use serde_json::{Value, json};
use tokio::task;
use wiremock::{
    Match, Mock, MockServer, Request, ResponseTemplate,
    matchers::{any, body_json, body_string_contains, header, method, path, query_param},
};

/// Matches an OAuth1 `Authorization` header, optionally signed with `token`.
#[derive(Clone, Copy)]
struct OAuthHeader(Option<&'static str>);

impl Match for OAuthHeader {
    fn matches(&self, request: &Request) -> bool {
        let Some(value) = request
            .headers
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
        else {
            return false;
        };
        if !value.starts_with("OAuth ") || !value.contains("oauth_signature=\"") {
            return false;
        }
        match self.0 {
            Some(token) => value.contains(&format!("oauth_token=\"{token}\"")),
            None => !value.contains("oauth_token="),
        }
    }
}

fn builder(base_url: &str) -> Result<BlockingClientBuilder> {
    Ok(BlockingClient::builder(base_url, "consumer-key", "consumer-secret")?)
}

fn ready_client(base_url: &str) -> Result<BlockingClient> {
    Ok(builder(base_url)?
        .access_token("acc", "acc-secret")
        .build()?)
}

async fn mock_api(
    server: &MockServer,
    verb: &str,
    endpoint: &str,
    response: ResponseTemplate,
    expected: u64,
) {
    Mock::given(method(verb))
        .and(path(endpoint))
        .and(OAuthHeader(Some("acc")))
        .respond_with(response)
        .expect(expected)
        .up_to_n_times(expected)
        .mount(server)
        .await;
}

async fn forbid_traffic(server: &MockServer) {
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn full_handshake_then_lookup() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/oauth/v1/request_token"))
        .and(OAuthHeader(None))
        .and(header_contains("oauth_callback=\"https%3A%2F%2Fapp.example.com%2Fcb\""))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("oauth_token=req&oauth_token_secret=req-secret&oauth_callback_confirmed=true"),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/oauth/v1/access_token"))
        .and(OAuthHeader(Some("req")))
        .and(body_string_contains("oauth_verifier=v123"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("oauth_token=acc&oauth_token_secret=acc-secret"),
        )
        .expect(1)
        .mount(&server)
        .await;

    mock_api(
        &server,
        "GET",
        "/api/contacts",
        ResponseTemplate::new(200).set_body_json(json!({
            "total": "1",
            "contacts": {"42": {"id": 42, "fields": {}}}
        })),
        1,
    )
    .await;

    let base_url = server.uri();
    task::spawn_blocking(move || -> Result<()> {
        let client = builder(&base_url)?
            .callback_url("https://app.example.com/cb")
            .build()?;
        assert_eq!(client.phase(), AuthPhase::Unauthorized);

        let authorize = client.request_and_authorize()?;
        assert_eq!(
            authorize.as_str(),
            format!("{base_url}/oauth/v1/authorize?oauth_token=req")
        );
        assert_eq!(client.phase(), AuthPhase::AwaitingVerifier);

        let access = client.get_access_token("v123")?;
        assert_eq!(access.token(), "acc");
        assert_eq!(access.secret().expose(), "acc-secret");
        assert_eq!(client.phase(), AuthPhase::Authorized);
        assert!(!client.has_session());

        client.get_session()?;
        assert_eq!(client.phase(), AuthPhase::Ready);

        let lookup = client.contacts().find_id("email:ada@example.com")?;
        assert_eq!(lookup, ContactLookup::Found(ContactId::from("42")));
        Ok(())
    })
    .await??;

    server.verify().await;
    Ok(())
}

fn header_contains(needle: &'static str) -> impl Match {
    move |request: &Request| {
        request
            .headers
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains(needle))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn out_of_order_calls_send_nothing() -> Result<()> {
    let server = MockServer::start().await;
    forbid_traffic(&server).await;

    let base_url = server.uri();
    task::spawn_blocking(move || -> Result<()> {
        let client = builder(&base_url)?.build()?;

        assert!(matches!(
            client.get_access_token("v").unwrap_err(),
            Error::InvalidState {
                actual: AuthPhase::Unauthorized,
                expected: AuthPhase::AwaitingVerifier,
                ..
            }
        ));
        assert!(matches!(
            client.get_session().unwrap_err(),
            Error::InvalidState { .. }
        ));

        let err = client.contacts().create(&json!({"email": "a@b.c"})).unwrap_err();
        assert!(err.is_auth_error());
        let err = client.campaigns().add_contact(1u64, 2u64).unwrap_err();
        assert!(err.is_auth_error());
        let err = client.post_json(["segments", "1", "contact", "2", "add"], &json!({}));
        assert!(matches!(err, Err(Error::InvalidState { .. })));

        assert_eq!(client.phase(), AuthPhase::Unauthorized);
        Ok(())
    })
    .await??;

    server.verify().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_request_token_leaves_state_unchanged() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/oauth/v1/request_token"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"error": {"message": "Invalid consumer key", "code": 401}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let base_url = server.uri();
    task::spawn_blocking(move || -> Result<()> {
        let client = builder(&base_url)?.build()?;
        let err = client.request_and_authorize().unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
        assert!(err.to_string().contains("Invalid consumer key"));
        assert_eq!(client.phase(), AuthPhase::Unauthorized);
        Ok(())
    })
    .await??;

    server.verify().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn lookup_reports_not_found_and_failed_requests() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/contacts"))
        .and(query_param("search", "email:nobody@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": "0", "contacts": []})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/contacts"))
        .and(query_param("search", "email:ada@example.com"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"total": 1, "contacts": [{"id": "42"}]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/contacts"))
        .and(query_param("search", "email:boom@example.com"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let base_url = server.uri();
    task::spawn_blocking(move || -> Result<()> {
        let contacts = ready_client(&base_url)?.contacts();

        assert_eq!(
            contacts.find_id("email:nobody@example.com")?,
            ContactLookup::NotFound
        );
        assert_eq!(
            contacts.find_id("email:ada@example.com")?.into_id(),
            Some(ContactId::from("42"))
        );
        assert_eq!(
            contacts.find_id("email:boom@example.com")?,
            ContactLookup::RequestFailed(StatusCode::INTERNAL_SERVER_ERROR)
        );
        Ok(())
    })
    .await??;

    server.verify().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn list_passes_search_operators_verbatim() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/contacts"))
        .and(query_param("search", "+email:ada@example.com !is:mine"))
        .and(query_param("limit", "5"))
        .and(query_param("orderByDir", "desc"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"total":2,"contacts":{"9":{"id":9},"10":{"id":10}}}"#,
            "application/json",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let base_url = server.uri();
    task::spawn_blocking(move || -> Result<()> {
        let query = ContactQuery::parse("search=%2Bemail:ada@example.com%20!is:mine&limit=5")
            .order_by("id", mautic_sdk::OrderDirection::Desc);
        let list = ready_client(&base_url)?.contacts().list(query)?;
        assert_eq!(list.total, 2);
        assert_eq!(list.contacts.len(), 2);
        assert_eq!(list.first_id(), Some(ContactId::from(9u64)));
        Ok(())
    })
    .await??;

    server.verify().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn create_accepts_201_and_rejects_400() -> Result<()> {
    let server = MockServer::start().await;
    let fields = json!({"firstname": "Ada", "email": "ada@example.com", "tags": ["vip"]});

    Mock::given(method("POST"))
        .and(path("/api/contacts/new"))
        .and(OAuthHeader(Some("acc")))
        .and(header("Content-Type", "application/json"))
        .and(body_json(&fields))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"contact": {"id": 51, "fields": {}}})),
        )
        .expect(1)
        .up_to_n_times(1)
        .mount(&server)
        .await;

    mock_api(
        &server,
        "POST",
        "/api/contacts/new",
        ResponseTemplate::new(400)
            .set_body_json(json!({"errors": [{"message": "email: This value is not valid.", "code": 400}]})),
        1,
    )
    .await;

    let base_url = server.uri();
    task::spawn_blocking(move || -> Result<()> {
        let contacts = ready_client(&base_url)?.contacts();

        let created = contacts.create(&fields)?;
        assert_eq!(created.status, StatusCode::CREATED);
        assert_eq!(created.id(), Some(ContactId::from("51")));

        let err = contacts.create(&json!({"email": "nope"})).unwrap_err();
        assert!(matches!(err, Error::InvalidResponseCode { .. }));
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(err.to_string(), "Mautic: Contact not created. Status Code: 400");
        Ok(())
    })
    .await??;

    server.verify().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn update_patches_and_reports_status() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/api/contacts/42/edit"))
        .and(OAuthHeader(Some("acc")))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({"points": 10})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"contact": {"id": "42"}})))
        .expect(1)
        .up_to_n_times(1)
        .mount(&server)
        .await;

    mock_api(
        &server,
        "PATCH",
        "/api/contacts/43/edit",
        ResponseTemplate::new(500).set_body_string("consumer-secret leaked acc-secret"),
        1,
    )
    .await;

    let base_url = server.uri();
    task::spawn_blocking(move || -> Result<()> {
        let contacts = ready_client(&base_url)?.contacts();

        let updated = contacts.update(42u64, &json!({"points": 10}))?;
        assert_eq!(updated.status, StatusCode::OK);
        assert_eq!(updated.id(), Some(ContactId::from("42")));

        let err = contacts.update("43", &json!({"points": 1})).unwrap_err();
        assert!(err.to_string().contains("Error updating contact"));
        assert!(err.to_string().contains("500"));
        let Error::InvalidResponseCode { error, .. } = err else {
            anyhow::bail!("unexpected error kind");
        };
        let snippet = error.body_snippet.unwrap_or_default();
        assert!(!snippet.contains("consumer-secret"));
        assert!(!snippet.contains("acc-secret"));
        assert!(snippet.contains("leaked"));
        Ok(())
    })
    .await??;

    server.verify().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn campaign_enrollment_surfaces_result() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/campaigns/3/contact/add/42"))
        .and(OAuthHeader(Some("acc")))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": 1})))
        .expect(1)
        .mount(&server)
        .await;

    mock_api(
        &server,
        "POST",
        "/api/campaigns/9/contact/add/42",
        ResponseTemplate::new(404),
        1,
    )
    .await;

    let base_url = server.uri();
    task::spawn_blocking(move || -> Result<()> {
        let campaigns = ready_client(&base_url)?.campaigns();

        let ok = campaigns.add_contact(3u64, "42")?;
        assert!(ok.is_success());
        assert_eq!(ok.body, json!({"success": 1}));

        let missing = campaigns.add_contact("9", 42u64)?;
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
        assert!(!missing.is_success());
        assert_eq!(missing.body, Value::Null);
        Ok(())
    })
    .await??;

    server.verify().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn post_json_returns_raw_status_and_body() -> Result<()> {
    let server = MockServer::start().await;

    mock_api(
        &server,
        "POST",
        "/api/segments/1/contact/2/add",
        ResponseTemplate::new(200).set_body_json(json!({"success": true})),
        1,
    )
    .await;
    mock_api(
        &server,
        "POST",
        "/api/segments/1/contact/3/add",
        ResponseTemplate::new(422),
        1,
    )
    .await;

    let base_url = server.uri();
    task::spawn_blocking(move || -> Result<()> {
        let client = ready_client(&base_url)?;

        let (status, body) = client.post_json(["segments", "1", "contact", "2", "add"], &json!({}))?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true}));

        let (status, body) = client.post_json(["segments", "1", "contact", "3", "add"], &json!({}))?;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body, Value::Null);
        Ok(())
    })
    .await??;

    server.verify().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn retry_replays_idempotent_lookup_on_503() -> Result<()> {
    let server = MockServer::start().await;

    mock_api(&server, "GET", "/api/contacts", ResponseTemplate::new(503), 1).await;
    mock_api(
        &server,
        "GET",
        "/api/contacts",
        ResponseTemplate::new(200).set_body_json(json!({"total": 1, "contacts": [{"id": 5}]})),
        1,
    )
    .await;

    let base_url = server.uri();
    task::spawn_blocking(move || -> Result<()> {
        let client = builder(&base_url)?
            .access_token("acc", "acc-secret")
            .retry_config(RetryConfig {
                max_retries: 2,
                base_delay: Duration::from_millis(5),
                max_delay: Duration::from_millis(5),
                jitter: false,
                replay_writes: false,
                respect_retry_after: true,
            })
            .build()?;

        let lookup = client.contacts().find_id("email:x@example.com")?;
        assert_eq!(lookup, ContactLookup::Found(ContactId::from("5")));
        Ok(())
    })
    .await??;

    server.verify().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn create_is_not_replayed_by_default() -> Result<()> {
    let server = MockServer::start().await;

    mock_api(&server, "POST", "/api/contacts/new", ResponseTemplate::new(503), 1).await;

    let base_url = server.uri();
    task::spawn_blocking(move || -> Result<()> {
        let client = builder(&base_url)?
            .access_token("acc", "acc-secret")
            .with_retry(3, Duration::from_millis(1))
            .build()?;

        let err = client.contacts().create(&json!({"email": "a@b.c"})).unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
        Ok(())
    })
    .await??;

    server.verify().await;
    Ok(())
}

#[derive(Debug)]
struct FixedSigner;

impl Signer for FixedSigner {
    fn authorization(&self, req: &SigningRequest<'_>) -> Result<HeaderValue, Error> {
        let token = req.token.map(|t| t.token()).unwrap_or("none");
        HeaderValue::from_str(&format!("OAuth fixed {} {token}", req.method)).map_err(|err| {
            Error::Signing {
                message: "bad header".into(),
                source: Some(Box::new(err)),
            }
        })
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn custom_signer_signs_api_calls() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/api/contacts/8/edit"))
        .and(header("Authorization", "OAuth fixed PATCH acc"))
        .and(header("Content-Type", "application/json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let base_url = server.uri();
    task::spawn_blocking(move || -> Result<()> {
        let client = builder(&base_url)?
            .access_token("acc", "acc-secret")
            .signer(FixedSigner)
            .build()?;

        let updated = client.contacts().update(8u64, &json!({"city": "Paris"}))?;
        assert_eq!(updated.body, Value::Null);
        assert_eq!(updated.id(), None);
        Ok(())
    })
    .await??;

    server.verify().await;
    Ok(())
}

/// Reads the client's phase while each request is being signed.
struct PhaseRecordingSigner {
    client: Arc<OnceLock<BlockingClient>>,
    seen: Arc<Mutex<Vec<AuthPhase>>>,
}

impl Signer for PhaseRecordingSigner {
    fn authorization(&self, _req: &SigningRequest<'_>) -> Result<HeaderValue, Error> {
        if let Some(client) = self.client.get() {
            self.seen.lock().unwrap().push(client.phase());
        }
        Ok(HeaderValue::from_static("OAuth recorded"))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn handshake_requests_do_not_hold_the_state_lock() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/oauth/v1/request_token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("oauth_token=req&oauth_token_secret=rs"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth/v1/access_token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("oauth_token=acc&oauth_token_secret=as"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let base_url = server.uri();
    task::spawn_blocking(move || -> Result<()> {
        let slot = Arc::new(OnceLock::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let client = builder(&base_url)?
            .signer(PhaseRecordingSigner {
                client: slot.clone(),
                seen: seen.clone(),
            })
            .build()?;
        let _ = slot.set(client.clone());

        client.request_and_authorize()?;
        client.get_access_token("v")?;
        client.get_session()?;

        assert_eq!(
            seen.lock().unwrap().as_slice(),
            [AuthPhase::Unauthorized, AuthPhase::AwaitingVerifier]
        );
        assert_eq!(client.phase(), AuthPhase::Ready);
        Ok(())
    })
    .await??;

    server.verify().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn writes_replay_only_when_the_server_refused_them() -> Result<()> {
    let server = MockServer::start().await;

    mock_api(&server, "POST", "/api/contacts/new", ResponseTemplate::new(503), 1).await;
    mock_api(
        &server,
        "POST",
        "/api/contacts/new",
        ResponseTemplate::new(201).set_body_json(json!({"contact": {"id": 60}})),
        1,
    )
    .await;
    mock_api(&server, "PATCH", "/api/contacts/60/edit", ResponseTemplate::new(502), 1).await;

    let base_url = server.uri();
    task::spawn_blocking(move || -> Result<()> {
        let client = builder(&base_url)?
            .access_token("acc", "acc-secret")
            .retry_config(RetryConfig {
                max_retries: 2,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(1),
                jitter: false,
                replay_writes: true,
                respect_retry_after: false,
            })
            .build()?;
        let contacts = client.contacts();

        let created = contacts.create(&json!({"email": "a@b.c"}))?;
        assert_eq!(created.id(), Some(ContactId::from("60")));

        let err = contacts.update(60u64, &json!({"points": 1})).unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::BAD_GATEWAY));
        Ok(())
    })
    .await??;

    server.verify().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn construction_validates_tokens_and_host() -> Result<()> {
    let server = MockServer::start().await;
    forbid_traffic(&server).await;

    let base_url = server.uri();
    task::spawn_blocking(move || -> Result<()> {
        let only_token = builder(&base_url)?
            .access_token_parts(Some("acc".into()), None)
            .build();
        assert!(matches!(only_token, Err(Error::InvalidToken { .. })));

        let only_secret = builder(&base_url)?
            .access_token_parts(None, Some("acc-secret".into()))
            .build();
        assert!(matches!(only_secret, Err(Error::InvalidToken { .. })));

        let ready = ready_client(&format!("{base_url}/"))?;
        assert_eq!(ready.phase(), AuthPhase::Ready);
        assert_eq!(ready.access_token().map(|t| t.token().to_owned()), Some("acc".into()));

        let bad = BlockingClient::new("mautic.example.com/", "k", "s");
        assert!(matches!(bad, Err(Error::BadHost { .. })));
        Ok(())
    })
    .await??;

    server.verify().await;
    Ok(())
}
