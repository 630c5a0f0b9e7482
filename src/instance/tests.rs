use super::*;
use crate::instance::models::ProviderConfig;
use httpmock::prelude::*;
use reqwest::Client;
use reqwest_middleware::ClientBuilder;

const ADMIN_TOKEN: &str = "admin-token";
const PERSONAL_TOKEN: &str = "personal-token";

fn endpoints(server: &MockServer) -> Endpoints {
    Endpoints {
        admin_url: server.url("/admin"),
        auth_url: server.url(""),
        instance_url_template: server.url("/{name}/"),
    }
}

async fn connect(server: &MockServer) -> Instance {
    server.mock(|when, then| {
        when.method(GET)
            .path("/admin/firebase/test123/token")
            .query_param("token", ADMIN_TOKEN)
            .query_param("namespace", "test123");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "personalToken": PERSONAL_TOKEN,
                "firebaseToken": "instance-token"
            }));
    });

    let client = ClientBuilder::new(Client::new()).build();
    Instance::connect(client, Arc::new(endpoints(server)), ADMIN_TOKEN, "test123")
        .await
        .unwrap()
}

#[tokio::test]
async fn test_connect_missing_token() {
    let server = MockServer::start();
    let client = ClientBuilder::new(Client::new()).build();

    server.mock(|when, then| {
        when.method(GET).path("/admin/firebase/test123/token");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "personalToken": PERSONAL_TOKEN }));
    });

    let err = Instance::connect(client, Arc::new(endpoints(&server)), ADMIN_TOKEN, "test123")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MissingToken("firebaseToken")));
}

#[tokio::test]
async fn test_connect_unreachable() {
    let client = ClientBuilder::new(Client::new()).build();
    let endpoints = Endpoints {
        admin_url: "http://127.0.0.1:1/admin".to_string(),
        auth_url: "http://127.0.0.1:1".to_string(),
        instance_url_template: "http://127.0.0.1:1/{name}/".to_string(),
    };

    let err = Instance::connect(client, Arc::new(endpoints), ADMIN_TOKEN, "test123")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "unexpected error: {:?}", err);
}

#[tokio::test]
async fn test_secret_url_keeps_token_in_one_segment() {
    let server = MockServer::start();
    let instance = connect(&server).await;

    let url = instance.secret_url("a?b/c#d").unwrap();
    assert_eq!(url.path(), "/test123/.settings/secrets/a%3Fb%2Fc%23d.json");
    assert_eq!(url.query(), Some("auth=personal-token"));
    assert!(url.fragment().is_none());
}

#[tokio::test]
async fn test_url() {
    let server = MockServer::start();
    let instance = connect(&server).await;

    assert_eq!(instance.url(), server.url("/test123/"));
    assert_eq!(format!("{}", instance), instance.url());
}

#[tokio::test]
async fn test_auth_tokens_are_cached() {
    let server = MockServer::start();
    let instance = connect(&server).await;

    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/test123/.settings/secrets.json")
            .query_param("auth", PERSONAL_TOKEN);
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!(["secret-a", "secret-b"]));
    });

    assert_eq!(instance.auth_tokens().await.unwrap(), vec!["secret-a", "secret-b"]);
    assert_eq!(instance.auth_tokens().await.unwrap(), vec!["secret-a", "secret-b"]);

    mock.assert();
}

#[tokio::test]
async fn test_add_auth_token_appends_to_cache() {
    let server = MockServer::start();
    let instance = connect(&server).await;

    let list = server.mock(|when, then| {
        when.method(GET).path("/test123/.settings/secrets.json");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!(["secret-a"]));
    });
    let add = server.mock(|when, then| {
        when.method(POST)
            .path("/test123/.settings/secrets.json")
            .query_param("auth", PERSONAL_TOKEN);
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!("secret-b"));
    });

    instance.auth_tokens().await.unwrap();
    let token = instance.add_auth_token().await.unwrap();
    assert_eq!(token, "secret-b");
    assert_eq!(instance.auth_tokens().await.unwrap(), vec!["secret-a", "secret-b"]);

    list.assert();
    add.assert();
}

#[tokio::test]
async fn test_remove_auth_token_twice() {
    let server = MockServer::start();
    let instance = connect(&server).await;

    server.mock(|when, then| {
        when.method(GET).path("/test123/.settings/secrets.json");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!(["secret-a", "secret-b"]));
    });
    let delete = server.mock(|when, then| {
        when.method(DELETE)
            .path("/test123/.settings/secrets/secret-a.json")
            .query_param("auth", PERSONAL_TOKEN);
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!(null));
    });

    instance.remove_auth_token("secret-a").await.unwrap();
    assert_eq!(instance.auth_tokens().await.unwrap(), vec!["secret-b"]);

    let err = instance.remove_auth_token("secret-a").await.unwrap_err();
    assert!(matches!(err, Error::UnknownToken(ref token) if token == "secret-a"));

    delete.assert();
}

#[tokio::test]
async fn test_remove_unknown_auth_token() {
    let server = MockServer::start();
    let instance = connect(&server).await;

    server.mock(|when, then| {
        when.method(GET).path("/test123/.settings/secrets.json");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!([]));
    });

    // No DELETE is mocked: a request would fail with a 404 instead.
    let err = instance.remove_auth_token("missing").await.unwrap_err();
    assert!(matches!(err, Error::UnknownToken(_)));
}

#[tokio::test]
async fn test_rules_round_trip() {
    let server = MockServer::start();
    let instance = connect(&server).await;

    let put = server.mock(|when, then| {
        when.method(PUT)
            .path("/test123/.settings/rules.json")
            .query_param("auth", PERSONAL_TOKEN)
            .json_body(json!({ "rules": { ".read": true } }));
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "status": "ok" }));
    });
    let get = server.mock(|when, then| {
        when.method(GET)
            .path("/test123/.settings/rules.json")
            .query_param("auth", PERSONAL_TOKEN);
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "rules": { ".read": true } }));
    });

    instance.set_rules(json!({ ".read": true })).await.unwrap();
    assert_eq!(instance.rules().await.unwrap(), json!({ ".read": true }));

    put.assert();
    get.assert();
}

#[tokio::test]
async fn test_set_rules_does_not_double_wrap() {
    let server = MockServer::start();
    let instance = connect(&server).await;

    let put = server.mock(|when, then| {
        when.method(PUT)
            .path("/test123/.settings/rules.json")
            .json_body(json!({ "rules": { ".write": "auth != null" } }));
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "status": "ok" }));
    });

    instance
        .set_rules(json!({ "rules": { ".write": "auth != null" } }))
        .await
        .unwrap();

    put.assert();
}

#[test]
fn test_wrap_rules() {
    let bare = json!({ ".read": true });
    let wrapped = json!({ "rules": { ".read": true } });
    assert_eq!(wrap_rules(bare), wrap_rules(wrapped.clone()));
    assert_eq!(wrap_rules(wrapped.clone()), wrapped);

    // "rules" next to other keys is an ordinary rule path.
    let mixed = json!({ "rules": { ".read": true }, ".write": false });
    assert_eq!(wrap_rules(mixed.clone()), json!({ "rules": mixed }));
}

#[tokio::test]
async fn test_set_rules_rejected() {
    let server = MockServer::start();
    let instance = connect(&server).await;

    server.mock(|when, then| {
        when.method(PUT).path("/test123/.settings/rules.json");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "status": "error", "error": "Line 1: Unexpected token." }));
    });

    let err = instance
        .set_rules(json!({ ".read": "this is not an expression(" }))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Remote { ref message, .. } if message == "Line 1: Unexpected token."));
}

#[tokio::test]
async fn test_set_rules_without_ok_status() {
    let server = MockServer::start();
    let instance = connect(&server).await;

    server.mock(|when, then| {
        when.method(PUT).path("/test123/.settings/rules.json");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "status": "pending" }));
    });

    let err = instance.set_rules(json!({})).await.unwrap_err();
    assert!(matches!(err, Error::Remote { .. }));
}

#[tokio::test]
async fn test_auth_config_not_set() {
    let server = MockServer::start();
    let instance = connect(&server).await;

    server.mock(|when, then| {
        when.method(GET)
            .path("/test123/.settings/.json")
            .query_param("auth", PERSONAL_TOKEN);
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "authConfig": "" }));
    });

    assert_eq!(instance.auth_config().await.unwrap(), None);
}

#[tokio::test]
async fn test_auth_config_parsed() {
    let server = MockServer::start();
    let instance = connect(&server).await;

    let embedded = json!({
        "domains": ["localhost"],
        "sessionLengthSeconds": 3600,
        "password": { "enabled": true },
        "customFlag": 1
    })
    .to_string();
    server.mock(|when, then| {
        when.method(GET).path("/test123/.settings/.json");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "authConfig": embedded }));
    });

    let config = instance.auth_config().await.unwrap().unwrap();
    assert_eq!(config.domains, vec!["localhost"]);
    assert_eq!(config.session_length_seconds, Some(3600));
    assert_eq!(
        config.password,
        Some(ProviderConfig {
            enabled: true,
            ..Default::default()
        })
    );
    assert!(config.github.is_none());
    assert_eq!(config.extra.get("customFlag"), Some(&json!(1)));
}

#[tokio::test]
async fn test_set_auth_config() {
    let server = MockServer::start();
    let instance = connect(&server).await;

    let config = AuthConfig::default();
    let expected = form(&[
        ("token", ADMIN_TOKEN),
        ("authConfig", serde_json::to_string(&config).unwrap().as_str()),
        ("_method", "put"),
    ]);

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/admin/firebase/test123/authConfig")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(expected);
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "success": true }));
    });

    instance.set_auth_config(&config).await.unwrap();

    mock.assert();
}

#[tokio::test]
async fn test_create_user() {
    let server = MockServer::start();
    let instance = connect(&server).await;

    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/auth/firebase/create")
            .query_param("firebase", "test123")
            .query_param("email", "user@example.com")
            .query_param("password", "pw");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "user": {
                    "uid": "simplelogin:1",
                    "id": 1,
                    "email": "user@example.com",
                    "provider": "password"
                }
            }));
    });

    let user = instance.create_user("user@example.com", "pw").await.unwrap();
    assert_eq!(user.uid.as_deref(), Some("simplelogin:1"));
    assert_eq!(user.email.as_deref(), Some("user@example.com"));
    assert_eq!(user.extra.get("id"), Some(&json!(1)));

    mock.assert();
}

#[tokio::test]
async fn test_create_user_error_object() {
    let server = MockServer::start();
    let instance = connect(&server).await;

    server.mock(|when, then| {
        when.method(GET).path("/auth/firebase/create");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "error": {
                    "code": "EMAIL_TAKEN",
                    "message": "The specified email address is already in use."
                }
            }));
    });

    let err = instance.create_user("user@example.com", "pw").await.unwrap_err();
    match err {
        Error::Remote { message, code } => {
            assert_eq!(message, "The specified email address is already in use.");
            assert_eq!(code.as_deref(), Some("EMAIL_TAKEN"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_list_users_empty() {
    let server = MockServer::start();
    let instance = connect(&server).await;

    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/v2/test123/users")
            .query_param("token", ADMIN_TOKEN);
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "users": [] }));
    });

    assert!(instance.list_users().await.unwrap().is_empty());

    mock.assert();
}

#[tokio::test]
async fn test_list_users_malformed() {
    let server = MockServer::start();
    let instance = connect(&server).await;

    server.mock(|when, then| {
        when.method(GET).path("/v2/test123/users");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "count": 0 }));
    });

    let err = instance.list_users().await.unwrap_err();
    assert!(matches!(err, Error::MalformedResponse(_)));
}

#[tokio::test]
async fn test_remove_user() {
    let server = MockServer::start();
    let instance = connect(&server).await;

    let mock = server.mock(|when, then| {
        when.method(DELETE)
            .path("/v2/test123/users/user@example.com")
            .query_param("token", ADMIN_TOKEN);
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({}));
    });

    instance.remove_user("user@example.com").await.unwrap();

    mock.assert();
}

#[tokio::test]
async fn test_change_password_and_reset_email() {
    let server = MockServer::start();
    let instance = connect(&server).await;

    let change = server.mock(|when, then| {
        when.method(GET)
            .path("/auth/firebase/reset_password")
            .query_param("firebase", "test123")
            .query_param("email", "user@example.com")
            .query_param("newPassword", "new-pw");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "status": "ok" }));
    });

    instance
        .change_user_password("user@example.com", "new-pw")
        .await
        .unwrap();
    change.assert();

    let reset = server.mock(|when, then| {
        when.method(GET)
            .path("/auth/firebase/reset_password")
            .query_param("email", "user@example.com");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "status": "ok" }));
    });

    instance.send_reset_email("user@example.com").await.unwrap();
    reset.assert();
}

#[tokio::test]
async fn test_deleted_instance_fails_fast() {
    let server = MockServer::start();
    let instance = connect(&server).await;
    instance.mark_deleted();

    assert!(matches!(instance.auth_tokens().await, Err(Error::DeletedInstance(_))));
    assert!(matches!(instance.add_auth_token().await, Err(Error::DeletedInstance(_))));
    assert!(matches!(instance.remove_auth_token("x").await, Err(Error::DeletedInstance(_))));
    assert!(matches!(instance.rules().await, Err(Error::DeletedInstance(_))));
    assert!(matches!(instance.set_rules(json!({})).await, Err(Error::DeletedInstance(_))));
    assert!(matches!(instance.auth_config().await, Err(Error::DeletedInstance(_))));
    assert!(matches!(
        instance.set_auth_config(&AuthConfig::default()).await,
        Err(Error::DeletedInstance(_))
    ));
    assert!(matches!(instance.create_user("a@b.c", "pw").await, Err(Error::DeletedInstance(_))));
    assert!(matches!(instance.remove_user("a@b.c").await, Err(Error::DeletedInstance(_))));
    assert!(matches!(
        instance.change_user_password("a@b.c", "pw").await,
        Err(Error::DeletedInstance(_))
    ));
    assert!(matches!(instance.list_users().await, Err(Error::DeletedInstance(_))));
    assert!(matches!(instance.send_reset_email("a@b.c").await, Err(Error::DeletedInstance(_))));

    // The URL stays available.
    assert_eq!(instance.url(), server.url("/test123/"));
}
