use proxyctl_core::{
    EntityKind, EntityRef, KeySpec, MemberSpec, ModelId, ModelSpec, ProxyError, TeamId, TeamSpec,
    UserId, UserSpec,
};
use proxyctl_gateway::mock::{Fault, MockBackend};
use proxyctl_gateway::{Gateway, GatewayResponse, Method, TransportError};
use proxyctl_sync::{state, Deletion, Observed, Provisioner, RetryPolicy, Upserted};
use tempfile::TempDir;

fn provisioner(backend: &MockBackend, attempts: u32) -> Provisioner<&MockBackend> {
    Provisioner::new(backend, RetryPolicy::immediate(attempts)).with_sleep(|_| {})
}

// ---------------------------------------------------------------------------
// Create and verify
// ---------------------------------------------------------------------------

#[test]
fn create_waits_out_visibility_lag() {
    let backend = MockBackend::new().with_visibility_lag(2);
    let spec = UserSpec {
        user_email: Some("ada@example.com".into()),
        ..UserSpec::with_id(UserId::from("u-1"))
    };

    let info = provisioner(&backend, 5)
        .create_user_verified(&spec)
        .expect("visible after lag");

    assert!(info.describes(&spec.user_id));
    assert_eq!(backend.count_calls(Method::Get, "/user/info"), 3);
}

#[test]
fn create_gives_up_after_budget() {
    let backend = MockBackend::new().with_visibility_lag(10);
    let err = provisioner(&backend, 3)
        .create_team_verified(&TeamSpec::with_id(TeamId::from("t-1")))
        .unwrap_err();

    assert!(err.is_not_found(), "got: {err:?}");
    assert_eq!(backend.count_calls(Method::Get, "/team/info"), 3);
}

#[test]
fn rejected_create_is_not_retried() {
    let backend = MockBackend::new();
    backend.seed_team("t-1");
    let err = provisioner(&backend, 5)
        .create_team_verified(&TeamSpec::with_id(TeamId::from("t-1")))
        .unwrap_err();

    assert!(matches!(err, ProxyError::Rejected { status: 400, .. }), "got: {err:?}");
    assert_eq!(backend.count_calls(Method::Get, "/team/info"), 0);
}

#[test]
fn generated_user_id_is_reused() {
    let backend = MockBackend::new();
    let spec = UserSpec::new();
    provisioner(&backend, 3).create_user_verified(&spec).unwrap();

    let calls = backend.calls();
    assert_eq!(calls[0].body.as_ref().unwrap()["user_id"], spec.user_id.as_str());
    assert!(calls[1].path.ends_with(spec.user_id.as_str()));
}

#[test]
fn model_create_is_verified_by_deployment_id() {
    let backend = MockBackend::new().with_visibility_lag(1);
    let spec = ModelSpec::new("gpt-4o", "openai/gpt-4o");

    let record = provisioner(&backend, 3)
        .create_model_verified(&spec)
        .expect("model visible");

    assert_eq!(record.id(), Some(spec.model_id.as_str()));
    assert_eq!(record.model_name.as_deref(), Some("gpt-4o"));
}

#[test]
fn generated_key_keeps_hashed_token_and_secret() {
    let backend = MockBackend::new().with_visibility_lag(1);
    backend.seed_user("u-1");
    let spec = KeySpec {
        user_id: Some(UserId::from("u-1")),
        key_alias: Some("ci".into()),
        ..KeySpec::default()
    };

    let key = provisioner(&backend, 3).generate_key_verified(&spec).unwrap();

    assert_eq!(key.token.as_str(), "hashed-0001");
    assert_eq!(key.secret.as_deref(), Some("sk-mock-0001"));
    assert_eq!(key.record.key_alias.as_deref(), Some("ci"));
}

#[test]
fn member_add_waits_for_team_to_show_on_user() {
    let backend = MockBackend::new().with_visibility_lag(2);
    backend.seed_team("t-1");
    backend.seed_user("u-1");
    let spec = MemberSpec::new(TeamId::from("t-1"), UserId::from("u-1"));

    let info = provisioner(&backend, 5)
        .add_member_verified(&spec)
        .expect("membership visible");

    assert!(info.team_ids().contains(&spec.team_id));
    assert_eq!(backend.count_calls(Method::Get, "/user/info"), 3);
}

// ---------------------------------------------------------------------------
// Upsert
// ---------------------------------------------------------------------------

#[test]
fn upsert_of_missing_user_creates_it() {
    let backend = MockBackend::new();
    let spec = UserSpec::with_id(UserId::from("u-new"));

    let result = provisioner(&backend, 3).upsert_user(&spec).expect("upsert");

    assert!(result.was_created());
    assert!(backend.has_user("u-new"));
    assert_eq!(backend.count_calls(Method::Post, "/user/update"), 1);
    assert_eq!(backend.count_calls(Method::Post, "/user/new"), 1);
}

#[test]
fn upsert_of_existing_user_updates_it() {
    let backend = MockBackend::new();
    backend.seed_user("u-1");
    let spec = UserSpec {
        user_email: Some("new@example.com".into()),
        ..UserSpec::with_id(UserId::from("u-1"))
    };

    let result = provisioner(&backend, 3).upsert_user(&spec).unwrap();

    assert!(matches!(result, Upserted::Updated(_)));
    assert_eq!(backend.user_email("u-1").as_deref(), Some("new@example.com"));
    assert_eq!(backend.count_calls(Method::Post, "/user/new"), 0);
}

#[test]
fn upsert_of_missing_model_creates_it() {
    let backend = MockBackend::new();
    let mut spec = ModelSpec::new("claude", "anthropic/claude-3-5-sonnet");
    spec.model_id = ModelId::from("m-1");

    let result = provisioner(&backend, 3).upsert_model(&spec).expect("upsert");

    assert!(result.was_created());
    assert_eq!(backend.model_name("m-1").as_deref(), Some("claude"));
}

#[test]
fn upsert_surfaces_rejected_update() {
    let backend = MockBackend::new();
    backend.fail_next(
        Method::Post,
        "/team/update",
        Fault::Respond {
            status: 403,
            body: r#"{"error":{"message":"not allowed"}}"#.into(),
        },
    );

    let err = provisioner(&backend, 3)
        .upsert_team(&TeamSpec::with_id(TeamId::from("t-1")))
        .unwrap_err();

    assert!(matches!(err, ProxyError::Rejected { status: 403, .. }));
    assert!(!backend.has_team("t-1"));
}

// ---------------------------------------------------------------------------
// Delete and observe
// ---------------------------------------------------------------------------

#[test]
fn delete_is_idempotent_for_every_kind() {
    let backend = MockBackend::new();
    backend.seed_user("u-1");
    backend.seed_team("t-1");
    backend.seed_key("sk-a", None);
    backend.seed_model("m-1", "gpt-4o");
    let prov = provisioner(&backend, 3);

    for entity in [
        EntityRef::new(EntityKind::User, "u-1"),
        EntityRef::new(EntityKind::Team, "t-1"),
        EntityRef::new(EntityKind::Key, "sk-a"),
        EntityRef::new(EntityKind::Model, "m-1"),
    ] {
        assert_eq!(prov.delete_entity(&entity).unwrap(), Deletion::Deleted, "{entity}");
        assert_eq!(prov.delete_entity(&entity).unwrap(), Deletion::AlreadyGone, "{entity}");
    }
}

#[test]
fn observe_reports_presence_and_absence() {
    let backend = MockBackend::new();
    backend.seed_model("m-1", "gpt-4o");
    let prov = provisioner(&backend, 3);

    let present = prov.observe(&EntityRef::new(EntityKind::Model, "m-1")).unwrap();
    assert!(matches!(present, Some(Observed::Model(_))));
    assert!(prov
        .observe(&EntityRef::new(EntityKind::Model, "m-2"))
        .unwrap()
        .is_none());
    assert!(prov
        .observe(&EntityRef::new(EntityKind::Team, "t-9"))
        .unwrap()
        .is_none());
}

#[test]
fn observe_does_not_retry() {
    let backend = MockBackend::new().with_visibility_lag(1);
    let prov = provisioner(&backend, 5);
    prov.client()
        .create_user(&UserSpec::with_id(UserId::from("u-1")))
        .unwrap();

    assert!(prov
        .observe(&EntityRef::new(EntityKind::User, "u-1"))
        .unwrap()
        .is_none());
    assert_eq!(backend.count_calls(Method::Get, "/user/info"), 1);
}

// ---------------------------------------------------------------------------
// Refresh
// ---------------------------------------------------------------------------

#[test]
fn refresh_drops_gone_entities() {
    let home = TempDir::new().expect("tempdir");
    let backend = MockBackend::new();
    backend.seed_user("u-1");
    let user = EntityRef::new(EntityKind::User, "u-1");
    let team = EntityRef::new(EntityKind::Team, "t-gone");
    state::update_at(home.path(), |s| {
        s.record(user.clone(), None);
        s.record(team.clone(), Some("platform".into()));
    })
    .unwrap();

    let outcomes = proxyctl_sync::refresh_at(home.path(), &provisioner(&backend, 3)).unwrap();

    assert_eq!(outcomes.len(), 2);
    let after = state::load_at(home.path()).unwrap();
    assert!(after.get(&user).is_some());
    assert!(after.get(&team).is_none());
}

#[test]
fn refresh_saves_progress_before_failing() {
    let home = TempDir::new().expect("tempdir");
    let backend = MockBackend::new();
    backend.seed_user("u-1");
    let team = EntityRef::new(EntityKind::Team, "t-gone");
    let user = EntityRef::new(EntityKind::User, "u-1");
    state::update_at(home.path(), |s| {
        s.record(team.clone(), None);
        s.record(user.clone(), None);
    })
    .unwrap();
    backend.fail_next(Method::Get, "/user/info", Fault::Transport);

    let err = proxyctl_sync::refresh_at(home.path(), &provisioner(&backend, 3)).unwrap_err();

    assert!(matches!(
        err.as_proxy(),
        Some(ProxyError::Transport(_))
    ));
    let after = state::load_at(home.path()).unwrap();
    assert!(after.get(&team).is_none(), "handled entry was saved");
    assert!(after.get(&user).is_some(), "unhandled entry kept");
}

/// Answers every call the way the web framework answers an unknown route.
struct WrongPrefix;

impl Gateway for WrongPrefix {
    fn call(
        &self,
        _method: Method,
        _path: &str,
        _body: Option<&serde_json::Value>,
    ) -> Result<GatewayResponse, TransportError> {
        Ok(GatewayResponse::new(404, r#"{"detail":"Not Found"}"#))
    }
}

#[test]
fn refresh_keeps_entries_when_routes_are_missing() {
    let home = TempDir::new().expect("tempdir");
    let user = EntityRef::new(EntityKind::User, "u-1");
    let team = EntityRef::new(EntityKind::Team, "t-1");
    state::update_at(home.path(), |s| {
        s.record(user.clone(), None);
        s.record(team.clone(), None);
    })
    .unwrap();
    let prov = Provisioner::new(WrongPrefix, RetryPolicy::immediate(3)).with_sleep(|_| {});

    let err = proxyctl_sync::refresh_at(home.path(), &prov).unwrap_err();

    assert!(matches!(
        err.as_proxy(),
        Some(ProxyError::Rejected { status: 404, .. })
    ));
    let after = state::load_at(home.path()).unwrap();
    assert!(after.get(&user).is_some());
    assert!(after.get(&team).is_some());
}
