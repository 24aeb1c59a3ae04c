use clap::Parser;
use pubshare_cli::{dump_to_file, execute, load_config, load_from_file, open_storage, Cli, Command, Role};
use pubshare_crypto::HashCost;
use pubshare_manager::{DenyAllPermissions, ManagerConfig, PublicShareManager};
use pubshare_metadata::{MetadataStorage, SqliteStorage};
use pubshare_types::{PublicShare, PublicShareReference, ResourcePermissions, ShareUpdate, User};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;

fn try_parse(args: &[&str]) -> Result<Cli, clap::Error> {
    Cli::try_parse_from(std::iter::once("pubshare").chain(args.iter().copied()))
}

fn command(args: &[&str]) -> Command {
    try_parse(args).unwrap().command
}

fn manager_over(storage: Arc<dyn MetadataStorage>) -> PublicShareManager {
    let config = ManagerConfig {
        password_hash_cost: HashCost::test(),
        ..ManagerConfig::default()
    };
    PublicShareManager::new(storage, Arc::new(DenyAllPermissions), config)
}

fn manager() -> PublicShareManager {
    manager_over(Arc::new(SqliteStorage::open_in_memory().unwrap()))
}

fn admin() -> User {
    try_parse(&["list"]).unwrap().acting_user()
}

fn share(value: Value) -> PublicShare {
    serde_json::from_value(value).unwrap()
}

// ── Argument parsing ─────────────────────────────────────────────

#[test]
fn default_user_is_local_admin() {
    let user = admin();
    assert_eq!(user.id.idp, "local");
    assert_eq!(user.id.opaque_id, "admin");
    assert_eq!(user.username, "admin");
}

#[test]
fn parses_create_options() {
    let cli = try_parse(&[
        "--store",
        "shares.db",
        "--user",
        "idp:alice",
        "create",
        "storage-1!doc-42",
        "--role",
        "editor",
        "--password",
        "pw",
        "--expires",
        "2030-01-01T00:00:00Z",
    ])
    .unwrap();
    assert_eq!(cli.user.idp, "idp");
    assert_eq!(cli.user.opaque_id, "alice");

    let Command::Create {
        resource,
        role,
        password,
        expires,
        quicklink,
        ..
    } = cli.command
    else {
        panic!("expected create");
    };
    assert_eq!(resource.storage_id, "storage-1");
    assert_eq!(resource.opaque_id, "doc-42");
    assert_eq!(role, Role::Editor);
    assert_eq!(password.as_deref(), Some("pw"));
    assert!(expires.is_some());
    assert!(!quicklink);
}

#[test]
fn rejects_malformed_input() {
    let cases: [&[&str]; 8] = [
        &["--store", "a.db", "--disk", "dir", "list"],
        &["create", "no-separator"],
        &["get"],
        &["get", "--token", "t", "--id", "i"],
        &["update", "--token", "t"],
        &["update", "--token", "t", "--display-name", "x", "--no-expiration"],
        &["redeem", "tok", "--signature", "abcd"],
        &["--user", "nocolon", "list"],
    ];
    for args in cases {
        assert!(try_parse(args).is_err(), "{args:?} should be rejected");
    }
}

#[test]
fn update_flags_map_to_one_change() {
    let cases = [
        (
            vec!["--display-name", "new"],
            ShareUpdate::DisplayName {
                display_name: "new".to_string(),
            },
        ),
        (
            vec!["--role", "uploader"],
            ShareUpdate::Permissions {
                permissions: ResourcePermissions::uploader(),
            },
        ),
        (vec!["--no-expiration"], ShareUpdate::Expiration { expiration: None }),
        (
            vec!["--password", ""],
            ShareUpdate::Password {
                password: String::new(),
            },
        ),
    ];
    for (flags, expected) in cases {
        let mut args = vec!["update", "--id", "abc"];
        args.extend(flags);
        let Command::Update { reference, change } = command(&args) else {
            panic!("expected update");
        };
        assert_eq!(reference.to_reference(), PublicShareReference::id("abc"));
        assert_eq!(change.to_update(), expected);
    }
}

// ── Store and config ─────────────────────────────────────────────

#[test]
fn config_defaults_without_file() {
    let config = load_config(None).unwrap();
    assert_eq!(config.share_dir, "publicshares");
    assert_eq!(config.signature_ttl_secs, 1800);
}

#[test]
fn config_file_overrides_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{ "share_dir": "links", "signature_ttl_secs": 60 }"#).unwrap();

    let config = load_config(Some(path.as_path())).unwrap();
    assert_eq!(config.share_dir, "links");
    assert_eq!(config.signature_ttl_secs, 60);
    assert_eq!(config.metadata_namespace, ManagerConfig::default().metadata_namespace);
}

#[test]
fn broken_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(load_config(Some(path.as_path())).is_err());
    assert!(load_config(Some(dir.path().join("missing.json").as_path())).is_err());
}

#[tokio::test]
async fn disk_and_sqlite_stores_open() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("shares.db");
    let meta = dir.path().join("meta");
    std::fs::create_dir(&meta).unwrap();

    for storage in [
        open_storage(Some(db.as_path()), None).unwrap(),
        open_storage(None, Some(meta.as_path())).unwrap(),
    ] {
        let manager = manager_over(storage);
        let value = execute(&manager, &admin(), command(&["create", "s!doc"])).await.unwrap();
        assert_eq!(share(value).resource_id.opaque_id, "doc");
    }
    assert!(open_storage(Some(db.as_path()), Some(meta.as_path())).is_err());
}

// ── Commands ─────────────────────────────────────────────────────

#[tokio::test]
async fn create_get_update_revoke() {
    let manager = manager();
    let user = admin();

    let created = share(
        execute(
            &manager,
            &user,
            command(&["create", "s!doc", "--name", "Report", "--quicklink"]),
        )
        .await
        .unwrap(),
    );
    assert_eq!(created.display_name, "Report");
    assert!(created.quicklink);
    assert_eq!(created.owner, user.id);

    let fetched = share(
        execute(&manager, &user, command(&["get", "--id", &created.id.opaque_id]))
            .await
            .unwrap(),
    );
    assert_eq!(fetched, created);

    let updated = share(
        execute(
            &manager,
            &user,
            command(&["update", "--token", &created.token, "--role", "manager"]),
        )
        .await
        .unwrap(),
    );
    assert_eq!(updated.permissions, ResourcePermissions::manager());

    let revoked = execute(&manager, &user, command(&["revoke", "--token", &created.token]))
        .await
        .unwrap();
    assert_eq!(revoked["revoked"]["token"], created.token.as_str());

    assert!(execute(&manager, &user, command(&["get", "--token", &created.token]))
        .await
        .is_err());
}

#[tokio::test]
async fn list_returns_own_links_only() {
    let manager = manager();
    let admin = admin();
    let bob = try_parse(&["--user", "local:bob", "list"]).unwrap().acting_user();

    execute(&manager, &admin, command(&["create", "s!a"])).await.unwrap();
    execute(&manager, &admin, command(&["create", "s!b"])).await.unwrap();
    execute(&manager, &bob, command(&["create", "s!a", "--owner", "local:bob"]))
        .await
        .unwrap();

    let all = execute(&manager, &admin, command(&["list"])).await.unwrap();
    assert_eq!(all.as_array().unwrap().len(), 2);

    let on_a = execute(&manager, &admin, command(&["list", "--resource", "s!a"])).await.unwrap();
    assert_eq!(on_a.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn redeem_with_password_and_signature() {
    let manager = manager();
    let user = admin();
    let created = share(
        execute(&manager, &user, command(&["create", "s!doc", "--password", "pw"]))
            .await
            .unwrap(),
    );
    assert!(created.password_protected);

    assert!(execute(&manager, &user, command(&["redeem", &created.token]))
        .await
        .is_err());

    let redeemed = share(
        execute(
            &manager,
            &user,
            command(&["redeem", &created.token, "--password", "pw", "--sign"]),
        )
        .await
        .unwrap(),
    );
    let signature = redeemed.signature.expect("signature");
    let expires = signature.expiration.to_rfc3339();

    let again = share(
        execute(
            &manager,
            &user,
            command(&[
                "redeem",
                &created.token,
                "--signature",
                &signature.signature,
                "--signature-expires",
                &expires,
            ]),
        )
        .await
        .unwrap(),
    );
    assert_eq!(again.token, created.token);
}

#[tokio::test]
async fn dump_then_load_between_stores() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("shares.jsonl");
    let user = admin();

    let source = manager();
    let created = share(
        execute(&source, &user, command(&["create", "s!doc", "--password", "pw"]))
            .await
            .unwrap(),
    );
    execute(&source, &user, command(&["create", "s!other"])).await.unwrap();
    assert_eq!(dump_to_file(&source, &file).await.unwrap(), 2);
    assert_eq!(std::fs::read_to_string(&file).unwrap().lines().count(), 2);

    let target = manager();
    assert_eq!(load_from_file(&target, &file).await.unwrap(), 2);

    let redeemed = share(
        execute(
            &target,
            &user,
            command(&["redeem", &created.token, "--password", "pw"]),
        )
        .await
        .unwrap(),
    );
    assert_eq!(redeemed, created);
}

#[tokio::test]
async fn load_rejects_garbage_lines() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("shares.jsonl");
    std::fs::write(&file, "\n{ not a share }\n").unwrap();

    assert!(load_from_file(&manager(), &file).await.is_err());
    assert!(load_from_file(&manager(), &dir.path().join("missing.jsonl")).await.is_err());
}
