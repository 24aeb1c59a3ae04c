use chrono::{Duration, TimeZone, Utc};
use pubshare_types::{
    matches_filters, Grant, ListFilter, PublicShare, PublicShareId, ResourceId,
    ResourcePermissions, ShareUpdate, UserId,
};

fn share(owner: &str, creator: &str, resource: &str) -> PublicShare {
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    PublicShare {
        id: PublicShareId::new("id-1"),
        token: "tok".to_string(),
        owner: UserId::new("idp", owner),
        creator: UserId::new("idp", creator),
        resource_id: ResourceId::new("s", resource),
        permissions: ResourcePermissions::viewer(),
        ctime: now,
        mtime: now,
        expiration: None,
        display_name: "tok".to_string(),
        quicklink: false,
        password_protected: false,
        signature: None,
    }
}

// ── Expiration ───────────────────────────────────────────────────

#[test]
fn share_without_expiration_never_expires() {
    let s = share("u1", "u1", "r1");
    assert!(!s.is_expired());
    assert!(!s.is_expired_at(Utc::now() + Duration::days(3650)));
}

#[test]
fn share_expires_after_deadline() {
    let mut s = share("u1", "u1", "r1");
    let deadline = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    s.expiration = Some(deadline);
    assert!(!s.is_expired_at(deadline - Duration::seconds(1)));
    assert!(s.is_expired_at(deadline + Duration::seconds(1)));
    assert!(s.is_expired());
}

// ── Filters ──────────────────────────────────────────────────────

#[test]
fn empty_filter_list_matches_everything() {
    assert!(matches_filters(&share("u1", "u2", "r1"), &[]));
}

#[test]
fn filters_of_same_type_are_alternatives() {
    let s = share("u1", "u1", "r2");
    let filters = vec![
        ListFilter::ResourceId(ResourceId::new("s", "r1")),
        ListFilter::ResourceId(ResourceId::new("s", "r2")),
    ];
    assert!(matches_filters(&s, &filters));
}

#[test]
fn filters_of_different_types_must_all_match() {
    let s = share("u1", "u2", "r1");
    let matching = vec![
        ListFilter::ResourceId(ResourceId::new("s", "r1")),
        ListFilter::Creator(UserId::new("idp", "u2")),
    ];
    assert!(matches_filters(&s, &matching));

    let wrong_owner = vec![
        ListFilter::ResourceId(ResourceId::new("s", "r1")),
        ListFilter::Owner(UserId::new("idp", "u2")),
    ];
    assert!(!matches_filters(&s, &wrong_owner));
}

// ── Serialization ────────────────────────────────────────────────

#[test]
fn signature_and_expiration_are_omitted_when_absent() {
    let json = serde_json::to_string(&share("u1", "u1", "r1")).unwrap();
    assert!(!json.contains("signature"));
    assert!(!json.contains("expiration"));
}

#[test]
fn unknown_update_type_deserializes_to_unspecified() {
    let update: ShareUpdate = serde_json::from_str(r#"{"type":"transfer_owner"}"#).unwrap();
    assert_eq!(update, ShareUpdate::Unspecified);
}

#[test]
fn known_update_types_deserialize() {
    let update: ShareUpdate =
        serde_json::from_str(r#"{"type":"display_name","display_name":"Holiday"}"#).unwrap();
    assert_eq!(
        update,
        ShareUpdate::DisplayName {
            display_name: "Holiday".to_string()
        }
    );

    let update: ShareUpdate = serde_json::from_str(r#"{"type":"expiration"}"#).unwrap();
    assert_eq!(update, ShareUpdate::Expiration { expiration: None });
}

#[test]
fn grant_builders() {
    let grant = Grant::new(ResourcePermissions::editor()).with_password("pw");
    assert_eq!(grant.password.as_deref(), Some("pw"));
    assert!(grant.permissions.initiate_file_upload);
    assert!(grant.expiration.is_none());
}

#[test]
fn permission_presets_are_nested() {
    let viewer = ResourcePermissions::viewer();
    let manager = ResourcePermissions::manager();
    assert!(!viewer.list_grants);
    assert!(manager.list_grants);
    assert!(manager.stat && manager.initiate_file_upload);
}
