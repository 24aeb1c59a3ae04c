mod common;

use chrono::{Duration, Utc};
use common::{fixture, resource, resource_id, user, Fixture};
use pubshare_metadata::MetadataStorage;
use pubshare_types::{Grant, ListFilter, PublicShare, ResourcePermissions};
use std::collections::BTreeSet;

fn tokens(shares: &[PublicShare]) -> BTreeSet<String> {
    shares.iter().map(|s| s.token.clone()).collect()
}

fn set(shares: &[&PublicShare]) -> BTreeSet<String> {
    shares.iter().map(|s| s.token.clone()).collect()
}

fn viewer() -> Grant {
    Grant::new(ResourcePermissions::viewer())
}

// ── Own shares ───────────────────────────────────────────────────

#[tokio::test]
async fn lists_only_own_shares_without_filters() {
    let Fixture { manager, .. } = fixture();
    let alice = user("alice");
    let bob = user("bob");

    let a1 = manager.create(&alice, &resource(&alice, "a-1"), &viewer()).await.unwrap();
    let a2 = manager.create(&alice, &resource(&alice, "a-2"), &viewer()).await.unwrap();
    let b1 = manager.create(&bob, &resource(&bob, "b-1"), &viewer()).await.unwrap();

    let listed = manager.list(&alice, &[], false).await.unwrap();
    assert_eq!(tokens(&listed), set(&[&a1, &a2]));

    let listed = manager.list(&bob, &[], false).await.unwrap();
    assert_eq!(tokens(&listed), set(&[&b1]));
}

#[tokio::test]
async fn owner_and_creator_both_see_the_share() {
    let Fixture { manager, .. } = fixture();
    let alice = user("alice");
    let bob = user("bob");

    // bob links alice's file
    let share = manager.create(&bob, &resource(&alice, "a-1"), &viewer()).await.unwrap();

    assert_eq!(tokens(&manager.list(&alice, &[], false).await.unwrap()), set(&[&share]));
    assert_eq!(tokens(&manager.list(&bob, &[], false).await.unwrap()), set(&[&share]));
    assert!(manager.list(&user("carol"), &[], false).await.unwrap().is_empty());
}

#[tokio::test]
async fn owner_filter_narrows_own_shares() {
    let Fixture { manager, .. } = fixture();
    let alice = user("alice");
    let bob = user("bob");

    let on_bobs = manager.create(&alice, &resource(&bob, "b-1"), &viewer()).await.unwrap();
    manager.create(&alice, &resource(&alice, "a-1"), &viewer()).await.unwrap();

    let listed = manager
        .list(&alice, &[ListFilter::Owner(bob.id.clone())], false)
        .await
        .unwrap();
    assert_eq!(tokens(&listed), set(&[&on_bobs]));
}

#[tokio::test]
async fn empty_store_lists_nothing() {
    let Fixture { manager, .. } = fixture();
    assert!(manager.list(&user("alice"), &[], true).await.unwrap().is_empty());
}

// ── Resource filters and grants ─────────────────────────────────

#[tokio::test]
async fn other_users_shares_need_list_grants() {
    let Fixture {
        manager, permissions, ..
    } = fixture();
    let u1 = user("u1");
    let u2 = user("u2");
    let carol = user("carol");
    let info = resource(&carol, "shared");
    let filters = [ListFilter::ResourceId(info.id.clone())];

    let s1 = manager.create(&u1, &info, &viewer()).await.unwrap();
    let s2 = manager.create(&u2, &info, &viewer()).await.unwrap();

    let listed = manager.list(&u2, &filters, false).await.unwrap();
    assert_eq!(tokens(&listed), set(&[&s2]));

    permissions.allow(&u2, &info.id);
    let listed = manager.list(&u2, &filters, false).await.unwrap();
    assert_eq!(tokens(&listed), set(&[&s1, &s2]));
    // own shares come first
    assert_eq!(listed[0].token, s2.token);
}

#[tokio::test]
async fn permission_check_runs_once_per_resource() {
    let Fixture {
        manager, permissions, ..
    } = fixture();
    let alice = user("alice");
    let bob = user("bob");
    let carol = user("carol");
    let first = resource(&carol, "r-1");
    let second = resource(&carol, "r-2");

    for _ in 0..3 {
        manager.create(&bob, &first, &viewer()).await.unwrap();
        manager.create(&bob, &second, &viewer()).await.unwrap();
    }
    permissions.allow(&alice, &first.id);

    let filters = [
        ListFilter::ResourceId(first.id.clone()),
        ListFilter::ResourceId(second.id.clone()),
    ];
    let listed = manager.list(&alice, &filters, false).await.unwrap();

    assert_eq!(listed.len(), 3);
    assert!(listed.iter().all(|s| s.resource_id == first.id));
    assert_eq!(permissions.calls(), 2);
}

#[tokio::test]
async fn own_shares_skip_the_permission_check() {
    let Fixture {
        manager, permissions, ..
    } = fixture();
    let alice = user("alice");
    let info = resource(&alice, "a-1");
    manager.create(&alice, &info, &viewer()).await.unwrap();

    let listed = manager
        .list(&alice, &[ListFilter::ResourceId(info.id.clone())], false)
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(permissions.calls(), 0);
}

#[tokio::test]
async fn filters_of_one_type_are_alternatives() {
    let Fixture { manager, .. } = fixture();
    let alice = user("alice");
    let bob = user("bob");

    let s1 = manager.create(&alice, &resource(&alice, "a-1"), &viewer()).await.unwrap();
    let s2 = manager.create(&alice, &resource(&alice, "a-2"), &viewer()).await.unwrap();
    let s3 = manager.create(&bob, &resource(&alice, "a-1"), &viewer()).await.unwrap();
    manager.create(&alice, &resource(&alice, "a-3"), &viewer()).await.unwrap();

    let both = [
        ListFilter::ResourceId(resource_id("a-1")),
        ListFilter::ResourceId(resource_id("a-2")),
    ];
    let listed = manager.list(&alice, &both, false).await.unwrap();
    assert_eq!(tokens(&listed), set(&[&s1, &s2, &s3]));

    let by_bob = [
        ListFilter::ResourceId(resource_id("a-1")),
        ListFilter::Creator(bob.id.clone()),
    ];
    let listed = manager.list(&alice, &by_bob, false).await.unwrap();
    assert_eq!(tokens(&listed), set(&[&s3]));

    let by_either = [
        ListFilter::ResourceId(resource_id("a-1")),
        ListFilter::Creator(alice.id.clone()),
        ListFilter::Creator(bob.id.clone()),
    ];
    let listed = manager.list(&alice, &by_either, false).await.unwrap();
    assert_eq!(tokens(&listed), set(&[&s1, &s3]));
}

#[tokio::test]
async fn failing_permission_check_hides_the_resource() {
    let Fixture {
        manager, permissions, ..
    } = fixture();
    let alice = user("alice");
    let bob = user("bob");
    let carol = user("carol");
    let info = resource(&carol, "broken");

    manager.create(&bob, &info, &viewer()).await.unwrap();
    let own = manager.create(&alice, &info, &viewer()).await.unwrap();
    permissions.allow(&alice, &info.id);
    permissions.break_resource(&info.id);

    let listed = manager
        .list(&alice, &[ListFilter::ResourceId(info.id.clone())], false)
        .await
        .unwrap();
    assert_eq!(tokens(&listed), set(&[&own]));
}

// ── Expiry and stale entries ────────────────────────────────────

#[tokio::test]
async fn expired_shares_are_purged_while_listing() {
    let Fixture { manager, storage, .. } = fixture();
    let alice = user("alice");
    let live = manager.create(&alice, &resource(&alice, "a-1"), &viewer()).await.unwrap();
    let expired = manager
        .create(
            &alice,
            &resource(&alice, "a-2"),
            &viewer().with_expiration(Utc::now() - Duration::minutes(1)),
        )
        .await
        .unwrap();

    let listed = manager.list(&alice, &[], false).await.unwrap();
    assert_eq!(tokens(&listed), set(&[&live]));

    let entries = storage.list_dir("publicshares").await.unwrap();
    let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec![live.token.as_str()]);
    assert!(!names.contains(&expired.token.as_str()));
}

#[tokio::test]
async fn expired_grants_are_not_listed() {
    let Fixture {
        manager,
        permissions,
        storage,
    } = fixture();
    let alice = user("alice");
    let bob = user("bob");
    let info = resource(&bob, "b-1");
    permissions.allow(&alice, &info.id);

    manager
        .create(&bob, &info, &viewer().with_expiration(Utc::now() - Duration::minutes(1)))
        .await
        .unwrap();

    let listed = manager
        .list(&alice, &[ListFilter::ResourceId(info.id.clone())], false)
        .await
        .unwrap();
    assert!(listed.is_empty());
    assert_eq!(permissions.calls(), 1);
    assert!(storage.list_dir("publicshares").await.unwrap().is_empty());
}

#[tokio::test]
async fn expired_shares_on_unlisted_resources_are_left_alone() {
    let Fixture {
        manager,
        permissions,
        storage,
    } = fixture();
    let alice = user("alice");
    let bob = user("bob");
    let info = resource(&bob, "b-1");

    let share = manager
        .create(&bob, &info, &viewer().with_expiration(Utc::now() - Duration::minutes(1)))
        .await
        .unwrap();

    let listed = manager
        .list(&alice, &[ListFilter::ResourceId(info.id.clone())], false)
        .await
        .unwrap();
    assert!(listed.is_empty());
    assert_eq!(permissions.calls(), 1);

    let entries = storage.list_dir("publicshares").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, share.token);

    // the owner's own listing still purges it
    let listed = manager
        .list(&bob, &[ListFilter::ResourceId(info.id.clone())], false)
        .await
        .unwrap();
    assert!(listed.is_empty());
    assert!(storage.list_dir("publicshares").await.unwrap().is_empty());
}

#[tokio::test]
async fn index_entries_without_blob_are_skipped() {
    let Fixture { manager, storage, .. } = fixture();
    let alice = user("alice");
    let kept = manager.create(&alice, &resource(&alice, "a-1"), &viewer()).await.unwrap();
    let lost = manager.create(&alice, &resource(&alice, "a-2"), &viewer()).await.unwrap();

    storage
        .delete(&format!("publicshares/{}", lost.token))
        .await
        .unwrap();

    let listed = manager.list(&alice, &[], false).await.unwrap();
    assert_eq!(tokens(&listed), set(&[&kept]));
}

// ── Signing ──────────────────────────────────────────────────────

#[tokio::test]
async fn only_own_shares_are_signed() {
    let Fixture {
        manager, permissions, ..
    } = fixture();
    let alice = user("alice");
    let bob = user("bob");
    let carol = user("carol");
    let info = resource(&carol, "c-1");
    let filters = [ListFilter::ResourceId(info.id.clone())];
    permissions.allow(&alice, &info.id);

    manager
        .create(&bob, &info, &viewer().with_password("pw"))
        .await
        .unwrap();
    manager.create(&alice, &info, &viewer()).await.unwrap();
    let own_protected = manager
        .create(&alice, &info, &viewer().with_password("pw"))
        .await
        .unwrap();

    let listed = manager.list(&alice, &filters, true).await.unwrap();
    assert_eq!(listed.len(), 3);
    for share in &listed {
        let expect_signature = share.token == own_protected.token;
        assert_eq!(share.signature.is_some(), expect_signature, "{}", share.token);
    }

    let unsigned = manager.list(&alice, &filters, false).await.unwrap();
    assert!(unsigned.iter().all(|s| s.signature.is_none()));

    let bobs = manager.list(&bob, &filters, true).await.unwrap();
    assert_eq!(bobs.len(), 1);
    assert!(bobs[0].signature.is_some());
}
