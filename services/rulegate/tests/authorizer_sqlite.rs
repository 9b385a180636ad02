mod common;

use common::{file_store, strings};
use rulegate::adapter::{AdapterError, FilteredPolicyAdapter, PolicyAdapter, StoreAdapter};
use rulegate::authorizer::{Authorizer, AuthzError};
use rulegate::gates::Gate;
use rulegate::store::RuleStore;
use rulegate::store::sqlite::SqliteRuleStore;
use rulegate_policy::{Principal, PolicyModel};
use std::sync::Arc;

fn adapter(store: &SqliteRuleStore) -> Arc<StoreAdapter> {
    Arc::new(StoreAdapter::new(Arc::new(store.clone())))
}

#[tokio::test]
async fn saved_policy_survives_reopen() {
    let (store, cfg, _dir) = file_store().await;
    let model = PolicyModel::from_lines([
        "p, admins, admin_text, read, allow",
        "p, u5, report_text, read, deny",
        "g, u3, admins",
    ])
    .expect("model");
    adapter(&store).save_policy(&model).await.expect("save");
    drop(store);

    let reopened = SqliteRuleStore::connect(&cfg).await.expect("reopen");
    let loaded = adapter(&reopened).load_policy().await.expect("load");
    let mut expected = model.to_lines();
    let mut actual = loaded.to_lines();
    expected.sort();
    actual.sort();
    assert_eq!(actual, expected);
}

#[tokio::test]
async fn save_replaces_every_stored_rule() {
    let (store, _cfg, _dir) = file_store().await;
    let adapter = adapter(&store);
    adapter
        .add_policy("p", "p", &strings(&["u1", "report_text", "read", "allow"]))
        .await
        .expect("add");
    adapter
        .add_policy("g", "g", &strings(&["u1", "clerks"]))
        .await
        .expect("add");

    let model = PolicyModel::from_lines(["p, clerks, report_text, read, allow"]).expect("model");
    adapter.save_policy(&model).await.expect("save");

    let loaded = adapter.load_policy().await.expect("load");
    assert_eq!(loaded, model);
    assert!(loaded.groupings().is_empty());
}

#[tokio::test]
async fn legacy_rows_are_disambiguated_on_load() {
    let (store, _cfg, _dir) = file_store().await;
    store
        .insert_raw(None, [Some("alice"), Some("doc1"), Some("read"), Some("allow")])
        .await
        .expect("insert");
    store
        .insert_raw(None, [Some("alice"), Some("managers"), None, None])
        .await
        .expect("insert");
    store
        .insert_raw(Some("g"), [Some("bob"), Some("managers"), None, None])
        .await
        .expect("insert");

    let loaded = adapter(&store).load_policy().await.expect("load");
    assert_eq!(
        loaded.to_lines(),
        vec![
            "p, alice, doc1, read, allow".to_string(),
            "g, alice, managers".to_string(),
            "g, bob, managers".to_string(),
        ]
    );
}

#[tokio::test]
async fn corrupt_row_aborts_initialization() {
    let (store, _cfg, _dir) = file_store().await;
    store
        .insert_raw(None, [Some("admins"), Some("admin_text"), Some("read"), Some("allow")])
        .await
        .expect("insert");
    let bad = store
        .insert_raw(None, [Some("alice"), Some("doc1"), Some("read"), None])
        .await
        .expect("insert");

    match Authorizer::new(adapter(&store)).await {
        Err(AuthzError::Adapter(AdapterError::CorruptRow { id, .. })) => assert_eq!(id, bad),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("initialization must fail on a corrupt row"),
    }
}

#[tokio::test]
async fn default_deny_and_role_inheritance() {
    let (store, _cfg, _dir) = file_store().await;
    let authz = Authorizer::new(adapter(&store)).await.expect("authorizer");
    let u3 = Principal::from_user_id(3);
    let u7 = Principal::from_user_id(7);

    assert!(!authz.check_access(u7.as_str(), "admin_text", "read"));

    authz
        .add_policy("g", "g", &strings(&["u3", "admins"]))
        .await
        .expect("grouping");
    authz
        .add_policy("p", "p", &strings(&["admins", "admin_text", "read", "allow"]))
        .await
        .expect("permission");

    assert!(authz.allows(u3.as_str(), Gate::AdminText));
    assert!(!authz.allows(u7.as_str(), Gate::AdminText));
    assert_eq!(store.list_rules().await.expect("list").len(), 2);
}

#[tokio::test]
async fn exact_removal_then_no_op() {
    let (store, _cfg, _dir) = file_store().await;
    let authz = Authorizer::new(adapter(&store)).await.expect("authorizer");
    let allow = strings(&["u3", "report_text", "read", "allow"]);
    let deny = strings(&["u3", "report_text", "write", "deny"]);
    authz.add_policy("p", "p", &allow).await.expect("add");
    authz.add_policy("p", "p", &deny).await.expect("add");

    assert!(authz.remove_policy("p", "p", &allow).await.expect("remove"));
    assert!(!authz.remove_policy("p", "p", &allow).await.expect("no-op"));
    assert!(!authz.check_access("u3", "report_text", "read"));

    let remaining = store.list_rules().await.expect("list");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].action.as_deref(), Some("write"));
}

#[tokio::test]
async fn legacy_rule_with_capitalized_effect_can_be_revoked() {
    let (store, _cfg, _dir) = file_store().await;
    store
        .insert_raw(None, [Some("u3"), Some("admin_text"), Some("read"), Some("Allow")])
        .await
        .expect("insert");
    let authz = Authorizer::new(adapter(&store)).await.expect("authorizer");
    assert!(authz.check_access("u3", "admin_text", "read"));

    let rule = strings(&["u3", "admin_text", "read", "allow"]);
    assert!(authz.remove_policy("p", "p", &rule).await.expect("remove"));
    assert!(!authz.check_access("u3", "admin_text", "read"));
    assert!(store.list_rules().await.expect("list").is_empty());
}

#[tokio::test]
async fn filtered_removal_always_fails() {
    let (store, _cfg, _dir) = file_store().await;
    store
        .insert_raw(Some("p"), [Some("u3"), Some("report_text"), Some("read"), Some("allow")])
        .await
        .expect("insert");
    let adapter = adapter(&store);

    for values in [Vec::new(), strings(&["u3"])] {
        let err = adapter
            .remove_filtered_policy("p", "p", 0, &values)
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Unimplemented(_)));
    }
    assert_eq!(store.list_rules().await.expect("list").len(), 1);
}

#[tokio::test]
async fn import_replaces_policy_and_persists_it() {
    let (store, cfg, _dir) = file_store().await;
    let authz = Authorizer::new(adapter(&store)).await.expect("authorizer");
    authz
        .add_policy("p", "p", &strings(&["u9", "admin_text", "read", "allow"]))
        .await
        .expect("add");

    let model = PolicyModel::from_lines([
        "p, clerks, inputbox_client_name, write, allow",
        "p, clerks, inputbox_time_spent, write, allow",
        "g, u1, clerks",
    ])
    .expect("model");
    authz.replace_policy(model.clone()).await.expect("replace");

    assert!(!authz.check_access("u9", "admin_text", "read"));
    assert!(rulegate::gates::can_submit_report(&authz, "u1"));
    assert_eq!(authz.model().expect("model"), model);

    let reopened = SqliteRuleStore::connect(&cfg).await.expect("reopen");
    let reloaded = Authorizer::new(adapter(&reopened)).await.expect("reload");
    assert!(rulegate::gates::can_submit_report(&reloaded, "u1"));
}
