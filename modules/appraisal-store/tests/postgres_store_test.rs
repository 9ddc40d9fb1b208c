//! Round trip against a real Postgres. Skips when DATABASE_URL is not set.
//!
//! Run with: DATABASE_URL=postgres://... cargo test -p appraisal-store --test postgres_store_test

use appraisal_common::{ConflictMode, District, Property, PropertyFilter, PropertyPatch};
use appraisal_store::{PgPropertyStore, PropertyStore};

async fn connect() -> Option<PgPropertyStore> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("Skipping: DATABASE_URL not set");
        return None;
    };
    let store = PgPropertyStore::connect(&url).await.expect("connect");
    store.migrate().await.expect("migrate");
    Some(store)
}

fn unique_prefix() -> String {
    format!("TEST{}", chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

async fn cleanup(store: &PgPropertyStore, prefix: &str) {
    sqlx::query("DELETE FROM properties WHERE account_number LIKE $1")
        .bind(format!("{prefix}%"))
        .execute(store.pool())
        .await
        .expect("cleanup");
}

#[tokio::test]
async fn upsert_modes_and_partial_merge() {
    let Some(store) = connect().await else { return };
    let prefix = unique_prefix();
    let acct = format!("{prefix}-1");

    let mut p = Property::new(District::Hcad, acct.clone());
    p.address = "1 MAIN ST, HOUSTON, TX".into();
    p.market_value = 100_000.0;
    p.neighborhood_code = Some(format!("{prefix}-NB"));

    assert_eq!(store.upsert(&[p.clone()], ConflictMode::Overwrite).await.unwrap(), 1);

    // Same account in a second district is a separate row.
    let mut tcad = p.clone();
    tcad.district = District::Tcad;
    store.upsert(&[tcad], ConflictMode::Overwrite).await.unwrap();

    let mut changed = p.clone();
    changed.market_value = 999.0;
    assert_eq!(
        store.upsert(&[changed.clone()], ConflictMode::SkipExisting).await.unwrap(),
        0
    );
    assert_eq!(
        store.get(District::Hcad, &acct).await.unwrap().unwrap().market_value,
        100_000.0
    );

    // Duplicates inside one batch do not abort the statement.
    store
        .upsert(&[p.clone(), changed], ConflictMode::Overwrite)
        .await
        .unwrap();
    assert_eq!(
        store.get(District::Hcad, &acct).await.unwrap().unwrap().market_value,
        999.0
    );

    store
        .upsert_partial(&[PropertyPatch::state_class_only(District::Hcad, acct.clone(), "A1")])
        .await
        .unwrap();
    let merged = store.get(District::Hcad, &acct).await.unwrap().unwrap();
    assert_eq!(merged.state_class.as_deref(), Some("A1"));
    assert_eq!(merged.address, "1 MAIN ST, HOUSTON, TX");

    let hood = store
        .query(&PropertyFilter::neighborhood(District::Hcad, &format!("{prefix}-NB")))
        .await
        .unwrap();
    assert_eq!(hood.len(), 1);

    let by_street = store
        .query(&PropertyFilter::street(District::Hcad, "main st"))
        .await
        .unwrap();
    assert!(by_street.iter().any(|r| r.account_number == acct));

    cleanup(&store, &prefix).await;
}
