//! Integration tests for the SurrealDB repositories using in-memory SurrealDB.

use chrono::NaiveDate;
use rentdesk_core::error::RentdeskError;
use rentdesk_core::models::activity::{ActivityLogEntry, ActivityLogFilter};
use rentdesk_core::models::agency::{
    CreateAgency, SubscriptionPlan, SubscriptionStatus, UpdateAgency, UpdateAgencySettings,
};
use rentdesk_core::models::client::CreateClient;
use rentdesk_core::models::platform_admin::CreatePlatformAdmin;
use rentdesk_core::models::principal::Principal;
use rentdesk_core::repository::{
    ActivityLogRepository, AgencyRepository, ClientRepository, Pagination,
    PlatformAdminRepository,
};
use rentdesk_db::repository::{
    SurrealActivityLogRepository, SurrealAgencyRepository, SurrealClientRepository,
    SurrealPlatformAdminRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    rentdesk_db::run_migrations(&db).await.unwrap();
    db
}

fn agency_input(slug: &str, email: &str) -> CreateAgency {
    CreateAgency {
        name: format!("{slug} rentals"),
        slug: slug.into(),
        email: email.into(),
        password_hash: "$argon2id$stub".into(),
        phone: Some("+30 210 000 0000".into()),
        address: None,
        city: Some("Athens".into()),
        state: None,
        country: Some("GR".into()),
        postal_code: None,
    }
}

fn client_input(agency_id: Uuid, email: &str) -> CreateClient {
    CreateClient {
        agency_id,
        email: email.into(),
        password_hash: "$argon2id$stub".into(),
        first_name: "Maria".into(),
        last_name: "Papadopoulou".into(),
        phone: None,
        date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 12),
        driver_license_number: Some("GR-123456".into()),
        driver_license_expiry: NaiveDate::from_ymd_opt(2031, 1, 31),
    }
}

// -----------------------------------------------------------------------
// Agencies
// -----------------------------------------------------------------------

#[tokio::test]
async fn create_agency_seeds_trial_settings_and_categories() {
    let db = setup().await;
    let repo = SurrealAgencyRepository::new(db);

    let agency = repo
        .create(agency_input("acme", "owner@acme.test"))
        .await
        .unwrap();

    assert_eq!(agency.slug, "acme");
    assert_eq!(agency.subscription_plan, SubscriptionPlan::Basic);
    assert_eq!(agency.subscription_status, SubscriptionStatus::Trial);
    assert!(agency.is_active);
    let expires = agency.subscription_expires_at.expect("trial expiry set");
    let days = (expires - agency.created_at).num_days();
    assert!((29..=30).contains(&days), "trial lasted {days} days");

    let settings = repo.get_settings(agency.id).await.unwrap();
    assert_eq!(settings.agency_id, agency.id);
    assert_eq!(settings.primary_color, "#3B82F6");
    assert_eq!(settings.secondary_color, "#1F2937");
    assert_eq!(settings.font_family, "Inter");
    assert_eq!(settings.contact_email.as_deref(), Some("owner@acme.test"));

    let categories = repo.list_category_names(agency.id).await.unwrap();
    assert_eq!(categories, vec!["Compact", "Economy", "Luxury", "SUV"]);
}

#[tokio::test]
async fn duplicate_agency_email_and_slug_conflict() {
    let db = setup().await;
    let repo = SurrealAgencyRepository::new(db);

    repo.create(agency_input("acme", "owner@acme.test"))
        .await
        .unwrap();

    assert!(repo.email_exists("owner@acme.test").await.unwrap());
    assert!(repo.slug_exists("acme").await.unwrap());
    assert!(!repo.slug_exists("globex").await.unwrap());

    let err = repo
        .create(agency_input("acme", "other@acme.test"))
        .await
        .unwrap_err();
    assert!(
        matches!(err, RentdeskError::AlreadyExists { ref field, .. } if field == "slug"),
        "unexpected error: {err:?}"
    );

    let err = repo
        .create(agency_input("acme-2", "owner@acme.test"))
        .await
        .unwrap_err();
    assert!(
        matches!(err, RentdeskError::AlreadyExists { ref field, .. } if field == "email"),
        "unexpected error: {err:?}"
    );

    // The failed transaction left no orphaned categories behind.
    let page = repo.list(Pagination::default()).await.unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn inactive_agency_is_hidden_from_active_lookups() {
    let db = setup().await;
    let repo = SurrealAgencyRepository::new(db);

    let agency = repo
        .create(agency_input("acme", "owner@acme.test"))
        .await
        .unwrap();
    assert_eq!(
        repo.get_active_by_slug("acme").await.unwrap().id,
        agency.id
    );

    repo.set_active(agency.id, false).await.unwrap();

    assert!(repo.get_active_by_id(agency.id).await.unwrap_err().is_not_found());
    assert!(repo
        .get_active_by_email("owner@acme.test")
        .await
        .unwrap_err()
        .is_not_found());
    assert!(repo.get_active_by_slug("acme").await.unwrap_err().is_not_found());

    let raw = repo.get_by_id(agency.id).await.unwrap();
    assert!(!raw.is_active);
}

#[tokio::test]
async fn update_profile_touches_only_given_fields() {
    let db = setup().await;
    let repo = SurrealAgencyRepository::new(db);

    let agency = repo
        .create(agency_input("acme", "owner@acme.test"))
        .await
        .unwrap();

    let updated = repo
        .update_profile(
            agency.id,
            UpdateAgency {
                website: Some("https://acme.test".into()),
                description: Some("Island car hire".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.website.as_deref(), Some("https://acme.test"));
    assert_eq!(updated.description.as_deref(), Some("Island car hire"));
    assert_eq!(updated.city.as_deref(), Some("Athens"));
    assert_eq!(updated.name, agency.name);

    let err = repo
        .update_profile(Uuid::new_v4(), UpdateAgency::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn update_settings_changes_only_given_branding() {
    let db = setup().await;
    let repo = SurrealAgencyRepository::new(db);
    let agency = repo
        .create(agency_input("acme", "owner@acme.test"))
        .await
        .unwrap();

    let settings = repo
        .update_settings(
            agency.id,
            UpdateAgencySettings {
                primary_color: Some("#112233".into()),
                logo_url: Some("https://cdn.acme.test/logo.png".into()),
                terms_and_conditions: Some("Return with a full tank.".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(settings.primary_color, "#112233");
    assert_eq!(settings.secondary_color, "#1F2937");
    assert_eq!(settings.font_family, "Inter");
    assert_eq!(settings.logo_url.as_deref(), Some("https://cdn.acme.test/logo.png"));
    assert_eq!(settings.contact_email.as_deref(), Some("owner@acme.test"));
    assert_eq!(settings.privacy_policy, None);
    assert!(settings.updated_at >= settings.created_at);

    let reread = repo.get_settings(agency.id).await.unwrap();
    assert_eq!(reread.terms_and_conditions.as_deref(), Some("Return with a full tank."));
}

#[tokio::test]
async fn update_settings_recreates_missing_row_with_defaults() {
    let db = setup().await;
    let repo = SurrealAgencyRepository::new(db.clone());
    let agency = repo
        .create(agency_input("acme", "owner@acme.test"))
        .await
        .unwrap();
    db.query("DELETE type::record('agency_settings', $id)")
        .bind(("id", agency.id.to_string()))
        .await
        .unwrap()
        .check()
        .unwrap();

    let settings = repo
        .update_settings(
            agency.id,
            UpdateAgencySettings {
                font_family: Some("Roboto".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(settings.agency_id, agency.id);
    assert_eq!(settings.font_family, "Roboto");
    assert_eq!(settings.primary_color, "#3B82F6");
    assert_eq!(settings.secondary_color, "#1F2937");
    assert_eq!(settings.contact_email, None);
}

#[tokio::test]
async fn update_settings_needs_an_agency() {
    let db = setup().await;
    let repo = SurrealAgencyRepository::new(db);

    let err = repo
        .update_settings(Uuid::new_v4(), UpdateAgencySettings::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

// -----------------------------------------------------------------------
// Clients
// -----------------------------------------------------------------------

#[tokio::test]
async fn client_email_is_unique_per_agency() {
    let db = setup().await;
    let agencies = SurrealAgencyRepository::new(db.clone());
    let clients = SurrealClientRepository::new(db);

    let acme = agencies
        .create(agency_input("acme", "owner@acme.test"))
        .await
        .unwrap();
    let globex = agencies
        .create(agency_input("globex", "owner@globex.test"))
        .await
        .unwrap();

    let first = clients
        .create(client_input(acme.id, "maria@mail.test"))
        .await
        .unwrap();
    assert_eq!(first.agency_id, acme.id);
    assert_eq!(first.date_of_birth, NaiveDate::from_ymd_opt(1990, 4, 12));
    assert!(!first.email_verified);

    // Same address under a different agency is a different client.
    let second = clients
        .create(client_input(globex.id, "maria@mail.test"))
        .await
        .unwrap();
    assert_ne!(first.id, second.id);

    let err = clients
        .create(client_input(acme.id, "maria@mail.test"))
        .await
        .unwrap_err();
    assert!(matches!(err, RentdeskError::AlreadyExists { .. }));

    assert!(clients.email_exists(acme.id, "maria@mail.test").await.unwrap());
    assert!(!clients.email_exists(acme.id, "nikos@mail.test").await.unwrap());

    let found = clients
        .get_active_by_email(globex.id, "maria@mail.test")
        .await
        .unwrap();
    assert_eq!(found.id, second.id);
}

#[tokio::test]
async fn client_lookup_is_scoped_to_agency() {
    let db = setup().await;
    let agencies = SurrealAgencyRepository::new(db.clone());
    let clients = SurrealClientRepository::new(db);

    let acme = agencies
        .create(agency_input("acme", "owner@acme.test"))
        .await
        .unwrap();
    let globex = agencies
        .create(agency_input("globex", "owner@globex.test"))
        .await
        .unwrap();
    let client = clients
        .create(client_input(acme.id, "maria@mail.test"))
        .await
        .unwrap();

    assert!(clients
        .get_by_id(globex.id, client.id)
        .await
        .unwrap_err()
        .is_not_found());

    clients.set_active(acme.id, client.id, false).await.unwrap();
    assert!(clients
        .get_active_by_id(acme.id, client.id)
        .await
        .unwrap_err()
        .is_not_found());
    assert!(!clients.get_by_id(acme.id, client.id).await.unwrap().is_active);
}

#[tokio::test]
async fn list_clients_filters_by_tenant() {
    let db = setup().await;
    let agencies = SurrealAgencyRepository::new(db.clone());
    let clients = SurrealClientRepository::new(db);

    let acme = agencies
        .create(agency_input("acme", "owner@acme.test"))
        .await
        .unwrap();
    let globex = agencies
        .create(agency_input("globex", "owner@globex.test"))
        .await
        .unwrap();

    for email in ["a@mail.test", "b@mail.test"] {
        clients.create(client_input(acme.id, email)).await.unwrap();
    }
    clients
        .create(client_input(globex.id, "c@mail.test"))
        .await
        .unwrap();

    let acme_page = clients
        .list(Some(acme.id), Pagination::default())
        .await
        .unwrap();
    assert_eq!(acme_page.total, 2);
    assert!(acme_page.items.iter().all(|c| c.agency_id == acme.id));

    let all = clients.list(None, Pagination::default()).await.unwrap();
    assert_eq!(all.total, 3);
}

// -----------------------------------------------------------------------
// Platform admins
// -----------------------------------------------------------------------

#[tokio::test]
async fn platform_admin_roundtrip_and_deactivation() {
    let db = setup().await;
    let repo = SurrealPlatformAdminRepository::new(db);

    let admin = repo
        .create(CreatePlatformAdmin {
            email: "root@rentdesk.test".into(),
            password_hash: "$argon2id$stub".into(),
            first_name: "Ops".into(),
            last_name: "Team".into(),
            role: "super_admin".into(),
        })
        .await
        .unwrap();

    let found = repo.get_active_by_email("root@rentdesk.test").await.unwrap();
    assert_eq!(found.id, admin.id);
    assert_eq!(found.role, "super_admin");

    repo.set_active(admin.id, false).await.unwrap();
    assert!(repo.get_active_by_id(admin.id).await.unwrap_err().is_not_found());

    assert!(repo
        .set_active(Uuid::new_v4(), true)
        .await
        .unwrap_err()
        .is_not_found());
}

// -----------------------------------------------------------------------
// Activity log
// -----------------------------------------------------------------------

#[tokio::test]
async fn activity_entries_append_and_filter_by_tenant() {
    let db = setup().await;
    let agencies = SurrealAgencyRepository::new(db.clone());
    let log = SurrealActivityLogRepository::new(db);

    let acme = agencies
        .create(agency_input("acme", "owner@acme.test"))
        .await
        .unwrap();
    let globex = agencies
        .create(agency_input("globex", "owner@globex.test"))
        .await
        .unwrap();

    let acme_principal = Principal::agency(&acme);
    let entry = ActivityLogEntry::new(&acme_principal, "login", Some("agency"))
        .with_entity_id(acme.id.to_string())
        .with_source(Some("10.0.0.1".into()), Some("curl/8".into()))
        .with_metadata(serde_json::json!({ "method": "POST", "status": 200 }));
    log.append(entry.clone()).await.unwrap();
    log.append(ActivityLogEntry::new(
        &Principal::agency(&globex),
        "login",
        Some("agency"),
    ))
    .await
    .unwrap();

    let page = log
        .list(
            ActivityLogFilter {
                tenant_id: Some(acme.id),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();

    assert_eq!(page.total, 1);
    let stored = &page.items[0];
    assert_eq!(stored.id, entry.id);
    assert_eq!(stored.principal_id, acme.id);
    assert_eq!(stored.source_address.as_deref(), Some("10.0.0.1"));
    assert_eq!(stored.metadata["status"], 200);

    let everything = log
        .list(
            ActivityLogFilter {
                action: Some("login".into()),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(everything.total, 2);
}
