//! Integration tests for the authentication service.

use rentdesk_auth::config::AuthConfig;
use rentdesk_auth::service::{
    AuthService, CreateAdminInput, LoginInput, RegisterAgencyInput, RegisterClientInput,
};
use rentdesk_auth::{AuthError, TokenKind, token};
use rentdesk_core::models::principal::{PrincipalKind, PrincipalRecord};
use rentdesk_core::repository::{AgencyRepository, ClientRepository};
use rentdesk_db::repository::{
    SurrealAgencyRepository, SurrealClientRepository, SurrealPlatformAdminRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

type Service = AuthService<
    SurrealPlatformAdminRepository<Db>,
    SurrealAgencyRepository<Db>,
    SurrealClientRepository<Db>,
>;

fn test_config() -> AuthConfig {
    AuthConfig {
        access_token_secret: "access-secret-for-tests".into(),
        refresh_token_secret: "refresh-secret-for-tests".into(),
        jwt_issuer: "rentdesk-test".into(),
        // Cheapest valid Argon2id costs.
        password_work_factor: 1,
        password_memory_kib: 8,
        ..AuthConfig::default()
    }
}

async fn setup() -> Service {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    rentdesk_db::run_migrations(&db).await.unwrap();

    AuthService::new(
        SurrealPlatformAdminRepository::new(db.clone()),
        SurrealAgencyRepository::new(db.clone()),
        SurrealClientRepository::new(db),
        test_config(),
    )
    .unwrap()
}

fn acme() -> RegisterAgencyInput {
    RegisterAgencyInput {
        name: "Acme".into(),
        slug: "acme".into(),
        email: "a@acme.com".into(),
        password: "longenough".into(),
        phone: None,
        address: None,
        city: None,
        state: None,
        country: None,
        postal_code: None,
    }
}

fn client(email: &str) -> RegisterClientInput {
    RegisterClientInput {
        email: email.into(),
        password: "secret1".into(),
        first_name: "Maria".into(),
        last_name: "Papadopoulou".into(),
        phone: None,
        date_of_birth: None,
        driver_license_number: None,
        driver_license_expiry: None,
    }
}

fn login(email: &str, password: &str, kind: PrincipalKind, slug: Option<&str>) -> LoginInput {
    LoginInput {
        email: email.into(),
        password: password.into(),
        kind,
        tenant_slug: slug.map(str::to_string),
    }
}

#[tokio::test]
async fn agency_register_login_authenticate() {
    let svc = setup().await;

    let registered = svc.register_agency(acme()).await.unwrap();
    let agency_id = registered.principal.principal().id;
    assert_eq!(registered.expires_in, 604_800);

    let logged_in = svc
        .login(login("a@acme.com", "longenough", PrincipalKind::Agency, None))
        .await
        .unwrap();
    assert_eq!(logged_in.principal.principal().id, agency_id);

    let principal = svc.authenticate(&logged_in.access_token).await.unwrap();
    assert_eq!(principal.kind, PrincipalKind::Agency);
    assert_eq!(principal.tenant_id, Some(agency_id));

    // The serialized record never carries the hash.
    let json = serde_json::to_value(&logged_in.principal).unwrap();
    assert!(json.get("password_hash").is_none());
    assert_eq!(json["slug"], "acme");
}

#[tokio::test]
async fn login_normalizes_email() {
    let svc = setup().await;
    svc.register_agency(RegisterAgencyInput {
        email: "  Owner@ACME.com ".into(),
        ..acme()
    })
    .await
    .unwrap();

    let out = svc
        .login(login("OWNER@acme.com", "longenough", PrincipalKind::Agency, None))
        .await
        .unwrap();
    assert_eq!(out.principal.principal().email, "owner@acme.com");
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_the_same() {
    let svc = setup().await;
    svc.register_agency(acme()).await.unwrap();

    let wrong = svc
        .login(login("a@acme.com", "not-the-one", PrincipalKind::Agency, None))
        .await
        .unwrap_err();
    let unknown = svc
        .login(login("nobody@acme.com", "longenough", PrincipalKind::Agency, None))
        .await
        .unwrap_err();
    // An agency account is not a client account.
    let wrong_kind = svc
        .login(login("a@acme.com", "longenough", PrincipalKind::PlatformAdmin, None))
        .await
        .unwrap_err();

    for err in [wrong, unknown, wrong_kind] {
        assert!(matches!(err, AuthError::InvalidCredentials), "got {err:?}");
    }
}

#[tokio::test]
async fn duplicate_agency_email_or_slug_conflicts() {
    let svc = setup().await;
    svc.register_agency(acme()).await.unwrap();

    let err = svc
        .register_agency(RegisterAgencyInput {
            slug: "acme-two".into(),
            ..acme()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::EmailExists));

    let err = svc
        .register_agency(RegisterAgencyInput {
            email: "other@acme.com".into(),
            ..acme()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::SlugExists));
}

#[tokio::test]
async fn registration_input_is_validated() {
    let svc = setup().await;

    let cases = [
        RegisterAgencyInput {
            name: "A".into(),
            ..acme()
        },
        RegisterAgencyInput {
            slug: "Acme Rentals".into(),
            ..acme()
        },
        RegisterAgencyInput {
            email: "not-an-email".into(),
            ..acme()
        },
        RegisterAgencyInput {
            password: "short".into(),
            ..acme()
        },
    ];
    for input in cases {
        let err = svc.register_agency(input).await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)), "got {err:?}");
    }
}

#[tokio::test]
async fn client_email_is_scoped_per_agency() {
    let svc = setup().await;
    svc.register_agency(acme()).await.unwrap();
    svc.register_agency(RegisterAgencyInput {
        name: "Globex".into(),
        slug: "globex".into(),
        email: "g@globex.com".into(),
        ..acme()
    })
    .await
    .unwrap();

    let at_acme = svc
        .register_client("acme", client("client@example.com"))
        .await
        .unwrap();
    let at_globex = svc
        .register_client("globex", client("client@example.com"))
        .await
        .unwrap();
    assert_ne!(at_acme.agency.id, at_globex.agency.id);
    assert_eq!(
        at_acme.output.principal.principal().tenant_id,
        Some(at_acme.agency.id)
    );

    let err = svc
        .register_client("acme", client("client@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::EmailExists));
}

#[tokio::test]
async fn client_login_needs_a_known_tenant() {
    let svc = setup().await;
    svc.register_agency(acme()).await.unwrap();
    svc.register_client("acme", client("c@mail.test"))
        .await
        .unwrap();

    let err = svc
        .login(login("c@mail.test", "secret1", PrincipalKind::Client, None))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::MissingTenantSlug));

    let err = svc
        .login(login("c@mail.test", "secret1", PrincipalKind::Client, Some("nope")))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::AgencyNotFound));

    let err = svc
        .register_client("nope", client("c@mail.test"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::AgencyNotFound));

    let out = svc
        .login(login("c@mail.test", "secret1", PrincipalKind::Client, Some("acme")))
        .await
        .unwrap();
    assert!(matches!(out.principal, PrincipalRecord::Client(_)));
}

#[tokio::test]
async fn deactivated_principal_token_is_rejected() {
    let svc = setup().await;
    let agency = svc.register_agency(acme()).await.unwrap();
    let reg = svc
        .register_client("acme", client("c@mail.test"))
        .await
        .unwrap();
    let client_id = reg.output.principal.principal().id;

    svc.clients()
        .set_active(reg.agency.id, client_id, false)
        .await
        .unwrap();

    let err = svc.authenticate(&reg.output.access_token).await.unwrap_err();
    assert!(matches!(err, AuthError::TokenInvalid(_)), "got {err:?}");
    let err = svc.refresh(&reg.output.refresh_token).await.unwrap_err();
    assert!(matches!(err, AuthError::TokenInvalid(_)), "got {err:?}");

    // Suspending the agency cuts its own token off too.
    let agency_id = agency.principal.principal().id;
    svc.agencies().set_active(agency_id, false).await.unwrap();
    assert!(svc.authenticate(&agency.access_token).await.is_err());
}

#[tokio::test]
async fn refresh_mints_a_working_access_token() {
    let svc = setup().await;
    let reg = svc.register_agency(acme()).await.unwrap();

    let refreshed = svc.refresh(&reg.refresh_token).await.unwrap();
    assert_eq!(refreshed.expires_in, 604_800);

    let principal = svc.authenticate(&refreshed.access_token).await.unwrap();
    assert_eq!(principal.id, reg.principal.principal().id);

    // Classes never cross.
    assert!(svc.refresh(&reg.access_token).await.unwrap_err().is_token_failure());
    assert!(svc
        .authenticate(&reg.refresh_token)
        .await
        .unwrap_err()
        .is_token_failure());

    assert!(matches!(
        svc.refresh("   ").await,
        Err(AuthError::MissingRefreshToken)
    ));
}

#[tokio::test]
async fn platform_admin_has_no_tenant() {
    let svc = setup().await;
    let admin = svc
        .create_platform_admin(CreateAdminInput {
            email: "root@rentdesk.test".into(),
            password: "correct horse".into(),
            first_name: "Ops".into(),
            last_name: "Team".into(),
            role: "super_admin".into(),
        })
        .await
        .unwrap();
    assert!(admin.password_hash.starts_with("$argon2id$"));

    let out = svc
        .login(login(
            "root@rentdesk.test",
            "correct horse",
            PrincipalKind::PlatformAdmin,
            None,
        ))
        .await
        .unwrap();
    let principal = svc.authenticate(&out.access_token).await.unwrap();
    assert!(principal.is_platform_admin());
    assert_eq!(principal.tenant_id, None);

    let claims = token::verify_token(&out.access_token, TokenKind::Access, svc.config()).unwrap();
    assert!(claims.tenant_id.is_none());
}
