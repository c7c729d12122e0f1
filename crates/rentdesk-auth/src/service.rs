//! Authentication service: login, registration, refresh and per-request
//! principal resolution.

use chrono::NaiveDate;
use rentdesk_core::error::RentdeskError;
use rentdesk_core::models::agency::{Agency, CreateAgency};
use rentdesk_core::models::client::CreateClient;
use rentdesk_core::models::platform_admin::{CreatePlatformAdmin, PlatformAdmin};
use rentdesk_core::models::principal::{Principal, PrincipalKind, PrincipalRecord};
use rentdesk_core::repository::{AgencyRepository, ClientRepository, PlatformAdminRepository};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::password::PasswordService;
use crate::token::{self, TokenKind};

/// Credentials submitted to [`AuthService::login`].
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
    #[serde(rename = "principal_kind", alias = "user_type")]
    pub kind: PrincipalKind,
    /// Required for clients: selects which agency's client table to search.
    #[serde(default, alias = "agency_slug")]
    pub tenant_slug: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterAgencyInput {
    pub name: String,
    #[serde(alias = "tenant_slug")]
    pub slug: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterClientInput {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub driver_license_number: Option<String>,
    #[serde(default)]
    pub driver_license_expiry: Option<NaiveDate>,
}

/// Input for bootstrapping a platform admin.
#[derive(Debug, Clone)]
pub struct CreateAdminInput {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
}

/// Successful login or registration.
#[derive(Debug, Clone)]
pub struct AuthOutput {
    /// Stored record; serializes without the password hash.
    pub principal: PrincipalRecord,
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

/// Public card of the agency a client registered with.
#[derive(Debug, Clone, Serialize)]
pub struct AgencySummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

impl From<&Agency> for AgencySummary {
    fn from(agency: &Agency) -> Self {
        Self {
            id: agency.id,
            name: agency.name.clone(),
            slug: agency.slug.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientRegistration {
    pub output: AuthOutput,
    pub agency: AgencySummary,
}

/// New access token minted from a refresh token. The refresh token itself
/// is not rotated.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshOutput {
    pub access_token: String,
    pub expires_in: u64,
}

/// Trim and lower-case an email before lookup or storage.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Reject anything that is not `local@domain.tld` without whitespace.
pub fn validate_email(email: &str) -> AuthResult<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(AuthError::Validation("email must be a valid address".into()))
    }
}

fn validate_len(field: &str, value: &str, min: usize, max: usize) -> AuthResult<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(AuthError::Validation(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

fn validate_password(value: &str, min: usize) -> AuthResult<()> {
    if value.chars().count() < min {
        return Err(AuthError::Validation(format!(
            "password must be at least {min} characters"
        )));
    }
    Ok(())
}

fn validate_slug(slug: &str) -> AuthResult<()> {
    validate_len("slug", slug, 3, 100)?;
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(AuthError::Validation(
            "slug may only contain lowercase letters, digits and hyphens".into(),
        ));
    }
    Ok(())
}

/// Map a lookup miss to `mapped`; anything else is a store failure.
fn not_found_as(err: RentdeskError, mapped: AuthError) -> AuthError {
    if err.is_not_found() {
        mapped
    } else {
        AuthError::Store(err)
    }
}

/// Authentication service.
///
/// Generic over repository implementations so that the auth layer has no
/// dependency on the database crate.
pub struct AuthService<P, A, C> {
    admins: P,
    agencies: A,
    clients: C,
    passwords: PasswordService,
    config: AuthConfig,
}

impl<P, A, C> AuthService<P, A, C>
where
    P: PlatformAdminRepository,
    A: AgencyRepository,
    C: ClientRepository,
{
    pub fn new(admins: P, agencies: A, clients: C, config: AuthConfig) -> AuthResult<Self> {
        let passwords = PasswordService::from_config(&config)?;
        Ok(Self {
            admins,
            agencies,
            clients,
            passwords,
            config,
        })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn agencies(&self) -> &A {
        &self.agencies
    }

    pub fn clients(&self) -> &C {
        &self.clients
    }

    fn issue_pair(&self, principal: PrincipalRecord) -> AuthResult<AuthOutput> {
        let identity = principal.principal();
        Ok(AuthOutput {
            access_token: token::issue_access_token(&identity, &self.config)?,
            refresh_token: token::issue_refresh_token(&identity, &self.config)?,
            expires_in: self.config.access_token_lifetime_secs,
            principal,
        })
    }

    /// Verify credentials for one principal kind and issue a token pair.
    ///
    /// Unknown email, inactive account and wrong password all yield
    /// [`AuthError::InvalidCredentials`].
    pub async fn login(&self, input: LoginInput) -> AuthResult<AuthOutput> {
        validate_email(input.email.trim())?;
        validate_password(&input.password, self.config.min_client_password_length)?;
        let email = normalize_email(&input.email);

        let record = match input.kind {
            PrincipalKind::PlatformAdmin => self
                .admins
                .get_active_by_email(&email)
                .await
                .map(PrincipalRecord::PlatformAdmin),
            PrincipalKind::Agency => self
                .agencies
                .get_active_by_email(&email)
                .await
                .map(PrincipalRecord::Agency),
            PrincipalKind::Client => {
                let slug = input
                    .tenant_slug
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .ok_or(AuthError::MissingTenantSlug)?;
                let agency = self
                    .agencies
                    .get_active_by_slug(slug)
                    .await
                    .map_err(|e| not_found_as(e, AuthError::AgencyNotFound))?;
                self.clients
                    .get_active_by_email(agency.id, &email)
                    .await
                    .map(PrincipalRecord::Client)
            }
        }
        .map_err(|e| not_found_as(e, AuthError::InvalidCredentials))?;

        let matched = self
            .passwords
            .verify_async(input.password, record.password_hash().to_string())
            .await;
        if !matched {
            debug!(kind = %input.kind, "Password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        info!(principal_id = %record.principal().id, kind = %input.kind, "Login succeeded");
        self.issue_pair(record)
    }

    /// Register a new agency (tenant) and sign it in.
    pub async fn register_agency(&self, input: RegisterAgencyInput) -> AuthResult<AuthOutput> {
        validate_len("name", input.name.trim(), 2, 255)?;
        validate_slug(&input.slug)?;
        validate_email(input.email.trim())?;
        validate_password(&input.password, self.config.min_agency_password_length)?;
        let email = normalize_email(&input.email);

        if self.agencies.email_exists(&email).await? {
            return Err(AuthError::EmailExists);
        }
        if self.agencies.slug_exists(&input.slug).await? {
            return Err(AuthError::SlugExists);
        }

        let password_hash = self.passwords.hash_async(input.password).await?;
        let agency = self
            .agencies
            .create(CreateAgency {
                name: input.name.trim().to_string(),
                slug: input.slug,
                email,
                password_hash,
                phone: input.phone,
                address: input.address,
                city: input.city,
                state: input.state,
                country: input.country,
                postal_code: input.postal_code,
            })
            .await
            .map_err(|e| match e {
                RentdeskError::AlreadyExists { ref field, .. } if field == "slug" => {
                    AuthError::SlugExists
                }
                RentdeskError::AlreadyExists { .. } => AuthError::EmailExists,
                other => AuthError::Store(other),
            })?;

        info!(agency_id = %agency.id, slug = %agency.slug, "Agency registered");
        self.issue_pair(PrincipalRecord::Agency(agency))
    }

    /// Register a client under the agency identified by `tenant_slug`.
    pub async fn register_client(
        &self,
        tenant_slug: &str,
        input: RegisterClientInput,
    ) -> AuthResult<ClientRegistration> {
        validate_email(input.email.trim())?;
        validate_password(&input.password, self.config.min_client_password_length)?;
        validate_len("first_name", input.first_name.trim(), 1, 100)?;
        validate_len("last_name", input.last_name.trim(), 1, 100)?;
        let email = normalize_email(&input.email);

        let agency = self
            .agencies
            .get_active_by_slug(tenant_slug.trim())
            .await
            .map_err(|e| not_found_as(e, AuthError::AgencyNotFound))?;

        if self.clients.email_exists(agency.id, &email).await? {
            return Err(AuthError::EmailExists);
        }

        let password_hash = self.passwords.hash_async(input.password).await?;
        let client = self
            .clients
            .create(CreateClient {
                agency_id: agency.id,
                email,
                password_hash,
                first_name: input.first_name.trim().to_string(),
                last_name: input.last_name.trim().to_string(),
                phone: input.phone,
                date_of_birth: input.date_of_birth,
                driver_license_number: input.driver_license_number,
                driver_license_expiry: input.driver_license_expiry,
            })
            .await
            .map_err(|e| match e {
                RentdeskError::AlreadyExists { .. } => AuthError::EmailExists,
                other => AuthError::Store(other),
            })?;

        info!(client_id = %client.id, agency_id = %agency.id, "Client registered");
        Ok(ClientRegistration {
            output: self.issue_pair(PrincipalRecord::Client(client))?,
            agency: AgencySummary::from(&agency),
        })
    }

    /// Mint a new access token from a refresh token.
    ///
    /// The principal must still exist and be active.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<RefreshOutput> {
        let refresh_token = refresh_token.trim();
        if refresh_token.is_empty() {
            return Err(AuthError::MissingRefreshToken);
        }

        let claims = token::verify_token(refresh_token, TokenKind::Refresh, &self.config)?;
        let record = self.load_active(&claims.principal()?).await?;

        Ok(RefreshOutput {
            access_token: token::issue_access_token(&record.principal(), &self.config)?,
            expires_in: self.config.access_token_lifetime_secs,
        })
    }

    /// Resolve a bearer access token to the current principal.
    ///
    /// The returned principal is rebuilt from storage, so the tenant
    /// binding always reflects the stored row.
    pub async fn authenticate(&self, access_token: &str) -> AuthResult<Principal> {
        let claims = token::verify_token(access_token, TokenKind::Access, &self.config)?;
        let record = self.load_active(&claims.principal()?).await?;
        Ok(record.principal())
    }

    /// Fetch the stored row behind a token principal, treating an inactive
    /// or missing row as an invalid token.
    async fn load_active(&self, principal: &Principal) -> AuthResult<PrincipalRecord> {
        let inactive = || AuthError::TokenInvalid("principal is missing or inactive".into());

        let found = match principal.kind {
            PrincipalKind::PlatformAdmin => self
                .admins
                .get_active_by_id(principal.id)
                .await
                .map(PrincipalRecord::PlatformAdmin),
            PrincipalKind::Agency => self
                .agencies
                .get_active_by_id(principal.id)
                .await
                .map(PrincipalRecord::Agency),
            PrincipalKind::Client => {
                let agency_id = principal.tenant_id.ok_or_else(inactive)?;
                self.clients
                    .get_active_by_id(agency_id, principal.id)
                    .await
                    .map(PrincipalRecord::Client)
            }
        };

        found.map_err(|e| not_found_as(e, inactive()))
    }

    /// Create a platform admin account.
    pub async fn create_platform_admin(&self, input: CreateAdminInput) -> AuthResult<PlatformAdmin> {
        validate_email(input.email.trim())?;
        validate_password(&input.password, self.config.min_agency_password_length)?;

        let password_hash = self.passwords.hash_async(input.password).await?;
        self.admins
            .create(CreatePlatformAdmin {
                email: normalize_email(&input.email),
                password_hash,
                first_name: input.first_name,
                last_name: input.last_name,
                role: input.role,
            })
            .await
            .map_err(|e| match e {
                RentdeskError::AlreadyExists { .. } => AuthError::EmailExists,
                other => AuthError::Store(other),
            })
    }
}
