//! Tenant-specific Azure AD endpoint resolution.

/// Placeholder substituted with the tenant identifier.
pub const TENANT_PLACEHOLDER: &str = "{tenant}";

/// Default authorization endpoint template.
pub const AUTHORIZATION_URL_TEMPLATE: &str =
    "https://login.microsoftonline.com/{tenant}/oauth2/authorize";

/// Default token endpoint template.
pub const TOKEN_URL_TEMPLATE: &str = "https://login.microsoftonline.com/{tenant}/oauth2/token";

/// Tenant used when none is configured.
pub const DEFAULT_TENANT: &str = "common";

/// Substitute `tenant` for the first `{tenant}` placeholder in `template`.
pub fn resolve(template: &str, tenant: &str) -> String {
    template.replacen(TENANT_PLACEHOLDER, tenant, 1)
}

/// Resolved endpoints for one tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub authorization_url: String,
    pub token_url: String,
}

impl Endpoints {
    /// Resolve the default Azure AD endpoints for `tenant`.
    pub fn for_tenant(tenant: &str) -> Self {
        Self::from_templates(AUTHORIZATION_URL_TEMPLATE, TOKEN_URL_TEMPLATE, tenant)
    }

    pub fn from_templates(authorization_template: &str, token_template: &str, tenant: &str) -> Self {
        Self {
            authorization_url: resolve(authorization_template, tenant),
            token_url: resolve(token_template, tenant),
        }
    }
}
