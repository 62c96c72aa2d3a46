//! Permission resolution
//!
//! Turns signed session claims into a [`Permissions`] value. Resolution is
//! pure: no storage is consulted, so equal claims always produce equal
//! permissions and the result is safe to feed into cache keys.

pub mod pages;
pub mod roles;

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use thiserror::Error;

use crate::auth::SessionClaims;
use crate::filters::{Dimension, FilterValue};

pub use pages::PageId;
pub use roles::{PagePolicy, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScopeError {
    #[error("Session invalid: {0}")]
    SessionInvalid(String),
}

/// Request-scoped permissions derived from a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
    email: String,
    role: Role,
    allowed_pages: BTreeSet<PageId>,
    #[serde(skip)]
    page_policy: PagePolicy,
    scopes: BTreeMap<Dimension, FilterValue>,
    can_export: bool,
    can_manage_users: bool,
}

impl Permissions {
    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn scopes(&self) -> impl Iterator<Item = (&Dimension, &FilterValue)> {
        self.scopes.iter()
    }

    pub fn scope(&self, dimension: Dimension) -> Option<&FilterValue> {
        self.scopes.get(&dimension)
    }

    pub fn can_export(&self) -> bool {
        self.can_export
    }

    pub fn can_manage_users(&self) -> bool {
        self.can_manage_users
    }
}

/// Resolve session claims into permissions
///
/// Fails without a partial result when the email is blank, the role is not
/// in the role table, or a role that must be scoped carries no scope claim.
pub fn resolve(claims: &SessionClaims) -> Result<Permissions, ScopeError> {
    let email = claims.email.trim();
    if email.is_empty() {
        return Err(ScopeError::SessionInvalid("missing email".to_string()));
    }

    let role: Role = claims
        .role
        .trim()
        .parse()
        .map_err(ScopeError::SessionInvalid)?;
    let definition = role.definition();

    let mut scopes = BTreeMap::new();
    for (dimension, claim) in [
        (Dimension::Sga, &claims.sga_filter),
        (Dimension::Sgm, &claims.sgm_filter),
    ] {
        if let Some(input) = claim {
            scopes.insert(dimension, FilterValue::from_scope(input));
        }
    }

    if let Some(missing) = definition
        .required_scopes
        .iter()
        .find(|dimension| !scopes.contains_key(*dimension))
    {
        return Err(ScopeError::SessionInvalid(format!(
            "role '{}' requires a {} scope",
            role, missing
        )));
    }

    let allowed_pages = pages::ALL_PAGES
        .iter()
        .copied()
        .filter(|page| definition.pages.permits(*page))
        .collect();

    Ok(Permissions {
        email: email.to_string(),
        role,
        allowed_pages,
        page_policy: definition.pages,
        scopes,
        can_export: definition.can_export,
        can_manage_users: definition.can_manage_users,
    })
}

/// Known pages the holder may open
pub fn allowed_pages(permissions: &Permissions) -> BTreeSet<PageId> {
    permissions.allowed_pages.clone()
}

/// Page gate used by route handlers
///
/// Follows the role's default: an allow-by-default role may open a page id
/// this build does not know yet, a deny-by-default role may not.
pub fn has_page(permissions: &Permissions, page: PageId) -> bool {
    permissions.page_policy.permits(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::FilterInput;

    fn claims(email: &str, role: &str) -> SessionClaims {
        SessionClaims::new(email, role)
    }

    #[test]
    fn missing_email_is_session_invalid() {
        let err = resolve(&claims("  ", "admin")).unwrap_err();
        assert!(matches!(err, ScopeError::SessionInvalid(_)));
    }

    #[test]
    fn unknown_role_is_session_invalid() {
        let err = resolve(&claims("a@example.com", "superuser")).unwrap_err();
        assert_eq!(err, ScopeError::SessionInvalid("unknown role 'superuser'".to_string()));
    }

    #[test]
    fn scoped_role_without_scope_does_not_resolve() {
        assert!(resolve(&claims("rep@example.com", "sga")).is_err());
        assert!(resolve(&claims("mgr@example.com", "sgm")).is_err());
    }

    #[test]
    fn admin_is_allowed_every_page_including_unknown_ones() {
        let perms = resolve(&claims("admin@example.com", "admin")).unwrap();
        assert_eq!(allowed_pages(&perms).len(), pages::ALL_PAGES.len());
        assert!(has_page(&perms, pages::SETTINGS));
        assert!(has_page(&perms, 999));
    }

    #[test]
    fn capital_partner_is_deny_by_default() {
        let admin = resolve(&claims("admin@example.com", "admin")).unwrap();
        let partner = resolve(&claims("cp@example.com", "capital_partner")).unwrap();

        assert!(has_page(&admin, pages::FUNNEL_PERFORMANCE));
        assert!(!allowed_pages(&partner).contains(&pages::FUNNEL_PERFORMANCE));
        assert!(!has_page(&partner, pages::FUNNEL_PERFORMANCE));
        assert!(!has_page(&partner, 999));
        assert_eq!(allowed_pages(&partner), BTreeSet::from([pages::CAPITAL_PARTNER_HUB]));
    }

    #[test]
    fn recruiter_is_deny_by_default() {
        let recruiter = resolve(&claims("r@example.com", "recruiter")).unwrap();
        assert_eq!(allowed_pages(&recruiter), BTreeSet::from([pages::RECRUITER_HUB]));
        assert!(!has_page(&recruiter, pages::OPEN_PIPELINE));
    }

    #[test]
    fn manager_is_allowed_everything_but_settings() {
        let manager = resolve(&claims("m@example.com", "manager")).unwrap();
        assert!(!has_page(&manager, pages::SETTINGS));
        assert!(has_page(&manager, pages::GC_HUB));
        assert!(!manager.can_manage_users());
    }

    #[test]
    fn resolution_is_referentially_transparent() {
        let c = claims("rep@example.com", "sga")
            .with_sga_filter(Some(FilterInput::Many(vec!["west".into(), "north".into()])));
        assert_eq!(resolve(&c).unwrap(), resolve(&c.clone()).unwrap());
    }

    #[test]
    fn scope_claims_become_scopes() {
        let perms = resolve(
            &claims("rep@example.com", "sga").with_sga_filter(Some(FilterInput::One(" west ".into()))),
        )
        .unwrap();
        assert_eq!(perms.scope(Dimension::Sga), Some(&FilterValue::One("west".into())));
        assert_eq!(perms.scope(Dimension::Sgm), None);
    }
}
