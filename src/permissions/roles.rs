use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::pages::{self, PageId};
use crate::filters::Dimension;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Sgm,
    Sga,
    Recruiter,
    CapitalPartner,
    Viewer,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Admin,
        Role::Manager,
        Role::Sgm,
        Role::Sga,
        Role::Recruiter,
        Role::CapitalPartner,
        Role::Viewer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Sgm => "sgm",
            Role::Sga => "sga",
            Role::Recruiter => "recruiter",
            Role::CapitalPartner => "capital_partner",
            Role::Viewer => "viewer",
        }
    }

    /// Static role table entry
    pub fn definition(&self) -> &'static RoleDefinition {
        match self {
            Role::Admin => &ADMIN,
            Role::Manager => &MANAGER,
            Role::Sgm => &SGM,
            Role::Sga => &SGA,
            Role::Recruiter => &RECRUITER,
            Role::CapitalPartner => &CAPITAL_PARTNER,
            Role::Viewer => &VIEWER,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("unknown role '{}'", s))
    }
}

/// How a role's page access is decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagePolicy {
    /// Every page, present or future, except the listed ones
    AllowByDefault { excluded: &'static [PageId] },
    /// Only the listed pages
    DenyByDefault { granted: &'static [PageId] },
}

impl PagePolicy {
    pub fn permits(&self, page: PageId) -> bool {
        match self {
            PagePolicy::AllowByDefault { excluded } => !excluded.contains(&page),
            PagePolicy::DenyByDefault { granted } => granted.contains(&page),
        }
    }
}

#[derive(Debug)]
pub struct RoleDefinition {
    pub pages: PagePolicy,
    /// Dimensions that must be scoped by a claim for the role to resolve
    pub required_scopes: &'static [Dimension],
    pub can_export: bool,
    pub can_manage_users: bool,
}

static ADMIN: RoleDefinition = RoleDefinition {
    pages: PagePolicy::AllowByDefault { excluded: &[] },
    required_scopes: &[],
    can_export: true,
    can_manage_users: true,
};

static MANAGER: RoleDefinition = RoleDefinition {
    pages: PagePolicy::AllowByDefault { excluded: &[pages::SETTINGS] },
    required_scopes: &[],
    can_export: true,
    can_manage_users: false,
};

static SGM: RoleDefinition = RoleDefinition {
    pages: PagePolicy::DenyByDefault {
        granted: &[pages::FUNNEL_PERFORMANCE, pages::OPEN_PIPELINE, pages::SGM_HUB, pages::GC_HUB],
    },
    required_scopes: &[Dimension::Sgm],
    can_export: true,
    can_manage_users: false,
};

static SGA: RoleDefinition = RoleDefinition {
    pages: PagePolicy::DenyByDefault {
        granted: &[pages::FUNNEL_PERFORMANCE, pages::SGA_HUB],
    },
    required_scopes: &[Dimension::Sga],
    can_export: false,
    can_manage_users: false,
};

static RECRUITER: RoleDefinition = RoleDefinition {
    pages: PagePolicy::DenyByDefault { granted: &[pages::RECRUITER_HUB] },
    required_scopes: &[],
    can_export: false,
    can_manage_users: false,
};

static CAPITAL_PARTNER: RoleDefinition = RoleDefinition {
    pages: PagePolicy::DenyByDefault { granted: &[pages::CAPITAL_PARTNER_HUB] },
    required_scopes: &[],
    can_export: false,
    can_manage_users: false,
};

static VIEWER: RoleDefinition = RoleDefinition {
    pages: PagePolicy::DenyByDefault {
        granted: &[pages::FUNNEL_PERFORMANCE, pages::OPEN_PIPELINE],
    },
    required_scopes: &[],
    can_export: false,
    can_manage_users: false,
};
