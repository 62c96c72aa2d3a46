use anyhow::anyhow;
use serde_json::json;

use crate::cli::{utils::output_success, OutputFormat};
use crate::permissions::{pages, PagePolicy, Role};

pub fn handle(role: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let role: Role = role.trim().parse().map_err(|e: String| anyhow!(e))?;
    let definition = role.definition();

    let allowed: Vec<_> = pages::ALL_PAGES
        .iter()
        .copied()
        .filter(|page| definition.pages.permits(*page))
        .collect();
    let default_policy = match definition.pages {
        PagePolicy::AllowByDefault { .. } => "allow",
        PagePolicy::DenyByDefault { .. } => "deny",
    };

    match output_format {
        OutputFormat::Json => output_success(
            output_format,
            &format!("Pages for role '{}'", role),
            Some(json!({
                "role": role,
                "pages": allowed,
                "default": default_policy,
                "requiredScopes": definition.required_scopes,
                "canExport": definition.can_export,
                "canManageUsers": definition.can_manage_users,
            })),
        ),
        OutputFormat::Text => {
            println!("Role: {} (unknown pages: {})", role, default_policy);
            for page in &allowed {
                println!("  {:>3}  {}", page, pages::name(*page).unwrap_or("?"));
            }
            if !definition.required_scopes.is_empty() {
                let scopes: Vec<_> = definition.required_scopes.iter().map(|d| d.as_str()).collect();
                println!("Requires scope: {}", scopes.join(", "));
            }
            println!("Export: {}  Manage users: {}", definition.can_export, definition.can_manage_users);
            Ok(())
        }
    }
}
