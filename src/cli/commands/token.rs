use anyhow::{anyhow, bail};
use clap::Args;
use serde_json::json;

use crate::auth::{generate_jwt, SessionClaims};
use crate::cli::{utils::output_success, OutputFormat};
use crate::filters::FilterInput;
use crate::permissions::{self, Role};

#[derive(Args)]
pub struct TokenArgs {
    #[arg(long, help = "Email recorded in the session")]
    pub email: String,

    #[arg(long, help = "Role name, e.g. admin or sga")]
    pub role: String,

    #[arg(long = "sga", help = "SGA scope value (repeatable)")]
    pub sga: Vec<String>,

    #[arg(long = "sgm", help = "SGM scope value (repeatable)")]
    pub sgm: Vec<String>,

    #[arg(long, env = "JWT_SECRET", hide_env_values = true, help = "Signing secret")]
    pub secret: String,
}

/// Turn repeated flag values into a claim; `None` when the flag was absent
fn scope_claim(values: Vec<String>) -> Option<FilterInput> {
    match values.len() {
        0 => None,
        1 => values.into_iter().next().map(FilterInput::One),
        _ => Some(FilterInput::Many(values)),
    }
}

pub fn handle(args: TokenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    if args.secret.is_empty() {
        bail!("a signing secret is required (--secret or JWT_SECRET)");
    }
    let role: Role = args.role.parse().map_err(|e: String| anyhow!(e))?;

    let claims = SessionClaims::new(args.email, role.as_str())
        .with_sga_filter(scope_claim(args.sga))
        .with_sgm_filter(scope_claim(args.sgm));

    // Refuse to mint a token the server would reject anyway
    permissions::resolve(&claims).map_err(|e| anyhow!(e))?;

    let token = generate_jwt(&claims, &args.secret).map_err(|e| anyhow!(e.to_string()))?;

    match output_format {
        OutputFormat::Json => output_success(
            output_format,
            "Token issued",
            Some(json!({ "token": token, "expires_at": claims.exp })),
        ),
        OutputFormat::Text => {
            println!("{}", token);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_flags_become_a_list_claim() {
        assert_eq!(scope_claim(vec![]), None);
        assert_eq!(scope_claim(vec!["Ana".into()]), Some(FilterInput::One("Ana".into())));
        assert_eq!(
            scope_claim(vec!["Ana".into(), "Ben".into()]),
            Some(FilterInput::Many(vec!["Ana".into(), "Ben".into()]))
        );
    }
}
