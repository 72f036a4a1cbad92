use chrono::Duration;
use clap::Args;
use serde_json::json;

use crate::auth::{IdentityClaims, JwtVerifier};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;

#[derive(Args, Debug)]
pub struct TokenArgs {
    #[arg(long, help = "Subject claim (identity provider user id)")]
    pub sub: String,

    #[arg(long = "role", help = "Role to grant; repeat for several")]
    pub roles: Vec<String>,

    #[arg(long, default_value = "")]
    pub email: String,

    #[arg(long, default_value = "")]
    pub given_name: String,

    #[arg(long, default_value = "")]
    pub family_name: String,

    #[arg(long)]
    pub phone_number: Option<String>,

    #[arg(long, help = "Lifetime in hours (defaults to the configured expiry)")]
    pub hours: Option<i64>,
}

pub fn handle(args: TokenArgs, config: AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let verifier = JwtVerifier::new(&config.security.jwt_secret, config.security.jwt_expiry_hours)?;
    let hours = args.hours.unwrap_or(config.security.jwt_expiry_hours as i64);

    let identity = IdentityClaims {
        subject: args.sub,
        email: args.email,
        given_name: args.given_name,
        family_name: args.family_name,
        phone_number: args.phone_number,
        roles: args.roles,
    };
    let token = verifier.issue_for(&identity, Duration::hours(hours))?;

    let data = match output_format {
        OutputFormat::Json => json!({ "token": token, "expires_in_hours": hours }),
        OutputFormat::Text => json!(token),
    };
    output_success(&output_format, &format!("Token for '{}' valid {}h", identity.subject, hours), Some(data))
}
