//! Configuration management commands.

use std::fs;

use anyhow::{bail, Result};

use super::{ConfigArgs, ConfigCommand};
use crate::config::{generate_default_config, CliConfig};
use crate::context::{Context, CONFIG_NAMES};

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx).await,
        ConfigCommand::Init { force } => init_config(force, ctx).await,
        ConfigCommand::Validate => validate_config(ctx).await,
    }
}

async fn show_config(ctx: &Context) -> Result<()> {
    let config = redacted(&ctx.config);

    if ctx.output.is_json() {
        ctx.output.json(&config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    match ctx.config_path {
        Some(ref path) => ctx.output.kv("file", &path.display().to_string()),
        None => ctx.output.kv("file", "(defaults)"),
    }

    ctx.output.info("");
    ctx.output.info("[api]");
    ctx.output.kv("base_url", &config.api.base_url);
    ctx.output.kv("exchange_rate_url", &config.api.exchange_rate_url);
    ctx.output.kv("carrier.base_url", &config.api.carrier.base_url);
    ctx.output.kv("carrier.token", &config.api.carrier.token);
    ctx.output.kv("carrier.shop_id", &config.api.carrier.shop_id.to_string());

    ctx.output.info("");
    ctx.output.info("[checkout]");
    let checkout = &config.checkout;
    ctx.output.kv("currency", checkout.currency.code());
    ctx.output.kv("quote_retries", &checkout.quote_retries.to_string());
    ctx.output.kv(
        "reconciliation_attempts",
        &checkout.reconciliation_attempts.to_string(),
    );
    ctx.output.kv(
        "exchange",
        &format!(
            "{} (fallback rate {})",
            checkout.exchange.settlement_currency, checkout.exchange.fallback_rate
        ),
    );
    ctx.output.kv(
        "shipping.default_service_id",
        &checkout.shipping.default_service_id.to_string(),
    );
    ctx.output.kv("gateway.host", &checkout.gateway.host);
    ctx.output.kv("gateway.tmn_code", &checkout.gateway.tmn_code);
    ctx.output.kv("gateway.secure_secret", &checkout.gateway.secure_secret);

    ctx.output.info("");
    ctx.output.info("[logging]");
    ctx.output.kv("level", config.logging.level.as_str());
    ctx.output.kv("format", &format!("{:?}", config.logging.format).to_lowercase());

    ctx.output.info("");
    ctx.output.info("[buyer]");
    ctx.output.kv("id", &config.buyer.id);
    for address in &config.buyer.addresses {
        ctx.output.list_item(address);
    }

    if !ctx.config.environments.is_empty() {
        ctx.output.info("");
        ctx.output.info("Environments:");
        let mut names: Vec<&String> = ctx.config.environments.keys().collect();
        names.sort();
        for env in names {
            ctx.output.list_item(env);
        }
    }

    Ok(())
}

async fn init_config(force: bool, ctx: &Context) -> Result<()> {
    let config_path = ctx.cwd.join(CONFIG_NAMES[0]);

    if config_path.exists() && !force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    fs::write(&config_path, generate_default_config())?;
    ctx.output.success(&format!("Created: {}", config_path.display()));

    Ok(())
}

async fn validate_config(ctx: &Context) -> Result<()> {
    ctx.output.header("Validating configuration");

    let errors = ctx.config.problems();
    let mut warnings: Vec<String> = Vec::new();

    if !ctx.config.gateway_configured() {
        warnings.push("checkout.gateway is not configured; gateway payments are unavailable".to_string());
    }
    if ctx.config.checkout.reconciliation_attempts == 0 {
        warnings.push(
            "checkout.reconciliation_attempts is 0; paid checkouts escalate on the first order failure"
                .to_string(),
        );
    }

    if errors.is_empty() && warnings.is_empty() {
        ctx.output.success("Configuration is valid");
        return Ok(());
    }

    for error in &errors {
        ctx.output.error(&format!("Error: {}", error));
    }

    for warning in &warnings {
        ctx.output.warn(&format!("Warning: {}", warning));
    }

    if !errors.is_empty() {
        bail!("Configuration has {} error(s)", errors.len());
    }

    ctx.output.success("Configuration is valid (with warnings)");

    Ok(())
}

/// Copy of the config with secrets masked.
fn redacted(config: &CliConfig) -> CliConfig {
    let mut config = config.clone();
    mask(&mut config.api.carrier.token);
    mask(&mut config.checkout.gateway.secure_secret);
    mask(&mut config.buyer.access_token);
    for env in config.environments.values_mut() {
        if let Some(ref mut api) = env.api {
            mask(&mut api.carrier.token);
        }
        if let Some(ref mut checkout) = env.checkout {
            mask(&mut checkout.gateway.secure_secret);
        }
    }
    config
}

fn mask(secret: &mut String) {
    if !secret.is_empty() {
        *secret = "********".to_string();
    }
}
