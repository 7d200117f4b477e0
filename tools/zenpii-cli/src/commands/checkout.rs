//! Live checkout against the configured API.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context as _, Result};
use dialoguer::{Confirm, Input};
use zenpii_cache::Cache;
use zenpii_commerce::checkout::{CheckoutDeps, CheckoutSession, SessionState};
use zenpii_commerce::commit::{
    CacheReconciliationQueue, ChannelNotifier, CommitError, Order, OrderCommitter, PendingRedirects,
    ORDER_EVENT,
};
use zenpii_commerce::payment::{CurrencyConverter, RedirectGateway};
use zenpii_commerce::ports::MarketplaceApi;
use zenpii_commerce::shipping::ShippingQuoter;
use zenpii_data::{ExchangeRateApi, FetchClient, GhnCarrier, RestMarketplace};

use super::quote::print_breakdown;
use super::{CheckoutArgs, CheckoutMethod};
use crate::cart::CartFile;
use crate::config::ACCESS_TOKEN_ENV;
use crate::context::Context;
use crate::output::state_badge;

/// In-process store for pending redirects and reconciliation cases.
const CLI_CACHE: &str = "zenpii-cli";

/// Run the checkout command.
pub async fn run(args: CheckoutArgs, ctx: &Context) -> Result<()> {
    let config = &ctx.config;
    let problems = config.problems();
    if !problems.is_empty() {
        bail!(
            "Configuration is not usable for a live checkout:\n  - {}",
            problems.join("\n  - ")
        );
    }
    if args.method == CheckoutMethod::Gateway && !config.gateway_configured() {
        bail!("checkout.gateway.tmn_code and checkout.gateway.secure_secret are required for gateway payments");
    }

    let cart = CartFile::load(&ctx.resolve_path(&args.cart))?.snapshot()?;
    let buyer = config
        .buyer
        .to_account(std::env::var(ACCESS_TOKEN_ENV).ok())?;

    let client = FetchClient::new().context("Failed to build HTTP client")?;
    let marketplace: Arc<dyn MarketplaceApi> =
        Arc::new(RestMarketplace::new(client.clone(), &config.api.base_url)?);
    let carrier = Arc::new(GhnCarrier::new(client.clone(), config.api.carrier.clone()));
    let shipping = ShippingQuoter::new(carrier, config.checkout.shipping.clone());
    let deps = CheckoutDeps::new(marketplace.clone(), shipping, config.checkout.clone());
    let mut session = CheckoutSession::new(deps, buyer, cart);
    ctx.output.debug(&format!("checkout {}", session.id()));

    let spinner = ctx.output.spinner("Fetching levels, commission and shipping quote...");
    match args.address {
        Some(address) => {
            let ticket = session.set_address(address)?;
            let outcome = ticket.resolve().await;
            session.apply_quote(outcome);
        }
        None => {
            session.refresh().await?;
        }
    }
    spinner.finish_and_clear();

    if let SessionState::Failed { .. } = session.state() {
        bail!(
            "Could not quote the cart: {}",
            session.last_error().unwrap_or("unknown error")
        );
    }
    let Some(resolved) = session.quote() else {
        bail!("Could not quote the cart");
    };
    let quote = resolved.quote;
    let degraded = resolved.degraded.clone();

    if !ctx.output.is_json() {
        ctx.output.header(&format!("Checkout {}", session.id()));
        ctx.output.kv("deliver to", &session.contact().address);
        print_breakdown(&ctx.output, &quote);
    }
    for input in &degraded {
        ctx.output.warn(&format!("{} unavailable, fallback used", input.label()));
    }

    let converter = CurrencyConverter::new(
        Arc::new(ExchangeRateApi::new(client, config.api.exchange_rate_url.clone())),
        config.checkout.exchange.settlement_currency,
        config.checkout.exchange.fallback_rate,
    );
    let conversion = converter.convert(quote.charge()).await;
    let suffix = if conversion.used_fallback { " (fallback rate)" } else { "" };
    ctx.output
        .kv("card equivalent", &format!("{}{}", conversion.amount.display(), suffix));

    let validation = session.validate();
    if !validation.is_ready() {
        bail!("Checkout is not ready: {}", validation);
    }

    let cache = Cache::open(CLI_CACHE);
    let queue = CacheReconciliationQueue::new(cache.clone());
    let (notifier, mut events) = ChannelNotifier::channel();
    let committer = OrderCommitter::new(marketplace, Arc::new(queue.clone()))
        .with_notifier(Arc::new(notifier))
        .with_reconciliation_attempts(config.checkout.reconciliation_attempts);

    let result = match args.method {
        CheckoutMethod::Cod => {
            if !args.yes && !ctx.output.is_json() {
                let confirmed = Confirm::new()
                    .with_prompt(format!(
                        "Place cash on delivery order for {}?",
                        quote.charge().display()
                    ))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    ctx.output.info("Cancelled");
                    return Ok(());
                }
            }
            committer.cash_on_delivery(&mut session).await
        }
        CheckoutMethod::Gateway => {
            let pending = PendingRedirects::new(
                cache,
                Duration::from_secs(config.checkout.gateway.pending_ttl_secs),
            );
            let committer = committer
                .with_redirect(RedirectGateway::new(config.checkout.gateway.clone()), pending);
            pay_through_gateway(&committer, &mut session, ctx).await
        }
    };

    while let Ok(event) = events.try_recv() {
        ctx.output
            .debug(&format!("{} {}", ORDER_EVENT, serde_json::to_string(&event)?));
    }

    match result {
        Ok(order) => {
            report_order(&order, &session, ctx);
            Ok(())
        }
        Err(e) => {
            if e.needs_reconciliation() {
                for case in queue.open_cases()? {
                    ctx.output.warn(&format!(
                        "Reconciliation case {} queued for cart {}: {}",
                        case.reference, case.cart_id, case.last_error
                    ));
                }
            }
            ctx.output.kv("state", &state_badge(session.state()));
            let message = e.user_message();
            Err(anyhow::Error::new(e).context(message))
        }
    }
}

/// Send the buyer to the gateway and wait for the return they are sent back with.
async fn pay_through_gateway(
    committer: &OrderCommitter,
    session: &mut CheckoutSession,
    ctx: &Context,
) -> Result<Order, CommitError> {
    let ticket = committer.begin_redirect(session).await?;

    if ctx.output.is_json() {
        ctx.output.json(&ticket);
    } else {
        ctx.output.success("Open this URL to pay:");
        println!("{}", ticket.payment_url);
    }

    let returned = match Input::<String>::new()
        .with_prompt("Paste the URL the gateway returned to")
        .interact_text()
    {
        Ok(input) => input,
        Err(e) => {
            let result = Err(CommitError::UnknownRedirect(format!("no return read: {}", e)));
            session.finish_redirect(&result);
            return result;
        }
    };

    let result = committer.complete_redirect(&parse_return_query(&returned)).await;
    session.finish_redirect(&result);
    result
}

/// Accept a full return URL or only its query string.
pub fn parse_return_query(input: &str) -> HashMap<String, String> {
    let input = input.trim();
    let query = match input.split_once('?') {
        Some((_, query)) => query,
        None => input,
    };
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

fn report_order(order: &Order, session: &CheckoutSession, ctx: &Context) {
    if ctx.output.is_json() {
        ctx.output.json(order);
        return;
    }
    ctx.output.success(&format!("Order {} placed", order.id));
    ctx.output.kv("payment", order.payment_method.as_str());
    ctx.output.kv("charged", &order.quote.charge().display());
    ctx.output.kv("state", &state_badge(session.state()));
}
