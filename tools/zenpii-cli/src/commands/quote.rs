//! Offline settlement breakdown.

use anyhow::Result;
use zenpii_commerce::money::format_for_display;
use zenpii_commerce::settlement::OrderQuote;

use super::QuoteArgs;
use crate::cart::CartFile;
use crate::context::Context;
use crate::output::Output;

/// Run the quote command.
pub async fn run(args: QuoteArgs, ctx: &Context) -> Result<()> {
    let cart = CartFile::load(&ctx.resolve_path(&args.cart))?;
    let quote = cart.offline_quote(ctx.config.checkout.currency)?;

    if ctx.output.is_json() {
        ctx.output.json(&quote);
        return Ok(());
    }

    ctx.output.header(&format!("Quote for store {}", cart.store_id));
    print_breakdown(&ctx.output, &quote);
    Ok(())
}

/// The summary a buyer sees, then the settlement split.
pub fn print_breakdown(output: &Output, quote: &OrderQuote) {
    let currency = quote.currency;

    output.amount("List price", quote.total_list_price, currency);
    if !quote.sale_savings().is_zero() {
        output.amount("Sale savings", -quote.sale_savings(), currency);
    }
    if !quote.buyer_discount().is_zero() {
        output.amount("Level discount", -quote.buyer_discount(), currency);
    }
    output.amount("Subtotal", quote.buyer_discounted_subtotal, currency);
    output.amount("Shipping", quote.shipping_fee_before_discount, currency);
    if !quote.shipping_discount().is_zero() {
        output.amount("Shipping discount", -quote.shipping_discount(), currency);
    }
    output.amount("Total", quote.amount_from_user, currency);

    output.header("Settlement");
    output.kv(
        "commission rate",
        &format!("{}%", format_for_display(quote.effective_commission_rate)),
    );
    output.amount("Commission from store", quote.amount_from_store, currency);
    output.amount("Payout to store", quote.amount_to_store, currency);
    output.amount("Platform net", quote.amount_to_zenpii, currency);
}
