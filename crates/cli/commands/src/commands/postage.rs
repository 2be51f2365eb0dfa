//! `postage create` and `postage info`.

use bzzup_postage::calculate_amount;
use eyre::{Result, WrapErr};
use std::time::Duration;

use crate::{
    CommandContext,
    cli::{PostageCreateArgs, PostageInfoArgs},
};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

pub async fn create(ctx: &CommandContext, args: PostageCreateArgs) -> Result<()> {
    let amount = match (args.amount, args.ttl) {
        (Some(amount), _) => amount,
        (None, Some(days)) => {
            let chain_price = ctx
                .gateway
                .chain_price()
                .await
                .wrap_err("unable to read the chain price")?;
            let ttl = Duration::from_secs(days.saturating_mul(SECONDS_PER_DAY));
            calculate_amount(chain_price, ttl, ctx.config.lifecycle_config().block_time)?
        }
        (None, None) => eyre::bail!("amount or ttl are required"),
    };

    let batch_id = ctx
        .lifecycle()
        .create_batch(amount, args.depth, args.label.as_deref())
        .await?;

    ctx.console.write_line("");
    ctx.console
        .write_line(&format!("Postage batch id: {batch_id}"));
    Ok(())
}

pub async fn info(ctx: &CommandContext, args: PostageInfoArgs) -> Result<()> {
    let info = match ctx.gateway.get_postage_batch(&args.batch_id).await {
        Ok(info) => Some(info),
        Err(e) if e.is_not_found() => None,
        Err(e) => return Err(e).wrap_err("unable to fetch postage batch"),
    };

    ctx.console.write_line("");
    match info {
        Some(info) => ctx.console.write_line(&serde_json::to_string_pretty(&info)?),
        None => ctx.console.write_line("Postage batch not found."),
    }
    Ok(())
}
