//! `resource fund` and `resource defund`.
//!
//! Each requested budget is handled independently: a failure is reported
//! and the other budget is still processed.

use bzzup_gateway::GatewayError;
use eyre::Result;
use tracing::warn;

use crate::{CommandContext, cli::ResourceFundingArgs};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Fund,
    Defund,
}

impl Action {
    fn verb(self) -> &'static str {
        match self {
            Self::Fund => "fund",
            Self::Defund => "defund",
        }
    }

    fn progressive(self) -> &'static str {
        match self {
            Self::Fund => "funding",
            Self::Defund => "defunding",
        }
    }
}

pub async fn fund(ctx: &CommandContext, args: ResourceFundingArgs) -> Result<()> {
    change_budget(ctx, args, Action::Fund).await
}

pub async fn defund(ctx: &CommandContext, args: ResourceFundingArgs) -> Result<()> {
    change_budget(ctx, args, Action::Defund).await
}

async fn change_budget(ctx: &CommandContext, args: ResourceFundingArgs, action: Action) -> Result<()> {
    let address = args.address;
    let heading = match action {
        Action::Fund => "Funding",
        Action::Defund => "Defunding",
    };
    ctx.console
        .write_line(&format!("{heading} resource {address}..."));

    let mut failed = 0;
    if args.pin {
        let result = match action {
            Action::Fund => ctx.gateway.fund_resource_pinning(&address).await,
            Action::Defund => ctx.gateway.defund_resource_pinning(&address).await,
        };
        failed += report(ctx, action, "pinning", result);
    }
    if args.traffic {
        let result = match action {
            Action::Fund => ctx.gateway.fund_resource_download(&address).await,
            Action::Defund => ctx.gateway.defund_resource_download(&address).await,
        };
        failed += report(ctx, action, "traffic", result);
    }

    eyre::ensure!(failed == 0, "unable to {} resource {address}", action.verb());
    Ok(())
}

/// Prints the outcome of one budget change, returning `1` on failure.
fn report(
    ctx: &CommandContext,
    action: Action,
    budget: &str,
    result: std::result::Result<(), GatewayError>,
) -> usize {
    match result {
        Ok(()) => {
            ctx.console
                .write_line(&format!("Resource {budget} {}ed", action.verb()));
            0
        }
        Err(e) => {
            warn!(budget, ?action, error = %e, "Resource budget change failed");
            ctx.console
                .write_error_line(&format!("Error {} resource {budget}", action.progressive()));
            ctx.console.write_line(&e.to_string());
            1
        }
    }
}
