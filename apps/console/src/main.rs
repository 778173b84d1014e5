use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    config::normalize_server_url, load_settings, reconcile::changed_fields, AdminSession,
    FetchOutcome, FilterValue, MutationEffect, Pagination,
};
use serde_json::json;
use shared::{
    action::{Intent, ToggleField},
    domain::{EntityId, EntityKind, SponsorLevel},
    entity::{Ad, AdminEntity, Banner, Listing, Member, News, Payment, Sponsor, Vendor},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "admin-console", about = "Operate the back-office from a terminal")]
struct Cli {
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    token: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct Target {
    #[arg(value_parser = parse_kind)]
    resource: EntityKind,
    id: i64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and print the reference data.
    Options,
    List {
        #[arg(value_parser = parse_kind)]
        resource: EntityKind,
        #[arg(long, default_value = "")]
        keyword: String,
        #[arg(long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, FilterValue)>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        size: Option<u32>,
    },
    View {
        #[command(flatten)]
        target: Target,
    },
    Remove {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        yes: bool,
    },
    Approve {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        yes: bool,
    },
    Reject {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        yes: bool,
    },
    Confirm {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        yes: bool,
    },
    Toggle {
        #[command(flatten)]
        target: Target,
        #[arg(value_parser = parse_toggle)]
        field: ToggleField,
    },
    SetLevel {
        #[command(flatten)]
        target: Target,
        #[arg(value_parser = parse_level)]
        level: SponsorLevel,
        #[arg(long)]
        yes: bool,
    },
}

fn parse_kind(raw: &str) -> Result<EntityKind, String> {
    EntityKind::from_resource(raw).ok_or_else(|| {
        let known: Vec<&str> = EntityKind::ALL.iter().map(|kind| kind.resource()).collect();
        format!("unknown resource `{raw}` (expected one of {})", known.join(", "))
    })
}

fn parse_filter(raw: &str) -> Result<(String, FilterValue), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("filter `{raw}` must look like name=value"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("filter `{raw}` has no name"));
    }
    Ok((name.to_string(), FilterValue::parse(value)))
}

fn parse_toggle(raw: &str) -> Result<ToggleField, String> {
    ToggleField::parse(raw)
        .ok_or_else(|| format!("unknown field `{raw}` (visibility, bottom, state, public)"))
}

fn parse_level(raw: &str) -> Result<SponsorLevel, String> {
    SponsorLevel::parse(raw).ok_or_else(|| format!("unknown level `{raw}`"))
}

/// Runs a generic screen function for the entity type behind `$kind`.
macro_rules! for_entity {
    ($kind:expr, $func:ident($($arg:expr),* $(,)?)) => {
        match $kind {
            EntityKind::Ads => $func::<Ad>($($arg),*).await,
            EntityKind::Banner => $func::<Banner>($($arg),*).await,
            EntityKind::Listing => $func::<Listing>($($arg),*).await,
            EntityKind::News => $func::<News>($($arg),*).await,
            EntityKind::Payment => $func::<Payment>($($arg),*).await,
            EntityKind::Vendor => $func::<Vendor>($($arg),*).await,
            EntityKind::Sponsor => $func::<Sponsor>($($arg),*).await,
            EntityKind::Member => $func::<Member>($($arg),*).await,
        }
    };
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let cli = Cli::parse();

    let mut settings = load_settings()?;
    if let Some(server_url) = cli.server_url {
        settings.server_url = normalize_server_url(&server_url)?;
    }
    if let Some(token) = cli.token {
        settings.auth_token = Some(token);
    }
    info!(server_url = %settings.server_url, "admin console starting");
    let session = AdminSession::connect(settings).context("failed to build request layer")?;

    match cli.command {
        Command::Options => print_options(&session).await,
        Command::List {
            resource,
            keyword,
            filters,
            page,
            size,
        } => {
            let size = size.unwrap_or(session.settings().page_size);
            let pagination = Pagination::new(page, size);
            for_entity!(resource, list(&session, keyword, filters, pagination))
        }
        Command::View { target } => for_entity!(target.resource, view(&session, target.id)),
        Command::Remove { target, yes } => run(&session, target, Intent::Remove, yes).await,
        Command::Approve { target, yes } => run(&session, target, Intent::Approve, yes).await,
        Command::Reject { target, yes } => run(&session, target, Intent::Reject, yes).await,
        Command::Confirm { target, yes } => run(&session, target, Intent::Confirm, yes).await,
        Command::Toggle { target, field } => {
            run(&session, target, Intent::Toggle(field), false).await
        }
        Command::SetLevel { target, level, yes } => {
            run(&session, target, Intent::ChangeLevel(level), yes).await
        }
    }
}

async fn print_options(session: &AdminSession) -> Result<()> {
    session.reference().load().await?;
    let data = session.reference().snapshot();
    for (category, options) in data.categories() {
        println!("{category}:");
        if options.is_empty() {
            println!("  (empty)");
        }
        for option in options {
            println!("  {} = {}", option.key, option.label);
        }
    }
    println!(
        "notifications: {} ({} unread)",
        data.notifications().len(),
        data.unread_notifications()
    );
    if !data.is_ready() {
        println!("reference data is incomplete; list screens stay on hold");
    }
    Ok(())
}

async fn list<E: AdminEntity>(
    session: &AdminSession,
    keyword: String,
    filters: Vec<(String, FilterValue)>,
    pagination: Pagination,
) -> Result<()> {
    session.reference().load().await?;
    let controller = session.list_controller::<E>();
    match controller.apply_query(keyword, filters, pagination).await {
        FetchOutcome::Applied { .. } => {}
        FetchOutcome::Deferred => {
            bail!("reference data is incomplete; run `options` to see which category is empty")
        }
        FetchOutcome::Superseded => bail!("{} list was superseded", E::KIND),
        FetchOutcome::Failed(err) => return Err(err.into()),
    }

    let state = controller.state();
    let page = json!({
        "resource": E::KIND,
        "total": state.total,
        "page": state.pagination.page(),
        "size": state.pagination.size(),
        "rows": state.rows,
    });
    println!("{}", serde_json::to_string_pretty(&page)?);
    Ok(())
}

async fn view<E: AdminEntity>(session: &AdminSession, id: i64) -> Result<()> {
    let row = session.view::<E>(EntityId(id)).await?;
    println!("{}", serde_json::to_string_pretty(&row)?);
    Ok(())
}

async fn run(session: &AdminSession, target: Target, intent: Intent, yes: bool) -> Result<()> {
    for_entity!(target.resource, mutate(session, EntityId(target.id), intent, yes))
}

async fn mutate<E: AdminEntity>(
    session: &AdminSession,
    id: EntityId,
    intent: Intent,
    yes: bool,
) -> Result<()> {
    let row = session.view::<E>(id).await?;
    let executor = session.executor::<E>();
    let family = intent.family();

    if family.requires_confirmation() {
        executor.request_confirm(&row, intent).await?;
        if !yes {
            let next = row.transition(&intent)?;
            println!(
                "{} {id} ({}): {family} would change {}; re-run with --yes to apply",
                E::KIND,
                row.state_label(),
                changed_fields(&row, &next).join(", ")
            );
            executor.cancel_confirm(id, family).await;
            return Ok(());
        }
    }

    match executor.submit(&row, intent).await? {
        MutationEffect::Removed(id) => println!("{} {id} removed", E::KIND),
        MutationEffect::Patched(next) => {
            println!("{}", serde_json::to_string_pretty(&next)?);
        }
    }
    Ok(())
}
