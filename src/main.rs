use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;

use vmdash::api::types::ListFilters;
use vmdash::config::Config;
use vmdash::notify::TracingNotifier;
use vmdash::query::Query;
use vmdash::{logging, ApiError, Dashboard};

#[derive(Parser, Debug)]
#[command(name = "vmdash")]
#[command(about = "Admin client for the virtual makeup SDK dashboard API")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/vmdash/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List one page of a resource
  List {
    resource: ResourceArg,
    #[command(flatten)]
    page: PageArgs,
    /// Free-text search
    #[arg(short, long)]
    search: Option<String>,
  },
  /// Show a single entity
  Get { resource: ResourceArg, id: String },
  /// Check a coupon code
  ValidateCoupon {
    code: String,
    /// Package the coupon would be applied to
    #[arg(short, long)]
    package: Option<String>,
  },
  /// List the merchant's Divar posts
  DivarPosts {
    #[command(flatten)]
    page: PageArgs,
  },
  /// Request a sign-in code
  SendOtp { phone: String },
  /// Exchange a sign-in code for a session
  VerifyOtp { phone: String, code: String },
  /// Revoke the current session
  Logout,
}

#[derive(ClapArgs, Debug)]
struct PageArgs {
  #[arg(long, default_value_t = 1)]
  page: u32,
  #[arg(long)]
  limit: Option<u32>,
}

impl PageArgs {
  fn filters(&self) -> ListFilters {
    let filters = ListFilters::page(self.page);
    match self.limit {
      Some(limit) => filters.with_limit(limit),
      None => filters,
    }
  }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ResourceArg {
  Users,
  Plans,
  Packages,
  Products,
  Notifications,
  Coupons,
  Payments,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let config = Config::load(args.config.as_deref())?;
  let _guard = logging::init(&config.log_dir())?;

  let dashboard = Dashboard::from_config(&config, Arc::new(TracingNotifier))?;
  run(&dashboard, args.command).await
}

async fn run(dashboard: &Dashboard, command: Command) -> Result<()> {
  match command {
    Command::List {
      resource,
      page,
      search,
    } => {
      let mut filters = page.filters();
      if let Some(search) = search {
        filters = filters.with_search(search);
      }
      list(dashboard, resource, filters).await
    }
    Command::Get { resource, id } => get(dashboard, resource, &id).await,
    Command::ValidateCoupon { code, package } => {
      let result = dashboard.coupons().validate(&code, package.as_deref()).await;
      print_json(&report(dashboard, result)?)
    }
    Command::DivarPosts { page } => print_query(dashboard, dashboard.divar().posts(page.filters())).await,
    Command::SendOtp { phone } => {
      let result = dashboard.auth().send_otp(&phone).await;
      print_json(&report(dashboard, result)?)
    }
    Command::VerifyOtp { phone, code } => {
      let result = dashboard.auth().verify_otp(&phone, &code).await;
      print_json(&report(dashboard, result)?)
    }
    Command::Logout => {
      if !dashboard.session().is_authenticated() {
        return Err(eyre!("Not signed in. Set VMDASH_API_TOKEN to sign out a session."));
      }
      let result = dashboard.auth().logout().await;
      print_json(&report(dashboard, result)?)
    }
  }
}

async fn list(dashboard: &Dashboard, resource: ResourceArg, filters: ListFilters) -> Result<()> {
  match resource {
    ResourceArg::Users => print_query(dashboard, dashboard.users().list(filters)).await,
    ResourceArg::Plans => print_query(dashboard, dashboard.plans().list(filters)).await,
    ResourceArg::Packages => print_query(dashboard, dashboard.packages().list(filters)).await,
    ResourceArg::Products => print_query(dashboard, dashboard.products().list(filters)).await,
    ResourceArg::Notifications => print_query(dashboard, dashboard.notifications().list(filters)).await,
    ResourceArg::Coupons => print_query(dashboard, dashboard.coupons().list(filters)).await,
    ResourceArg::Payments => print_query(dashboard, dashboard.payments().list(filters)).await,
  }
}

async fn get(dashboard: &Dashboard, resource: ResourceArg, id: &str) -> Result<()> {
  match resource {
    ResourceArg::Users => print_query(dashboard, dashboard.users().get_by_id(id)).await,
    ResourceArg::Plans => print_query(dashboard, dashboard.plans().get_by_id(id)).await,
    ResourceArg::Packages => print_query(dashboard, dashboard.packages().get_by_id(id)).await,
    ResourceArg::Products => print_query(dashboard, dashboard.products().get_by_id(id)).await,
    ResourceArg::Notifications => print_query(dashboard, dashboard.notifications().get_by_id(id)).await,
    ResourceArg::Coupons => print_query(dashboard, dashboard.coupons().get_by_id(id)).await,
    ResourceArg::Payments => print_query(dashboard, dashboard.payments().get_by_id(id)).await,
  }
}

async fn print_query<T>(dashboard: &Dashboard, mut query: Query<T>) -> Result<()>
where
  T: Serialize + Clone + Send + Sync + 'static,
{
  let result = query.load().await;
  if let Some(err) = result.error {
    return Err(eyre!(err.user_message(dashboard.i18n())));
  }
  match result.data {
    Some(data) => print_json(&data),
    None => Err(eyre!("No data returned for {}", query.key())),
  }
}

/// Turn a mutation result into a CLI error with the user-facing message.
fn report<T>(dashboard: &Dashboard, result: Result<T, ApiError>) -> Result<T> {
  result.map_err(|err| eyre!(err.user_message(dashboard.i18n())))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
