/// Create an admin account from the command line.
///
/// Usage: create-admin --email EMAIL --password PASSWORD --name NAME [--role ROLE]
use anyhow::Context;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use mealplan_api::{models::admin::CreateAdminRequest, services::admin::AdminService};

#[derive(Parser)]
#[command(name = "create-admin", about = "Create an admin panel account")]
struct Args {
    #[arg(long)]
    email: String,

    #[arg(long)]
    password: String,

    #[arg(long)]
    name: String,

    /// super_admin, sub_admin or marketing_admin
    #[arg(long, default_value = "super_admin")]
    role: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL environment variable not set")?;
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await?;
    mealplan_api::db::run_migrations(&pool).await?;

    let admin = AdminService::create_admin(
        &pool,
        CreateAdminRequest {
            email: Some(args.email),
            password: Some(args.password),
            name: Some(args.name),
            role: Some(args.role),
        },
        None,
    )
    .await?;

    tracing::info!("Created {} admin {} ({})", admin.role, admin.email, admin.id);
    Ok(())
}
