//! studycake CLI entry point.

mod cli;

use clap::Parser;
use cli::{Cli, Command};
use color_eyre::eyre::eyre;
use studycake_entitlements::catalog::{self, CourseId};
use studycake_entitlements::payment::CachedRecord;
use studycake_entitlements::{EntitlementServiceBuilder, Lamports};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    info!("studycake v{}", env!("CARGO_PKG_VERSION"));

    let config = cli.to_config()?;
    let service = EntitlementServiceBuilder::new(config).build()?;

    match cli.command {
        Command::Verify {
            wallet,
            course,
            price,
        } => {
            let expected = match price {
                Some(text) => Lamports::from_sol_str(&text)?,
                None => catalog::course(course)
                    .map(|c| c.price)
                    .ok_or_else(|| eyre!("course {course} is not in the catalog; pass --price"))?,
            };
            let status = service
                .purchases()
                .check_purchase(&wallet, course, expected)
                .await;
            println!(
                "course {course}: {} ({status:?})",
                if status.is_entitled() { "owned" } else { "not owned" }
            );
        }
        Command::Owned { wallet, sequential } => {
            let owned = if sequential {
                let ids: Vec<CourseId> = catalog::all().iter().map(|c| c.id).collect();
                service
                    .purchases()
                    .get_purchased_courses(&wallet, &ids, &catalog::price_table())
                    .await
            } else {
                service.purchased_catalog_courses(&wallet).await
            };
            print_courses(&owned);
        }
        Command::Nft { wallet, course } => {
            let status = service.nfts().check_nft_ownership(&wallet, course).await;
            println!(
                "course {course}: {} ({status:?})",
                if status.is_entitled() { "held" } else { "not held" }
            );
        }
        Command::NftOwned { wallet } => {
            let ids: Vec<CourseId> = catalog::all().iter().map(|c| c.id).collect();
            let owned = service.nfts().get_owned_course_nfts(&wallet, &ids).await;
            print_courses(&owned);
        }
        Command::Courses => {
            for course in catalog::all() {
                let list = course
                    .regular_price
                    .map(|p| format!(" (was {p})"))
                    .unwrap_or_default();
                println!(
                    "{:>4}  {:<32} {:<10} {}{list}",
                    course.id, course.title, course.language, course.price
                );
            }
        }
        Command::Cache { wallet } => {
            let keep = |owner: Option<&studycake_entitlements::Pubkey>| {
                wallet.as_ref().map_or(true, |w| owner == Some(w))
            };
            for record in service.purchases().cache().get_cached() {
                if keep(record.owner()) {
                    println!("{}", serde_json::to_string(&record)?);
                }
            }
            for record in service.nfts().cache().get_cached() {
                if keep(record.owner()) {
                    println!("{}", serde_json::to_string(&record)?);
                }
            }
        }
    }

    Ok(())
}

fn print_courses(ids: &[CourseId]) {
    if ids.is_empty() {
        println!("no courses");
    }
    for id in ids {
        let title = catalog::course(*id).map_or("<unknown>", |c| c.title);
        println!("{id:>4}  {title}");
    }
}
