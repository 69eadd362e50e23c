use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

use grantdesk_cli::config::{ImportTargetArgs, RoleArg};
use grantdesk_cli::{Command, Config};
use grantdesk_client::{FetcherFactory, PublicationFetcherEnum};
use grantdesk_core::auth::hash_password;
use grantdesk_core::{
    BatchImportSummary, DbConfig, ImportConfig, ImportService, ImportStats, ImportTarget,
    LibreOfficeConverter, NewUser, PublicationSource, RequestSummary, SummaryRequest,
    SummaryService, TracingReporter, load_file_config, summarize_requests,
};
use grantdesk_db::{
    PublicationRepository, RequestFilter, RequestRepository, UserRepository, YearRepository,
    migrations,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Logs go to stderr; stdout carries command output
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;

    let config = Config::parse();

    info!("Connecting to database...");
    let db_config = DbConfig::default();
    let pool = MySqlPoolOptions::new()
        .max_connections(db_config.max_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    match config.command {
        Command::Migrate => {
            migrations::run(&pool)
                .await
                .context("Failed to apply migrations")?;
            println!("Schema is up to date.");
        }
        Command::CreateUser {
            email,
            name,
            role,
            department,
            password,
        } => {
            create_user(&pool, email, name, role, department, &password).await?;
        }
        Command::Import { target, source } => {
            let factory = FetcherFactory::new(config.scopus_api_key, config.scholar_api_key);
            let import_config = load_file_config(config.config)?
                .map(|c| c.import)
                .unwrap_or_default();
            handle_import(&pool, &factory, import_config, target, source.into()).await?;
        }
        Command::Summary { user, year, output } => {
            let summary_config = load_file_config(config.config)?
                .and_then(|c| c.summary)
                .ok_or_else(|| {
                    anyhow::anyhow!(
                        "No [summary] section found. Add one to ~/.config/grantdesk/grantdesk.toml or use --config"
                    )
                })?;
            let service = SummaryService::new(
                summary_config.template_path.clone(),
                LibreOfficeConverter::new(summary_config.soffice_bin.clone(), summary_config.timeout()),
            );

            let pdf = render_summary(&pool, &service, &user, year).await?;
            tokio::fs::write(&output, &pdf)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("Wrote {} ({} bytes)", output.display(), pdf.len());
        }
        Command::Stats { year } => {
            show_stats(&pool, year).await?;
        }
    }

    Ok(())
}

async fn create_user(
    pool: &MySqlPool,
    email: String,
    full_name: String,
    role: RoleArg,
    department: Option<String>,
    password: &str,
) -> anyhow::Result<()> {
    let users = UserRepository::new(pool.clone());

    let department_id = match department {
        Some(name) => {
            let existing = users
                .list_departments()
                .await?
                .into_iter()
                .find(|d| d.name.eq_ignore_ascii_case(name.trim()));
            let department = match existing {
                Some(d) => d,
                None => {
                    info!("Creating department '{}'", name.trim());
                    users.create_department(&name).await?
                }
            };
            Some(department.id)
        }
        None => None,
    };

    let user = users
        .create(&NewUser {
            email,
            password_hash: hash_password(password)?,
            full_name,
            role: role.into(),
            department_id,
        })
        .await?;

    println!("Created {} ({}) with id {}", user.email, user.role, user.id);
    Ok(())
}

async fn handle_import(
    pool: &MySqlPool,
    factory: &FetcherFactory,
    import_config: ImportConfig,
    target: ImportTargetArgs,
    source: PublicationSource,
) -> anyhow::Result<()> {
    let users = UserRepository::new(pool.clone());
    let fetcher: PublicationFetcherEnum = factory.for_source(source)?;
    let service = ImportService::with_config(
        PublicationRepository::new(pool.clone()),
        fetcher,
        import_config,
    );
    let reporter = TracingReporter;

    match target.user {
        Some(email) => {
            let user = users
                .find_by_email(&email)
                .await?
                .ok_or_else(|| anyhow::anyhow!("No user with email '{}'", email))?;
            let author_id = user.author_id_for(source).ok_or_else(|| {
                anyhow::anyhow!("{} has no {} author id", user.email, source.as_str())
            })?;

            info!("Importing {} publications for {}", source.as_str(), user.email);
            let stats = service
                .import_for_user_with_progress(user.id, author_id, &reporter)
                .await?;
            print_user_summary(&user.email, &stats);
        }
        None => {
            let targets: Vec<ImportTarget> = users
                .list_with_author_ids(source)
                .await?
                .iter()
                .filter_map(|u| {
                    u.author_id_for(source).map(|author_id| ImportTarget {
                        user_id: u.id,
                        author_id: author_id.to_string(),
                        label: u.email.clone(),
                    })
                })
                .collect();

            if targets.is_empty() {
                info!("No active users with a {} author id.", source.as_str());
                return Ok(());
            }

            info!(
                "Starting batch import of {} users from {}",
                targets.len(),
                source.as_str()
            );
            let summary = service
                .batch_import_with_progress(&targets, &reporter)
                .await;
            print_batch_summary(&summary);
        }
    }

    Ok(())
}

fn print_user_summary(label: &str, stats: &ImportStats) {
    eprintln!();
    eprintln!("Import complete: {}", label);
    eprintln!("  + Created:           {}", stats.created);
    eprintln!("  ~ Updated:           {}", stats.updated);
    eprintln!("  = Unchanged:         {}", stats.unchanged);
    eprintln!("  x Failed:            {}", stats.failed);
    eprintln!("  Total processed:     {}", stats.total());
}

fn print_batch_summary(summary: &BatchImportSummary) {
    eprintln!();
    eprintln!("BATCH IMPORT COMPLETE");
    eprintln!("  Users processed:     {}", summary.total_users());
    eprintln!("  Successful:          {}", summary.successful_count());
    eprintln!("  Failed:              {}", summary.failed_count());
    eprintln!("  Total publications:  {}", summary.total_publications());

    if summary.failed_count() > 0 {
        eprintln!("Failed users:");
        for result in summary.results.iter().filter(|r| !r.is_success()) {
            if let Some(err) = &result.error {
                error!("  - {}: {}", result.label, err);
            }
        }
    }
}

async fn render_summary(
    pool: &MySqlPool,
    service: &SummaryService<LibreOfficeConverter>,
    email: &str,
    year: i32,
) -> anyhow::Result<Vec<u8>> {
    let users = UserRepository::new(pool.clone());
    let user = users
        .find_by_email(email)
        .await?
        .ok_or_else(|| anyhow::anyhow!("No user with email '{}'", email))?;
    let department = match user.department_id {
        Some(id) => users.get_department(id).await?.map(|d| d.name),
        None => None,
    };
    let publications = PublicationRepository::new(pool.clone())
        .list_for_user(user.id, Some(year))
        .await?;

    info!(
        "Rendering {} summary for {} ({} publications)",
        year,
        user.email,
        publications.len()
    );
    let pdf = service
        .generate(&SummaryRequest {
            user: &user,
            department: department.as_deref(),
            year,
            publications: &publications,
        })
        .await
        .context("Summary generation failed")?;
    Ok(pdf)
}

async fn show_stats(pool: &MySqlPool, year: Option<i32>) -> anyhow::Result<()> {
    let years = YearRepository::new(pool.clone());
    let budget_year = match year {
        Some(y) => Some(
            years
                .find_by_year(y)
                .await?
                .ok_or_else(|| anyhow::anyhow!("No budget year {}", y))?,
        ),
        None => years.current().await?,
    };

    let filter = RequestFilter {
        year_id: budget_year.as_ref().map(|y| y.id),
        ..Default::default()
    };
    let rows = RequestRepository::new(pool.clone())
        .dashboard_rows(&filter)
        .await?;
    let summary = summarize_requests(&rows);

    let publications = PublicationRepository::new(pool.clone()).get_stats().await?;
    let roles = UserRepository::new(pool.clone()).count_by_role().await?;

    println!();
    match &budget_year {
        Some(y) => println!("Budget year {} (budget {})", y.year, y.budget),
        None => println!("No current budget year; counting every year"),
    }
    print_request_summary(&summary);

    println!();
    println!("Accounts");
    for (role, count) in &roles {
        println!("  {:<20} {:>6}", role, count);
    }

    println!();
    println!("Publications");
    println!("  Total:                 {}", publications.total);
    println!("  People with entries:   {}", publications.users_with_publications);
    for (source, count) in &publications.by_source {
        println!("  {:<22} {}", format!("{}:", source), count);
    }
    if let Some(last) = publications.last_import {
        println!("  Last import:           {}", last);
    }
    println!();

    Ok(())
}

fn print_request_summary(summary: &RequestSummary) {
    println!("  Requests:              {}", summary.total_requests);
    println!("  Requested total:       {}", summary.requested_total);
    println!("  Approved total:        {}", summary.approved_total);
    println!("  Awaiting review:       {}", summary.pending_review);
    for status in summary.by_status.iter().filter(|s| s.count > 0) {
        println!("    {:<20} {:>6}", status.status.as_str(), status.count);
    }
    if !summary.by_category.is_empty() {
        println!("  By category:");
        for category in &summary.by_category {
            println!(
                "    {:<30} {:>4} requests, {} approved",
                category.name, category.requests, category.approved
            );
        }
    }
}
