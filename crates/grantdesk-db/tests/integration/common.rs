//! Test utilities for integration tests.
//!
//! Starts an isolated MySQL container per test and seeds the rows most
//! tests need.

use grantdesk_core::{
    BudgetScope, NewBudgetLine, NewBudgetYear, NewFundCategory, NewFundSubcategory, NewUser,
    RecordStatus, Role, User,
};
use grantdesk_db::{FundRepository, UserRepository, YearRepository, migrations};
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

/// Starts MySQL 8, applies the schema and returns a pool.
///
/// Keep the returned container alive for the duration of the test.
pub async fn setup_test_db() -> (MySqlPool, ContainerAsync<GenericImage>) {
    let container = GenericImage::new("mysql", "8.0")
        .with_exposed_port(ContainerPort::Tcp(3306))
        .with_wait_for(WaitFor::message_on_stderr("ready for connections"))
        .with_env_var("MYSQL_ROOT_PASSWORD", "grantdesk")
        .with_env_var("MYSQL_DATABASE", "grantdesk")
        .start()
        .await
        .expect("Failed to start MySQL container");

    let host = container.get_host().await.expect("Failed to get host");
    let port = container
        .get_host_port_ipv4(3306)
        .await
        .expect("Failed to get port");

    let connection_string = format!("mysql://root:grantdesk@{}:{}/grantdesk", host, port);

    // The first "ready" line comes from the init server, so keep retrying.
    const MAX_RETRIES: u32 = 120;
    let mut retries = 0;
    let pool = loop {
        match MySqlPoolOptions::new()
            .max_connections(5)
            .connect(&connection_string)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retries += 1;
                if retries >= MAX_RETRIES {
                    panic!(
                        "Failed to connect to database after {} retries: {}",
                        MAX_RETRIES, e
                    );
                }
                tokio::time::sleep(std::time::Duration::from_millis(500)).await;
            }
        }
    };

    migrations::run(&pool)
        .await
        .expect("Failed to run migrations");

    (pool, container)
}

pub async fn create_user(pool: &MySqlPool, email: &str, role: Role, department_id: Option<i64>) -> User {
    UserRepository::new(pool.clone())
        .create(&NewUser {
            email: email.to_string(),
            password_hash: "$argon2id$test".to_string(),
            full_name: format!("User {}", email),
            role,
            department_id,
        })
        .await
        .expect("create user")
}

/// Ids of a seeded year with one category and one subcategory.
#[allow(dead_code)]
pub struct FundFixture {
    pub year_id: i64,
    pub category_id: i64,
    pub subcategory_id: i64,
}

/// Seeds budget year 2026 with "Research support / Conference travel"
/// (open to teachers, per-grant ceiling of 20 000 at "international").
pub async fn seed_funds(pool: &MySqlPool) -> FundFixture {
    let year = YearRepository::new(pool.clone())
        .create(&NewBudgetYear {
            year: 2026,
            budget: 1_000_000,
            status: RecordStatus::Active,
        })
        .await
        .expect("create year");

    let funds = FundRepository::new(pool.clone());
    let category = funds
        .create_category(&NewFundCategory {
            year_id: year.id,
            name: "Research support".to_string(),
            description: None,
            status: RecordStatus::Active,
            sort_order: 1,
        })
        .await
        .expect("create category");
    let subcategory = funds
        .create_subcategory(&NewFundSubcategory {
            category_id: category.id,
            name: "Conference travel".to_string(),
            fund_condition: Some("Accepted paper required".to_string()),
            target_roles: vec![Role::Teacher, Role::DeptHead],
            status: RecordStatus::Active,
            sort_order: 1,
        })
        .await
        .expect("create subcategory");
    funds
        .create_budget_line(&NewBudgetLine {
            subcategory_id: subcategory.id,
            level: Some("international".to_string()),
            scope: BudgetScope::PerGrant,
            amount: 20_000,
            max_grants: Some(5),
            description: None,
        })
        .await
        .expect("create budget line");

    FundFixture {
        year_id: year.id,
        category_id: category.id,
        subcategory_id: subcategory.id,
    }
}
