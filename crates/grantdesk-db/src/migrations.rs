//! Schema creation.
//!
//! Statements are applied in order, one per round trip, and are safe to run
//! again on an existing database.

use grantdesk_core::AppError;
use sqlx::MySqlPool;

/// Ordered schema statements.
pub const MIGRATIONS: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS departments (
        id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        UNIQUE KEY uk_departments_name (name)
    ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"#,
    r#"CREATE TABLE IF NOT EXISTS users (
        id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        email VARCHAR(255) NOT NULL,
        password_hash VARCHAR(255) NOT NULL,
        full_name VARCHAR(255) NOT NULL,
        role VARCHAR(20) NOT NULL,
        department_id BIGINT NULL,
        scopus_author_id VARCHAR(64) NULL,
        scholar_author_id VARCHAR(64) NULL,
        active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
        UNIQUE KEY uk_users_email (email),
        CONSTRAINT fk_users_department FOREIGN KEY (department_id) REFERENCES departments (id)
    ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"#,
    r#"CREATE TABLE IF NOT EXISTS sessions (
        token_hash CHAR(64) NOT NULL PRIMARY KEY,
        user_id BIGINT NOT NULL,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        expires_at TIMESTAMP NOT NULL,
        KEY idx_sessions_expires (expires_at),
        CONSTRAINT fk_sessions_user FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
    ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"#,
    r#"CREATE TABLE IF NOT EXISTS budget_years (
        id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        year INT NOT NULL,
        budget BIGINT NOT NULL DEFAULT 0,
        is_current BOOLEAN NOT NULL DEFAULT FALSE,
        status VARCHAR(20) NOT NULL DEFAULT 'active',
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
        UNIQUE KEY uk_budget_years_year (year)
    ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"#,
    r#"CREATE TABLE IF NOT EXISTS fund_categories (
        id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        year_id BIGINT NOT NULL,
        name VARCHAR(255) NOT NULL,
        description TEXT NULL,
        status VARCHAR(20) NOT NULL DEFAULT 'active',
        sort_order INT NOT NULL DEFAULT 0,
        CONSTRAINT fk_fund_categories_year FOREIGN KEY (year_id) REFERENCES budget_years (id)
    ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"#,
    r#"CREATE TABLE IF NOT EXISTS fund_subcategories (
        id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        category_id BIGINT NOT NULL,
        name VARCHAR(255) NOT NULL,
        fund_condition TEXT NULL,
        target_roles JSON NOT NULL,
        status VARCHAR(20) NOT NULL DEFAULT 'active',
        sort_order INT NOT NULL DEFAULT 0,
        CONSTRAINT fk_fund_subcategories_category FOREIGN KEY (category_id) REFERENCES fund_categories (id)
    ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"#,
    r#"CREATE TABLE IF NOT EXISTS subcategory_budgets (
        id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        subcategory_id BIGINT NOT NULL,
        level VARCHAR(100) NULL,
        scope VARCHAR(20) NOT NULL,
        amount BIGINT NOT NULL,
        max_grants INT NULL,
        description TEXT NULL,
        CONSTRAINT fk_subcategory_budgets_subcategory FOREIGN KEY (subcategory_id)
            REFERENCES fund_subcategories (id) ON DELETE CASCADE
    ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"#,
    r#"CREATE TABLE IF NOT EXISTS fund_requests (
        id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        user_id BIGINT NOT NULL,
        year_id BIGINT NOT NULL,
        subcategory_id BIGINT NOT NULL,
        budget_level VARCHAR(100) NULL,
        title VARCHAR(255) NOT NULL,
        details TEXT NULL,
        requested_amount BIGINT NOT NULL,
        approved_amount BIGINT NULL,
        status VARCHAR(30) NOT NULL DEFAULT 'draft',
        submitted_at TIMESTAMP NULL DEFAULT NULL,
        decided_at TIMESTAMP NULL DEFAULT NULL,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
        KEY idx_fund_requests_user (user_id),
        KEY idx_fund_requests_year_status (year_id, status),
        CONSTRAINT fk_fund_requests_user FOREIGN KEY (user_id) REFERENCES users (id),
        CONSTRAINT fk_fund_requests_year FOREIGN KEY (year_id) REFERENCES budget_years (id),
        CONSTRAINT fk_fund_requests_subcategory FOREIGN KEY (subcategory_id)
            REFERENCES fund_subcategories (id)
    ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"#,
    r#"CREATE TABLE IF NOT EXISTS request_reviews (
        id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        request_id BIGINT NOT NULL,
        reviewer_id BIGINT NOT NULL,
        stage VARCHAR(20) NOT NULL,
        decision VARCHAR(20) NOT NULL,
        comment TEXT NULL,
        approved_amount BIGINT NULL,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        KEY idx_request_reviews_request (request_id),
        CONSTRAINT fk_request_reviews_request FOREIGN KEY (request_id)
            REFERENCES fund_requests (id) ON DELETE CASCADE,
        CONSTRAINT fk_request_reviews_reviewer FOREIGN KEY (reviewer_id) REFERENCES users (id)
    ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"#,
    r#"CREATE TABLE IF NOT EXISTS announcements (
        id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        title VARCHAR(255) NOT NULL,
        content TEXT NOT NULL,
        kind VARCHAR(20) NOT NULL DEFAULT 'general',
        status VARCHAR(20) NOT NULL DEFAULT 'draft',
        published_at TIMESTAMP NULL DEFAULT NULL,
        expires_at TIMESTAMP NULL DEFAULT NULL,
        attachment_url VARCHAR(1024) NULL,
        created_by BIGINT NOT NULL,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
        KEY idx_announcements_status (status, published_at),
        CONSTRAINT fk_announcements_author FOREIGN KEY (created_by) REFERENCES users (id)
    ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"#,
    r#"CREATE TABLE IF NOT EXISTS publications (
        id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        user_id BIGINT NOT NULL,
        title TEXT NOT NULL,
        authors TEXT NOT NULL,
        venue VARCHAR(512) NULL,
        pub_year INT NULL,
        doi VARCHAR(255) NULL,
        url VARCHAR(1024) NULL,
        citation_count INT NOT NULL DEFAULT 0,
        source VARCHAR(20) NOT NULL,
        external_id VARCHAR(255) NOT NULL,
        content_hash CHAR(64) NOT NULL,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
        UNIQUE KEY uk_publications_user_source_external (user_id, source, external_id),
        KEY idx_publications_user_year (user_id, pub_year),
        CONSTRAINT fk_publications_user FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
    ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"#,
    r#"CREATE TABLE IF NOT EXISTS import_runs (
        id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        user_id BIGINT NOT NULL,
        source VARCHAR(20) NOT NULL,
        started_at TIMESTAMP NOT NULL,
        finished_at TIMESTAMP NOT NULL,
        created INT NOT NULL DEFAULT 0,
        updated INT NOT NULL DEFAULT 0,
        unchanged INT NOT NULL DEFAULT 0,
        failed INT NOT NULL DEFAULT 0,
        error TEXT NULL,
        KEY idx_import_runs_started (started_at),
        CONSTRAINT fk_import_runs_user FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
    ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"#,
];

/// Applies every schema statement.
pub async fn run(pool: &MySqlPool) -> Result<(), AppError> {
    for (index, statement) in MIGRATIONS.iter().enumerate() {
        sqlx::query(statement).execute(pool).await?;
        tracing::debug!(step = index + 1, total = MIGRATIONS.len(), "Applied migration");
    }
    tracing::info!(statements = MIGRATIONS.len(), "Database schema is up to date");
    Ok(())
}
