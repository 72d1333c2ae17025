//! SQLite persistence for the directory
//!
//! Every operation opens its own connection to the database file; SQLite
//! serializes writers. Ids use AUTOINCREMENT so a deleted data source id is
//! never handed out again.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quarry_connector::{DirectoryStore, Role, StoreError};
use quarry_core::{
    ConnectionSecret, DataSourceDescriptor, DataSourceKind, DataSourceSummary, validate_fields,
};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{InviteOutcome, Member, Organization, OrganizationMembership, User, normalize_email};

type StoreResult<T> = std::result::Result<T, StoreError>;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS organizations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    admin_email TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS memberships (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    organization_id INTEGER NOT NULL,
    role TEXT NOT NULL CHECK (role IN ('admin', 'viewer')),
    created_at TEXT NOT NULL,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (organization_id) REFERENCES organizations(id) ON DELETE CASCADE,
    UNIQUE(user_id, organization_id)
);

CREATE TABLE IF NOT EXISTS data_sources (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    organization_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    kind TEXT NOT NULL,
    connection_secret TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (organization_id) REFERENCES organizations(id) ON DELETE CASCADE,
    UNIQUE(organization_id, name)
);

CREATE INDEX IF NOT EXISTS idx_data_sources_organization
    ON data_sources(organization_id);
";

/// Directory stored in a single SQLite file
#[derive(Debug, Clone)]
pub struct SqliteDirectory {
    db_path: PathBuf,
}

impl SqliteDirectory {
    /// Open (creating if needed) the directory at `db_path`
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        let store = Self { db_path };
        store.initialize_schema()?;
        tracing::info!(path = ?store.db_path, "directory store ready");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)
            .with_context(|| format!("Failed to open directory database at {:?}", self.db_path))?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(conn)
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(SCHEMA)
            .context("Failed to initialize directory schema")?;
        Ok(())
    }

    /// Run `op` on a fresh connection. `StoreError`s raised inside come back
    /// as they are, a UNIQUE violation is a conflict, and anything else is a
    /// storage failure.
    ///
    /// Writers take the lock up front (`BEGIN IMMEDIATE`) so the duplicate
    /// checks and the insert see the same snapshot.
    fn run<T>(&self, op: impl FnOnce(&mut Connection) -> Result<T>) -> StoreResult<T> {
        self.connect()
            .and_then(|mut conn| op(&mut conn))
            .map_err(|err| match err.downcast::<StoreError>() {
                Ok(store_error) => store_error,
                Err(other) if is_unique_violation(&other) => {
                    tracing::warn!(error = %format!("{:#}", other), "directory write lost a uniqueness race");
                    StoreError::Conflict("A conflicting record already exists".into())
                }
                Err(other) => {
                    tracing::error!(error = %format!("{:#}", other), "directory store failure");
                    StoreError::Storage(format!("{:#}", other))
                }
            })
    }

    /// Run a blocking directory call on Tokio's blocking pool
    pub async fn call<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&SqliteDirectory) -> StoreResult<T> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| StoreError::Storage(format!("directory task failed: {}", e)))?
    }

    /// Create an organization together with its first admin.
    ///
    /// The admin must not already be registered.
    pub fn create_organization(
        &self,
        name: &str,
        admin_email: &str,
    ) -> StoreResult<(Organization, User)> {
        let name = name.trim();
        let email = normalize_email(admin_email);
        if name.is_empty() || email.is_empty() {
            return Err(StoreError::Invalid("All fields are required".into()));
        }

        self.run(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            if exists(&tx, "SELECT 1 FROM organizations WHERE name = ?1", &name)? {
                return Err(StoreError::Conflict("Organization name already exists".into()).into());
            }
            if exists(&tx, "SELECT 1 FROM users WHERE email = ?1", &email)? {
                return Err(StoreError::Conflict("Email already registered".into()).into());
            }

            let now = Utc::now();
            tx.execute(
                "INSERT INTO organizations (name, admin_email, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)",
                params![name, email, now.to_rfc3339()],
            )?;
            let organization = Organization {
                id: tx.last_insert_rowid(),
                name: name.to_string(),
                admin_email: email.clone(),
                created_at: now,
            };

            let user = insert_user(&tx, &email, now)?;
            insert_membership(&tx, user.id, organization.id, Role::Admin, now)?;
            tx.commit()?;

            tracing::info!(organization_id = organization.id, "organization created");
            Ok((organization, user))
        })
    }

    /// Add `email` to an organization, creating the user if needed.
    ///
    /// Inviting an existing member changes nothing.
    pub fn invite_member(
        &self,
        organization_id: i64,
        email: &str,
        role: Role,
    ) -> StoreResult<InviteOutcome> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(StoreError::Invalid("Email is required".into()));
        }

        self.run(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            ensure_organization(&tx, organization_id)?;

            let now = Utc::now();
            let user = match find_user(&tx, &email)? {
                Some(user) => user,
                None => insert_user(&tx, &email, now)?,
            };

            let existing: Option<String> = tx
                .query_row(
                    "SELECT role FROM memberships WHERE user_id = ?1 AND organization_id = ?2",
                    params![user.id, organization_id],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(existing) = existing {
                tx.commit()?;
                return Ok(InviteOutcome::AlreadyMember(Member {
                    email,
                    role: parse_role(&existing)?,
                }));
            }

            insert_membership(&tx, user.id, organization_id, role, now)?;
            tx.commit()?;
            tracing::info!(organization_id, role = %role, "member invited");
            Ok(InviteOutcome::Added(Member { email, role }))
        })
    }

    /// Register a data source for an organization
    pub fn add_data_source(
        &self,
        organization_id: i64,
        name: &str,
        kind: DataSourceKind,
        secret: ConnectionSecret,
    ) -> StoreResult<DataSourceDescriptor> {
        let name = name.trim().to_string();
        validate_fields(&name, kind, &secret)
            .map_err(|e| StoreError::Invalid(e.to_string()))?;

        self.run(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            ensure_organization(&tx, organization_id)?;
            let duplicate = tx
                .query_row(
                    "SELECT 1 FROM data_sources WHERE organization_id = ?1 AND name = ?2",
                    params![organization_id, name],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if duplicate {
                return Err(StoreError::Conflict(format!(
                    "A data source named '{}' already exists",
                    name
                ))
                .into());
            }

            let mut descriptor = DataSourceDescriptor::new(0, organization_id, name, kind, secret);
            tx.execute(
                "INSERT INTO data_sources (organization_id, name, kind, connection_secret, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    organization_id,
                    descriptor.name,
                    kind.as_str(),
                    descriptor.secret.expose(),
                    descriptor.created_at.to_rfc3339(),
                    descriptor.updated_at.to_rfc3339(),
                ],
            )?;
            descriptor.id = tx.last_insert_rowid();
            tx.commit()?;

            tracing::info!(
                datasource_id = descriptor.id,
                organization_id,
                kind = %kind,
                "data source added"
            );
            Ok(descriptor)
        })
    }

    /// Replace a data source's connection string. False if the id is unknown.
    pub fn rotate_secret(&self, id: i64, secret: ConnectionSecret) -> StoreResult<bool> {
        self.run(|conn| {
            let updated = conn.execute(
                "UPDATE data_sources SET connection_secret = ?1, updated_at = ?2 WHERE id = ?3",
                params![secret.expose(), Utc::now().to_rfc3339(), id],
            )?;
            Ok(updated > 0)
        })
    }

    /// False if the id is unknown
    pub fn delete_data_source(&self, id: i64) -> StoreResult<bool> {
        self.run(|conn| {
            let deleted = conn.execute("DELETE FROM data_sources WHERE id = ?1", params![id])?;
            Ok(deleted > 0)
        })
    }

    pub fn find_descriptor(&self, id: i64) -> StoreResult<Option<DataSourceDescriptor>> {
        self.run(|conn| {
            conn.query_row(
                "SELECT id, organization_id, name, kind, connection_secret, created_at, updated_at
                 FROM data_sources WHERE id = ?1",
                params![id],
                row_to_descriptor,
            )
            .optional()
            .context("Failed to load data source")
        })
    }

    pub fn find_membership(&self, email: &str, organization_id: i64) -> StoreResult<Option<Role>> {
        let email = normalize_email(email);
        self.run(|conn| {
            let role: Option<String> = conn
                .query_row(
                    "SELECT m.role FROM memberships m
                     JOIN users u ON u.id = m.user_id
                     WHERE u.email = ?1 AND m.organization_id = ?2",
                    params![email, organization_id],
                    |row| row.get(0),
                )
                .optional()?;
            role.as_deref().map(parse_role).transpose()
        })
    }

    /// Organizations `email` belongs to, by name
    pub fn list_memberships(&self, email: &str) -> StoreResult<Vec<OrganizationMembership>> {
        let email = normalize_email(email);
        self.run(|conn| {
            let mut stmt = conn.prepare(
                "SELECT o.id, o.name, o.admin_email, o.created_at, m.role
                 FROM memberships m
                 JOIN users u ON u.id = m.user_id
                 JOIN organizations o ON o.id = m.organization_id
                 WHERE u.email = ?1
                 ORDER BY o.name",
            )?;
            let rows = stmt.query_map(params![email], |row| {
                Ok((row_to_organization(row)?, row.get::<_, String>(4)?))
            })?;

            let mut memberships = Vec::new();
            for row in rows {
                let (organization, role) = row?;
                memberships.push(OrganizationMembership {
                    organization,
                    role: parse_role(&role)?,
                });
            }
            Ok(memberships)
        })
    }

    /// Members of an organization, by e-mail
    pub fn list_members(&self, organization_id: i64) -> StoreResult<Vec<Member>> {
        self.run(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.email, m.role
                 FROM memberships m
                 JOIN users u ON u.id = m.user_id
                 WHERE m.organization_id = ?1
                 ORDER BY u.email",
            )?;
            let rows = stmt.query_map(params![organization_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;

            let mut members = Vec::new();
            for row in rows {
                let (email, role) = row?;
                members.push(Member {
                    email,
                    role: parse_role(&role)?,
                });
            }
            Ok(members)
        })
    }

    /// Data sources of an organization, by name. Secrets are not read.
    pub fn list_data_sources(&self, organization_id: i64) -> StoreResult<Vec<DataSourceSummary>> {
        self.run(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, kind FROM data_sources
                 WHERE organization_id = ?1
                 ORDER BY name",
            )?;
            let rows = stmt.query_map(params![organization_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?;

            let mut summaries = Vec::new();
            for row in rows {
                let (id, name, kind) = row?;
                summaries.push(DataSourceSummary {
                    id,
                    name,
                    kind: kind.parse()?,
                });
            }
            Ok(summaries)
        })
    }

    pub fn find_organization(&self, id: i64) -> StoreResult<Option<Organization>> {
        self.run(|conn| {
            conn.query_row(
                "SELECT id, name, admin_email, created_at FROM organizations WHERE id = ?1",
                params![id],
                row_to_organization,
            )
            .optional()
            .context("Failed to load organization")
        })
    }
}

#[async_trait]
impl DirectoryStore for SqliteDirectory {
    async fn find_descriptor(&self, id: i64) -> StoreResult<Option<DataSourceDescriptor>> {
        self.call(move |store| store.find_descriptor(id)).await
    }

    async fn find_membership(&self, caller: &str, organization_id: i64) -> StoreResult<Option<Role>> {
        let caller = caller.to_string();
        self.call(move |store| store.find_membership(&caller, organization_id))
            .await
    }

    async fn delete_data_source(&self, id: i64) -> StoreResult<bool> {
        self.call(move |store| store.delete_data_source(id)).await
    }

    async fn rotate_secret(&self, id: i64, secret: ConnectionSecret) -> StoreResult<bool> {
        self.call(move |store| store.rotate_secret(id, secret)).await
    }
}

fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(failure, _))
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

fn exists(conn: &Connection, sql: &str, key: &str) -> Result<bool> {
    Ok(conn
        .query_row(sql, params![key], |_| Ok(()))
        .optional()?
        .is_some())
}

fn ensure_organization(conn: &Connection, organization_id: i64) -> Result<()> {
    let found = conn
        .query_row(
            "SELECT 1 FROM organizations WHERE id = ?1",
            params![organization_id],
            |_| Ok(()),
        )
        .optional()?;
    match found {
        Some(()) => Ok(()),
        None => Err(StoreError::NotFound("organization".into()).into()),
    }
}

fn find_user(conn: &Connection, email: &str) -> Result<Option<User>> {
    conn.query_row(
        "SELECT id, email, created_at FROM users WHERE email = ?1",
        params![email],
        |row| {
            Ok(User {
                id: row.get(0)?,
                email: row.get(1)?,
                created_at: timestamp(row, 2)?,
            })
        },
    )
    .optional()
    .context("Failed to load user")
}

fn insert_user(conn: &Connection, email: &str, now: DateTime<Utc>) -> Result<User> {
    conn.execute(
        "INSERT INTO users (email, created_at) VALUES (?1, ?2)",
        params![email, now.to_rfc3339()],
    )?;
    Ok(User {
        id: conn.last_insert_rowid(),
        email: email.to_string(),
        created_at: now,
    })
}

fn insert_membership(
    conn: &Connection,
    user_id: i64,
    organization_id: i64,
    role: Role,
    now: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO memberships (user_id, organization_id, role, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![user_id, organization_id, role.as_str(), now.to_rfc3339()],
    )?;
    Ok(())
}

fn parse_role(role: &str) -> Result<Role> {
    role.parse::<Role>()
        .map_err(|_| anyhow::anyhow!("invalid role '{}' in memberships table", role))
}

fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn row_to_organization(row: &Row<'_>) -> rusqlite::Result<Organization> {
    Ok(Organization {
        id: row.get(0)?,
        name: row.get(1)?,
        admin_email: row.get(2)?,
        created_at: timestamp(row, 3)?,
    })
}

fn row_to_descriptor(row: &Row<'_>) -> rusqlite::Result<DataSourceDescriptor> {
    let kind: String = row.get(3)?;
    let kind = kind.parse::<DataSourceKind>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let secret: String = row.get(4)?;

    Ok(DataSourceDescriptor {
        id: row.get(0)?,
        organization_id: row.get(1)?,
        name: row.get(2)?,
        kind,
        secret: ConnectionSecret::new(secret),
        created_at: timestamp(row, 5)?,
        updated_at: timestamp(row, 6)?,
    })
}
