/// Domain models and repository methods
///
/// Each model owns the SQL touching its table. Repository methods take an
/// explicit `&mut PgConnection` so a request handler can run every operation
/// of one request inside a single transaction; nothing here begins or
/// commits transactions on its own.
///
/// # Schema
///
/// Managed by external migration tooling; the code expects:
///
/// ```sql
/// CREATE TYPE account_role AS ENUM ('ADMINISTRATOR', 'GENERAL', 'PROVISIONAL');
/// CREATE TYPE task_status AS ENUM ('TODO', 'DOING', 'DONE');
///
/// CREATE TABLE profiles (
///     account_id     CHAR(5) PRIMARY KEY,
///     username       VARCHAR(20) NOT NULL UNIQUE,
///     nickname       VARCHAR(20) UNIQUE,
///     email          VARCHAR(255) NOT NULL UNIQUE,
///     role           account_role NOT NULL DEFAULT 'GENERAL',
///     is_active      BOOLEAN NOT NULL DEFAULT FALSE,
///     email_verified BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at     TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at     TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE authes (
///     account_id CHAR(5) PRIMARY KEY REFERENCES profiles(account_id) ON DELETE CASCADE,
///     password   TEXT NOT NULL
/// );
///
/// CREATE TABLE tasks (
///     id             BIGSERIAL PRIMARY KEY,
///     title          VARCHAR(30) NOT NULL,
///     description    TEXT,
///     registrant_id  CHAR(5) REFERENCES profiles(account_id) ON DELETE SET NULL,
///     asaignee_id    CHAR(5) REFERENCES profiles(account_id) ON DELETE SET NULL,
///     status         task_status NOT NULL DEFAULT 'TODO',
///     is_significant BOOLEAN NOT NULL DEFAULT FALSE,
///     deadline       DATE,
///     created_at     TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at     TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE watch_tasks (
///     account_id CHAR(5) NOT NULL REFERENCES profiles(account_id) ON DELETE CASCADE,
///     task_id    BIGINT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     note       TEXT,
///     PRIMARY KEY (account_id, task_id)
/// );
/// ```
///
/// The `asaignee_id` spelling is the service's long-standing wire contract
/// and is kept in the schema to match.

pub mod account;
pub mod credential;
pub mod task;
pub mod watch;
