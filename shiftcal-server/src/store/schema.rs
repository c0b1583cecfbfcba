//! Database schema.

use rusqlite::Connection;

pub fn apply(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS users (
    id              TEXT PRIMARY KEY,
    username        TEXT NOT NULL UNIQUE,
    password_hash   TEXT NOT NULL,
    salt            TEXT NOT NULL,
    role            TEXT NOT NULL DEFAULT 'user',
    banned          INTEGER NOT NULL DEFAULT 0,
    ban_reason      TEXT,
    ban_expires_at  TEXT,
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    id          TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    expires_at  TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS calendars (
    id                TEXT PRIMARY KEY,
    name              TEXT NOT NULL,
    color             TEXT NOT NULL DEFAULT '#3b82f6',
    -- NULL owner marks an orphaned calendar (owning account deleted)
    owner_id          TEXT REFERENCES users(id) ON DELETE SET NULL,
    guest_permission  TEXT NOT NULL DEFAULT 'none',
    created_at        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS calendar_shares (
    calendar_id  TEXT NOT NULL REFERENCES calendars(id) ON DELETE CASCADE,
    user_id      TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    permission   TEXT NOT NULL,
    shared_by    TEXT NOT NULL,
    shared_at    TEXT NOT NULL,
    PRIMARY KEY (calendar_id, user_id)
);

CREATE TABLE IF NOT EXISTS access_tokens (
    id            TEXT PRIMARY KEY,
    token         TEXT NOT NULL UNIQUE,
    calendar_id   TEXT NOT NULL REFERENCES calendars(id) ON DELETE CASCADE,
    permission    TEXT NOT NULL,
    active        INTEGER NOT NULL DEFAULT 1,
    expires_at    TEXT,
    use_count     INTEGER NOT NULL DEFAULT 0,
    last_used_at  TEXT,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS subscriptions (
    user_id      TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    calendar_id  TEXT NOT NULL REFERENCES calendars(id) ON DELETE CASCADE,
    status       TEXT NOT NULL,
    source       TEXT NOT NULL,
    updated_at   TEXT NOT NULL,
    PRIMARY KEY (user_id, calendar_id)
);

CREATE TABLE IF NOT EXISTS shifts (
    id           TEXT PRIMARY KEY,
    calendar_id  TEXT NOT NULL REFERENCES calendars(id) ON DELETE CASCADE,
    date         TEXT NOT NULL,
    start_time   TEXT,
    end_time     TEXT,
    title        TEXT NOT NULL,
    preset_id    TEXT,
    note         TEXT,
    created_by   TEXT,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_shifts_calendar_date ON shifts(calendar_id, date);

CREATE TABLE IF NOT EXISTS shift_presets (
    id           TEXT PRIMARY KEY,
    calendar_id  TEXT NOT NULL REFERENCES calendars(id) ON DELETE CASCADE,
    name         TEXT NOT NULL,
    color        TEXT NOT NULL,
    start_time   TEXT,
    end_time     TEXT,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS notes (
    id           TEXT PRIMARY KEY,
    calendar_id  TEXT NOT NULL REFERENCES calendars(id) ON DELETE CASCADE,
    date         TEXT NOT NULL,
    text         TEXT NOT NULL,
    updated_at   TEXT NOT NULL,
    UNIQUE (calendar_id, date)
);

CREATE TABLE IF NOT EXISTS audit_log (
    id          TEXT PRIMARY KEY,
    actor_id    TEXT,
    action      TEXT NOT NULL,
    target      TEXT,
    detail      TEXT,
    created_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_audit_created ON audit_log(created_at);

CREATE TABLE IF NOT EXISTS sync_links (
    calendar_id   TEXT PRIMARY KEY REFERENCES calendars(id) ON DELETE CASCADE,
    apple_id      TEXT NOT NULL,
    app_password  TEXT NOT NULL,
    remote_url    TEXT NOT NULL,
    remote_name   TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sync_log (
    id           TEXT PRIMARY KEY,
    calendar_id  TEXT NOT NULL REFERENCES calendars(id) ON DELETE CASCADE,
    status       TEXT NOT NULL,
    message      TEXT,
    imported     INTEGER NOT NULL DEFAULT 0,
    created_at   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_sync_log_calendar ON sync_log(calendar_id, created_at);

CREATE TABLE IF NOT EXISTS external_events (
    calendar_id  TEXT NOT NULL REFERENCES calendars(id) ON DELETE CASCADE,
    uid          TEXT NOT NULL,
    summary      TEXT NOT NULL,
    starts_at    TEXT NOT NULL,
    ends_at      TEXT NOT NULL,
    all_day      INTEGER NOT NULL DEFAULT 0,
    location     TEXT,
    description  TEXT,
    fetched_at   TEXT NOT NULL,
    PRIMARY KEY (calendar_id, uid)
);
CREATE INDEX IF NOT EXISTS idx_external_events_range ON external_events(calendar_id, starts_at);
"#,
    )
}
