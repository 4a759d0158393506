//! DDL statements and migrations for the SQLite schema.
//!
//! Timestamps are stored as TEXT in ISO 8601 format, dates as `YYYY-MM-DD`.
//! Booleans are INTEGER (0/1), durations are INTEGER seconds, string lists
//! are JSON TEXT.

/// Current schema version. Bumped whenever DDL or migrations change.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Core DDL statements executed during `init_schema`.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    // -- Tickets ---------------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS tickets (
        id                        TEXT PRIMARY KEY,
        tenant_id                 TEXT NOT NULL,
        title                     TEXT NOT NULL,
        description               TEXT NOT NULL DEFAULT '',
        status                    TEXT NOT NULL DEFAULT 'open',
        priority                  TEXT NOT NULL DEFAULT 'medium',
        category                  TEXT NOT NULL DEFAULT 'general',
        tags                      TEXT NOT NULL DEFAULT '[]',
        created_by                TEXT NOT NULL,
        assigned_to               TEXT,
        reporter_name             TEXT NOT NULL DEFAULT '',
        reporter_email            TEXT NOT NULL DEFAULT '',
        reporter_phone            TEXT NOT NULL DEFAULT '',
        created_at                TEXT NOT NULL,
        updated_at                TEXT NOT NULL,
        first_response_time       TEXT,
        first_response_due_at     TEXT,
        estimated_resolution_time TEXT,
        resolved_at               TEXT,
        actual_resolution_time    TEXT,
        escalation_level          INTEGER NOT NULL DEFAULT 0 CHECK (escalation_level >= 0),
        is_escalated              INTEGER NOT NULL DEFAULT 0,
        escalation_reason         TEXT NOT NULL DEFAULT '',
        satisfaction_rating       INTEGER CHECK (satisfaction_rating IS NULL OR satisfaction_rating BETWEEN 1 AND 5),
        satisfaction_feedback     TEXT NOT NULL DEFAULT '',
        resolution_notes          TEXT NOT NULL DEFAULT '',
        internal_notes            TEXT NOT NULL DEFAULT '',
        cancel_reason             TEXT NOT NULL DEFAULT '',
        version                   INTEGER NOT NULL DEFAULT 0
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_tickets_tenant_status ON tickets(tenant_id, status)",
    "CREATE INDEX IF NOT EXISTS idx_tickets_assigned_to ON tickets(assigned_to)",
    "CREATE INDEX IF NOT EXISTS idx_tickets_created_at ON tickets(created_at)",
    // -- Messages ----------------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS messages (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        ticket_id    TEXT NOT NULL REFERENCES tickets(id),
        sender       TEXT NOT NULL,
        body         TEXT NOT NULL,
        is_internal  INTEGER NOT NULL DEFAULT 0,
        message_type TEXT NOT NULL DEFAULT 'user',
        created_at   TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_messages_ticket ON messages(ticket_id)",
    // -- Events (audit trail) ----------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS events (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        ticket_id  TEXT NOT NULL REFERENCES tickets(id),
        tenant_id  TEXT NOT NULL,
        event_type TEXT NOT NULL,
        actor      TEXT NOT NULL DEFAULT '',
        old_value  TEXT,
        new_value  TEXT,
        comment    TEXT,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_events_ticket ON events(ticket_id)",
    // -- Escalations ---------------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS escalations (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        ticket_id  TEXT NOT NULL REFERENCES tickets(id),
        from_level INTEGER NOT NULL,
        to_level   INTEGER NOT NULL CHECK (to_level > from_level),
        reason     TEXT NOT NULL DEFAULT '',
        kind       TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_escalations_ticket ON escalations(ticket_id, kind)",
    // -- Staff ---------------------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS staff (
        id                     TEXT PRIMARY KEY,
        tenant_id              TEXT NOT NULL,
        name                   TEXT NOT NULL DEFAULT '',
        email                  TEXT NOT NULL DEFAULT '',
        specialization         TEXT NOT NULL DEFAULT 'general',
        level                  TEXT NOT NULL DEFAULT 'junior',
        max_concurrent_tickets INTEGER NOT NULL DEFAULT 5,
        current_ticket_count   INTEGER NOT NULL DEFAULT 0,
        is_available           INTEGER NOT NULL DEFAULT 1,
        work_start             TEXT NOT NULL DEFAULT '09:00',
        work_end               TEXT NOT NULL DEFAULT '17:00',
        timezone               TEXT NOT NULL DEFAULT 'UTC',
        skills                 TEXT NOT NULL DEFAULT '[]',
        languages              TEXT NOT NULL DEFAULT '[]',
        total_resolved         INTEGER NOT NULL DEFAULT 0,
        avg_resolution_time    REAL,
        satisfaction_avg       REAL,
        CHECK (current_ticket_count >= 0 AND current_ticket_count <= max_concurrent_tickets)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_staff_tenant ON staff(tenant_id)",
    // -- SLA policies ----------------------------------------------------------------
    // category '' is the wildcard row so that UNIQUE covers it.
    r#"
    CREATE TABLE IF NOT EXISTS sla_policies (
        id                    INTEGER PRIMARY KEY AUTOINCREMENT,
        tenant_id             TEXT NOT NULL,
        name                  TEXT NOT NULL DEFAULT '',
        priority              TEXT NOT NULL,
        category              TEXT NOT NULL DEFAULT '',
        first_response_secs   INTEGER NOT NULL,
        resolution_secs       INTEGER NOT NULL,
        escalation_secs       INTEGER NOT NULL,
        escalation_level      INTEGER NOT NULL DEFAULT 1,
        is_active             INTEGER NOT NULL DEFAULT 1,
        UNIQUE (tenant_id, priority, category)
    )
    "#,
    // -- Analytics snapshots -----------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS analytics_snapshots (
        tenant_id           TEXT NOT NULL,
        date                TEXT NOT NULL,
        total_tickets       INTEGER NOT NULL DEFAULT 0,
        open_tickets        INTEGER NOT NULL DEFAULT 0,
        resolved_tickets    INTEGER NOT NULL DEFAULT 0,
        closed_tickets      INTEGER NOT NULL DEFAULT 0,
        cancelled_tickets   INTEGER NOT NULL DEFAULT 0,
        escalated_tickets   INTEGER NOT NULL DEFAULT 0,
        avg_response_time   REAL,
        avg_resolution_time REAL,
        satisfaction_avg    REAL,
        escalation_rate     REAL NOT NULL DEFAULT 0,
        active_staff_count  INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (tenant_id, date)
    )
    "#,
    // -- Config / metadata ---------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS config (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS metadata (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
    "#,
];

/// Named migrations applied after the base schema, tracked in `metadata`.
pub const MIGRATIONS: &[(&str, &str)] = &[
    // Future migrations go here, e.g.:
    // ("001_add_foo_column", "ALTER TABLE tickets ADD COLUMN foo TEXT DEFAULT ''"),
];
