//! Schema PostgreSQL del núcleo
//!
//! Los enums se guardan como TEXT con los nombres visibles
//! ("Scheduled", "In Progress", "Collected"...).

pub const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS bins (
        id TEXT PRIMARY KEY,
        latitude DOUBLE PRECISION,
        longitude DOUBLE PRECISION,
        status TEXT NOT NULL DEFAULT 'active',
        capacity INTEGER NOT NULL DEFAULT 0,
        region TEXT,
        address TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS route_plans (
        id UUID PRIMARY KEY,
        planned_date DATE NOT NULL,
        status TEXT NOT NULL DEFAULT 'Scheduled',
        created_by TEXT NOT NULL,
        route_key TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        UNIQUE (planned_date, route_key)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS route_stops (
        id UUID PRIMARY KEY,
        plan_id UUID NOT NULL REFERENCES route_plans(id),
        bin_id TEXT NOT NULL REFERENCES bins(id),
        sequence INTEGER NOT NULL,
        planned_time TIMESTAMPTZ,
        issue_log TEXT,
        UNIQUE (plan_id, sequence)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS route_assignments (
        plan_id UUID PRIMARY KEY REFERENCES route_plans(id),
        assigned_to TEXT NOT NULL,
        assigned_by TEXT NOT NULL,
        assigned_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_route_assignments_officer ON route_assignments (assigned_to)",
    r#"
    CREATE TABLE IF NOT EXISTS collection_events (
        id UUID PRIMARY KEY,
        stop_id UUID NOT NULL REFERENCES route_stops(id),
        fill_level INTEGER NOT NULL CHECK (fill_level BETWEEN 0 AND 100),
        status TEXT NOT NULL,
        recorded_at TIMESTAMPTZ NOT NULL,
        issue_log TEXT,
        confirmation_token TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_collection_events_stop ON collection_events (stop_id, recorded_at)",
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS uq_collection_events_token
        ON collection_events (stop_id, confirmation_token)
        WHERE confirmation_token IS NOT NULL
    "#,
];
