//! Database schema and migrations for Lumina.
//!
//! This module contains all database migrations that will be applied
//! sequentially when the database is first opened or upgraded.
//!
//! Timestamps are written by the application in the fixed-width format from
//! [`crate::datetime`]; columns never rely on SQLite defaults for them.

/// Database migrations.
///
/// Each migration is a SQL script that will be executed in order.
/// The schema_version table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: Media catalog - folders and files
    r#"
CREATE TABLE folders (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    path        TEXT NOT NULL UNIQUE,     -- absolute path on disk
    parent_id   INTEGER REFERENCES folders(id) ON DELETE CASCADE,
    created_at  TEXT NOT NULL
);

CREATE INDEX idx_folders_parent_id ON folders(parent_id);

CREATE TABLE files (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    folder_id   INTEGER NOT NULL REFERENCES folders(id) ON DELETE CASCADE,
    name        TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    UNIQUE(folder_id, name)
);

CREATE INDEX idx_files_folder_id ON files(folder_id);

-- Additional locations of a file besides its owning folder
CREATE TABLE file_folders (
    file_id     INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    folder_id   INTEGER NOT NULL REFERENCES folders(id) ON DELETE CASCADE,
    PRIMARY KEY (file_id, folder_id)
);

CREATE INDEX idx_file_folders_folder_id ON file_folders(folder_id);
"#,
    // v2: Permission groups
    r#"
CREATE TABLE permission_groups (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE,
    description TEXT,
    created_by  INTEGER NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE group_folders (
    group_id    INTEGER NOT NULL REFERENCES permission_groups(id) ON DELETE CASCADE,
    folder_id   INTEGER NOT NULL REFERENCES folders(id) ON DELETE CASCADE,
    PRIMARY KEY (group_id, folder_id)
);

CREATE INDEX idx_group_folders_folder_id ON group_folders(folder_id);

CREATE TABLE group_user_permissions (
    group_id    INTEGER NOT NULL REFERENCES permission_groups(id) ON DELETE CASCADE,
    user_id     INTEGER NOT NULL,
    permission  TEXT NOT NULL CHECK (permission IN ('read', 'write')),
    PRIMARY KEY (group_id, user_id)
);

CREATE INDEX idx_group_user_permissions_user_id ON group_user_permissions(user_id);
"#,
    // v3: Share links
    r#"
CREATE TABLE shares (
    id              TEXT PRIMARY KEY,
    share_type      TEXT NOT NULL CHECK (share_type IN ('file', 'album')),
    resource_id     INTEGER NOT NULL,
    owner_id        INTEGER NOT NULL,
    access_type     TEXT NOT NULL DEFAULT 'public' CHECK (access_type IN ('public', 'private')),
    password_hash   TEXT,                       -- Argon2 hash
    requires_auth   INTEGER NOT NULL DEFAULT 0,
    expires_at      TEXT,
    max_views       INTEGER CHECK (max_views IS NULL OR max_views > 0),
    view_count      INTEGER NOT NULL DEFAULT 0,
    enabled         INTEGER NOT NULL DEFAULT 1,
    created_at      TEXT NOT NULL
);

CREATE INDEX idx_shares_owner_id ON shares(owner_id);
CREATE INDEX idx_shares_resource ON shares(share_type, resource_id);
CREATE INDEX idx_shares_expires_at ON shares(expires_at);

CREATE TABLE share_permissions (
    share_id    TEXT NOT NULL REFERENCES shares(id) ON DELETE CASCADE,
    user_id     INTEGER NOT NULL,
    PRIMARY KEY (share_id, user_id)
);

CREATE TABLE share_access_logs (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    share_id    TEXT NOT NULL REFERENCES shares(id) ON DELETE CASCADE,
    accessed_by INTEGER,                        -- NULL for anonymous viewers
    ip_address  TEXT NOT NULL,
    user_agent  TEXT NOT NULL,
    accessed_at TEXT NOT NULL
);

CREATE INDEX idx_share_access_logs_share_id ON share_access_logs(share_id);
"#,
];
