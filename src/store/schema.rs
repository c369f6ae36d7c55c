pub const SCHEMA: &str = r#"
-- Accounts; email is stored lowercased
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'ACTIVE',
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    last_login_at TEXT,
    last_seen_at TEXT
);

-- Zero-or-one profile per user
CREATE TABLE IF NOT EXISTS user_profiles (
    user_id TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
    first_name TEXT,
    last_name TEXT,
    phone TEXT,
    school TEXT,
    grade_level TEXT,
    birth_date TEXT,
    gender TEXT,
    bio TEXT,
    avatar_media_id TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Global roles (fixed vocabulary)
CREATE TABLE IF NOT EXISTS user_roles (
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    role TEXT NOT NULL CHECK (role IN ('ADMIN', 'TEACHER', 'STUDENT')),
    assigned_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (user_id, role)
);

-- Groups: PRIVATE (admin-created) or SYSTEM (one per role)
CREATE TABLE IF NOT EXISTS groups (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    grade INTEGER,
    year INTEGER,
    visibility TEXT NOT NULL DEFAULT 'PRIVATE',
    teacher_id TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Membership with an in-group role
CREATE TABLE IF NOT EXISTS group_members (
    id TEXT PRIMARY KEY,
    group_id TEXT NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    member_role TEXT NOT NULL CHECK (member_role IN ('ADMIN', 'TEACHER', 'STUDENT')),
    status TEXT NOT NULL DEFAULT 'ACTIVE',
    joined_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    UNIQUE(group_id, user_id)
);

-- Resource categories, addressed by a generated code
CREATE TABLE IF NOT EXISTS resource_categories (
    code TEXT PRIMARY KEY,
    label TEXT NOT NULL,
    group_label TEXT NOT NULL,
    sort_order INTEGER NOT NULL DEFAULT 0,
    group_order INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Resource entries; category_code is checked by the service, not a foreign key
CREATE TABLE IF NOT EXISTS resource_entries (
    id TEXT PRIMARY KEY,
    slug TEXT NOT NULL UNIQUE,
    category_code TEXT NOT NULL,
    author_id TEXT NOT NULL,
    title TEXT NOT NULL,
    summary TEXT NOT NULL,
    avatar_media_id TEXT,
    content TEXT NOT NULL DEFAULT '[]',   -- JSON array of blocks
    tags TEXT NOT NULL DEFAULT '[]',      -- JSON array of strings
    status TEXT NOT NULL,
    published_at TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Uploaded files; bytes live under <media_dir>/<bucket>/<storage_key>
CREATE TABLE IF NOT EXISTS media_assets (
    id TEXT PRIMARY KEY,
    owner_user_id TEXT NOT NULL,
    bucket TEXT NOT NULL,
    storage_key TEXT NOT NULL,
    filename TEXT,
    kind TEXT NOT NULL,
    content_type TEXT NOT NULL,
    size_bytes INTEGER NOT NULL,
    sha256 TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'READY',
    created_at TEXT DEFAULT (datetime('now'))
);

-- Append-only resource snapshots
CREATE TABLE IF NOT EXISTS server_metric_samples (
    id TEXT PRIMARY KEY,
    captured_at TEXT NOT NULL,
    heap_used_bytes INTEGER NOT NULL,
    heap_max_bytes INTEGER NOT NULL,
    system_memory_total_bytes INTEGER NOT NULL,
    system_memory_used_bytes INTEGER NOT NULL,
    disk_total_bytes INTEGER NOT NULL,
    disk_used_bytes INTEGER NOT NULL,
    process_cpu_load REAL NOT NULL,
    system_cpu_load REAL NOT NULL
);

-- Anonymous page visits
CREATE TABLE IF NOT EXISTS site_visits (
    id TEXT PRIMARY KEY,
    ip_address TEXT,
    user_agent TEXT,
    path TEXT,
    referrer TEXT,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Create indexes
CREATE UNIQUE INDEX IF NOT EXISTS idx_groups_system_name ON groups(name) WHERE visibility = 'SYSTEM';
CREATE INDEX IF NOT EXISTS idx_group_members_user ON group_members(user_id);
CREATE INDEX IF NOT EXISTS idx_user_roles_role ON user_roles(role);
CREATE INDEX IF NOT EXISTS idx_categories_group ON resource_categories(group_label);
CREATE INDEX IF NOT EXISTS idx_entries_category ON resource_entries(category_code);
CREATE INDEX IF NOT EXISTS idx_entries_author ON resource_entries(author_id);
CREATE INDEX IF NOT EXISTS idx_entries_published ON resource_entries(status, published_at);
CREATE INDEX IF NOT EXISTS idx_metric_samples_captured ON server_metric_samples(captured_at);
"#;
