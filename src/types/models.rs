use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{
    ContentBlock, GroupVisibility, MediaBucket, MediaKind, MediaStatus, MemberRole, MemberStatus,
    ResourceStatus, UserStatus,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub school: Option<String>,
    pub grade_level: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub bio: Option<String>,
    pub avatar_media_id: Option<String>,
}

impl Profile {
    #[must_use]
    pub fn empty(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            ..Default::default()
        }
    }

    /// "First Last" when either name is set.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        let first = self.first_name.as_deref().unwrap_or("");
        let last = self.last_name.as_deref().unwrap_or("");
        let name = format!("{first} {last}").trim().to_string();
        (!name.is_empty()).then_some(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub grade: Option<i32>,
    pub year: Option<i32>,
    pub visibility: GroupVisibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMember {
    pub id: String,
    pub group_id: String,
    pub user_id: String,
    pub member_role: MemberRole,
    pub status: MemberStatus,
    pub joined_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A member row joined with the member's email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMemberEntry {
    pub user_id: String,
    pub email: String,
    pub member_role: MemberRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceCategory {
    pub code: String,
    pub label: String,
    pub group_label: String,
    pub sort_order: i64,
    pub group_order: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceEntry {
    pub id: String,
    pub slug: String,
    pub category_code: String,
    pub author_id: String,
    pub title: String,
    pub summary: String,
    pub avatar_media_id: Option<String>,
    pub content: Vec<ContentBlock>,
    pub tags: Vec<String>,
    pub status: ResourceStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaAsset {
    pub id: String,
    pub owner_user_id: String,
    pub bucket: MediaBucket,
    pub storage_key: String,
    pub filename: Option<String>,
    pub kind: MediaKind,
    pub content_type: String,
    pub size_bytes: i64,
    pub sha256: String,
    pub status: MediaStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub id: String,
    pub captured_at: DateTime<Utc>,
    pub heap_used_bytes: i64,
    pub heap_max_bytes: i64,
    pub system_memory_total_bytes: i64,
    pub system_memory_used_bytes: i64,
    pub disk_total_bytes: i64,
    pub disk_used_bytes: i64,
    pub process_cpu_load: f64,
    pub system_cpu_load: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteVisit {
    pub id: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub path: Option<String>,
    pub referrer: Option<String>,
    pub created_at: DateTime<Utc>,
}
