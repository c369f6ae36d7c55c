mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    /// Creates a user together with its profile and initial roles atomically.
    fn create_account(&self, user: &User, profile: &Profile, roles: &[Role]) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    fn list_users(&self, search: Option<&str>, offset: i64, limit: i64) -> Result<Vec<User>>;
    fn count_users(&self, search: Option<&str>) -> Result<i64>;
    fn update_user(&self, user: &User) -> Result<()>;
    fn delete_user(&self, id: &str) -> Result<bool>;

    // Profile operations
    fn get_profile(&self, user_id: &str) -> Result<Option<Profile>>;
    fn upsert_profile(&self, profile: &Profile) -> Result<()>;

    // Role operations
    fn list_user_roles(&self, user_id: &str) -> Result<Vec<Role>>;
    fn add_user_role(&self, user_id: &str, role: Role) -> Result<bool>;
    fn remove_user_role(&self, user_id: &str, role: Role) -> Result<bool>;

    // Group operations
    fn create_group(&self, group: &Group) -> Result<()>;
    /// Inserts a SYSTEM group unless one with the same name exists.
    fn insert_system_group(&self, group: &Group) -> Result<bool>;
    fn get_system_group(&self, name: &str) -> Result<Option<Group>>;
    fn get_group(&self, id: &str) -> Result<Option<Group>>;
    fn list_groups(&self, offset: i64, limit: i64) -> Result<Vec<Group>>;
    fn count_groups(&self) -> Result<i64>;
    fn update_group(&self, group: &Group) -> Result<()>;
    fn delete_group(&self, id: &str) -> Result<bool>;

    // Group member operations
    /// Inserts a member unless the (group, user) pair already exists.
    fn add_group_member(&self, member: &GroupMember) -> Result<bool>;
    fn get_group_member(&self, group_id: &str, user_id: &str) -> Result<Option<GroupMember>>;
    fn update_member_role(&self, group_id: &str, user_id: &str, role: MemberRole) -> Result<()>;
    fn remove_group_member(&self, group_id: &str, user_id: &str) -> Result<bool>;
    fn list_group_members(&self, group_id: &str) -> Result<Vec<GroupMemberEntry>>;
    fn list_user_group_ids(&self, user_id: &str) -> Result<Vec<String>>;

    // Resource category operations
    fn create_category(&self, category: &ResourceCategory) -> Result<()>;
    fn get_category(&self, code: &str) -> Result<Option<ResourceCategory>>;
    fn list_categories(&self) -> Result<Vec<ResourceCategory>>;
    fn list_categories_in_group(&self, group_label: &str) -> Result<Vec<ResourceCategory>>;
    fn update_category(&self, category: &ResourceCategory) -> Result<()>;
    fn delete_category(&self, code: &str) -> Result<bool>;
    fn max_group_order(&self) -> Result<Option<i64>>;
    fn max_sort_order(&self, group_label: &str) -> Result<Option<i64>>;
    /// Moves every category of a group to a new label and order.
    fn relabel_category_group(&self, current: &str, new_label: &str, group_order: i64)
    -> Result<usize>;

    // Resource entry operations
    fn create_entry(&self, entry: &ResourceEntry) -> Result<()>;
    fn get_entry(&self, id: &str) -> Result<Option<ResourceEntry>>;
    fn get_entry_by_slug(&self, slug: &str) -> Result<Option<ResourceEntry>>;
    fn update_entry(&self, entry: &ResourceEntry) -> Result<()>;
    fn delete_entry(&self, id: &str) -> Result<bool>;
    fn count_category_entries(&self, category_code: &str) -> Result<i64>;
    fn list_entries(&self, author_id: Option<&str>) -> Result<Vec<ResourceEntry>>;
    fn list_published(
        &self,
        category_code: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ResourceEntry>>;
    fn count_published(&self, category_code: Option<&str>) -> Result<i64>;
    /// `pattern` is a lowercase LIKE pattern using `\` as the escape character.
    fn search_published(&self, pattern: &str, limit: i64) -> Result<Vec<ResourceEntry>>;

    // Media operations
    fn create_media_asset(&self, asset: &MediaAsset) -> Result<()>;
    fn get_media_asset(&self, id: &str) -> Result<Option<MediaAsset>>;
    fn delete_media_asset(&self, id: &str) -> Result<bool>;

    // Metric sample operations
    fn insert_metric_sample(&self, sample: &MetricSample) -> Result<()>;
    /// Most recent samples first.
    fn list_recent_metric_samples(&self, limit: i64) -> Result<Vec<MetricSample>>;

    // Site visit operations
    fn create_site_visit(&self, visit: &SiteVisit) -> Result<()>;
    fn count_site_visits(&self) -> Result<i64>;
}
