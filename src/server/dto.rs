use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::service::accounts::{ProfileInput, RegisterInput, Session};
use crate::service::catalog::{self, ResourceInput};
use crate::service::groups::GroupView;
use crate::service::media::asset_url;
use crate::service::users::{NewUser, UserSummary, UserUpdate};
use crate::store::Store;
use crate::types::{
    BlockInput, ContentBlock, GroupMemberEntry, MediaAsset, Profile, ResourceCategory,
    ResourceEntry, ResourceStatus, Role, UserStatus,
};

// Requests

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub school: Option<String>,
    #[serde(default)]
    pub grade_level: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

impl From<ProfileRequest> for ProfileInput {
    fn from(req: ProfileRequest) -> Self {
        Self {
            first_name: req.first_name,
            last_name: req.last_name,
            phone: req.phone,
            school: req.school,
            grade_level: req.grade_level,
            birth_date: req.birth_date,
            gender: req.gender,
            bio: req.bio,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub confirm_password: Option<String>,
    #[serde(flatten)]
    pub profile: ProfileRequest,
}

impl From<RegisterRequest> for RegisterInput {
    fn from(req: RegisterRequest) -> Self {
        Self {
            email: req.email,
            password: req.password,
            confirm_password: req.confirm_password,
            profile: req.profile.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

fn parse_status(status: Option<&str>) -> Result<Option<UserStatus>> {
    status
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| UserStatus::parse(s).ok_or_else(|| Error::bad_request("Invalid status")))
        .transpose()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub profile: ProfileRequest,
}

impl CreateUserRequest {
    pub fn into_input(self) -> Result<NewUser> {
        Ok(NewUser {
            status: parse_status(self.status.as_deref())?,
            email: self.email,
            password: self.password,
            roles: self.roles,
            profile: self.profile.into(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub profile: ProfileRequest,
}

impl UpdateUserRequest {
    pub fn into_input(self) -> Result<UserUpdate> {
        Ok(UserUpdate {
            status: parse_status(self.status.as_deref())?,
            email: self.email,
            roles: self.roles,
            profile: self.profile.into(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub grade: Option<i32>,
    #[serde(default)]
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateGroupRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub grade: Option<i32>,
    #[serde(default)]
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub user_id: String,
    pub member_role: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRequest {
    pub label: String,
    pub group: String,
    #[serde(default)]
    pub sort_order: Option<i64>,
    #[serde(default)]
    pub group_order: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryGroupRequest {
    pub label: String,
    #[serde(default)]
    pub group_order: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequest {
    pub category_code: String,
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub avatar_asset_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub blocks: Vec<BlockInput>,
    #[serde(default)]
    pub status: Option<String>,
}

impl ResourceRequest {
    pub fn into_input(self) -> Result<ResourceInput> {
        let status = self
            .status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| ResourceStatus::parse(s).ok_or_else(|| Error::bad_request("Invalid status")))
            .transpose()?;

        Ok(ResourceInput {
            category_code: self.category_code,
            title: self.title,
            summary: self.summary,
            avatar_asset_id: self.avatar_asset_id,
            blocks: self.blocks,
            tags: self.tags,
            status,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct VisitRequest {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub referrer: Option<String>,
}

// Query parameters

#[derive(Debug, Default, Deserialize)]
pub struct ResourceListQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListQuery {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GroupListQuery {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub size: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub limit: Option<i64>,
}

// Responses

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDto {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub school: Option<String>,
    pub grade_level: Option<String>,
    pub birth_date: Option<String>,
    pub gender: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<&Profile> for ProfileDto {
    fn from(p: &Profile) -> Self {
        Self {
            first_name: p.first_name.clone(),
            last_name: p.last_name.clone(),
            phone: p.phone.clone(),
            school: p.school.clone(),
            grade_level: p.grade_level.clone(),
            birth_date: p.birth_date.map(|d| d.format("%Y-%m-%d").to_string()),
            gender: p.gender.clone(),
            bio: p.bio.clone(),
            avatar_url: p.avatar_media_id.as_deref().map(asset_url),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: String,
    pub email: String,
    pub status: UserStatus,
    /// Highest-privilege role held.
    pub role: Role,
    pub roles: Vec<Role>,
    pub profile: ProfileDto,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub last_login_at: Option<chrono::DateTime<chrono::Utc>>,
    pub last_seen_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<&UserSummary> for UserDto {
    fn from(s: &UserSummary) -> Self {
        Self {
            id: s.user.id.clone(),
            email: s.user.email.clone(),
            status: s.user.status,
            role: Role::primary(&s.roles),
            roles: s.roles.clone(),
            profile: ProfileDto::from(&s.profile),
            created_at: s.user.created_at,
            last_login_at: s.user.last_login_at,
            last_seen_at: s.user.last_seen_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub user_id: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token expiry, unix seconds.
    pub expires_at: i64,
    pub refresh_expires_at: i64,
    pub user: UserDto,
}

impl SessionResponse {
    pub fn new(session: Session, store: &dyn Store) -> Result<Self> {
        let summary = crate::service::users::load_summary(store, session.user)?;
        Ok(Self {
            access_token: session.access.token,
            refresh_token: session.refresh.token,
            expires_at: session.access.expires_at.timestamp(),
            refresh_expires_at: session.refresh.expires_at.timestamp(),
            user: UserDto::from(&summary),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResponse<T: Serialize> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDto {
    pub user_id: String,
    pub email: String,
    pub member_role: String,
}

impl From<&GroupMemberEntry> for MemberDto {
    fn from(m: &GroupMemberEntry) -> Self {
        Self {
            user_id: m.user_id.clone(),
            email: m.email.clone(),
            member_role: m.member_role.as_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDto {
    pub id: String,
    pub name: String,
    pub grade: Option<i32>,
    pub year: Option<i32>,
    pub visibility: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub members: Vec<MemberDto>,
}

impl From<&GroupView> for GroupDto {
    fn from(view: &GroupView) -> Self {
        Self {
            id: view.group.id.clone(),
            name: view.group.name.clone(),
            grade: view.group.grade,
            year: view.group.year,
            visibility: view.group.visibility.as_str().to_string(),
            created_at: view.group.created_at,
            members: view.members.iter().map(MemberDto::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDto {
    pub code: String,
    pub label: String,
    pub group: String,
    pub sort_order: i64,
    pub group_order: i64,
}

impl From<&ResourceCategory> for CategoryDto {
    fn from(c: &ResourceCategory) -> Self {
        Self {
            code: c.code.clone(),
            label: c.label.clone(),
            group: c.group_label.clone(),
            sort_order: c.sort_order,
            group_order: c.group_order,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDto {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl BlockDto {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            text: None,
            url: None,
            asset_id: None,
            media_url: None,
            caption: None,
            title: None,
        }
    }
}

impl From<&ContentBlock> for BlockDto {
    fn from(block: &ContentBlock) -> Self {
        match block {
            ContentBlock::Text { text, title } => Self {
                text: Some(text.clone()),
                title: title.clone(),
                ..Self::new("TEXT")
            },
            ContentBlock::Formula { text, title } => Self {
                text: Some(text.clone()),
                title: title.clone(),
                ..Self::new("FORMULA")
            },
            ContentBlock::Link { url, title } => Self {
                url: Some(url.clone()),
                title: Some(title.clone()),
                ..Self::new("LINK")
            },
            ContentBlock::Image(media) | ContentBlock::Pdf(media) => Self {
                asset_id: Some(media.asset_id.clone()),
                media_url: Some(asset_url(&media.asset_id)),
                caption: media.caption.clone(),
                title: media.title.clone(),
                ..Self::new(if matches!(block, ContentBlock::Image(_)) {
                    "IMAGE"
                } else {
                    "PDF"
                })
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceCardDto {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub summary: String,
    pub category: Option<CategoryDto>,
    pub avatar_url: Option<String>,
    pub tags: Vec<String>,
    pub author_name: String,
    pub published_at: Option<chrono::DateTime<chrono::Utc>>,
    pub status: ResourceStatus,
}

impl ResourceCardDto {
    pub fn load(store: &dyn Store, entry: &ResourceEntry) -> Result<Self> {
        let category = store.get_category(&entry.category_code)?;
        Ok(Self {
            id: entry.id.clone(),
            title: entry.title.clone(),
            slug: entry.slug.clone(),
            summary: entry.summary.clone(),
            category: category.as_ref().map(CategoryDto::from),
            avatar_url: entry.avatar_media_id.as_deref().map(asset_url),
            tags: entry.tags.clone(),
            author_name: catalog::author_display_name(store, &entry.author_id)?,
            published_at: entry.published_at,
            status: entry.status,
        })
    }

    pub fn load_all(store: &dyn Store, entries: &[ResourceEntry]) -> Result<Vec<Self>> {
        entries.iter().map(|e| Self::load(store, e)).collect()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDetailDto {
    #[serde(flatten)]
    pub card: ResourceCardDto,
    pub avatar_asset_id: Option<String>,
    pub blocks: Vec<BlockDto>,
}

impl ResourceDetailDto {
    pub fn load(store: &dyn Store, entry: &ResourceEntry) -> Result<Self> {
        Ok(Self {
            card: ResourceCardDto::load(store, entry)?,
            avatar_asset_id: entry.avatar_media_id.clone(),
            blocks: entry.content.iter().map(BlockDto::from).collect(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ResourceListResponse {
    pub items: Vec<ResourceCardDto>,
    pub total: i64,
    pub page: i64,
    pub size: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItemDto {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub href: Option<String>,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub parent_id: Option<String>,
}

impl From<&ResourceEntry> for SearchItemDto {
    fn from(entry: &ResourceEntry) -> Self {
        Self {
            id: entry.id.clone(),
            title: entry.title.clone(),
            slug: entry.slug.clone(),
            href: None,
            kind: "RESOURCE",
            parent_id: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub asset_id: String,
    pub url: String,
}

impl From<&MediaAsset> for UploadResponse {
    fn from(asset: &MediaAsset) -> Self {
        Self {
            asset_id: asset.id.clone(),
            url: asset_url(&asset.id),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TotalResponse {
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MediaBlock;

    #[test]
    fn test_media_block_carries_url() {
        let block = ContentBlock::Image(MediaBlock {
            asset_id: "a1".to_string(),
            caption: Some("Cell".to_string()),
            title: None,
        });
        let json = serde_json::to_value(BlockDto::from(&block)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "IMAGE",
                "assetId": "a1",
                "mediaUrl": "/api/media/assets/a1/content",
                "caption": "Cell",
            })
        );
    }

    #[test]
    fn test_resource_request_status() {
        let req: ResourceRequest = serde_json::from_str(
            r#"{"categoryCode":"c","title":"t","summary":"s","status":"draft"}"#,
        )
        .unwrap();
        assert_eq!(req.into_input().unwrap().status, Some(ResourceStatus::Draft));

        let req: ResourceRequest = serde_json::from_str(
            r#"{"categoryCode":"c","title":"t","summary":"s","status":"HIDDEN"}"#,
        )
        .unwrap();
        assert!(matches!(req.into_input(), Err(Error::BadRequest(_))));
    }

    #[test]
    fn test_register_request_flattens_profile() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"email":"a@b.ro","password":"secret123","firstName":"Ana","gradeLevel":"9"}"#,
        )
        .unwrap();
        let input = RegisterInput::from(req);
        assert_eq!(input.profile.first_name.as_deref(), Some("Ana"));
        assert_eq!(input.profile.grade_level.as_deref(), Some("9"));
        assert!(input.confirm_password.is_none());
    }
}
