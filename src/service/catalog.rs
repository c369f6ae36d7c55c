//! Resource categories and entries.

use chrono::Utc;
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use super::Actor;
use super::media::delete_asset;
use crate::error::{Error, Result};
use crate::media::MediaStorage;
use crate::store::Store;
use crate::types::{BlockInput, ResourceCategory, ResourceEntry, ResourceStatus, validate_blocks};

pub const MAX_TAGS: usize = 12;
pub const MAX_SEARCH_RESULTS: i64 = 20;
const FALLBACK_AUTHOR_NAME: &str = "Profesor";

/// Lowercase ASCII slug with diacritics stripped; a fresh UUID when nothing
/// usable remains.
#[must_use]
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;

    for c in value.nfd().filter(char::is_ascii) {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        slug
    }
}

/// Appends `-2`, `-3`, … to `base` until `taken` is false.
fn disambiguate(base: &str, taken: impl Fn(&str) -> Result<bool>) -> Result<String> {
    if !taken(base)? {
        return Ok(base.to_string());
    }
    let mut counter = 2;
    loop {
        let candidate = format!("{base}-{counter}");
        if !taken(&candidate)? {
            return Ok(candidate);
        }
        counter += 1;
    }
}

fn required(value: &str, message: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::bad_request(message));
    }
    Ok(value.to_string())
}

// Categories

/// Preferred, else fallback, else the order the group already has, else
/// one past the highest order in use.
pub fn resolve_group_order(
    store: &dyn Store,
    group_label: &str,
    preferred: Option<i64>,
    fallback: Option<i64>,
) -> Result<i64> {
    if let Some(order) = preferred.or(fallback) {
        return Ok(order);
    }
    if let Some(existing) = store.list_categories_in_group(group_label)?.first() {
        return Ok(existing.group_order);
    }
    Ok(store.max_group_order()?.unwrap_or(0) + 1)
}

/// Preferred, else fallback, else one past the highest order in the group.
pub fn resolve_sort_order(
    store: &dyn Store,
    group_label: &str,
    preferred: Option<i64>,
    fallback: Option<i64>,
) -> Result<i64> {
    if let Some(order) = preferred.or(fallback) {
        return Ok(order);
    }
    Ok(store.max_sort_order(group_label)?.unwrap_or(0) + 1)
}

pub fn list_categories(store: &dyn Store) -> Result<Vec<ResourceCategory>> {
    store.list_categories()
}

pub fn create_category(
    store: &dyn Store,
    label: &str,
    group_label: &str,
    sort_order: Option<i64>,
    group_order: Option<i64>,
) -> Result<ResourceCategory> {
    let label = required(label, "Category label is required")?;
    let group_label = required(group_label, "Group label is required")?;

    let code = disambiguate(&slugify(&label), |c| Ok(store.get_category(c)?.is_some()))?;
    let category = ResourceCategory {
        code,
        group_order: resolve_group_order(store, &group_label, group_order, None)?,
        sort_order: resolve_sort_order(store, &group_label, sort_order, None)?,
        label,
        group_label,
        created_at: Utc::now(),
    };
    store.create_category(&category)?;

    tracing::info!("Created category {}", category.code);
    Ok(category)
}

/// Relabels a category. Moving it to another group re-resolves each order
/// against the new group unless that order is given.
pub fn update_category(
    store: &dyn Store,
    code: &str,
    label: &str,
    group_label: &str,
    sort_order: Option<i64>,
    group_order: Option<i64>,
) -> Result<ResourceCategory> {
    let mut category = store
        .get_category(code)?
        .ok_or_else(|| Error::not_found("Category not found"))?;
    let label = required(label, "Category label is required")?;
    let group_label = required(group_label, "Group label is required")?;

    let moving = category.group_label != group_label;
    category.group_order = if moving {
        resolve_group_order(store, &group_label, group_order, None)?
    } else {
        resolve_group_order(store, &group_label, group_order, Some(category.group_order))?
    };
    if let Some(order) = sort_order {
        category.sort_order = order;
    } else if moving {
        category.sort_order = resolve_sort_order(store, &group_label, None, None)?;
    }
    category.label = label;
    category.group_label = group_label;

    store.update_category(&category)?;
    Ok(category)
}

/// Refuses while any entry still references the category.
pub fn delete_category(store: &dyn Store, code: &str) -> Result<()> {
    if store.get_category(code)?.is_none() {
        return Err(Error::not_found("Category not found"));
    }
    if store.count_category_entries(code)? > 0 {
        return Err(Error::bad_request(
            "Category cannot be deleted while resources reference it",
        ));
    }
    store.delete_category(code)?;
    Ok(())
}

/// Moves every category of `current` to `new_label`, keeping the group's
/// order unless one is given.
pub fn rename_category_group(
    store: &dyn Store,
    current: &str,
    new_label: &str,
    group_order: Option<i64>,
) -> Result<Vec<ResourceCategory>> {
    let current = required(current, "Selected group is invalid")?;
    let new_label = required(new_label, "Group label is required")?;

    let categories = store.list_categories_in_group(&current)?;
    let Some(first) = categories.first() else {
        return Err(Error::not_found("Group not found"));
    };
    let order = group_order.unwrap_or(first.group_order);

    store.relabel_category_group(&current, &new_label, order)?;
    store.list_categories_in_group(&new_label)
}

// Entries

/// Trimmed, non-empty, first occurrence kept, at most [`MAX_TAGS`].
#[must_use]
pub fn clean_tags(tags: &[String]) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() || cleaned.iter().any(|t| t == tag) {
            continue;
        }
        cleaned.push(tag.to_string());
        if cleaned.len() >= MAX_TAGS {
            break;
        }
    }
    cleaned
}

#[derive(Debug, Clone, Default)]
pub struct ResourceInput {
    pub category_code: String,
    pub title: String,
    pub summary: String,
    pub avatar_asset_id: Option<String>,
    pub blocks: Vec<BlockInput>,
    pub tags: Vec<String>,
    pub status: Option<ResourceStatus>,
}

#[derive(Debug, Clone)]
pub struct ResourcePage {
    pub items: Vec<ResourceEntry>,
    pub total: i64,
}

struct ValidatedInput {
    category_code: String,
    title: String,
    summary: String,
    content: Vec<crate::types::ContentBlock>,
    tags: Vec<String>,
}

fn validate_input(store: &dyn Store, input: &ResourceInput) -> Result<ValidatedInput> {
    let category = store
        .get_category(input.category_code.trim())?
        .ok_or_else(|| Error::bad_request("Selected category does not exist"))?;

    let title = input.title.trim();
    let summary = input.summary.trim();
    if title.is_empty() || summary.is_empty() {
        return Err(Error::bad_request("Title and summary are required"));
    }

    Ok(ValidatedInput {
        category_code: category.code,
        title: title.to_string(),
        summary: summary.to_string(),
        content: validate_blocks(&input.blocks)?,
        tags: clean_tags(&input.tags),
    })
}

fn blank_to_none(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Publishing stamps `published_at` once; leaving PUBLISHED clears it.
pub fn apply_status(entry: &mut ResourceEntry, status: ResourceStatus) {
    entry.status = status;
    if status == ResourceStatus::Published {
        if entry.published_at.is_none() {
            entry.published_at = Some(Utc::now());
        }
    } else {
        entry.published_at = None;
    }
}

pub fn create_resource(store: &dyn Store, input: &ResourceInput, author_id: &str) -> Result<ResourceEntry> {
    let valid = validate_input(store, input)?;
    let slug = disambiguate(&slugify(&valid.title), |s| {
        Ok(store.get_entry_by_slug(s)?.is_some())
    })?;

    let now = Utc::now();
    let mut entry = ResourceEntry {
        id: Uuid::new_v4().to_string(),
        slug,
        category_code: valid.category_code,
        author_id: author_id.to_string(),
        title: valid.title,
        summary: valid.summary,
        avatar_media_id: blank_to_none(input.avatar_asset_id.as_ref()),
        content: valid.content,
        tags: valid.tags,
        status: ResourceStatus::Draft,
        published_at: None,
        created_at: now,
        updated_at: now,
    };
    apply_status(&mut entry, input.status.unwrap_or(ResourceStatus::Published));
    store.create_entry(&entry)?;

    tracing::info!("Created resource {} ({})", entry.slug, entry.status);
    Ok(entry)
}

/// Loads an entry the actor may manage. Entries owned by someone else are
/// reported as missing.
fn load_managed(store: &dyn Store, id: &str, actor: &Actor) -> Result<ResourceEntry> {
    store
        .get_entry(id)?
        .filter(|e| actor.is_admin || e.author_id == actor.user_id)
        .ok_or_else(|| Error::not_found("Resource not found"))
}

/// Replaces the editable fields. The slug never changes; status stays as is
/// unless given.
pub fn update_resource(
    store: &dyn Store,
    id: &str,
    input: &ResourceInput,
    actor: &Actor,
) -> Result<ResourceEntry> {
    let mut entry = load_managed(store, id, actor)?;
    let valid = validate_input(store, input)?;

    entry.category_code = valid.category_code;
    entry.title = valid.title;
    entry.summary = valid.summary;
    entry.avatar_media_id = blank_to_none(input.avatar_asset_id.as_ref());
    entry.content = valid.content;
    entry.tags = valid.tags;
    let status = input.status.unwrap_or(entry.status);
    apply_status(&mut entry, status);
    entry.updated_at = Utc::now();

    store.update_entry(&entry)?;
    Ok(entry)
}

/// Deletes the entry and its avatar asset.
pub async fn delete_resource(
    store: &dyn Store,
    storage: &MediaStorage,
    id: &str,
    actor: &Actor,
) -> Result<()> {
    let entry = load_managed(store, id, actor)?;
    store.delete_entry(&entry.id)?;

    if let Some(avatar) = &entry.avatar_media_id {
        delete_asset(store, storage, avatar).await?;
    }

    tracing::info!("Deleted resource {}", entry.slug);
    Ok(())
}

pub fn get_resource(store: &dyn Store, id: &str) -> Result<ResourceEntry> {
    store
        .get_entry(id)?
        .ok_or_else(|| Error::not_found("Resource not found"))
}

/// Only PUBLISHED entries are visible by slug.
pub fn get_published_by_slug(store: &dyn Store, slug: &str) -> Result<ResourceEntry> {
    store
        .get_entry_by_slug(slug)?
        .filter(|e| e.status == ResourceStatus::Published)
        .ok_or_else(|| Error::not_found("Resource not found"))
}

/// Newest published first. `page` is 1-based.
pub fn list_published_page(
    store: &dyn Store,
    category_code: Option<&str>,
    page: i64,
    size: i64,
) -> Result<ResourcePage> {
    let category_code = category_code.map(str::trim).filter(|c| !c.is_empty());
    let page = page.max(1);
    let size = size.max(1);

    Ok(ResourcePage {
        items: store.list_published(category_code, (page - 1) * size, size)?,
        total: store.count_published(category_code)?,
    })
}

/// Entries the actor authored; admins see every entry.
pub fn list_authored(store: &dyn Store, actor: &Actor) -> Result<Vec<ResourceEntry>> {
    if actor.is_admin {
        store.list_entries(None)
    } else {
        store.list_entries(Some(&actor.user_id))
    }
}

fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Case-insensitive substring search over title, summary and tags of
/// published entries. `limit` is clamped to `1..=20`.
pub fn search_published(store: &dyn Store, term: &str, limit: i64) -> Result<Vec<ResourceEntry>> {
    let term = term.trim();
    if term.is_empty() {
        return Ok(Vec::new());
    }
    let limit = limit.clamp(1, MAX_SEARCH_RESULTS);
    store.search_published(&like_pattern(term), limit)
}

/// Profile name, else email, else a generic label.
pub fn author_display_name(store: &dyn Store, author_id: &str) -> Result<String> {
    let Some(user) = store.get_user(author_id)? else {
        return Ok(FALLBACK_AUTHOR_NAME.to_string());
    };
    let name = store
        .get_profile(author_id)?
        .and_then(|p| p.display_name());
    Ok(name.unwrap_or(user.email))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::store::SqliteStore;
    use crate::types::{ContentBlock, Profile, Role, User, UserStatus};

    fn setup() -> (TempDir, SqliteStore) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        (temp, store)
    }

    fn create_user(store: &dyn Store, id: &str, first_name: Option<&str>) {
        let now = Utc::now();
        let user = User {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            password_hash: "hash".to_string(),
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
            last_login_at: None,
            last_seen_at: None,
        };
        let mut profile = Profile::empty(id);
        profile.first_name = first_name.map(str::to_string);
        store.create_account(&user, &profile, &[Role::Teacher]).unwrap();
    }

    fn text_block(text: &str) -> BlockInput {
        BlockInput {
            kind: Some("TEXT".to_string()),
            text: Some(text.to_string()),
            ..Default::default()
        }
    }

    fn input(category: &str, title: &str, status: Option<ResourceStatus>) -> ResourceInput {
        ResourceInput {
            category_code: category.to_string(),
            title: title.to_string(),
            summary: "Summary".to_string(),
            blocks: vec![text_block("Content")],
            tags: vec!["Physics".to_string()],
            status,
            ..Default::default()
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Mecanică I"), "mecanica-i");
        assert_eq!(slugify("  Ștefan -- cel  Mare!  "), "stefan-cel-mare");
        assert_eq!(slugify("Legea lui Ohm (2024)"), "legea-lui-ohm-2024");
        assert_eq!(slugify("???").len(), 36);
        assert_eq!(slugify("").len(), 36);
    }

    #[test]
    fn test_clean_tags() {
        let tags: Vec<String> = [" a ", "", "b", "a", "  "]
            .iter()
            .map(|s| s.to_string())
            .chain((0..20).map(|i| format!("t{i}")))
            .collect();

        let cleaned = clean_tags(&tags);
        assert_eq!(cleaned.len(), MAX_TAGS);
        assert_eq!(&cleaned[..3], &["a", "b", "t0"]);
    }

    #[test]
    fn test_like_pattern_escapes() {
        assert_eq!(like_pattern("50%_A\\"), "%50\\%\\_a\\\\%");
    }

    #[test]
    fn test_category_code_collision() {
        let (_temp, store) = setup();

        let first = create_category(&store, "Mecanică I", "Fizică", None, None).unwrap();
        let second = create_category(&store, "Mecanica I", "Fizică", None, None).unwrap();
        let third = create_category(&store, "Mecanică  I", "Fizică", None, None).unwrap();

        assert_eq!(first.code, "mecanica-i");
        assert_eq!(second.code, "mecanica-i-2");
        assert_eq!(third.code, "mecanica-i-3");
        assert!(first.code.is_ascii());
    }

    #[test]
    fn test_category_orders_resolve() {
        let (_temp, store) = setup();

        let a = create_category(&store, "A", "Mech", None, None).unwrap();
        let b = create_category(&store, "B", "Mech", None, None).unwrap();
        let c = create_category(&store, "C", "Optics", None, None).unwrap();
        let d = create_category(&store, "D", "Optics", Some(10), Some(7)).unwrap();

        assert_eq!((a.group_order, a.sort_order), (1, 1));
        assert_eq!((b.group_order, b.sort_order), (1, 2));
        assert_eq!((c.group_order, c.sort_order), (2, 1));
        assert_eq!((d.group_order, d.sort_order), (7, 10));

        // Moving into an existing group adopts its order and goes last.
        let moved = update_category(&store, &c.code, "C", "Mech", None, None).unwrap();
        assert_eq!((moved.group_order, moved.sort_order), (1, 3));

        // An explicit group order survives the move.
        let pinned = update_category(&store, &d.code, "D", "Acoustics", None, Some(99)).unwrap();
        assert_eq!((pinned.group_order, pinned.sort_order), (99, 1));

        // Staying put keeps the current group order unless one is given.
        let same = update_category(&store, &a.code, "A2", "Mech", None, None).unwrap();
        assert_eq!((same.group_order, same.sort_order, same.label.as_str()), (1, 1, "A2"));
        let reordered = update_category(&store, &a.code, "A2", "Mech", Some(5), Some(4)).unwrap();
        assert_eq!((reordered.group_order, reordered.sort_order), (4, 5));
    }

    #[test]
    fn test_rename_category_group() {
        let (_temp, store) = setup();
        create_category(&store, "A", "Mech", None, None).unwrap();
        create_category(&store, "B", "Mech", None, None).unwrap();

        let renamed = rename_category_group(&store, "Mech", "Mechanics", None).unwrap();
        assert_eq!(renamed.len(), 2);
        assert!(renamed.iter().all(|c| c.group_label == "Mechanics" && c.group_order == 1));

        assert!(matches!(
            rename_category_group(&store, "Mech", "X", None),
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_category_delete_blocked_while_referenced() {
        let (temp, store) = setup();
        let storage = MediaStorage::new(&temp.path().join("media"));
        create_user(&store, "t-1", None);
        let category = create_category(&store, "Optics", "Physics", None, None).unwrap();
        let entry = create_resource(&store, &input(&category.code, "Lenses", None), "t-1").unwrap();

        assert!(matches!(
            delete_category(&store, &category.code),
            Err(Error::BadRequest(_))
        ));

        delete_resource(&store, &storage, &entry.id, &Actor::member("t-1"))
            .await
            .unwrap();
        delete_category(&store, &category.code).unwrap();
        assert!(list_categories(&store).unwrap().is_empty());
    }

    #[test]
    fn test_create_validates_input() {
        let (_temp, store) = setup();
        create_category(&store, "Optics", "Physics", None, None).unwrap();

        assert!(matches!(
            create_resource(&store, &input("missing", "T", None), "t-1"),
            Err(Error::BadRequest(_))
        ));

        let mut blank = input("optics", "T", None);
        blank.summary = "  ".to_string();
        assert!(matches!(
            create_resource(&store, &blank, "t-1"),
            Err(Error::BadRequest(_))
        ));
    }

    #[test]
    fn test_publish_lifecycle() {
        let (_temp, store) = setup();
        create_category(&store, "Optics", "Physics", None, None).unwrap();
        let author = Actor::member("t-1");

        let draft = create_resource(
            &store,
            &input("optics", "Lenses", Some(ResourceStatus::Draft)),
            "t-1",
        )
        .unwrap();
        assert!(draft.published_at.is_none());

        let published = update_resource(
            &store,
            &draft.id,
            &input("optics", "Lenses", Some(ResourceStatus::Published)),
            &author,
        )
        .unwrap();
        let first_published = published.published_at.unwrap();

        // Unrelated edit without status keeps the timestamp.
        let mut edit = input("optics", "Thin lenses", None);
        edit.tags = vec!["optics".to_string()];
        let edited = update_resource(&store, &draft.id, &edit, &author).unwrap();
        assert_eq!(edited.status, ResourceStatus::Published);
        assert_eq!(edited.slug, "lenses");
        assert_eq!(
            edited.published_at.map(|t| t.timestamp_micros()),
            Some(first_published.timestamp_micros())
        );

        let archived = update_resource(
            &store,
            &draft.id,
            &input("optics", "Lenses", Some(ResourceStatus::Archived)),
            &author,
        )
        .unwrap();
        assert!(archived.published_at.is_none());
    }

    #[test]
    fn test_default_status_is_published() {
        let (_temp, store) = setup();
        create_category(&store, "Optics", "Physics", None, None).unwrap();

        let entry = create_resource(&store, &input("optics", "Lenses", None), "t-1").unwrap();
        assert_eq!(entry.status, ResourceStatus::Published);
        assert!(entry.published_at.is_some());
        assert_eq!(entry.content, vec![ContentBlock::Text {
            text: "Content".to_string(),
            title: None,
        }]);

        let again = create_resource(&store, &input("optics", "Lenses", None), "t-1").unwrap();
        assert_eq!(again.slug, "lenses-2");
    }

    #[test]
    fn test_non_author_sees_not_found() {
        let (_temp, store) = setup();
        create_category(&store, "Optics", "Physics", None, None).unwrap();
        let entry = create_resource(&store, &input("optics", "Lenses", None), "t-1").unwrap();

        assert!(matches!(
            update_resource(&store, &entry.id, &input("optics", "X", None), &Actor::member("t-2")),
            Err(Error::NotFound(_))
        ));

        let updated =
            update_resource(&store, &entry.id, &input("optics", "X", None), &Actor::admin("a-1"))
                .unwrap();
        assert_eq!(updated.title, "X");
    }

    #[test]
    fn test_listing_and_search() {
        let (_temp, store) = setup();
        create_category(&store, "Optics", "Physics", None, None).unwrap();
        create_category(&store, "Waves", "Physics", None, None).unwrap();

        create_resource(&store, &input("optics", "Lenses", None), "t-1").unwrap();
        create_resource(&store, &input("waves", "Sound", None), "t-1").unwrap();
        create_resource(&store, &input("waves", "Hidden", Some(ResourceStatus::Draft)), "t-2").unwrap();

        let page = list_published_page(&store, None, 1, 1).unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(list_published_page(&store, Some("waves"), 1, 9).unwrap().total, 1);

        assert_eq!(search_published(&store, "LENS", 5).unwrap().len(), 1);
        assert_eq!(search_published(&store, "physics", 0).unwrap().len(), 1);
        assert_eq!(search_published(&store, "physics", 50).unwrap().len(), 2);
        assert!(search_published(&store, "hidden", 20).unwrap().is_empty());
        assert!(search_published(&store, "   ", 20).unwrap().is_empty());

        assert!(get_published_by_slug(&store, "hidden").is_err());
        assert_eq!(get_published_by_slug(&store, "sound").unwrap().title, "Sound");

        assert_eq!(list_authored(&store, &Actor::member("t-1")).unwrap().len(), 2);
        assert_eq!(list_authored(&store, &Actor::admin("a-1")).unwrap().len(), 3);
    }

    #[test]
    fn test_search_folds_diacritics_case() {
        let (_temp, store) = setup();
        create_category(&store, "Electricity", "Physics", None, None).unwrap();
        let mut entry = input("electricity", "Ștefan și Electricitatea", None);
        entry.tags = vec!["Ăsta".to_string()];
        create_resource(&store, &entry, "t-1").unwrap();

        assert_eq!(search_published(&store, "Ștefan", 5).unwrap().len(), 1);
        assert_eq!(search_published(&store, "ștefan", 5).unwrap().len(), 1);
        assert_eq!(search_published(&store, "ȘI ELECTRIC", 5).unwrap().len(), 1);
        assert_eq!(search_published(&store, "ăsta", 5).unwrap().len(), 1);
        assert_eq!(search_published(&store, "electricitatea", 5).unwrap().len(), 1);
        assert!(search_published(&store, "Îndrumar", 5).unwrap().is_empty());
    }

    #[test]
    fn test_author_display_name() {
        let (_temp, store) = setup();
        create_user(&store, "named", Some("Ion"));
        create_user(&store, "anonymous", None);

        assert_eq!(author_display_name(&store, "named").unwrap(), "Ion");
        assert_eq!(
            author_display_name(&store, "anonymous").unwrap(),
            "anonymous@example.com"
        );
        assert_eq!(author_display_name(&store, "ghost").unwrap(), "Profesor");
    }
}
