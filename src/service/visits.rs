use chrono::Utc;
use uuid::Uuid;

use crate::error::Result;
use crate::store::Store;
use crate::types::SiteVisit;

const MAX_IP_LEN: usize = 512;
const MAX_USER_AGENT_LEN: usize = 512;
const MAX_PATH_LEN: usize = 255;
const MAX_REFERRER_LEN: usize = 512;

#[derive(Debug, Clone, Default)]
pub struct VisitInput {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub path: Option<String>,
    pub referrer: Option<String>,
}

/// Trims, maps blank to `None` and caps the length in characters.
fn trim_to(value: Option<&str>, max_len: usize) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    Some(value.chars().take(max_len).collect())
}

/// First hop of `X-Forwarded-For`, else the peer address.
#[must_use]
pub fn client_ip(forwarded_for: Option<&str>, peer: Option<&str>) -> Option<String> {
    match forwarded_for {
        Some(forwarded) => trim_to(forwarded.split(',').next(), MAX_IP_LEN),
        None => trim_to(peer, MAX_IP_LEN),
    }
}

pub fn record_visit(store: &dyn Store, input: VisitInput) -> Result<SiteVisit> {
    let visit = SiteVisit {
        id: Uuid::new_v4().to_string(),
        ip_address: trim_to(input.ip_address.as_deref(), MAX_IP_LEN),
        user_agent: trim_to(input.user_agent.as_deref(), MAX_USER_AGENT_LEN),
        path: trim_to(input.path.as_deref(), MAX_PATH_LEN),
        referrer: trim_to(input.referrer.as_deref(), MAX_REFERRER_LEN),
        created_at: Utc::now(),
    };
    store.create_site_visit(&visit)?;
    Ok(visit)
}

pub fn count_visits(store: &dyn Store) -> Result<i64> {
    store.count_site_visits()
}
