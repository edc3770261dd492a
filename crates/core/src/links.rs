//! Dashboard link extraction.
//!
//! A shared Grafana link looks like
//! `https://grafana.example.com/d/<uid>/<slug>?orgId=2&from=now-6h`. The part
//! from `/d/` onwards is the route the renderer screenshots; `<uid>` names the
//! dashboard.

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use crate::dashboard::DashboardUid;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DashboardLink {
    pub render_path: String,
    pub uid: DashboardUid,
    pub org_id: Option<i64>,
}

fn dashboard_path_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r".*(/d/([^/]*)/.*)").expect("dashboard path pattern"))
}

/// Returns the render path and dashboard UID of a shared dashboard URL, or
/// `None` when the URL does not point at a `/d/<uid>/...` route.
///
/// The leading `.*` is greedy, so when several `/d/` segments appear the last
/// one wins.
pub fn extract_url_info(dashboard_url: &str) -> Option<DashboardLink> {
    let captures = dashboard_path_pattern().captures(dashboard_url)?;
    let render_path = captures.get(1)?.as_str().to_owned();
    let uid = captures.get(2)?.as_str().to_owned();

    Some(DashboardLink {
        render_path,
        uid: DashboardUid(uid),
        org_id: org_id_from_url(dashboard_url),
    })
}

fn org_id_from_url(dashboard_url: &str) -> Option<i64> {
    let parsed = Url::parse(dashboard_url).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "orgId")
        .and_then(|(_, value)| value.parse::<i64>().ok())
        .filter(|org_id| *org_id > 0)
}
