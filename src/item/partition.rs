//! Host partitioning of work batches
//!
//! Items are grouped by the host they will be fetched from. Each group is
//! crawled sequentially by a single worker, which bounds the number of
//! concurrent requests any one host receives.

use crate::item::WorkItem;
use std::collections::BTreeMap;
use url::Url;

/// Work items grouped by host, in original relative order within each group
pub type HostGroups = BTreeMap<String, Vec<WorkItem>>;

/// Derives the host of a package import path
///
/// The path is parsed as `http://<path>`. A path that does not parse yields
/// the empty string, so such packages still land in a (shared) group.
///
/// The host is the normalised one: letters are lowercased and the default
/// port 80 is dropped. `A.com/x` and `a.com:80/x` are fetched from the same
/// server and therefore share a group.
///
/// # Examples
///
/// ```
/// use crawl_agent::item::package_host;
///
/// assert_eq!(package_host("github.com/user/repo"), "github.com");
/// assert_eq!(package_host("example.com:8080/pkg"), "example.com:8080");
/// ```
pub fn package_host(path: &str) -> String {
    let Ok(url) = Url::parse(&format!("http://{}", path)) else {
        return String::new();
    };

    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    }
}

/// Partitions a batch into host groups
///
/// Every item appears in exactly one group; nothing is dropped or duplicated.
pub fn partition<I>(items: I) -> HostGroups
where
    I: IntoIterator<Item = WorkItem>,
{
    let mut groups = HostGroups::new();
    for item in items {
        groups.entry(item.host()).or_default().push(item);
    }
    groups
}
