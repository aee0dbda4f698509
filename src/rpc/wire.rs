//! JSON bodies exchanged with the coordinator
//!
//! Field names follow the coordinator's established JSON schema, which uses
//! Go-style exported names (`ImportPath`, `ProjectURL`, ...).

use crate::item::{CrawledPackage, CrawledPerson};
use serde::{Deserialize, Serialize};

/// Remote call names, one per coordinator operation
pub mod calls {
    pub const FETCH_PACKAGE_LIST: &str = "FetchPackageList";
    pub const FETCH_PERSON_LIST: &str = "FetchPersonList";
    pub const APPEND_PACKAGES: &str = "AppendPackages";
    pub const PUSH_PACKAGE: &str = "PushPackage";
    pub const PUSH_PERSON: &str = "PushPerson";
    pub const REPORT_BAD_PACKAGE: &str = "ReportBadPackage";
    pub const TOUCH_PACKAGE: &str = "TouchPackage";
}

#[derive(Debug, Serialize)]
pub struct CountRequest {
    #[serde(rename = "Count")]
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct PathRequest<'a> {
    #[serde(rename = "Path")]
    pub path: &'a str,
}

#[derive(Debug, Serialize)]
pub struct PathsRequest<'a> {
    #[serde(rename = "Paths")]
    pub paths: &'a [String],
}

/// Package record as the coordinator stores it
///
/// An absent readme is sent as two empty strings.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct PackageRecord {
    pub name: String,
    pub import_path: String,
    pub synopsis: String,
    pub doc: String,
    #[serde(rename = "ProjectURL")]
    pub project_url: String,
    pub star_count: u64,
    pub readme_fn: String,
    pub readme_data: String,
    pub imports: Vec<String>,
    pub references: Vec<String>,
}

impl From<&CrawledPackage> for PackageRecord {
    fn from(p: &CrawledPackage) -> Self {
        let (readme_fn, readme_data) = p
            .readme
            .as_ref()
            .map(|r| (r.filename.clone(), r.content.clone()))
            .unwrap_or_default();

        Self {
            name: p.name.clone(),
            import_path: p.import_path.clone(),
            synopsis: p.synopsis.clone(),
            doc: p.doc.clone(),
            project_url: p.project_url.clone(),
            star_count: p.star_count,
            readme_fn,
            readme_data,
            imports: p.imports.clone(),
            references: p.references.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct PersonRecord {
    pub id: String,
    pub packages: Vec<String>,
}

impl From<&CrawledPerson> for PersonRecord {
    fn from(p: &CrawledPerson) -> Self {
        Self {
            id: p.id.encode(),
            packages: p.packages.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PushPersonReply {
    #[serde(rename = "NewPackage", default)]
    pub new_package: bool,
}

/// Envelope of every coordinator reply
#[derive(Debug, Deserialize)]
pub struct Reply<T> {
    #[serde(default = "Option::default")]
    pub result: Option<T>,

    #[serde(default)]
    pub error: Option<String>,
}
