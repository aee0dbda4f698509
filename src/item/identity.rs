use crate::MalformedIdentity;
use std::fmt;
use std::str::FromStr;

/// Separator between site and username in a person identity
pub const SEPARATOR: char = ':';

/// Identity of a person on a code hosting site
///
/// The canonical string form is `<site>:<username>`. No normalization is
/// applied to either part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PersonId {
    /// Hosting site, e.g. `github.com`
    pub site: String,

    /// Account name on that site
    pub username: String,
}

impl PersonId {
    /// Creates a person identity from its parts
    pub fn new(site: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            username: username.into(),
        }
    }

    /// Returns the canonical `site:username` form
    pub fn encode(&self) -> String {
        encode(&self.site, &self.username)
    }
}

/// Encodes a person identity as `site:username`
///
/// # Examples
///
/// ```
/// use crawl_agent::item::encode;
///
/// assert_eq!(encode("github.com", "torvalds"), "github.com:torvalds");
/// ```
pub fn encode(site: &str, username: &str) -> String {
    format!("{}{}{}", site, SEPARATOR, username)
}

/// Decodes a `site:username` identity
///
/// Splits on the first separator only, so a username may itself contain `:`.
///
/// # Returns
///
/// * `Ok(PersonId)` - The decoded identity
/// * `Err(MalformedIdentity)` - The input has no separator
///
/// # Examples
///
/// ```
/// use crawl_agent::item::decode;
///
/// let id = decode("github.com:torvalds").unwrap();
/// assert_eq!(id.site, "github.com");
/// assert_eq!(id.username, "torvalds");
///
/// assert!(decode("torvalds").is_err());
/// ```
pub fn decode(id: &str) -> Result<PersonId, MalformedIdentity> {
    id.split_once(SEPARATOR)
        .map(|(site, username)| PersonId::new(site, username))
        .ok_or_else(|| MalformedIdentity(id.to_string()))
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.site, SEPARATOR, self.username)
    }
}

impl FromStr for PersonId {
    type Err = MalformedIdentity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s)
    }
}
