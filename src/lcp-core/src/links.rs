//! Link collections shared by the License and Status Documents.
//!
//! Both documents expose a `links` array whose entries are looked up by
//! relation name. Status Document links may be templated (the `register`
//! link carries `{?id,name}` style query templates); templated hrefs are
//! expanded with caller-supplied parameters before use.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

/// Relation names used by the documents.
pub mod rel {
    /// Hint page for recovering a forgotten passphrase.
    pub const HINT: &str = "hint";
    /// The protected publication itself.
    pub const PUBLICATION: &str = "publication";
    /// Status Document for this license.
    pub const STATUS: &str = "status";
    /// Fresh copy of the License Document.
    pub const LICENSE: &str = "license";
    /// Device registration endpoint.
    pub const REGISTER: &str = "register";
    /// Loan return endpoint.
    pub const RETURN: &str = "return";
    /// Loan renewal endpoint.
    pub const RENEW: &str = "renew";
    /// Canonical location of the document.
    pub const SELF: &str = "self";
}

/// A hypermedia link from a License or Status Document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Target of the link. A URI template when `templated` is set.
    pub href: String,

    /// Relation names. The wire form is a string or an array of strings.
    #[serde(deserialize_with = "string_or_seq", default)]
    pub rel: Vec<String>,

    /// Expected media type of the target.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,

    /// Whether `href` is a URI template.
    #[serde(default)]
    pub templated: bool,

    /// Human-readable title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Encryption profile the target complies with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
}

impl Link {
    /// Check whether this link carries the given relation.
    #[must_use]
    pub fn has_rel(&self, rel: &str) -> bool {
        self.rel.iter().any(|r| r == rel)
    }

    /// Resolved URL of a non-templated link.
    ///
    /// # Errors
    ///
    /// Returns the parse error when `href` is not an absolute URL.
    pub fn url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.href)
    }

    /// Expand a templated href with the given query parameters and parse
    /// the result. Non-templated links ignore `params`.
    ///
    /// Only the `{?name,...}` query-expansion form is handled, which is
    /// the only form Status Document servers emit.
    ///
    /// # Errors
    ///
    /// Returns the parse error when the expanded href is not a valid URL.
    pub fn url_with_params<'a, I>(&self, params: I) -> Result<Url, url::ParseError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        if !self.templated {
            return self.url();
        }

        let base = match self.href.find("{?") {
            Some(idx) => &self.href[..idx],
            None => self.href.as_str(),
        };

        let mut url = Url::parse(base)?;
        url.query_pairs_mut().extend_pairs(params);
        Ok(url)
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.href)
    }
}

/// Ordered collection of links, looked up by relation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Links(Vec<Link>);

impl Links {
    /// First link carrying the given relation, in document order.
    #[must_use]
    pub fn first_with_rel(&self, rel: &str) -> Option<&Link> {
        self.0.iter().find(|link| link.has_rel(rel))
    }

    /// All links carrying the given relation, in document order.
    pub fn all_with_rel<'a>(&'a self, rel: &'a str) -> impl Iterator<Item = &'a Link> {
        self.0.iter().filter(move |link| link.has_rel(rel))
    }

    /// Iterate over every link in document order.
    pub fn iter(&self) -> impl Iterator<Item = &Link> {
        self.0.iter()
    }

    /// Number of links in the collection.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Validate that every non-templated href parses as an absolute URL.
    ///
    /// # Errors
    ///
    /// Returns the offending href on the first failure.
    pub fn check_hrefs(&self) -> Result<(), String> {
        for link in &self.0 {
            if !link.templated && link.url().is_err() {
                return Err(link.href.clone());
            }
        }
        Ok(())
    }
}

impl From<Vec<Link>> for Links {
    fn from(links: Vec<Link>) -> Self {
        Self(links)
    }
}

/// Accept `"rel": "status"` and `"rel": ["status", "self"]` alike.
fn string_or_seq<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(rel) => vec![rel],
        OneOrMany::Many(rels) => rels,
    })
}
