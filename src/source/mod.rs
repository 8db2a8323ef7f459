//! Source enumeration.
//!
//! A source group is a (term, meeting category) pair. Each group has a
//! listing endpoint that answers with a comma-separated list of vote file
//! names; each name maps to a document URI under a fixed path template.

use crate::error::FetchError;
use crate::fetch::Fetch;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};
use url::Url;

/// Locale path segment of every document URI.
pub const LOCALE_SEGMENT: &str = "chinese";

/// Meeting category of a source group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Meeting {
    /// Council meeting (`cm`)
    Council,
    /// House Committee (`hc`)
    HouseCommittee,
    /// Finance Committee (`fc`)
    FinanceCommittee,
    /// Establishment Subcommittee (`esc`)
    EstablishmentSubcommittee,
    /// Public Works Subcommittee (`pwsc`)
    PublicWorksSubcommittee,
    /// Any other category code, kept verbatim.
    Other(String),
}

impl Meeting {
    /// Category code as used in listing queries and file name prefixes.
    pub fn code(&self) -> &str {
        match self {
            Meeting::Council => "cm",
            Meeting::HouseCommittee => "hc",
            Meeting::FinanceCommittee => "fc",
            Meeting::EstablishmentSubcommittee => "esc",
            Meeting::PublicWorksSubcommittee => "pwsc",
            Meeting::Other(code) => code,
        }
    }

    /// Folder holding this category's vote files.
    ///
    /// Unknown categories fall back to the council meeting folder. This
    /// mirrors what the upstream site's own script does; it is not derived
    /// from the code.
    pub fn folder(&self) -> &'static str {
        match self {
            Meeting::Council => "counmtg/voting",
            Meeting::HouseCommittee => "hc/voting",
            Meeting::FinanceCommittee => "fc/fc/results",
            Meeting::EstablishmentSubcommittee => "fc/esc/results",
            Meeting::PublicWorksSubcommittee => "fc/pwsc/results",
            Meeting::Other(_) => "counmtg/voting",
        }
    }

    /// The five categories published upstream, in canonical order.
    pub fn known() -> [Meeting; 5] {
        [
            Meeting::Council,
            Meeting::HouseCommittee,
            Meeting::FinanceCommittee,
            Meeting::EstablishmentSubcommittee,
            Meeting::PublicWorksSubcommittee,
        ]
    }
}

impl From<&str> for Meeting {
    fn from(code: &str) -> Self {
        match code.trim().to_lowercase().as_str() {
            "cm" => Meeting::Council,
            "hc" => Meeting::HouseCommittee,
            "fc" => Meeting::FinanceCommittee,
            "esc" => Meeting::EstablishmentSubcommittee,
            "pwsc" => Meeting::PublicWorksSubcommittee,
            other => Meeting::Other(other.to_string()),
        }
    }
}

impl From<String> for Meeting {
    fn from(code: String) -> Self {
        Meeting::from(code.as_str())
    }
}

impl From<Meeting> for String {
    fn from(meeting: Meeting) -> Self {
        meeting.code().to_string()
    }
}

impl FromStr for Meeting {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Meeting::from(s))
    }
}

impl fmt::Display for Meeting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// One listing endpoint to enumerate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceGroup {
    /// Legislative term / session, e.g. `yr17-18`.
    pub term: String,
    /// Meeting category.
    pub meeting: Meeting,
}

impl SourceGroup {
    pub fn new(term: &str, meeting: Meeting) -> Self {
        Self {
            term: term.trim().to_string(),
            meeting,
        }
    }

    /// Derive a group from a listing URL's `term` and `meeting` query
    /// parameters.
    pub fn from_listing_url(listing: &str) -> Result<Self> {
        let url = Url::parse(listing).map_err(|e| anyhow!("Invalid listing URL {}: {}", listing, e))?;

        let param = |name: &str| {
            url.query_pairs()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.into_owned())
                .filter(|value| !value.is_empty())
        };

        let term = param("term")
            .ok_or_else(|| anyhow!("Listing URL {} has no 'term' parameter", listing))?;
        let meeting = param("meeting")
            .ok_or_else(|| anyhow!("Listing URL {} has no 'meeting' parameter", listing))?;

        Ok(Self::new(&term, Meeting::from(meeting)))
    }

    /// Every combination of `terms` × `meetings`, meeting-major.
    pub fn cross(terms: &[String], meetings: &[Meeting]) -> Vec<Self> {
        meetings
            .iter()
            .flat_map(|meeting| terms.iter().map(move |term| Self::new(term, meeting.clone())))
            .collect()
    }
}

impl fmt::Display for SourceGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.term, self.meeting)
    }
}

/// Builds listing and document URIs and enumerates a group's documents.
#[derive(Debug, Clone)]
pub struct SourceEnumerator {
    root_url: String,
    listing_url: String,
    file_suffix: String,
}

impl SourceEnumerator {
    pub fn new(root_url: &str, listing_url: &str, file_suffix: &str) -> Self {
        Self {
            root_url: root_url.trim_end_matches('/').to_string(),
            listing_url: listing_url.to_string(),
            file_suffix: file_suffix.to_string(),
        }
    }

    /// Listing endpoint for a group.
    pub fn listing_uri(&self, group: &SourceGroup) -> Result<String, FetchError> {
        let url = Url::parse_with_params(
            &self.listing_url,
            &[("term", group.term.as_str()), ("meeting", group.meeting.code())],
        )
        .map_err(|source| FetchError::InvalidUrl {
            url: self.listing_url.clone(),
            source,
        })?;
        Ok(url.into())
    }

    /// File names from a listing body, in listing order.
    pub fn parse_listing(&self, body: &str) -> Vec<String> {
        body.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty() && name.ends_with(&self.file_suffix))
            .map(String::from)
            .collect()
    }

    /// Document URI for one listed file.
    pub fn document_uri(&self, group: &SourceGroup, filename: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}_vote_{}",
            self.root_url,
            group.term,
            LOCALE_SEGMENT,
            group.meeting.folder(),
            group.meeting.code(),
            filename
        )
    }

    /// Fetch a group's listing and return its document URIs.
    pub async fn enumerate<F: Fetch>(
        &self,
        fetcher: &F,
        group: &SourceGroup,
    ) -> Result<Vec<String>, FetchError> {
        let listing = self.listing_uri(group)?;
        info!("Listing {} ({})", group, listing);

        let body = fetcher.fetch(&listing).await?;
        let files = self.parse_listing(&body);
        debug!("{} lists {} vote files", group, files.len());

        Ok(files
            .iter()
            .map(|file| self.document_uri(group, file))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StaticFetcher;

    fn enumerator() -> SourceEnumerator {
        SourceEnumerator::new(
            "https://www.legco.gov.hk/",
            "https://www.legco.gov.hk/php/detect-votes.php",
            ".xml",
        )
    }

    #[test]
    fn test_meeting_folders() {
        assert_eq!(Meeting::from("cm").folder(), "counmtg/voting");
        assert_eq!(Meeting::from("hc").folder(), "hc/voting");
        assert_eq!(Meeting::from("fc").folder(), "fc/fc/results");
        assert_eq!(Meeting::from("esc").folder(), "fc/esc/results");
        assert_eq!(Meeting::from("PWSC").folder(), "fc/pwsc/results");
    }

    #[test]
    fn test_unknown_meeting_falls_back() {
        let meeting = Meeting::from("sc");
        assert_eq!(meeting, Meeting::Other("sc".to_string()));
        assert_eq!(meeting.code(), "sc");
        assert_eq!(meeting.folder(), "counmtg/voting");
    }

    #[test]
    fn test_meeting_serde_as_code() {
        let group = SourceGroup::new("yr17-18", Meeting::EstablishmentSubcommittee);
        let json = serde_json::to_string(&group).unwrap();
        assert_eq!(json, r#"{"term":"yr17-18","meeting":"esc"}"#);
        let back: SourceGroup = serde_json::from_str(&json).unwrap();
        assert_eq!(back, group);
    }

    #[test]
    fn test_from_listing_url() {
        let group = SourceGroup::from_listing_url(
            "https://www.legco.gov.hk/php/detect-votes.php?term=yr16-17&meeting=fc",
        )
        .unwrap();
        assert_eq!(group, SourceGroup::new("yr16-17", Meeting::FinanceCommittee));

        assert!(SourceGroup::from_listing_url("https://www.legco.gov.hk/?term=yr16-17").is_err());
        assert!(SourceGroup::from_listing_url("not a url").is_err());
    }

    #[test]
    fn test_cross_is_meeting_major() {
        let terms = vec!["yr16-17".to_string(), "yr17-18".to_string()];
        let groups = SourceGroup::cross(&terms, &[Meeting::Council, Meeting::HouseCommittee]);
        let labels: Vec<String> = groups.iter().map(|g| g.to_string()).collect();
        assert_eq!(
            labels,
            vec!["yr16-17/cm", "yr17-18/cm", "yr16-17/hc", "yr17-18/hc"]
        );
    }

    #[test]
    fn test_listing_uri() {
        let group = SourceGroup::new("yr18-19", Meeting::PublicWorksSubcommittee);
        assert_eq!(
            enumerator().listing_uri(&group).unwrap(),
            "https://www.legco.gov.hk/php/detect-votes.php?term=yr18-19&meeting=pwsc"
        );
    }

    #[test]
    fn test_parse_listing_filters_suffix() {
        let files = enumerator().parse_listing("20171018.xml, 20171019.pdf,,20171025.xml\n");
        assert_eq!(files, vec!["20171018.xml", "20171025.xml"]);
        assert!(enumerator().parse_listing("").is_empty());
    }

    #[test]
    fn test_document_uri_template() {
        let group = SourceGroup::new("yr17-18", Meeting::FinanceCommittee);
        assert_eq!(
            enumerator().document_uri(&group, "20180614.xml"),
            "https://www.legco.gov.hk/yr17-18/chinese/fc/fc/results/fc_vote_20180614.xml"
        );
    }

    #[test]
    fn test_enumerate() {
        let listing = "https://www.legco.gov.hk/php/detect-votes.php?term=yr16-17&meeting=cm";
        let fetcher = StaticFetcher::default().with_page(listing, "20161012.xml,20161013.xml");
        let group = SourceGroup::new("yr16-17", Meeting::Council);

        let uris = tokio_test::block_on(enumerator().enumerate(&fetcher, &group)).unwrap();
        assert_eq!(
            uris,
            vec![
                "https://www.legco.gov.hk/yr16-17/chinese/counmtg/voting/cm_vote_20161012.xml",
                "https://www.legco.gov.hk/yr16-17/chinese/counmtg/voting/cm_vote_20161013.xml",
            ]
        );
    }

    #[test]
    fn test_enumerate_listing_failure() {
        let fetcher = StaticFetcher::default();
        let group = SourceGroup::new("yr16-17", Meeting::Council);
        let result = tokio_test::block_on(enumerator().enumerate(&fetcher, &group));
        assert!(matches!(result, Err(FetchError::Status { status: 404, .. })));
    }
}
