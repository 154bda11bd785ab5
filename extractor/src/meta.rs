use regex::bytes::Regex;
use serde::Serialize;

lazy_static::lazy_static! {
    static ref REASON_REGEX: Regex = meta_regex("Reason");
    static ref CONTACT_INFO_REGEX: Regex = meta_regex("ContactInfo");
    static ref LOCATION_REGEX: Regex = meta_regex("Location");
    static ref NAME_REGEX: Regex = meta_regex("Name");
}

fn meta_regex(key: &str) -> Regex {
    Regex::new(&format!(r"(?-u)/{}\s*\(([\w.\s@,]*)", key)).unwrap()
}

/// Free text the signer put in the signature dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureMeta {
    pub reason: Option<String>,
    pub contact_info: Option<String>,
    pub location: Option<String>,
    pub name: Option<String>,
}

impl SignatureMeta {
    /// Takes the last occurrence of each key in `signed_data`, which for an
    /// incremental update is the newest signature dictionary.
    pub fn scrape(signed_data: &[u8]) -> Self {
        SignatureMeta {
            reason: last_match(&REASON_REGEX, signed_data),
            contact_info: last_match(&CONTACT_INFO_REGEX, signed_data),
            location: last_match(&LOCATION_REGEX, signed_data),
            name: last_match(&NAME_REGEX, signed_data),
        }
    }
}

fn last_match(regex: &Regex, haystack: &[u8]) -> Option<String> {
    regex
        .captures_iter(haystack)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned())
}
