//! Field normalization for deduplication comparison

use lazy_static::lazy_static;
use listing_domain::{Field, Record, RecordId};
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref PUNCTUATION: Regex = Regex::new(r"[^\p{L}\p{N}\s]+").unwrap();
}

/// Legal-form tokens that carry no identity
const LEGAL_SUFFIXES: &[&str] = &[
    "ltd",
    "limited",
    "inc",
    "incorporated",
    "corp",
    "corporation",
    "co",
    "company",
    "llc",
    "plc",
];

const ADDRESS_ABBREVIATIONS: &[(&str, &str)] = &[
    ("st", "street"),
    ("rd", "road"),
    ("ave", "avenue"),
    ("av", "avenue"),
    ("blvd", "boulevard"),
    ("dr", "drive"),
    ("ln", "lane"),
    ("ct", "court"),
    ("pl", "place"),
    ("hwy", "highway"),
    ("pkwy", "parkway"),
    ("sq", "square"),
    ("cres", "crescent"),
    ("ter", "terrace"),
    ("mt", "mount"),
    ("apt", "apartment"),
    ("ste", "suite"),
    ("bldg", "building"),
];

/// Comparison-ready view of a [`Record`]
///
/// Lives only for the duration of one pass. Absent fields normalize to the
/// empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    pub id: RecordId,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub website: String,
    /// Last comma-separated address segment, used for blocking
    pub city: String,
}

impl NormalizedRecord {
    /// Canonical value of a comparable field ("" for anything else)
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::Address => &self.address,
            Field::Phone => &self.phone,
            Field::Email => &self.email,
            Field::Website => &self.website,
            _ => "",
        }
    }

    pub fn has(&self, field: Field) -> bool {
        !self.get(field).is_empty()
    }

    pub fn has_comparable_fields(&self) -> bool {
        Field::COMPARABLE.iter().any(|f| self.has(*f))
    }

    pub fn name_tokens(&self) -> impl Iterator<Item = &str> {
        self.name.split_whitespace()
    }
}

/// Normalize every comparable field of a record. Never fails.
pub fn normalize(record: &Record) -> NormalizedRecord {
    NormalizedRecord {
        id: record.id.clone(),
        name: normalize_name(&record.name),
        address: normalize_address(&record.address),
        phone: normalize_phone(&record.phone),
        email: normalize_email(&record.email),
        website: normalize_website(&record.website),
        city: extract_city(&record.address),
    }
}

/// Business name: punctuation dropped, legal-form suffixes removed
pub fn normalize_name(name: &str) -> String {
    let folded = fold(name).replace(['\'', '\u{2019}'], "").replace('&', " and ");
    let cleaned = PUNCTUATION.replace_all(&folded, " ");

    let tokens: Vec<&str> = cleaned.split_whitespace().collect();
    let kept: Vec<&str> = tokens
        .iter()
        .copied()
        .filter(|t| !LEGAL_SUFFIXES.contains(t))
        .collect();

    // A name made only of legal-form words keeps them
    if kept.is_empty() {
        tokens.join(" ")
    } else {
        kept.join(" ")
    }
}

/// Street address: punctuation dropped, common abbreviations expanded
pub fn normalize_address(address: &str) -> String {
    let folded = fold(address);
    let cleaned = PUNCTUATION.replace_all(&folded, " ");

    cleaned
        .split_whitespace()
        .map(expand_abbreviation)
        .collect::<Vec<_>>()
        .join(" ")
}

fn expand_abbreviation(token: &str) -> &str {
    ADDRESS_ABBREVIATIONS
        .iter()
        .find(|(abbrev, _)| *abbrev == token)
        .map(|(_, full)| *full)
        .unwrap_or(token)
}

/// Phone number reduced to its national digits
pub fn normalize_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    // +1 country code on an 11-digit NANP number
    if digits.len() == 11 && digits.starts_with('1') {
        return digits[1..].to_string();
    }

    digits
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Website without scheme, `www.` prefix or trailing slash
pub fn normalize_website(website: &str) -> String {
    let mut value = website.trim().to_lowercase();

    for scheme in ["https://", "http://"] {
        if let Some(rest) = value.strip_prefix(scheme) {
            value = rest.to_string();
            break;
        }
    }
    if let Some(rest) = value.strip_prefix("www.") {
        value = rest.to_string();
    }

    value.trim_end_matches('/').to_string()
}

/// City segment of an address, empty when the address has no comma
pub fn extract_city(address: &str) -> String {
    if !address.contains(',') {
        return String::new();
    }

    address
        .rsplit(',')
        .map(normalize_address)
        .find(|segment| !segment.is_empty())
        .unwrap_or_default()
}

/// Unicode fold + lowercase + collapse whitespace
fn fold(value: &str) -> String {
    let decomposed: String = value.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    collapse_whitespace(&decomposed.to_lowercase())
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
