//! Engine query construction for each search mode.
//!
//! Every builder is a pure function of its inputs, so the same request
//! always produces the same query string.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Result, SearchError, SearchMode};

static DOMAIN_RE: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^([a-zA-Z0-9]([a-zA-Z0-9\-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z]{2,}$"));

const COMPANY_EXTENSIONS: [&str; 5] = ["contact", "about", "team", "staff", "employees"];

/// What a request is looking for, with the inputs of its mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SearchTarget {
    Simple { query: String },
    Company { company_name: String },
    Domain { domain: String },
    Full { full_name: String, domain: String },
}

impl SearchTarget {
    /// Returns the mode of this target.
    pub fn mode(&self) -> SearchMode {
        match self {
            Self::Simple { .. } => SearchMode::Simple,
            Self::Company { .. } => SearchMode::Company,
            Self::Domain { .. } => SearchMode::Domain,
            Self::Full { .. } => SearchMode::Full,
        }
    }

    /// The mode's input fields, trimmed, keyed by field name.
    pub fn inputs(&self) -> BTreeMap<String, String> {
        let fields: Vec<(&str, &str)> = match self {
            Self::Simple { query } => vec![("search_query", query.as_str())],
            Self::Company { company_name } => vec![("company_name", company_name.as_str())],
            Self::Domain { domain } => vec![("domain", domain.as_str())],
            Self::Full { full_name, domain } => {
                vec![("full_name", full_name.as_str()), ("domain", domain.as_str())]
            }
        };
        fields
            .into_iter()
            .map(|(key, value)| (key.to_string(), value.trim().to_string()))
            .collect()
    }

    /// Validates the inputs and builds the engine query string.
    pub fn build_query(&self) -> Result<String> {
        match self {
            Self::Simple { query } => build_simple_query(query),
            Self::Company { company_name } => {
                let name = require("company_name", company_name)?;
                Ok(build_company_name_query(name))
            }
            Self::Domain { domain } => {
                let domain = validate_domain(domain)?;
                Ok(build_domain_query(&domain))
            }
            Self::Full { full_name, domain } => {
                let name = require("full_name", full_name)?;
                let domain = validate_domain(domain)?;
                Ok(build_full_query(name, &domain))
            }
        }
    }
}

fn require<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(SearchError::InvalidQuery(format!("{} cannot be empty", field)));
    }
    Ok(value)
}

/// Strips an `http://` / `https://` prefix and trailing slashes.
pub fn clean_domain(domain: &str) -> &str {
    let domain = domain.trim();
    let domain = domain
        .strip_prefix("https://")
        .or_else(|| domain.strip_prefix("http://"))
        .unwrap_or(domain);
    domain.trim_end_matches('/')
}

/// Cleans a domain and checks it is a syntactically valid host name.
pub fn validate_domain(domain: &str) -> Result<String> {
    let cleaned = clean_domain(domain);
    let pattern = DOMAIN_RE
        .as_ref()
        .map_err(|e| SearchError::Other(format!("Invalid domain pattern: {}", e)))?;
    if !pattern.is_match(cleaned) {
        return Err(SearchError::InvalidQuery(format!(
            "Invalid domain name: '{}'",
            domain.trim()
        )));
    }
    Ok(cleaned.to_string())
}

/// Returns the raw query, trimmed.
pub fn build_simple_query(query: &str) -> Result<String> {
    require("query", query).map(str::to_string)
}

/// Builds a query matching the domain in text or any page hosted on it.
///
/// The result always ends with a `site:` filter for the domain.
pub fn build_domain_query(domain: &str) -> String {
    let domain = clean_domain(domain);
    format!(
        r#""{d}" OR "www.{d}" OR "https://{d}" OR "http://{d}" OR site:{d}"#,
        d = domain
    )
}

/// Builds a query for a company name plus its contact/team pages.
pub fn build_company_name_query(company_name: &str) -> String {
    let name = company_name.trim();
    let extended = COMPANY_EXTENSIONS
        .iter()
        .map(|ext| format!(r#""{} {}""#, name, ext))
        .collect::<Vec<_>>()
        .join(" OR ");
    format!(r#""{}" ({})"#, name, extended)
}

/// Builds a query aimed at a company's official website.
pub fn build_company_website_query(company_name: &str) -> String {
    format!(r#""{}" official website"#, company_name.trim())
}

/// Builds a query for a person at a domain, including likely email addresses.
pub fn build_full_query(full_name: &str, domain: &str) -> String {
    let full_name = full_name.trim();
    let domain = clean_domain(domain);

    let email_query = email_variations(full_name, domain)
        .iter()
        .map(|email| format!(r#""{}""#, email))
        .collect::<Vec<_>>()
        .join(" OR ");

    format!(r#""{}" "@{}" ({})"#, full_name, domain, email_query)
}

/// Builds a query to discover the email address format used at a domain.
pub fn build_email_pattern_query(name_parts: &[&str], domain: &str) -> String {
    let domain = clean_domain(domain);
    if name_parts.len() < 2 {
        return format!(r#""@{}" email"#, domain);
    }

    let first = name_parts[0].to_lowercase();
    let last = name_parts[name_parts.len() - 1].to_lowercase();
    let fi = initial(&first);
    let li = initial(&last);

    format!(
        r#""@{d}" AND ("email pattern" OR "email format" OR "{f}*{l}@{d}" OR "{l}*{f}@{d}" OR "{fi}*{l}@{d}" OR "{li}*{f}@{d}")"#,
        d = domain,
        f = first,
        l = last,
        fi = fi,
        li = li
    )
}

fn initial(name: &str) -> String {
    name.chars().next().map(|c| c.to_lowercase().to_string()).unwrap_or_default()
}

/// Candidate email addresses for a name at a domain.
///
/// Only the first and last whitespace-separated tokens are used; middle
/// names are ignored.
pub fn email_variations(full_name: &str, domain: &str) -> Vec<String> {
    let parts: Vec<&str> = full_name.split_whitespace().collect();
    let (first, last) = match parts.as_slice() {
        [] => (String::new(), String::new()),
        [only] => (only.to_lowercase(), String::new()),
        [first, .., last] => (first.to_lowercase(), last.to_lowercase()),
    };
    let fi = initial(&first);
    let li = initial(&last);
    let d = domain;

    let mut emails = Vec::new();

    if !first.is_empty() && !last.is_empty() {
        emails.extend([
            format!("{first}@{d}"),
            format!("{first}.{last}@{d}"),
            format!("{first}{last}@{d}"),
            format!("{fi}{last}@{d}"),
            format!("{fi}.{last}@{d}"),
            format!("{last}.{first}@{d}"),
            format!("{last}{first}@{d}"),
            format!("{first}_{last}@{d}"),
            format!("{last}_{first}@{d}"),
            format!("{first}-{last}@{d}"),
            format!("{last}-{first}@{d}"),
            format!("{last}@{d}"),
            format!("{fi}{li}@{d}"),
            format!("{fi}.{li}@{d}"),
            format!("{first}.{last}.{d}@gmail.com"),
            format!("{first}{last}.{d}@gmail.com"),
        ]);
    } else if !first.is_empty() {
        emails.extend([format!("{first}@{d}"), format!("{fi}@{d}")]);
    }

    if !first.is_empty() {
        emails.extend([
            format!("office+{first}@{d}"),
            format!("contact+{first}@{d}"),
            format!("info+{first}@{d}"),
        ]);
    }

    emails
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_domain_strips_scheme_and_slash() {
        assert_eq!(clean_domain("https://example.com/"), "example.com");
        assert_eq!(clean_domain("http://example.com//"), "example.com");
        assert_eq!(clean_domain("example.com"), "example.com");
    }

    #[test]
    fn test_validate_domain_accepts_subdomains() {
        assert_eq!(validate_domain("mail.example.co.uk").unwrap(), "mail.example.co.uk");
        assert_eq!(validate_domain("https://example.com/").unwrap(), "example.com");
    }

    #[test]
    fn test_validate_domain_rejects_garbage() {
        for bad in ["", "localhost", "exa mple.com", "-bad.com", "example.c", "example.com/path"] {
            assert!(
                matches!(validate_domain(bad), Err(SearchError::InvalidQuery(_))),
                "expected '{}' to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_domain_pattern_compiles_once() {
        assert!(DOMAIN_RE.is_ok());
        for _ in 0..3 {
            assert_eq!(validate_domain("acme.io").unwrap(), "acme.io");
        }
    }

    #[test]
    fn test_simple_query_is_passed_through() {
        assert_eq!(build_simple_query("  rust async  ").unwrap(), "rust async");
        assert!(build_simple_query("   ").is_err());
    }

    #[test]
    fn test_domain_query_ends_with_site_filter() {
        let query = build_domain_query("impulsenotion.com");
        assert_eq!(
            query,
            r#""impulsenotion.com" OR "www.impulsenotion.com" OR "https://impulsenotion.com" OR "http://impulsenotion.com" OR site:impulsenotion.com"#
        );
        assert!(query.ends_with("site:impulsenotion.com"));
    }

    #[test]
    fn test_domain_query_strips_scheme() {
        let query = build_domain_query("https://example.com/");
        assert!(query.ends_with("site:example.com"));
        assert!(!query.contains("https://https://"));
    }

    #[test]
    fn test_company_name_query() {
        let query = build_company_name_query(" Impulse Notion ");
        assert_eq!(
            query,
            r#""Impulse Notion" ("Impulse Notion contact" OR "Impulse Notion about" OR "Impulse Notion team" OR "Impulse Notion staff" OR "Impulse Notion employees")"#
        );
    }

    #[test]
    fn test_company_website_query() {
        assert_eq!(
            build_company_website_query("Acme"),
            r#""Acme" official website"#
        );
    }

    #[test]
    fn test_email_variations_first_and_last() {
        let emails = email_variations("Jane Q Doe", "acme.io");
        assert_eq!(emails.len(), 19);
        assert_eq!(emails[0], "jane@acme.io");
        assert_eq!(emails[1], "jane.doe@acme.io");
        assert_eq!(emails[3], "jdoe@acme.io");
        assert_eq!(emails[12], "jd@acme.io");
        assert_eq!(emails[14], "jane.doe.acme.io@gmail.com");
        assert_eq!(emails[18], "info+jane@acme.io");
        assert!(!emails.iter().any(|e| e.contains('q')));
    }

    #[test]
    fn test_email_variations_single_name() {
        let emails = email_variations("Sylia", "acme.io");
        assert_eq!(
            emails,
            vec![
                "sylia@acme.io",
                "s@acme.io",
                "office+sylia@acme.io",
                "contact+sylia@acme.io",
                "info+sylia@acme.io",
            ]
        );
    }

    #[test]
    fn test_email_variations_empty_name() {
        assert!(email_variations("   ", "acme.io").is_empty());
    }

    #[test]
    fn test_full_query_combines_name_and_domain() {
        let query = build_full_query("Jane Doe", "https://acme.io/");
        assert!(query.starts_with(r#""Jane Doe" "@acme.io" ("jane@acme.io" OR "jane.doe@acme.io""#));
        assert!(query.ends_with(r#""info+jane@acme.io")"#));
    }

    #[test]
    fn test_full_query_is_deterministic() {
        assert_eq!(
            build_full_query("Jane Doe", "acme.io"),
            build_full_query("Jane Doe", "acme.io")
        );
    }

    #[test]
    fn test_email_pattern_query() {
        assert_eq!(build_email_pattern_query(&["Jane"], "acme.io"), r#""@acme.io" email"#);
        assert_eq!(
            build_email_pattern_query(&["Jane", "Doe"], "acme.io"),
            r#""@acme.io" AND ("email pattern" OR "email format" OR "jane*doe@acme.io" OR "doe*jane@acme.io" OR "j*doe@acme.io" OR "d*jane@acme.io")"#
        );
    }

    #[test]
    fn test_target_build_query_per_mode() {
        let simple = SearchTarget::Simple { query: "rust".into() };
        assert_eq!(simple.mode(), SearchMode::Simple);
        assert_eq!(simple.build_query().unwrap(), "rust");

        let domain = SearchTarget::Domain { domain: "acme.io".into() };
        assert_eq!(domain.mode(), SearchMode::Domain);
        assert!(domain.build_query().unwrap().ends_with("site:acme.io"));

        let company = SearchTarget::Company { company_name: "Acme".into() };
        assert_eq!(company.mode(), SearchMode::Company);
        assert!(company.build_query().unwrap().starts_with(r#""Acme" ("#));

        let full = SearchTarget::Full {
            full_name: "Jane Doe".into(),
            domain: "acme.io".into(),
        };
        assert_eq!(full.mode(), SearchMode::Full);
        assert!(full.build_query().unwrap().contains(r#""@acme.io""#));
    }

    #[test]
    fn test_target_rejects_invalid_input() {
        let bad_domain = SearchTarget::Domain { domain: "not a domain".into() };
        assert!(matches!(bad_domain.build_query(), Err(SearchError::InvalidQuery(_))));

        let empty_name = SearchTarget::Full {
            full_name: " ".into(),
            domain: "acme.io".into(),
        };
        assert!(matches!(empty_name.build_query(), Err(SearchError::InvalidQuery(_))));

        let empty_company = SearchTarget::Company { company_name: "".into() };
        assert!(matches!(empty_company.build_query(), Err(SearchError::InvalidQuery(_))));
    }

    #[test]
    fn test_target_inputs() {
        let full = SearchTarget::Full {
            full_name: " Jane Doe ".into(),
            domain: "acme.io".into(),
        };
        let inputs = full.inputs();
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs["full_name"], "Jane Doe");
        assert_eq!(inputs["domain"], "acme.io");

        let simple = SearchTarget::Simple { query: "rust".into() };
        assert_eq!(simple.inputs()["search_query"], "rust");
    }

    #[test]
    fn test_target_deserializes_tagged() {
        let json = r#"{"mode":"full","full_name":"Jane Doe","domain":"acme.io"}"#;
        let target: SearchTarget = serde_json::from_str(json).unwrap();
        assert_eq!(
            target,
            SearchTarget::Full {
                full_name: "Jane Doe".into(),
                domain: "acme.io".into()
            }
        );
    }
}
