//! Live evidence lookups for the buddy endpoint: NHS website content (key-gated),
//! MedlinePlus health topics and PubMed.
//!
//! Every lookup is best effort. Network errors, non-2xx responses and unparseable bodies
//! all collapse to "nothing found" and are logged at `debug`.

use crate::citations::{cite, Citation};
use async_trait::async_trait;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(8);
pub const NHS_CONTENT_BASE: &str = "https://api.service.nhs.uk/nhs-website-content";
const NHS_SEARCH: &str = "https://www.nhs.uk/search/results";
const MEDLINEPLUS_SEARCH: &str = "https://wsearch.nlm.nih.gov/ws/query";
const EUTILS_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
const PUBMED_MAX_IDS: usize = 3;

/// Plain-language summary of a health topic with its source citation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceSummary {
    pub title: String,
    pub summary: String,
    pub citation: Option<Citation>,
}

#[async_trait]
pub trait EvidenceLookup: Send + Sync {
    /// NHS page text for `topic`. Preferred over [`EvidenceLookup::summary`] when present.
    async fn nhs_content(&self, _topic: &str) -> Option<EvidenceSummary> {
        None
    }
    /// Consumer-health summary for `topic`, if one was found.
    async fn summary(&self, topic: &str) -> Option<EvidenceSummary>;
    /// Research citations for `topic`; empty when nothing was found.
    async fn research(&self, topic: &str) -> Vec<Citation>;
}

/// Used when lookups are disabled in configuration.
pub struct NoEvidence;

#[async_trait]
impl EvidenceLookup for NoEvidence {
    async fn summary(&self, _topic: &str) -> Option<EvidenceSummary> {
        None
    }

    async fn research(&self, _topic: &str) -> Vec<Citation> {
        Vec::new()
    }
}

struct NhsContent {
    base_url: String,
    api_key: String,
}

pub struct LiveEvidence {
    client: reqwest::Client,
    nhs: Option<NhsContent>,
    medlineplus_url: String,
    eutils_base: String,
    tool: String,
    email: Option<String>,
}

impl Default for LiveEvidence {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveEvidence {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(LOOKUP_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            nhs: None,
            medlineplus_url: MEDLINEPLUS_SEARCH.to_string(),
            eutils_base: EUTILS_BASE.to_string(),
            tool: "neurobreath".to_string(),
            email: None,
        }
    }

    /// NCBI asks callers to identify themselves with a contact address.
    pub fn with_contact(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    /// Enables the NHS website content lookup.
    pub fn with_nhs(mut self, base_url: &str, api_key: &str) -> Self {
        self.nhs = Some(NhsContent {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        });
        self
    }

    pub fn with_endpoints(mut self, medlineplus_url: &str, eutils_base: &str) -> Self {
        self.medlineplus_url = medlineplus_url.to_string();
        self.eutils_base = eutils_base.trim_end_matches('/').to_string();
        self
    }

    async fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Option<String> {
        let res = match self.client.get(url).query(query).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!(target: "neurobreath::evidence", url = url, error = %e, "lookup request failed");
                return None;
            }
        };
        if !res.status().is_success() {
            debug!(target: "neurobreath::evidence", url = url, status = %res.status(), "lookup returned non-success");
            return None;
        }
        res.text().await.ok()
    }

    async fn get_nhs_page(&self, url: &str, api_key: &str) -> Option<serde_json::Value> {
        let res = match self.client.get(url).header("apikey", api_key).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!(target: "neurobreath::evidence", url = url, error = %e, "NHS request failed");
                return None;
            }
        };
        if !res.status().is_success() {
            debug!(target: "neurobreath::evidence", url = url, status = %res.status(), "NHS page not found");
            return None;
        }
        res.json().await.ok()
    }

    fn ncbi_params<'a>(&'a self, extra: &[(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
        let mut params = vec![("db", "pubmed"), ("retmode", "json"), ("tool", self.tool.as_str())];
        if let Some(email) = self.email.as_deref() {
            params.push(("email", email));
        }
        params.extend_from_slice(extra);
        params
    }
}

#[async_trait]
impl EvidenceLookup for LiveEvidence {
    async fn nhs_content(&self, topic: &str) -> Option<EvidenceSummary> {
        let nhs = self.nhs.as_ref()?;
        let slug = slugify_topic(topic);
        if slug.is_empty() {
            return None;
        }
        for url in nhs_candidates(&nhs.base_url, &slug) {
            let Some(page) = self.get_nhs_page(&url, &nhs.api_key).await else {
                continue;
            };
            if let Some(found) = parse_nhs_page(&page, topic) {
                return Some(found);
            }
        }
        None
    }

    async fn summary(&self, topic: &str) -> Option<EvidenceSummary> {
        let xml = self
            .get_text(&self.medlineplus_url, &[("db", "healthTopics"), ("term", topic)])
            .await?;
        let parsed = parse_medlineplus(&xml);
        if parsed.is_none() {
            debug!(target: "neurobreath::evidence", "no MedlinePlus document in response");
        }
        parsed
    }

    async fn research(&self, topic: &str) -> Vec<Citation> {
        let search_url = format!("{}/esearch.fcgi", self.eutils_base);
        let max = PUBMED_MAX_IDS.to_string();
        let params = self.ncbi_params(&[("retmax", max.as_str()), ("sort", "relevance"), ("term", topic)]);
        let Some(body) = self.get_text(&search_url, &params).await else {
            return Vec::new();
        };
        let ids = parse_esearch_ids(&body);
        if ids.is_empty() {
            return Vec::new();
        }

        let summary_url = format!("{}/esummary.fcgi", self.eutils_base);
        let joined = ids.join(",");
        let params = self.ncbi_params(&[("id", joined.as_str())]);
        let Some(body) = self.get_text(&summary_url, &params).await else {
            return Vec::new();
        };
        parse_esummary(&body, &ids)
    }
}

static DOCUMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<document[^>]*\burl="([^"]+)"[^>]*>(.*?)</document>"#).expect("static regex"));
static CONTENT_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<content name="title">(.*?)</content>"#).expect("static regex"));
static CONTENT_SUMMARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<content name="FullSummary">(.*?)</content>"#).expect("static regex"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("static regex"));
static WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

fn decode_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Content fields carry entity-escaped HTML: decode, then strip tags.
fn clean_field(raw: &str) -> String {
    let decoded = decode_xml(raw);
    let stripped = TAG.replace_all(&decoded, " ");
    WS.replace_all(decode_xml(&stripped).trim(), " ").into_owned()
}

/// First document of a MedlinePlus `healthTopics` search response.
pub fn parse_medlineplus(xml: &str) -> Option<EvidenceSummary> {
    let doc = DOCUMENT.captures(xml)?;
    let url = decode_xml(doc.get(1)?.as_str().trim());
    let body = doc.get(2)?.as_str();
    let title = clean_field(CONTENT_TITLE.captures(body)?.get(1)?.as_str());
    let summary = clean_field(CONTENT_SUMMARY.captures(body)?.get(1)?.as_str());
    if title.is_empty() || summary.is_empty() {
        return None;
    }
    let citation = cite("medlineplus", &format!("MedlinePlus: {}", title), &url, None);
    Some(EvidenceSummary {
        title,
        summary,
        citation,
    })
}

/// Lowercase ASCII words joined by single hyphens, as NHS page slugs are.
pub fn slugify_topic(topic: &str) -> String {
    let kept: String = topic
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect();
    kept.split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Content API paths tried in order for a slug.
pub fn nhs_candidates(base_url: &str, slug: &str) -> Vec<String> {
    let base = base_url.trim_end_matches('/');
    vec![
        format!("{}/conditions/{}/?modules=true", base, slug),
        format!("{}/medicines/{}/?modules=true", base, slug),
        format!("{}/mental-health/conditions/{}/overview/?modules=true", base, slug),
        format!("{}/mental-health/conditions/{}/?modules=true", base, slug),
    ]
}

fn nhs_search_url(topic: &str) -> String {
    reqwest::Url::parse_with_params(NHS_SEARCH, &[("query", topic)])
        .map(String::from)
        .unwrap_or_else(|_| NHS_SEARCH.to_string())
}

fn non_empty_str<'a>(value: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Page description plus the text of each `hasPart` module. `None` when the page has no text.
pub fn parse_nhs_page(page: &serde_json::Value, topic: &str) -> Option<EvidenceSummary> {
    let mut parts: Vec<String> = Vec::new();
    if let Some(description) = non_empty_str(page, "description") {
        parts.push(clean_field(description));
    }
    for module in page.get("hasPart").and_then(|p| p.as_array()).into_iter().flatten() {
        let Some(text) = non_empty_str(module, "text").map(clean_field).filter(|t| !t.is_empty()) else {
            continue;
        };
        match non_empty_str(module, "name") {
            Some(name) => parts.push(format!("{}\n{}", name, text)),
            None => parts.push(text),
        }
    }
    let summary = parts.join("\n\n").trim().to_string();
    if summary.is_empty() {
        return None;
    }

    let title = non_empty_str(page, "name")
        .or_else(|| non_empty_str(page, "headline"))
        .unwrap_or("NHS topic")
        .to_string();
    let url = non_empty_str(page, "url")
        .filter(|u| u.starts_with("http"))
        .map(str::to_string)
        .unwrap_or_else(|| nhs_search_url(topic));
    let modified = non_empty_str(page, "dateModified")
        .and_then(|d| d.get(..10))
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
    let citation = cite("nhs", &title, &url, modified);

    Some(EvidenceSummary {
        title,
        summary,
        citation,
    })
}

#[derive(Deserialize)]
struct EsearchResponse {
    esearchresult: EsearchResult,
}

#[derive(Deserialize)]
struct EsearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

pub fn parse_esearch_ids(body: &str) -> Vec<String> {
    serde_json::from_str::<EsearchResponse>(body)
        .map(|r| r.esearchresult.idlist.into_iter().take(PUBMED_MAX_IDS).collect())
        .unwrap_or_default()
}

#[derive(Deserialize)]
struct EsummaryResponse {
    #[serde(default)]
    result: HashMap<String, serde_json::Value>,
}

/// One tier-A citation per id that has a summary record, in id order.
pub fn parse_esummary(body: &str, ids: &[String]) -> Vec<Citation> {
    let Ok(parsed) = serde_json::from_str::<EsummaryResponse>(body) else {
        return Vec::new();
    };
    ids.iter()
        .filter_map(|uid| {
            let entry = parsed.result.get(uid)?;
            let title = entry
                .get("title")
                .and_then(|t| t.as_str())
                .filter(|t| !t.trim().is_empty())
                .unwrap_or("PubMed record");
            let year = entry
                .get("pubdate")
                .and_then(|d| d.as_str())
                .and_then(|d| d.get(..4))
                .and_then(|y| y.parse::<i32>().ok())
                .and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1));
            cite("pubmed", title, &format!("https://pubmed.ncbi.nlm.nih.gov/{}/", uid), year)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citations::SourceTier;

    const MEDLINE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<nlmSearchResult>
<term>anxiety</term>
<list num="2" start="0" per="10">
<document rank="0" url="https://medlineplus.gov/anxiety.html">
<content name="title">&lt;span class="qt0"&gt;Anxiety&lt;/span&gt;</content>
<content name="FullSummary">&lt;p&gt;Fear and &lt;span class="qt0"&gt;anxiety&lt;/span&gt; are part of life.&lt;/p&gt;&lt;p&gt;Treatment can help.&lt;/p&gt;</content>
</document>
<document rank="1" url="https://medlineplus.gov/panicdisorder.html">
<content name="title">Panic Disorder</content>
<content name="FullSummary">Second result.</content>
</document>
</list>
</nlmSearchResult>"#;

    #[test]
    fn medlineplus_first_document_is_used() {
        let s = parse_medlineplus(MEDLINE_XML).unwrap();
        assert_eq!(s.title, "Anxiety");
        assert_eq!(s.summary, "Fear and anxiety are part of life. Treatment can help.");
        let c = s.citation.unwrap();
        assert_eq!(c.url, "https://medlineplus.gov/anxiety.html");
        assert_eq!(c.tier, SourceTier::A);
    }

    #[test]
    fn medlineplus_without_documents_is_none() {
        assert!(parse_medlineplus("<nlmSearchResult><list num=\"0\"/></nlmSearchResult>").is_none());
    }

    #[test]
    fn esearch_ids_are_capped() {
        let ids = parse_esearch_ids(r#"{"esearchresult":{"idlist":["1","2","3","4"]}}"#);
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert!(parse_esearch_ids("not json").is_empty());
    }

    #[test]
    fn esummary_builds_dated_pubmed_citations() {
        let body = r#"{"result":{"uids":["11","22"],
            "11":{"title":"Breathing and anxiety","pubdate":"2021 Mar"},
            "22":{"title":"","pubdate":"n.d."}}}"#;
        let ids = vec!["11".to_string(), "22".to_string(), "33".to_string()];
        let cites = parse_esummary(body, &ids);
        assert_eq!(cites.len(), 2);
        assert_eq!(cites[0].url, "https://pubmed.ncbi.nlm.nih.gov/11/");
        assert_eq!(cites[0].updated_at, NaiveDate::from_ymd_opt(2021, 1, 1));
        assert_eq!(cites[1].title, "PubMed record");
        assert!(cites[1].updated_at.is_none());
    }

    #[test]
    fn slugs_match_nhs_paths() {
        assert_eq!(slugify_topic("Generalised Anxiety Disorder"), "generalised-anxiety-disorder");
        assert_eq!(slugify_topic("  ADHD (adults)?  "), "adhd-adults");
        assert_eq!(slugify_topic("self -  harm"), "self-harm");
        assert_eq!(slugify_topic("???"), "");
        let urls = nhs_candidates("https://nhs.test/content/", "adhd");
        assert_eq!(urls[0], "https://nhs.test/content/conditions/adhd/?modules=true");
        assert_eq!(urls[3], "https://nhs.test/content/mental-health/conditions/adhd/?modules=true");
    }

    #[test]
    fn nhs_page_text_and_citation() {
        let page = serde_json::json!({
            "name": "Attention deficit hyperactivity disorder (ADHD)",
            "url": "https://www.nhs.uk/conditions/attention-deficit-hyperactivity-disorder-adhd/",
            "dateModified": "2023-06-12T10:00:00+00:00",
            "description": "Find out about ADHD.",
            "hasPart": [
                {"name": "Symptoms", "text": "<p>Symptoms usually start <b>early</b>.</p>"},
                {"text": "Treatment can help."},
                {"name": "Empty", "text": "   "}
            ]
        });
        let s = parse_nhs_page(&page, "adhd").unwrap();
        assert_eq!(s.title, "Attention deficit hyperactivity disorder (ADHD)");
        assert_eq!(
            s.summary,
            "Find out about ADHD.\n\nSymptoms\nSymptoms usually start early .\n\nTreatment can help."
        );
        let c = s.citation.unwrap();
        assert_eq!(c.source_id, "nhs");
        assert_eq!(c.updated_at, NaiveDate::from_ymd_opt(2023, 6, 12));
    }

    #[test]
    fn nhs_page_without_public_url_cites_search() {
        let page = serde_json::json!({"headline": "Low mood", "hasPart": [{"text": "Try talking to someone."}]});
        let s = parse_nhs_page(&page, "low mood").unwrap();
        assert_eq!(s.title, "Low mood");
        assert_eq!(
            s.citation.unwrap().url,
            "https://www.nhs.uk/search/results?query=low+mood"
        );
        assert!(parse_nhs_page(&serde_json::json!({"name": "Blank"}), "blank").is_none());
    }

    #[tokio::test]
    async fn unreachable_endpoints_yield_nothing() {
        let live = LiveEvidence::new()
            .with_endpoints("http://127.0.0.1:9/ws/query", "http://127.0.0.1:9/eutils")
            .with_nhs("http://127.0.0.1:9/nhs", "test-key");
        assert!(live.nhs_content("anxiety").await.is_none());
        assert!(live.summary("anxiety").await.is_none());
        assert!(live.research("anxiety").await.is_empty());
    }

    #[tokio::test]
    async fn nhs_lookup_is_skipped_without_a_key() {
        assert!(LiveEvidence::new().nhs_content("anxiety").await.is_none());
        assert!(NoEvidence.nhs_content("anxiety").await.is_none());
    }
}
