//! Evidence source registry and citation formatting.
//!
//! Citations are only minted through [`cite`], which checks the URL host against the
//! source's domain allowlist. Nothing outside this module builds a [`Citation`] by hand
//! except internal navigation references.
//!
//! Tier A: government health bodies, clinical guidelines, peer-reviewed research.
//! Tier B: charities and support organisations (labelled as non-clinical).

use crate::router::Topic;
use chrono::NaiveDate;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceTier {
    A,
    B,
    #[serde(rename = "internal")]
    Internal,
}

#[derive(Debug, Clone, Copy)]
pub struct EvidenceSource {
    pub id: &'static str,
    pub short_name: &'static str,
    pub organization: &'static str,
    pub tier: SourceTier,
    pub domains: &'static [&'static str],
    pub topics: &'static [Topic],
}

use Topic::*;

pub static EVIDENCE_SOURCES: &[EvidenceSource] = &[
    EvidenceSource {
        id: "nhs",
        short_name: "NHS",
        organization: "UK National Health Service",
        tier: SourceTier::A,
        domains: &["nhs.uk"],
        topics: &[Adhd, Autism, Dyslexia, Anxiety, Depression, Breathing, Sleep, Bipolar, Stress, General],
    },
    EvidenceSource {
        id: "nice",
        short_name: "NICE",
        organization: "NICE (UK)",
        tier: SourceTier::A,
        domains: &["nice.org.uk"],
        topics: &[Adhd, Autism, Anxiety, Depression, Bipolar, General],
    },
    EvidenceSource {
        id: "gov_uk",
        short_name: "GOV.UK",
        organization: "UK Government",
        tier: SourceTier::A,
        domains: &["gov.uk"],
        topics: &[Safeguarding, General],
    },
    EvidenceSource {
        id: "rcpsych",
        short_name: "RCPsych",
        organization: "Royal College of Psychiatrists (UK)",
        tier: SourceTier::A,
        domains: &["rcpsych.ac.uk"],
        topics: &[Adhd, Autism, Anxiety, Depression, Bipolar, General],
    },
    EvidenceSource {
        id: "pubmed",
        short_name: "PubMed",
        organization: "US National Library of Medicine",
        tier: SourceTier::A,
        domains: &["pubmed.ncbi.nlm.nih.gov", "ncbi.nlm.nih.gov"],
        topics: &[Adhd, Autism, Dyslexia, Anxiety, Depression, Breathing, Sleep, Bipolar, Stress, General],
    },
    EvidenceSource {
        id: "medlineplus",
        short_name: "MedlinePlus",
        organization: "US National Library of Medicine",
        tier: SourceTier::A,
        domains: &["medlineplus.gov"],
        topics: &[Adhd, Autism, Dyslexia, Anxiety, Depression, Breathing, Sleep, Bipolar, Stress, General],
    },
    EvidenceSource {
        id: "cochrane",
        short_name: "Cochrane",
        organization: "Cochrane Collaboration",
        tier: SourceTier::A,
        domains: &["cochranelibrary.com"],
        topics: &[Adhd, Autism, Anxiety, Depression, General],
    },
    EvidenceSource {
        id: "who",
        short_name: "WHO",
        organization: "World Health Organization",
        tier: SourceTier::A,
        domains: &["who.int"],
        topics: &[General, Safeguarding],
    },
    EvidenceSource {
        id: "cdc",
        short_name: "CDC",
        organization: "US CDC",
        tier: SourceTier::A,
        domains: &["cdc.gov"],
        topics: &[Adhd, Autism, General],
    },
    EvidenceSource {
        id: "nas",
        short_name: "NAS",
        organization: "National Autistic Society (UK)",
        tier: SourceTier::B,
        domains: &["autism.org.uk"],
        topics: &[Autism],
    },
    EvidenceSource {
        id: "adhd_foundation",
        short_name: "ADHD Foundation",
        organization: "ADHD Foundation (UK)",
        tier: SourceTier::B,
        domains: &["adhdfoundation.org.uk"],
        topics: &[Adhd],
    },
    EvidenceSource {
        id: "mind",
        short_name: "Mind",
        organization: "Mind (UK)",
        tier: SourceTier::B,
        domains: &["mind.org.uk"],
        topics: &[Anxiety, Depression, Bipolar, Stress, Burnout, General],
    },
    EvidenceSource {
        id: "young_minds",
        short_name: "YoungMinds",
        organization: "YoungMinds (UK)",
        tier: SourceTier::B,
        domains: &["youngminds.org.uk"],
        topics: &[Anxiety, Depression, General],
    },
    EvidenceSource {
        id: "british_dyslexia",
        short_name: "BDA",
        organization: "British Dyslexia Association",
        tier: SourceTier::B,
        domains: &["bdadyslexia.org.uk"],
        topics: &[Dyslexia],
    },
];

pub fn source_by_id(id: &str) -> Option<&'static EvidenceSource> {
    EVIDENCE_SOURCES.iter().find(|s| s.id == id)
}

/// Sources covering `topic` (sources tagged `general` always qualify).
pub fn sources_for_topic(topic: Topic) -> Vec<&'static EvidenceSource> {
    EVIDENCE_SOURCES
        .iter()
        .filter(|s| s.topics.contains(&topic) || s.topics.contains(&General))
        .collect()
}

/// True when `url` is http(s) and its host is one of the source's domains or a subdomain.
pub fn url_allowed(url: &str, source: &EvidenceSource) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }
    let Some(host) = parsed.host_str() else {
        return false;
    };
    source
        .domains
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{}", d)))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    pub url: String,
    pub source_id: String,
    pub source_label: String,
    pub tier: SourceTier,
    pub updated_at: Option<NaiveDate>,
    pub is_external: bool,
}

/// Mint a citation for a registry source; `None` if the source is unknown or the URL is
/// off its allowlist.
pub fn cite(source_id: &str, title: &str, url: &str, updated_at: Option<NaiveDate>) -> Option<Citation> {
    let source = source_by_id(source_id)?;
    if !url_allowed(url, source) {
        tracing::warn!(
            target: "neurobreath::citations",
            source = source_id,
            url = url,
            "rejected citation outside source allowlist"
        );
        return None;
    }
    Some(Citation {
        title: title.to_string(),
        url: url.to_string(),
        source_id: source.id.to_string(),
        source_label: source.short_name.to_string(),
        tier: source.tier,
        updated_at,
        is_external: true,
    })
}

/// Reference to a page on this site (navigation answers).
pub fn internal_reference(title: &str, path: &str) -> Citation {
    Citation {
        title: title.to_string(),
        url: path.to_string(),
        source_id: "internal".to_string(),
        source_label: "Internal".to_string(),
        tier: SourceTier::Internal,
        updated_at: None,
        is_external: false,
    }
}

/// Wire shape of one entry in `references`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    pub is_external: bool,
}

impl From<&Citation> for Reference {
    fn from(c: &Citation) -> Self {
        Self {
            title: c.title.clone(),
            url: c.url.clone(),
            source_label: Some(c.source_label.clone()),
            updated_at: c.updated_at.map(|d| d.format("%Y-%m-%d").to_string()),
            is_external: c.is_external,
        }
    }
}

pub fn to_references(citations: &[Citation]) -> Vec<Reference> {
    citations.iter().map(Reference::from).collect()
}

fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

/// NHS breathing exercises + NHS Every Mind Matters.
pub fn default_citations() -> Vec<Citation> {
    [
        cite(
            "nhs",
            "NHS: Breathing exercises for stress",
            "https://www.nhs.uk/mental-health/self-help/guides-tools-and-activities/breathing-exercises-for-stress/",
            date(2024, 1, 1),
        ),
        cite(
            "nhs",
            "NHS Every Mind Matters",
            "https://www.nhs.uk/every-mind-matters/",
            date(2024, 1, 1),
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// (topic, source id, title, url)
const TOPIC_CITATIONS: &[(Topic, &str, &str, &str)] = &[
    (Adhd, "nhs", "NHS: Attention deficit hyperactivity disorder (ADHD)", "https://www.nhs.uk/conditions/attention-deficit-hyperactivity-disorder-adhd/"),
    (Adhd, "nice", "NICE NG87: ADHD diagnosis and management", "https://www.nice.org.uk/guidance/ng87"),
    (Adhd, "adhd_foundation", "ADHD Foundation", "https://www.adhdfoundation.org.uk/"),
    (Autism, "nhs", "NHS: Autism", "https://www.nhs.uk/conditions/autism/"),
    (Autism, "nas", "National Autistic Society: What is autism?", "https://www.autism.org.uk/advice-and-guidance/what-is-autism"),
    (Dyslexia, "nhs", "NHS: Dyslexia", "https://www.nhs.uk/conditions/dyslexia/"),
    (Dyslexia, "british_dyslexia", "British Dyslexia Association", "https://www.bdadyslexia.org.uk/"),
    (Anxiety, "nhs", "NHS: Generalised anxiety disorder in adults", "https://www.nhs.uk/mental-health/conditions/generalised-anxiety-disorder/overview/"),
    (Anxiety, "mind", "Mind: Anxiety and panic attacks", "https://www.mind.org.uk/information-support/types-of-mental-health-problems/anxiety-and-panic-attacks/"),
    (Depression, "nhs", "NHS: Depression in adults", "https://www.nhs.uk/mental-health/conditions/depression-in-adults/overview/"),
    (Depression, "nice", "NICE NG222: Depression in adults", "https://www.nice.org.uk/guidance/ng222"),
    (Breathing, "nhs", "NHS: Breathing exercises for stress", "https://www.nhs.uk/mental-health/self-help/guides-tools-and-activities/breathing-exercises-for-stress/"),
    (Sleep, "nhs", "NHS Every Mind Matters: Sleep", "https://www.nhs.uk/every-mind-matters/mental-health-issues/sleep/"),
    (Bipolar, "nhs", "NHS: Bipolar disorder", "https://www.nhs.uk/mental-health/conditions/bipolar-disorder/overview/"),
    (Stress, "nhs", "NHS: Stress", "https://www.nhs.uk/mental-health/feelings-symptoms-behaviours/feelings-and-symptoms/stress/"),
    (Burnout, "mind", "Mind: How to be mentally healthy at work", "https://www.mind.org.uk/information-support/tips-for-everyday-living/how-to-be-mentally-healthy-at-work/"),
    (Safeguarding, "gov_uk", "GOV.UK: Report child abuse to your local council", "https://www.gov.uk/report-child-abuse-to-local-council"),
];

pub fn topic_citations(topic: Topic) -> Vec<Citation> {
    TOPIC_CITATIONS
        .iter()
        .filter(|(t, ..)| *t == topic)
        .filter_map(|(_, source, title, url)| cite(source, title, url, None))
        .collect()
}

/// Topic citations followed by the defaults, deduplicated by URL (first wins).
pub fn citations_for(topic: Topic) -> Vec<Citation> {
    let mut all = topic_citations(topic);
    all.extend(default_citations());
    deduplicate(all)
}

pub fn deduplicate(citations: Vec<Citation>) -> Vec<Citation> {
    let mut seen = HashSet::new();
    citations
        .into_iter()
        .filter(|c| seen.insert(c.url.trim_end_matches('/').to_lowercase()))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitationGroup {
    pub clinical: Vec<Citation>,
    pub support: Vec<Citation>,
    pub internal: Vec<Citation>,
}

impl CitationGroup {
    pub fn is_empty(&self) -> bool {
        self.clinical.is_empty() && self.support.is_empty() && self.internal.is_empty()
    }
}

pub fn group(citations: &[Citation]) -> CitationGroup {
    let mut g = CitationGroup::default();
    for c in citations {
        match c.tier {
            SourceTier::A => g.clinical.push(c.clone()),
            SourceTier::B => g.support.push(c.clone()),
            SourceTier::Internal => g.internal.push(c.clone()),
        }
    }
    g
}

fn format_line(c: &Citation) -> String {
    match c.updated_at {
        Some(d) => format!("- [{}]({}) ({}, updated {})", c.title, c.url, c.source_label, d.format("%b %Y")),
        None => format!("- [{}]({}) ({})", c.title, c.url, c.source_label),
    }
}

/// Markdown block listing grouped sources. Empty string for an empty group.
pub fn format_group(group: &CitationGroup) -> String {
    let sections = [
        ("**Clinical & research sources:**", &group.clinical),
        ("**Support organisations (non-clinical):**", &group.support),
        ("**On this site:**", &group.internal),
    ];
    sections
        .iter()
        .filter(|(_, list)| !list.is_empty())
        .map(|(heading, list)| {
            let lines: Vec<String> = list.iter().map(format_line).collect();
            format!("{}\n{}", heading, lines.join("\n"))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
