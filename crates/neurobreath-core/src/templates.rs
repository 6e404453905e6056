//! Canned answers used when the model is not consulted.
//!
//! Navigation and tool help are always answered here from page context. Health and
//! general questions land here only in degraded mode (no model credential configured).
//! Lookup is by (intent, role) with a role wildcard fallback.

use crate::router::QueryType;
use crate::safety::crisis_line;
use crate::types::{AssistantRole, Jurisdiction, PageContext, PageHeading, PageSection};

pub struct TemplateInput<'a> {
    pub query: &'a str,
    pub page_name: Option<&'a str>,
    pub page_context: Option<&'a PageContext>,
    pub jurisdiction: Jurisdiction,
}

impl TemplateInput<'_> {
    fn headings(&self) -> &[PageHeading] {
        self.page_context.map(|c| c.headings.as_slice()).unwrap_or(&[])
    }

    fn sections(&self) -> &[PageSection] {
        self.page_context.map(|c| c.sections.as_slice()).unwrap_or(&[])
    }

    fn features(&self) -> &[String] {
        self.page_context.map(|c| c.features.as_slice()).unwrap_or(&[])
    }
}

pub type TemplateFn = fn(&TemplateInput<'_>) -> String;

/// `None` role matches any role. More specific rows come first.
const TEMPLATES: &[(QueryType, Option<AssistantRole>, TemplateFn)] = &[
    (QueryType::Navigation, Some(AssistantRole::Buddy), page_navigation),
    (QueryType::Navigation, None, hub_navigation),
    (QueryType::ToolHelp, None, tool_help),
    (QueryType::HealthEvidence, Some(AssistantRole::Coach), degraded_health_coach),
    (QueryType::HealthEvidence, None, degraded_health),
    (QueryType::GeneralInfo, None, degraded_general),
];

pub fn template_for(query_type: QueryType, role: AssistantRole) -> TemplateFn {
    TEMPLATES
        .iter()
        .find(|(qt, r, _)| *qt == query_type && r.map_or(true, |r| r == role))
        .map(|(_, _, f)| *f)
        .unwrap_or(degraded_general)
}

pub fn render(query_type: QueryType, role: AssistantRole, input: &TemplateInput<'_>) -> String {
    template_for(query_type, role)(input)
}

fn matched_words(label: &str, query_lower: &str) -> usize {
    label
        .to_lowercase()
        .split_whitespace()
        .filter(|w| w.chars().count() > 3 && query_lower.contains(*w))
        .count()
}

fn best_by<'a, T>(items: &'a [T], query: &str, label: impl Fn(&T) -> &str) -> Option<&'a T> {
    let lower = query.to_lowercase();
    let mut best: Option<(&T, usize)> = None;
    for item in items {
        let score = matched_words(label(item), &lower);
        if score > 0 && best.map_or(true, |(_, s)| score > s) {
            best = Some((item, score));
        }
    }
    best.map(|(item, _)| item)
}

/// Heading sharing the most words (longer than three characters) with the query.
/// Ties go to the heading that appears first on the page.
pub fn best_heading<'a>(query: &str, headings: &'a [PageHeading]) -> Option<&'a PageHeading> {
    best_by(headings, query, |h| h.text.as_str())
}

pub fn best_section<'a>(query: &str, sections: &'a [PageSection]) -> Option<&'a PageSection> {
    best_by(sections, query, |s| s.name.as_str())
}

fn bold_list<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items.map(|s| format!("**{}**", s)).collect::<Vec<_>>().join(", ")
}

fn page_navigation(input: &TemplateInput<'_>) -> String {
    let heading = best_heading(input.query, input.headings());
    let section = best_section(input.query, input.sections());

    let mut suggestions = Vec::new();
    if let Some(h) = heading {
        suggestions.push(format!("- Try the section: **{}**", h.text));
    }
    if let Some(s) = section {
        suggestions.push(format!("- Look for: **{}**", s.name));
    }
    if suggestions.is_empty() && !input.sections().is_empty() {
        suggestions.push(format!(
            "- This page has sections like: {}",
            bold_list(input.sections().iter().take(4).map(|s| s.name.as_str()))
        ));
    }
    if suggestions.is_empty() {
        return "I can help you navigate! What section would you like to go to? Try asking \
                'show me breathing exercises' or 'take me to the ADHD hub'."
            .to_string();
    }

    let place = input
        .page_name
        .map(|p| format!(" on **{}**", p))
        .unwrap_or_default();
    format!(
        "Here's where to look{}:\n\n**Best next step:**\n{}\n\nYou can also take the page tour for a guided walkthrough.",
        place,
        suggestions.join("\n")
    )
}

fn hub_navigation(_input: &TemplateInput<'_>) -> String {
    "I can help you find your way around NeuroBreath. The main hubs are:\n\n\
     - **Breathing** (`/breathing`): guided breathing and calming techniques\n\
     - **ADHD** (`/adhd`): focus tools, quests and strategies\n\
     - **Autism** (`/autism`): sensory and routine support\n\
     - **Dyslexia** (`/dyslexia`): reading and phonics practice\n\n\
     Tell me which one you'd like and I'll point you there."
        .to_string()
}

fn tool_help(input: &TemplateInput<'_>) -> String {
    let features = input.features();
    if features.is_empty() {
        return "I can guide you through any tool on this page. What do you need help with?".to_string();
    }
    format!(
        "I can help you use the tools on this page.\n\n**What tool are you trying to use?**\n- Available here: {}",
        bold_list(features.iter().map(String::as_str))
    )
}

fn limited_mode_opener(input: &TemplateInput<'_>) -> String {
    let place = input
        .page_name
        .map(|p| format!(" on **{}**", p))
        .unwrap_or_default();
    format!(
        "I'm currently running in **limited mode** (the full AI service isn't configured), \
         but I can still help with your question{}.\n\n**Your question:** {}",
        place, input.query
    )
}

fn degraded_health(input: &TemplateInput<'_>) -> String {
    format!(
        "{}\n\nI can't pull a fully tailored evidence summary right now, but here are safe, practical next steps you can try today:\n\n\
         - **Name the goal** (e.g., focus, calm, sleep, overwhelm) and what \"better\" looks like\n\
         - **Try one small strategy for 5 minutes** (breathing, timer, checklist, break)\n\
         - **Tell me your age group + situation** (child/teen/adult; school/work/home) and I'll narrow it down\n\n{}",
        limited_mode_opener(input),
        crisis_line(input.jurisdiction)
    )
}

fn degraded_health_coach(input: &TemplateInput<'_>) -> String {
    format!(
        "{}\n\nA full coaching plan needs the AI service, but you can start building one now:\n\n\
         - **Pick one area to work on** this week (focus, sleep, routines, calm)\n\
         - **Choose a 5-minute daily practice** and note how it goes\n\
         - **Tell me who you're supporting** (yourself, a child, a class) so the plan fits\n\n{}",
        limited_mode_opener(input),
        crisis_line(input.jurisdiction)
    )
}

fn degraded_general(input: &TemplateInput<'_>) -> String {
    format!(
        "{}\n\nCould you share one detail so I can answer more precisely (e.g., your goal, your age group, and where you're stuck)?",
        limited_mode_opener(input)
    )
}
