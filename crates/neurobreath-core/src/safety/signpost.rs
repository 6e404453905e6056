//! Jurisdiction-specific crisis contact tables and the text rendered from them.

use super::SafetyLevel;
use crate::types::Jurisdiction;

#[derive(Debug, Clone, Copy)]
pub struct ContactLine {
    pub number: Option<&'static str>,
    pub label: &'static str,
    pub guidance: &'static str,
    pub url: Option<&'static str>,
}

#[derive(Debug, Clone, Copy)]
pub struct CrisisSignpost {
    pub jurisdiction: Jurisdiction,
    pub emergency: ContactLine,
    pub urgent: ContactLine,
    pub crisis: ContactLine,
    pub safeguarding: Option<ContactLine>,
}

static UK: CrisisSignpost = CrisisSignpost {
    jurisdiction: Jurisdiction::Uk,
    emergency: ContactLine {
        number: Some("999"),
        label: "Emergency Services",
        guidance: "If this is a medical emergency or someone is in immediate danger, call 999 or go to A&E immediately.",
        url: None,
    },
    urgent: ContactLine {
        number: Some("111"),
        label: "NHS 111",
        guidance: "For urgent but non-life-threatening concerns, call NHS 111 (available 24/7) or visit 111.nhs.uk.",
        url: None,
    },
    crisis: ContactLine {
        number: None,
        label: "Mental Health Crisis",
        guidance: "If you're experiencing a mental health crisis, call NHS 111 and select the mental health option, or contact your local NHS urgent mental health helpline.",
        url: Some("https://www.nhs.uk/service-search/mental-health/find-an-urgent-mental-health-helpline"),
    },
    safeguarding: Some(ContactLine {
        number: Some("0808 800 5000"),
        label: "Safeguarding Concerns",
        guidance: "If you or someone else is at risk of abuse or neglect, contact your local council's safeguarding team or call the NSPCC on 0808 800 5000 (children) or Hourglass on 0808 808 8141 (adults).",
        url: Some("https://www.gov.uk/report-child-abuse-to-local-council"),
    }),
};

static US: CrisisSignpost = CrisisSignpost {
    jurisdiction: Jurisdiction::Us,
    emergency: ContactLine {
        number: Some("911"),
        label: "Emergency Services",
        guidance: "If this is a medical emergency or someone is in immediate danger, call 911 immediately.",
        url: None,
    },
    urgent: ContactLine {
        number: Some("988"),
        label: "988 Suicide & Crisis Lifeline",
        guidance: "For mental health crisis support, call or text 988 (24/7 confidential support).",
        url: None,
    },
    crisis: ContactLine {
        number: Some("988"),
        label: "Mental Health Crisis",
        guidance: "Call or text 988 for the Suicide & Crisis Lifeline, or text \"HELLO\" to 741741 for Crisis Text Line.",
        url: Some("https://988lifeline.org"),
    },
    safeguarding: Some(ContactLine {
        number: Some("1-800-422-4453"),
        label: "Safeguarding Concerns",
        guidance: "If you suspect child abuse or neglect, call the Childhelp National Child Abuse Hotline at 1-800-422-4453.",
        url: Some("https://www.childwelfare.gov/topics/responding/reporting/"),
    }),
};

static EU: CrisisSignpost = CrisisSignpost {
    jurisdiction: Jurisdiction::Eu,
    emergency: ContactLine {
        number: Some("112"),
        label: "Emergency Services",
        guidance: "If this is a medical emergency or someone is in immediate danger, call 112 (EU emergency number).",
        url: None,
    },
    urgent: ContactLine {
        number: Some("116 117"),
        label: "Non-Emergency Medical Help",
        guidance: "For non-emergency medical help, call 116 117 (available in many EU countries) or contact your local health service.",
        url: None,
    },
    crisis: ContactLine {
        number: None,
        label: "Mental Health Crisis",
        guidance: "Contact your local mental health crisis service or emergency services. Check your country's national mental health helpline.",
        url: Some("https://www.iasp.info/resources/Crisis_Centres/"),
    },
    safeguarding: None,
};

pub fn signpost_for(jurisdiction: Jurisdiction) -> &'static CrisisSignpost {
    match jurisdiction {
        Jurisdiction::Uk => &UK,
        Jurisdiction::Us => &US,
        Jurisdiction::Eu => &EU,
    }
}

fn push_line(out: &mut String, line: &ContactLine) {
    out.push_str(line.guidance);
    if let Some(number) = line.number {
        out.push_str(&format!("\n\n**{}:** {}", line.label, number));
    }
    if let Some(url) = line.url {
        out.push_str(&format!("\n**More info:** {}", url));
    }
}

/// Ready-to-render signposting for an elevated level. `None` for [`SafetyLevel::None`].
pub fn signposting(level: SafetyLevel, jurisdiction: Jurisdiction) -> Option<String> {
    let table = signpost_for(jurisdiction);
    let line = match level {
        SafetyLevel::None => return None,
        SafetyLevel::Emergency => table.emergency,
        SafetyLevel::Urgent => table.urgent,
        SafetyLevel::Crisis => table.crisis,
        // EU has no dedicated safeguarding line; emergency services cover it.
        SafetyLevel::Safeguarding => table.safeguarding.unwrap_or(table.emergency),
    };
    let mut out = String::from("🚨 **Immediate Support:**\n\n");
    push_line(&mut out, &line);
    Some(out)
}

/// One-line crisis pointer used inside degraded health answers.
pub fn crisis_line(jurisdiction: Jurisdiction) -> &'static str {
    match jurisdiction {
        Jurisdiction::Uk => "If you feel in immediate danger or at risk of self-harm, call **999** (or **NHS 111** for urgent advice).",
        Jurisdiction::Us => "If you feel in immediate danger or at risk of self-harm, call **911** (or **988** for crisis support).",
        Jurisdiction::Eu => "If you feel in immediate danger or at risk of self-harm, call your local emergency number (EU: **112**).",
    }
}

/// Canned text returned when the gate escalates. Always names the emergency number and
/// the urgent/crisis line for the jurisdiction, whatever the escalated level.
pub fn emergency_response(level: SafetyLevel, jurisdiction: Jurisdiction) -> String {
    let table = signpost_for(jurisdiction);
    let mut out = signposting(level, jurisdiction)
        .unwrap_or_else(|| signposting(SafetyLevel::Emergency, jurisdiction).unwrap_or_default());

    out.push_str("\n\n---\n\n");
    if level != SafetyLevel::Emergency {
        out.push_str(&format!(
            "**{}:** {}\n",
            table.emergency.label,
            table.emergency.number.unwrap_or_default()
        ));
    }
    out.push_str(&format!(
        "**{}:** {}\n",
        table.urgent.label,
        table.urgent.number.unwrap_or_default()
    ));
    out.push_str(&format!("\n{}", table.crisis.guidance));
    out.push_str(
        "\n\nI'm not able to help with this safely in a chat, but you don't have to deal with it alone. \
         Please reach out to one of the services above now, or talk to someone you trust.",
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emergency_signposting_differs_per_jurisdiction() {
        let uk = signposting(SafetyLevel::Emergency, Jurisdiction::Uk).unwrap();
        let us = signposting(SafetyLevel::Emergency, Jurisdiction::Us).unwrap();
        let eu = signposting(SafetyLevel::Emergency, Jurisdiction::Eu).unwrap();
        assert!(uk.contains("999"));
        assert!(us.contains("911"));
        assert!(eu.contains("112"));
        assert_ne!(uk, us);
        assert_ne!(us, eu);
        assert_ne!(uk, eu);
    }

    #[test]
    fn none_level_has_no_signposting() {
        assert!(signposting(SafetyLevel::None, Jurisdiction::Uk).is_none());
    }

    #[test]
    fn eu_safeguarding_falls_back_to_emergency_line() {
        let eu = signposting(SafetyLevel::Safeguarding, Jurisdiction::Eu).unwrap();
        assert!(eu.contains("112"));
    }

    #[test]
    fn emergency_response_names_both_lines() {
        let uk = emergency_response(SafetyLevel::Safeguarding, Jurisdiction::Uk);
        assert!(uk.contains("999"));
        assert!(uk.contains("111"));
        assert!(uk.contains("NSPCC"));

        let us = emergency_response(SafetyLevel::Emergency, Jurisdiction::Us);
        assert!(us.contains("911"));
        assert!(us.contains("988"));

        let eu = emergency_response(SafetyLevel::Emergency, Jurisdiction::Eu);
        assert!(eu.contains("112"));
    }
}
