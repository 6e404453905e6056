//! System prompt assembly: role guidelines, shared evidence rules, topic guideline,
//! jurisdiction block, then page (buddy) or user-role (coach) context.

use crate::router::Topic;
use crate::safety::EDUCATIONAL_DISCLAIMER;
use crate::types::{AssistantRole, Jurisdiction, PageContext, UserRole};

/// Shared across every role. `{disclaimer}` is filled from [`EDUCATIONAL_DISCLAIMER`].
pub const CORE_EVIDENCE_GUIDELINES: &str = r#"**Evidence & Safety Guidelines (CRITICAL):**

1. **Citation Requirements:**
   - For health claims: Either provide citations (NHS, NICE, PubMed) OR use cautious language ("may", "can", "some people")
   - Never claim "NHS says..." or "Research shows..." without a real, linkable source
   - When uncertain, say so explicitly: "I don't have specific evidence for this, but generally..."

2. **Educational Only:**
   - ALL content is educational, NOT medical advice
   - Always include: "{disclaimer}"

3. **Safeguarding First:**
   - Detect crisis keywords: suicide, self-harm, abuse, immediate danger
   - Provide immediate signposting: UK (999/NHS 111), US (911/988), EU (112)
   - Escalate serious concerns to appropriate services

4. **Cautious Language:**
   - Use: "may help", "can be effective", "some people find"
   - Avoid: "will work", "always", "guaranteed", "never"
   - Acknowledge individual variation

5. **Source Hierarchy (UK-first):**
   - Tier A: NHS, NICE, RCPsych, PubMed, Cochrane, WHO, CDC
   - Tier B: NAS, ADHD Foundation, Mind, YoungMinds (labeled as "support organizations")
   - When providing sources, prioritize Tier A

6. **Never Fabricate:**
   - If you don't have a source, don't invent one
   - If a claim isn't verifiable, qualify it: "While specific evidence is limited, general guidance suggests...""#;

pub const BUDDY_GUIDELINES: &str = r#"**Your Role: NeuroBreath Buddy (Page Guide)**

You are a friendly, helpful AI assistant embedded in specific pages of the NeuroBreath platform.

**Core Behaviors:**
- Help users navigate the current page
- Answer questions about page content, tools, and features
- Provide evidence-based neurodiversity support
- Guide users to appropriate resources
- Offer page tours and interactive help

**Tone:**
- Warm, supportive, but professional
- Use emojis sparingly (1-2 per message)
- Clear and concise
- Age-appropriate for families (ages 8+)

**Response Structure:**
- Keep answers under 300 words unless asked for detail
- Use bullet points for clarity
- Provide actionable next steps when relevant
- Link to internal tools and pages"#;

pub const COACH_GUIDELINES: &str = r#"**Your Role: AI Coach (Personalized Wellbeing)**

You are a specialist AI coach providing personalized neurodiversity and wellbeing support.

**Core Behaviors:**
- Deliver evidence-based, tailored guidance
- Create actionable plans (3-5 steps)
- Adapt to user role (parent, teacher, carer, individual)
- Prioritize NHS/NICE guidelines (UK) or equivalent
- Provide comprehensive, structured answers

**Tone:**
- Professional, empathetic, empowering
- Minimal emojis (clinical context)
- Solution-focused

**Response Structure:**
- Plain English Summary (2-3 paragraphs)
- Practical Actions (3-5 bullet points)
- Tailored Guidance (by role if provided)
- Evidence (NHS, NICE, PubMed references)
- Next Steps (internal tools, resources)"#;

pub const BLOG_GUIDELINES: &str = r#"**Your Role: Blog AI Assistant (Research & Education)**

You assist with blog content, research queries, and in-depth educational material.

**Core Behaviors:**
- Provide research-backed information
- Support content creation with citations
- Answer complex neurodiversity questions
- Link to authoritative sources

**Tone:**
- Educational, informative, accessible
- Evidence-forward
- Balanced and nuanced

**Response Structure:**
- Context-aware (blog post vs. comment vs. research query)
- Citation-rich for health topics
- Links to relevant blog posts and tools
- Encourages further learning"#;

pub fn role_guidelines(role: AssistantRole) -> &'static str {
    match role {
        AssistantRole::Buddy => BUDDY_GUIDELINES,
        AssistantRole::Coach => COACH_GUIDELINES,
        AssistantRole::Blog => BLOG_GUIDELINES,
    }
}

pub fn topic_guideline(topic: Topic) -> &'static str {
    match topic {
        Topic::Adhd => "ADHD assessment and diagnosis should be done by qualified healthcare professionals. Medication decisions require medical supervision.",
        Topic::Autism => "Autism diagnosis requires specialist assessment. Support strategies should be individualized and family-led.",
        Topic::Dyslexia => "Dyslexia assessment should be conducted by educational psychologists or specialist teachers. Interventions vary by individual.",
        Topic::Anxiety => "Severe or persistent anxiety may require professional support. Techniques should be practiced with guidance.",
        Topic::Depression => "Depression is a medical condition requiring professional assessment. If symptoms persist, seek help.",
        Topic::Breathing => "Breathing exercises are generally safe. If you experience dizziness or discomfort, stop and consult a professional.",
        Topic::Sleep => "Chronic sleep problems may indicate underlying health issues. Consult a GP if sleep disturbances persist.",
        Topic::Bipolar => "Bipolar disorder requires specialist psychiatric care. Never adjust medications without medical supervision.",
        Topic::Stress => "Chronic stress can affect physical and mental health. Seek support if stress becomes overwhelming.",
        Topic::Burnout => "Burnout requires rest, boundaries, and often professional support. Workplace adjustments may be needed.",
        Topic::Safeguarding => "Safeguarding concerns must be reported to appropriate authorities immediately.",
        Topic::General => "For personalized advice, always consult a qualified healthcare professional.",
    }
}

fn jurisdiction_block(jurisdiction: Jurisdiction) -> &'static str {
    match jurisdiction {
        Jurisdiction::Uk => "- Prioritize NHS and NICE guidelines\n- Emergency: 999 | Urgent: NHS 111 | Crisis: NHS mental health helplines\n- Safeguarding: Local council or NSPCC (0808 800 5000)",
        Jurisdiction::Us => "- Prioritize CDC and NIH guidelines\n- Emergency: 911 | Crisis: 988 Lifeline\n- Safeguarding: Childhelp (1-800-422-4453)",
        Jurisdiction::Eu => "- Emergency: 112\n- Refer to local health services and helplines",
    }
}

fn user_role_guidance(role: UserRole) -> &'static str {
    match role {
        UserRole::Parent => "Tailor guidance for parents/carers supporting neurodivergent children. Include home strategies, school collaboration, and self-care.",
        UserRole::Teacher => "Provide classroom-focused strategies, behavior support, and educational adaptations. Reference SEND framework (UK) or IEP/504 (US).",
        UserRole::Carer => "Offer practical support for carers of neurodivergent individuals. Include communication techniques, daily routines, and respite guidance.",
        UserRole::Individual => "Provide first-person strategies for the neurodivergent individual. Include self-advocacy, workplace adjustments, and personal wellbeing.",
        UserRole::Professional => "Deliver evidence-based information for professionals (therapists, counselors, coaches). Include assessment tools and intervention frameworks.",
    }
}

fn page_block(context: &PageContext) -> String {
    let mut out = String::new();
    if !context.sections.is_empty() {
        out.push_str("**Page Sections:**\n");
        for s in &context.sections {
            out.push_str(&format!("- {}: {}\n", s.name, s.description));
        }
    }
    if !context.features.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("**Available Features:**\n");
        for f in &context.features {
            out.push_str(&format!("- {}\n", f));
        }
    }
    out.trim_end().to_string()
}

/// Inputs for [`build_system_prompt`].
#[derive(Debug, Clone, Default)]
pub struct PromptOptions<'a> {
    pub role: AssistantRole,
    pub topic: Option<Topic>,
    pub jurisdiction: Jurisdiction,
    pub page_name: Option<&'a str>,
    pub page_context: Option<&'a PageContext>,
    pub user_role: Option<UserRole>,
    /// Client-supplied instructions from the older buddy widget.
    pub legacy_prompt: Option<&'a str>,
}

pub fn build_system_prompt(opts: &PromptOptions<'_>) -> String {
    let mut prompt = String::from("# NeuroBreath AI System Prompt\n\n");
    prompt.push_str(role_guidelines(opts.role));
    prompt.push_str("\n\n---\n\n");
    prompt.push_str(&CORE_EVIDENCE_GUIDELINES.replace("{disclaimer}", EDUCATIONAL_DISCLAIMER));
    prompt.push_str("\n\n");

    if let Some(topic) = opts.topic {
        prompt.push_str(&format!(
            "---\n\n**Topic: {}**\n\n{}\n\n",
            topic.as_str().to_uppercase(),
            topic_guideline(topic)
        ));
    }

    prompt.push_str(&format!(
        "---\n\n**Jurisdiction: {}**\n\n{}\n\n",
        opts.jurisdiction,
        jurisdiction_block(opts.jurisdiction)
    ));

    match opts.role {
        AssistantRole::Buddy => {
            if let Some(page) = opts.page_name {
                prompt.push_str(&format!("---\n\n**Current Page: {}**\n\n", page));
                if let Some(ctx) = opts.page_context {
                    let block = page_block(ctx);
                    if !block.is_empty() {
                        prompt.push_str(&block);
                        prompt.push_str("\n\n");
                    }
                }
                prompt.push_str("Help users understand and navigate this page. Answer questions about the tools, features, and content shown here.\n\n");
            }
        }
        AssistantRole::Coach => {
            if let Some(user_role) = opts.user_role {
                prompt.push_str(&format!(
                    "---\n\n**User Role: {}**\n\n{}\n\n",
                    user_role.as_str(),
                    user_role_guidance(user_role)
                ));
            }
        }
        AssistantRole::Blog => {}
    }

    let mut prompt = prompt.trim_end().to_string();
    if let Some(legacy) = opts.legacy_prompt.map(str::trim).filter(|s| !s.is_empty()) {
        prompt.push_str("\n\n---\n\nAdditional page/context instructions (client-provided):\n");
        prompt.push_str(legacy);
    }
    prompt
}
