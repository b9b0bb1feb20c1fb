//! Canned responses used when the analysis service is unavailable.
//!
//! A query is classified by case-insensitive substring match against an
//! ordered keyword table; the first group that matches wins.

use serde_json::json;

use crate::agent::Agent;
use crate::state::{DataKind, MessageData};

/// Topic selected by the keyword table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Oncology,
    ClinicalTrials,
    Patents,
    Biosimilars,
    General,
}

/// Keyword groups in priority order.
const KEYWORD_GROUPS: [(Topic, &[&str]); 4] = [
    (Topic::Oncology, &["oncology", "unmet need", "cancer"]),
    (Topic::ClinicalTrials, &["clinical trial", "phase"]),
    (Topic::Patents, &["patent", "intellectual property"]),
    (Topic::Biosimilars, &["biosimilar", "competition"]),
];

pub const ONCOLOGY_OPTIONS: [&str; 4] = [
    "By Region",
    "By Mechanism of Action",
    "By Treatment Line",
    "By Patient Population",
];

pub const GENERAL_OPTIONS: [&str; 4] = [
    "Market Analysis Focus",
    "Clinical Development Focus",
    "Competitive Intelligence Focus",
    "Regulatory Focus",
];

/// Suggested follow-ups attached to a candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Clarification {
    pub needed: bool,
    pub options: Vec<String>,
}

/// Result of a keyword-table lookup, consumed once to build a response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseCandidate {
    pub topic: Topic,
    pub content: String,
    pub data: Option<Vec<MessageData>>,
    pub clarification: Option<Clarification>,
}

impl Topic {
    /// Classify a query; `General` when no keyword group matches.
    pub fn classify(query: &str) -> Topic {
        let lower = query.to_lowercase();
        KEYWORD_GROUPS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
            .map(|(topic, _)| *topic)
            .unwrap_or(Topic::General)
    }

    /// Agents the canned answer for this topic is attributed to.
    pub fn agents(&self) -> Vec<Agent> {
        match self {
            Topic::Oncology | Topic::General => Agent::all(),
            Topic::ClinicalTrials => vec![Agent::ClinicalTrials],
            Topic::Patents => vec![Agent::Patent],
            Topic::Biosimilars => vec![Agent::Iqvia, Agent::Patent],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Topic::Oncology => "oncology",
            Topic::ClinicalTrials => "clinical trials",
            Topic::Patents => "patent",
            Topic::Biosimilars => "biosimilar",
            Topic::General => "default",
        }
    }
}

/// Pick the canned response for a query.
pub fn lookup(query: &str) -> ResponseCandidate {
    canned(Topic::classify(query))
}

/// Canned response for a topic.
pub fn canned(topic: Topic) -> ResponseCandidate {
    match topic {
        Topic::Oncology => ResponseCandidate {
            topic,
            content: "I found several unmet needs in oncology. Let me provide you with a comprehensive analysis based on our multi-agent intelligence gathering.".to_string(),
            data: Some(vec![
                MessageData::new(
                    DataKind::Table,
                    Some("Top Unmet Needs in Oncology"),
                    json!([
                        { "Area": "HER2+ Breast Cancer", "Gap": "Limited options post-progression", "Market": "$4.2B" },
                        { "Area": "Triple Negative BC", "Gap": "Lack of targeted therapies", "Market": "$2.8B" },
                        { "Area": "NSCLC EGFR+", "Gap": "Resistance management", "Market": "$6.1B" },
                        { "Area": "Pancreatic Cancer", "Gap": "Early detection biomarkers", "Market": "$1.9B" }
                    ]),
                ),
                MessageData::new(
                    DataKind::Chart,
                    Some("Market Opportunity by Indication (USD Billions)"),
                    json!([
                        { "name": "HER2+ BC", "value": 4.2 },
                        { "name": "TNBC", "value": 2.8 },
                        { "name": "NSCLC", "value": 6.1 },
                        { "name": "Pancreatic", "value": 1.9 }
                    ]),
                ),
            ]),
            clarification: Some(clarification(&ONCOLOGY_OPTIONS)),
        },
        Topic::ClinicalTrials => ResponseCandidate {
            topic,
            content: "Here are the current Phase III clinical trials for the therapeutic area you're interested in. The data is sourced from clinicaltrials.gov via our Clinical Trials Agent.".to_string(),
            data: Some(vec![
                MessageData::new(
                    DataKind::Table,
                    Some("Active Phase III Clinical Trials"),
                    json!([
                        { "Trial": "NCT05123456", "Sponsor": "Pfizer", "Indication": "NSCLC", "Status": "Recruiting", "Enrollment": 450 },
                        { "Trial": "NCT05234567", "Sponsor": "Roche", "Indication": "HER2+ BC", "Status": "Active", "Enrollment": 380 },
                        { "Trial": "NCT05345678", "Sponsor": "Novartis", "Indication": "AML", "Status": "Recruiting", "Enrollment": 200 },
                        { "Trial": "NCT05456789", "Sponsor": "AstraZeneca", "Indication": "Ovarian", "Status": "Completed", "Enrollment": 520 }
                    ]),
                ),
                MessageData::new(DataKind::Link, Some("Reference"), json!("https://clinicaltrials.gov")),
            ]),
            clarification: None,
        },
        Topic::Patents => ResponseCandidate {
            topic,
            content: "I've analyzed the patent landscape using our Patent Intelligence Agent. Here's what I found regarding recent patent filings and expirations in this therapeutic area.".to_string(),
            data: Some(vec![
                MessageData::new(
                    DataKind::Table,
                    Some("Key Patent Analysis"),
                    json!([
                        { "Patent": "US10234567", "Holder": "Merck", "Expiry": "2027", "Drug": "Keytruda analog", "Status": "Active" },
                        { "Patent": "US10345678", "Holder": "BMS", "Expiry": "2025", "Drug": "Opdivo combo", "Status": "Expiring Soon" },
                        { "Patent": "US10456789", "Holder": "Regeneron", "Expiry": "2029", "Drug": "IL-6 inhibitor", "Status": "Active" }
                    ]),
                ),
                MessageData::new(
                    DataKind::Pdf,
                    Some("Download Full Patent Report"),
                    json!("/api/reports/patent-analysis.pdf"),
                ),
            ]),
            clarification: None,
        },
        Topic::Biosimilars => ResponseCandidate {
            topic,
            content: "Analyzing biosimilar competition for the selected products. Our IQVIA and Patent agents have identified the following competitive landscape.".to_string(),
            data: Some(vec![
                MessageData::new(
                    DataKind::Table,
                    Some("Biosimilar Competition Analysis"),
                    json!([
                        { "Reference": "Humira", "Biosimilars": 8, "Price Erosion": "45%", "Lead Competitor": "Hadlima" },
                        { "Reference": "Remicade", "Biosimilars": 5, "Price Erosion": "38%", "Lead Competitor": "Inflectra" },
                        { "Reference": "Herceptin", "Biosimilars": 6, "Price Erosion": "42%", "Lead Competitor": "Ogivri" }
                    ]),
                ),
                MessageData::new(
                    DataKind::Chart,
                    Some("Price Erosion Timeline (%)"),
                    json!([
                        { "name": "Year 1", "value": 15 },
                        { "name": "Year 2", "value": 28 },
                        { "name": "Year 3", "value": 38 },
                        { "name": "Year 4", "value": 45 }
                    ]),
                ),
            ]),
            clarification: None,
        },
        Topic::General => ResponseCandidate {
            topic,
            content: "I understand your query. Let me analyze this using our multi-agent system. The Master Agent is coordinating between IQVIA, EXIM, Patent, Clinical Trials, Internal Docs, and Web Intelligence agents to gather comprehensive insights.".to_string(),
            data: None,
            clarification: Some(clarification(&GENERAL_OPTIONS)),
        },
    }
}

fn clarification(options: &[&str]) -> Clarification {
    Clarification {
        needed: true,
        options: options.iter().map(|o| o.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn oncology_terms_match_case_insensitively() {
        for query in [
            "Where is the unmet need in oncology?",
            "UNMET NEED for rare disease",
            "Cancer pipelines in Asia",
            "OnCoLoGy market",
        ] {
            assert_eq!(Topic::classify(query), Topic::Oncology, "query: {}", query);
        }
    }

    #[test]
    fn each_group_is_reachable() {
        assert_eq!(Topic::classify("active clinical trials for AML"), Topic::ClinicalTrials);
        assert_eq!(Topic::classify("Phase III readouts"), Topic::ClinicalTrials);
        assert_eq!(Topic::classify("Intellectual Property cliffs"), Topic::Patents);
        assert_eq!(Topic::classify("Biosimilar entrants"), Topic::Biosimilars);
        assert_eq!(Topic::classify("pricing competition in EU"), Topic::Biosimilars);
        assert_eq!(Topic::classify("tell me about tariffs"), Topic::General);
    }

    #[test]
    fn earlier_groups_take_priority() {
        assert_eq!(Topic::classify("oncology patent"), Topic::Oncology);
        assert_eq!(Topic::classify("patent for phase 2 asset"), Topic::ClinicalTrials);
        assert_eq!(Topic::classify("biosimilar patent thicket"), Topic::Patents);
    }

    #[test]
    fn oncology_candidate_asks_for_four_options() {
        let candidate = lookup("cancer");
        assert_eq!(candidate.topic, Topic::Oncology);
        assert_eq!(
            candidate.clarification,
            Some(Clarification {
                needed: true,
                options: vec![
                    "By Region".to_string(),
                    "By Mechanism of Action".to_string(),
                    "By Treatment Line".to_string(),
                    "By Patient Population".to_string(),
                ],
            })
        );
        assert_eq!(candidate.data.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn default_candidate_asks_for_generic_options() {
        let candidate = lookup("hello");
        assert_eq!(candidate.topic, Topic::General);
        assert!(candidate.data.is_none());
        let clarification = candidate.clarification.unwrap();
        assert!(clarification.needed);
        assert_eq!(clarification.options, GENERAL_OPTIONS.map(String::from).to_vec());
    }

    #[test]
    fn middle_groups_carry_no_clarification() {
        for topic in [Topic::ClinicalTrials, Topic::Patents, Topic::Biosimilars] {
            assert_eq!(canned(topic).clarification, None);
        }
    }

    #[test]
    fn every_canned_attachment_decodes() {
        for topic in [
            Topic::Oncology,
            Topic::ClinicalTrials,
            Topic::Patents,
            Topic::Biosimilars,
            Topic::General,
        ] {
            for data in canned(topic).data.unwrap_or_default() {
                assert!(data.body().is_some(), "{:?} {:?}", topic, data.title);
            }
        }
    }
}
