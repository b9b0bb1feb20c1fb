use serde::{Deserialize, Serialize};

/// A named data source the analysis service attributes content to.
///
/// Purely a label on the client side; agents do not run here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Agent {
    Iqvia,
    Exim,
    Patent,
    ClinicalTrials,
    InternalKnowledge,
    WebIntelligence,
}

impl Agent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Agent::Iqvia => "iqvia",
            Agent::Exim => "exim",
            Agent::Patent => "patent",
            Agent::ClinicalTrials => "clinical_trials",
            Agent::InternalKnowledge => "internal_knowledge",
            Agent::WebIntelligence => "web_intelligence",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace([' ', '-'], "_").as_str() {
            "iqvia" => Some(Agent::Iqvia),
            "exim" => Some(Agent::Exim),
            "patent" => Some(Agent::Patent),
            "clinical_trials" => Some(Agent::ClinicalTrials),
            "internal_knowledge" | "internal_docs" => Some(Agent::InternalKnowledge),
            "web_intelligence" => Some(Agent::WebIntelligence),
            _ => None,
        }
    }

    pub fn all() -> Vec<Agent> {
        vec![
            Agent::Iqvia,
            Agent::Exim,
            Agent::Patent,
            Agent::ClinicalTrials,
            Agent::InternalKnowledge,
            Agent::WebIntelligence,
        ]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Agent::Iqvia => "IQVIA Agent",
            Agent::Exim => "EXIM Agent",
            Agent::Patent => "Patent Agent",
            Agent::ClinicalTrials => "Clinical Trials Agent",
            Agent::InternalKnowledge => "Internal Knowledge Agent",
            Agent::WebIntelligence => "Web Intelligence Agent",
        }
    }
}
