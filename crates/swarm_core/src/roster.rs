//! Built-in agents registered when the configuration names none

use chrono::Utc;

use crate::{
    agent::{AgentKind, AgentMetadata, PerformanceRecord},
    config::AgentConfig,
};

struct Entry {
    slug: &'static str,
    name: &'static str,
    kind: AgentKind,
    specialties: &'static [&'static str],
    capabilities: &'static [&'static str],
    model: &'static str,
    tasks_completed: u64,
    accuracy: f64,
    average_response_secs: f64,
    patient_safety_score: f64,
    version: &'static str,
    compliance: &'static [&'static str],
    license: &'static str,
}

const ROSTER: &[Entry] = &[
    Entry {
        slug: "diagnostic-ai-primary",
        name: "Primary Diagnostic AI",
        kind: AgentKind::Diagnostic,
        specialties: &["Internal Medicine", "Family Medicine"],
        capabilities: &[
            "symptom-analysis",
            "differential-diagnosis",
            "risk-assessment",
            "triage",
        ],
        model: "med-gemma-diagnostic-v2",
        tasks_completed: 1500,
        accuracy: 0.92,
        average_response_secs: 2.3,
        patient_safety_score: 0.98,
        version: "2.1.0",
        compliance: &["HIPAA", "FDA AI/ML Guidance"],
        license: "AI-DIAG-001",
    },
    Entry {
        slug: "cardiologist-ai",
        name: "Cardiology Specialist AI",
        kind: AgentKind::Specialist,
        specialties: &["Cardiology"],
        capabilities: &[
            "ecg-analysis",
            "cardiac-imaging",
            "risk-stratification",
            "intervention-planning",
        ],
        model: "clinical-bert-cardio",
        tasks_completed: 800,
        accuracy: 0.94,
        average_response_secs: 3.1,
        patient_safety_score: 0.99,
        version: "1.5.0",
        compliance: &["HIPAA", "ACC Guidelines"],
        license: "AI-CARD-001",
    },
    Entry {
        slug: "emergency-ai",
        name: "Emergency Medicine AI",
        kind: AgentKind::Emergency,
        specialties: &["Emergency Medicine", "Critical Care"],
        capabilities: &[
            "rapid-triage",
            "critical-diagnosis",
            "protocol-guidance",
            "resource-allocation",
        ],
        model: "emergency-llama-v3",
        tasks_completed: 2200,
        accuracy: 0.89,
        average_response_secs: 1.8,
        patient_safety_score: 0.97,
        version: "3.0.0",
        compliance: &["HIPAA", "ACEP Guidelines"],
        license: "AI-EMRG-001",
    },
    Entry {
        slug: "radiologist-ai",
        name: "Radiology AI Interpreter",
        kind: AgentKind::Diagnostic,
        specialties: &["Radiology", "Medical Imaging"],
        capabilities: &[
            "image-analysis",
            "abnormality-detection",
            "report-generation",
            "comparison-studies",
        ],
        model: "radiology-vision-transformer",
        tasks_completed: 5000,
        accuracy: 0.96,
        average_response_secs: 1.2,
        patient_safety_score: 0.98,
        version: "2.3.0",
        compliance: &["HIPAA", "ACR Guidelines", "DICOM"],
        license: "AI-RAD-001",
    },
    Entry {
        slug: "pharmacist-ai",
        name: "Clinical Pharmacist AI",
        kind: AgentKind::Treatment,
        specialties: &["Clinical Pharmacy"],
        capabilities: &[
            "drug-interaction-check",
            "dosage-optimization",
            "allergy-screening",
            "formulary-guidance",
        ],
        model: "pharmacy-bert-v2",
        tasks_completed: 3200,
        accuracy: 0.97,
        average_response_secs: 0.8,
        patient_safety_score: 0.99,
        version: "1.8.0",
        compliance: &["HIPAA", "ASHP Guidelines"],
        license: "AI-PHARM-001",
    },
    Entry {
        slug: "nursing-ai",
        name: "Clinical Nursing AI",
        kind: AgentKind::Monitoring,
        specialties: &["Nursing", "Patient Care"],
        capabilities: &[
            "patient-monitoring",
            "care-planning",
            "medication-administration",
            "patient-education",
        ],
        model: "nursing-care-llm",
        tasks_completed: 4500,
        accuracy: 0.91,
        average_response_secs: 2.1,
        patient_safety_score: 0.98,
        version: "1.4.0",
        compliance: &["HIPAA", "ANA Standards"],
        license: "AI-NURS-001",
    },
    Entry {
        slug: "research-ai",
        name: "Medical Research AI",
        kind: AgentKind::Research,
        specialties: &["Research", "Evidence-Based Medicine"],
        capabilities: &[
            "literature-analysis",
            "clinical-trial-design",
            "data-mining",
            "hypothesis-generation",
        ],
        model: "research-gpt-medical",
        tasks_completed: 1200,
        accuracy: 0.88,
        average_response_secs: 5.2,
        patient_safety_score: 0.95,
        version: "1.2.0",
        compliance: &["HIPAA", "NIH Guidelines"],
        license: "AI-RES-001",
    },
];

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// The seven built-in clinical agents, in registration order
pub fn default_roster() -> Vec<AgentConfig> {
    let now = Utc::now();
    ROSTER
        .iter()
        .map(|entry| AgentConfig {
            slug: entry.slug.to_string(),
            name: entry.name.to_string(),
            kind: entry.kind,
            specialties: strings(entry.specialties),
            capabilities: strings(entry.capabilities),
            model: entry.model.to_string(),
            performance: Some(PerformanceRecord {
                tasks_completed: entry.tasks_completed,
                accuracy: entry.accuracy,
                average_response_secs: entry.average_response_secs,
                patient_safety_score: entry.patient_safety_score,
            }),
            metadata: Some(AgentMetadata {
                version: entry.version.to_string(),
                last_updated: now,
                compliance_levels: strings(entry.compliance),
                license: Some(entry.license.to_string()),
            }),
        })
        .collect()
}
