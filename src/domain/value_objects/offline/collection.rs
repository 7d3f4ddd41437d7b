use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Named record collection held by the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    Patients,
    Visits,
    Prescriptions,
    LabResults,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Patients,
        Collection::Visits,
        Collection::Prescriptions,
        Collection::LabResults,
    ];

    /// Name used for local storage and sync status rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Patients => "patients",
            Collection::Visits => "visits",
            Collection::Prescriptions => "prescriptions",
            Collection::LabResults => "labResults",
        }
    }

    /// Path segment under `/api/` on the remote server.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Collection::Patients => "patients",
            Collection::Visits => "visits",
            Collection::Prescriptions => "prescriptions",
            Collection::LabResults => "lab-results",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim() {
            "patients" | "patient" => Ok(Collection::Patients),
            "visits" | "visit" => Ok(Collection::Visits),
            "prescriptions" | "prescription" => Ok(Collection::Prescriptions),
            "labResults" | "labResult" | "lab-results" | "lab-result" | "lab_results"
            | "lab_result" => Ok(Collection::LabResults),
            "" => Err("Entity cannot be empty".to_string()),
            other => Err(format!("Unknown entity: {other}")),
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
