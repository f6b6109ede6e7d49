use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonName {
    pub first: String,
    pub middle: String,
    pub last: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostalAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
}

/// The applicant record shown in the review form and submitted to the backend.
///
/// Every field always has a value: `Default` is the all-empty form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateRecord {
    pub name: PersonName,
    pub email: String,
    pub phone: String,
    pub secondary_phone: String,
    pub address: PostalAddress,
    pub gender: String,
    pub skills: Vec<String>,
    /// e.g. "Full-time", "Per diem", "Travel contract".
    pub employment_basis: String,
    pub work_authorization: bool,
    pub years_of_experience: f64,
    pub work_status: String,
    pub resume_category: String,
    pub cover_letter: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NameFragment {
    pub first: Option<String>,
    pub middle: Option<String>,
    pub last: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AddressFragment {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
}

/// What the extraction service actually returned. Absent and `null` fields are
/// `None`; a field with the wrong JSON type fails the whole decode.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CandidateFragment {
    pub name: Option<NameFragment>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub secondary_phone: Option<String>,
    pub address: Option<AddressFragment>,
    pub gender: Option<String>,
    pub skills: Option<Vec<String>>,
    pub employment_basis: Option<String>,
    pub work_authorization: Option<bool>,
    pub years_of_experience: Option<f64>,
    pub work_status: Option<String>,
    pub resume_category: Option<String>,
    pub cover_letter: Option<String>,
}

impl CandidateFragment {
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Fills every absent field with its default. Normalisation is idempotent,
    /// so decoding an already complete record gives the same record back.
    pub fn into_record(self) -> CandidateRecord {
        let name = self.name.unwrap_or_default();
        let address = self.address.unwrap_or_default();

        CandidateRecord {
            name: PersonName {
                first: text(name.first),
                middle: text(name.middle),
                last: text(name.last),
            },
            email: text(self.email),
            phone: text(self.phone),
            secondary_phone: text(self.secondary_phone),
            address: PostalAddress {
                street: text(address.street),
                city: text(address.city),
                state: text(address.state),
                zip: text(address.zip),
                country: text(address.country),
            },
            gender: text(self.gender),
            skills: self
                .skills
                .unwrap_or_default()
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            employment_basis: text(self.employment_basis),
            work_authorization: self.work_authorization.unwrap_or(false),
            years_of_experience: self
                .years_of_experience
                .filter(|y| y.is_finite() && *y > 0.0)
                .unwrap_or(0.0),
            work_status: text(self.work_status),
            resume_category: text(self.resume_category),
            cover_letter: text(self.cover_letter),
        }
    }
}

fn text(value: Option<String>) -> String {
    value.map(|s| s.trim().to_string()).unwrap_or_default()
}
