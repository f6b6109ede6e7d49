use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::documents::{FileSummary, UploadedFile};

/// A single application session accepts at most this many certifications.
pub const MAX_CERTIFICATIONS: usize = 5;

/// Canonical date format for certificate issue/expiry dates.
pub const CERTIFICATE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Recognised certification short codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CertificateCode {
    Bls,
    Acls,
    Pals,
    Nrp,
    Tncc,
    Enpc,
    Ccrn,
    Cen,
    Nihss,
    Cpr,
    Rn,
    Lpn,
    Cna,
    Cma,
    Rrt,
    Arrt,
}

impl CertificateCode {
    pub const ALL: &'static [CertificateCode] = &[
        CertificateCode::Bls,
        CertificateCode::Acls,
        CertificateCode::Pals,
        CertificateCode::Nrp,
        CertificateCode::Tncc,
        CertificateCode::Enpc,
        CertificateCode::Ccrn,
        CertificateCode::Cen,
        CertificateCode::Nihss,
        CertificateCode::Cpr,
        CertificateCode::Rn,
        CertificateCode::Lpn,
        CertificateCode::Cna,
        CertificateCode::Cma,
        CertificateCode::Rrt,
        CertificateCode::Arrt,
    ];

    pub fn short_code(&self) -> &'static str {
        match self {
            CertificateCode::Bls => "BLS",
            CertificateCode::Acls => "ACLS",
            CertificateCode::Pals => "PALS",
            CertificateCode::Nrp => "NRP",
            CertificateCode::Tncc => "TNCC",
            CertificateCode::Enpc => "ENPC",
            CertificateCode::Ccrn => "CCRN",
            CertificateCode::Cen => "CEN",
            CertificateCode::Nihss => "NIHSS",
            CertificateCode::Cpr => "CPR",
            CertificateCode::Rn => "RN",
            CertificateCode::Lpn => "LPN",
            CertificateCode::Cna => "CNA",
            CertificateCode::Cma => "CMA",
            CertificateCode::Rrt => "RRT",
            CertificateCode::Arrt => "ARRT",
        }
    }

    pub fn expansion(&self) -> &'static str {
        match self {
            CertificateCode::Bls => "Basic Life Support",
            CertificateCode::Acls => "Advanced Cardiovascular Life Support",
            CertificateCode::Pals => "Pediatric Advanced Life Support",
            CertificateCode::Nrp => "Neonatal Resuscitation Program",
            CertificateCode::Tncc => "Trauma Nursing Core Course",
            CertificateCode::Enpc => "Emergency Nursing Pediatric Course",
            CertificateCode::Ccrn => "Critical Care Registered Nurse",
            CertificateCode::Cen => "Certified Emergency Nurse",
            CertificateCode::Nihss => "National Institutes of Health Stroke Scale",
            CertificateCode::Cpr => "Cardiopulmonary Resuscitation",
            CertificateCode::Rn => "Registered Nurse License",
            CertificateCode::Lpn => "Licensed Practical Nurse License",
            CertificateCode::Cna => "Certified Nursing Assistant",
            CertificateCode::Cma => "Certified Medical Assistant",
            CertificateCode::Rrt => "Registered Respiratory Therapist",
            CertificateCode::Arrt => "American Registry of Radiologic Technologists",
        }
    }

    /// Matches a short code or its expansion, ignoring case and surrounding whitespace.
    pub fn resolve(raw: &str) -> Option<Self> {
        let needle = raw.trim();
        Self::ALL.iter().copied().find(|code| {
            code.short_code().eq_ignore_ascii_case(needle)
                || code.expansion().eq_ignore_ascii_case(needle)
        })
    }
}

/// A certification type: a recognised short code, or whatever free text the user
/// (or the extraction service) supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CertificationType {
    Known(CertificateCode),
    Other(String),
}

impl CertificationType {
    /// `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(match CertificateCode::resolve(trimmed) {
            Some(code) => CertificationType::Known(code),
            None => CertificationType::Other(trimmed.to_string()),
        })
    }

    /// Label sent to the backend as the certificate name.
    pub fn label(&self) -> &str {
        match self {
            CertificationType::Known(code) => code.short_code(),
            CertificationType::Other(text) => text,
        }
    }
}

impl From<String> for CertificationType {
    fn from(raw: String) -> Self {
        match CertificateCode::resolve(&raw) {
            Some(code) => CertificationType::Known(code),
            None => CertificationType::Other(raw.trim().to_string()),
        }
    }
}

impl From<CertificationType> for String {
    fn from(value: CertificationType) -> Self {
        value.label().to_string()
    }
}

/// Fields read off a certificate document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CertificateDetails {
    pub certificate_type: Option<CertificationType>,
    pub holder_name: String,
    pub license_number: String,
    pub issue_date: String,
    pub expiry_date: String,
    pub issuing_organization: String,
}

/// Raw certificate extraction output before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CertificateFragment {
    pub certificate_type: Option<String>,
    pub holder_name: Option<String>,
    pub license_number: Option<String>,
    pub issue_date: Option<String>,
    pub expiry_date: Option<String>,
    pub issuing_organization: Option<String>,
}

impl CertificateFragment {
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Validates the service's answer: the type is re-resolved against the short
    /// code table and dates are re-normalised (ambiguous ones are blanked).
    pub fn into_details(self) -> CertificateDetails {
        CertificateDetails {
            certificate_type: self.certificate_type.as_deref().and_then(CertificationType::parse),
            holder_name: trimmed(self.holder_name),
            license_number: trimmed(self.license_number),
            issue_date: normalize_certificate_date(self.issue_date.as_deref().unwrap_or_default()),
            expiry_date: normalize_certificate_date(self.expiry_date.as_deref().unwrap_or_default()),
            issuing_organization: trimmed(self.issuing_organization),
        }
    }
}

fn trimmed(value: Option<String>) -> String {
    value.map(|s| s.trim().to_string()).unwrap_or_default()
}

/// Two-digit years parse as year 0024 and the like; treat those as unrecognised.
const MIN_CERTIFICATE_YEAR: i32 = 1900;

const YEAR_FIRST_FORMATS: &[&str] = &[CERTIFICATE_DATE_FORMAT, "%Y/%m/%d", "%Y.%m.%d"];

const WORDY_DATE_FORMATS: &[&str] = &[
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Returns `raw` as `YYYY-MM-DD`, or an empty string when the date is missing,
/// unrecognised, or ambiguous (e.g. `03/04/2024`).
pub fn normalize_certificate_date(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }

    // chrono's %Y accepts short years, so only try year-first layouts on a 4-digit prefix.
    let bytes = raw.as_bytes();
    let year_first = bytes.len() > 4
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && !bytes[4].is_ascii_digit();
    let formats = if year_first {
        YEAR_FIRST_FORMATS
    } else {
        WORDY_DATE_FORMATS
    };

    formats
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .or_else(|| numeric_day_month_year(raw))
        .filter(|date| date.year() >= MIN_CERTIFICATE_YEAR)
        .map(|date| date.format(CERTIFICATE_DATE_FORMAT).to_string())
        .unwrap_or_default()
}

/// `a/b/yyyy` (or `-`, `.`) where only one reading is possible.
fn numeric_day_month_year(raw: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = raw.split(['/', '-', '.']).collect();
    let [a, b, year] = parts.as_slice() else {
        return None;
    };
    if year.len() != 4 {
        return None;
    }
    let a: u32 = a.parse().ok()?;
    let b: u32 = b.parse().ok()?;
    let year: i32 = year.parse().ok()?;

    let (month, day) = match (a <= 12, b <= 12) {
        _ if a == b => (a, b),
        (true, false) => (a, b),
        (false, true) => (b, a),
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// One certification attached to an application.
#[derive(Debug, Clone)]
pub struct CertificationRecord {
    pub id: Uuid,
    pub certification_type: Option<CertificationType>,
    pub file: Option<UploadedFile>,
    pub details: Option<CertificateDetails>,
}

impl CertificationRecord {
    pub fn new(certification_type: Option<CertificationType>) -> Self {
        Self {
            id: Uuid::new_v4(),
            certification_type,
            file: None,
            details: None,
        }
    }

    /// Only records with both a type and a file are submitted.
    pub fn is_complete(&self) -> bool {
        self.certification_type.is_some() && self.file.is_some()
    }

    pub fn view(&self) -> CertificationView {
        CertificationView {
            id: self.id,
            certification_type: self.certification_type.clone(),
            file: self.file.as_ref().map(UploadedFile::summary),
            details: self.details.clone(),
            complete: self.is_complete(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CertificationView {
    pub id: Uuid,
    pub certification_type: Option<CertificationType>,
    pub file: Option<FileSummary>,
    pub details: Option<CertificateDetails>,
    pub complete: bool,
}
