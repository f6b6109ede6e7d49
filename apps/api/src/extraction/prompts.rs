// Extraction prompt templates. `{document}` is replaced with the document text,
// or with a pointer to the attached file when the document travels inline.

pub const ATTACHED_DOCUMENT: &str = "(see the attached document)";

pub const RESUME_EXTRACTION_PROMPT: &str = r#"Extract the candidate's details from the resume below into a JSON object.

RESUME:
{document}

OUTPUT SCHEMA (return exactly this structure; use the fallback when a value is missing):
{
  "name": {
    "first": "string (fallback \"\")",
    "middle": "string (fallback \"\")",
    "last": "string (fallback \"\")"
  },
  "email": "string (fallback \"\")",
  "phone": "string, primary phone number (fallback \"\")",
  "secondary_phone": "string, any other phone number (fallback \"\")",
  "address": {
    "street": "string (fallback \"\")",
    "city": "string (fallback \"\")",
    "state": "string, full state name (fallback \"\")",
    "zip": "string, postal code (fallback \"\")",
    "country": "string (fallback \"\")"
  },
  "gender": "string, only if explicitly stated (fallback \"\")",
  "skills": ["string"] (fallback []),
  "employment_basis": "string, e.g. Full-time, Part-time, Per diem, Travel contract (fallback \"\")",
  "work_authorization": boolean, true only if the resume states the candidate is authorized to work in the US (fallback false),
  "years_of_experience": number, total years of professional experience (fallback 0),
  "work_status": "string, e.g. Available, Employed, Open to offers (fallback \"\")",
  "resume_category": "string, the candidate's primary discipline, e.g. Nursing, Allied Health, Therapy (fallback \"\")",
  "cover_letter": "string, a 2-3 sentence professional summary of the candidate (fallback \"\")"
}

RULES:
1. If a postal code is present but city or state is missing, infer the city and state from the postal code.
2. Normalize state abbreviations to full state names (e.g. "TX" -> "Texas").
3. Skills are short labels (e.g. "ICU", "Telemetry", "EPIC"), one per array entry, no duplicates.
4. years_of_experience is a number, never a string.
5. Return ONLY the JSON object, with no other text and no code fences."#;

pub const CERTIFICATE_EXTRACTION_PROMPT: &str = r#"Extract the details of the professional certification or license below into a JSON object.

CERTIFICATE:
{document}

RECOGNISED CERTIFICATE TYPES (short code: full name):
{short_codes}

OUTPUT SCHEMA (return exactly this structure; use the fallback when a value is missing):
{
  "certificate_type": "string (fallback \"\")",
  "holder_name": "string, the name exactly as printed (fallback \"\")",
  "license_number": "string, certificate, card, or license number (fallback \"\")",
  "issue_date": "string, YYYY-MM-DD (fallback \"\")",
  "expiry_date": "string, YYYY-MM-DD (fallback \"\")",
  "issuing_organization": "string (fallback \"\")"
}

RULES:
1. If the certificate's full name matches one of the recognised types, set certificate_type to its short code. Otherwise set it to the full name exactly as printed.
2. Dates must be YYYY-MM-DD. If a date is ambiguous (e.g. 03/04/2024 could be March or April) or unreadable, use "".
3. Return ONLY the JSON object, with no other text and no code fences."#;
