pub const GEMINI_PROVIDER_ID: &str = "gemini";

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Normalizes a configured provider id, defaulting blanks to Gemini.
pub fn canonical_provider_id(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "gemini" | "google" | "rig-gemini" => Some(GEMINI_PROVIDER_ID),
        _ => None,
    }
}
