// Request routing and the handlers behind each route.

use super::models::{DetectedLanguage, HealthStatus, IncomingRequest, OutgoingResponse};
use crate::plugin::LanguageExtractor;
use tracing::debug;

pub const UNKNOWN_LANGUAGE: &str = "unknown";

// Routes a framed request to its handler. Method and path must match exactly.
pub fn route<E>(request: &IncomingRequest, extractor: &E) -> OutgoingResponse
where
    E: LanguageExtractor + ?Sized,
{
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/health") => health(),
        ("POST", "/extract") => extract(&request.body, extractor),
        _ => not_found(),
    }
}

// --- GET /health ---
pub fn health() -> OutgoingResponse {
    OutgoingResponse::json(200, &HealthStatus { status: "healthy" })
}

// --- POST /extract ---
// Runs the plugin over the raw request body.
pub fn extract<E>(body: &[u8], extractor: &E) -> OutgoingResponse
where
    E: LanguageExtractor + ?Sized,
{
    if body.is_empty() {
        return OutgoingResponse::error(400, "No HTML content provided");
    }

    let language = extractor.extract_language(body);
    debug!("Extracted language from {} bytes: {:?}", body.len(), language);

    OutgoingResponse::json(
        200,
        &DetectedLanguage {
            language: language.unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string()),
        },
    )
}

pub fn not_found() -> OutgoingResponse {
    OutgoingResponse::error(404, "Not found")
}
