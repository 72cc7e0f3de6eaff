use std::path::Path;

use chrono::Utc;
use uuid::Uuid;

/// Generates a collision free filename for a new upload.
///
/// The name is made of the current unix time in milliseconds and a random
/// uuid, followed by the extension of the uploaded file if it had one, or
/// an extension derived from the content type otherwise.
pub fn unique_filename(original_name: Option<&str>, mimetype: &str) -> String {
    let stem = format!("{}-{}", Utc::now().timestamp_millis(), Uuid::new_v4());

    match original_name
        .and_then(extension_of)
        .or_else(|| extension_for_mime(mimetype))
    {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem,
    }
}

fn extension_of(name: &str) -> Option<String> {
    let ext = Path::new(name).extension()?.to_str()?;
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }

    Some(ext.to_ascii_lowercase())
}

fn extension_for_mime(mimetype: &str) -> Option<String> {
    let parsed = mimetype.parse::<mime::Mime>().ok()?;
    let ext = match parsed.subtype().as_str() {
        "jpeg" | "pjpeg" => "jpg",
        "svg" => "svg",
        other if other.chars().all(|c| c.is_ascii_alphanumeric()) => other,
        _ => return None,
    };

    Some(ext.to_string())
}
