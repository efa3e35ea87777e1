//! Image type labels and the sentinel values stages substitute when their
//! capability fails.

/// Image type recorded when classification fails or yields an unknown label.
pub const UNKNOWN_IMAGE_TYPE: &str = "Unknown";

/// Model name and analysis result recorded when analysis fails.
pub const PENDING_VALUE: &str = "TBD";

/// Feedback recorded when narrative generation fails.
pub const FEEDBACK_PLACEHOLDER: &str =
    "Feedback could not be generated for this image. Please review the findings above with a clinician.";

/// The closed set of image types Detection may report besides `Unknown`.
pub const KNOWN_IMAGE_TYPES: [&str; 4] = ["X-ray", "CT", "MRI", "Ultrasound"];

/// Map a classifier label onto the closed set, falling back to `Unknown`.
pub fn normalize_image_type(label: &str) -> String {
    let key: String = label
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();

    let canonical = match key.as_str() {
        "xray" | "radiograph" => "X-ray",
        "ct" | "ctscan" => "CT",
        "mri" => "MRI",
        "ultrasound" | "us" | "sonogram" => "Ultrasound",
        _ => UNKNOWN_IMAGE_TYPE,
    };
    canonical.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_known_labels() {
        assert_eq!(normalize_image_type("X-ray"), "X-ray");
        assert_eq!(normalize_image_type(" xray "), "X-ray");
        assert_eq!(normalize_image_type("CT scan"), "CT");
        assert_eq!(normalize_image_type("mri"), "MRI");
        assert_eq!(normalize_image_type("Sonogram"), "Ultrasound");

        for label in KNOWN_IMAGE_TYPES {
            assert_eq!(normalize_image_type(label), label);
        }
    }

    #[test]
    fn test_normalize_unknown_labels() {
        assert_eq!(normalize_image_type(""), UNKNOWN_IMAGE_TYPE);
        assert_eq!(normalize_image_type("photograph"), UNKNOWN_IMAGE_TYPE);
    }
}
