//! Output file naming.

use arcgis_export_arcgis_models::synthesized_layer_name;
use arcgis_export_export::OutputFormat;

/// Characters removed from file names.
const STRIPPED: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Sanitizes a layer name for use as a file stem or directory name: spaces
/// become `_` and reserved characters are dropped. Falls back to
/// `Layer_{id}` when nothing but dots is left, so the result is always a
/// single path component.
#[must_use]
pub fn sanitize_layer_name(name: &str, layer_id: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| if c == ' ' { '_' } else { c })
        .filter(|c| !STRIPPED.contains(c))
        .collect();

    if sanitized.chars().all(|c| c == '.') {
        synthesized_layer_name(layer_id)
    } else {
        sanitized
    }
}

/// `{prefix}{sanitized name}.{extension}`.
#[must_use]
pub fn output_file_name(prefix: &str, name: &str, layer_id: &str, format: OutputFormat) -> String {
    format!(
        "{prefix}{}.{}",
        sanitize_layer_name(name, layer_id),
        format.extension()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_reserved_characters() {
        assert_eq!(sanitize_layer_name("Roads", "0"), "Roads");
        assert_eq!(sanitize_layer_name("Bus Stops", "0"), "Bus_Stops");
        assert_eq!(sanitize_layer_name("A/B: C?", "0"), "AB_C");
        assert_eq!(sanitize_layer_name("North - South", "0"), "North_-_South");
        assert_eq!(sanitize_layer_name(r#"<>:"/\|?*"#, "7"), "Layer_7");
        assert_eq!(sanitize_layer_name("", "3"), "Layer_3");
    }

    #[test]
    fn result_is_a_single_path_component() {
        assert_eq!(sanitize_layer_name("/abs", "1"), "abs");
        assert_eq!(sanitize_layer_name("../x", "1"), "..x");
        assert_eq!(sanitize_layer_name("C:\\Windows", "1"), "CWindows");
        assert_eq!(sanitize_layer_name("..", "8"), "Layer_8");
        assert_eq!(sanitize_layer_name(".", "8"), "Layer_8");
        assert_eq!(sanitize_layer_name("/../", "8"), "Layer_8");
    }

    #[test]
    fn prefix_and_extension() {
        assert_eq!(
            output_file_name("city_", "Parks", "2", OutputFormat::Kmz),
            "city_Parks.kmz"
        );
        assert_eq!(
            output_file_name("", "Notes", "2", OutputFormat::Text),
            "Notes.txt"
        );
    }
}
