//! Symbol export: writes renderer symbol images and metadata beside the
//! layer output, then points each symbol at its saved copy.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use arcgis_export_arcgis_models::Symbol;
use arcgis_export_convert::Renderer;
use arcgis_export_export::kml::image_extension;
use base64::Engine as _;
use regex::Regex;

use crate::PipelineError;
use crate::filename::sanitize_layer_name;

/// Directory, relative to the output directory, holding saved symbols.
pub const SYMBOLS_DIR: &str = "symbols";

/// Characters replaced with `_` in class labels.
static CLASS_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*\s]"#).unwrap_or_else(|_| unreachable!()));

/// File stem for a unique-value class symbol.
#[must_use]
pub fn class_file_base(label: &str, index: usize) -> String {
    let label = CLASS_LABEL_RE.replace_all(label, "_");
    if label.is_empty() {
        format!("class_{index}")
    } else {
        format!("class_{label}")
    }
}

fn io_error(path: &Path, source: std::io::Error) -> PipelineError {
    PipelineError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Writes one symbol's image (when it carries one) and its JSON metadata
/// into `dir`. Returns the image file name.
///
/// # Errors
///
/// * If the image payload is not valid base64
/// * If a file cannot be written
pub async fn save_symbol(symbol: &Symbol, dir: &Path, base: &str) -> Result<String, PipelineError> {
    let file_name = format!("{base}{}", image_extension(&symbol.content_type));

    if !symbol.image_data.is_empty() {
        let data = base64::engine::general_purpose::STANDARD
            .decode(&symbol.image_data)
            .map_err(|e| {
                io_error(
                    &dir.join(&file_name),
                    std::io::Error::new(std::io::ErrorKind::InvalidData, e),
                )
            })?;
        let path = dir.join(&file_name);
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| io_error(&path, e))?;
    }

    let metadata = serde_json::json!({
        "type": symbol.kind,
        "url": symbol.url,
        "contentType": symbol.content_type,
        "width": symbol.width,
        "height": symbol.height,
        "xoffset": symbol.x_offset,
        "yoffset": symbol.y_offset,
        "angle": symbol.angle,
    });
    let path = dir.join(format!("{base}.json"));
    let bytes = serde_json::to_vec_pretty(&metadata).map_err(|e| io_error(&path, e.into()))?;
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| io_error(&path, e))?;

    Ok(file_name)
}

/// Saves one symbol and, on success, rewrites its URL to the saved
/// relative path. Failures are logged and leave the symbol unchanged.
async fn save_and_relink(symbol: &mut Symbol, dir: &Path, relative: &str, base: &str) {
    match save_symbol(symbol, dir, base).await {
        Ok(file_name) => symbol.url = format!("{relative}/{file_name}"),
        Err(e) => log::warn!("Failed to save symbol {base}: {e}"),
    }
}

/// Saves every symbol of a renderer under
/// `{output_dir}/symbols/{sanitized layer name}/` and relinks them.
///
/// The layer name comes from the server, so it is reduced to a single
/// path component with [`sanitize_layer_name`] before use.
///
/// # Errors
///
/// * If the symbols directory cannot be created
pub async fn save_renderer_symbols(
    renderer: &mut Renderer,
    output_dir: &Path,
    layer_name: &str,
    layer_id: &str,
) -> Result<(), PipelineError> {
    let dir_name = sanitize_layer_name(layer_name, layer_id);
    let dir: PathBuf = output_dir.join(SYMBOLS_DIR).join(&dir_name);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| io_error(&dir, e))?;
    let relative = format!("{SYMBOLS_DIR}/{dir_name}");

    if let Some(symbol) = renderer.default_symbol_mut() {
        save_and_relink(symbol, &dir, &relative, "default").await;
    }

    for (index, class) in renderer.classes_mut().iter_mut().enumerate() {
        let base = class_file_base(&class.label, index);
        save_and_relink(&mut class.symbol, &dir, &relative, &base).await;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcgis_export_convert::SymbolClass;

    fn symbol(image_data: &str) -> Symbol {
        Symbol {
            kind: "esriPMS".to_string(),
            url: "remote-ref".to_string(),
            image_data: image_data.to_string(),
            content_type: "image/png".to_string(),
            width: 12.0,
            height: 12.0,
            ..Symbol::default()
        }
    }

    #[test]
    fn class_bases_are_sanitized() {
        assert_eq!(class_file_base("Single Family", 0), "class_Single_Family");
        assert_eq!(class_file_base("A/B", 1), "class_A_B");
        assert_eq!(class_file_base("", 4), "class_4");
    }

    #[tokio::test]
    async fn saves_images_metadata_and_relinks() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut renderer = Renderer::UniqueValue {
            field: "ZONE".to_string(),
            default_symbol: Some(symbol("aGVsbG8=")),
            classes: vec![
                SymbolClass {
                    label: "Res idential".to_string(),
                    values: vec!["R".to_string()],
                    symbol: symbol(""),
                },
                SymbolClass {
                    label: "Broken".to_string(),
                    values: vec!["B".to_string()],
                    symbol: symbol("!!!"),
                },
            ],
        };

        save_renderer_symbols(&mut renderer, tmp.path(), "Zones", "0")
            .await
            .unwrap();

        let dir = tmp.path().join("symbols").join("Zones");
        assert_eq!(std::fs::read(dir.join("default.png")).unwrap(), b"hello");
        let metadata: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.join("default.json")).unwrap()).unwrap();
        assert_eq!(metadata["url"], "remote-ref");
        assert_eq!(metadata["type"], "esriPMS");

        assert!(dir.join("class_Res_idential.json").exists());
        assert!(!dir.join("class_Res_idential.png").exists());

        assert_eq!(
            renderer.default_symbol().map(|s| s.url.as_str()),
            Some("symbols/Zones/default.png")
        );
        assert_eq!(renderer.classes()[0].symbol.url, "symbols/Zones/class_Res_idential.png");
        assert_eq!(renderer.classes()[1].symbol.url, "remote-ref");
    }

    #[tokio::test]
    async fn layer_names_cannot_leave_the_output_directory() {
        let tmp = tempfile::TempDir::new().unwrap();
        let output = tmp.path().join("out");

        for (name, expected_dir) in [
            ("/abs", "abs"),
            ("../x", "..x"),
            ("..", "Layer_6"),
            ("Zone: A/B", "Zone_AB"),
        ] {
            let mut renderer = Renderer::Simple {
                default_symbol: Some(symbol("aGVsbG8=")),
            };
            save_renderer_symbols(&mut renderer, &output, name, "6")
                .await
                .unwrap();

            let dir = output.join("symbols").join(expected_dir);
            assert!(dir.join("default.png").exists(), "{name}");
            assert!(dir.join("default.json").exists(), "{name}");
            assert_eq!(
                renderer.default_symbol().map(|s| s.url.clone()),
                Some(format!("symbols/{expected_dir}/default.png")),
            );
        }

        let top_level: Vec<String> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(top_level, ["out"]);
    }
}
