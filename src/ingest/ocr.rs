use anyhow::{Context, Result};
use std::path::Path;
use tokio::process::Command;

/// Supported image formats for OCR
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "tiff", "tif", "webp"];

/// Check if a file is an image that can be OCR'd
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Validate a file path for safe use with external commands
fn validate_path(path: &Path) -> Result<std::path::PathBuf> {
    // Ensure path exists
    if !path.exists() {
        anyhow::bail!("File does not exist: {:?}", path);
    }

    // Get canonical path to prevent traversal attacks
    let canonical = std::fs::canonicalize(path)
        .with_context(|| format!("Failed to resolve path: {:?}", path))?;

    // Ensure it's a regular file
    if !canonical.is_file() {
        anyhow::bail!("Path is not a regular file: {:?}", path);
    }

    // Verify valid UTF-8 (required for command args)
    if canonical.to_str().is_none() {
        anyhow::bail!("Path contains invalid UTF-8 characters: {:?}", path);
    }

    Ok(canonical)
}

/// Extract Japanese text from an image using Tesseract OCR
pub async fn extract_japanese_text(path: &Path) -> Result<String> {
    // Validate input path
    let canonical_path = validate_path(path)?;
    let path_str = canonical_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in image path"))?;

    // Check if tesseract is available
    let check = Command::new("tesseract").arg("--version").output().await;

    if check.is_err() {
        anyhow::bail!(
            "Tesseract OCR not found. Install it (with Japanese data) with:\n  \
             - Ubuntu/Debian: sudo apt install tesseract-ocr tesseract-ocr-jpn\n  \
             - macOS: brew install tesseract tesseract-lang\n  \
             - Windows: https://github.com/UB-Mannheim/tesseract/wiki"
        );
    }

    // Run tesseract with validated path
    let output = Command::new("tesseract")
        .arg(path_str)
        .arg("stdout") // Output to stdout
        .arg("-l")
        .arg("jpn") // Japanese language data
        .arg("--psm")
        .arg("6") // Assume a uniform block of text
        .output()
        .await
        .context("Failed to run tesseract")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("Tesseract failed: {}", stderr);
    }

    let text = String::from_utf8_lossy(&output.stdout).to_string();
    let text = clean_ocr_text(&text);

    if text.is_empty() {
        anyhow::bail!("No text found in image");
    }

    Ok(text)
}

/// Clean up OCR output: trim lines, drop empties, and remove the ASCII
/// spaces tesseract inserts between Japanese characters.
fn clean_ocr_text(text: &str) -> String {
    let mut lines = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        lines.push(strip_intra_japanese_spaces(trimmed));
    }

    lines.join("\n").trim().to_string()
}

/// Drop a space only when both of its neighbors are non-ASCII characters.
/// Latin words inside the text keep their spacing.
fn strip_intra_japanese_spaces(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut result = String::with_capacity(line.len());

    for (i, &c) in chars.iter().enumerate() {
        if c == ' ' {
            let prev_japanese = i > 0 && !chars[i - 1].is_ascii();
            let next_japanese = chars.get(i + 1).is_some_and(|n| !n.is_ascii());
            if prev_japanese && next_japanese {
                continue;
            }
        }
        result.push(c);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file(Path::new("test.png")));
        assert!(is_image_file(Path::new("test.jpg")));
        assert!(is_image_file(Path::new("test.JPEG")));
        assert!(!is_image_file(Path::new("test.pdf")));
        assert!(!is_image_file(Path::new("test.txt")));
    }

    #[test]
    fn test_clean_ocr_text_strips_intra_japanese_spaces() {
        let input = "わ た し は 寿 司 を 食 べ ま す";
        assert_eq!(clean_ocr_text(input), "わたしは寿司を食べます");
    }

    #[test]
    fn test_clean_ocr_text_keeps_latin_spacing() {
        let input = "JLPT N5 の 問題";
        assert_eq!(clean_ocr_text(input), "JLPT N5 の問題");
    }

    #[test]
    fn test_clean_ocr_text_drops_empty_lines() {
        let input = "  一行目  \n\n\n  二行目  \n";
        assert_eq!(clean_ocr_text(input), "一行目\n二行目");
    }
}
