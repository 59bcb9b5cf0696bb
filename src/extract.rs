use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::util::{copy_file, write_text_file};

pub const ENGINE_TXT_COPY: &str = "txt-copy";
pub const ENGINE_PDFTOTEXT: &str = "pdftotext";

pub fn extract_stage1(input: &Path, stage1_path: &Path) -> Result<&'static str> {
    let suffix = input
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match suffix.as_str() {
        "txt" => {
            copy_file(input, stage1_path)?;
            info!(stage1 = %stage1_path.display(), "stage1 text copied");
            Ok(ENGINE_TXT_COPY)
        }
        "pdf" => {
            let pages = extract_pages_with_pdftotext(input)?;
            let page_count = pages.len();
            write_text_file(stage1_path, &frame_pages(&pages))?;
            info!(
                pages = page_count,
                stage1 = %stage1_path.display(),
                "stage1 pdf text extracted"
            );
            Ok(ENGINE_PDFTOTEXT)
        }
        "" => bail!(
            "input file has no extension, expected .txt or .pdf: {}",
            input.display()
        ),
        other => bail!(
            "unsupported input type .{other}, expected .txt or .pdf: {}",
            input.display()
        ),
    }
}

fn extract_pages_with_pdftotext(pdf_path: &Path) -> Result<Vec<String>> {
    let output = Command::new("pdftotext")
        .arg("-enc")
        .arg("UTF-8")
        .arg("-f")
        .arg("1")
        .arg(pdf_path)
        .arg("-")
        .output()
        .with_context(|| format!("failed to run pdftotext for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftotext failed for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut pages: Vec<String> = stdout
        .split('\u{000C}')
        .map(|page| page.replace('\u{0000}', ""))
        .collect();

    while pages.last().is_some_and(|page| page.trim().is_empty()) {
        pages.pop();
    }

    Ok(pages)
}

fn frame_pages(pages: &[String]) -> String {
    let mut chunks: Vec<String> = Vec::with_capacity(pages.len() * 3);

    for (index, page) in pages.iter().enumerate() {
        chunks.push(format!("<!-- Page {} -->", index + 1));
        chunks.push(page.trim_end().to_string());
        chunks.push(String::new());
    }

    let mut text = chunks.join("\n").trim_end().to_string();
    text.push('\n');
    text
}
