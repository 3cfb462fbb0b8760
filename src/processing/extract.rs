//! Plain-text extraction from uploaded files.

use docx_rs::{DocumentChild, ParagraphChild, RunChild};
use std::path::Path;
use thiserror::Error;

/// Errors raised while turning file bytes into text.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The file extension is not one of pdf, docx, txt.
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),
    /// The decoder for a supported format rejected the bytes.
    #[error("Failed to extract {format} text: {cause}")]
    ExtractionFailure {
        /// Format being decoded.
        format: &'static str,
        /// Decoder error message.
        cause: String,
    },
}

/// Extract trimmed text from `data`, dispatching on the extension of `filename`.
pub fn extract_text(data: &[u8], filename: &str) -> Result<String, ExtractError> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let text = match extension.as_str() {
        "pdf" => extract_pdf(data)?,
        "docx" => extract_docx(data)?,
        "txt" => String::from_utf8_lossy(data).into_owned(),
        other => {
            let label = if other.is_empty() {
                filename.to_string()
            } else {
                format!(".{other}")
            };
            return Err(ExtractError::UnsupportedFormat(label));
        }
    };

    Ok(text.trim().to_string())
}

fn extract_pdf(data: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(data).map_err(|err| ExtractError::ExtractionFailure {
        format: "pdf",
        cause: err.to_string(),
    })
}

fn extract_docx(data: &[u8]) -> Result<String, ExtractError> {
    let docx = docx_rs::read_docx(data).map_err(|err| ExtractError::ExtractionFailure {
        format: "docx",
        cause: err.to_string(),
    })?;

    let mut paragraphs = Vec::new();
    for child in &docx.document.children {
        let DocumentChild::Paragraph(paragraph) = child else {
            continue;
        };

        let mut line = String::new();
        for paragraph_child in &paragraph.children {
            if let ParagraphChild::Run(run) = paragraph_child {
                for run_child in &run.children {
                    if let RunChild::Text(text) = run_child {
                        line.push_str(&text.text);
                    }
                }
            }
        }

        if !line.trim().is_empty() {
            paragraphs.push(line);
        }
    }

    Ok(paragraphs.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn txt_files_are_decoded_and_trimmed() {
        let text = extract_text(b"  Hello, handbook.\n", "notes.TXT").expect("txt");
        assert_eq!(text, "Hello, handbook.");
    }

    #[test]
    fn invalid_utf8_is_replaced_rather_than_rejected() {
        let text = extract_text(&[0x66, 0x6f, 0xff, 0x6f], "bytes.txt").expect("txt");
        assert_eq!(text, "fo\u{fffd}o");
    }

    #[test]
    fn unknown_extensions_are_unsupported() {
        let err = extract_text(b"a,b", "table.csv").expect_err("csv");
        assert!(matches!(err, ExtractError::UnsupportedFormat(ref ext) if ext == ".csv"));
        assert_eq!(err.to_string(), "Unsupported file type: .csv");

        let err = extract_text(b"data", "README").expect_err("no extension");
        assert!(matches!(err, ExtractError::UnsupportedFormat(_)));
    }

    fn docx_bytes(paragraphs: Vec<docx_rs::Paragraph>) -> Vec<u8> {
        let docx = paragraphs
            .into_iter()
            .fold(docx_rs::Docx::new(), |docx, paragraph| docx.add_paragraph(paragraph));
        let mut cursor = std::io::Cursor::new(Vec::new());
        docx.build().pack(&mut cursor).expect("pack docx");
        cursor.into_inner()
    }

    #[test]
    fn docx_runs_join_per_paragraph_and_blank_paragraphs_are_skipped() {
        use docx_rs::{Paragraph, Run};

        let bytes = docx_bytes(vec![
            Paragraph::new()
                .add_run(Run::new().add_text("Hello "))
                .add_run(Run::new().add_text("world")),
            Paragraph::new(),
            Paragraph::new().add_run(Run::new().add_text("   ")),
            Paragraph::new().add_run(Run::new().add_text("Second")),
        ]);

        let text = extract_text(&bytes, "handbook.DOCX").expect("docx");
        assert_eq!(text, "Hello world\nSecond");
    }

    #[test]
    fn corrupt_documents_report_extraction_failure() {
        let err = extract_text(b"not a zip archive", "broken.docx").expect_err("docx");
        assert!(matches!(
            err,
            ExtractError::ExtractionFailure { format: "docx", .. }
        ));

        let err = extract_text(b"not a pdf", "broken.pdf").expect_err("pdf");
        assert!(matches!(
            err,
            ExtractError::ExtractionFailure { format: "pdf", .. }
        ));
    }
}
