//! Curriculum ingestion: uploaded PDF bytes → plain text.

/// Extracts text from an uploaded curriculum PDF. Unreadable files and
/// files with no extractable text are caller errors, not server faults.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, String> {
    match pdf_extract::extract_text_from_mem(bytes) {
        Ok(text) if !text.trim().is_empty() => Ok(text),
        Ok(_) => Err("The PDF contains no extractable text".to_string()),
        Err(e) => Err(format!("Could not read the PDF: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_pdf_bytes_are_rejected() {
        assert!(extract_pdf_text(b"this is not a pdf").is_err());
        assert!(extract_pdf_text(&[]).is_err());
    }
}
