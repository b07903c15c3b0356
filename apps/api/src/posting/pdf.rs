use crate::posting::IntakeError;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Extracts the text layer of a PDF posting. CPU-bound; call from
/// `tokio::task::spawn_blocking`.
pub fn extract_text(bytes: &[u8]) -> Result<String, IntakeError> {
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(IntakeError::Pdf("file is not a PDF document".to_string()));
    }
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| IntakeError::Pdf(e.to_string()))
}
