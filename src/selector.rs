use crate::error::RetrievalError;
use crate::models::{ChapterPageManifest, QualityTier, ResolvedPageUrl};

/// Resolve the delivery URL for one page of a located chapter.
///
/// The index is checked against the standard list before anything else. A
/// reduced request uses the reduced list only when it has an entry at that
/// index and silently falls back to the standard list otherwise.
pub fn select(
    manifest: &ChapterPageManifest,
    tier: QualityTier,
    index: usize,
) -> Result<ResolvedPageUrl, RetrievalError> {
    let Some(standard_ref) = manifest.standard_refs.get(index) else {
        return Err(RetrievalError::InvalidPage {
            index,
            available: manifest.page_count(),
        });
    };

    let (tier, file) = match (tier, manifest.reduced_refs.get(index)) {
        (QualityTier::Reduced, Some(reduced_ref)) => (QualityTier::Reduced, reduced_ref),
        (QualityTier::Reduced, None) => {
            log::debug!(
                "No reduced reference for page {} (only {}), using standard",
                index,
                manifest.reduced_refs.len()
            );
            (QualityTier::Standard, standard_ref)
        }
        (QualityTier::Standard, _) => (QualityTier::Standard, standard_ref),
    };

    Ok(ResolvedPageUrl {
        url: format!(
            "{}/{}/{}/{}",
            manifest.delivery_base_url,
            tier.path_segment(),
            manifest.content_hash,
            file
        ),
        tier,
    })
}
