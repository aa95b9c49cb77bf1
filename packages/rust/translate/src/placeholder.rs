use async_trait::async_trait;

use doccapture_shared::Result;

use crate::Translator;

/// Appends a marker paragraph to the source text.
///
/// Stands in for a real backend: the output always starts with the input,
/// so localized artifacts line up with their primaries.
#[derive(Debug, Clone)]
pub struct PlaceholderTranslator {
    marker: String,
}

impl PlaceholderTranslator {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }
}

#[async_trait]
impl Translator for PlaceholderTranslator {
    fn name(&self) -> &str {
        "placeholder"
    }

    async fn translate(&self, text: &str) -> Result<String> {
        Ok(format!("{text}\n\n{}", self.marker))
    }
}
