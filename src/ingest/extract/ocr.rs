//! OCR engines used when a PDF has no usable text layer.
//!
//! An engine is acquired from an [`OcrProvider`] for each fallback run and dropped when the run
//! ends, whether recognition succeeded or not. Engines release their native resources in `Drop`,
//! so nothing outlives the request that needed it.

use std::sync::Arc;
use thiserror::Error;

/// Default recognition language (Tesseract traineddata name).
pub const DEFAULT_OCR_LANGUAGE: &str = "eng";

/// Errors raised while acquiring or running an OCR engine.
#[derive(Debug, Error)]
pub enum OcrError {
    /// No OCR backend is available in this build or environment.
    #[error("OCR engine unavailable: {0}")]
    Unavailable(String),
    /// The backend could not be initialized (missing language data, bad datapath).
    #[error("OCR engine failed to initialize: {0}")]
    Initialization(String),
    /// The backend rejected an image or failed while recognizing it.
    #[error("OCR recognition failed: {0}")]
    Recognition(String),
}

/// A live recognition engine. Dropping it tears down its resources.
pub trait OcrEngine {
    /// Recognize the text in one encoded page image (JPEG, PNG, ...).
    fn recognize(&mut self, image: &[u8]) -> Result<String, OcrError>;
}

/// Hands out fresh engines, one per fallback run.
pub trait OcrProvider: Send + Sync {
    /// Acquire a new engine.
    fn acquire(&self) -> Result<Box<dyn OcrEngine>, OcrError>;
}

/// Run OCR over every page image with a single freshly acquired engine.
///
/// Page texts are joined with blank lines. The engine is released before returning on every
/// path.
pub(crate) fn recognize_pages(
    provider: &dyn OcrProvider,
    images: &[Vec<u8>],
) -> Result<String, OcrError> {
    let mut engine = provider.acquire()?;
    let mut pages = Vec::with_capacity(images.len());
    for (index, image) in images.iter().enumerate() {
        let text = engine.recognize(image)?;
        tracing::debug!(page_image = index, chars = text.len(), "OCR recognized page image");
        pages.push(text);
    }
    Ok(pages.join("\n\n"))
}

/// Provider used when the crate is built without the `ocr` feature.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableOcr;

impl OcrProvider for UnavailableOcr {
    fn acquire(&self) -> Result<Box<dyn OcrEngine>, OcrError> {
        Err(OcrError::Unavailable(
            "docprep was built without the `ocr` feature".to_string(),
        ))
    }
}

/// Build the provider for this build: Tesseract when the `ocr` feature is enabled.
pub fn default_provider(language: &str, datapath: Option<&str>) -> Arc<dyn OcrProvider> {
    #[cfg(feature = "ocr")]
    {
        Arc::new(tesseract_backend::TesseractProvider::new(language, datapath))
    }
    #[cfg(not(feature = "ocr"))]
    {
        tracing::debug!(
            language,
            datapath,
            "OCR feature disabled; scanned PDFs will fail extraction"
        );
        Arc::new(UnavailableOcr)
    }
}

#[cfg(feature = "ocr")]
pub use tesseract_backend::TesseractProvider;

#[cfg(feature = "ocr")]
mod tesseract_backend {
    use super::{OcrEngine, OcrError, OcrProvider};
    use tesseract::Tesseract;

    /// Tesseract-backed provider; every acquisition loads the language model anew.
    #[derive(Debug, Clone)]
    pub struct TesseractProvider {
        language: String,
        datapath: Option<String>,
    }

    impl TesseractProvider {
        /// Create a provider for `language`, optionally reading traineddata from `datapath`.
        pub fn new(language: &str, datapath: Option<&str>) -> Self {
            Self {
                language: language.to_string(),
                datapath: datapath.map(str::to_string),
            }
        }
    }

    impl OcrProvider for TesseractProvider {
        fn acquire(&self) -> Result<Box<dyn OcrEngine>, OcrError> {
            let api = Tesseract::new(self.datapath.as_deref(), Some(&self.language))
                .map_err(|err| OcrError::Initialization(err.to_string()))?;
            tracing::debug!(language = %self.language, "Acquired Tesseract engine");
            Ok(Box::new(TesseractEngine { api: Some(api) }))
        }
    }

    struct TesseractEngine {
        // `set_image_from_mem` consumes the handle; a failed call leaves `None` behind.
        api: Option<Tesseract>,
    }

    impl OcrEngine for TesseractEngine {
        fn recognize(&mut self, image: &[u8]) -> Result<String, OcrError> {
            let api = self.api.take().ok_or_else(|| {
                OcrError::Unavailable("engine was released after an earlier failure".to_string())
            })?;
            let mut api = api
                .set_image_from_mem(image)
                .map_err(|err| OcrError::Recognition(err.to_string()))?;
            let text = api
                .get_text()
                .map_err(|err| OcrError::Recognition(err.to_string()))?;
            self.api = Some(api);
            Ok(text)
        }
    }

    impl Drop for TesseractEngine {
        fn drop(&mut self) {
            tracing::trace!("Releasing Tesseract engine");
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{OcrEngine, OcrError, OcrProvider};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted provider that records acquisitions, releases, and recognized images.
    #[derive(Clone, Default)]
    pub(crate) struct ScriptedOcr {
        acquired: Arc<AtomicUsize>,
        released: Arc<AtomicUsize>,
        recognized: Arc<AtomicUsize>,
        fail_on_recognize: bool,
    }

    impl ScriptedOcr {
        pub(crate) fn failing() -> Self {
            Self {
                fail_on_recognize: true,
                ..Self::default()
            }
        }

        pub(crate) fn acquired(&self) -> usize {
            self.acquired.load(Ordering::SeqCst)
        }

        pub(crate) fn released(&self) -> usize {
            self.released.load(Ordering::SeqCst)
        }

        pub(crate) fn recognized(&self) -> usize {
            self.recognized.load(Ordering::SeqCst)
        }
    }

    struct ScriptedEngine {
        released: Arc<AtomicUsize>,
        recognized: Arc<AtomicUsize>,
        fail: bool,
    }

    impl OcrEngine for ScriptedEngine {
        fn recognize(&mut self, image: &[u8]) -> Result<String, OcrError> {
            if self.fail {
                return Err(OcrError::Recognition("scripted failure".into()));
            }
            self.recognized.fetch_add(1, Ordering::SeqCst);
            Ok(format!("recognized {} bytes", image.len()))
        }
    }

    impl Drop for ScriptedEngine {
        fn drop(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl OcrProvider for ScriptedOcr {
        fn acquire(&self) -> Result<Box<dyn OcrEngine>, OcrError> {
            self.acquired.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedEngine {
                released: self.released.clone(),
                recognized: self.recognized.clone(),
                fail: self.fail_on_recognize,
            }))
        }
    }
}
