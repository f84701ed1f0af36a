use capturecore::device_interface::{
    Abundance, CaptureMetadata, CapturedPhoto, DeviceError, PersistenceSink, SavedRecord,
};
use capturecore::export::ExportRecord;
use log::info;
use rand::{rngs::StdRng, SeedableRng};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Writes the image to disk with every metadata field embedded in its name.
pub struct LocalExportSink {
    directory: PathBuf,
    prefix: String,
    rng: Mutex<StdRng>,
}

impl LocalExportSink {
    pub fn new<P: AsRef<Path>>(directory: P, prefix: impl Into<String>) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            prefix: prefix.into(),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    fn next_file_name(&self, label: Abundance, metadata: &CaptureMetadata) -> Result<String, DeviceError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| DeviceError::Failed("file name generator poisoned".into()))?;
        Ok(ExportRecord::file_name(&self.prefix, label, metadata, &mut *rng))
    }
}

impl PersistenceSink for LocalExportSink {
    async fn save(
        &self,
        photo: &CapturedPhoto,
        metadata: &CaptureMetadata,
        label: Abundance,
    ) -> Result<SavedRecord, DeviceError> {
        let file_name = self.next_file_name(label, metadata)?;
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|err| DeviceError::Failed(format!("creating {}: {}", self.directory.display(), err)))?;
        let path = self.directory.join(&file_name);
        tokio::fs::write(&path, &photo.bytes)
            .await
            .map_err(|err| DeviceError::Failed(format!("writing {}: {}", path.display(), err)))?;
        info!("exported capture to {}", path.display());

        Ok(SavedRecord {
            location: path.display().to_string(),
            label,
        })
    }
}
