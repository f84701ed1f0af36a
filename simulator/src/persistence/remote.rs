use capturecore::device_interface::{
    Abundance, CaptureMetadata, CapturedPhoto, DeviceError, PersistenceSink, SavedRecord,
};
use log::info;
use serde::{Deserialize, Serialize};

/// Response of the image upload endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub url: String,
}

/// Metadata record stored next to the uploaded image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub image_url: String,
    pub label: Abundance,
    pub metadata: CaptureMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordReceipt {
    pub id: String,
}

/// Uploads the image bytes, then posts a metadata record pointing at them.
pub struct RemoteSink {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteSink {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn upload_image(&self, photo: &CapturedPhoto) -> Result<UploadReceipt, reqwest::Error> {
        self.client
            .post(format!("{}/uploads", self.base_url))
            .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
            .body(photo.bytes.clone())
            .send()
            .await?
            .error_for_status()?
            .json::<UploadReceipt>()
            .await
    }

    async fn post_record(&self, record: &CaptureRecord) -> Result<RecordReceipt, reqwest::Error> {
        self.client
            .post(format!("{}/records", self.base_url))
            .json(record)
            .send()
            .await?
            .error_for_status()?
            .json::<RecordReceipt>()
            .await
    }
}

impl PersistenceSink for RemoteSink {
    async fn save(
        &self,
        photo: &CapturedPhoto,
        metadata: &CaptureMetadata,
        label: Abundance,
    ) -> Result<SavedRecord, DeviceError> {
        let upload = self
            .upload_image(photo)
            .await
            .map_err(|err| DeviceError::Failed(format!("image upload: {}", err)))?;
        let record = CaptureRecord {
            image_url: upload.url,
            label,
            metadata: metadata.clone(),
        };
        let receipt = self
            .post_record(&record)
            .await
            .map_err(|err| DeviceError::Failed(format!("metadata record: {}", err)))?;
        info!("uploaded capture {} -> {}", receipt.id, record.image_url);

        Ok(SavedRecord {
            location: format!("{}/records/{}", self.base_url, receipt.id),
            label,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::{Arc, Mutex};
    use warp::Filter;

    #[tokio::test]
    async fn save_uploads_image_then_record() {
        let records: Arc<Mutex<Vec<CaptureRecord>>> = Arc::default();
        let stored = records.clone();

        let uploads = warp::path("uploads")
            .and(warp::post())
            .and(warp::body::bytes())
            .map(|body: warp::hyper::body::Bytes| {
                warp::reply::json(&UploadReceipt {
                    url: format!("mem://image/{}", body.len()),
                })
            });
        let record_route = warp::path("records")
            .and(warp::post())
            .and(warp::body::json())
            .map(move |record: CaptureRecord| {
                stored.lock().unwrap().push(record);
                warp::reply::json(&RecordReceipt { id: "r1".into() })
            });
        let (addr, server) =
            warp::serve(uploads.or(record_route)).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let sink = RemoteSink::new(format!("http://{}/", addr));
        let photo = CapturedPhoto {
            bytes: vec![1, 2, 3, 4, 5],
            uri: None,
            focal_length: Some(4.0),
        };
        let metadata = CaptureMetadata {
            timestamp: Utc::now(),
            location: None,
            focal_length: Some(4.0),
            marker_confirmed: false,
        };
        let saved = sink.save(&photo, &metadata, Abundance::Some).await.unwrap();

        assert!(saved.location.ends_with("/records/r1"));
        let records = records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].image_url, "mem://image/5");
        assert_eq!(records[0].label, Abundance::Some);
        assert!(records[0].metadata.location.is_none());
    }
}
