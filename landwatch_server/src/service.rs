// THEORY:
// The service layer holds everything a request handler needs that is not HTTP:
// validating uploads, decoding them off the async threads, running the analysis
// on the worker pool, recording the result and fetching stored pictures. Keeping
// it free of axum types lets it be exercised without the `web` feature.

use crate::config::ServerConfig;
use crate::store::{AnalysisMetadata, ResultStore, StoredAnalysis};
use chrono::Utc;
use image::RgbImage;
use landwatch::core_modules::aggregator::mint_result_id;
use landwatch::core_modules::codec;
use landwatch::core_modules::visualizer::VisualizationKind;
use landwatch::{AnalysisPool, PipelineConfig};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

pub const ACCEPTED_CONTENT_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/jpg"];

/// Errors a request can end in. Each maps to one HTTP status.
#[derive(Debug, Error, PartialEq)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl From<landwatch::Error> for ApiError {
    fn from(err: landwatch::Error) -> Self {
        if err.is_input_error() {
            ApiError::BadRequest(err.to_string())
        } else {
            ApiError::Internal(format!("Analysis failed: {err}"))
        }
    }
}

/// One uploaded file.
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    fn is_accepted(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|content_type| ACCEPTED_CONTENT_TYPES.contains(&content_type))
    }
}

fn dimensions(image: &RgbImage) -> String {
    format!("{}x{}", image.width(), image.height())
}

#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<AnalysisPool>,
    pub store: Arc<ResultStore>,
    pub jpeg_quality: u8,
}

impl AppState {
    /// Spawns the worker pool, so this must run inside a tokio runtime.
    pub fn new(config: &ServerConfig, pipeline: PipelineConfig) -> Self {
        let jpeg_quality = pipeline.jpeg_quality;
        let pool = match config.workers {
            Some(workers) => AnalysisPool::new(pipeline, workers),
            None => AnalysisPool::with_default_workers(pipeline),
        };
        Self {
            pool: Arc::new(pool),
            store: Arc::new(ResultStore::new(config.store_capacity)),
            jpeg_quality,
        }
    }

    pub async fn analyze_upload(
        &self,
        reference: Upload,
        current: Upload,
    ) -> Result<Arc<StoredAnalysis>, ApiError> {
        if !reference.is_accepted() || !current.is_accepted() {
            return Err(ApiError::BadRequest(
                "Only JPG/PNG images are supported".to_string(),
            ));
        }

        let (reference_image, current_image) = tokio::task::spawn_blocking(move || {
            Ok::<_, landwatch::Error>((
                codec::decode("reference", &reference.bytes)?,
                codec::decode("current", &current.bytes)?,
            ))
        })
        .await
        .map_err(|e| ApiError::Internal(format!("decode task failed: {e}")))??;

        let metadata = AnalysisMetadata {
            reference_filename: reference.filename,
            current_filename: current.filename,
            analyzed_at: Utc::now(),
            reference_dimensions: dimensions(&reference_image),
            current_dimensions: dimensions(&current_image),
        };

        let result = self.pool.analyze(reference_image, current_image).await?;
        let record = self
            .store
            .insert(StoredAnalysis::new(result, metadata), mint_result_id)
            .await;
        info!(
            id = record.id(),
            deviations = record.result.summary.total_deviations,
            risk = %record.result.summary.risk_level,
            "analysis stored"
        );
        Ok(record)
    }

    pub async fn analysis(&self, id: &str) -> Result<Arc<StoredAnalysis>, ApiError> {
        self.store
            .get(id)
            .await
            .ok_or_else(|| ApiError::NotFound("Analysis not found".to_string()))
    }

    /// JPEG bytes of one stored picture.
    pub async fn visualization(&self, id: &str, kind: &str) -> Result<Vec<u8>, ApiError> {
        let kind = VisualizationKind::parse(kind)
            .ok_or_else(|| ApiError::NotFound(format!("Unknown visualization '{kind}'")))?;
        let record = self.analysis(id).await?;
        let quality = self.jpeg_quality;
        tokio::task::spawn_blocking(move || record.result.encode_visualization(kind, quality))
            .await
            .map_err(|e| ApiError::Internal(format!("encode task failed: {e}")))??
            .ok_or_else(|| {
                warn!(id, %kind, "visualizations were not rendered for this analysis");
                ApiError::NotFound("Visualizations were not rendered for this analysis".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn png_upload(name: &str, image: &RgbImage) -> Upload {
        Upload {
            filename: Some(name.to_string()),
            content_type: Some("image/png".to_string()),
            bytes: codec::encode_png(image).unwrap(),
        }
    }

    fn state() -> AppState {
        let config = ServerConfig {
            workers: Some(2),
            store_capacity: 8,
            ..ServerConfig::default()
        };
        AppState::new(&config, PipelineConfig::default())
    }

    fn scene() -> (RgbImage, RgbImage) {
        let reference = RgbImage::from_pixel(200, 160, Rgb([210, 210, 210]));
        let mut current = reference.clone();
        for y in 50..100 {
            for x in 60..120 {
                current.put_pixel(x, y, Rgb([70, 70, 70]));
            }
        }
        (reference, current)
    }

    #[tokio::test]
    async fn upload_is_analyzed_and_stored() {
        let state = state();
        let (reference, current) = scene();
        let record = state
            .analyze_upload(png_upload("ref.png", &reference), png_upload("cur.png", &current))
            .await
            .unwrap();

        assert_eq!(record.result.deviations.len(), 1);
        assert_eq!(record.metadata.reference_filename.as_deref(), Some("ref.png"));
        assert_eq!(record.metadata.current_dimensions, "200x160");
        assert!(!record.recommendations.is_empty());

        let fetched = state.analysis(record.id()).await.unwrap();
        assert_eq!(fetched.result.summary, record.result.summary);
    }

    #[tokio::test]
    async fn wrong_content_type_is_a_bad_request() {
        let state = state();
        let (reference, current) = scene();
        let mut gif = png_upload("cur.gif", &current);
        gif.content_type = Some("image/gif".to_string());
        let err = state
            .analyze_upload(png_upload("ref.png", &reference), gif)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert!(state.store.is_empty().await);
    }

    #[tokio::test]
    async fn undecodable_upload_is_a_bad_request() {
        let state = state();
        let (reference, _) = scene();
        let broken = Upload {
            filename: Some("cur.jpg".to_string()),
            content_type: Some("image/jpeg".to_string()),
            bytes: b"not a jpeg".to_vec(),
        };
        let err = state
            .analyze_upload(png_upload("ref.png", &reference), broken)
            .await
            .unwrap_err();
        match err {
            ApiError::BadRequest(detail) => assert!(detail.contains("current")),
            other => panic!("expected a bad request, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stored_pictures_are_served_as_jpeg() {
        let state = state();
        let (reference, current) = scene();
        let record = state
            .analyze_upload(png_upload("ref.png", &reference), png_upload("cur.png", &current))
            .await
            .unwrap();

        let bytes = state.visualization(record.id(), "heatmap").await.unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let unknown = state.visualization(record.id(), "sepia").await.unwrap_err();
        assert!(matches!(unknown, ApiError::NotFound(_)));
        let missing = state.visualization("NOPE0000", "overlay").await.unwrap_err();
        assert_eq!(missing, ApiError::NotFound("Analysis not found".to_string()));
    }
}
