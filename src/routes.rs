use std::path::Path as FsPath;
use std::sync::Arc;

use bytes::Bytes;
use chrono::SecondsFormat;
use poem::endpoint::StaticFilesEndpoint;
use poem::middleware::Cors;
use poem::{get, handler, Endpoint, EndpointExt, Route};
use poem_openapi::param::Path;
use poem_openapi::payload::Json;
use poem_openapi::types::multipart::Upload;
use poem_openapi::{ApiResponse, Multipart, Object, OpenApi, OpenApiService};
use tokio::io::AsyncReadExt;

use crate::controller::{CatalogService, NewImage};
use crate::error::{CreateError, DeleteError, ValidationError};
use crate::record::{ImageRecord, Origin};
use crate::storage::MAX_IMAGE_SIZE;

#[derive(Debug, Object)]
pub struct ImageInfo {
    id: String,

    /// The path the image can be fetched from.
    url: String,

    /// Where the image came from, e.g. `seed`, `uploaded` or `random-dog`.
    source: String,

    #[oai(rename = "uploadedAt")]
    uploaded_at: String,

    #[oai(skip_serializing_if_is_none)]
    filename: Option<String>,

    #[oai(rename = "originalName", skip_serializing_if_is_none)]
    original_name: Option<String>,

    #[oai(skip_serializing_if_is_none)]
    size: Option<u64>,

    #[oai(skip_serializing_if_is_none)]
    mimetype: Option<String>,
}

impl From<ImageRecord> for ImageInfo {
    fn from(record: ImageRecord) -> Self {
        Self {
            id: record.id,
            url: record.url,
            source: record.source.into(),
            uploaded_at: record.uploaded_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            filename: record.filename,
            original_name: record.original_name,
            size: record.size,
            mimetype: record.mimetype,
        }
    }
}

#[derive(Debug, Object)]
pub struct ImageList {
    success: bool,
    count: u64,
    images: Vec<ImageInfo>,
}

#[derive(Debug, Object)]
pub struct ImageFound {
    success: bool,
    image: ImageInfo,
}

#[derive(Debug, Object)]
pub struct ImageCreated {
    success: bool,
    message: String,
    image: ImageInfo,
}

#[derive(Debug, Object)]
pub struct ImageDeleted {
    success: bool,
    message: String,

    #[oai(rename = "deletedImage")]
    deleted_image: ImageInfo,

    #[oai(rename = "remainingCount")]
    remaining_count: u64,

    /// Set when the image was removed from the catalog but its file could not be deleted.
    #[oai(skip_serializing_if_is_none)]
    warning: Option<String>,
}

#[derive(Debug, Object)]
pub struct Failure {
    success: bool,
    error: String,

    #[oai(skip_serializing_if_is_none)]
    details: Option<String>,
}

impl Failure {
    fn new(error: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: false,
            error: error.into(),
            details: None,
        })
    }

    fn with_details(error: impl Into<String>, details: impl ToString) -> Json<Self> {
        Json(Self {
            success: false,
            error: error.into(),
            details: Some(details.to_string()),
        })
    }
}

#[derive(Multipart)]
pub struct UploadPayload {
    /// The image file to store.
    image: Option<Upload>,

    /// The origin tag to record, defaults to `uploaded`.
    source: Option<String>,
}

#[derive(ApiResponse)]
pub enum CreateResponse {
    /// The image was stored and added to the catalog.
    #[oai(status = 201)]
    Created(Json<ImageCreated>),

    /// No image was given or it is not an image.
    #[oai(status = 400)]
    BadRequest(Json<Failure>),

    /// The image is larger than the upload limit.
    #[oai(status = 413)]
    TooLarge(Json<Failure>),

    #[oai(status = 500)]
    InternalError(Json<Failure>),
}

#[derive(ApiResponse)]
pub enum FetchResponse {
    #[oai(status = 200)]
    Ok(Json<ImageFound>),

    #[oai(status = 404)]
    NotFound(Json<Failure>),
}

#[derive(ApiResponse)]
pub enum DeleteResponse {
    #[oai(status = 200)]
    Ok(Json<ImageDeleted>),

    #[oai(status = 404)]
    NotFound(Json<Failure>),

    /// Seed images can never be deleted.
    #[oai(status = 403)]
    Forbidden(Json<Failure>),

    #[oai(status = 500)]
    InternalError(Json<Failure>),
}

pub struct GalleryApi {
    catalog: Arc<CatalogService>,
}

impl GalleryApi {
    pub fn new(catalog: Arc<CatalogService>) -> Self {
        Self { catalog }
    }
}

#[OpenApi]
impl GalleryApi {
    /// List images
    ///
    /// Returns every image in the catalog in the order they were added.
    #[oai(path = "/images", method = "get")]
    pub async fn list_images(&self) -> Json<ImageList> {
        let images: Vec<ImageInfo> = self
            .catalog
            .list_all()
            .await
            .into_iter()
            .map(ImageInfo::from)
            .collect();

        Json(ImageList {
            success: true,
            count: images.len() as u64,
            images,
        })
    }

    /// Upload image
    ///
    /// Stores a new image and adds it to the catalog.
    /// Only `image/*` uploads up to 5 MiB are accepted.
    #[oai(path = "/images", method = "post")]
    pub async fn upload_image(&self, payload: UploadPayload) -> CreateResponse {
        let upload = match payload.image {
            None => return CreateResponse::BadRequest(Failure::new("No image file provided")),
            Some(upload) => upload,
        };

        let mimetype = upload.content_type().unwrap_or_default().to_string();
        let original_name = upload.file_name().map(ToString::to_string);
        // One byte past the limit is enough for validation to reject it.
        let mut data = Vec::new();
        let mut reader = upload.into_async_read().take(MAX_IMAGE_SIZE as u64 + 1);
        if let Err(e) = reader.read_to_end(&mut data).await {
            return CreateResponse::InternalError(Failure::with_details("Failed to read upload", e));
        }

        let image = NewImage {
            data: Bytes::from(data),
            mimetype,
            source: payload.source.filter(|s| !s.is_empty()).map(Origin::from),
            original_name,
        };

        match self.catalog.create(image).await {
            Ok(record) => CreateResponse::Created(Json(ImageCreated {
                success: true,
                message: "Image uploaded successfully".to_string(),
                image: record.into(),
            })),
            Err(CreateError::Validation(e @ ValidationError::NotAnImage { .. })) => {
                CreateResponse::BadRequest(Failure::new(e.to_string()))
            },
            Err(CreateError::Validation(e @ ValidationError::TooLarge { .. })) => {
                CreateResponse::TooLarge(Failure::new(e.to_string()))
            },
            Err(e) => {
                CreateResponse::InternalError(Failure::with_details("Failed to upload image", e))
            },
        }
    }

    /// Get image
    #[oai(path = "/images/:id", method = "get")]
    pub async fn get_image(&self, id: Path<String>) -> FetchResponse {
        match self.catalog.get_by_id(&id.0).await {
            Some(record) => FetchResponse::Ok(Json(ImageFound {
                success: true,
                image: record.into(),
            })),
            None => FetchResponse::NotFound(Failure::new("Image not found")),
        }
    }

    /// Delete image
    ///
    /// Removes the image from the catalog and deletes its file.
    /// If the file could not be deleted the response carries a `warning`.
    #[oai(path = "/images/:id", method = "delete")]
    pub async fn delete_image(&self, id: Path<String>) -> DeleteResponse {
        match self.catalog.delete(&id.0).await {
            Ok(outcome) => DeleteResponse::Ok(Json(ImageDeleted {
                success: true,
                message: "Image deleted successfully".to_string(),
                deleted_image: outcome.removed_record.into(),
                remaining_count: outcome.remaining_count as u64,
                warning: outcome.file_removal_warning,
            })),
            Err(DeleteError::NotFound(_)) => {
                DeleteResponse::NotFound(Failure::new("Image not found"))
            },
            Err(DeleteError::Protected(_)) => {
                DeleteResponse::Forbidden(Failure::new("Cannot delete seed images"))
            },
            Err(e @ DeleteError::PersistFailed(_)) => {
                DeleteResponse::InternalError(Failure::with_details("Failed to delete image", e))
            },
        }
    }
}

#[handler]
fn index() -> poem::web::Json<serde_json::Value> {
    poem::web::Json(json!({
        "message": "Kennel image gallery server",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "GET /api/images": "Get all images",
            "POST /api/images": "Upload image",
            "GET /api/images/:id": "Get a single image",
            "DELETE /api/images/:id": "Delete image",
            "GET /uploads/:filename": "Serve uploaded files",
        },
    }))
}

/// Builds the full route tree.
///
/// `public_prefix` is where `serving_root` is mounted and should match the
/// prefix the storage backend generates urls with.
pub fn build_app(
    catalog: Arc<CatalogService>,
    serving_root: &FsPath,
    public_prefix: &str,
    server_url: &str,
    docs_url: Option<&str>,
) -> impl Endpoint {
    let api_service = OpenApiService::new(
        GalleryApi::new(catalog),
        "Kennel API",
        env!("CARGO_PKG_VERSION"),
    )
    .server(format!("{}/api", server_url.trim_end_matches('/')));

    let mut app = Route::new().at("/", get(index));

    if let Some(docs_url) = docs_url {
        app = app.nest(docs_url, api_service.redoc());
    }

    app.nest("/api", api_service)
        .nest(public_prefix, StaticFilesEndpoint::new(serving_root))
        .with(Cors::new())
}
