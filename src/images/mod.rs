//! External image hosting: uploads binaries, hands back public URLs and an
//! opaque handle that is only ever used to request deletion.

pub mod cloudinary;
pub mod memory;

use async_trait::async_trait;

use crate::error::ImageHostError;

pub use cloudinary::CloudinaryHost;
pub use memory::MemoryImageHost;

/// Largest accepted upload, in bytes.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedImage {
    pub url: String,
    pub public_id: String,
}

/// Which derivative the host should produce from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derivative {
    /// Size-limited, format-normalised display image.
    Display,
    /// Small square crop for grids.
    Thumbnail,
}

impl Derivative {
    /// Incoming transformation, in Cloudinary's chained syntax.
    pub fn transformation(self) -> &'static str {
        match self {
            Derivative::Display => "q_auto,f_auto/c_limit,h_2000,w_2000",
            Derivative::Thumbnail => "c_fill,h_500,w_500,q_auto",
        }
    }

    pub fn folder(self, base: &str) -> String {
        match self {
            Derivative::Display => base.to_string(),
            Derivative::Thumbnail => format!("{base}/thumbnails"),
        }
    }
}

#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        derivative: Derivative,
    ) -> Result<HostedImage, ImageHostError>;

    /// Re-uploads an already hosted image as a new derivative.
    async fn upload_from_url(
        &self,
        url: &str,
        derivative: Derivative,
    ) -> Result<HostedImage, ImageHostError>;

    async fn destroy(&self, public_id: &str) -> Result<(), ImageHostError>;

    /// Recovers the deletion handle of an image this host served.
    fn public_id_from_url(&self, url: &str) -> Option<String>;
}
