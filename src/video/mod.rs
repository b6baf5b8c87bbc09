//! The seam towards the GPU/decoder collaborator.
//!
//! The asset cache never talks to a graphics API directly; everything it
//! needs from one is expressed by the `Device` trait. The crate ships a
//! `HeadlessDevice` so the cache can run in CI and tests without a GPU.

pub mod headless;

pub use self::headless::HeadlessDevice;

use std::path::Path;

use crate::errors::*;
use crate::utils::Rect;

/// The identity a device assigns to an uploaded image. Textures derived from
/// an image report the same identity, which is how the cache matches sprites
/// to their parent during cascading unloads and reloads.
pub type DeviceId = u32;

/// What the asset cache requires from the GPU/decode backend.
///
/// An `Image` is the decoded, CPU-side form of one source file; it may
/// additionally be resident on the device after `upload`. A `Texture` is a
/// renderable sub-rectangle view derived from a resident image.
///
/// All calls are synchronous and run on the thread that owns the cache;
/// decode and upload may be slow.
pub trait Device {
    type Image;
    type Texture;

    /// Decodes the file at `path` into a CPU-side image.
    fn decode(&mut self, path: &Path) -> Result<Self::Image>;

    /// Returns the pixel dimensions of a decoded image as `(width, height)`.
    fn dimensions(&self, image: &Self::Image) -> (u32, u32);

    /// Checks if the image currently has a resident copy on the device.
    fn is_uploaded(&self, image: &Self::Image) -> bool;

    /// Uploads the decoded bytes to the device. No-op if already resident.
    fn upload(&mut self, image: &mut Self::Image) -> Result<()>;

    /// Drops the resident copy while keeping the decoded bytes.
    fn release_upload(&mut self, image: &mut Self::Image);

    /// Carves a renderable view of `rect` out of a resident image.
    fn derive(&mut self, image: &Self::Image, rect: Rect) -> Result<Self::Texture>;

    /// Returns the device identity of an image, or `None` if it has never
    /// been uploaded.
    fn image_identity(&self, image: &Self::Image) -> Option<DeviceId>;

    /// Returns the identity of the image this texture was derived from.
    fn texture_identity(&self, texture: &Self::Texture) -> DeviceId;

    /// Destroys a derived texture.
    fn destroy(&mut self, texture: Self::Texture);

    /// Releases an image, dropping the resident copy first if there is one.
    fn free(&mut self, image: Self::Image);
}
