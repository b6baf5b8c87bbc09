//! A device backend without actual hardware, mainly for tests and CI.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::errors::*;
use crate::utils::Rect;

use super::{Device, DeviceId};

/// A decoded image as the headless device sees it: dimensions read from the
/// file header, plus the identity assigned on upload.
#[derive(Debug)]
pub struct HeadlessImage {
    width: u32,
    height: u32,
    resident: Option<DeviceId>,
}

/// A sub-rectangle view of an uploaded `HeadlessImage`.
#[derive(Debug)]
pub struct HeadlessTexture {
    parent: DeviceId,
    rect: Rect,
}

/// A `Device` implementation that decodes a trivial binary format (an 8-byte
/// little-endian `[width: u32][height: u32]` header) and tracks every call,
/// so tests can assert on decode/upload/teardown counts.
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    next_id: DeviceId,
    decodes: usize,
    uploads: usize,
    derives: usize,
    destroys: usize,
    frees: usize,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        HeadlessDevice::default()
    }

    /// The number of successful decode calls so far.
    pub fn decodes(&self) -> usize {
        self.decodes
    }

    /// The number of uploads that actually transferred an image.
    pub fn uploads(&self) -> usize {
        self.uploads
    }

    /// The number of textures derived so far.
    pub fn derives(&self) -> usize {
        self.derives
    }

    /// The number of textures destroyed so far.
    pub fn destroys(&self) -> usize {
        self.destroys
    }

    /// The number of images freed so far.
    pub fn frees(&self) -> usize {
        self.frees
    }
}

impl Device for HeadlessDevice {
    type Image = HeadlessImage;
    type Texture = HeadlessTexture;

    fn decode(&mut self, path: &Path) -> Result<HeadlessImage> {
        let mut file = File::open(path)
            .map_err(|err| Error::Decode(path.to_owned(), err.to_string()))?;

        let mut header = [0; 8];
        file.read_exact(&mut header)
            .map_err(|err| Error::Decode(path.to_owned(), err.to_string()))?;

        let mut cursor = &header[..];
        let width = cursor.read_u32::<LittleEndian>().unwrap();
        let height = cursor.read_u32::<LittleEndian>().unwrap();

        if width == 0 || height == 0 {
            return Err(Error::Decode(
                path.to_owned(),
                format!("degenerate dimensions {}x{}", width, height),
            ));
        }

        self.decodes += 1;
        Ok(HeadlessImage {
            width,
            height,
            resident: None,
        })
    }

    fn dimensions(&self, image: &HeadlessImage) -> (u32, u32) {
        (image.width, image.height)
    }

    fn is_uploaded(&self, image: &HeadlessImage) -> bool {
        image.resident.is_some()
    }

    fn upload(&mut self, image: &mut HeadlessImage) -> Result<()> {
        if image.resident.is_none() {
            self.next_id += 1;
            image.resident = Some(self.next_id);
            self.uploads += 1;
        }

        Ok(())
    }

    fn release_upload(&mut self, image: &mut HeadlessImage) {
        image.resident = None;
    }

    fn derive(&mut self, image: &HeadlessImage, rect: Rect) -> Result<HeadlessTexture> {
        let parent = image
            .resident
            .ok_or_else(|| Error::Device("derive from an image that is not resident".into()))?;

        if !rect.fits_in(image.width, image.height) {
            return Err(Error::Device(format!(
                "rectangle {:?} exceeds parent dimensions {}x{}",
                rect, image.width, image.height
            )));
        }

        self.derives += 1;
        Ok(HeadlessTexture { parent, rect })
    }

    fn image_identity(&self, image: &HeadlessImage) -> Option<DeviceId> {
        image.resident
    }

    fn texture_identity(&self, texture: &HeadlessTexture) -> DeviceId {
        texture.parent
    }

    fn destroy(&mut self, _: HeadlessTexture) {
        self.destroys += 1;
    }

    fn free(&mut self, _: HeadlessImage) {
        self.frees += 1;
    }
}
