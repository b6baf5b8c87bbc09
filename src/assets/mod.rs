//! The reference-counted resource cache.
//!
//! `AssetSystem` keeps two slot tables: one for loaded assets (base decoded
//! images) and one for loaded sprites (rectangular views derived from an
//! asset). Every preload either bumps the reference count of an existing
//! entry or creates it with a count of one; every unload decrements, and an
//! asset whose count bottoms out is torn down together with every sprite
//! still derived from it.
//!
//! Entries are addressed through versioned handles. A hot-reload replaces
//! the *contents* of a slot, so handles issued before the reload keep
//! resolving afterwards; only unloading frees the slot and invalidates its
//! handles.
//!
//! The system owns one watch scope. Source files are registered with it as
//! they are loaded, config files at construction time. The scope's callback
//! pushes changed paths into a mutex-guarded inbox; `drain_reloads` must be
//! called on the owning thread once per frame to apply them. No cache state
//! is ever touched from the poll thread.

pub mod manifest;

pub use self::manifest::{AssetInfo, GridInfo, Manifest, SpriteInfo};

use std::mem;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use smallvec::SmallVec;

use crate::errors::*;
use crate::utils::handle::HandleLike;
use crate::utils::{FastHashMap, ObjectPool, Rect};
use crate::video::Device;
use crate::watch::{WatchEvent, WatchScope, Watcher};

impl_handle!(AssetHandle);
impl_handle!(SpriteHandle);

/// What a watched file was registered as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// The decodable source of an asset.
    Asset,
    /// The per-asset configuration file.
    Config,
}

/// The result of applying one queued file change during `drain_reloads`.
#[derive(Debug)]
pub enum ReloadOutcome {
    /// The asset's stored image (and every dependent sprite) now reflects
    /// the file on disk; the old image has been freed.
    Swapped(String),
    /// The re-decoded image has different dimensions, which would invalidate
    /// the sprite rectangles indexed against the old ones. The reload was
    /// skipped; applying it requires a manifest reload.
    DimensionsChanged(String),
    /// The changed file belongs to an asset that is not currently loaded.
    NotLoaded(String),
    /// Config hot-reload is not supported yet. Nothing changed, which is
    /// distinct from "nothing needed to change".
    ConfigNotSupported(String),
    /// The path was queued but no resource is registered for it.
    Unregistered(PathBuf),
    /// Re-decoding or re-uploading failed; the previous state is untouched.
    Failed(String, Error),
}

#[derive(Debug, Clone)]
struct FileRecord {
    id: String,
    kind: SourceKind,
}

struct AssetEntry<I> {
    id: String,
    image: I,
    rc: u32,
}

struct SpriteEntry<T> {
    id: String,
    texture: T,
    rect: Rect,
    rc: u32,
}

/// The reference-counted asset cache. See the module documentation for the
/// lifetime and threading rules.
///
/// All methods must be called from the thread that owns the system; the
/// watch scope's callback is the only piece that runs elsewhere, and it only
/// pushes into the inbox.
pub struct AssetSystem<D: Device> {
    device: D,
    manifest: Manifest,

    assets: ObjectPool<AssetHandle, AssetEntry<D::Image>>,
    asset_redirects: FastHashMap<String, AssetHandle>,
    sprites: ObjectPool<SpriteHandle, SpriteEntry<D::Texture>>,
    sprite_redirects: FastHashMap<String, SpriteHandle>,

    records: FastHashMap<PathBuf, FileRecord>,
    inbox: Arc<Mutex<Vec<PathBuf>>>,
    scope: WatchScope,
}

impl<D: Device> AssetSystem<D> {
    /// Creates an `AssetSystem` over a parsed manifest. One watch scope is
    /// taken from `watcher`, and every asset's config file is registered
    /// under it right away; source files follow as they are first loaded.
    pub fn new(device: D, watcher: &Watcher, manifest: Manifest) -> Self {
        let inbox = Arc::new(Mutex::new(Vec::new()));

        let scope = {
            let inbox = inbox.clone();
            watcher.scope(move |path: &Path, event| {
                // Runs on the poll thread. Queue the path and get out; the
                // owning thread applies it during its next drain.
                if let WatchEvent::Changed = event {
                    inbox.lock().unwrap().push(path.to_owned());
                }
            })
        };

        let mut sys = AssetSystem {
            device,
            manifest,
            assets: ObjectPool::new(),
            asset_redirects: FastHashMap::default(),
            sprites: ObjectPool::new(),
            sprite_redirects: FastHashMap::default(),
            records: FastHashMap::default(),
            inbox,
            scope,
        };

        let configs: Vec<(String, PathBuf)> = sys
            .manifest
            .assets()
            .map(|(id, info)| (id.to_string(), info.config.clone()))
            .collect();
        for (id, config) in configs {
            sys.track(config, id, SourceKind::Config);
        }

        sys
    }

    fn track(&mut self, path: PathBuf, id: String, kind: SourceKind) {
        self.scope.watch(path.clone());
        self.records.insert(path, FileRecord { id, kind });
    }

    /// Loads the asset named `id`, or bumps its reference count if it is
    /// already loaded. The source file is registered with the watch scope on
    /// first load.
    pub fn load(&mut self, id: &str) -> Result<AssetHandle> {
        self.load_asset(id, true)
    }

    fn load_asset(&mut self, id: &str, take_ref: bool) -> Result<AssetHandle> {
        if let Some(&handle) = self.asset_redirects.get(id) {
            if take_ref {
                self.assets.get_mut(handle).unwrap().rc += 1;
            }
            return Ok(handle);
        }

        let source = match self.manifest.asset(id) {
            Some(info) => info.source.clone(),
            None => return Err(Error::AssetNotFound(id.to_string())),
        };

        let image = match self.device.decode(&source) {
            Ok(image) => image,
            Err(err) => {
                error!("failed to load asset '{}' from {:?}: {}", id, source, err);
                return Err(err);
            }
        };

        let handle = self.assets.create(AssetEntry {
            id: id.to_string(),
            image,
            rc: 1,
        });
        self.asset_redirects.insert(id.to_string(), handle);
        self.track(source, id.to_string(), SourceKind::Asset);

        debug!("loaded asset '{}'", id);
        Ok(handle)
    }

    /// As `load`, additionally making sure the device holds a resident copy
    /// of the image. The upload is skipped if it already does.
    ///
    /// On upload failure the reference taken by this call is handed back, so
    /// a caller holding `Err` holds no reference.
    pub fn upload(&mut self, id: &str) -> Result<AssetHandle> {
        self.upload_asset(id, true)
    }

    fn upload_asset(&mut self, id: &str, take_ref: bool) -> Result<AssetHandle> {
        let fresh = !self.asset_redirects.contains_key(id);
        let handle = self.load_asset(id, take_ref)?;

        let resident = {
            let entry = self.assets.get(handle).unwrap();
            self.device.is_uploaded(&entry.image)
        };

        if !resident {
            let uploaded = {
                let entry = self.assets.get_mut(handle).unwrap();
                self.device.upload(&mut entry.image)
            };

            if let Err(err) = uploaded {
                error!("failed to upload asset '{}': {}", id, err);
                if take_ref || fresh {
                    self.unload(id);
                }
                return Err(err);
            }

            debug!("uploaded asset '{}'", id);
        }

        Ok(handle)
    }

    /// Uploads the asset, then eagerly preloads every sprite carved from it.
    ///
    /// Eagerly loaded sprites do not take the parent reference an explicit
    /// `load_sprite` takes, so a single `unload` of the asset still tears
    /// the whole family down.
    pub fn upload_with_sprites(&mut self, id: &str) -> Result<AssetHandle> {
        let handle = self.upload(id)?;

        let sprite_ids: Vec<String> = self
            .manifest
            .sprites_of(id)
            .map(|(sid, _)| sid.to_string())
            .collect();

        for sid in sprite_ids {
            self.load_sprite_from(&sid, false)?;
        }

        Ok(handle)
    }

    /// Loads the sprite named `id`, or bumps its reference count if it is
    /// already loaded. A fresh load uploads the parent asset first, taking
    /// one reference on it for as long as the sprite lives.
    pub fn load_sprite(&mut self, id: &str) -> Result<SpriteHandle> {
        self.load_sprite_from(id, true)
    }

    fn load_sprite_from(&mut self, id: &str, take_parent_ref: bool) -> Result<SpriteHandle> {
        if let Some(&handle) = self.sprite_redirects.get(id) {
            self.sprites.get_mut(handle).unwrap().rc += 1;
            return Ok(handle);
        }

        let (parent, rect) = match self.manifest.sprite(id) {
            Some(info) => (info.asset.to_string(), info.rect),
            None => return Err(Error::SpriteNotFound(id.to_string())),
        };

        let parent_was_fresh = !self.asset_redirects.contains_key(&parent);
        let asset = match self.upload_asset(&parent, take_parent_ref) {
            Ok(handle) => handle,
            Err(err) => {
                error!(
                    "failed to load asset '{}' (required by sprite '{}'): {}",
                    parent, id, err
                );
                return Err(err);
            }
        };

        let derived = {
            let entry = self.assets.get(asset).unwrap();
            self.device.derive(&entry.image, rect)
        };

        let texture = match derived {
            Ok(texture) => texture,
            Err(err) => {
                error!("failed to derive sprite '{}': {}", id, err);
                if take_parent_ref || parent_was_fresh {
                    self.unload(&parent);
                }
                return Err(err);
            }
        };

        let handle = self.sprites.create(SpriteEntry {
            id: id.to_string(),
            texture,
            rect,
            rc: 1,
        });
        self.sprite_redirects.insert(id.to_string(), handle);

        debug!("loaded sprite '{}'", id);
        Ok(handle)
    }

    /// Releases one reference to the asset named `id`. No-op if it is not
    /// loaded.
    ///
    /// When the count reaches zero the whole family is torn down: every
    /// sprite whose device identity matches the asset's is removed, then
    /// the image itself is freed. Sprite handles removed this way stop
    /// resolving. An explicitly loaded sprite holds its own reference on
    /// the parent, so the count cannot reach zero while it lives.
    pub fn unload(&mut self, id: &str) {
        let handle = match self.asset_redirects.get(id) {
            Some(&handle) => handle,
            None => return,
        };

        let identity = {
            let entry = self.assets.get_mut(handle).unwrap();
            entry.rc -= 1;
            if entry.rc > 0 {
                return;
            }
            self.device.image_identity(&entry.image)
        };

        let dependents: SmallVec<[SpriteHandle; 8]> = match identity {
            Some(parent) => self
                .sprites
                .iter()
                .filter(|&h| {
                    let entry = self.sprites.get(h).unwrap();
                    self.device.texture_identity(&entry.texture) == parent
                })
                .collect(),
            None => SmallVec::new(),
        };

        for sprite in dependents {
            if let Some(entry) = self.sprites.free(sprite) {
                self.sprite_redirects.remove(&entry.id);
                self.device.destroy(entry.texture);
                debug!("unloaded sprite '{}' (cascaded from asset '{}')", entry.id, id);
            }
        }

        let entry = self.assets.free(handle).unwrap();
        self.asset_redirects.remove(id);
        self.device.free(entry.image);
        debug!("unloaded asset '{}'", id);
    }

    /// Releases one reference to the sprite named `id`. No-op if it is not
    /// loaded. At zero the texture is destroyed, the entry removed, and the
    /// reference held on the parent asset released.
    pub fn unload_sprite(&mut self, id: &str) {
        let handle = match self.sprite_redirects.get(id) {
            Some(&handle) => handle,
            None => return,
        };

        {
            let entry = self.sprites.get_mut(handle).unwrap();
            entry.rc -= 1;
            if entry.rc > 0 {
                return;
            }
        }

        let entry = self.sprites.free(handle).unwrap();
        self.sprite_redirects.remove(id);
        self.device.destroy(entry.texture);
        debug!("unloaded sprite '{}'", id);

        let parent = self.manifest.sprite(id).map(|info| info.asset.to_string());
        if let Some(parent) = parent {
            self.unload(&parent);
        }
    }

    /// Applies every queued file change. Must be called by the owning thread
    /// once per frame; all reload work happens here, never on the poll
    /// thread.
    pub fn drain_reloads(&mut self) -> Vec<ReloadOutcome> {
        let pending = {
            let mut inbox = self.inbox.lock().unwrap();
            mem::replace(&mut *inbox, Vec::new())
        };

        let mut outcomes = Vec::with_capacity(pending.len());
        for path in pending {
            info!("file {:?} has changed, reloading", path);

            let record = self.records.get(&path).cloned();
            let outcome = match record {
                None => {
                    warn!("file {:?} has no corresponding resource", path);
                    ReloadOutcome::Unregistered(path)
                }
                Some(record) => match record.kind {
                    SourceKind::Asset => self.reload_asset(&record.id, &path),
                    SourceKind::Config => {
                        warn!(
                            "config hot-reload is not supported yet; asset '{}' unchanged",
                            record.id
                        );
                        ReloadOutcome::ConfigNotSupported(record.id)
                    }
                },
            };

            outcomes.push(outcome);
        }

        outcomes
    }

    fn reload_asset(&mut self, id: &str, path: &Path) -> ReloadOutcome {
        let handle = match self.asset_redirects.get(id) {
            Some(&handle) => handle,
            None => {
                warn!("cannot reload asset '{}': it is not loaded", id);
                return ReloadOutcome::NotLoaded(id.to_string());
            }
        };

        let mut incoming = match self.device.decode(path) {
            Ok(image) => image,
            Err(err) => {
                warn!("failed to re-decode asset '{}': {}", id, err);
                return ReloadOutcome::Failed(id.to_string(), err);
            }
        };

        let (old_dims, resident, old_identity) = {
            let entry = self.assets.get(handle).unwrap();
            (
                self.device.dimensions(&entry.image),
                self.device.is_uploaded(&entry.image),
                self.device.image_identity(&entry.image),
            )
        };

        let new_dims = self.device.dimensions(&incoming);
        if old_dims != new_dims {
            // Sprite rectangles are indexed against the old dimensions;
            // applying this reload is only safe together with a manifest
            // reload.
            info!(
                "skipping reload of asset '{}': dimensions changed {}x{} -> {}x{}",
                id, old_dims.0, old_dims.1, new_dims.0, new_dims.1
            );
            self.device.free(incoming);
            return ReloadOutcome::DimensionsChanged(id.to_string());
        }

        if !resident {
            // No resident copy means no derived sprites; a plain swap is
            // enough.
            let old = {
                let entry = self.assets.get_mut(handle).unwrap();
                mem::replace(&mut entry.image, incoming)
            };
            self.device.free(old);
            info!("reloaded asset '{}'", id);
            return ReloadOutcome::Swapped(id.to_string());
        }

        if let Err(err) = self.device.upload(&mut incoming) {
            warn!("failed to upload reloaded asset '{}': {}", id, err);
            self.device.free(incoming);
            return ReloadOutcome::Failed(id.to_string(), err);
        }

        // Every dependent sprite must be re-derived against the new image
        // before the old one is freed, otherwise a dependent would reference
        // a destroyed parent.
        let old_identity = old_identity.unwrap();
        let dependents: SmallVec<[SpriteHandle; 8]> = self
            .sprites
            .iter()
            .filter(|&h| {
                let entry = self.sprites.get(h).unwrap();
                self.device.texture_identity(&entry.texture) == old_identity
            })
            .collect();

        for sprite in dependents {
            let rect = self.sprites.get(sprite).unwrap().rect;
            match self.device.derive(&incoming, rect) {
                Ok(texture) => {
                    let entry = self.sprites.get_mut(sprite).unwrap();
                    let old = mem::replace(&mut entry.texture, texture);
                    self.device.destroy(old);
                    debug!("relinked sprite '{}' to reloaded asset '{}'", entry.id, id);
                }
                Err(err) => {
                    warn!("failed to relink a sprite of reloaded asset '{}': {}", id, err);
                }
            }
        }

        let old = {
            let entry = self.assets.get_mut(handle).unwrap();
            mem::replace(&mut entry.image, incoming)
        };
        self.device.free(old);

        info!("reloaded asset '{}'", id);
        ReloadOutcome::Swapped(id.to_string())
    }

    /// Resolves an asset handle to its image. `None` once the slot has been
    /// freed.
    #[inline]
    pub fn asset(&self, handle: AssetHandle) -> Option<&D::Image> {
        self.assets.get(handle).map(|entry| &entry.image)
    }

    /// Resolves a sprite handle to its texture. `None` once the slot has
    /// been freed.
    #[inline]
    pub fn sprite(&self, handle: SpriteHandle) -> Option<&D::Texture> {
        self.sprites.get(handle).map(|entry| &entry.texture)
    }

    /// Returns the rectangle a live sprite occupies within its parent.
    #[inline]
    pub fn sprite_rect(&self, handle: SpriteHandle) -> Option<Rect> {
        self.sprites.get(handle).map(|entry| entry.rect)
    }

    /// Looks up the live handle of a loaded asset without taking a
    /// reference.
    #[inline]
    pub fn find(&self, id: &str) -> Option<AssetHandle> {
        self.asset_redirects.get(id).cloned()
    }

    /// Looks up the live handle of a loaded sprite without taking a
    /// reference.
    #[inline]
    pub fn find_sprite(&self, id: &str) -> Option<SpriteHandle> {
        self.sprite_redirects.get(id).cloned()
    }

    /// Returns the manifest metadata of an asset.
    #[inline]
    pub fn asset_info(&self, id: &str) -> Option<&AssetInfo> {
        self.manifest.asset(id)
    }

    /// Returns the manifest metadata of a sprite.
    #[inline]
    pub fn sprite_info(&self, id: &str) -> Option<&SpriteInfo> {
        self.manifest.sprite(id)
    }

    /// Returns the current reference count of a loaded asset.
    pub fn asset_refs(&self, id: &str) -> Option<u32> {
        let &handle = self.asset_redirects.get(id)?;
        self.assets.get(handle).map(|entry| entry.rc)
    }

    /// Returns the current reference count of a loaded sprite.
    pub fn sprite_refs(&self, id: &str) -> Option<u32> {
        let &handle = self.sprite_redirects.get(id)?;
        self.sprites.get(handle).map(|entry| entry.rc)
    }

    /// Returns the number of loaded assets.
    #[inline]
    pub fn loaded_assets(&self) -> usize {
        self.assets.len()
    }

    /// Returns the number of loaded sprites.
    #[inline]
    pub fn loaded_sprites(&self) -> usize {
        self.sprites.len()
    }

    #[inline]
    pub fn device(&self) -> &D {
        &self.device
    }

    #[inline]
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }
}

impl<D: Device> Drop for AssetSystem<D> {
    fn drop(&mut self) {
        // Sprites reference their parent images, so they go first. Reference
        // counts are ignored on teardown.
        for (_, entry) in self.sprites.free_if(|_| true) {
            self.device.destroy(entry.texture);
        }

        for (_, entry) in self.assets.free_if(|_| true) {
            self.device.free(entry.image);
        }
    }
}
