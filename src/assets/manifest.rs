//! The manifest describes every loadable asset and sprite.
//!
//! On disk it is a two-level layout under one root directory:
//!
//! - `<root>/assets.json` maps asset id to a path stem relative to the root.
//! - `<root>/<stem>.asset-config.json` names the source-file extension and,
//!   optionally, the sprites carved out of the asset: either a `"textures"`
//!   object of named sub-rectangles, or a `"regular_texture_info"` grid
//!   description for uniformly tiled images.
//!
//! Sprite ids are formed as `"<asset-id>/<sub-name>"`; grid cells are named
//! by their row-major index.

use std::fs::File;
use std::path::{Path, PathBuf};

use inlinable_string::InlinableString;

use crate::errors::*;
use crate::utils::{FastHashMap, Rect};

pub const CONFIG_EXT: &str = ".asset-config.json";
pub const INDEX_FILE: &str = "assets.json";

/// A uniform tiling of an asset into equally sized cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct GridInfo {
    pub texture_width: u32,
    pub texture_height: u32,
    pub columns: u32,
    pub rows: u32,
}

/// Everything the cache needs to know about one asset before loading it.
#[derive(Debug, Clone)]
pub struct AssetInfo {
    /// The decodable source file.
    pub source: PathBuf,
    /// The per-asset configuration file the source path was read from.
    pub config: PathBuf,
    /// The grid description, if the asset is regularly tiled.
    pub grid: Option<GridInfo>,
}

/// The location of one sprite within its parent asset.
#[derive(Debug, Clone)]
pub struct SpriteInfo {
    /// The id of the asset this sprite is carved from.
    pub asset: InlinableString,
    pub rect: Rect,
}

#[derive(Debug, Deserialize)]
struct AssetConfig {
    filetype: String,
    #[serde(default)]
    textures: Option<FastHashMap<String, Rect>>,
    #[serde(default)]
    regular_texture_info: Option<GridInfo>,
}

/// The parsed, immutable lookup tables built from the manifest files. The
/// tables live for the whole lifetime of the `AssetSystem` built on top.
#[derive(Debug, Default)]
pub struct Manifest {
    assets: FastHashMap<String, AssetInfo>,
    sprites: FastHashMap<String, SpriteInfo>,
}

impl Manifest {
    /// Loads `<root>/assets.json` and every asset config it references.
    ///
    /// A malformed entry is logged and skipped so the remaining entries are
    /// still reported, but the load as a whole fails if any entry was
    /// rejected.
    pub fn load<P: AsRef<Path>>(root: P) -> Result<Manifest> {
        let root = root.as_ref();
        let index: FastHashMap<String, String> =
            ::serde_json::from_reader(File::open(root.join(INDEX_FILE))?)?;

        let mut manifest = Manifest::default();
        let mut rejected = 0;

        for (id, stem) in &index {
            if let Err(err) = manifest.load_entry(root, id, stem) {
                error!("rejected manifest entry '{}': {}", id, err);
                rejected += 1;
            }
        }

        if rejected > 0 {
            Err(Error::Manifest(rejected))
        } else {
            info!(
                "manifest loaded: {} assets, {} sprites",
                manifest.assets.len(),
                manifest.sprites.len()
            );
            Ok(manifest)
        }
    }

    fn load_entry(&mut self, root: &Path, id: &str, stem: &str) -> Result<()> {
        let config_path = root.join(format!("{}{}", stem, CONFIG_EXT));
        let config: AssetConfig = ::serde_json::from_reader(File::open(&config_path)?)?;

        let source = root.join(format!("{}{}", stem, config.filetype));

        if let Some(textures) = config.textures {
            for (name, rect) in textures {
                self.sprites.insert(
                    format!("{}/{}", id, name),
                    SpriteInfo {
                        asset: id.into(),
                        rect,
                    },
                );
            }

            self.assets.insert(
                id.to_string(),
                AssetInfo {
                    source,
                    config: config_path,
                    grid: None,
                },
            );
        } else {
            if let Some(grid) = config.regular_texture_info {
                if grid.columns == 0 || grid.rows == 0 {
                    return Err(Error::Malformed(format!(
                        "asset '{}' declares an empty {}x{} grid",
                        id, grid.columns, grid.rows
                    )));
                }

                // Cell indices and offsets are computed in u32; a grid whose
                // extents do not fit is rejected instead of wrapping around.
                let in_range = grid.rows.checked_mul(grid.columns).is_some()
                    && grid.columns.checked_mul(grid.texture_width).is_some()
                    && grid.rows.checked_mul(grid.texture_height).is_some();
                if !in_range {
                    return Err(Error::Malformed(format!(
                        "asset '{}' declares a grid exceeding the addressable range",
                        id
                    )));
                }

                for row in 0..grid.rows {
                    for column in 0..grid.columns {
                        let index = row * grid.columns + column;
                        self.sprites.insert(
                            format!("{}/{}", id, index),
                            SpriteInfo {
                                asset: id.into(),
                                rect: Rect::new(
                                    grid.texture_width,
                                    grid.texture_height,
                                    column * grid.texture_width,
                                    row * grid.texture_height,
                                ),
                            },
                        );
                    }
                }
            }

            self.assets.insert(
                id.to_string(),
                AssetInfo {
                    source,
                    config: config_path,
                    grid: config.regular_texture_info,
                },
            );
        }

        Ok(())
    }

    /// Returns the load metadata of an asset.
    #[inline]
    pub fn asset(&self, id: &str) -> Option<&AssetInfo> {
        self.assets.get(id)
    }

    /// Returns the derivation metadata of a sprite.
    #[inline]
    pub fn sprite(&self, id: &str) -> Option<&SpriteInfo> {
        self.sprites.get(id)
    }

    /// Returns an iterator over every asset entry.
    #[inline]
    pub fn assets(&self) -> impl Iterator<Item = (&str, &AssetInfo)> {
        self.assets.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns an iterator over every sprite entry.
    #[inline]
    pub fn sprites(&self) -> impl Iterator<Item = (&str, &SpriteInfo)> {
        self.sprites.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns an iterator over the sprites carved from one asset.
    pub fn sprites_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = (&'a str, &'a SpriteInfo)> {
        self.sprites
            .iter()
            .filter(move |(_, info)| info.asset == id)
            .map(|(k, v)| (k.as_str(), v))
    }
}
