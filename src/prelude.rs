pub use crate::assets::{
    AssetHandle, AssetInfo, AssetSystem, GridInfo, Manifest, ReloadOutcome, SourceKind,
    SpriteHandle, SpriteInfo,
};
pub use crate::errors::{Error, Result};
pub use crate::utils::prelude::*;
pub use crate::video::{Device, DeviceId, HeadlessDevice};
pub use crate::watch::{WatchEvent, WatchScope, Watcher, WatcherParams};
