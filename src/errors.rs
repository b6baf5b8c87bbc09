use std::path::PathBuf;

#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "{}", _0)]
    Io(::std::io::Error),
    #[fail(display = "{}", _0)]
    Json(::serde_json::Error),
    #[fail(display = "Manifest is malformed: {}", _0)]
    Malformed(String),
    #[fail(display = "Manifest failed to load ({} entries rejected).", _0)]
    Manifest(usize),
    #[fail(display = "Undefined asset '{}'.", _0)]
    AssetNotFound(String),
    #[fail(display = "Undefined sprite '{}'.", _0)]
    SpriteNotFound(String),
    #[fail(display = "Device: {}", _0)]
    Device(String),
    #[fail(display = "Watcher is already running.")]
    WatcherAlreadyRunning,
    #[fail(display = "Could not decode image at {:?}: {}", _0, _1)]
    Decode(PathBuf, String),
}

pub type Result<T> = ::std::result::Result<T, Error>;

impl From<::std::io::Error> for Error {
    fn from(err: ::std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<::serde_json::Error> for Error {
    fn from(err: ::serde_json::Error) -> Self {
        Error::Json(err)
    }
}
