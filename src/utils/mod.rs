//! Commonly used utilities like pools and fast hash containers.

#[macro_use]
pub mod handle;
pub mod handle_pool;
pub mod hash;
pub mod object_pool;
pub mod rect;

pub mod prelude {
    pub use super::handle::{Handle, HandleIndex, HandleLike};
    pub use super::handle_pool::{HandlePool, Iter};
    pub use super::hash::FastHashMap;
    pub use super::object_pool::ObjectPool;
    pub use super::rect::Rect;
}

pub use self::handle::{Handle, HandleIndex, HandleLike};
pub use self::handle_pool::HandlePool;
pub use self::hash::FastHashMap;
pub use self::object_pool::ObjectPool;
pub use self::rect::Rect;
