use std::collections::{HashMap, HashSet};
use std::hash::BuildHasherDefault;

use std::collections::hash_map::DefaultHasher;

/// A `HashMap` under a shorter alias, so containers across the crate agree on
/// one hasher configuration.
pub type FastHashMap<K, V> = HashMap<K, V, BuildHasherDefault<DefaultHasher>>;

/// A `HashSet` counterpart of `FastHashMap`.
pub type FastHashSet<K> = HashSet<K, BuildHasherDefault<DefaultHasher>>;
