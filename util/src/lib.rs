mod case;
pub use case::{env_case, kebab_case};

mod pattern;
pub use pattern::Wildcard;

mod timer;
pub use timer::Timer;

pub type Hasher = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;
pub type HashMap<K, V> = std::collections::HashMap<K, V, Hasher>;
