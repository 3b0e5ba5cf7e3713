//! Shared helpers for integration tests.

use std::collections::HashMap;
use std::sync::Mutex;

// Tests in one binary run in parallel; env vars are process-wide.
static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Run `f` with the given variables set (`Some`) or removed (`None`),
/// restoring the previous values afterwards, also on panic.
#[allow(dead_code)]
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _restore = EnvRestore::apply(changes);
    f()
}

struct EnvRestore {
    previous: HashMap<String, Option<String>>,
}

impl EnvRestore {
    fn apply(changes: &[(&str, Option<&str>)]) -> Self {
        let previous = changes
            .iter()
            .map(|(key, _)| (key.to_string(), std::env::var(key).ok()))
            .collect();
        for (key, value) in changes {
            set(key, *value);
        }
        Self { previous }
    }
}

impl Drop for EnvRestore {
    fn drop(&mut self) {
        for (key, value) in self.previous.drain() {
            set(&key, value.as_deref());
        }
    }
}

fn set(key: &str, value: Option<&str>) {
    match value {
        Some(v) => std::env::set_var(key, v),
        None => std::env::remove_var(key),
    }
}
