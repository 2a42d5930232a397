//! Environment mutation helpers shared by configuration tests.

use std::sync::{Mutex, MutexGuard, OnceLock};

/// Return the process-wide lock that serializes environment mutation.
pub fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

#[allow(unused_unsafe)]
fn write_var(key: &str, value: Option<&str>) {
    // SAFETY: callers hold `env_lock()` while tests mutate the environment.
    unsafe {
        match value {
            Some(value) => std::env::set_var(key, value),
            None => std::env::remove_var(key),
        }
    }
}

/// Restores an environment variable to its previous state on drop.
pub struct EnvGuard {
    key: String,
    previous: Option<String>,
}

impl EnvGuard {
    /// Set `key=value` until the guard is dropped.
    pub fn set(key: &str, value: &str) -> Self {
        Self::replace(key, Some(value))
    }

    /// Unset `key` until the guard is dropped.
    pub fn remove(key: &str) -> Self {
        Self::replace(key, None)
    }

    fn replace(key: &str, value: Option<&str>) -> Self {
        let previous = std::env::var(key).ok();
        write_var(key, value);
        Self {
            key: key.to_string(),
            previous,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        write_var(&self.key, self.previous.as_deref());
    }
}

/// Run `test` with the given variables applied, holding the env lock throughout.
///
/// `None` values unset the variable for the duration of the call.
pub fn with_env<T>(vars: &[(&str, Option<&str>)], test: impl FnOnce() -> T) -> T {
    let _lock: MutexGuard<'_, ()> = env_lock()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let _guards: Vec<EnvGuard> = vars
        .iter()
        .map(|(key, value)| match value {
            Some(value) => EnvGuard::set(key, value),
            None => EnvGuard::remove(key),
        })
        .collect();
    test()
}

#[cfg(test)]
mod tests {
    use super::{with_env, EnvGuard};

    #[test]
    fn guard_restores_previous_value() {
        with_env(&[("QUEIMADAS_TEST_ENV_RESTORE", Some("before"))], || {
            {
                let _override = EnvGuard::set("QUEIMADAS_TEST_ENV_RESTORE", "after");
                assert_eq!(
                    std::env::var("QUEIMADAS_TEST_ENV_RESTORE").ok().as_deref(),
                    Some("after")
                );
            }
            assert_eq!(
                std::env::var("QUEIMADAS_TEST_ENV_RESTORE").ok().as_deref(),
                Some("before")
            );
        });
        assert!(std::env::var("QUEIMADAS_TEST_ENV_RESTORE").is_err());
    }
}
