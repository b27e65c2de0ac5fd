use std::path::{Component, Path, PathBuf};

use dirs_next::home_dir;

/// Resolve a user-supplied file location such as the log or attributes file.
///
/// The location is trimmed. A first component of exactly `~` stands for the
/// home directory; `~name/...` and everything else is returned as given.
/// Without a known home directory the tilde is left in place.
pub fn expand_tilde(raw: &str) -> PathBuf {
    let location = Path::new(raw.trim());
    let mut components = location.components();
    let starts_at_home = matches!(components.next(), Some(Component::Normal(first)) if first == "~");
    let Some(home) = home_dir().filter(|_| starts_at_home) else {
        return location.to_path_buf();
    };
    let rest = components.as_path();
    if rest.as_os_str().is_empty() { home } else { home.join(rest) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_home<T>(home: &str, f: impl FnOnce() -> T) -> T {
        temp_env::with_var("HOME", Some(home), f)
    }

    #[test]
    fn plain_locations_are_trimmed_only() {
        assert_eq!(expand_tilde("  /etc/advisory.json "), PathBuf::from("/etc/advisory.json"));
        assert_eq!(expand_tilde("attributes.json"), PathBuf::from("attributes.json"));
    }

    #[cfg(unix)]
    #[test]
    fn leading_tilde_means_the_home_directory() {
        with_home("/home/operator", || {
            assert_eq!(expand_tilde("~"), PathBuf::from("/home/operator"));
            assert_eq!(
                expand_tilde(" ~/advisory/attributes.json"),
                PathBuf::from("/home/operator/advisory/attributes.json")
            );
        });
    }

    #[cfg(unix)]
    #[test]
    fn other_tilde_forms_are_left_alone() {
        with_home("/home/operator", || {
            assert_eq!(expand_tilde("~other/advisory.log"), PathBuf::from("~other/advisory.log"));
            assert_eq!(expand_tilde("logs/~/advisory.log"), PathBuf::from("logs/~/advisory.log"));
        });
    }
}
