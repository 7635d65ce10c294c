use std::path::PathBuf;

/// Path of the standalone daemon binary shipped next to the cli one.
pub fn to_daemon_path(mut path: PathBuf) -> PathBuf {
    path.set_file_name("worktracker-daemon");
    #[cfg(windows)]
    {
        path.set_extension("exe");
    }
    path
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::to_daemon_path;

    #[test]
    #[cfg(unix)]
    fn test_daemon_lives_next_to_cli() {
        assert_eq!(
            to_daemon_path(PathBuf::from("/usr/bin/worktracker")),
            PathBuf::from("/usr/bin/worktracker-daemon")
        );
    }
}
