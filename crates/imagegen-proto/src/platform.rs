use std::path::PathBuf;

/// Directory name used under the per-user data/config/cache roots.
pub const APP_DIR_NAME: &str = "imagegen";

pub const DAEMON_HOST: &str = "127.0.0.1";
pub const DAEMON_PORT: u16 = 8765;

pub fn data_dir() -> PathBuf {
    // On macOS and Linux, use ~/.local/share/imagegen/ (XDG standard)
    // instead of macOS Application Support for consistency
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
            .join(APP_DIR_NAME)
    }
    #[cfg(windows)]
    {
        if let Some(dir) = portable_dir("data") {
            return dir;
        }
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
    }
}

pub fn config_dir() -> PathBuf {
    // On Windows, check for portable config.toml in executable directory first
    #[cfg(windows)]
    {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                if exe_dir.join("config.toml").exists() {
                    return exe_dir.to_path_buf();
                }
            }
        }
    }

    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join(APP_DIR_NAME)
    }

    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
    }
}

pub fn temp_dir() -> PathBuf {
    std::env::temp_dir()
}

pub fn cache_dir() -> PathBuf {
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(temp_dir)
            .join(".cache")
            .join(APP_DIR_NAME)
    }
    #[cfg(windows)]
    {
        dirs::cache_dir()
            .unwrap_or_else(temp_dir)
            .join(APP_DIR_NAME)
    }
}

/// The user's desktop, falling back to `~/Desktop` when the platform has no
/// registered desktop folder.
pub fn desktop_dir() -> Option<PathBuf> {
    dirs::desktop_dir().or_else(|| dirs::home_dir().map(|h| h.join("Desktop")))
}

#[cfg(windows)]
fn portable_dir(name: &str) -> Option<PathBuf> {
    let exe_path = std::env::current_exe().ok()?;
    let dir = exe_path.parent()?.join(name);
    dir.exists().then_some(dir)
}

#[cfg(unix)]
fn python_binary_names() -> &'static [&'static str] {
    &["python3", "python"]
}

#[cfg(windows)]
fn python_binary_names() -> &'static [&'static str] {
    &["python.exe", "python3.exe", "python", "python3"]
}

pub const GENERATOR_SCRIPT_NAME: &str = "gen_image.py";

fn find_on_path(names: &[&str]) -> Option<PathBuf> {
    let path = std::env::var("PATH").ok()?;
    #[cfg(unix)]
    let sep = ":";
    #[cfg(windows)]
    let sep = ";";
    for dir in path.split(sep) {
        for name in names {
            let p = PathBuf::from(dir).join(name);
            if p.is_file() {
                return Some(p);
            }
        }
    }
    None
}

/// Find a Python interpreter on PATH.
pub fn find_python_binary() -> Option<PathBuf> {
    find_on_path(python_binary_names())
}

/// Find the generator script.
///
/// Searches in order:
/// 1. Beside the current executable
/// 2. `resources/` beside the executable (Linux / Windows bundles)
/// 3. `../Resources/` relative to the executable (macOS app bundle)
/// 4. The current working directory
pub fn find_generator_script() -> Option<PathBuf> {
    let mut candidates = Vec::new();
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            candidates.push(dir.join(GENERATOR_SCRIPT_NAME));
            candidates.push(dir.join("resources").join(GENERATOR_SCRIPT_NAME));
            candidates.push(dir.join("..").join("Resources").join(GENERATOR_SCRIPT_NAME));
        }
    }
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join(GENERATOR_SCRIPT_NAME));
    }
    candidates.into_iter().find(|p| p.is_file())
}
