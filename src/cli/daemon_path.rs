use std::path::PathBuf;

pub const SERVER_BINARY: &str = "sitetime-server";

/// The service binary is installed next to the cli one.
pub fn to_server_path(mut path: PathBuf) -> PathBuf {
    path.set_file_name(SERVER_BINARY);
    #[cfg(windows)]
    {
        path.set_extension("exe");
    }
    path
}
