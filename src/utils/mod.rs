pub mod download;
pub mod extract;
pub mod lock;
pub mod resolve;
pub mod transport;
pub mod version;

/// Release index origin; each version lives under `v<version>/`.
pub const INDEX_ORIGIN: &str = "https://nodejs.org/download/release/";

/// The one platform build this tool installs.
pub const PLATFORM: &str = "win-x64";
pub const ARCHIVE_EXT: &str = "zip";

/// File whose presence in a version directory marks it as installed.
pub const ENTRY_POINT: &str = "node.exe";
