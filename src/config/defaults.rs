//! Default configuration values

/// Maximum number of download retry attempts
pub const MAX_DOWNLOAD_RETRIES: u32 = 3;

/// Config file name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "hostbuild.toml";

/// Package definitions directory
pub const VERSIONS_REPO: &str = "versions";

/// Package definition file inside each package directory
pub const PACKAGE_FILE_NAME: &str = "package.toml";

/// Build environment definitions directory
pub const MOCK_CONFIG_DIR: &str = "config/mock";

/// Mock executable
pub const MOCK_BINARY: &str = "mock";

/// Repository metadata generator
pub const CREATEREPO_BINARY: &str = "createrepo";

/// Name of the pointer to the most recent run's results
pub const LATEST_LINK: &str = "latest";

/// Build record store file name
pub const BUILD_RECORDS_FILE: &str = "build-records.json";

/// Format of the run timestamp tag
pub const RUN_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H%M%S%.3f";
