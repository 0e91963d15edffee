use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PassbridgeSettings {
    pub application: ApplicationSettings,
    pub auth_backend: AuthBackendSettings,
    pub destinations: DestinationSettings,
    pub resolver: ResolverSettings,
    pub static_files: StaticFilesSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: String,
}

/// Connection details for the authentication backend the links are
/// redeemed against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthBackendSettings {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

/// Where resolved links send the browser or the native app
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationSettings {
    /// Base URL of the web portal; empty means same-origin relative URLs
    pub web_base_url: String,
    pub set_password_path: String,
    pub login_path: String,
    /// URL scheme of the native app's deep links
    pub app_scheme: String,
}

/// Timing of one resolution attempt, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverSettings {
    pub poll_interval_ms: u64,
    pub discovery_ceiling_ms: u64,
    pub handoff_grace_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticFilesSettings {
    pub assets_folder: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: "http://localhost:3000,http://localhost:8080".to_string(),
        }
    }
}

impl Default for AuthBackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9999".to_string(),
            api_key: String::new(),
            timeout_secs: 10,
        }
    }
}

impl Default for DestinationSettings {
    fn default() -> Self {
        Self {
            web_base_url: String::new(),
            set_password_path: "/set-password".to_string(),
            login_path: "/login".to_string(),
            app_scheme: "app".to_string(),
        }
    }
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            discovery_ceiling_ms: 5000,
            handoff_grace_ms: 2000,
        }
    }
}

impl Default for StaticFilesSettings {
    fn default() -> Self {
        Self {
            assets_folder: "src/static".to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl PassbridgeSettings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Environment initialization fails
    /// - Settings file cannot be read or parsed
    /// - TOML parsing fails
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        // Initialize environment and logging
        Self::initialize_environment()?;

        // Load base settings from TOML or defaults
        let mut settings = Self::load_base_settings()?;

        // Apply environment variable overrides
        Self::apply_env_overrides(&mut settings);

        Ok(settings)
    }

    /// Initialize environment and logging
    ///
    /// # Errors
    ///
    /// Returns an error if logger initialization fails
    fn initialize_environment() -> Result<(), Box<dyn std::error::Error>> {
        Self::load_env_file();
        env_logger::try_init()?;
        Ok(())
    }

    /// Load base settings from TOML file(s) or use defaults
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `PASSBRIDGE_CONFIG_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read
    /// - TOML parsing fails
    fn load_base_settings() -> Result<Self, Box<dyn std::error::Error>> {
        // 1. Start with default settings
        let mut settings = Self::default();

        // 2. Try to load from Settings.toml in current directory (lower priority)
        let default_config_path = std::path::PathBuf::from("Settings.toml");
        if default_config_path.exists() {
            let toml_content = fs::read_to_string(&default_config_path)?;
            settings = basic_toml::from_str(&toml_content)?;
            println!(
                "✓ Loaded base settings from {}",
                default_config_path.display()
            );
        }

        // 3. If PASSBRIDGE_CONFIG_DIR is set and contains Settings.toml, override
        //    with those settings (higher priority)
        if let Ok(config_dir) = std::env::var("PASSBRIDGE_CONFIG_DIR") {
            let config_path = std::path::Path::new(&config_dir).join("Settings.toml");
            if config_path.exists() {
                let config_toml_content = fs::read_to_string(&config_path)?;
                let dir_settings: Self = basic_toml::from_str(&config_toml_content)?;

                println!("✓ Overriding settings from {}", config_path.display());

                // Replace settings with those from the config directory
                settings = dir_settings;
            } else {
                println!(
                    "ℹ PASSBRIDGE_CONFIG_DIR set but no Settings.toml found at: {}",
                    config_path.display()
                );
            }
        }

        // Environment variables will be applied next, after this function returns

        Ok(settings)
    }

    /// Apply environment variable overrides to settings
    fn apply_env_overrides(settings: &mut Self) {
        Self::apply_application_env_overrides(&mut settings.application);
        Self::apply_auth_backend_env_overrides(&mut settings.auth_backend);
        Self::apply_destination_env_overrides(&mut settings.destinations);
        Self::apply_resolver_env_overrides(&mut settings.resolver);
        Self::apply_static_files_env_overrides(&mut settings.static_files);
        Self::apply_logging_env_overrides(&mut settings.logging);
    }

    /// Apply environment overrides for application settings
    fn apply_application_env_overrides(app_settings: &mut ApplicationSettings) {
        if let Ok(host) = std::env::var("HOST") {
            app_settings.host = host;
        }
        if let Ok(port_str) = std::env::var("PORT") {
            if let Ok(port) = port_str.parse::<u16>() {
                app_settings.port = port;
            }
        }
        if let Ok(cors_origins) = std::env::var("CORS_ORIGINS") {
            app_settings.cors_origins = cors_origins;
        }
    }

    /// Apply environment overrides for the auth backend connection
    pub fn apply_auth_backend_env_overrides(backend_settings: &mut AuthBackendSettings) {
        if let Ok(base_url) = std::env::var("AUTH_BACKEND_URL") {
            backend_settings.base_url = base_url;
        }
        if let Ok(api_key) = std::env::var("AUTH_BACKEND_API_KEY") {
            if !api_key.is_empty() {
                backend_settings.api_key = api_key;
            }
        }
        Self::apply_numeric_env_override(
            "AUTH_BACKEND_TIMEOUT_SECS",
            &mut backend_settings.timeout_secs,
        );
    }

    /// Apply environment overrides for destination settings
    fn apply_destination_env_overrides(destination_settings: &mut DestinationSettings) {
        if let Ok(web_base_url) = std::env::var("WEB_BASE_URL") {
            destination_settings.web_base_url = web_base_url;
        }
        if let Ok(set_password_path) = std::env::var("SET_PASSWORD_PATH") {
            destination_settings.set_password_path = set_password_path;
        }
        if let Ok(login_path) = std::env::var("LOGIN_PATH") {
            destination_settings.login_path = login_path;
        }
        if let Ok(app_scheme) = std::env::var("APP_SCHEME") {
            destination_settings.app_scheme = app_scheme;
        }
    }

    /// Apply environment overrides for resolver timing
    pub fn apply_resolver_env_overrides(resolver_settings: &mut ResolverSettings) {
        Self::apply_numeric_env_override(
            "RESOLVER_POLL_INTERVAL_MS",
            &mut resolver_settings.poll_interval_ms,
        );
        Self::apply_numeric_env_override(
            "RESOLVER_DISCOVERY_CEILING_MS",
            &mut resolver_settings.discovery_ceiling_ms,
        );
        Self::apply_numeric_env_override(
            "RESOLVER_HANDOFF_GRACE_MS",
            &mut resolver_settings.handoff_grace_ms,
        );
    }

    /// Helper function to apply numeric environment variable overrides
    fn apply_numeric_env_override(env_var: &str, target: &mut u64) {
        if let Ok(value_str) = std::env::var(env_var) {
            if let Ok(value) = value_str.parse::<u64>() {
                *target = value;
            }
        }
    }

    /// Apply environment overrides for static files settings
    fn apply_static_files_env_overrides(static_settings: &mut StaticFilesSettings) {
        if let Ok(assets_folder) = std::env::var("STATIC_FOLDER_PATH") {
            static_settings.assets_folder = assets_folder;
        }
    }

    /// Apply environment overrides for logging settings
    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            logging_settings.level = log_level;
        }
    }

    /// Load environment variables from .env file
    fn load_env_file() {
        if let Ok(contents) = std::fs::read_to_string(".env") {
            for line in contents.lines() {
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        }
    }

    /// Get the bind address for the server
    #[must_use]
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }

    /// Get CORS origins as a vector of strings
    #[must_use]
    pub fn get_cors_origins(&self) -> Vec<String> {
        self.application
            .cors_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .collect()
    }
}
