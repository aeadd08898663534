//! Default value functions used by serde for config deserialization.

pub fn default_name() -> String {
    "Deskbot".to_string()
}

pub fn default_data_dir() -> String {
    "~/.deskbot".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_true() -> bool {
    true
}

pub fn default_api_host() -> String {
    "127.0.0.1".to_string()
}

pub fn default_api_port() -> u16 {
    5000
}

pub fn default_collaborator_timeout_secs() -> u64 {
    10
}

pub fn default_directory_url() -> String {
    "http://localhost:8081".to_string()
}

pub fn default_mailer_url() -> String {
    "http://localhost:8082".to_string()
}

pub fn default_ai_gateway_url() -> String {
    "http://localhost:8083".to_string()
}

pub fn default_search_url() -> String {
    "http://localhost:8084".to_string()
}

pub fn default_reports_dir() -> String {
    "~/.deskbot/reports".to_string()
}

pub fn default_audit_db_path() -> String {
    "~/.deskbot/data/audit.db".to_string()
}
