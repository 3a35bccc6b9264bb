//! Default values for configuration

/// Eurostat GDP and main components table (nama_10_gdp)
pub fn default_source_url() -> String {
    std::env::var("EUROGDP_SOURCE_URL").unwrap_or_else(|_| {
        "https://ec.europa.eu/eurostat/databrowser/view/nama_10_gdp/default/table?lang=en&category=na10.nama10.nama_10_ma"
            .to_string()
    })
}

// ===== Browser =====

pub fn default_headless() -> bool {
    true
}

pub fn default_sandbox() -> bool {
    true
}

/// Hard limit for the initial page load (milliseconds)
pub fn default_page_load_timeout() -> u64 {
    60_000
}

pub fn default_window_width() -> u32 {
    1920
}

pub fn default_window_height() -> u32 {
    1080
}

// ===== Extraction =====

/// Time to wait for the grid root to become present and interactable
pub fn default_table_wait() -> u64 {
    30_000
}

/// Time to look for the cookie consent control before moving on
pub fn default_consent_wait() -> u64 {
    10_000
}

pub fn default_poll_interval() -> u64 {
    250
}

/// The grid exposes no render-complete event, so every scroll waits this long
pub fn default_settle() -> u64 {
    1_500
}

pub fn default_max_attempts() -> u32 {
    3
}

pub fn default_retry_backoff() -> u64 {
    5_000
}

/// Earliest year column kept in the dataset
pub fn default_min_year() -> i32 {
    2014
}

pub fn default_step_fraction() -> f64 {
    0.5
}

pub fn default_max_horizontal_stops() -> u32 {
    40
}

pub fn default_max_vertical_stops() -> u32 {
    60
}

// ===== Selectors (AG Grid, alpine theme) =====

pub fn default_table_root_selector() -> String {
    ".ag-theme-alpine".to_string()
}

pub fn default_consent_selector() -> String {
    "a.wt-ecl-button:nth-child(1)".to_string()
}

pub fn default_header_cell_selector() -> String {
    ".ag-header-viewport .ag-header-cell".to_string()
}

pub fn default_pinned_row_selector() -> String {
    ".ag-pinned-left-cols-container .ag-row".to_string()
}

pub fn default_body_row_selector() -> String {
    ".ag-center-cols-container .ag-row".to_string()
}

pub fn default_cell_selector() -> String {
    ".ag-cell".to_string()
}

pub fn default_horizontal_scroll_selector() -> String {
    ".ag-body-horizontal-scroll-viewport".to_string()
}

pub fn default_vertical_scroll_selector() -> String {
    ".ag-body-viewport".to_string()
}

pub fn default_row_id_attribute() -> String {
    "row-id".to_string()
}

pub fn default_col_id_attribute() -> String {
    "col-id".to_string()
}

// ===== Obstacles =====

pub fn default_challenge_selectors() -> Vec<String> {
    vec![
        "div.recaptcha-checkbox-border".to_string(),
        "iframe[src*='recaptcha']".to_string(),
        "iframe[src*='hcaptcha']".to_string(),
        "#challenge-form".to_string(),
    ]
}

pub fn default_denial_markers() -> Vec<String> {
    vec![
        "Access Denied".to_string(),
        "403 Forbidden".to_string(),
        "Request blocked".to_string(),
    ]
}

// ===== Screenshots =====

pub fn default_screenshot_dir() -> String {
    "screenshots".to_string()
}

pub fn default_screenshot_max_files() -> usize {
    50
}

// ===== Logging =====

pub fn default_log_level() -> String {
    "info".to_string()
}
