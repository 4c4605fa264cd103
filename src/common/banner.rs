const GREEN: &str = "\x1b[32m";
const CYAN: &str = "\x1b[36m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";
const DIM: &str = "\x1b[2m";

macro_rules! env_or {
    ($key:literal, $default:literal) => {
        option_env!($key).unwrap_or($default)
    };
}

pub struct BannerInfo {
    pub version: &'static str,
    pub branch: &'static str,
    pub commit_short: &'static str,
    pub build_time_ms: &'static str,
    pub dirty: bool,
    pub profile: &'static str,
}

impl Default for BannerInfo {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            branch: env_or!("GIT_BRANCH", "unknown"),
            commit_short: env_or!("GIT_COMMIT_SHORT", "unknown"),
            build_time_ms: env_or!("BUILD_TIME", "0"),
            dirty: matches!(option_env!("GIT_DIRTY"), Some("true")),
            profile: if cfg!(debug_assertions) {
                "debug"
            } else {
                "release"
            },
        }
    }
}

impl BannerInfo {
    /// Build time rendered in UTC, or "unknown" when the build script didn't run.
    pub fn build_time(&self) -> String {
        let format = time::macros::format_description!("[year]-[month]-[day] [hour]:[minute]:[second] UTC");
        self.build_time_ms
            .parse::<i128>()
            .ok()
            .filter(|ms| *ms > 0)
            .and_then(|ms| time::OffsetDateTime::from_unix_timestamp_nanos(ms * 1_000_000).ok())
            .and_then(|t| t.format(&format).ok())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

pub fn print_banner(bot_name: &str, info: &BannerInfo) {
    crate::log_println!();
    crate::log_println!("{GREEN}  ___ __  __   {RESET}");
    crate::log_println!("{GREEN} | __|  \\/  |  {RESET}{BOLD}{bot_name}{RESET}");
    crate::log_println!("{GREEN} | _|| |\\/| |  {RESET}{DIM}command dispatcher & playback queue{RESET}");
    crate::log_println!("{GREEN} |___|_|  |_|  {RESET}");
    crate::log_println!("{DIM}========================================{RESET}");
    crate::log_println!();

    print_row("Version", info.version, CYAN);
    print_row("Build time", &info.build_time(), RESET);
    print_row("Branch", info.branch, RESET);

    let commit_display = if info.dirty {
        format!("{}{YELLOW} (dirty){RESET}", info.commit_short)
    } else {
        info.commit_short.to_owned()
    };
    print_row("Commit", &commit_display, RESET);
    print_row("Profile", info.profile, YELLOW);
    crate::log_println!();
}

fn print_row(label: &str, value: &str, color: &str) {
    crate::log_println!("  {BOLD}{label:<14}{RESET}{color}{value}{RESET}");
}
