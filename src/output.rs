use std::sync::OnceLock;

static QUIET: OnceLock<bool> = OnceLock::new();

/// `BYTEGRAPH_QUIET=1` silences progress bars and decorative output
pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| {
        std::env::var("BYTEGRAPH_QUIET")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}
