pub struct Icons;

impl Icons {
    pub const ROCKET: &str = "🚀";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
    pub const LINK: &str = "🔗";
    pub const PACKAGE: &str = "📦";
    pub const LIBRARY: &str = "📚";
    pub const UP: &str = "⬆️";
    pub const DOWN: &str = "⬇️";
    pub const RIGHT: &str = "➡️";
}
