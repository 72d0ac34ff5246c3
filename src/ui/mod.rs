pub mod icons;
pub mod output;
pub mod progress;
pub mod progress_message;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{class_line, class_name, dim, failure, header, info, section, success, warn};
pub use progress::{ProgressManager, Spinner};
pub use progress_message::{ProgressMessage, ProgressPhase};
pub use table::{rename_table, stats_table, TableBuilder};
pub use theme::{theme, Theme};
