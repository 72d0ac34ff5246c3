use crate::mapping::RewriteFailure;
use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::ROCKET, text.style(theme().header.clone()));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

pub fn info(label: &str, value: &str) {
    println!(
        "{} {}: {}",
        Icons::INFO.style(theme().info.clone()),
        label.style(theme().dim.clone()),
        value
    );
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

pub fn dim(text: &str) -> String {
    text.style(theme().dim.clone()).to_string()
}

/// Class name styled by provenance
pub fn class_name(name: &str, primary: bool) -> String {
    if primary {
        name.style(theme().primary.clone()).to_string()
    } else {
        format!("{} {}", name.style(theme().library.clone()), dim("(library)"))
    }
}

pub fn class_line(icon: &str, name: &str, primary: bool) {
    println!("  {} {}", icon, class_name(name, primary));
}

pub fn failure(failure: &RewriteFailure) {
    eprintln!(
        "  {} {} {}",
        Icons::CROSS,
        failure.class.style(theme().error.clone()),
        dim(&format!("[{}/{}] {}", failure.resource, failure.bundle, failure.message))
    );
}

