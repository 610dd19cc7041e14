//! Reply templates. All user-facing wording lives here.
//!
//! Telegram renders these as Markdown; the channel falls back to plain
//! text when Telegram rejects the markup, so nothing here may depend on
//! formatting to be understandable.

use crate::error::ResolveError;
use crate::metrics::StatsSnapshot;

/// Hard ceiling on a delivered document, per Telegram's bot upload limit.
pub const MAX_DELIVERY_BYTES: usize = 50 * 1024 * 1024;

pub fn welcome(first_name: Option<&str>) -> String {
    let name = first_name.unwrap_or("there");
    format!(
        "✨ *Welcome to Scribd Downloader Bot*, {name}! ✨\n\n\
         📚 I can download Scribd documents as PDF files for you.\n\n\
         *How to use:*\n\
         1. Send me any Scribd link\n\
         2. I'll process it automatically\n\
         3. Receive your PDF document\n\n\
         *Supported links:*\n\
         • `https://scribd.com/document/123456789`\n\
         • `https://scribd.com/presentation/987654321`\n\
         • `https://scribd.com/doc/456789123/Title`\n\n\
         *Important:*\n\
         • Maximum file size: 50MB (Telegram limit)\n\
         • Processing time: 10-30 seconds\n\
         • Download only content you have rights to\n\n\
         Use /help for more information or just send a link to begin!"
    )
}

pub fn help() -> &'static str {
    "🆘 *Scribd Downloader Bot - Help* 🆘\n\n\
     *Commands:*\n\
     /start - Start the bot\n\
     /help - Show this help message\n\
     /stats - Show bot statistics\n\
     /support - Get support information\n\n\
     *Usage:*\n\
     Simply send me a Scribd link starting with:\n\
     • https://scribd.com/document/\n\
     • https://scribd.com/presentation/\n\
     • https://scribd.com/doc/\n\n\
     *Examples:*\n\
     https://www.scribd.com/document/123456789/Book-Title\n\
     https://scribd.com/presentation/987654321\n\n\
     *Troubleshooting:*\n\
     • If download fails, try a different Scribd link\n\
     • Large documents take longer (be patient)\n\
     • Check if document is publicly accessible\n\
     • Try removing any tracking parameters from URL\n\n\
     *Privacy:* I don't store any documents or user data."
}

pub fn stats(snapshot: &StatsSnapshot) -> String {
    let last_success = snapshot
        .last_success
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "Never".to_string());

    format!(
        "📊 *Bot Statistics*\n\n\
         ✅ Successful downloads: {}\n\
         ❌ Failed downloads: {}\n\
         👥 Total users served: {}\n\
         🕒 Last success: {}\n\n\
         *Uptime:* {}\n\
         *Status:* ✅ Operational\n\
         *Version:* {}",
        snapshot.succeeded,
        snapshot.failed,
        snapshot.users_served,
        last_success,
        format_uptime(snapshot),
        env!("CARGO_PKG_VERSION"),
    )
}

pub fn support() -> &'static str {
    "💬 *Support & Contact*\n\n\
     *Need help?*\n\
     • Check /help for common issues\n\
     • Ensure your Scribd link is valid\n\
     • Documents must be publicly accessible\n\n\
     *Disclaimer:*\n\
     This bot is for educational purposes.\n\
     Please respect copyright laws and only download content you have \
     permission to access.\n\n\
     For bug reports or feature requests:\n\
     Contact via GitHub or Telegram channel."
}

pub fn processing() -> &'static str {
    "⏳ *Processing your request...*\n\n\
     Downloading document from Scribd...\n\
     This usually takes 10-20 seconds.\n\
     _Please wait..._"
}

pub fn link_hint() -> &'static str {
    "🤖 *I only process Scribd links*\n\n\
     Please send me a valid Scribd URL like:\n\
     `https://www.scribd.com/document/123456789/Title`\n\n\
     Use /help for instructions."
}

pub fn success_caption(filename: &str, size_bytes: usize) -> String {
    let size_kb = (size_bytes as f64 / 1024.0).round() as u64;
    format!(
        "✅ *Download Complete!*\n\n\
         📄 *File:* {filename}\n\
         📦 *Size:* {size_kb} KB\n\
         ⚡ *Status:* Successfully downloaded\n\n\
         _Use /help for more options_"
    )
}

pub fn failure(reason: &str) -> String {
    format!(
        "❌ *Download Failed*\n\n\
         *Reason:* {reason}\n\n\
         *Possible solutions:*\n\
         1. Check if the link is correct\n\
         2. Ensure document is publicly accessible\n\
         3. Try a different Scribd document\n\
         4. Remove any tracking parameters from URL\n\n\
         *Alternative:* Try downloading manually from scribd-downloader.co"
    )
}

pub fn unexpected_error() -> &'static str {
    "⚠️ *Bot Error*\n\n\
     An unexpected error occurred. Please try again.\n\
     If problem persists, contact support."
}

/// User-facing reason line for a failed resolution.
pub fn resolve_failure_reason(err: &ResolveError) -> String {
    match err {
        ResolveError::InvalidReference => "Invalid Scribd URL format".to_string(),
        ResolveError::NotRetrievable { .. } => {
            "Document could not be downloaded. It might require subscription or be private."
                .to_string()
        }
        ResolveError::Timeout { per_call } => {
            format!(
                "Download timed out ({}s). Try again later.",
                per_call.as_secs()
            )
        }
        ResolveError::TransportError(detail) => {
            format!("Internal error: {}", truncate(detail, 100))
        }
    }
}

pub fn too_large_reason(size_bytes: usize) -> String {
    format!(
        "File too large ({:.1}MB). Max 50MB.",
        size_bytes as f64 / (1024.0 * 1024.0)
    )
}

/// Truncate on a char boundary so reason lines stay one screen tall.
fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

fn format_uptime(snapshot: &StatsSnapshot) -> String {
    let elapsed = chrono::Utc::now().signed_duration_since(snapshot.started_at);
    let days = elapsed.num_days();
    let hours = elapsed.num_hours() % 24;
    let minutes = elapsed.num_minutes() % 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{}m", minutes.max(0))
    }
}
