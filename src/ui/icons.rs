//! Shared terminal icons.

use console::Emoji;

pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[WARN]");
pub static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");
pub static FILE_NEW: Emoji<'_, '_> = Emoji("📄 ", "+");

// Pipeline display
pub static PHASE: Emoji<'_, '_> = Emoji("▶️  ", ">");
pub static SKIPPED: Emoji<'_, '_> = Emoji("⏭️  ", "-");
pub static GATE: Emoji<'_, '_> = Emoji("🚧 ", "#");
