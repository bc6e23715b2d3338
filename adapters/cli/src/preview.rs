//! Text renderings printed by the subcommands.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use orbitile_core::{IVec2, RectI};

const SOLID: char = '#';
const OPEN: char = '.';

/// Draws `region` one character per cell, highest row first.
pub(crate) fn render_region(region: RectI, mut is_solid: impl FnMut(IVec2) -> bool) -> String {
    let width = usize::try_from(region.width()).unwrap_or(0);
    let height = usize::try_from(region.height()).unwrap_or(0);
    if width == 0 {
        return String::new();
    }
    let mut out = String::with_capacity((width + 1) * height);
    for y in (region.min().y..region.max().y).rev() {
        for x in region.min().x..region.max().x {
            out.push(if is_solid(IVec2::new(x, y)) { SOLID } else { OPEN });
        }
        out.push('\n');
    }
    out
}

/// One `storage` listing line: hex key, then the base64 value.
pub(crate) fn format_record(key: &[u8], value: &[u8]) -> String {
    let hex: String = key.iter().map(|byte| format!("{byte:02x}")).collect();
    format!("{hex} {}", STANDARD.encode(value))
}
