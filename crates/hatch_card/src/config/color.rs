/// Named colours accepted by the expiration colour field.
const COLOR_NAMES: &[(&str, [u8; 3])] = &[
    ("red", [255, 0, 0]),
    ("green", [0, 255, 0]),
    ("blue", [0, 0, 255]),
    ("yellow", [255, 255, 0]),
    ("orange", [255, 165, 0]),
    ("purple", [128, 0, 128]),
    ("pink", [255, 192, 203]),
    ("white", [255, 255, 255]),
    ("warm white", [255, 206, 84]),
    ("cool white", [173, 216, 230]),
    ("amber", [255, 191, 0]),
    ("cyan", [0, 255, 255]),
    ("magenta", [255, 0, 255]),
    ("lime", [0, 255, 0]),
    ("maroon", [128, 0, 0]),
    ("navy", [0, 0, 128]),
    ("olive", [128, 128, 0]),
    ("teal", [0, 128, 128]),
    ("silver", [192, 192, 192]),
    ("gray", [128, 128, 128]),
    ("black", [0, 0, 0]),
];

/// Parse `warm white` or `255, 0, 0`.
pub fn color_from_name_or_rgb(input: &str) -> Option<[u8; 3]> {
    let input = input.trim().to_lowercase();
    if input.is_empty() {
        return None;
    }

    if let Some((_, rgb)) = COLOR_NAMES.iter().find(|(name, _)| *name == input) {
        return Some(*rgb);
    }

    let parts: Vec<&str> = input.split(',').map(str::trim).collect();
    let [r, g, b] = parts.as_slice() else {
        return None;
    };
    Some([r.parse().ok()?, g.parse().ok()?, b.parse().ok()?])
}

/// First matching colour name, or the `r, g, b` triple when unnamed.
pub fn color_name_for_rgb(rgb: [u8; 3]) -> String {
    COLOR_NAMES
        .iter()
        .find(|(_, c)| *c == rgb)
        .map(|(name, _)| name.to_string())
        .unwrap_or_else(|| format!("{}, {}, {}", rgb[0], rgb[1], rgb[2]))
}
