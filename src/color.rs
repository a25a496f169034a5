use itertools::Itertools;
use palette::Srgb;

// ---------------------------------------------------------------------------
// Inverse colours: how much light each category removes per channel
// ---------------------------------------------------------------------------

/// Inverse colour of one category, each channel in `0.0..=1.0`. Overlapping
/// categories sum their inverse colours, like stacked translucent filters.
pub type InvColor = Srgb<f32>;

/// The four "sure" spheres of the script classification and their filters.
pub const SPHERES: [(&str, [f32; 3]); 4] = [
    ("sure_frontend_processing", [11.0 / 16.0, 0.0, 0.0]),
    ("sure_dom_element_generation", [0.0, 7.0 / 16.0, 7.0 / 16.0]),
    ("sure_ux_enhancement", [3.0 / 16.0, 7.0 / 16.0, 0.0]),
    ("sure_extensional_featuers", [2.0 / 16.0, 2.0 / 16.0, 9.0 / 16.0]),
];

/// Sum inverse colours channel by channel.
pub fn sum_inv_colors<'a>(inv_colors: impl IntoIterator<Item = &'a InvColor>) -> InvColor {
    inv_colors
        .into_iter()
        .fold(Srgb::new(0.0, 0.0, 0.0), |acc, c| {
            Srgb::new(acc.red + c.red, acc.green + c.green, acc.blue + c.blue)
        })
}

/// Turn an inverse colour into a display colour, truncating toward zero and
/// saturating channels whose filters sum past 1.
pub fn inv_color_to_color(inv: InvColor) -> Srgb<u8> {
    let channel = |v: f32| (255.0 * (1.0 - v)) as u8;
    Srgb::new(channel(inv.red), channel(inv.green), channel(inv.blue))
}

/// `#rrggbb` rendering.
pub fn to_hex(color: Srgb<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", color.red, color.green, color.blue)
}

// ---------------------------------------------------------------------------
// Combinations
// ---------------------------------------------------------------------------

/// Display colours for every non-empty combination of `spheres`: all
/// singles, then pairs, then triples and so on, each group in
/// lexicographic order of input position. Names are joined with `&`.
pub fn sphere_colors(spheres: &[(&str, InvColor)]) -> Vec<(String, Srgb<u8>)> {
    (1..=spheres.len())
        .flat_map(|size| spheres.iter().combinations(size))
        .map(|combo| {
            let name = combo.iter().map(|(name, _)| *name).join("&");
            let inv = sum_inv_colors(combo.iter().map(|(_, inv)| inv));
            (name, inv_color_to_color(inv))
        })
        .collect()
}

/// Colours for the built-in [`SPHERES`].
pub fn default_sphere_colors() -> Vec<(String, Srgb<u8>)> {
    let spheres: Vec<(&str, InvColor)> = SPHERES
        .iter()
        .map(|&(name, [r, g, b])| (name, Srgb::new(r, g, b)))
        .collect();
    sphere_colors(&spheres)
}
