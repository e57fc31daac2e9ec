//! Class vocabulary and remediation advice.
//!
//! The position of a class in [`CLASSES`] is the index the model emits for it.
//! The order is fixed by training; reordering it silently corrupts every
//! prediction.

/// A model output class and the advisory entry that goes with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassLabel {
    pub name: &'static str,
    pub advisory: &'static str,
}

pub const CLASSES: [ClassLabel; 5] = [
    ClassLabel {
        name: "Bacterial Spot",
        advisory: "Bacterial Spot Solution",
    },
    ClassLabel {
        name: "Early Blight",
        advisory: "Early Blight Solution",
    },
    ClassLabel {
        name: "Healthy",
        advisory: "Healthy Tomato Maintenance",
    },
    ClassLabel {
        name: "Late Blight",
        advisory: "Late Blight Solution",
    },
    ClassLabel {
        name: "Southern Blight",
        advisory: "Southern Blight Solution",
    },
];

/// Number of classes the model distinguishes.
pub const NUM_CLASSES: usize = CLASSES.len();

pub const UNKNOWN_ADVISORY: &str = "Unknown disease. Please provide a valid disease name.";

const ADVISORIES: [(&str, &str); 5] = [
    (
        "Bacterial Spot Solution",
        concat!(
            "1. Use certified disease-free seeds.\n",
            "2. Avoid overhead watering to reduce leaf wetness.\n",
            "3. Apply copper-based bactericides as a preventative measure.\n",
            "4. Remove and destroy infected plant debris.\n",
            "5. Maintain proper plant spacing for air circulation.\n",
        ),
    ),
    (
        "Early Blight Solution",
        concat!(
            "1. Rotate crops to prevent pathogen buildup in the soil.\n",
            "2. Use resistant tomato varieties.\n",
            "3. Remove and destroy affected plant parts.\n",
            "4. Apply fungicides like chlorothalonil or copper-based sprays.\n",
            "5. Ensure proper plant spacing for good air circulation.\n",
        ),
    ),
    (
        "Healthy Tomato Maintenance",
        concat!(
            "1. Ensure proper watering - water at the base, not overhead.\n",
            "2. Use mulch to retain soil moisture and prevent soil-borne diseases.\n",
            "3. Fertilize regularly with balanced nutrients.\n",
            "4. Prune to promote good air circulation.\n",
            "5. Monitor plants regularly for any signs of disease or pests.\n",
        ),
    ),
    (
        "Late Blight Solution",
        concat!(
            "1. Use resistant tomato varieties.\n",
            "2. Remove and destroy infected plants immediately.\n",
            "3. Apply fungicides containing mancozeb or chlorothalonil.\n",
            "4. Avoid overhead watering to minimize moisture.\n",
            "5. Practice crop rotation and soil sanitation.\n",
        ),
    ),
    (
        "Southern Blight Solution",
        concat!(
            "1. Rotate crops to avoid soilborne pathogens.\n",
            "2. Apply fungicides such as PCNB (pentachloronitrobenzene).\n",
            "3. Remove and destroy infected plants and debris.\n",
            "4. Use deep plowing to bury sclerotia.\n",
            "5. Maintain proper soil drainage to prevent moisture buildup.\n",
        ),
    ),
];

/// Class name for a model output index.
pub fn label(index: usize) -> Option<&'static str> {
    CLASSES.get(index).map(|c| c.name)
}

pub fn class_names() -> impl Iterator<Item = &'static str> {
    CLASSES.iter().map(|c| c.name)
}

/// Advisory key for a class name.
///
/// Known classes use the key stored next to them, anything else gets
/// `"<name> Solution"`.
pub fn advisory_key(class_name: &str) -> String {
    CLASSES
        .iter()
        .find(|c| c.name == class_name)
        .map_or_else(|| format!("{} Solution", class_name), |c| c.advisory.to_owned())
}

/// Remediation text for an advisory key, or [`UNKNOWN_ADVISORY`].
pub fn lookup_advisory(key: &str) -> &'static str {
    ADVISORIES
        .iter()
        .find(|(k, _)| *k == key)
        .map_or(UNKNOWN_ADVISORY, |(_, text)| *text)
}

pub fn solution_for(class_name: &str) -> &'static str {
    lookup_advisory(&advisory_key(class_name))
}
