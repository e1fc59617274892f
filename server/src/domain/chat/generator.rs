//! Human-friendly room and member name generator.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ADJECTIVES: &[&str] = &[
    "Quiet", "Swift", "Bright", "Lucky", "Gentle", "Bold", "Calm", "Eager", "Fuzzy", "Merry",
    "Nimble", "Plucky", "Sunny", "Witty", "Zesty",
];

const COLORS: &[&str] = &[
    "Crimson", "Amber", "Teal", "Violet", "Indigo", "Coral", "Jade", "Scarlet", "Cobalt", "Saffron",
];

const NOUNS: &[&str] = &[
    "Falcon", "River", "Meadow", "Comet", "Harbor", "Lantern", "Thicket", "Glacier", "Canyon",
    "Orchard", "Pebble", "Summit", "Willow", "Ember", "Tide",
];

/// Thread-safe adjective/color/noun name generator.
pub struct Generator {
    rng: Mutex<StdRng>,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn generate_room_name(&self) -> String {
        let mut rng = self.rng.lock();
        format!(
            "{} {}",
            ADJECTIVES[rng.gen_range(0..ADJECTIVES.len())],
            NOUNS[rng.gen_range(0..NOUNS.len())]
        )
    }

    pub fn generate_member_name(&self) -> String {
        let mut rng = self.rng.lock();
        format!(
            "{} {}",
            COLORS[rng.gen_range(0..COLORS.len())],
            NOUNS[rng.gen_range(0..NOUNS.len())]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_name_has_two_words() {
        let gen = Generator::new();
        let name = gen.generate_room_name();
        assert_eq!(name.split_whitespace().count(), 2);
    }

    #[test]
    fn member_name_has_two_words() {
        let gen = Generator::new();
        let name = gen.generate_member_name();
        assert_eq!(name.split_whitespace().count(), 2);
    }
}
