//! Council characters summoned by spell words
//!
//! A spell word always maps to the same role and rarity, so the same word
//! summons the same kind of character in every round.

pub const ROLES: [&str; 9] = [
    "tech",
    "marketing",
    "design",
    "growth",
    "product",
    "founder",
    "compliance",
    "finance",
    "vc",
];

/// Weighted by repetition: three commons, two uncommons, one rare, one legendary
pub const RARITIES: [&str; 7] = [
    "common",
    "common",
    "common",
    "uncommon",
    "uncommon",
    "rare",
    "legendary",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterTraits {
    pub role: &'static str,
    pub rarity: &'static str,
}

pub fn normalize_spell(word: &str) -> String {
    word.to_lowercase()
}

/// Sum of the UTF-16 code units of the word
pub fn spell_hash(word: &str) -> usize {
    word.encode_utf16().map(usize::from).sum()
}

pub fn derive_traits(normalized_word: &str) -> CharacterTraits {
    let hash = spell_hash(normalized_word);
    CharacterTraits {
        role: ROLES[hash % ROLES.len()],
        rarity: RARITIES[hash % RARITIES.len()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traits_are_deterministic() {
        assert_eq!(derive_traits("lumos"), derive_traits("lumos"));
    }

    #[test]
    fn test_known_hash() {
        // a=97, b=98 -> 195; 195 % 9 = 6, 195 % 7 = 6
        assert_eq!(spell_hash("ab"), 195);
        let traits = derive_traits("ab");
        assert_eq!(traits.role, "compliance");
        assert_eq!(traits.rarity, "legendary");
    }

    #[test]
    fn test_normalization_makes_case_irrelevant() {
        assert_eq!(
            derive_traits(&normalize_spell("Expelliarmus")),
            derive_traits("expelliarmus")
        );
    }
}
