//! Audio quality tiers offered by the music service.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One discrete audio-quality level.
///
/// Variants are declared from highest to lowest fidelity, so the derived
/// ordering sorts better tiers first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    /// Studio master
    JyMaster,
    /// Immersive surround
    Sky,
    /// HD surround
    JyEffect,
    /// Hi-Res audio
    HiRes,
    /// Lossless (SQ)
    Lossless,
    /// 320 kbps
    #[default]
    ExHigh,
    /// 192 kbps
    Higher,
    /// 128 kbps
    Standard,
}

impl QualityTier {
    /// Every tier, highest fidelity first.
    pub const ALL: [Self; 8] = [
        Self::JyMaster,
        Self::Sky,
        Self::JyEffect,
        Self::HiRes,
        Self::Lossless,
        Self::ExHigh,
        Self::Higher,
        Self::Standard,
    ];

    /// The level string the music service expects.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::JyMaster => "jymaster",
            Self::Sky => "sky",
            Self::JyEffect => "jyeffect",
            Self::HiRes => "hires",
            Self::Lossless => "lossless",
            Self::ExHigh => "exhigh",
            Self::Higher => "higher",
            Self::Standard => "standard",
        }
    }

    /// Human-readable label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::JyMaster => "Master",
            Self::Sky => "Immersive Surround",
            Self::JyEffect => "HD Surround",
            Self::HiRes => "Hi-Res",
            Self::Lossless => "Lossless",
            Self::ExHigh => "Extra High",
            Self::Higher => "Higher",
            Self::Standard => "Standard",
        }
    }

    /// Short badge shown next to the label
    #[must_use]
    pub const fn badge(self) -> &'static str {
        match self {
            Self::JyMaster | Self::Sky | Self::JyEffect | Self::HiRes => "VIP",
            Self::Lossless => "SQ",
            Self::ExHigh => "320k",
            Self::Higher => "192k",
            Self::Standard => "128k",
        }
    }

    /// Whether the tier needs an account with elevated (VIP) access.
    #[must_use]
    pub const fn requires_vip(self) -> bool {
        matches!(
            self,
            Self::JyMaster | Self::Sky | Self::JyEffect | Self::HiRes | Self::Lossless
        )
    }

    /// This tier followed by every lower-fidelity tier.
    #[must_use]
    pub fn fallback_chain(self) -> &'static [Self] {
        &Self::ALL[self as usize..]
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityTier {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CoreError::UnknownQuality(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_is_highest_first() {
        assert!(QualityTier::JyMaster < QualityTier::Lossless);
        assert!(QualityTier::Lossless < QualityTier::Standard);
        let mut sorted = QualityTier::ALL;
        sorted.sort();
        assert_eq!(sorted, QualityTier::ALL);
    }

    #[test]
    fn test_fallback_chain_walks_down() {
        assert_eq!(
            QualityTier::ExHigh.fallback_chain(),
            &[QualityTier::ExHigh, QualityTier::Higher, QualityTier::Standard]
        );
        assert_eq!(QualityTier::Standard.fallback_chain(), &[QualityTier::Standard]);
        assert_eq!(QualityTier::JyMaster.fallback_chain().len(), 8);
    }

    #[test]
    fn test_vip_flags() {
        assert!(QualityTier::HiRes.requires_vip());
        assert!(QualityTier::Lossless.requires_vip());
        assert!(!QualityTier::ExHigh.requires_vip());
        assert!(!QualityTier::Standard.requires_vip());
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("lossless".parse::<QualityTier>().unwrap(), QualityTier::Lossless);
        assert_eq!(" ExHigh ".parse::<QualityTier>().unwrap(), QualityTier::ExHigh);
        assert_eq!(QualityTier::HiRes.to_string(), "hires");
        assert!("ultra".parse::<QualityTier>().is_err());
    }

    #[test]
    fn test_serde_uses_level_strings() {
        let json = serde_json::to_string(&QualityTier::JyEffect).unwrap();
        assert_eq!(json, "\"jyeffect\"");
        let tier: QualityTier = serde_json::from_str("\"higher\"").unwrap();
        assert_eq!(tier, QualityTier::Higher);
    }

    #[test]
    fn test_labels_and_badges() {
        assert_eq!(QualityTier::Lossless.label(), "Lossless");
        assert_eq!(QualityTier::Lossless.badge(), "SQ");
        assert_eq!(QualityTier::Standard.badge(), "128k");
    }
}
