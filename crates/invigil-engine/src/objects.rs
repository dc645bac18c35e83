//! Prohibited Object Mapping
//!
//! Maps raw detector output onto the domain's prohibited-object categories,
//! keeping the best-confidence match per category. Detections below the
//! confidence floor are dropped before mapping.

use crate::config::ObjectConfig;
use crate::detect::RawDetection;

/// Backend labels that read as a phone.
const PHONE_LABELS: [&str; 3] = ["cell phone", "phone", "mobile"];
const BOOK_LABEL: &str = "book";

/// Best qualifying detection for one category.
#[derive(Debug, Clone)]
pub struct ObjectMatch {
    pub confidence: f32,
    pub bbox: [f32; 4],
}

/// Mapped presence for one frame.
#[derive(Debug, Clone, Default)]
pub struct ObjectPresence {
    pub phone: Option<ObjectMatch>,
    pub book: Option<ObjectMatch>,
}

pub struct ObjectPresenceFilter {
    config: ObjectConfig,
}

impl ObjectPresenceFilter {
    pub fn new(config: ObjectConfig) -> Self {
        Self { config }
    }

    pub fn filter(&self, detections: &[RawDetection]) -> ObjectPresence {
        let mut presence = ObjectPresence::default();

        for det in detections {
            if det.confidence < self.config.confidence_floor {
                continue;
            }
            let label = det.label.trim();
            if PHONE_LABELS.iter().any(|l| label.eq_ignore_ascii_case(l)) {
                keep_best(&mut presence.phone, det);
            } else if label.eq_ignore_ascii_case(BOOK_LABEL) {
                keep_best(&mut presence.book, det);
            }
        }

        presence
    }

    /// Whether book matches may become violations (mapping always runs).
    pub fn book_enabled(&self) -> bool {
        self.config.emit_book_violations
    }
}

fn keep_best(slot: &mut Option<ObjectMatch>, det: &RawDetection) {
    let better = slot
        .as_ref()
        .map(|m| det.confidence > m.confidence)
        .unwrap_or(true);
    if better {
        *slot = Some(ObjectMatch {
            confidence: det.confidence,
            bbox: det.bbox,
        });
    }
}
